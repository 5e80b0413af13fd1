//! Recursive-descent parser for constraint expression source text.
//!
//! Grammar (precedence low to high): ternary `?:` > comparison > additive >
//! multiplicative > unary negate > call/reference/number/paren.

use crate::error::ConstraintError;
use crate::expr::{BinaryOp, Expr, Func, Metric, Scope};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    WidgetRef(String),
    Dot,
    Comma,
    LParen,
    RParen,
    Question,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Gt,
    Ge,
    Lt,
    Le,
    EqEq,
    Ne,
}

fn lex(src: &str) -> Result<Vec<Token>, ConstraintError> {
    let bytes = src.as_bytes();
    let mut i = 0;
    let mut out = Vec::new();
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '.' => {
                out.push(Token::Dot);
                i += 1;
            }
            ',' => {
                out.push(Token::Comma);
                i += 1;
            }
            '(' => {
                out.push(Token::LParen);
                i += 1;
            }
            ')' => {
                out.push(Token::RParen);
                i += 1;
            }
            '?' => {
                out.push(Token::Question);
                i += 1;
            }
            ':' => {
                out.push(Token::Colon);
                i += 1;
            }
            '+' => {
                out.push(Token::Plus);
                i += 1;
            }
            '-' => {
                out.push(Token::Minus);
                i += 1;
            }
            '*' => {
                out.push(Token::Star);
                i += 1;
            }
            '/' => {
                out.push(Token::Slash);
                i += 1;
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    out.push(Token::Ge);
                    i += 2;
                } else {
                    out.push(Token::Gt);
                    i += 1;
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    out.push(Token::Le);
                    i += 2;
                } else {
                    out.push(Token::Lt);
                    i += 1;
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    out.push(Token::EqEq);
                    i += 2;
                } else {
                    return Err(ConstraintError::invalid(
                        src,
                        "unexpected '=' (did you mean '==')",
                    ));
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    out.push(Token::Ne);
                    i += 2;
                } else {
                    return Err(ConstraintError::invalid(src, "unexpected '!'"));
                }
            }
            '#' => {
                let start = i + 1;
                let mut j = start;
                while j < bytes.len() && is_ident_byte(bytes[j]) {
                    j += 1;
                }
                if j == start {
                    return Err(ConstraintError::invalid(src, "empty widget reference '#'"));
                }
                out.push(Token::WidgetRef(src[start..j].to_string()));
                i = j;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                let mut j = i;
                while j < bytes.len() && (bytes[j].is_ascii_digit() || bytes[j] == b'.') {
                    j += 1;
                }
                let text = &src[start..j];
                let n: f64 = text
                    .parse()
                    .map_err(|_| ConstraintError::invalid(src, "malformed number literal"))?;
                out.push(Token::Number(n));
                i = j;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                let mut j = i;
                while j < bytes.len() && is_ident_byte(bytes[j]) {
                    j += 1;
                }
                out.push(Token::Ident(src[start..j].to_string()));
                i = j;
            }
            other => {
                return Err(ConstraintError::invalid(
                    src,
                    format!("unexpected character '{other}'"),
                ));
            }
        }
    }
    Ok(out)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, tok: &Token) -> Result<(), ConstraintError> {
        if self.peek() == Some(tok) {
            self.pos += 1;
            Ok(())
        } else {
            Err(ConstraintError::invalid(
                self.source,
                format!("expected {tok:?}, found {:?}", self.peek()),
            ))
        }
    }

    fn parse_ternary(&mut self) -> Result<Expr, ConstraintError> {
        let cond = self.parse_comparison()?;
        if self.peek() == Some(&Token::Question) {
            self.bump();
            let then_branch = self.parse_ternary()?;
            self.expect(&Token::Colon)?;
            let else_branch = self.parse_ternary()?;
            Ok(Expr::Ternary {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            })
        } else {
            Ok(cond)
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, ConstraintError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ConstraintError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ConstraintError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ConstraintError> {
        if self.peek() == Some(&Token::Minus) {
            self.bump();
            let inner = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_metric(&mut self) -> Result<Metric, ConstraintError> {
        match self.bump() {
            Some(Token::Ident(name)) => match name.as_str() {
                "w" => Ok(Metric::W),
                "h" => Ok(Metric::H),
                "min_w" => Ok(Metric::MinW),
                "min_h" => Ok(Metric::MinH),
                other => Err(ConstraintError::invalid(
                    self.source,
                    format!("unknown metric '{other}'"),
                )),
            },
            other => Err(ConstraintError::invalid(
                self.source,
                format!("expected metric name, found {other:?}"),
            )),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ConstraintError> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.parse_ternary()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::WidgetRef(id)) => {
                self.expect(&Token::Dot)?;
                let metric = self.parse_metric()?;
                Ok(Expr::Reference {
                    scope: Scope::Widget(id),
                    metric,
                })
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.parse_call(&name)
                } else if self.peek() == Some(&Token::Dot) {
                    self.bump();
                    let metric = self.parse_metric()?;
                    let scope = match name.as_str() {
                        "viewport" => Scope::Viewport,
                        "parent" => Scope::Parent,
                        "intrinsic" => Scope::Intrinsic,
                        other => {
                            return Err(ConstraintError::invalid(
                                self.source,
                                format!("unknown reference scope '{other}'"),
                            ));
                        }
                    };
                    Ok(Expr::Reference { scope, metric })
                } else {
                    Err(ConstraintError::invalid(
                        self.source,
                        format!("unexpected bare identifier '{name}'"),
                    ))
                }
            }
            other => Err(ConstraintError::invalid(
                self.source,
                format!("unexpected token {other:?}"),
            )),
        }
    }

    fn parse_call(&mut self, name: &str) -> Result<Expr, ConstraintError> {
        let func = Func::from_name(name).ok_or_else(|| {
            ConstraintError::invalid(
                self.source,
                format!(
                    "unknown function '{name}'; allowed: {}",
                    Func::ALLOWLIST.join(", ")
                ),
            )
        })?;
        self.expect(&Token::LParen)?;

        if func.is_aggregation() {
            let widget_ref = match self.bump() {
                Some(Token::WidgetRef(id)) => id,
                other => {
                    return Err(ConstraintError::invalid(
                        self.source,
                        format!("{} expects a single widget reference, found {other:?}", func.name()),
                    ));
                }
            };
            self.expect(&Token::RParen)?;
            return Ok(Expr::Call {
                func,
                args: vec![Expr::Reference {
                    scope: Scope::Widget(widget_ref),
                    metric: Metric::W,
                }],
            });
        }

        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            args.push(self.parse_ternary()?);
            while self.peek() == Some(&Token::Comma) {
                self.bump();
                args.push(self.parse_ternary()?);
            }
        }
        self.expect(&Token::RParen)?;

        let arity_ok = match func {
            Func::Clamp => args.len() == 3,
            Func::Min | Func::Max => args.len() == 2,
            Func::Floor | Func::Ceil | Func::Round | Func::Abs => args.len() == 1,
            Func::If => args.len() == 3,
            Func::Steps => args.len() >= 2 && args.len() % 2 == 0,
            Func::MaxSibling | Func::SumSibling => unreachable!("handled above"),
        };
        if !arity_ok {
            return Err(ConstraintError::invalid(
                self.source,
                format!("wrong argument count for '{}'", func.name()),
            ));
        }
        Ok(Expr::Call { func, args })
    }
}

/// Parses constraint expression source text into an [`Expr`].
///
/// Unknown function names and unknown reference scopes are rejected here,
/// once, rather than at evaluation time.
pub fn parse(source: &str) -> Result<Expr, ConstraintError> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        source,
    };
    let expr = parser.parse_ternary()?;
    if parser.pos != parser.tokens.len() {
        return Err(ConstraintError::invalid(source, "trailing tokens after expression"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_number() {
        assert_eq!(parse("42").unwrap(), Expr::Number(42.0));
    }

    #[test]
    fn parses_viewport_reference() {
        let e = parse("viewport.w").unwrap();
        assert_eq!(
            e,
            Expr::Reference {
                scope: Scope::Viewport,
                metric: Metric::W
            }
        );
    }

    #[test]
    fn parses_widget_reference() {
        let e = parse("#sidebar.w").unwrap();
        assert_eq!(
            e,
            Expr::Reference {
                scope: Scope::Widget("sidebar".to_string()),
                metric: Metric::W
            }
        );
    }

    #[test]
    fn parses_clamp_call() {
        let e = parse("clamp(0, parent.w - 4, 80)").unwrap();
        match e {
            Expr::Call { func, args } => {
                assert_eq!(func, Func::Clamp);
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn parses_ternary() {
        let e = parse("parent.w > 40 ? 1 : 0").unwrap();
        assert!(matches!(e, Expr::Ternary { .. }));
    }

    #[test]
    fn rejects_unknown_function() {
        let err = parse("wiggle(1)").unwrap_err();
        assert!(err.to_string().contains("ZRUI_INVALID_CONSTRAINT"));
    }

    #[test]
    fn rejects_unknown_scope() {
        assert!(parse("banana.w").is_err());
    }

    #[test]
    fn parses_aggregation_call() {
        let e = parse("max_sibling(#row)").unwrap();
        assert!(matches!(
            e,
            Expr::Call {
                func: Func::MaxSibling,
                ..
            }
        ));
    }
}
