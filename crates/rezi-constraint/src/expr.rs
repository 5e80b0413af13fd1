//! Constraint expression AST: a small tagged union, boxed at branch points.
//!
//! Numbers fold to `f64` internally; the resolver sanitizes every result to a
//! finite value (see [`crate::resolver`]) so NaN/Inf never escapes evaluation.

/// Where a `reference` node reads its metric from.
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    Viewport,
    Parent,
    Intrinsic,
    /// `widget(id)` — resolved against the widgetId index built during graph construction.
    Widget(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    W,
    H,
    MinW,
    MinH,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

/// The allowlisted call targets. Anything outside this set is rejected at
/// parse time with `ZRUI_INVALID_CONSTRAINT` naming the offending source and
/// this list, per the spec's diagnostics contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Clamp,
    Min,
    Max,
    Floor,
    Ceil,
    Round,
    Abs,
    If,
    Steps,
    MaxSibling,
    SumSibling,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Func> {
        Some(match name {
            "clamp" => Func::Clamp,
            "min" => Func::Min,
            "max" => Func::Max,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "round" => Func::Round,
            "abs" => Func::Abs,
            "if" => Func::If,
            "steps" => Func::Steps,
            "max_sibling" => Func::MaxSibling,
            "sum_sibling" => Func::SumSibling,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Clamp => "clamp",
            Func::Min => "min",
            Func::Max => "max",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Round => "round",
            Func::Abs => "abs",
            Func::If => "if",
            Func::Steps => "steps",
            Func::MaxSibling => "max_sibling",
            Func::SumSibling => "sum_sibling",
        }
    }

    /// True for `max_sibling`/`sum_sibling`, the two aggregation functions that
    /// fan out an edge to every instance sharing the referenced widgetId
    /// rather than to a single node.
    pub fn is_aggregation(self) -> bool {
        matches!(self, Func::MaxSibling | Func::SumSibling)
    }

    pub const ALLOWLIST: &'static [&'static str] = &[
        "clamp",
        "min",
        "max",
        "floor",
        "ceil",
        "round",
        "abs",
        "if",
        "steps",
        "max_sibling",
        "sum_sibling",
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Reference {
        scope: Scope,
        metric: Metric,
    },
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// A call to an allowlisted function. `max_sibling`/`sum_sibling` carry a
    /// single bare widget-id argument rather than a sub-expression; the parser
    /// stores it as a one-element `args` vec wrapping a `Reference` so the
    /// interpreter stays uniform.
    Call {
        func: Func,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Walks the AST collecting every `widget(id)` reference and every
    /// aggregation-function widget id, used by graph construction to derive
    /// dependency edges.
    pub fn for_each_widget_ref<'a>(&'a self, mut visit: impl FnMut(&'a str, bool)) {
        fn walk<'a>(e: &'a Expr, visit: &mut impl FnMut(&'a str, bool)) {
            match e {
                Expr::Number(_) => {}
                Expr::Reference { scope, .. } => {
                    if let Scope::Widget(id) = scope {
                        visit(id, false);
                    }
                }
                Expr::Negate(inner) => walk(inner, visit),
                Expr::Binary { lhs, rhs, .. } => {
                    walk(lhs, visit);
                    walk(rhs, visit);
                }
                Expr::Ternary {
                    cond,
                    then_branch,
                    else_branch,
                } => {
                    walk(cond, visit);
                    walk(then_branch, visit);
                    walk(else_branch, visit);
                }
                Expr::Call { func, args } => {
                    if func.is_aggregation() {
                        if let Some(Expr::Reference {
                            scope: Scope::Widget(id),
                            ..
                        }) = args.first()
                        {
                            visit(id, true);
                        }
                    } else {
                        for a in args {
                            walk(a, visit);
                        }
                    }
                }
            }
        }
        walk(self, &mut visit);
    }
}
