use ahash::AHashMap;
use rezi_constraint::Expr;

/// The non-negative integer spacing scale accepted on padding/margin/gap
/// slots, per the view model's structural value domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpacingScale {
    None,
    Xs,
    Sm,
    Md,
    Lg,
    Xl,
    Xxl,
}

impl SpacingScale {
    pub fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "none" => SpacingScale::None,
            "xs" => SpacingScale::Xs,
            "sm" => SpacingScale::Sm,
            "md" => SpacingScale::Md,
            "lg" => SpacingScale::Lg,
            "xl" => SpacingScale::Xl,
            "2xl" => SpacingScale::Xxl,
            _ => return None,
        })
    }

    /// Fixed non-negative integer cell count for the scale step.
    pub fn cells(self) -> i32 {
        match self {
            SpacingScale::None => 0,
            SpacingScale::Xs => 1,
            SpacingScale::Sm => 2,
            SpacingScale::Md => 4,
            SpacingScale::Lg => 6,
            SpacingScale::Xl => 8,
            SpacingScale::Xxl => 12,
        }
    }
}

/// A value accepted on a constrained structural prop slot (width, height,
/// padding, margin, gap, flexBasis, display, …): a concrete integer, a
/// spacing-scale symbol, a percentage, the literal `auto`/`full`, or a parsed
/// constraint expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstrainedValue {
    Int(i32),
    Spacing(SpacingScale),
    Percent(f64),
    Auto,
    Full,
    Expr(Expr),
}

impl ConstrainedValue {
    /// Parses a percentage string matching `^<non-negative-number>%$`.
    pub fn parse_percent(s: &str) -> Option<f64> {
        let digits = s.strip_suffix('%')?;
        let n: f64 = digits.parse().ok()?;
        if n.is_finite() && n >= 0.0 { Some(n) } else { None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Constrained(ConstrainedValue),
    Int(i32),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        PropValue::Int(v)
    }
}
impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}
impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Str(v)
    }
}
impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

/// A kind-specific mapping from prop name to value. Cheap to clone by
/// identity comparison at the `Rc`/pointer level is intentionally not
/// provided here — reconciliation compares by content (`PartialEq`), which
/// the commit phase uses to decide whether an instance is dirty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props(AHashMap<String, PropValue>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn with_constrained(mut self, name: impl Into<String>, value: ConstrainedValue) -> Self {
        self.0.insert(name.into(), PropValue::Constrained(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(PropValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.0.get(name) {
            Some(PropValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.0.get(name) {
            Some(PropValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn get_constrained(&self, name: &str) -> Option<&ConstrainedValue> {
        match self.0.get(name) {
            Some(PropValue::Constrained(c)) => Some(c),
            _ => None,
        }
    }

    /// The `id` prop, used as the constraint graph's widgetId when present.
    pub fn widget_id(&self) -> Option<&str> {
        self.get_str("id")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}
