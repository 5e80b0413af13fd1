use crate::expr::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintProp {
    Width,
    Height,
    MinWidth,
    MaxWidth,
    MinHeight,
    MaxHeight,
    FlexBasis,
    Display,
}

impl ConstraintProp {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintProp::Width => "width",
            ConstraintProp::Height => "height",
            ConstraintProp::MinWidth => "minWidth",
            ConstraintProp::MaxWidth => "maxWidth",
            ConstraintProp::MinHeight => "minHeight",
            ConstraintProp::MaxHeight => "maxHeight",
            ConstraintProp::FlexBasis => "flexBasis",
            ConstraintProp::Display => "display",
        }
    }
}

/// One row of input to [`crate::graph::ConstraintGraph::build`]: everything
/// the graph builder needs about a single constrained prop on a single
/// instance. Callers assemble a `Vec<ConstraintNodeInput>` by walking their
/// own runtime tree; this crate has no notion of a tree itself.
#[derive(Debug, Clone)]
pub struct ConstraintNodeInput {
    pub instance_id: u32,
    pub parent_instance_id: Option<u32>,
    pub widget_id: Option<String>,
    pub prop: ConstraintProp,
    pub expr: Expr,
    /// Original expression source text, used for fingerprinting (two graphs
    /// built from the same source strings in the same order must fingerprint
    /// identically) and for diagnostics.
    pub source: String,
}

/// Stable node key `"<instanceId>:<prop>"`.
pub fn node_key(instance_id: u32, prop: ConstraintProp) -> String {
    format!("{instance_id}:{}", prop.as_str())
}
