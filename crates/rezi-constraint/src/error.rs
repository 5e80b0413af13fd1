use thiserror::Error;

/// Constraint-graph failures. `Display` renders the stable string code first
/// so callers that match on `to_string()` (or the `code()` accessor) see the
/// exact codes from the error-handling contract.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("ZRUI_INVALID_CONSTRAINT: {detail} (source: {source_text:?})")]
    InvalidConstraint { source_text: String, detail: String },

    #[error("ZRUI_CIRCULAR_CONSTRAINT: cycle {}", cycle.join(" -> "))]
    Circular { cycle: Vec<String> },
}

impl ConstraintError {
    pub fn invalid(source_text: &str, detail: impl Into<String>) -> Self {
        ConstraintError::InvalidConstraint {
            source_text: source_text.to_string(),
            detail: detail.into(),
        }
    }

    pub fn circular(cycle: Vec<String>) -> Self {
        ConstraintError::Circular { cycle }
    }

    /// The stable error code, independent of detail text.
    pub fn code(&self) -> &'static str {
        match self {
            ConstraintError::InvalidConstraint { .. } => "ZRUI_INVALID_CONSTRAINT",
            ConstraintError::Circular { .. } => "ZRUI_CIRCULAR_CONSTRAINT",
        }
    }
}
