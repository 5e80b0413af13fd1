use thiserror::Error;

use rezi_constraint::ConstraintError;

/// Prop validation runs before layout and aborts the frame deterministically
/// on the first rejected value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("ZRUI_INVALID_PROPS: instance #{instance_id} prop `{prop}`: {detail}")]
    InvalidProps {
        instance_id: u32,
        prop: &'static str,
        detail: String,
    },

    #[error(transparent)]
    Constraint(#[from] ConstraintError),
}
