use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CommitError {
    /// A prior child instance referenced by the tree no longer exists in the
    /// registry — an internal consistency failure, not a user-facing one.
    #[error("ZRUI_INVALID_PROPS: commit referenced unknown instance #{0}")]
    UnknownInstance(u32),
}
