use thiserror::Error;

/// Errors a render frame can fail with. Distinct from [`rezi_drawlist::DrawlistError`]
/// (builder-side capacity/balance failures, surfaced through this type via
/// `#[from]` so callers see one error enum per frame).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("ZRUI_INVALID_PROPS: {0}")]
    InvalidProps(String),

    #[error(transparent)]
    Drawlist(#[from] rezi_drawlist::DrawlistError),
}
