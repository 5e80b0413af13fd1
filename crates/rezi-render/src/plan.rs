/// What changed since the previous frame, decided by the caller (the loop
/// driving commit/layout/render) and consulted by the renderer to pick an
/// operational mode (§4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderPlan {
    /// A new committed tree was produced this frame.
    pub commit: bool,
    /// Layout changed enough to require repositioning.
    pub layout: bool,
    /// Permit the partial-commit fast path only when sibling rectangles are
    /// pairwise stable (no reordering/resizing that would make an ancestor
    /// clip stale mid-walk).
    pub check_layout_stability: bool,
}

impl RenderPlan {
    pub fn full_repaint() -> Self {
        Self { commit: true, layout: true, check_layout_stability: false }
    }

    pub fn render_only() -> Self {
        Self { commit: false, layout: false, check_layout_stability: true }
    }

    /// Whether the plan, on its own admission, even allows the partial path.
    pub fn allows_partial(&self) -> bool {
        self.commit && self.check_layout_stability
    }
}

/// Current focus, consulted to draw focus rings and to gate render-only mode
/// for focus-only changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusState {
    pub focused_id: Option<u32>,
}
