//! The incremental renderer (§4.E): converts `(runtime tree, layout tree,
//! viewport, focus state, plan)` into draw ops submitted to a
//! [`rezi_drawlist::DrawlistBuilder`], plus the cross-cutting render cache
//! (§3) and the `hitTestFocusable` collaborator pointer routing depends on.

mod cache;
mod error;
mod hittest;
mod metrics;
mod plan;
mod renderer;
mod style;

pub use cache::{CacheKey, CachedProjection, RenderCache, hash_props};
pub use error::RenderError;
pub use hittest::hit_test_focusable;
pub use metrics::{RenderPathMetrics, RenderPathMetricsSnapshot};
pub use plan::{FocusState, RenderPlan};
pub use renderer::{RenderInputs, render};
pub use style::{resolve_focus_ring_style, resolve_text_style};
