//! The layout engine (§4.C/§4.D): turns a committed instance tree plus
//! resolved constraint values into a [`tree::LayoutTree`] of cell rects.
//!
//! A frame runs this crate's entry point twice. The first pass (`resolved:
//! None`) produces a baseline tree used only as the constraint graph's
//! [`rezi_constraint::ResolveContext`] — every expression-valued size slot
//! falls back to intrinsic/zero sizing. The second pass plugs the resolver's
//! output back in to produce the tree the renderer actually draws from.

mod constraints;
mod engine;
mod error;
mod measure;
mod rect;
mod resolve_context;
mod style;
mod tree;

pub use constraints::collect_constraint_inputs;
pub use error::LayoutError;
pub use measure::{DefaultTextMeasure, TextMeasure};
pub use rect::Rect;
pub use resolve_context::{BaselineResolveContext, build_parent_map};
pub use style::{Align, Axis, BorderSides, Justify, Overflow, PositionMode, Sides, Style};
pub use tree::{LayoutNode, LayoutTree, ScrollMetadata};

use rezi_commit::InstanceRegistry;
use rezi_constraint::{ConstraintGraph, ResolvedValues, resolve};

use engine::LayoutInputs;

/// Runs the full two-phase layout pipeline for one frame and returns the
/// final tree plus the resolved constraint values (callers that also need
/// per-widget resolved sizes, e.g. for diagnostics, can reuse them instead of
/// re-resolving).
pub fn layout_frame(
    registry: &InstanceRegistry,
    root_id: u32,
    viewport_w: i32,
    viewport_h: i32,
    measure: &dyn TextMeasure,
) -> Result<(LayoutTree, ResolvedValues), LayoutError> {
    let baseline_inputs = LayoutInputs {
        registry,
        resolved: None,
        measure,
    };
    let baseline_root = engine::layout(&baseline_inputs, root_id, viewport_w, viewport_h)?;
    let baseline = LayoutTree { root: baseline_root };

    let constraint_inputs = collect_constraint_inputs(registry, root_id);
    let resolved = if constraint_inputs.is_empty() {
        ResolvedValues::default()
    } else {
        tracing::trace!(count = constraint_inputs.len(), "resolving constraint graph for frame");
        let graph = ConstraintGraph::build(constraint_inputs)?;
        let parent_of = build_parent_map(registry, root_id);
        let ctx = BaselineResolveContext {
            baseline: &baseline,
            parent_of: &parent_of,
            viewport_w: viewport_w as f64,
            viewport_h: viewport_h as f64,
        };
        resolve(&graph, &ctx)
    };

    let final_inputs = LayoutInputs {
        registry,
        resolved: Some(&resolved),
        measure,
    };
    let final_root = engine::layout(&final_inputs, root_id, viewport_w, viewport_h)?;
    Ok((LayoutTree { root: final_root }, resolved))
}

/// Convenience wrapper over [`layout_frame`] for callers that only need the
/// tree (the common case outside diagnostics/testing).
pub fn layout(
    registry: &InstanceRegistry,
    root_id: u32,
    viewport_w: i32,
    viewport_h: i32,
) -> Result<LayoutTree, LayoutError> {
    let measure = DefaultTextMeasure;
    layout_frame(registry, root_id, viewport_w, viewport_h, &measure).map(|(tree, _)| tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rezi_commit::{InstanceRegistry as Registry, commit};
    use rezi_view::{Props, bx, column, row, text};

    fn registry_with_root(vnode: rezi_view::VNode) -> (Registry, u32) {
        let mut registry = Registry::new();
        let root_id = commit(None, vnode, &mut registry).expect("commit succeeds");
        (registry, root_id)
    }

    #[test]
    fn single_box_fills_viewport() {
        let (registry, root_id) = registry_with_root(bx(Props::new(), Vec::new()));
        let tree = layout(&registry, root_id, 80, 24).unwrap();
        assert_eq!(tree.root.rect, Rect::new(0, 0, 80, 24));
    }

    #[test]
    fn row_stacks_children_left_to_right() {
        let a = bx(Props::new().with_constrained("width", rezi_view::ConstrainedValue::Int(10)), Vec::new());
        let b = bx(Props::new().with_constrained("width", rezi_view::ConstrainedValue::Int(20)), Vec::new());
        let (registry, root_id) = registry_with_root(row(Props::new(), vec![a, b]));
        let tree = layout(&registry, root_id, 80, 24).unwrap();
        assert_eq!(tree.root.children.len(), 2);
        assert_eq!(tree.root.children[0].rect.x, 0);
        assert_eq!(tree.root.children[0].rect.w, 10);
        assert_eq!(tree.root.children[1].rect.x, 10);
        assert_eq!(tree.root.children[1].rect.w, 20);
    }

    #[test]
    fn column_default_axis_stacks_top_to_bottom() {
        let a = bx(Props::new().with_constrained("height", rezi_view::ConstrainedValue::Int(3)), Vec::new());
        let b = bx(Props::new().with_constrained("height", rezi_view::ConstrainedValue::Int(5)), Vec::new());
        let (registry, root_id) = registry_with_root(column(Props::new(), vec![a, b]));
        let tree = layout(&registry, root_id, 80, 24).unwrap();
        assert_eq!(tree.root.children[0].rect.y, 0);
        assert_eq!(tree.root.children[1].rect.y, 3);
    }

    #[test]
    fn flex_children_share_remaining_space() {
        let a = bx(Props::new().with("flex", 1), Vec::new());
        let b = bx(Props::new().with("flex", 1), Vec::new());
        let (registry, root_id) = registry_with_root(row(Props::new(), vec![a, b]));
        let tree = layout(&registry, root_id, 100, 10).unwrap();
        assert_eq!(tree.root.children[0].rect.w, 50);
        assert_eq!(tree.root.children[1].rect.w, 50);
    }

    #[test]
    fn padding_insets_content_rect() {
        let props = Props::new().with_constrained("p", rezi_view::ConstrainedValue::Int(2));
        let (registry, root_id) = registry_with_root(bx(props, Vec::new()));
        let tree = layout(&registry, root_id, 80, 24).unwrap();
        assert_eq!(tree.root.content_rect, Rect::new(2, 2, 76, 20));
    }

    #[test]
    fn hidden_node_collapses_to_zero_rect() {
        let props = Props::new().with_constrained("display", rezi_view::ConstrainedValue::Int(0));
        let (registry, root_id) = registry_with_root(bx(props, Vec::new()));
        let tree = layout(&registry, root_id, 80, 24).unwrap();
        assert!(tree.root.hidden);
        assert_eq!(tree.root.rect.w, 0);
        assert_eq!(tree.root.rect.h, 0);
    }

    #[test]
    fn text_node_measures_intrinsic_width() {
        let (registry, root_id) = registry_with_root(text("hi", Props::new()));
        let tree = layout(&registry, root_id, 80, 24).unwrap();
        assert_eq!(tree.root.rect.h, 1);
    }

    #[test]
    fn margin_offsets_row_children_and_grows_used_main() {
        let a = bx(
            Props::new()
                .with_constrained("width", rezi_view::ConstrainedValue::Int(10))
                .with_constrained("mr", rezi_view::ConstrainedValue::Int(2)),
            Vec::new(),
        );
        let b = bx(Props::new().with_constrained("width", rezi_view::ConstrainedValue::Int(10)), Vec::new());
        let (registry, root_id) = registry_with_root(row(Props::new(), vec![a, b]));
        let tree = layout(&registry, root_id, 80, 24).unwrap();
        assert_eq!(tree.root.children[0].rect.x, 0);
        assert_eq!(tree.root.children[0].rect.w, 10);
        // b starts after a's width plus a's own 2-cell right margin.
        assert_eq!(tree.root.children[1].rect.x, 12);
    }

    #[test]
    fn margin_insets_cross_axis_position() {
        let a = bx(
            Props::new()
                .with_constrained("height", rezi_view::ConstrainedValue::Int(5))
                .with_constrained("mt", rezi_view::ConstrainedValue::Int(3)),
            Vec::new(),
        );
        let (registry, root_id) = registry_with_root(row(Props::new(), vec![a]));
        let tree = layout(&registry, root_id, 80, 24).unwrap();
        assert_eq!(tree.root.children[0].rect.y, 3);
        assert_eq!(tree.root.children[0].rect.h, 5);
    }

    #[test]
    fn width_expression_resolves_against_sibling() {
        let width_expr = rezi_constraint::parse::parse("#a.w + 5").unwrap();
        let anchor = bx(
            Props::new()
                .with("id", "a")
                .with_constrained("width", rezi_view::ConstrainedValue::Int(10)),
            Vec::new(),
        );
        let dependent = bx(
            Props::new().with_constrained("width", rezi_view::ConstrainedValue::Expr(width_expr)),
            Vec::new(),
        );
        let (registry, root_id) = registry_with_root(row(Props::new(), vec![anchor, dependent]));
        let tree = layout(&registry, root_id, 80, 24).unwrap();
        assert_eq!(tree.root.children[1].rect.w, 15);
    }
}
