//! The incremental renderer (§4.E): walks the committed tree plus its
//! resolved [`LayoutTree`], identifies dirty subtrees, and submits draw ops
//! to a [`DrawlistBuilder`]. Three operational modes share one walk:
//!
//! - **Full repaint**: `clearTo` then a depth-first draw of everything.
//! - **Partial commit**: skip clean sibling subtrees entirely; redraw a
//!   dirty branch's own content as the walk passes through it on the way to
//!   whatever changed beneath it (harmless over-draw of unchanged content on
//!   a pass-through ancestor, never incorrect content).
//! - **Render-only**: no commit/layout change; only focus ring and cursor
//!   state are re-emitted.
//!
//! Every container whose content rect narrows the inherited clip emits a
//! balanced `pushClip`/`popClip` pair around its children, even when the
//! container itself has nothing new to draw — this is what keeps the
//! clip-balance invariant (§3) true regardless of which mode ran.

use std::sync::atomic::Ordering;
use std::time::Instant;

use rezi_commit::InstanceRegistry;
use rezi_drawlist::{CursorShape, DrawlistBuilder};
use rezi_layout::{LayoutNode, LayoutTree, Overflow, PositionMode, Rect, Style};
use rezi_text::str_width;
use rezi_view::Kind;

use crate::cache::{CacheKey, RenderCache, hash_props};
use crate::error::RenderError;
use crate::metrics::RenderPathMetrics;
use crate::plan::{FocusState, RenderPlan};
use crate::style::{resolve_focus_ring_style, resolve_text_style};

/// Everything one frame's render pass needs besides the builder/cache/metrics
/// it mutates.
pub struct RenderInputs<'a> {
    pub registry: &'a InstanceRegistry,
    pub layout: &'a LayoutTree,
    pub prev_layout: Option<&'a LayoutTree>,
    pub viewport_w: i32,
    pub viewport_h: i32,
    pub focus: FocusState,
    pub plan: RenderPlan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    Partial,
    RenderOnly,
}

/// Runs one frame's render pass, picking an operational mode from `inputs.plan`
/// and the observed previous/current layout, then emitting draw ops into
/// `builder`. Does not call `build()` — the caller decides when to finalize.
pub fn render(
    inputs: &RenderInputs,
    builder: &mut DrawlistBuilder,
    cache: &mut RenderCache,
    metrics: &RenderPathMetrics,
) -> Result<(), RenderError> {
    let start = Instant::now();
    let viewport = Rect::new(0, 0, inputs.viewport_w, inputs.viewport_h);

    let mode = pick_mode(inputs, metrics);

    match mode {
        Mode::Full => {
            metrics.full_frames.fetch_add(1, Ordering::Relaxed);
            builder.clear_to(inputs.viewport_w.max(0) as u32, inputs.viewport_h.max(0) as u32);
            walk(
                &inputs.layout.root,
                inputs.prev_layout.map(|t| &t.root),
                inputs.registry,
                viewport,
                Mode::Full,
                inputs.focus,
                builder,
                cache,
                metrics,
                false,
            )?;
        }
        Mode::Partial => {
            metrics.partial_frames.fetch_add(1, Ordering::Relaxed);
            let root_dirty = inputs
                .registry
                .get(inputs.layout.root.instance_id)
                .map(|i| i.dirty)
                .unwrap_or(true);
            if root_dirty {
                walk(
                    &inputs.layout.root,
                    inputs.prev_layout.map(|t| &t.root),
                    inputs.registry,
                    viewport,
                    Mode::Partial,
                    inputs.focus,
                    builder,
                    cache,
                    metrics,
                    false,
                )?;
            }
        }
        Mode::RenderOnly => {
            metrics.render_only_frames.fetch_add(1, Ordering::Relaxed);
        }
    }

    emit_focus_and_cursor(inputs, builder)?;

    metrics.record_frame_ns(start.elapsed().as_nanos() as u64);
    Ok(())
}

fn pick_mode(inputs: &RenderInputs, metrics: &RenderPathMetrics) -> Mode {
    if !inputs.plan.commit && !inputs.plan.layout {
        return Mode::RenderOnly;
    }
    if inputs.plan.allows_partial() {
        if let Some(prev) = inputs.prev_layout {
            if layout_pairwise_stable(inputs.registry, &inputs.layout.root, &prev.root) {
                return Mode::Partial;
            }
            metrics.escalations.fetch_add(1, Ordering::Relaxed);
        }
    }
    Mode::Full
}

/// A clean (non-dirty) instance present in both trees must keep the exact
/// same rect; otherwise the partial path's assumption that unskipped
/// siblings are stable would be violated and we must escalate to a full
/// repaint instead of risking stale content under a narrowed clip.
fn layout_pairwise_stable(registry: &InstanceRegistry, cur: &LayoutNode, prev: &LayoutNode) -> bool {
    if cur.instance_id != prev.instance_id {
        return true;
    }
    let dirty = registry.get(cur.instance_id).map(|i| i.dirty).unwrap_or(true);
    if !dirty && cur.rect != prev.rect {
        return false;
    }
    for (c, p) in cur.children.iter().zip(prev.children.iter()) {
        if !layout_pairwise_stable(registry, c, p) {
            return false;
        }
    }
    true
}

#[allow(clippy::too_many_arguments)]
fn walk(
    node: &LayoutNode,
    prev_node: Option<&LayoutNode>,
    registry: &InstanceRegistry,
    clip: Rect,
    mode: Mode,
    focus: FocusState,
    builder: &mut DrawlistBuilder,
    cache: &mut RenderCache,
    metrics: &RenderPathMetrics,
    suppress_scroll_copy: bool,
) -> Result<(), RenderError> {
    if node.hidden {
        // A node that just became hidden needs its old pixels erased; a node
        // that was already hidden left nothing to erase.
        if let Some(prev) = prev_node {
            if !prev.hidden && mode != Mode::Full {
                builder.fill_rect(prev.rect.x, prev.rect.y, prev.rect.w, prev.rect.h, 0);
            }
        }
        return Ok(());
    }

    let instance = registry.get(node.instance_id).ok_or_else(|| {
        RenderError::InvalidProps(format!("render walk hit unknown instance #{}", node.instance_id))
    })?;

    let dirty = mode == Mode::Full || instance.dirty;
    let style = Style::parse(node.instance_id, instance.vnode.kind, &instance.vnode.props)
        .map_err(|e| RenderError::InvalidProps(e.to_string()))?;

    if dirty {
        draw_own_content(node, instance.vnode.kind, &instance.vnode.props, &style, focus, builder, cache, metrics)?;
    }

    let narrows_clip = matches!(style.overflow, Overflow::Hidden | Overflow::Scroll);
    let child_clip = if narrows_clip {
        let c = clip.intersect(&node.content_rect);
        builder.push_clip(c.x, c.y, c.w, c.h);
        c
    } else {
        clip
    };

    if style.overflow == Overflow::Scroll && mode != Mode::Full && !suppress_scroll_copy {
        if let Some(handled) = try_scroll_copy(node, prev_node, instance.vnode.kind, &style, child_clip, builder, metrics) {
            if handled {
                if narrows_clip {
                    builder.pop_clip();
                }
                return Ok(());
            }
        }
    }

    let prev_children = prev_node.map(|p| p.children.as_slice()).unwrap_or(&[]);
    for (idx, child) in node.children.iter().enumerate() {
        let child_dirty = mode == Mode::Full || registry.get(child.instance_id).map(|i| i.dirty).unwrap_or(true);
        if !child_dirty && mode == Mode::Partial {
            continue;
        }
        let suppress_scroll_copy = absolute_sibling_conceals(child, &node.children, registry);
        if suppress_scroll_copy {
            metrics.scroll_copy_suppressed.fetch_add(1, Ordering::Relaxed);
        }
        let prev_child = prev_children.get(idx);
        walk(
            child,
            prev_child,
            registry,
            child_clip,
            mode,
            focus,
            builder,
            cache,
            metrics,
            suppress_scroll_copy,
        )?;
    }

    if narrows_clip {
        builder.pop_clip();
    }

    Ok(())
}

/// True when some *other* sibling is absolutely positioned and its rect
/// overlaps `child`'s rect. Used to suppress the scroll-copy blit shortcut on
/// a scroll container: an overlapping overlay would be blitted stale along
/// with the scrolled content if we skipped redrawing it from scratch.
fn absolute_sibling_conceals(child: &LayoutNode, siblings: &[LayoutNode], registry: &InstanceRegistry) -> bool {
    for sibling in siblings {
        if sibling.instance_id == child.instance_id {
            continue;
        }
        let Some(instance) = registry.get(sibling.instance_id) else {
            continue;
        };
        let is_absolute = Style::parse(sibling.instance_id, instance.vnode.kind, &instance.vnode.props)
            .map(|s| matches!(s.position, PositionMode::Absolute { .. }))
            .unwrap_or(false);
        if !is_absolute {
            continue;
        }
        let overlap = sibling.rect.intersect(&child.rect);
        if overlap.w > 0 && overlap.h > 0 {
            return true;
        }
    }
    false
}

/// Emits this node's own visual content: background/border fill for boxes,
/// text for text/leaf kinds. Recursion into children is the caller's job.
fn draw_own_content(
    node: &LayoutNode,
    kind: Kind,
    props: &rezi_view::Props,
    style: &Style,
    focus: FocusState,
    builder: &mut DrawlistBuilder,
    cache: &mut RenderCache,
    metrics: &RenderPathMetrics,
) -> Result<(), RenderError> {
    let is_focused = focus.focused_id == Some(node.instance_id);
    let text_style = if is_focused && kind.is_focusable_leaf() {
        resolve_focus_ring_style(props)
    } else {
        resolve_text_style(props)
    };

    if text_style.bg != 0 {
        builder.fill_rect(node.rect.x, node.rect.y, node.rect.w, node.rect.h, text_style.bg);
    }

    draw_border(node, style, builder);

    match kind {
        Kind::Text => {
            if let Some(content) = props.get_str("content") {
                draw_cached_text(node, content, text_style, cache, metrics, builder);
            }
        }
        Kind::Button | Kind::Input | Kind::Select | Kind::Checkbox | Kind::Slider => {
            if let Some(content) = props.get_str("content").or_else(|| props.get_str("label")) {
                draw_cached_text(node, content, text_style, cache, metrics, builder);
            }
        }
        Kind::Divider => {
            let color = props.get_str("color").and_then(|s| s.strip_prefix('#')).and_then(|h| u32::from_str_radix(h, 16).ok());
            builder.fill_rect(node.rect.x, node.rect.y, node.rect.w, node.rect.h, color.unwrap_or(0));
        }
        _ => {}
    }

    Ok(())
}

fn draw_cached_text(
    node: &LayoutNode,
    content: &str,
    style: rezi_drawlist::TextStyle,
    cache: &mut RenderCache,
    metrics: &RenderPathMetrics,
    builder: &mut DrawlistBuilder,
) {
    let key = CacheKey { props_hash: hash_props(&rezi_view::Props::new().with("content", content)), rect: node.rect };
    if cache.get(node.instance_id, key).is_some() {
        metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
    } else {
        metrics.cache_misses.fetch_add(1, Ordering::Relaxed);
        let visual_width = str_width(content);
        cache.put(node.instance_id, key, crate::cache::CachedProjection { text: content.to_string(), visual_width });
    }
    if !content.is_empty() {
        builder.draw_text(node.rect.x, node.rect.y, content, style);
    }
}

fn draw_border(node: &LayoutNode, style: &Style, builder: &mut DrawlistBuilder) {
    if !style.border.any() {
        return;
    }
    let r = node.rect;
    if style.border.top {
        builder.fill_rect(r.x, r.y, r.w, 1, 0);
    }
    if style.border.bottom && r.h > 0 {
        builder.fill_rect(r.x, r.bottom() - 1, r.w, 1, 0);
    }
    if style.border.left {
        builder.fill_rect(r.x, r.y, 1, r.h, 0);
    }
    if style.border.right && r.w > 0 {
        builder.fill_rect(r.right() - 1, r.y, 1, r.h, 0);
    }
}

/// Attempts the scroll-copy optimization (§4.E) for a scrolling container.
/// Returns `Some(true)` when the shortcut fully handled this node's subtree
/// (caller should not also run the normal child walk), `Some(false)` when it
/// was eligible but declined (caller falls through to a normal redraw), and
/// `None` when there's nothing to compare against (no previous frame).
fn try_scroll_copy(
    node: &LayoutNode,
    prev_node: Option<&LayoutNode>,
    kind: Kind,
    style: &Style,
    clip: Rect,
    builder: &mut DrawlistBuilder,
    metrics: &RenderPathMetrics,
) -> Option<bool> {
    let _ = kind;
    let prev = prev_node?;
    let (cur_scroll, prev_scroll) = (node.scroll?, prev.scroll?);
    if node.rect != prev.rect
        || cur_scroll.content_width != prev_scroll.content_width
        || cur_scroll.content_height != prev_scroll.content_height
        || cur_scroll.viewport_width != prev_scroll.viewport_width
        || cur_scroll.viewport_height != prev_scroll.viewport_height
    {
        return Some(false);
    }
    let dy = cur_scroll.scroll_y - prev_scroll.scroll_y;
    let dx = cur_scroll.scroll_x - prev_scroll.scroll_x;
    if dx == 0 && dy == 0 {
        return Some(false);
    }
    // Scroll-copy only shifts along one axis per frame; a diagonal change
    // or a jump larger than the viewport falls back to a full redraw.
    if (dx != 0 && dy != 0) || dx.abs() >= clip.w || dy.abs() >= clip.h {
        return Some(false);
    }
    let _ = style;

    builder.blit_rect(clip.x + dx.max(0), clip.y + dy.max(0), clip.w - dx.abs(), clip.h - dy.abs(), clip.x + (-dx).max(0), clip.y + (-dy).max(0));
    metrics.scroll_copy_shifts.fetch_add(1, Ordering::Relaxed);
    Some(true)
}

fn emit_focus_and_cursor(inputs: &RenderInputs, builder: &mut DrawlistBuilder) -> Result<(), RenderError> {
    match inputs.focus.focused_id.and_then(|id| inputs.layout.find(id)) {
        Some(node) if matches!(lookup_kind(inputs.registry, node.instance_id), Some(Kind::Input)) => {
            builder.set_cursor(node.rect.x, node.rect.y, CursorShape::Bar, true, true);
        }
        _ => {
            builder.hide_cursor();
        }
    }
    Ok(())
}

fn lookup_kind(registry: &InstanceRegistry, id: u32) -> Option<Kind> {
    registry.get(id).map(|i| i.vnode.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rezi_commit::{InstanceRegistry as Registry, commit};
    use rezi_drawlist::{BuilderConfig, DrawCmd, DrawlistBuilder, ParsedDrawlist, parse};
    use rezi_view::{Props, bx, column, row, text};

    fn registry_with_root(vnode: rezi_view::VNode) -> (Registry, u32) {
        let mut registry = Registry::new();
        let root_id = commit(None, vnode, &mut registry).expect("commit succeeds");
        (registry, root_id)
    }

    fn drawn_texts<'a>(parsed: &ParsedDrawlist<'a>) -> Vec<&'a str> {
        parsed
            .cmds
            .iter()
            .filter_map(|c| match c {
                DrawCmd::DrawText { string_index, .. } => Some(parsed.string_at(*string_index).unwrap()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn full_repaint_balances_clip_ops() {
        let inner = bx(Props::new().with("overflow", "hidden"), vec![text("hi", Props::new())]);
        let (registry, root_id) = registry_with_root(column(Props::new(), vec![inner]));
        let layout = rezi_layout::layout(&registry, root_id, 20, 5).unwrap();

        let mut builder = DrawlistBuilder::default();
        let mut cache = RenderCache::new();
        let metrics = RenderPathMetrics::default();
        let inputs = RenderInputs {
            registry: &registry,
            layout: &layout,
            prev_layout: None,
            viewport_w: 20,
            viewport_h: 5,
            focus: FocusState::default(),
            plan: RenderPlan::full_repaint(),
        };
        render(&inputs, &mut builder, &mut cache, &metrics).unwrap();
        let bytes = builder.build().unwrap().to_vec();
        let parsed = parse(&bytes).unwrap();
        let mut depth = 0i32;
        for cmd in &parsed.cmds {
            match cmd {
                DrawCmd::PushClip { .. } => depth += 1,
                DrawCmd::PopClip => depth -= 1,
                _ => {}
            }
            assert!(depth >= 0);
        }
        assert_eq!(depth, 0);
    }

    #[test]
    fn hidden_node_emits_no_ops() {
        let hidden = bx(Props::new().with_constrained("display", rezi_view::ConstrainedValue::Int(0)), vec![text("x", Props::new())]);
        let (registry, root_id) = registry_with_root(column(Props::new(), vec![hidden]));
        let layout = rezi_layout::layout(&registry, root_id, 20, 5).unwrap();

        let mut builder = DrawlistBuilder::default();
        let mut cache = RenderCache::new();
        let metrics = RenderPathMetrics::default();
        let inputs = RenderInputs {
            registry: &registry,
            layout: &layout,
            prev_layout: None,
            viewport_w: 20,
            viewport_h: 5,
            focus: FocusState::default(),
            plan: RenderPlan::full_repaint(),
        };
        render(&inputs, &mut builder, &mut cache, &metrics).unwrap();
        let bytes = builder.build().unwrap().to_vec();
        let parsed = parse(&bytes).unwrap();
        assert!(!drawn_texts(&parsed).contains(&"x"));
    }

    #[test]
    fn partial_mode_skips_clean_sibling_and_still_draws_dirty_one() {
        let a = text("a", Props::new());
        let b = text("b", Props::new());
        let (mut registry, root_id) = registry_with_root(row(Props::new(), vec![a, b]));
        let layout1 = rezi_layout::layout(&registry, root_id, 20, 2).unwrap();

        let next_root = commit(
            Some(root_id),
            row(Props::new(), vec![text("a", Props::new()), text("b2", Props::new())]),
            &mut registry,
        )
        .unwrap();
        let layout2 = rezi_layout::layout(&registry, next_root, 20, 2).unwrap();

        let mut builder = DrawlistBuilder::new(BuilderConfig::default());
        let mut cache = RenderCache::new();
        let metrics = RenderPathMetrics::default();
        let inputs = RenderInputs {
            registry: &registry,
            layout: &layout2,
            prev_layout: Some(&layout1),
            viewport_w: 20,
            viewport_h: 2,
            focus: FocusState::default(),
            plan: RenderPlan { commit: true, layout: false, check_layout_stability: true },
        };
        render(&inputs, &mut builder, &mut cache, &metrics).unwrap();
        let bytes = builder.build().unwrap().to_vec();
        let parsed = parse(&bytes).unwrap();
        let texts = drawn_texts(&parsed);
        assert!(texts.contains(&"b2"));
        assert!(!texts.contains(&"a"));
        assert_eq!(metrics.snapshot().partial_frames, 1);
    }

    #[test]
    fn render_only_mode_emits_no_fill_or_text_ops() {
        let (registry, root_id) = registry_with_root(bx(Props::new(), vec![text("hi", Props::new())]));
        let layout = rezi_layout::layout(&registry, root_id, 10, 2).unwrap();

        let mut builder = DrawlistBuilder::default();
        let mut cache = RenderCache::new();
        let metrics = RenderPathMetrics::default();
        let inputs = RenderInputs {
            registry: &registry,
            layout: &layout,
            prev_layout: Some(&layout),
            viewport_w: 10,
            viewport_h: 2,
            focus: FocusState::default(),
            plan: RenderPlan::render_only(),
        };
        render(&inputs, &mut builder, &mut cache, &metrics).unwrap();
        let bytes = builder.build().unwrap().to_vec();
        let parsed = parse(&bytes).unwrap();
        assert!(parsed.cmds.iter().all(|c| matches!(c, DrawCmd::HideCursor | DrawCmd::SetCursor { .. })));
        assert_eq!(metrics.snapshot().render_only_frames, 1);
    }

    fn leaf(instance_id: u32, rect: rezi_layout::Rect) -> LayoutNode {
        LayoutNode { instance_id, rect, content_rect: rect, scroll: None, hidden: false, children: Vec::new() }
    }

    #[test]
    fn overlapping_absolute_sibling_conceals_scroll_container() {
        let mut registry = Registry::new();
        let scroll_box = bx(Props::new().with("overflow", "scroll"), Vec::new());
        let overlay = bx(Props::new().with("position", "absolute"), Vec::new());
        let root_id = commit(None, row(Props::new(), vec![scroll_box, overlay]), &mut registry).unwrap();
        let scroll_id = registry.get(root_id).unwrap().children[0];
        let overlay_id = registry.get(root_id).unwrap().children[1];

        let scroll_node = leaf(scroll_id, rezi_layout::Rect::new(0, 0, 10, 5));
        let overlay_node = leaf(overlay_id, rezi_layout::Rect::new(2, 1, 4, 2));
        assert!(absolute_sibling_conceals(&scroll_node, &[scroll_node.clone(), overlay_node.clone()], &registry));
    }

    #[test]
    fn non_overlapping_absolute_sibling_does_not_conceal() {
        let mut registry = Registry::new();
        let scroll_box = bx(Props::new().with("overflow", "scroll"), Vec::new());
        let overlay = bx(Props::new().with("position", "absolute"), Vec::new());
        let root_id = commit(None, row(Props::new(), vec![scroll_box, overlay]), &mut registry).unwrap();
        let scroll_id = registry.get(root_id).unwrap().children[0];
        let overlay_id = registry.get(root_id).unwrap().children[1];

        let scroll_node = leaf(scroll_id, rezi_layout::Rect::new(0, 0, 10, 5));
        let overlay_node = leaf(overlay_id, rezi_layout::Rect::new(20, 20, 4, 2));
        assert!(!absolute_sibling_conceals(&scroll_node, &[scroll_node.clone(), overlay_node.clone()], &registry));
    }

    #[test]
    fn static_sibling_never_conceals_even_when_overlapping() {
        let mut registry = Registry::new();
        let scroll_box = bx(Props::new().with("overflow", "scroll"), Vec::new());
        let sibling = bx(Props::new(), Vec::new());
        let root_id = commit(None, row(Props::new(), vec![scroll_box, sibling]), &mut registry).unwrap();
        let scroll_id = registry.get(root_id).unwrap().children[0];
        let sibling_id = registry.get(root_id).unwrap().children[1];

        let scroll_node = leaf(scroll_id, rezi_layout::Rect::new(0, 0, 10, 5));
        let sibling_node = leaf(sibling_id, rezi_layout::Rect::new(2, 1, 4, 2));
        assert!(!absolute_sibling_conceals(&scroll_node, &[scroll_node.clone(), sibling_node.clone()], &registry));
    }
}
