use rezi_commit::InstanceRegistry;
use rezi_constraint::{ConstraintProp, ResolvedValues};
use rezi_view::{ConstrainedValue, Kind};

use crate::error::LayoutError;
use crate::measure::TextMeasure;
use crate::rect::Rect;
use crate::style::{Align, Axis, Justify, PositionMode, Style};
use crate::tree::{LayoutNode, ScrollMetadata};

/// Everything the recursive layout function needs that does not change as it
/// walks the tree.
pub struct LayoutInputs<'a> {
    pub registry: &'a InstanceRegistry,
    pub resolved: Option<&'a ResolvedValues>,
    pub measure: &'a dyn TextMeasure,
}

/// Computes a [`crate::tree::LayoutTree`] rooted at `root_id`, filling the
/// full `viewport_w`×`viewport_h` rect.
///
/// Call this twice per frame: once with `resolved: None` to produce a
/// baseline tree (intrinsic/fallback sizing only, used as the constraint
/// resolver's baseline/intrinsic context), then again with the resolver's
/// output to produce the frame's final tree.
pub fn layout(inputs: &LayoutInputs, root_id: u32, viewport_w: i32, viewport_h: i32) -> Result<LayoutNode, LayoutError> {
    layout_node(inputs, root_id, 0, 0, viewport_w.max(0), viewport_h.max(0))
}

fn resolved_value(inputs: &LayoutInputs, instance_id: u32, prop: ConstraintProp) -> Option<f64> {
    inputs.resolved.and_then(|r| r.get(&(instance_id, prop)).copied())
}

/// Resolves one size slot to a concrete cell count: a resolved expression
/// result wins when present (the graph only carries Expr-valued props);
/// otherwise int/spacing/percent/full resolve directly against `available`,
/// and `auto`/unset/expr-without-a-resolver fall back to `intrinsic`.
fn resolve_size(
    inputs: &LayoutInputs,
    instance_id: u32,
    prop: ConstraintProp,
    value: &Option<ConstrainedValue>,
    available: i32,
    intrinsic: impl FnOnce() -> i32,
) -> i32 {
    if let Some(v) = resolved_value(inputs, instance_id, prop) {
        return v.round() as i32;
    }
    match value {
        None => intrinsic(),
        Some(ConstrainedValue::Int(n)) => *n,
        Some(ConstrainedValue::Spacing(s)) => s.cells(),
        Some(ConstrainedValue::Percent(p)) => ((p / 100.0) * available as f64).round() as i32,
        Some(ConstrainedValue::Auto) => intrinsic(),
        Some(ConstrainedValue::Full) => available,
        Some(ConstrainedValue::Expr(_)) => intrinsic(),
    }
}

fn is_hidden(inputs: &LayoutInputs, instance_id: u32, style: &Style, props: &rezi_view::Props) -> bool {
    if let Some(v) = resolved_value(inputs, instance_id, ConstraintProp::Display) {
        return v <= 0.0;
    }
    match props.get_constrained("display") {
        Some(ConstrainedValue::Int(n)) => *n <= 0,
        _ => {
            let _ = style;
            false
        }
    }
}

fn clamp_min_max(value: i32, min: Option<i32>, max: Option<i32>) -> i32 {
    let mut v = value.max(0);
    if let Some(min) = min {
        v = v.max(min);
    }
    if let Some(max) = max {
        v = v.min(max.max(0));
    }
    v
}

fn intrinsic_size(inputs: &LayoutInputs, kind: Kind, props: &rezi_view::Props, max_width: Option<i32>) -> (i32, i32) {
    match kind {
        Kind::Text => {
            let content = props.get_str("content").unwrap_or("");
            inputs.measure.measure(content, max_width)
        }
        Kind::Spacer | Kind::Divider => (0, 0),
        _ => (0, 0),
    }
}

struct ChildPlan {
    instance_id: u32,
    main: i32,
    cross: i32,
    flex: f64,
    margin_main_start: i32,
    margin_main_end: i32,
    margin_cross_start: i32,
    margin_cross_end: i32,
}

/// Splits a child's `margin: Sides` into (main-start, main-end) per the
/// stack's axis — left/right for a row, top/bottom for a column.
fn margin_main(style: &Style, axis: Axis) -> (i32, i32) {
    match axis {
        Axis::Row => (style.margin.left, style.margin.right),
        Axis::Column => (style.margin.top, style.margin.bottom),
    }
}

/// The cross-axis counterpart of [`margin_main`] — top/bottom for a row,
/// left/right for a column.
fn margin_cross(style: &Style, axis: Axis) -> (i32, i32) {
    match axis {
        Axis::Row => (style.margin.top, style.margin.bottom),
        Axis::Column => (style.margin.left, style.margin.right),
    }
}

fn layout_node(
    inputs: &LayoutInputs,
    instance_id: u32,
    x: i32,
    y: i32,
    avail_w: i32,
    avail_h: i32,
) -> Result<LayoutNode, LayoutError> {
    let instance = inputs.registry.get(instance_id).ok_or_else(|| LayoutError::InvalidProps {
        instance_id,
        prop: "kind",
        detail: "instance not found in registry".into(),
    })?;
    let kind = instance.vnode.kind;
    let props = instance.vnode.props.clone();
    let children_ids = instance.children.clone();
    let style = Style::parse(instance_id, kind, &props)?;

    if is_hidden(inputs, instance_id, &style, &props) {
        return Ok(LayoutNode {
            instance_id,
            rect: Rect::new(x, y, 0, 0),
            content_rect: Rect::new(x, y, 0, 0),
            scroll: None,
            hidden: true,
            children: Vec::new(),
        });
    }

    let min_w = style
        .min_width
        .as_ref()
        .map(|v| resolve_size(inputs, instance_id, ConstraintProp::MinWidth, &Some(v.clone()), avail_w, || 0));
    let max_w = style
        .max_width
        .as_ref()
        .map(|v| resolve_size(inputs, instance_id, ConstraintProp::MaxWidth, &Some(v.clone()), avail_w, || avail_w));
    let min_h = style
        .min_height
        .as_ref()
        .map(|v| resolve_size(inputs, instance_id, ConstraintProp::MinHeight, &Some(v.clone()), avail_h, || 0));
    let max_h = style
        .max_height
        .as_ref()
        .map(|v| resolve_size(inputs, instance_id, ConstraintProp::MaxHeight, &Some(v.clone()), avail_h, || avail_h));

    // A container (row/column/box and the higher-level container kinds) with
    // no explicit width/height fills the space its parent gave it; a leaf
    // (text, spacer, divider) shrinks to its intrinsic content size instead.
    // This applies uniformly whether the slot was left unset or given `auto`
    // — both route through this fallback, per resolve_size's dispatch.
    let is_leaf = matches!(kind, Kind::Text | Kind::Spacer | Kind::Divider);

    let mut own_w = resolve_size(inputs, instance_id, ConstraintProp::Width, &style.width, avail_w, || {
        if is_leaf {
            intrinsic_size(inputs, kind, &props, None).0
        } else {
            avail_w
        }
    });
    let mut own_h = resolve_size(inputs, instance_id, ConstraintProp::Height, &style.height, avail_h, || {
        if is_leaf {
            intrinsic_size(inputs, kind, &props, Some(own_w)).1
        } else {
            avail_h
        }
    });

    if let Some(ratio) = style.aspect_ratio {
        let width_explicit = !matches!(style.width, None | Some(ConstrainedValue::Auto));
        let height_explicit = !matches!(style.height, None | Some(ConstrainedValue::Auto));
        if width_explicit && !height_explicit {
            own_h = (own_w as f64 / ratio).round() as i32;
        } else if height_explicit && !width_explicit {
            own_w = (own_h as f64 * ratio).round() as i32;
        }
    }

    own_w = clamp_min_max(own_w.min(avail_w.max(own_w)), min_w, max_w);
    own_h = clamp_min_max(own_h.min(avail_h.max(own_h)), min_h, max_h);

    let own_rect = Rect::new(x, y, own_w, own_h);
    let node = layout_children(inputs, instance_id, &style, own_rect, &children_ids)?;
    Ok(node)
}

fn border_inset(style: &Style, rect: Rect) -> Rect {
    let left = style.border.left as i32;
    let right = style.border.right as i32;
    let top = style.border.top as i32;
    let bottom = style.border.bottom as i32;
    Rect::new(
        rect.x + left,
        rect.y + top,
        (rect.w - left - right).max(0),
        (rect.h - top - bottom).max(0),
    )
}

fn padded(rect: Rect, style: &Style) -> Rect {
    Rect::new(
        rect.x + style.padding.left,
        rect.y + style.padding.top,
        (rect.w - style.padding.left - style.padding.right).max(0),
        (rect.h - style.padding.top - style.padding.bottom).max(0),
    )
}

/// Lays out `children_ids` inside `own_rect` (the node's own border box) per
/// `style`, returning the fully-populated [`LayoutNode`]. Scroll containers
/// run this twice: once to measure content extent, and — if scrollbar
/// reservation is needed — again with the content rect narrowed by one cell
/// on the affected edge(s).
fn layout_children(
    inputs: &LayoutInputs,
    instance_id: u32,
    style: &Style,
    own_rect: Rect,
    children_ids: &[u32],
) -> Result<LayoutNode, LayoutError> {
    let bordered = border_inset(style, own_rect);
    let base_content = padded(bordered, style);

    let (children, content_extent) = layout_stack(inputs, style, base_content, children_ids)?;

    let mut scroll = None;
    let mut final_content = base_content;
    let mut final_children = children;

    if matches!(style.overflow, crate::style::Overflow::Scroll) {
        let needs_v = content_extent.1 > base_content.h;
        let needs_h = content_extent.0 > base_content.w;
        if needs_v || needs_h {
            let narrowed = Rect::new(
                base_content.x,
                base_content.y,
                if needs_v { (base_content.w - 1).max(0) } else { base_content.w },
                if needs_h { (base_content.h - 1).max(0) } else { base_content.h },
            );
            let (children2, extent2) = layout_stack(inputs, style, narrowed, children_ids)?;
            final_children = children2;
            final_content = narrowed;
            let content_width = extent2.0.max(narrowed.w);
            let content_height = extent2.1.max(narrowed.h);
            scroll = Some(ScrollMetadata {
                scroll_x: style.scroll_left.min((content_width - narrowed.w).max(0)),
                scroll_y: style.scroll_top.min((content_height - narrowed.h).max(0)),
                content_width,
                content_height,
                viewport_width: narrowed.w,
                viewport_height: narrowed.h,
            });
        } else {
            let content_width = content_extent.0.max(base_content.w);
            let content_height = content_extent.1.max(base_content.h);
            scroll = Some(ScrollMetadata {
                scroll_x: style.scroll_left.min((content_width - base_content.w).max(0)),
                scroll_y: style.scroll_top.min((content_height - base_content.h).max(0)),
                content_width,
                content_height,
                viewport_width: base_content.w,
                viewport_height: base_content.h,
            });
        }
    }

    let _ = instance_id;
    Ok(LayoutNode {
        instance_id,
        rect: own_rect,
        content_rect: final_content,
        scroll,
        hidden: false,
        children: final_children,
    })
}

/// Runs one pass of stack distribution (flow + absolute children) inside
/// `content` and returns the laid-out children plus the (width, height)
/// extent the flow children actually occupied — used to decide whether a
/// scroll container needs scrollbar reservation.
fn layout_stack(
    inputs: &LayoutInputs,
    style: &Style,
    content: Rect,
    children_ids: &[u32],
) -> Result<(Vec<LayoutNode>, (i32, i32)), LayoutError> {
    let axis = style.axis;
    let (content_main, content_cross) = match axis {
        Axis::Row => (content.w, content.h),
        Axis::Column => (content.h, content.w),
    };

    let mut flow: Vec<u32> = Vec::new();
    let mut absolute: Vec<u32> = Vec::new();
    for &id in children_ids {
        let child_style = child_style_for(inputs, id)?;
        match child_style.position {
            PositionMode::Absolute { .. } => absolute.push(id),
            PositionMode::Static => flow.push(id),
        }
    }

    let mut plans = Vec::with_capacity(flow.len());
    let mut total_fixed = 0i32;
    let mut total_flex = 0.0f64;
    for &id in &flow {
        let (child_style, kind, props) = child_style_and_node(inputs, id)?;
        if is_hidden(inputs, id, &child_style, &props) {
            plans.push(ChildPlan {
                instance_id: id,
                main: 0,
                cross: 0,
                flex: 0.0,
                margin_main_start: 0,
                margin_main_end: 0,
                margin_cross_start: 0,
                margin_cross_end: 0,
            });
            continue;
        }
        let (margin_main_start, margin_main_end) = margin_main(&child_style, axis);
        let (margin_cross_start, margin_cross_end) = margin_cross(&child_style, axis);
        let margin_main_total = margin_main_start + margin_main_end;
        let main_value = match axis {
            Axis::Row => &child_style.width,
            Axis::Column => &child_style.height,
        };
        let main_prop = match axis {
            Axis::Row => ConstraintProp::Width,
            Axis::Column => ConstraintProp::Height,
        };
        if child_style.flex > 0.0 {
            total_flex += child_style.flex;
            total_fixed += margin_main_total;
            plans.push(ChildPlan {
                instance_id: id,
                main: 0,
                cross: 0,
                flex: child_style.flex,
                margin_main_start,
                margin_main_end,
                margin_cross_start,
                margin_cross_end,
            });
        } else {
            let avail_main = (content_main - margin_main_total).max(0);
            let main = resolve_size(inputs, id, main_prop, main_value, avail_main, || {
                let max_w = match axis {
                    Axis::Row => None,
                    Axis::Column => Some(content_cross),
                };
                let (iw, ih) = intrinsic_size(inputs, kind, &props, max_w);
                match axis {
                    Axis::Row => iw,
                    Axis::Column => ih,
                }
            });
            total_fixed += main + margin_main_total;
            plans.push(ChildPlan {
                instance_id: id,
                main,
                cross: 0,
                flex: 0.0,
                margin_main_start,
                margin_main_end,
                margin_cross_start,
                margin_cross_end,
            });
        }
    }

    let gap_total = style.gap * (flow.len().saturating_sub(1)) as i32;
    let remaining = (content_main - total_fixed - gap_total).max(0);

    if total_flex > 0.0 {
        let mut distributed = 0i32;
        let n = plans.iter().filter(|p| p.flex > 0.0).count();
        let mut seen_flex = 0usize;
        for plan in plans.iter_mut() {
            if plan.flex <= 0.0 {
                continue;
            }
            seen_flex += 1;
            let ideal = remaining as f64 * plan.flex / total_flex;
            let mut size = ideal.floor() as i32;
            if seen_flex == n {
                size = remaining - distributed;
            }
            distributed += size;
            plan.main = size.max(0);
        }
    }

    for (plan, &id) in plans.iter_mut().zip(flow.iter()) {
        let (child_style, kind, props) = child_style_and_node(inputs, id)?;
        if is_hidden(inputs, id, &child_style, &props) {
            continue;
        }
        let cross_value = match axis {
            Axis::Row => &child_style.height,
            Axis::Column => &child_style.width,
        };
        let cross_prop = match axis {
            Axis::Row => ConstraintProp::Height,
            Axis::Column => ConstraintProp::Width,
        };
        let margin_cross_total = plan.margin_cross_start + plan.margin_cross_end;
        let avail_cross = (content_cross - margin_cross_total).max(0);
        plan.cross = match child_style.align_override().unwrap_or(style.align) {
            Align::Stretch => resolve_size(inputs, id, cross_prop, cross_value, avail_cross, || avail_cross),
            _ => resolve_size(inputs, id, cross_prop, cross_value, avail_cross, || {
                let max_w = match axis {
                    Axis::Row => Some(avail_cross),
                    Axis::Column => None,
                };
                let (iw, ih) = intrinsic_size(inputs, kind, &props, max_w);
                match axis {
                    Axis::Row => ih,
                    Axis::Column => iw,
                }
            }),
        };
    }

    let used_main: i32 = plans
        .iter()
        .map(|p| p.main + p.margin_main_start + p.margin_main_end)
        .sum::<i32>()
        + gap_total;
    let leftover = (content_main - used_main).max(0);
    let (mut cursor, extra_between) = justify_offsets(style.justify, leftover, plans.len());

    let mut out = Vec::with_capacity(plans.len());
    let mut max_cross_extent = 0i32;
    let mut max_main_extent = 0i32;
    for (i, plan) in plans.iter().enumerate() {
        let (child_style, _kind, _props) = child_style_and_node(inputs, plan.instance_id)?;
        let margin_cross_total = plan.margin_cross_start + plan.margin_cross_end;
        let cross_offset = match child_style.align_override().unwrap_or(style.align) {
            Align::Start | Align::Stretch => plan.margin_cross_start,
            Align::Center => plan.margin_cross_start + (content_cross - margin_cross_total - plan.cross) / 2,
            Align::End => content_cross - plan.margin_cross_end - plan.cross,
        };
        cursor += plan.margin_main_start;
        let (cx, cy, cw, ch) = match axis {
            Axis::Row => (content.x + cursor, content.y + cross_offset, plan.main, plan.cross),
            Axis::Column => (content.x + cross_offset, content.y + cursor, plan.cross, plan.main),
        };
        let child_node = layout_node(inputs, plan.instance_id, cx, cy, cw.max(0), ch.max(0))?;
        max_main_extent = max_main_extent.max(cursor + plan.main + plan.margin_main_end);
        max_cross_extent = max_cross_extent.max(cross_offset + plan.cross + plan.margin_cross_end);
        out.push(child_node);
        cursor += plan.main + plan.margin_main_end;
        if i + 1 < plans.len() {
            cursor += style.gap + extra_between;
        }
    }

    for &id in &absolute {
        let (child_style, _kind, _props) = child_style_and_node(inputs, id)?;
        let PositionMode::Absolute { top, right, bottom, left } = child_style.position else {
            unreachable!()
        };
        let w = resolve_size(inputs, id, ConstraintProp::Width, &child_style.width, content.w, || 0);
        let h = resolve_size(inputs, id, ConstraintProp::Height, &child_style.height, content.h, || 0);
        let x = match (left, right) {
            (Some(l), _) => content.x + l.round() as i32,
            (None, Some(r)) => content.x + content.w - w - r.round() as i32,
            (None, None) => content.x,
        };
        let y = match (top, bottom) {
            (Some(t), _) => content.y + t.round() as i32,
            (None, Some(b)) => content.y + content.h - h - b.round() as i32,
            (None, None) => content.y,
        };
        out.push(layout_node(inputs, id, x, y, w.max(0), h.max(0))?);
    }

    let extent = match axis {
        Axis::Row => (max_main_extent, max_cross_extent),
        Axis::Column => (max_cross_extent, max_main_extent),
    };

    Ok((out, extent))
}

fn justify_offsets(justify: Justify, leftover: i32, count: usize) -> (i32, i32) {
    if count == 0 {
        return (0, 0);
    }
    match justify {
        Justify::Start => (0, 0),
        Justify::End => (leftover, 0),
        Justify::Center => (leftover / 2, 0),
        Justify::Between => {
            if count <= 1 {
                (0, 0)
            } else {
                (0, leftover / (count as i32 - 1))
            }
        }
        Justify::Around => {
            let each = leftover / count as i32;
            (each / 2, each)
        }
        Justify::Evenly => {
            let each = leftover / (count as i32 + 1);
            (each, each)
        }
    }
}

fn child_style_for(inputs: &LayoutInputs, id: u32) -> Result<Style, LayoutError> {
    let instance = inputs.registry.get(id).ok_or_else(|| LayoutError::InvalidProps {
        instance_id: id,
        prop: "kind",
        detail: "instance not found in registry".into(),
    })?;
    Style::parse(id, instance.vnode.kind, &instance.vnode.props)
}

fn child_style_and_node(inputs: &LayoutInputs, id: u32) -> Result<(Style, Kind, rezi_view::Props), LayoutError> {
    let instance = inputs.registry.get(id).ok_or_else(|| LayoutError::InvalidProps {
        instance_id: id,
        prop: "kind",
        detail: "instance not found in registry".into(),
    })?;
    let kind = instance.vnode.kind;
    let props = instance.vnode.props.clone();
    let style = Style::parse(id, kind, &props)?;
    Ok((style, kind, props))
}
