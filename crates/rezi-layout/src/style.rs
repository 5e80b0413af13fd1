use rezi_view::{ConstrainedValue, Kind, PropValue, Props, SpacingScale};

use crate::error::LayoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Start,
    Center,
    End,
    Stretch,
}

impl Align {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "start" => Align::Start,
            "center" => Align::Center,
            "end" => Align::End,
            "stretch" => Align::Stretch,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    Start,
    End,
    Center,
    Between,
    Around,
    Evenly,
}

impl Justify {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "start" => Justify::Start,
            "end" => Justify::End,
            "center" => Justify::Center,
            "between" => Justify::Between,
            "around" => Justify::Around,
            "evenly" => Justify::Evenly,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    Visible,
    Hidden,
    Scroll,
}

impl Overflow {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "visible" => Overflow::Visible,
            "hidden" => Overflow::Hidden,
            "scroll" => Overflow::Scroll,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sides {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BorderSides {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl BorderSides {
    pub fn any(self) -> bool {
        self.top || self.right || self.bottom || self.left
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionMode {
    Static,
    Absolute {
        top: Option<f64>,
        right: Option<f64>,
        bottom: Option<f64>,
        left: Option<f64>,
    },
}

/// Fully parsed/validated styling for one instance, read from its `Props`.
/// Size-constrained slots (`width`, `height`, …) stay as `ConstrainedValue`
/// so the layout engine can resolve them against content dimensions,
/// intrinsic measurement, or a constraint-graph result.
#[derive(Debug, Clone)]
pub struct Style {
    pub axis: Axis,
    pub gap: i32,
    pub align: Align,
    pub justify: Justify,
    pub padding: Sides,
    pub margin: Sides,
    pub border: BorderSides,
    pub flex: f64,
    pub position: PositionMode,
    pub aspect_ratio: Option<f64>,
    pub overflow: Overflow,
    pub scroll_top: i32,
    pub scroll_left: i32,
    pub width: Option<ConstrainedValue>,
    pub height: Option<ConstrainedValue>,
    pub min_width: Option<ConstrainedValue>,
    pub max_width: Option<ConstrainedValue>,
    pub min_height: Option<ConstrainedValue>,
    pub max_height: Option<ConstrainedValue>,
    pub align_self: Option<Align>,
}

impl Style {
    /// A child's own cross-axis alignment override (`alignSelf`), read by the
    /// parent stack in place of its own `align` when set.
    pub fn align_override(&self) -> Option<Align> {
        self.align_self
    }
}

fn cells_of(instance_id: u32, prop: &'static str, value: &ConstrainedValue) -> Result<i32, LayoutError> {
    Ok(match value {
        ConstrainedValue::Int(n) => *n,
        ConstrainedValue::Spacing(s) => s.cells(),
        ConstrainedValue::Auto | ConstrainedValue::Full => {
            return Err(LayoutError::InvalidProps {
                instance_id,
                prop,
                detail: "spacing slots accept int/spacing-scale only".into(),
            });
        }
        ConstrainedValue::Percent(_) | ConstrainedValue::Expr(_) => {
            return Err(LayoutError::InvalidProps {
                instance_id,
                prop,
                detail: "spacing slots do not accept percent/expression values".into(),
            });
        }
    })
}

fn get_spacing_shorthand(
    instance_id: u32,
    props: &Props,
    name: &'static str,
) -> Result<Option<i32>, LayoutError> {
    match props.get_constrained(name) {
        Some(v) => Ok(Some(cells_of(instance_id, name, v)?)),
        None => Ok(None),
    }
}

/// Resolves the `p, px, py, pt, pr, pb, pl` shorthand family into concrete
/// per-side cell counts. More specific slots (side > axis > `p`) win.
fn resolve_sides(
    instance_id: u32,
    props: &Props,
    base: &'static str,
    x: &'static str,
    y: &'static str,
    top: &'static str,
    right: &'static str,
    bottom: &'static str,
    left: &'static str,
) -> Result<Sides, LayoutError> {
    let p = get_spacing_shorthand(instance_id, props, base)?.unwrap_or(0);
    let px = get_spacing_shorthand(instance_id, props, x)?.unwrap_or(p);
    let py = get_spacing_shorthand(instance_id, props, y)?.unwrap_or(p);
    Ok(Sides {
        top: get_spacing_shorthand(instance_id, props, top)?.unwrap_or(py),
        right: get_spacing_shorthand(instance_id, props, right)?.unwrap_or(px),
        bottom: get_spacing_shorthand(instance_id, props, bottom)?.unwrap_or(py),
        left: get_spacing_shorthand(instance_id, props, left)?.unwrap_or(px),
    })
}

fn parse_absolute_anchor(props: &Props, name: &str) -> Option<f64> {
    match props.get(name) {
        Some(PropValue::Int(n)) => Some(*n as f64),
        Some(PropValue::Float(f)) => Some(*f),
        Some(PropValue::Constrained(ConstrainedValue::Int(n))) => Some(*n as f64),
        Some(PropValue::Constrained(ConstrainedValue::Percent(_))) => None,
        _ => None,
    }
}

impl Style {
    pub fn parse(instance_id: u32, kind: Kind, props: &Props) -> Result<Style, LayoutError> {
        let axis = match kind {
            Kind::Row => Axis::Row,
            _ => Axis::Column,
        };

        let align = match props.get_str("align") {
            Some(s) => Align::parse(s).ok_or_else(|| LayoutError::InvalidProps {
                instance_id,
                prop: "align",
                detail: format!("unknown align value `{s}`"),
            })?,
            None => Align::Stretch,
        };

        let justify = match props.get_str("justify") {
            Some(s) => Justify::parse(s).ok_or_else(|| LayoutError::InvalidProps {
                instance_id,
                prop: "justify",
                detail: format!("unknown justify value `{s}`"),
            })?,
            None => Justify::Start,
        };

        let overflow = match props.get_str("overflow") {
            Some(s) => Overflow::parse(s).ok_or_else(|| LayoutError::InvalidProps {
                instance_id,
                prop: "overflow",
                detail: format!("unknown overflow value `{s}`"),
            })?,
            None => Overflow::Visible,
        };

        let gap = get_spacing_shorthand(instance_id, props, "gap")?.unwrap_or(0);
        if gap < 0 {
            return Err(LayoutError::InvalidProps {
                instance_id,
                prop: "gap",
                detail: "gap must be non-negative".into(),
            });
        }

        let padding = resolve_sides(instance_id, props, "p", "px", "py", "pt", "pr", "pb", "pl")?;
        let margin = resolve_sides(
            instance_id,
            props,
            "m",
            "mx",
            "my",
            "mt",
            "mr",
            "mb",
            "ml",
        )?;

        let border = BorderSides {
            top: props.get_bool("borderTop").unwrap_or(false),
            right: props.get_bool("borderRight").unwrap_or(false),
            bottom: props.get_bool("borderBottom").unwrap_or(false),
            left: props.get_bool("borderLeft").unwrap_or(false),
        };

        let flex = match props.get("flex") {
            Some(PropValue::Int(n)) => *n as f64,
            Some(PropValue::Float(f)) => *f,
            Some(PropValue::Constrained(ConstrainedValue::Int(n))) => *n as f64,
            None => 0.0,
            _ => {
                return Err(LayoutError::InvalidProps {
                    instance_id,
                    prop: "flex",
                    detail: "flex must be numeric".into(),
                });
            }
        };
        if flex < 0.0 {
            return Err(LayoutError::InvalidProps {
                instance_id,
                prop: "flex",
                detail: "flex must be non-negative".into(),
            });
        }

        let position = match props.get_str("position") {
            Some("absolute") => PositionMode::Absolute {
                top: parse_absolute_anchor(props, "top"),
                right: parse_absolute_anchor(props, "right"),
                bottom: parse_absolute_anchor(props, "bottom"),
                left: parse_absolute_anchor(props, "left"),
            },
            Some("static") | None => PositionMode::Static,
            Some(other) => {
                return Err(LayoutError::InvalidProps {
                    instance_id,
                    prop: "position",
                    detail: format!("unknown position value `{other}`"),
                });
            }
        };

        let aspect_ratio = match props.get("aspectRatio") {
            Some(PropValue::Float(f)) if *f > 0.0 => Some(*f),
            Some(PropValue::Int(n)) if *n > 0 => Some(*n as f64),
            None => None,
            _ => {
                return Err(LayoutError::InvalidProps {
                    instance_id,
                    prop: "aspectRatio",
                    detail: "aspectRatio must be a positive number".into(),
                });
            }
        };

        let align_self = match props.get_str("alignSelf") {
            Some(s) => Some(Align::parse(s).ok_or_else(|| LayoutError::InvalidProps {
                instance_id,
                prop: "alignSelf",
                detail: format!("unknown alignSelf value `{s}`"),
            })?),
            None => None,
        };

        let scroll_top = props.get_int("scrollTop").unwrap_or(0).max(0);
        let scroll_left = props.get_int("scrollLeft").unwrap_or(0).max(0);

        Ok(Style {
            axis,
            gap,
            align,
            justify,
            padding,
            margin,
            border,
            flex,
            position,
            aspect_ratio,
            overflow,
            scroll_top,
            scroll_left,
            width: props.get_constrained("width").cloned(),
            height: props.get_constrained("height").cloned(),
            min_width: props.get_constrained("minWidth").cloned(),
            max_width: props.get_constrained("maxWidth").cloned(),
            min_height: props.get_constrained("minHeight").cloned(),
            max_height: props.get_constrained("maxHeight").cloned(),
            align_self,
        })
    }

    pub fn padding_main(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Row => self.padding.left + self.padding.right,
            Axis::Column => self.padding.top + self.padding.bottom,
        }
    }

    pub fn border_main(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Row => {
                (self.border.left as i32) + (self.border.right as i32)
            }
            Axis::Column => {
                (self.border.top as i32) + (self.border.bottom as i32)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rezi_view::Kind;

    #[test]
    fn defaults_when_no_style_props_set() {
        let style = Style::parse(1, Kind::Box, &Props::new()).unwrap();
        assert_eq!(style.align, Align::Stretch);
        assert_eq!(style.justify, Justify::Start);
        assert_eq!(style.overflow, Overflow::Visible);
        assert_eq!(style.gap, 0);
    }

    #[test]
    fn padding_shorthand_resolves_specific_over_general() {
        let props = Props::new()
            .with_constrained("p", ConstrainedValue::Int(2))
            .with_constrained("pt", ConstrainedValue::Int(5));
        let style = Style::parse(1, Kind::Box, &props).unwrap();
        assert_eq!(style.padding.top, 5);
        assert_eq!(style.padding.left, 2);
        assert_eq!(style.padding.right, 2);
        assert_eq!(style.padding.bottom, 2);
    }

    #[test]
    fn invalid_align_is_rejected() {
        let props = Props::new().with("align", "diagonal");
        let err = Style::parse(1, Kind::Box, &props).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidProps { prop: "align", .. }));
    }

    #[test]
    fn negative_gap_is_rejected() {
        let props = Props::new().with_constrained("gap", ConstrainedValue::Int(-1));
        let err = Style::parse(1, Kind::Box, &props).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidProps { prop: "gap", .. }));
    }
}
