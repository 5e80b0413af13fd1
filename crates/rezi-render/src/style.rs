//! Resolves a [`rezi_view::Props`] bag into the [`rezi_drawlist::TextStyle`]
//! the builder needs. Colors are authored as `"#rrggbb"` hex strings or the
//! literal `"none"`; booleans map straight onto the attrs bitmask.

use rezi_drawlist::{Attrs, TextStyle, UnderlineStyle};
use rezi_view::Props;

fn parse_hex_color(s: &str) -> Option<u32> {
    let digits = s.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Reads `color`/`bg` as hex strings (absent or `"none"` means unset) and the
/// boolean attribute props (`bold`, `italic`, `underline`, `inverse`, `dim`,
/// `strikethrough`, `overline`, `blink`) into one resolved [`TextStyle`].
pub fn resolve_text_style(props: &Props) -> TextStyle {
    let mut style = TextStyle::new();

    if let Some(s) = props.get_str("color") {
        if let Some(rgb) = parse_hex_color(s) {
            style = style.with_fg(rgb);
        }
    }
    if let Some(s) = props.get_str("bg") {
        if let Some(rgb) = parse_hex_color(s) {
            style = style.with_bg(rgb);
        }
    }

    let mut attrs = Attrs::empty();
    attrs.set(Attrs::BOLD, props.get_bool("bold").unwrap_or(false));
    attrs.set(Attrs::ITALIC, props.get_bool("italic").unwrap_or(false));
    attrs.set(Attrs::INVERSE, props.get_bool("inverse").unwrap_or(false));
    attrs.set(Attrs::DIM, props.get_bool("dim").unwrap_or(false));
    attrs.set(Attrs::STRIKETHROUGH, props.get_bool("strikethrough").unwrap_or(false));
    attrs.set(Attrs::OVERLINE, props.get_bool("overline").unwrap_or(false));
    attrs.set(Attrs::BLINK, props.get_bool("blink").unwrap_or(false));
    style = style.with_attrs(attrs);

    let underline = match props.get_str("underline") {
        Some("single") => UnderlineStyle::Single,
        Some("double") => UnderlineStyle::Double,
        Some("dashed") => UnderlineStyle::Dashed,
        Some("dotted") => UnderlineStyle::Dotted,
        Some("curly") => UnderlineStyle::Curly,
        Some(_) | None if props.get_bool("underline") == Some(true) => UnderlineStyle::Single,
        _ => UnderlineStyle::None,
    };
    style.with_underline(underline)
}

/// A resolved focus-ring style: inverse video unless the theme overrides it
/// via `focusColor`/`focusBg` on the focused instance's own props.
pub fn resolve_focus_ring_style(props: &Props) -> TextStyle {
    let base = resolve_text_style(props);
    let fg = props.get_str("focusColor").and_then(parse_hex_color).unwrap_or(base.fg);
    let bg = props.get_str("focusBg").and_then(parse_hex_color).unwrap_or(base.bg);
    TextStyle::new().with_fg(fg).with_bg(bg).with_attrs(base.attrs | Attrs::INVERSE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_color_parses_into_fg() {
        let props = Props::new().with("color", "#ff00aa");
        let style = resolve_text_style(&props);
        assert_eq!(style.fg, 0xff00aa);
    }

    #[test]
    fn missing_color_leaves_fg_unset() {
        let props = Props::new();
        let style = resolve_text_style(&props);
        assert_eq!(style.fg, 0);
    }

    #[test]
    fn bold_prop_sets_bold_bit() {
        let props = Props::new().with("bold", true);
        let style = resolve_text_style(&props);
        assert!(style.attrs.contains(Attrs::BOLD));
    }

    #[test]
    fn curly_underline_degrades_to_underline_bit() {
        let props = Props::new().with("underline", "curly");
        let style = resolve_text_style(&props);
        assert!(style.attrs.contains(Attrs::UNDERLINE));
    }

    #[test]
    fn focus_ring_defaults_to_inverse_of_own_style() {
        let props = Props::new().with("color", "#112233");
        let ring = resolve_focus_ring_style(&props);
        assert!(ring.attrs.contains(Attrs::INVERSE));
        assert_eq!(ring.fg, 0x112233);
    }
}
