use bitflags::bitflags;

bitflags! {
    /// Eight style booleans packed into the `attrs` field of `DRAW_TEXT` and
    /// each `DRAW_TEXT_RUN` segment, in the fixed bit order the wire format
    /// specifies.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attrs: u32 {
        const BOLD          = 0b0000_0001;
        const ITALIC         = 0b0000_0010;
        const UNDERLINE       = 0b0000_0100;
        const INVERSE         = 0b0000_1000;
        const DIM             = 0b0001_0000;
        const STRIKETHROUGH   = 0b0010_0000;
        const OVERLINE        = 0b0100_0000;
        const BLINK           = 0b1000_0000;
    }
}

/// Underline-style variants a caller may request; everything but `None`
/// degrades to the plain `UNDERLINE` attribute bit until the protocol
/// version grows a dedicated opcode carrying the distinct styles (§4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    Double,
    Dashed,
    Dotted,
    Curly,
}

impl UnderlineStyle {
    pub fn degrade_to_attr(self) -> Attrs {
        match self {
            UnderlineStyle::None => Attrs::empty(),
            _ => Attrs::UNDERLINE,
        }
    }
}

/// A resolved text style: 24-bit packed RGB colors (0 means "unset") plus
/// the attribute bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub fg: u32,
    pub bg: u32,
    pub attrs: Attrs,
}

impl TextStyle {
    pub const fn new() -> Self {
        Self {
            fg: 0,
            bg: 0,
            attrs: Attrs::empty(),
        }
    }

    pub fn with_fg(mut self, rgb: u32) -> Self {
        self.fg = rgb & 0x00FF_FFFF;
        self
    }

    pub fn with_bg(mut self, rgb: u32) -> Self {
        self.bg = rgb & 0x00FF_FFFF;
        self
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_underline(mut self, style: UnderlineStyle) -> Self {
        self.attrs |= style.degrade_to_attr();
        self
    }
}

/// Terminal cursor shapes carried by `SET_CURSOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CursorShape {
    Block = 0,
    Underline = 1,
    Bar = 2,
}

impl CursorShape {
    pub fn from_u8(v: u8) -> Option<CursorShape> {
        Some(match v {
            0 => CursorShape::Block,
            1 => CursorShape::Underline,
            2 => CursorShape::Bar,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_256_attr_masks_round_trip_through_bits() {
        for mask in 0u32..=255 {
            let attrs = Attrs::from_bits_truncate(mask);
            assert_eq!(attrs.bits(), mask);
        }
    }

    #[test]
    fn underline_none_leaves_bit_clear() {
        let style = TextStyle::new().with_underline(UnderlineStyle::None);
        assert!(!style.attrs.contains(Attrs::UNDERLINE));
    }

    #[test]
    fn underline_curly_degrades_to_underline_bit() {
        let style = TextStyle::new().with_underline(UnderlineStyle::Curly);
        assert!(style.attrs.contains(Attrs::UNDERLINE));
    }
}
