//! Terminal capability probing (§6 `getCaps`).

bitflags::bitflags! {
    /// Which SGR attribute bits (§4.F `Attrs`) this terminal is expected to
    /// render distinctly rather than silently dropping or aliasing to
    /// another attribute.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SgrMask: u32 {
        const BOLD          = 0b0000_0001;
        const ITALIC        = 0b0000_0010;
        const UNDERLINE     = 0b0000_0100;
        const INVERSE       = 0b0000_1000;
        const DIM           = 0b0001_0000;
        const STRIKETHROUGH = 0b0010_0000;
        const OVERLINE      = 0b0100_0000;
        const BLINK         = 0b1000_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    Ansi16,
    Ansi256,
    TrueColor,
}

/// Everything `requestFrame`/the demo binary needs to know about the sink
/// before it starts submitting drawlists (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalCaps {
    pub color_depth: ColorDepth,
    pub mouse: bool,
    pub paste_bracketing: bool,
    pub focus_events: bool,
    pub synchronized_update: bool,
    pub scroll_region: bool,
    pub cursor_shape: bool,
    pub sgr_mask: SgrMask,
}

impl TerminalCaps {
    /// Breadth-first detection: trusts `COLORTERM`/`TERM` for color depth
    /// and otherwise assumes the common modern-terminal feature set
    /// (crossterm enables these unconditionally on most emulators). A
    /// future revision can replace this with an actual query/response probe
    /// (DA1/XTGETTCAP) without changing the struct's shape.
    pub fn detect() -> Self {
        let color_depth = match std::env::var("COLORTERM").as_deref() {
            Ok("truecolor") | Ok("24bit") => ColorDepth::TrueColor,
            _ => match std::env::var("TERM").as_deref() {
                Ok(term) if term.contains("256color") => ColorDepth::Ansi256,
                Ok(term) if term == "dumb" => ColorDepth::Ansi16,
                _ => ColorDepth::Ansi256,
            },
        };

        Self {
            color_depth,
            mouse: true,
            paste_bracketing: true,
            focus_events: true,
            synchronized_update: false,
            scroll_region: true,
            cursor_shape: true,
            sgr_mask: SgrMask::all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumb_term_is_ansi16() {
        // SAFETY: single-threaded test process; no other test reads these vars concurrently.
        unsafe {
            std::env::remove_var("COLORTERM");
            std::env::set_var("TERM", "dumb");
        }
        assert_eq!(TerminalCaps::detect().color_depth, ColorDepth::Ansi16);
        unsafe {
            std::env::remove_var("TERM");
        }
    }

    #[test]
    fn truecolor_env_wins_over_term() {
        unsafe {
            std::env::set_var("COLORTERM", "truecolor");
            std::env::set_var("TERM", "xterm-256color");
        }
        assert_eq!(TerminalCaps::detect().color_depth, ColorDepth::TrueColor);
        unsafe {
            std::env::remove_var("COLORTERM");
            std::env::remove_var("TERM");
        }
    }
}
