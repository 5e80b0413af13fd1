//! Batched ANSI writer: groups a frame's worth of cell updates into queued
//! crossterm commands and flushes them in one `stdout` write, the same
//! batching shape the corpus's render engine uses to keep command count
//! well below cell count.

use std::io::Write;

use crossterm::queue;
use crossterm::style::{Attribute, Color, SetAttribute, SetBackgroundColor, SetForegroundColor};
use crossterm::{cursor::MoveTo, style::Print};
use rezi_drawlist::Attrs;

use crate::error::TerminalError;
use crate::grid::Cell;

fn rgb(color: u32) -> Color {
    Color::Rgb { r: ((color >> 16) & 0xff) as u8, g: ((color >> 8) & 0xff) as u8, b: (color & 0xff) as u8 }
}

/// Current SGR state so the writer only emits a `SetForegroundColor`/
/// `SetAttribute` when a cell actually changes style, instead of resetting
/// before every glyph.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct SgrState {
    fg: u32,
    bg: u32,
    attrs: Attrs,
}

pub struct BatchWriter<W: Write> {
    out: W,
    cursor: Option<(u16, u16)>,
    sgr: SgrState,
    pub cells_written: u64,
}

impl<W: Write> BatchWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, cursor: None, sgr: SgrState::default(), cells_written: 0 }
    }

    fn move_if_needed(&mut self, x: u16, y: u16) -> Result<(), TerminalError> {
        if self.cursor != Some((x, y)) {
            queue!(self.out, MoveTo(x, y))?;
            self.cursor = Some((x, y));
        }
        Ok(())
    }

    fn apply_sgr_if_needed(&mut self, fg: u32, bg: u32, attrs: Attrs) -> Result<(), TerminalError> {
        if self.sgr.attrs != attrs {
            queue!(self.out, SetAttribute(Attribute::Reset))?;
            if attrs.contains(Attrs::BOLD) {
                queue!(self.out, SetAttribute(Attribute::Bold))?;
            }
            if attrs.contains(Attrs::ITALIC) {
                queue!(self.out, SetAttribute(Attribute::Italic))?;
            }
            if attrs.contains(Attrs::UNDERLINE) {
                queue!(self.out, SetAttribute(Attribute::Underlined))?;
            }
            if attrs.contains(Attrs::INVERSE) {
                queue!(self.out, SetAttribute(Attribute::Reverse))?;
            }
            if attrs.contains(Attrs::DIM) {
                queue!(self.out, SetAttribute(Attribute::Dim))?;
            }
            if attrs.contains(Attrs::STRIKETHROUGH) {
                queue!(self.out, SetAttribute(Attribute::CrossedOut))?;
            }
            if attrs.contains(Attrs::BLINK) {
                queue!(self.out, SetAttribute(Attribute::SlowBlink))?;
            }
            // Overline has no crossterm::Attribute mapping; degraded silently,
            // matching the wider style layer's documented attr-degradation policy.
            self.sgr = SgrState { fg: 0, bg: 0, attrs };
        }
        if self.sgr.fg != fg {
            queue!(self.out, SetForegroundColor(rgb(fg)))?;
            self.sgr.fg = fg;
        }
        if self.sgr.bg != bg {
            queue!(self.out, SetBackgroundColor(rgb(bg)))?;
            self.sgr.bg = bg;
        }
        Ok(())
    }

    /// Writes one changed cell at `(x, y)`.
    pub fn put_cell(&mut self, x: i32, y: i32, cell: &Cell) -> Result<(), TerminalError> {
        if x < 0 || y < 0 || x > u16::MAX as i32 || y > u16::MAX as i32 {
            return Ok(());
        }
        self.move_if_needed(x as u16, y as u16)?;
        self.apply_sgr_if_needed(cell.fg, cell.bg, cell.attrs)?;
        let text = cell.grapheme.as_deref().unwrap_or(" ");
        queue!(self.out, Print(text))?;
        self.cursor = Some(((x as u16).saturating_add(1), y as u16));
        self.cells_written += 1;
        Ok(())
    }

    pub fn set_real_cursor(&mut self, x: i32, y: i32, visible: bool) -> Result<(), TerminalError> {
        use crossterm::cursor::{Hide, Show};
        if visible && x >= 0 && y >= 0 && x <= u16::MAX as i32 && y <= u16::MAX as i32 {
            queue!(self.out, MoveTo(x as u16, y as u16), Show)?;
        } else {
            queue!(self.out, Hide)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<u64, TerminalError> {
        queue!(self.out, SetAttribute(Attribute::Reset))?;
        self.out.flush()?;
        Ok(self.cells_written)
    }
}
