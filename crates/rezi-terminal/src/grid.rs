//! An in-memory cell grid mirroring what's currently on the real terminal.
//! A submitted drawlist is replayed onto a scratch copy of the previous
//! grid; the backend then diffs scratch against current cell-by-cell and
//! only writes what changed, the dirty-line cache §10.5 describes. This is
//! also what makes `blitRect` cheap here: it's a plain in-memory cell copy,
//! no real terminal scroll-region trick required for correctness (a
//! scroll-region shift is an orthogonal, opportunistic ANSI optimization the
//! writer can still choose to apply when a blit is a pure full-width
//! vertical shift).

use rezi_drawlist::{Attrs, DrawCmd, ParsedDrawlist};

use crate::error::TerminalError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    /// `None` renders as a blank space. `Some(s)` holds one grapheme
    /// cluster's text; a cluster wider than one column leaves its trailing
    /// columns as `continuation = true` placeholders so the diff never
    /// double-prints a wide glyph.
    pub grapheme: Option<Box<str>>,
    pub fg: u32,
    pub bg: u32,
    pub attrs: Attrs,
    pub continuation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    pub x: i32,
    pub y: i32,
    pub shape: u8,
    pub visible: bool,
    pub blink: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self { x: 0, y: 0, shape: 0, visible: false, blink: false }
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    pub cols: i32,
    pub rows: i32,
    cells: Vec<Cell>,
    pub cursor: CursorState,
}

#[derive(Debug, Clone, Copy, Default)]
struct ClipRect {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

impl ClipRect {
    fn intersect(&self, other: ClipRect) -> ClipRect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = (self.x + self.w).min(other.x + other.w);
        let bottom = (self.y + self.h).min(other.y + other.h);
        ClipRect { x, y, w: (right - x).max(0), h: (bottom - y).max(0) }
    }
}

impl Grid {
    pub fn new(cols: i32, rows: i32) -> Self {
        let cols = cols.max(0);
        let rows = rows.max(0);
        Self { cols, rows, cells: vec![Cell::default(); (cols * rows) as usize], cursor: CursorState::default() }
    }

    fn resize_blank(&mut self, cols: i32, rows: i32) {
        *self = Grid::new(cols, rows);
    }

    fn idx(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.cols || y >= self.rows {
            return None;
        }
        Some((y * self.cols + x) as usize)
    }

    fn set_blank(&mut self, x: i32, y: i32, bg: u32) {
        if let Some(i) = self.idx(x, y) {
            self.cells[i] = Cell { grapheme: None, fg: 0, bg, attrs: Attrs::empty(), continuation: false };
        }
    }

    fn set_glyph(&mut self, x: i32, y: i32, grapheme: &str, width: usize, fg: u32, bg: u32, attrs: Attrs) {
        if let Some(i) = self.idx(x, y) {
            self.cells[i] = Cell { grapheme: Some(grapheme.into()), fg, bg, attrs, continuation: false };
        }
        for dx in 1..width as i32 {
            if let Some(i) = self.idx(x + dx, y) {
                self.cells[i] = Cell { grapheme: None, fg, bg, attrs, continuation: true };
            }
        }
    }

    fn fill_rect(&mut self, rect: ClipRect, color: u32) {
        for y in rect.y..rect.y + rect.h {
            for x in rect.x..rect.x + rect.w {
                self.set_blank(x, y, color);
            }
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, fg: u32, bg: u32, attrs: Attrs, clip: ClipRect) {
        let mut col = x;
        for g in rezi_text::grapheme::iter(text) {
            let w = rezi_text::egc_width(g).max(1);
            let cell_rect = ClipRect { x: col, y, w: w as i32, h: 1 };
            if cell_rect.intersect(clip).w > 0 {
                self.set_glyph(col, y, g, w, fg, bg, attrs);
            }
            col += w as i32;
        }
    }

    fn blit(&mut self, src_x: i32, src_y: i32, w: i32, h: i32, dst_x: i32, dst_y: i32) {
        let mut snapshot = Vec::with_capacity((w.max(0) * h.max(0)) as usize);
        for y in 0..h {
            for x in 0..w {
                snapshot.push(self.idx(src_x + x, src_y + y).map(|i| self.cells[i].clone()));
            }
        }
        for y in 0..h {
            for x in 0..w {
                if let Some(cell) = snapshot[(y * w + x) as usize].clone() {
                    if let Some(i) = self.idx(dst_x + x, dst_y + y) {
                        self.cells[i] = cell;
                    }
                }
            }
        }
    }

    /// Replays every op in `parsed` onto this grid in place, respecting the
    /// clip stack the builder guaranteed is balanced. `Clear`/`ClearTo`
    /// reset the whole grid (and, for `ClearTo`, its dimensions) before the
    /// remaining ops apply.
    pub fn apply(&mut self, parsed: &ParsedDrawlist) -> Result<(), TerminalError> {
        let mut clip_stack: Vec<ClipRect> = Vec::new();
        let full = |g: &Grid| ClipRect { x: 0, y: 0, w: g.cols, h: g.rows };

        for cmd in &parsed.cmds {
            let current_clip = clip_stack.last().copied().unwrap_or_else(|| full(self));
            match *cmd {
                DrawCmd::Clear => {
                    let (cols, rows) = (self.cols, self.rows);
                    self.resize_blank(cols, rows);
                }
                DrawCmd::ClearTo { cols, rows } => self.resize_blank(cols as i32, rows as i32),
                DrawCmd::FillRect { x, y, w, h, color } => {
                    self.fill_rect(ClipRect { x, y, w, h }.intersect(current_clip), color);
                }
                DrawCmd::PushClip { x, y, w, h } => {
                    clip_stack.push(ClipRect { x, y, w, h }.intersect(current_clip));
                }
                DrawCmd::PopClip => {
                    clip_stack.pop();
                }
                DrawCmd::DrawText { x, y, string_index, fg, bg, attrs } => {
                    let text = parsed.string_at(string_index)?;
                    self.draw_text(x, y, text, fg, bg, attrs, current_clip);
                }
                DrawCmd::DrawTextRun { x, y, blob_index } => {
                    let blob = parsed.blob_at(blob_index)?;
                    self.apply_text_run(x, y, blob, parsed, current_clip)?;
                }
                DrawCmd::SetCursor { x, y, shape, visible, blink } => {
                    self.cursor = CursorState { x, y, shape, visible, blink };
                }
                DrawCmd::HideCursor => {
                    self.cursor.visible = false;
                }
                DrawCmd::SetLink { .. } => {
                    // OSC 8 hyperlinks aren't modeled by this cell grid; a
                    // crossterm-based writer has no portable primitive for
                    // it either, so this is a deliberate no-op.
                }
                DrawCmd::BlitRect { src_x, src_y, w, h, dst_x, dst_y } => {
                    self.blit(src_x, src_y, w, h, dst_x, dst_y);
                }
                DrawCmd::FreeString { .. } | DrawCmd::FreeBlob { .. } => {}
                DrawCmd::DrawCanvas { .. } | DrawCmd::DrawImage { .. } => {
                    tracing::debug!("canvas/image ops have no plain-ANSI rendering; skipped");
                }
            }
        }
        Ok(())
    }

    fn apply_text_run(&mut self, x: i32, y: i32, blob: &[u8], parsed: &ParsedDrawlist, clip: ClipRect) -> Result<(), TerminalError> {
        if blob.len() < 4 {
            return Ok(());
        }
        let count = u32::from_le_bytes(blob[0..4].try_into().unwrap()) as usize;
        let mut col = x;
        for i in 0..count {
            let off = 4 + i * 40;
            if off + 16 > blob.len() {
                break;
            }
            let fg = u32::from_le_bytes(blob[off..off + 4].try_into().unwrap());
            let bg = u32::from_le_bytes(blob[off + 4..off + 8].try_into().unwrap());
            let attrs = Attrs::from_bits_truncate(u32::from_le_bytes(blob[off + 8..off + 12].try_into().unwrap()));
            let string_index = u32::from_le_bytes(blob[off + 12..off + 16].try_into().unwrap());
            let text = parsed.string_at(string_index)?;
            self.draw_text(col, y, text, fg, bg, attrs, clip);
            col += rezi_text::str_width(text) as i32;
        }
        Ok(())
    }

    /// Yields `(x, y, cell)` for every cell that differs between `self`
    /// (the frame about to go on screen) and `prev` (what's there now).
    pub fn diff<'a>(&'a self, prev: &'a Grid) -> impl Iterator<Item = (i32, i32, &'a Cell)> + 'a {
        let cols = self.cols;
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            let same_dims = prev.cols == self.cols && prev.rows == self.rows;
            let changed = !same_dims || prev.cells.get(i) != Some(cell);
            if changed && !cell.continuation {
                let x = i as i32 % cols;
                let y = i as i32 / cols;
                Some((x, y, cell))
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rezi_drawlist::{BuilderConfig, DrawlistBuilder, parse};

    #[test]
    fn fill_then_text_lands_in_the_grid() {
        let mut b = DrawlistBuilder::new(BuilderConfig::default());
        b.clear_to(10, 2);
        b.fill_rect(0, 0, 10, 2, 0x202020);
        b.draw_text(1, 0, "hi", rezi_drawlist::TextStyle::new().with_fg(0xffffff));
        let bytes = b.build().unwrap().to_vec();
        let parsed = parse(&bytes).unwrap();

        let mut grid = Grid::new(10, 2);
        grid.apply(&parsed).unwrap();
        let h = grid.cells[(0 * 10 + 1) as usize].grapheme.clone();
        assert_eq!(h.as_deref(), Some("h"));
    }

    #[test]
    fn clip_prevents_writes_outside_pushed_rect() {
        let mut b = DrawlistBuilder::new(BuilderConfig::default());
        b.clear_to(10, 2);
        b.push_clip(0, 0, 3, 1);
        b.draw_text(0, 0, "hello", rezi_drawlist::TextStyle::new());
        b.pop_clip();
        let bytes = b.build().unwrap().to_vec();
        let parsed = parse(&bytes).unwrap();

        let mut grid = Grid::new(10, 2);
        grid.apply(&parsed).unwrap();
        assert!(grid.cells[3].grapheme.is_none(), "text clipped to 3 columns must not spill to column 3");
    }

    #[test]
    fn blit_copies_cells_without_touching_source() {
        let mut grid = Grid::new(5, 1);
        grid.set_glyph(0, 0, "x", 1, 0xffffff, 0, Attrs::empty());
        grid.blit(0, 0, 1, 1, 2, 0);
        assert_eq!(grid.cells[2].grapheme.as_deref(), Some("x"));
        assert_eq!(grid.cells[0].grapheme.as_deref(), Some("x"), "blit must not clear its own source");
    }

    #[test]
    fn diff_reports_only_changed_cells() {
        let a = Grid::new(3, 1);
        let mut b = Grid::new(3, 1);
        b.set_glyph(1, 0, "x", 1, 0, 0, Attrs::empty());
        let changed: Vec<_> = b.diff(&a).collect();
        assert_eq!(changed.len(), 1);
        assert_eq!((changed[0].0, changed[0].1), (1, 0));
    }
}
