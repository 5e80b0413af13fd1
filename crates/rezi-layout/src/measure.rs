/// Intrinsic measurement contract for leaf content (currently: text leaves).
/// The layout engine calls this exactly where the renderer's cell emission
/// calls the equivalent width function (`rezi_text::str_width`), so layout
/// and drawing never independently drift (§4.D/§9).
pub trait TextMeasure {
    /// Returns the intrinsic (width, height) in cells for `content`, given an
    /// optional wrapping width constraint.
    fn measure(&self, content: &str, max_width: Option<i32>) -> (i32, i32);
}

/// The engine's default measurer: single-line width via [`rezi_text::str_width`];
/// wraps into multiple lines when `max_width` is supplied and exceeded.
pub struct DefaultTextMeasure;

impl TextMeasure for DefaultTextMeasure {
    fn measure(&self, content: &str, max_width: Option<i32>) -> (i32, i32) {
        match max_width {
            Some(w) if w > 0 => {
                let lines = rezi_text::measure::wrap(content, w as u16);
                let width = lines
                    .iter()
                    .map(|l| rezi_text::str_width(l) as i32)
                    .max()
                    .unwrap_or(0);
                (width.min(w), lines.len() as i32)
            }
            _ => (rezi_text::str_width(content) as i32, 1),
        }
    }
}
