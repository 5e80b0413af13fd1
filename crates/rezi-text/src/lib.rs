//! The text measurement engine shared between layout's intrinsic sizing and
//! the renderer's cell emission (§4.D/§10.4): a single grapheme-cluster
//! segmentation plus East-Asian-width classifier, so layout and drawing can
//! never disagree about how many cells a string occupies.

pub mod measure;
pub mod segment;
pub mod width;
#[cfg(feature = "term-probe")]
pub mod width_probe;

pub use measure::str_width;
pub use segment::{Segment, normalize_and_segment};
pub use width::egc_width;

/// Grapheme iteration/classification helpers built directly on [`width::egc_width`].
pub mod grapheme {
    use crate::egc_width;
    use unicode_segmentation::UnicodeSegmentation;

    /// Iterate grapheme clusters in a line.
    pub fn iter(line: &str) -> impl Iterator<Item = &str> {
        line.graphemes(true)
    }

    /// Previous grapheme boundary (returns 0 if already at or below 1st boundary).
    pub fn prev_boundary(line: &str, byte: usize) -> usize {
        if byte == 0 || byte > line.len() {
            return 0;
        }
        let mut last = 0;
        for (idx, _) in line.grapheme_indices(true) {
            if idx >= byte {
                break;
            }
            last = idx;
        }
        last
    }

    /// Next grapheme boundary (returns line.len() if at or beyond end).
    pub fn next_boundary(line: &str, byte: usize) -> usize {
        if byte >= line.len() {
            return line.len();
        }
        for (idx, _) in line.grapheme_indices(true) {
            if idx > byte {
                return idx;
            }
        }
        line.len()
    }

    /// Compute visual column (terminal cells) up to (but not including) byte offset.
    pub fn visual_col(line: &str, byte: usize) -> usize {
        let mut col = 0;
        for (idx, g) in line.grapheme_indices(true) {
            if idx >= byte {
                break;
            }
            col += egc_width(g) as usize;
        }
        col
    }

    /// Width in terminal cells of this grapheme cluster.
    pub fn cluster_width(g: &str) -> usize {
        egc_width(g) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unicode_segmentation::UnicodeSegmentation;

    #[test]
    fn grapheme_basic_emoji() {
        let s = "a😀b";
        let bytes_a = 0;
        let bytes_emoji = grapheme::next_boundary(s, grapheme::next_boundary(s, bytes_a));
        assert_eq!(
            grapheme::prev_boundary(s, bytes_emoji),
            grapheme::next_boundary(s, bytes_a)
        );
        let vcol_emoji = grapheme::visual_col(s, bytes_emoji);
        assert!(vcol_emoji >= 1);
    }

    #[test]
    fn grapheme_combining_mark() {
        let s = "e\u{0301}"; // 'e' + combining acute
        let nb = grapheme::next_boundary(s, 0);
        assert_eq!(nb, s.len());
        assert_eq!(grapheme::prev_boundary(s, nb), 0);
    }

    #[test]
    fn grapheme_cjk() {
        let s = "漢字";
        let first = grapheme::next_boundary(s, 0);
        let second = grapheme::next_boundary(s, first);
        assert!(second <= s.len());
        assert_eq!(grapheme::prev_boundary(s, second), first);
    }

    #[test]
    fn visual_col_mixed_sequences() {
        let s = "a😀e\u{0301}漢字Z";
        let mut b = 0;
        let mut last_col = 0;
        while b < s.len() {
            let next = grapheme::next_boundary(s, b);
            let col = grapheme::visual_col(s, next);
            assert!(col >= last_col, "visual column must be non-decreasing");
            last_col = col;
            b = next;
        }
        let clusters = s.graphemes(true).count();
        let _ = clusters;
    }
}
