//! Binary drawlist encoding: the wire format the incremental renderer emits
//! and a terminal backend consumes. A drawlist is a self-contained,
//! versioned byte buffer — a 64-byte header, a stream of 4-byte-aligned
//! command records, and two interned byte tables (strings, blobs) so repeated
//! content is never duplicated within a frame.
//!
//! [`builder::DrawlistBuilder`] accumulates commands and produces the buffer;
//! [`parse::parse`] decodes one back into [`parse::DrawCmd`]s for testing and
//! for backends that want a structured view instead of re-deriving it from
//! raw bytes.

pub mod builder;
pub mod error;
pub mod header;
pub mod intern;
pub mod opcode;
pub mod parse;
pub mod style;

pub use builder::{BuilderConfig, DrawlistBuilder, TextRunSegment};
pub use error::{DrawlistError, ParseError};
pub use header::{HEADER_LEN, Header};
pub use opcode::{MAGIC, Opcode, VERSION};
pub use parse::{DrawCmd, ParsedDrawlist, parse};
pub use style::{Attrs, CursorShape, TextStyle, UnderlineStyle};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exceeding_max_cmd_count_enters_sticky_too_large() {
        let mut b = DrawlistBuilder::new(BuilderConfig { max_cmd_count: 2, ..BuilderConfig::default() });
        b.clear();
        b.clear();
        assert!(!b.is_failed());
        b.clear();
        assert!(b.is_failed());
        let err = b.build().unwrap_err();
        assert_eq!(err.code(), "ZRDL_TOO_LARGE");
    }

    #[test]
    fn exceeding_max_drawlist_bytes_enters_sticky_too_large() {
        let mut b = DrawlistBuilder::new(BuilderConfig { max_drawlist_bytes: 96, ..BuilderConfig::default() });
        for _ in 0..20 {
            b.fill_rect(0, 0, 1, 1, 0xff0000);
        }
        assert!(b.is_failed());
        assert_eq!(b.build().unwrap_err().code(), "ZRDL_TOO_LARGE");
    }

    #[test]
    fn exceeding_max_strings_enters_sticky_too_large() {
        let mut b = DrawlistBuilder::new(BuilderConfig { max_strings: 1, ..BuilderConfig::default() });
        b.draw_text(0, 0, "one", TextStyle::new());
        assert!(!b.is_failed());
        b.draw_text(0, 1, "two", TextStyle::new());
        assert!(b.is_failed());
        assert_eq!(b.build().unwrap_err().code(), "ZRDL_TOO_LARGE");
    }

    #[test]
    fn unbalanced_clip_stack_fails_at_build() {
        let mut b = DrawlistBuilder::default();
        b.push_clip(0, 0, 10, 10);
        let err = b.build().unwrap_err();
        assert_eq!(err.code(), "ZRDL_INVALID_OP");
    }

    #[test]
    fn pop_clip_without_push_is_invalid_op() {
        let mut b = DrawlistBuilder::default();
        b.pop_clip();
        assert!(b.is_failed());
        assert_eq!(b.build().unwrap_err().code(), "ZRDL_INVALID_OP");
    }

    #[test]
    fn balanced_clip_stack_builds_successfully() {
        let mut b = DrawlistBuilder::default();
        b.push_clip(0, 0, 10, 10);
        b.push_clip(1, 1, 5, 5);
        b.pop_clip();
        b.pop_clip();
        assert!(b.build().is_ok());
    }

    #[test]
    fn reset_clears_sticky_failure_and_clip_depth() {
        let mut b = DrawlistBuilder::new(BuilderConfig { max_cmd_count: 1, ..BuilderConfig::default() });
        b.clear();
        b.clear();
        assert!(b.is_failed());
        b.reset();
        assert!(!b.is_failed());
        assert_eq!(b.cmd_count(), 0);
        b.clear();
        assert!(b.build().is_ok());
    }

    #[test]
    fn reset_is_idempotent_across_many_frames() {
        let mut b = DrawlistBuilder::default();
        for frame in 0..128 {
            b.reset();
            b.clear();
            b.draw_text(0, 0, "frame", TextStyle::new());
            let bytes = b.build().unwrap();
            let parsed = parse(bytes).unwrap();
            assert_eq!(parsed.cmds.len(), 2, "frame {frame}");
            assert_eq!(parsed.header.strings_count, 1, "frame {frame}");
        }
    }

    #[test]
    fn round_trip_preserves_command_count_and_header_totals() {
        let mut b = DrawlistBuilder::default();
        b.clear();
        b.fill_rect(0, 0, 80, 24, 0x202020);
        b.push_clip(0, 0, 80, 24);
        b.draw_text(2, 2, "status", TextStyle::new().with_fg(0xffffff));
        b.pop_clip();
        let bytes = b.build().unwrap().to_vec();

        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.header.cmd_count, 5);
        assert_eq!(parsed.header.total_size as usize, bytes.len());
        assert_eq!(parsed.cmds.len(), 5);
    }

    #[test]
    fn negative_rect_dimension_is_invalid_op_when_validating() {
        let mut b = DrawlistBuilder::default();
        b.fill_rect(0, 0, -1, 5, 0);
        assert!(b.is_failed());
        assert_eq!(b.build().unwrap_err().code(), "ZRDL_INVALID_OP");
    }

    #[test]
    fn validate_params_disabled_lets_negative_rect_through() {
        let mut b = DrawlistBuilder::new(BuilderConfig { validate_params: false, ..BuilderConfig::default() });
        b.fill_rect(0, 0, -1, 5, 0);
        assert!(!b.is_failed());
        assert!(b.build().is_ok());
    }

    #[test]
    fn repeated_draw_text_of_same_string_dedupes_into_one_span() {
        let mut b = DrawlistBuilder::default();
        b.draw_text(0, 0, "same", TextStyle::new());
        b.draw_text(0, 1, "same", TextStyle::new());
        b.draw_text(0, 2, "different", TextStyle::new());
        let bytes = b.build().unwrap().to_vec();
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.header.strings_count, 2);
    }

    #[test]
    fn reuse_output_buffer_keeps_backing_allocation_across_builds() {
        let mut b = DrawlistBuilder::new(BuilderConfig { reuse_output_buffer: true, ..BuilderConfig::default() });
        b.clear();
        let first_ptr = b.build().unwrap().as_ptr();
        b.reset();
        b.clear();
        let second_ptr = b.build().unwrap().as_ptr();
        assert_eq!(first_ptr, second_ptr);
    }
}
