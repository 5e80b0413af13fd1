use crate::error::ParseError;
use crate::header::Header;
use crate::opcode::Opcode;
use crate::style::Attrs;

/// A decoded command. String/blob payloads are carried as table indices;
/// resolve them against the owning [`ParsedDrawlist`] with `string_at`/
/// `blob_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCmd {
    Clear,
    ClearTo { cols: u32, rows: u32 },
    FillRect { x: i32, y: i32, w: i32, h: i32, color: u32 },
    PushClip { x: i32, y: i32, w: i32, h: i32 },
    PopClip,
    DrawText { x: i32, y: i32, string_index: u32, fg: u32, bg: u32, attrs: Attrs },
    DrawTextRun { x: i32, y: i32, blob_index: u32 },
    SetCursor { x: i32, y: i32, shape: u8, visible: bool, blink: bool },
    HideCursor,
    SetLink { href_string_index: Option<u32> },
    BlitRect { src_x: i32, src_y: i32, w: i32, h: i32, dst_x: i32, dst_y: i32 },
    FreeString { index: u32 },
    FreeBlob { index: u32 },
    DrawCanvas { x: i32, y: i32, w: i32, h: i32, blob_index: u32 },
    DrawImage { x: i32, y: i32, w: i32, h: i32, blob_index: u32 },
}

/// A fully decoded drawlist: header, command stream, and both interned
/// tables, all still borrowing from the original byte slice.
#[derive(Debug)]
pub struct ParsedDrawlist<'a> {
    pub header: Header,
    pub cmds: Vec<DrawCmd>,
    buf: &'a [u8],
    string_spans: Vec<(u32, u32)>,
    blob_spans: Vec<(u32, u32)>,
}

impl<'a> ParsedDrawlist<'a> {
    pub fn string_at(&self, index: u32) -> Result<&'a str, ParseError> {
        let (off, len) = *self
            .string_spans
            .get(index as usize)
            .ok_or(ParseError::IndexOutOfBounds { index, count: self.string_spans.len() as u32 })?;
        let bytes = slice(self.buf, off, len)?;
        std::str::from_utf8(bytes)
            .map_err(|e| ParseError::Malformed(format!("string {index} is not valid utf-8: {e}")))
    }

    pub fn blob_at(&self, index: u32) -> Result<&'a [u8], ParseError> {
        let (off, len) = *self
            .blob_spans
            .get(index as usize)
            .ok_or(ParseError::IndexOutOfBounds { index, count: self.blob_spans.len() as u32 })?;
        slice(self.buf, off, len)
    }

    pub fn string_count(&self) -> u32 {
        self.string_spans.len() as u32
    }

    pub fn blob_count(&self) -> u32 {
        self.blob_spans.len() as u32
    }
}

fn slice(buf: &[u8], offset: u32, len: u32) -> Result<&[u8], ParseError> {
    let start = offset as usize;
    let end = start
        .checked_add(len as usize)
        .ok_or_else(|| ParseError::Malformed("span overflow".into()))?;
    buf.get(start..end)
        .ok_or_else(|| ParseError::Malformed(format!("span [{start}..{end}) out of buffer range")))
}

fn read_spans(buf: &[u8], offset: u32, count: u32) -> Result<Vec<(u32, u32)>, ParseError> {
    let mut spans = Vec::with_capacity(count as usize);
    for i in 0..count {
        let at = offset as usize + i as usize * 8;
        let raw = buf
            .get(at..at + 8)
            .ok_or_else(|| ParseError::Malformed(format!("span table entry {i} out of range")))?;
        let span_off = u32::from_le_bytes(raw[0..4].try_into().unwrap());
        let span_len = u32::from_le_bytes(raw[4..8].try_into().unwrap());
        spans.push((span_off, span_len));
    }
    Ok(spans)
}

/// Decodes a buffer produced by [`crate::builder::DrawlistBuilder::build`].
/// Borrows `bytes` for the lifetime of the returned [`ParsedDrawlist`].
pub fn parse(bytes: &[u8]) -> Result<ParsedDrawlist<'_>, ParseError> {
    let header = Header::parse(bytes)?;
    if (header.total_size as usize) > bytes.len() {
        return Err(ParseError::Malformed(format!(
            "header totalSize {} exceeds buffer length {}",
            header.total_size,
            bytes.len()
        )));
    }

    let string_spans = read_spans(bytes, header.strings_span_offset, header.strings_count)?;
    let blob_spans = read_spans(bytes, header.blobs_span_offset, header.blobs_count)?;

    let mut cmds = Vec::with_capacity(header.cmd_count as usize);
    let mut pos = header.cmd_offset as usize;
    let cmd_region_end = header.cmd_offset as usize + header.cmd_bytes as usize;
    for _ in 0..header.cmd_count {
        if pos + 8 > cmd_region_end {
            return Err(ParseError::Malformed("command stream truncated".into()));
        }
        let opcode_raw = u16::from_le_bytes(bytes[pos..pos + 2].try_into().unwrap());
        let size = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap()) as usize;
        if size < 8 || pos + size > cmd_region_end {
            return Err(ParseError::Malformed(format!("command record at {pos} has invalid size {size}")));
        }
        let payload = &bytes[pos + 8..pos + size];
        let opcode = Opcode::from_u16(opcode_raw)
            .ok_or_else(|| ParseError::Malformed(format!("unknown opcode {opcode_raw} at offset {pos}")))?;
        cmds.push(decode_cmd(opcode, payload)?);
        pos += size;
    }

    Ok(ParsedDrawlist { header, cmds, buf: bytes, string_spans, blob_spans })
}

fn decode_cmd(opcode: Opcode, p: &[u8]) -> Result<DrawCmd, ParseError> {
    let need = |n: usize| -> Result<(), ParseError> {
        if p.len() < n {
            Err(ParseError::Malformed(format!("{opcode:?} payload too short ({} < {n})", p.len())))
        } else {
            Ok(())
        }
    };
    Ok(match opcode {
        Opcode::Clear => DrawCmd::Clear,
        Opcode::ClearTo => {
            need(8)?;
            DrawCmd::ClearTo {
                cols: u32::from_le_bytes(p[0..4].try_into().unwrap()),
                rows: u32::from_le_bytes(p[4..8].try_into().unwrap()),
            }
        }
        Opcode::FillRect => {
            need(20)?;
            DrawCmd::FillRect {
                x: i32::from_le_bytes(p[0..4].try_into().unwrap()),
                y: i32::from_le_bytes(p[4..8].try_into().unwrap()),
                w: i32::from_le_bytes(p[8..12].try_into().unwrap()),
                h: i32::from_le_bytes(p[12..16].try_into().unwrap()),
                color: u32::from_le_bytes(p[16..20].try_into().unwrap()),
            }
        }
        Opcode::PushClip => {
            need(16)?;
            DrawCmd::PushClip {
                x: i32::from_le_bytes(p[0..4].try_into().unwrap()),
                y: i32::from_le_bytes(p[4..8].try_into().unwrap()),
                w: i32::from_le_bytes(p[8..12].try_into().unwrap()),
                h: i32::from_le_bytes(p[12..16].try_into().unwrap()),
            }
        }
        Opcode::PopClip => DrawCmd::PopClip,
        Opcode::DrawText => {
            need(32)?;
            DrawCmd::DrawText {
                x: i32::from_le_bytes(p[0..4].try_into().unwrap()),
                y: i32::from_le_bytes(p[4..8].try_into().unwrap()),
                string_index: u32::from_le_bytes(p[8..12].try_into().unwrap()),
                fg: u32::from_le_bytes(p[20..24].try_into().unwrap()),
                bg: u32::from_le_bytes(p[24..28].try_into().unwrap()),
                attrs: Attrs::from_bits_truncate(u32::from_le_bytes(p[28..32].try_into().unwrap())),
            }
        }
        Opcode::DrawTextRun => {
            need(16)?;
            DrawCmd::DrawTextRun {
                x: i32::from_le_bytes(p[0..4].try_into().unwrap()),
                y: i32::from_le_bytes(p[4..8].try_into().unwrap()),
                blob_index: u32::from_le_bytes(p[8..12].try_into().unwrap()),
            }
        }
        Opcode::SetCursor => {
            need(12)?;
            DrawCmd::SetCursor {
                x: i32::from_le_bytes(p[0..4].try_into().unwrap()),
                y: i32::from_le_bytes(p[4..8].try_into().unwrap()),
                shape: p[8],
                visible: p[9] != 0,
                blink: p[10] != 0,
            }
        }
        Opcode::HideCursor => DrawCmd::HideCursor,
        Opcode::SetLink => {
            need(8)?;
            let flags = u32::from_le_bytes(p[0..4].try_into().unwrap());
            let string_index = u32::from_le_bytes(p[4..8].try_into().unwrap());
            DrawCmd::SetLink { href_string_index: if flags & 1 != 0 { Some(string_index) } else { None } }
        }
        Opcode::BlitRect => {
            need(24)?;
            DrawCmd::BlitRect {
                src_x: i32::from_le_bytes(p[0..4].try_into().unwrap()),
                src_y: i32::from_le_bytes(p[4..8].try_into().unwrap()),
                w: i32::from_le_bytes(p[8..12].try_into().unwrap()),
                h: i32::from_le_bytes(p[12..16].try_into().unwrap()),
                dst_x: i32::from_le_bytes(p[16..20].try_into().unwrap()),
                dst_y: i32::from_le_bytes(p[20..24].try_into().unwrap()),
            }
        }
        Opcode::FreeString => {
            need(4)?;
            DrawCmd::FreeString { index: u32::from_le_bytes(p[0..4].try_into().unwrap()) }
        }
        Opcode::FreeBlob => {
            need(4)?;
            DrawCmd::FreeBlob { index: u32::from_le_bytes(p[0..4].try_into().unwrap()) }
        }
        Opcode::DrawCanvas => {
            need(20)?;
            DrawCmd::DrawCanvas {
                x: i32::from_le_bytes(p[0..4].try_into().unwrap()),
                y: i32::from_le_bytes(p[4..8].try_into().unwrap()),
                w: i32::from_le_bytes(p[8..12].try_into().unwrap()),
                h: i32::from_le_bytes(p[12..16].try_into().unwrap()),
                blob_index: u32::from_le_bytes(p[16..20].try_into().unwrap()),
            }
        }
        Opcode::DrawImage => {
            need(20)?;
            DrawCmd::DrawImage {
                x: i32::from_le_bytes(p[0..4].try_into().unwrap()),
                y: i32::from_le_bytes(p[4..8].try_into().unwrap()),
                w: i32::from_le_bytes(p[8..12].try_into().unwrap()),
                h: i32::from_le_bytes(p[12..16].try_into().unwrap()),
                blob_index: u32::from_le_bytes(p[16..20].try_into().unwrap()),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuilderConfig, DrawlistBuilder, TextRunSegment};
    use crate::style::TextStyle;

    #[test]
    fn round_trips_basic_frame() {
        let mut b = DrawlistBuilder::new(BuilderConfig::default());
        b.clear();
        b.push_clip(0, 0, 80, 24);
        b.draw_text(1, 1, "hello", TextStyle::new().with_fg(0xffffff));
        b.pop_clip();
        b.set_cursor(2, 1, crate::style::CursorShape::Bar, true, false);
        let bytes = b.build().unwrap().to_vec();

        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.cmds.len(), 5);
        assert_eq!(parsed.cmds[0], DrawCmd::Clear);
        match parsed.cmds[2] {
            DrawCmd::DrawText { string_index, fg, .. } => {
                assert_eq!(parsed.string_at(string_index).unwrap(), "hello");
                assert_eq!(fg, 0xffffff);
            }
            ref other => panic!("unexpected cmd: {other:?}"),
        }
    }

    #[test]
    fn round_trips_text_run_blob() {
        let mut b = DrawlistBuilder::new(BuilderConfig::default());
        b.draw_text_run(
            0,
            0,
            &[
                TextRunSegment { text: "foo".into(), style: TextStyle::new() },
                TextRunSegment { text: "bar".into(), style: TextStyle::new().with_bg(0x112233) },
            ],
        );
        let bytes = b.build().unwrap().to_vec();
        let parsed = parse(&bytes).unwrap();
        match parsed.cmds[0] {
            DrawCmd::DrawTextRun { blob_index, .. } => {
                let blob = parsed.blob_at(blob_index).unwrap();
                assert_eq!(blob.len(), 4 + 2 * 40);
            }
            ref other => panic!("unexpected cmd: {other:?}"),
        }
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        assert!(parse(&[0u8; 10]).is_err());
    }
}
