use crate::error::DrawlistError;
use crate::header::{HEADER_LEN, Header};
use crate::intern::InternTable;
use crate::opcode::{MAGIC, Opcode, VERSION};
use crate::style::{CursorShape, TextStyle};

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Capacity/behavior configuration for one [`DrawlistBuilder`]. Defaults are
/// generous enough that a typical terminal-sized frame never hits a cap; the
/// caps exist to bound a misbehaving or runaway view function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderConfig {
    pub max_drawlist_bytes: u32,
    pub max_cmd_count: u32,
    pub max_strings: u32,
    pub encoded_string_cache_cap: usize,
    pub validate_params: bool,
    pub reuse_output_buffer: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_drawlist_bytes: 1 << 20,
            max_cmd_count: 1 << 16,
            max_strings: 1 << 14,
            encoded_string_cache_cap: 256,
            validate_params: true,
            reuse_output_buffer: false,
        }
    }
}

/// One segment of a `DRAW_TEXT_RUN` blob: a styled substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRunSegment {
    pub text: String,
    pub style: TextStyle,
}

/// Stateful binary encoder (§4.F). Accumulates commands and interned
/// strings/blobs, then compacts them into one contiguous little-endian
/// buffer on [`DrawlistBuilder::build`]. Every mutator is a no-op once the
/// builder has entered sticky failure; `reset()` is the only way out.
pub struct DrawlistBuilder {
    config: BuilderConfig,
    cmds: Vec<u8>,
    cmd_count: u32,
    strings: InternTable,
    blobs: InternTable,
    clip_depth: i32,
    sticky: Option<DrawlistError>,
    output: Vec<u8>,
}

impl DrawlistBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        let cap = config.encoded_string_cache_cap;
        Self {
            config,
            cmds: Vec::new(),
            cmd_count: 0,
            strings: InternTable::new(cap),
            blobs: InternTable::new(cap),
            clip_depth: 0,
            sticky: None,
            output: Vec::new(),
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Clears commands, both interned tables, and all sticky failure state.
    /// The builder accepts new commands again immediately afterward.
    pub fn reset(&mut self) {
        self.cmds.clear();
        self.cmd_count = 0;
        self.strings.clear();
        self.blobs.clear();
        self.clip_depth = 0;
        self.sticky = None;
        if !self.config.reuse_output_buffer {
            self.output.clear();
        }
    }

    pub fn cmd_count(&self) -> u32 {
        self.cmd_count
    }

    pub fn strings_count(&self) -> u32 {
        self.strings.len() as u32
    }

    pub fn blobs_count(&self) -> u32 {
        self.blobs.len() as u32
    }

    pub fn is_failed(&self) -> bool {
        self.sticky.is_some()
    }

    fn fail(&mut self, err: DrawlistError) {
        if self.sticky.is_none() {
            tracing::error!(code = err.code(), detail = %err, "drawlist builder entered sticky failure");
            self.sticky = Some(err);
        }
    }

    fn current_total_bytes(&self) -> usize {
        HEADER_LEN
            + self.cmds.len()
            + self.strings.len() * 8
            + self.strings.padded_byte_len()
            + self.blobs.len() * 8
            + self.blobs.padded_byte_len()
    }

    fn check_budget(&mut self, extra: usize) -> bool {
        if self.current_total_bytes() + extra > self.config.max_drawlist_bytes as usize {
            self.fail(DrawlistError::TooLarge(format!(
                "projected size exceeds maxDrawlistBytes ({})",
                self.config.max_drawlist_bytes
            )));
            return false;
        }
        true
    }

    /// Interns a string if needed, honoring `maxStrings`; returns `None` (and
    /// enters sticky failure) if the cap would be exceeded.
    fn intern_string(&mut self, bytes: &[u8]) -> Option<u32> {
        if self.strings.peek(bytes).is_none() {
            if self.strings.len() as u32 >= self.config.max_strings {
                self.fail(DrawlistError::TooLarge(format!(
                    "string table exceeds maxStrings ({})",
                    self.config.max_strings
                )));
                return None;
            }
            if !self.check_budget(bytes.len() + 8) {
                return None;
            }
        }
        Some(self.strings.intern(bytes))
    }

    fn intern_blob(&mut self, bytes: &[u8]) -> Option<u32> {
        if self.blobs.peek(bytes).is_none() && !self.check_budget(bytes.len() + 8) {
            return None;
        }
        Some(self.blobs.intern(bytes))
    }

    fn push_cmd(&mut self, opcode: Opcode, payload: &[u8]) {
        if self.sticky.is_some() {
            return;
        }
        if self.cmd_count >= self.config.max_cmd_count {
            self.fail(DrawlistError::TooLarge(format!(
                "cmdCount exceeds maxCmdCount ({})",
                self.config.max_cmd_count
            )));
            return;
        }
        let record_len = align4(8 + payload.len());
        if !self.check_budget(record_len) {
            return;
        }
        let mut record = Vec::with_capacity(record_len);
        record.extend_from_slice(&opcode.as_u16().to_le_bytes());
        record.extend_from_slice(&0u16.to_le_bytes()); // flags (reserved)
        record.extend_from_slice(&(record_len as u32).to_le_bytes());
        record.extend_from_slice(payload);
        record.resize(record_len, 0);
        self.cmds.extend_from_slice(&record);
        self.cmd_count += 1;
    }

    fn invalid(&mut self, detail: impl Into<String>) {
        self.fail(DrawlistError::InvalidOp(detail.into()));
    }

    fn check_rect(&mut self, w: i32, h: i32) -> bool {
        if self.config.validate_params && (w < 0 || h < 0) {
            self.invalid(format!("negative rect dimension (w={w}, h={h})"));
            return false;
        }
        true
    }

    // -- drawing ops ---------------------------------------------------

    pub fn clear(&mut self) {
        if self.sticky.is_some() {
            return;
        }
        self.push_cmd(Opcode::Clear, &[]);
    }

    pub fn clear_to(&mut self, cols: u32, rows: u32) {
        if self.sticky.is_some() {
            return;
        }
        let mut payload = Vec::with_capacity(8);
        payload.extend_from_slice(&cols.to_le_bytes());
        payload.extend_from_slice(&rows.to_le_bytes());
        self.push_cmd(Opcode::ClearTo, &payload);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        if self.sticky.is_some() || !self.check_rect(w, h) {
            return;
        }
        let mut payload = Vec::with_capacity(20);
        payload.extend_from_slice(&x.to_le_bytes());
        payload.extend_from_slice(&y.to_le_bytes());
        payload.extend_from_slice(&w.to_le_bytes());
        payload.extend_from_slice(&h.to_le_bytes());
        payload.extend_from_slice(&(color & 0x00FF_FFFF).to_le_bytes());
        self.push_cmd(Opcode::FillRect, &payload);
    }

    pub fn push_clip(&mut self, x: i32, y: i32, w: i32, h: i32) {
        if self.sticky.is_some() || !self.check_rect(w, h) {
            return;
        }
        let mut payload = Vec::with_capacity(16);
        payload.extend_from_slice(&x.to_le_bytes());
        payload.extend_from_slice(&y.to_le_bytes());
        payload.extend_from_slice(&w.to_le_bytes());
        payload.extend_from_slice(&h.to_le_bytes());
        self.push_cmd(Opcode::PushClip, &payload);
        if self.sticky.is_none() {
            self.clip_depth += 1;
        }
    }

    pub fn pop_clip(&mut self) {
        if self.sticky.is_some() {
            return;
        }
        if self.config.validate_params && self.clip_depth <= 0 {
            self.invalid("popClip with no matching pushClip");
            return;
        }
        self.push_cmd(Opcode::PopClip, &[]);
        if self.sticky.is_none() {
            self.clip_depth -= 1;
        }
    }

    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, style: TextStyle) {
        if self.sticky.is_some() {
            return;
        }
        if self.config.validate_params && text.is_empty() {
            self.invalid("drawText with empty string");
            return;
        }
        let Some(string_index) = self.intern_string(text.as_bytes()) else {
            return;
        };
        let mut payload = Vec::with_capacity(32);
        payload.extend_from_slice(&x.to_le_bytes());
        payload.extend_from_slice(&y.to_le_bytes());
        payload.extend_from_slice(&string_index.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes()); // flags
        payload.extend_from_slice(&(text.len() as u32).to_le_bytes());
        payload.extend_from_slice(&style.fg.to_le_bytes());
        payload.extend_from_slice(&style.bg.to_le_bytes());
        payload.extend_from_slice(&style.attrs.bits().to_le_bytes());
        self.push_cmd(Opcode::DrawText, &payload);
    }

    /// Builds one 40-byte-segment blob from `segments` and emits
    /// `DRAW_TEXT_RUN` referencing it.
    pub fn draw_text_run(&mut self, x: i32, y: i32, segments: &[TextRunSegment]) {
        if self.sticky.is_some() {
            return;
        }
        if self.config.validate_params && segments.is_empty() {
            self.invalid("drawTextRun with no segments");
            return;
        }
        let mut blob = Vec::with_capacity(4 + segments.len() * 40);
        blob.extend_from_slice(&(segments.len() as u32).to_le_bytes());
        for seg in segments {
            let Some(string_index) = self.intern_string(seg.text.as_bytes()) else {
                return;
            };
            blob.extend_from_slice(&seg.style.fg.to_le_bytes());
            blob.extend_from_slice(&seg.style.bg.to_le_bytes());
            blob.extend_from_slice(&seg.style.attrs.bits().to_le_bytes());
            blob.extend_from_slice(&string_index.to_le_bytes());
            blob.resize(blob.len() + 24, 0); // pad segment to 40 bytes
        }
        let Some(blob_index) = self.intern_blob(&blob) else {
            return;
        };
        let mut payload = Vec::with_capacity(16);
        payload.extend_from_slice(&x.to_le_bytes());
        payload.extend_from_slice(&y.to_le_bytes());
        payload.extend_from_slice(&blob_index.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes()); // flags
        self.push_cmd(Opcode::DrawTextRun, &payload);
    }

    pub fn set_cursor(&mut self, x: i32, y: i32, shape: CursorShape, visible: bool, blink: bool) {
        if self.sticky.is_some() {
            return;
        }
        let mut payload = Vec::with_capacity(12);
        payload.extend_from_slice(&x.to_le_bytes());
        payload.extend_from_slice(&y.to_le_bytes());
        payload.push(shape as u8);
        payload.push(visible as u8);
        payload.push(blink as u8);
        payload.push(0); // reserved
        self.push_cmd(Opcode::SetCursor, &payload);
    }

    pub fn hide_cursor(&mut self) {
        if self.sticky.is_some() {
            return;
        }
        self.push_cmd(Opcode::HideCursor, &[]);
    }

    pub fn set_link(&mut self, href: Option<&str>) {
        if self.sticky.is_some() {
            return;
        }
        let (flags, string_index) = match href {
            Some(s) => {
                let Some(idx) = self.intern_string(s.as_bytes()) else {
                    return;
                };
                (1u32, idx)
            }
            None => (0u32, 0u32),
        };
        let mut payload = Vec::with_capacity(8);
        payload.extend_from_slice(&flags.to_le_bytes());
        payload.extend_from_slice(&string_index.to_le_bytes());
        self.push_cmd(Opcode::SetLink, &payload);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn blit_rect(&mut self, src_x: i32, src_y: i32, w: i32, h: i32, dst_x: i32, dst_y: i32) {
        if self.sticky.is_some() || !self.check_rect(w, h) {
            return;
        }
        let mut payload = Vec::with_capacity(24);
        payload.extend_from_slice(&src_x.to_le_bytes());
        payload.extend_from_slice(&src_y.to_le_bytes());
        payload.extend_from_slice(&w.to_le_bytes());
        payload.extend_from_slice(&h.to_le_bytes());
        payload.extend_from_slice(&dst_x.to_le_bytes());
        payload.extend_from_slice(&dst_y.to_le_bytes());
        self.push_cmd(Opcode::BlitRect, &payload);
    }

    /// Tells the backend a previously interned string (by this frame's
    /// index) can be released early — used by the renderer when it knows a
    /// piece of drawn content will never be referenced again.
    pub fn free_string(&mut self, index: u32) {
        if self.sticky.is_some() {
            return;
        }
        if self.config.validate_params && index >= self.strings.len() as u32 {
            self.invalid(format!("freeString index {index} out of bounds"));
            return;
        }
        self.push_cmd(Opcode::FreeString, &index.to_le_bytes());
    }

    pub fn free_blob(&mut self, index: u32) {
        if self.sticky.is_some() {
            return;
        }
        if self.config.validate_params && index >= self.blobs.len() as u32 {
            self.invalid(format!("freeBlob index {index} out of bounds"));
            return;
        }
        self.push_cmd(Opcode::FreeBlob, &index.to_le_bytes());
    }

    /// Raw cell-grid canvas blob (opaque to the core; interpreted by a
    /// consumer-supplied widget). Reserved extension point (§9).
    pub fn draw_canvas(&mut self, x: i32, y: i32, w: i32, h: i32, cells: &[u8]) {
        if self.sticky.is_some() || !self.check_rect(w, h) {
            return;
        }
        let Some(blob_index) = self.intern_blob(cells) else {
            return;
        };
        self.draw_blob_rect(Opcode::DrawCanvas, x, y, w, h, blob_index);
    }

    /// Encoded-image blob (opaque bytes, e.g. Sixel/Kitty payload). Reserved
    /// extension point (§9).
    pub fn draw_image(&mut self, x: i32, y: i32, w: i32, h: i32, encoded: &[u8]) {
        if self.sticky.is_some() || !self.check_rect(w, h) {
            return;
        }
        let Some(blob_index) = self.intern_blob(encoded) else {
            return;
        };
        self.draw_blob_rect(Opcode::DrawImage, x, y, w, h, blob_index);
    }

    fn draw_blob_rect(&mut self, opcode: Opcode, x: i32, y: i32, w: i32, h: i32, blob_index: u32) {
        let mut payload = Vec::with_capacity(20);
        payload.extend_from_slice(&x.to_le_bytes());
        payload.extend_from_slice(&y.to_le_bytes());
        payload.extend_from_slice(&w.to_le_bytes());
        payload.extend_from_slice(&h.to_le_bytes());
        payload.extend_from_slice(&blob_index.to_le_bytes());
        self.push_cmd(opcode, &payload);
    }

    /// Compacts commands and both interned tables into one contiguous
    /// buffer. Returns the sticky failure (unchanged) if one was recorded;
    /// otherwise validates clip-stack balance one last time before emitting.
    pub fn build(&mut self) -> Result<&[u8], DrawlistError> {
        if let Some(err) = &self.sticky {
            return Err(err.clone());
        }
        if self.clip_depth != 0 {
            let err = DrawlistError::InvalidOp(format!(
                "unbalanced clip stack at build() (depth={})",
                self.clip_depth
            ));
            self.fail(err.clone());
            return Err(err);
        }

        let cmd_offset = HEADER_LEN as u32;
        let cmd_bytes = self.cmds.len() as u32;

        let strings_span_offset = cmd_offset + cmd_bytes;
        let strings_span_bytes = (self.strings.len() * 8) as u32;
        let strings_bytes_offset = strings_span_offset + strings_span_bytes;
        let strings_bytes_len = self.strings.bytes().len() as u32;
        let strings_padded = self.strings.padded_byte_len() as u32;

        let blobs_span_offset = strings_bytes_offset + strings_padded;
        let blobs_span_bytes = (self.blobs.len() * 8) as u32;
        let blobs_bytes_offset = blobs_span_offset + blobs_span_bytes;
        let blobs_bytes_len = self.blobs.bytes().len() as u32;
        let blobs_padded = self.blobs.padded_byte_len() as u32;

        let total_size = blobs_bytes_offset + blobs_padded;

        if total_size as usize > self.config.max_drawlist_bytes as usize {
            let err = DrawlistError::TooLarge(format!(
                "final size {total_size} exceeds maxDrawlistBytes ({})",
                self.config.max_drawlist_bytes
            ));
            self.fail(err.clone());
            return Err(err);
        }

        let header = Header {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            total_size,
            cmd_offset,
            cmd_bytes,
            cmd_count: self.cmd_count,
            strings_span_offset,
            strings_count: self.strings.len() as u32,
            strings_bytes_offset,
            strings_bytes_len,
            blobs_span_offset,
            blobs_count: self.blobs.len() as u32,
            blobs_bytes_offset,
            blobs_bytes_len,
        };

        if self.config.reuse_output_buffer {
            self.output.clear();
        } else {
            self.output = Vec::with_capacity(total_size as usize);
        }
        self.output.resize(total_size as usize, 0);
        header.write_into(&mut self.output[0..HEADER_LEN]);
        self.output[cmd_offset as usize..(cmd_offset + cmd_bytes) as usize].copy_from_slice(&self.cmds);
        write_spans(&mut self.output, strings_span_offset as usize, self.strings.spans());
        self.output[strings_bytes_offset as usize..strings_bytes_offset as usize + self.strings.bytes().len()]
            .copy_from_slice(self.strings.bytes());
        write_spans(&mut self.output, blobs_span_offset as usize, self.blobs.spans());
        self.output[blobs_bytes_offset as usize..blobs_bytes_offset as usize + self.blobs.bytes().len()]
            .copy_from_slice(self.blobs.bytes());

        Ok(&self.output)
    }
}

fn write_spans(out: &mut [u8], offset: usize, spans: &[(u32, u32)]) {
    for (i, (span_off, span_len)) in spans.iter().enumerate() {
        let at = offset + i * 8;
        out[at..at + 4].copy_from_slice(&span_off.to_le_bytes());
        out[at + 4..at + 8].copy_from_slice(&span_len.to_le_bytes());
    }
}

impl Default for DrawlistBuilder {
    fn default() -> Self {
        Self::new(BuilderConfig::default())
    }
}
