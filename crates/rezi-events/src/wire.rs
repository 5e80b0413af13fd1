//! The `ZREV` event batch wire format (§6): a backend hands the core a batch
//! of already-parsed input events plus a count of batches it had to drop
//! before this one (consumer backpressure). Encoding/decoding happens at the
//! backend boundary so a recorded batch can be replayed bit-for-bit by the
//! repro harness.

use crate::error::EventsError;

pub const MAGIC: [u8; 4] = *b"ZREV";
pub const VERSION: u16 = 1;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Mods: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
        const META  = 0b1000;
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MouseButtons: u8 {
        const LEFT   = 0b001;
        const RIGHT  = 0b010;
        const MIDDLE = 0b100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Down,
    Up,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Down,
    Up,
    Drag,
    Scroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub x: i32,
    pub y: i32,
    pub kind: MouseEventKind,
    pub buttons: MouseButtons,
    pub wheel_dx: i32,
    pub wheel_dy: i32,
    pub mods: Mods,
}

/// A single decoded event. Variants and field order mirror the wire tags in
/// [`encode`]/[`decode`] one for one.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Key { code: KeyCode, mods: Mods, timestamp_ms: u64, action: KeyAction },
    Text(String),
    Paste(String),
    Mouse(MouseEvent),
    Resize { cols: u16, rows: u16 },
    Tick { dt_ms: u32 },
    Focus(bool),
    User { tag: u32, payload: Vec<u8> },
}

/// Result of a `pollEvents` call (§6): the decoded events plus how many
/// batches the producer had to drop before this one due to backpressure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBatch {
    pub events: Vec<Event>,
    pub dropped_batches: u32,
    pub truncated: bool,
}

/// Maintains the 32-bit-wraparound-safe monotonic clock a decoder needs:
/// every wire timestamp is a raw 32-bit millisecond count that wraps every
/// ~49.7 days, so decoding keeps a running `epoch` bumped each time a raw
/// value is smaller than the last one observed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampTracker {
    epoch_ms: u64,
    last_raw_ms: u32,
    seen_any: bool,
}

impl TimestampTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, raw_ms: u32) -> u64 {
        if self.seen_any && raw_ms < self.last_raw_ms {
            self.epoch_ms += 1u64 << 32;
        }
        self.last_raw_ms = raw_ms;
        self.seen_any = true;
        self.epoch_ms + raw_ms as u64
    }
}

#[repr(u8)]
enum Tag {
    Key = 1,
    Text = 2,
    Paste = 3,
    Mouse = 4,
    Resize = 5,
    Tick = 6,
    Focus = 7,
    User = 8,
}

fn key_action_byte(a: KeyAction) -> u8 {
    match a {
        KeyAction::Down => 0,
        KeyAction::Up => 1,
        KeyAction::Repeat => 2,
    }
}

fn key_action_from_byte(b: u8) -> Result<KeyAction, EventsError> {
    match b {
        0 => Ok(KeyAction::Down),
        1 => Ok(KeyAction::Up),
        2 => Ok(KeyAction::Repeat),
        other => Err(EventsError::protocol(format!("unknown key action byte {other}"))),
    }
}

fn key_code_bytes(code: KeyCode, out: &mut Vec<u8>) {
    match code {
        KeyCode::Char(c) => {
            out.push(0);
            out.extend_from_slice(&(c as u32).to_le_bytes());
        }
        KeyCode::Enter => out.push(1),
        KeyCode::Esc => out.push(2),
        KeyCode::Backspace => out.push(3),
        KeyCode::Tab => out.push(4),
        KeyCode::Up => out.push(5),
        KeyCode::Down => out.push(6),
        KeyCode::Left => out.push(7),
        KeyCode::Right => out.push(8),
        KeyCode::Home => out.push(9),
        KeyCode::End => out.push(10),
        KeyCode::PageUp => out.push(11),
        KeyCode::PageDown => out.push(12),
        KeyCode::Insert => out.push(13),
        KeyCode::Delete => out.push(14),
        KeyCode::F(n) => {
            out.push(15);
            out.push(n);
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], EventsError> {
        if self.pos + n > self.bytes.len() {
            return Err(EventsError::protocol("event batch truncated mid-record"));
        }
        let s = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn u8(&mut self) -> Result<u8, EventsError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, EventsError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, EventsError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32, EventsError> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, EventsError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn bytes_with_len(&mut self) -> Result<&'a [u8], EventsError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn string_with_len(&mut self) -> Result<String, EventsError> {
        let bytes = self.bytes_with_len()?;
        String::from_utf8(bytes.to_vec()).map_err(|e| EventsError::protocol(format!("invalid utf-8 in event payload: {e}")))
    }

    fn key_code(&mut self) -> Result<KeyCode, EventsError> {
        Ok(match self.u8()? {
            0 => KeyCode::Char(char::from_u32(self.u32()?).ok_or_else(|| EventsError::protocol("invalid char codepoint"))?),
            1 => KeyCode::Enter,
            2 => KeyCode::Esc,
            3 => KeyCode::Backspace,
            4 => KeyCode::Tab,
            5 => KeyCode::Up,
            6 => KeyCode::Down,
            7 => KeyCode::Left,
            8 => KeyCode::Right,
            9 => KeyCode::Home,
            10 => KeyCode::End,
            11 => KeyCode::PageUp,
            12 => KeyCode::PageDown,
            13 => KeyCode::Insert,
            14 => KeyCode::Delete,
            15 => KeyCode::F(self.u8()?),
            other => return Err(EventsError::protocol(format!("unknown key code tag {other}"))),
        })
    }
}

/// Encodes a batch of events into the wire format, normalizing timestamps
/// down to raw (possibly-wrapped) 32-bit milliseconds the way a real backend
/// would before handing bytes across the boundary.
pub fn encode(events: &[Event], dropped_batches: u32, truncated: bool) -> Vec<u8> {
    let mut body = Vec::new();
    for event in events {
        match event {
            Event::Key { code, mods, timestamp_ms, action } => {
                body.push(Tag::Key as u8);
                key_code_bytes(*code, &mut body);
                body.push(mods.bits());
                body.extend_from_slice(&(*timestamp_ms as u32).to_le_bytes());
                body.push(key_action_byte(*action));
            }
            Event::Text(s) => {
                body.push(Tag::Text as u8);
                body.extend_from_slice(&(s.len() as u32).to_le_bytes());
                body.extend_from_slice(s.as_bytes());
            }
            Event::Paste(s) => {
                body.push(Tag::Paste as u8);
                body.extend_from_slice(&(s.len() as u32).to_le_bytes());
                body.extend_from_slice(s.as_bytes());
            }
            Event::Mouse(m) => {
                body.push(Tag::Mouse as u8);
                body.extend_from_slice(&m.x.to_le_bytes());
                body.extend_from_slice(&m.y.to_le_bytes());
                body.push(match m.kind {
                    MouseEventKind::Down => 0,
                    MouseEventKind::Up => 1,
                    MouseEventKind::Drag => 2,
                    MouseEventKind::Scroll => 3,
                });
                body.push(m.buttons.bits());
                body.extend_from_slice(&m.wheel_dx.to_le_bytes());
                body.extend_from_slice(&m.wheel_dy.to_le_bytes());
                body.push(m.mods.bits());
            }
            Event::Resize { cols, rows } => {
                body.push(Tag::Resize as u8);
                body.extend_from_slice(&cols.to_le_bytes());
                body.extend_from_slice(&rows.to_le_bytes());
            }
            Event::Tick { dt_ms } => {
                body.push(Tag::Tick as u8);
                body.extend_from_slice(&dt_ms.to_le_bytes());
            }
            Event::Focus(gained) => {
                body.push(Tag::Focus as u8);
                body.push(*gained as u8);
            }
            Event::User { tag, payload } => {
                body.push(Tag::User as u8);
                body.extend_from_slice(&tag.to_le_bytes());
                body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
                body.extend_from_slice(payload);
            }
        }
    }

    let mut out = Vec::with_capacity(4 + 2 + 4 + 4 + 1 + body.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    let total_len = (out.len() + 4 + 4 + 1 + body.len()) as u32;
    out.extend_from_slice(&total_len.to_le_bytes());
    out.extend_from_slice(&(events.len() as u32).to_le_bytes());
    out.push(truncated as u8);
    out.extend_from_slice(&body);
    let _ = dropped_batches; // carried out-of-band by the caller, not on the wire
    out
}

/// Decodes a batch previously produced by [`encode`], normalizing each key
/// event's raw millisecond timestamp through `tracker`. `dropped_batches` is
/// supplied by the caller (the backend tracks it out-of-band, e.g. via a
/// channel-overflow counter) rather than carried on the wire.
pub fn decode(bytes: &[u8], dropped_batches: u32, tracker: &mut TimestampTracker) -> Result<EventBatch, EventsError> {
    let mut r = Reader::new(bytes);
    let magic = r.take(4)?;
    if magic != MAGIC {
        return Err(EventsError::protocol("bad magic"));
    }
    let version = r.u16()?;
    if version != VERSION {
        return Err(EventsError::protocol(format!("unsupported event batch version {version}")));
    }
    let total_len = r.u32()? as usize;
    if total_len != bytes.len() {
        return Err(EventsError::protocol(format!("length mismatch: header says {total_len}, got {}", bytes.len())));
    }
    let count = r.u32()?;
    let truncated = r.u8()? != 0;

    let mut events = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let tag = r.u8()?;
        let event = match tag {
            t if t == Tag::Key as u8 => {
                let code = r.key_code()?;
                let mods = Mods::from_bits_truncate(r.u8()?);
                let raw_ms = r.u32()?;
                let action = key_action_from_byte(r.u8()?)?;
                Event::Key { code, mods, timestamp_ms: tracker.normalize(raw_ms), action }
            }
            t if t == Tag::Text as u8 => Event::Text(r.string_with_len()?),
            t if t == Tag::Paste as u8 => Event::Paste(r.string_with_len()?),
            t if t == Tag::Mouse as u8 => {
                let x = r.i32()?;
                let y = r.i32()?;
                let kind = match r.u8()? {
                    0 => MouseEventKind::Down,
                    1 => MouseEventKind::Up,
                    2 => MouseEventKind::Drag,
                    3 => MouseEventKind::Scroll,
                    other => return Err(EventsError::protocol(format!("unknown mouse kind {other}"))),
                };
                let buttons = MouseButtons::from_bits_truncate(r.u8()?);
                let wheel_dx = r.i32()?;
                let wheel_dy = r.i32()?;
                let mods = Mods::from_bits_truncate(r.u8()?);
                Event::Mouse(MouseEvent { x, y, kind, buttons, wheel_dx, wheel_dy, mods })
            }
            t if t == Tag::Resize as u8 => Event::Resize { cols: r.u16()?, rows: r.u16()? },
            t if t == Tag::Tick as u8 => Event::Tick { dt_ms: r.u32()? },
            t if t == Tag::Focus as u8 => Event::Focus(r.u8()? != 0),
            t if t == Tag::User as u8 => {
                let tag = r.u32()?;
                let payload = r.bytes_with_len()?.to_vec();
                Event::User { tag, payload }
            }
            other => return Err(EventsError::protocol(format!("unknown event tag {other}"))),
        };
        events.push(event);
    }

    Ok(EventBatch { events, dropped_batches, truncated })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_one_of_each_kind() {
        let events = vec![
            Event::Key { code: KeyCode::Char('a'), mods: Mods::CTRL, timestamp_ms: 42, action: KeyAction::Down },
            Event::Text("hi".into()),
            Event::Paste("pasted\ntext".into()),
            Event::Mouse(MouseEvent { x: 3, y: 4, kind: MouseEventKind::Scroll, buttons: MouseButtons::empty(), wheel_dx: 0, wheel_dy: -1, mods: Mods::empty() }),
            Event::Resize { cols: 80, rows: 24 },
            Event::Tick { dt_ms: 16 },
            Event::Focus(true),
            Event::User { tag: 7, payload: vec![1, 2, 3] },
        ];
        let bytes = encode(&events, 0, false);
        let mut tracker = TimestampTracker::new();
        let decoded = decode(&bytes, 0, &mut tracker).unwrap();
        assert_eq!(decoded.events.len(), events.len());
        assert!(matches!(&decoded.events[0], Event::Key { timestamp_ms: 42, .. }));
        assert!(matches!(&decoded.events[1], Event::Text(s) if s == "hi"));
        assert!(matches!(&decoded.events[7], Event::User { tag: 7, payload } if payload == &vec![1, 2, 3]));
    }

    #[test]
    fn bad_magic_is_a_protocol_error() {
        let mut tracker = TimestampTracker::new();
        let err = decode(b"xxxxxxxxxxxx", 0, &mut tracker).unwrap_err();
        assert!(matches!(err, EventsError::Protocol { .. }));
    }

    #[test]
    fn timestamp_wraparound_advances_epoch() {
        let mut tracker = TimestampTracker::new();
        let first = tracker.normalize(u32::MAX - 5);
        let second = tracker.normalize(10);
        assert!(second > first, "wraparound must keep the normalized clock monotonic");
        assert_eq!(second - first, 16);
    }

    #[test]
    fn dropped_batches_is_out_of_band_not_on_the_wire() {
        let bytes = encode(&[Event::Tick { dt_ms: 5 }], 3, false);
        let mut tracker = TimestampTracker::new();
        let decoded = decode(&bytes, 3, &mut tracker).unwrap();
        assert_eq!(decoded.dropped_batches, 3);
    }

    #[test]
    fn truncation_flag_round_trips() {
        let bytes = encode(&[], 0, true);
        let mut tracker = TimestampTracker::new();
        let decoded = decode(&bytes, 0, &mut tracker).unwrap();
        assert!(decoded.truncated);
        assert!(decoded.events.is_empty());
    }
}
