/// Magic tag stamped into every drawlist header: ASCII `ZRDL` little-endian.
pub const MAGIC: u32 = u32::from_le_bytes(*b"ZRDL");

/// The wire-format version this builder/parser pair emits and accepts.
/// Adding an opcode bumps this; values up to and including it must keep
/// parsing unambiguously (§4.F).
pub const VERSION: u32 = 1;

/// Stable numeric opcode values. Never renumber an existing variant —
/// consumers persist repro bundles keyed by these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    Clear = 1,
    FillRect = 2,
    DrawText = 3,
    PushClip = 4,
    PopClip = 5,
    DrawTextRun = 6,
    SetCursor = 7,
    HideCursor = 8,
    SetLink = 9,
    ClearTo = 10,
    FreeString = 11,
    BlitRect = 12,
    FreeBlob = 13,
    DrawCanvas = 14,
    DrawImage = 15,
}

impl Opcode {
    pub fn from_u16(v: u16) -> Option<Opcode> {
        Some(match v {
            1 => Opcode::Clear,
            2 => Opcode::FillRect,
            3 => Opcode::DrawText,
            4 => Opcode::PushClip,
            5 => Opcode::PopClip,
            6 => Opcode::DrawTextRun,
            7 => Opcode::SetCursor,
            8 => Opcode::HideCursor,
            9 => Opcode::SetLink,
            10 => Opcode::ClearTo,
            11 => Opcode::FreeString,
            12 => Opcode::BlitRect,
            13 => Opcode::FreeBlob,
            14 => Opcode::DrawCanvas,
            15 => Opcode::DrawImage,
            _ => return None,
        })
    }

    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}
