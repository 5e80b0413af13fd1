use crate::error::ParseError;
use crate::opcode::{MAGIC, VERSION};

/// Fixed 64-byte header laid out at offset 0 of every drawlist buffer.
pub const HEADER_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub magic: u32,
    pub version: u32,
    pub flags: u32,
    pub total_size: u32,
    pub cmd_offset: u32,
    pub cmd_bytes: u32,
    pub cmd_count: u32,
    pub strings_span_offset: u32,
    pub strings_count: u32,
    pub strings_bytes_offset: u32,
    pub strings_bytes_len: u32,
    pub blobs_span_offset: u32,
    pub blobs_count: u32,
    pub blobs_bytes_offset: u32,
    pub blobs_bytes_len: u32,
}

impl Header {
    /// Writes the 64-byte little-endian header into `out[0..64]`. `out`
    /// must already be at least `HEADER_LEN` bytes long.
    pub fn write_into(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= HEADER_LEN);
        let fields: [u32; 15] = [
            self.magic,
            self.version,
            self.flags,
            self.total_size,
            self.cmd_offset,
            self.cmd_bytes,
            self.cmd_count,
            self.strings_span_offset,
            self.strings_count,
            self.strings_bytes_offset,
            self.strings_bytes_len,
            self.blobs_span_offset,
            self.blobs_count,
            self.blobs_bytes_offset,
            self.blobs_bytes_len,
        ];
        for (i, field) in fields.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
        }
        // Remaining 4 bytes of the 64-byte header (15 * 4 = 60) are reserved padding.
        if out.len() >= HEADER_LEN {
            out[60..64].fill(0);
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Header, ParseError> {
        if bytes.len() < HEADER_LEN {
            return Err(ParseError::TruncatedHeader(bytes.len()));
        }
        let u32_at = |off: usize| u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());
        let magic = u32_at(0);
        if magic != MAGIC {
            return Err(ParseError::BadMagic(magic));
        }
        let version = u32_at(4);
        if version > VERSION {
            return Err(ParseError::UnsupportedVersion(version, VERSION));
        }
        Ok(Header {
            magic,
            version,
            flags: u32_at(8),
            total_size: u32_at(12),
            cmd_offset: u32_at(16),
            cmd_bytes: u32_at(20),
            cmd_count: u32_at(24),
            strings_span_offset: u32_at(28),
            strings_count: u32_at(32),
            strings_bytes_offset: u32_at(36),
            strings_bytes_len: u32_at(40),
            blobs_span_offset: u32_at(44),
            blobs_count: u32_at(48),
            blobs_bytes_offset: u32_at(52),
            blobs_bytes_len: u32_at(56),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_parse_round_trips() {
        let header = Header {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            total_size: 128,
            cmd_offset: 64,
            cmd_bytes: 32,
            cmd_count: 2,
            strings_span_offset: 96,
            strings_count: 1,
            strings_bytes_offset: 104,
            strings_bytes_len: 8,
            blobs_span_offset: 0,
            blobs_count: 0,
            blobs_bytes_offset: 0,
            blobs_bytes_len: 0,
        };
        let mut buf = vec![0u8; HEADER_LEN];
        header.write_into(&mut buf);
        let parsed = Header::parse(&buf).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let buf = vec![0u8; HEADER_LEN];
        assert!(matches!(Header::parse(&buf), Err(ParseError::BadMagic(0))));
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let buf = vec![0u8; 10];
        assert!(matches!(Header::parse(&buf), Err(ParseError::TruncatedHeader(10))));
    }
}
