//! Bounds-checked reads from an AY file buffer.
//!
//! AY files are a web of signed 16-bit big-endian pointers, each relative to
//! its own position in the file. Every field read goes through here so a
//! hostile file can never index outside the buffer.
//!
//! All three reads share one boundary: `offset + 1` must be strictly inside
//! the buffer. For a single byte that is one byte stricter than necessary
//! (the final byte of a file can never be read as a `u8`). Players in the
//! wild have always behaved this way, so it stays.

use thiserror::Error;

/// A read that would leave the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadError {
    /// Not enough bytes remain at `offset`.
    #[error("read at offset {offset} runs past the end of a {len}-byte file")]
    OutOfBounds { offset: usize, len: usize },
    /// A relative pointer at `offset` resolves outside `[0, len - 2]`.
    #[error("pointer at offset {offset} targets {target}, outside a {len}-byte file")]
    InvalidPointer {
        offset: usize,
        target: i64,
        len: usize,
    },
}

/// Cursor-free reader over an AY file.
#[derive(Debug, Clone, Copy)]
pub struct AyReader<'a> {
    data: &'a [u8],
}

impl<'a> AyReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// The underlying buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Buffer length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check that two bytes starting at `offset` are inside the buffer.
    fn check(&self, offset: usize) -> Result<(), ReadError> {
        match offset.checked_add(1) {
            Some(last) if last < self.data.len() => Ok(()),
            _ => Err(ReadError::OutOfBounds {
                offset,
                len: self.data.len(),
            }),
        }
    }

    /// Read one byte. Requires a second byte after it (see module docs).
    pub fn byte(&self, offset: usize) -> Result<u8, ReadError> {
        self.check(offset)?;
        Ok(self.data[offset])
    }

    /// Read a big-endian 16-bit word.
    pub fn word(&self, offset: usize) -> Result<u16, ReadError> {
        self.check(offset)?;
        Ok(u16::from_be_bytes([self.data[offset], self.data[offset + 1]]))
    }

    /// Resolve the relative pointer stored at `offset` to an absolute offset.
    ///
    /// The target must leave room for at least a word, i.e. lie within
    /// `[0, len - 2]`.
    pub fn ptr(&self, offset: usize) -> Result<usize, ReadError> {
        let relative = self.word(offset)? as i16;
        let target = offset as i64 + i64::from(relative);
        let last = self.data.len() as i64 - 2;
        if target < 0 || target > last {
            return Err(ReadError::InvalidPointer {
                offset,
                target,
                len: self.data.len(),
            });
        }
        Ok(target as usize)
    }

    /// Read a NUL-terminated string starting at `offset`.
    ///
    /// Stops at the end of the buffer if no terminator is found. Non-UTF-8
    /// bytes are replaced.
    #[must_use]
    pub fn c_str(&self, offset: usize) -> String {
        let Some(tail) = self.data.get(offset..) else {
            return String::new();
        };
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        String::from_utf8_lossy(&tail[..end]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_is_big_endian() {
        let r = AyReader::new(&[0x12, 0x34, 0x56]);
        assert_eq!(r.word(0), Ok(0x1234));
        assert_eq!(r.word(1), Ok(0x3456));
    }

    #[test]
    fn word_at_last_byte_fails() {
        let r = AyReader::new(&[0x12, 0x34, 0x56]);
        assert_eq!(r.word(2), Err(ReadError::OutOfBounds { offset: 2, len: 3 }));
    }

    #[test]
    fn byte_needs_a_following_byte() {
        // Intentionally strict: the final byte is not readable on its own.
        let r = AyReader::new(&[0xAA, 0xBB]);
        assert_eq!(r.byte(0), Ok(0xAA));
        assert_eq!(r.byte(1), Err(ReadError::OutOfBounds { offset: 1, len: 2 }));
    }

    #[test]
    fn huge_offset_does_not_overflow() {
        let r = AyReader::new(&[0; 4]);
        assert!(r.byte(usize::MAX).is_err());
        assert!(r.word(usize::MAX).is_err());
    }

    #[test]
    fn ptr_forward_and_backward() {
        // Pointer at 2 is +2 -> 4; pointer at 4 is -4 -> 0.
        let r = AyReader::new(&[0, 0, 0x00, 0x02, 0xFF, 0xFC, 0, 0]);
        assert_eq!(r.ptr(2), Ok(4));
        assert_eq!(r.ptr(4), Ok(0));
    }

    #[test]
    fn ptr_before_start_is_invalid() {
        let r = AyReader::new(&[0xFF, 0xFE, 0, 0]);
        assert_eq!(
            r.ptr(0),
            Err(ReadError::InvalidPointer {
                offset: 0,
                target: -2,
                len: 4
            })
        );
    }

    #[test]
    fn ptr_must_leave_room_for_a_word() {
        // len 6: last valid target is 4.
        let r = AyReader::new(&[0x00, 0x04, 0, 0, 0, 0]);
        assert_eq!(r.ptr(0), Ok(4));
        let r = AyReader::new(&[0x00, 0x05, 0, 0, 0, 0]);
        assert!(matches!(r.ptr(0), Err(ReadError::InvalidPointer { target: 5, .. })));
    }

    #[test]
    fn c_str_stops_at_nul_or_end() {
        let r = AyReader::new(b"abc\0def");
        assert_eq!(r.c_str(0), "abc");
        assert_eq!(r.c_str(4), "def");
        assert_eq!(r.c_str(100), "");
    }
}
