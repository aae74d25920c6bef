//! RZX input recording parser.
//!
//! An RZX file records every port read a Spectrum program made, frame by
//! frame, together with the snapshot(s) the recording starts from. Played
//! back against the same machine state, it reproduces the original run
//! exactly.
//!
//! # Layout
//!
//! All multi-byte values are little-endian.
//!
//! ```text
//! Header:  "RZX!"  major:u8  minor:u8  flags:u32
//! Block:   id:u8   length:u32 (including these 5 bytes)   body...
//! ```
//!
//! | Id   | Block                | Handling                             |
//! |------|----------------------|--------------------------------------|
//! | $10  | Creator information  | Name and version kept for display    |
//! | $20  | Security information | Skipped                              |
//! | $21  | Security signature   | Skipped                              |
//! | $30  | Snapshot             | Kept (inflated if compressed)        |
//! | $80  | Input recording      | Kept (inflated if compressed)        |
//!
//! Anything else is skipped by length.

use log::{debug, warn};
use miniz_oxide::inflate::{TINFLStatus, decompress_to_vec_zlib_with_limit};
use thiserror::Error;

/// File signature.
pub const SIGNATURE: &[u8; 4] = b"RZX!";

/// Header size: signature, version, flags.
const HEADER_SIZE: usize = 10;

/// Block id plus length.
const BLOCK_HEADER_SIZE: usize = 5;

const BLOCK_CREATOR: u8 = 0x10;
const BLOCK_SECURITY_INFO: u8 = 0x20;
const BLOCK_SECURITY_SIGNATURE: u8 = 0x21;
const BLOCK_SNAPSHOT: u8 = 0x30;
const BLOCK_INPUT: u8 = 0x80;

/// Snapshot flag: body is a descriptor for an external file.
const SNAPSHOT_EXTERNAL: u32 = 0x01;
/// Snapshot / input flag: body is zlib-compressed.
const COMPRESSED: u32 = 0x02;
/// Input flag: frames are encrypted.
const INPUT_PROTECTED: u32 = 0x01;

/// Input count marking a frame that repeats the previous frame's reads.
const REPEAT_FRAME: u16 = 0xFFFF;

/// Upper bound on any inflated block. Real snapshots are a few hundred KB
/// and an hour of input is a few MB.
pub const MAX_INFLATED: usize = 16 * 1024 * 1024;

/// Largest encoded frame: fetch and input counts plus 0xFFFE inputs.
const MAX_FRAME_SIZE: usize = 4 + 0xFFFE;

/// Errors produced while parsing an RZX file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RzxError {
    #[error("missing RZX! signature")]
    BadSignature,
    #[error("truncated {what} at offset {offset}")]
    Truncated { what: &'static str, offset: usize },
    #[error("block at offset {offset} has invalid length {length}")]
    BadBlockLength { offset: usize, length: u32 },
    #[error("corrupt zlib stream in {what} block")]
    Inflate { what: &'static str },
    #[error("{what} block inflates past {limit} bytes")]
    TooLarge { what: &'static str, limit: usize },
    /// Valid RZX, but using a feature we cannot play.
    #[error("unsupported RZX feature: {0}")]
    Unsupported(&'static str),
}

impl RzxError {
    /// Whether the file is well-formed but uses something we cannot play.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// Creator block contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub name: String,
    pub major: u16,
    pub minor: u16,
}

/// An embedded snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Snapshot format, lowercase (`"z80"`, `"sna"`, `"szx"`).
    pub extension: String,
    /// Uncompressed snapshot bytes.
    pub data: Vec<u8>,
}

/// One recorded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Instructions fetched (R register increments) during the frame.
    pub fetch_count: u16,
    /// Port read results, in order.
    pub inputs: Vec<u8>,
}

/// An input recording block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecording {
    /// T-state counter at the start of the first frame.
    pub tstates: u32,
    pub frames: Vec<Frame>,
}

/// A block that matters for playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Snapshot(Snapshot),
    Input(InputRecording),
}

/// A parsed RZX file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RzxFile {
    pub major: u8,
    pub minor: u8,
    pub flags: u32,
    pub creator: Option<Creator>,
    /// Snapshot and input blocks in file order.
    pub blocks: Vec<Block>,
}

/// Whether `data` starts with the RZX signature.
#[must_use]
pub fn is_rzx(data: &[u8]) -> bool {
    data.starts_with(SIGNATURE)
}

fn u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// NUL-padded ASCII field.
fn padded_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}

/// Inflate a zlib stream, refusing to produce more than `limit` bytes.
fn inflate(body: &[u8], limit: usize, what: &'static str) -> Result<Vec<u8>, RzxError> {
    let limit = limit.min(MAX_INFLATED);
    decompress_to_vec_zlib_with_limit(body, limit).map_err(|e| match e.status {
        TINFLStatus::HasMoreOutput => RzxError::TooLarge { what, limit },
        _ => RzxError::Inflate { what },
    })
}

impl RzxFile {
    /// Parse an RZX file from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self, RzxError> {
        if !is_rzx(data) {
            return Err(RzxError::BadSignature);
        }
        if data.len() < HEADER_SIZE {
            return Err(RzxError::Truncated {
                what: "header",
                offset: 0,
            });
        }

        let mut rzx = Self {
            major: data[4],
            minor: data[5],
            flags: u32_at(data, 6),
            creator: None,
            blocks: Vec::new(),
        };
        debug!("RZX v{}.{} flags ${:08X}", rzx.major, rzx.minor, rzx.flags);

        let mut offset = HEADER_SIZE;
        while offset < data.len() {
            if offset + BLOCK_HEADER_SIZE > data.len() {
                return Err(RzxError::Truncated {
                    what: "block header",
                    offset,
                });
            }
            let id = data[offset];
            let length = u32_at(data, offset + 1);
            let len = length as usize;
            if len < BLOCK_HEADER_SIZE {
                return Err(RzxError::BadBlockLength { offset, length });
            }
            let Some(end) = offset.checked_add(len).filter(|&e| e <= data.len()) else {
                return Err(RzxError::Truncated {
                    what: "block",
                    offset,
                });
            };
            let body = &data[offset + BLOCK_HEADER_SIZE..end];

            match id {
                BLOCK_CREATOR => rzx.creator = Some(parse_creator(body, offset)?),
                BLOCK_SNAPSHOT => rzx
                    .blocks
                    .push(Block::Snapshot(parse_snapshot(body, offset)?)),
                BLOCK_INPUT => rzx.blocks.push(Block::Input(parse_input(body, offset)?)),
                BLOCK_SECURITY_INFO | BLOCK_SECURITY_SIGNATURE => {
                    debug!("RZX: skipping security block ${id:02X}");
                }
                _ => warn!("RZX: skipping unknown block ${id:02X} at offset {offset}"),
            }
            offset = end;
        }

        Ok(rzx)
    }

    /// Total recorded frames across all input blocks.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.blocks
            .iter()
            .map(|b| match b {
                Block::Input(input) => input.frames.len(),
                Block::Snapshot(_) => 0,
            })
            .sum()
    }
}

fn parse_creator(body: &[u8], offset: usize) -> Result<Creator, RzxError> {
    if body.len() < 24 {
        return Err(RzxError::Truncated {
            what: "creator block",
            offset,
        });
    }
    let creator = Creator {
        name: padded_str(&body[..20]),
        major: u16_at(body, 20),
        minor: u16_at(body, 22),
    };
    debug!(
        "RZX: created by {} {}.{}",
        creator.name, creator.major, creator.minor
    );
    Ok(creator)
}

fn parse_snapshot(body: &[u8], offset: usize) -> Result<Snapshot, RzxError> {
    if body.len() < 12 {
        return Err(RzxError::Truncated {
            what: "snapshot block",
            offset,
        });
    }
    let flags = u32_at(body, 0);
    if flags & SNAPSHOT_EXTERNAL != 0 {
        return Err(RzxError::Unsupported("external snapshot"));
    }
    let extension = padded_str(&body[4..8]).to_ascii_lowercase();
    let declared = u32_at(body, 8) as usize;
    let payload = &body[12..];

    let data = if flags & COMPRESSED != 0 {
        // One spare byte tells an exact fit from an overrun.
        let data = inflate(payload, declared.saturating_add(1), "snapshot")?;
        if data.len() > declared {
            return Err(RzxError::TooLarge {
                what: "snapshot",
                limit: declared,
            });
        }
        data
    } else {
        payload.to_vec()
    };
    if data.len() != declared {
        warn!(
            "RZX: {extension} snapshot declares {declared} bytes, holds {}",
            data.len()
        );
    }
    Ok(Snapshot { extension, data })
}

fn parse_input(body: &[u8], offset: usize) -> Result<InputRecording, RzxError> {
    if body.len() < 13 {
        return Err(RzxError::Truncated {
            what: "input block",
            offset,
        });
    }
    let count = u32_at(body, 0) as usize;
    // body[4] is reserved.
    let tstates = u32_at(body, 5);
    let flags = u32_at(body, 9);
    if flags & INPUT_PROTECTED != 0 {
        return Err(RzxError::Unsupported("encrypted input recording"));
    }

    let inflated;
    let stream = if flags & COMPRESSED != 0 {
        inflated = inflate(&body[13..], count.saturating_mul(MAX_FRAME_SIZE), "input")?;
        &inflated[..]
    } else {
        &body[13..]
    };

    // Each frame is at least 4 bytes; don't trust the count for allocation.
    let mut frames: Vec<Frame> = Vec::with_capacity(count.min(stream.len() / 4));
    let mut pos = 0;
    for _ in 0..count {
        if pos + 4 > stream.len() {
            return Err(RzxError::Truncated {
                what: "input frame",
                offset,
            });
        }
        let fetch_count = u16_at(stream, pos);
        let in_count = u16_at(stream, pos + 2);
        pos += 4;

        let inputs = if in_count == REPEAT_FRAME {
            frames.last().map(|f| f.inputs.clone()).unwrap_or_default()
        } else {
            let n = usize::from(in_count);
            if pos + n > stream.len() {
                return Err(RzxError::Truncated {
                    what: "input frame",
                    offset,
                });
            }
            let inputs = stream[pos..pos + n].to_vec();
            pos += n;
            inputs
        };
        frames.push(Frame {
            fetch_count,
            inputs,
        });
    }

    Ok(InputRecording { tstates, frames })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_required() {
        assert_eq!(RzxFile::parse(b"RZY!\0\0\0\0\0\0"), Err(RzxError::BadSignature));
    }

    #[test]
    fn header_only_is_empty() {
        let rzx = RzxFile::parse(b"RZX!\x00\x0d\x00\x00\x00\x00").expect("valid");
        assert_eq!((rzx.major, rzx.minor), (0, 13));
        assert!(rzx.blocks.is_empty());
        assert_eq!(rzx.frame_count(), 0);
    }

    #[test]
    fn short_header_is_truncated() {
        assert!(matches!(
            RzxFile::parse(b"RZX!\x00"),
            Err(RzxError::Truncated { what: "header", .. })
        ));
    }

    #[test]
    fn zero_length_block_is_rejected() {
        let mut data = b"RZX!\x00\x0d\x00\x00\x00\x00".to_vec();
        data.extend_from_slice(&[0x80, 0, 0, 0, 0]);
        assert_eq!(
            RzxFile::parse(&data),
            Err(RzxError::BadBlockLength {
                offset: 10,
                length: 0
            })
        );
    }

    #[test]
    fn padded_str_trims() {
        assert_eq!(padded_str(b"z80\0"), "z80");
        assert_eq!(padded_str(b"Fuse   \0\0"), "Fuse");
    }
}
