//! ZXAYEMUL (`.ay`) chiptune parser and player image builder.
//!
//! An AY file carries the Z80 code and data of a music player ripped from a
//! game or demo, plus the entry points needed to drive it. There is no host
//! player in the file: we build a 64K memory image containing a tiny stub
//! that calls the song's `init` routine and then its `interrupt` routine once
//! per frame, the way the original hardware would have.
//!
//! # Layout
//!
//! All multi-byte values are big-endian. "Pointers" are signed 16-bit
//! offsets relative to the position they are stored at.
//!
//! | Offset | Field                                  |
//! |--------|----------------------------------------|
//! | 0      | `ZXAYEMUL` signature                   |
//! | 8      | File version                           |
//! | 9      | Required player version                |
//! | 12     | Pointer to author string               |
//! | 14     | Pointer to misc string                 |
//! | 16     | Number of songs minus one              |
//! | 17     | First song index                       |
//! | 18     | Pointer to song table (4 bytes/song)   |
//!
//! Song table entry: pointer to name, pointer to song data. Song data:
//! length (+4), fade (+6), `hireg` (+8), `loreg` (+9), pointer to the
//! stack/init/interrupt words (+10), pointer to the memory block table
//! (+12). Each block is address, length and a pointer to the bytes; the
//! table ends at the first block whose address is zero.

mod reader;

use log::{debug, info};
use thiserror::Error;

pub use reader::{AyReader, ReadError};

/// File signature.
pub const MAGIC: &[u8; 8] = b"ZXAYEMUL";

/// Size of the flat Z80 address space the image covers.
pub const IMAGE_SIZE: usize = 0x1_0000;

/// Player stub for songs without an interrupt routine:
/// `DI; CALL init; IM 2; EI; HALT; JR -6`.
pub const STUB_NO_INTERRUPT: [u8; 10] = [0xF3, 0xCD, 0, 0, 0xED, 0x5E, 0xFB, 0x76, 0x18, 0xFA];

/// Player stub for songs with an interrupt routine:
/// `DI; CALL init; IM 1; EI; HALT; CALL inter; JR -9`.
pub const STUB_INTERRUPT: [u8; 13] = [
    0xF3, 0xCD, 0, 0, 0xED, 0x56, 0xFB, 0x76, 0xCD, 0, 0, 0x18, 0xF7,
];

/// Offset of the `init` operand inside either stub.
pub const STUB_INIT_OFFSET: usize = 2;

/// Offset of the `inter` operand inside [`STUB_INTERRUPT`].
pub const STUB_INTERRUPT_OFFSET: usize = 9;

/// Fill for page zero: `RET`, so stray calls into the ROM area return.
const FILL_RST: u8 = 0xC9;

/// Fill for the rest of the ROM area.
const FILL_ROM: u8 = 0xFF;

/// `EI` at the IM 1 vector so the interrupt returns straight into the stub.
const IM1_VECTOR_OPCODE: u8 = 0xFB;

/// Errors produced while decoding an AY file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AyError {
    /// The signature does not match. Not an AY file; try another format.
    #[error("not a ZXAYEMUL file")]
    NotAy,
    /// A header field or pointer runs outside the file.
    #[error(transparent)]
    Read(#[from] ReadError),
    /// The requested song index is past the end of the song table. This
    /// includes a header whose first-song index is out of range, which is
    /// refused up front instead of being read from beyond the table.
    #[error("song {index} requested but the file has {count}")]
    NoSuchSong { index: u8, count: u16 },
}

/// One entry of a song's memory block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBlock {
    /// Z80 load address.
    pub address: u16,
    /// Declared length in bytes.
    pub length: u16,
    /// Absolute file offset of the block's bytes.
    pub offset: usize,
}

/// A decoded song header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AySong {
    pub name: String,
    /// Song length in 1/50 s frames (0 = unknown).
    pub length: u16,
    /// Fade length in 1/50 s frames.
    pub fade: u16,
    /// Seed for the high halves of every register pair.
    pub hireg: u8,
    /// Seed for the low halves of every register pair.
    pub loreg: u8,
    pub stack: u16,
    /// Init routine address as stored (may be zero).
    pub init: u16,
    /// Interrupt routine address, if the song has one.
    pub interrupt: Option<u16>,
    pub blocks: Vec<MemoryBlock>,
}

impl AySong {
    /// Effective init address: the stored one, or the first block's load
    /// address when the header leaves it zero.
    #[must_use]
    pub fn entry(&self) -> u16 {
        if self.init != 0 {
            return self.init;
        }
        self.blocks
            .iter()
            .map(|b| b.address)
            .find(|&a| a != 0)
            .unwrap_or(0)
    }
}

/// A fully built player image, ready to be copied into machine memory.
pub struct AyImage {
    /// The whole Z80 address space, stub at $0000.
    pub memory: Box<[u8; IMAGE_SIZE]>,
    pub stack: u16,
    pub init: u16,
    pub interrupt: Option<u16>,
    pub hireg: u8,
    pub loreg: u8,
    pub title: String,
    /// Index of the song this image plays.
    pub song: u8,
    pub song_count: u16,
    /// Song length in 1/50 s frames.
    pub length: u16,
    /// Fade length in 1/50 s frames.
    pub fade: u16,
}

impl std::fmt::Debug for AyImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AyImage")
            .field("stack", &self.stack)
            .field("init", &self.init)
            .field("interrupt", &self.interrupt)
            .field("title", &self.title)
            .field("song", &self.song)
            .field("song_count", &self.song_count)
            .finish_non_exhaustive()
    }
}

/// A parsed AY file header.
#[derive(Debug, Clone)]
pub struct AyFile<'a> {
    reader: AyReader<'a>,
    pub file_version: u8,
    pub player_version: u8,
    pub author: String,
    pub misc: String,
    /// Number of songs (the stored value plus one).
    pub song_count: u16,
    /// Song the file asks to be played first.
    pub first_song: u8,
    songs: usize,
}

/// Whether `data` starts with the AY signature.
#[must_use]
pub fn is_ay(data: &[u8]) -> bool {
    data.starts_with(MAGIC)
}

/// Decode `data` and build the image for the file's first song.
pub fn load(data: &[u8]) -> Result<AyImage, AyError> {
    let file = AyFile::parse(data)?;
    file.image(file.first_song)
}

impl<'a> AyFile<'a> {
    /// Parse the file header.
    pub fn parse(data: &'a [u8]) -> Result<Self, AyError> {
        if !is_ay(data) {
            return Err(AyError::NotAy);
        }
        let r = AyReader::new(data);

        let file_version = r.byte(8)?;
        let player_version = r.byte(9)?;
        let author = r.c_str(r.ptr(12)?);
        let misc = r.c_str(r.ptr(14)?);
        let song_count = u16::from(r.byte(16)?) + 1;
        let first_song = r.byte(17)?;
        let songs = r.ptr(18)?;

        info!("AY: author {author:?}, misc {misc:?}");
        debug!("AY: {song_count} song(s), first {first_song}, player v{player_version}");

        Ok(Self {
            reader: r,
            file_version,
            player_version,
            author,
            misc,
            song_count,
            first_song,
            songs,
        })
    }

    /// Decode the header of song `index`.
    pub fn song(&self, index: u8) -> Result<AySong, AyError> {
        if u16::from(index) >= self.song_count {
            return Err(AyError::NoSuchSong {
                index,
                count: self.song_count,
            });
        }
        let r = &self.reader;
        let entry = self.songs + usize::from(index) * 4;
        let name = r.c_str(r.ptr(entry)?);
        let data = r.ptr(entry + 2)?;

        let length = r.word(data + 4)?;
        let fade = r.word(data + 6)?;
        let hireg = r.byte(data + 8)?;
        let loreg = r.byte(data + 9)?;
        let points = r.ptr(data + 10)?;
        let table = r.ptr(data + 12)?;

        let stack = r.word(points)?;
        let init = r.word(points + 2)?;
        let interrupt = r.word(points + 4)?;

        let mut blocks = Vec::new();
        let mut at = table;
        loop {
            let address = r.word(at)?;
            if address == 0 {
                break;
            }
            blocks.push(MemoryBlock {
                address,
                length: r.word(at + 2)?,
                offset: r.ptr(at + 4)?,
            });
            at += 6;
        }

        Ok(AySong {
            name,
            length,
            fade,
            hireg,
            loreg,
            stack,
            init,
            interrupt: (interrupt != 0).then_some(interrupt),
            blocks,
        })
    }

    /// Build the player image for song `index`.
    ///
    /// The whole song header and block table are decoded before the image is
    /// assembled, so a malformed file never produces a partial image.
    pub fn image(&self, index: u8) -> Result<AyImage, AyError> {
        let song = self.song(index)?;
        let init = song.entry();

        info!(
            "AY: song {index} {:?}, stack ${:04X}, init ${init:04X}, interrupt {}",
            song.name,
            song.stack,
            song.interrupt
                .map_or_else(|| "none".to_string(), |a| format!("${a:04X}")),
        );

        let mut memory = Box::new([0u8; IMAGE_SIZE]);
        memory[..0x0100].fill(FILL_RST);
        memory[0x0100..0x4000].fill(FILL_ROM);
        memory[0x0038] = IM1_VECTOR_OPCODE;

        let [init_lo, init_hi] = init.to_le_bytes();
        if let Some(inter) = song.interrupt {
            memory[..STUB_INTERRUPT.len()].copy_from_slice(&STUB_INTERRUPT);
            let [lo, hi] = inter.to_le_bytes();
            memory[STUB_INTERRUPT_OFFSET] = lo;
            memory[STUB_INTERRUPT_OFFSET + 1] = hi;
        } else {
            memory[..STUB_NO_INTERRUPT.len()].copy_from_slice(&STUB_NO_INTERRUPT);
        }
        memory[STUB_INIT_OFFSET] = init_lo;
        memory[STUB_INIT_OFFSET + 1] = init_hi;

        let data = self.reader.data();
        for block in &song.blocks {
            let dest = usize::from(block.address);
            let len = usize::from(block.length)
                .min(data.len() - block.offset)
                .min(IMAGE_SIZE - dest);
            debug!(
                "AY: copy {len} byte(s) from offset {} to ${dest:04X}",
                block.offset
            );
            memory[dest..dest + len].copy_from_slice(&data[block.offset..block.offset + len]);
        }

        Ok(AyImage {
            memory,
            stack: song.stack,
            init,
            interrupt: song.interrupt,
            hireg: song.hireg,
            loreg: song.loreg,
            title: song.name,
            song: index,
            song_count: self.song_count,
            length: song.length,
            fade: song.fade,
        })
    }
}
