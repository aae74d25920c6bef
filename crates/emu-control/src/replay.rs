//! Deterministic input replay.
//!
//! A [`Recording`] hands out one frame at a time: an instruction budget for
//! the machine to run, then the port values the CPU reads during it. After
//! the frame the recording checks that the CPU read exactly as many ports
//! as were recorded; any difference means emulation has drifted from the
//! original run.

use std::collections::VecDeque;

use format_rzx::{Block, Frame, RzxFile};
use log::{debug, info, warn};
use thiserror::Error;

use crate::machine::PortSource;

/// Why a replay ended. `Display` gives the message key shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ReplayError {
    /// No frames left. Normal end of playback.
    #[error("rzx_finished")]
    Finished,
    #[error("rzx_sync_lost")]
    SyncLost,
    #[error("rzx_invalid")]
    Invalid,
    #[error("rzx_unsupported")]
    Unsupported,
}

/// Loads snapshots embedded in a recording into the machine.
pub trait SnapshotHost {
    /// Open snapshot `data` of kind `ext` (`"z80"`, `"sna"`, ...).
    fn open_snapshot(&mut self, ext: &str, data: &[u8]) -> Result<(), ReplayError>;
}

/// Source of recorded frames.
pub trait Recording {
    /// Advance to the next frame and return its instruction budget.
    fn update(&mut self, host: &mut dyn SnapshotHost) -> Result<u32, ReplayError>;
    /// Verify the frame just run consumed the recorded input.
    fn check_sync(&mut self) -> Result<(), ReplayError>;
    /// Next recorded port value for the current frame.
    fn read_port(&mut self, port: u16) -> u8;
}

/// An active replay: a recording plus a count of frames played.
pub struct ReplaySession {
    recording: Box<dyn Recording>,
    frames: u64,
}

impl ReplaySession {
    #[must_use]
    pub fn new(recording: Box<dyn Recording>) -> Self {
        Self {
            recording,
            frames: 0,
        }
    }

    /// Frames advanced so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn update(&mut self, host: &mut dyn SnapshotHost) -> Result<u32, ReplayError> {
        let budget = self.recording.update(host)?;
        self.frames += 1;
        Ok(budget)
    }

    pub fn check_sync(&mut self) -> Result<(), ReplayError> {
        self.recording.check_sync()
    }
}

impl PortSource for ReplaySession {
    fn read_port(&mut self, port: u16) -> u8 {
        self.recording.read_port(port)
    }
}

/// Playback of an RZX file.
pub struct RzxReplay {
    /// Blocks not yet reached.
    pending: VecDeque<Block>,
    /// Remaining frames of the current input block.
    frames: VecDeque<Frame>,
    current: Option<Frame>,
    /// Port reads served in the current frame.
    reads: usize,
}

impl RzxReplay {
    /// Parse `data` and load every snapshot that precedes the first input
    /// block.
    pub fn open(data: &[u8], host: &mut dyn SnapshotHost) -> Result<Self, ReplayError> {
        let rzx = RzxFile::parse(data).map_err(|e| {
            warn!("RZX rejected: {e}");
            if e.is_unsupported() {
                ReplayError::Unsupported
            } else {
                ReplayError::Invalid
            }
        })?;
        if let Some(creator) = &rzx.creator {
            info!(
                "RZX: recorded by {} {}.{}, {} frame(s)",
                creator.name,
                creator.major,
                creator.minor,
                rzx.frame_count()
            );
        }

        let mut replay = Self {
            pending: rzx.blocks.into(),
            frames: VecDeque::new(),
            current: None,
            reads: 0,
        };
        while let Some(Block::Snapshot(_)) = replay.pending.front() {
            if let Some(Block::Snapshot(snapshot)) = replay.pending.pop_front() {
                load_snapshot(host, &snapshot.extension, &snapshot.data)?;
            }
        }
        Ok(replay)
    }

    fn next_frame(&mut self, host: &mut dyn SnapshotHost) -> Result<Frame, ReplayError> {
        loop {
            if let Some(frame) = self.frames.pop_front() {
                return Ok(frame);
            }
            match self.pending.pop_front() {
                None => return Err(ReplayError::Finished),
                Some(Block::Snapshot(snapshot)) => {
                    load_snapshot(host, &snapshot.extension, &snapshot.data)?;
                }
                Some(Block::Input(input)) => {
                    debug!(
                        "RZX: input block, {} frame(s) from T-state {}",
                        input.frames.len(),
                        input.tstates
                    );
                    self.frames = input.frames.into();
                }
            }
        }
    }
}

fn load_snapshot(host: &mut dyn SnapshotHost, ext: &str, data: &[u8]) -> Result<(), ReplayError> {
    if ext == "rzx" {
        return Err(ReplayError::Unsupported);
    }
    debug!("RZX: loading embedded {ext} snapshot ({} bytes)", data.len());
    host.open_snapshot(ext, data)
}

impl Recording for RzxReplay {
    fn update(&mut self, host: &mut dyn SnapshotHost) -> Result<u32, ReplayError> {
        let frame = self.next_frame(host)?;
        let budget = u32::from(frame.fetch_count);
        self.current = Some(frame);
        self.reads = 0;
        Ok(budget)
    }

    fn check_sync(&mut self) -> Result<(), ReplayError> {
        let expected = self.current.as_ref().map_or(0, |f| f.inputs.len());
        if self.reads == expected {
            Ok(())
        } else {
            warn!(
                "RZX: sync lost, {} port read(s) where {expected} were recorded",
                self.reads
            );
            Err(ReplayError::SyncLost)
        }
    }

    fn read_port(&mut self, _port: u16) -> u8 {
        let value = self
            .current
            .as_ref()
            .and_then(|f| f.inputs.get(self.reads).copied())
            .unwrap_or(0xFF);
        self.reads += 1;
        value
    }
}
