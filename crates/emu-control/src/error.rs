use std::path::PathBuf;

use format_ay::AyError;
use thiserror::Error;

use crate::replay::ReplayError;

/// Why a file could not be opened or saved.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("no handler for {0:?}")]
    UnknownType(String),
    #[error("{0} files cannot be opened")]
    CannotOpen(&'static str),
    #[error("{0} files cannot be saved")]
    CannotStore(&'static str),
    #[error("reading {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Ay(#[from] AyError),
    #[error("replay: {0}")]
    Replay(#[from] ReplayError),
    /// The device or snapshot loader refused the image.
    #[error("{0} image rejected")]
    Rejected(&'static str),
    #[error("saving {0} failed")]
    StoreFailed(PathBuf),
}
