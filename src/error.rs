//! Error taxonomy.
//!
//! Fatal conditions abort the run before the pipeline touches the
//! destination. Per-track conditions are plain values carried in plan and
//! pipeline results so one bad track never stops the batch.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to load settings: {0}")]
    Settings(#[from] ::config::ConfigError),

    #[error("cannot read playlist {path}: {source}")]
    Playlist { path: PathBuf, source: io::Error },

    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to start worker thread: {0}")]
    Worker(#[source] io::Error),

    #[error("no valid tracks found in the given playlists")]
    NoTracks,

    #[error("destination is full: none of the {skipped} new tracks fit the folder policy")]
    CapacityExhausted { skipped: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Non-fatal degradation noticed while resolving a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Tags were missing or unreadable; the identity fell back to the filename.
    MetadataUnavailable { path: PathBuf, detail: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MetadataUnavailable { path, detail } => {
                write!(f, "metadata unavailable for {}: {detail}", path.display())
            }
        }
    }
}

/// Why a track never made it into the copy list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The playlist entry does not point at a readable, supported audio file.
    SourceUnavailable(String),
    /// No folder slot was left under the capacity policy.
    CapacityExceeded,
    /// Every folder with room already holds a different file under this name.
    NameConflict,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SourceUnavailable(detail) => write!(f, "source unavailable: {detail}"),
            SkipReason::CapacityExceeded => f.write_str("capacity exceeded"),
            SkipReason::NameConflict => f.write_str("file name already taken"),
        }
    }
}

/// Why a single add or delete failed while executing the plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    #[error("copy failed: {0}")]
    CopyFailed(String),

    #[error("delete failed: {0}")]
    DeleteFailed(String),

    #[error("run cancelled")]
    Cancelled,
}
