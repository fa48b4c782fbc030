//! Error type shared by every stage of RHS decoding.
//!
//! All errors are terminal for the current load: every header field's offset
//! depends on the fields before it, and a bad data file would silently corrupt
//! downstream analysis.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout `rhs-core`.
pub type Result<T> = std::result::Result<T, RhsError>;

/// Errors that can occur while decoding an RHS header or loading a recording.
#[derive(Error, Debug)]
pub enum RhsError {
    #[error("Truncated input at byte {offset}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Malformed string length at byte {offset}: declared {declared} bytes, {available} available")]
    MalformedLength {
        offset: usize,
        declared: u32,
        available: usize,
    },

    #[error("Bad magic number: expected {expected:#010x}, found {found:#010x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("Channel {channel:?} at byte {offset} has signal type {code}, which is not valid in RHS files")]
    UnsupportedChannelType {
        code: i16,
        channel: String,
        offset: usize,
    },

    #[error("Channel {channel:?} at byte {offset} has unknown signal type {code}")]
    UnknownChannelType {
        code: i16,
        channel: String,
        offset: usize,
    },

    #[error("No header file matching {pattern:?} in {}", dir.display())]
    HeaderNotFound { dir: PathBuf, pattern: String },

    #[error("Multiple header files in {}: {candidates:?}", dir.display())]
    AmbiguousHeader {
        dir: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("No timestamp file matching {pattern:?} in {}", dir.display())]
    TimestampsNotFound { dir: PathBuf, pattern: String },

    #[error("Multiple timestamp files in {}: {candidates:?}", dir.display())]
    AmbiguousTimestamps {
        dir: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("Cannot classify data file {}", path.display())]
    UnclassifiedDataFile { path: PathBuf },

    #[error("File {} is {len} bytes, not a whole number of {width}-byte samples", path.display())]
    PartialSample {
        path: PathBuf,
        len: usize,
        width: usize,
    },

    #[error("Invalid amplifier sample rate: {0}")]
    InvalidSampleRate(f32),

    #[error("Invalid file pattern: {0}")]
    InvalidPattern(#[from] glob::PatternError),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RhsError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
