//! Decoder library for RHS2000 electrophysiology recordings.
//!
//! This crate reads recordings saved in the "one file per channel" layout: a
//! binary header describing the acquisition settings and channel catalog, a
//! `time.dat` file of sample ticks, and one raw sample file per channel.
//!
//! # Example
//!
//! ```no_run
//! use rhs_core::load_recording;
//!
//! let recording = load_recording("session_01", "amp*.dat").unwrap();
//!
//! println!("{} samples", recording.timestamps.len());
//! for (stem, samples) in &recording.recordings {
//!     println!("{}: {} samples", stem, samples.len());
//! }
//! ```
//!
//! # Features
//!
//! - Strict header decoding with byte-offset errors
//! - Channel catalog classified by kind, with triggers attached to amplifiers
//! - Memory-mapped data files calibrated to physical units
//! - Optional rayon-parallel loading (`parallel` feature)

pub mod error;
pub mod header;
pub mod loader;
pub mod reader;
pub mod scaling;
pub mod types;

// Re-export commonly used types
pub use error::{Result, RhsError};
pub use header::RHS_MAGIC;
pub use loader::{load_recording, LoadObserver, LoadOptions, NoopObserver, RecordingLoader};
pub use scaling::DataFileKind;
pub use types::{
    Channel, ChannelCatalog, ChannelCounts, ChannelKind, Header, RecordingSet, TriggerSpec,
};
