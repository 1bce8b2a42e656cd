//! Drive error type
//!
//! Every fallible drive operation reports one of these. Backend failures are
//! converted here at the component boundary; nothing below this layer leaks out.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to an optical drive
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Failed to open device {}: {source}", .path.display())]
    DeviceOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to position device at byte offset {offset}: {source}")]
    PositionError {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Raw read of sector {sector} failed (sense: {})", format_sense(.sense))]
    RawReadFailed { sector: u32, sense: Vec<u8> },

    #[error("Unable to determine disc geometry (DVD and CD probes both failed)")]
    ProbeFailed,

    #[error("Device session is closed")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Render sense bytes the way drive diagnostics usually print them
pub(crate) fn format_sense(sense: &[u8]) -> String {
    sense
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
