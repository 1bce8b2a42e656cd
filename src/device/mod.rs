//! Device access
//!
//! [`DeviceIo`] is the seam between the drive logic and the operating system:
//! device-control calls, linear reads and SCSI passthrough. [`DeviceSession`]
//! owns one open device and its open/close lifecycle.

mod file;
mod session;

#[cfg(test)]
pub(crate) mod mock;

pub use file::FileDevice;
pub use session::{DeviceOpener, DeviceSession};

use std::io;
use thiserror::Error;

use crate::ioctl::scsi::{PassThroughReply, PassThroughRequest};
use crate::ioctl::ControlCode;

/// A passthrough command the device rejected
#[derive(Debug, Error)]
#[error("SCSI passthrough failed: {source}")]
pub struct PassThroughFailure {
    #[source]
    pub source: io::Error,
    /// Whatever sense data the driver returned with the failure
    pub sense: Vec<u8>,
}

impl From<io::Error> for PassThroughFailure {
    fn from(source: io::Error) -> Self {
        Self {
            source,
            sense: Vec::new(),
        }
    }
}

/// Primitive operations on an open device handle.
///
/// Every call blocks until the device answers. Implementations own their
/// handle and release it on drop.
pub trait DeviceIo {
    /// Issue a device-control request, returning the number of reply bytes
    fn control(&mut self, code: ControlCode, input: &[u8], output: &mut [u8]) -> io::Result<usize>;

    /// Position the handle at an absolute byte offset
    fn seek_to(&mut self, offset: u64) -> io::Result<()>;

    /// Read linearly from the current position
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Send one SCSI command that reads into `data`
    fn pass_through(
        &mut self,
        request: &PassThroughRequest,
        data: &mut [u8],
    ) -> Result<PassThroughReply, PassThroughFailure>;
}
