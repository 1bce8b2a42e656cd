//! Disc change detection

use super::prober::GeometryProber;
use crate::device::{DeviceIo, DeviceSession};
use crate::error::DriveError;
use crate::ioctl::ControlCode;

/// Ask the drive whether the medium is still the one we probed.
///
/// A failed verify means the disc was removed or swapped (or the drive cannot
/// confirm it); the prober's cache is dropped and `true` returned. A closed
/// session is an error, not a change.
pub fn poll_changed<D: DeviceIo>(
    session: &mut DeviceSession<D>,
    prober: &mut GeometryProber,
) -> Result<bool, DriveError> {
    let device = session.device()?;

    match device.control(ControlCode::StorageCheckVerify, &[], &mut []) {
        Ok(_) => Ok(false),
        Err(e) => {
            log::info!("Media change detected: {}", e);
            prober.invalidate();
            Ok(true)
        }
    }
}
