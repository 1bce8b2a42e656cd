//! Sector reads from the drive
//!
//! Two independent paths: cooked reads return the 2048-byte user data through
//! the normal read path, raw reads return whole 2352-byte sectors through
//! SCSI READ CD.

use std::io;

use crate::device::{DeviceIo, DeviceSession};
use crate::error::{format_sense, DriveError};
use crate::ioctl::scsi::{PassThroughRequest, GOOD};

pub use crate::ioctl::scsi::RAW_SECTOR_SIZE;

/// Logical sector size for CD-ROM/DVD data (cooked)
pub const SECTOR_SIZE: u64 = 2048;

/// Default timeout for one raw sector command, in seconds
pub const DEFAULT_RAW_TIMEOUT_SECS: u32 = 5;

/// Reads sectors by absolute sector number
#[derive(Debug, Clone, Copy)]
pub struct SectorReader {
    raw_timeout_secs: u32,
}

impl Default for SectorReader {
    fn default() -> Self {
        Self::new(DEFAULT_RAW_TIMEOUT_SECS)
    }
}

impl SectorReader {
    pub fn new(raw_timeout_secs: u32) -> Self {
        Self { raw_timeout_secs }
    }

    /// Read `count` cooked sectors starting at `sector` in one linear read.
    ///
    /// No retry: a short read fails the whole call.
    pub fn read_cooked<D: DeviceIo>(
        &self,
        session: &mut DeviceSession<D>,
        sector: u32,
        count: u32,
    ) -> Result<Vec<u8>, DriveError> {
        let device = session.device()?;
        let length = buffer_len(count, SECTOR_SIZE as usize)?;
        if length == 0 {
            return Ok(Vec::new());
        }

        let offset = u64::from(sector) * SECTOR_SIZE;
        device
            .seek_to(offset)
            .map_err(|source| DriveError::PositionError { offset, source })?;

        let mut buffer = vec![0u8; length];
        let actual = device.read(&mut buffer)?;
        if actual != length {
            return Err(DriveError::ShortRead {
                expected: length,
                actual,
            });
        }

        Ok(buffer)
    }

    /// Read `count` raw sectors starting at `sector`.
    ///
    /// Each sector is its own READ CD command: a multi-sector read that
    /// crosses from an audio track into a data track fails as a whole on real
    /// drives. The first failing sector aborts the call.
    pub fn read_raw<D: DeviceIo>(
        &self,
        session: &mut DeviceSession<D>,
        sector: u32,
        count: u32,
    ) -> Result<Vec<u8>, DriveError> {
        let device = session.device()?;
        let length = buffer_len(count, RAW_SECTOR_SIZE)?;
        if sector.checked_add(count.saturating_sub(1)).is_none() {
            return Err(invalid_range(sector, count).into());
        }

        let mut buffer = vec![0u8; length];
        for (n, chunk) in buffer.chunks_exact_mut(RAW_SECTOR_SIZE).enumerate() {
            let current = sector + n as u32;
            let request = PassThroughRequest::read_cd(current, self.raw_timeout_secs);

            match device.pass_through(&request, chunk) {
                Ok(reply) if reply.scsi_status != GOOD => {
                    log::error!(
                        "Raw read failed at sector {}: SCSI status 0x{:02X}; sense: {}",
                        current,
                        reply.scsi_status,
                        format_sense(&reply.sense)
                    );
                    return Err(DriveError::RawReadFailed {
                        sector: current,
                        sense: reply.sense,
                    });
                }
                Ok(reply) => {
                    if reply.transferred as usize != RAW_SECTOR_SIZE {
                        log::warn!(
                            "Short raw transfer of {} bytes at sector {}",
                            reply.transferred,
                            current
                        );
                    }
                }
                Err(failure) => {
                    log::error!(
                        "Raw read failed at sector {}: {}; sense: {}",
                        current,
                        failure.source,
                        format_sense(&failure.sense)
                    );
                    return Err(DriveError::RawReadFailed {
                        sector: current,
                        sense: failure.sense,
                    });
                }
            }
        }

        Ok(buffer)
    }
}

fn invalid_range(sector: u32, count: u32) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("Sector range {}+{} exceeds 32-bit addressing", sector, count),
    )
}

/// Byte size of `count` sectors, rejecting sizes the host cannot allocate
fn buffer_len(count: u32, sector_size: usize) -> Result<usize, DriveError> {
    usize::try_from(count)
        .ok()
        .and_then(|count| count.checked_mul(sector_size))
        .ok_or_else(|| {
            DriveError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} sectors do not fit in memory", count),
            ))
        })
}
