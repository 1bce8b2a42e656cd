//! Device-control wire formats
//!
//! Everything that has to match the operating system's device-control ABI byte
//! for byte lives here: control codes, request/reply layouts and SCSI command
//! blocks. The rest of the crate only sees typed values.

pub mod cdrom;
pub mod dvd;
pub mod scsi;

use std::fmt;
use std::io;

const FILE_DEVICE_CD_ROM: u32 = 0x02;
const FILE_DEVICE_CONTROLLER: u32 = 0x04;
const FILE_DEVICE_DISK: u32 = 0x07;
const FILE_DEVICE_FILE_SYSTEM: u32 = 0x09;
const IOCTL_STORAGE_BASE: u32 = 0x2D;
const FILE_DEVICE_DVD: u32 = 0x33;

const METHOD_BUFFERED: u32 = 0;
const METHOD_NEITHER: u32 = 3;

const FILE_ANY_ACCESS: u32 = 0;
const FILE_READ_ACCESS: u32 = 1;
const FILE_WRITE_ACCESS: u32 = 2;

/// Build a device-control code from its four fields
pub const fn ctl_code(device_type: u32, function: u32, method: u32, access: u32) -> u32 {
    (device_type << 16) | (access << 14) | (function << 2) | method
}

/// Device-control requests issued by the drive layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCode {
    /// Lift the volume-size limit so layer 1 of dual-layer DVDs is reachable
    AllowExtendedDasdIo,
    /// Open a DVD session (returns a 4-byte session id)
    DvdStartSession,
    /// Read a DVD structure, e.g. the physical format descriptor
    DvdReadStructure,
    /// Close a DVD session
    DvdEndSession,
    /// Read the CD table of contents
    CdromReadTocEx,
    /// Set drive read/write speed
    CdromSetSpeed,
    /// Total byte length of the medium
    DiskGetLengthInfo,
    /// Cheap "is the same medium still there" check
    StorageCheckVerify,
    /// SCSI command passthrough with a caller-supplied data buffer
    ScsiPassThroughDirect,
}

impl ControlCode {
    /// The numeric control code sent to the device
    pub const fn value(self) -> u32 {
        match self {
            Self::AllowExtendedDasdIo => {
                ctl_code(FILE_DEVICE_FILE_SYSTEM, 32, METHOD_NEITHER, FILE_ANY_ACCESS)
            }
            Self::DvdStartSession => {
                ctl_code(FILE_DEVICE_DVD, 0x0400, METHOD_BUFFERED, FILE_READ_ACCESS)
            }
            Self::DvdReadStructure => {
                ctl_code(FILE_DEVICE_DVD, 0x0450, METHOD_BUFFERED, FILE_READ_ACCESS)
            }
            Self::DvdEndSession => {
                ctl_code(FILE_DEVICE_DVD, 0x0403, METHOD_BUFFERED, FILE_READ_ACCESS)
            }
            Self::CdromReadTocEx => {
                ctl_code(FILE_DEVICE_CD_ROM, 0x0015, METHOD_BUFFERED, FILE_READ_ACCESS)
            }
            Self::CdromSetSpeed => {
                ctl_code(FILE_DEVICE_CD_ROM, 0x0018, METHOD_BUFFERED, FILE_READ_ACCESS)
            }
            Self::DiskGetLengthInfo => {
                ctl_code(FILE_DEVICE_DISK, 0x0017, METHOD_BUFFERED, FILE_READ_ACCESS)
            }
            Self::StorageCheckVerify => {
                ctl_code(IOCTL_STORAGE_BASE, 0x0200, METHOD_BUFFERED, FILE_READ_ACCESS)
            }
            Self::ScsiPassThroughDirect => ctl_code(
                FILE_DEVICE_CONTROLLER,
                0x0405,
                METHOD_BUFFERED,
                FILE_READ_ACCESS | FILE_WRITE_ACCESS,
            ),
        }
    }
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:08X})", self, self.value())
    }
}

/// Size of the GET_LENGTH_INFORMATION reply
pub const LENGTH_INFO_LEN: usize = 8;

/// Decode the medium byte length returned by `DiskGetLengthInfo`
pub fn decode_length_info(reply: &[u8]) -> io::Result<u64> {
    let bytes: [u8; LENGTH_INFO_LEN] = reply
        .get(..LENGTH_INFO_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| short_reply("length information", reply.len(), LENGTH_INFO_LEN))?;

    let length = i64::from_le_bytes(bytes);
    u64::try_from(length).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Negative medium length: {}", length),
        )
    })
}

/// Error for a reply buffer that is smaller than its fixed layout
pub(crate) fn short_reply(what: &str, got: usize, expected: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Truncated {} reply: {} bytes (expected {})", what, got, expected),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_code_values() {
        assert_eq!(ControlCode::AllowExtendedDasdIo.value(), 0x0009_0083);
        assert_eq!(ControlCode::DvdStartSession.value(), 0x0033_5000);
        assert_eq!(ControlCode::DvdReadStructure.value(), 0x0033_5140);
        assert_eq!(ControlCode::DvdEndSession.value(), 0x0033_500C);
        assert_eq!(ControlCode::CdromReadTocEx.value(), 0x0002_4054);
        assert_eq!(ControlCode::CdromSetSpeed.value(), 0x0002_4060);
        assert_eq!(ControlCode::DiskGetLengthInfo.value(), 0x0007_405C);
        assert_eq!(ControlCode::StorageCheckVerify.value(), 0x002D_4800);
        assert_eq!(ControlCode::ScsiPassThroughDirect.value(), 0x0004_D014);
    }

    #[test]
    fn test_decode_length_info() {
        let reply = (700u64 * 1024 * 1024).to_le_bytes();
        assert_eq!(decode_length_info(&reply).unwrap(), 734_003_200);
    }

    #[test]
    fn test_decode_length_info_rejects_garbage() {
        assert!(decode_length_info(&[0u8; 4]).is_err());
        assert!(decode_length_info(&(-1i64).to_le_bytes()).is_err());
    }
}
