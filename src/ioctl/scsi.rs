//! SCSI passthrough: the READ CD command block and the passthrough envelope
//!
//! The passthrough envelope embeds a pointer to the caller's data buffer, so
//! its layout depends on the target's pointer width.

use std::io;

use super::short_reply;

/// Bytes in a raw CD sector (sync + header + user data + EDC/ECC)
pub const RAW_SECTOR_SIZE: usize = 2352;

/// Sense buffer appended to the passthrough envelope
pub const SENSE_BUFFER_LEN: usize = 20;

/// READ CD operation code
pub const READ_CD: u8 = 0xBE;

/// SCSI status for a command that completed without error
pub const GOOD: u8 = 0x00;

/// READ CD byte 9: sync, all headers, user data and EDC/ECC. No C2, no subchannel
const READ_CD_FIELDS_FULL_SECTOR: u8 = 0xF8;

const CDB_LEN_12: u8 = 12;
const SCSI_IOCTL_DATA_IN: u8 = 1;

/// Field offsets within SCSI_PASS_THROUGH_DIRECT
#[cfg(target_pointer_width = "64")]
mod layout {
    pub const DATA_BUFFER: usize = 24;
    pub const SENSE_INFO_OFFSET: usize = 32;
    pub const CDB: usize = 36;
    pub const HEADER_LEN: usize = 56;
    pub const ALIGN: usize = 8;
}

#[cfg(target_pointer_width = "32")]
mod layout {
    pub const DATA_BUFFER: usize = 20;
    pub const SENSE_INFO_OFFSET: usize = 24;
    pub const CDB: usize = 28;
    pub const HEADER_LEN: usize = 44;
    pub const ALIGN: usize = 4;
}

const LENGTH: usize = 0;
const SCSI_STATUS: usize = 2;
const CDB_LENGTH: usize = 6;
const SENSE_INFO_LENGTH: usize = 7;
const DATA_IN: usize = 8;
const DATA_TRANSFER_LENGTH: usize = 12;
const TIMEOUT: usize = 16;

/// Size of the header without the trailing sense buffer
pub const PASS_THROUGH_HEADER_LEN: usize = layout::HEADER_LEN;

/// Size of header plus sense buffer, padded to the structure alignment
pub const PASS_THROUGH_LEN: usize =
    (layout::HEADER_LEN + SENSE_BUFFER_LEN + layout::ALIGN - 1) / layout::ALIGN * layout::ALIGN;

/// A single passthrough command reading into a caller buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassThroughRequest {
    pub cdb: [u8; 16],
    pub cdb_len: u8,
    pub transfer_len: u32,
    pub timeout_secs: u32,
}

impl PassThroughRequest {
    /// READ CD of exactly one full 2352-byte sector.
    ///
    /// Sector type is left as "any" and the address is the absolute LBA,
    /// big-endian in bytes 2..6. The transfer length (bytes 6..9) is always 1.
    pub fn read_cd(lba: u32, timeout_secs: u32) -> Self {
        let mut cdb = [0u8; 16];
        cdb[0] = READ_CD;
        cdb[2..6].copy_from_slice(&lba.to_be_bytes());
        cdb[8] = 1;
        cdb[9] = READ_CD_FIELDS_FULL_SECTOR;
        Self {
            cdb,
            cdb_len: CDB_LEN_12,
            transfer_len: RAW_SECTOR_SIZE as u32,
            timeout_secs,
        }
    }

    /// The command bytes actually sent
    pub fn command(&self) -> &[u8] {
        &self.cdb[..usize::from(self.cdb_len)]
    }

    /// Logical block address of a READ CD request
    pub fn lba(&self) -> u32 {
        u32::from_be_bytes([self.cdb[2], self.cdb[3], self.cdb[4], self.cdb[5]])
    }

    /// Encode the passthrough envelope around `data_buffer`.
    ///
    /// The sense buffer follows the header directly, and its offset is
    /// recorded in the header so the driver knows where to write it.
    pub fn encode(&self, data_buffer: usize) -> [u8; PASS_THROUGH_LEN] {
        let mut buf = [0u8; PASS_THROUGH_LEN];
        buf[LENGTH..LENGTH + 2].copy_from_slice(&(layout::HEADER_LEN as u16).to_le_bytes());
        buf[CDB_LENGTH] = self.cdb_len;
        buf[SENSE_INFO_LENGTH] = SENSE_BUFFER_LEN as u8;
        buf[DATA_IN] = SCSI_IOCTL_DATA_IN;
        buf[DATA_TRANSFER_LENGTH..DATA_TRANSFER_LENGTH + 4]
            .copy_from_slice(&self.transfer_len.to_le_bytes());
        buf[TIMEOUT..TIMEOUT + 4].copy_from_slice(&self.timeout_secs.to_le_bytes());
        buf[layout::DATA_BUFFER..layout::DATA_BUFFER + std::mem::size_of::<usize>()]
            .copy_from_slice(&data_buffer.to_le_bytes());
        buf[layout::SENSE_INFO_OFFSET..layout::SENSE_INFO_OFFSET + 4]
            .copy_from_slice(&(layout::HEADER_LEN as u32).to_le_bytes());
        buf[layout::CDB..layout::CDB + 16].copy_from_slice(&self.cdb);
        buf
    }
}

/// What the driver wrote back into the envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassThroughReply {
    pub scsi_status: u8,
    /// Bytes actually transferred
    pub transferred: u32,
    pub sense: Vec<u8>,
}

impl PassThroughReply {
    /// Decode a returned envelope.
    ///
    /// The sense length reported by the driver is capped to the buffer we
    /// supplied.
    pub fn decode(envelope: &[u8]) -> io::Result<Self> {
        let sense_end = layout::HEADER_LEN + SENSE_BUFFER_LEN;
        if envelope.len() < sense_end {
            return Err(short_reply("SCSI passthrough", envelope.len(), sense_end));
        }

        let transferred = u32::from_le_bytes([
            envelope[DATA_TRANSFER_LENGTH],
            envelope[DATA_TRANSFER_LENGTH + 1],
            envelope[DATA_TRANSFER_LENGTH + 2],
            envelope[DATA_TRANSFER_LENGTH + 3],
        ]);
        let sense_len = usize::from(envelope[SENSE_INFO_LENGTH]).min(SENSE_BUFFER_LEN);

        Ok(Self {
            scsi_status: envelope[SCSI_STATUS],
            transferred,
            sense: envelope[layout::HEADER_LEN..layout::HEADER_LEN + sense_len].to_vec(),
        })
    }
}
