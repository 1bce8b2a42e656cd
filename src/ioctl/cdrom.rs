//! CD-ROM table of contents and speed control payloads

use std::io;

use super::short_reply;

/// Track number the drive uses for the lead-out record
pub const LEAD_OUT_TRACK: u8 = 0xAA;

/// Most track records a TOC reply can carry
pub const MAXIMUM_NUMBER_TRACKS: usize = 100;

/// Size of one TRACK_DATA record
pub const TRACK_RECORD_LEN: usize = 8;

/// Size of the CDROM_TOC reply buffer
pub const TOC_REPLY_LEN: usize = 4 + MAXIMUM_NUMBER_TRACKS * TRACK_RECORD_LEN;

/// Size of an encoded CDROM_READ_TOC_EX request
pub const READ_TOC_EX_LEN: usize = 4;

/// Size of an encoded CDROM_SET_SPEED request
pub const SET_SPEED_LEN: usize = 12;

/// Speed value that asks the drive for its maximum
pub const SPEED_MAX: u16 = 0xFFFF;

const TOC_FORMAT_TOC: u8 = 0;

/// A READ_TOC_EX request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTocRequest {
    /// Report addresses as MSF instead of LBA
    pub msf: bool,
    /// First track (or session) of interest
    pub session_track: u8,
}

impl Default for ReadTocRequest {
    fn default() -> Self {
        Self {
            msf: false,
            session_track: 1,
        }
    }
}

impl ReadTocRequest {
    /// Byte 0 holds the format in its low nibble and the MSF flag in bit 7
    pub fn encode(&self) -> [u8; READ_TOC_EX_LEN] {
        let msf = if self.msf { 0x80 } else { 0 };
        [TOC_FORMAT_TOC | msf, self.session_track, 0, 0]
    }
}

/// One track record from a TOC reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackRecord {
    pub track_number: u8,
    pub adr: u8,
    pub control: u8,
    pub lba: u32,
}

impl TrackRecord {
    fn parse(record: &[u8]) -> Self {
        Self {
            control: record[1] & 0x0F,
            adr: record[1] >> 4,
            track_number: record[2],
            // Address[0] is reserved in LBA form
            lba: (u32::from(record[5]) << 16) | (u32::from(record[6]) << 8) | u32::from(record[7]),
        }
    }

    /// Whether this is the lead-out pseudo-track
    pub fn is_lead_out(&self) -> bool {
        self.track_number == LEAD_OUT_TRACK
    }
}

/// Decoded CDROM_TOC reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocReply {
    pub first_track: u8,
    pub last_track: u8,
    /// All records in disc order, lead-out included
    pub records: Vec<TrackRecord>,
}

impl TocReply {
    /// Parse a TOC reply.
    ///
    /// The big-endian length prefix counts everything after itself, so the
    /// number of records is `(length - 2) / 8`.
    pub fn parse(reply: &[u8]) -> io::Result<Self> {
        if reply.len() < 4 {
            return Err(short_reply("CD TOC", reply.len(), 4));
        }

        let declared = usize::from(u16::from_be_bytes([reply[0], reply[1]]));
        let track_count =
            (declared.saturating_sub(2) / TRACK_RECORD_LEN).min(MAXIMUM_NUMBER_TRACKS);
        let needed = 4 + track_count * TRACK_RECORD_LEN;
        if reply.len() < needed {
            return Err(short_reply("CD TOC", reply.len(), needed));
        }

        let records = reply[4..needed]
            .chunks_exact(TRACK_RECORD_LEN)
            .map(TrackRecord::parse)
            .collect();

        Ok(Self {
            first_track: reply[2],
            last_track: reply[3],
            records,
        })
    }
}

/// A CDROM_SET_SPEED request in KB/s
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetSpeedRequest {
    pub read_speed: u16,
    pub write_speed: u16,
}

impl SetSpeedRequest {
    /// Same speed for reading and writing
    pub fn uniform(speed: u16) -> Self {
        Self {
            read_speed: speed,
            write_speed: speed,
        }
    }

    /// Request type (set speed) and rotation control (default) are both 0
    pub fn encode(&self) -> [u8; SET_SPEED_LEN] {
        let mut buf = [0u8; SET_SPEED_LEN];
        buf[4..6].copy_from_slice(&self.read_speed.to_le_bytes());
        buf[6..8].copy_from_slice(&self.write_speed.to_le_bytes());
        buf
    }

    /// Decode an encoded request
    pub fn decode(buf: &[u8]) -> Option<Self> {
        let read_speed = u16::from_le_bytes(buf.get(4..6)?.try_into().ok()?);
        let write_speed = u16::from_le_bytes(buf.get(6..8)?.try_into().ok()?);
        Some(Self {
            read_speed,
            write_speed,
        })
    }
}

/// Build a TOC reply the way a drive fills it in
#[cfg(test)]
pub(crate) fn toc_reply(records: &[TrackRecord]) -> Vec<u8> {
    let mut buf = vec![0u8; TOC_REPLY_LEN];
    let declared = (2 + records.len() * TRACK_RECORD_LEN) as u16;
    buf[0..2].copy_from_slice(&declared.to_be_bytes());
    buf[2] = records.first().map(|r| r.track_number).unwrap_or(0);
    buf[3] = records
        .iter()
        .filter(|r| !r.is_lead_out())
        .last()
        .map(|r| r.track_number)
        .unwrap_or(0);
    for (i, r) in records.iter().enumerate() {
        let at = 4 + i * TRACK_RECORD_LEN;
        buf[at + 1] = (r.adr << 4) | (r.control & 0x0F);
        buf[at + 2] = r.track_number;
        buf[at + 5..at + 8].copy_from_slice(&r.lba.to_be_bytes()[1..]);
    }
    buf
}

#[cfg(test)]
pub(crate) fn track(track_number: u8, control: u8, lba: u32) -> TrackRecord {
    TrackRecord {
        track_number,
        adr: 1,
        control,
        lba,
    }
}
