//! Table of Contents (TOC) and disc identifiers
//!
//! Holds the track list read from the drive and derives the MusicBrainz and
//! FreeDB disc IDs from it.

use base64::Engine;
use sha1::{Digest, Sha1};

use crate::ioctl::cdrom::TocReply;

/// Frames per second (CD audio)
const FRAMES_PER_SECOND: u32 = 75;

/// Frames between MSF 00:00:00 and LBA 0 (the two-second pregap)
const LBA_TO_MSF_OFFSET: u32 = 150;

/// Control nibble bit marking a data track
const CONTROL_DATA_TRACK: u8 = 0x04;

/// One track as listed in the disc's TOC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    /// Start address of the track
    pub lba: u32,
    pub track_number: u8,
    /// Sub-channel Q mode
    pub adr: u8,
    /// Track control flags
    pub control: u8,
}

impl TocEntry {
    pub fn is_data(&self) -> bool {
        self.control & CONTROL_DATA_TRACK != 0
    }

    pub fn is_audio(&self) -> bool {
        !self.is_data()
    }
}

/// TOC data for the disc in the drive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toc {
    /// Tracks in disc order, lead-out excluded
    pub tracks: Vec<TocEntry>,
    /// Start of the lead-out area, if the drive reported it
    pub lead_out: Option<u32>,
}

impl Toc {
    /// Build from a drive reply, moving the lead-out record out of the track list
    pub fn from_reply(reply: &TocReply) -> Self {
        let mut toc = Self::default();
        for record in &reply.records {
            if record.is_lead_out() {
                toc.lead_out = Some(record.lba);
                continue;
            }
            toc.tracks.push(TocEntry {
                lba: record.lba,
                track_number: record.track_number,
                adr: record.adr,
                control: record.control,
            });
        }
        toc
    }

    /// Get number of tracks
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Track offsets and lead-out in MSF frames, if the TOC is complete
    fn frame_offsets(&self) -> Option<(u32, Vec<u32>)> {
        let lead_out = self.lead_out? + LBA_TO_MSF_OFFSET;
        if self.tracks.is_empty() {
            return None;
        }
        let offsets = self.tracks.iter().map(|t| t.lba + LBA_TO_MSF_OFFSET).collect();
        Some((lead_out, offsets))
    }

    /// Calculate MusicBrainz DiscID
    ///
    /// Reference: https://musicbrainz.org/doc/Disc_ID_Calculation
    pub fn musicbrainz_id(&self) -> Option<String> {
        let (lead_out, offsets) = self.frame_offsets()?;
        let first_track = self.tracks.first()?.track_number;
        let last_track = self.tracks.last()?.track_number;

        // Offsets sit in the slot of their track number; unused slots are zero
        let mut slots = [0u32; 99];
        for (track, offset) in self.tracks.iter().zip(&offsets) {
            if let Some(slot) = usize::from(track.track_number)
                .checked_sub(1)
                .and_then(|i| slots.get_mut(i))
            {
                *slot = *offset;
            }
        }

        // Uppercase hex: first/last track as 2 digits, lead-out and 99 offsets as 8
        let mut data = String::with_capacity(2 + 2 + 100 * 8);
        data.push_str(&format!("{:02X}{:02X}{:08X}", first_track, last_track, lead_out));
        for offset in slots {
            data.push_str(&format!("{:08X}", offset));
        }

        let mut hasher = Sha1::new();
        hasher.update(data.as_bytes());
        let result = hasher.finalize();

        // MusicBrainz swaps "+/=" for "._-" so the ID is URL-safe
        let encoded = base64::engine::general_purpose::STANDARD.encode(result);
        Some(
            encoded
                .chars()
                .map(|c| match c {
                    '+' => '.',
                    '/' => '_',
                    '=' => '-',
                    c => c,
                })
                .collect(),
        )
    }

    /// Calculate FreeDB DiscID
    ///
    /// Reference: http://ftp.freedb.org/pub/freedb/latest/CDDBPROTO
    pub fn freedb_id(&self) -> Option<String> {
        let (lead_out, offsets) = self.frame_offsets()?;

        let checksum: u32 = offsets
            .iter()
            .map(|offset| digit_sum(offset / FRAMES_PER_SECOND))
            .sum();

        let total_seconds = lead_out / FRAMES_PER_SECOND;
        let first_offset_seconds = offsets[0] / FRAMES_PER_SECOND;
        let length = total_seconds.saturating_sub(first_offset_seconds);

        let disc_id = ((checksum % 0xFF) << 24) | (length << 8) | offsets.len() as u32;
        Some(format!("{:08x}", disc_id))
    }

    /// Get total disc length formatted as MM:SS
    pub fn total_time_string(&self) -> Option<String> {
        let seconds = (self.lead_out? + LBA_TO_MSF_OFFSET) / FRAMES_PER_SECOND;
        Some(format!("{:02}:{:02}", seconds / 60, seconds % 60))
    }
}

/// Sum of decimal digits (for FreeDB checksum)
fn digit_sum(mut n: u32) -> u32 {
    let mut sum = 0;
    while n > 0 {
        sum += n % 10;
        n /= 10;
    }
    sum
}
