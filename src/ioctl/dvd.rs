//! DVD structure requests and the physical format descriptor
//!
//! The descriptor comes straight from the drive, so its multi-byte fields are
//! big-endian; the request itself is a host structure and little-endian.

use std::io;

use super::short_reply;

/// Size of a DVD session id
pub const SESSION_ID_LEN: usize = 4;

/// Size of an encoded DVD_READ_STRUCTURE request
pub const READ_STRUCTURE_LEN: usize = 24;

/// Descriptor header (length + reserved) preceding the layer descriptor
const DESCRIPTOR_HEADER_LEN: usize = 4;

/// Reply size for a physical descriptor read.
///
/// 4 header bytes plus 18 bytes of layer descriptor. Only 17 carry data, but
/// the driver rejects reads shorter than 18.
pub const PHYSICAL_DESCRIPTOR_LEN: usize = DESCRIPTOR_HEADER_LEN + 18;

/// Mask for the 24-bit sector addresses used by DVD layer descriptors
pub const SECTOR_ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// DVD structure formats understood by the drive layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StructureFormat {
    Physical = 0,
}

/// A DVD_READ_STRUCTURE request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadStructureRequest {
    pub format: StructureFormat,
    pub session_id: u32,
    pub layer: u8,
}

impl ReadStructureRequest {
    /// Physical descriptor request for one layer
    pub fn physical(session_id: u32, layer: u8) -> Self {
        Self {
            format: StructureFormat::Physical,
            session_id,
            layer,
        }
    }

    /// Encode to the host layout
    ///
    /// - bytes 0..8   : block byte offset (i64, always 0)
    /// - bytes 8..12  : structure format
    /// - bytes 12..16 : session id
    /// - byte  16     : layer number
    /// - bytes 17..24 : padding
    pub fn encode(&self) -> [u8; READ_STRUCTURE_LEN] {
        let mut buf = [0u8; READ_STRUCTURE_LEN];
        buf[8..12].copy_from_slice(&(self.format as u32).to_le_bytes());
        buf[12..16].copy_from_slice(&self.session_id.to_le_bytes());
        buf[16] = self.layer;
        buf
    }

    /// Layer number of an encoded request
    pub fn layer_of(encoded: &[u8]) -> Option<u8> {
        encoded.get(16).copied()
    }
}

/// Decode the session id returned by a start-session request
pub fn decode_session_id(reply: &[u8]) -> io::Result<u32> {
    reply
        .get(..SESSION_ID_LEN)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| short_reply("DVD session id", reply.len(), SESSION_ID_LEN))
}

/// How the second layer of a dual-layer disc is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackPath {
    /// Both layers run inside-out with independent address ranges
    Parallel,
    /// Layer 1 runs outside-in with complemented addresses
    Opposite,
}

/// Physical format descriptor for one layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor {
    pub book_type: u8,
    pub book_version: u8,
    pub disc_size: u8,
    pub maximum_rate: u8,
    pub layer_type: u8,
    pub track_path: TrackPath,
    /// Number of layers beyond the first (0 = single layer)
    pub additional_layers: u8,
    pub track_density: u8,
    pub linear_density: u8,
    pub starting_sector: u32,
    pub end_sector: u32,
    pub end_layer_zero_sector: u32,
    pub bca_present: bool,
}

impl LayerDescriptor {
    /// Parse the reply of a physical descriptor read (header included)
    pub fn parse(reply: &[u8]) -> io::Result<Self> {
        if reply.len() < PHYSICAL_DESCRIPTOR_LEN {
            return Err(short_reply(
                "DVD physical descriptor",
                reply.len(),
                PHYSICAL_DESCRIPTOR_LEN,
            ));
        }

        let d = &reply[DESCRIPTOR_HEADER_LEN..];
        let be32 = |at: usize| u32::from_be_bytes([d[at], d[at + 1], d[at + 2], d[at + 3]]);

        Ok(Self {
            book_version: d[0] & 0x0F,
            book_type: d[0] >> 4,
            maximum_rate: d[1] & 0x0F,
            disc_size: d[1] >> 4,
            layer_type: d[2] & 0x0F,
            track_path: if d[2] & 0x10 == 0 {
                TrackPath::Parallel
            } else {
                TrackPath::Opposite
            },
            additional_layers: (d[2] >> 5) & 0x03,
            track_density: d[3] & 0x0F,
            linear_density: d[3] >> 4,
            starting_sector: be32(4),
            end_sector: be32(8),
            end_layer_zero_sector: be32(12),
            bca_present: d[16] & 0x80 != 0,
        })
    }

    /// Whether the disc has only one recorded layer
    pub fn is_single_layer(&self) -> bool {
        self.additional_layers == 0
    }

    /// Sectors between the starting and end sector, inclusive
    pub fn extent(&self) -> Option<u32> {
        self.end_sector
            .checked_sub(self.starting_sector)?
            .checked_add(1)
    }

    /// Encode back into a reply buffer, as a drive would return it
    #[cfg(test)]
    pub(crate) fn to_reply(&self) -> [u8; PHYSICAL_DESCRIPTOR_LEN] {
        let mut buf = [0u8; PHYSICAL_DESCRIPTOR_LEN];
        buf[0..2].copy_from_slice(&((PHYSICAL_DESCRIPTOR_LEN - 2) as u16).to_be_bytes());
        let d = &mut buf[DESCRIPTOR_HEADER_LEN..];
        d[0] = (self.book_type << 4) | (self.book_version & 0x0F);
        d[1] = (self.disc_size << 4) | (self.maximum_rate & 0x0F);
        d[2] = (self.layer_type & 0x0F)
            | match self.track_path {
                TrackPath::Parallel => 0,
                TrackPath::Opposite => 0x10,
            }
            | ((self.additional_layers & 0x03) << 5);
        d[3] = (self.linear_density << 4) | (self.track_density & 0x0F);
        d[4..8].copy_from_slice(&self.starting_sector.to_be_bytes());
        d[8..12].copy_from_slice(&self.end_sector.to_be_bytes());
        d[12..16].copy_from_slice(&self.end_layer_zero_sector.to_be_bytes());
        d[16] = if self.bca_present { 0x80 } else { 0 };
        buf
    }
}

#[cfg(test)]
pub(crate) fn test_layer(
    track_path: TrackPath,
    additional_layers: u8,
    starting_sector: u32,
    end_sector: u32,
    end_layer_zero_sector: u32,
) -> LayerDescriptor {
    LayerDescriptor {
        book_type: 0,
        book_version: 1,
        disc_size: 0,
        maximum_rate: 2,
        layer_type: 1,
        track_path,
        additional_layers,
        track_density: 0,
        linear_density: 0,
        starting_sector,
        end_sector,
        end_layer_zero_sector,
        bca_present: false,
    }
}
