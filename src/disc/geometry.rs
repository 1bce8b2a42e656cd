//! Disc geometry model
//!
//! Each media topology carries only the fields that make sense for it, so a
//! CD or single-layer DVD can never report a layer break.

use crate::ioctl::dvd::{LayerDescriptor, SECTOR_ADDRESS_MASK};

/// Kind of medium in the drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Cd,
    DvdSingleLayer,
    /// Dual layer, Parallel Track Path
    DvdPtp,
    /// Dual layer, Opposite Track Path
    DvdOtp,
}

impl MediaType {
    /// Numeric code used by emulator front-ends: negative for CD, else the DVD variant
    pub fn code(self) -> i32 {
        match self {
            Self::Cd => -1,
            Self::DvdSingleLayer => 0,
            Self::DvdPtp => 1,
            Self::DvdOtp => 2,
        }
    }

    pub fn is_dvd(self) -> bool {
        self != Self::Cd
    }

    /// Get the display name for this media type
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Cd => "CD",
            Self::DvdSingleLayer => "DVD (single layer)",
            Self::DvdPtp => "DVD (dual layer, PTP)",
            Self::DvdOtp => "DVD (dual layer, OTP)",
        }
    }
}

/// Size and layout of the disc in the drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscGeometry {
    Cd { sectors: u32 },
    DvdSingleLayer { sectors: u32 },
    DvdPtp { sectors: u32, layer_break: u32 },
    DvdOtp { sectors: u32, layer_break: u32 },
}

impl DiscGeometry {
    pub fn media_type(&self) -> MediaType {
        match self {
            Self::Cd { .. } => MediaType::Cd,
            Self::DvdSingleLayer { .. } => MediaType::DvdSingleLayer,
            Self::DvdPtp { .. } => MediaType::DvdPtp,
            Self::DvdOtp { .. } => MediaType::DvdOtp,
        }
    }

    /// Total addressable sectors
    pub fn sector_count(&self) -> u32 {
        match *self {
            Self::Cd { sectors }
            | Self::DvdSingleLayer { sectors }
            | Self::DvdPtp { sectors, .. }
            | Self::DvdOtp { sectors, .. } => sectors,
        }
    }

    /// Last sector of layer 0 relative to the data start; 0 unless dual layer
    pub fn layer_break(&self) -> u32 {
        match *self {
            Self::DvdPtp { layer_break, .. } | Self::DvdOtp { layer_break, .. } => layer_break,
            Self::Cd { .. } | Self::DvdSingleLayer { .. } => 0,
        }
    }

    /// Single-layer DVD: one contiguous extent
    pub fn dvd_single_layer(layer0: &LayerDescriptor) -> Option<Self> {
        Some(Self::DvdSingleLayer {
            sectors: layer0.extent()?,
        })
    }

    /// Parallel Track Path: each layer has its own start/end range
    pub fn dvd_parallel(layer0: &LayerDescriptor, layer1: &LayerDescriptor) -> Option<Self> {
        let layer_break = layer0.end_sector.checked_sub(layer0.starting_sector)?;
        let sectors = layer0.extent()?.checked_add(layer1.extent()?)?;
        Some(Self::DvdPtp {
            sectors,
            layer_break,
        })
    }

    /// Opposite Track Path: layer 1 counts down from the outer edge, so its
    /// first address is the 24-bit complement of layer 0's last one.
    pub fn dvd_opposite(layer0: &LayerDescriptor) -> Option<Self> {
        let end_layer0 = layer0.end_layer_zero_sector;
        let layer_break = end_layer0.checked_sub(layer0.starting_sector)?;
        let layer1_start = !end_layer0 & SECTOR_ADDRESS_MASK;
        let layer1_sectors = layer0.end_sector.checked_sub(layer1_start)?.checked_add(1)?;
        let sectors = layer_break.checked_add(1)?.checked_add(layer1_sectors)?;
        Some(Self::DvdOtp {
            sectors,
            layer_break,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ioctl::dvd::{test_layer, TrackPath};

    #[test]
    fn test_media_type_codes() {
        assert_eq!(MediaType::Cd.code(), -1);
        assert_eq!(MediaType::DvdSingleLayer.code(), 0);
        assert_eq!(MediaType::DvdPtp.code(), 1);
        assert_eq!(MediaType::DvdOtp.code(), 2);
        assert!(!MediaType::Cd.is_dvd());
    }

    #[test]
    fn test_single_layer() {
        let layer0 = test_layer(TrackPath::Parallel, 0, 0x30000, 0x180000, 0);
        let geometry = DiscGeometry::dvd_single_layer(&layer0).unwrap();
        assert_eq!(geometry.media_type(), MediaType::DvdSingleLayer);
        assert_eq!(geometry.sector_count(), 0x150001);
        assert_eq!(geometry.layer_break(), 0);
    }

    #[test]
    fn test_parallel_track_path() {
        let layer0 = test_layer(TrackPath::Parallel, 1, 0x30000, 0x1FFFFF, 0);
        let layer1 = test_layer(TrackPath::Parallel, 1, 0x30000, 0x1A0000, 0);
        let geometry = DiscGeometry::dvd_parallel(&layer0, &layer1).unwrap();

        let layer0_sectors = 0x1FFFFF - 0x30000 + 1;
        let layer1_sectors = 0x1A0000 - 0x30000 + 1;
        assert_eq!(geometry.media_type(), MediaType::DvdPtp);
        assert_eq!(geometry.sector_count(), layer0_sectors + layer1_sectors);
        assert_eq!(geometry.layer_break(), layer0_sectors - 1);
        assert_eq!(geometry.layer_break(), 0x1FFFFF - 0x30000);
    }

    #[test]
    fn test_opposite_track_path() {
        let layer0 = test_layer(TrackPath::Opposite, 1, 0x30000, 0xFCFFFF, 0x1FFFFF);
        let geometry = DiscGeometry::dvd_opposite(&layer0).unwrap();

        // Layer 1 starts at !0x1FFFFF & 0xFFFFFF = 0xE00000
        assert_eq!(geometry.media_type(), MediaType::DvdOtp);
        assert_eq!(geometry.layer_break(), 0x1CFFFF);
        assert_eq!(geometry.sector_count(), (0x1FFFFF - 0x30000 + 1) + (0xFCFFFF - 0xE00000 + 1));
        assert_eq!(geometry.sector_count(), 0x3A0000);
    }

    #[test]
    fn test_opposite_track_path_underflow() {
        // End sector below the complemented layer-1 start is not a valid disc
        let layer0 = test_layer(TrackPath::Opposite, 1, 0x30000, 0x100000, 0x1FFFFF);
        assert_eq!(DiscGeometry::dvd_opposite(&layer0), None);
    }

    #[test]
    fn test_cd_has_no_layer_break() {
        let geometry = DiscGeometry::Cd { sectors: 333_000 };
        assert_eq!(geometry.media_type(), MediaType::Cd);
        assert_eq!(geometry.layer_break(), 0);
    }
}
