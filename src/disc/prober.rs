//! Disc geometry probing
//!
//! Works out what is in the drive: a DVD physical-descriptor probe first, then
//! a CD TOC probe. The result is cached until something invalidates it.

use std::io;

use super::geometry::DiscGeometry;
use super::reader::SECTOR_SIZE;
use super::toc::{Toc, TocEntry};
use crate::device::{DeviceIo, DeviceSession};
use crate::error::DriveError;
use crate::ioctl::cdrom::{ReadTocRequest, TocReply, TOC_REPLY_LEN};
use crate::ioctl::dvd::{
    decode_session_id, LayerDescriptor, ReadStructureRequest, TrackPath, PHYSICAL_DESCRIPTOR_LEN,
    SESSION_ID_LEN,
};
use crate::ioctl::{decode_length_info, ControlCode, LENGTH_INFO_LEN};

/// Everything one successful probe learns about the disc
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscInfo {
    pub geometry: DiscGeometry,
    /// Empty for DVDs
    pub toc: Toc,
}

impl DiscInfo {
    pub fn tracks(&self) -> &[TocEntry] {
        &self.toc.tracks
    }
}

#[derive(Debug, Default)]
enum Readiness {
    #[default]
    NotReady,
    Ready(DiscInfo),
}

/// Lazily probes the disc and memoizes the result.
///
/// The cache only changes through [`refresh`](Self::refresh) (which replaces
/// it whole) and [`invalidate`](Self::invalidate).
#[derive(Debug, Default)]
pub struct GeometryProber {
    state: Readiness,
}

impl GeometryProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cached data is authoritative
    pub fn is_ready(&self) -> bool {
        matches!(self.state, Readiness::Ready(_))
    }

    /// Cached result without touching the device
    pub fn cached(&self) -> Option<&DiscInfo> {
        match &self.state {
            Readiness::Ready(info) => Some(info),
            Readiness::NotReady => None,
        }
    }

    /// Forget the cached disc so the next query probes again
    pub fn invalidate(&mut self) {
        if self.is_ready() {
            log::debug!("Disc information invalidated");
        }
        self.state = Readiness::NotReady;
    }

    /// Probe the disc unless a cached result is available
    pub fn refresh<D: DeviceIo>(
        &mut self,
        session: &mut DeviceSession<D>,
    ) -> Result<&DiscInfo, DriveError> {
        if !self.is_ready() {
            let info = probe(session.device()?)?;
            self.state = Readiness::Ready(info);
        }

        self.cached().ok_or(DriveError::ProbeFailed)
    }
}

/// Run the probe sequence: DVD first, CD as the fallback
fn probe<D: DeviceIo>(device: &mut D) -> Result<DiscInfo, DriveError> {
    match probe_dvd(device) {
        Ok(geometry) => {
            log::info!(
                "Detected {}: {} sectors, layer break {}",
                geometry.media_type().display_name(),
                geometry.sector_count(),
                geometry.layer_break()
            );
            return Ok(DiscInfo {
                geometry,
                toc: Toc::default(),
            });
        }
        // CDs always end up here
        Err(e) => log::debug!("DVD probe failed, trying CD: {}", e),
    }

    match probe_cd(device) {
        Ok(info) => {
            log::info!(
                "Detected CD: {} sectors, {} tracks",
                info.geometry.sector_count(),
                info.toc.track_count()
            );
            Ok(info)
        }
        Err(e) => {
            log::warn!("CD probe failed: {}", e);
            Err(DriveError::ProbeFailed)
        }
    }
}

/// Read the physical format descriptor inside a DVD session.
///
/// The session is always closed again, whatever the outcome.
fn probe_dvd<D: DeviceIo>(device: &mut D) -> io::Result<DiscGeometry> {
    let mut reply = [0u8; SESSION_ID_LEN];
    let n = device.control(ControlCode::DvdStartSession, &[], &mut reply)?;
    let session_id = decode_session_id(&reply[..n])?;

    let result = read_dvd_geometry(device, session_id);

    if let Err(e) = device.control(ControlCode::DvdEndSession, &session_id.to_le_bytes(), &mut []) {
        log::debug!("Failed to end DVD session {}: {}", session_id, e);
    }

    result
}

fn read_dvd_geometry<D: DeviceIo>(device: &mut D, session_id: u32) -> io::Result<DiscGeometry> {
    let layer0 = read_physical_descriptor(device, session_id, 0)?;

    let geometry = if layer0.is_single_layer() {
        DiscGeometry::dvd_single_layer(&layer0)
    } else {
        match layer0.track_path {
            TrackPath::Parallel => {
                let layer1 = read_physical_descriptor(device, session_id, 1)?;
                DiscGeometry::dvd_parallel(&layer0, &layer1)
            }
            TrackPath::Opposite => DiscGeometry::dvd_opposite(&layer0),
        }
    };

    geometry.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Inconsistent DVD layer descriptor: {:?}", layer0),
        )
    })
}

fn read_physical_descriptor<D: DeviceIo>(
    device: &mut D,
    session_id: u32,
    layer: u8,
) -> io::Result<LayerDescriptor> {
    let request = ReadStructureRequest::physical(session_id, layer).encode();
    let mut reply = [0u8; PHYSICAL_DESCRIPTOR_LEN];
    let n = device.control(ControlCode::DvdReadStructure, &request, &mut reply)?;
    LayerDescriptor::parse(&reply[..n])
}

/// Read the TOC and the medium length. Both must succeed
fn probe_cd<D: DeviceIo>(device: &mut D) -> io::Result<DiscInfo> {
    let request = ReadTocRequest::default().encode();
    let mut reply = vec![0u8; TOC_REPLY_LEN];
    let n = device.control(ControlCode::CdromReadTocEx, &request, &mut reply)?;
    let toc = Toc::from_reply(&TocReply::parse(&reply[..n])?);

    let mut length = [0u8; LENGTH_INFO_LEN];
    let n = device.control(ControlCode::DiskGetLengthInfo, &[], &mut length)?;
    let bytes = decode_length_info(&length[..n])?;
    let sectors = u32::try_from(bytes / SECTOR_SIZE).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Medium length {} exceeds 32-bit sector addressing", bytes),
        )
    })?;

    Ok(DiscInfo {
        geometry: DiscGeometry::Cd { sectors },
        toc,
    })
}
