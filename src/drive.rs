//! Optical drive front end
//!
//! [`OpticalDrive`] ties a device session, the geometry prober and the sector
//! reader together into the surface a virtual drive needs. Geometry queries
//! are lazy and cached; the plain accessors fall back to zero values when no
//! disc can be probed.

use crate::config::{DriveConfig, SpindleConfig};
use crate::device::{DeviceIo, DeviceSession, FileDevice};
use crate::disc::{
    poll_changed, DiscGeometry, DiscInfo, GeometryProber, MediaType, SectorReader, TocEntry,
};
use crate::error::DriveError;
use crate::ioctl::cdrom::{SetSpeedRequest, SPEED_MAX};
use crate::ioctl::ControlCode;

/// An open CD/DVD drive
pub struct OpticalDrive<D: DeviceIo = FileDevice> {
    session: DeviceSession<D>,
    prober: GeometryProber,
    reader: SectorReader,
    spindle: SpindleConfig,
    throttled: bool,
}

impl OpticalDrive<FileDevice> {
    /// Open the drive named in the config
    pub fn open(config: &DriveConfig) -> Result<Self, DriveError> {
        let session = DeviceSession::open(&config.device_path)?;
        Ok(Self::with_session(session, config))
    }
}

impl<D: DeviceIo> OpticalDrive<D> {
    /// Wrap an already open session, throttling the spindle if configured
    pub fn with_session(session: DeviceSession<D>, config: &DriveConfig) -> Self {
        let mut drive = Self {
            session,
            prober: GeometryProber::new(),
            reader: SectorReader::new(config.raw_read_timeout_secs),
            spindle: config.spindle.clone(),
            throttled: false,
        };

        if drive.spindle.enabled {
            drive.set_spindle_speed(false);
        }
        drive
    }

    /// Close and reopen the device. Cached geometry is dropped
    pub fn reopen(&mut self) -> Result<(), DriveError> {
        self.prober.invalidate();
        self.session.reopen()
    }

    /// Probe the disc if nothing is cached
    pub fn refresh(&mut self) -> Result<&DiscInfo, DriveError> {
        self.prober.refresh(&mut self.session)
    }

    pub fn geometry(&mut self) -> Result<DiscGeometry, DriveError> {
        Ok(self.refresh()?.geometry)
    }

    /// Total sectors on the disc, 0 if it cannot be probed
    pub fn sector_count(&mut self) -> u32 {
        self.geometry().map(|g| g.sector_count()).unwrap_or(0)
    }

    /// Last sector of layer 0 on dual-layer DVDs, otherwise 0
    pub fn layer_break_address(&mut self) -> u32 {
        self.geometry().map(|g| g.layer_break()).unwrap_or(0)
    }

    /// -1 for CD, 0/1/2 for single-layer/PTP/OTP DVD; 0 if it cannot be probed
    pub fn media_type(&mut self) -> i32 {
        self.geometry().map(|g| g.media_type().code()).unwrap_or(0)
    }

    /// CD tracks in disc order, without the lead-out. Empty for DVDs
    pub fn toc(&mut self) -> &[TocEntry] {
        match self.prober.refresh(&mut self.session) {
            Ok(info) => info.tracks(),
            Err(_) => &[],
        }
    }

    pub fn read_cooked(&mut self, sector: u32, count: u32) -> Result<Vec<u8>, DriveError> {
        self.reader.read_cooked(&mut self.session, sector, count)
    }

    pub fn read_raw(&mut self, sector: u32, count: u32) -> Result<Vec<u8>, DriveError> {
        self.reader.read_raw(&mut self.session, sector, count)
    }

    /// Check for a media change; a change makes the next query probe again
    pub fn disc_changed(&mut self) -> Result<bool, DriveError> {
        poll_changed(&mut self.session, &mut self.prober)
    }

    /// Whether the device handle is open
    pub fn is_ok(&self) -> bool {
        self.session.is_open()
    }

    pub fn session(&self) -> &DeviceSession<D> {
        &self.session
    }

    /// Limit the read speed for the current media, or hand control back to
    /// the drive. Failures are logged, never returned.
    pub fn set_spindle_speed(&mut self, restore_defaults: bool) {
        let speed = if restore_defaults {
            SPEED_MAX
        } else if self.media_type() < 0 {
            self.spindle.cd_speed_kbs
        } else {
            self.spindle.dvd_speed_kbs
        };

        let request = SetSpeedRequest::uniform(speed).encode();
        let result = self.session.device().and_then(|device| {
            device
                .control(ControlCode::CdromSetSpeed, &request, &mut [])
                .map_err(DriveError::from)
        });

        match result {
            Ok(_) if restore_defaults => {
                log::info!("Spindle speed restored to drive defaults");
                self.throttled = false;
            }
            Ok(_) => {
                log::info!("Spindle speed set to {} KB/s", speed);
                self.throttled = true;
            }
            Err(e) => log::warn!("Failed to set spindle speed: {}", e),
        }
    }

    /// Media type of the cached disc, if one has been probed
    pub fn cached_media_type(&self) -> Option<MediaType> {
        self.prober.cached().map(|info| info.geometry.media_type())
    }
}

impl<D: DeviceIo> Drop for OpticalDrive<D> {
    fn drop(&mut self) {
        if self.throttled && self.session.is_open() {
            self.set_spindle_speed(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{mock_session, MockState};
    use crate::ioctl::cdrom::{toc_reply, track, LEAD_OUT_TRACK};
    use crate::ioctl::dvd::{test_layer, TrackPath};

    fn quiet() -> DriveConfig {
        DriveConfig {
            spindle: SpindleConfig {
                enabled: false,
                ..SpindleConfig::default()
            },
            ..DriveConfig::default()
        }
    }

    fn audio_cd() -> MockState {
        MockState {
            toc: Some(toc_reply(&[
                track(1, 0, 0),
                track(2, 0, 15213),
                track(3, 4, 32164),
                track(LEAD_OUT_TRACK, 0, 40000),
            ])),
            length: Some(2048 * 40000),
            ..MockState::default()
        }
    }

    fn otp_dvd() -> MockState {
        let layer0 = test_layer(TrackPath::Opposite, 1, 0x30000, 0xFCFFFF, 0x1FFFFF);
        MockState {
            dvd_layers: vec![Some(layer0.to_reply())],
            ..MockState::default()
        }
    }

    #[test]
    fn test_cd_accessors() {
        let (session, state) = mock_session(audio_cd());
        let mut drive = OpticalDrive::with_session(session, &quiet());

        assert_eq!(drive.media_type(), -1);
        assert_eq!(drive.sector_count(), 40000);
        assert_eq!(drive.layer_break_address(), 0);
        let toc = drive.toc();
        assert_eq!(toc.len(), 3);
        assert_eq!(toc[1].lba, 15213);
        assert!(toc[2].is_data());
        assert!(drive.is_ok());

        // One probe serves every accessor
        assert_eq!(state.lock().unwrap().count(ControlCode::CdromReadTocEx), 1);
    }

    #[test]
    fn test_dvd_accessors() {
        let (session, _state) = mock_session(otp_dvd());
        let mut drive = OpticalDrive::with_session(session, &quiet());

        assert_eq!(drive.media_type(), 2);
        assert_eq!(drive.sector_count(), 0x3A0000);
        assert_eq!(drive.layer_break_address(), 0x1CFFFF);
        assert!(drive.toc().is_empty());
        assert_eq!(drive.cached_media_type(), Some(MediaType::DvdOtp));
    }

    #[test]
    fn test_empty_drive_defaults() {
        let (session, _state) = mock_session(MockState::default());
        let mut drive = OpticalDrive::with_session(session, &quiet());

        assert_eq!(drive.media_type(), 0);
        assert_eq!(drive.sector_count(), 0);
        assert_eq!(drive.layer_break_address(), 0);
        assert!(drive.toc().is_empty());
        assert!(matches!(drive.geometry(), Err(DriveError::ProbeFailed)));
        assert!(drive.cached_media_type().is_none());
    }

    #[test]
    fn test_disc_change_reprobes() {
        let (session, state) = mock_session(audio_cd());
        let mut drive = OpticalDrive::with_session(session, &quiet());
        assert_eq!(drive.media_type(), -1);
        assert!(!drive.disc_changed().unwrap());
        assert_eq!(drive.sector_count(), 40000);

        {
            let mut state = state.lock().unwrap();
            let dvd = otp_dvd();
            state.dvd_layers = dvd.dvd_layers;
            state.media_changed = true;
        }
        assert!(drive.disc_changed().unwrap());
        state.lock().unwrap().media_changed = false;

        assert_eq!(drive.media_type(), 2);
        assert_eq!(state.lock().unwrap().count(ControlCode::DvdStartSession), 2);
    }

    #[test]
    fn test_reopen_invalidates() {
        let (session, state) = mock_session(audio_cd());
        let mut drive = OpticalDrive::with_session(session, &quiet());
        drive.sector_count();

        drive.reopen().unwrap();
        drive.sector_count();

        let state = state.lock().unwrap();
        assert_eq!(state.opens, 2);
        assert_eq!(state.count(ControlCode::CdromReadTocEx), 2);
    }

    #[test]
    fn test_reads_pass_through() {
        let (session, state) = mock_session(MockState {
            image: vec![7u8; 2048 * 2],
            ..MockState::default()
        });
        let mut drive = OpticalDrive::with_session(session, &quiet());

        assert_eq!(drive.read_cooked(1, 1).unwrap(), vec![7u8; 2048]);
        assert_eq!(drive.read_raw(16, 2).unwrap().len(), 2 * 2352);
        assert_eq!(state.lock().unwrap().raw_lbas, vec![16, 17]);
    }

    #[test]
    fn test_spindle_throttles_cd_and_restores_on_drop() {
        let (session, state) = mock_session(audio_cd());
        let drive = OpticalDrive::with_session(session, &DriveConfig::default());
        assert_eq!(state.lock().unwrap().speeds, vec![SetSpeedRequest::uniform(4800)]);

        drop(drive);
        assert_eq!(
            state.lock().unwrap().speeds,
            vec![SetSpeedRequest::uniform(4800), SetSpeedRequest::uniform(SPEED_MAX)]
        );
    }

    #[test]
    fn test_spindle_throttles_dvd() {
        let (session, state) = mock_session(otp_dvd());
        let _drive = OpticalDrive::with_session(session, &DriveConfig::default());
        assert_eq!(state.lock().unwrap().speeds, vec![SetSpeedRequest::uniform(11080)]);
    }

    #[test]
    fn test_spindle_disabled() {
        let (session, state) = mock_session(audio_cd());
        let drive = OpticalDrive::with_session(session, &quiet());
        drop(drive);

        let state = state.lock().unwrap();
        assert!(state.speeds.is_empty());
        assert_eq!(state.count(ControlCode::CdromReadTocEx), 0);
    }

    #[test]
    fn test_closed_session() {
        let (mut session, state) = mock_session(audio_cd());
        session.close();
        let mut drive = OpticalDrive::with_session(session, &DriveConfig::default());

        assert!(!drive.is_ok());
        assert_eq!(drive.sector_count(), 0);
        assert!(matches!(drive.disc_changed(), Err(DriveError::SessionClosed)));
        drop(drive);
        assert!(state.lock().unwrap().speeds.is_empty());
    }
}
