//! Device session lifecycle

use std::io;
use std::path::{Path, PathBuf};

use super::{DeviceIo, FileDevice};
use crate::error::DriveError;
use crate::ioctl::ControlCode;

/// Opens a device handle for a path
pub type DeviceOpener<D> = Box<dyn FnMut(&Path) -> io::Result<D> + Send>;

/// Owns the single open handle to a drive.
///
/// The handle is released before a new one is acquired and whenever the
/// session is closed or dropped.
pub struct DeviceSession<D: DeviceIo> {
    path: PathBuf,
    opener: DeviceOpener<D>,
    device: Option<D>,
}

impl DeviceSession<FileDevice> {
    /// Open a drive through the operating system
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DriveError> {
        Self::open_with(path, Box::new(|path: &Path| FileDevice::open(path)))
    }
}

impl<D: DeviceIo> DeviceSession<D> {
    /// Open a drive using a custom backend
    pub fn open_with(
        path: impl Into<PathBuf>,
        opener: DeviceOpener<D>,
    ) -> Result<Self, DriveError> {
        let mut session = Self {
            path: path.into(),
            opener,
            device: None,
        };
        session.reopen()?;
        Ok(session)
    }

    /// Release the current handle (if any) and acquire a fresh one
    pub fn reopen(&mut self) -> Result<(), DriveError> {
        self.close();

        let mut device = (self.opener)(&self.path).map_err(|source| DriveError::DeviceOpenFailed {
            path: self.path.clone(),
            source,
        })?;

        // Without this, sectors past the first layer of a dual-layer DVD are out of range
        if let Err(e) = device.control(ControlCode::AllowExtendedDasdIo, &[], &mut []) {
            log::debug!("Extended addressing unavailable on {}: {}", self.path.display(), e);
        }

        log::debug!("Opened device {}", self.path.display());
        self.device = Some(device);
        Ok(())
    }

    /// Release the handle. Closing twice is harmless
    pub fn close(&mut self) {
        if self.device.take().is_some() {
            log::debug!("Closed device {}", self.path.display());
        }
    }

    /// Whether a handle is currently held
    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Path this session opens
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The open handle
    pub fn device(&mut self) -> Result<&mut D, DriveError> {
        self.device.as_mut().ok_or(DriveError::SessionClosed)
    }
}
