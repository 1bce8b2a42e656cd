//! Operating system device backend
//!
//! On Windows this drives the real optical drive through `DeviceIoControl`.
//! Elsewhere it serves a disc image file: cooked reads work, the media is
//! always "present", and drive-only requests report `Unsupported`.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;

use super::{DeviceIo, PassThroughFailure};
use crate::ioctl::scsi::{PassThroughReply, PassThroughRequest};
use crate::ioctl::ControlCode;

/// A drive (or disc image) opened through the filesystem
#[derive(Debug)]
pub struct FileDevice {
    file: File,
}

impl FileDevice {
    /// Open with read and write access.
    ///
    /// Write access is required even for reading because SCSI passthrough is
    /// refused on read-only handles.
    #[cfg(windows)]
    pub fn open(path: &Path) -> io::Result<Self> {
        use std::os::windows::fs::OpenOptionsExt;
        const FILE_SHARE_READ: u32 = 0x0000_0001;
        const FILE_FLAG_SEQUENTIAL_SCAN: u32 = 0x0800_0000;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .share_mode(FILE_SHARE_READ)
            .custom_flags(FILE_FLAG_SEQUENTIAL_SCAN)
            .open(path)?;
        Ok(Self { file })
    }

    /// Open a disc image read-only. Device nodes such as `/dev/sr0` are not
    /// supported: they have no file length and no drive-control requests.
    #[cfg(not(windows))]
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;

        #[cfg(unix)]
        {
            if file.metadata()?.file_type().is_block_device() {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!(
                        "{} is a device node; only disc image files are supported",
                        path.display()
                    ),
                ));
            }
        }

        Ok(Self { file })
    }
}

impl DeviceIo for FileDevice {
    #[cfg(windows)]
    fn control(&mut self, code: ControlCode, input: &[u8], output: &mut [u8]) -> io::Result<usize> {
        win32::device_io_control(&self.file, code.value(), input, output)
    }

    #[cfg(not(windows))]
    fn control(
        &mut self,
        code: ControlCode,
        _input: &[u8],
        output: &mut [u8],
    ) -> io::Result<usize> {
        match code {
            ControlCode::StorageCheckVerify => Ok(0),
            ControlCode::DiskGetLengthInfo => {
                let length = self.file.metadata()?.len().to_le_bytes();
                let n = length.len().min(output.len());
                output[..n].copy_from_slice(&length[..n]);
                Ok(n)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{} is not available for image files", code),
            )),
        }
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset)).map(|_| ())
    }

    /// One read call; the drive answers in one go or the read is short
    #[cfg(windows)]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    #[cfg(not(windows))]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Regular files may hand back less per call
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    #[cfg(windows)]
    fn pass_through(
        &mut self,
        request: &PassThroughRequest,
        data: &mut [u8],
    ) -> Result<PassThroughReply, PassThroughFailure> {
        if data.len() < request.transfer_len as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Passthrough buffer smaller than the transfer length",
            )
            .into());
        }

        let envelope = request.encode(data.as_mut_ptr() as usize);
        let mut returned = envelope;
        let result = win32::device_io_control(
            &self.file,
            ControlCode::ScsiPassThroughDirect.value(),
            &envelope,
            &mut returned,
        );

        match (result, PassThroughReply::decode(&returned)) {
            (Ok(_), reply) => Ok(reply?),
            (Err(source), Ok(reply)) => Err(PassThroughFailure {
                source,
                sense: reply.sense,
            }),
            (Err(source), Err(_)) => Err(source.into()),
        }
    }

    #[cfg(not(windows))]
    fn pass_through(
        &mut self,
        _request: &PassThroughRequest,
        _data: &mut [u8],
    ) -> Result<PassThroughReply, PassThroughFailure> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "SCSI passthrough is not available for image files",
        )
        .into())
    }
}

#[cfg(windows)]
mod win32 {
    use std::ffi::c_void;
    use std::fs::File;
    use std::io;
    use std::os::windows::io::AsRawHandle;
    use std::ptr;

    #[link(name = "kernel32")]
    extern "system" {
        fn DeviceIoControl(
            device: *mut c_void,
            io_control_code: u32,
            in_buffer: *const c_void,
            in_buffer_size: u32,
            out_buffer: *mut c_void,
            out_buffer_size: u32,
            bytes_returned: *mut u32,
            overlapped: *mut c_void,
        ) -> i32;
    }

    fn buffer_len(len: usize) -> io::Result<u32> {
        u32::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Buffer too large"))
    }

    /// Synchronous device-control call on an open handle
    pub(super) fn device_io_control(
        file: &File,
        code: u32,
        input: &[u8],
        output: &mut [u8],
    ) -> io::Result<usize> {
        let in_ptr = if input.is_empty() {
            ptr::null()
        } else {
            input.as_ptr().cast()
        };
        let out_ptr = if output.is_empty() {
            ptr::null_mut()
        } else {
            output.as_mut_ptr().cast()
        };
        let mut returned = 0u32;

        // SAFETY: both buffers outlive the call and their lengths are passed
        // alongside; the handle is owned by `file` and stays open for the call.
        let ok = unsafe {
            DeviceIoControl(
                file.as_raw_handle(),
                code,
                in_ptr,
                buffer_len(input.len())?,
                out_ptr,
                buffer_len(output.len())?,
                &mut returned,
                ptr::null_mut(),
            )
        };

        if ok == 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(returned as usize)
        }
    }
}
