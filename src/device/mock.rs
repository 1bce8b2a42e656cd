//! Scripted device for tests
//!
//! Replies come from [`MockState`]; every request is recorded so tests can
//! assert exactly what reached the "hardware".

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{DeviceIo, DeviceSession, PassThroughFailure};
use crate::ioctl::cdrom::SetSpeedRequest;
use crate::ioctl::dvd::{ReadStructureRequest, PHYSICAL_DESCRIPTOR_LEN};
use crate::ioctl::scsi::{PassThroughReply, PassThroughRequest, RAW_SECTOR_SIZE};
use crate::ioctl::ControlCode;

pub(crate) const SESSION_ID: u32 = 0x2A;

pub(crate) const MOCK_SENSE: [u8; 4] = [0x70, 0x00, 0x03, 0x00];

#[derive(Default)]
pub(crate) struct MockState {
    /// Physical descriptor replies per layer; empty means "not a DVD"
    pub dvd_layers: Vec<Option<[u8; PHYSICAL_DESCRIPTOR_LEN]>>,
    /// TOC reply; `None` fails the request
    pub toc: Option<Vec<u8>>,
    /// Medium length; `None` fails the request
    pub length: Option<u64>,
    /// Fail the verify request, as a drive does after a media change
    pub media_changed: bool,
    pub refuse_extended_dasd: bool,
    /// Backing bytes for cooked reads
    pub image: Vec<u8>,
    pub fail_seek: bool,
    /// Cap on bytes returned by a single read
    pub read_limit: Option<usize>,
    /// LBAs whose raw read fails
    pub bad_sectors: HashSet<u32>,
    /// Bytes reported transferred for raw reads (default: a full sector)
    pub raw_transfer: Option<u32>,
    /// SCSI status reported by raw reads that complete
    pub raw_status: u8,

    pub calls: Vec<ControlCode>,
    pub raw_lbas: Vec<u32>,
    pub speeds: Vec<SetSpeedRequest>,
    pub opens: u32,
    pub live_handles: u32,
    pub max_live_handles: u32,
    pub position: u64,
}

impl MockState {
    pub fn count(&self, code: ControlCode) -> usize {
        self.calls.iter().filter(|c| **c == code).count()
    }
}

pub(crate) struct MockDevice(Arc<Mutex<MockState>>);

impl MockDevice {
    fn open(state: &Arc<Mutex<MockState>>) -> io::Result<Self> {
        let mut s = state.lock().map_err(|_| io::Error::other("poisoned"))?;
        s.opens += 1;
        s.live_handles += 1;
        s.max_live_handles = s.max_live_handles.max(s.live_handles);
        Ok(Self(Arc::clone(state)))
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.0.lock().unwrap()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        if let Ok(mut s) = self.0.lock() {
            s.live_handles -= 1;
        }
    }
}

fn refused(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{} refused", what))
}

fn reply(output: &mut [u8], bytes: &[u8]) -> io::Result<usize> {
    let n = bytes.len().min(output.len());
    output[..n].copy_from_slice(&bytes[..n]);
    Ok(n)
}

impl DeviceIo for MockDevice {
    fn control(&mut self, code: ControlCode, input: &[u8], output: &mut [u8]) -> io::Result<usize> {
        let mut s = self.state();
        s.calls.push(code);

        match code {
            ControlCode::AllowExtendedDasdIo if s.refuse_extended_dasd => {
                Err(refused("extended DASD"))
            }
            ControlCode::AllowExtendedDasdIo => Ok(0),
            ControlCode::DvdStartSession if s.dvd_layers.is_empty() => Err(refused("DVD session")),
            ControlCode::DvdStartSession => reply(output, &SESSION_ID.to_le_bytes()),
            ControlCode::DvdReadStructure => {
                let layer = ReadStructureRequest::layer_of(input).unwrap_or(0);
                match s.dvd_layers.get(usize::from(layer)).copied().flatten() {
                    Some(descriptor) => reply(output, &descriptor),
                    None => Err(refused("DVD structure")),
                }
            }
            ControlCode::DvdEndSession => Ok(0),
            ControlCode::CdromReadTocEx => match s.toc.clone() {
                Some(toc) => reply(output, &toc),
                None => Err(refused("TOC")),
            },
            ControlCode::DiskGetLengthInfo => match s.length {
                Some(length) => reply(output, &(length as i64).to_le_bytes()),
                None => Err(refused("length")),
            },
            ControlCode::StorageCheckVerify if s.media_changed => Err(refused("verify")),
            ControlCode::StorageCheckVerify => Ok(0),
            ControlCode::CdromSetSpeed => {
                if let Some(speed) = SetSpeedRequest::decode(input) {
                    s.speeds.push(speed);
                }
                Ok(0)
            }
            ControlCode::ScsiPassThroughDirect => Err(refused("bare passthrough")),
        }
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        let mut s = self.state();
        if s.fail_seek {
            return Err(refused("seek"));
        }
        s.position = offset;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut s = self.state();
        let start = (s.position as usize).min(s.image.len());
        let mut n = buf.len().min(s.image.len() - start);
        if let Some(limit) = s.read_limit {
            n = n.min(limit);
        }
        buf[..n].copy_from_slice(&s.image[start..start + n]);
        s.position += n as u64;
        Ok(n)
    }

    fn pass_through(
        &mut self,
        request: &PassThroughRequest,
        data: &mut [u8],
    ) -> Result<PassThroughReply, PassThroughFailure> {
        let mut s = self.state();
        let lba = request.lba();
        s.raw_lbas.push(lba);

        if s.bad_sectors.contains(&lba) {
            return Err(PassThroughFailure {
                source: refused("READ CD"),
                sense: MOCK_SENSE.to_vec(),
            });
        }

        data.fill(lba as u8);
        let sense = if s.raw_status == 0 {
            Vec::new()
        } else {
            MOCK_SENSE.to_vec()
        };
        Ok(PassThroughReply {
            scsi_status: s.raw_status,
            transferred: s.raw_transfer.unwrap_or(RAW_SECTOR_SIZE as u32),
            sense,
        })
    }
}

/// Open a session over a scripted device
pub(crate) fn mock_session(
    state: MockState,
) -> (DeviceSession<MockDevice>, Arc<Mutex<MockState>>) {
    let state = Arc::new(Mutex::new(state));
    let shared = Arc::clone(&state);
    let session = DeviceSession::open_with(
        "mock",
        Box::new(move |_: &Path| MockDevice::open(&shared)),
    )
    .unwrap_or_else(|e| panic!("mock open failed: {}", e));
    (session, state)
}
