//! Disc geometry, table of contents and sector access
//!
//! Everything here works on an open [`DeviceSession`](crate::device::DeviceSession):
//! the prober learns what disc is in the drive, the reader fetches sectors and
//! the monitor notices when the disc changes.

mod geometry;
mod monitor;
mod prober;
mod reader;
mod toc;

pub use geometry::{DiscGeometry, MediaType};
pub use monitor::poll_changed;
pub use prober::{DiscInfo, GeometryProber};
pub use reader::{SectorReader, DEFAULT_RAW_TIMEOUT_SECS, RAW_SECTOR_SIZE, SECTOR_SIZE};
pub use toc::{Toc, TocEntry};
