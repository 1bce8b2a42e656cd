//! CD/DVD Drive Access Library
//!
//! Disc geometry probing (sector count, dual-layer break, table of contents)
//! and cooked/raw sector reads for physical optical drives.

pub mod config;
pub mod device;
pub mod disc;
pub mod drive;
pub mod error;
pub mod ioctl;

pub use config::{AppConfig, DriveConfig, SpindleConfig};
pub use disc::{DiscGeometry, DiscInfo, MediaType, Toc, TocEntry};
pub use drive::OpticalDrive;
pub use error::DriveError;
