//! cdvd-probe
//!
//! Inspects the disc in an optical drive: geometry, table of contents and
//! sector dumps.

use cdvd_drive::config::get_config;
use cdvd_drive::disc::{RAW_SECTOR_SIZE, SECTOR_SIZE};
use cdvd_drive::{DriveConfig, MediaType, OpticalDrive};

use docopt::Docopt;
use pretty_hex::PrettyHex;
use serde::Deserialize;

const USAGE: &str = r#"
Usage:
  cdvd-probe -h
  cdvd-probe [--no-spindle] [<device>]
  cdvd-probe [--no-spindle] read <device> <sector> [--count=<n>] [--raw]

Options:
  -h --help              Show this screen.
  --no-spindle           Leave the drive at its own spindle speed.

 read:
   -c --count=<n>        Number of sectors to dump [default: 1].
   -r --raw              Read full 2352-byte sectors instead of 2048-byte user data.

   Hex-dumps sectors starting at absolute sector <sector>.

 <device> defaults to the device_path in cdvd.json, e.g. \\.\D:. Outside Windows
 <device> must be a disc image file; device nodes such as /dev/sr0 are refused.
"#;

#[derive(Debug, Deserialize)]
struct Args {
    flag_no_spindle: bool,
    flag_count: u32,
    flag_raw: bool,
    cmd_read: bool,
    arg_device: Option<String>,
    arg_sector: Option<u32>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    let mut config: DriveConfig = get_config().drive.clone();
    if let Some(device) = args.arg_device {
        config.device_path = device;
    }
    if args.flag_no_spindle {
        config.spindle.enabled = false;
    }

    let mut drive = OpticalDrive::open(&config)?;

    if args.cmd_read {
        dump(&mut drive, args.arg_sector.unwrap_or(0), args.flag_count, args.flag_raw)
    } else {
        summary(&mut drive)
    }
}

fn summary(drive: &mut OpticalDrive) -> Result<(), Box<dyn std::error::Error>> {
    let info = drive.refresh()?.clone();
    let geometry = info.geometry;

    println!("Device:       {}", drive.session().path().display());
    println!("Media:        {}", geometry.media_type().display_name());
    println!("Sectors:      {}", geometry.sector_count());
    if geometry.media_type() != MediaType::Cd {
        println!("Layer break:  {}", geometry.layer_break());
        return Ok(());
    }

    println!("Tracks:       {}", info.toc.track_count());
    for track in info.tracks() {
        println!(
            "  {:>2}  {:>7}  {}",
            track.track_number,
            track.lba,
            if track.is_data() { "data" } else { "audio" }
        );
    }
    if let Some(lead_out) = info.toc.lead_out {
        println!("Lead-out:     {}", lead_out);
    }
    if let Some(time) = info.toc.total_time_string() {
        println!("Length:       {}", time);
    }
    if let Some(id) = info.toc.musicbrainz_id() {
        println!("MusicBrainz:  {}", id);
    }
    if let Some(id) = info.toc.freedb_id() {
        println!("FreeDB:       {}", id);
    }
    Ok(())
}

fn dump(
    drive: &mut OpticalDrive,
    sector: u32,
    count: u32,
    raw: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (data, size) = if raw {
        (drive.read_raw(sector, count)?, RAW_SECTOR_SIZE)
    } else {
        (drive.read_cooked(sector, count)?, SECTOR_SIZE as usize)
    };

    for (n, chunk) in data.chunks(size).enumerate() {
        println!("Sector {}\n{:?}", u64::from(sector) + n as u64, chunk.hex_dump());
    }
    Ok(())
}
