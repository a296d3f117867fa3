//! Library for inspecting and exporting BlindWrite disc images.
//!
//! The main entry point is [`DiscExporter`], which takes an opened
//! [`blindwrite_image::Disc`] and a [`SectorProgress`] implementation, then
//! writes media tags and track data to disk, hashes tracks or verifies every
//! sector.
//!
//! # Example
//!
//! ```no_run
//! use blindwrite_util::{open_disc, DiscExporter, SilentProgress};
//!
//! let disc = unsafe { open_disc("game.b5t".as_ref()) }.expect("failed to open image");
//! let exporter = DiscExporter::new(&disc, SilentProgress, false);
//! exporter.dump_track(1, "track01.bin", false).expect("dump failed");
//! ```

pub mod export;
pub mod progress;

pub use self::export::{DiscExporter, ExportError};
pub use self::progress::{SectorProgress, SilentProgress};

#[cfg(feature = "cli")]
pub use self::progress::ConsoleProgress;

use blindwrite_image::{Disc, OpenOptions};
use snafu::{ResultExt, Snafu};
use std::path::Path;
use std::sync::Arc;

/// Errors that can occur when opening an image from disk.
#[derive(Debug, Snafu)]
pub enum OpenDiscError {
    #[snafu(display("failed to open file"))]
    OpenFile { source: std::io::Error },

    #[snafu(display("failed to memory map file"))]
    MmapFile { source: std::io::Error },

    #[snafu(display("failed to parse image"))]
    ParseImage { source: blindwrite_image::OpenError },
}

/// Opens an image from disk using a memory-mapped descriptor.
///
/// Data files are opened from the descriptor's directory on first read.
///
/// # Safety
///
/// This function uses `unsafe` internally to create a memory map. The caller
/// must ensure the descriptor is not modified or truncated while it is being
/// parsed.
pub unsafe fn open_disc(path: &Path) -> Result<Arc<Disc>, OpenDiscError> {
    let file = std::fs::File::open(path).context(OpenFileSnafu)?;
    let raw = unsafe { memmap2::Mmap::map(&file).context(MmapFileSnafu)? };

    OpenOptions::new()
        .open_slice(&raw, path)
        .context(ParseImageSnafu)
}

/// Formats bytes as lowercase hex.
#[must_use]
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
