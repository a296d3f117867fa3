use snafu::Snafu;
use std::path::PathBuf;

/// Errors that can occur while exporting from or verifying a disc.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum ExportError {
    #[snafu(display("track {track} does not exist"))]
    NoSuchTrack { track: u32 },

    #[snafu(display("cannot read media tag {tag}: {source}"))]
    ReadMediaTagFailed {
        tag: blindwrite_image::MediaTag,
        source: blindwrite_image::ReadError,
    },

    #[snafu(display("cannot read sectors {rel}..+{count} of track {track}: {source}"))]
    ReadSectorsFailed {
        track: u32,
        rel: u64,
        count: u64,
        source: blindwrite_image::ReadError,
    },

    #[snafu(display("cannot verify sectors {address}..+{count}: {source}"))]
    VerifyFailed {
        address: u64,
        count: u64,
        source: blindwrite_image::ReadError,
    },

    #[snafu(display("cannot create directory {}: {source}", path.display()))]
    CreateDirectoryFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot create file {}: {source}", path.display()))]
    CreateFileFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot write to {}: {source}", path.display()))]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}
