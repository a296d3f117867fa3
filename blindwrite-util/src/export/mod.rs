mod error;

pub use self::error::ExportError;

use self::error::*;
use crate::progress::SectorProgress;
use blindwrite_image::{Disc, MediaTag, Track, VerifyReport};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use sha2::{Digest, Sha256};
use snafu::{OptionExt, ResultExt};
use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Sectors read per call.
const BATCH: u64 = 256;

/// Exports media tags and track data from a disc, and verifies its sectors.
pub struct DiscExporter<'a, P: SectorProgress> {
    disc: &'a Disc,
    progress: P,
    overwrite: bool,
}

impl<'a, P: SectorProgress> DiscExporter<'a, P> {
    /// Creates a new exporter for the given disc.
    ///
    /// If `overwrite` is `true`, existing files will be replaced. Otherwise,
    /// writing fails if an output file already exists.
    pub fn new(disc: &'a Disc, progress: P, overwrite: bool) -> Self {
        Self {
            disc,
            progress,
            overwrite,
        }
    }

    /// Writes every available media tag to `{output}/{tag}.bin`.
    ///
    /// Returns the files written.
    pub fn export_tags(&self, output: impl AsRef<Path>) -> Result<Vec<PathBuf>, ExportError> {
        let output = output.as_ref();
        let available = self.disc.info().readable_media_tags;
        let mut written = Vec::new();

        create_dir_all(output).context(CreateDirectoryFailedSnafu { path: output })?;

        for tag in MediaTag::ALL {
            if !available.contains(tag.flag()) {
                continue;
            }

            let data = self
                .disc
                .read_media_tag(tag)
                .context(ReadMediaTagFailedSnafu { tag })?;
            let path = output.join(format!("{}.bin", tag.file_stem()));
            let mut file = self.create(&path)?;

            file.write_all(data)
                .context(WriteFailedSnafu { path: &path })?;

            log::debug!("Wrote {tag} ({} bytes) to {}", data.len(), path.display());
            written.push(path);
        }

        Ok(written)
    }

    /// Writes the sectors of `track` to `output`.
    ///
    /// With `long`, whole frames are written instead of user data. Returns the
    /// number of bytes written.
    pub fn dump_track(
        &self,
        track: u32,
        output: impl AsRef<Path>,
        long: bool,
    ) -> Result<u64, ExportError> {
        let path = output.as_ref();
        let track = self.track(track)?;
        let mut file = BufWriter::new(self.create(path)?);
        let mut written = 0u64;

        self.progress
            .start(&format!("track {}", track.sequence()), track.sectors());

        self.for_each_batch(track, long, |data| {
            file.write_all(data).context(WriteFailedSnafu { path })?;
            written += data.len() as u64;
            Ok(())
        })?;

        file.flush().context(WriteFailedSnafu { path })?;
        self.progress.finish();

        Ok(written)
    }

    /// Returns the SHA-256 of the user data of `track`.
    pub fn hash_track(&self, track: u32) -> Result<[u8; 32], ExportError> {
        let track = self.track(track)?;
        let mut hasher = Sha256::new();

        self.progress
            .start(&format!("track {}", track.sequence()), track.sectors());

        self.for_each_batch(track, false, |data| {
            hasher.update(data);
            Ok(())
        })?;

        self.progress.finish();

        Ok(hasher.finalize().into())
    }

    /// Verifies every sector of every track.
    ///
    /// Batches are checked in parallel using rayon.
    pub fn verify(&self) -> Result<VerifyReport, ExportError> {
        let batches: Vec<(u64, u64)> = self
            .disc
            .tracks()
            .iter()
            .flat_map(|t| {
                (0..t.sectors())
                    .step_by(BATCH as usize)
                    .map(move |rel| (t.start() + rel, BATCH.min(t.sectors() - rel)))
            })
            .collect();
        let total = batches.iter().map(|(_, n)| n).sum();

        self.progress.start("verify", total);

        let reports = batches
            .par_iter()
            .map(|&(address, count)| -> Result<VerifyReport, ExportError> {
                let report = self
                    .disc
                    .verify_sectors(address, count)
                    .context(VerifyFailedSnafu { address, count })?;

                self.progress.advance(count);
                Ok(report)
            })
            .collect::<Result<Vec<_>, ExportError>>()?;

        self.progress.finish();

        Ok(reports
            .into_iter()
            .fold(VerifyReport::default(), |mut acc, r| {
                acc.merge(r);
                acc
            }))
    }

    fn track(&self, track: u32) -> Result<&'a Track, ExportError> {
        self.disc.track(track).context(NoSuchTrackSnafu { track })
    }

    fn for_each_batch(
        &self,
        track: &Track,
        long: bool,
        mut f: impl FnMut(&[u8]) -> Result<(), ExportError>,
    ) -> Result<(), ExportError> {
        let sequence = track.sequence();
        let mut rel = 0;

        while rel < track.sectors() {
            let count = BATCH.min(track.sectors() - rel);
            let data = if long {
                self.disc.read_track_sectors_long(rel, count, sequence)
            } else {
                self.disc.read_track_sectors(rel, count, sequence)
            }
            .context(ReadSectorsFailedSnafu {
                track: sequence,
                rel,
                count,
            })?;

            f(&data)?;
            self.progress.advance(count);
            rel += count;
        }

        Ok(())
    }

    fn create(&self, path: &Path) -> Result<File, ExportError> {
        let mut opts = OpenOptions::new();
        opts.write(true);

        if self.overwrite {
            opts.create(true).truncate(true);
        } else {
            opts.create_new(true);
        }

        opts.open(path).context(CreateFileFailedSnafu { path })
    }
}
