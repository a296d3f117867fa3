//! A library for reading BlindWrite 5, 6 and 7 disc images.
//!
//! An image is a `.b5t` or `.b6t` descriptor plus one or more data files
//! holding the raw sectors. This crate decodes the descriptor, rebuilds the
//! session and track layout, finds the data files next to the descriptor and
//! serves sector reads in any of the layouts a drive would return.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let disc = blindwrite_image::open("game.b6t".as_ref())?;
//!
//! for track in disc.tracks() {
//!     println!("track {} starts at {}", track.sequence(), track.start());
//! }
//!
//! let sector = disc.read_sector(16)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread safety
//!
//! [`Disc`] is `Send + Sync`. Reads against the same data file are serialized
//! by the file's lock, and the one-time join of split volumes happens under
//! the resolver's lock.

pub use self::info::{ImageInfo, MediaTag, MediaTags, SectorTags};
pub use self::layout::{Partition, Session, Track};
pub use self::media::MediaType;
pub use self::resolver::{GeometryError, ResolveError};
pub use self::sector::SectorTag;
pub use self::verify::{SectorChecker, VerifyReport, VerifyStatus};
pub use blindwrite_format::ErrorKind;

use self::checksum::EdcChecker;
use self::filters::{Filters, FsFilters};
use self::layout::Layout;
use self::media::Evidence;
use self::resolver::{DataFile, DataFileInfo, Resolver};
use self::structures::atip::Atip;
use self::structures::pfi::{self, Pfi};
use self::structures::pma::Pma;
use self::structures::{mode_page, with_response_header};
use blindwrite_format::Descriptor;
use blindwrite_format::session::{SubchannelMode, TrackType};
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

pub mod checksum;
pub mod filters;
pub mod image;
pub mod info;
mod layout;
pub mod media;
mod resolver;
pub mod sector;
pub mod structures;
pub mod subchannel;
pub mod verify;

/// Offset of the DMI inside the stored DVD structure block.
const DMI_OFFSET: usize = 2;

/// Offset of the PFI inside the stored DVD structure block.
const PFI_OFFSET: usize = 2052;

/// Size of a DVD structure without its response header.
const DVD_STRUCTURE_SIZE: usize = 2048;

/// Collaborators used while opening and reading an image.
#[derive(Clone)]
#[must_use]
pub struct OpenOptions {
    filters: Arc<dyn Filters>,
    checker: Arc<dyn SectorChecker>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenOptions {
    /// Uses the local file system and [`EdcChecker`].
    pub fn new() -> Self {
        Self {
            filters: Arc::new(FsFilters),
            checker: Arc::new(EdcChecker),
        }
    }

    /// Sets how the descriptor and data files are opened.
    pub fn filters(mut self, filters: impl Filters + 'static) -> Self {
        self.filters = Arc::new(filters);
        self
    }

    /// Sets the checksum used by [`Disc::verify_sector()`].
    pub fn checker(mut self, checker: impl SectorChecker + 'static) -> Self {
        self.checker = Arc::new(checker);
        self
    }

    /// Opens the descriptor at `path` through the configured filters.
    ///
    /// # Errors
    ///
    /// See [`OpenError`]. Data files are only opened on first read, so a
    /// missing data file is reported by the read rather than here.
    pub fn open(&self, path: &Path) -> Result<Arc<Disc>, OpenError> {
        let image = self
            .filters
            .open(path)
            .context(DescriptorNotFoundSnafu { path })?;
        let mut data = vec![0u8; image.len() as usize];

        image
            .read_exact_at(0, &mut data)
            .context(ReadDescriptorFailedSnafu)?;

        self.open_slice(&data, path)
    }

    /// Opens a descriptor already in memory.
    ///
    /// `path` locates the data files and selects between the `.b5t` and
    /// `.b6t` naming rules.
    pub fn open_slice(&self, data: &[u8], path: &Path) -> Result<Arc<Disc>, OpenError> {
        let descriptor = Descriptor::read(data).context(ParseDescriptorFailedSnafu)?;
        let b6t = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("b6t"));
        let (version, first_extension) = if b6t { ("6", "b6i") } else { ("5", "b5i") };

        let files = descriptor
            .data_files()
            .iter()
            .enumerate()
            .map(|(index, record)| {
                DataFileInfo::new(index, record).context(InvalidDataFileSnafu { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for f in &files {
            log::debug!(
                "Data file #{} {}: LBA {} +{} sectors, {} bytes per sector, subchannel {:?}",
                f.index,
                f.filename,
                f.start_lba,
                f.sectors,
                f.sector_size,
                f.subchannel
            );
        }

        let layout = Layout::build(&descriptor, &files);
        let tags = MediaTagSet::decode(&descriptor, &layout);
        let media_type = media::classify(&Evidence {
            profile: descriptor.header().profile(),
            pfi: tags.pfi.as_ref(),
            dmi: tags.dmi_response.as_deref(),
            atip: tags.atip.as_ref(),
            tracks: &layout.tracks,
            session_count: layout.sessions.len(),
            sectors: layout.sectors,
            has_dvd_track: layout.has_dvd_track,
        });

        let header = descriptor.header();
        let info = ImageInfo {
            application: "BlindWrite",
            application_version: version,
            profile: header.profile(),
            media_type,
            media_manufacturer: tags
                .atip
                .as_ref()
                .and_then(Atip::manufacturer)
                .map(str::to_owned),
            mcn: header.mcn(),
            sectors: layout.sectors,
            sector_size: layout.min_sector_size,
            sessions: layout.sessions.len(),
            tracks: layout.tracks.len(),
            drive_manufacturer: header.drive_manufacturer(),
            drive_model: header.drive_model(),
            drive_firmware: header.drive_firmware(),
            drive_serial: header.drive_serial(),
            volume_id: header.volume_id(),
            readable_sector_tags: layout.sector_tags,
            readable_media_tags: tags.present(),
        };

        log::debug!(
            "Opened {}: {} session(s), {} track(s), {} sectors, {}",
            path.display(),
            info.sessions,
            info.tracks,
            info.sectors,
            info.media_type
        );

        let resolver = Resolver::new(
            self.filters.clone(),
            path,
            first_extension,
            descriptor.data_path(),
            files,
        );

        Ok(Arc::new(Disc {
            descriptor,
            layout,
            resolver,
            checker: self.checker.clone(),
            media_tags: tags.raw,
            info,
        }))
    }
}

/// Opens the image at `path` with the default [`OpenOptions`].
pub fn open(path: &Path) -> Result<Arc<Disc>, OpenError> {
    OpenOptions::new().open(path)
}

/// Media tags decoded from the descriptor.
struct MediaTagSet {
    raw: HashMap<MediaTag, Vec<u8>>,
    atip: Option<Atip>,
    pfi: Option<Pfi>,
    dmi_response: Option<Vec<u8>>,
}

impl MediaTagSet {
    fn decode(descriptor: &Descriptor, layout: &Layout) -> Self {
        let mut raw = HashMap::new();
        let mut atip = None;
        let mut pfi = None;
        let mut dmi_response = None;

        if let Some(stored) = descriptor.mode_page_2a() {
            match mode_page::repair(stored) {
                Some((page, _)) => {
                    raw.insert(MediaTag::ModePage2A, page);
                }
                None => log::warn!("Ignoring invalid mode page 2A"),
            }
        }

        if let Some(data) = descriptor.pma() {
            match Pma::decode(&with_response_header(data)) {
                Some(pma) => {
                    log::debug!("PMA has {} entries", pma.entries().len());
                    raw.insert(MediaTag::Pma, data.to_vec());
                }
                None => log::warn!("Ignoring invalid PMA"),
            }
        }

        if let Some(data) = descriptor.atip() {
            atip = Atip::decode(&with_response_header(data));

            if atip.is_some() {
                raw.insert(MediaTag::Atip, data.to_vec());
            } else {
                log::warn!("Ignoring invalid ATIP");
            }
        }

        if let Some(data) = descriptor.cd_text() {
            raw.insert(MediaTag::CdText, data.to_vec());
        }

        if let Some(data) = descriptor.bca() {
            raw.insert(MediaTag::Bca, data.to_vec());
        }

        if let Some(data) = descriptor.dvd_structure() {
            let dmi = data.get(DMI_OFFSET..DMI_OFFSET + DVD_STRUCTURE_SIZE);
            let physical = data.get(PFI_OFFSET..PFI_OFFSET + DVD_STRUCTURE_SIZE);

            if let Some(dmi) = dmi {
                dmi_response = Some(pfi::response(dmi));
                raw.insert(MediaTag::Dmi, dmi.to_vec());
            }

            if let Some(physical) = physical {
                pfi = Pfi::decode(&pfi::response(physical));
                raw.insert(MediaTag::Pfi, physical.to_vec());
            }

            if dmi.is_none() || physical.is_none() {
                log::warn!("DVD structure block is only {} bytes", data.len());
            }
        }

        if let Some(toc) = &layout.full_toc {
            raw.insert(MediaTag::FullToc, toc.clone());
        }

        Self {
            raw,
            atip,
            pfi,
            dmi_response,
        }
    }

    fn present(&self) -> MediaTags {
        self.raw
            .keys()
            .fold(MediaTags::empty(), |acc, tag| acc | tag.flag())
    }
}

/// An opened BlindWrite image.
///
/// Addresses are absolute sector numbers unless a method says otherwise.
#[must_use]
pub struct Disc {
    descriptor: Descriptor,
    layout: Layout,
    resolver: Resolver,
    checker: Arc<dyn SectorChecker>,
    media_tags: HashMap<MediaTag, Vec<u8>>,
    info: ImageInfo,
}

impl std::fmt::Debug for Disc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disc")
            .field("info", &self.info)
            .field("tracks", &self.layout.tracks.len())
            .field("data_files", &self.resolver.files().len())
            .finish_non_exhaustive()
    }
}

impl Disc {
    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// Returns the decoded descriptor.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Returns the tracks in descriptor order.
    pub fn tracks(&self) -> &[Track] {
        &self.layout.tracks
    }

    pub fn sessions(&self) -> &[Session] {
        &self.layout.sessions
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.layout.partitions
    }

    /// Returns the track with the given sequence number.
    pub fn track(&self, sequence: u32) -> Option<&Track> {
        self.layout.tracks.iter().find(|t| t.sequence() == sequence)
    }

    /// Returns the tracks belonging to `session`.
    pub fn session_tracks(&self, session: u16) -> Vec<&Track> {
        self.layout
            .tracks
            .iter()
            .filter(|t| t.session() == session)
            .collect()
    }

    /// Returns the track that owns `address`.
    ///
    /// Pregap sectors before a track's index 1 have no owner.
    pub fn track_for_sector(&self, address: u64) -> Option<&Track> {
        self.layout.tracks.iter().find(|t| t.contains(address))
    }

    /// Returns the first sector of every track, keyed by track sequence.
    pub fn offset_map(&self) -> &BTreeMap<u32, u64> {
        &self.layout.offset_map
    }

    /// Returns the CTL nibble of every track, keyed by track sequence.
    pub fn track_flags(&self) -> &BTreeMap<u32, u8> {
        &self.layout.track_flags
    }

    /// Returns a disc structure captured with the image.
    pub fn read_media_tag(&self, tag: MediaTag) -> Result<&[u8], ReadError> {
        self.media_tags
            .get(&tag)
            .map(Vec::as_slice)
            .context(MediaTagNotFoundSnafu { tag })
    }

    pub fn read_sector(&self, address: u64) -> Result<Vec<u8>, ReadError> {
        self.read_sectors(address, 1)
    }

    /// Reads the user data of `count` sectors starting at `address`.
    ///
    /// All sectors must belong to the same track.
    pub fn read_sectors(&self, address: u64, count: u64) -> Result<Vec<u8>, ReadError> {
        let (rel, track) = self.locate(address)?;
        self.read_track_sectors(rel, count, track)
    }

    pub fn read_sector_tag(&self, address: u64, tag: SectorTag) -> Result<Vec<u8>, ReadError> {
        self.read_sectors_tag(address, 1, tag)
    }

    /// Reads one field of `count` sectors starting at `address`.
    pub fn read_sectors_tag(
        &self,
        address: u64,
        count: u64,
        tag: SectorTag,
    ) -> Result<Vec<u8>, ReadError> {
        let (rel, track) = self.locate(address)?;
        self.read_track_sectors_tag(rel, count, track, tag)
    }

    pub fn read_sector_long(&self, address: u64) -> Result<Vec<u8>, ReadError> {
        self.read_sectors_long(address, 1)
    }

    /// Reads whole frames without subchannel.
    pub fn read_sectors_long(&self, address: u64, count: u64) -> Result<Vec<u8>, ReadError> {
        let (rel, track) = self.locate(address)?;
        self.read_track_sectors_long(rel, count, track)
    }

    /// Reads the user data of `count` sectors at `rel` sectors into `track`.
    pub fn read_track_sectors(&self, rel: u64, count: u64, track: u32) -> Result<Vec<u8>, ReadError> {
        let track = self.checked_track(rel, count, track)?;

        if track.kind().is_mode2() {
            let (frames, frame_len) = self.read_frames(track, rel, count)?;
            let raw = track.raw_bytes_per_sector() as usize;
            let out = frames
                .chunks_exact(frame_len)
                .flat_map(|frame| sector::mode2_user_data(&frame[..raw]))
                .copied()
                .collect();

            return Ok(out);
        }

        self.read_extracted(track, rel, count, SectorTag::UserData)
    }

    /// Reads one field of `count` sectors at `rel` sectors into `track`.
    pub fn read_track_sectors_tag(
        &self,
        rel: u64,
        count: u64,
        track: u32,
        tag: SectorTag,
    ) -> Result<Vec<u8>, ReadError> {
        let track = self.checked_track(rel, count, track)?;

        match tag {
            SectorTag::TrackFlags => {
                ensure!(
                    track.kind() != TrackType::Dvd,
                    NotSupportedSnafu {
                        kind: track.kind(),
                        tag
                    }
                );

                let address = track.start() + rel;
                let flags = self
                    .track_for_sector(address)
                    .and_then(|t| self.layout.track_flags.get(&t.sequence()))
                    .context(NoTrackFlagsSnafu { address })?;

                Ok(vec![*flags])
            }
            SectorTag::Subchannel => {
                let data = self.read_extracted(track, rel, count, tag)?;

                Ok(match track.subchannel() {
                    SubchannelMode::Q16 => subchannel::expand_q16(&data),
                    _ => subchannel::deinterleave(&data),
                })
            }
            tag => self.read_extracted(track, rel, count, tag),
        }
    }

    /// Reads whole frames without subchannel at `rel` sectors into `track`.
    pub fn read_track_sectors_long(
        &self,
        rel: u64,
        count: u64,
        track: u32,
    ) -> Result<Vec<u8>, ReadError> {
        let track = self.checked_track(rel, count, track)?;
        let (frames, frame_len) = self.read_frames(track, rel, count)?;
        let raw = track.raw_bytes_per_sector() as usize;

        Ok(frames
            .chunks_exact(frame_len)
            .flat_map(|frame| &frame[..raw])
            .copied()
            .collect())
    }

    /// Checks one sector with the configured [`SectorChecker`].
    ///
    /// A sector that cannot be read is [`VerifyStatus::Indeterminate`].
    pub fn verify_sector(&self, address: u64) -> Result<VerifyStatus, ReadError> {
        let report = self.verify_sectors(address, 1)?;
        Ok(report.status())
    }

    /// Checks `count` sectors starting at `address`, which may span tracks.
    ///
    /// Sectors outside every track or whose frames cannot be read are
    /// reported as unknown.
    pub fn verify_sectors(&self, address: u64, count: u64) -> Result<VerifyReport, ReadError> {
        let sectors = self.info.sectors;
        let end = address
            .checked_add(count)
            .filter(|&end| end <= sectors)
            .context(OutsideDiscSnafu {
                address,
                count,
                sectors,
            })?;

        let mut report = VerifyReport::default();
        let mut address = address;

        while address < end {
            let Some(owner) = self.track_for_sector(address) else {
                let next = self
                    .tracks()
                    .iter()
                    .map(Track::start)
                    .filter(|&start| start > address)
                    .min()
                    .map_or(end, |start| start.min(end));

                for unowned in address..next {
                    report.record(unowned, VerifyStatus::Indeterminate);
                }

                address = next;
                continue;
            };

            let n = (owner.end() - address + 1).min(end - address);
            let rel = address - owner.start();

            match self.read_track_sectors_long(rel, n, owner.sequence()) {
                Ok(frames) => {
                    for (i, frame) in frames
                        .chunks_exact(owner.raw_bytes_per_sector() as usize)
                        .enumerate()
                    {
                        report.record(address + i as u64, self.checker.check(frame).into());
                    }
                }
                Err(e) => {
                    log::warn!("Cannot verify sectors {address}..{}: {e}", address + n);

                    for unread in address..address + n {
                        report.record(unread, VerifyStatus::Indeterminate);
                    }
                }
            }

            address += n;
        }

        log::debug!(
            "Verified {count} sector(s): {} failing, {} unknown",
            report.failing.len(),
            report.unknown.len()
        );

        Ok(report)
    }

    /// Maps an absolute address to `(relative address, track sequence)`.
    fn locate(&self, address: u64) -> Result<(u64, u32), ReadError> {
        let track = self
            .track_for_sector(address)
            .context(SectorNotFoundSnafu { address })?;

        Ok((address - track.start(), track.sequence()))
    }

    fn checked_track(&self, rel: u64, count: u64, track: u32) -> Result<&Track, ReadError> {
        let t = self.track(track).context(TrackNotFoundSnafu { track })?;

        ensure!(
            rel.checked_add(count).is_some_and(|end| end <= t.sectors()),
            OutOfRangeSnafu {
                track,
                rel,
                count,
                sectors: t.sectors()
            }
        );

        Ok(t)
    }

    /// Reads `tag` from each of `count` frames using the extraction table.
    fn read_extracted(
        &self,
        track: &Track,
        rel: u64,
        count: u64,
        tag: SectorTag,
    ) -> Result<Vec<u8>, ReadError> {
        let kind = track.kind();
        let sub = subchannel_bytes(track.subchannel());
        let e = sector::extraction(kind, tag, sub).context(NotSupportedSnafu { kind, tag })?;
        let (frames, frame_len) = self.read_frames(track, rel, count)?;

        ensure!(
            e.offset + e.size <= frame_len,
            NotSupportedSnafu { kind, tag }
        );

        Ok(frames
            .chunks_exact(frame_len)
            .flat_map(|frame| &frame[e.offset..e.offset + e.size])
            .copied()
            .collect())
    }

    /// Reads `count` stored frames, subchannel included, and returns them
    /// with the stored frame length.
    fn read_frames(
        &self,
        track: &Track,
        rel: u64,
        count: u64,
    ) -> Result<(Vec<u8>, usize), ReadError> {
        let file = self.data_file(track)?;
        let lba = (track.start() + rel) as i64;
        let offset = file
            .byte_offset(lba)
            .context(OutsideDataFileSnafu { lba })?;
        let len = count * file.sector_size;

        ensure!(
            file.sector_size >= track.raw_bytes_per_sector() as u64,
            NotSupportedSnafu {
                kind: track.kind(),
                tag: SectorTag::UserData
            }
        );

        log::trace!(
            "Reading {count} sector(s) of track {} at LBA {lba} from offset {offset:#x}",
            track.sequence()
        );

        let mut buf = vec![0u8; len as usize];

        file.image
            .read_exact_at(offset, &mut buf)
            .context(ReadSectorsFailedSnafu { lba, count })?;

        Ok((buf, file.sector_size as usize))
    }

    fn data_file(&self, track: &Track) -> Result<DataFile, ReadError> {
        let resolved = match track.data_file() {
            Some(index) => self.resolver.resolve(index),
            None => {
                let span = (track.end() as i64 - track.lba() + 1).max(1) as u64;
                self.resolver.resolve_range(track.lba(), span)
            }
        };

        resolved.context(ResolveDataFileFailedSnafu {
            track: track.sequence(),
        })
    }
}

fn subchannel_bytes(mode: SubchannelMode) -> usize {
    match mode {
        SubchannelMode::Q16 => subchannel::Q16_SIZE,
        SubchannelMode::Packed => subchannel::SUBCHANNEL_SIZE,
        _ => 0,
    }
}

/// Represents an error when an image cannot be opened.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum OpenError {
    #[snafu(display("cannot open {}", path.display()))]
    DescriptorNotFound { path: std::path::PathBuf },

    #[snafu(display("cannot read descriptor"))]
    ReadDescriptorFailed { source: std::io::Error },

    #[snafu(display("cannot parse descriptor"))]
    ParseDescriptorFailed {
        source: blindwrite_format::ReadError,
    },

    #[snafu(display("data file record #{index} is invalid"))]
    InvalidDataFile {
        index: usize,
        source: resolver::GeometryError,
    },
}

impl OpenError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DescriptorNotFound { .. } => ErrorKind::NoSuchFile,
            Self::ReadDescriptorFailed { .. } => ErrorKind::Io,
            Self::ParseDescriptorFailed { source } => source.kind(),
            Self::InvalidDataFile { .. } => ErrorKind::UnsupportedSubchannelSize,
        }
    }
}

/// Represents an error when a sector or media tag cannot be read.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ReadError {
    #[snafu(display("no track contains sector {address}"))]
    SectorNotFound { address: u64 },

    #[snafu(display("track {track} does not exist"))]
    TrackNotFound { track: u32 },

    #[snafu(display(
        "sectors {rel}..{rel}+{count} are outside track {track} ({sectors} sectors)"
    ))]
    OutOfRange {
        track: u32,
        rel: u64,
        count: u64,
        sectors: u64,
    },

    #[snafu(display("sectors {address}..{address}+{count} are outside the disc ({sectors} sectors)"))]
    OutsideDisc {
        address: u64,
        count: u64,
        sectors: u64,
    },

    #[snafu(display("{tag} cannot be read from a {kind} track"))]
    NotSupported { kind: TrackType, tag: SectorTag },

    #[snafu(display("image has no {tag}"))]
    MediaTagNotFound { tag: MediaTag },

    #[snafu(display("no track flags for sector {address}"))]
    NoTrackFlags { address: u64 },

    #[snafu(display("cannot find data file for track {track}"))]
    ResolveDataFileFailed {
        track: u32,
        source: resolver::ResolveError,
    },

    #[snafu(display("LBA {lba} precedes its data file"))]
    OutsideDataFile { lba: i64 },

    #[snafu(display("cannot read {count} sector(s) at LBA {lba}"))]
    ReadSectorsFailed {
        lba: i64,
        count: u64,
        source: std::io::Error,
    },
}

impl ReadError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SectorNotFound { .. }
            | Self::TrackNotFound { .. }
            | Self::OutsideDataFile { .. } => ErrorKind::SectorNotFound,
            Self::OutOfRange { .. } | Self::OutsideDisc { .. } => ErrorKind::OutOfRange,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
            Self::MediaTagNotFound { .. } | Self::NoTrackFlags { .. } => ErrorKind::NoData,
            Self::ResolveDataFileFailed { source, .. } => source.kind(),
            Self::ReadSectorsFailed { .. } => ErrorKind::Io,
        }
    }
}
