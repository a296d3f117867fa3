use crate::info::SectorTags;
use crate::resolver::DataFileInfo;
use crate::sector;
use blindwrite_format::Descriptor;
use blindwrite_format::session::{FIRST_PSEUDO_POINT, SubchannelMode, TrackDescriptor, TrackType};
use std::collections::BTreeMap;

/// Size of one full-TOC entry.
const TOC_ENTRY_SIZE: usize = 11;

/// A logical track.
///
/// Sector addresses are absolute and `end` is inclusive.
#[derive(Debug, Clone)]
#[must_use]
pub struct Track {
    sequence: u32,
    session: u16,
    kind: TrackType,
    start: u64,
    end: u64,
    pregap: u64,
    bytes_per_sector: u32,
    raw_bytes_per_sector: u32,
    indexes: BTreeMap<u16, u64>,
    ctl: u8,
    subchannel: SubchannelMode,
    lba: i64,
    data_file: Option<usize>,
}

impl Track {
    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    #[must_use]
    pub fn session(&self) -> u16 {
        self.session
    }

    #[must_use]
    pub fn kind(&self) -> TrackType {
        self.kind
    }

    /// Returns the first sector after the pregap.
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Returns the last sector, inclusive.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Returns the number of addressable sectors.
    #[must_use]
    pub fn sectors(&self) -> u64 {
        self.end - self.start + 1
    }

    #[must_use]
    pub fn pregap(&self) -> u64 {
        self.pregap
    }

    /// Returns the user-data bytes per sector.
    #[must_use]
    pub fn bytes_per_sector(&self) -> u32 {
        self.bytes_per_sector
    }

    #[must_use]
    pub fn raw_bytes_per_sector(&self) -> u32 {
        self.raw_bytes_per_sector
    }

    /// Returns index points keyed by index number.
    #[must_use]
    pub fn indexes(&self) -> &BTreeMap<u16, u64> {
        &self.indexes
    }

    /// Returns the CTL nibble from the TOC.
    #[must_use]
    pub fn ctl(&self) -> u8 {
        self.ctl
    }

    /// Returns the subchannel stored with this track's sectors.
    #[must_use]
    pub fn subchannel(&self) -> SubchannelMode {
        self.subchannel
    }

    /// Returns the LBA where the track's pregap begins.
    #[must_use]
    pub fn lba(&self) -> i64 {
        self.lba
    }

    /// Index of the data-file record holding every sector of the track.
    pub(crate) fn data_file(&self) -> Option<usize> {
        self.data_file
    }

    /// Returns `true` if `address` is one of this track's sectors.
    #[must_use]
    pub fn contains(&self, address: u64) -> bool {
        (self.start..=self.end).contains(&address)
    }
}

/// Byte-range view of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub sequence: u32,
    pub start: u64,
    /// Length in sectors.
    pub length: u64,
    /// Byte offset of the partition.
    pub offset: u64,
    /// Size in bytes.
    pub size: u64,
    pub kind: TrackType,
}

/// A recording session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub sequence: u16,
    pub start: u64,
    pub end: u64,
    pub first_track: u16,
    pub last_track: u16,
}

/// Everything derived from the descriptor's session table.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub tracks: Vec<Track>,
    pub partitions: Vec<Partition>,
    pub sessions: Vec<Session>,
    pub full_toc: Option<Vec<u8>>,
    pub offset_map: BTreeMap<u32, u64>,
    pub track_flags: BTreeMap<u32, u8>,
    pub sectors: u64,
    pub min_sector_size: u32,
    pub has_dvd_track: bool,
    pub sector_tags: SectorTags,
}

impl Layout {
    pub fn build(descriptor: &Descriptor, files: &[DataFileInfo]) -> Self {
        let mut toc = Vec::new();
        let mut tracks = Vec::new();
        let mut partitions = Vec::new();
        let mut sector_tags = SectorTags::empty();
        let mut has_dvd_track = false;
        let mut partition_offset = 0u64;
        let mut min_sector_size = u32::MAX;
        let mut sectors = 0u64;

        let sessions: Vec<Session> = descriptor
            .sessions()
            .iter()
            .map(|s| Session {
                sequence: s.sequence(),
                start: s.start().max(0) as u64,
                end: s.end().max(0) as u64,
                first_track: s.first_track(),
                last_track: s.last_track(),
            })
            .collect();

        for desc in descriptor.sessions().iter().flat_map(|s| s.tracks()) {
            toc.extend_from_slice(&desc.toc_entry());

            if desc.point() >= FIRST_PSEUDO_POINT {
                continue;
            }

            let Some((user, raw)) = sector::geometry(desc.kind()) else {
                log::warn!(
                    "Skipping track {} with unsupported type {}",
                    desc.point(),
                    desc.kind()
                );
                continue;
            };

            let Some(track) = build_track(desc, user, raw, &sessions, files) else {
                log::warn!("Skipping track {} without sectors", desc.point());
                continue;
            };

            log::debug!(
                "Track {}: {} sectors {}..={}, {}/{} bytes, session {}",
                track.sequence,
                track.kind,
                track.start,
                track.end,
                track.bytes_per_sector,
                track.raw_bytes_per_sector,
                track.session
            );

            match track.kind {
                TrackType::Mode1 | TrackType::Mode2Form1 => sector_tags |= SectorTags::FORM1,
                TrackType::Mode2 => sector_tags |= SectorTags::MODE2,
                TrackType::Mode2Form2 => sector_tags |= SectorTags::FORM2,
                TrackType::Dvd => has_dvd_track = true,
                _ => {}
            }

            if !matches!(track.subchannel, SubchannelMode::None) && track.kind != TrackType::Dvd {
                sector_tags |= SectorTags::SUBCHANNEL;
            }

            // Form 2 counts as 2324 here even though its tracks report 2336.
            let min_size = match track.kind {
                TrackType::Mode2Form2 => 2324,
                _ => track.bytes_per_sector,
            };
            min_sector_size = min_sector_size.min(min_size);

            partitions.push(Partition {
                sequence: track.sequence,
                start: track.start,
                length: track.sectors(),
                offset: partition_offset,
                size: track.sectors() * track.raw_bytes_per_sector as u64,
                kind: track.kind,
            });
            partition_offset += (track.end - track.start) * track.raw_bytes_per_sector as u64;

            sectors = sectors.max(track.end + 1);
            tracks.push(track);
        }

        if !has_dvd_track && !tracks.is_empty() {
            sector_tags |= SectorTags::TRACK_FLAGS;
        }

        let full_toc = (!has_dvd_track).then(|| {
            let first = sessions.iter().map(|s| s.sequence).min().unwrap_or(0);
            let last = sessions.iter().map(|s| s.sequence).max().unwrap_or(0);
            full_toc(first as u8, last as u8, &toc)
        });

        let offset_map = tracks.iter().map(|t| (t.sequence, t.start)).collect();
        let track_flags = tracks.iter().map(|t| (t.sequence, t.ctl)).collect();

        if min_sector_size == u32::MAX {
            min_sector_size = 0;
        }

        Self {
            tracks,
            partitions,
            sessions,
            full_toc,
            offset_map,
            track_flags,
            sectors,
            min_sector_size,
            has_dvd_track,
            sector_tags,
        }
    }
}

fn build_track(
    desc: &TrackDescriptor,
    user: u32,
    raw: u32,
    sessions: &[Session],
    files: &[DataFileInfo],
) -> Option<Track> {
    let lba = desc.start_lba() as i64;
    let pregap = desc.pregap() as u64;
    let last = lba + desc.sectors() as i64 - 1;
    let start = (lba + pregap as i64).max(0);

    if desc.sectors() == 0 || last < start {
        return None;
    }

    let sequence = desc.point() as u32;
    let start = start as u64;
    let end = last as u64;
    let mut indexes = BTreeMap::new();

    if pregap > 0 && start > 0 {
        indexes.insert(0, (start as i64 - pregap as i64).max(0) as u64);
    }

    indexes.insert(1, start);

    let session = sessions
        .iter()
        .find(|s| (s.first_track as u32..=s.last_track as u32).contains(&sequence))
        .map_or(desc.session() as u16, |s| s.sequence);

    let subchannel = files
        .iter()
        .find(|f| f.contains(lba))
        .map_or(desc.subchannel(), |f| f.subchannel);
    let data_file = files
        .iter()
        .find(|f| f.covers(lba, (last - lba + 1) as u64))
        .map(|f| f.index);

    Some(Track {
        sequence,
        session,
        kind: desc.kind(),
        start,
        end,
        pregap,
        bytes_per_sector: user,
        raw_bytes_per_sector: raw,
        indexes,
        ctl: desc.ctl(),
        subchannel,
        lba,
        data_file,
    })
}

/// Builds a READ TOC format 2 response from concatenated entries.
fn full_toc(first_session: u8, last_session: u8, entries: &[u8]) -> Vec<u8> {
    let len = (entries.len() + 2) as u16;
    let mut out = Vec::with_capacity(entries.len() + 4);

    out.extend_from_slice(&len.to_be_bytes());
    out.push(first_session);
    out.push(last_session);
    out.extend_from_slice(entries);

    debug_assert_eq!(entries.len() % TOC_ENTRY_SIZE, 0);
    out
}
