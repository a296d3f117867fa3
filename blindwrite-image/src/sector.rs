use blindwrite_format::session::TrackType;
use std::cmp::min;
use std::fmt;

/// Size of a raw CD frame without subchannel.
pub const RAW_CD_SECTOR_SIZE: usize = 2352;

/// Size of a DVD sector.
pub const DVD_SECTOR_SIZE: usize = 2048;

/// Sync pattern at the start of every CD-ROM data frame.
pub const SYNC: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];

/// Part of a sector that can be read on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SectorTag {
    UserData,
    Sync,
    Header,
    SubHeader,
    Ecc,
    EccP,
    EccQ,
    Edc,
    Subchannel,
    /// CTL nibble of the owning track, one byte per request.
    TrackFlags,
}

impl fmt::Display for SectorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UserData => "user data",
            Self::Sync => "sync",
            Self::Header => "header",
            Self::SubHeader => "subheader",
            Self::Ecc => "ECC",
            Self::EccP => "ECC P",
            Self::EccQ => "ECC Q",
            Self::Edc => "EDC",
            Self::Subchannel => "subchannel",
            Self::TrackFlags => "track flags",
        };

        f.write_str(name)
    }
}

/// Location of a tag inside a stored frame.
///
/// A read takes `size` bytes at `offset`, then skips `skip` bytes to reach
/// the same field of the next sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extraction {
    pub offset: usize,
    pub size: usize,
    pub skip: usize,
}

impl Extraction {
    const fn new(offset: usize, size: usize, skip: usize) -> Self {
        Self { offset, size, skip }
    }

    /// Distance between the same field of two consecutive sectors.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.offset + self.size + self.skip
    }
}

type Table = &'static [(SectorTag, Extraction)];

const MODE1: Table = &[
    (SectorTag::Sync, Extraction::new(0, 12, 2340)),
    (SectorTag::Header, Extraction::new(12, 4, 2336)),
    (SectorTag::Ecc, Extraction::new(2076, 276, 0)),
    (SectorTag::EccP, Extraction::new(2076, 172, 104)),
    (SectorTag::EccQ, Extraction::new(2248, 104, 0)),
    (SectorTag::Edc, Extraction::new(2064, 4, 284)),
    (SectorTag::UserData, Extraction::new(16, 2048, 288)),
];

const MODE2_FORM1: Table = &[
    (SectorTag::Sync, Extraction::new(0, 12, 2340)),
    (SectorTag::Header, Extraction::new(12, 4, 2336)),
    (SectorTag::SubHeader, Extraction::new(16, 8, 2328)),
    (SectorTag::Ecc, Extraction::new(2076, 276, 0)),
    (SectorTag::EccP, Extraction::new(2076, 172, 104)),
    (SectorTag::EccQ, Extraction::new(2248, 104, 0)),
    (SectorTag::Edc, Extraction::new(2072, 4, 276)),
    (SectorTag::UserData, Extraction::new(24, 2048, 280)),
];

const MODE2_FORM2: Table = &[
    (SectorTag::Sync, Extraction::new(0, 12, 2340)),
    (SectorTag::Header, Extraction::new(12, 4, 2336)),
    (SectorTag::SubHeader, Extraction::new(16, 8, 2328)),
    (SectorTag::Edc, Extraction::new(2348, 4, 0)),
    (SectorTag::UserData, Extraction::new(24, 2324, 4)),
];

const MODE2: Table = &[
    (SectorTag::Sync, Extraction::new(0, 12, 2340)),
    (SectorTag::Header, Extraction::new(12, 4, 2336)),
    (SectorTag::UserData, Extraction::new(16, 2336, 0)),
];

const AUDIO: Table = &[(SectorTag::UserData, Extraction::new(0, 2352, 0))];

const DVD: Table = &[(SectorTag::UserData, Extraction::new(0, 2048, 0))];

/// Looks up where `tag` lives in a sector of a `kind` track.
///
/// `subchannel` is the number of subchannel bytes stored after each 2352-byte
/// frame (0, 16 or 96). Returns `None` for combinations that cannot be served.
#[must_use]
pub fn extraction(kind: TrackType, tag: SectorTag, subchannel: usize) -> Option<Extraction> {
    if tag == SectorTag::Subchannel {
        return (subchannel > 0 && kind != TrackType::Dvd)
            .then(|| Extraction::new(RAW_CD_SECTOR_SIZE, subchannel, 0));
    }

    let table = match kind {
        TrackType::Mode1 => MODE1,
        TrackType::Mode2Form1 => MODE2_FORM1,
        TrackType::Mode2Form2 => MODE2_FORM2,
        TrackType::Mode2 => MODE2,
        TrackType::Audio => AUDIO,
        TrackType::Dvd => DVD,
        _ => return None,
    };

    let mut e = table.iter().find(|(t, _)| *t == tag).map(|(_, e)| *e)?;

    if kind != TrackType::Dvd {
        e.skip += subchannel;
    }

    Some(e)
}

/// Returns `(user, raw)` bytes per sector for a track type.
#[must_use]
pub fn geometry(kind: TrackType) -> Option<(u32, u32)> {
    match kind {
        TrackType::Audio => Some((2352, 2352)),
        TrackType::Mode1 | TrackType::Mode2Form1 => Some((2048, 2352)),
        TrackType::Mode2 | TrackType::Mode2Form2 => Some((2336, 2352)),
        TrackType::Dvd => Some((2048, 2048)),
        _ => None,
    }
}

/// Extracts the user data of a Mode 2 frame.
///
/// The sync and header are skipped when present. The form bit of the
/// subheader selects 2324 (Form 2) or 2048 (Form 1) bytes after the subheader.
#[must_use]
pub fn mode2_user_data(frame: &[u8]) -> &[u8] {
    let pos = if frame.starts_with(&SYNC) { 16 } else { 0 };
    let form2 = frame.get(pos + 2).is_some_and(|&b| b & 0x20 != 0);
    let len = if form2 { 2324 } else { 2048 };
    let start = min(pos + 8, frame.len());
    let end = min(start + len, frame.len());

    &frame[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_spans_one_frame() {
        let kinds = [
            TrackType::Mode1,
            TrackType::Mode2,
            TrackType::Mode2Form1,
            TrackType::Mode2Form2,
            TrackType::Audio,
        ];
        let tags = [
            SectorTag::UserData,
            SectorTag::Sync,
            SectorTag::Header,
            SectorTag::SubHeader,
            SectorTag::Ecc,
            SectorTag::EccP,
            SectorTag::EccQ,
            SectorTag::Edc,
        ];

        for kind in kinds {
            for tag in tags {
                for sub in [0, 16, 96] {
                    if let Some(e) = extraction(kind, tag, sub) {
                        assert_eq!(e.stride(), RAW_CD_SECTOR_SIZE + sub, "{kind} {tag}");
                    }
                }
            }
        }

        let dvd = extraction(TrackType::Dvd, SectorTag::UserData, 0).unwrap();
        assert_eq!(dvd.stride(), DVD_SECTOR_SIZE);
    }

    #[test]
    fn mode1_has_no_subheader() {
        assert_eq!(extraction(TrackType::Mode1, SectorTag::SubHeader, 0), None);
        assert_eq!(extraction(TrackType::Audio, SectorTag::Sync, 0), None);
        assert_eq!(extraction(TrackType::Dvd, SectorTag::Subchannel, 96), None);
        assert_eq!(extraction(TrackType::NotData, SectorTag::UserData, 0), None);
    }

    #[test]
    fn subchannel_follows_frame() {
        let e = extraction(TrackType::Audio, SectorTag::Subchannel, 96).unwrap();
        assert_eq!(e, Extraction::new(2352, 96, 0));
        assert_eq!(extraction(TrackType::Audio, SectorTag::Subchannel, 0), None);
    }

    #[test]
    fn mode2_user_data_honours_form_bit() {
        let mut frame = vec![0u8; RAW_CD_SECTOR_SIZE];
        frame[..12].copy_from_slice(&SYNC);
        frame[15] = 2;
        frame[24] = 0xAB;

        let data = mode2_user_data(&frame);
        assert_eq!(data.len(), 2048);
        assert_eq!(data[0], 0xAB);

        frame[18] = 0x20;
        assert_eq!(mode2_user_data(&frame).len(), 2324);
    }

    #[test]
    fn mode2_user_data_without_sync() {
        let mut frame = vec![0u8; 2336];
        frame[2] = 0x20;
        frame[8] = 0xCD;

        let data = mode2_user_data(&frame);
        assert_eq!(data.len(), 2324);
        assert_eq!(data[0], 0xCD);
    }
}
