use crate::media::MediaType;
use crate::sector::SectorTag;
use bitflags::bitflags;
use blindwrite_format::header::Profile;
use std::fmt;

bitflags! {
    /// Set of sector tags readable from at least one track.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SectorTags: u16 {
        const SYNC = 1 << 0;
        const HEADER = 1 << 1;
        const SUBHEADER = 1 << 2;
        const ECC = 1 << 3;
        const ECC_P = 1 << 4;
        const ECC_Q = 1 << 5;
        const EDC = 1 << 6;
        const SUBCHANNEL = 1 << 7;
        const TRACK_FLAGS = 1 << 8;
    }
}

impl SectorTags {
    /// Tags carried by Mode 1 and Mode 2 Form 1 frames.
    pub const FORM1: Self = Self::SYNC
        .union(Self::HEADER)
        .union(Self::SUBHEADER)
        .union(Self::ECC)
        .union(Self::ECC_P)
        .union(Self::ECC_Q)
        .union(Self::EDC);

    /// Tags carried by Mode 2 Form 2 frames.
    pub const FORM2: Self = Self::SYNC
        .union(Self::HEADER)
        .union(Self::SUBHEADER)
        .union(Self::EDC);

    /// Tags carried by formless Mode 2 frames.
    pub const MODE2: Self = Self::SYNC.union(Self::HEADER);

    /// Returns the flag for `tag`, or `None` for user data.
    #[must_use]
    pub fn from_tag(tag: SectorTag) -> Option<Self> {
        let flag = match tag {
            SectorTag::Sync => Self::SYNC,
            SectorTag::Header => Self::HEADER,
            SectorTag::SubHeader => Self::SUBHEADER,
            SectorTag::Ecc => Self::ECC,
            SectorTag::EccP => Self::ECC_P,
            SectorTag::EccQ => Self::ECC_Q,
            SectorTag::Edc => Self::EDC,
            SectorTag::Subchannel => Self::SUBCHANNEL,
            SectorTag::TrackFlags => Self::TRACK_FLAGS,
            SectorTag::UserData => return None,
        };

        Some(flag)
    }
}

/// Disc-wide structure that can be read from an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MediaTag {
    ModePage2A,
    Pma,
    Atip,
    CdText,
    Bca,
    /// DVD Physical Format Information, 2048 bytes.
    Pfi,
    /// DVD Disc Manufacturing Information, 2048 bytes.
    Dmi,
    /// Red Book full TOC rebuilt from the track descriptors.
    FullToc,
}

impl MediaTag {
    /// Every tag, in a stable order.
    pub const ALL: [Self; 8] = [
        Self::ModePage2A,
        Self::Pma,
        Self::Atip,
        Self::CdText,
        Self::Bca,
        Self::Pfi,
        Self::Dmi,
        Self::FullToc,
    ];

    /// Returns a short name suitable for file names.
    #[must_use]
    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::ModePage2A => "mode_page_2a",
            Self::Pma => "pma",
            Self::Atip => "atip",
            Self::CdText => "cd_text",
            Self::Bca => "bca",
            Self::Pfi => "pfi",
            Self::Dmi => "dmi",
            Self::FullToc => "full_toc",
        }
    }

    #[must_use]
    pub const fn flag(self) -> MediaTags {
        match self {
            Self::ModePage2A => MediaTags::MODE_PAGE_2A,
            Self::Pma => MediaTags::PMA,
            Self::Atip => MediaTags::ATIP,
            Self::CdText => MediaTags::CD_TEXT,
            Self::Bca => MediaTags::BCA,
            Self::Pfi => MediaTags::PFI,
            Self::Dmi => MediaTags::DMI,
            Self::FullToc => MediaTags::FULL_TOC,
        }
    }
}

impl fmt::Display for MediaTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ModePage2A => "mode page 2A",
            Self::Pma => "PMA",
            Self::Atip => "ATIP",
            Self::CdText => "CD-TEXT",
            Self::Bca => "BCA",
            Self::Pfi => "PFI",
            Self::Dmi => "DMI",
            Self::FullToc => "full TOC",
        };

        f.write_str(name)
    }
}

bitflags! {
    /// Set of media tags present in an image.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MediaTags: u8 {
        const MODE_PAGE_2A = 1 << 0;
        const PMA = 1 << 1;
        const ATIP = 1 << 2;
        const CD_TEXT = 1 << 3;
        const BCA = 1 << 4;
        const PFI = 1 << 5;
        const DMI = 1 << 6;
        const FULL_TOC = 1 << 7;
    }
}

/// Summary of an opened image.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ImageInfo {
    pub application: &'static str,
    /// `"5"` for `.b5t` descriptors, `"6"` for `.b6t`.
    pub application_version: &'static str,
    pub profile: Profile,
    pub media_type: MediaType,
    pub media_manufacturer: Option<String>,
    pub mcn: Option<String>,
    /// Number of addressable sectors.
    pub sectors: u64,
    /// Smallest user-data sector size across all tracks.
    pub sector_size: u32,
    pub sessions: usize,
    pub tracks: usize,
    pub drive_manufacturer: String,
    pub drive_model: String,
    pub drive_firmware: String,
    pub drive_serial: String,
    pub volume_id: String,
    pub readable_sector_tags: SectorTags,
    pub readable_media_tags: MediaTags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_sets_nest() {
        assert!(SectorTags::FORM1.contains(SectorTags::FORM2));
        assert!(SectorTags::FORM2.contains(SectorTags::MODE2));
        assert!(!SectorTags::FORM2.contains(SectorTags::ECC));
    }

    #[test]
    fn every_media_tag_has_a_distinct_flag() {
        let all = MediaTag::ALL
            .iter()
            .fold(MediaTags::empty(), |acc, t| acc | t.flag());

        assert_eq!(all, MediaTags::all());
        assert_eq!(SectorTags::from_tag(SectorTag::UserData), None);
    }
}
