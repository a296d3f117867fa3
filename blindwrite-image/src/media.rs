use crate::layout::Track;
use crate::structures::atip::Atip;
use crate::structures::dmi;
use crate::structures::pfi::{DiscCategory, DiscSize, Pfi};
use blindwrite_format::header::Profile;
use blindwrite_format::session::TrackType;
use std::fmt;

/// Sector count above which a BD-R/BD-RE is a BDXL disc.
const BD_XL_THRESHOLD: u64 = 24_438_784;

/// Xbox 360 discs whose DMI reports XGD2 but whose size is an XGD3 layout.
const XGD3_SECTOR_COUNTS: [u64; 3] = [25_063, 4_229_664, 4_246_304];

/// Physical media the image was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MediaType {
    Unknown,
    Cd,
    Cdda,
    CdPlus,
    CdRom,
    CdRomXa,
    CdR,
    CdRw,
    Ddcd,
    DdcdR,
    DdcdRw,
    DvdRom,
    DvdR,
    DvdRDl,
    DvdRw,
    DvdRwDl,
    DvdRam,
    DvdDownload,
    DvdPlusR,
    DvdPlusRDl,
    DvdPlusRw,
    DvdPlusRwDl,
    HdDvdRom,
    HdDvdR,
    HdDvdRDl,
    HdDvdRam,
    HdDvdRw,
    HdDvdRwDl,
    BdRom,
    BdR,
    BdRXl,
    BdRe,
    BdReXl,
    /// Nintendo GameCube optical disc.
    God,
    /// Nintendo Wii optical disc.
    Wod,
    Xgd,
    Xgd2,
    Xgd3,
}

impl MediaType {
    /// Returns the media type implied by the drive profile alone.
    #[must_use]
    pub const fn from_profile(profile: Profile) -> Self {
        match profile {
            Profile::None => Self::Cd,
            Profile::CdRom => Self::CdRom,
            Profile::CdR => Self::CdR,
            Profile::CdRw => Self::CdRw,
            Profile::DdcdRom => Self::Ddcd,
            Profile::DdcdR => Self::DdcdR,
            Profile::DdcdRw => Self::DdcdRw,
            Profile::DvdRom => Self::DvdRom,
            Profile::DvdRSequential => Self::DvdR,
            Profile::DvdRDlSequential | Profile::DvdRDlJump => Self::DvdRDl,
            Profile::DvdRam => Self::DvdRam,
            Profile::DvdRwRestricted | Profile::DvdRwSequential => Self::DvdRw,
            Profile::DvdRwDl => Self::DvdRwDl,
            Profile::DvdDownload => Self::DvdDownload,
            Profile::DvdPlusRw => Self::DvdPlusRw,
            Profile::DvdPlusR => Self::DvdPlusR,
            Profile::DvdPlusRwDl => Self::DvdPlusRwDl,
            Profile::DvdPlusRDl => Self::DvdPlusRDl,
            Profile::BdRom => Self::BdRom,
            Profile::BdRSequential | Profile::BdRRandom => Self::BdR,
            Profile::BdRe => Self::BdRe,
            Profile::HdDvdRom => Self::HdDvdRom,
            Profile::HdDvdR => Self::HdDvdR,
            Profile::HdDvdRam => Self::HdDvdRam,
            Profile::HdDvdRw => Self::HdDvdRw,
            Profile::HdDvdRDl => Self::HdDvdRDl,
            Profile::HdDvdRwDl => Self::HdDvdRwDl,
            _ => Self::Unknown,
        }
    }

    /// Returns `true` for CD-family media.
    #[must_use]
    pub const fn is_cd(self) -> bool {
        matches!(
            self,
            Self::Cd
                | Self::Cdda
                | Self::CdPlus
                | Self::CdRom
                | Self::CdRomXa
                | Self::CdR
                | Self::CdRw
                | Self::Ddcd
                | Self::DdcdR
                | Self::DdcdRw
        )
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Cd => "CD",
            Self::Cdda => "CD Digital Audio",
            Self::CdPlus => "CD-Plus",
            Self::CdRom => "CD-ROM",
            Self::CdRomXa => "CD-ROM XA",
            Self::CdR => "CD-R",
            Self::CdRw => "CD-RW",
            Self::Ddcd => "DDCD-ROM",
            Self::DdcdR => "DDCD-R",
            Self::DdcdRw => "DDCD-RW",
            Self::DvdRom => "DVD-ROM",
            Self::DvdR => "DVD-R",
            Self::DvdRDl => "DVD-R DL",
            Self::DvdRw => "DVD-RW",
            Self::DvdRwDl => "DVD-RW DL",
            Self::DvdRam => "DVD-RAM",
            Self::DvdDownload => "DVD-Download",
            Self::DvdPlusR => "DVD+R",
            Self::DvdPlusRDl => "DVD+R DL",
            Self::DvdPlusRw => "DVD+RW",
            Self::DvdPlusRwDl => "DVD+RW DL",
            Self::HdDvdRom => "HD DVD-ROM",
            Self::HdDvdR => "HD DVD-R",
            Self::HdDvdRDl => "HD DVD-R DL",
            Self::HdDvdRam => "HD DVD-RAM",
            Self::HdDvdRw => "HD DVD-RW",
            Self::HdDvdRwDl => "HD DVD-RW DL",
            Self::BdRom => "BD-ROM",
            Self::BdR => "BD-R",
            Self::BdRXl => "BD-R XL",
            Self::BdRe => "BD-RE",
            Self::BdReXl => "BD-RE XL",
            Self::God => "Nintendo GameCube disc",
            Self::Wod => "Nintendo Wii disc",
            Self::Xgd => "Xbox Game Disc",
            Self::Xgd2 => "Xbox 360 Game Disc (XGD2)",
            Self::Xgd3 => "Xbox 360 Game Disc (XGD3)",
        };

        f.write_str(name)
    }
}

/// Everything the classifier looks at.
pub(crate) struct Evidence<'a> {
    pub profile: Profile,
    pub pfi: Option<&'a Pfi>,
    /// DMI as a 2052-byte READ DVD STRUCTURE response.
    pub dmi: Option<&'a [u8]>,
    pub atip: Option<&'a Atip>,
    pub tracks: &'a [Track],
    pub session_count: usize,
    pub sectors: u64,
    pub has_dvd_track: bool,
}

/// Decides the media type. Each step may replace the result of the previous one.
pub(crate) fn classify(e: &Evidence<'_>) -> MediaType {
    let mut media = MediaType::from_profile(e.profile);

    if let Some(pfi) = e.pfi {
        media = from_pfi(pfi).unwrap_or(media);
    }

    if let Some(dmi) = e.dmi {
        if dmi::is_xbox(dmi) {
            media = MediaType::Xgd;
        } else if dmi::is_xbox360(dmi) {
            media = MediaType::Xgd2;
        }
    }

    let cd_media = !e.has_dvd_track
        && e.pfi.is_none()
        && e.dmi.is_none()
        && (media.is_cd() || media == MediaType::Unknown);

    if cd_media {
        media = from_tracks(e.tracks, e.session_count);

        if let Some(atip) = e.atip {
            media = if atip.rewritable {
                MediaType::CdRw
            } else {
                MediaType::CdR
            };
        }
    }

    if e.sectors > BD_XL_THRESHOLD {
        media = match media {
            MediaType::BdR => MediaType::BdRXl,
            MediaType::BdRe => MediaType::BdReXl,
            other => other,
        };
    }

    if media == MediaType::Xgd2 && XGD3_SECTOR_COUNTS.contains(&e.sectors) {
        media = MediaType::Xgd3;
    }

    log::debug!("Media type: {media}");

    media
}

fn from_pfi(pfi: &Pfi) -> Option<MediaType> {
    let dual_layer = pfi.part_version >= 6;

    let media = match pfi.category {
        DiscCategory::DvdRom => MediaType::DvdRom,
        DiscCategory::DvdRam => MediaType::DvdRam,
        DiscCategory::DvdR if dual_layer => MediaType::DvdRDl,
        DiscCategory::DvdR => MediaType::DvdR,
        DiscCategory::DvdRw if dual_layer => MediaType::DvdRwDl,
        DiscCategory::DvdRw => MediaType::DvdRw,
        DiscCategory::HdDvdRom => MediaType::HdDvdRom,
        DiscCategory::HdDvdRam => MediaType::HdDvdRam,
        DiscCategory::HdDvdR => MediaType::HdDvdR,
        DiscCategory::DvdPlusRw => MediaType::DvdPlusRw,
        DiscCategory::DvdPlusR => MediaType::DvdPlusR,
        DiscCategory::DvdPlusRwDl => MediaType::DvdPlusRwDl,
        DiscCategory::DvdPlusRDl => MediaType::DvdPlusRDl,
        DiscCategory::Nintendo if pfi.disc_size == DiscSize::Cm80 => MediaType::God,
        DiscCategory::Nintendo => MediaType::Wod,
        DiscCategory::Unknown(_) => return None,
    };

    Some(media)
}

/// Classifies a CD by which tracks carry audio and which carry data.
fn from_tracks(tracks: &[Track], session_count: usize) -> MediaType {
    let mut first_audio = false;
    let mut first_data = false;
    let mut audio = false;
    let mut data = false;
    let mut mode2 = false;

    for track in tracks {
        let is_audio = track.kind() == TrackType::Audio;

        match (track.sequence() == 1, is_audio) {
            (true, true) => first_audio = true,
            (true, false) => first_data = true,
            (false, true) => audio = true,
            (false, false) => data = true,
        }

        mode2 |= track.kind().is_mode2();
    }

    if !data && !first_data {
        MediaType::Cdda
    } else if first_audio && data && session_count > 1 && mode2 {
        MediaType::CdPlus
    } else if (first_data && audio) || mode2 {
        MediaType::CdRomXa
    } else if !audio {
        MediaType::CdRom
    } else {
        MediaType::Cd
    }
}
