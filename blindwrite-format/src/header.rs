use std::fmt;

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::little_endian::{U16, U32},
};

/// Magic at the start of every descriptor.
pub const SIGNATURE: &[u8; 16] = b"BWT5 STREAM SIGN";

/// Size of the fixed header on disk.
pub const HEADER_SIZE: usize = 0x104;

/// Fixed descriptor header (260 bytes).
///
/// Fields named `unknown*` are not understood. They are kept verbatim so the
/// header can be written back unchanged.
#[derive(Debug, Clone, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct HeaderRaw {
    pub signature: [u8; 16],       // 0x000
    pub unknown1: [U32; 4],        // 0x010
    pub profile: U16,              // 0x020
    pub sessions: U16,             // 0x022
    pub unknown2: [U32; 3],        // 0x024
    pub mcn_is_valid: u8,          // 0x030
    pub mcn: [u8; 13],             // 0x031
    pub unknown3: U16,             // 0x03E
    pub unknown4: [U32; 8],        // 0x040
    pub pma_len: U16,              // 0x060
    pub atip_len: U16,             // 0x062
    pub cdtext_len: U16,           // 0x064
    pub cd_info_len: U16,          // 0x066
    pub bca_len: U32,              // 0x068
    pub unknown5: [U32; 3],        // 0x06C
    pub dvd_struct_len: U32,       // 0x078
    pub dvd_info_len: U32,         // 0x07C
    pub unknown6: [u8; 32],        // 0x080
    pub manufacturer: [u8; 8],     // 0x0A0
    pub product: [u8; 16],         // 0x0A8
    pub revision: [u8; 4],         // 0x0B8
    pub vendor: [u8; 20],          // 0x0BC
    pub volume_id: [u8; 32],       // 0x0D0
    pub mode2a_len: U32,           // 0x0F0
    pub unknown_block_len: U32,    // 0x0F4
    pub data_len: U32,             // 0x0F8
    pub sessions_len: U32,         // 0x0FC
    pub dpm_len: U32,              // 0x100
                                   // 0x104 - end of header
}

const _: () = assert!(size_of::<HeaderRaw>() == HEADER_SIZE);

/// Parsed descriptor header.
#[derive(Debug, Clone)]
#[must_use]
pub struct Header {
    raw: HeaderRaw,
}

impl Header {
    pub(crate) fn new(raw: HeaderRaw) -> Self {
        Self { raw }
    }

    /// Returns `true` if the signature is `"BWT5 STREAM SIGN"`.
    #[must_use]
    pub fn has_valid_signature(&self) -> bool {
        &self.raw.signature == SIGNATURE
    }

    #[must_use]
    pub fn profile(&self) -> Profile {
        Profile::from_u16(self.raw.profile.get())
    }

    /// Returns the number of session descriptors that follow the data-file table.
    #[must_use]
    pub fn session_count(&self) -> u16 {
        self.raw.sessions.get()
    }

    /// Returns the Media Catalogue Number when the capture marked it valid.
    #[must_use]
    pub fn mcn(&self) -> Option<String> {
        if self.raw.mcn_is_valid == 0 {
            return None;
        }

        Some(ascii_field(&self.raw.mcn))
    }

    #[must_use]
    pub fn mode2a_len(&self) -> usize {
        self.raw.mode2a_len.get() as usize
    }

    #[must_use]
    pub fn unknown_block_len(&self) -> usize {
        self.raw.unknown_block_len.get() as usize
    }

    #[must_use]
    pub fn pma_len(&self) -> usize {
        self.raw.pma_len.get() as usize
    }

    #[must_use]
    pub fn atip_len(&self) -> usize {
        self.raw.atip_len.get() as usize
    }

    #[must_use]
    pub fn cdtext_len(&self) -> usize {
        self.raw.cdtext_len.get() as usize
    }

    #[must_use]
    pub fn bca_len(&self) -> usize {
        self.raw.bca_len.get() as usize
    }

    /// Returns the length of the disc-information block.
    ///
    /// CD captures use the CD-sized field, everything else the DVD-sized one.
    #[must_use]
    pub fn disc_info_len(&self) -> usize {
        if self.profile().is_cd() || self.profile() == Profile::None {
            self.raw.cd_info_len.get() as usize
        } else {
            self.raw.dvd_info_len.get() as usize
        }
    }

    #[must_use]
    pub fn dvd_struct_len(&self) -> usize {
        self.raw.dvd_struct_len.get() as usize
    }

    #[must_use]
    pub fn dpm_len(&self) -> usize {
        self.raw.dpm_len.get() as usize
    }

    /// Returns the drive vendor string.
    #[must_use]
    pub fn drive_manufacturer(&self) -> String {
        ascii_field(&self.raw.manufacturer)
    }

    /// Returns the drive product string.
    #[must_use]
    pub fn drive_model(&self) -> String {
        ascii_field(&self.raw.product)
    }

    /// Returns the drive firmware revision.
    #[must_use]
    pub fn drive_firmware(&self) -> String {
        ascii_field(&self.raw.revision)
    }

    /// Returns the vendor-specific inquiry string, usually the drive serial.
    #[must_use]
    pub fn drive_serial(&self) -> String {
        ascii_field(&self.raw.vendor)
    }

    #[must_use]
    pub fn volume_id(&self) -> String {
        ascii_field(&self.raw.volume_id)
    }

    /// Returns the raw header.
    #[must_use]
    pub const fn raw_header(&self) -> &HeaderRaw {
        &self.raw
    }

    /// Returns the header as it appears on disk.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }
}

/// Decodes a fixed-width ASCII field, dropping NUL padding and trailing blanks.
fn ascii_field(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).trim_end().to_owned()
}

/// MMC profile number of the drive/media combination that was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Profile {
    None,
    CdRom,
    CdR,
    CdRw,
    DvdRom,
    DvdRSequential,
    DvdRam,
    DvdRwRestricted,
    DvdRwSequential,
    DvdRDlSequential,
    DvdRDlJump,
    DvdRwDl,
    DvdDownload,
    DvdPlusRw,
    DvdPlusR,
    DdcdRom,
    DdcdR,
    DdcdRw,
    DvdPlusRwDl,
    DvdPlusRDl,
    BdRom,
    BdRSequential,
    BdRRandom,
    BdRe,
    HdDvdRom,
    HdDvdR,
    HdDvdRam,
    HdDvdRw,
    HdDvdRDl,
    HdDvdRwDl,

    /// Unrecognized profile number.
    Unknown(u16),
}

impl Profile {
    /// Returns the raw MMC profile number.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::None => 0x0000,
            Self::CdRom => 0x0008,
            Self::CdR => 0x0009,
            Self::CdRw => 0x000A,
            Self::DvdRom => 0x0010,
            Self::DvdRSequential => 0x0011,
            Self::DvdRam => 0x0012,
            Self::DvdRwRestricted => 0x0013,
            Self::DvdRwSequential => 0x0014,
            Self::DvdRDlSequential => 0x0015,
            Self::DvdRDlJump => 0x0016,
            Self::DvdRwDl => 0x0017,
            Self::DvdDownload => 0x0018,
            Self::DvdPlusRw => 0x001A,
            Self::DvdPlusR => 0x001B,
            Self::DdcdRom => 0x0020,
            Self::DdcdR => 0x0021,
            Self::DdcdRw => 0x0022,
            Self::DvdPlusRwDl => 0x002A,
            Self::DvdPlusRDl => 0x002B,
            Self::BdRom => 0x0040,
            Self::BdRSequential => 0x0041,
            Self::BdRRandom => 0x0042,
            Self::BdRe => 0x0043,
            Self::HdDvdRom => 0x0050,
            Self::HdDvdR => 0x0051,
            Self::HdDvdRam => 0x0052,
            Self::HdDvdRw => 0x0053,
            Self::HdDvdRDl => 0x0058,
            Self::HdDvdRwDl => 0x005A,
            Self::Unknown(raw) => raw,
        }
    }

    /// Converts a raw MMC profile number into a [`Profile`].
    #[must_use]
    pub const fn from_u16(raw: u16) -> Self {
        match raw {
            0x0000 => Self::None,
            0x0008 => Self::CdRom,
            0x0009 => Self::CdR,
            0x000A => Self::CdRw,
            0x0010 => Self::DvdRom,
            0x0011 => Self::DvdRSequential,
            0x0012 => Self::DvdRam,
            0x0013 => Self::DvdRwRestricted,
            0x0014 => Self::DvdRwSequential,
            0x0015 => Self::DvdRDlSequential,
            0x0016 => Self::DvdRDlJump,
            0x0017 => Self::DvdRwDl,
            0x0018 => Self::DvdDownload,
            0x001A => Self::DvdPlusRw,
            0x001B => Self::DvdPlusR,
            0x0020 => Self::DdcdRom,
            0x0021 => Self::DdcdR,
            0x0022 => Self::DdcdRw,
            0x002A => Self::DvdPlusRwDl,
            0x002B => Self::DvdPlusRDl,
            0x0040 => Self::BdRom,
            0x0041 => Self::BdRSequential,
            0x0042 => Self::BdRRandom,
            0x0043 => Self::BdRe,
            0x0050 => Self::HdDvdRom,
            0x0051 => Self::HdDvdR,
            0x0052 => Self::HdDvdRam,
            0x0053 => Self::HdDvdRw,
            0x0058 => Self::HdDvdRDl,
            0x005A => Self::HdDvdRwDl,
            other => Self::Unknown(other),
        }
    }

    /// Returns `true` for CD and double-density CD profiles.
    #[must_use]
    pub const fn is_cd(self) -> bool {
        matches!(
            self,
            Self::CdRom | Self::CdR | Self::CdRw | Self::DdcdRom | Self::DdcdR | Self::DdcdRw
        )
    }

    /// Returns `true` for Blu-ray profiles.
    #[must_use]
    pub const fn is_bd(self) -> bool {
        matches!(
            self,
            Self::BdRom | Self::BdRSequential | Self::BdRRandom | Self::BdRe
        )
    }

    /// Returns `true` for HD DVD profiles.
    #[must_use]
    pub const fn is_hd_dvd(self) -> bool {
        matches!(
            self,
            Self::HdDvdRom
                | Self::HdDvdR
                | Self::HdDvdRam
                | Self::HdDvdRw
                | Self::HdDvdRDl
                | Self::HdDvdRwDl
        )
    }

    /// Returns `true` for DVD profiles (including DVD+ variants).
    #[must_use]
    pub const fn is_dvd(self) -> bool {
        matches!(
            self,
            Self::DvdRom
                | Self::DvdRSequential
                | Self::DvdRam
                | Self::DvdRwRestricted
                | Self::DvdRwSequential
                | Self::DvdRDlSequential
                | Self::DvdRDlJump
                | Self::DvdRwDl
                | Self::DvdDownload
                | Self::DvdPlusRw
                | Self::DvdPlusR
                | Self::DvdPlusRwDl
                | Self::DvdPlusRDl
        )
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::CdRom => "CD-ROM",
            Self::CdR => "CD-R",
            Self::CdRw => "CD-RW",
            Self::DvdRom => "DVD-ROM",
            Self::DvdRSequential => "DVD-R",
            Self::DvdRam => "DVD-RAM",
            Self::DvdRwRestricted => "DVD-RW (restricted overwrite)",
            Self::DvdRwSequential => "DVD-RW",
            Self::DvdRDlSequential => "DVD-R DL",
            Self::DvdRDlJump => "DVD-R DL (layer jump)",
            Self::DvdRwDl => "DVD-RW DL",
            Self::DvdDownload => "DVD-Download",
            Self::DvdPlusRw => "DVD+RW",
            Self::DvdPlusR => "DVD+R",
            Self::DdcdRom => "DDCD-ROM",
            Self::DdcdR => "DDCD-R",
            Self::DdcdRw => "DDCD-RW",
            Self::DvdPlusRwDl => "DVD+RW DL",
            Self::DvdPlusRDl => "DVD+R DL",
            Self::BdRom => "BD-ROM",
            Self::BdRSequential => "BD-R (SRM)",
            Self::BdRRandom => "BD-R (RRM)",
            Self::BdRe => "BD-RE",
            Self::HdDvdRom => "HD DVD-ROM",
            Self::HdDvdR => "HD DVD-R",
            Self::HdDvdRam => "HD DVD-RAM",
            Self::HdDvdRw => "HD DVD-RW",
            Self::HdDvdRDl => "HD DVD-R DL",
            Self::HdDvdRwDl => "HD DVD-RW DL",
            Self::Unknown(raw) => return write!(f, "unknown (0x{raw:04X})"),
        };

        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::FromZeros;

    #[test]
    fn field_offsets_match_layout() {
        let mut raw = HeaderRaw::new_zeroed();
        raw.profile = U16::new(0x0009);
        raw.mcn_is_valid = 1;
        raw.pma_len = U16::new(0x1122);
        raw.mode2a_len = U32::new(0x33445566);
        raw.dpm_len = U32::new(0x778899AA);

        let bytes = raw.as_bytes();

        assert_eq!(&bytes[0x20..0x22], &[0x09, 0x00]);
        assert_eq!(bytes[0x30], 1);
        assert_eq!(&bytes[0x60..0x62], &[0x22, 0x11]);
        assert_eq!(&bytes[0xF0..0xF4], &[0x66, 0x55, 0x44, 0x33]);
        assert_eq!(&bytes[0x100..0x104], &[0xAA, 0x99, 0x88, 0x77]);
    }

    #[test]
    fn strings_are_trimmed() {
        let mut raw = HeaderRaw::new_zeroed();
        raw.manufacturer.copy_from_slice(b"PLEXTOR ");
        raw.product[..11].copy_from_slice(b"DVDR PX-716");
        raw.mcn_is_valid = 0;

        let header = Header::new(raw);

        assert_eq!(header.drive_manufacturer(), "PLEXTOR");
        assert_eq!(header.drive_model(), "DVDR PX-716");
        assert_eq!(header.mcn(), None);
    }

    #[test]
    fn disc_info_length_follows_profile() {
        let mut raw = HeaderRaw::new_zeroed();
        raw.cd_info_len = U16::new(34);
        raw.dvd_info_len = U32::new(2052);

        raw.profile = U16::new(Profile::CdRw.as_u16());
        assert_eq!(Header::new(raw.clone()).disc_info_len(), 34);

        raw.profile = U16::new(Profile::DvdPlusR.as_u16());
        assert_eq!(Header::new(raw).disc_info_len(), 2052);
    }

    #[test]
    fn profile_round_trips_unknown_values() {
        assert_eq!(Profile::from_u16(0x0043), Profile::BdRe);
        assert_eq!(Profile::from_u16(0x1234), Profile::Unknown(0x1234));
        assert_eq!(Profile::Unknown(0x1234).as_u16(), 0x1234);
        assert!(Profile::DdcdR.is_cd());
        assert!(!Profile::DvdRom.is_cd());
    }
}
