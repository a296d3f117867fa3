use std::fmt;

/// Size of a READ DVD STRUCTURE response carrying one structure.
pub const RESPONSE_SIZE: usize = 2052;

/// Disc category from the book type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscCategory {
    DvdRom,
    DvdRam,
    DvdR,
    DvdRw,
    HdDvdRom,
    HdDvdRam,
    HdDvdR,
    DvdPlusRw,
    DvdPlusR,
    DvdPlusRwDl,
    DvdPlusRDl,
    Nintendo,
    Unknown(u8),
}

impl DiscCategory {
    #[must_use]
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::DvdRom,
            1 => Self::DvdRam,
            2 => Self::DvdR,
            3 => Self::DvdRw,
            4 => Self::HdDvdRom,
            5 => Self::HdDvdRam,
            6 => Self::HdDvdR,
            9 => Self::DvdPlusRw,
            10 => Self::DvdPlusR,
            13 => Self::DvdPlusRwDl,
            14 => Self::DvdPlusRDl,
            15 => Self::Nintendo,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for DiscCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DvdRom => f.write_str("DVD-ROM"),
            Self::DvdRam => f.write_str("DVD-RAM"),
            Self::DvdR => f.write_str("DVD-R"),
            Self::DvdRw => f.write_str("DVD-RW"),
            Self::HdDvdRom => f.write_str("HD DVD-ROM"),
            Self::HdDvdRam => f.write_str("HD DVD-RAM"),
            Self::HdDvdR => f.write_str("HD DVD-R"),
            Self::DvdPlusRw => f.write_str("DVD+RW"),
            Self::DvdPlusR => f.write_str("DVD+R"),
            Self::DvdPlusRwDl => f.write_str("DVD+RW DL"),
            Self::DvdPlusRDl => f.write_str("DVD+R DL"),
            Self::Nintendo => f.write_str("Nintendo"),
            Self::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

/// Nominal disc diameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscSize {
    Cm120,
    Cm80,
    Unknown(u8),
}

/// Decoded Physical Format Information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pfi {
    pub category: DiscCategory,
    pub part_version: u8,
    pub disc_size: DiscSize,
    pub max_rate: u8,
    /// Number of recorded layers, at least 1.
    pub layers: u8,
    pub opposite_track_path: bool,
    pub layer_type: u8,
}

impl Pfi {
    /// Decodes a READ DVD STRUCTURE response (format 0), header included.
    #[must_use]
    pub fn decode(response: &[u8]) -> Option<Self> {
        if response.len() != RESPONSE_SIZE {
            return None;
        }

        let r = &response[4..];

        Some(Self {
            category: DiscCategory::from_u8(r[0] >> 4),
            part_version: r[0] & 0x0F,
            disc_size: match r[1] >> 4 {
                0 => DiscSize::Cm120,
                1 => DiscSize::Cm80,
                other => DiscSize::Unknown(other),
            },
            max_rate: r[1] & 0x0F,
            layers: ((r[2] >> 5) & 0x03) + 1,
            opposite_track_path: r[2] & 0x10 != 0,
            layer_type: r[2] & 0x0F,
        })
    }
}

/// Wraps a 2048-byte structure into a READ DVD STRUCTURE response.
#[must_use]
pub fn response(structure: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(RESPONSE_SIZE);
    out.extend_from_slice(&[0x08, 0x02, 0x00, 0x00]);
    out.extend_from_slice(structure);
    out
}
