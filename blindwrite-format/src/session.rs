use crate::ReadError;
use crate::cursor::Cursor;
use std::fmt;
use zerocopy::{
    FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::little_endian::{I32, U16, U32},
};

/// Session header (16 bytes).
#[derive(Debug, Clone, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct SessionRaw {
    pub sequence: U16,    // 0x00
    pub entries: u8,      // 0x02
    pub unknown: u8,      // 0x03
    pub start: I32,       // 0x04
    pub end: I32,         // 0x08
    pub first_track: U16, // 0x0C
    pub last_track: U16,  // 0x0E
}

/// Track descriptor part shared by every track type (64 bytes).
#[derive(Debug, Clone, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct TrackDescriptorRaw {
    pub kind: u8,           // 0x00
    pub unknown1: u8,       // 0x01
    pub unknown2: U32,      // 0x02
    pub subchannel: u8,     // 0x06
    pub unknown3: u8,       // 0x07
    pub ctl: u8,            // 0x08
    pub adr: u8,            // 0x09
    pub point: u8,          // 0x0A
    pub tno: u8,            // 0x0B
    pub min: u8,            // 0x0C
    pub sec: u8,            // 0x0D
    pub frame: u8,          // 0x0E
    pub zero: u8,           // 0x0F
    pub pmin: u8,           // 0x10
    pub psec: u8,           // 0x11
    pub pframe: u8,         // 0x12
    pub unknown5: u8,       // 0x13
    pub pregap: U32,        // 0x14
    pub unknown6: [U32; 4], // 0x18
    pub start_lba: I32,     // 0x28
    pub sectors: U32,       // 0x2C
    pub unknown7: [U32; 2], // 0x30
    pub session: U32,       // 0x38
    pub unknown8: U32,      // 0x3C
}

/// Extra bytes carried only by CD track descriptors.
pub type TrackDescriptorTail = [U32; 2];

pub const SESSION_HEADER_SIZE: usize = size_of::<SessionRaw>();
pub const TRACK_DESCRIPTOR_SIZE: usize = size_of::<TrackDescriptorRaw>();

/// Lowest `point` value used by lead-in/lead-out pseudo entries.
pub const FIRST_PSEUDO_POINT: u8 = 0xA0;

/// Content type of a track descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackType {
    NotData,
    Audio,
    Mode1,
    Mode2,
    Mode2Form1,
    Mode2Form2,
    Dvd,

    /// Unrecognized type value.
    Unknown(u8),
}

impl TrackType {
    #[must_use]
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::NotData,
            1 => Self::Audio,
            2 => Self::Mode1,
            3 => Self::Mode2,
            4 => Self::Mode2Form1,
            5 => Self::Mode2Form2,
            6 => Self::Dvd,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::NotData => 0,
            Self::Audio => 1,
            Self::Mode1 => 2,
            Self::Mode2 => 3,
            Self::Mode2Form1 => 4,
            Self::Mode2Form2 => 5,
            Self::Dvd => 6,
            Self::Unknown(raw) => raw,
        }
    }

    /// Returns `true` if descriptors of this type carry the 8-byte CD tail.
    #[must_use]
    pub const fn has_tail(self) -> bool {
        !matches!(self, Self::Dvd | Self::NotData)
    }

    /// Returns `true` for the three Mode 2 variants.
    #[must_use]
    pub const fn is_mode2(self) -> bool {
        matches!(self, Self::Mode2 | Self::Mode2Form1 | Self::Mode2Form2)
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotData => f.write_str("not data"),
            Self::Audio => f.write_str("audio"),
            Self::Mode1 => f.write_str("mode 1"),
            Self::Mode2 => f.write_str("mode 2"),
            Self::Mode2Form1 => f.write_str("mode 2 form 1"),
            Self::Mode2Form2 => f.write_str("mode 2 form 2"),
            Self::Dvd => f.write_str("DVD"),
            Self::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

/// Subchannel storage declared by a track descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubchannelMode {
    None,
    Q16,
    Packed,

    /// Unrecognized subchannel value.
    Unknown(u8),
}

impl SubchannelMode {
    #[must_use]
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::None,
            2 => Self::Q16,
            4 => Self::Packed,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Q16 => 2,
            Self::Packed => 4,
            Self::Unknown(raw) => raw,
        }
    }
}

/// One entry of a session's track list.
///
/// Entries whose `point` is 0xA0 or above are lead-in/lead-out markers that
/// only contribute to the TOC.
#[derive(Debug, Clone)]
#[must_use]
pub struct TrackDescriptor {
    raw: TrackDescriptorRaw,
    tail: Option<TrackDescriptorTail>,
}

impl TrackDescriptor {
    pub(crate) fn read(cursor: &mut Cursor<'_>) -> Result<Self, ReadError> {
        let raw: TrackDescriptorRaw = cursor.read("track descriptor")?;

        // The type byte decides whether the CD-only tail follows.
        let tail = if TrackType::from_u8(raw.kind).has_tail() {
            Some(cursor.read::<TrackDescriptorTail>("track descriptor tail")?)
        } else {
            None
        };

        Ok(Self { raw, tail })
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.raw.as_bytes());

        if let Some(tail) = &self.tail {
            out.extend_from_slice(tail.as_bytes());
        }
    }

    /// Returns the encoded size of this descriptor (64 or 72 bytes).
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        TRACK_DESCRIPTOR_SIZE + self.tail.map_or(0, |t| t.as_bytes().len())
    }

    #[must_use]
    pub fn kind(&self) -> TrackType {
        TrackType::from_u8(self.raw.kind)
    }

    #[must_use]
    pub fn subchannel(&self) -> SubchannelMode {
        SubchannelMode::from_u8(self.raw.subchannel)
    }

    #[must_use]
    pub fn ctl(&self) -> u8 {
        self.raw.ctl
    }

    #[must_use]
    pub fn adr(&self) -> u8 {
        self.raw.adr
    }

    /// Returns the TOC point, which is the track number for real tracks.
    #[must_use]
    pub fn point(&self) -> u8 {
        self.raw.point
    }

    #[must_use]
    pub fn tno(&self) -> u8 {
        self.raw.tno
    }

    /// Returns `true` for lead-in/lead-out markers (point 0xA0 and above).
    #[must_use]
    pub fn is_pseudo(&self) -> bool {
        self.raw.point >= FIRST_PSEUDO_POINT
    }

    #[must_use]
    pub fn pregap(&self) -> u32 {
        self.raw.pregap.get()
    }

    /// Returns the LBA where the track (including its pregap) starts.
    #[must_use]
    pub fn start_lba(&self) -> i32 {
        self.raw.start_lba.get()
    }

    #[must_use]
    pub fn sectors(&self) -> u32 {
        self.raw.sectors.get()
    }

    #[must_use]
    pub fn session(&self) -> u32 {
        self.raw.session.get()
    }

    /// Returns the Red Book full-TOC descriptor for this entry.
    ///
    /// Layout: session, ADR/CTL, TNO, POINT, MIN, SEC, FRAME, ZERO, PMIN, PSEC, PFRAME.
    #[must_use]
    pub fn toc_entry(&self) -> [u8; 11] {
        let r = &self.raw;

        [
            r.session.get() as u8,
            ((r.adr & 0x0F) << 4) | (r.ctl & 0x0F),
            r.tno,
            r.point,
            r.min,
            r.sec,
            r.frame,
            r.zero,
            r.pmin,
            r.psec,
            r.pframe,
        ]
    }

    #[must_use]
    pub const fn raw(&self) -> &TrackDescriptorRaw {
        &self.raw
    }

    #[must_use]
    pub fn tail(&self) -> Option<&TrackDescriptorTail> {
        self.tail.as_ref()
    }
}

/// A session header together with its track descriptors.
#[derive(Debug, Clone)]
#[must_use]
pub struct SessionDescriptor {
    raw: SessionRaw,
    tracks: Vec<TrackDescriptor>,
}

impl SessionDescriptor {
    pub(crate) fn read(cursor: &mut Cursor<'_>) -> Result<Self, ReadError> {
        let raw: SessionRaw = cursor.read("session descriptor")?;
        let mut tracks = Vec::with_capacity(raw.entries as usize);

        for _ in 0..raw.entries {
            tracks.push(TrackDescriptor::read(cursor)?);
        }

        Ok(Self { raw, tracks })
    }

    /// Creates a session from its fields; the entry count follows `tracks`.
    pub fn new(
        sequence: u16,
        start: i32,
        end: i32,
        first_track: u16,
        last_track: u16,
        tracks: Vec<TrackDescriptor>,
    ) -> Self {
        let mut raw = SessionRaw::new_zeroed();
        raw.sequence = U16::new(sequence);
        raw.entries = tracks.len() as u8;
        raw.start = I32::new(start);
        raw.end = I32::new(end);
        raw.first_track = U16::new(first_track);
        raw.last_track = U16::new(last_track);

        Self { raw, tracks }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.raw.as_bytes());

        for track in &self.tracks {
            track.write_to(out);
        }
    }

    #[must_use]
    pub fn sequence(&self) -> u16 {
        self.raw.sequence.get()
    }

    /// Returns the first sector of the session; may be negative on disk.
    #[must_use]
    pub fn start(&self) -> i32 {
        self.raw.start.get()
    }

    #[must_use]
    pub fn end(&self) -> i32 {
        self.raw.end.get()
    }

    #[must_use]
    pub fn first_track(&self) -> u16 {
        self.raw.first_track.get()
    }

    #[must_use]
    pub fn last_track(&self) -> u16 {
        self.raw.last_track.get()
    }

    /// Returns `true` if `track` lies in `[first_track, last_track]`.
    #[must_use]
    pub fn contains_track(&self, track: u16) -> bool {
        (self.first_track()..=self.last_track()).contains(&track)
    }

    pub fn tracks(&self) -> &[TrackDescriptor] {
        &self.tracks
    }

    #[must_use]
    pub const fn raw(&self) -> &SessionRaw {
        &self.raw
    }
}

/// Builder for track descriptors.
#[derive(Debug, Clone)]
#[must_use]
pub struct TrackDescriptorBuilder {
    raw: TrackDescriptorRaw,
}

impl TrackDescriptorBuilder {
    pub fn new(kind: TrackType, point: u8) -> Self {
        let mut raw = TrackDescriptorRaw::new_zeroed();
        raw.kind = kind.as_u8();
        raw.point = point;
        raw.adr = 1;
        raw.session = U32::new(1);
        raw.ctl = match kind {
            TrackType::Audio => 0,
            _ => 4,
        };

        Self { raw }
    }

    pub fn subchannel(mut self, mode: SubchannelMode) -> Self {
        self.raw.subchannel = mode.as_u8();
        self
    }

    pub fn ctl(mut self, ctl: u8) -> Self {
        self.raw.ctl = ctl;
        self
    }

    pub fn adr(mut self, adr: u8) -> Self {
        self.raw.adr = adr;
        self
    }

    pub fn session(mut self, session: u32) -> Self {
        self.raw.session = U32::new(session);
        self
    }

    pub fn pregap(mut self, pregap: u32) -> Self {
        self.raw.pregap = U32::new(pregap);
        self
    }

    pub fn start_lba(mut self, lba: i32) -> Self {
        self.raw.start_lba = I32::new(lba);
        self
    }

    pub fn sectors(mut self, sectors: u32) -> Self {
        self.raw.sectors = U32::new(sectors);
        self
    }

    /// Sets the PMIN/PSEC/PFRAME start address.
    pub fn pmsf(mut self, min: u8, sec: u8, frame: u8) -> Self {
        self.raw.pmin = min;
        self.raw.psec = sec;
        self.raw.pframe = frame;
        self
    }

    pub fn build(self) -> TrackDescriptor {
        let tail = TrackType::from_u8(self.raw.kind)
            .has_tail()
            .then(TrackDescriptorTail::new_zeroed);

        TrackDescriptor {
            raw: self.raw,
            tail,
        }
    }
}
