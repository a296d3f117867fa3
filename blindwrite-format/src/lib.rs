//! A library for decoding BlindWrite 5/6/7 disc image descriptors.
//!
//! BlindWrite stores a captured disc as a descriptor (`.b5t`/`.b6t`) plus one
//! or more data files holding the raw sectors. This crate decodes the
//! descriptor: the fixed header, the optional structure blocks captured from
//! the drive, the data-file table and the session/track descriptors.
//!
//! Decoding never touches the filesystem. Every record keeps the fields whose
//! meaning is unknown, so [`Descriptor::to_bytes()`] reproduces the input
//! exactly.
//!
//! # Example
//!
//! ```no_run
//! use blindwrite_format::Descriptor;
//!
//! let bytes = std::fs::read("disc.b6t").unwrap();
//! let descriptor = Descriptor::read(&bytes).unwrap();
//!
//! println!("Profile: {}", descriptor.header().profile());
//!
//! for session in descriptor.sessions() {
//!     for track in session.tracks() {
//!         println!("Point {:02X}: {}", track.point(), track.kind());
//!     }
//! }
//! ```

use self::cursor::Cursor;
use self::datafile::{DataFileRecord, decode_utf16};
use self::header::{HEADER_SIZE, Header, HeaderRaw, Profile};
use self::session::SessionDescriptor;
use snafu::{Snafu, ensure};
use std::fmt;
use zerocopy::byteorder::little_endian::{U16, U32};

use read_error::*;

mod cursor;
pub mod datafile;
pub mod header;
pub mod session;

/// Trailer expected after the DPM block.
pub const FOOTER: &[u8; 16] = b"BWT5 STREAM FOOT";

/// Number of reserved bytes between the DPM block and the trailer.
const RESERVED_SIZE: usize = 4;

/// A decoded BlindWrite descriptor.
#[derive(Debug, Clone)]
#[must_use]
pub struct Descriptor {
    header: Header,
    mode2a: Vec<u8>,
    unknown_block: Vec<u8>,
    pma: Vec<u8>,
    atip: Vec<u8>,
    cdtext: Vec<u8>,
    bca: Vec<u8>,
    disc_info: Vec<u8>,
    dvd_struct: Vec<u8>,
    data_path_raw: Vec<u8>,
    data_path: String,
    data_files: Vec<DataFileRecord>,
    sessions: Vec<SessionDescriptor>,
    dpm: Vec<u8>,
    reserved: Vec<u8>,
    trailer: Vec<u8>,
    excess: Vec<u8>,
}

impl Descriptor {
    /// Decodes a descriptor from its bytes.
    ///
    /// A missing or mismatched trailer is logged and ignored; everything up to
    /// the end of the session table must be present.
    pub fn read(data: &[u8]) -> Result<Self, ReadError> {
        let mut cursor = Cursor::new(data);
        let raw: HeaderRaw = cursor.read("header")?;
        let header = Header::new(raw);

        ensure!(header.has_valid_signature(), InvalidSignatureSnafu);

        log::debug!(
            "Descriptor header: profile {}, {} session(s)",
            header.profile(),
            header.session_count()
        );

        let mut block = |len: usize, what: &'static str| -> Result<Vec<u8>, ReadError> {
            Ok(cursor.take(len, what)?.to_vec())
        };

        let mode2a = block(header.mode2a_len(), "mode page 2A")?;
        let unknown_block = block(header.unknown_block_len(), "unknown block")?;
        let pma = block(header.pma_len(), "PMA")?;
        let atip = block(header.atip_len(), "ATIP")?;
        let cdtext = block(header.cdtext_len(), "CD-TEXT")?;
        let bca = block(header.bca_len(), "BCA")?;
        let disc_info = block(header.disc_info_len(), "disc information")?;
        let dvd_struct = block(header.dvd_struct_len(), "DVD structure")?;

        // Data-file table.
        let count = cursor.read_u32("data file count")? as usize;
        let path_len = cursor.read_u32("data path length")? as usize;
        let data_path_raw = cursor.take(path_len, "data path")?.to_vec();
        let data_path = decode_utf16(&data_path_raw);
        let mut data_files =
            Vec::with_capacity(count.min(cursor.remaining() / datafile::DATA_FILE_FIXED_SIZE));

        for _ in 0..count {
            data_files.push(DataFileRecord::read(&mut cursor)?);
        }

        log::debug!(
            "{} data file(s) under {:?}",
            data_files.len(),
            data_path
        );

        // Sessions.
        let mut sessions = Vec::with_capacity(header.session_count() as usize);

        for _ in 0..header.session_count() {
            sessions.push(SessionDescriptor::read(&mut cursor)?);
        }

        // Tail is best-effort.
        let dpm = cursor.take_at_most(header.dpm_len()).to_vec();
        let reserved = cursor.take_at_most(RESERVED_SIZE).to_vec();
        let trailer = cursor.take_at_most(FOOTER.len()).to_vec();
        let excess = cursor.take_at_most(cursor.remaining()).to_vec();

        if trailer != FOOTER {
            log::warn!("Descriptor trailer is missing or not \"BWT5 STREAM FOOT\", continuing");
        } else if !excess.is_empty() {
            log::warn!("{} unexpected byte(s) after descriptor trailer", excess.len());
        }

        Ok(Self {
            header,
            mode2a,
            unknown_block,
            pma,
            atip,
            cdtext,
            bca,
            disc_info,
            dvd_struct,
            data_path_raw,
            data_path,
            data_files,
            sessions,
            dpm,
            reserved,
            trailer,
            excess,
        })
    }

    /// Encodes the descriptor back to bytes.
    ///
    /// For a descriptor produced by [`Descriptor::read()`] the output equals the input.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.dvd_struct.len() + self.dpm.len());

        out.extend_from_slice(self.header.as_bytes());

        for block in [
            &self.mode2a,
            &self.unknown_block,
            &self.pma,
            &self.atip,
            &self.cdtext,
            &self.bca,
            &self.disc_info,
            &self.dvd_struct,
        ] {
            out.extend_from_slice(block);
        }

        out.extend_from_slice(&(self.data_files.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.data_path_raw.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.data_path_raw);

        for file in &self.data_files {
            file.write_to(&mut out);
        }

        for session in &self.sessions {
            session.write_to(&mut out);
        }

        out.extend_from_slice(&self.dpm);
        out.extend_from_slice(&self.reserved);
        out.extend_from_slice(&self.trailer);
        out.extend_from_slice(&self.excess);
        out
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the mode page 2A (CD/DVD capabilities) block as captured.
    #[must_use]
    pub fn mode_page_2a(&self) -> Option<&[u8]> {
        non_empty(&self.mode2a)
    }

    #[must_use]
    pub fn unknown_block(&self) -> &[u8] {
        &self.unknown_block
    }

    #[must_use]
    pub fn pma(&self) -> Option<&[u8]> {
        non_empty(&self.pma)
    }

    #[must_use]
    pub fn atip(&self) -> Option<&[u8]> {
        non_empty(&self.atip)
    }

    #[must_use]
    pub fn cd_text(&self) -> Option<&[u8]> {
        non_empty(&self.cdtext)
    }

    #[must_use]
    pub fn bca(&self) -> Option<&[u8]> {
        non_empty(&self.bca)
    }

    #[must_use]
    pub fn disc_info(&self) -> Option<&[u8]> {
        non_empty(&self.disc_info)
    }

    /// Returns the DVD structure block that holds the DMI and PFI.
    #[must_use]
    pub fn dvd_structure(&self) -> Option<&[u8]> {
        non_empty(&self.dvd_struct)
    }

    /// Returns the directory the data files were written to at capture time.
    #[must_use]
    pub fn data_path(&self) -> &str {
        &self.data_path
    }

    pub fn data_files(&self) -> &[DataFileRecord] {
        &self.data_files
    }

    pub fn sessions(&self) -> &[SessionDescriptor] {
        &self.sessions
    }

    #[must_use]
    pub fn dpm(&self) -> Option<&[u8]> {
        non_empty(&self.dpm)
    }

    /// Returns `true` if the descriptor ends with the expected trailer.
    #[must_use]
    pub fn has_valid_trailer(&self) -> bool {
        self.trailer == FOOTER && self.excess.is_empty()
    }
}

fn non_empty(data: &[u8]) -> Option<&[u8]> {
    (!data.is_empty()).then_some(data)
}

/// Builder that composes a descriptor from parts.
///
/// Header lengths are derived from the supplied blocks.
#[derive(Debug, Clone)]
#[must_use]
pub struct DescriptorBuilder {
    profile: Profile,
    mcn: Option<String>,
    mode2a: Vec<u8>,
    pma: Vec<u8>,
    atip: Vec<u8>,
    cdtext: Vec<u8>,
    bca: Vec<u8>,
    disc_info: Vec<u8>,
    dvd_struct: Vec<u8>,
    data_path: String,
    data_files: Vec<DataFileRecord>,
    sessions: Vec<SessionDescriptor>,
}

impl DescriptorBuilder {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            mcn: None,
            mode2a: Vec::new(),
            pma: Vec::new(),
            atip: Vec::new(),
            cdtext: Vec::new(),
            bca: Vec::new(),
            disc_info: Vec::new(),
            dvd_struct: Vec::new(),
            data_path: String::new(),
            data_files: Vec::new(),
            sessions: Vec::new(),
        }
    }

    pub fn mcn(mut self, mcn: impl Into<String>) -> Self {
        self.mcn = Some(mcn.into());
        self
    }

    pub fn mode_page_2a(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.mode2a = data.into();
        self
    }

    pub fn pma(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.pma = data.into();
        self
    }

    pub fn atip(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.atip = data.into();
        self
    }

    pub fn cd_text(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.cdtext = data.into();
        self
    }

    pub fn bca(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.bca = data.into();
        self
    }

    pub fn disc_info(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.disc_info = data.into();
        self
    }

    pub fn dvd_structure(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.dvd_struct = data.into();
        self
    }

    pub fn data_path(mut self, path: impl Into<String>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn data_file(mut self, file: DataFileRecord) -> Self {
        self.data_files.push(file);
        self
    }

    pub fn session(mut self, session: SessionDescriptor) -> Self {
        self.sessions.push(session);
        self
    }

    pub fn build(self) -> Descriptor {
        use zerocopy::FromZeros;

        let mut raw = HeaderRaw::new_zeroed();
        raw.signature = *header::SIGNATURE;
        raw.profile = U16::new(self.profile.as_u16());
        raw.sessions = U16::new(self.sessions.len() as u16);

        if let Some(mcn) = &self.mcn {
            let len = mcn.len().min(raw.mcn.len());
            raw.mcn_is_valid = 1;
            raw.mcn[..len].copy_from_slice(&mcn.as_bytes()[..len]);
        }

        raw.mode2a_len = U32::new(self.mode2a.len() as u32);
        raw.pma_len = U16::new(self.pma.len() as u16);
        raw.atip_len = U16::new(self.atip.len() as u16);
        raw.cdtext_len = U16::new(self.cdtext.len() as u16);
        raw.bca_len = U32::new(self.bca.len() as u32);
        raw.dvd_struct_len = U32::new(self.dvd_struct.len() as u32);

        if self.profile.is_cd() || self.profile == Profile::None {
            raw.cd_info_len = U16::new(self.disc_info.len() as u16);
        } else {
            raw.dvd_info_len = U32::new(self.disc_info.len() as u32);
        }

        let data_path_raw: Vec<u8> = self
            .data_path
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();

        let mut data_len = 8 + data_path_raw.len();
        let mut buf = Vec::new();

        for file in &self.data_files {
            buf.clear();
            file.write_to(&mut buf);
            data_len += buf.len();
        }

        let mut sessions_len = 0;

        for session in &self.sessions {
            buf.clear();
            session.write_to(&mut buf);
            sessions_len += buf.len();
        }

        raw.data_len = U32::new(data_len as u32);
        raw.sessions_len = U32::new(sessions_len as u32);

        Descriptor {
            header: Header::new(raw),
            mode2a: self.mode2a,
            unknown_block: Vec::new(),
            pma: self.pma,
            atip: self.atip,
            cdtext: self.cdtext,
            bca: self.bca,
            disc_info: self.disc_info,
            dvd_struct: self.dvd_struct,
            data_path_raw,
            data_path: self.data_path,
            data_files: self.data_files,
            sessions: self.sessions,
            dpm: Vec::new(),
            reserved: vec![0; RESERVED_SIZE],
            trailer: FOOTER.to_vec(),
            excess: Vec::new(),
        }
    }
}

/// Error category shared by every BlindWrite error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Input shorter than a fixed record requires.
    TruncatedInput,
    /// Subchannel interleave width other than 0, 16 or 96 bytes.
    UnsupportedSubchannelSize,
    /// No backing file could be resolved.
    NoSuchFile,
    /// Tag or track type combination that cannot be served.
    NotSupported,
    /// Sector span exceeds the track bounds.
    OutOfRange,
    /// Address or track id maps to no track.
    SectorNotFound,
    /// Requested tag or flag was never captured.
    NoData,
    /// Backing file I/O failed.
    Io,
    /// Input is not a BlindWrite descriptor.
    InvalidFormat,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TruncatedInput => "truncated input",
            Self::UnsupportedSubchannelSize => "unsupported subchannel size",
            Self::NoSuchFile => "no such file",
            Self::NotSupported => "not supported",
            Self::OutOfRange => "out of range",
            Self::SectorNotFound => "sector not found",
            Self::NoData => "no data",
            Self::Io => "I/O error",
            Self::InvalidFormat => "invalid format",
        };

        f.write_str(name)
    }
}

/// Represents an error when [`Descriptor::read()`] fails.
#[derive(Debug, Snafu)]
#[snafu(module)]
#[non_exhaustive]
pub enum ReadError {
    #[snafu(display(
        "{what} at offset {offset:#x} needs {needed} byte(s) but only {available} remain"
    ))]
    Truncated {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[snafu(display("invalid descriptor signature"))]
    InvalidSignature,
}

impl ReadError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Truncated { .. } => ErrorKind::TruncatedInput,
            Self::InvalidSignature => ErrorKind::InvalidFormat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datafile::DataFileBuilder;
    use crate::session::{SubchannelMode, TrackDescriptorBuilder, TrackType};

    fn sample() -> Descriptor {
        let tracks = vec![
            TrackDescriptorBuilder::new(TrackType::NotData, 0xA0).build(),
            TrackDescriptorBuilder::new(TrackType::Mode1, 1)
                .pregap(150)
                .start_lba(-150)
                .sectors(1150)
                .subchannel(SubchannelMode::Packed)
                .build(),
            TrackDescriptorBuilder::new(TrackType::Audio, 2)
                .start_lba(1000)
                .sectors(500)
                .build(),
        ];

        DescriptorBuilder::new(Profile::CdR)
            .mcn("0123456789012")
            .pma(vec![0x11; 22])
            .atip(vec![0x22; 24])
            .data_path("C:\\Images\\")
            .data_file(
                DataFileBuilder::new("disc.b5i")
                    .length(1650 * 2448)
                    .start_lba(-150)
                    .sectors(1650)
                    .build(),
            )
            .session(SessionDescriptor::new(1, -150, 1499, 1, 2, tracks))
            .build()
    }

    #[test]
    fn reencodes_byte_for_byte() {
        let bytes = sample().to_bytes();
        let parsed = Descriptor::read(&bytes).unwrap();

        assert!(parsed.has_valid_trailer());
        assert_eq!(parsed.to_bytes(), bytes);
        assert_eq!(parsed.data_path(), "C:\\Images\\");
        assert_eq!(parsed.data_files().len(), 1);
        assert_eq!(parsed.sessions()[0].tracks().len(), 3);
        assert_eq!(parsed.header().mcn().as_deref(), Some("0123456789012"));
        assert_eq!(parsed.pma().map(<[u8]>::len), Some(22));
        assert_eq!(parsed.bca(), None);
    }

    #[test]
    fn mismatched_trailer_is_not_fatal() {
        let mut bytes = sample().to_bytes();
        let len = bytes.len();
        bytes[len - 1] = b'X';
        bytes.extend_from_slice(b"junk");

        let parsed = Descriptor::read(&bytes).unwrap();

        assert!(!parsed.has_valid_trailer());
        assert_eq!(parsed.sessions().len(), 1);
        assert_eq!(parsed.to_bytes(), bytes);
    }

    #[test]
    fn missing_tail_is_not_fatal() {
        let bytes = sample().to_bytes();
        let cut = &bytes[..bytes.len() - FOOTER.len() - RESERVED_SIZE];
        let parsed = Descriptor::read(cut).unwrap();

        assert!(!parsed.has_valid_trailer());
        assert_eq!(parsed.to_bytes(), cut);
    }

    #[test]
    fn truncated_session_table_fails() {
        let bytes = sample().to_bytes();
        let cut = &bytes[..bytes.len() - FOOTER.len() - RESERVED_SIZE - 10];
        let err = Descriptor::read(cut).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TruncatedInput);
    }

    #[test]
    fn rejects_foreign_signature() {
        let mut bytes = sample().to_bytes();
        bytes[..4].copy_from_slice(b"MThd");

        let err = Descriptor::read(&bytes).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }
}
