use crate::ReadError;
use crate::cursor::Cursor;
use zerocopy::{
    FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::little_endian::{I32, U32},
};

/// Fixed part of a data-file record preceding the filename (48 bytes).
#[derive(Debug, Clone, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct DataFileRaw {
    pub kind: U32,          // 0x00
    pub length: U32,        // 0x04
    pub unknown1: [U32; 2], // 0x08
    pub offset: U32,        // 0x10
    pub unknown2: [U32; 4], // 0x14
    pub start_lba: I32,     // 0x24
    pub sectors: U32,       // 0x28
    pub filename_len: U32,  // 0x2C
}

/// Bytes of a record that are not part of the filename.
pub const DATA_FILE_FIXED_SIZE: usize = size_of::<DataFileRaw>() + 4;

/// One physical backing file listed by the descriptor.
#[derive(Debug, Clone)]
#[must_use]
pub struct DataFileRecord {
    raw: DataFileRaw,
    filename_raw: Vec<u8>,
    filename: String,
    unknown3: u32,
}

impl DataFileRecord {
    pub(crate) fn read(cursor: &mut Cursor<'_>) -> Result<Self, ReadError> {
        let raw: DataFileRaw = cursor.read("data file record")?;
        let filename_raw = cursor
            .take(raw.filename_len.get() as usize, "data file name")?
            .to_vec();
        let unknown3 = cursor.read_u32("data file record trailer")?;
        let filename = decode_utf16(&filename_raw);

        Ok(Self {
            raw,
            filename_raw,
            filename,
            unknown3,
        })
    }

    /// Appends the on-disk representation of this record to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.raw.as_bytes());
        out.extend_from_slice(&self.filename_raw);
        out.extend_from_slice(&self.unknown3.to_le_bytes());
    }

    /// Returns the record type tag.
    #[must_use]
    pub fn kind(&self) -> u32 {
        self.raw.kind.get()
    }

    /// Returns the byte length of the backing file.
    #[must_use]
    pub fn length(&self) -> u64 {
        self.raw.length.get() as u64
    }

    /// Returns the byte offset of the first sector inside the backing file.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.raw.offset.get() as u64
    }

    /// Returns the LBA of the first sector stored in the file.
    ///
    /// Negative values address the pregap before track zero.
    #[must_use]
    pub fn start_lba(&self) -> i32 {
        self.raw.start_lba.get()
    }

    #[must_use]
    pub fn sectors(&self) -> u32 {
        self.raw.sectors.get()
    }

    /// Returns the stored filename, which may carry a Windows directory prefix.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the filename without any directory prefix.
    #[must_use]
    pub fn base_filename(&self) -> &str {
        self.filename
            .rsplit(['\\', '/'])
            .next()
            .unwrap_or(&self.filename)
    }

    #[must_use]
    pub const fn raw(&self) -> &DataFileRaw {
        &self.raw
    }

    #[must_use]
    pub fn unknown3(&self) -> u32 {
        self.unknown3
    }
}

/// Decodes a UTF-16LE string, stopping at the first NUL.
pub(crate) fn decode_utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();

    String::from_utf16_lossy(&units)
}

/// Builder for data-file records, used when composing descriptors by hand.
#[derive(Debug, Clone)]
#[must_use]
pub struct DataFileBuilder {
    raw: DataFileRaw,
    filename: String,
}

impl DataFileBuilder {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            raw: DataFileRaw::new_zeroed(),
            filename: filename.into(),
        }
    }

    pub fn kind(mut self, kind: u32) -> Self {
        self.raw.kind = U32::new(kind);
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.raw.length = U32::new(length);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.raw.offset = U32::new(offset);
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

    pub fn build(self) -> DataFileRecord {
        let filename_raw: Vec<u8> = self
            .filename
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();

        let mut raw = self.raw;
        raw.filename_len = U32::new(filename_raw.len() as u32);

        DataFileRecord {
            raw,
            filename_raw,
            filename: self.filename,
            unknown3: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_52_bytes_plus_name() {
        let record = DataFileBuilder::new("disc.b5i")
            .length(2352 * 10)
            .start_lba(-150)
            .sectors(10)
            .build();

        let mut out = Vec::new();
        record.write_to(&mut out);

        assert_eq!(out.len(), DATA_FILE_FIXED_SIZE + 16);
        assert_eq!(&out[0x24..0x28], &(-150i32).to_le_bytes());
    }

    #[test]
    fn decodes_utf16_filename() {
        let record = DataFileBuilder::new("C:\\Images\\Ünïcode.b6i")
            .sectors(1)
            .build();
        let mut out = Vec::new();
        record.write_to(&mut out);

        let mut cursor = Cursor::new(&out);
        let parsed = DataFileRecord::read(&mut cursor).unwrap();

        assert_eq!(parsed.filename(), "C:\\Images\\Ünïcode.b6i");
        assert_eq!(parsed.base_filename(), "Ünïcode.b6i");
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn keeps_negative_start_lba() {
        let record = DataFileBuilder::new("x.b5i")
            .start_lba(-150)
            .sectors(300)
            .build();

        assert_eq!(record.start_lba(), -150);
        assert_eq!(record.sectors(), 300);
    }
}
