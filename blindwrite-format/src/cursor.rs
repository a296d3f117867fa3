use crate::{ReadError, TruncatedSnafu};
use zerocopy::FromBytes;

/// Forward-only reader over a descriptor buffer.
///
/// Every read is bounds-checked against the remaining input and reports the
/// record being decoded when the buffer is too short.
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns the next `len` bytes and advances past them.
    pub fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], ReadError> {
        let available = self.remaining();

        snafu::ensure!(
            len <= available,
            TruncatedSnafu {
                what,
                offset: self.pos,
                needed: len,
                available,
            }
        );

        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;

        Ok(bytes)
    }

    /// Returns up to `len` bytes, stopping early at the end of the input.
    pub fn take_at_most(&mut self, len: usize) -> &'a [u8] {
        let n = len.min(self.remaining());
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        bytes
    }

    /// Decodes a fixed-size little-endian record.
    pub fn read<T: FromBytes>(&mut self, what: &'static str) -> Result<T, ReadError> {
        let offset = self.pos;
        let bytes = self.take(size_of::<T>(), what)?;

        T::read_from_bytes(bytes).map_err(|_| {
            TruncatedSnafu {
                what,
                offset,
                needed: size_of::<T>(),
                available: bytes.len(),
            }
            .build()
        })
    }

    pub fn read_u32(&mut self, what: &'static str) -> Result<u32, ReadError> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use zerocopy::little_endian::U32;

    #[test]
    fn reads_advance_position() {
        let data = [1, 0, 0, 0, 2, 0, 0, 0, 0xAA];
        let mut cursor = Cursor::new(&data);

        assert_eq!(cursor.read_u32("first").unwrap(), 1);
        assert_eq!(cursor.read::<U32>("second").unwrap().get(), 2);
        assert_eq!(cursor.position(), 8);
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn short_input_is_truncated() {
        let data = [1, 2, 3];
        let mut cursor = Cursor::new(&data);
        let err = cursor.read_u32("word").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TruncatedInput);
        assert!(err.to_string().contains("word"));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn take_at_most_stops_at_end() {
        let data = [1, 2, 3];
        let mut cursor = Cursor::new(&data);

        assert_eq!(cursor.take_at_most(2), &[1, 2]);
        assert_eq!(cursor.take_at_most(16), &[3]);
        assert!(cursor.take_at_most(4).is_empty());
    }
}
