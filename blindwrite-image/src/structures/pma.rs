use super::response_len;

/// Size of one PMA descriptor.
pub const ENTRY_SIZE: usize = 11;

/// Decoded Program Memory Area of a recordable CD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pma {
    entries: Vec<[u8; ENTRY_SIZE]>,
}

impl Pma {
    /// Decodes a READ TOC/PMA/ATIP response (format 3), header included.
    #[must_use]
    pub fn decode(response: &[u8]) -> Option<Self> {
        let len = response_len(response)?;

        if len % ENTRY_SIZE != 0 {
            return None;
        }

        let entries = response[4..4 + len]
            .chunks_exact(ENTRY_SIZE)
            .map(|c| {
                let mut entry = [0u8; ENTRY_SIZE];
                entry.copy_from_slice(c);
                entry
            })
            .collect();

        Some(Self { entries })
    }

    /// Returns the raw 11-byte descriptors.
    pub fn entries(&self) -> &[[u8; ENTRY_SIZE]] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::with_response_header;

    #[test]
    fn decodes_whole_entries() {
        let pma = Pma::decode(&with_response_header(&[0x11; 22])).unwrap();
        assert_eq!(pma.entries().len(), 2);
    }

    #[test]
    fn rejects_partial_entries() {
        assert!(Pma::decode(&with_response_header(&[0x11; 21])).is_none());
        assert!(Pma::decode(&[0, 30, 0, 0]).is_none());
    }
}
