/// Page code of the CD/DVD capabilities and mechanical status page.
pub const PAGE_CODE: u8 = 0x2A;

/// Minimum length of a usable page.
const MIN_LEN: usize = 16;

/// Decoded mode page 2A (CD/DVD capabilities and mechanical status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModePage2A {
    pub saveable: bool,
    pub reads_cd_r: bool,
    pub reads_cd_rw: bool,
    pub reads_dvd_rom: bool,
    pub reads_dvd_r: bool,
    pub reads_dvd_ram: bool,
    pub writes_cd_r: bool,
    pub writes_cd_rw: bool,
    pub test_write: bool,
    pub writes_dvd_r: bool,
    pub writes_dvd_ram: bool,
    pub audio_play: bool,
    pub composite: bool,
    pub reads_subchannel: bool,
    pub reads_cd_da: bool,
    pub loading_mechanism: u8,
    pub max_read_speed: u16,
    pub buffer_size: u16,
}

impl ModePage2A {
    /// Decodes a page starting at its page-code byte.
    #[must_use]
    pub fn decode(page: &[u8]) -> Option<Self> {
        if page.len() < MIN_LEN
            || page[0] & 0x3F != PAGE_CODE
            || page[1] as usize + 2 != page.len()
        {
            return None;
        }

        Some(Self {
            saveable: page[0] & 0x80 != 0,
            reads_cd_r: page[2] & 0x01 != 0,
            reads_cd_rw: page[2] & 0x02 != 0,
            reads_dvd_rom: page[2] & 0x08 != 0,
            reads_dvd_r: page[2] & 0x10 != 0,
            reads_dvd_ram: page[2] & 0x20 != 0,
            writes_cd_r: page[3] & 0x01 != 0,
            writes_cd_rw: page[3] & 0x02 != 0,
            test_write: page[3] & 0x04 != 0,
            writes_dvd_r: page[3] & 0x10 != 0,
            writes_dvd_ram: page[3] & 0x20 != 0,
            audio_play: page[4] & 0x01 != 0,
            composite: page[4] & 0x02 != 0,
            reads_subchannel: page[5] & 0x04 != 0,
            reads_cd_da: page[5] & 0x01 != 0,
            loading_mechanism: page[6] >> 5,
            max_read_speed: u16::from_be_bytes([page[8], page[9]]),
            buffer_size: u16::from_be_bytes([page[12], page[13]]),
        })
    }
}

/// Repairs a page as stored by the capture tool and decodes it.
///
/// The stored page length is two bytes too large. Returns the repaired page
/// with its decoded form, or `None` when the result is still invalid.
#[must_use]
pub fn repair(stored: &[u8]) -> Option<(Vec<u8>, ModePage2A)> {
    let mut page = stored.to_vec();
    let len = page.get_mut(1)?;
    *len = len.wrapping_sub(2);

    let decoded = ModePage2A::decode(&page)?;
    Some((page, decoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_page() -> Vec<u8> {
        let mut page = vec![0u8; 20];
        page[0] = 0x2A;
        page[1] = 20;
        page[2] = 0x3B;
        page[3] = 0x01;
        page[8..10].copy_from_slice(&7056u16.to_be_bytes());
        page
    }

    #[test]
    fn repairs_stored_length() {
        let (page, decoded) = repair(&stored_page()).unwrap();

        assert_eq!(page[1], 18);
        assert!(decoded.reads_cd_rw);
        assert!(decoded.reads_dvd_ram);
        assert!(decoded.reads_dvd_r);
        assert!(decoded.writes_cd_r);
        assert_eq!(decoded.max_read_speed, 7056);
    }

    #[test]
    fn rejects_wrong_code_or_length() {
        let mut page = stored_page();
        page[0] = 0x2B;
        assert!(repair(&page).is_none());

        let mut page = stored_page();
        page[1] = 18;
        assert!(repair(&page).is_none());

        assert!(repair(&[0x2A]).is_none());
        assert!(repair(&[]).is_none());
    }
}
