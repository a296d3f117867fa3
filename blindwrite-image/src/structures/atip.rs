use super::response_len;

/// Payload bytes needed to reach the lead-out field.
const MIN_PAYLOAD: usize = 12;

/// Decoded Absolute Time In Pregap of a recordable CD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atip {
    /// `true` for rewritable media.
    pub rewritable: bool,
    pub disc_sub_type: u8,
    pub lead_in_start: (u8, u8, u8),
    pub lead_out_start: (u8, u8, u8),
}

impl Atip {
    /// Decodes a READ TOC/PMA/ATIP response (format 4), header included.
    #[must_use]
    pub fn decode(response: &[u8]) -> Option<Self> {
        let len = response_len(response)?;

        if len < MIN_PAYLOAD {
            return None;
        }

        let r = response;

        Some(Self {
            rewritable: r[6] & 0x40 != 0,
            disc_sub_type: (r[6] >> 3) & 0x07,
            lead_in_start: (r[8], r[9], r[10]),
            lead_out_start: (r[12], r[13], r[14]),
        })
    }

    /// Returns the media manufacturer encoded in the lead-in start time.
    #[must_use]
    pub fn manufacturer(&self) -> Option<&'static str> {
        let (min, sec, frame) = self.lead_in_start;
        manufacturer(min, sec, frame)
    }
}

/// Looks up a media manufacturer from a lead-in start time.
///
/// Only lead-ins starting at minute 97 carry a manufacturer code, and the
/// last digit of the frame is ignored.
#[must_use]
pub fn manufacturer(min: u8, sec: u8, frame: u8) -> Option<&'static str> {
    if min != 97 {
        return None;
    }

    let name = match (sec, frame - frame % 10) {
        (24, 0) => "Taiyo Yuden",
        (15, 10) => "Ritek",
        (26, 60) => "CMC Magnetics",
        (34, 20) => "Mitsubishi Chemical",
        (31, 0) => "Ritek",
        _ => return None,
    };

    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::with_response_header;

    fn payload(disc_type: u8, lead_in: [u8; 3]) -> Vec<u8> {
        let mut p = vec![0u8; 24];
        p[2] = disc_type;
        p[4..7].copy_from_slice(&lead_in);
        p[8..11].copy_from_slice(&[79, 59, 74]);
        p
    }

    #[test]
    fn decodes_disc_type_and_times() {
        let atip = Atip::decode(&with_response_header(&payload(0x40, [97, 24, 3]))).unwrap();

        assert!(atip.rewritable);
        assert_eq!(atip.lead_in_start, (97, 24, 3));
        assert_eq!(atip.lead_out_start, (79, 59, 74));
        assert_eq!(atip.manufacturer(), Some("Taiyo Yuden"));
    }

    #[test]
    fn manufacturer_requires_minute_97() {
        assert_eq!(manufacturer(97, 26, 65), Some("CMC Magnetics"));
        assert_eq!(manufacturer(96, 26, 65), None);
        assert_eq!(manufacturer(97, 1, 0), None);
    }

    #[test]
    fn short_response_is_rejected() {
        assert!(Atip::decode(&with_response_header(&[0; 8])).is_none());
    }
}
