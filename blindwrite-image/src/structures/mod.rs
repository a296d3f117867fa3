//! Decoders for the drive structures stored in a descriptor.
//!
//! Each decoder is a pure function that returns `None` when the bytes do not
//! form a valid structure. Callers treat a rejected block as absent.

pub mod atip;
pub mod dmi;
pub mod mode_page;
pub mod pfi;
pub mod pma;

/// Prepends the 4-byte header of a READ TOC/PMA/ATIP response to `payload`.
///
/// The length field counts the payload plus the two reserved bytes.
#[must_use]
pub fn with_response_header(payload: &[u8]) -> Vec<u8> {
    let len = (payload.len() + 2) as u16;
    let mut out = Vec::with_capacity(payload.len() + 4);

    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(payload);
    out
}

/// Returns the payload length declared by a response header, if it fits.
fn response_len(response: &[u8]) -> Option<usize> {
    let declared = u16::from_be_bytes([*response.first()?, *response.get(1)?]) as usize;

    (declared >= 2 && declared + 2 <= response.len()).then_some(declared - 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_length_counts_reserved_bytes() {
        let response = with_response_header(&[1, 2, 3]);

        assert_eq!(response, [0, 5, 0, 0, 1, 2, 3]);
        assert_eq!(response_len(&response), Some(3));
        assert_eq!(response_len(&response[..5]), None);
    }
}
