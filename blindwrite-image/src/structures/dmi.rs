use super::pfi::RESPONSE_SIZE;

/// Earliest plausible mastering time of an Xbox disc, as a FILETIME.
const XBOX_EPOCH: i64 = 0x1BD1_6483_3DFC_000;

/// `"XBOX"` read as a little-endian word.
const XBOX360_SIGNATURE: u32 = 0x584F_4258;

/// Returns `true` if a DMI response carries an Xbox manufacturing record.
///
/// The record has version 1, a catalogue number of two letters, five digits
/// and a letter, and a timestamp no earlier than the console's launch.
#[must_use]
pub fn is_xbox(response: &[u8]) -> bool {
    if response.len() != RESPONSE_SIZE {
        return false;
    }

    let version = u32::from_le_bytes([response[4], response[5], response[6], response[7]]);

    if version != 1 {
        return false;
    }

    let catalogue = &response[12..20];
    let shape_ok = catalogue[..2].iter().all(u8::is_ascii_uppercase)
        && catalogue[2..7].iter().all(u8::is_ascii_digit)
        && catalogue[7].is_ascii_uppercase();

    if !shape_ok {
        return false;
    }

    let mut timestamp = [0u8; 8];
    timestamp.copy_from_slice(&response[20..28]);

    i64::from_le_bytes(timestamp) >= XBOX_EPOCH
}

/// Returns `true` if a DMI response carries the Xbox 360 signature.
#[must_use]
pub fn is_xbox360(response: &[u8]) -> bool {
    if response.len() != RESPONSE_SIZE {
        return false;
    }

    let at = 0x7EC;
    let signature = u32::from_le_bytes([
        response[at],
        response[at + 1],
        response[at + 2],
        response[at + 3],
    ]);

    signature == XBOX360_SIGNATURE
}
