//! CD-ROM error detection code.

use crate::sector::{RAW_CD_SECTOR_SIZE, SYNC};
use crate::verify::SectorChecker;

/// Reflected form of the EDC polynomial x^32 + x^31 + x^16 + x^15 + x^4 + x^3 + x + 1.
const EDC_POLY: u32 = 0xD801_8001;

const EDC_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;

    while i < 256 {
        let mut edc = i as u32;
        let mut bit = 0;

        while bit < 8 {
            edc = if edc & 1 != 0 {
                (edc >> 1) ^ EDC_POLY
            } else {
                edc >> 1
            };
            bit += 1;
        }

        table[i] = edc;
        i += 1;
    }

    table
};

/// Computes the EDC of `data`.
#[must_use]
pub fn edc(data: &[u8]) -> u32 {
    data.iter().fold(0, |edc, &b| {
        (edc >> 8) ^ EDC_TABLE[((edc ^ b as u32) & 0xFF) as usize]
    })
}

/// Checks raw CD frames against the EDC they carry.
///
/// Audio frames, DVD sectors and Form 2 frames whose EDC field is zero cannot
/// be checked and give `None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EdcChecker;

impl SectorChecker for EdcChecker {
    fn check(&self, sector: &[u8]) -> Option<bool> {
        if sector.len() < RAW_CD_SECTOR_SIZE || !sector.starts_with(&SYNC) {
            return None;
        }

        match sector[15] {
            1 => Some(stored(sector, 2064) == edc(&sector[..2064])),
            2 if sector[18] & 0x20 != 0 => match stored(sector, 2348) {
                0 => None,
                expected => Some(expected == edc(&sector[16..2348])),
            },
            2 => Some(stored(sector, 2072) == edc(&sector[16..2072])),
            _ => None,
        }
    }
}

fn stored(sector: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([sector[at], sector[at + 1], sector[at + 2], sector[at + 3]])
}
