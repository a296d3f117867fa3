//! Subchannel layout conversion.
//!
//! Captures store subchannel either as 96 packed bytes per sector, where each
//! byte carries one bit of every channel P..W, or as a 16-byte Q-only block.
//! Both are returned to callers in the deinterleaved layout: twelve bytes per
//! channel, P first.

/// Bytes of subchannel data per sector.
pub const SUBCHANNEL_SIZE: usize = 96;

/// Bytes per channel in the deinterleaved layout.
const CHANNEL_SIZE: usize = 12;

/// Size of a Q-only subchannel block.
pub const Q16_SIZE: usize = 16;

/// Regroups packed subchannel bytes by channel.
///
/// `data` holds any number of 96-byte blocks; a trailing partial block is
/// dropped.
#[must_use]
pub fn deinterleave(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; data.len() / SUBCHANNEL_SIZE * SUBCHANNEL_SIZE];

    for (src, dst) in data
        .chunks_exact(SUBCHANNEL_SIZE)
        .zip(out.chunks_exact_mut(SUBCHANNEL_SIZE))
    {
        for (j, &byte) in src.iter().enumerate() {
            for channel in 0..8 {
                let bit = (byte >> (7 - channel)) & 1;
                dst[channel * CHANNEL_SIZE + j / 8] |= bit << (7 - j % 8);
            }
        }
    }

    out
}

/// Inverse of [`deinterleave()`].
#[must_use]
pub fn interleave(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; data.len() / SUBCHANNEL_SIZE * SUBCHANNEL_SIZE];

    for (src, dst) in data
        .chunks_exact(SUBCHANNEL_SIZE)
        .zip(out.chunks_exact_mut(SUBCHANNEL_SIZE))
    {
        for (j, byte) in dst.iter_mut().enumerate() {
            for channel in 0..8 {
                let bit = (src[channel * CHANNEL_SIZE + j / 8] >> (7 - j % 8)) & 1;
                *byte |= bit << (7 - channel);
            }
        }
    }

    out
}

/// Expands 16-byte Q blocks into the deinterleaved 96-byte layout.
///
/// Bytes 0..12 are the Q channel. The top bit of byte 15 is the P flag, which
/// fills the whole P channel. R..W are zero.
#[must_use]
pub fn expand_q16(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; data.len() / Q16_SIZE * SUBCHANNEL_SIZE];

    for (src, dst) in data
        .chunks_exact(Q16_SIZE)
        .zip(out.chunks_exact_mut(SUBCHANNEL_SIZE))
    {
        if src[15] & 0x80 != 0 {
            dst[..CHANNEL_SIZE].fill(0xFF);
        }

        dst[CHANNEL_SIZE..CHANNEL_SIZE * 2].copy_from_slice(&src[..CHANNEL_SIZE]);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(seed: u32) -> Vec<u8> {
        let mut state = seed;

        (0..SUBCHANNEL_SIZE * 2)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
                (state >> 16) as u8
            })
            .collect()
    }

    #[test]
    fn interleave_restores_packed_bytes() {
        for seed in [1, 7, 0xDEAD] {
            let packed = pattern(seed);
            assert_eq!(interleave(&deinterleave(&packed)), packed);
        }
    }

    #[test]
    fn q_bit_lands_in_q_channel() {
        // Only the Q bit set in every byte.
        let packed = vec![0x40u8; SUBCHANNEL_SIZE];
        let out = deinterleave(&packed);

        assert!(out[..12].iter().all(|&b| b == 0));
        assert!(out[12..24].iter().all(|&b| b == 0xFF));
        assert!(out[24..].iter().all(|&b| b == 0));
    }

    #[test]
    fn q16_keeps_q_and_p_flag() {
        let mut q16 = [0u8; Q16_SIZE];
        q16[..12].copy_from_slice(&[0x41, 1, 1, 0, 0, 0, 0, 0, 2, 0, 0x12, 0x34]);
        q16[15] = 0x80;

        let out = expand_q16(&q16);

        assert_eq!(out.len(), SUBCHANNEL_SIZE);
        assert_eq!(&out[..12], &[0xFF; 12]);
        assert_eq!(&out[12..24], &q16[..12]);
        assert!(out[24..].iter().all(|&b| b == 0));

        q16[15] = 0;
        assert_eq!(&expand_q16(&q16)[..12], &[0; 12]);
    }

    #[test]
    fn partial_blocks_are_dropped() {
        assert_eq!(deinterleave(&[0xFF; 100]).len(), 96);
        assert_eq!(expand_q16(&[0; 20]).len(), 96);
    }
}
