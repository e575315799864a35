//! Payload descrambler: block de-interleave plus Chase BCH decoding.
//!
//! The payload after the LCW is interleaved in 124-bit blocks of 62 QPSK
//! symbols. Each block de-interleaves into two 62-bit halves whose
//! concatenation splits into four 31-bit BCH(31,20) codewords, decoded in
//! transmitter order [3,1,2,0]. A trailing partial block (the last 64 bits
//! of a standard DA burst) drops the first bit of each half and decodes
//! 31-bit windows of half2-tail ‖ half1-tail.
//!
//! When a chunk's syndrome falls outside the 2-error radius and soft
//! information is available, Chase decoding retries every non-empty flip
//! combination of the five least-reliable bit positions. Decoding stops at
//! the first chunk that cannot be recovered.

use bitvec::prelude::*;

use crate::bch::{self, BCH_DA_DATA_BITS};

/// Interleaver block size in channel bits.
pub const BLOCK_BITS: usize = 124;

/// Upper bound on the decoded bit stream.
const MAX_BCH_BITS: usize = 512;

/// Number of least-reliable candidate positions the Chase search flips.
const CHASE_FLIP_BITS: usize = 5;

/// Decode order of the four 31-bit chunks within one block.
const CHUNK_ORDER: [usize; 4] = [3, 1, 2, 0];

/// Result of descrambling one payload region.
pub struct Descrambled {
    /// Recovered data bits, 20 per successfully decoded chunk.
    pub bits: BitVec<u8, Msb0>,
    /// Number of chunks that needed BCH or Chase correction.
    pub fixed_chunks: u32,
}

/// Input indices of the two de-interleaved halves for `n_sym` symbols.
///
/// Half 1 collects symbol pairs at {n-1, n-3, ...}, half 2 at {n-2, n-4,
/// ...}, each keeping the intra-pair bit order. Bits and LLRs share the
/// same index tables.
fn deinterleave_indices(n_sym: usize) -> (Vec<usize>, Vec<usize>) {
    let mut half1 = Vec::with_capacity(n_sym);
    let mut half2 = Vec::with_capacity(n_sym);
    let mut s = n_sym as isize - 1;
    while s >= 1 {
        half1.push(2 * s as usize);
        half1.push(2 * s as usize + 1);
        s -= 2;
    }
    let mut s = n_sym as isize - 2;
    while s >= 0 {
        half2.push(2 * s as usize);
        half2.push(2 * s as usize + 1);
        s -= 2;
    }
    (half1, half2)
}

fn bools_to_u32(bits: &[bool]) -> u32 {
    bits.iter().fold(0u32, |acc, &b| (acc << 1) | b as u32)
}

/// Hard-decision decode of one 31-bit chunk with a Chase fallback.
fn chase_decode_chunk(bits: &[bool], llr: Option<&[f32]>) -> Option<(u32, bool)> {
    debug_assert_eq!(bits.len(), 31);
    let val = bools_to_u32(bits);
    if let Some(result) = bch::decode_da(val) {
        return Some(result);
    }

    // Past the hard-decision radius: search flips of the least reliable bits.
    let llr = llr?;
    let mut pos: Vec<usize> = (0..31).collect();
    pos.sort_by(|&a, &b| {
        llr[a]
            .abs()
            .partial_cmp(&llr[b].abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut flip_masks = [0u32; CHASE_FLIP_BITS];
    for (mask, &p) in flip_masks.iter_mut().zip(pos.iter()) {
        *mask = 1 << (30 - p);
    }

    for combo in 1u32..(1 << CHASE_FLIP_BITS) {
        let mut flipped = val;
        for (b, &mask) in flip_masks.iter().enumerate() {
            if combo & (1 << b) != 0 {
                flipped ^= mask;
            }
        }
        if let Some((data, _)) = bch::decode_da(flipped) {
            return Some((data, true));
        }
    }

    None
}

fn push_data_bits(out: &mut BitVec<u8, Msb0>, data: u32) {
    for i in (0..BCH_DA_DATA_BITS).rev() {
        out.push((data >> i) & 1 != 0);
    }
}

/// De-interleave and BCH-decode the payload region after the LCW.
///
/// `llr`, when present, must be aligned 1:1 with `data`. Decoding
/// terminates at the first unrecoverable chunk; the bits recovered up to
/// that point are returned.
pub fn descramble(data: &BitSlice<u8, Msb0>, llr: Option<&[f32]>) -> Descrambled {
    let n_full = data.len() / BLOCK_BITS;
    let remain = data.len() % BLOCK_BITS;

    let mut out = BitVec::with_capacity(MAX_BCH_BITS);
    let mut fixed_chunks = 0u32;

    let (half1, half2) = deinterleave_indices(62);
    let block_order: Vec<usize> = half1.iter().chain(half2.iter()).copied().collect();

    for blk in 0..n_full {
        let base = blk * BLOCK_BITS;
        let combined: Vec<bool> = block_order.iter().map(|&i| data[base + i]).collect();
        let lcombined: Option<Vec<f32>> =
            llr.map(|l| block_order.iter().map(|&i| l[base + i]).collect());

        for &c in &CHUNK_ORDER {
            if out.len() + BCH_DA_DATA_BITS > MAX_BCH_BITS {
                return Descrambled { bits: out, fixed_chunks };
            }
            let off = c * 31;
            let chunk_llr = lcombined.as_ref().map(|l| &l[off..off + 31]);
            match chase_decode_chunk(&combined[off..off + 31], chunk_llr) {
                Some((data20, fixed)) => {
                    fixed_chunks += fixed as u32;
                    push_data_bits(&mut out, data20);
                }
                None => return Descrambled { bits: out, fixed_chunks },
            }
        }
    }

    // Last partial block: drop the first bit of each half, decode 31-bit
    // windows of half2-tail followed by half1-tail.
    if remain >= 4 {
        let n_sym_last = remain / 2;
        let base = n_full * BLOCK_BITS;
        let (h1_idx, h2_idx) = deinterleave_indices(n_sym_last);
        if h1_idx.len() > 1 && h2_idx.len() > 1 {
            let tail_order: Vec<usize> = h2_idx[1..].iter().chain(h1_idx[1..].iter()).copied().collect();
            let combined: Vec<bool> = tail_order.iter().map(|&i| data[base + i]).collect();
            let lcombined: Option<Vec<f32>> =
                llr.map(|l| tail_order.iter().map(|&i| l[base + i]).collect());

            let mut pos = 0;
            while pos + 31 <= combined.len() && out.len() + BCH_DA_DATA_BITS <= MAX_BCH_BITS {
                let chunk_llr = lcombined.as_ref().map(|l| &l[pos..pos + 31]);
                match chase_decode_chunk(&combined[pos..pos + 31], chunk_llr) {
                    Some((data20, fixed)) => {
                        fixed_chunks += fixed as u32;
                        push_data_bits(&mut out, data20);
                    }
                    None => break,
                }
                pos += 31;
            }
        }
    }

    Descrambled { bits: out, fixed_chunks }
}

/// Rebuild the interleaved channel bits carrying `bch_stream`.
///
/// Inverse of [`descramble`] for the standard burst shapes: every group of
/// four 20-bit chunks becomes one 124-bit block, and a final group of two
/// chunks becomes the 64-bit partial tail. Used by the burst synthesizer.
pub fn interleave(bch_stream: &BitSlice<u8, Msb0>) -> BitVec<u8, Msb0> {
    assert_eq!(bch_stream.len() % BCH_DA_DATA_BITS, 0);
    let n_chunks = bch_stream.len() / BCH_DA_DATA_BITS;
    assert!(
        n_chunks % 4 == 0 || n_chunks % 4 == 2,
        "stream must split into 4-chunk blocks plus an optional 2-chunk tail"
    );

    let codewords: Vec<u32> = (0..n_chunks)
        .map(|c| {
            let data = crate::util::bits::bits_to_u32(
                &bch_stream[c * BCH_DA_DATA_BITS..(c + 1) * BCH_DA_DATA_BITS],
            );
            bch::encode(bch::BCH_POLY_DA, data, bch::BCH_DA_SYNDROME_BITS)
        })
        .collect();

    let mut out = BitVec::new();
    let n_blocks = n_chunks / 4;
    let (half1, half2) = deinterleave_indices(62);

    for blk in 0..n_blocks {
        let cws = &codewords[blk * 4..blk * 4 + 4];
        let mut combined = [false; BLOCK_BITS];
        for (decode_idx, &segment) in CHUNK_ORDER.iter().enumerate() {
            let cw = cws[decode_idx];
            for b in 0..31 {
                combined[segment * 31 + b] = (cw >> (30 - b)) & 1 != 0;
            }
        }
        let mut channel = vec![false; BLOCK_BITS];
        for (i, &dst) in half1.iter().enumerate() {
            channel[dst] = combined[i];
        }
        for (i, &dst) in half2.iter().enumerate() {
            channel[dst] = combined[62 + i];
        }
        out.extend(channel.iter().copied());
    }

    if n_chunks % 4 == 2 {
        let cw_a = codewords[n_chunks - 2];
        let cw_b = codewords[n_chunks - 1];
        let mut h1 = [false; 32];
        let mut h2 = [false; 32];
        for b in 0..31 {
            h2[1 + b] = (cw_a >> (30 - b)) & 1 != 0;
            h1[1 + b] = (cw_b >> (30 - b)) & 1 != 0;
        }
        let (h1_idx, h2_idx) = deinterleave_indices(32);
        let mut channel = vec![false; 64];
        for (i, &dst) in h1_idx.iter().enumerate() {
            channel[dst] = h1[i];
        }
        for (i, &dst) in h2_idx.iter().enumerate() {
            channel[dst] = h2[i];
        }
        out.extend(channel.iter().copied());
    }

    out
}
