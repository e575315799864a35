//! Link Control Word extraction.
//!
//! The LCW is the 46 interleaved bits following the 24-bit sync region of
//! every Iridium burst. It is split across three short BCH codewords; all
//! three must decode within their error capacity or the whole LCW is
//! rejected. Frame type 2 marks an IDA burst.

mod format;

pub use format::format_lcw_header;

use bitvec::prelude::*;

use crate::bch::{
    self, gf2_remainder, BCH_POLY_LCW1, BCH_POLY_LCW2, BCH_POLY_LCW3, SYN_LCW1, SYN_LCW2,
    SYN_LCW3,
};
use crate::util::bits::bits_to_u32;

/// Length of the LCW region in channel bits.
pub const LCW_BITS: usize = 46;

/// De-interleave permutation, 1-indexed, applied after the pair swap.
pub const LCW_PERMUTATION: [usize; LCW_BITS] = [
    40, 39, 36, 35, 32, 31, 28, 27, 24, 23, //
    20, 19, 16, 15, 12, 11, 8, 7, 4, 3, //
    41, 38, 37, 34, 33, 30, 29, 26, 25, 22, //
    21, 18, 17, 14, 13, 10, 9, 6, 5, 2, //
    1, 46, 45, 44, 43, 42,
];

/// Decoded Link Control Word fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lcw {
    /// Frame type, 0-7. Type 2 is IDA.
    pub ft: u8,
    /// 2-bit type field from the second codeword.
    pub lcw_ft: u8,
    /// 4-bit code from the second codeword.
    pub lcw_code: u8,
    /// 21 data bits from the third codeword.
    pub lcw3_val: u32,
    /// Number of LCW components that needed correction.
    pub corrected: u8,
}

/// Decode the LCW from the first 46 bits after the sync region.
///
/// The permutation table expects pair-swapped input (the global symbol
/// reversal of the air interface is not applied upstream), so bits are
/// swapped in pairs first. Returns `None` when any of the three BCH
/// components is uncorrectable.
pub fn decode_lcw(data: &BitSlice<u8, Msb0>) -> Option<Lcw> {
    if data.len() < LCW_BITS {
        return None;
    }

    let mut swapped = bitarr![u8, Msb0; 0; 46];
    for i in (0..LCW_BITS).step_by(2) {
        swapped.set(i, data[i + 1]);
        swapped.set(i + 1, data[i]);
    }

    let mut lcw_bits = bitarr![u8, Msb0; 0; 46];
    for (i, &src) in LCW_PERMUTATION.iter().enumerate() {
        lcw_bits.set(i, swapped[src - 1]);
    }

    let mut corrected = 0u8;

    // lcw1: bits 0-6, BCH(7,3)
    let mut v1 = bits_to_u32(&lcw_bits[..7]);
    let s1 = gf2_remainder(BCH_POLY_LCW1, v1);
    if s1 != 0 {
        let (_, locator) = SYN_LCW1.lookup(s1)?;
        v1 ^= locator;
        corrected += 1;
    }
    let ft = ((v1 >> 4) & 0x7) as u8;

    // lcw2: bits 7-19 plus a trailing zero pad, BCH(14,6)
    let mut v2 = bits_to_u32(&lcw_bits[7..20]) << 1;
    let s2 = gf2_remainder(BCH_POLY_LCW2, v2);
    if s2 != 0 {
        let (_, locator) = SYN_LCW2.lookup(s2)?;
        v2 ^= locator;
        corrected += 1;
    }
    let lcw2_data = ((v2 >> 8) & 0x3F) as u8;

    // lcw3: bits 20-45, BCH(26,21)
    let mut v3 = bits_to_u32(&lcw_bits[20..46]);
    let s3 = gf2_remainder(BCH_POLY_LCW3, v3);
    if s3 != 0 {
        let (_, locator) = SYN_LCW3.lookup(s3)?;
        v3 ^= locator;
        corrected += 1;
    }

    Some(Lcw {
        ft,
        lcw_ft: (lcw2_data >> 4) & 0x3,
        lcw_code: lcw2_data & 0xF,
        lcw3_val: v3 >> 5,
        corrected,
    })
}

/// Build the 46 channel bits carrying the given LCW fields.
///
/// Inverse of [`decode_lcw`]; used by the burst synthesizer. The lcw2
/// codeword's pad bit is not transmitted, so a set low remainder bit is
/// left for the decoder's single-error corrector to absorb.
pub fn encode_lcw(ft: u8, lcw_ft: u8, lcw_code: u8, lcw3_val: u32) -> BitVec<u8, Msb0> {
    let cw1 = bch::encode(BCH_POLY_LCW1, (ft & 0x7) as u32, 4);
    let data2 = (((lcw_ft & 0x3) << 4) | (lcw_code & 0xF)) as u32;
    let cw2 = bch::encode(BCH_POLY_LCW2, data2, 8);
    let cw3 = bch::encode(BCH_POLY_LCW3, lcw3_val & 0x1F_FFFF, 5);

    let mut lcw_bits = bitarr![u8, Msb0; 0; 46];
    for i in 0..7 {
        lcw_bits.set(i, (cw1 >> (6 - i)) & 1 != 0);
    }
    for i in 0..13 {
        // top 13 bits of the 14-bit codeword
        lcw_bits.set(7 + i, (cw2 >> (13 - i)) & 1 != 0);
    }
    for i in 0..26 {
        lcw_bits.set(20 + i, (cw3 >> (25 - i)) & 1 != 0);
    }

    let mut swapped = bitarr![u8, Msb0; 0; 46];
    for (i, &dst) in LCW_PERMUTATION.iter().enumerate() {
        swapped.set(dst - 1, lcw_bits[i]);
    }

    let mut out = BitVec::repeat(false, LCW_BITS);
    for i in 0..LCW_BITS {
        out.set(i, swapped[i ^ 1]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(ft: u8, lcw_ft: u8, lcw_code: u8, lcw3_val: u32) -> Lcw {
        let bits = encode_lcw(ft, lcw_ft, lcw_code, lcw3_val);
        decode_lcw(&bits).expect("clean LCW must decode")
    }

    #[test]
    fn test_roundtrip_grid() {
        for ft in 0..8u8 {
            for lcw_ft in 0..4u8 {
                for lcw_code in 0..16u8 {
                    let val = ((ft as u32) << 18) ^ ((lcw_code as u32) << 7) ^ 0x155;
                    let lcw = roundtrip(ft, lcw_ft, lcw_code, val);
                    assert_eq!(lcw.ft, ft);
                    assert_eq!(lcw.lcw_ft, lcw_ft);
                    assert_eq!(lcw.lcw_code, lcw_code);
                    assert_eq!(lcw.lcw3_val, val);
                }
            }
        }
    }

    #[test]
    fn test_roundtrip_extremes() {
        for (ft, lcw_ft, lcw_code, val) in [
            (0, 0, 0, 0),
            (7, 3, 15, 0x1F_FFFF),
            (2, 1, 1, 0x0A_AAAA),
        ] {
            let lcw = roundtrip(ft, lcw_ft, lcw_code, val);
            assert_eq!((lcw.ft, lcw.lcw_ft, lcw.lcw_code, lcw.lcw3_val), (ft, lcw_ft, lcw_code, val));
        }
    }

    #[test]
    fn test_single_flip_recovery() {
        // Any single channel-bit flip lands in exactly one BCH component.
        // Restrict to tuples whose lcw2 pad bit is genuinely zero so the
        // flip is the only error in that component.
        let data2 = 0u32;
        assert_eq!(bch::encode(BCH_POLY_LCW2, data2, 8) & 1, 0);

        let (ft, lcw_ft, lcw_code, val) = (2u8, 0u8, 0u8, 0x12_3456u32 & 0x1F_FFFF);
        let clean = encode_lcw(ft, lcw_ft, lcw_code, val);
        for flip in 0..LCW_BITS {
            let mut bits = clean.clone();
            let cur = bits[flip];
            bits.set(flip, !cur);
            let lcw = decode_lcw(&bits).expect("single flip must correct");
            assert_eq!(lcw.ft, ft, "flip at {flip}");
            assert_eq!(lcw.lcw_ft, lcw_ft);
            assert_eq!(lcw.lcw_code, lcw_code);
            assert_eq!(lcw.lcw3_val, val);
            assert!(lcw.corrected >= 1);
        }
    }

    #[test]
    fn test_short_input_rejected() {
        let bits = BitVec::<u8, Msb0>::repeat(false, 45);
        assert!(decode_lcw(&bits).is_none());
    }
}
