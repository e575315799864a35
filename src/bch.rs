//! BCH primitives for the Iridium burst codecs.
//!
//! Iridium protects the LCW and the DA payload with four short cyclic codes:
//!
//! - BCH(31,20), generator 3545, t=2: payload blocks
//! - BCH(7,3), generator 29, t=1: LCW component 1
//! - BCH(14,6), generator 465, t=1: LCW component 2 (13 bits + zero pad)
//! - BCH(26,21), generator 41, t=2: LCW component 3
//!
//! Decoding is remainder-and-lookup: divide the received word by the
//! generator in GF(2); a non-zero remainder indexes a precomputed
//! syndrome→error-locator table. The tables are pure functions of the
//! generators and are latched once at first use.

use once_cell::sync::Lazy;

/// Generator polynomial for DA payload blocks, BCH(31,20).
pub const BCH_POLY_DA: u32 = 3545;
/// Syndrome width of the DA code (degree of the generator).
pub const BCH_DA_SYNDROME_BITS: u32 = 11;
/// Data bits recovered per DA block.
pub const BCH_DA_DATA_BITS: usize = 20;

/// Generator for LCW component 1, BCH(7,3).
pub const BCH_POLY_LCW1: u32 = 29;
/// Generator for LCW component 2, BCH(14,6).
pub const BCH_POLY_LCW2: u32 = 465;
/// Generator for LCW component 3, BCH(26,21).
pub const BCH_POLY_LCW3: u32 = 41;

/// Remainder of `val` divided by `poly` over GF(2).
pub fn gf2_remainder(poly: u32, mut val: u32) -> u32 {
    debug_assert!(poly > 1);
    let poly_len = 32 - poly.leading_zeros();
    loop {
        let val_len = 32 - val.leading_zeros();
        if val_len < poly_len {
            return val;
        }
        val ^= poly << (val_len - poly_len);
    }
}

/// Systematic encode: append the generator remainder as check bits.
///
/// Returns `(data << check_bits) | remainder`, a codeword divisible by
/// `poly`. Used by the burst synthesizer and the tests.
pub fn encode(poly: u32, data: u32, check_bits: u32) -> u32 {
    let shifted = data << check_bits;
    shifted | gf2_remainder(poly, shifted)
}

/// Syndrome → error-locator table for one generator polynomial.
///
/// Entry `s` holds the lowest-weight error pattern whose syndrome is `s`
/// (1-bit patterns first, then 2-bit if the code corrects two errors).
pub struct SyndromeTable {
    entries: Vec<Option<(u8, u32)>>,
}

impl SyndromeTable {
    fn build(poly: u32, nbits: u32, max_errors: u8, size: usize) -> Self {
        let mut entries: Vec<Option<(u8, u32)>> = vec![None; size];

        for b in 0..nbits {
            let locator = 1u32 << b;
            let r = gf2_remainder(poly, locator) as usize;
            if r < size {
                entries[r] = Some((1, locator));
            }
        }

        if max_errors >= 2 {
            for b1 in 0..nbits {
                for b2 in (b1 + 1)..nbits {
                    let locator = (1u32 << b1) | (1u32 << b2);
                    let r = gf2_remainder(poly, locator) as usize;
                    if r < size && entries[r].is_none() {
                        entries[r] = Some((2, locator));
                    }
                }
            }
        }

        Self { entries }
    }

    /// Error count and locator for a non-zero syndrome, if correctable.
    pub fn lookup(&self, syndrome: u32) -> Option<(u8, u32)> {
        self.entries.get(syndrome as usize).copied().flatten()
    }
}

/// DA payload syndrome table: 2^11 entries, up to 2-bit locators.
pub static SYN_DA: Lazy<SyndromeTable> =
    Lazy::new(|| SyndromeTable::build(BCH_POLY_DA, 31, 2, 2048));
/// LCW1 syndrome table, single-bit locators.
pub static SYN_LCW1: Lazy<SyndromeTable> =
    Lazy::new(|| SyndromeTable::build(BCH_POLY_LCW1, 7, 1, 16));
/// LCW2 syndrome table, single-bit locators.
pub static SYN_LCW2: Lazy<SyndromeTable> =
    Lazy::new(|| SyndromeTable::build(BCH_POLY_LCW2, 14, 1, 256));
/// LCW3 syndrome table, up to 2-bit locators.
pub static SYN_LCW3: Lazy<SyndromeTable> =
    Lazy::new(|| SyndromeTable::build(BCH_POLY_LCW3, 26, 2, 32));

/// Hard-decision decode of one 31-bit DA codeword.
///
/// Returns the 20 data bits and whether a correction was applied, or `None`
/// when the syndrome is outside the 2-error radius (the caller may then fall
/// back to Chase decoding with soft information).
pub fn decode_da(val: u32) -> Option<(u32, bool)> {
    let syndrome = gf2_remainder(BCH_POLY_DA, val);
    if syndrome == 0 {
        return Some((val >> BCH_DA_SYNDROME_BITS, false));
    }
    let (_, locator) = SYN_DA.lookup(syndrome)?;
    Some(((val ^ locator) >> BCH_DA_SYNDROME_BITS, true))
}
