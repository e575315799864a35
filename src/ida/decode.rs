//! IDA burst extraction from a demodulated frame.

use bitvec::prelude::*;

use crate::crc::crc16_ccitt;
use crate::frame::{DemodFrame, Direction};
use crate::ida::descramble::{descramble, BLOCK_BITS};
use crate::lcw::{decode_lcw, format_lcw_header, Lcw, LCW_BITS};
use crate::util::bits::{bits_to_u32, byte_at, pack_bits_msb};

/// Sync/access-code bits skipped at the head of every frame.
pub const SYNC_BITS: usize = 24;

/// Minimum usable frame: sync + LCW + one interleaver block.
pub const MIN_FRAME_BITS: usize = SYNC_BITS + LCW_BITS + BLOCK_BITS;

/// Decoded stream length needed for header + payload + CRC.
const MIN_BCH_BITS: usize = 196;

/// Maximum decoded stream retained on the burst.
const MAX_STORED_BCH_BITS: usize = 256;

/// Payload capacity of one burst in bytes.
pub const IDA_PAYLOAD_BYTES: usize = 20;

/// One decoded IDA burst.
#[derive(Debug, Clone)]
pub struct IdaBurst {
    pub timestamp: u64,
    pub frequency: f64,
    pub direction: Direction,
    pub magnitude: f32,
    pub noise: f32,
    pub level: f32,
    pub confidence: u8,
    pub n_symbols: usize,
    /// 3-bit sequence counter.
    pub da_ctr: u8,
    /// Payload length in bytes, <= 20.
    pub da_len: usize,
    /// Continuation expected.
    pub cont: bool,
    /// All 20 payload bytes; only the first `da_len` are semantically
    /// valid, the rest are kept for the diagnostic dump.
    pub payload: [u8; IDA_PAYLOAD_BYTES],
    pub crc_ok: bool,
    pub stored_crc: u16,
    pub computed_crc: u16,
    /// Payload chunks that needed BCH/Chase correction.
    pub fixed_errs: u32,
    /// BCH-decoded bit stream (bounded), for the parsed output line.
    pub bch: BitVec<u8, Msb0>,
    pub lcw: Lcw,
    /// Pre-formatted 110-character LCW header.
    pub lcw_header: String,
}

/// Try to decode a demodulated frame as an IDA burst.
///
/// Returns `None` for anything that is not a well-formed IDA frame:
/// too few bits, uncorrectable LCW, frame type other than 2, short decoded
/// stream, non-zero guard bits, or an over-long length field. A failed
/// payload CRC does *not* reject the burst; it is surfaced via `crc_ok`.
pub fn decode(frame: &DemodFrame) -> Option<IdaBurst> {
    if frame.bits.len() < MIN_FRAME_BITS {
        return None;
    }

    let llr = match &frame.llr {
        Some(l) if l.len() == frame.bits.len() => Some(&l[..]),
        _ => None,
    };

    let data = &frame.bits[SYNC_BITS..];
    let data_llr = llr.map(|l| &l[SYNC_BITS..]);

    let lcw = decode_lcw(data)?;
    if lcw.ft != 2 {
        return None;
    }

    let payload_bits = &data[LCW_BITS..];
    let payload_llr = data_llr.map(|l| &l[LCW_BITS..]);
    if payload_bits.len() < BLOCK_BITS {
        return None;
    }

    let decoded = descramble(payload_bits, payload_llr);
    let bch = decoded.bits;
    if bch.len() < MIN_BCH_BITS {
        return None;
    }

    let cont = bch[3];
    let da_ctr = bits_to_u32(&bch[5..8]) as u8;
    let da_len = bits_to_u32(&bch[11..16]) as usize;
    let zero1 = bits_to_u32(&bch[17..20]);
    if zero1 != 0 {
        return None;
    }
    if da_len > IDA_PAYLOAD_BYTES {
        return None;
    }

    let mut payload = [0u8; IDA_PAYLOAD_BYTES];
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte = byte_at(&bch, 20 + i * 8);
    }

    // The stored CRC acts as appended check bits: the CCITT CRC over
    // bits[0..20] + 12 zero bits + bits[20..len-4] folds to 0 when clean.
    let mut crc_ok = false;
    let mut stored_crc = 0u16;
    let mut computed_crc = 0u16;
    if da_len > 0 {
        stored_crc = bits_to_u32(&bch[180..196]) as u16;
        let crc_input = pack_bits_msb(
            bch[..20]
                .iter()
                .by_vals()
                .chain(std::iter::repeat(false).take(12))
                .chain(bch[20..bch.len() - 4].iter().by_vals()),
        );
        computed_crc = crc16_ccitt(&crc_input);
        crc_ok = computed_crc == 0;
    }

    let mut bch = bch;
    if bch.len() > MAX_STORED_BCH_BITS {
        bch.truncate(MAX_STORED_BCH_BITS);
    }

    let lcw_header = format_lcw_header(&lcw);

    Some(IdaBurst {
        timestamp: frame.timestamp,
        frequency: frame.center_frequency,
        direction: frame.direction,
        magnitude: frame.magnitude,
        noise: frame.noise,
        level: frame.level,
        confidence: frame.confidence,
        n_symbols: frame.n_symbols,
        da_ctr,
        da_len,
        cont,
        payload,
        crc_ok,
        stored_crc,
        computed_crc,
        fixed_errs: decoded.fixed_chunks,
        bch,
        lcw,
        lcw_header,
    })
}
