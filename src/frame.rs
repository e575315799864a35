//! Boundary types produced by the external demodulator and VOC decoder.

use bitvec::prelude::*;

use crate::voice::ambe::VOC_PAYLOAD_BYTES;

/// Link direction, settled by the demodulator's unique-word match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Uplink,
    Downlink,
}

impl Direction {
    /// Two-letter form used in the parsed output lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Uplink => "UL",
            Direction::Downlink => "DL",
        }
    }

    pub fn is_uplink(self) -> bool {
        self == Direction::Uplink
    }
}

/// One demodulated QPSK burst with hard bits and optional soft information.
#[derive(Debug, Clone)]
pub struct DemodFrame {
    /// Per-session frame counter.
    pub id: u64,
    /// Monotonic timestamp in nanoseconds.
    pub timestamp: u64,
    /// Center frequency in Hz.
    pub center_frequency: f64,
    pub direction: Direction,
    /// Signal magnitude (dB-ish units from the demodulator).
    pub magnitude: f32,
    /// Noise floor estimate.
    pub noise: f32,
    /// Linear signal level.
    pub level: f32,
    /// Demodulator confidence, 0-100.
    pub confidence: u8,
    /// Payload symbols after the unique word.
    pub n_symbols: usize,
    /// Hard decisions, one bit per channel bit.
    pub bits: BitVec<u8, Msb0>,
    /// Per-bit log-likelihood-ratio magnitudes, aligned 1:1 with `bits`.
    /// Absent means hard-decision decoding only.
    pub llr: Option<Vec<f32>>,
}

/// One VOC superframe from the external voice frame decoder.
#[derive(Debug, Clone)]
pub struct VocData {
    /// Opaque AMBE superframe payload.
    pub payload: [u8; VOC_PAYLOAD_BYTES],
    /// Timestamp in nanoseconds.
    pub timestamp: u64,
    /// Center frequency in Hz.
    pub frequency: f64,
}
