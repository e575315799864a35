//! IDA (Iridium Data) burst decoding and reassembly.
//!
//! The pipeline: LCW extraction gates on frame type 2, the payload
//! descrambler recovers the BCH-decoded stream, [`decode`] parses header
//! fields and verifies the CCITT CRC, and [`IdaReassembler`] joins related
//! bursts into application messages.

pub mod decode;
pub mod descramble;
pub mod reassemble;
pub mod synth;

pub use decode::{decode, IdaBurst};
pub use reassemble::{IdaMessage, IdaReassembler};
