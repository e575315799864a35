//! VOC frame clustering, AMBE decode, and the voice call archive.

pub mod ambe;
pub mod cluster;

pub use ambe::AmbeDecoder;
pub use cluster::{VoiceCall, VoiceDecoder, VoiceQuality};
