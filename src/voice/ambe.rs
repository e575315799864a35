//! AMBE codec boundary.
//!
//! The codec itself is an external library; the clusterer only needs a
//! superframe-at-a-time decode seam.

/// Bytes per VOC superframe payload (312 channel bits).
pub const VOC_PAYLOAD_BYTES: usize = 39;

/// PCM samples produced per superframe (90 ms at 8 kHz).
pub const SAMPLES_PER_SUPERFRAME: usize = 720;

/// Output sample rate in Hz.
pub const VOICE_SAMPLE_RATE: u32 = 8000;

/// Voice sub-frames per superframe.
pub const SUBFRAMES_PER_SUPERFRAME: usize = 2;

/// One AMBE superframe decoder.
///
/// `decode_superframe` writes 720 samples of 8 kHz mono PCM and returns the
/// number of sub-frames whose FEC succeeded (0..=2). A return of 0 means
/// the PCM output is unusable and must be discarded.
pub trait AmbeDecoder: Send {
    fn decode_superframe(
        &mut self,
        payload: &[u8; VOC_PAYLOAD_BYTES],
        pcm: &mut [i16; SAMPLES_PER_SUPERFRAME],
    ) -> usize;
}
