//! Voice clustering scenarios against the public archive surface.

use rustyiridium::voice::ambe::{AmbeDecoder, SAMPLES_PER_SUPERFRAME, VOC_PAYLOAD_BYTES};
use rustyiridium::voice::cluster::VOICE_MAX_CALLS;
use rustyiridium::{VocData, VoiceDecoder};

struct ToneAmbe;

impl AmbeDecoder for ToneAmbe {
    fn decode_superframe(
        &mut self,
        _payload: &[u8; VOC_PAYLOAD_BYTES],
        pcm: &mut [i16; SAMPLES_PER_SUPERFRAME],
    ) -> usize {
        for (i, s) in pcm.iter_mut().enumerate() {
            *s = if i % 2 == 0 { 12000 } else { -12000 };
        }
        2
    }
}

const T0: u64 = 1_700_000_000_000_000_000;
const MS: u64 = 1_000_000;

fn voc(ts: u64, freq: f64) -> VocData {
    VocData {
        payload: [0u8; VOC_PAYLOAD_BYTES],
        timestamp: ts,
        frequency: freq,
    }
}

fn cluster(v: &VoiceDecoder, t0: u64, freq: f64, n: usize) {
    for i in 0..n {
        v.add_frame(&voc(t0 + i as u64 * 90 * MS, freq));
    }
}

#[test]
fn ten_khz_apart_is_one_call() {
    let v = VoiceDecoder::new(Box::new(ToneAmbe));
    v.add_frame(&voc(T0, 1_626_000_000.0));
    v.add_frame(&voc(T0 + 50 * MS, 1_626_010_000.0));
    v.add_frame(&voc(T0 + 100 * MS, 1_626_005_000.0));
    v.flush();
    assert_eq!(v.total_calls(), 1);

    let call = v.call(0).expect("call");
    assert_eq!(call.n_frames, 3);
    assert_eq!(call.audio.len(), 3 * SAMPLES_PER_SUPERFRAME);
}

#[test]
fn hundred_khz_apart_is_two_calls() {
    let v = VoiceDecoder::new(Box::new(ToneAmbe));
    cluster(&v, T0, 1_626_000_000.0, 3);
    cluster(&v, T0, 1_626_100_000.0, 3);
    v.flush();
    assert_eq!(v.total_calls(), 2);
}

#[test]
fn twenty_second_gap_is_two_calls() {
    let v = VoiceDecoder::new(Box::new(ToneAmbe));
    cluster(&v, T0, 1_626_000_000.0, 3);
    cluster(&v, T0 + 25_000 * MS, 1_626_000_000.0, 3);
    v.flush();
    assert_eq!(v.total_calls(), 2);
}

#[test]
fn archive_keeps_the_last_hundred_calls() {
    let v = VoiceDecoder::new(Box::new(ToneAmbe));
    for k in 0..101u64 {
        cluster(&v, T0 + k * 60_000 * MS, 1_626_000_000.0, 3);
        v.flush();
    }

    assert_eq!(v.total_calls(), 101);
    assert_eq!(v.call_count(), VOICE_MAX_CALLS);
    // Call id 0 was evicted; the oldest surviving call is id 1.
    assert_eq!(v.call(0).expect("oldest").call_id, 1);
    assert_eq!(v.call(VOICE_MAX_CALLS - 1).expect("newest").call_id, 100);
    assert!(v.call(VOICE_MAX_CALLS).is_none());
}
