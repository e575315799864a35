//! Voice call clustering and the completed-call archive.
//!
//! VOC superframes arriving within 20 kHz and 20 s of an in-progress call
//! join it; anything else opens a new call, finalizing the oldest slot when
//! all eight are busy. Finalizing decodes the AMBE payloads to PCM,
//! normalizes quiet audio, classifies quality from the frame-rate ratio,
//! and stores the call in a 100-entry ring queried by age-ordered index.
//!
//! One mutex covers the active-call table, the ring, and the running
//! totals; the query surface is safe to hit from other threads.

use std::sync::Mutex;

use tracing::{debug, trace};

use crate::frame::VocData;
use crate::voice::ambe::{AmbeDecoder, SAMPLES_PER_SUPERFRAME, SUBFRAMES_PER_SUPERFRAME, VOC_PAYLOAD_BYTES};

/// Completed-call ring capacity.
pub const VOICE_MAX_CALLS: usize = 100;

/// Frames accumulated per call (about three minutes).
pub const VOICE_MAX_FRAMES: usize = 2000;

/// Frequency window for joining an active call, in Hz.
pub const VOICE_CLUSTER_FREQ_HZ: f64 = 20_000.0;

/// Silence gap that closes a call, in seconds.
pub const VOICE_CLUSTER_GAP_SECS: f64 = 20.0;

/// Concurrent in-progress calls.
pub const MAX_ACTIVE_CALLS: usize = 8;

/// Minimum decoded sub-frames for a call to be kept.
const MIN_DECODED_SUBFRAMES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceQuality {
    Good,
    Fair,
    Poor,
}

impl VoiceQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            VoiceQuality::Good => "good",
            VoiceQuality::Fair => "fair",
            VoiceQuality::Poor => "poor",
        }
    }
}

/// One archived voice call.
#[derive(Debug, Clone)]
pub struct VoiceCall {
    pub start_time: u64,
    pub end_time: u64,
    /// Mean frequency over the call, Hz.
    pub frequency: f64,
    /// VOC frames received.
    pub n_frames: usize,
    pub quality: VoiceQuality,
    /// Decoded PCM, 8 kHz 16-bit mono.
    pub audio: Vec<i16>,
    /// Monotonic call counter.
    pub call_id: u64,
}

struct ActiveCall {
    frames: Vec<[u8; VOC_PAYLOAD_BYTES]>,
    first_time: u64,
    last_time: u64,
    freq_sum: f64,
}

impl ActiveCall {
    fn mean_frequency(&self) -> f64 {
        if self.frames.is_empty() {
            0.0
        } else {
            self.freq_sum / self.frames.len() as f64
        }
    }
}

struct VoiceInner {
    decoder: Box<dyn AmbeDecoder>,
    active: [Option<ActiveCall>; MAX_ACTIVE_CALLS],
    ring: Vec<Option<VoiceCall>>,
    head: usize,
    count: usize,
    total_calls: u64,
    total_frames: u64,
}

/// Voice clustering front end plus the shared call archive.
pub struct VoiceDecoder {
    inner: Mutex<VoiceInner>,
}

impl VoiceDecoder {
    pub fn new(decoder: Box<dyn AmbeDecoder>) -> Self {
        Self {
            inner: Mutex::new(VoiceInner {
                decoder,
                active: Default::default(),
                ring: (0..VOICE_MAX_CALLS).map(|_| None).collect(),
                head: 0,
                count: 0,
                total_calls: 0,
                total_frames: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VoiceInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cluster one VOC superframe into an active call.
    pub fn add_frame(&self, voc: &VocData) {
        let mut inner = self.lock();
        inner.total_frames += 1;

        let mut slot = inner.active.iter().position(|c| {
            c.as_ref()
                .is_some_and(|c| (voc.frequency - c.mean_frequency()).abs() <= VOICE_CLUSTER_FREQ_HZ)
        });

        if let Some(i) = slot {
            let gap = voc.timestamp.saturating_sub(
                inner.active[i].as_ref().map_or(0, |c| c.last_time),
            ) as f64
                / 1e9;
            if gap > VOICE_CLUSTER_GAP_SECS {
                inner.finalize_slot(i);
                slot = None;
            }
        }

        let i = match slot {
            Some(i) => i,
            None => inner.alloc_slot(),
        };

        let call = inner.active[i].get_or_insert_with(|| {
            trace!(freq = voc.frequency, "opening voice call");
            ActiveCall {
                frames: Vec::new(),
                first_time: voc.timestamp,
                last_time: voc.timestamp,
                freq_sum: 0.0,
            }
        });

        if call.frames.len() < VOICE_MAX_FRAMES {
            call.frames.push(voc.payload);
            call.freq_sum += voc.frequency;
        }
        call.last_time = voc.timestamp;
    }

    /// Finalize every in-progress call (shutdown / end of input).
    pub fn flush(&self) {
        let mut inner = self.lock();
        for i in 0..MAX_ACTIVE_CALLS {
            inner.finalize_slot(i);
        }
    }

    /// Calls currently held in the archive.
    pub fn call_count(&self) -> usize {
        self.lock().count
    }

    /// Completed calls over the lifetime of the decoder.
    pub fn total_calls(&self) -> u64 {
        self.lock().total_calls
    }

    /// VOC frames seen over the lifetime of the decoder.
    pub fn total_frames(&self) -> u64 {
        self.lock().total_frames
    }

    /// Archived call by age index: 0 is the oldest in the ring.
    pub fn call(&self, index: usize) -> Option<VoiceCall> {
        let inner = self.lock();
        if index >= inner.count {
            return None;
        }
        let pos = (inner.head + VOICE_MAX_CALLS - inner.count + index) % VOICE_MAX_CALLS;
        inner.ring[pos].clone()
    }
}

impl VoiceInner {
    /// First free active slot, or the oldest one after finalizing it.
    fn alloc_slot(&mut self) -> usize {
        if let Some(i) = self.active.iter().position(Option::is_none) {
            return i;
        }
        let oldest = self
            .active
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| c.as_ref().map_or(u64::MAX, |c| c.first_time))
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.finalize_slot(oldest);
        oldest
    }

    fn finalize_slot(&mut self, idx: usize) {
        let Some(call) = self.active[idx].take() else {
            return;
        };
        if call.frames.len() < 3 {
            trace!(frames = call.frames.len(), "discarding short voice call");
            return;
        }

        let mut audio: Vec<i16> = Vec::with_capacity(call.frames.len() * SAMPLES_PER_SUPERFRAME);
        let mut decoded_ok = 0usize;
        let mut pcm = [0i16; SAMPLES_PER_SUPERFRAME];
        for payload in &call.frames {
            let ok = self.decoder.decode_superframe(payload, &mut pcm);
            if ok > 0 {
                audio.extend_from_slice(&pcm);
                decoded_ok += ok;
            }
        }
        debug!(
            ok = decoded_ok,
            total = call.frames.len() * SUBFRAMES_PER_SUPERFRAME,
            "AMBE decode finished"
        );

        if decoded_ok < MIN_DECODED_SUBFRAMES {
            return;
        }

        normalize(&mut audio);

        let duration_ms = call.last_time.saturating_sub(call.first_time) / 1_000_000;
        let quality = classify_quality(call.frames.len(), duration_ms);
        let call_id = self.total_calls;
        self.total_calls += 1;

        debug!(
            call_id,
            frames = call.frames.len(),
            secs = duration_ms as f64 / 1000.0,
            quality = quality.as_str(),
            mhz = call.mean_frequency() / 1e6,
            "voice call complete"
        );

        // Ring insert; overwriting drops the evicted call's PCM buffer.
        let completed = VoiceCall {
            start_time: call.first_time,
            end_time: call.last_time,
            frequency: call.mean_frequency(),
            n_frames: call.frames.len(),
            quality,
            audio,
            call_id,
        };
        self.ring[self.head] = Some(completed);
        self.head = (self.head + 1) % VOICE_MAX_CALLS;
        if self.count < VOICE_MAX_CALLS {
            self.count += 1;
        }
    }
}

/// Boost quiet audio toward ~80% of full scale, capped at 8x gain.
fn normalize(audio: &mut [i16]) {
    let peak = audio.iter().map(|&s| (s as i32).abs()).max().unwrap_or(0);
    if peak > 0 && peak < 16000 {
        let gain = (26000.0 / peak as f64).min(8.0);
        for s in audio.iter_mut() {
            *s = ((*s as f64 * gain) as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }
    }
}

/// Frame-rate ratio against the expected one superframe per 90 ms.
fn classify_quality(n_frames: usize, duration_ms: u64) -> VoiceQuality {
    if duration_ms == 0 {
        return VoiceQuality::Poor;
    }
    let expected = duration_ms as f64 / 90.0;
    let ratio = n_frames as f64 / expected;
    if ratio > 0.8 {
        VoiceQuality::Good
    } else if ratio > 0.5 {
        VoiceQuality::Fair
    } else {
        VoiceQuality::Poor
    }
}
