//! Multi-burst IDA reassembly.
//!
//! CRC-good bursts sharing a direction and an anchor frequency are joined
//! into application messages by their 3-bit sequence counter. The table is
//! sixteen fixed slots owning their buffers by value; a full table evicts
//! the stalest stream. Timeouts are measured against stream time, not the
//! wall clock, so file replay stays deterministic.

use tracing::{debug, trace};

use crate::frame::Direction;
use crate::ida::decode::IdaBurst;

/// Number of concurrent reassembly streams.
pub const IDA_REASSEMBLY_SLOTS: usize = 16;

/// Maximum accumulated message size in bytes.
pub const IDA_MESSAGE_BYTES: usize = 256;

/// A stream with no new burst for this long is abandoned.
pub const IDA_REASSEMBLY_TIMEOUT_NS: u64 = 280_000_000;

/// Continuation bursts must stay within this many Hz of the anchor.
pub const IDA_MATCH_FREQ_HZ: f64 = 260.0;

/// A completed application message, borrowed from the reassembly slot for
/// the duration of the callback.
#[derive(Debug)]
pub struct IdaMessage<'a> {
    pub data: &'a [u8],
    pub timestamp: u64,
    pub frequency: f64,
    pub direction: Direction,
    pub magnitude: f32,
}

#[derive(Clone, Copy)]
struct Slot {
    active: bool,
    direction: Direction,
    frequency: f64,
    last_timestamp: u64,
    last_ctr: u8,
    data: [u8; IDA_MESSAGE_BYTES],
    len: usize,
}

impl Slot {
    const EMPTY: Slot = Slot {
        active: false,
        direction: Direction::Downlink,
        frequency: 0.0,
        last_timestamp: 0,
        last_ctr: 0,
        data: [0; IDA_MESSAGE_BYTES],
        len: 0,
    };

    fn append(&mut self, bytes: &[u8]) {
        let space = IDA_MESSAGE_BYTES - self.len;
        let take = bytes.len().min(space);
        self.data[self.len..self.len + take].copy_from_slice(&bytes[..take]);
        self.len += take;
    }
}

/// Sixteen-slot multi-burst reassembler.
pub struct IdaReassembler {
    slots: [Slot; IDA_REASSEMBLY_SLOTS],
}

impl Default for IdaReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl IdaReassembler {
    pub fn new() -> Self {
        Self {
            slots: [Slot::EMPTY; IDA_REASSEMBLY_SLOTS],
        }
    }

    /// Feed one decoded burst; `emit` is called for each completed message.
    ///
    /// Returns `true` when a message was emitted. Bursts with a failed CRC
    /// or an empty payload never enter the table.
    pub fn push<F>(&mut self, burst: &IdaBurst, mut emit: F) -> bool
    where
        F: FnMut(IdaMessage<'_>),
    {
        if !burst.crc_ok || burst.da_len == 0 {
            return false;
        }

        let body = &burst.payload[..burst.da_len];

        // Continuation of an existing stream?
        for slot in self.slots.iter_mut() {
            if !slot.active || slot.direction != burst.direction {
                continue;
            }
            if (slot.frequency - burst.frequency).abs() > IDA_MATCH_FREQ_HZ {
                continue;
            }
            if burst.timestamp < slot.last_timestamp {
                continue;
            }
            if burst.timestamp - slot.last_timestamp > IDA_REASSEMBLY_TIMEOUT_NS {
                continue;
            }
            if (slot.last_ctr + 1) % 8 != burst.da_ctr {
                continue;
            }

            slot.append(body);
            slot.last_timestamp = burst.timestamp;
            slot.last_ctr = burst.da_ctr;

            if !burst.cont {
                emit(IdaMessage {
                    data: &slot.data[..slot.len],
                    timestamp: burst.timestamp,
                    frequency: slot.frequency,
                    direction: slot.direction,
                    magnitude: burst.magnitude,
                });
                slot.active = false;
                return true;
            }
            return false;
        }

        // Single-burst message.
        if burst.da_ctr == 0 && !burst.cont {
            emit(IdaMessage {
                data: body,
                timestamp: burst.timestamp,
                frequency: burst.frequency,
                direction: burst.direction,
                magnitude: burst.magnitude,
            });
            return true;
        }

        // Start of a new multi-burst stream.
        if burst.da_ctr == 0 && burst.cont {
            let idx = self.free_or_oldest();
            let slot = &mut self.slots[idx];
            if slot.active {
                debug!(
                    freq = slot.frequency,
                    "reassembly table full, evicting stalest stream"
                );
            }
            slot.active = true;
            slot.direction = burst.direction;
            slot.frequency = burst.frequency;
            slot.last_timestamp = burst.timestamp;
            slot.last_ctr = burst.da_ctr;
            slot.len = 0;
            slot.append(body);
            return false;
        }

        // Orphan continuation with no live stream.
        trace!(ctr = burst.da_ctr, "dropping orphan continuation burst");
        false
    }

    /// Deactivate streams that have not advanced within the timeout.
    pub fn flush(&mut self, now_ns: u64) {
        for slot in self.slots.iter_mut() {
            if slot.active && now_ns > slot.last_timestamp + IDA_REASSEMBLY_TIMEOUT_NS {
                trace!(freq = slot.frequency, "reassembly stream timed out");
                slot.active = false;
            }
        }
    }

    fn free_or_oldest(&self) -> usize {
        let mut oldest = 0;
        let mut oldest_ts = u64::MAX;
        for (i, slot) in self.slots.iter().enumerate() {
            if !slot.active {
                return i;
            }
            if slot.last_timestamp < oldest_ts {
                oldest_ts = slot.last_timestamp;
                oldest = i;
            }
        }
        oldest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ida::decode::decode;
    use crate::ida::synth::{burst_frame, BurstSpec};

    fn burst(da_ctr: u8, cont: bool, body: &[u8], ts: u64, freq: f64) -> IdaBurst {
        let frame = burst_frame(&BurstSpec {
            da_ctr,
            da_len: body.len(),
            cont,
            body,
            timestamp: ts,
            frequency: freq,
            ..BurstSpec::default()
        });
        decode(&frame).expect("synthesized burst decodes")
    }

    const T0: u64 = 1_700_000_000_000_000_000;
    const F0: f64 = 1_626_000_000.0;
    const MS: u64 = 1_000_000;

    #[test]
    fn test_two_burst_message_concatenates() {
        let mut r = IdaReassembler::new();
        let mut out: Vec<Vec<u8>> = Vec::new();

        let first = burst(0, true, b"AAAAAAAAAAAAAAAAAAAA", T0, F0);
        let second = burst(1, false, b"BBBBBBBBBB", T0 + 100 * MS, F0);

        assert!(!r.push(&first, |m| out.push(m.data.to_vec())));
        assert!(r.push(&second, |m| out.push(m.data.to_vec())));
        assert_eq!(out, vec![b"AAAAAAAAAAAAAAAAAAAABBBBBBBBBB".to_vec()]);
    }

    #[test]
    fn test_long_sequence_completeness() {
        // ctr 0..=9 wraps mod 8; gaps all below the timeout.
        let mut r = IdaReassembler::new();
        let mut out: Vec<Vec<u8>> = Vec::new();
        let mut expected = Vec::new();

        for i in 0..10u8 {
            let body = vec![b'a' + i; 5];
            expected.extend_from_slice(&body);
            let last = i == 9;
            let b = burst(i % 8, !last, &body, T0 + i as u64 * 200 * MS, F0);
            r.push(&b, |m| out.push(m.data.to_vec()));
        }
        assert_eq!(out, vec![expected]);
    }

    #[test]
    fn test_gap_over_timeout_breaks_stream() {
        let mut r = IdaReassembler::new();
        let mut emitted = 0;

        let first = burst(0, true, b"part1", T0, F0);
        let second = burst(1, false, b"part2", T0 + 300 * MS, F0);

        r.push(&first, |_| emitted += 1);
        r.push(&second, |_| emitted += 1);
        assert_eq!(emitted, 0);
    }

    #[test]
    fn test_flush_releases_stalled_slot() {
        let mut r = IdaReassembler::new();
        let first = burst(0, true, b"part1", T0, F0);
        r.push(&first, |_| {});
        r.flush(T0 + 300 * MS);

        // A fresh ctr=1 burst now has no stream to join.
        let mut emitted = 0;
        let second = burst(1, false, b"part2", T0 + 301 * MS, F0);
        r.push(&second, |_| emitted += 1);
        assert_eq!(emitted, 0);
    }

    #[test]
    fn test_single_burst_message_immediate() {
        let mut r = IdaReassembler::new();
        let mut out = Vec::new();
        let b = burst(0, false, b"solo", T0, F0);
        assert!(r.push(&b, |m| out.push(m.data.to_vec())));
        assert_eq!(out, vec![b"solo".to_vec()]);
    }

    #[test]
    fn test_crc_bad_burst_refused() {
        let frame = burst_frame(&BurstSpec {
            da_ctr: 0,
            da_len: 4,
            cont: false,
            body: b"oops",
            corrupt_crc: true,
            ..BurstSpec::default()
        });
        let b = decode(&frame).expect("burst");
        assert!(!b.crc_ok);

        let mut r = IdaReassembler::new();
        let mut emitted = 0;
        r.push(&b, |_| emitted += 1);
        assert_eq!(emitted, 0);
    }

    #[test]
    fn test_streams_on_distinct_frequencies_stay_separate() {
        let mut r = IdaReassembler::new();
        let mut out: Vec<Vec<u8>> = Vec::new();

        let a0 = burst(0, true, b"aa", T0, F0);
        let b0 = burst(0, true, b"bb", T0 + MS, F0 + 10_000.0);
        let a1 = burst(1, false, b"AA", T0 + 2 * MS, F0);
        let b1 = burst(1, false, b"BB", T0 + 3 * MS, F0 + 10_000.0);

        r.push(&a0, |m| out.push(m.data.to_vec()));
        r.push(&b0, |m| out.push(m.data.to_vec()));
        r.push(&a1, |m| out.push(m.data.to_vec()));
        r.push(&b1, |m| out.push(m.data.to_vec()));

        assert_eq!(out, vec![b"aaAA".to_vec(), b"bbBB".to_vec()]);
    }

    #[test]
    fn test_eviction_when_table_full() {
        let mut r = IdaReassembler::new();
        // Open 17 streams on distinct frequencies; the first (stalest) one
        // is evicted by the seventeenth.
        for i in 0..17u64 {
            let b = burst(0, true, b"x", T0 + i * MS, F0 + i as f64 * 1000.0);
            r.push(&b, |_| {});
        }
        // Completing stream 0 no longer works; completing stream 16 does.
        let mut emitted = 0;
        let fin0 = burst(1, false, b"y", T0 + 20 * MS, F0);
        r.push(&fin0, |_| emitted += 1);
        assert_eq!(emitted, 0);

        let fin16 = burst(1, false, b"y", T0 + 20 * MS, F0 + 16_000.0);
        r.push(&fin16, |_| emitted += 1);
        assert_eq!(emitted, 1);
    }
}
