//! SBD packet recognition and multi-packet reassembly.
//!
//! Short Burst Data rides inside reassembled IDA messages. Three framings
//! are recognized: 0x76-prefixed uplink packets (second byte 0x0C..0x0E),
//! 0x76-prefixed downlink packets (0x08..0x0B), and the 0x0600 hello
//! packet. Multi-packet messages are keyed by direction and message number
//! in an eight-slot table with a five-second stream-time expiry.

use tracing::trace;

use crate::frame::Direction;
use crate::ida::IdaMessage;
use crate::sbd::acars::parse_acars;
use crate::sbd::output::AcarsOutput;

/// Concurrent multi-packet SBD messages.
pub const SBD_MULTI_SLOTS: usize = 8;

/// Accumulated message capacity in bytes.
pub const SBD_MAX_DATA: usize = 1024;

/// Fragments older than this are expired.
pub const SBD_TIMEOUT_NS: u64 = 5_000_000_000;

struct MultiSlot {
    active: bool,
    /// Last accepted message number.
    msgno: i32,
    /// Expected total message count.
    msgcnt: i32,
    ul: bool,
    timestamp: u64,
    frequency: f64,
    magnitude: f32,
    data: [u8; SBD_MAX_DATA],
    len: usize,
}

impl MultiSlot {
    const EMPTY: MultiSlot = MultiSlot {
        active: false,
        msgno: 0,
        msgcnt: 0,
        ul: false,
        timestamp: 0,
        frequency: 0.0,
        magnitude: 0.0,
        data: [0; SBD_MAX_DATA],
        len: 0,
    };

    fn append(&mut self, bytes: &[u8]) {
        let take = bytes.len().min(SBD_MAX_DATA - self.len);
        self.data[self.len..self.len + take].copy_from_slice(&bytes[..take]);
        self.len += take;
    }
}

/// Parsed SBD packet: message number, expected count, payload.
struct SbdPacket<'a> {
    msgno: i32,
    msgcnt: i32,
    data: &'a [u8],
}

/// SBD extraction plus ACARS delivery.
pub struct SbdReassembler {
    slots: [MultiSlot; SBD_MULTI_SLOTS],
    output: AcarsOutput,
}

impl SbdReassembler {
    pub fn new(output: AcarsOutput) -> Self {
        Self {
            slots: [MultiSlot::EMPTY; SBD_MULTI_SLOTS],
            output,
        }
    }

    /// Consume one reassembled IDA message; returns a formatted ACARS line
    /// when a complete message was recognized and passed its checks.
    pub fn handle(&mut self, msg: &IdaMessage<'_>) -> Option<String> {
        let ul = msg.direction == Direction::Uplink;
        let packet = recognize(msg.data, ul)?;

        self.expire(msg.timestamp);

        if packet.msgno == 0 {
            // Short/mailbox-check message.
            if packet.data.is_empty() {
                return None;
            }
            return self.deliver(packet.data, ul, msg.timestamp, msg.frequency, msg.magnitude);
        }

        if packet.msgcnt == 1 && packet.msgno == 1 {
            // Single complete message.
            return self.deliver(packet.data, ul, msg.timestamp, msg.frequency, msg.magnitude);
        }

        if packet.msgcnt > 1 && packet.msgno == 1 {
            // First fragment: open a slot, evicting the oldest if needed.
            let idx = self.free_or_oldest();
            let slot = &mut self.slots[idx];
            slot.active = true;
            slot.msgno = packet.msgno;
            slot.msgcnt = packet.msgcnt;
            slot.ul = ul;
            slot.timestamp = msg.timestamp;
            slot.frequency = msg.frequency;
            slot.magnitude = msg.magnitude;
            slot.len = 0;
            slot.append(packet.data);
            return None;
        }

        if packet.msgno > 1 {
            // Continuation: newest matching slot wins.
            let mut completed: Option<(Vec<u8>, f64, f32)> = None;
            let mut matched = false;
            for slot in self.slots.iter_mut().rev() {
                if !slot.active || slot.ul != ul || packet.msgno != slot.msgno + 1 {
                    continue;
                }
                slot.append(packet.data);
                slot.msgno = packet.msgno;
                slot.timestamp = msg.timestamp;

                if packet.msgno == slot.msgcnt {
                    completed = Some((
                        slot.data[..slot.len].to_vec(),
                        slot.frequency,
                        slot.magnitude,
                    ));
                    slot.active = false;
                }
                matched = true;
                break;
            }
            if let Some((data, freq, mag)) = completed {
                return self.deliver(&data, ul, msg.timestamp, freq, mag);
            }
            if !matched {
                trace!(msgno = packet.msgno, "orphan SBD fragment dropped");
            }
        }

        None
    }

    fn deliver(
        &mut self,
        data: &[u8],
        ul: bool,
        timestamp: u64,
        frequency: f64,
        magnitude: f32,
    ) -> Option<String> {
        match parse_acars(data, ul) {
            Ok(msg) => self.output.format(&msg, timestamp, frequency, magnitude),
            Err(err) => {
                trace!(%err, "SBD payload is not ACARS");
                None
            }
        }
    }

    fn expire(&mut self, now_ns: u64) {
        for slot in self.slots.iter_mut() {
            if slot.active && now_ns > slot.timestamp + SBD_TIMEOUT_NS {
                trace!("multi-packet SBD slot expired");
                slot.active = false;
            }
        }
    }

    fn free_or_oldest(&self) -> usize {
        for (i, slot) in self.slots.iter().enumerate() {
            if !slot.active {
                return i;
            }
        }
        let mut oldest = 0;
        let mut oldest_ts = u64::MAX;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.timestamp < oldest_ts {
                oldest_ts = slot.timestamp;
                oldest = i;
            }
        }
        oldest
    }
}

/// Recognize SBD framing and split out one packet.
fn recognize(data: &[u8], ul: bool) -> Option<SbdPacket<'_>> {
    if data.len() < 5 {
        return None;
    }

    let is_76 = data[0] == 0x76
        && data[1] != 0x05
        && if ul {
            (0x0C..=0x0E).contains(&data[1])
        } else {
            (0x08..=0x0B).contains(&data[1])
        };
    let is_hello = data[0] == 0x06
        && data[1] == 0x00
        && matches!(data[2], 0x00 | 0x10 | 0x20 | 0x40 | 0x50 | 0x70);
    if !is_76 && !is_hello {
        return None;
    }

    let typ1 = data[1];
    let mut rest = &data[2..];

    if is_hello {
        // 29-byte pre-header; message count at offset 15.
        if rest.len() < 30 || rest[0] != 0x20 {
            return None;
        }
        let msgcnt = rest[15] as i32;
        let msgno = if msgcnt == 0 { 0 } else { 1 };
        return Some(SbdPacket {
            msgno,
            msgcnt,
            data: &rest[29..],
        });
    }

    let mut msgcnt: i32 = -1;
    if typ1 == 0x08 {
        // Downlink data packet: variable-length pre-header.
        if rest.len() < 5 {
            return None;
        }
        let prehdr_len = match rest[0] {
            0x26 => 7,
            0x20 => 5,
            _ => 7,
        };
        if rest.len() < prehdr_len {
            return None;
        }
        msgcnt = rest[3] as i32;
        rest = &rest[prehdr_len..];
    }

    // Uplink ack/nack marker.
    if ul && rest.len() >= 3 && (rest[0] == 0x50 || rest[0] == 0x51) {
        rest = &rest[3..];
    }

    if rest.is_empty() {
        return Some(SbdPacket {
            msgno: 0,
            msgcnt,
            data: rest,
        });
    }

    // Data header: 0x10 <len> <msgno>.
    if rest.len() > 3 && rest[0] == 0x10 {
        let pkt_len = rest[1] as usize;
        let msgno = rest[2] as i32;
        let body = &rest[3..];
        if body.len() < pkt_len {
            return None;
        }
        return Some(SbdPacket {
            msgno,
            msgcnt,
            data: &body[..pkt_len],
        });
    }

    Some(SbdPacket {
        msgno: 0,
        msgcnt,
        data: rest,
    })
}
