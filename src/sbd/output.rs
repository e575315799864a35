//! ACARS output formatting.
//!
//! Either one JSON object per message (compatible with common ACARS
//! feeders) or a single human-readable line. Timestamps map stream time
//! onto the wall clock captured at first-frame observation, so file replay
//! keeps the original spacing.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::acars::AcarsMessage;

/// Stream-time to wall-clock mapping for ACARS timestamps.
pub struct AcarsClock {
    anchor: Option<(DateTime<Utc>, u64)>,
}

impl AcarsClock {
    pub fn new() -> Self {
        Self { anchor: None }
    }

    /// Anchor the clock to a fixed wall time (deterministic replay/tests).
    pub fn with_wall_time(wall: DateTime<Utc>) -> Self {
        Self {
            anchor: Some((wall, u64::MAX)),
        }
    }

    fn format(&mut self, ts_ns: u64) -> String {
        let (wall_t0, first_ns) = self.anchor.get_or_insert_with(|| (Utc::now(), ts_ns));
        if *first_ns == u64::MAX {
            *first_ns = ts_ns;
        }
        let elapsed = ts_ns.saturating_sub(*first_ns) / 1_000_000_000;
        let wall = wall_t0.timestamp() + elapsed as i64;
        DateTime::from_timestamp(wall, 0)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string()
    }
}

impl Default for AcarsClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct AppSection {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct SourceSection<'a> {
    transport: &'static str,
    protocol: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    station_id: Option<&'a str>,
}

#[derive(Serialize)]
struct AcarsSection<'a> {
    timestamp: String,
    errors: u32,
    link_direction: &'static str,
    block_end: bool,
    mode: String,
    tail: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ack: Option<String>,
    label: String,
    block_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flight: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
struct AcarsRecord<'a> {
    app: AppSection,
    source: SourceSection<'a>,
    acars: AcarsSection<'a>,
    freq: u64,
    level: f64,
    header: String,
}

/// ACARS message sink: JSON or text form per configuration.
pub struct AcarsOutput {
    json: bool,
    station_id: Option<String>,
    clock: AcarsClock,
}

impl AcarsOutput {
    pub fn new(json: bool, station_id: Option<String>) -> Self {
        Self {
            json,
            station_id,
            clock: AcarsClock::new(),
        }
    }

    /// Replace the clock (deterministic tests).
    pub fn with_clock(mut self, clock: AcarsClock) -> Self {
        self.clock = clock;
        self
    }

    /// Format one message, or `None` when JSON mode suppresses it.
    ///
    /// JSON mode drops parity-/CRC-failed messages outright; text mode
    /// emits them with an `ERRORS` tag.
    pub fn format(
        &mut self,
        msg: &AcarsMessage,
        timestamp: u64,
        frequency: f64,
        magnitude: f32,
    ) -> Option<String> {
        if self.json && msg.errors > 0 {
            return None;
        }
        let ts = self.clock.format(timestamp);
        if self.json {
            self.format_json(msg, ts, frequency, magnitude)
        } else {
            Some(self.format_text(msg, ts))
        }
    }

    fn format_json(
        &self,
        msg: &AcarsMessage,
        timestamp: String,
        frequency: f64,
        magnitude: f32,
    ) -> Option<String> {
        let label = if msg.label == [b'_', 0x7F] {
            "_d".to_string()
        } else {
            String::from_utf8_lossy(&msg.label).into_owned()
        };
        let ack = if msg.ack == 0 {
            None
        } else if msg.is_nak() {
            Some("!".to_string())
        } else {
            Some(char::from(msg.ack).to_string())
        };
        let text = if msg.text.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&msg.text).into_owned())
        };
        let header = msg
            .header
            .map(|h| h.iter().map(|b| format!("{b:02x}")).collect())
            .unwrap_or_default();

        let record = AcarsRecord {
            app: AppSection {
                name: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            },
            source: SourceSection {
                transport: "iridium",
                protocol: "acars",
                station_id: self.station_id.as_deref(),
            },
            acars: AcarsSection {
                timestamp,
                errors: 0,
                link_direction: if msg.ul { "uplink" } else { "downlink" },
                block_end: msg.block_end,
                mode: char::from(msg.mode).to_string(),
                tail: &msg.tail,
                ack,
                label,
                block_id: char::from(msg.block_id).to_string(),
                message_number: if msg.ul { msg.seq.as_deref() } else { None },
                flight: if msg.ul { msg.flight.as_deref() } else { None },
                text,
            },
            freq: (frequency + 0.5) as u64,
            level: (magnitude as f64 * 100.0).round() / 100.0,
            header,
        };

        serde_json::to_string(&record).ok()
    }

    fn format_text(&self, msg: &AcarsMessage, timestamp: String) -> String {
        let mut out = String::new();

        let label = if msg.label == [b'_', 0x7F] {
            "_?".to_string()
        } else {
            String::from_utf8_lossy(&msg.label).into_owned()
        };

        out.push_str(&format!(
            "ACARS: {timestamp} {} Mode:{} REG:{:<7} ",
            if msg.ul { "UL" } else { "DL" },
            char::from(msg.mode),
            msg.tail,
        ));

        if msg.is_nak() {
            out.push_str("NAK  ");
        } else {
            out.push_str(&format!("ACK:{} ", char::from(msg.ack)));
        }

        out.push_str(&format!("Label:{label} bID:{} ", char::from(msg.block_id)));

        if let (Some(seq), Some(flight)) = (msg.seq.as_deref(), msg.flight.as_deref()) {
            out.push_str(&format!("SEQ:{seq} FNO:{flight} "));
        }
        if !msg.text.is_empty() {
            out.push('[');
            for &c in &msg.text {
                out.push(if (0x20..0x7F).contains(&c) {
                    char::from(c)
                } else {
                    '.'
                });
            }
            out.push(']');
        }

        if !msg.block_end {
            out.push_str(" CONT'd");
        }
        if msg.errors > 0 {
            out.push_str(" ERRORS");
        }

        out
    }
}
