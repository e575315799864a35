//! RAW and parsed IDA line output.
//!
//! Line grammars follow the iridium-toolkit conventions so downstream
//! parsers keep working: one `RAW:` line per demodulated frame and one
//! `IDA:` line per decoded burst, with fixed field widths throughout.

use std::env;
use std::io::{self, Write};

use crate::frame::DemodFrame;
use crate::ida::IdaBurst;
use crate::util::bits::byte_at;

/// Receiver output configuration.
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Suppress RAW and IDA stdout lines.
    pub diagnostic_mode: bool,
    /// Run the SBD/ACARS stage (also suppresses RAW lines).
    pub acars_enabled: bool,
    /// Emit ACARS as JSON instead of text.
    pub acars_json: bool,
    /// Station identifier for the ACARS JSON source section.
    pub station_id: Option<String>,
    /// Override the auto-generated `file_info` prefix.
    pub file_info: Option<String>,
}

fn env_flag(name: &str) -> bool {
    matches!(env::var(name), Ok(v) if !v.is_empty() && v != "0")
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl OutputConfig {
    /// Read the configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            diagnostic_mode: env_flag("IRIDIUM_DIAGNOSTIC"),
            acars_enabled: env_flag("IRIDIUM_ACARS"),
            acars_json: env_flag("IRIDIUM_ACARS_JSON"),
            station_id: env_string("IRIDIUM_STATION_ID"),
            file_info: env_string("IRIDIUM_FILE_INFO"),
        }
    }
}

/// Consumer of output lines (stdout, publish transports, test capture).
///
/// Lines arrive without a trailing newline.
pub trait LineSink {
    fn publish(&mut self, line: &str);
}

/// Stdout sink with per-line flush.
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn publish(&mut self, line: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

/// RAW/IDA line formatter with first-frame time anchoring.
pub struct FrameOutput {
    diagnostic_mode: bool,
    acars_enabled: bool,
    file_info: Option<String>,
    t0: Option<u64>,
}

impl FrameOutput {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            diagnostic_mode: config.diagnostic_mode,
            acars_enabled: config.acars_enabled,
            file_info: config.file_info.clone().filter(|s| !s.is_empty()),
            t0: None,
        }
    }

    /// Anchor `t0` to the first observed timestamp, truncated to seconds,
    /// and auto-generate `file_info` if the operator supplied none.
    fn init(&mut self, timestamp: u64) -> u64 {
        match self.t0 {
            Some(t0) => t0,
            None => {
                let t0 = (timestamp / 1_000_000_000) * 1_000_000_000;
                if self.file_info.is_none() {
                    self.file_info = Some(format!("i-{}-t1", t0 / 1_000_000_000));
                }
                self.t0 = Some(t0);
                t0
            }
        }
    }

    /// Format the RAW line for one frame, unless suppressed.
    pub fn raw_line(&mut self, frame: &DemodFrame) -> Option<String> {
        if self.diagnostic_mode || self.acars_enabled {
            return None;
        }
        let t0 = self.init(frame.timestamp);
        let ts_ms = frame.timestamp.saturating_sub(t0) as f64 / 1e6;
        let freq_hz = (frame.center_frequency + 0.5) as i64;

        let mut line = format!(
            "RAW: {} {:012.4} {:010} N:{:05.2}{:+06.2} I:{:011} {:3}% {:.5} {:3} ",
            self.file_info.as_deref().unwrap_or(""),
            ts_ms,
            freq_hz,
            frame.magnitude,
            frame.noise,
            frame.id,
            frame.confidence,
            frame.level,
            frame.n_symbols,
        );
        line.extend(frame.bits.iter().by_vals().map(|b| if b { '1' } else { '0' }));
        Some(line)
    }

    /// Format the parsed IDA line for one burst, unless suppressed.
    pub fn ida_line(&mut self, burst: &IdaBurst) -> Option<String> {
        if self.diagnostic_mode {
            return None;
        }
        let t0 = self.init(burst.timestamp);
        let parsed_info = format!("p-{}", t0 / 1_000_000_000);
        let ts_ms = burst.timestamp.saturating_sub(t0) as f64 / 1e6;
        let freq_hz = (burst.frequency + 0.5) as i64;
        let leveldb = if burst.level > 0.0 {
            20.0 * (burst.level as f64).log10()
        } else {
            -99.99
        };

        let mut line = format!(
            "IDA: {} {:014.4} {:010} {:3}% {:06.2}|{:07.2}|{:05.2} {:3} {} ",
            parsed_info,
            ts_ms,
            freq_hz,
            burst.confidence,
            leveldb,
            burst.noise,
            burst.magnitude,
            burst.n_symbols,
            burst.direction.as_str(),
        );
        line.push_str(&burst.lcw_header);

        let bs = &burst.bch;
        let bit = |i: usize| if bs[i] { '1' } else { '0' };

        line.push(bit(0));
        line.push(bit(1));
        line.push(bit(2));
        line.push_str(" cont=");
        line.push(bit(3));
        line.push(' ');
        line.push(bit(4));
        line.push_str(" ctr=");
        line.push(bit(5));
        line.push(bit(6));
        line.push(bit(7));
        line.push(' ');
        line.push(bit(8));
        line.push(bit(9));
        line.push(bit(10));
        line.push_str(&format!(" len={:02}", burst.da_len));
        line.push_str(" 0:");
        line.push(bit(16));
        line.push(bit(17));
        line.push(bit(18));
        line.push(bit(19));

        // Hex dump: only da_len bytes when the tail is all zero, otherwise
        // all 20 with a '!' separator at the length boundary.
        let tail_start = (burst.da_len + 1).min(burst.payload.len());
        let all_zero = burst.payload[tail_start..].iter().all(|&b| b == 0);
        let nbytes = if burst.da_len > 0 && all_zero {
            burst.da_len
        } else {
            burst.payload.len()
        };

        line.push_str(" [");
        for i in 0..nbytes {
            if i > 0 {
                let boundary = burst.da_len > 0 && !all_zero && i == burst.da_len;
                line.push(if boundary { '!' } else { '.' });
            }
            line.push_str(&format!("{:02x}", burst.payload[i]));
        }
        line.push(']');

        // Pad the hex field (including the bracket) to 60 columns.
        let hexlen = nbytes * 3;
        for _ in hexlen..60 {
            line.push(' ');
        }

        if burst.da_len > 0 {
            line.push_str(&format!(" {:04x}/{:04x}", burst.stored_crc, burst.computed_crc));
            line.push_str(if burst.crc_ok { " CRC:OK" } else { " CRC:no" });
        } else {
            line.push_str("  ---   ");
        }

        // Trailing bits past the CRC, preserved verbatim.
        if bs.len() > 196 {
            line.push(' ');
            for i in 196..bs.len() {
                line.push(bit(i));
            }
        } else {
            line.push_str(" 0000");
        }

        // Printable ASCII preview of the payload region.
        if burst.da_len > 0 && bs.len() >= 180 {
            line.push_str(" SBD: ");
            for i in 0..20 {
                let byte = byte_at(bs, 20 + i * 8);
                line.push(if (32..127).contains(&byte) {
                    char::from(byte)
                } else {
                    '.'
                });
            }
        }

        Some(line)
    }
}
