//! ACARS frame parsing.
//!
//! ACARS rides inside SBD payloads as 7-bit characters with odd parity.
//! The frame is `0x01` marker, optional `0x03` opaque 8-byte header, the
//! parity-protected body, and a trailing CRC-16/Kermit suffix marked by
//! `0x7F`. Parity and CRC failures do not abort the parse; they are counted
//! so the output stage can suppress or tag the message.

use snafu::Snafu;

use crate::crc::crc16_kermit;

#[derive(Debug, Snafu)]
pub enum AcarsError {
    /// First byte is not the 0x01 ACARS marker
    #[snafu(display("frame does not start with the ACARS marker"))]
    MissingMarker,

    /// Not enough bytes for the fixed ACARS preamble
    #[snafu(display("frame too short for an ACARS block"))]
    TooShort,
}

/// One parsed ACARS message, parity already stripped.
#[derive(Debug, Clone)]
pub struct AcarsMessage {
    pub ul: bool,
    pub mode: u8,
    /// Aircraft registration with leading padding dots removed.
    pub tail: String,
    /// Raw acknowledge byte; 0x15 is NAK.
    pub ack: u8,
    pub label: [u8; 2],
    pub block_id: u8,
    /// True unless the text ended with ETB (more blocks follow).
    pub block_end: bool,
    /// Message sequence, uplink only.
    pub seq: Option<String>,
    /// Flight number, uplink only.
    pub flight: Option<String>,
    /// Free text following STX, possibly empty.
    pub text: Vec<u8>,
    /// Opaque 8-byte header preserved for output, never interpreted.
    pub header: Option<[u8; 8]>,
    /// CRC + parity violation count.
    pub errors: u32,
}

impl AcarsMessage {
    pub fn is_nak(&self) -> bool {
        self.ack == 0x15
    }
}

/// Parse an ACARS frame out of an SBD payload.
pub fn parse_acars(data: &[u8], ul: bool) -> Result<AcarsMessage, AcarsError> {
    if data.first() != Some(&0x01) {
        return Err(AcarsError::MissingMarker);
    }
    if data.len() <= 2 {
        return Err(AcarsError::TooShort);
    }
    let mut body = &data[1..];

    // CRC suffix: two check bytes followed by the 0x7F delimiter.
    let mut csum: Option<[u8; 2]> = None;
    if body.len() >= 3 && body[body.len() - 1] == 0x7F {
        csum = Some([body[body.len() - 3], body[body.len() - 2]]);
        body = &body[..body.len() - 3];
    }

    // Opaque header block.
    let mut header: Option<[u8; 8]> = None;
    if body.first() == Some(&0x03) && body.len() >= 8 {
        let mut hdr = [0u8; 8];
        hdr.copy_from_slice(&body[..8]);
        header = Some(hdr);
        body = &body[8..];
    }

    // The Kermit CRC covers the body (after the header) plus the two check
    // bytes; a clean message folds to 0.
    let crc_error = match csum {
        Some(csum) => {
            let mut buf = body.to_vec();
            buf.extend_from_slice(&csum);
            crc16_kermit(&buf) != 0
        }
        None => true,
    };

    if body.len() < 13 {
        return Err(AcarsError::TooShort);
    }

    // Strip bit 7 of every byte, verifying odd parity on the original.
    let mut parity_ok = true;
    let stripped: Vec<u8> = body
        .iter()
        .map(|&c| {
            if c.count_ones() % 2 == 0 {
                parity_ok = false;
            }
            c & 0x7F
        })
        .collect();

    let errors = crc_error as u32 + !parity_ok as u32;

    let mode = stripped[0];
    let reg: &[u8] = &stripped[1..8];
    let reg_trim = reg.iter().position(|&c| c != b'.').unwrap_or(reg.len());
    let tail = String::from_utf8_lossy(&reg[reg_trim..]).into_owned();

    let ack = stripped[8];
    let label = [stripped[9], stripped[10]];
    let block_id = stripped[11];

    let mut rest = &stripped[12..];
    let mut block_end = true;
    match rest.last() {
        Some(0x03) => rest = &rest[..rest.len() - 1],
        Some(0x17) => {
            block_end = false;
            rest = &rest[..rest.len() - 1];
        }
        _ => {}
    }

    let mut seq = None;
    let mut flight = None;
    let mut text = Vec::new();
    if rest.first() == Some(&0x02) {
        if ul && rest.len() >= 11 {
            seq = Some(String::from_utf8_lossy(&rest[1..5]).into_owned());
            flight = Some(String::from_utf8_lossy(&rest[5..11]).into_owned());
            text = rest[11..].to_vec();
        } else {
            text = rest[1..].to_vec();
        }
    }

    Ok(AcarsMessage {
        ul,
        mode,
        tail,
        ack,
        label,
        block_id,
        block_end,
        seq,
        flight,
        text,
        header,
        errors,
    })
}

/// Attach odd parity to a 7-bit character (test/synthesis helper).
pub fn with_odd_parity(c: u8) -> u8 {
    if (c & 0x7F).count_ones() % 2 == 0 {
        (c & 0x7F) | 0x80
    } else {
        c & 0x7F
    }
}
