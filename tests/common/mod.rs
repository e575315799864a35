//! Shared builders for the scenario tests.

use rustyiridium::crc::crc16_kermit;
use rustyiridium::output::LineSink;
use rustyiridium::sbd::acars::with_odd_parity;
use std::cell::RefCell;
use std::rc::Rc;

/// Line sink that collects everything the receiver emits.
pub struct CaptureSink(pub Rc<RefCell<Vec<String>>>);

impl LineSink for CaptureSink {
    fn publish(&mut self, line: &str) {
        self.0.borrow_mut().push(line.to_string());
    }
}

pub fn capture() -> (Rc<RefCell<Vec<String>>>, Box<dyn LineSink>) {
    let lines = Rc::new(RefCell::new(Vec::new()));
    (lines.clone(), Box::new(CaptureSink(lines)))
}

/// A framed ACARS message: marker, parity-protected body, Kermit CRC.
pub fn acars_frame(mode: u8, reg: &[u8; 7], label: &[u8; 2], block_id: u8, text: &[u8]) -> Vec<u8> {
    let mut body = vec![mode];
    body.extend_from_slice(reg);
    body.push(b'A'); // ack
    body.extend_from_slice(label);
    body.push(block_id);
    body.push(0x02);
    body.extend_from_slice(text);
    body.push(0x03);

    let body: Vec<u8> = body.iter().map(|&c| with_odd_parity(c)).collect();
    let crc = crc16_kermit(&body);
    let mut out = vec![0x01];
    out.extend_from_slice(&body);
    out.extend_from_slice(&crc.to_le_bytes());
    out.push(0x7F);
    out
}

/// Downlink SBD data packet (0x76 0x08) wrapping `chunk` with the 0x10
/// data header.
pub fn sbd_dl_packet(msgno: u8, msgcnt: u8, chunk: &[u8]) -> Vec<u8> {
    let mut out = vec![0x76, 0x08];
    out.extend_from_slice(&[0x20, 0x00, 0x00, msgcnt, 0x00]);
    out.push(0x10);
    out.push(chunk.len() as u8);
    out.push(msgno);
    out.extend_from_slice(chunk);
    out
}
