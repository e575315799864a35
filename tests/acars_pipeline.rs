//! End-to-end: demodulated frames through IDA reassembly to ACARS output.

mod common;

use common::{acars_frame, capture, sbd_dl_packet};
use rustyiridium::ida::synth::{burst_frame, BurstSpec};
use rustyiridium::{OutputConfig, Receiver};

const T0: u64 = 1_700_000_000_000_000_000;
const MS: u64 = 1_000_000;

/// Split an SBD packet into successive DA bursts of up to 20 bytes.
fn frames_for(packet: &[u8], t0: u64) -> Vec<rustyiridium::DemodFrame> {
    let chunks: Vec<&[u8]> = packet.chunks(20).collect();
    chunks
        .iter()
        .enumerate()
        .map(|(i, &chunk)| {
            burst_frame(&BurstSpec {
                da_ctr: (i % 8) as u8,
                da_len: chunk.len(),
                cont: i + 1 < chunks.len(),
                body: chunk,
                timestamp: t0 + i as u64 * 90 * MS,
                ..BurstSpec::default()
            })
        })
        .collect()
}

fn acars_receiver(json: bool) -> Receiver {
    Receiver::new(OutputConfig {
        acars_enabled: true,
        acars_json: json,
        station_id: Some("test1".into()),
        ..OutputConfig::default()
    })
}

#[test]
fn downlink_acars_to_json() {
    let mut rx = acars_receiver(true);
    let (lines, sink) = capture();
    rx.set_sinks(vec![sink]);

    let payload = acars_frame(b'2', b".N12345", b"H1", b'A', b"HELLO");
    let packet = sbd_dl_packet(1, 1, &payload);
    for frame in frames_for(&packet, T0) {
        rx.handle_frame(&frame);
    }

    let lines = lines.borrow();
    let json_lines: Vec<&String> = lines.iter().filter(|l| l.starts_with('{')).collect();
    assert_eq!(json_lines.len(), 1);

    let v: serde_json::Value = serde_json::from_str(json_lines[0]).expect("json");
    assert_eq!(v["acars"]["mode"], "2");
    assert_eq!(v["acars"]["tail"], "N12345");
    assert_eq!(v["acars"]["label"], "H1");
    assert_eq!(v["acars"]["block_id"], "A");
    assert_eq!(v["acars"]["text"], "HELLO");
    assert_eq!(v["acars"]["block_end"], true);
    assert_eq!(v["acars"]["errors"], 0);
    assert_eq!(v["acars"]["link_direction"], "downlink");
    assert_eq!(v["source"]["station_id"], "test1");
    assert_eq!(v["source"]["transport"], "iridium");
    assert_eq!(v["source"]["protocol"], "acars");

    // RAW lines are suppressed in ACARS mode; IDA lines are not.
    assert!(lines.iter().all(|l| !l.starts_with("RAW: ")));
    assert!(lines.iter().any(|l| l.starts_with("IDA: ")));
}

#[test]
fn multi_burst_multi_packet_message() {
    // An ACARS message long enough to need two SBD packets, each of which
    // spans several DA bursts.
    let mut rx = acars_receiver(true);
    let (lines, sink) = capture();
    rx.set_sinks(vec![sink]);

    let text = b"THIS MESSAGE DOES NOT FIT IN A SINGLE SHORT BURST DATA PACKET";
    let payload = acars_frame(b'2', b".N98765", b"Q0", b'B', text);
    let (a, b) = payload.split_at(payload.len() / 2);

    let mut t = T0;
    for packet in [sbd_dl_packet(1, 2, a), sbd_dl_packet(2, 2, b)] {
        for frame in frames_for(&packet, t) {
            rx.handle_frame(&frame);
        }
        t += 1_000 * MS;
    }

    let lines = lines.borrow();
    let json_lines: Vec<&String> = lines.iter().filter(|l| l.starts_with('{')).collect();
    assert_eq!(json_lines.len(), 1);
    let v: serde_json::Value = serde_json::from_str(json_lines[0]).expect("json");
    assert_eq!(
        v["acars"]["text"],
        "THIS MESSAGE DOES NOT FIT IN A SINGLE SHORT BURST DATA PACKET"
    );
    assert_eq!(v["acars"]["tail"], "N98765");
}

#[test]
fn text_mode_single_line() {
    let mut rx = acars_receiver(false);
    let (lines, sink) = capture();
    rx.set_sinks(vec![sink]);

    let payload = acars_frame(b'2', b".N12345", b"H1", b'A', b"HELLO");
    let packet = sbd_dl_packet(1, 1, &payload);
    for frame in frames_for(&packet, T0) {
        rx.handle_frame(&frame);
    }

    let lines = lines.borrow();
    let acars: Vec<&String> = lines.iter().filter(|l| l.starts_with("ACARS: ")).collect();
    assert_eq!(acars.len(), 1);
    assert!(acars[0].contains("DL Mode:2 REG:N12345 "));
    assert!(acars[0].contains("Label:H1 bID:A "));
    assert!(acars[0].contains("[HELLO]"));
    assert!(!acars[0].contains("ERRORS"));
}

#[test]
fn replaying_a_sequence_delivers_once_per_replay() {
    let mut rx = acars_receiver(true);
    let (lines, sink) = capture();
    rx.set_sinks(vec![sink]);

    let payload = acars_frame(b'2', b".N11111", b"5Z", b'C', b"ONCE");
    let packet = sbd_dl_packet(1, 1, &payload);

    for round in 0..2u64 {
        for frame in frames_for(&packet, T0 + round * 10_000 * MS) {
            rx.handle_frame(&frame);
        }
    }

    let lines = lines.borrow();
    let json_lines = lines.iter().filter(|l| l.starts_with('{')).count();
    assert_eq!(json_lines, 2);
}
