//! Receive pipeline glue.
//!
//! Runs on the demodulation thread: each frame gets a RAW line, an IDA
//! decode attempt, a parsed line, and (in ACARS mode) a pass through the
//! reassembly chain. The voice path is fed separately by the external VOC
//! decoder and shares its archive across threads.

use std::sync::Arc;

use crate::frame::{DemodFrame, VocData};
use crate::ida::{self, IdaReassembler};
use crate::output::{FrameOutput, LineSink, OutputConfig, StdoutSink};
use crate::sbd::{AcarsOutput, SbdReassembler};
use crate::voice::{AmbeDecoder, VoiceDecoder};

/// The receiver core: IDA decode, reassembly, SBD/ACARS, voice entry point.
pub struct Receiver {
    output: FrameOutput,
    ida: IdaReassembler,
    sbd: SbdReassembler,
    acars_enabled: bool,
    voice: Option<Arc<VoiceDecoder>>,
    sinks: Vec<Box<dyn LineSink>>,
}

impl Receiver {
    /// Build a receiver without a voice path, writing lines to stdout.
    pub fn new(config: OutputConfig) -> Self {
        let acars = AcarsOutput::new(config.acars_json, config.station_id.clone());
        Self {
            output: FrameOutput::new(&config),
            ida: IdaReassembler::new(),
            sbd: SbdReassembler::new(acars),
            acars_enabled: config.acars_enabled,
            voice: None,
            sinks: vec![Box::new(StdoutSink)],
        }
    }

    /// Build a receiver with an attached AMBE codec for voice decoding.
    pub fn with_voice(config: OutputConfig, ambe: Box<dyn AmbeDecoder>) -> Self {
        let mut rx = Self::new(config);
        rx.voice = Some(Arc::new(VoiceDecoder::new(ambe)));
        rx
    }

    /// Replace the output sinks (tests, embedding without stdout).
    pub fn set_sinks(&mut self, sinks: Vec<Box<dyn LineSink>>) {
        self.sinks = sinks;
    }

    /// Add a sink that receives every RAW/IDA/ACARS line (e.g. a publish
    /// transport).
    pub fn add_sink(&mut self, sink: Box<dyn LineSink>) {
        self.sinks.push(sink);
    }

    /// Shared handle to the voice archive, if a codec is attached.
    pub fn voice(&self) -> Option<Arc<VoiceDecoder>> {
        self.voice.clone()
    }

    /// Process one demodulated frame.
    pub fn handle_frame(&mut self, frame: &DemodFrame) {
        // Stream time advances with every frame; sweep stalled reassembly.
        self.ida.flush(frame.timestamp);

        if let Some(line) = self.output.raw_line(frame) {
            self.publish(&line);
        }

        let Some(burst) = ida::decode(frame) else {
            return;
        };

        if let Some(line) = self.output.ida_line(&burst) {
            self.publish(&line);
        }

        if self.acars_enabled {
            let Receiver { ida, sbd, sinks, .. } = self;
            ida.push(&burst, |msg| {
                if let Some(line) = sbd.handle(&msg) {
                    for sink in sinks.iter_mut() {
                        sink.publish(&line);
                    }
                }
            });
        }
    }

    /// Feed one VOC superframe into the voice clusterer.
    pub fn handle_voc(&mut self, voc: &VocData) {
        if let Some(voice) = &self.voice {
            voice.add_frame(voc);
        }
    }

    /// Finalize in-progress voice calls on shutdown.
    pub fn shutdown(&mut self) {
        if let Some(voice) = &self.voice {
            voice.flush();
        }
    }

    fn publish(&mut self, line: &str) {
        for sink in self.sinks.iter_mut() {
            sink.publish(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ida::synth::{burst_frame, BurstSpec};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct CaptureSink(Rc<RefCell<Vec<String>>>);

    impl LineSink for CaptureSink {
        fn publish(&mut self, line: &str) {
            self.0.borrow_mut().push(line.to_string());
        }
    }

    fn capture(rx: &mut Receiver) -> Rc<RefCell<Vec<String>>> {
        let lines = Rc::new(RefCell::new(Vec::new()));
        rx.set_sinks(vec![Box::new(CaptureSink(lines.clone()))]);
        lines
    }

    #[test]
    fn test_frame_produces_raw_and_ida_lines() {
        let mut rx = Receiver::new(OutputConfig::default());
        let lines = capture(&mut rx);

        rx.handle_frame(&burst_frame(&BurstSpec {
            da_len: 4,
            cont: false,
            body: b"ping",
            ..BurstSpec::default()
        }));

        let lines = lines.borrow();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("RAW: "));
        assert!(lines[1].starts_with("IDA: "));
    }

    #[test]
    fn test_acars_mode_suppresses_raw() {
        let mut rx = Receiver::new(OutputConfig {
            acars_enabled: true,
            ..OutputConfig::default()
        });
        let lines = capture(&mut rx);

        rx.handle_frame(&burst_frame(&BurstSpec {
            da_len: 4,
            cont: false,
            body: b"ping",
            ..BurstSpec::default()
        }));

        let lines = lines.borrow();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("IDA: "));
    }

    #[test]
    fn test_non_ida_frame_is_silent() {
        let mut rx = Receiver::new(OutputConfig {
            diagnostic_mode: true,
            ..OutputConfig::default()
        });
        let lines = capture(&mut rx);
        rx.handle_frame(&burst_frame(&BurstSpec {
            ft: 1,
            ..BurstSpec::default()
        }));
        assert!(lines.borrow().is_empty());
    }
}
