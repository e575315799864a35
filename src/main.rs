use std::cell::RefCell;
use std::rc::Rc;

use rustyiridium::ida::synth::{burst_frame, BurstSpec};
use rustyiridium::output::{LineSink, OutputConfig};
use rustyiridium::{Receiver, tracing_init};

struct CollectSink(Rc<RefCell<Vec<String>>>);

impl LineSink for CollectSink {
    fn publish(&mut self, line: &str) {
        self.0.borrow_mut().push(line.to_string());
    }
}

fn main() {
    tracing_init::init_tracing();

    // Run one synthesized DA burst through the pipeline as a smoke demo.
    let mut rx = Receiver::new(OutputConfig::from_env());
    let lines = Rc::new(RefCell::new(Vec::new()));
    rx.set_sinks(vec![Box::new(CollectSink(lines.clone()))]);

    rx.handle_frame(&burst_frame(&BurstSpec {
        da_ctr: 0,
        da_len: 5,
        cont: false,
        body: b"hello",
        ..BurstSpec::default()
    }));

    for line in lines.borrow().iter() {
        println!("{line}");
    }
}
