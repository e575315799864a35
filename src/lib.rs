
pub mod bch;
pub mod crc;
pub mod frame;
pub mod ida;
pub mod lcw;
pub mod output;
pub mod receiver;
pub mod samples;
pub mod sbd;
pub mod tracing_init;
pub mod util;
pub mod voice;

pub use frame::{DemodFrame, Direction, VocData};
pub use ida::{IdaBurst, IdaReassembler};
pub use output::{LineSink, OutputConfig};
pub use receiver::Receiver;
pub use voice::{VoiceCall, VoiceDecoder};
