//! SBD framing recognition and the ACARS application layer.

pub mod acars;
pub mod extract;
pub mod output;

pub use acars::{parse_acars, AcarsError, AcarsMessage};
pub use extract::SbdReassembler;
pub use output::{AcarsClock, AcarsOutput};
