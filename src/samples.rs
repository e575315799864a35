//! Capture-side interfaces: tagged sample buffers, the bounded queue
//! between capture and demodulation, and the cooperative run flag.
//!
//! The SDR backends themselves live outside this crate; they produce
//! [`SampleBuf`] values and push them through a [`SampleProducer`]. The
//! queue is the only blocking point in the pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver as ChannelReceiver, SyncSender, TrySendError};
use std::sync::Arc;

use num::complex::{Complex, Complex32};
use snafu::Snafu;

/// One capture buffer, tagged by sample format.
///
/// The format discriminator is part of the type: complex int8 (most
/// hardware-native framings) or complex float pairs.
pub enum SampleBuf {
    Ci8 {
        samples: Vec<Complex<i8>>,
        /// Hardware timestamp of the first sample, when the driver has one.
        hw_time_ns: Option<u64>,
    },
    Cf32 {
        samples: Vec<Complex32>,
        hw_time_ns: Option<u64>,
    },
}

impl SampleBuf {
    pub fn len(&self) -> usize {
        match self {
            SampleBuf::Ci8 { samples, .. } => samples.len(),
            SampleBuf::Cf32 { samples, .. } => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hw_time_ns(&self) -> Option<u64> {
        match self {
            SampleBuf::Ci8 { hw_time_ns, .. } | SampleBuf::Cf32 { hw_time_ns, .. } => *hw_time_ns,
        }
    }
}

/// The demodulation side has hung up.
#[derive(Debug, Snafu)]
#[snafu(display("sample queue consumer is gone"))]
pub struct QueueClosed;

/// Capture-thread handle; `push_samples` blocks when the queue is full.
pub struct SampleProducer {
    tx: SyncSender<SampleBuf>,
}

impl SampleProducer {
    /// Enqueue one buffer, blocking for backpressure.
    pub fn push_samples(&self, buf: SampleBuf) -> Result<(), QueueClosed> {
        self.tx.send(buf).map_err(|_| QueueClosed)
    }

    /// Enqueue without blocking; the buffer comes back when the queue is
    /// full (drivers that must not stall prefer dropping).
    pub fn try_push_samples(&self, buf: SampleBuf) -> Result<(), Option<SampleBuf>> {
        match self.tx.try_send(buf) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(buf)) => Err(Some(buf)),
            Err(TrySendError::Disconnected(_)) => Err(None),
        }
    }
}

/// Demodulation-thread handle.
pub struct SampleConsumer {
    rx: ChannelReceiver<SampleBuf>,
}

impl SampleConsumer {
    /// Dequeue the next buffer; `None` once every producer is gone.
    pub fn pop(&self) -> Option<SampleBuf> {
        self.rx.recv().ok()
    }
}

/// Bounded FIFO between one capture thread and the demodulator.
pub fn sample_queue(depth: usize) -> (SampleProducer, SampleConsumer) {
    let (tx, rx) = sync_channel(depth);
    (SampleProducer { tx }, SampleConsumer { rx })
}

/// Cooperative shutdown flag, shared across threads.
///
/// The signal handler flips it; long-running loops poll it.
#[derive(Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn request_stop(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_fifo_order() {
        let (tx, rx) = sample_queue(4);
        for n in 0..3 {
            tx.push_samples(SampleBuf::Ci8 {
                samples: vec![Complex::new(n as i8, 0); 16],
                hw_time_ns: Some(n),
            })
            .expect("push");
        }
        drop(tx);
        let mut seen = Vec::new();
        while let Some(buf) = rx.pop() {
            seen.push(buf.hw_time_ns().expect("tagged"));
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_try_push_full_returns_buffer() {
        let (tx, rx) = sample_queue(1);
        tx.push_samples(SampleBuf::Cf32 {
            samples: vec![Complex32::new(0.0, 0.0); 8],
            hw_time_ns: None,
        })
        .expect("push");
        let back = tx.try_push_samples(SampleBuf::Cf32 {
            samples: Vec::new(),
            hw_time_ns: None,
        });
        assert!(matches!(back, Err(Some(_))));
        drop(rx);
    }

    #[test]
    fn test_push_after_consumer_drop_fails() {
        let (tx, rx) = sample_queue(1);
        drop(rx);
        assert!(tx
            .push_samples(SampleBuf::Ci8 {
                samples: Vec::new(),
                hw_time_ns: None,
            })
            .is_err());
    }

    #[test]
    fn test_run_flag() {
        let flag = RunFlag::new();
        let other = flag.clone();
        assert!(flag.is_running());
        other.request_stop();
        assert!(!flag.is_running());
    }
}
