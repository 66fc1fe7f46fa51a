//! Mock construction helpers

use crossbeam_channel::{bounded, Receiver, Sender};
use pidvis_rs::backend::SimulatedTransport;
use pidvis_rs::protocol::encode_sample;
use pidvis_rs::TelemetrySample;

/// Create test channels with default size
pub fn create_test_channels<T, U>() -> (Sender<T>, Receiver<T>, Sender<U>, Receiver<U>) {
    let (tx1, rx1) = bounded(16);
    let (tx2, rx2) = bounded(16);
    (tx1, rx1, tx2, rx2)
}

/// Wire bytes for a run of samples, back to back
pub fn encode_all(samples: &[TelemetrySample]) -> Vec<u8> {
    samples.iter().flat_map(encode_sample).collect()
}

/// Simulated link that serves the given samples once
pub fn create_scripted_transport(samples: &[TelemetrySample]) -> SimulatedTransport {
    SimulatedTransport::scripted(encode_all(samples))
}
