//! Test to verify test infrastructure works correctly

mod common;

use common::builders::SampleBuilder;
use common::mock_helpers::{create_test_channels, encode_all};

#[test]
fn test_infrastructure_setup() {
    // Test that builders work
    let sample = SampleBuilder::new().input(0.25).setpoint(1.0).build();

    assert_eq!(sample.input, 0.25);
    assert_eq!(sample.setpoint, 1.0);
    assert_eq!(sample.d_term, 0.0);
}

#[test]
fn test_encode_all_is_back_to_back_frames() {
    let samples = [SampleBuilder::new().build(), SampleBuilder::new().input(3.0).build()];
    let bytes = encode_all(&samples);

    assert_eq!(bytes.iter().filter(|&&b| b == 0).count(), 2);
    assert_eq!(bytes.last(), Some(&0));
}

#[test]
fn test_channels() {
    let (tx, rx, _, _) = create_test_channels::<u32, ()>();
    tx.send(7).unwrap();
    assert_eq!(rx.try_recv(), Ok(7));
}

#[test]
fn test_float_comparison() {
    common::assert_float_eq(1.0, 1.0000001, 0.001);
}

#[test]
#[should_panic]
fn test_float_comparison_fails() {
    common::assert_float_eq(1.0, 2.0, 0.001);
}

#[test]
fn test_wait_until() {
    let mut calls = 0;
    assert!(common::wait_until(common::test_timeout(), || {
        calls += 1;
        calls >= 3
    }));
    assert!(!common::wait_until(std::time::Duration::from_millis(10), || false));
}
