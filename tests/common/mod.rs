//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use tracecalc::is_undefined;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Assert two traces match sample by sample, treating undefined == undefined
pub fn assert_trace_eq(actual: &[f64], expected: &[f64]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "trace length {} != {}",
        actual.len(),
        expected.len()
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        if is_undefined(*e) {
            assert!(is_undefined(*a), "sample {}: expected undefined, got {}", i, a);
        } else {
            assert!(
                (a - e).abs() < 1e-9,
                "sample {}: expected {}, got {}",
                i,
                e,
                a
            );
        }
    }
}
