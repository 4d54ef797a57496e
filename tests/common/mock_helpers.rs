//! Mock construction helpers

use tracecalc::{MemorySource, PositionKey, SyntheticPattern, SyntheticSource};

/// Synthetic source with a sine default pattern
pub fn create_test_source() -> SyntheticSource {
    SyntheticSource::new().with_default_pattern(SyntheticPattern::Sine {
        frequency: 0.05,
        amplitude: 100.0,
        offset: 0.0,
    })
}

/// Memory source holding the same trace for `source` at every position
pub fn uniform_source(
    source: &str,
    positions: &[PositionKey],
    start: usize,
    samples: &[f64],
) -> MemorySource {
    positions.iter().fold(MemorySource::new(), |src, position| {
        src.with_trace(source, *position, start, samples.to_vec())
    })
}
