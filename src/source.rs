//! Data sources: where providers fetch their input traces from.
//!
//! The volume store that serves real traces lives outside this crate and
//! plugs in through the [`DataSource`] trait. Two implementations ship
//! here:
//!
//! - [`MemorySource`] - explicit buffers per (source, position)
//! - [`SyntheticSource`] - deterministic pattern generator, for demos,
//!   benchmarks and tests
//!
//! # Synthetic patterns
//!
//! - [`SyntheticPattern::Constant`] - fixed value
//! - [`SyntheticPattern::Sine`] - sine over the sample index, phase-shifted per position
//! - [`SyntheticPattern::Ramp`] - sample index times a slope plus the inline number
//! - [`SyntheticPattern::Square`] - alternating +/- amplitude
//! - [`SyntheticPattern::Sawtooth`] - linear ramp that resets every period

use crate::types::{PositionKey, SampleInterval, TraceBuffer, UNDEFINED_SAMPLE};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One bound input of a provider, as seen by a data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputRef {
    /// Index of the input slot in the descriptor
    pub slot: usize,
    /// Label of the input slot
    pub label: String,
    /// Bound data-source reference
    pub source: String,
}

/// Supplier of input traces.
///
/// Returning `None` means the input is unavailable at this position.
#[cfg_attr(test, mockall::automock)]
pub trait DataSource: Send + Sync {
    fn fetch(
        &self,
        input: &InputRef,
        position: PositionKey,
        interval: SampleInterval,
    ) -> Option<TraceBuffer>;
}

// ==================== Memory Source ====================

/// In-memory buffers keyed by source reference, then position.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    traces: HashMap<String, HashMap<PositionKey, TraceBuffer>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a trace whose first sample is at absolute index `start`.
    pub fn insert(
        &mut self,
        source: impl Into<String>,
        position: PositionKey,
        start: usize,
        samples: Vec<f64>,
    ) {
        self.traces
            .entry(source.into())
            .or_default()
            .insert(position, TraceBuffer::new(start, samples));
    }

    pub fn with_trace(
        mut self,
        source: impl Into<String>,
        position: PositionKey,
        start: usize,
        samples: Vec<f64>,
    ) -> Self {
        self.insert(source, position, start, samples);
        self
    }

    /// Number of stored traces across all sources.
    pub fn len(&self) -> usize {
        self.traces.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.values().all(HashMap::is_empty)
    }
}

impl DataSource for MemorySource {
    fn fetch(
        &self,
        input: &InputRef,
        position: PositionKey,
        _interval: SampleInterval,
    ) -> Option<TraceBuffer> {
        self.traces
            .get(input.source.as_str())
            .and_then(|by_position| by_position.get(&position))
            .cloned()
    }
}

// ==================== Synthetic Source ====================

/// Pattern for generating synthetic traces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum SyntheticPattern {
    /// Constant value
    Constant { value: f64 },
    /// Sine over the sample index (`frequency` in cycles per sample)
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
    },
    /// `slope * sample + inline`
    Ramp { slope: f64 },
    /// Square wave
    Square { period: f64, amplitude: f64 },
    /// Sawtooth wave
    Sawtooth { period: f64, amplitude: f64 },
}

impl Default for SyntheticPattern {
    fn default() -> Self {
        SyntheticPattern::Sine {
            frequency: 0.02,
            amplitude: 100.0,
            offset: 0.0,
        }
    }
}

impl SyntheticPattern {
    /// Generate the sample at absolute index `sample` for `position`.
    pub fn generate(&self, position: PositionKey, sample: usize) -> f64 {
        let t = sample as f64;
        match *self {
            SyntheticPattern::Constant { value } => value,
            SyntheticPattern::Sine {
                frequency,
                amplitude,
                offset,
            } => {
                let phase = position_phase(position);
                offset + amplitude * (2.0 * std::f64::consts::PI * frequency * t + phase).sin()
            }
            SyntheticPattern::Ramp { slope } => slope * t + position.inline as f64,
            SyntheticPattern::Square { period, amplitude } => {
                if t % period < period / 2.0 {
                    amplitude
                } else {
                    -amplitude
                }
            }
            SyntheticPattern::Sawtooth { period, amplitude } => {
                let t = t % period;
                amplitude * (t / period)
            }
        }
    }
}

fn position_phase(position: PositionKey) -> f64 {
    let mix = (position.inline as i64) * 31 + (position.crossline as i64) * 17;
    (mix.rem_euclid(628) as f64) / 100.0
}

/// Deterministic trace generator.
///
/// Every source reference uses the default pattern unless overridden.
/// Positions listed as dead return no trace; `undefined_every` blanks
/// every n-th sample.
#[derive(Debug, Clone, Default)]
pub struct SyntheticSource {
    default_pattern: SyntheticPattern,
    patterns: HashMap<String, SyntheticPattern>,
    dead_positions: HashSet<PositionKey>,
    undefined_every: Option<usize>,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_pattern(mut self, pattern: SyntheticPattern) -> Self {
        self.default_pattern = pattern;
        self
    }

    /// Use `pattern` for one source reference.
    pub fn with_pattern(mut self, source: impl Into<String>, pattern: SyntheticPattern) -> Self {
        self.patterns.insert(source.into(), pattern);
        self
    }

    /// Report no trace at `position`.
    pub fn with_dead_position(mut self, position: PositionKey) -> Self {
        self.dead_positions.insert(position);
        self
    }

    /// Mark every `n`-th absolute sample as undefined.
    pub fn with_undefined_every(mut self, n: usize) -> Self {
        self.undefined_every = (n > 0).then_some(n);
        self
    }

    fn pattern_for(&self, source: &str) -> &SyntheticPattern {
        self.patterns.get(source).unwrap_or(&self.default_pattern)
    }
}

impl DataSource for SyntheticSource {
    fn fetch(
        &self,
        input: &InputRef,
        position: PositionKey,
        interval: SampleInterval,
    ) -> Option<TraceBuffer> {
        if self.dead_positions.contains(&position) {
            return None;
        }
        let pattern = self.pattern_for(&input.source);
        let samples = interval
            .indices()
            .map(|i| match self.undefined_every {
                Some(n) if i % n == 0 => UNDEFINED_SAMPLE,
                _ => pattern.generate(position, i),
            })
            .collect();
        Some(TraceBuffer::new(interval.start(), samples))
    }
}
