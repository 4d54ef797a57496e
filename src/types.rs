//! Core data types for tracecalc
//!
//! This module contains the fundamental data structures shared by the
//! providers, data sources and the scheduler.
//!
//! # Main Types
//!
//! - [`PositionKey`] - 2-D index identifying a trace's location
//! - [`SampleInterval`] - Validated contiguous range of sample indices
//! - [`TraceBuffer`] - Input samples fetched from a data source
//! - [`TraceWindow`] - Per-position output buffer handed to a sink
//! - [`OutputKind`] - Semantic type of a transform's output
//!
//! # Undefined samples
//!
//! A sample with no data is represented by [`UNDEFINED_SAMPLE`] (`NaN`).
//! Always test with [`is_undefined`], never with `==`.

use crate::error::{Result, TransformError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel value for a sample that carries no data.
pub const UNDEFINED_SAMPLE: f64 = f64::NAN;

/// Whether a sample is the undefined sentinel.
#[inline]
pub fn is_undefined(value: f64) -> bool {
    value.is_nan()
}

/// 2-D position of a trace (inline / crossline numbers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    pub inline: i32,
    pub crossline: i32,
}

impl PositionKey {
    pub const fn new(inline: i32, crossline: i32) -> Self {
        Self { inline, crossline }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.inline, self.crossline)
    }
}

/// A contiguous, non-negative range of sample indices.
///
/// Constructed through [`SampleInterval::new`], which rejects negative
/// starts and counts, so every value of this type is in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval", into = "RawInterval")]
pub struct SampleInterval {
    start: usize,
    count: usize,
}

impl SampleInterval {
    /// Validate and build an interval.
    pub fn new(start: i64, count: i64) -> Result<Self> {
        if start < 0 || count < 0 {
            return Err(TransformError::InvalidRange { start, count });
        }
        Ok(Self {
            start: start as usize,
            count: count as usize,
        })
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// One past the last sample index.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether `other` lies entirely within this interval.
    pub fn covers(&self, other: &SampleInterval) -> bool {
        other.is_empty() || (other.start >= self.start && other.end() <= self.end())
    }

    /// Iterate the absolute sample indices.
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

#[derive(Serialize, Deserialize)]
struct RawInterval {
    start: i64,
    count: i64,
}

impl TryFrom<RawInterval> for SampleInterval {
    type Error = TransformError;

    fn try_from(raw: RawInterval) -> Result<Self> {
        SampleInterval::new(raw.start, raw.count)
    }
}

impl From<SampleInterval> for RawInterval {
    fn from(interval: SampleInterval) -> Self {
        Self {
            start: interval.start as i64,
            count: interval.count as i64,
        }
    }
}

/// Samples fetched for one input at one position.
///
/// `start` is the absolute index of `samples[0]`. Reads outside the buffer
/// yield [`UNDEFINED_SAMPLE`].
#[derive(Debug, Clone, PartialEq)]
pub struct TraceBuffer {
    pub start: usize,
    pub samples: Vec<f64>,
}

impl TraceBuffer {
    pub fn new(start: usize, samples: Vec<f64>) -> Self {
        Self { start, samples }
    }

    /// Sample at an absolute index.
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        index
            .checked_sub(self.start)
            .and_then(|i| self.samples.get(i))
            .copied()
            .unwrap_or(UNDEFINED_SAMPLE)
    }

    /// The interval this buffer spans.
    pub fn interval(&self) -> SampleInterval {
        SampleInterval {
            start: self.start,
            count: self.samples.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Output buffer for one position.
///
/// The output always holds exactly `interval.count()` samples, initialised
/// to undefined.
#[derive(Debug, Clone)]
pub struct TraceWindow {
    pub position: PositionKey,
    pub interval: SampleInterval,
    pub output: Vec<f64>,
}

impl TraceWindow {
    pub fn new(position: PositionKey, interval: SampleInterval) -> Self {
        Self {
            position,
            interval,
            output: vec![UNDEFINED_SAMPLE; interval.count()],
        }
    }

    /// Count of defined output samples.
    pub fn defined_count(&self) -> usize {
        self.output.iter().filter(|v| !is_undefined(**v)).count()
    }
}

/// Semantic type of a transform's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OutputKind {
    /// Same physical quantity as the input traces
    #[default]
    Amplitude,
    /// A derived, unitless attribute
    Dimensionless,
    /// Energy-like quantity (squared amplitude)
    Energy,
    /// Ratio of two inputs
    Ratio,
}

impl OutputKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            OutputKind::Amplitude => "Amplitude",
            OutputKind::Dimensionless => "Dimensionless",
            OutputKind::Energy => "Energy",
            OutputKind::Ratio => "Ratio",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_rejects_negative() {
        assert!(matches!(
            SampleInterval::new(-1, 10),
            Err(TransformError::InvalidRange { start: -1, count: 10 })
        ));
        assert!(SampleInterval::new(0, -3).is_err());
        let iv = SampleInterval::new(5, 0).unwrap();
        assert!(iv.is_empty());
        assert_eq!(iv.end(), 5);
    }

    #[test]
    fn test_interval_covers() {
        let outer = SampleInterval::new(10, 20).unwrap();
        assert!(outer.covers(&SampleInterval::new(10, 20).unwrap()));
        assert!(outer.covers(&SampleInterval::new(15, 5).unwrap()));
        assert!(!outer.covers(&SampleInterval::new(25, 10).unwrap()));
        assert!(outer.covers(&SampleInterval::new(100, 0).unwrap()));
    }

    #[test]
    fn test_interval_serde_validates() {
        let ok: SampleInterval = serde_json::from_str(r#"{"start":3,"count":4}"#).unwrap();
        assert_eq!(ok.indices().collect::<Vec<_>>(), vec![3, 4, 5, 6]);
        let bad: std::result::Result<SampleInterval, _> =
            serde_json::from_str(r#"{"start":-3,"count":4}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_trace_buffer_reads_outside_are_undefined() {
        let buf = TraceBuffer::new(100, vec![1.0, 2.0, 3.0]);
        assert_eq!(buf.get(100), 1.0);
        assert_eq!(buf.get(102), 3.0);
        assert!(is_undefined(buf.get(99)));
        assert!(is_undefined(buf.get(103)));
        assert_eq!(buf.interval(), SampleInterval::new(100, 3).unwrap());
    }

    #[test]
    fn test_window_has_exact_count() {
        let w = TraceWindow::new(PositionKey::new(1, 2), SampleInterval::new(0, 7).unwrap());
        assert_eq!(w.output.len(), 7);
        assert_eq!(w.defined_count(), 0);
    }

    #[test]
    fn test_position_display() {
        assert_eq!(PositionKey::new(120, -4).to_string(), "120/-4");
    }
}
