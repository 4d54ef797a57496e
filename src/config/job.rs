//! Job files: one transform run over a grid of positions.
//!
//! ```toml
//! [transform]
//! name = "Scale"
//!
//! [transform.params]
//! mode = "linear"
//! factor = 2.0
//!
//! [transform.inputs]
//! Input = "amplitude"
//!
//! [positions]
//! inline = [100, 110]
//! crossline = [200, 220]
//! crossline_step = 2
//!
//! [samples]
//! start = 0
//! count = 500
//!
//! [source]
//! pattern = "sine"
//! frequency = 0.02
//! amplitude = 100.0
//! offset = 0.0
//! dead = [[101, 200]]
//! ```

use crate::error::{Result, ResultExt, TransformError};
use crate::persist::PersistedTransform;
use crate::source::{SyntheticPattern, SyntheticSource};
use crate::types::{PositionKey, SampleInterval};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_step() -> i32 {
    1
}

/// Inclusive inline/crossline ranges with steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionGrid {
    pub inline: [i32; 2],
    pub crossline: [i32; 2],
    #[serde(default = "default_step")]
    pub inline_step: i32,
    #[serde(default = "default_step")]
    pub crossline_step: i32,
}

impl PositionGrid {
    /// Positions in inline-major order.
    pub fn positions(&self) -> Result<Vec<PositionKey>> {
        let [il_first, il_last] = self.inline;
        let [xl_first, xl_last] = self.crossline;
        if self.inline_step <= 0 || self.crossline_step <= 0 {
            return Err(TransformError::Config(format!(
                "Position steps must be positive (inline_step={}, crossline_step={})",
                self.inline_step, self.crossline_step
            )));
        }
        if il_first > il_last || xl_first > xl_last {
            return Err(TransformError::Config(format!(
                "Empty position grid: inline {:?}, crossline {:?}",
                self.inline, self.crossline
            )));
        }

        let mut positions = Vec::new();
        for inline in (il_first..=il_last).step_by(self.inline_step as usize) {
            for crossline in (xl_first..=xl_last).step_by(self.crossline_step as usize) {
                positions.push(PositionKey::new(inline, crossline));
            }
        }
        Ok(positions)
    }
}

/// Requested sample interval, kept signed so bad files are reported as
/// `InvalidRange` rather than a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRange {
    pub start: i64,
    pub count: i64,
}

impl SampleRange {
    pub fn interval(&self) -> Result<SampleInterval> {
        SampleInterval::new(self.start, self.count)
    }
}

/// Synthetic data source section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(flatten)]
    pub pattern: SyntheticPattern,

    /// `[inline, crossline]` pairs that have no trace.
    #[serde(default)]
    pub dead: Vec<[i32; 2]>,

    /// Blank every n-th sample; 0 disables.
    #[serde(default)]
    pub undefined_every: usize,
}

impl SourceSettings {
    pub fn build(&self) -> SyntheticSource {
        self.dead
            .iter()
            .fold(
                SyntheticSource::new().with_default_pattern(self.pattern),
                |source, [il, xl]| source.with_dead_position(PositionKey::new(*il, *xl)),
            )
            .with_undefined_every(self.undefined_every)
    }
}

/// A complete batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFile {
    pub transform: PersistedTransform,
    pub positions: PositionGrid,
    pub samples: SampleRange,
    #[serde(default)]
    pub source: SourceSettings,
}

impl JobFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(TransformError::from)
            .with_context(|| format!("Failed to read job file {:?}", path))?;
        Self::parse(&content)
            .map_err(|e| TransformError::Config(format!("Failed to parse job file {:?}: {}", path, e)))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(TransformError::from)
            .with_context(|| format!("Failed to write job file {:?}", path))
    }
}
