//! Provider abstraction: the executable instance of a transform.
//!
//! Two-layer design, as for pipeline nodes:
//! - **`ProviderPlugin` trait** - for transforms registered by a host.
//! - **`BuiltinProvider` enum** - for the transforms shipped with the crate;
//!   match arms dispatch statically on the per-sample hot path.
//!
//! `AnyProvider` wraps either variant, and [`Provider`] wraps an
//! `AnyProvider` with the protocol state machine:
//!
//! ```text
//! Unbuilt ──(valid descriptor)──► Ready ──acquire──► Acquired ──compute──► Ready
//! ```
//!
//! A provider built from an invalid descriptor stays `Unbuilt` and reports
//! why through [`Provider::failure`]; it never panics and never performs I/O.

use crate::error::{Result, TransformError};
use crate::schema::Descriptor;
use crate::source::{DataSource, InputRef};
use crate::transforms::BuiltinProvider;
use crate::types::{PositionKey, SampleInterval, TraceBuffer, UNDEFINED_SAMPLE};

/// Trait for transforms supplied from outside the crate.
pub trait ProviderPlugin: Send {
    /// Transform name.
    fn name(&self) -> &str;

    /// Static declaration: no writes to state shared across positions.
    fn parallel_safe(&self) -> bool;

    /// Fetch the inputs for one position.
    fn acquire(
        &mut self,
        source: &dyn DataSource,
        position: PositionKey,
        interval: SampleInterval,
    ) -> Result<()>;

    /// Fill `output` for `interval`. `output.len() == interval.count()`.
    fn compute(
        &mut self,
        output: &mut [f64],
        position: PositionKey,
        interval: SampleInterval,
    ) -> Result<()>;
}

/// Wrapper that holds either a built-in provider (enum dispatch) or a plugin (trait object).
pub enum AnyProvider {
    Builtin(BuiltinProvider),
    Plugin(Box<dyn ProviderPlugin>),
}

impl AnyProvider {
    pub fn name(&self) -> &str {
        match self {
            AnyProvider::Builtin(p) => p.name(),
            AnyProvider::Plugin(p) => p.name(),
        }
    }

    pub fn parallel_safe(&self) -> bool {
        match self {
            AnyProvider::Builtin(p) => p.parallel_safe(),
            AnyProvider::Plugin(p) => p.parallel_safe(),
        }
    }

    pub fn acquire(
        &mut self,
        source: &dyn DataSource,
        position: PositionKey,
        interval: SampleInterval,
    ) -> Result<()> {
        match self {
            AnyProvider::Builtin(p) => p.acquire(source, position, interval),
            AnyProvider::Plugin(p) => p.acquire(source, position, interval),
        }
    }

    pub fn compute(
        &mut self,
        output: &mut [f64],
        position: PositionKey,
        interval: SampleInterval,
    ) -> Result<()> {
        match self {
            AnyProvider::Builtin(p) => p.compute(output, position, interval),
            AnyProvider::Plugin(p) => p.compute(output, position, interval),
        }
    }
}

impl From<BuiltinProvider> for AnyProvider {
    fn from(p: BuiltinProvider) -> Self {
        AnyProvider::Builtin(p)
    }
}

// ==================== Acquisition state ====================

/// Input buffers fetched for one position.
///
/// `buffers[i]` is `None` for an absent optional input, which reads as
/// all-undefined.
#[derive(Debug, Clone)]
pub struct AcquiredInputs {
    pub position: PositionKey,
    pub interval: SampleInterval,
    buffers: Vec<Option<TraceBuffer>>,
}

impl AcquiredInputs {
    /// Fetch every input for `position`.
    ///
    /// `inputs` holds one entry per descriptor slot: the bound reference and
    /// whether the slot is required. A missing required input fails with
    /// `Acquisition`.
    pub fn fetch(
        source: &dyn DataSource,
        inputs: &[BoundInput],
        position: PositionKey,
        interval: SampleInterval,
    ) -> Result<Self> {
        let mut buffers = Vec::with_capacity(inputs.len());
        for input in inputs {
            let buffer = input
                .reference
                .as_ref()
                .and_then(|r| source.fetch(r, position, interval));
            if buffer.is_none() && input.required {
                return Err(TransformError::Acquisition {
                    input: input.label.clone(),
                    position,
                });
            }
            buffers.push(buffer);
        }
        Ok(Self {
            position,
            interval,
            buffers,
        })
    }

    /// Sample of input `slot` at absolute index `index`.
    #[inline]
    pub fn sample(&self, slot: usize, index: usize) -> f64 {
        match self.buffers.get(slot) {
            Some(Some(buf)) => buf.get(index),
            _ => UNDEFINED_SAMPLE,
        }
    }

    /// Whether input `slot` was fetched.
    pub fn has_input(&self, slot: usize) -> bool {
        matches!(self.buffers.get(slot), Some(Some(_)))
    }
}

/// Input slot resolved from a descriptor at construction time.
#[derive(Debug, Clone)]
pub struct BoundInput {
    pub label: String,
    pub required: bool,
    pub reference: Option<InputRef>,
}

impl BoundInput {
    /// Resolve every input slot of `descriptor`.
    pub fn from_descriptor(descriptor: &Descriptor) -> Vec<BoundInput> {
        descriptor
            .inputs()
            .iter()
            .enumerate()
            .map(|(slot, input)| BoundInput {
                label: input.label.clone(),
                required: input.required,
                reference: input.binding.as_ref().map(|source| InputRef {
                    slot,
                    label: input.label.clone(),
                    source: source.clone(),
                }),
            })
            .collect()
    }
}

/// Shared per-sample driver for built-in transforms.
///
/// Takes the acquisition for `position` (leaving `None` behind) and writes
/// `f(inputs, absolute_index)` into each output sample.
pub fn compute_samples<F>(
    acquired: &mut Option<AcquiredInputs>,
    output: &mut [f64],
    position: PositionKey,
    interval: SampleInterval,
    f: F,
) -> Result<()>
where
    F: Fn(&AcquiredInputs, usize) -> Result<f64>,
{
    let inputs = match acquired.take() {
        Some(inputs) if inputs.position == position => inputs,
        Some(inputs) => {
            return Err(TransformError::Compute {
                position,
                message: format!("inputs were acquired for {}", inputs.position),
            });
        }
        None => {
            return Err(TransformError::Compute {
                position,
                message: "no acquired inputs".to_string(),
            });
        }
    };
    for (out, index) in output.iter_mut().zip(interval.indices()) {
        *out = f(&inputs, index)?;
    }
    Ok(())
}

// ==================== Provider ====================

/// Protocol state of a [`Provider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderState {
    /// Construction failed.
    Unbuilt { reason: String },
    /// Constructed, no inputs held.
    Ready,
    /// Inputs held for one position.
    Acquired(PositionKey),
}

/// A transform instance bound to one descriptor snapshot.
pub struct Provider {
    transform: String,
    state: ProviderState,
    inner: Option<AnyProvider>,
}

impl Provider {
    pub(crate) fn ready(transform: &str, inner: AnyProvider) -> Self {
        Self {
            transform: transform.to_string(),
            state: ProviderState::Ready,
            inner: Some(inner),
        }
    }

    pub(crate) fn not_ok(transform: &str, reason: impl Into<String>) -> Self {
        Self {
            transform: transform.to_string(),
            state: ProviderState::Unbuilt {
                reason: reason.into(),
            },
            inner: None,
        }
    }

    pub fn transform(&self) -> &str {
        &self.transform
    }

    pub fn state(&self) -> &ProviderState {
        &self.state
    }

    /// Whether construction succeeded.
    pub fn is_ok(&self) -> bool {
        self.inner.is_some()
    }

    /// Why construction failed, if it did.
    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            ProviderState::Unbuilt { reason } => Some(reason),
            _ => None,
        }
    }

    /// Static parallel-safety declaration. A not-OK provider reports `false`.
    pub fn parallel_safe(&self) -> bool {
        self.inner.as_ref().is_some_and(AnyProvider::parallel_safe)
    }

    /// Fetch inputs for `position`.
    ///
    /// On failure the provider returns to `Ready` and the position must be
    /// skipped.
    pub fn acquire(
        &mut self,
        source: &dyn DataSource,
        position: PositionKey,
        interval: SampleInterval,
    ) -> Result<()> {
        let inner = self.inner_mut()?;
        let result = inner.acquire(source, position, interval);
        self.state = match result {
            Ok(()) => ProviderState::Acquired(position),
            Err(_) => ProviderState::Ready,
        };
        result
    }

    /// Compute `count` samples starting at absolute index `start` into
    /// `output`.
    ///
    /// Negative `start`/`count` or an output of the wrong length fail with
    /// `InvalidRange`. A zero count succeeds without touching the inputs.
    pub fn compute(
        &mut self,
        output: &mut [f64],
        position: PositionKey,
        start: i64,
        count: i64,
    ) -> Result<()> {
        let interval = SampleInterval::new(start, count)?;
        if output.len() != interval.count() {
            return Err(TransformError::InvalidRange { start, count });
        }
        if interval.is_empty() {
            return Ok(());
        }
        if self.state != ProviderState::Acquired(position) {
            if let ProviderState::Unbuilt { reason } = &self.state {
                return Err(TransformError::ProviderNotReady {
                    transform: self.transform.clone(),
                    reason: reason.clone(),
                });
            }
            return Err(TransformError::Compute {
                position,
                message: "acquire was not called for this position".to_string(),
            });
        }
        let result = self.inner_mut()?.compute(output, position, interval);
        self.state = ProviderState::Ready;
        result
    }

    fn inner_mut(&mut self) -> Result<&mut AnyProvider> {
        let transform = &self.transform;
        let state = &self.state;
        self.inner
            .as_mut()
            .ok_or_else(|| TransformError::ProviderNotReady {
                transform: transform.clone(),
                reason: match state {
                    ProviderState::Unbuilt { reason } => reason.clone(),
                    _ => "not constructed".to_string(),
                },
            })
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("transform", &self.transform)
            .field("state", &self.state)
            .field("parallel_safe", &self.parallel_safe())
            .finish()
    }
}
