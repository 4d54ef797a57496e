//! # tracecalc: single-trace transform engine
//!
//! Computes derived traces sample by sample from one or more input traces at
//! a set of positions (inline/crossline pairs) over a sample interval.
//!
//! ## Architecture
//!
//! - **Schema**: typed parameters with limits and enable flags, grouped into
//!   a [`Descriptor`] together with input slots and an update rule
//! - **Registry**: transform name → schema + provider factory
//! - **Providers**: executable transform instances following an
//!   acquire → compute protocol
//! - **Scheduler**: fans positions out to a pool of workers over crossbeam
//!   channels and collects a per-position report
//! - **Editor / persistence**: a widget-oriented DTO and a JSON/TOML
//!   representation of configured descriptors
//!
//! ## Configuration
//!
//! Engine settings live in `engine.toml` in the platform data directory
//! under `dev.tracecalc` (see [`config`]).
//!
//! ## Example
//!
//! ```ignore
//! use tracecalc::{
//!     CancellationToken, Registry, RunRequest, SampleInterval, Scheduler,
//!     SchedulerConfig, SyntheticSource, PositionKey,
//! };
//!
//! let registry = Registry::global();
//! let mut descriptor = registry.descriptor("Scale")?;
//! descriptor.set_value("factor", 2.0)?;
//! descriptor.set_value("shift", 100.0)?;
//! descriptor.bind_input("Input", "amplitude")?;
//!
//! let positions = vec![PositionKey::new(100, 200), PositionKey::new(100, 201)];
//! let request = RunRequest {
//!     descriptor: &descriptor,
//!     positions: &positions,
//!     interval: SampleInterval::new(0, 500)?,
//! };
//! let scheduler = Scheduler::new(registry, SchedulerConfig::default());
//! let (report, windows) =
//!     scheduler.run_collect(&request, &SyntheticSource::new(), &CancellationToken::new())?;
//! ```

pub mod config;
pub mod editor;
pub mod error;
pub mod persist;
pub mod provider;
pub mod registry;
pub mod scheduler;
pub mod schema;
pub mod sink;
pub mod source;
pub mod transforms;
pub mod types;

// Re-export commonly used types
pub use config::{EngineConfig, JobFile, SchedulerConfig};
pub use editor::{EditorField, EditorState, FieldWidget};
pub use error::{ErrorCategory, Result, ResultExt, TransformError};
pub use persist::{LoadedTransform, PersistedTransform, PersistedValue};
pub use provider::{AnyProvider, Provider, ProviderPlugin, ProviderState};
pub use registry::{Registry, TransformDefinition};
pub use scheduler::{CancellationToken, PositionFailure, RunReport, RunRequest, Scheduler};
pub use schema::{Descriptor, InputSlot, ParamValue, Parameter, UpdateRule};
pub use sink::{MemorySink, TraceSink};
pub use source::{DataSource, InputRef, MemorySource, SyntheticPattern, SyntheticSource};
pub use types::{
    is_undefined, OutputKind, PositionKey, SampleInterval, TraceBuffer, TraceWindow,
    UNDEFINED_SAMPLE,
};
