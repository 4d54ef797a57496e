//! Execution scheduler: runs one descriptor over a set of positions.
//!
//! # Threading
//!
//! ```text
//!            jobs (PositionKey)                outcomes
//! caller ──► [unbounded channel] ──► worker 0 ──┐
//!                                ──► worker 1 ──┼──► [bounded channel] ──► collector
//!                                ──► worker n ──┘
//! ```
//!
//! Each worker owns one [`Provider`], so provider state is never shared
//! between threads. A transform that is not parallel-safe runs on a single
//! worker with a single provider. Workers are scoped threads; `run` returns
//! only once every worker has finished.
//!
//! A failure at one position (missing input, compute error, sink error) is
//! recorded in the [`RunReport`] and the run continues. Configuration
//! problems are reported before any position is processed.

use crate::config::SchedulerConfig;
use crate::error::{Result, TransformError};
use crate::provider::Provider;
use crate::registry::Registry;
use crate::schema::Descriptor;
use crate::sink::{MemorySink, TraceSink};
use crate::source::DataSource;
use crate::types::{PositionKey, SampleInterval, TraceWindow};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag, checked by workers between positions.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to compute.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub descriptor: &'a Descriptor,
    pub positions: &'a [PositionKey],
    pub interval: SampleInterval,
}

/// A position that was skipped because of an error.
#[derive(Debug)]
pub struct PositionFailure {
    pub position: PositionKey,
    pub error: TransformError,
}

/// Outcome of a run. Every requested position appears in exactly one list.
#[derive(Debug)]
pub struct RunReport {
    pub transform: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub workers: usize,
    pub completed: Vec<PositionKey>,
    pub failed: Vec<PositionFailure>,
    pub cancelled: Vec<PositionKey>,
}

impl RunReport {
    fn new(transform: &str, workers: usize) -> Self {
        Self {
            transform: transform.to_string(),
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            workers,
            completed: Vec::new(),
            failed: Vec::new(),
            cancelled: Vec::new(),
        }
    }

    pub fn success_count(&self) -> usize {
        self.completed.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len() + self.cancelled.len()
    }

    /// No failures and nothing cancelled.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }

    /// Failure for `position`, if it failed.
    pub fn failure_at(&self, position: PositionKey) -> Option<&TransformError> {
        self.failed
            .iter()
            .find(|f| f.position == position)
            .map(|f| &f.error)
    }

    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        format!(
            "'{}': {} completed, {} failed, {} cancelled in {:.2?} on {} worker(s)",
            self.transform,
            self.completed.len(),
            self.failed.len(),
            self.cancelled.len(),
            self.elapsed,
            self.workers
        )
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Completed(position) => self.completed.push(position),
            Outcome::Failed(failure) => self.failed.push(failure),
            Outcome::Cancelled(position) => self.cancelled.push(position),
        }
    }

    fn sort(&mut self) {
        self.completed.sort();
        self.failed.sort_by_key(|f| f.position);
        self.cancelled.sort();
    }
}

/// Result of one position, sent from a worker to the collector.
enum Outcome {
    Completed(PositionKey),
    Failed(PositionFailure),
    Cancelled(PositionKey),
}

/// Runs descriptors over positions using providers from one registry.
#[derive(Debug)]
pub struct Scheduler<'r> {
    registry: &'r Registry,
    config: SchedulerConfig,
}

impl<'r> Scheduler<'r> {
    pub fn new(registry: &'r Registry, config: SchedulerConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn create_provider(&self, descriptor: &Descriptor) -> Result<Provider> {
        let provider = self.registry.create(descriptor)?;
        match provider.failure() {
            Some(reason) => Err(TransformError::InvalidDescriptor {
                transform: descriptor.name().to_string(),
                reason: reason.to_string(),
            }),
            None => Ok(provider),
        }
    }

    /// Compute every position in `request` and hand the results to `sink`.
    ///
    /// Returns `Err` only if the run could not start: unknown transform or a
    /// descriptor that does not yield a working provider.
    pub fn run(
        &self,
        request: &RunRequest<'_>,
        source: &dyn DataSource,
        sink: &dyn TraceSink,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let descriptor = request.descriptor;
        let first = self.create_provider(descriptor)?;

        let workers = if first.parallel_safe() {
            self.config
                .worker_count()
                .min(request.positions.len())
                .max(1)
        } else {
            tracing::debug!(
                "Transform '{}' is not parallel-safe, running serially",
                descriptor.name()
            );
            1
        };

        let mut providers = Vec::with_capacity(workers);
        providers.push(first);
        for _ in 1..workers {
            providers.push(self.create_provider(descriptor)?);
        }

        let mut report = RunReport::new(descriptor.name(), workers);
        let started = Instant::now();
        tracing::info!(
            "Running '{}' over {} position(s), samples {}..{}, {} worker(s)",
            descriptor.name(),
            request.positions.len(),
            request.interval.start(),
            request.interval.end(),
            workers
        );

        let (job_tx, job_rx) = unbounded();
        for position in request.positions {
            // The receiver is alive until the scope below ends.
            let _ = job_tx.send(*position);
        }
        drop(job_tx);

        let (result_tx, result_rx) = bounded(self.config.channel_capacity.max(1));
        let interval = request.interval;

        std::thread::scope(|scope| {
            for provider in providers {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                scope.spawn(move || {
                    work(provider, jobs, results, source, sink, interval, cancel);
                });
            }
            drop(result_tx);

            for outcome in result_rx.iter() {
                report.record(outcome);
            }
        });

        report.sort();
        report.elapsed = started.elapsed();
        tracing::info!("{}", report.summary());
        Ok(report)
    }

    /// [`run`](Self::run) into a memory sink; windows are returned sorted by
    /// position.
    pub fn run_collect(
        &self,
        request: &RunRequest<'_>,
        source: &dyn DataSource,
        cancel: &CancellationToken,
    ) -> Result<(RunReport, Vec<TraceWindow>)> {
        let sink = MemorySink::new();
        let report = self.run(request, source, &sink, cancel)?;
        let mut windows = sink.into_windows();
        windows.sort_by_key(|w| w.position);
        Ok((report, windows))
    }
}

/// Worker loop: drain `jobs` until empty or the collector goes away.
fn work(
    mut provider: Provider,
    jobs: Receiver<PositionKey>,
    results: Sender<Outcome>,
    source: &dyn DataSource,
    sink: &dyn TraceSink,
    interval: SampleInterval,
    cancel: &CancellationToken,
) {
    for position in jobs.iter() {
        let outcome = if cancel.is_cancelled() {
            Outcome::Cancelled(position)
        } else {
            match process(&mut provider, source, sink, position, interval) {
                Ok(()) => Outcome::Completed(position),
                Err(error) => {
                    tracing::debug!("Position {} skipped: {}", position, error);
                    Outcome::Failed(PositionFailure { position, error })
                }
            }
        };
        if results.send(outcome).is_err() {
            break;
        }
    }
}

fn process(
    provider: &mut Provider,
    source: &dyn DataSource,
    sink: &dyn TraceSink,
    position: PositionKey,
    interval: SampleInterval,
) -> Result<()> {
    provider.acquire(source, position, interval)?;

    let mut window = TraceWindow::new(position, interval);
    provider.compute(
        &mut window.output,
        position,
        interval.start() as i64,
        interval.count() as i64,
    )?;

    sink.store(window).map_err(|e| match e {
        e @ TransformError::Storage { .. } => e,
        other => TransformError::Storage {
            position,
            message: other.to_string(),
        },
    })
}
