//! tracecalc - batch runner
//!
//! Runs the transform described by a job file over its position grid
//! against a synthetic data source and prints a summary.
//!
//! ```text
//! tracecalc <job.toml> [--config <engine.toml>]
//! tracecalc --list
//! ```

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracecalc::{
    CancellationToken, EngineConfig, JobFile, Registry, RunReport, RunRequest, Scheduler,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Failures printed individually before the summary is abbreviated.
const MAX_LISTED_FAILURES: usize = 10;

#[derive(Debug, Default)]
struct Args {
    job: Option<PathBuf>,
    config: Option<PathBuf>,
    list: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--list" => args.list = true,
            "--config" => {
                let path = iter.next().context("--config requires a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                println!("usage: tracecalc <job.toml> [--config <engine.toml>] [--list]");
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("unknown option '{}'", other),
            other => {
                if args.job.replace(PathBuf::from(other)).is_some() {
                    bail!("only one job file may be given");
                }
            }
        }
    }
    Ok(args)
}

fn list_transforms(registry: &Registry) -> Result<()> {
    for name in registry.names() {
        let description = registry.description(&name)?;
        println!("{:<12} {}", name, description);
        let descriptor = registry.descriptor(&name)?;
        for param in descriptor.params() {
            println!(
                "    {:<20} {:<6} default {}",
                param.key(),
                param.kind().type_name(),
                param.default_value()
            );
        }
        for input in descriptor.inputs() {
            let required = if input.required { "required" } else { "optional" };
            println!("    input {:<14} {}", input.label, required);
        }
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("{}", report.summary());
    for failure in report.failed.iter().take(MAX_LISTED_FAILURES) {
        println!("  {} failed: {}", failure.position, failure.error);
    }
    if report.failed.len() > MAX_LISTED_FAILURES {
        println!(
            "  ... and {} more",
            report.failed.len() - MAX_LISTED_FAILURES
        );
    }
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("Failed to load engine config {:?}", path))?,
        None => EngineConfig::load_or_default(),
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let registry = Registry::global();
    if args.list {
        return list_transforms(registry);
    }

    let Some(job_path) = args.job else {
        bail!("usage: tracecalc <job.toml> [--config <engine.toml>] [--list]");
    };
    tracing::info!("Loading job {:?}", job_path);
    let job = JobFile::load(&job_path)?;

    let loaded = job
        .transform
        .load(registry)
        .with_context(|| format!("Failed to load transform '{}'", job.transform.name))?;
    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }

    let positions = job.positions.positions()?;
    let request = RunRequest {
        descriptor: &loaded.descriptor,
        positions: &positions,
        interval: job.samples.interval()?,
    };
    let source = job.source.build();

    let scheduler = Scheduler::new(registry, config.scheduler.clone());
    let (report, windows) = scheduler
        .run_collect(&request, &source, &CancellationToken::new())
        .context("Run did not start")?;

    print_report(&report);
    let defined: usize = windows.iter().map(|w| w.defined_count()).sum();
    let total: usize = windows.iter().map(|w| w.output.len()).sum();
    println!("{} of {} output samples defined", defined, total);

    if report.failure_count() > 0 {
        std::process::exit(2);
    }
    Ok(())
}
