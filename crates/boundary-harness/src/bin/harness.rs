//! CLI entrypoint for the boundary crossing benchmark.

use std::path::PathBuf;
use std::process::ExitCode;

use boundary_harness::config::DEFAULT_NODES;
use boundary_harness::environment::Environment;
use boundary_harness::pin::maybe_pin_thread;
use boundary_harness::registry::standard_variants;
use boundary_harness::structured_log::{ArtifactIndex, LogEmitter, LogLevel, Outcome, Phase};
use boundary_harness::timing::{DEFAULT_ITERATIONS, DEFAULT_RUNS, DEFAULT_WARMUP};
use boundary_harness::{BenchConfig, HarnessError, Report, Round, Suite, TimingConfig};
use clap::Parser;

/// Measure the cost of crossing an object boundary while traversing a linked list.
#[derive(Debug, Parser)]
#[command(name = "harness")]
#[command(about = "Linked-list traversal benchmark across node variants")]
struct Cli {
    /// List length N.
    #[arg(long, default_value_t = DEFAULT_NODES)]
    nodes: usize,
    /// Discarded calls before each measured run.
    #[arg(long, default_value_t = DEFAULT_WARMUP)]
    warmup: u64,
    /// Measured calls per run.
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: u64,
    /// Independent runs per variant.
    #[arg(long, default_value_t = DEFAULT_RUNS)]
    runs: usize,
    /// Only run these rounds (repeatable).
    #[arg(long = "round", value_parser = parse_round)]
    rounds: Vec<Round>,
    /// Also write the report as JSON.
    #[arg(long)]
    json: Option<PathBuf>,
    /// Write structured JSONL events here.
    #[arg(long)]
    log: Option<PathBuf>,
    /// Write a SHA-256 index of the produced files here.
    #[arg(long)]
    artifact_index: Option<PathBuf>,
    /// Print variants and footprints without timing.
    #[arg(long)]
    list: bool,
}

fn parse_round(raw: &str) -> Result<Round, String> {
    raw.parse()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.list {
        list_variants();
        return ExitCode::SUCCESS;
    }
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("harness: {err}");
            ExitCode::from(2)
        }
    }
}

fn list_variants() {
    for descriptor in standard_variants() {
        let footprint = descriptor.footprint();
        let rounds: Vec<&str> = descriptor.rounds().iter().map(|r| r.as_str()).collect();
        println!(
            "{:<28} {:>4} bytes  header {:>2}  [{}]",
            descriptor.name(),
            footprint.object_bytes,
            footprint.header_bytes,
            rounds.join(", ")
        );
    }
}

/// Returns the exit status of a completed run.
fn run(cli: Cli) -> Result<u8, HarnessError> {
    let config = BenchConfig {
        nodes: cli.nodes,
        timing: TimingConfig {
            warmup: cli.warmup,
            iterations: cli.iterations,
            runs: cli.runs,
            ..TimingConfig::default()
        },
        rounds: cli.rounds,
    };
    config.validate()?;

    let run_id = run_id();
    let mut log = match &cli.log {
        Some(path) => LogEmitter::to_file(path, &run_id)?,
        None => LogEmitter::discard(&run_id),
    };

    let pinned = maybe_pin_thread();
    let environment = Environment::capture(pinned);
    eprintln!("[harness] {}", environment.banner());

    let suite = Suite::new(config, standard_variants());
    eprintln!(
        "[harness] {} variants selected, N={}",
        suite.descriptors().len(),
        suite.config().nodes
    );
    let outcome = suite.run(&mut log)?;
    let code = outcome.exit_code();
    let report = Report::new(outcome, environment);

    print!("{}", report.render_text());

    if let Some(path) = &cli.json {
        std::fs::write(path, report.to_json()?)?;
        eprintln!("[harness] wrote {}", path.display());
    }

    let artifacts: Vec<String> = [&cli.json, &cli.artifact_index]
        .into_iter()
        .flatten()
        .map(|path| path.display().to_string())
        .collect();
    let entry = log
        .entry(LogLevel::Info, "report_written")
        .with_phase(Phase::Report)
        .with_outcome(if code == 0 {
            Outcome::Pass
        } else {
            Outcome::Fail
        })
        .with_artifacts(artifacts);
    log.emit_entry(entry)?;
    // The index hashes the log, so it must be complete on disk first.
    log.flush()?;

    if let Some(path) = &cli.artifact_index {
        let mut index = ArtifactIndex::new(&run_id);
        if let Some(log_path) = &cli.log {
            index.add_file(log_path, "log")?;
        }
        if let Some(json_path) = &cli.json {
            index.add_file(json_path, "report")?;
        }
        std::fs::write(path, index.to_json()?)?;
        eprintln!("[harness] wrote {}", path.display());
    }

    Ok(code)
}

fn run_id() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{secs}-{}", std::process::id())
}
