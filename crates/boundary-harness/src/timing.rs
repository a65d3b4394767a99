//! Timing engine: warmup, per-call samples, repeated runs.
//!
//! Every measured call is timed on its own with `Instant` (monotonic,
//! nanosecond resolution). Warmup strictly precedes measurement, calls never
//! overlap, and the list under test is never rebuilt between calls. Outliers
//! are kept: noise is averaged out by sample count and run repetition, and
//! run-to-run spread is reported rather than filtered.

use std::hint::black_box;
use std::time::{Duration, Instant};

use boundary_nodes::VariantError;
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

pub const DEFAULT_WARMUP: u64 = 1_000;
pub const DEFAULT_ITERATIONS: u64 = 100_000;
pub const DEFAULT_RUNS: usize = 3;
/// Run-to-run spread (percent of the mean) still considered reproducible.
pub const STABILITY_TOLERANCE_PCT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Discarded calls before measurement.
    pub warmup: u64,
    /// Measured calls per run.
    pub iterations: u64,
    /// Independent repetitions of warmup + measurement.
    pub runs: usize,
    pub tolerance_pct: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            warmup: DEFAULT_WARMUP,
            iterations: DEFAULT_ITERATIONS,
            runs: DEFAULT_RUNS,
            tolerance_pct: STABILITY_TOLERANCE_PCT,
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.iterations == 0 {
            return Err(HarnessError::Config("iterations must be positive".to_string()));
        }
        if self.runs == 0 {
            return Err(HarnessError::Config("runs must be positive".to_string()));
        }
        if !(self.tolerance_pct.is_finite() && self.tolerance_pct > 0.0) {
            return Err(HarnessError::Config(format!(
                "tolerance must be a positive percentage, got {}",
                self.tolerance_pct
            )));
        }
        Ok(())
    }
}

/// Reduction of one run's per-call samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub samples: usize,
    pub mean_ns: f64,
    pub p50_ns: f64,
    pub p95_ns: f64,
    pub p99_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
    pub stddev_ns: f64,
}

/// All runs for one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    pub runs: Vec<LatencyStats>,
    /// Mean of run means: the representative ns/traversal.
    pub mean_ns: f64,
    /// `(max - min) / mean` of run means, in percent.
    pub spread_pct: f64,
    pub stable: bool,
}

impl TimingSummary {
    #[must_use]
    pub fn run_means(&self) -> Vec<f64> {
        self.runs.iter().map(|run| run.mean_ns).collect()
    }

    /// Largest minus smallest run mean, in ns.
    #[must_use]
    pub fn spread_ns(&self) -> f64 {
        let means = self.run_means();
        let max = means.iter().copied().fold(f64::MIN, f64::max);
        let min = means.iter().copied().fold(f64::MAX, f64::min);
        if means.is_empty() { 0.0 } else { max - min }
    }
}

/// Time `call` under `cfg`.
///
/// Each result is checked against `expected` outside the timed region; a
/// divergent or failing call aborts the measurement for this variant.
pub fn measure<F>(
    variant: &str,
    cfg: &TimingConfig,
    expected: i64,
    mut call: F,
) -> Result<TimingSummary, HarnessError>
where
    F: FnMut() -> Result<i64, VariantError>,
{
    cfg.validate()?;
    let mut runs = Vec::with_capacity(cfg.runs);
    for _ in 0..cfg.runs {
        runs.push(measure_run(variant, cfg, expected, &mut call)?);
    }
    Ok(summarize(runs, cfg.tolerance_pct))
}

fn measure_run<F>(
    variant: &str,
    cfg: &TimingConfig,
    expected: i64,
    call: &mut F,
) -> Result<LatencyStats, HarnessError>
where
    F: FnMut() -> Result<i64, VariantError>,
{
    for _ in 0..cfg.warmup {
        let total = black_box(call()).map_err(|source| traversal_error(variant, source))?;
        check_total(variant, expected, total)?;
    }

    let mut samples = Vec::with_capacity(usize::try_from(cfg.iterations).unwrap_or(0));
    for _ in 0..cfg.iterations {
        let start = Instant::now();
        let result = black_box(call());
        let elapsed = start.elapsed().max(Duration::from_nanos(1));
        let total = result.map_err(|source| traversal_error(variant, source))?;
        check_total(variant, expected, total)?;
        samples.push(elapsed.as_nanos() as f64);
    }
    Ok(stats_from_samples(samples))
}

fn traversal_error(variant: &str, source: VariantError) -> HarnessError {
    HarnessError::Traversal {
        variant: variant.to_string(),
        source,
    }
}

fn check_total(variant: &str, expected: i64, actual: i64) -> Result<(), HarnessError> {
    if actual == expected {
        Ok(())
    } else {
        Err(HarnessError::Integrity {
            variant: variant.to_string(),
            expected,
            actual,
        })
    }
}

/// Reduce run statistics to the representative value plus a stability verdict.
#[must_use]
pub fn summarize(runs: Vec<LatencyStats>, tolerance_pct: f64) -> TimingSummary {
    let mean_ns = if runs.is_empty() {
        0.0
    } else {
        runs.iter().map(|run| run.mean_ns).sum::<f64>() / runs.len() as f64
    };
    let mut summary = TimingSummary {
        runs,
        mean_ns,
        spread_pct: 0.0,
        stable: true,
    };
    if mean_ns > 0.0 {
        summary.spread_pct = summary.spread_ns() / mean_ns * 100.0;
    }
    summary.stable = summary.spread_pct <= tolerance_pct;
    summary
}

#[must_use]
pub fn stats_from_samples(mut samples: Vec<f64>) -> LatencyStats {
    if samples.is_empty() {
        return LatencyStats {
            samples: 0,
            mean_ns: 0.0,
            p50_ns: 0.0,
            p95_ns: 0.0,
            p99_ns: 0.0,
            min_ns: 0.0,
            max_ns: 0.0,
            stddev_ns: 0.0,
        };
    }
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    LatencyStats {
        samples: samples.len(),
        mean_ns: mean,
        p50_ns: percentile_sorted(&samples, 0.50),
        p95_ns: percentile_sorted(&samples, 0.95),
        p99_ns: percentile_sorted(&samples, 0.99),
        min_ns: samples[0],
        max_ns: samples[samples.len() - 1],
        stddev_ns: variance.sqrt(),
    }
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    debug_assert!((0.0..=1.0).contains(&p));
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
