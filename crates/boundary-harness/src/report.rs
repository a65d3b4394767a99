//! Report emitter.
//!
//! Turns a [`SuiteOutcome`] into the human-readable text report (stdout) and
//! an equivalent JSON document (`--json`).

use std::fmt::Write as _;

use boundary_nodes::CheckConfig;
use serde::Serialize;

use crate::environment::Environment;
use crate::error::FailureKind;
use crate::registry::{REFERENCE_VARIANT, Round};
use crate::suite::{SuiteOutcome, VariantResult};

/// A variant's mean relative to the reference variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ratio {
    pub name: String,
    pub ratio: f64,
}

/// Does the optimized checked layer still lose to direct access?
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Falsification {
    pub checked: String,
    pub direct: String,
    pub delta_ns: f64,
    /// `None` when the list is empty.
    pub delta_ns_per_node: Option<f64>,
    /// True when the checked variant is slower than direct access.
    pub checked_loses: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub environment: Environment,
    pub outcome: SuiteOutcome,
    pub ratios: Vec<Ratio>,
    pub falsification: Option<Falsification>,
}

impl Report {
    #[must_use]
    pub fn new(outcome: SuiteOutcome, environment: Environment) -> Self {
        let ratios = ratios(&outcome);
        let falsification = falsification(&outcome);
        Self {
            environment,
            outcome,
            ratios,
            falsification,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[must_use]
    pub fn render_text(&self) -> String {
        let outcome = &self.outcome;
        let cfg = &outcome.config;
        let mut out = String::new();

        writeln!(out, "Boundary crossing benchmark").ok();
        writeln!(out, "{}", self.environment.banner()).ok();
        writeln!(
            out,
            "N={} nodes, warmup={}, iterations={}, runs={}",
            cfg.nodes, cfg.timing.warmup, cfg.timing.iterations, cfg.timing.runs
        )
        .ok();
        writeln!(out).ok();

        let verified = outcome.results.len();
        let selected = verified + outcome.failures.len();
        if outcome.passed() {
            writeln!(
                out,
                "Correctness: all {selected} variants sum to {} (N*(N-1)/2)",
                outcome.expected_sum
            )
            .ok();
        } else {
            writeln!(
                out,
                "Correctness: {verified}/{selected} variants sum to {}; {} failed (see below)",
                outcome.expected_sum,
                outcome.failures.len()
            )
            .ok();
        }

        for round in cfg.selected_rounds() {
            render_round(&mut out, round, &outcome.rows(round));
        }

        render_footprints(&mut out, &outcome.results);
        self.render_ratios(&mut out);
        self.render_falsification(&mut out);
        render_stability(&mut out, outcome);

        if !outcome.failures.is_empty() {
            writeln!(out).ok();
            writeln!(out, "## Failures").ok();
            for failure in &outcome.failures {
                writeln!(
                    out,
                    "- {} [{}]: {}",
                    failure.name,
                    match failure.kind {
                        FailureKind::Construction => "construction",
                        FailureKind::Integrity => "integrity",
                    },
                    failure.message
                )
                .ok();
            }
        }
        out
    }

    fn render_ratios(&self, out: &mut String) {
        if self.ratios.is_empty() {
            return;
        }
        writeln!(out).ok();
        writeln!(out, "## Ratios vs {REFERENCE_VARIANT}").ok();
        for ratio in &self.ratios {
            writeln!(out, "  {:<28} {:>7.2}x", ratio.name, ratio.ratio).ok();
        }
    }

    fn render_falsification(&self, out: &mut String) {
        let Some(f) = &self.falsification else {
            return;
        };
        writeln!(out).ok();
        writeln!(out, "## Falsification").ok();
        if f.checked_loses {
            writeln!(
                out,
                "{} is slower than {} by {:.1} ns/traversal ({} ns/node): \
                 the remaining check layer still costs something",
                f.checked,
                f.direct,
                f.delta_ns,
                per_node_text(f.delta_ns_per_node, 2, false)
            )
            .ok();
        } else {
            writeln!(
                out,
                "{} matches or beats {} ({:+.1} ns/traversal, {} ns/node): \
                 the checked layer's overhead is fully removable",
                f.checked,
                f.direct,
                f.delta_ns,
                per_node_text(f.delta_ns_per_node, 2, true)
            )
            .ok();
        }
    }
}

fn render_round(out: &mut String, round: Round, rows: &[&VariantResult]) {
    writeln!(out).ok();
    writeln!(out, "## Round {round}: {}", round.title()).ok();
    if rows.is_empty() {
        writeln!(out, "  (no verified variants)").ok();
        return;
    }
    writeln!(
        out,
        "  {:<28} {:>12} {:>9} {:>9}  {}",
        "variant", "ns/trav", "ns/node", "delta", "per-node work"
    )
    .ok();
    let base = rows[0].timing.mean_ns;
    for row in rows {
        writeln!(
            out,
            "  {:<28} {:>12.1} {:>9} {:>9}  {}",
            row.name,
            row.timing.mean_ns,
            per_node_text(row.ns_per_node, 1, false),
            pct_delta(base, row.timing.mean_ns),
            row.annotation
        )
        .ok();
    }
}

fn render_footprints(out: &mut String, results: &[VariantResult]) {
    if results.is_empty() {
        return;
    }
    writeln!(out).ok();
    writeln!(out, "## Cache footprint (per node)").ok();
    writeln!(out, "  {:<28} {:>8} {:>8}", "variant", "bytes", "header").ok();
    for row in results.iter().filter(|r| !r.name.starts_with("generic:")) {
        writeln!(
            out,
            "  {:<28} {:>8} {:>8}",
            row.name, row.footprint.object_bytes, row.footprint.header_bytes
        )
        .ok();
    }
}

fn render_stability(out: &mut String, outcome: &SuiteOutcome) {
    if outcome.results.is_empty() {
        return;
    }
    writeln!(out).ok();
    writeln!(
        out,
        "## Stability (run-to-run spread, tolerance {:.0}%)",
        outcome.config.timing.tolerance_pct
    )
    .ok();
    for row in &outcome.results {
        let means: Vec<String> = row
            .timing
            .run_means()
            .iter()
            .map(|m| format!("{m:.1}"))
            .collect();
        writeln!(
            out,
            "  {:<28} {:>6.1}%  {}  [{}]",
            row.name,
            row.timing.spread_pct,
            if row.timing.stable { "ok" } else { "UNSTABLE" },
            means.join(", ")
        )
        .ok();
    }
}

fn ratios(outcome: &SuiteOutcome) -> Vec<Ratio> {
    let Some(reference) = outcome.result(REFERENCE_VARIANT) else {
        return Vec::new();
    };
    let base = reference.timing.mean_ns;
    if base <= 0.0 {
        return Vec::new();
    }
    outcome
        .results
        .iter()
        .map(|row| Ratio {
            name: row.name.clone(),
            ratio: row.timing.mean_ns / base,
        })
        .collect()
}

fn falsification(outcome: &SuiteOutcome) -> Option<Falsification> {
    let checked = outcome.result(CheckConfig::OPTIMIZED.label())?;
    let direct = outcome.result(REFERENCE_VARIANT)?;
    let delta_ns = checked.timing.mean_ns - direct.timing.mean_ns;
    Some(Falsification {
        checked: checked.name.clone(),
        direct: direct.name.clone(),
        delta_ns,
        delta_ns_per_node: checked
            .ns_per_node
            .zip(direct.ns_per_node)
            .map(|(c, d)| c - d),
        checked_loses: delta_ns > 0.0,
    })
}

/// Per-node figure; `n/a` for an empty list.
fn per_node_text(value: Option<f64>, precision: usize, signed: bool) -> String {
    match value {
        None => String::from("n/a"),
        Some(v) if signed => format!("{v:+.precision$}"),
        Some(v) => format!("{v:.precision$}"),
    }
}

/// Signed percentage change from `base`; `n/a` without a positive base.
fn pct_delta(base: f64, current: f64) -> String {
    if base <= 0.0 {
        return String::from("n/a");
    }
    let pct = ((current - base) / base) * 100.0;
    format!("{pct:+.1}%")
}
