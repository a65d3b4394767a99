//! Suite runner: build, verify, then time every selected variant.
//!
//! Phase 1 builds and verifies every list before any timing starts, so a
//! broken variant is known (and excluded) up front. Phase 2 times the
//! surviving variants one at a time, each against its own list, and drops the
//! list as soon as its measurement ends.

use std::time::Instant;

use boundary_nodes::{Footprint, Value};
use serde::Serialize;

use crate::builder::build_list;
use crate::config::BenchConfig;
use crate::error::{FailureKind, HarnessError};
use crate::oracle::{cross_check, expected_sum, verify};
use crate::registry::{Round, Traversal, VariantDescriptor};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, Phase};
use crate::timing::{TimingSummary, measure};

/// A variant that passed verification and was timed.
#[derive(Debug, Clone, Serialize)]
pub struct VariantResult {
    pub name: String,
    pub traversal: Traversal,
    pub rounds: Vec<Round>,
    pub annotation: String,
    pub footprint: Footprint,
    pub sum: i64,
    pub timing: TimingSummary,
    /// Mean ns per node; `None` for an empty list.
    pub ns_per_node: Option<f64>,
}

/// A variant excluded from timing, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantFailure {
    pub name: String,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteOutcome {
    pub config: BenchConfig,
    pub expected_sum: i64,
    pub results: Vec<VariantResult>,
    pub failures: Vec<VariantFailure>,
}

impl SuiteOutcome {
    /// True when every selected variant was verified and timed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Process exit status for this outcome: 0 when every variant passed, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.passed())
    }

    #[must_use]
    pub fn result(&self, name: &str) -> Option<&VariantResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Rows of `round` in registry order; the first is the round's reference.
    #[must_use]
    pub fn rows(&self, round: Round) -> Vec<&VariantResult> {
        self.results
            .iter()
            .filter(|r| r.rounds.contains(&round))
            .collect()
    }
}

pub struct Suite {
    config: BenchConfig,
    descriptors: Vec<VariantDescriptor>,
}

impl Suite {
    /// Keep only descriptors that take part in at least one selected round.
    #[must_use]
    pub fn new(config: BenchConfig, descriptors: Vec<VariantDescriptor>) -> Self {
        let descriptors = descriptors
            .into_iter()
            .filter(|d| d.rounds().iter().any(|round| config.includes(*round)))
            .collect();
        Self {
            config,
            descriptors,
        }
    }

    #[must_use]
    pub fn descriptors(&self) -> &[VariantDescriptor] {
        &self.descriptors
    }

    #[must_use]
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn run(self, log: &mut LogEmitter) -> Result<SuiteOutcome, HarnessError> {
        self.config.validate()?;
        let nodes = self.config.nodes;
        let expected = expected_sum(nodes);
        let mut failures = Vec::new();

        let entry = log
            .entry(LogLevel::Info, "suite_start")
            .with_nodes(nodes)
            .with_details(serde_json::to_value(&self.config)?);
        log.emit_entry(entry)?;

        // Phase 1: build + verify everything before the first timed call.
        let mut verified: Vec<(&VariantDescriptor, Value, i64)> = Vec::new();
        for descriptor in &self.descriptors {
            let started = Instant::now();
            let checked = build_list(descriptor.provider(), nodes).and_then(|head| {
                let sum = verify(descriptor, &head, expected)?;
                Ok((head, sum))
            });
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match checked {
                Ok((head, sum)) => {
                    let entry = log
                        .entry(LogLevel::Info, "variant_verified")
                        .with_variant(descriptor.name())
                        .with_phase(Phase::Verify)
                        .with_round_of(descriptor)
                        .with_outcome(Outcome::Pass)
                        .with_nodes(nodes)
                        .with_sums(expected, Some(sum))
                        .with_duration_ms(elapsed_ms);
                    log.emit_entry(entry)?;
                    verified.push((descriptor, head, sum));
                }
                Err(err) => {
                    let failure = record_failure(log, descriptor, Phase::Verify, err, expected)?;
                    eprintln!("[harness] {}: {}", failure.name, failure.message);
                    failures.push(failure);
                }
            }
        }

        let disagreeing = cross_check(verified.iter().map(|(d, _, sum)| (d.name(), *sum)));
        if !disagreeing.is_empty() {
            verified.retain(|(d, _, sum)| {
                if disagreeing.iter().any(|name| name == d.name()) {
                    failures.push(VariantFailure {
                        name: d.name().to_string(),
                        kind: FailureKind::Integrity,
                        message: format!("sum {sum} disagrees with the other variants"),
                    });
                    false
                } else {
                    true
                }
            });
        }

        // Phase 2: time one variant at a time.
        let mut results = Vec::with_capacity(verified.len());
        for (descriptor, head, sum) in verified {
            eprintln!("[harness] timing {}", descriptor.name());
            let timed = measure(descriptor.name(), &self.config.timing, expected, || {
                descriptor.traverse(&head)
            });
            drop(head);
            match timed {
                Ok(timing) => {
                    let ns_per_node = per_node(timing.mean_ns, nodes);
                    let mut entry = log
                        .entry(LogLevel::Info, "variant_timed")
                        .with_variant(descriptor.name())
                        .with_phase(Phase::Time)
                        .with_round_of(descriptor)
                        .with_outcome(Outcome::Pass)
                        .with_latency_ns(timing.mean_ns)
                        .with_details(serde_json::json!({
                            "rounds": descriptor.rounds(),
                            "ns_per_node": ns_per_node,
                            "run_means_ns": timing.run_means(),
                            "spread_pct": timing.spread_pct,
                            "stable": timing.stable,
                        }));
                    if !timing.stable {
                        entry.level = LogLevel::Warn;
                    }
                    log.emit_entry(entry)?;
                    results.push(VariantResult {
                        name: descriptor.name().to_string(),
                        traversal: descriptor.traversal(),
                        rounds: descriptor.rounds().to_vec(),
                        annotation: descriptor.annotation().to_string(),
                        footprint: descriptor.footprint(),
                        sum,
                        timing,
                        ns_per_node,
                    });
                }
                Err(err) => {
                    let failure = record_failure(log, descriptor, Phase::Time, err, expected)?;
                    eprintln!("[harness] {}: {}", failure.name, failure.message);
                    failures.push(failure);
                }
            }
        }

        let entry = log
            .entry(LogLevel::Info, "suite_end")
            .with_outcome(if failures.is_empty() {
                Outcome::Pass
            } else {
                Outcome::Fail
            })
            .with_details(serde_json::json!({
                "timed": results.len(),
                "failed": failures.len(),
            }));
        log.emit_entry(entry)?;
        log.flush()?;

        Ok(SuiteOutcome {
            config: self.config,
            expected_sum: expected,
            results,
            failures,
        })
    }
}

/// Mean cost of one node; undefined when the list is empty.
fn per_node(mean_ns: f64, nodes: usize) -> Option<f64> {
    (nodes > 0).then(|| mean_ns / nodes as f64)
}

trait RoundContext {
    /// Tag the entry with the first round the variant is reported in.
    fn with_round_of(self, descriptor: &VariantDescriptor) -> Self;
}

impl RoundContext for LogEntry {
    fn with_round_of(self, descriptor: &VariantDescriptor) -> Self {
        match descriptor.rounds().first() {
            Some(round) => self.with_round(*round),
            None => self,
        }
    }
}

/// Log a per-variant failure; harness-level errors propagate instead.
fn record_failure(
    log: &mut LogEmitter,
    descriptor: &VariantDescriptor,
    phase: Phase,
    err: HarnessError,
    expected: i64,
) -> Result<VariantFailure, HarnessError> {
    let Some(kind) = err.failure_kind() else {
        return Err(err);
    };
    let (phase, actual) = match &err {
        HarnessError::Construction { .. } => (Phase::Build, None),
        HarnessError::Integrity { actual, .. } => (phase, Some(*actual)),
        _ => (phase, None),
    };
    let message = err.to_string();
    let entry = log
        .entry(LogLevel::Error, "variant_failed")
        .with_variant(descriptor.name())
        .with_phase(phase)
        .with_round_of(descriptor)
        .with_outcome(Outcome::Fail)
        .with_sums(expected, actual)
        .with_details(serde_json::json!({
            "kind": kind,
            "error": message,
        }));
    log.emit_entry(entry)?;
    Ok(VariantFailure {
        name: descriptor.name().to_string(),
        kind,
        message,
    })
}
