//! Benchmark configuration.
//!
//! The documented experiment is fixed: 1,000 nodes, 1,000 warmup calls,
//! 100,000 measured calls, 3 independent runs. Every knob can be overridden
//! from the command line, and the values actually used are printed in the
//! report header.
//!
//! CPU pinning is opt-in via `BOUNDARY_BENCH_PIN=1`.

use serde::Serialize;

use crate::error::HarnessError;
use crate::registry::Round;
use crate::timing::TimingConfig;

pub const DEFAULT_NODES: usize = 1_000;

/// Environment variable enabling best-effort CPU pinning.
pub const PIN_ENV: &str = "BOUNDARY_BENCH_PIN";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchConfig {
    /// List length N.
    pub nodes: usize,
    pub timing: TimingConfig,
    /// Rounds to run; empty means every round.
    pub rounds: Vec<Round>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            nodes: DEFAULT_NODES,
            timing: TimingConfig::default(),
            rounds: Vec::new(),
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> Result<(), HarnessError> {
        if u32::try_from(self.nodes).is_err() {
            return Err(HarnessError::Config(format!("nodes must fit in u32, got {}", self.nodes)));
        }
        self.timing.validate()
    }

    /// True when `round` is selected.
    #[must_use]
    pub fn includes(&self, round: Round) -> bool {
        self.rounds.is_empty() || self.rounds.contains(&round)
    }

    /// Rounds in report order.
    #[must_use]
    pub fn selected_rounds(&self) -> Vec<Round> {
        Round::ALL
            .into_iter()
            .filter(|round| self.includes(*round))
            .collect()
    }
}

/// Parse a pinning flag (case-insensitive).
#[must_use]
pub fn parse_pin_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Whether `BOUNDARY_BENCH_PIN` requests CPU pinning.
#[must_use]
pub fn pin_requested() -> bool {
    std::env::var(PIN_ENV)
        .map(|raw| parse_pin_flag(&raw))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_experiment() {
        let cfg = BenchConfig::default();
        assert_eq!(cfg.nodes, 1_000);
        assert_eq!(cfg.timing.warmup, 1_000);
        assert_eq!(cfg.timing.iterations, 100_000);
        assert_eq!(cfg.timing.runs, 3);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.selected_rounds(), Round::ALL.to_vec());
    }

    #[test]
    fn round_filter_keeps_report_order() {
        let cfg = BenchConfig {
            rounds: vec![Round::CacheResidency, Round::Native],
            ..BenchConfig::default()
        };
        assert_eq!(
            cfg.selected_rounds(),
            vec![Round::Native, Round::CacheResidency]
        );
        assert!(!cfg.includes(Round::ArenaIndex));
    }

    #[test]
    fn pin_flag_parsing() {
        assert!(parse_pin_flag("1"));
        assert!(parse_pin_flag(" ON "));
        assert!(!parse_pin_flag("0"));
        assert!(!parse_pin_flag("maybe"));
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut cfg = BenchConfig::default();
        cfg.timing.iterations = 0;
        assert!(matches!(cfg.validate(), Err(HarnessError::Config(_))));
    }
}
