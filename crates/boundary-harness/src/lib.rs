//! Timing harness for the boundary crossing benchmark.
//!
//! This crate provides:
//! - List building through each variant's public `construct` entry point
//! - A correctness oracle that gates every variant before it is timed
//! - The timing engine: warmup, per-call monotonic samples, repeated runs
//! - The variant registry and experiment rounds
//! - Report generation: human-readable tables + machine-readable JSON
//! - Structured JSONL logging of every harness event

pub mod builder;
pub mod config;
pub mod environment;
pub mod error;
pub mod oracle;
pub mod pin;
pub mod registry;
pub mod report;
pub mod structured_log;
pub mod suite;
pub mod timing;
pub mod traversal;

pub use config::BenchConfig;
pub use error::{FailureKind, HarnessError};
pub use registry::{Round, Traversal, VariantDescriptor};
pub use report::Report;
pub use suite::{Suite, SuiteOutcome};
pub use timing::{LatencyStats, TimingConfig, TimingSummary};
