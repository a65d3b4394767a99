//! Harness error taxonomy.

use boundary_nodes::VariantError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// The variant's constructor rejected arguments while building the list.
    #[error("{variant}: construction failed at value {index}: {source}")]
    Construction {
        variant: String,
        index: usize,
        #[source]
        source: VariantError,
    },
    /// The variant's sum did not match the closed-form expectation.
    #[error("{variant}: sum returned {actual}, expected {expected}")]
    Integrity {
        variant: String,
        expected: i64,
        actual: i64,
    },
    /// The variant's sum raised instead of returning a total.
    #[error("{variant}: traversal failed: {source}")]
    Traversal {
        variant: String,
        #[source]
        source: VariantError,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a variant failure is classified in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Construction,
    Integrity,
}

impl HarnessError {
    /// Classification for per-variant failures; `None` for harness-level errors.
    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Construction { .. } => Some(FailureKind::Construction),
            Self::Integrity { .. } | Self::Traversal { .. } => Some(FailureKind::Integrity),
            Self::Config(_) | Self::Io(_) | Self::Json(_) => None,
        }
    }

    /// Name of the variant the error belongs to, if any.
    #[must_use]
    pub fn variant(&self) -> Option<&str> {
        match self {
            Self::Construction { variant, .. }
            | Self::Integrity { variant, .. }
            | Self::Traversal { variant, .. } => Some(variant),
            Self::Config(_) | Self::Io(_) | Self::Json(_) => None,
        }
    }
}
