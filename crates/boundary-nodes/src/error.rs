//! Boundary validation errors raised by node variants.

use thiserror::Error;

/// Error raised by a variant's construction or summation entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
    /// Construction arguments were malformed (arity, value type, foreign `next`).
    #[error("{variant}: {message}")]
    Argument { variant: String, message: String },
    /// A head or node handle is not of the variant's node type.
    #[error("{variant}: expected {expected} or None, got {found}")]
    Type {
        variant: String,
        expected: &'static str,
        found: String,
    },
    /// A dynamic object lacks a required attribute.
    #[error("{variant}: object has no attribute '{attribute}'")]
    Attribute {
        variant: String,
        attribute: &'static str,
    },
    /// Runtime borrow accounting refused a shared borrow.
    #[error("{variant}: node is already mutably borrowed")]
    Borrow { variant: String },
}

impl VariantError {
    pub(crate) fn argument(variant: &str, message: impl Into<String>) -> Self {
        Self::Argument {
            variant: variant.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(
        variant: &str,
        expected: &'static str,
        found: impl Into<String>,
    ) -> Self {
        Self::Type {
            variant: variant.to_string(),
            expected,
            found: found.into(),
        }
    }

    /// True for errors detected while checking a handle's type.
    #[must_use]
    pub const fn is_type_error(&self) -> bool {
        matches!(self, Self::Type { .. })
    }

    /// True for errors detected while validating construction arguments.
    #[must_use]
    pub const fn is_argument_error(&self) -> bool {
        matches!(self, Self::Argument { .. })
    }
}
