//! Correctness oracle.
//!
//! Values are `0..N`, so the expected sum is `N*(N-1)/2`. A variant whose sum
//! disagrees, or whose sum raises, is never timed: an early-exit bug would
//! otherwise show up as an artificially fast traversal.

use boundary_nodes::Value;

use crate::error::HarnessError;
use crate::registry::VariantDescriptor;

/// Closed-form sum of `0..n`.
#[must_use]
pub fn expected_sum(n: usize) -> i64 {
    let n = n as i128;
    (n * (n - 1) / 2) as i64
}

/// Sum `head` once through the descriptor's traversal and compare.
pub fn verify(
    descriptor: &VariantDescriptor,
    head: &Value,
    expected: i64,
) -> Result<i64, HarnessError> {
    let actual = descriptor
        .traverse(head)
        .map_err(|source| HarnessError::Traversal {
            variant: descriptor.name().to_string(),
            source,
        })?;
    if actual != expected {
        return Err(HarnessError::Integrity {
            variant: descriptor.name().to_string(),
            expected,
            actual,
        });
    }
    Ok(actual)
}

/// Every verified variant must report the same total.
///
/// Returns the names of variants that disagree with the first one.
#[must_use]
pub fn cross_check<'a>(sums: impl IntoIterator<Item = (&'a str, i64)>) -> Vec<String> {
    let mut sums = sums.into_iter();
    let Some((_, reference)) = sums.next() else {
        return Vec::new();
    };
    sums.filter(|(_, sum)| *sum != reference)
        .map(|(name, _)| name.to_string())
        .collect()
}
