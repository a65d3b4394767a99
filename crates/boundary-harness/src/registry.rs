//! Variant registry and experiment rounds.
//!
//! Each descriptor owns its own provider, so no two descriptors ever share a
//! node. A descriptor is measured once and may appear in several rounds; the
//! first descriptor listed for a round is that round's reference row.

use std::fmt;
use std::str::FromStr;

use boundary_nodes::{
    ArenaVariant, CheckConfig, DirectTracked, DirectUntracked, Footprint, ManagedVariant,
    NodeVariant, Value, VariantError, checked_variant,
};
use serde::{Deserialize, Serialize};

use crate::traversal::generic_sum;

/// One comparison the report groups rows into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Round {
    Native,
    GenericLoop,
    OwnershipChecks,
    CacheResidency,
    ArenaIndex,
}

impl Round {
    pub const ALL: [Self; 5] = [
        Self::Native,
        Self::GenericLoop,
        Self::OwnershipChecks,
        Self::CacheResidency,
        Self::ArenaIndex,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::GenericLoop => "generic-loop",
            Self::OwnershipChecks => "ownership-checks",
            Self::CacheResidency => "cache-residency",
            Self::ArenaIndex => "arena-index",
        }
    }

    /// Question the round answers, printed as its table heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Native => "loop and data in the same implementation",
            Self::GenericLoop => "one generic attribute loop, different node kinds",
            Self::OwnershipChecks => "check layer: naive vs optimized configurations",
            Self::CacheResidency => "same layout with and without a collection header",
            Self::ArenaIndex => "reference counting vs arena+index links",
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Round {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|round| round.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|r| r.as_str()).collect();
                format!(
                    "unknown round '{s}' (expected one of: {})",
                    known.join(", ")
                )
            })
    }
}

/// Which summation path a descriptor times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Traversal {
    /// The variant's own `sum` entry point.
    Native,
    /// [`generic_sum`] over the variant's attribute protocol.
    Generic,
}

/// One implementation under test.
pub struct VariantDescriptor {
    name: String,
    provider: Box<dyn NodeVariant>,
    traversal: Traversal,
    rounds: Vec<Round>,
    annotation: &'static str,
}

impl VariantDescriptor {
    #[must_use]
    pub fn new(
        provider: Box<dyn NodeVariant>,
        traversal: Traversal,
        rounds: &[Round],
        annotation: &'static str,
    ) -> Self {
        let name = match traversal {
            Traversal::Native => provider.name().to_string(),
            Traversal::Generic => format!("generic:{}", provider.name()),
        };
        Self {
            name,
            provider,
            traversal,
            rounds: rounds.to_vec(),
            annotation,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn provider(&self) -> &dyn NodeVariant {
        self.provider.as_ref()
    }

    #[must_use]
    pub const fn traversal(&self) -> Traversal {
        self.traversal
    }

    #[must_use]
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// Textual per-node cost breakdown.
    #[must_use]
    pub const fn annotation(&self) -> &'static str {
        self.annotation
    }

    #[must_use]
    pub fn footprint(&self) -> Footprint {
        self.provider.footprint()
    }

    /// Sum `head` through this descriptor's traversal path.
    pub fn traverse(&self, head: &Value) -> Result<i64, VariantError> {
        match self.traversal {
            Traversal::Native => self.provider.sum(head),
            Traversal::Generic => generic_sum(self.provider.as_ref(), head),
        }
    }
}

impl fmt::Debug for VariantDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantDescriptor")
            .field("name", &self.name)
            .field("traversal", &self.traversal)
            .field("rounds", &self.rounds)
            .finish_non_exhaustive()
    }
}

/// Reference variant for ratios: direct access with a collection header.
pub const REFERENCE_VARIANT: &str = "direct+gc";

const CHECKED_ANNOTATIONS: [&str; 4] = [
    "cast + borrow flag + Rc inc/dec",
    "borrow flag + Rc inc/dec",
    "cast + Rc inc/dec",
    "Rc inc/dec",
];

/// The full experiment, in report order.
#[must_use]
pub fn standard_variants() -> Vec<VariantDescriptor> {
    use Round::{ArenaIndex, CacheResidency, GenericLoop, Native, OwnershipChecks};

    let mut variants = vec![
        VariantDescriptor::new(
            Box::new(ManagedVariant::new()),
            Traversal::Native,
            &[Native],
            "2 dict lookups + type test + handle clone",
        ),
        VariantDescriptor::new(
            Box::new(DirectTracked::new()),
            Traversal::Native,
            &[Native, CacheResidency],
            "load + add via borrowed ref",
        ),
        VariantDescriptor::new(
            Box::new(DirectUntracked::new()),
            Traversal::Native,
            &[CacheResidency],
            "load + add via borrowed ref",
        ),
    ];

    for (config, annotation) in CheckConfig::ALL.into_iter().zip(CHECKED_ANNOTATIONS) {
        let rounds: &[Round] = if config == CheckConfig::OPTIMIZED {
            &[Native, OwnershipChecks, ArenaIndex]
        } else {
            &[OwnershipChecks]
        };
        variants.push(VariantDescriptor::new(
            checked_variant(config),
            Traversal::Native,
            rounds,
            annotation,
        ));
    }

    variants.push(VariantDescriptor::new(
        Box::new(ArenaVariant::new()),
        Traversal::Native,
        &[ArenaIndex],
        "bounds-checked index load",
    ));

    let generic: [Box<dyn NodeVariant>; 4] = [
        Box::new(ManagedVariant::new()),
        Box::new(DirectTracked::new()),
        checked_variant(CheckConfig::OPTIMIZED),
        Box::new(ArenaVariant::new()),
    ];
    variants.extend(generic.into_iter().map(|provider| {
        VariantDescriptor::new(
            provider,
            Traversal::Generic,
            &[GenericLoop],
            "2 attr calls, each returning a boundary value",
        )
    }));

    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let variants = standard_variants();
        let names: HashSet<&str> = variants.iter().map(VariantDescriptor::name).collect();
        assert_eq!(names.len(), variants.len());
        assert!(names.contains(REFERENCE_VARIANT));
        assert!(names.contains("generic:managed"));
    }

    #[test]
    fn every_round_has_rows() {
        let variants = standard_variants();
        for round in Round::ALL {
            let rows = variants
                .iter()
                .filter(|v| v.rounds().contains(&round))
                .count();
            assert!(rows >= 2, "{round} has {rows} rows");
        }
    }

    #[test]
    fn ownership_round_runs_naive_first_and_optimized_last() {
        let variants = standard_variants();
        let names: Vec<&str> = variants
            .iter()
            .filter(|v| v.rounds().contains(&Round::OwnershipChecks))
            .map(VariantDescriptor::name)
            .collect();
        assert_eq!(names.first(), Some(&CheckConfig::NAIVE.label()));
        assert_eq!(names.last(), Some(&CheckConfig::OPTIMIZED.label()));
    }

    #[test]
    fn round_parsing() {
        assert_eq!(
            "cache_residency".parse::<Round>().unwrap(),
            Round::CacheResidency
        );
        assert_eq!("Native".parse::<Round>().unwrap(), Round::Native);
        assert!(
            "nope"
                .parse::<Round>()
                .unwrap_err()
                .contains("expected one of")
        );
    }
}
