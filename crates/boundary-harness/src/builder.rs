//! List builder.
//!
//! Lists are built tail first through the variant's public `construct` entry
//! point only: `construct(N-1, None)`, then `construct(i, head)` for
//! `i = N-2 ..= 0`. The head therefore holds 0 and the tail holds N-1, and
//! the values are exactly `0..N`.

use boundary_nodes::{NodeVariant, Value};

use crate::error::HarnessError;

/// Build an `n`-node list; `n == 0` yields `Value::None` without calling `construct`.
pub fn build_list(variant: &dyn NodeVariant, n: usize) -> Result<Value, HarnessError> {
    let mut head = Value::None;
    for index in (0..n).rev() {
        let value = i64::try_from(index)
            .map_err(|_| HarnessError::Config(format!("list length {n} overflows i64")))?;
        let node = variant
            .construct(&[Value::Int(value), head])
            .map_err(|source| HarnessError::Construction {
                variant: variant.name().to_string(),
                index,
                source,
            })?;
        head = Value::Object(node);
    }
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundary_nodes::{Field, ManagedVariant};

    #[test]
    fn empty_list_is_absence() {
        let head = build_list(&ManagedVariant::new(), 0).unwrap();
        assert!(head.is_none());
    }

    #[test]
    fn head_holds_zero_and_values_ascend() {
        let variant = ManagedVariant::new();
        let head = build_list(&variant, 4).unwrap();
        let mut values = Vec::new();
        let mut current = head;
        while let Value::Object(node) = &current {
            if let Value::Int(v) = variant.attr(node, Field::Value).unwrap() {
                values.push(v);
            }
            current = variant.attr(node, Field::Next).unwrap();
        }
        assert_eq!(values, [0, 1, 2, 3]);
    }
}
