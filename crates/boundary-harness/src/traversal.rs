//! Generic attribute-protocol traversal.
//!
//! One loop, written once, that walks any variant's list by reading `value`
//! and `next` through [`NodeVariant::attr`]. Every field read crosses the
//! variant boundary and produces a fresh boundary value, which is the cost an
//! outside caller pays when it cannot use the variant's own `sum`.

use boundary_nodes::{Field, NodeVariant, Value, VariantError};

pub fn generic_sum(variant: &dyn NodeVariant, head: &Value) -> Result<i64, VariantError> {
    let mut total: i64 = 0;
    let mut current = head.clone();
    while let Value::Object(node) = &current {
        match variant.attr(node, Field::Value)? {
            Value::Int(v) => total = total.wrapping_add(v),
            other => {
                return Err(VariantError::Type {
                    variant: variant.name().to_string(),
                    expected: "int",
                    found: other.type_name().to_string(),
                });
            }
        }
        current = variant.attr(node, Field::Next)?;
    }
    match current {
        Value::None => Ok(total),
        other => Err(VariantError::Type {
            variant: variant.name().to_string(),
            expected: "node",
            found: other.type_name().to_string(),
        }),
    }
}
