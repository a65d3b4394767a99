//! The boundary every node variant implements.

use std::mem::size_of;

use serde::Serialize;

use crate::error::VariantError;
use crate::object::{Object, Value};

/// Bytes of the strong/weak counters `Rc` places in front of every node.
pub const RC_COUNTS_BYTES: usize = 2 * size_of::<usize>();

/// Node field readable through the generic attribute protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Value,
    Next,
}

impl Field {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Next => "next",
        }
    }
}

/// Per-object memory footprint of a variant's nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Footprint {
    /// Bytes of one node allocation, reference-count block included.
    pub object_bytes: usize,
    /// Bytes of collection-tracking bookkeeping inside `object_bytes`.
    pub header_bytes: usize,
    pub collection_tracked: bool,
}

impl Footprint {
    /// Footprint of a node stored as `Rc<T>`.
    #[must_use]
    pub const fn of_rc<T>(header_bytes: usize, collection_tracked: bool) -> Self {
        Self {
            object_bytes: RC_COUNTS_BYTES + size_of::<T>(),
            header_bytes,
            collection_tracked,
        }
    }

    /// Footprint of a node stored inline (no per-node allocation).
    #[must_use]
    pub const fn inline<T>() -> Self {
        Self {
            object_bytes: size_of::<T>(),
            header_bytes: 0,
            collection_tracked: false,
        }
    }
}

/// One implementation under test.
///
/// `construct` and `sum` are the whole surface the harness times; `attr` is
/// the slower generic attribute protocol any outside loop can use.
pub trait NodeVariant {
    fn name(&self) -> &str;

    /// Build one node from `(value, next = None)`.
    fn construct(&self, args: &[Value]) -> Result<Object, VariantError>;

    /// Sum every `value` reachable from `head`. `Value::None` sums to 0.
    ///
    /// A head of any other node type is rejected before traversal starts.
    fn sum(&self, head: &Value) -> Result<i64, VariantError>;

    /// Read one field of `node`.
    fn attr(&self, node: &Object, field: Field) -> Result<Value, VariantError>;

    fn footprint(&self) -> Footprint;
}

/// Split positional construction arguments into `(value, next)`.
///
/// Accepts one or two arguments; `value` must be an int and `next` must be
/// `None` or some node object. Whether that object is of the right variant is
/// left to the caller, which owns the downcast.
pub fn node_args<'a>(
    variant: &str,
    args: &'a [Value],
) -> Result<(i64, Option<&'a Object>), VariantError> {
    let (value, next) = match args {
        [value] => (value, &Value::None),
        [value, next] => (value, next),
        _ => {
            return Err(VariantError::argument(
                variant,
                format!(
                    "construct() takes 1 or 2 arguments (value, next), got {}",
                    args.len()
                ),
            ));
        }
    };

    let value = match value {
        Value::Int(v) => *v,
        other => {
            return Err(VariantError::argument(
                variant,
                format!("value must be int, got {}", other.type_name()),
            ));
        }
    };

    let next = match next {
        Value::None => None,
        Value::Object(obj) => Some(obj),
        other => {
            return Err(VariantError::argument(
                variant,
                format!("next must be a node or None, got {}", other.type_name()),
            ));
        }
    };

    Ok((value, next))
}

/// Error for a `next` argument that is a node of some other variant.
pub(crate) fn foreign_next(variant: &str, expected: &'static str, found: &Object) -> VariantError {
    VariantError::argument(
        variant,
        format!("next must be a {expected} or None, got {}", found.kind()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_args_defaults_next_to_none() {
        let args = [Value::Int(4)];
        let (value, next) = node_args("probe", &args).unwrap();
        assert_eq!(value, 4);
        assert!(next.is_none());
    }

    #[test]
    fn node_args_rejects_arity() {
        let err = node_args("probe", &[]).unwrap_err();
        assert!(err.is_argument_error());
        assert!(err.to_string().contains("got 0"));

        let args = [Value::Int(1), Value::None, Value::None];
        assert!(node_args("probe", &args).unwrap_err().is_argument_error());
    }

    #[test]
    fn node_args_rejects_non_integer_value() {
        for bad in [Value::Float(1.0), Value::Str("1".into()), Value::None] {
            let args = [bad];
            let err = node_args("probe", &args).unwrap_err();
            assert!(err.to_string().contains("value must be int"), "{err}");
        }
    }

    #[test]
    fn node_args_rejects_scalar_next() {
        let args = [Value::Int(1), Value::Int(2)];
        let err = node_args("probe", &args).unwrap_err();
        assert!(err.to_string().contains("next must be a node or None"));
    }

    #[test]
    fn rc_footprint_counts_reference_block() {
        let fp = Footprint::of_rc::<[u64; 2]>(0, false);
        assert_eq!(fp.object_bytes, RC_COUNTS_BYTES + 16);
        assert_eq!(Field::Next.as_str(), "next");
    }
}
