//! Managed baseline: dynamically typed objects with an attribute dictionary.
//!
//! Every field read is a string-keyed dictionary lookup that yields a boundary
//! [`Value`], and every hop re-tests the dynamic type of the current object.
//! This is the cost profile of a plain object in a managed runtime.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::VariantError;
use crate::object::{Object, Value};
use crate::variant::{Field, Footprint, NodeVariant, foreign_next, node_args};

pub const MANAGED_KIND: &str = "ManagedNode";

const NAME: &str = "managed";

/// A dynamic object: a class name plus an attribute dictionary.
pub struct ManagedObject {
    class: &'static str,
    attrs: HashMap<String, Value>,
}

impl ManagedObject {
    #[must_use]
    pub fn class(&self) -> &'static str {
        self.class
    }

    #[must_use]
    pub fn getattr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }
}

impl Drop for ManagedObject {
    // Unlink iteratively so long lists do not recurse once per node.
    fn drop(&mut self) {
        let mut next = self.attrs.remove(Field::Next.as_str());
        while let Some(Value::Object(obj)) = next {
            let Ok(rc) = obj.into_erased().downcast::<ManagedObject>() else {
                break;
            };
            match Rc::try_unwrap(rc) {
                Ok(mut node) => next = node.attrs.remove(Field::Next.as_str()),
                Err(_) => break,
            }
        }
    }
}

/// The managed baseline variant.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManagedVariant;

impl ManagedVariant {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn node<'a>(&self, obj: &'a Object) -> Option<&'a ManagedObject> {
        obj.downcast_ref::<ManagedObject>()
            .filter(|node| node.class == MANAGED_KIND)
    }
}

impl NodeVariant for ManagedVariant {
    fn name(&self) -> &str {
        NAME
    }

    fn construct(&self, args: &[Value]) -> Result<Object, VariantError> {
        let (value, next) = node_args(NAME, args)?;
        let next = match next {
            None => Value::None,
            Some(obj) if self.node(obj).is_some() => Value::Object(obj.clone()),
            Some(obj) => return Err(foreign_next(NAME, MANAGED_KIND, obj)),
        };

        let mut attrs = HashMap::with_capacity(2);
        attrs.insert(Field::Value.as_str().to_string(), Value::Int(value));
        attrs.insert(Field::Next.as_str().to_string(), next);
        Ok(Object::new(
            MANAGED_KIND,
            ManagedObject {
                class: MANAGED_KIND,
                attrs,
            },
        ))
    }

    fn sum(&self, head: &Value) -> Result<i64, VariantError> {
        let mut total: i64 = 0;
        let mut current = head.clone();
        loop {
            let node = match &current {
                Value::None => break,
                Value::Object(obj) => self.node(obj),
                _ => None,
            };
            let Some(node) = node else {
                return Err(VariantError::type_mismatch(NAME, MANAGED_KIND, current.type_name()));
            };

            match node.getattr(Field::Value.as_str()) {
                Some(Value::Int(v)) => total = total.wrapping_add(*v),
                _ => {
                    return Err(VariantError::Attribute {
                        variant: NAME.to_string(),
                        attribute: Field::Value.as_str(),
                    });
                }
            }
            let next = node
                .getattr(Field::Next.as_str())
                .cloned()
                .unwrap_or_default();
            current = next;
        }
        Ok(total)
    }

    fn attr(&self, node: &Object, field: Field) -> Result<Value, VariantError> {
        let managed = self
            .node(node)
            .ok_or_else(|| VariantError::type_mismatch(NAME, MANAGED_KIND, node.kind()))?;
        managed
            .getattr(field.as_str())
            .cloned()
            .ok_or_else(|| VariantError::Attribute {
                variant: NAME.to_string(),
                attribute: field.as_str(),
            })
    }

    /// Excludes the dictionary's heap table, which varies with the hasher.
    fn footprint(&self) -> Footprint {
        Footprint::of_rc::<ManagedObject>(0, false)
    }
}
