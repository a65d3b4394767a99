//! Arena+index nodes: no per-node allocation and no reference counting.
//!
//! Each variant instance owns one arena. Handles are `(arena, index)` pairs,
//! and `next` links are `u32` indices into the same arena. Summation borrows
//! the arena once and then follows indices, so the per-node work is one
//! bounds-checked slot load.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::VariantError;
use crate::object::{Object, Value};
use crate::variant::{Field, Footprint, NodeVariant, foreign_next, node_args};

pub const ARENA_KIND: &str = "ArenaNode";

const NAME: &str = "arena";

/// Position of a node inside its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeIndex(u32);

impl NodeIndex {
    #[must_use]
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy)]
struct ArenaSlot {
    value: i64,
    next: Option<NodeIndex>,
}

#[derive(Debug, Default)]
struct Arena {
    slots: RefCell<Vec<ArenaSlot>>,
}

/// Boundary handle to one arena node.
#[derive(Debug, Clone)]
pub struct ArenaRef {
    arena: Rc<Arena>,
    index: NodeIndex,
}

impl ArenaRef {
    #[must_use]
    pub const fn index(&self) -> NodeIndex {
        self.index
    }
}

/// Arena-backed variant; every instance owns a separate arena.
#[derive(Debug, Default)]
pub struct ArenaVariant {
    arena: Rc<Arena>,
}

impl ArenaVariant {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes allocated in this variant's arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.slots.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn handle<'a>(&self, obj: &'a Object) -> Result<&'a ArenaRef, VariantError> {
        match obj.downcast_ref::<ArenaRef>() {
            Some(handle) if Rc::ptr_eq(&handle.arena, &self.arena) => Ok(handle),
            Some(_) => Err(VariantError::type_mismatch(
                NAME,
                ARENA_KIND,
                "ArenaNode from another arena",
            )),
            None => Err(VariantError::type_mismatch(NAME, ARENA_KIND, obj.kind())),
        }
    }

    fn object(&self, index: NodeIndex) -> Object {
        Object::new(
            ARENA_KIND,
            ArenaRef {
                arena: Rc::clone(&self.arena),
                index,
            },
        )
    }

    fn slot(&self, index: NodeIndex) -> Result<ArenaSlot, VariantError> {
        let slots = self.arena.slots.try_borrow().map_err(|_| VariantError::Borrow {
            variant: NAME.to_string(),
        })?;
        slots
            .get(index.get())
            .copied()
            .ok_or_else(|| VariantError::type_mismatch(NAME, ARENA_KIND, "dangling arena index"))
    }
}

impl NodeVariant for ArenaVariant {
    fn name(&self) -> &str {
        NAME
    }

    fn construct(&self, args: &[Value]) -> Result<Object, VariantError> {
        let (value, next) = node_args(NAME, args)?;
        let next = match next {
            None => None,
            Some(obj) => Some(
                self.handle(obj)
                    .map_err(|_| foreign_next(NAME, ARENA_KIND, obj))?
                    .index,
            ),
        };

        let mut slots = self.arena.slots.try_borrow_mut().map_err(|_| VariantError::Borrow {
            variant: NAME.to_string(),
        })?;
        let index = u32::try_from(slots.len())
            .map(NodeIndex)
            .map_err(|_| VariantError::argument(NAME, "arena is full"))?;
        slots.push(ArenaSlot { value, next });
        drop(slots);
        Ok(self.object(index))
    }

    fn sum(&self, head: &Value) -> Result<i64, VariantError> {
        let first = match head {
            Value::None => return Ok(0),
            Value::Object(obj) => self.handle(obj)?.index,
            other => {
                return Err(VariantError::type_mismatch(NAME, ARENA_KIND, other.type_name()));
            }
        };

        let slots = self.arena.slots.try_borrow().map_err(|_| VariantError::Borrow {
            variant: NAME.to_string(),
        })?;
        let mut total: i64 = 0;
        let mut current = Some(first);
        while let Some(index) = current {
            let slot = &slots[index.get()];
            total = total.wrapping_add(slot.value);
            current = slot.next;
        }
        Ok(total)
    }

    fn attr(&self, node: &Object, field: Field) -> Result<Value, VariantError> {
        let index = self.handle(node)?.index;
        let slot = self.slot(index)?;
        Ok(match field {
            Field::Value => Value::Int(slot.value),
            Field::Next => slot
                .next
                .map(|next| Value::Object(self.object(next)))
                .unwrap_or_default(),
        })
    }

    fn footprint(&self) -> Footprint {
        Footprint::inline::<ArenaSlot>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(variant: &ArenaVariant, n: i64) -> Value {
        let mut head = Value::None;
        for i in (0..n).rev() {
            head = Value::Object(variant.construct(&[Value::Int(i), head]).unwrap());
        }
        head
    }

    #[test]
    fn sums_by_index() {
        let variant = ArenaVariant::new();
        assert!(variant.is_empty());
        let head = build(&variant, 1000);
        assert_eq!(variant.len(), 1000);
        assert_eq!(variant.sum(&head).unwrap(), 499_500);
        let handle = head
            .as_object()
            .unwrap()
            .downcast_ref::<ArenaRef>()
            .unwrap();
        assert_eq!(handle.index().get(), 999);
    }

    #[test]
    fn handles_from_another_arena_are_rejected() {
        let a = ArenaVariant::new();
        let b = ArenaVariant::new();
        let head = build(&a, 3);

        let err = b.sum(&head).unwrap_err();
        assert!(err.is_type_error());
        assert!(err.to_string().contains("another arena"));

        assert!(
            b.construct(&[Value::Int(1), head])
                .unwrap_err()
                .is_argument_error()
        );
        assert!(b.is_empty());
    }

    #[test]
    fn attr_walk_matches_sum() {
        let variant = ArenaVariant::new();
        let head = build(&variant, 5);
        let mut total = 0;
        let mut current = head;
        while let Value::Object(node) = &current {
            let Value::Int(v) = variant.attr(node, Field::Value).unwrap() else {
                panic!("value must be int");
            };
            total += v;
            current = variant.attr(node, Field::Next).unwrap();
        }
        assert_eq!(total, 10);
    }

    #[test]
    fn slots_carry_no_header() {
        let fp = ArenaVariant::new().footprint();
        assert_eq!(fp.object_bytes, 16);
        assert_eq!(fp.header_bytes, 0);
    }
}
