//! Ownership-checked nodes: reference counting plus configurable safety checks.
//!
//! Two independent knobs describe the check layer:
//!
//! - [`TypeIdentity`]: `Erased` walks type-erased `Rc<dyn Any>` handles and
//!   re-casts every node; `Static` casts the head once and then walks typed
//!   handles.
//! - [`BorrowTracking`]: `Runtime` stores nodes in a `RefCell` and takes a
//!   shared-borrow guard for every read; `Frozen` stores immutable nodes that
//!   are read directly.
//!
//! Both configurations clone the next handle and drop the previous one on
//! every hop, one increment and one decrement per node. The arena variant
//! shows what removing that pair is worth.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::VariantError;
use crate::object::{Object, Value};
use crate::variant::{Field, Footprint, NodeVariant, foreign_next, node_args};

/// How node type identity is established during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeIdentity {
    /// Every node is reached through an erased handle and cast at runtime.
    Erased,
    /// The head is cast once; the rest of the list is statically typed.
    Static,
}

/// How shared/exclusive access to node fields is accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorrowTracking {
    /// A borrow flag is checked and updated on every read.
    Runtime,
    /// Nodes are immutable after construction; no accounting.
    Frozen,
}

/// One point in the check-layer configuration space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckConfig {
    pub type_identity: TypeIdentity,
    pub borrow_tracking: BorrowTracking,
}

impl CheckConfig {
    /// Cast every node, borrow-check every read.
    pub const NAIVE: Self = Self {
        type_identity: TypeIdentity::Erased,
        borrow_tracking: BorrowTracking::Runtime,
    };

    /// One cast at entry, frozen nodes.
    pub const OPTIMIZED: Self = Self {
        type_identity: TypeIdentity::Static,
        borrow_tracking: BorrowTracking::Frozen,
    };

    /// All four combinations, naive first and optimized last.
    pub const ALL: [Self; 4] = [
        Self::NAIVE,
        Self {
            type_identity: TypeIdentity::Static,
            borrow_tracking: BorrowTracking::Runtime,
        },
        Self {
            type_identity: TypeIdentity::Erased,
            borrow_tracking: BorrowTracking::Frozen,
        },
        Self::OPTIMIZED,
    ];

    /// Variant name, e.g. `checked[erased,runtime]`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match (self.type_identity, self.borrow_tracking) {
            (TypeIdentity::Erased, BorrowTracking::Runtime) => "checked[erased,runtime]",
            (TypeIdentity::Static, BorrowTracking::Runtime) => "checked[static,runtime]",
            (TypeIdentity::Erased, BorrowTracking::Frozen) => "checked[erased,frozen]",
            (TypeIdentity::Static, BorrowTracking::Frozen) => "checked[static,frozen]",
        }
    }
}

/// Node storage selected by the borrow-tracking knob.
pub trait Storage: Sized + 'static {
    /// What an `Rc` actually points at.
    type Cell: 'static;
    const TRACKING: BorrowTracking;
    const KIND: &'static str;

    fn wrap(node: CheckedNode<Self>) -> Self::Cell;

    /// Run `f` against the node under whatever access check the storage needs.
    fn read<R>(
        cell: &Self::Cell,
        variant: &str,
        f: impl FnOnce(&CheckedNode<Self>) -> R,
    ) -> Result<R, VariantError>;

    fn into_node(cell: Self::Cell) -> CheckedNode<Self>;
}

/// `RefCell` storage: every read takes a shared-borrow guard.
#[derive(Debug)]
pub struct RuntimeBorrow;

impl Storage for RuntimeBorrow {
    type Cell = RefCell<CheckedNode<RuntimeBorrow>>;
    const TRACKING: BorrowTracking = BorrowTracking::Runtime;
    const KIND: &'static str = "CheckedNode";

    fn wrap(node: CheckedNode<Self>) -> Self::Cell {
        RefCell::new(node)
    }

    fn read<R>(
        cell: &Self::Cell,
        variant: &str,
        f: impl FnOnce(&CheckedNode<Self>) -> R,
    ) -> Result<R, VariantError> {
        let guard = cell.try_borrow().map_err(|_| VariantError::Borrow {
            variant: variant.to_string(),
        })?;
        Ok(f(&guard))
    }

    fn into_node(cell: Self::Cell) -> CheckedNode<Self> {
        cell.into_inner()
    }
}

/// Frozen storage: nodes are read in place.
#[derive(Debug)]
pub struct FrozenBorrow;

impl Storage for FrozenBorrow {
    type Cell = CheckedNode<FrozenBorrow>;
    const TRACKING: BorrowTracking = BorrowTracking::Frozen;
    const KIND: &'static str = "FrozenCheckedNode";

    fn wrap(node: CheckedNode<Self>) -> Self::Cell {
        node
    }

    fn read<R>(
        cell: &Self::Cell,
        _variant: &str,
        f: impl FnOnce(&CheckedNode<Self>) -> R,
    ) -> Result<R, VariantError> {
        Ok(f(cell))
    }

    fn into_node(cell: Self::Cell) -> CheckedNode<Self> {
        cell
    }
}

pub struct CheckedNode<S: Storage> {
    value: i64,
    next: Option<Rc<S::Cell>>,
}

impl<S: Storage> CheckedNode<S> {
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }

    #[must_use]
    pub fn next(&self) -> Option<&Rc<S::Cell>> {
        self.next.as_ref()
    }
}

impl<S: Storage> Drop for CheckedNode<S> {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(rc) = next {
            match Rc::try_unwrap(rc) {
                Ok(cell) => next = S::into_node(cell).next.take(),
                Err(_) => break,
            }
        }
    }
}

/// Ownership-checked variant for one storage choice and type-identity mode.
pub struct CheckedVariant<S: Storage> {
    config: CheckConfig,
    _storage: std::marker::PhantomData<S>,
}

impl<S: Storage> CheckedVariant<S> {
    #[must_use]
    pub fn new(type_identity: TypeIdentity) -> Self {
        Self {
            config: CheckConfig {
                type_identity,
                borrow_tracking: S::TRACKING,
            },
            _storage: std::marker::PhantomData,
        }
    }

    #[must_use]
    pub const fn config(&self) -> CheckConfig {
        self.config
    }

    fn name_str(&self) -> &'static str {
        self.config.label()
    }
}

/// Build the checked variant for any configuration.
#[must_use]
pub fn checked_variant(config: CheckConfig) -> Box<dyn NodeVariant> {
    match config.borrow_tracking {
        BorrowTracking::Runtime => {
            Box::new(CheckedVariant::<RuntimeBorrow>::new(config.type_identity))
        }
        BorrowTracking::Frozen => {
            Box::new(CheckedVariant::<FrozenBorrow>::new(config.type_identity))
        }
    }
}

/// Walk typed handles: one cast already happened at the boundary.
fn sum_static<S: Storage>(head: Rc<S::Cell>, variant: &str) -> Result<i64, VariantError> {
    let mut total: i64 = 0;
    let mut current = head;
    loop {
        let (value, next) = S::read(&current, variant, |node| (node.value, node.next.clone()))?;
        total = total.wrapping_add(value);
        match next {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(total)
}

/// Walk erased handles, casting every node.
fn sum_erased<S: Storage>(head: Rc<dyn Any>, variant: &str) -> Result<i64, VariantError> {
    let mut total: i64 = 0;
    let mut current = head;
    loop {
        let cell = current
            .downcast_ref::<S::Cell>()
            .ok_or_else(|| VariantError::type_mismatch(variant, S::KIND, "foreign node"))?;
        let (value, next) = S::read(cell, variant, |node| (node.value, node.next.clone()))?;
        total = total.wrapping_add(value);
        match next {
            Some(next) => current = next as Rc<dyn Any>,
            None => break,
        }
    }
    Ok(total)
}

impl<S: Storage> NodeVariant for CheckedVariant<S> {
    fn name(&self) -> &str {
        self.name_str()
    }

    fn construct(&self, args: &[Value]) -> Result<Object, VariantError> {
        let name = self.name_str();
        let (value, next) = node_args(name, args)?;
        let next = match next {
            None => None,
            Some(obj) => Some(
                obj.downcast_rc::<S::Cell>()
                    .ok_or_else(|| foreign_next(name, S::KIND, obj))?,
            ),
        };
        let cell = S::wrap(CheckedNode { value, next });
        Ok(Object::from_rc(S::KIND, Rc::new(cell)))
    }

    fn sum(&self, head: &Value) -> Result<i64, VariantError> {
        let name = self.name_str();
        let obj = match head {
            Value::None => return Ok(0),
            Value::Object(obj) => obj,
            other => {
                return Err(VariantError::type_mismatch(name, S::KIND, other.type_name()));
            }
        };
        if !obj.is::<S::Cell>() {
            return Err(VariantError::type_mismatch(name, S::KIND, obj.kind()));
        }

        match self.config.type_identity {
            TypeIdentity::Static => {
                let first = obj
                    .downcast_rc::<S::Cell>()
                    .ok_or_else(|| VariantError::type_mismatch(name, S::KIND, obj.kind()))?;
                sum_static::<S>(first, name)
            }
            TypeIdentity::Erased => sum_erased::<S>(Rc::clone(obj.erased()), name),
        }
    }

    fn attr(&self, node: &Object, field: Field) -> Result<Value, VariantError> {
        let name = self.name_str();
        let cell = node
            .downcast_ref::<S::Cell>()
            .ok_or_else(|| VariantError::type_mismatch(name, S::KIND, node.kind()))?;
        S::read(cell, name, |node| match field {
            Field::Value => Value::Int(node.value),
            Field::Next => node
                .next
                .clone()
                .map(|next| Value::Object(Object::from_rc(S::KIND, next)))
                .unwrap_or_default(),
        })
    }

    fn footprint(&self) -> Footprint {
        Footprint::of_rc::<S::Cell>(0, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(variant: &dyn NodeVariant, n: i64) -> Value {
        let mut head = Value::None;
        for i in (0..n).rev() {
            head = Value::Object(variant.construct(&[Value::Int(i), head]).unwrap());
        }
        head
    }

    #[test]
    fn every_configuration_sums_correctly() {
        for config in CheckConfig::ALL {
            let variant = checked_variant(config);
            assert_eq!(variant.name(), config.label());
            let head = build(variant.as_ref(), 100);
            assert_eq!(variant.sum(&head).unwrap(), 4950, "{}", config.label());
            assert_eq!(variant.sum(&Value::None).unwrap(), 0);
        }
    }

    #[test]
    fn traversal_releases_every_reference_it_takes() {
        let variant = CheckedVariant::<FrozenBorrow>::new(TypeIdentity::Static);
        let head = build(&variant, 3);
        let first = head
            .as_object()
            .unwrap()
            .downcast_rc::<CheckedNode<FrozenBorrow>>()
            .unwrap();
        let second = Rc::clone(first.next().unwrap());
        let before = Rc::strong_count(&second);
        variant.sum(&head).unwrap();
        assert_eq!(Rc::strong_count(&second), before);
    }

    #[test]
    fn runtime_tracking_refuses_reads_under_exclusive_borrow() {
        let variant = CheckedVariant::<RuntimeBorrow>::new(TypeIdentity::Static);
        let head = build(&variant, 3);
        let first = head
            .as_object()
            .unwrap()
            .downcast_rc::<RefCell<CheckedNode<RuntimeBorrow>>>()
            .unwrap();
        let _exclusive = first.borrow_mut();
        let err = variant.sum(&head).unwrap_err();
        assert_eq!(
            err,
            VariantError::Borrow {
                variant: "checked[static,runtime]".to_string()
            }
        );
    }

    #[test]
    fn storage_kinds_are_distinct_types() {
        let runtime = checked_variant(CheckConfig::NAIVE);
        let frozen = checked_variant(CheckConfig::OPTIMIZED);
        let head = build(runtime.as_ref(), 2);
        assert!(frozen.sum(&head).unwrap_err().is_type_error());
        assert!(
            frozen
                .construct(&[Value::Int(0), head])
                .unwrap_err()
                .is_argument_error()
        );
    }

    #[test]
    fn refcell_adds_one_word_of_borrow_state() {
        let runtime = checked_variant(CheckConfig::NAIVE).footprint();
        let frozen = checked_variant(CheckConfig::OPTIMIZED).footprint();
        assert_eq!(
            runtime.object_bytes - frozen.object_bytes,
            std::mem::size_of::<isize>()
        );
    }

    #[test]
    fn labels_are_unique() {
        let mut labels: Vec<_> = CheckConfig::ALL.iter().map(|c| c.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn long_list_drops_without_recursion() {
        let variant = checked_variant(CheckConfig::NAIVE);
        drop(build(variant.as_ref(), 300_000));
    }
}
