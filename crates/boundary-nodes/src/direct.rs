//! Direct-access nodes: traversal follows plain borrowed references.
//!
//! The head is type-checked once at the boundary. After that the walk is a
//! load, an add and a pointer chase per node: no casts, no borrow flags and no
//! reference-count traffic. Validity comes from the borrow checker: the list
//! is acyclic and cannot be mutated while `sum` holds a shared borrow of it.
//!
//! Two layouts exist. [`Untracked`] nodes carry only `value` and `next`;
//! [`TrackingHeader`] nodes additionally carry the two-word bookkeeping a
//! cycle collector needs. Everything else is identical, so the pair isolates
//! the cache cost of the header.

use std::cell::Cell;
use std::marker::PhantomData;
use std::mem::size_of;
use std::rc::Rc;

use crate::error::VariantError;
use crate::object::{Object, Value};
use crate::variant::{Field, Footprint, NodeVariant, foreign_next, node_args};

/// Size of the collection-tracking header (16 bytes on 64-bit targets).
pub const TRACKING_HEADER_BYTES: usize = size_of::<TrackingHeader>();

/// Per-node header layout chosen at compile time.
pub trait Header: Sized + 'static {
    const TRACKED: bool;
    /// Variant name reported by the harness.
    const NAME: &'static str;
    /// Node type name used in diagnostics.
    const KIND: &'static str;

    fn register(collector: &Collector) -> Self;
}

/// No header at all; zero-sized.
#[derive(Debug, Clone, Copy, Default)]
pub struct Untracked;

impl Header for Untracked {
    const TRACKED: bool = false;
    const NAME: &'static str = "direct";
    const KIND: &'static str = "DirectNode";

    fn register(_collector: &Collector) -> Self {
        Self
    }
}

/// Cycle-collector bookkeeping: generation and registration ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct TrackingHeader {
    generation: usize,
    ordinal: usize,
}

impl TrackingHeader {
    #[must_use]
    pub const fn generation(&self) -> usize {
        self.generation
    }

    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }
}

impl Header for TrackingHeader {
    const TRACKED: bool = true;
    const NAME: &'static str = "direct+gc";
    const KIND: &'static str = "TrackedDirectNode";

    fn register(collector: &Collector) -> Self {
        collector.register()
    }
}

/// Registers tracked nodes as they are created.
#[derive(Debug, Default)]
pub struct Collector {
    registered: Cell<usize>,
}

impl Collector {
    fn register(&self) -> TrackingHeader {
        let ordinal = self.registered.get();
        self.registered.set(ordinal + 1);
        TrackingHeader {
            generation: 0,
            ordinal,
        }
    }

    /// Number of nodes registered so far.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.registered.get()
    }
}

/// One node. `repr(C)` keeps the header first and the payload layout fixed.
#[repr(C)]
pub struct DirectNode<H> {
    header: H,
    value: i64,
    next: Option<Rc<DirectNode<H>>>,
}

impl<H> DirectNode<H> {
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }

    #[must_use]
    pub fn next(&self) -> Option<&DirectNode<H>> {
        self.next.as_deref()
    }

    #[must_use]
    pub const fn header(&self) -> &H {
        &self.header
    }
}

impl<H> Drop for DirectNode<H> {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(rc) = next {
            match Rc::try_unwrap(rc) {
                Ok(mut node) => next = node.next.take(),
                Err(_) => break,
            }
        }
    }
}

/// Sum a list by following borrowed references.
#[must_use]
pub fn sum_direct<H>(head: &DirectNode<H>) -> i64 {
    let mut total: i64 = 0;
    let mut current = Some(head);
    while let Some(node) = current {
        total = total.wrapping_add(node.value);
        current = node.next.as_deref();
    }
    total
}

/// Direct-access variant parameterised by header layout.
pub struct DirectVariant<H: Header> {
    collector: Collector,
    _header: PhantomData<H>,
}

pub type DirectUntracked = DirectVariant<Untracked>;
pub type DirectTracked = DirectVariant<TrackingHeader>;

impl<H: Header> DirectVariant<H> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collector: Collector::default(),
            _header: PhantomData,
        }
    }

    #[must_use]
    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    fn node<'a>(&self, obj: &'a Object) -> Result<&'a DirectNode<H>, VariantError> {
        obj.downcast_ref::<DirectNode<H>>()
            .ok_or_else(|| VariantError::type_mismatch(H::NAME, H::KIND, obj.kind()))
    }
}

impl<H: Header> Default for DirectVariant<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Header> NodeVariant for DirectVariant<H> {
    fn name(&self) -> &str {
        H::NAME
    }

    fn construct(&self, args: &[Value]) -> Result<Object, VariantError> {
        let (value, next) = node_args(H::NAME, args)?;
        let next = match next {
            None => None,
            Some(obj) => Some(
                obj.downcast_rc::<DirectNode<H>>()
                    .ok_or_else(|| foreign_next(H::NAME, H::KIND, obj))?,
            ),
        };
        let node = Rc::new(DirectNode {
            header: H::register(&self.collector),
            value,
            next,
        });
        Ok(Object::from_rc(H::KIND, node))
    }

    fn sum(&self, head: &Value) -> Result<i64, VariantError> {
        match head {
            Value::None => Ok(0),
            Value::Object(obj) => Ok(sum_direct(self.node(obj)?)),
            other => Err(VariantError::type_mismatch(H::NAME, H::KIND, other.type_name())),
        }
    }

    fn attr(&self, node: &Object, field: Field) -> Result<Value, VariantError> {
        let node = self.node(node)?;
        Ok(match field {
            Field::Value => Value::Int(node.value),
            Field::Next => node
                .next
                .as_ref()
                .map(|next| Value::Object(Object::from_rc(H::KIND, Rc::clone(next))))
                .unwrap_or_default(),
        })
    }

    fn footprint(&self) -> Footprint {
        let header_bytes = if H::TRACKED { size_of::<H>() } else { 0 };
        Footprint::of_rc::<DirectNode<H>>(header_bytes, H::TRACKED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build<H: Header>(variant: &DirectVariant<H>, n: i64) -> Value {
        let mut head = Value::None;
        for i in (0..n).rev() {
            head = Value::Object(variant.construct(&[Value::Int(i), head]).unwrap());
        }
        head
    }

    #[test]
    fn tracked_nodes_register_with_collector() {
        let variant = DirectTracked::new();
        let head = build(&variant, 5);
        assert_eq!(variant.collector().registered(), 5);
        let first = head.as_object().unwrap();
        let node = first.downcast_ref::<DirectNode<TrackingHeader>>().unwrap();
        // Built tail first, so the head is the last one registered.
        assert_eq!(node.header().ordinal(), 4);
        assert_eq!(node.header().generation(), 0);
        assert_eq!(variant.sum(&head).unwrap(), 10);
    }

    #[test]
    fn untracked_header_is_zero_sized() {
        assert_eq!(size_of::<Untracked>(), 0);
        assert_eq!(TRACKING_HEADER_BYTES, 2 * size_of::<usize>());
        let variant = DirectUntracked::new();
        assert_eq!(variant.collector().registered(), 0);
        let head = build(&variant, 3);
        assert_eq!(variant.collector().registered(), 0);
        assert_eq!(variant.sum(&head).unwrap(), 3);
    }

    #[test]
    fn layouts_differ_only_by_header() {
        let plain = DirectUntracked::new().footprint();
        let tracked = DirectTracked::new().footprint();
        assert_eq!(
            tracked.object_bytes - plain.object_bytes,
            TRACKING_HEADER_BYTES
        );
        assert_eq!(tracked.header_bytes, TRACKING_HEADER_BYTES);
        assert_eq!(plain.header_bytes, 0);
        assert!(tracked.collection_tracked && !plain.collection_tracked);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn footprints_match_documented_sizes() {
        assert_eq!(DirectUntracked::new().footprint().object_bytes, 32);
        assert_eq!(DirectTracked::new().footprint().object_bytes, 48);
    }

    #[test]
    fn tracked_and_untracked_nodes_do_not_mix() {
        let plain = DirectUntracked::new();
        let tracked = DirectTracked::new();
        let plain_head = build(&plain, 3);

        let err = tracked.sum(&plain_head).unwrap_err();
        assert!(err.is_type_error());

        let err = tracked
            .construct(&[Value::Int(9), plain_head])
            .unwrap_err();
        assert!(err.is_argument_error());
    }

    #[test]
    fn borrowed_walk_visits_every_node() {
        let variant = DirectUntracked::new();
        let head = build(&variant, 4);
        let mut seen = Vec::new();
        let mut current = head
            .as_object()
            .unwrap()
            .downcast_ref::<DirectNode<Untracked>>();
        while let Some(node) = current {
            seen.push(node.value());
            current = node.next();
        }
        assert_eq!(seen, [0, 1, 2, 3]);
    }

    #[test]
    fn long_list_drops_without_recursion() {
        drop(build(&DirectTracked::new(), 500_000));
    }
}
