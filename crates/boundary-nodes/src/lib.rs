//! Linked-list node variants for the boundary crossing benchmark.
//!
//! Every variant speaks the same two-call boundary:
//! - `construct(value, next)` builds one node from dynamically typed arguments;
//! - `sum(head)` walks the list and returns the total of all `value` fields.
//!
//! What differs is what happens per node while walking:
//! - [`managed`]: dictionary-backed dynamic objects (the managed baseline);
//! - [`direct`]: plain borrowed references, with or without a collection header;
//! - [`checked`]: reference counting plus configurable type/borrow checks;
//! - [`arena`]: one arena per variant, nodes linked by index.
//!
//! Node handles are `Rc`-based and therefore `!Send`: the single-owner
//! execution model the experiment assumes is enforced by the compiler.

#![forbid(unsafe_code)]

pub mod arena;
pub mod checked;
pub mod direct;
pub mod error;
pub mod managed;
pub mod object;
pub mod variant;

pub use arena::ArenaVariant;
pub use checked::{BorrowTracking, CheckConfig, CheckedVariant, TypeIdentity, checked_variant};
pub use direct::{DirectTracked, DirectUntracked, DirectVariant, TRACKING_HEADER_BYTES};
pub use error::VariantError;
pub use managed::ManagedVariant;
pub use object::{Object, Value};
pub use variant::{Field, Footprint, NodeVariant};
