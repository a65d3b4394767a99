//! Dynamically typed values crossing the variant boundary.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Type-erased, reference-counted handle to one node.
///
/// Cloning is a reference-count increment. The `kind` tag names the node type
/// for diagnostics only; identity checks always go through a real downcast.
#[derive(Clone)]
pub struct Object {
    kind: &'static str,
    inner: Rc<dyn Any>,
}

impl Object {
    /// Allocate `node` and wrap it.
    #[must_use]
    pub fn new<T: Any>(kind: &'static str, node: T) -> Self {
        Self::from_rc(kind, Rc::new(node))
    }

    /// Wrap an existing allocation without copying it.
    #[must_use]
    pub fn from_rc<T: Any>(kind: &'static str, node: Rc<T>) -> Self {
        Self { kind, inner: node }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Typed owning handle to the same allocation, if the node is a `T`.
    #[must_use]
    pub fn downcast_rc<T: Any>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.inner).downcast::<T>().ok()
    }

    /// The erased handle itself.
    #[must_use]
    pub fn erased(&self) -> &Rc<dyn Any> {
        &self.inner
    }

    #[must_use]
    pub fn into_erased(self) -> Rc<dyn Any> {
        self.inner
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} object at {:p}>",
            self.kind,
            Rc::as_ptr(&self.inner).cast::<()>()
        )
    }
}

/// A boundary value: construction arguments and summation heads are all `Value`s.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The absence sentinel terminating a list.
    #[default]
    None,
    Int(i64),
    Float(f64),
    Str(String),
    Object(Object),
}

impl Value {
    /// Short type name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Object(obj) => obj.kind(),
        }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Self::Object(obj)
    }
}

impl From<Option<Object>> for Value {
    fn from(obj: Option<Object>) -> Self {
        obj.map_or(Self::None, Self::Object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_shares_the_allocation() {
        let obj = Object::new("Probe", 7_i64);
        let typed = obj.downcast_rc::<i64>().unwrap();
        assert_eq!(*typed, 7);
        assert_eq!(Rc::strong_count(&typed), 2);
        assert!(obj.downcast_rc::<u8>().is_none());
    }

    #[test]
    fn type_names_follow_object_kind() {
        assert_eq!(Value::None.type_name(), "None");
        assert_eq!(Value::Float(1.5).type_name(), "float");
        let obj = Object::new("Probe", ());
        assert_eq!(Value::from(obj.clone()).type_name(), "Probe");
        assert!(Value::from(None::<Object>).is_none());
        assert!(format!("{obj:?}").starts_with("<Probe object at "));
    }
}
