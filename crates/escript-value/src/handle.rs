//! Handles and references
//!
//! A [`Handle`] is the mutable cell a script variable names. It holds one
//! [`ValuePtr`]; assigning through a handle is visible to every
//! [`Reference`] that points at it, while rebinding a reference only
//! changes that reference.
//!
//! Handles may share a block (a fresh copy of an array element, the
//! shared Uninit value). Writes never go through a shared block: the handle
//! first moves its value into a block of its own.
//!
//! Reads take a snapshot of the current block and release the lock before
//! returning, so a value read from a handle can be fed back into that same
//! handle (`x += x`).

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::kind::Kind;
use crate::ops::{self, BinaryOp};
use crate::pool::Pooled;
use crate::runtime::{Runtime, ValuePtr};
use crate::value::Value;

/// Mutable cell holding one value.
pub struct Handle {
    runtime: Runtime,
    instance: Option<u64>,
    slot: RwLock<ValuePtr>,
}

/// Snapshot of a handle's value.
///
/// Holds the block the handle pointed at when it was read. Writes to the
/// handle while the snapshot is alive go to a fresh block and are not seen
/// through it.
pub struct ValueGuard {
    ptr: ValuePtr,
}

impl Deref for ValueGuard {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.ptr
    }
}

impl Handle {
    pub(crate) fn new(runtime: Runtime, ptr: ValuePtr) -> Self {
        let instance = runtime.register_instance(ptr.kind());
        Self {
            runtime,
            instance,
            slot: RwLock::new(ptr),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Debug instance id; `None` unless the runtime is instrumented.
    pub fn instance(&self) -> Option<u64> {
        self.instance
    }

    pub fn value(&self) -> ValueGuard {
        ValueGuard {
            ptr: self.imp_ptr(),
        }
    }

    /// Execute a closure with access to the current value
    pub fn with_value<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        let ptr = self.imp_ptr();
        f(&ptr)
    }

    /// Execute a closure with mutable access to the current value
    ///
    /// A shared block is copied before the closure runs. The closure must
    /// not access this handle.
    pub fn with_value_mut<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        let mut slot = self.write();
        if Pooled::get_mut(&mut *slot).is_none() {
            let current: &Value = &slot;
            let copy = current.clone();
            *slot = self.runtime.alloc_unshared(copy);
        }
        match Pooled::get_mut(&mut *slot) {
            Some(value) => f(value),
            None => unreachable!("freshly allocated block is unshared"),
        }
    }

    pub fn kind(&self) -> Kind {
        self.read().kind()
    }

    pub fn is_true(&self) -> bool {
        self.read().is_true()
    }

    /// The block this handle currently holds.
    pub fn imp_ptr(&self) -> ValuePtr {
        let slot = self.read();
        Pooled::clone(&*slot)
    }

    /// Copy `value` into this handle.
    pub fn assign(&self, value: &Value) {
        self.set_value(value.clone());
    }

    /// Move `value` into this handle.
    ///
    /// The current block is reused when this handle is its only holder and
    /// the kinds match; otherwise a block comes from the runtime.
    pub fn set_value(&self, value: Value) {
        let mut slot = self.write();
        if let Some(current) = Pooled::get_mut(&mut *slot) {
            if current.kind() == value.kind() {
                *current = value;
                return;
            }
        }
        *slot = self.runtime.alloc(value);
    }

    /// Rebind this handle to another block.
    pub fn set_imp(&self, ptr: ValuePtr) {
        *self.write() = ptr;
    }

    /// An independent handle with a copy of the value.
    ///
    /// The block is shared until either handle writes.
    pub fn clone_handle(&self) -> Handle {
        self.runtime.new_handle(self.imp_ptr())
    }

    /// `self <op>= rhs`.
    ///
    /// Array `+=` appends in place; every other combination assigns the
    /// result of [`ops::binary`]. `rhs` may be a value read from this handle.
    pub fn apply_in_place(&self, op: BinaryOp, rhs: &Value) {
        if op == BinaryOp::Add && !rhs.is_error() && self.kind() == Kind::Array {
            let appended: Vec<Reference> = match rhs {
                Value::Array(other) => other.refs().iter().map(Reference::deep_clone).collect(),
                other => vec![self.runtime.bind(other.clone())],
            };
            self.with_value_mut(|value| {
                if let Value::Array(arr) = value {
                    arr.refs_mut().extend(appended);
                }
            });
            return;
        }

        let result = self.with_value(|lhs| ops::binary(&self.runtime, op, lhs, rhs));
        self.set_value(result);
    }

    /// `++`; non-numeric values are left unchanged.
    pub fn increment(&self) {
        if self.kind().is_numeric() {
            self.with_value_mut(Value::increment);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ValuePtr> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ValuePtr> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(id) = self.instance {
            self.runtime.unregister_instance(id);
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("instance", &self.instance)
            .field("value", &*self.value())
            .finish()
    }
}

/// Nullable shared pointer to a [`Handle`].
#[derive(Clone, Default)]
pub struct Reference(Option<Arc<Handle>>);

impl Reference {
    pub fn null() -> Self {
        Self(None)
    }

    pub fn new(handle: Arc<Handle>) -> Self {
        Self(Some(handle))
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn get(&self) -> Option<&Arc<Handle>> {
        self.0.as_ref()
    }

    /// The referenced handle.
    ///
    /// # Panics
    ///
    /// Panics if the reference is null. Check with [`Reference::get`] where
    /// null is possible.
    pub fn handle(&self) -> &Handle {
        match &self.0 {
            Some(handle) => handle,
            None => panic!("dereferenced a null reference"),
        }
    }

    /// Rebind to another handle.
    pub fn set(&mut self, handle: Arc<Handle>) {
        self.0 = Some(handle);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    /// Both null, or both pointing at the same handle.
    pub fn ptr_eq(&self, other: &Reference) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// A reference to a new handle holding a copy of the value.
    pub fn deep_clone(&self) -> Reference {
        match &self.0 {
            Some(handle) => Reference::new(Arc::new(handle.clone_handle())),
            None => Reference::null(),
        }
    }
}

impl From<Arc<Handle>> for Reference {
    fn from(handle: Arc<Handle>) -> Self {
        Reference::new(handle)
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(handle) => fmt::Debug::fmt(handle, f),
            None => f.write_str("Reference(null)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_is_visible_through_aliases() {
        let rt = Runtime::new();
        let a = rt.bind(Value::from(1));
        let b = a.clone();
        a.handle().assign(&Value::from(2));
        assert_eq!(*b.handle().value(), Value::from(2));
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_assign_reuses_unshared_block() {
        let rt = Runtime::new();
        let r = rt.bind(Value::from(1));
        r.handle().assign(&Value::from(5));
        assert_eq!(*r.handle().value(), Value::from(5));
        assert_eq!(rt.pool_stats(Kind::Integer).allocated, 1);
    }

    #[test]
    fn test_assign_other_kind_replaces_block() {
        let rt = Runtime::new();
        let r = rt.bind(Value::from(1));
        r.handle().assign(&Value::from("one"));
        assert_eq!(r.handle().kind(), Kind::String);
        assert_eq!(rt.pool_stats(Kind::Integer).in_use(), 0);
        assert_eq!(rt.pool_stats(Kind::String).in_use(), 1);
    }

    #[test]
    fn test_clone_handle_is_independent() {
        let rt = Runtime::new();
        let original = rt.bind(Value::from(10));
        let copy = original.handle().clone_handle();
        assert!(Pooled::ptr_eq(&original.handle().imp_ptr(), &copy.imp_ptr()));

        copy.assign(&Value::from(11));
        assert_eq!(*original.handle().value(), Value::from(10));
        assert_eq!(*copy.value(), Value::from(11));
    }

    #[test]
    fn test_uninit_block_is_never_written() {
        let rt = Runtime::new();
        let a = rt.uninit();
        let b = rt.uninit();
        assert!(Pooled::ptr_eq(&a.handle().imp_ptr(), &b.handle().imp_ptr()));

        a.handle().with_value_mut(|v| *v = Value::from(3));
        assert_eq!(*a.handle().value(), Value::from(3));
        assert!(b.handle().value().is_uninit());
        assert!(rt.uninit().handle().value().is_uninit());
    }

    #[test]
    fn test_set_imp_rebinds() {
        let rt = Runtime::new();
        let a = rt.bind(Value::from("shared"));
        let b = rt.bind(Value::from(0));
        b.handle().set_imp(a.handle().imp_ptr());
        assert_eq!(*b.handle().value(), Value::from("shared"));

        b.handle().with_value_mut(|v| *v = Value::from("changed"));
        assert_eq!(*a.handle().value(), Value::from("shared"));
    }

    #[test]
    fn test_apply_in_place_array_append_aliases() {
        let rt = Runtime::new();
        let a = rt.bind(rt.array([Value::from(1)]));
        let alias = a.clone();
        a.handle().apply_in_place(BinaryOp::Add, &Value::from(2));
        let len = alias.handle().with_value(|v| v.as_obj_array().map(|arr| arr.len()));
        assert_eq!(len, Some(2));
    }

    #[test]
    fn test_apply_in_place_numeric() {
        let rt = Runtime::new();
        let n = rt.bind(Value::from(3));
        n.handle().apply_in_place(BinaryOp::Mul, &Value::from(4));
        assert_eq!(*n.handle().value(), Value::from(12));

        n.handle().apply_in_place(BinaryOp::Div, &Value::from(0));
        assert!(n.handle().value().is_error());
    }

    #[test]
    fn test_apply_in_place_with_own_value() {
        let rt = Runtime::new();
        let x = rt.bind(Value::from(2));
        let rhs = x.handle().value();
        x.handle().apply_in_place(BinaryOp::Add, &rhs);
        assert_eq!(*x.handle().value(), Value::from(4));
        assert_eq!(*rhs, Value::from(2));
        drop(rhs);

        let s = rt.bind(Value::from("ab"));
        s.handle().with_value(|v| s.handle().apply_in_place(BinaryOp::Add, v));
        assert_eq!(*s.handle().value(), Value::from("abab"));
    }

    #[test]
    fn test_array_plus_equals_itself() {
        let rt = Runtime::new();
        let a = rt.bind(rt.array([Value::from(1), Value::from(2)]));
        let rhs = a.handle().value();
        a.handle().apply_in_place(BinaryOp::Add, &rhs);
        assert_eq!(a.handle().value().to_string(), "{ 1, 2, 1, 2 }");
        assert_eq!(rhs.to_string(), "{ 1, 2 }");
    }

    #[test]
    fn test_snapshot_does_not_see_later_writes() {
        let rt = Runtime::new();
        let n = rt.bind(Value::from(1));
        let before = n.handle().value();
        n.handle().assign(&Value::from(2));
        assert_eq!(*before, Value::from(1));
        assert_eq!(*n.handle().value(), Value::from(2));
    }

    #[test]
    fn test_increment() {
        let rt = Runtime::new();
        let n = rt.bind(Value::from(1));
        n.handle().increment();
        assert_eq!(*n.handle().value(), Value::from(2));

        let s = rt.bind(Value::from("a"));
        s.handle().increment();
        assert_eq!(*s.handle().value(), Value::from("a"));
    }

    #[test]
    fn test_null_reference() {
        let r = Reference::default();
        assert!(r.is_null());
        assert!(r.get().is_none());
        assert!(r.ptr_eq(&Reference::null()));
        assert!(r.deep_clone().is_null());
    }

    #[test]
    #[should_panic(expected = "null reference")]
    fn test_null_dereference_panics() {
        Reference::null().handle();
    }

    #[test]
    fn test_reference_counting_returns_block() {
        let rt = Runtime::new();
        let first = rt.bind(Value::from("x"));
        let others: Vec<Reference> = (0..4).map(|_| first.clone()).collect();
        drop(first);
        assert_eq!(rt.pool_stats(Kind::String).in_use(), 1);
        drop(others);
        assert_eq!(rt.pool_stats(Kind::String).in_use(), 0);
        assert_eq!(rt.pool_stats(Kind::String).deallocated, 1);
    }
}
