//! Opaque host data
//!
//! Hosts hand scripts two kinds of opaque values. An [`ApplicPtr`] wraps a
//! shared host pointer tagged with a type token; scripts can store, copy and
//! compare it but never look inside. An [`ApplicObj`] wraps a boxed
//! [`HostObject`] that may expose members and methods of its own.
//!
//! Type identity is the address of an [`ApplicObjType`] token, so tokens
//! must be declared as `static` items:
//!
//! ```
//! use escript_value::ApplicObjType;
//!
//! static ACCOUNT: ApplicObjType = ApplicObjType::new("Account");
//! ```

use std::any::Any;
use std::fmt;
use std::ptr;
use std::sync::Arc;

use crate::kind::Kind;
use crate::value::Value;

/// Identity token for a family of host values.
#[derive(Debug)]
pub struct ApplicObjType {
    name: &'static str,
}

impl ApplicObjType {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Token identity, not name equality.
    pub fn is(&self, other: &ApplicObjType) -> bool {
        ptr::eq(self, other)
    }
}

/// Shared host pointer tagged with a type token.
#[derive(Clone)]
pub struct ApplicPtr {
    pointer_type: &'static ApplicObjType,
    ptr: Arc<dyn Any + Send + Sync>,
}

impl ApplicPtr {
    pub fn new<T: Any + Send + Sync>(pointer_type: &'static ApplicObjType, ptr: Arc<T>) -> Self {
        Self { pointer_type, ptr }
    }

    pub fn pointer_type(&self) -> &'static ApplicObjType {
        self.pointer_type
    }

    /// Recover the host pointer if `expected` is the token it was created
    /// with and the payload has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, expected: &'static ApplicObjType) -> Option<Arc<T>> {
        if !self.pointer_type.is(expected) {
            return None;
        }
        Arc::clone(&self.ptr).downcast::<T>().ok()
    }

    /// Same token and same pointee.
    pub fn same_pointer(&self, other: &ApplicPtr) -> bool {
        self.pointer_type.is(other.pointer_type) && Arc::ptr_eq(&self.ptr, &other.ptr)
    }
}

impl fmt::Debug for ApplicPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicPtr")
            .field("type", &self.pointer_type.name)
            .finish_non_exhaustive()
    }
}

/// Behavior a host type exposes to scripts.
///
/// Only `copy_object` and `as_any` are required. Every other hook declines
/// by default.
pub trait HostObject: Any + fmt::Debug + Send + Sync {
    /// Kind reported to scripts; host reference kinds override this.
    fn kind(&self) -> Kind {
        Kind::ApplicObj
    }

    /// Name reported by `typeof`.
    fn type_of(&self) -> &'static str {
        self.kind().name()
    }

    /// Copy for script-level assignment.
    fn copy_object(&self) -> Box<dyn HostObject>;

    fn size_estimate(&self) -> usize {
        0
    }

    fn is_equal(&self, _other: &Value) -> bool {
        false
    }

    fn get_member(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Handle a script method call. `None` means the method is unknown.
    fn call_method(&mut self, _name: &str, _args: &[Value]) -> Option<Value> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Host object owned by a script value.
pub struct ApplicObj {
    object_type: &'static ApplicObjType,
    obj: Box<dyn HostObject>,
}

impl ApplicObj {
    pub fn new(object_type: &'static ApplicObjType, obj: Box<dyn HostObject>) -> Self {
        Self { object_type, obj }
    }

    pub fn object_type(&self) -> &'static ApplicObjType {
        self.object_type
    }

    pub fn type_name(&self) -> &'static str {
        self.object_type.name
    }

    pub fn kind(&self) -> Kind {
        self.obj.kind()
    }

    pub fn type_of(&self) -> &'static str {
        self.obj.type_of()
    }

    pub fn size_estimate(&self) -> usize {
        self.obj.size_estimate()
    }

    pub fn is_equal(&self, other: &Value) -> bool {
        self.obj.is_equal(other)
    }

    pub fn get_member(&self, name: &str) -> Option<Value> {
        self.obj.get_member(name)
    }

    pub fn call_method(&mut self, name: &str, args: &[Value]) -> Option<Value> {
        self.obj.call_method(name, args)
    }

    /// Borrow the host object if the token and concrete type match.
    pub fn get<T: HostObject>(&self, expected: &'static ApplicObjType) -> Option<&T> {
        if !self.object_type.is(expected) {
            return None;
        }
        self.obj.as_any().downcast_ref::<T>()
    }
}

impl Clone for ApplicObj {
    fn clone(&self) -> Self {
        Self {
            object_type: self.object_type,
            obj: self.obj.copy_object(),
        }
    }
}

impl fmt::Debug for ApplicObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicObj")
            .field("type", &self.object_type.name)
            .field("obj", &self.obj)
            .finish()
    }
}
