//! Element storage shared by arrays and structs
//!
//! An [`ObjArray`] is an ordered list of element references plus, in struct
//! mode, a parallel list of member names. Cloning shares the element list;
//! the first mutation through a shared list copies every element first, so
//! a copied array never observes writes made through the original.

use std::mem;
use std::sync::Arc;

use crate::handle::{Handle, Reference};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct ObjArray {
    names: Vec<String>,
    refs: Arc<Vec<Reference>>,
}

impl ObjArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Element references in order.
    pub fn refs(&self) -> &[Reference] {
        &self.refs
    }

    /// Member names; empty for plain arrays.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether another array still shares this element list.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.refs) > 1
    }

    /// Mutable element list, copied first if shared.
    pub fn refs_mut(&mut self) -> &mut Vec<Reference> {
        if Arc::get_mut(&mut self.refs).is_none() {
            self.deepcopy();
        }
        Arc::make_mut(&mut self.refs)
    }

    /// Replace every element with an independent copy.
    pub fn deepcopy(&mut self) {
        let copied = self.refs.iter().map(Reference::deep_clone).collect();
        self.refs = Arc::new(copied);
    }

    /// Element at a 1-based index.
    pub fn imp_at(&self, index: i32) -> Option<&Reference> {
        let index = usize::try_from(index).ok()?.checked_sub(1)?;
        self.refs.get(index)
    }

    /// Element at a 1-based index, for writing through.
    pub fn imp_at_mut(&mut self, index: i32) -> Option<Reference> {
        let index = usize::try_from(index).ok()?.checked_sub(1)?;
        if index >= self.refs.len() {
            return None;
        }
        Some(self.refs_mut()[index].clone())
    }

    /// Append an element. Arrays only; structs use [`ObjArray::add_member`].
    pub fn push(&mut self, element: Reference) {
        debug_assert!(!element.is_null(), "array elements are never null");
        debug_assert!(self.names.is_empty(), "push on a struct");
        self.refs_mut().push(element);
    }

    /// Insert before the 0-based `position`.
    pub fn insert(&mut self, position: usize, element: Reference) {
        debug_assert!(!element.is_null(), "array elements are never null");
        self.refs_mut().insert(position, element);
    }

    /// Remove the element at the 0-based `position`.
    pub fn remove(&mut self, position: usize) -> Reference {
        if !self.names.is_empty() {
            self.names.remove(position);
        }
        self.refs_mut().remove(position)
    }

    /// Append copies of every element of `other`.
    pub fn extend_copies(&mut self, other: &ObjArray) {
        let copies: Vec<Reference> = other.refs.iter().map(Reference::deep_clone).collect();
        self.refs_mut().extend(copies);
    }

    /// Append a named member. Names are not checked for duplicates.
    pub fn add_member(&mut self, name: impl Into<String>, element: Reference) {
        debug_assert!(!element.is_null(), "struct members are never null");
        debug_assert_eq!(self.names.len(), self.refs.len());
        self.names.push(name.into());
        self.refs_mut().push(element);
    }

    /// 0-based position of a member, matched case-insensitively.
    pub fn find_member(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn member(&self, name: &str) -> Option<&Reference> {
        self.find_member(name).map(|i| &self.refs[i])
    }

    /// Member reference for writing through.
    pub fn member_mut(&mut self, name: &str) -> Option<Reference> {
        let position = self.find_member(name)?;
        Some(self.refs_mut()[position].clone())
    }

    pub fn remove_member(&mut self, name: &str) -> bool {
        match self.find_member(name) {
            Some(position) => {
                self.remove(position);
                true
            }
            None => false,
        }
    }

    /// 1-based position of the first element equal to `needle`.
    pub fn position_of(&self, needle: &Value) -> Option<usize> {
        self.refs
            .iter()
            .position(|r| r.handle().with_value(|v| v.is_equal(needle)))
            .map(|i| i + 1)
    }

    /// Reorder elements in place.
    pub fn reorder(&mut self, f: impl FnOnce(&mut Vec<Reference>)) {
        debug_assert!(self.names.is_empty(), "reorder on a struct");
        f(self.refs_mut());
    }

    /// Copy out element values.
    pub fn values(&self) -> Vec<Value> {
        self.refs.iter().map(|r| r.handle().value().clone()).collect()
    }

    pub(crate) fn elements_equal(&self, other: &ObjArray) -> bool {
        if Arc::ptr_eq(&self.refs, &other.refs) {
            return true;
        }
        self.refs.len() == other.refs.len()
            && self.refs.iter().zip(other.refs.iter()).all(|(a, b)| {
                let b = b.handle().value();
                a.handle().with_value(|a| a.is_equal(&b))
            })
    }

    pub(crate) fn names_equal(&self, other: &ObjArray) -> bool {
        self.names.len() == other.names.len()
            && self
                .names
                .iter()
                .zip(&other.names)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    pub(crate) fn size_estimate(&self) -> usize {
        let names: usize = self.names.iter().map(|n| mem::size_of::<String>() + n.len()).sum();
        let elements: usize = self
            .refs
            .iter()
            .map(|r| mem::size_of::<Handle>() + r.handle().with_value(Value::size_estimate))
            .sum();
        names + elements
    }
}
