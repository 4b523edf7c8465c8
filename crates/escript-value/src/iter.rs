//! `foreach` iteration
//!
//! A [`ContIterator`] takes a snapshot of the element list when it is
//! created. Element handles are shared with the container, so writes to an
//! element during the loop are visible in the container; appending or
//! erasing elements does not move the cursor.

use crate::handle::{Handle, Reference};
use crate::kind::Kind;
use crate::value::Value;

/// Cursor over an array or struct.
#[derive(Debug)]
pub struct ContIterator {
    elements: Vec<Reference>,
    names: Vec<String>,
    bound: Reference,
    next: usize,
}

impl ContIterator {
    /// Advance, writing the position (arrays, 1-based) or member name
    /// (structs) into the bound handle. Returns the element reference, or
    /// `None` once exhausted.
    pub fn step(&mut self) -> Option<Reference> {
        let element = self.elements.get(self.next)?.clone();
        if let Some(bound) = self.bound.get() {
            let key = match self.names.get(self.next) {
                Some(name) => Value::from(name.as_str()),
                None => Value::from(i32::try_from(self.next + 1).unwrap_or(i32::MAX)),
            };
            bound.set_value(key);
        }
        self.next += 1;
        Some(element)
    }

    pub fn remaining(&self) -> usize {
        self.elements.len() - self.next
    }
}

impl Iterator for ContIterator {
    type Item = Reference;

    fn next(&mut self) -> Option<Reference> {
        self.step()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

impl Handle {
    /// Iterator over this value's elements; `None` for kinds that cannot
    /// be iterated.
    pub fn create_iterator(&self, bound: Reference) -> Option<ContIterator> {
        if !matches!(self.kind(), Kind::Array | Kind::Struct) {
            return None;
        }
        self.with_value_mut(|value| match value {
            Value::Array(arr) | Value::Struct(arr) => Some(ContIterator {
                names: arr.names().to_vec(),
                elements: arr.refs_mut().clone(),
                bound,
                next: 0,
            }),
            _ => None,
        })
    }
}
