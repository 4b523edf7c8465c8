//! Member access, subscripts and containment
//!
//! Lookups that find nothing return a null [`Reference`] rather than an
//! error; lookups that find something always return a reference the caller
//! can write through. Struct member names match case-insensitively.

use crate::handle::{Handle, Reference};
use crate::kind::Kind;
use crate::value::{ErrorValue, Value};

/// Interned member name.
///
/// The front end resolves member names once with
/// [`Runtime::member_id`](crate::Runtime::member_id) and uses the id at
/// every access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(u32);

impl MemberId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

pub const INDEX_OUT_OF_BOUNDS: &str = "Index out of bounds";
pub const MEMBER_NOT_FOUND: &str = "Member not found";
pub const INVALID_INDEX_TYPE: &str = "Invalid index type";
pub const ARRAY_GROWTH_LIMIT: &str = "Array index too far past the end";

/// Most Uninit elements one `array_assign` may insert before the new one.
pub const MAX_ARRAY_FILL: usize = 16_384;

enum Lookup {
    Struct,
    Found(Value),
    Missing,
}

impl Handle {
    /// Reference to a member, or null when there is none.
    pub fn get_member(&self, name: &str) -> Reference {
        let lookup = self.with_value(|value| match value {
            Value::Struct(arr) if arr.find_member(name).is_some() => Lookup::Struct,
            Value::Error(err) if name.eq_ignore_ascii_case(ErrorValue::TEXT_MEMBER) => {
                Lookup::Found(Value::from(err.text()))
            }
            Value::ApplicObj(obj) => obj.get_member(name).map_or(Lookup::Missing, Lookup::Found),
            _ => Lookup::Missing,
        });

        match lookup {
            Lookup::Struct => self
                .with_value_mut(|value| match value {
                    Value::Struct(arr) => arr.member_mut(name),
                    _ => None,
                })
                .unwrap_or_default(),
            Lookup::Found(value) => self.runtime().bind(value),
            Lookup::Missing => Reference::null(),
        }
    }

    /// Set a struct member, appending it if missing.
    ///
    /// With `copy` an existing member's handle is assigned, so references
    /// to that member see the new value. Without it the member is rebound
    /// to a fresh handle. Returns null for values that are not structs.
    pub fn set_member(&self, name: &str, value: &Value, copy: bool) -> Reference {
        if !matches!(&*self.value(), Value::Struct(_)) {
            return Reference::null();
        }

        let fresh = self.runtime().bind(value.clone());
        let existing = self.with_value_mut(|current| {
            let Value::Struct(arr) = current else {
                return None;
            };
            match arr.find_member(name) {
                Some(position) if copy => Some(arr.refs_mut()[position].clone()),
                Some(position) => {
                    arr.refs_mut()[position] = fresh.clone();
                    None
                }
                None => {
                    arr.add_member(name, fresh.clone());
                    None
                }
            }
        });

        match existing {
            Some(member) => {
                member.handle().assign(value);
                member
            }
            None => fresh,
        }
    }

    pub fn get_member_id(&self, id: MemberId) -> Reference {
        match self.runtime().member_name(id) {
            Some(name) => self.get_member(&name),
            None => Reference::null(),
        }
    }

    pub fn set_member_id(&self, id: MemberId, value: &Value, copy: bool) -> Reference {
        match self.runtime().member_name(id) {
            Some(name) => self.set_member(&name, value, copy),
            None => Reference::null(),
        }
    }

    /// `x.+name`: add an Uninit member. An existing member is returned as is.
    pub fn oper_dot_plus(&self, name: &str) -> Reference {
        let kind = self.kind();
        let existing = self.get_member(name);
        if !existing.is_null() {
            return existing;
        }
        let member = self.runtime().uninit();
        let added = self.with_value_mut(|value| match value {
            Value::Struct(arr) => {
                arr.add_member(name, member.clone());
                true
            }
            _ => false,
        });
        if added {
            member
        } else {
            self.runtime()
                .bind(Value::error(format!("Operator .+ undefined for {kind}")))
        }
    }

    /// `x.-name`: remove a member. Integer 1 if one was removed.
    pub fn oper_dot_minus(&self, name: &str) -> Value {
        if !matches!(&*self.value(), Value::Struct(_)) {
            return Value::error(format!("Operator .- undefined for {}", self.kind()));
        }
        self.with_value_mut(|value| match value {
            Value::Struct(arr) => Value::from(arr.remove_member(name)),
            _ => Value::from(false),
        })
    }

    /// `x.?name`: Integer 1 if the member exists.
    pub fn oper_dot_qmark(&self, name: &str) -> Value {
        self.with_value(|value| match value {
            Value::Struct(arr) => Value::from(arr.find_member(name).is_some()),
            Value::Error(_) => Value::from(name.eq_ignore_ascii_case(ErrorValue::TEXT_MEMBER)),
            Value::ApplicObj(obj) => Value::from(obj.get_member(name).is_some()),
            _ => Value::from(false),
        })
    }

    /// `x[index]`.
    ///
    /// Array elements and struct members come back as references that write
    /// through; string characters are fresh values. Misses produce a
    /// reference to an error value.
    pub fn oper_subscript(&self, index: &Value) -> Reference {
        enum Target {
            Element(i32),
            Member(String),
            Found(Value),
        }

        let target = self.with_value(|value| match (value, index) {
            (Value::Array(_), Value::Integer(i)) => Target::Element(*i),
            (Value::Array(_), _) => Target::Found(Value::error(INVALID_INDEX_TYPE)),
            (Value::Struct(_), Value::String(name)) => Target::Member(name.clone()),
            (Value::Struct(_), _) => Target::Found(Value::error(INVALID_INDEX_TYPE)),
            (Value::String(s), Value::Integer(i)) => {
                let character = usize::try_from(*i)
                    .ok()
                    .and_then(|i| i.checked_sub(1))
                    .and_then(|i| s.chars().nth(i));
                Target::Found(match character {
                    Some(c) => Value::String(c.to_string()),
                    None => Value::error(INDEX_OUT_OF_BOUNDS),
                })
            }
            (Value::Error(_), Value::String(name)) => Target::Member(name.clone()),
            (Value::Error(_), _) => Target::Found(value.clone()),
            (other, _) => Target::Found(Value::error(format!(
                "Operator [] undefined for {}",
                other.type_of()
            ))),
        });

        match target {
            Target::Element(i) => {
                let element = self.with_value_mut(|value| match value {
                    Value::Array(arr) => arr.imp_at_mut(i),
                    _ => None,
                });
                element.unwrap_or_else(|| self.runtime().bind(Value::error(INDEX_OUT_OF_BOUNDS)))
            }
            Target::Member(name) => {
                let member = self.get_member(&name);
                if member.is_null() {
                    self.runtime().bind(Value::error(MEMBER_NOT_FOUND))
                } else {
                    member
                }
            }
            Target::Found(value) => self.runtime().bind(value),
        }
    }

    /// `x[index] := value` for arrays, growing with Uninit elements when
    /// `index` is past the end. Filling more than [`MAX_ARRAY_FILL`] elements
    /// is refused with an error value and leaves the array unchanged.
    ///
    /// `copy` has the same meaning as in [`Handle::set_member`].
    pub fn array_assign(&self, index: i32, value: &Value, copy: bool) -> Reference {
        if self.kind() != Kind::Array {
            return self.runtime().bind(Value::error(format!(
                "Operator [] undefined for {}",
                self.kind()
            )));
        }
        let Some(position) = usize::try_from(index).ok().and_then(|i| i.checked_sub(1)) else {
            return self.runtime().bind(Value::error(INDEX_OUT_OF_BOUNDS));
        };

        let len = self.with_value(|current| current.as_obj_array().map_or(0, |arr| arr.len()));
        if position.saturating_sub(len) > MAX_ARRAY_FILL {
            return self.runtime().bind(Value::error(ARRAY_GROWTH_LIMIT));
        }

        let runtime = self.runtime().clone();
        let fresh = runtime.bind(value.clone());
        let existing = self.with_value_mut(|current| {
            let Value::Array(arr) = current else {
                return None;
            };
            let refs = arr.refs_mut();
            if position < refs.len() {
                if copy {
                    return Some(refs[position].clone());
                }
                refs[position] = fresh.clone();
                return None;
            }
            while refs.len() < position {
                refs.push(runtime.uninit());
            }
            refs.push(fresh.clone());
            None
        });

        match existing {
            Some(element) => {
                element.handle().assign(value);
                element
            }
            None => fresh,
        }
    }
}

impl Value {
    /// The `in` operator: 1-based position of `needle`, or 0.
    ///
    /// Arrays search by element equality, strings by substring and structs
    /// by member name.
    pub fn contains(&self, needle: &Value) -> i32 {
        let position = match (self, needle) {
            (Value::Array(arr), _) => arr.position_of(needle),
            (Value::String(haystack), _) => haystack.find(&needle.string_rep()).map(|i| i + 1),
            (Value::Struct(arr), Value::String(name)) => arr.find_member(name).map(|i| i + 1),
            _ => None,
        };
        position.map_or(0, |p| i32::try_from(p).unwrap_or(i32::MAX))
    }
}
