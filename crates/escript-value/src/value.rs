//! Script value representation
//!
//! [`Value`] is the closed set of data a script can hold. Comparison,
//! truthiness and the textual projection live here; operator dispatch is in
//! [`crate::ops`] and the member protocol in [`crate::member`].

use std::fmt;
use std::mem;

use crate::applic::{ApplicObj, ApplicPtr};
use crate::array::ObjArray;
use crate::kind::Kind;

/// A runtime datum of one fixed kind.
///
/// Cloning a value is the script-level copy: arrays share element storage
/// until one side is mutated, and application objects copy through their
/// host type.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Uninit,
    Integer(i32),
    Float(f64),
    String(String),
    Array(ObjArray),
    Struct(ObjArray),
    Error(ErrorValue),
    ApplicPtr(ApplicPtr),
    ApplicObj(ApplicObj),
}

/// Payload of an error value.
///
/// Scripts see it as an object with the single member `errortext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    text: String,
}

impl ErrorValue {
    /// Name of the member holding the message.
    pub const TEXT_MEMBER: &'static str = "errortext";

    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Value {
    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        Value::Error(ErrorValue::new(text))
    }

    /// The kind tag of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Uninit => Kind::Uninit,
            Value::Integer(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Struct(_) => Kind::Struct,
            Value::Error(_) => Kind::Error,
            Value::ApplicPtr(_) => Kind::ApplicPtr,
            Value::ApplicObj(obj) => obj.kind(),
        }
    }

    /// Name reported by `typeof`.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::ApplicObj(obj) => obj.type_of(),
            other => other.kind().name(),
        }
    }

    /// Wire tag as a script integer.
    pub fn type_of_int(&self) -> i32 {
        i32::from(self.kind().tag())
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Element storage of an array or struct.
    pub fn as_obj_array(&self) -> Option<&ObjArray> {
        match self {
            Value::Array(arr) | Value::Struct(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Value::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_uninit(&self) -> bool {
        matches!(self, Value::Uninit)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Script-level copy.
    pub fn copy(&self) -> Value {
        self.clone()
    }

    /// Overwrite this value with a copy of `other` when both are the same
    /// variant. Returns whether anything was copied.
    pub fn copy_value_from(&mut self, other: &Value) -> bool {
        if mem::discriminant(self) != mem::discriminant(other) {
            return false;
        }
        *self = other.clone();
        true
    }

    /// `++` on numeric values; other kinds are left unchanged.
    pub fn increment(&mut self) {
        match self {
            Value::Integer(v) => *v = v.wrapping_add(1),
            Value::Float(v) => *v += 1.0,
            _ => {}
        }
    }

    /// Rough number of bytes this value occupies, including elements.
    pub fn size_estimate(&self) -> usize {
        let base = mem::size_of::<Value>();
        match self {
            Value::Uninit | Value::Integer(_) | Value::Float(_) | Value::ApplicPtr(_) => base,
            Value::String(s) => base + s.capacity(),
            Value::Error(err) => base + err.text.capacity(),
            Value::Array(arr) | Value::Struct(arr) => base + arr.size_estimate(),
            Value::ApplicObj(obj) => base + obj.size_estimate(),
        }
    }

    /// Script truthiness.
    pub fn is_true(&self) -> bool {
        match self {
            Value::Uninit | Value::Error(_) => false,
            Value::Integer(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Struct(_) | Value::ApplicPtr(_) | Value::ApplicObj(_) => true,
        }
    }

    /// Script equality (`==`). Integers and floats compare numerically.
    pub fn is_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Uninit, Value::Uninit) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) => f64::from(*a) == *b,
            (Value::Float(a), Value::Integer(b)) => *a == f64::from(*b),
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.elements_equal(b),
            (Value::Struct(a), Value::Struct(b)) => a.names_equal(b) && a.elements_equal(b),
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::ApplicPtr(a), Value::ApplicPtr(b)) => a.same_pointer(b),
            (Value::ApplicObj(a), b) => a.is_equal(b),
            (a, Value::ApplicObj(b)) => b.is_equal(a),
            _ => false,
        }
    }

    /// Script ordering (`<`). Pairs without an ordering are never less.
    pub fn is_less_than(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a < b,
            (Value::Integer(a), Value::Float(b)) => f64::from(*a) < *b,
            (Value::Float(a), Value::Integer(b)) => *a < f64::from(*b),
            (Value::Float(a), Value::Float(b)) => a < b,
            (Value::String(a), Value::String(b)) => a < b,
            _ => false,
        }
    }

    pub fn is_lt(&self, other: &Value) -> bool {
        self.is_less_than(other)
    }

    pub fn is_le(&self, other: &Value) -> bool {
        self.is_less_than(other) || self.is_equal(other)
    }

    pub fn is_gt(&self, other: &Value) -> bool {
        other.is_less_than(self)
    }

    pub fn is_ge(&self, other: &Value) -> bool {
        self.is_gt(other) || self.is_equal(other)
    }

    /// `self > bound`, used by counted loops.
    pub fn is_gt_int(&self, bound: i32) -> bool {
        match self {
            Value::Integer(v) => *v > bound,
            Value::Float(v) => *v > f64::from(bound),
            _ => false,
        }
    }

    /// `self >= bound`, used by counted loops.
    pub fn is_ge_int(&self, bound: i32) -> bool {
        match self {
            Value::Integer(v) => *v >= bound,
            Value::Float(v) => *v >= f64::from(bound),
            _ => false,
        }
    }

    /// Textual form used for stringification and debugging.
    ///
    /// Strings are written raw. This is not a serialization format.
    pub fn string_rep(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.formatted_string_rep(),
        }
    }

    /// Like [`Value::string_rep`], but strings are quoted. Container
    /// elements always use this form.
    pub fn formatted_string_rep(&self) -> String {
        match self {
            Value::Uninit => "<uninitialized object>".to_string(),
            Value::Integer(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::String(s) => format!("\"{s}\""),
            Value::Array(arr) => {
                let items: Vec<String> = arr
                    .refs()
                    .iter()
                    .map(|r| r.handle().with_value(Value::formatted_string_rep))
                    .collect();
                if items.is_empty() {
                    "{ }".to_string()
                } else {
                    format!("{{ {} }}", items.join(", "))
                }
            }
            Value::Struct(arr) => {
                let members: Vec<String> = arr
                    .names()
                    .iter()
                    .zip(arr.refs())
                    .map(|(name, r)| {
                        format!("{name} = {}", r.handle().with_value(Value::formatted_string_rep))
                    })
                    .collect();
                if members.is_empty() {
                    "struct{ }".to_string()
                } else {
                    format!("struct{{ {} }}", members.join(", "))
                }
            }
            Value::Error(err) => format!("error{{ errortext = \"{}\" }}", err.text),
            Value::ApplicPtr(_) => "<appptr>".to_string(),
            Value::ApplicObj(obj) => format!("<appobj {}>", obj.type_name()),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality: same kind and script-equal.
    fn eq(&self, other: &Value) -> bool {
        self.kind() == other.kind() && self.is_equal(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_rep())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(i32::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<ErrorValue> for Value {
    fn from(v: ErrorValue) -> Self {
        Value::Error(v)
    }
}
