//! Method calls
//!
//! Built-in methods are identified by [`MethodId`] so the front end can
//! resolve names once. The executor supplies arguments through the
//! [`Executor`] trait and may intercept calls before the built-in runs.
//!
//! Unknown methods are call failures ([`CallError`]). A known method called
//! with bad arguments returns an error value instead, like any other failed
//! operation.

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

use crate::array::ObjArray;
use crate::error::CallError;
use crate::handle::{Handle, Reference};
use crate::kind::Kind;
use crate::runtime::Runtime;
use crate::value::Value;

/// Built-in method identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodId {
    Size,
    Append,
    Insert,
    Erase,
    Exists,
    Reverse,
    Sort,
    Keys,
    Length,
    Upper,
    Lower,
    Find,
}

impl MethodId {
    pub const ALL: [MethodId; 12] = [
        MethodId::Size,
        MethodId::Append,
        MethodId::Insert,
        MethodId::Erase,
        MethodId::Exists,
        MethodId::Reverse,
        MethodId::Sort,
        MethodId::Keys,
        MethodId::Length,
        MethodId::Upper,
        MethodId::Lower,
        MethodId::Find,
    ];

    /// Resolve a method name, ignoring case.
    pub fn from_name(name: &str) -> Option<MethodId> {
        Self::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(name))
    }

    pub const fn name(self) -> &'static str {
        match self {
            MethodId::Size => "size",
            MethodId::Append => "append",
            MethodId::Insert => "insert",
            MethodId::Erase => "erase",
            MethodId::Exists => "exists",
            MethodId::Reverse => "reverse",
            MethodId::Sort => "sort",
            MethodId::Keys => "keys",
            MethodId::Length => "length",
            MethodId::Upper => "upper",
            MethodId::Lower => "lower",
            MethodId::Find => "find",
        }
    }

    /// Whether the method can change its receiver.
    pub const fn mutates(self) -> bool {
        matches!(
            self,
            MethodId::Append
                | MethodId::Insert
                | MethodId::Erase
                | MethodId::Reverse
                | MethodId::Sort
        )
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a method call needs from the running script.
pub trait Executor {
    /// Call arguments in order.
    fn params(&self) -> &[Reference];

    /// Script-level override of a built-in. `None` lets the built-in run.
    fn script_method(&mut self, _target: &Value, _method: MethodId) -> Option<Value> {
        None
    }
}

/// A plain argument list, for hosts and tests that call methods directly.
#[derive(Debug, Clone, Default)]
pub struct ArgList {
    params: SmallVec<[Reference; 4]>,
}

impl ArgList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind each value to a fresh handle.
    pub fn from_values(rt: &Runtime, values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            params: values.into_iter().map(|v| rt.bind(v)).collect(),
        }
    }

    pub fn push(&mut self, param: Reference) {
        self.params.push(param);
    }
}

impl Executor for ArgList {
    fn params(&self) -> &[Reference] {
        &self.params
    }
}

impl Handle {
    /// Call a method by name.
    pub fn call_method(&self, name: &str, ex: &mut dyn Executor) -> Result<Value, CallError> {
        if matches!(&*self.value(), Value::ApplicObj(_)) {
            let args = param_values(ex);
            let result = self.with_value_mut(|value| match value {
                Value::ApplicObj(obj) => obj.call_method(name, &args),
                _ => None,
            });
            return result.ok_or_else(|| CallError::UnknownMethod {
                kind: self.kind(),
                name: name.to_string(),
            });
        }

        let Some(id) = MethodId::from_name(name) else {
            return Err(CallError::UnknownMethod {
                kind: self.kind(),
                name: name.to_string(),
            });
        };
        self.call_method_id(id, ex, false)
    }

    /// Call a built-in method.
    ///
    /// Unless `forcebuiltin` is set the executor gets the first chance to
    /// handle the call.
    pub fn call_method_id(
        &self,
        id: MethodId,
        ex: &mut dyn Executor,
        forcebuiltin: bool,
    ) -> Result<Value, CallError> {
        if !forcebuiltin {
            let target = self.value().clone();
            if let Some(result) = ex.script_method(&target, id) {
                return Ok(result);
            }
        }

        let args = param_values(ex);
        let kind = self.kind();
        let result = match kind {
            Kind::Array => self.array_method(id, &args),
            Kind::Struct => self.struct_method(id, &args),
            Kind::String => self.with_value(|value| string_method(value, id, &args)),
            _ if matches!(&*self.value(), Value::ApplicObj(_)) => {
                self.with_value_mut(|value| match value {
                    Value::ApplicObj(obj) => obj.call_method(id.name(), &args),
                    _ => None,
                })
            }
            _ => None,
        };

        tracing::trace!(%kind, method = %id, supported = result.is_some(), "Method call");
        result.ok_or(CallError::NotSupported { kind, method: id })
    }

    fn array_method(&self, id: MethodId, args: &[Value]) -> Option<Value> {
        let runtime = self.runtime().clone();
        self.with_value_mut(|value| {
            let Value::Array(arr) = value else {
                return None;
            };
            Some(match id {
                MethodId::Size => len_value(arr),
                MethodId::Append => match args {
                    [element] => {
                        arr.push(runtime.bind(element.clone()));
                        Value::from(1)
                    }
                    _ => param_count_error(id, 1),
                },
                MethodId::Insert => match args {
                    [Value::Integer(index), element] => match position(*index, arr.len() + 1) {
                        Some(at) => {
                            arr.insert(at, runtime.bind(element.clone()));
                            Value::from(1)
                        }
                        None => Value::error("Index out of range"),
                    },
                    [_, _] => Value::error("Index must be an Integer"),
                    _ => param_count_error(id, 2),
                },
                MethodId::Erase => match args {
                    [Value::Integer(index)] => match position(*index, arr.len()) {
                        Some(at) => {
                            arr.remove(at);
                            Value::from(1)
                        }
                        None => Value::error("Index out of range"),
                    },
                    [_] => Value::error("Index must be an Integer"),
                    _ => param_count_error(id, 1),
                },
                MethodId::Exists => match args {
                    [Value::Integer(index)] => Value::from(position(*index, arr.len()).is_some()),
                    [_] => Value::error("Index must be an Integer"),
                    _ => param_count_error(id, 1),
                },
                MethodId::Reverse => {
                    arr.reorder(|refs| refs.reverse());
                    Value::from(1)
                }
                MethodId::Sort => {
                    arr.reorder(|refs| {
                        refs.sort_by(|a, b| {
                            let b = b.handle().value();
                            a.handle().with_value(|a| sort_order(a, &b))
                        })
                    });
                    Value::from(1)
                }
                _ => return None,
            })
        })
    }

    fn struct_method(&self, id: MethodId, args: &[Value]) -> Option<Value> {
        match id {
            MethodId::Size => self.with_value(|value| value.as_obj_array().map(len_value)),
            MethodId::Exists => Some(match args {
                [Value::String(name)] => self.oper_dot_qmark(name),
                [_] => Value::error("Member name must be a String"),
                _ => param_count_error(id, 1),
            }),
            MethodId::Erase => Some(match args {
                [Value::String(name)] => self.oper_dot_minus(name),
                [_] => Value::error("Member name must be a String"),
                _ => param_count_error(id, 1),
            }),
            MethodId::Keys => {
                let names: Vec<Value> = self.with_value(|value| {
                    value
                        .as_obj_array()
                        .map(|arr| arr.names().iter().map(|n| Value::from(n.as_str())).collect())
                        .unwrap_or_default()
                });
                Some(self.runtime().array(names))
            }
            _ => None,
        }
    }
}

fn string_method(value: &Value, id: MethodId, args: &[Value]) -> Option<Value> {
    let Value::String(s) = value else {
        return None;
    };
    Some(match id {
        MethodId::Length => Value::from(count_value(s.chars().count())),
        MethodId::Upper => Value::String(s.to_uppercase()),
        MethodId::Lower => Value::String(s.to_lowercase()),
        MethodId::Find => match args {
            [needle] => find_from(s, &needle.string_rep(), 1),
            [needle, Value::Integer(start)] => find_from(s, &needle.string_rep(), *start),
            [_, _] => Value::error("Start position must be an Integer"),
            _ => param_count_error(id, 1),
        },
        _ => return None,
    })
}

/// 1-based byte position of `needle` at or after `start`, or 0.
fn find_from(haystack: &str, needle: &str, start: i32) -> Value {
    let Some(offset) = usize::try_from(start).ok().and_then(|s| s.checked_sub(1)) else {
        return Value::error("Start position must be positive");
    };
    let found = haystack
        .get(offset..)
        .and_then(|tail| tail.find(needle))
        .map(|i| offset + i + 1);
    Value::from(count_value(found.unwrap_or(0)))
}

/// 0-based position for a 1-based index no greater than `limit`.
fn position(index: i32, limit: usize) -> Option<usize> {
    let index = usize::try_from(index).ok()?;
    (1..=limit).contains(&index).then(|| index - 1)
}

fn len_value(arr: &ObjArray) -> Value {
    Value::from(count_value(arr.len()))
}

fn count_value(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

fn param_count_error(id: MethodId, expected: usize) -> Value {
    Value::error(format!("{id}() expects {expected} parameter(s)"))
}

fn param_values(ex: &dyn Executor) -> Vec<Value> {
    ex.params()
        .iter()
        .map(|param| match param.get() {
            Some(handle) => handle.value().clone(),
            None => Value::Uninit,
        })
        .collect()
}

/// Total order used by `sort()`: numbers, then strings, then everything
/// else in original order.
fn sort_order(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Integer(_) | Value::Float(_) => 0,
            Value::String(_) => 1,
            _ => 2,
        }
    }

    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => match (number(a), number(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(i) => Some(f64::from(*i)),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}
