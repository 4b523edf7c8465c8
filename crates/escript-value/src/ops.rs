//! Operator dispatch
//!
//! Each binary operator is one function matching on the operand pair.
//! Integer and Float operands go through [`Numeric::promote`] first, so the
//! numeric rules are written once per operator. Pairs an operator has no
//! rule for produce an error value naming both kinds; they never panic.
//!
//! An error operand short-circuits: the result is the left-most error.

use std::fmt;

use crate::runtime::Runtime;
use crate::value::Value;

pub const DIVIDE_BY_ZERO: &str = "Divide by Zero";

/// Binary arithmetic and bitwise operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 10] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
        BinaryOp::Shl,
        BinaryOp::Shr,
        BinaryOp::BitAnd,
        BinaryOp::BitXor,
        BinaryOp::BitOr,
    ];

    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A numeric operand pair after promotion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Ints(i32, i32),
    Floats(f64, f64),
}

impl Numeric {
    /// Integer pairs stay integral; any Float promotes both sides.
    pub fn promote(lhs: &Value, rhs: &Value) -> Option<Numeric> {
        match (lhs, rhs) {
            (Value::Integer(a), Value::Integer(b)) => Some(Numeric::Ints(*a, *b)),
            (Value::Integer(a), Value::Float(b)) => Some(Numeric::Floats(f64::from(*a), *b)),
            (Value::Float(a), Value::Integer(b)) => Some(Numeric::Floats(*a, f64::from(*b))),
            (Value::Float(a), Value::Float(b)) => Some(Numeric::Floats(*a, *b)),
            _ => None,
        }
    }
}

/// `lhs <op> rhs` without touching either operand.
///
/// The runtime is needed because array results bind new elements.
pub fn binary(rt: &Runtime, op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    if lhs.is_error() {
        return lhs.clone();
    }
    if rhs.is_error() {
        return rhs.clone();
    }

    let result = match op {
        BinaryOp::Add => add(rt, lhs, rhs),
        BinaryOp::Sub => sub(lhs, rhs),
        BinaryOp::Mul => mul(lhs, rhs),
        BinaryOp::Div => div(lhs, rhs),
        BinaryOp::Mod => modulo(lhs, rhs),
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::BitAnd | BinaryOp::BitXor | BinaryOp::BitOr => {
            bitwise(op, lhs, rhs)
        }
    };
    result.unwrap_or_else(|| undefined(op.symbol(), lhs, rhs))
}

/// Error value for an operator with no rule for this pair.
pub fn undefined(symbol: &str, lhs: &Value, rhs: &Value) -> Value {
    Value::error(format!(
        "Operator {symbol} undefined for {} and {}",
        lhs.type_of(),
        rhs.type_of()
    ))
}

fn add(rt: &Runtime, lhs: &Value, rhs: &Value) -> Option<Value> {
    if let Some(pair) = Numeric::promote(lhs, rhs) {
        return Some(match pair {
            Numeric::Ints(a, b) => Value::Integer(a.wrapping_add(b)),
            Numeric::Floats(a, b) => Value::Float(a + b),
        });
    }

    match (lhs, rhs) {
        (Value::String(a), b) => Some(Value::String(format!("{a}{}", b.string_rep()))),
        (Value::Integer(_) | Value::Float(_), Value::String(b)) => {
            Some(Value::String(format!("{}{b}", lhs.string_rep())))
        }
        (Value::Array(a), Value::Array(b)) => {
            let mut joined = a.clone();
            joined.extend_copies(b);
            Some(Value::Array(joined))
        }
        (Value::Array(a), element) => {
            let mut appended = a.clone();
            appended.push(rt.bind(element.clone()));
            Some(Value::Array(appended))
        }
        _ => None,
    }
}

fn sub(lhs: &Value, rhs: &Value) -> Option<Value> {
    if let Some(pair) = Numeric::promote(lhs, rhs) {
        return Some(match pair {
            Numeric::Ints(a, b) => Value::Integer(a.wrapping_sub(b)),
            Numeric::Floats(a, b) => Value::Float(a - b),
        });
    }

    match (lhs, rhs) {
        (Value::String(a), Value::Integer(_) | Value::Float(_) | Value::String(_)) => {
            let needle = rhs.string_rep();
            Some(Value::String(a.replacen(&needle, "", 1)))
        }
        _ => None,
    }
}

fn mul(lhs: &Value, rhs: &Value) -> Option<Value> {
    Numeric::promote(lhs, rhs).map(|pair| match pair {
        Numeric::Ints(a, b) => Value::Integer(a.wrapping_mul(b)),
        Numeric::Floats(a, b) => Value::Float(a * b),
    })
}

fn div(lhs: &Value, rhs: &Value) -> Option<Value> {
    Numeric::promote(lhs, rhs).map(|pair| match pair {
        Numeric::Ints(_, 0) => Value::error(DIVIDE_BY_ZERO),
        Numeric::Ints(a, b) => Value::Integer(a.wrapping_div(b)),
        Numeric::Floats(_, b) if b == 0.0 => Value::error(DIVIDE_BY_ZERO),
        Numeric::Floats(a, b) => Value::Float(a / b),
    })
}

fn modulo(lhs: &Value, rhs: &Value) -> Option<Value> {
    match (lhs, rhs) {
        (Value::Integer(_), Value::Integer(0)) => Some(Value::error(DIVIDE_BY_ZERO)),
        (Value::Integer(a), Value::Integer(b)) => Some(Value::Integer(a.wrapping_rem(*b))),
        (Value::Integer(_), Value::Float(b)) if *b == 0.0 => Some(Value::error(DIVIDE_BY_ZERO)),
        (Value::Integer(a), Value::Float(b)) => Some(Value::Float(f64::from(*a) % b)),
        _ => None,
    }
}

fn bitwise(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    let (Value::Integer(a), Value::Integer(b)) = (lhs, rhs) else {
        return None;
    };
    let (a, b) = (*a, *b);
    let result = match op {
        BinaryOp::Shl => a.wrapping_shl(b as u32),
        BinaryOp::Shr => a.wrapping_shr(b as u32),
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::BitOr => a | b,
        _ => return None,
    };
    Some(Value::Integer(result))
}

/// Unary `~`.
pub fn bitnot(value: &Value) -> Value {
    match value {
        Value::Integer(v) => Value::Integer(!v),
        Value::Error(_) => value.clone(),
        other => unary_undefined("~", other),
    }
}

/// Unary `-`.
pub fn inverse(value: &Value) -> Value {
    match value {
        Value::Integer(v) => Value::Integer(v.wrapping_neg()),
        Value::Float(v) => Value::Float(-v),
        Value::Error(_) => value.clone(),
        other => unary_undefined("-", other),
    }
}

fn unary_undefined(symbol: &str, value: &Value) -> Value {
    Value::error(format!("Operator {symbol} undefined for {}", value.type_of()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(op: BinaryOp, lhs: impl Into<Value>, rhs: impl Into<Value>) -> Value {
        let rt = Runtime::new();
        binary(&rt, op, &lhs.into(), &rhs.into())
    }

    fn error_text(value: &Value) -> &str {
        value.as_error().map(|e| e.text()).unwrap_or("<not an error>")
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(eval(BinaryOp::Add, 3, 4), Value::from(7));
        assert_eq!(eval(BinaryOp::Sub, 3, 4), Value::from(-1));
        assert_eq!(eval(BinaryOp::Mul, 6, 7), Value::from(42));
        assert_eq!(eval(BinaryOp::Div, 7, 2), Value::from(3));
        assert_eq!(eval(BinaryOp::Mod, 10, 3), Value::from(1));
        assert_eq!(eval(BinaryOp::Add, i32::MAX, 1), Value::from(i32::MIN));
        assert_eq!(eval(BinaryOp::Div, i32::MIN, -1), Value::from(i32::MIN));
    }

    #[test]
    fn test_float_promotion() {
        assert_eq!(eval(BinaryOp::Add, 3, 2.5), Value::from(5.5));
        assert_eq!(eval(BinaryOp::Sub, 2.5, 1), Value::from(1.5));
        assert_eq!(eval(BinaryOp::Mul, 2.0, 2.0), Value::from(4.0));
        assert_eq!(eval(BinaryOp::Div, 1, 4.0), Value::from(0.25));
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(error_text(&eval(BinaryOp::Div, 1, 0)), DIVIDE_BY_ZERO);
        assert_eq!(error_text(&eval(BinaryOp::Div, 1.0, 0)), DIVIDE_BY_ZERO);
        assert_eq!(error_text(&eval(BinaryOp::Mod, 1, 0)), DIVIDE_BY_ZERO);
        assert_eq!(error_text(&eval(BinaryOp::Mod, 1, 0.0)), DIVIDE_BY_ZERO);
    }

    #[test]
    fn test_modulo_rules() {
        assert_eq!(eval(BinaryOp::Mod, -7, 3), Value::from(-1));
        assert_eq!(eval(BinaryOp::Mod, 7, 2.5), Value::from(2.0));
        assert_eq!(
            error_text(&eval(BinaryOp::Mod, 7.5, 2)),
            "Operator % undefined for Double and Integer"
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval(BinaryOp::Add, "a", "b"), Value::from("ab"));
        assert_eq!(eval(BinaryOp::Add, "n=", 5), Value::from("n=5"));
        assert_eq!(eval(BinaryOp::Add, 5, "x"), Value::from("5x"));
        assert_eq!(eval(BinaryOp::Add, 1.5, "x"), Value::from("1.5x"));
        assert_eq!(
            eval(BinaryOp::Add, "u:", Value::Uninit),
            Value::from("u:<uninitialized object>")
        );
    }

    #[test]
    fn test_string_subtraction_removes_first_occurrence() {
        assert_eq!(eval(BinaryOp::Sub, "banana", "an"), Value::from("bana"));
        assert_eq!(eval(BinaryOp::Sub, "a1b1", 1), Value::from("ab1"));
        assert_eq!(eval(BinaryOp::Sub, "abc", "z"), Value::from("abc"));
    }

    #[test]
    fn test_array_plus() {
        let rt = Runtime::new();
        let arr = rt.array([Value::from(1)]);
        let appended = binary(&rt, BinaryOp::Add, &arr, &Value::from("x"));
        insta::assert_snapshot!(appended.to_string(), @r#"{ 1, "x" }"#);
        insta::assert_snapshot!(arr.to_string(), @"{ 1 }");

        let other = rt.array([Value::from(2), Value::from(3)]);
        let joined = binary(&rt, BinaryOp::Add, &arr, &other);
        insta::assert_snapshot!(joined.to_string(), @"{ 1, 2, 3 }");
    }

    #[test]
    fn test_struct_has_no_plus() {
        let rt = Runtime::new();
        let st = rt.struct_value([("a", Value::from(1))]);
        let result = binary(&rt, BinaryOp::Add, &st, &Value::from(1));
        assert_eq!(error_text(&result), "Operator + undefined for Struct and Integer");
    }

    #[test]
    fn test_undefined_pairs_are_errors() {
        let rt = Runtime::new();
        let arr = rt.array([]);
        let result = binary(&rt, BinaryOp::Mod, &arr, &Value::from("s"));
        assert_eq!(error_text(&result), "Operator % undefined for Array and String");
        assert!(!result.is_true());

        assert_eq!(
            error_text(&eval(BinaryOp::Mul, "a", 2)),
            "Operator * undefined for String and Integer"
        );
        assert_eq!(
            error_text(&eval(BinaryOp::Shl, 1.0, 1)),
            "Operator << undefined for Double and Integer"
        );
    }

    #[test]
    fn test_left_most_error_wins() {
        let left = Value::error("left");
        let right = Value::error("right");
        assert_eq!(eval(BinaryOp::Add, left.clone(), right.clone()), left);
        assert_eq!(eval(BinaryOp::Add, 1, right.clone()), right);
        assert_eq!(eval(BinaryOp::Add, "s", right.clone()), right);
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(eval(BinaryOp::Shl, 1, 4), Value::from(16));
        assert_eq!(eval(BinaryOp::Shr, -16, 2), Value::from(-4));
        assert_eq!(eval(BinaryOp::Shl, 1, 33), Value::from(2));
        assert_eq!(eval(BinaryOp::BitAnd, 0b1100, 0b1010), Value::from(0b1000));
        assert_eq!(eval(BinaryOp::BitXor, 0b1100, 0b1010), Value::from(0b0110));
        assert_eq!(eval(BinaryOp::BitOr, 0b1100, 0b1010), Value::from(0b1110));
    }

    #[test]
    fn test_unary() {
        assert_eq!(bitnot(&Value::from(0)), Value::from(-1));
        assert_eq!(inverse(&Value::from(5)), Value::from(-5));
        assert_eq!(inverse(&Value::from(i32::MIN)), Value::from(i32::MIN));
        assert_eq!(inverse(&Value::from(2.5)), Value::from(-2.5));
        assert_eq!(error_text(&bitnot(&Value::from(1.0))), "Operator ~ undefined for Double");
        assert_eq!(error_text(&inverse(&Value::from("s"))), "Operator - undefined for String");
    }

    #[test]
    fn test_symbols() {
        let symbols: Vec<_> = BinaryOp::ALL.iter().map(|op| op.to_string()).collect();
        assert_eq!(symbols, ["+", "-", "*", "/", "%", "<<", ">>", "&", "^", "|"]);
    }
}
