//! Expression evaluation over named counter values.

use crate::expr::ast::{BinaryOp, CmpOp, Expr};
use crate::expr::ExprError;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Runtime value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
        }
    }

    /// `true`, or any non-zero number
    pub fn is_truthy(&self) -> bool {
        match *self {
            Value::Bool(b) => b,
            Value::Int(v) => v != 0,
            Value::Float(v) => v != 0.0,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(v) => Some(v as f64),
            Value::Float(v) => Some(v),
            Value::Bool(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Variables visible to an expression
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, i64>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: i64) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.vars.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        let mut env = Environment::new();
        for (k, v) in iter {
            env.insert(k, v);
        }
        env
    }
}

fn type_error(op: &str, lhs: &Value, rhs: &Value) -> ExprError {
    ExprError::Type(format!(
        "unsupported operand types for {}: {} and {}",
        op,
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::FloorDiv => "//",
        BinaryOp::Rem => "%",
    }
}

/// Integer division rounding toward negative infinity
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

/// Remainder taking the sign of the divisor
fn floor_rem(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn eval_int(op: BinaryOp, a: i64, b: i64) -> Result<Value, ExprError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinaryOp::FloorDiv | BinaryOp::Rem if b == 0 => return Err(ExprError::DivisionByZero),
        BinaryOp::FloorDiv => floor_div(a, b),
        BinaryOp::Rem => floor_rem(a, b),
    };
    result.map(Value::Int).ok_or_else(|| ExprError::Overflow {
        op: binary_symbol(op),
        lhs: a,
        rhs: b,
    })
}

fn eval_float(op: BinaryOp, a: f64, b: f64) -> Result<Value, ExprError> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Rem if b == 0.0 => {
            return Err(ExprError::DivisionByZero)
        }
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Rem => a - b * (a / b).floor(),
    };
    Ok(Value::Float(value))
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => eval_int(op, a, b),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => eval_float(op, a, b),
            _ => Err(type_error(binary_symbol(op), &lhs, &rhs)),
        },
    }
}

fn compare(op: CmpOp, lhs: Value, rhs: Value) -> Result<bool, ExprError> {
    let ordering = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(&b)),
        (Value::Bool(a), Value::Bool(b)) => match op {
            CmpOp::Eq => return Ok(a == b),
            CmpOp::Ne => return Ok(a != b),
            _ => return Err(type_error("ordering", &lhs, &rhs)),
        },
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => return Err(type_error("comparison", &lhs, &rhs)),
        },
    };

    // NaN compares unequal to everything
    let Some(ordering) = ordering else {
        return Ok(op == CmpOp::Ne);
    };
    Ok(match op {
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
    })
}

/// Evaluate an expression to a value
pub fn eval(expr: &Expr, env: &Environment) -> Result<Value, ExprError> {
    match expr {
        Expr::Int(v) => Ok(Value::Int(*v)),
        Expr::Float(v) => Ok(Value::Float(*v)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Var(name) => env
            .get(name)
            .map(Value::Int)
            .ok_or_else(|| ExprError::UnknownVariable(name.clone())),
        Expr::Neg(inner) => match eval(inner, env)? {
            Value::Int(v) => v
                .checked_neg()
                .map(Value::Int)
                .ok_or(ExprError::Overflow {
                    op: "-",
                    lhs: 0,
                    rhs: v,
                }),
            Value::Float(v) => Ok(Value::Float(-v)),
            Value::Bool(_) => Err(ExprError::Type("bad operand type for unary -: bool".into())),
        },
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, env)?.is_truthy())),
        Expr::And(lhs, rhs) => {
            if !eval(lhs, env)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(rhs, env)?.is_truthy()))
        }
        Expr::Or(lhs, rhs) => {
            if eval(lhs, env)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(rhs, env)?.is_truthy()))
        }
        Expr::Binary(op, lhs, rhs) => eval_binary(*op, eval(lhs, env)?, eval(rhs, env)?),
        Expr::Compare(first, rest) => {
            let mut left = eval(first, env)?;
            for (op, operand) in rest {
                let right = eval(operand, env)?;
                if !compare(*op, left, right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_division_and_remainder() {
        assert_eq!(floor_div(7, 2), Some(3));
        assert_eq!(floor_div(-7, 2), Some(-4));
        assert_eq!(floor_div(7, -2), Some(-4));
        assert_eq!(floor_rem(-7, 3), Some(2));
        assert_eq!(floor_rem(7, -3), Some(-2));
        assert_eq!(floor_div(i64::MIN, -1), None);
    }

    #[test]
    fn test_int_ops_stay_integral() {
        assert_eq!(eval_int(BinaryOp::Add, 2, 3).unwrap(), Value::Int(5));
        assert_eq!(eval_int(BinaryOp::FloorDiv, 7, 2).unwrap(), Value::Int(3));
        assert_eq!(eval_int(BinaryOp::Div, 7, 2).unwrap(), Value::Float(3.5));
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(matches!(
            eval_int(BinaryOp::Mul, i64::MAX, 2),
            Err(ExprError::Overflow { op: "*", .. })
        ));
    }

    #[test]
    fn test_mixed_comparison_promotes() {
        assert!(compare(CmpOp::Lt, Value::Int(1), Value::Float(1.5)).unwrap());
        assert!(compare(CmpOp::Eq, Value::Int(2), Value::Float(2.0)).unwrap());
        assert!(compare(CmpOp::Ne, Value::Float(f64::NAN), Value::Float(f64::NAN)).unwrap());
    }

    #[test]
    fn test_bool_ordering_rejected() {
        assert!(compare(CmpOp::Eq, Value::Bool(true), Value::Bool(true)).unwrap());
        assert!(matches!(
            compare(CmpOp::Lt, Value::Bool(true), Value::Bool(false)),
            Err(ExprError::Type(_))
        ));
        assert!(matches!(
            compare(CmpOp::Eq, Value::Bool(true), Value::Int(1)),
            Err(ExprError::Type(_))
        ));
    }

    #[test]
    fn test_environment_from_iter() {
        let env: Environment = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(env.len(), 2);
        assert_eq!(env.get("b"), Some(2));
        assert_eq!(env.get("c"), None);
    }
}
