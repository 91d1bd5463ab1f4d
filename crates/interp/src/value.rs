use std::fmt;

use ssa::{BinaryOp, Literal, Type, TypeId, TypeUniverse, UnaryOp};

use crate::{Error, Result};

/// Address of a local storage cell. Cells belong to a frame and are identified by the frame's
/// serial number, so a pointer into a frame that has returned no longer resolves.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Pointer {
    pub frame: u64,
    pub local: usize,
}

/// A runtime value of the interpreted program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    Nil,
    Pointer(Pointer),

    /// A concrete value boxed in an interface together with its dynamic type.
    Interface {
        ty: TypeId,
        value: Box<Value>,
    },
    Struct(Vec<Value>),

    /// Result of a function without a result type.
    Unit,
}

impl Value {
    /// The zero value of `ty`.
    pub fn zero(types: &TypeUniverse, ty: TypeId) -> Self {
        match types.ty(types.underlying(ty)) {
            Type::Basic(ssa::BasicKind::Int) => Value::Int(0),
            Type::Basic(ssa::BasicKind::Bool) => Value::Bool(false),
            Type::Basic(ssa::BasicKind::String) => Value::Str(String::new()),
            Type::Struct(fields) => {
                Value::Struct(fields.iter().map(|f| Value::zero(types, f.ty)).collect())
            }
            Type::Named(_) | Type::Pointer(_) | Type::Chan(_) | Type::Interface(_) => Value::Nil,
        }
    }

    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Int(value) => Value::Int(*value),
            Literal::Bool(value) => Value::Bool(*value),
            Literal::Str(value) => Value::Str(value.clone()),
            Literal::Nil => Value::Nil,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Applies a binary operator. Integer arithmetic wraps on overflow.
    pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
        match op {
            BinaryOp::Eq => return Ok(Value::Bool(lhs == rhs)),
            BinaryOp::Ne => return Ok(Value::Bool(lhs != rhs)),
            _ => {}
        }

        match (lhs, rhs) {
            (&Value::Int(x), &Value::Int(y)) => int_binary(op, x, y),
            (Value::Str(x), Value::Str(y)) => match op {
                BinaryOp::Add => Ok(Value::Str(format!("{x}{y}"))),
                BinaryOp::Lt => Ok(Value::Bool(x < y)),
                BinaryOp::Le => Ok(Value::Bool(x <= y)),
                BinaryOp::Gt => Ok(Value::Bool(x > y)),
                BinaryOp::Ge => Ok(Value::Bool(x >= y)),
                _ => Err(invalid_binary(op, lhs, rhs)),
            },
            _ => Err(invalid_binary(op, lhs, rhs)),
        }
    }

    /// Applies an arithmetic or logical unary operator. Dereference requires access to frame
    /// storage and is not handled here.
    pub fn unary(op: UnaryOp, value: &Value) -> Result<Value> {
        match (op, value) {
            (UnaryOp::Neg, Value::Int(x)) => Ok(Value::Int(x.wrapping_neg())),
            (UnaryOp::Not, Value::Bool(x)) => Ok(Value::Bool(!x)),
            _ => Err(Error::Runtime(format!(
                "invalid operation: {op}{value}",
                op = op.symbol()
            ))),
        }
    }
}

fn int_binary(op: BinaryOp, x: i64, y: i64) -> Result<Value> {
    let value = match op {
        BinaryOp::Add => x.wrapping_add(y),
        BinaryOp::Sub => x.wrapping_sub(y),
        BinaryOp::Mul => x.wrapping_mul(y),
        BinaryOp::Div | BinaryOp::Rem if y == 0 => {
            return Err(Error::Runtime("integer divide by zero".into()))
        }
        BinaryOp::Div => x.wrapping_div(y),
        BinaryOp::Rem => x.wrapping_rem(y),
        BinaryOp::And => x & y,
        BinaryOp::Or => x | y,
        BinaryOp::Xor => x ^ y,
        BinaryOp::AndNot => x & !y,
        BinaryOp::Shl | BinaryOp::Shr if y < 0 => {
            return Err(Error::Runtime("negative shift amount".into()))
        }
        BinaryOp::Shl => u32::try_from(y)
            .ok()
            .and_then(|y| x.checked_shl(y))
            .unwrap_or(0),
        BinaryOp::Shr => {
            let shift = u32::try_from(y).map_or(63, |y| y.min(63));
            x >> shift
        }
        BinaryOp::Lt => return Ok(Value::Bool(x < y)),
        BinaryOp::Le => return Ok(Value::Bool(x <= y)),
        BinaryOp::Gt => return Ok(Value::Bool(x > y)),
        BinaryOp::Ge => return Ok(Value::Bool(x >= y)),
        BinaryOp::Eq => return Ok(Value::Bool(x == y)),
        BinaryOp::Ne => return Ok(Value::Bool(x != y)),
    };
    Ok(Value::Int(value))
}

fn invalid_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Error {
    Error::Runtime(format!(
        "invalid operation: {lhs} {op} {rhs}",
        op = op.symbol()
    ))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Str(value) => f.write_str(value),
            Value::Nil => f.write_str("nil"),
            Value::Pointer(pointer) => write!(f, "&{}.{}", pointer.frame, pointer.local),
            Value::Interface { value, .. } => write!(f, "{value}"),
            Value::Struct(fields) => {
                f.write_str("{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{field}")?;
                }
                f.write_str("}")
            }
            Value::Unit => f.write_str("()"),
        }
    }
}
