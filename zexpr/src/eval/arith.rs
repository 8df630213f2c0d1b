//! Arithmetic over coerced operands.
use strum::{EnumIter, IntoEnumIterator};
use zng::{
    ErrorKind, TypeContext, Value, ValueRef,
    types::{Primitive, Type},
};

use super::{Evaluator, incompatible, malformed};
use crate::{
    Error, Result,
    coerce::{CoerceError, Operands, coerce},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    pub fn from_str(s: &str) -> Option<Self> {
        ArithOp::iter().find(|op| op.to_str() == s)
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s).ok_or_else(|| Error::UnknownOperator { op: s.to_string() })
    }
}

/// Truncate `v` to the width of the signed kind `p`.
fn wrap_signed(p: Primitive, v: i64) -> i64 {
    match p.int_width() {
        Some(bits) if bits < 64 => (v << (64 - bits)) >> (64 - bits),
        _ => v,
    }
}

fn wrap_unsigned(p: Primitive, v: u64) -> u64 {
    match p.int_width() {
        Some(bits) if bits < 64 => v & ((1u64 << bits) - 1),
        _ => v,
    }
}

fn int_op(op: ArithOp, a: i64, b: i64) -> Option<i64> {
    Some(match op {
        ArithOp::Add => a.wrapping_add(b),
        ArithOp::Sub => a.wrapping_sub(b),
        ArithOp::Mul => a.wrapping_mul(b),
        ArithOp::Div => a.checked_div(b).or_else(|| (b != 0).then_some(a.wrapping_div(b)))?,
        ArithOp::Rem => a.checked_rem(b).or_else(|| (b != 0).then_some(a.wrapping_rem(b)))?,
    })
}

fn uint_op(op: ArithOp, a: u64, b: u64) -> Option<u64> {
    Some(match op {
        ArithOp::Add => a.wrapping_add(b),
        ArithOp::Sub => a.wrapping_sub(b),
        ArithOp::Mul => a.wrapping_mul(b),
        ArithOp::Div => a.checked_div(b)?,
        ArithOp::Rem => a.checked_rem(b)?,
    })
}

fn prim(p: Primitive) -> Type {
    Type::primitive(p)
}

/// `time ± duration`, `duration + time` and `time - time`.
fn time_arith(op: ArithOp, lhs: ValueRef<'_>, rhs: ValueRef<'_>) -> Option<Value> {
    let kinds = (lhs.ty.primitive_kind()?, rhs.ty.primitive_kind()?);
    let out = match (kinds, op) {
        ((Primitive::Time, Primitive::Duration), ArithOp::Add | ArithOp::Sub)
        | ((Primitive::Duration, Primitive::Time), ArithOp::Add) => Primitive::Time,
        ((Primitive::Time, Primitive::Time), ArithOp::Sub) => Primitive::Duration,
        _ => return None,
    };
    let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) else {
        return Some(Value::unset(prim(out)));
    };
    let v = match op {
        ArithOp::Sub => a.wrapping_sub(b),
        _ => a.wrapping_add(b),
    };
    Some(Value::int(out, v))
}

/// Apply `op` to two values.
///
/// Integer arithmetic wraps at the width of the promoted type. Division and
/// remainder by zero yield the shared `divide_by_zero` error.
pub fn arith(op: ArithOp, lhs: ValueRef<'_>, rhs: ValueRef<'_>) -> Value {
    if let Some(v) = time_arith(op, lhs, rhs) {
        return v;
    }
    let c = match coerce(lhs, rhs) {
        Ok(c) => c,
        Err(CoerceError::Incompatible) => {
            return incompatible(format_args!("{} {} {}", lhs.ty, op.to_str(), rhs.ty));
        }
        Err(CoerceError::Overflow { .. }) => {
            return Value::error_of(ErrorKind::Overflow, format_args!("{lhs} {} {rhs}", op.to_str()));
        }
        Err(CoerceError::Malformed) => return malformed(format_args!("{lhs} {} {rhs}", op.to_str())),
    };
    let p = c.primitive();
    let mismatch = || incompatible(format_args!("{} {} {}", lhs.ty, op.to_str(), rhs.ty));
    match c.ops {
        Operands::Unset { .. } => match p {
            Some(p) if p.is_number() || p.is_stringy() || p == Primitive::Duration => Value::unset(c.ty),
            _ => mismatch(),
        },
        Operands::Int(a, b) => match p {
            Some(Primitive::Duration) if matches!(op, ArithOp::Add | ArithOp::Sub) => {
                let v = if op == ArithOp::Add { a.wrapping_add(b) } else { a.wrapping_sub(b) };
                Value::int(Primitive::Duration, v)
            }
            Some(p) if p.is_signed() => match int_op(op, a, b) {
                Some(v) => Value::int(p, wrap_signed(p, v)),
                None => Value::divide_by_zero(),
            },
            _ => mismatch(),
        },
        Operands::Uint(a, b) => {
            let p = p.unwrap_or(Primitive::Uint64);
            match uint_op(op, a, b) {
                Some(v) => Value::uint(p, wrap_unsigned(p, v)),
                None => Value::divide_by_zero(),
            }
        }
        Operands::Float(a, b) => match op {
            ArithOp::Rem => incompatible(format_args!("%: integer operands required, found {lhs} and {rhs}")),
            ArithOp::Div if b == 0.0 => Value::divide_by_zero(),
            ArithOp::Add => Value::float64(a + b),
            ArithOp::Sub => Value::float64(a - b),
            ArithOp::Mul => Value::float64(a * b),
            ArithOp::Div => Value::float64(a / b),
        },
        Operands::Bytes(a, b) if op == ArithOp::Add && p.is_some_and(Primitive::is_stringy) => {
            let mut out = Vec::with_capacity(a.len() + b.len());
            out.extend_from_slice(a);
            out.extend_from_slice(b);
            Value::new(c.ty, Some(out))
        }
        Operands::Bytes(..) | Operands::Ip(..) => mismatch(),
    }
}

/// `lhs <op> rhs`.
pub struct Arith {
    op: ArithOp,
    lhs: Box<dyn Evaluator>,
    rhs: Box<dyn Evaluator>,
}

impl Arith {
    pub fn new(op: ArithOp, lhs: Box<dyn Evaluator>, rhs: Box<dyn Evaluator>) -> Self {
        Self { op, lhs, rhs }
    }
}

impl Evaluator for Arith {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let lhs = self.lhs.eval(ctx, this);
        if lhs.is_error() {
            return lhs;
        }
        let rhs = self.rhs.eval(ctx, this);
        if rhs.is_error() {
            return rhs;
        }
        arith(self.op, lhs.view(), rhs.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc(op: &str, a: Value, b: Value) -> Value {
        arith(ArithOp::parse(op).unwrap(), a.view(), b.view())
    }

    #[test]
    fn integers() {
        assert_eq!(calc("+", Value::int64(2), Value::int64(3)), Value::int64(5));
        assert_eq!(calc("%", Value::int64(7), Value::int64(3)), Value::int64(1));
        assert_eq!(calc("-", Value::uint64(1), Value::uint64(2)), Value::uint64(u64::MAX));
        assert_eq!(
            calc("+", Value::int(Primitive::Int8, 127), Value::int(Primitive::Int8, 1)),
            Value::int(Primitive::Int8, -128)
        );
        assert_eq!(
            calc("*", Value::int(Primitive::Int8, 3), Value::uint(Primitive::Uint8, 100)),
            Value::int(Primitive::Int16, 300)
        );
        assert_eq!(calc("/", Value::int64(i64::MIN), Value::int64(-1)), Value::int64(i64::MIN));
    }

    #[test]
    fn division_by_zero_is_shared() {
        assert_eq!(calc("/", Value::int64(1), Value::int64(0)), Value::divide_by_zero());
        assert_eq!(calc("%", Value::uint64(1), Value::uint64(0)), Value::divide_by_zero());
        assert_eq!(calc("/", Value::float64(1.0), Value::float64(0.0)), Value::divide_by_zero());
    }

    #[test]
    fn floats_strings_and_mismatches() {
        assert_eq!(calc("*", Value::float64(1.5), Value::int64(2)), Value::float64(3.0));
        assert_eq!(
            calc("%", Value::float64(1.5), Value::int64(2)).error_kind(),
            Some(ErrorKind::IncompatibleTypes)
        );
        assert_eq!(calc("+", Value::string("ab"), Value::string("c")), Value::string("abc"));
        assert_eq!(calc("+", Value::string("a"), Value::bstring(b"b")), Value::bstring(b"ab"));
        assert_eq!(
            calc("-", Value::string("a"), Value::string("b")).error_kind(),
            Some(ErrorKind::IncompatibleTypes)
        );
        assert_eq!(
            calc("+", Value::string("a"), Value::int64(1)).error_kind(),
            Some(ErrorKind::IncompatibleTypes)
        );
        assert_eq!(
            calc("+", Value::int64(-1), Value::uint64(u64::MAX)).error_kind(),
            Some(ErrorKind::Overflow)
        );
        assert_eq!(calc("+", Value::null(), Value::int64(1)), Value::unset(prim(Primitive::Int64)));
    }

    #[test]
    fn times_and_durations() {
        assert_eq!(calc("+", Value::time(10), Value::duration(5)), Value::time(15));
        assert_eq!(calc("+", Value::duration(5), Value::time(10)), Value::time(15));
        assert_eq!(calc("-", Value::time(10), Value::time(4)), Value::duration(6));
        assert_eq!(calc("-", Value::duration(10), Value::duration(4)), Value::duration(6));
        assert_eq!(
            calc("+", Value::time(1), Value::time(1)).error_kind(),
            Some(ErrorKind::IncompatibleTypes)
        );
        assert_eq!(
            calc("+", Value::time(1), Value::int64(1)).error_kind(),
            Some(ErrorKind::IncompatibleTypes)
        );
    }
}
