//! Pairwise coercion and scalar conversions.
//!
//! [`coerce`] brings two values to a common kind before they are compared
//! or combined:
//!
//! - `null` adopts the other side's type.
//! - `float64` absorbs any integer.
//! - Integers of equal signedness widen to the wider type.
//! - Mixed signedness becomes signed unless the unsigned side exceeds
//!   `i64::MAX`, in which case both become `uint64`. If the signed side is
//!   then negative the pair overflows and the sign alone orders them.
//! - Enum values become their unsigned index.
//! - `string` and `bstring` mix as `bstring`.
//! - Anything else must have the same underlying type.
use std::{cmp::Ordering, net::IpAddr};

use strum::EnumIs;
use zcode::codec;
use zng::{
    ValueRef,
    parse::parse_primitive_body,
    types::{Primitive, Type},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum CoerceError {
    Incompatible,
    /// The operands cannot share an integer type. The signed operand is the
    /// smaller one.
    Overflow { signed_lhs: bool },
    Malformed,
}

/// Decoded operands of a coerced pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operands<'a> {
    Int(i64, i64),
    Uint(u64, u64),
    Float(f64, f64),
    Ip(IpAddr, IpAddr),
    Bytes(&'a [u8], &'a [u8]),
    /// At least one side is unset.
    Unset { lhs: bool, rhs: bool },
}

/// Two values brought to a common type.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced<'a> {
    pub ty: Type,
    pub ops: Operands<'a>,
}

impl Coerced<'_> {
    pub fn primitive(&self) -> Option<Primitive> {
        self.ty.primitive_kind()
    }

    pub fn equal(&self) -> bool {
        match self.ops {
            Operands::Int(a, b) => a == b,
            Operands::Uint(a, b) => a == b,
            Operands::Float(a, b) => a == b,
            Operands::Ip(a, b) => a == b,
            Operands::Bytes(a, b) => a == b,
            Operands::Unset { lhs, rhs } => lhs && rhs,
        }
    }

    /// Ordering of the pair. `None` when either side is unset or NaN.
    pub fn compare(&self) -> Option<Ordering> {
        match self.ops {
            Operands::Int(a, b) => Some(a.cmp(&b)),
            Operands::Uint(a, b) => Some(a.cmp(&b)),
            Operands::Float(a, b) => a.partial_cmp(&b),
            Operands::Ip(a, b) => Some(codec::encode_ip(a)[..].cmp(&codec::encode_ip(b)[..])),
            Operands::Bytes(a, b) => Some(a.cmp(b)),
            Operands::Unset { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Null,
    Signed(Primitive),
    Unsigned(Primitive),
    Float,
    Stringy(Primitive),
    Other,
}

fn classify(v: &ValueRef<'_>) -> Class {
    if v.ty.enumeration().is_some() {
        return Class::Unsigned(Primitive::Uint64);
    }
    match v.ty.primitive_kind() {
        Some(Primitive::Null) => Class::Null,
        Some(p) if p.is_signed() => Class::Signed(p),
        Some(p) if p.is_unsigned() => Class::Unsigned(p),
        Some(p) if p.is_float() => Class::Float,
        Some(p) if p.is_stringy() => Class::Stringy(p),
        _ => Class::Other,
    }
}

fn width(p: Primitive) -> u32 {
    p.int_width().unwrap_or(64)
}

/// The signed type able to hold both `signed` and `unsigned`.
fn promote_mixed(signed: Primitive, unsigned: Primitive) -> Primitive {
    Primitive::signed_of_width(width(signed).max((width(unsigned) * 2).min(64)))
}

fn wider(a: Primitive, b: Primitive) -> Primitive {
    if width(b) > width(a) { b } else { a }
}

fn int(body: &[u8]) -> Result<i64, CoerceError> {
    codec::decode_int(body).map_err(|_| CoerceError::Malformed)
}

fn uint(body: &[u8]) -> Result<u64, CoerceError> {
    codec::decode_uint(body).map_err(|_| CoerceError::Malformed)
}

fn float_of(class: Class, body: &[u8]) -> Result<f64, CoerceError> {
    match class {
        Class::Float => codec::decode_float64(body).map_err(|_| CoerceError::Malformed),
        Class::Signed(_) => Ok(int(body)? as f64),
        Class::Unsigned(_) => Ok(uint(body)? as f64),
        _ => Err(CoerceError::Incompatible),
    }
}

fn prim(p: Primitive) -> Type {
    Type::primitive(p)
}

/// The member value carried by a (possibly nested) union. Other values,
/// unset unions and malformed bodies are returned as is.
pub fn deunion(mut v: ValueRef<'_>) -> ValueRef<'_> {
    while v.ty.union().is_some() {
        match v.union_value() {
            Ok(Some((_, inner))) => v = inner,
            _ => break,
        }
    }
    v
}

/// Coerce `a` and `b` to a common type.
///
/// Union operands are compared by the member value they carry.
pub fn coerce<'a>(a: ValueRef<'a>, b: ValueRef<'a>) -> Result<Coerced<'a>, CoerceError> {
    let (a, b) = (deunion(a), deunion(b));
    let (ca, cb) = (classify(&a), classify(&b));
    let ty = match (ca, cb) {
        (Class::Null, _) => b.ty.clone(),
        (_, Class::Null) => a.ty.clone(),
        (Class::Float, Class::Signed(_) | Class::Unsigned(_) | Class::Float)
        | (Class::Signed(_) | Class::Unsigned(_), Class::Float) => prim(Primitive::Float64),
        (Class::Signed(p), Class::Signed(q)) | (Class::Unsigned(p), Class::Unsigned(q)) => prim(wider(p, q)),
        (Class::Signed(s), Class::Unsigned(u)) | (Class::Unsigned(u), Class::Signed(s)) => {
            prim(promote_mixed(s, u))
        }
        (Class::Stringy(p), Class::Stringy(q)) => prim(if p == q { p } else { Primitive::Bstring }),
        (Class::Other, Class::Other) if a.ty.under() == b.ty.under() => a.ty.clone(),
        _ => return Err(CoerceError::Incompatible),
    };

    let (Some(x), Some(y)) = (a.bytes, b.bytes) else {
        return Ok(Coerced {
            ty,
            ops: Operands::Unset {
                lhs: a.bytes.is_none(),
                rhs: b.bytes.is_none(),
            },
        });
    };

    let ops = match (ca, cb) {
        (Class::Float, _) | (_, Class::Float) => Operands::Float(float_of(ca, x)?, float_of(cb, y)?),
        (Class::Signed(_), Class::Signed(_)) => Operands::Int(int(x)?, int(y)?),
        (Class::Unsigned(_), Class::Unsigned(_)) => Operands::Uint(uint(x)?, uint(y)?),
        (Class::Signed(_), Class::Unsigned(_)) | (Class::Unsigned(_), Class::Signed(_)) => {
            let signed_lhs = matches!(ca, Class::Signed(_));
            let (s, u) = if signed_lhs { (int(x)?, uint(y)?) } else { (int(y)?, uint(x)?) };
            if let Ok(u) = i64::try_from(u) {
                if signed_lhs { Operands::Int(s, u) } else { Operands::Int(u, s) }
            } else if s >= 0 {
                let ty = prim(Primitive::Uint64);
                let ops = if signed_lhs {
                    Operands::Uint(s as u64, u)
                } else {
                    Operands::Uint(u, s as u64)
                };
                return Ok(Coerced { ty, ops });
            } else {
                return Err(CoerceError::Overflow { signed_lhs });
            }
        }
        _ => match ty.primitive_kind() {
            Some(Primitive::Time | Primitive::Duration) => Operands::Int(int(x)?, int(y)?),
            Some(Primitive::Ip) => {
                let ip = |b: &[u8]| codec::decode_ip(b).map(codec::canonical_ip).map_err(|_| CoerceError::Malformed);
                Operands::Ip(ip(x)?, ip(y)?)
            }
            _ => Operands::Bytes(x, y),
        },
    };
    Ok(Coerced { ty, ops })
}

fn parsed(p: Primitive, v: &ValueRef<'_>) -> Option<Vec<u8>> {
    let text = v.as_str()?;
    parse_primitive_body(p, text).ok()
}

/// Integer value of `v`, if it has one.
///
/// Floats truncate toward zero; `time` and `duration` yield nanoseconds;
/// strings are parsed as decimal.
pub fn to_int(v: ValueRef<'_>) -> Option<i64> {
    let body = v.bytes?;
    if v.ty.enumeration().is_some() {
        return codec::decode_uint(body).ok().and_then(|u| i64::try_from(u).ok());
    }
    match v.ty.primitive_kind()? {
        p if p.is_signed() => codec::decode_int(body).ok(),
        Primitive::Time | Primitive::Duration => codec::decode_int(body).ok(),
        p if p.is_unsigned() => codec::decode_uint(body).ok().and_then(|u| i64::try_from(u).ok()),
        Primitive::Float64 => {
            let f = codec::decode_float64(body).ok()?.trunc();
            (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
        }
        Primitive::Bool => codec::decode_bool(body).ok().map(i64::from),
        p if p.is_stringy() => parsed(Primitive::Int64, &v).and_then(|b| codec::decode_int(&b).ok()),
        _ => None,
    }
}

/// Unsigned value of `v`. Negative inputs have none.
pub fn to_uint(v: ValueRef<'_>) -> Option<u64> {
    let body = v.bytes?;
    if v.ty.enumeration().is_some() {
        return codec::decode_uint(body).ok();
    }
    match v.ty.primitive_kind()? {
        p if p.is_unsigned() => codec::decode_uint(body).ok(),
        Primitive::Float64 => {
            let f = codec::decode_float64(body).ok()?.trunc();
            (f.is_finite() && f >= 0.0 && f < u64::MAX as f64).then_some(f as u64)
        }
        p if p.is_stringy() => parsed(Primitive::Uint64, &v).and_then(|b| codec::decode_uint(&b).ok()),
        _ => to_int(v).and_then(|i| u64::try_from(i).ok()),
    }
}

/// Float value of `v`. `time` and `duration` yield nanoseconds.
pub fn to_float(v: ValueRef<'_>) -> Option<f64> {
    let body = v.bytes?;
    match v.ty.primitive_kind() {
        Some(Primitive::Float64) => codec::decode_float64(body).ok(),
        Some(p) if p.is_unsigned() => codec::decode_uint(body).ok().map(|u| u as f64),
        Some(p) if p.is_stringy() => {
            parsed(Primitive::Float64, &v).and_then(|b| codec::decode_float64(&b).ok())
        }
        _ => to_int(v).map(|i| i as f64),
    }
}

/// Truth value of `v`: booleans as is, `"true"`/`"false"` strings, and
/// numbers compared against zero.
pub fn to_bool(v: ValueRef<'_>) -> Option<bool> {
    if let Some(b) = v.as_bool() {
        return Some(b);
    }
    match v.ty.primitive_kind()? {
        p if p.is_stringy() => match v.as_str()? {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        p if p.is_float() => to_float(v).map(|f| f != 0.0),
        p if p.is_integer() => to_int(v).map(|i| i != 0).or_else(|| to_uint(v).map(|u| u != 0)),
        _ => None,
    }
}
