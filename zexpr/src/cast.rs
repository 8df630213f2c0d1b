//! `cast_to_<type>` conversions between primitive types.
use zng::{
    ErrorKind, TypeContext, Value, ValueRef, format::Plain, parse::parse_primitive_body,
    types::{Primitive, Type},
};

use crate::{
    Error, Result,
    coerce::{to_bool, to_float, to_int, to_uint},
    eval::Evaluator,
};

/// Converts values to one primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caster(Primitive);

/// The caster producing values of `p`, if `p` is a cast target.
pub fn lookup_primitive_caster(p: Primitive) -> Option<Caster> {
    match p {
        Primitive::Null | Primitive::Type | Primitive::Error | Primitive::Enum => None,
        p => Some(Caster(p)),
    }
}

fn bad_cast(v: ValueRef<'_>, p: Primitive) -> Value {
    Value::error_of(ErrorKind::BadCast, format_args!("cannot cast {v} to {p}"))
}

/// Text of `v` for string casts: enum symbols, string bodies as is, and
/// the undecorated text form of everything else.
fn text_of(v: ValueRef<'_>) -> Option<Vec<u8>> {
    if let Ok(Some(sym)) = v.enum_symbol() {
        return Some(sym.as_bytes().to_vec());
    }
    match v.ty.primitive_kind() {
        Some(p) if p.is_stringy() => v.bytes.map(<[u8]>::to_vec),
        _ => Some(Plain(v).to_string().into_bytes()),
    }
}

impl Caster {
    pub fn target(&self) -> Primitive {
        self.0
    }

    /// Cast `v`. Unset inputs become unset values of the target type and
    /// error values pass through.
    pub fn cast(&self, v: ValueRef<'_>) -> Value {
        let p = self.0;
        if v.is_error() {
            return v.copy();
        }
        let ty = Type::primitive(p);
        if v.is_unset() {
            return Value::unset(ty);
        }
        if v.ty.primitive_kind() == Some(p) {
            return Value::new(ty, v.bytes.map(<[u8]>::to_vec));
        }
        let out = match p {
            p if p.is_signed() => to_int(v).and_then(|i| {
                let bits = p.int_width().unwrap_or(64);
                let (min, max) = (i64::MIN >> (64 - bits), i64::MAX >> (64 - bits));
                (min..=max).contains(&i).then(|| Value::int(p, i))
            }),
            p if p.is_unsigned() => to_uint(v).and_then(|u| {
                let bits = p.int_width().unwrap_or(64);
                (u <= u64::MAX >> (64 - bits)).then(|| Value::uint(p, u))
            }),
            Primitive::Float64 => to_float(v).map(Value::float64),
            Primitive::Bool => to_bool(v).map(Value::bool),
            Primitive::String => text_of(v)
                .and_then(|b| String::from_utf8(b).ok())
                .map(|s| Value::string(&s)),
            Primitive::Bstring => text_of(v).map(|b| Value::bstring(&b)),
            Primitive::Bytes => v.bytes.map(Value::bytes),
            Primitive::Time | Primitive::Duration => self.temporal(v),
            Primitive::Ip | Primitive::Net => v
                .as_str()
                .filter(|_| v.ty.primitive_kind().is_some_and(Primitive::is_stringy))
                .and_then(|s| parse_primitive_body(p, s.trim()).ok())
                .map(|body| Value::new(ty, Some(body))),
            _ => None,
        };
        out.unwrap_or_else(|| bad_cast(v, p))
    }

    /// Numbers are taken as nanoseconds; strings are parsed.
    fn temporal(&self, v: ValueRef<'_>) -> Option<Value> {
        let p = self.0;
        let kind = v.ty.primitive_kind()?;
        if kind.is_stringy() {
            let s = v.as_str()?;
            if let Ok(body) = parse_primitive_body(p, s) {
                return Some(Value::new(Type::primitive(p), Some(body)));
            }
        }
        if !(kind.is_number() || kind.is_stringy() || matches!(kind, Primitive::Time | Primitive::Duration)) {
            return None;
        }
        to_int(v).map(|ns| Value::int(p, ns))
    }
}

/// `cast_to_<target>(expr)`.
pub struct Cast {
    caster: Caster,
    expr: Box<dyn Evaluator>,
}

impl Cast {
    pub fn new(target: &str, expr: Box<dyn Evaluator>) -> Result<Self> {
        let caster = Primitive::from_str(target)
            .and_then(lookup_primitive_caster)
            .ok_or_else(|| Error::UnknownCast {
                target: target.to_string(),
            })?;
        Ok(Self { caster, expr })
    }

    pub fn target(&self) -> Primitive {
        self.caster.target()
    }
}

impl Evaluator for Cast {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let v = self.expr.eval(ctx, this);
        self.caster.cast(v.view())
    }
}

#[cfg(test)]
mod tests {
    use zcode::codec;

    use super::*;

    fn cast(target: Primitive, v: Value) -> Value {
        lookup_primitive_caster(target).unwrap().cast(v.view())
    }

    fn is_bad_cast(v: &Value) -> bool {
        v.error_kind() == Some(ErrorKind::BadCast)
    }

    #[test]
    fn integer_narrowing() {
        assert_eq!(cast(Primitive::Int8, Value::int64(127)), Value::int(Primitive::Int8, 127));
        assert!(is_bad_cast(&cast(Primitive::Int8, Value::int64(128))));
        assert!(is_bad_cast(&cast(Primitive::Int8, Value::int64(-129))));
        assert_eq!(cast(Primitive::Uint8, Value::int64(255)), Value::uint(Primitive::Uint8, 255));
        assert!(is_bad_cast(&cast(Primitive::Uint8, Value::int64(-1))));
        assert_eq!(cast(Primitive::Port, Value::string("443")), Value::uint(Primitive::Port, 443));
        assert_eq!(cast(Primitive::Int64, Value::float64(2.7)), Value::int64(2));
        assert!(is_bad_cast(&cast(Primitive::Int64, Value::string("x"))));
    }

    #[test]
    fn strings_and_text() {
        assert_eq!(cast(Primitive::String, Value::uint(Primitive::Port, 80)), Value::string("80"));
        assert_eq!(cast(Primitive::String, Value::int64(-3)), Value::string("-3"));
        assert_eq!(
            cast(Primitive::String, Value::ip("10.0.0.1".parse().unwrap())),
            Value::string("10.0.0.1")
        );
        assert_eq!(cast(Primitive::Bstring, Value::string("a")), Value::bstring(b"a"));
        assert!(is_bad_cast(&cast(Primitive::String, Value::bstring(&[0xff]))));
        assert_eq!(cast(Primitive::Bytes, Value::string("hi")), Value::bytes(b"hi"));

        let ctx = TypeContext::new();
        let e = ctx.lookup_type_enum(vec!["lo".into(), "hi".into()]);
        let v = Value::new(e, Some(codec::encode_uint(1).to_vec()));
        assert_eq!(cast(Primitive::String, v), Value::string("hi"));
    }

    #[test]
    fn addresses_and_times() {
        assert_eq!(
            cast(Primitive::Ip, Value::string("10.1.2.3")),
            Value::ip("10.1.2.3".parse().unwrap())
        );
        assert!(is_bad_cast(&cast(Primitive::Ip, Value::string("10.1.2"))));
        assert!(is_bad_cast(&cast(Primitive::Net, Value::string("10.0.0.0"))));
        assert!(is_bad_cast(&cast(Primitive::Ip, Value::int64(1))));
        assert_eq!(cast(Primitive::Time, Value::string("1970-01-01T00:00:01Z")), Value::time(1_000_000_000));
        assert_eq!(cast(Primitive::Time, Value::int64(5)), Value::time(5));
        assert_eq!(cast(Primitive::Duration, Value::string("1.5s")), Value::duration(1_500_000_000));
        assert!(is_bad_cast(&cast(Primitive::Duration, Value::string("soon"))));
        assert!(is_bad_cast(&cast(Primitive::Time, Value::ip("10.0.0.1".parse().unwrap()))));
    }

    #[test]
    fn unset_errors_and_targets() {
        assert_eq!(cast(Primitive::Int8, Value::null()), Value::unset(Type::primitive(Primitive::Int8)));
        assert_eq!(cast(Primitive::Int8, Value::missing()), Value::missing());
        assert_eq!(cast(Primitive::Bool, Value::string("true")), Value::bool(true));
        assert!(Cast::new("int8", crate::eval::This.boxed()).is_ok());
        assert!(Cast::new("error", crate::eval::This.boxed()).err().is_some_and(|e| e.is_unknown_cast()));
        assert!(Cast::new("decimal", crate::eval::This.boxed()).err().is_some_and(|e| e.is_unknown_cast()));
    }
}
