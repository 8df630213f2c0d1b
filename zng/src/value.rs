//! Typed values over ZCODE bytes.
//!
//! A [`Value`] owns its body; a [`ValueRef`] borrows it, typically from a
//! reader buffer or from the body of an enclosing container. A `ValueRef`
//! that points into a buffer the reader will overwrite must be turned into
//! a `Value` with [`ValueRef::copy`] before it is retained.
use std::{fmt, net::IpAddr};

use once_cell::sync::Lazy;
use strum::{EnumIter, IntoEnumIterator};
use zcode::codec::{self, Net};

use crate::types::{Primitive, Type};

/// The named kinds of error values.
///
/// The message of an error value starts with the kind name; `missing` and
/// `quiet` carry nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ErrorKind {
    /// A field or index lookup that did not resolve.
    Missing,
    /// A missing variant callers may swallow silently.
    Quiet,
    BadCast,
    DivideByZero,
    IncompatibleTypes,
    Overflow,
    DuplicateField,
    NotContainer,
    NotPrimitive,
    Malformed,
    BadValue,
}

impl ErrorKind {
    pub fn from_str(s: &str) -> Option<Self> {
        ErrorKind::iter().find(|k| k.to_str() == s)
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            ErrorKind::Missing => "missing",
            ErrorKind::Quiet => "quiet",
            ErrorKind::BadCast => "bad_cast",
            ErrorKind::DivideByZero => "divide_by_zero",
            ErrorKind::IncompatibleTypes => "incompatible_types",
            ErrorKind::Overflow => "overflow",
            ErrorKind::DuplicateField => "duplicate_field",
            ErrorKind::NotContainer => "not_container",
            ErrorKind::NotPrimitive => "not_primitive",
            ErrorKind::Malformed => "malformed",
            ErrorKind::BadValue => "bad_value",
        }
    }

    /// Classify an error message by its leading kind name.
    pub fn of_message(msg: &str) -> Option<Self> {
        let head = msg.split_once(": ").map_or(msg, |(head, _)| head);
        Self::from_str(head)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// A type paired with an owned ZCODE body. `None` is the unset value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    pub ty: Type,
    pub bytes: Option<Vec<u8>>,
}

/// A type paired with a borrowed ZCODE body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRef<'a> {
    pub ty: &'a Type,
    pub bytes: Option<&'a [u8]>,
}

static MISSING: Lazy<Value> = Lazy::new(|| Value::error(ErrorKind::Missing.to_str()));
static QUIET: Lazy<Value> = Lazy::new(|| Value::error(ErrorKind::Quiet.to_str()));
static DIVIDE_BY_ZERO: Lazy<Value> = Lazy::new(|| Value::error(ErrorKind::DivideByZero.to_str()));

impl Value {
    pub fn new(ty: Type, bytes: Option<Vec<u8>>) -> Self {
        Self { ty, bytes }
    }

    pub fn unset(ty: Type) -> Self {
        Self { ty, bytes: None }
    }

    pub fn null() -> Self {
        Self::unset(Type::primitive(Primitive::Null))
    }

    fn prim(p: Primitive, body: &[u8]) -> Self {
        Self::new(Type::primitive(p), Some(body.to_vec()))
    }

    pub fn bool(v: bool) -> Self {
        Self::prim(Primitive::Bool, &codec::encode_bool(v))
    }

    pub fn int64(v: i64) -> Self {
        Self::prim(Primitive::Int64, &codec::encode_int(v))
    }

    /// A signed value of any signed kind, `time` or `duration`.
    pub fn int(p: Primitive, v: i64) -> Self {
        Self::prim(p, &codec::encode_int(v))
    }

    /// An unsigned value of any unsigned kind, `port` or `enum`.
    pub fn uint(p: Primitive, v: u64) -> Self {
        Self::prim(p, &codec::encode_uint(v))
    }

    pub fn uint64(v: u64) -> Self {
        Self::uint(Primitive::Uint64, v)
    }

    pub fn float64(v: f64) -> Self {
        Self::prim(Primitive::Float64, &codec::encode_float64(v))
    }

    /// A `string`, normalized to NFC.
    pub fn string(s: &str) -> Self {
        Self::prim(Primitive::String, codec::nfc(s).as_bytes())
    }

    pub fn bstring(b: &[u8]) -> Self {
        Self::prim(Primitive::Bstring, b)
    }

    pub fn bytes(b: &[u8]) -> Self {
        Self::prim(Primitive::Bytes, b)
    }

    pub fn ip(ip: IpAddr) -> Self {
        Self::prim(Primitive::Ip, &codec::encode_ip(ip))
    }

    pub fn net(net: &Net) -> Self {
        Self::prim(Primitive::Net, &codec::encode_net(net))
    }

    pub fn time(ns: i64) -> Self {
        Self::prim(Primitive::Time, &codec::encode_time(ns))
    }

    pub fn duration(ns: i64) -> Self {
        Self::prim(Primitive::Duration, &codec::encode_duration(ns))
    }

    /// A value of type `type` holding the type value of `ty`.
    pub fn type_value(ty: &Type) -> Self {
        Self::prim(Primitive::Type, ty.type_value())
    }

    pub fn error(msg: &str) -> Self {
        Self::prim(Primitive::Error, msg.as_bytes())
    }

    /// An error value of the given kind, `"<kind>: <detail>"`.
    pub fn error_of(kind: ErrorKind, detail: impl fmt::Display) -> Self {
        Self::error(&format!("{kind}: {detail}"))
    }

    /// An error value carrying only the kind name.
    pub fn error_kind_only(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Missing => Self::missing(),
            ErrorKind::Quiet => Self::quiet(),
            ErrorKind::DivideByZero => DIVIDE_BY_ZERO.clone(),
            kind => Self::error(kind.to_str()),
        }
    }

    pub fn missing() -> Self {
        MISSING.clone()
    }

    pub fn quiet() -> Self {
        QUIET.clone()
    }

    pub fn divide_by_zero() -> Self {
        DIVIDE_BY_ZERO.clone()
    }

    pub fn view(&self) -> ValueRef<'_> {
        ValueRef {
            ty: &self.ty,
            bytes: self.bytes.as_deref(),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.bytes.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.view().is_error()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.view().error_kind()
    }

    pub fn is_missing(&self) -> bool {
        self.view().is_missing()
    }

    pub fn is_quiet(&self) -> bool {
        self.view().is_quiet()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.view().as_bool()
    }

    pub fn as_int(&self) -> Option<i64> {
        self.view().as_int()
    }

    pub fn as_uint(&self) -> Option<u64> {
        self.view().as_uint()
    }

    pub fn as_float(&self) -> Option<f64> {
        self.view().as_float()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.view().as_str()
    }
}

impl<'a> ValueRef<'a> {
    pub fn new(ty: &'a Type, bytes: Option<&'a [u8]>) -> Self {
        Self { ty, bytes }
    }

    /// Deep-copy into an owned value.
    pub fn copy(&self) -> Value {
        Value {
            ty: self.ty.clone(),
            bytes: self.bytes.map(<[u8]>::to_vec),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.bytes.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.ty.is_error()
    }

    /// Message of an error value.
    pub fn error_message(&self) -> Option<&'a str> {
        if !self.is_error() {
            return None;
        }
        self.bytes.and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_message().and_then(ErrorKind::of_message)
    }

    pub fn is_missing(&self) -> bool {
        self.error_message() == Some(ErrorKind::Missing.to_str())
    }

    pub fn is_quiet(&self) -> bool {
        self.error_message() == Some(ErrorKind::Quiet.to_str())
    }

    fn body_if(&self, ok: impl FnOnce(Primitive) -> bool) -> Option<&'a [u8]> {
        match self.ty.primitive_kind() {
            Some(p) if ok(p) => self.bytes,
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.body_if(|p| p == Primitive::Bool)
            .and_then(|b| codec::decode_bool(b).ok())
    }

    /// Signed integers, `time` and `duration`.
    pub fn as_int(&self) -> Option<i64> {
        self.body_if(|p| p.is_signed() || matches!(p, Primitive::Time | Primitive::Duration))
            .and_then(|b| codec::decode_int(b).ok())
    }

    /// Unsigned integers, `port` and `enum`.
    pub fn as_uint(&self) -> Option<u64> {
        self.body_if(Primitive::is_unsigned)
            .and_then(|b| codec::decode_uint(b).ok())
    }

    pub fn as_float(&self) -> Option<f64> {
        self.body_if(Primitive::is_float)
            .and_then(|b| codec::decode_float64(b).ok())
    }

    /// Text of `string`, `bstring` and `error` values that are valid UTF-8.
    pub fn as_str(&self) -> Option<&'a str> {
        self.body_if(|p| p.is_stringy() || p == Primitive::Error)
            .and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_ip(&self) -> Option<IpAddr> {
        self.body_if(|p| p == Primitive::Ip)
            .and_then(|b| codec::decode_ip(b).ok())
    }

    pub fn as_net(&self) -> Option<Net> {
        self.body_if(|p| p == Primitive::Net)
            .and_then(|b| codec::decode_net(b).ok())
    }
}

impl<'a> From<&'a Value> for ValueRef<'a> {
    fn from(value: &'a Value) -> Self {
        value.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_roundtrip_names() {
        for k in ErrorKind::iter() {
            assert_eq!(ErrorKind::from_str(k.to_str()), Some(k));
        }
        assert_eq!(ErrorKind::of_message("bad_cast: 300 to int8"), Some(ErrorKind::BadCast));
        assert_eq!(ErrorKind::of_message("something else"), None);
    }

    #[test]
    fn sentinels() {
        let m = Value::missing();
        assert!(m.is_error());
        assert!(m.is_missing());
        assert!(!m.is_quiet());
        assert_eq!(m.error_kind(), Some(ErrorKind::Missing));
        assert!(Value::quiet().is_quiet());
        assert_eq!(Value::divide_by_zero(), Value::error_kind_only(ErrorKind::DivideByZero));
        let e = Value::error_of(ErrorKind::Overflow, "too big");
        assert_eq!(e.as_str(), Some("overflow: too big"));
        assert_eq!(e.error_kind(), Some(ErrorKind::Overflow));
        assert!(!e.is_missing());
    }

    #[test]
    fn accessors_check_kind() {
        assert_eq!(Value::int64(-5).as_int(), Some(-5));
        assert_eq!(Value::int64(-5).as_uint(), None);
        assert_eq!(Value::uint(Primitive::Port, 80).as_uint(), Some(80));
        assert_eq!(Value::time(10).as_int(), Some(10));
        assert_eq!(Value::float64(1.5).as_float(), Some(1.5));
        assert_eq!(Value::bool(true).as_bool(), Some(true));
        assert_eq!(Value::unset(Type::primitive(Primitive::Bool)).as_bool(), None);
        assert_eq!(Value::string("e\u{301}").as_str(), Some("\u{e9}"));
    }

    #[test]
    fn copy_detaches_from_buffer() {
        let ty = Type::primitive(Primitive::Bytes);
        let owned = {
            let buf = vec![1u8, 2, 3];
            ValueRef::new(&ty, Some(&buf[1..])).copy()
        };
        assert_eq!(owned.bytes.as_deref(), Some(&[2u8, 3][..]));
    }
}
