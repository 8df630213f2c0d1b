//! Structural type checking of value bodies.
//!
//! [`check`] walks a body alongside its type and reports the first place
//! where they disagree. Unset values are accepted anywhere.
use zcode::{Iter, codec};

use crate::{
    Error, Result, ValueRef,
    error::CheckFailure,
    types::{Primitive, Type, TypeKind},
    typevalue::format_type_value,
};

struct Failure {
    path: Vec<String>,
    ty: Type,
    failure: CheckFailure,
}

type CheckResult = std::result::Result<(), Failure>;

fn fail(path: &[String], ty: &Type, failure: CheckFailure) -> Failure {
    Failure {
        path: path.to_vec(),
        ty: ty.clone(),
        failure,
    }
}

/// Check that `bytes` is a well-formed body of type `ty`.
pub fn check(ty: &Type, bytes: Option<&[u8]>) -> Result<()> {
    let Some(body) = bytes else {
        return Ok(());
    };
    let mut path = Vec::new();
    check_body(ty, body, &mut path).map_err(|f| Error::TypeCheck {
        path: if f.path.is_empty() {
            String::from("this")
        } else {
            f.path.join(".")
        },
        ty: f.ty.to_string(),
        failure: f.failure,
    })
}

impl ValueRef<'_> {
    /// Structural check of this value.
    pub fn check(&self) -> Result<()> {
        check(self.ty, self.bytes)
    }
}

fn check_primitive(p: Primitive, body: &[u8]) -> std::result::Result<(), CheckFailure> {
    let bad = |e: zcode::Error| CheckFailure::BadPrimitive(e.to_string());
    match p {
        Primitive::Bool => codec::decode_bool(body).map(drop).map_err(bad),
        Primitive::Int8 | Primitive::Int16 | Primitive::Int32 => {
            let v = codec::decode_int(body).map_err(bad)?;
            let bits = p.int_width().unwrap_or(64);
            if v < i64::MIN >> (64 - bits) || v > i64::MAX >> (64 - bits) {
                return Err(CheckFailure::BadPrimitive(format!("{v} out of range for {p}")));
            }
            Ok(())
        }
        Primitive::Uint8 | Primitive::Uint16 | Primitive::Uint32 | Primitive::Port => {
            let v = codec::decode_uint(body).map_err(bad)?;
            let bits = p.int_width().unwrap_or(64);
            if v > u64::MAX >> (64 - bits) {
                return Err(CheckFailure::BadPrimitive(format!("{v} out of range for {p}")));
            }
            Ok(())
        }
        Primitive::Int64 | Primitive::Time | Primitive::Duration => codec::decode_int(body).map(drop).map_err(bad),
        Primitive::Uint64 | Primitive::Enum => codec::decode_uint(body).map(drop).map_err(bad),
        Primitive::Float64 => codec::decode_float64(body).map(drop).map_err(bad),
        Primitive::Ip => codec::decode_ip(body).map(drop).map_err(bad),
        Primitive::Net => codec::decode_net(body).map(drop).map_err(bad),
        Primitive::String => codec::decode_string(body).map(drop).map_err(bad),
        Primitive::Type => format_type_value(body)
            .map(drop)
            .map_err(|e| CheckFailure::BadPrimitive(e.to_string())),
        Primitive::Null => Err(CheckFailure::BadPrimitive(String::from("null value with a body"))),
        Primitive::Bytes | Primitive::Bstring | Primitive::Error => Ok(()),
    }
}

fn check_item(ty: &Type, body: Option<&[u8]>, container: bool, path: &mut Vec<String>) -> CheckResult {
    let Some(body) = body else {
        return Ok(());
    };
    match (ty.is_container(), container) {
        (true, false) => return Err(fail(path, ty, CheckFailure::NotContainer)),
        (false, true) => return Err(fail(path, ty, CheckFailure::NotPrimitive)),
        _ => {}
    }
    check_body(ty, body, path)
}

fn check_body(ty: &Type, body: &[u8], path: &mut Vec<String>) -> CheckResult {
    match ty.kind() {
        TypeKind::Alias(a) => check_body(&a.ty, body, path),
        TypeKind::Primitive(p) => check_primitive(*p, body).map_err(|f| fail(path, ty, f)),
        TypeKind::Enum(e) => {
            let idx = codec::decode_uint(body).map_err(|e| fail(path, ty, CheckFailure::Malformed(e)))?;
            if e.symbol(idx).is_none() {
                return Err(fail(
                    path,
                    ty,
                    CheckFailure::BadPrimitive(format!("enum index {idx} out of range")),
                ));
            }
            Ok(())
        }
        TypeKind::Record(rec) => {
            let mut it = Iter::new(body);
            for col in &rec.columns {
                path.push(col.name.clone());
                if it.done() {
                    return Err(fail(path, &col.ty, CheckFailure::MissingField));
                }
                let item = it.next_item().map_err(|e| fail(path, &col.ty, CheckFailure::Malformed(e)))?;
                check_item(&col.ty, item.body, item.container, path)?;
                path.pop();
            }
            if !it.done() {
                return Err(fail(path, ty, CheckFailure::ExtraField));
            }
            Ok(())
        }
        TypeKind::Array(inner) => {
            let mut it = Iter::new(body);
            let mut i = 0usize;
            while !it.done() {
                path.push(i.to_string());
                let item = it.next_item().map_err(|e| fail(path, inner, CheckFailure::Malformed(e)))?;
                check_item(inner, item.body, item.container, path)?;
                path.pop();
                i += 1;
            }
            Ok(())
        }
        TypeKind::Set(inner) => {
            let mut it = Iter::new(body);
            let mut prev: Option<&[u8]> = None;
            let mut i = 0usize;
            while !it.done() {
                path.push(i.to_string());
                let tagged = it.next_tag_and_body().map_err(|e| fail(path, inner, CheckFailure::Malformed(e)))?;
                if prev.is_some_and(|p| p >= tagged) {
                    return Err(fail(path, ty, CheckFailure::SetOrder));
                }
                let item = Iter::new(tagged).next_item().map_err(|e| fail(path, inner, CheckFailure::Malformed(e)))?;
                check_item(inner, item.body, item.container, path)?;
                prev = Some(tagged);
                path.pop();
                i += 1;
            }
            Ok(())
        }
        TypeKind::Map(m) => {
            let mut it = Iter::new(body);
            let mut prev: Option<&[u8]> = None;
            while !it.done() {
                let key = it.next_tag_and_body().map_err(|e| fail(path, &m.key, CheckFailure::Malformed(e)))?;
                if it.done() {
                    return Err(fail(path, ty, CheckFailure::Malformed(zcode::Error::OddMapEntries)));
                }
                match prev.map(|p| p.cmp(key)) {
                    Some(std::cmp::Ordering::Equal) => {
                        return Err(fail(path, ty, CheckFailure::DuplicateMapKey));
                    }
                    Some(std::cmp::Ordering::Greater) => {
                        return Err(fail(path, ty, CheckFailure::MapOrder));
                    }
                    _ => {}
                }
                let k = Iter::new(key).next_item().map_err(|e| fail(path, &m.key, CheckFailure::Malformed(e)))?;
                check_item(&m.key, k.body, k.container, path)?;
                let v = it.next_item().map_err(|e| fail(path, &m.val, CheckFailure::Malformed(e)))?;
                check_item(&m.val, v.body, v.container, path)?;
                prev = Some(key);
            }
            Ok(())
        }
        TypeKind::Union(u) => {
            let mut it = Iter::new(body);
            let sel = it.next_item().map_err(|e| fail(path, ty, CheckFailure::Malformed(e)))?;
            let sel = codec::decode_int(sel.body.unwrap_or_default()).map_err(|e| fail(path, ty, CheckFailure::Malformed(e)))?;
            let member = u
                .type_of(sel)
                .ok_or_else(|| fail(path, ty, CheckFailure::UnionSelector(sel)))?;
            if it.done() {
                return Err(fail(path, ty, CheckFailure::MissingField));
            }
            let val = it.next_item().map_err(|e| fail(path, member, CheckFailure::Malformed(e)))?;
            check_item(member, val.body, val.container, path)?;
            if !it.done() {
                return Err(fail(path, ty, CheckFailure::ExtraField));
            }
            Ok(())
        }
    }
}
