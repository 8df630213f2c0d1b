//! Field, element and key access on container values.
//!
//! Accessors return `Ok(None)` when the thing asked for is absent (an
//! unknown field, an out-of-range index, an unset container) and `Err` when
//! the value is of the wrong kind or its body is malformed.
use std::net::IpAddr;

use zcode::{Iter, codec};

use crate::{Error, Path, Result, Value, ValueRef, types::Primitive};

/// A value whose type is a record.
pub type Record = Value;

impl<'a> ValueRef<'a> {
    fn not_a_record(&self) -> Error {
        Error::NotARecord {
            ty: self.ty.to_string(),
        }
    }

    /// The column called `name`.
    pub fn value_by_field(&self, name: &str) -> Result<Option<ValueRef<'a>>> {
        let rec = self.ty.record().ok_or_else(|| self.not_a_record())?;
        let Some(col) = rec.column_of_field(name) else {
            return Ok(None);
        };
        let Some(body) = self.bytes else {
            return Ok(None);
        };
        let item = Iter::new(body).nth_item(col)?;
        Ok(item.map(|item| ValueRef::new(&rec.columns[col].ty, item.body)))
    }

    /// Follow `path` through nested records.
    pub fn deref(&self, path: &Path) -> Result<Option<ValueRef<'a>>> {
        let mut cur = *self;
        for name in path.names() {
            match cur.value_by_field(name)? {
                Some(v) => cur = v,
                None => return Ok(None),
            }
        }
        Ok(Some(cur))
    }

    /// Element `i` of an array or set.
    pub fn index(&self, i: usize) -> Result<Option<ValueRef<'a>>> {
        let inner = self.ty.inner().ok_or_else(|| Error::TypeMismatch {
            path: String::from("this"),
            expected: String::from("array or set"),
            found: self.ty.to_string(),
        })?;
        let Some(body) = self.bytes else {
            return Ok(None);
        };
        let item = Iter::new(body).nth_item(i)?;
        Ok(item.map(|item| ValueRef::new(inner, item.body)))
    }

    /// The elements of an array or set. An unset container has none.
    pub fn elements(&self) -> Result<Vec<ValueRef<'a>>> {
        let inner = self.ty.inner().ok_or_else(|| Error::TypeMismatch {
            path: String::from("this"),
            expected: String::from("array or set"),
            found: self.ty.to_string(),
        })?;
        let mut out = Vec::new();
        for item in Iter::new(self.bytes.unwrap_or_default()) {
            out.push(ValueRef::new(inner, item?.body));
        }
        Ok(out)
    }

    /// Key-value pairs of a map.
    pub fn entries(&self) -> Result<Vec<(ValueRef<'a>, ValueRef<'a>)>> {
        let m = self.ty.map().ok_or_else(|| Error::TypeMismatch {
            path: String::from("this"),
            expected: String::from("map"),
            found: self.ty.to_string(),
        })?;
        let mut out = Vec::new();
        let mut it = Iter::new(self.bytes.unwrap_or_default());
        while !it.done() {
            let k = it.next_item()?;
            if it.done() {
                return Err(zcode::Error::OddMapEntries.into());
            }
            let v = it.next_item()?;
            out.push((ValueRef::new(&m.key, k.body), ValueRef::new(&m.val, v.body)));
        }
        Ok(out)
    }

    /// Look up `key` in a map by linear scan. The key must have the map's
    /// key type.
    pub fn map_get(&self, key: ValueRef<'_>) -> Result<Option<ValueRef<'a>>> {
        let m = self.ty.map().ok_or_else(|| Error::TypeMismatch {
            path: String::from("this"),
            expected: String::from("map"),
            found: self.ty.to_string(),
        })?;
        if &m.key != key.ty {
            return Err(Error::TypeMismatch {
                path: String::from("key"),
                expected: m.key.to_string(),
                found: key.ty.to_string(),
            });
        }
        Ok(self
            .entries()?
            .into_iter()
            .find(|(k, _)| k.bytes == key.bytes)
            .map(|(_, v)| v))
    }

    /// The member value carried by a union, with its selector.
    pub fn union_value(&self) -> Result<Option<(usize, ValueRef<'a>)>> {
        let u = self.ty.union().ok_or_else(|| Error::TypeMismatch {
            path: String::from("this"),
            expected: String::from("union"),
            found: self.ty.to_string(),
        })?;
        let Some(body) = self.bytes else {
            return Ok(None);
        };
        let mut it = Iter::new(body);
        let sel = it.next_item()?;
        let sel = codec::decode_int(sel.body.unwrap_or_default())?;
        let ty = u.type_of(sel).ok_or_else(|| Error::BadTypeValue {
            reason: format!("union selector {sel} out of range"),
        })?;
        let val = it.next_item()?;
        Ok(Some((sel as usize, ValueRef::new(ty, val.body))))
    }

    /// Symbol of an enum value.
    pub fn enum_symbol(&self) -> Result<Option<&'a str>> {
        let e = self.ty.enumeration().ok_or_else(|| Error::TypeMismatch {
            path: String::from("this"),
            expected: String::from("enum"),
            found: self.ty.to_string(),
        })?;
        let Some(body) = self.bytes else {
            return Ok(None);
        };
        let idx = codec::decode_uint(body)?;
        Ok(e.symbol(idx))
    }

    fn access(&self, field: &str, p: Primitive) -> Result<ValueRef<'a>> {
        let path = Path::parse(field);
        let v = self
            .deref(&path)?
            .ok_or_else(|| Error::FieldNotFound { path: path.to_string() })?;
        if v.ty.primitive_kind() != Some(p) {
            return Err(Error::TypeMismatch {
                path: path.to_string(),
                expected: p.to_string(),
                found: v.ty.to_string(),
            });
        }
        Ok(v)
    }

    fn unset_field(field: &str) -> Error {
        Error::FieldNotFound {
            path: format!("{field} (unset)"),
        }
    }

    pub fn access_int(&self, field: &str) -> Result<i64> {
        let v = self.access(field, Primitive::Int64)?;
        let body = v.bytes.ok_or_else(|| Self::unset_field(field))?;
        Ok(codec::decode_int(body)?)
    }

    pub fn access_string(&self, field: &str) -> Result<&'a str> {
        let v = self.access(field, Primitive::String)?;
        let body = v.bytes.ok_or_else(|| Self::unset_field(field))?;
        Ok(codec::decode_string(body)?)
    }

    pub fn access_bool(&self, field: &str) -> Result<bool> {
        let v = self.access(field, Primitive::Bool)?;
        let body = v.bytes.ok_or_else(|| Self::unset_field(field))?;
        Ok(codec::decode_bool(body)?)
    }

    pub fn access_time(&self, field: &str) -> Result<i64> {
        let v = self.access(field, Primitive::Time)?;
        let body = v.bytes.ok_or_else(|| Self::unset_field(field))?;
        Ok(codec::decode_time(body)?)
    }

    pub fn access_ip(&self, field: &str) -> Result<IpAddr> {
        let v = self.access(field, Primitive::Ip)?;
        let body = v.bytes.ok_or_else(|| Self::unset_field(field))?;
        Ok(codec::decode_ip(body)?)
    }
}

impl Value {
    pub fn value_by_field(&self, name: &str) -> Result<Option<ValueRef<'_>>> {
        self.view().value_by_field(name)
    }

    pub fn deref(&self, path: &Path) -> Result<Option<ValueRef<'_>>> {
        self.view().deref(path)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.ty.record().is_some_and(|r| r.has_field(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        TypeContext,
        types::{Column, Type},
    };

    fn nested(ctx: &TypeContext) -> Value {
        let int64 = Type::primitive(Primitive::Int64);
        let inner = ctx
            .lookup_type_record(vec![
                Column::new("c", int64.clone()),
                Column::new("s", Type::primitive(Primitive::String)),
            ])
            .unwrap();
        let outer = ctx
            .lookup_type_record(vec![Column::new("a", int64), Column::new("b", inner)])
            .unwrap();
        let mut b = zcode::Builder::new();
        b.append_primitive(Some(&codec::encode_int(1)));
        b.begin_container();
        b.append_primitive(Some(&codec::encode_int(2)));
        b.append_primitive(Some(b"hi"));
        b.end_container();
        Value::new(outer, Some(b.into_bytes()))
    }

    #[test]
    fn deref_paths() {
        let ctx = TypeContext::new();
        let r = nested(&ctx);
        assert_eq!(r.deref(&Path::parse("b.c")).unwrap().unwrap().to_string(), "2");
        assert!(r.deref(&Path::parse("b.z")).unwrap().is_none());
        assert!(r.deref(&Path::parse("a.z")).unwrap_err().is_not_a_record());
        assert_eq!(r.deref(&Path::this()).unwrap().unwrap().ty, &r.ty);
        assert!(r.has_field("b"));
        assert!(!r.has_field("c"));
    }

    #[test]
    fn typed_accessors() {
        let ctx = TypeContext::new();
        let r = nested(&ctx);
        let v = r.view();
        assert_eq!(v.access_int("a").unwrap(), 1);
        assert_eq!(v.access_string("b.s").unwrap(), "hi");
        assert!(v.access_bool("a").unwrap_err().is_type_mismatch());
        assert!(v.access_ip("nope").unwrap_err().is_field_not_found());
    }

    #[test]
    fn unset_record_has_no_fields() {
        let ctx = TypeContext::new();
        let r = nested(&ctx);
        let unset = Value::unset(r.ty.clone());
        assert!(unset.value_by_field("a").unwrap().is_none());
    }

    #[test]
    fn arrays_maps_unions_enums() {
        let ctx = TypeContext::new();
        let int64 = Type::primitive(Primitive::Int64);
        let string = Type::primitive(Primitive::String);

        let arr = ctx.lookup_type_array(int64.clone());
        let mut body = Vec::new();
        for i in [10, 20] {
            zcode::append(&mut body, Some(&codec::encode_int(i)), false);
        }
        let a = Value::new(arr, Some(body));
        assert_eq!(a.view().index(1).unwrap().unwrap().to_string(), "20");
        assert!(a.view().index(2).unwrap().is_none());
        assert_eq!(a.view().elements().unwrap().len(), 2);

        let m = ctx.lookup_type_map(string.clone(), int64.clone());
        let mut body = Vec::new();
        zcode::append(&mut body, Some(b"k"), false);
        zcode::append(&mut body, Some(&codec::encode_int(7)), false);
        let m = Value::new(m, Some(body));
        let key = Value::string("k");
        assert_eq!(m.view().map_get(key.view()).unwrap().unwrap().to_string(), "7");
        assert!(m.view().map_get(Value::string("x").view()).unwrap().is_none());
        assert!(m.view().map_get(Value::int64(1).view()).unwrap_err().is_type_mismatch());

        let u = ctx.lookup_type_union(vec![int64, string]);
        let mut body = Vec::new();
        zcode::append(&mut body, Some(&codec::encode_int(1)), false);
        zcode::append(&mut body, Some(b"hi"), false);
        let u = Value::new(u, Some(body));
        let (sel, inner) = u.view().union_value().unwrap().unwrap();
        assert_eq!(sel, 1);
        assert_eq!(inner.as_str(), Some("hi"));

        let e = ctx.lookup_type_enum(vec!["lo".into(), "hi".into()]);
        let e = Value::new(e, Some(codec::encode_uint(0).to_vec()));
        assert_eq!(e.view().enum_symbol().unwrap(), Some("lo"));
    }
}
