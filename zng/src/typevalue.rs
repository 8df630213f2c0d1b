//! Type values: the self-describing binary encoding of a type.
//!
//! A type value is a depth-first byte stream. The first byte of every node
//! selects its shape:
//!
//! | Byte             | Shape                                   |
//! |------------------|-----------------------------------------|
//! | `0..ID_TYPEDEF`  | primitive by ID                         |
//! | `ID_TYPEDEF`     | alias definition: `name, tv`            |
//! | `ID_TYPENAME`    | alias defined earlier in this value     |
//! | `ID_TYPE_RECORD` | `n, (name, tv) * n`                     |
//! | `ID_TYPE_ARRAY`  | `tv`                                    |
//! | `ID_TYPE_SET`    | `tv`                                    |
//! | `ID_TYPE_UNION`  | `n, tv * n`                             |
//! | `ID_TYPE_ENUM`   | `n, symbol * n`                         |
//! | `ID_TYPE_MAP`    | `key_tv, val_tv`                        |
//!
//! Counts are unsigned varints; names and symbols are varint
//! length-prefixed UTF-8.
use std::{
    collections::{HashMap, HashSet},
    fmt::Write as _,
};

use zcode::varint;

use crate::{
    Error, Result,
    format::write_name,
    types::{Primitive, Type, TypeKind},
};

pub const ID_TYPEDEF: u8 = 23;
pub const ID_TYPENAME: u8 = 24;
pub const ID_TYPE_RECORD: u8 = 25;
pub const ID_TYPE_ARRAY: u8 = 26;
pub const ID_TYPE_SET: u8 = 27;
pub const ID_TYPE_UNION: u8 = 28;
pub const ID_TYPE_ENUM: u8 = 29;
pub const ID_TYPE_MAP: u8 = 30;

/// Deepest nesting accepted when decoding a type value.
pub const MAX_DEPTH: usize = 512;

pub(crate) type Typedefs = HashMap<String, Type>;

/// Type value of a single type.
pub fn encode(ty: &Type) -> Vec<u8> {
    let mut out = Vec::new();
    append_type(&mut out, ty, &mut Typedefs::new());
    out
}

/// Type value of a node that has not been interned yet.
pub(crate) fn encode_kind(kind: &TypeKind) -> Vec<u8> {
    let mut out = Vec::new();
    append_kind(&mut out, kind, &mut Typedefs::new());
    out
}

pub(crate) fn append_type(dst: &mut Vec<u8>, ty: &Type, typedefs: &mut Typedefs) {
    append_kind(dst, ty.kind(), typedefs)
}

fn append_kind(dst: &mut Vec<u8>, kind: &TypeKind, typedefs: &mut Typedefs) {
    match kind {
        TypeKind::Primitive(p) => dst.push(p.id()),
        TypeKind::Alias(alias) => {
            if typedefs.get(&alias.name) == Some(&alias.ty) {
                dst.push(ID_TYPENAME);
                append_name(dst, &alias.name);
                return;
            }
            typedefs.insert(alias.name.clone(), alias.ty.clone());
            dst.push(ID_TYPEDEF);
            append_name(dst, &alias.name);
            append_type(dst, &alias.ty, typedefs);
        }
        TypeKind::Record(rec) => {
            dst.push(ID_TYPE_RECORD);
            varint::append_uvarint(dst, rec.columns.len() as u64);
            for col in &rec.columns {
                append_name(dst, &col.name);
                append_type(dst, &col.ty, typedefs);
            }
        }
        TypeKind::Array(inner) => {
            dst.push(ID_TYPE_ARRAY);
            append_type(dst, inner, typedefs);
        }
        TypeKind::Set(inner) => {
            dst.push(ID_TYPE_SET);
            append_type(dst, inner, typedefs);
        }
        TypeKind::Union(u) => {
            dst.push(ID_TYPE_UNION);
            varint::append_uvarint(dst, u.types.len() as u64);
            for t in &u.types {
                append_type(dst, t, typedefs);
            }
        }
        TypeKind::Enum(e) => {
            dst.push(ID_TYPE_ENUM);
            varint::append_uvarint(dst, e.symbols.len() as u64);
            for s in &e.symbols {
                append_name(dst, s);
            }
        }
        TypeKind::Map(m) => {
            dst.push(ID_TYPE_MAP);
            append_type(dst, &m.key, typedefs);
            append_type(dst, &m.val, typedefs);
        }
    }
}

pub(crate) fn append_name(dst: &mut Vec<u8>, name: &str) {
    varint::append_uvarint(dst, name.len() as u64);
    dst.extend_from_slice(name.as_bytes());
}

/// Read a length-prefixed name off the front of `tv`.
pub(crate) fn read_name<'a>(tv: &mut &'a [u8]) -> Result<&'a str> {
    let len = varint::read_uvarint(tv)?;
    let len = usize::try_from(len)
        .ok()
        .filter(|len| *len <= tv.len())
        .ok_or_else(|| bad("name runs past the end of the type value"))?;
    let (name, rest) = tv.split_at(len);
    *tv = rest;
    std::str::from_utf8(name).map_err(|_| bad("name is not valid UTF-8"))
}

pub(crate) fn read_byte(tv: &mut &[u8]) -> Result<u8> {
    let (&b, rest) = tv
        .split_first()
        .ok_or_else(|| bad("truncated type value"))?;
    *tv = rest;
    Ok(b)
}

pub(crate) fn bad(reason: &str) -> Error {
    Error::BadTypeValue {
        reason: reason.to_string(),
    }
}

/// Render a type value as text without interning it, as [`Type`]'s
/// `Display` would.
pub fn format_type_value(tv: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut rest = tv;
    let mut defined = HashSet::new();
    format_node(&mut rest, &mut out, &mut defined, 0)?;
    if !rest.is_empty() {
        return Err(bad("trailing bytes after type value"));
    }
    Ok(out)
}

struct NameFmt<'a>(&'a str);

impl std::fmt::Display for NameFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_name(f, self.0)
    }
}

fn format_node(
    tv: &mut &[u8],
    out: &mut String,
    defined: &mut HashSet<String>,
    depth: usize,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(bad("type value nested too deeply"));
    }
    let id = read_byte(tv)?;
    // Writing into a String cannot fail.
    match id {
        ID_TYPEDEF => {
            let name = read_name(tv)?;
            defined.insert(name.to_string());
            let _ = write!(out, "{}=(", NameFmt(name));
            format_node(tv, out, defined, depth + 1)?;
            out.push(')');
        }
        ID_TYPENAME => {
            let name = read_name(tv)?;
            if !defined.contains(name) {
                return Err(bad("reference to undefined alias"));
            }
            let _ = write!(out, "{}", NameFmt(name));
        }
        ID_TYPE_RECORD => {
            let n = varint::read_uvarint(tv)?;
            out.push('{');
            for i in 0..n {
                if i > 0 {
                    out.push(',');
                }
                let name = read_name(tv)?;
                let _ = write!(out, "{}:", NameFmt(name));
                format_node(tv, out, defined, depth + 1)?;
            }
            out.push('}');
        }
        ID_TYPE_ARRAY => {
            out.push('[');
            format_node(tv, out, defined, depth + 1)?;
            out.push(']');
        }
        ID_TYPE_SET => {
            out.push_str("|[");
            format_node(tv, out, defined, depth + 1)?;
            out.push_str("]|");
        }
        ID_TYPE_UNION => {
            let n = varint::read_uvarint(tv)?;
            out.push('(');
            for i in 0..n {
                if i > 0 {
                    out.push(',');
                }
                format_node(tv, out, defined, depth + 1)?;
            }
            out.push(')');
        }
        ID_TYPE_ENUM => {
            let n = varint::read_uvarint(tv)?;
            out.push('<');
            for i in 0..n {
                if i > 0 {
                    out.push(',');
                }
                let sym = read_name(tv)?;
                let _ = write!(out, "{}", NameFmt(sym));
            }
            out.push('>');
        }
        ID_TYPE_MAP => {
            out.push_str("|{");
            format_node(tv, out, defined, depth + 1)?;
            out.push(':');
            format_node(tv, out, defined, depth + 1)?;
            out.push_str("}|");
        }
        id => match Primitive::from_id(id) {
            Some(p) => out.push_str(p.to_str()),
            None => return Err(bad("unknown type ID")),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_type_value_is_its_id() {
        assert_eq!(encode(&Type::primitive(Primitive::String)), vec![11]);
        assert_eq!(format_type_value(&[11]).unwrap(), "string");
        assert!(format_type_value(&[22]).is_err());
        assert!(format_type_value(&[]).is_err());
    }

    #[test]
    fn record_layout() {
        let tv = [ID_TYPE_RECORD, 2, 1, b'a', 5, 1, b'b', ID_TYPE_ARRAY, 11];
        assert_eq!(format_type_value(&tv).unwrap(), "{a:int32,b:[string]}");
    }

    #[test]
    fn alias_reference_requires_definition() {
        let tv = [ID_TYPE_UNION, 2, ID_TYPEDEF, 1, b'p', 4, ID_TYPENAME, 1, b'p'];
        assert_eq!(format_type_value(&tv).unwrap(), "(p=(uint16),p)");
        assert!(format_type_value(&[ID_TYPENAME, 1, b'p']).is_err());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        assert!(format_type_value(&[7, 7]).is_err());
    }
}
