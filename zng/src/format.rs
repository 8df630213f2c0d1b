//! Text formatting of values.
//!
//! | Kind      | Form                          |
//! |-----------|-------------------------------|
//! | record    | `{a:1,b:"x"}`                 |
//! | array     | `[1,2]`                       |
//! | set       | `\|["a","b"]\|`               |
//! | map       | `\|{"k":1}\|`                 |
//! | union     | the member value              |
//! | enum      | the symbol                    |
//! | type      | `<{a:int64}>`                 |
//! | error     | `error("message")`            |
//! | unset     | `null`                        |
//!
//! A primitive whose type cannot be inferred from its text carries a
//! `(type)` decorator, e.g. `80(port)`. Values of an alias type are
//! decorated with the alias name, and unset values with their type.
use std::fmt::{self, Write as _};

use zcode::{Iter, codec};

use crate::{
    ValueRef, nano,
    types::{Primitive, Type, TypeKind},
    typevalue::format_type_value,
};

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Write a field name or symbol, quoting it unless it is an identifier.
pub fn write_name<W: fmt::Write>(w: &mut W, name: &str) -> fmt::Result {
    if is_ident(name) {
        w.write_str(name)
    } else {
        write_quoted(w, name)
    }
}

fn write_escaped_char<W: fmt::Write>(w: &mut W, c: char) -> fmt::Result {
    match c {
        '"' => w.write_str("\\\""),
        '\\' => w.write_str("\\\\"),
        '\n' => w.write_str("\\n"),
        '\r' => w.write_str("\\r"),
        '\t' => w.write_str("\\t"),
        c if (c as u32) < 0x20 => write!(w, "\\u{:04x}", c as u32),
        c => w.write_char(c),
    }
}

pub fn write_quoted<W: fmt::Write>(w: &mut W, s: &str) -> fmt::Result {
    w.write_char('"')?;
    for c in s.chars() {
        write_escaped_char(w, c)?;
    }
    w.write_char('"')
}

/// Quote bytes that are mostly text; invalid UTF-8 is written as `\xNN`.
pub fn write_quoted_bytes<W: fmt::Write>(w: &mut W, b: &[u8]) -> fmt::Result {
    w.write_char('"')?;
    for chunk in b.utf8_chunks() {
        for c in chunk.valid().chars() {
            write_escaped_char(w, c)?;
        }
        for byte in chunk.invalid() {
            write!(w, "\\x{byte:02x}")?;
        }
    }
    w.write_char('"')
}

/// Shortest text that reads back as the same float. Integral values keep a
/// trailing `.` so they are not mistaken for integers.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return String::from("NaN");
    }
    if v.is_infinite() {
        return String::from(if v > 0.0 { "+Inf" } else { "-Inf" });
    }
    if v.fract() == 0.0 && v.abs() < 1e16 {
        return format!("{v:.0}.");
    }
    format!("{v:?}")
}

pub fn format_bytes(b: &[u8]) -> String {
    let mut out = String::with_capacity(2 + 2 * b.len());
    out.push_str("0x");
    for byte in b {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn write_primitive(f: &mut fmt::Formatter<'_>, p: Primitive, body: &[u8]) -> Result<(), String> {
    let e = |e: zcode::Error| e.to_string();
    let r = match p {
        Primitive::Bool => write!(f, "{}", codec::decode_bool(body).map_err(e)?),
        Primitive::Int8
        | Primitive::Int16
        | Primitive::Int32
        | Primitive::Int64 => write!(f, "{}", codec::decode_int(body).map_err(e)?),
        Primitive::Uint8
        | Primitive::Uint16
        | Primitive::Uint32
        | Primitive::Uint64
        | Primitive::Port
        | Primitive::Enum => write!(f, "{}", codec::decode_uint(body).map_err(e)?),
        Primitive::Float64 => f.write_str(&format_float(codec::decode_float64(body).map_err(e)?)),
        Primitive::Bytes => f.write_str(&format_bytes(body)),
        Primitive::String => write_quoted(f, codec::decode_string(body).map_err(e)?),
        Primitive::Bstring => write_quoted_bytes(f, body),
        Primitive::Ip => write!(f, "{}", codec::decode_ip(body).map_err(e)?),
        Primitive::Net => write!(f, "{}", codec::decode_net(body).map_err(e)?),
        Primitive::Time => f.write_str(&nano::format_time(codec::decode_time(body).map_err(e)?)),
        Primitive::Duration => f.write_str(&nano::format_duration(codec::decode_duration(body).map_err(e)?)),
        Primitive::Null => f.write_str("null"),
        Primitive::Type => {
            let text = format_type_value(body).map_err(|e| e.to_string())?;
            write!(f, "<{text}>")
        }
        Primitive::Error => write_error(f, body),
    };
    r.map_err(|_| String::from("formatter error"))
}

fn write_error(f: &mut fmt::Formatter<'_>, body: &[u8]) -> fmt::Result {
    f.write_str("error(")?;
    write_quoted_bytes(f, body)?;
    f.write_str(")")
}

fn write_items(f: &mut fmt::Formatter<'_>, body: &[u8], inner: &Type) -> Result<(), String> {
    let mut it = Iter::new(body);
    let mut first = true;
    while !it.done() {
        let item = it.next_item().map_err(|e| e.to_string())?;
        if !first {
            f.write_str(",").map_err(|e| e.to_string())?;
        }
        first = false;
        write_value(f, inner, item.body)?;
    }
    Ok(())
}

fn write_body(f: &mut fmt::Formatter<'_>, ty: &Type, body: &[u8]) -> Result<(), String> {
    let fe = |_| String::from("formatter error");
    match ty.kind() {
        TypeKind::Primitive(p) => write_primitive(f, *p, body),
        TypeKind::Alias(a) => write_body(f, &a.ty, body),
        TypeKind::Record(rec) => {
            let mut it = Iter::new(body);
            f.write_str("{").map_err(fe)?;
            for (i, col) in rec.columns.iter().enumerate() {
                let item = it.next_item().map_err(|e| e.to_string())?;
                if i > 0 {
                    f.write_str(",").map_err(fe)?;
                }
                write_name(f, &col.name).map_err(fe)?;
                f.write_str(":").map_err(fe)?;
                write_value(f, &col.ty, item.body)?;
            }
            f.write_str("}").map_err(fe)
        }
        TypeKind::Array(inner) => {
            f.write_str("[").map_err(fe)?;
            write_items(f, body, inner)?;
            f.write_str("]").map_err(fe)
        }
        TypeKind::Set(inner) => {
            f.write_str("|[").map_err(fe)?;
            write_items(f, body, inner)?;
            f.write_str("]|").map_err(fe)
        }
        TypeKind::Map(m) => {
            f.write_str("|{").map_err(fe)?;
            let mut it = Iter::new(body);
            let mut first = true;
            while !it.done() {
                let key = it.next_item().map_err(|e| e.to_string())?;
                let val = it.next_item().map_err(|e| e.to_string())?;
                if !first {
                    f.write_str(",").map_err(fe)?;
                }
                first = false;
                write_value(f, &m.key, key.body)?;
                f.write_str(":").map_err(fe)?;
                write_value(f, &m.val, val.body)?;
            }
            f.write_str("}|").map_err(fe)
        }
        TypeKind::Union(u) => {
            let mut it = Iter::new(body);
            let sel = it.next_item().map_err(|e| e.to_string())?;
            let sel = codec::decode_int(sel.body.unwrap_or_default()).map_err(|e| e.to_string())?;
            let member = u
                .type_of(sel)
                .ok_or_else(|| format!("union selector {sel} out of range"))?;
            let val = it.next_item().map_err(|e| e.to_string())?;
            write_value(f, member, val.body)
        }
        TypeKind::Enum(e) => {
            let idx = codec::decode_uint(body).map_err(|e| e.to_string())?;
            let sym = e
                .symbol(idx)
                .ok_or_else(|| format!("enum index {idx} out of range"))?;
            write_name(f, sym).map_err(fe)
        }
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, ty: &Type, bytes: Option<&[u8]>) -> Result<(), String> {
    let fe = |_| String::from("formatter error");
    let Some(body) = bytes else {
        f.write_str("null").map_err(fe)?;
        if !matches!(ty.kind(), TypeKind::Primitive(Primitive::Null)) {
            write!(f, "({ty})").map_err(fe)?;
        }
        return Ok(());
    };
    write_body(f, ty, body)?;
    match ty.kind() {
        TypeKind::Alias(a) => {
            f.write_str("(").map_err(fe)?;
            write_name(f, &a.name).map_err(fe)?;
            f.write_str(")").map_err(fe)
        }
        TypeKind::Primitive(p) if !p.is_implied() => write!(f, "({p})").map_err(fe),
        _ => Ok(()),
    }
}

impl fmt::Display for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Malformed bodies are rendered inline rather than failing the
        // formatter, which would panic inside `to_string`.
        if let Err(reason) = write_value(f, self.ty, self.bytes) {
            write!(f, "<malformed: {reason}>")?;
        }
        Ok(())
    }
}

/// Displays a value without its outer type decorator, so `1(int32)` reads
/// `1` and `80(port)` reads `80`. Nested values keep their decorators.
pub struct Plain<'a>(pub ValueRef<'a>);

impl fmt::Display for Plain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let res = match self.0.bytes {
            Some(body) => write_body(f, self.0.ty, body),
            None => f.write_str("null").map_err(|_| String::from("formatter error")),
        };
        if let Err(reason) = res {
            write!(f, "<malformed: {reason}>")?;
        }
        Ok(())
    }
}

impl fmt::Display for crate::Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.view(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TypeContext, Value, types::Column};

    fn prim(p: Primitive) -> Type {
        Type::primitive(p)
    }

    #[test]
    fn primitives() {
        assert_eq!(Value::int64(-3).to_string(), "-3");
        assert_eq!(Value::int(Primitive::Int8, 3).to_string(), "3(int8)");
        assert_eq!(Value::uint(Primitive::Port, 80).to_string(), "80(port)");
        assert_eq!(Value::float64(1.0).to_string(), "1.");
        assert_eq!(Value::float64(2.5).to_string(), "2.5");
        assert_eq!(Value::float64(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::float64(f64::NEG_INFINITY).to_string(), "-Inf");
        assert_eq!(Value::string("a\"b\n").to_string(), r#""a\"b\n""#);
        assert_eq!(Value::bstring(&[b'a', 0xff]).to_string(), r#""a\xff"(bstring)"#);
        assert_eq!(Value::bytes(&[0xde, 0xad]).to_string(), "0xdead");
        assert_eq!(Value::ip("10.0.0.1".parse().unwrap()).to_string(), "10.0.0.1");
        assert_eq!(Value::duration(1_500_000).to_string(), "1.5ms");
        assert_eq!(Value::time(0).to_string(), "1970-01-01T00:00:00Z");
        assert_eq!(Value::error("boom").to_string(), r#"error("boom")"#);
        assert_eq!(Value::null().to_string(), "null");
        assert_eq!(Value::unset(prim(Primitive::Int32)).to_string(), "null(int32)");
        assert_eq!(Value::bool(false).to_string(), "false");
    }

    #[test]
    fn containers_and_types() {
        let ctx = TypeContext::new();
        let arr = ctx.lookup_type_array(prim(Primitive::Int64));
        let rt = ctx
            .lookup_type_record(vec![
                Column::new("a", prim(Primitive::String)),
                Column::new("arr", arr.clone()),
                Column::new("two words", prim(Primitive::Bool)),
            ])
            .unwrap();
        let mut b = zcode::Builder::new();
        b.append_primitive(Some(b"x"));
        b.begin_container();
        b.append_primitive(Some(&codec::encode_int(1)));
        b.append_primitive(Some(&codec::encode_int(2)));
        b.end_container();
        b.append_primitive(None);
        let rec = Value::new(rt.clone(), Some(b.into_bytes()));
        assert_eq!(rec.to_string(), r#"{a:"x",arr:[1,2],"two words":null(bool)}"#);
        assert_eq!(Value::type_value(&rt).to_string(), r#"<{a:string,arr:[int64],"two words":bool}>"#);
        assert_eq!(Value::unset(arr).to_string(), "null([int64])");
    }

    #[test]
    fn union_enum_map_and_alias() {
        let ctx = TypeContext::new();
        let u = ctx.lookup_type_union(vec![prim(Primitive::Int64), prim(Primitive::String)]);
        let mut body = Vec::new();
        zcode::append(&mut body, Some(&codec::encode_int(1)), false);
        zcode::append(&mut body, Some(b"hi"), false);
        assert_eq!(Value::new(u, Some(body)).to_string(), r#""hi""#);

        let e = ctx.lookup_type_enum(vec!["lo".into(), "hi".into()]);
        assert_eq!(Value::new(e, Some(codec::encode_uint(1).to_vec())).to_string(), "hi");

        let m = ctx.lookup_type_map(prim(Primitive::String), prim(Primitive::Int64));
        let mut body = Vec::new();
        zcode::append(&mut body, Some(b"k"), false);
        zcode::append(&mut body, Some(&codec::encode_int(1)), false);
        assert_eq!(Value::new(m, Some(body)).to_string(), r#"|{"k":1}|"#);

        let port = ctx.lookup_type_alias("port", prim(Primitive::Uint16)).unwrap();
        assert_eq!(Value::new(port, Some(codec::encode_uint(443).to_vec())).to_string(), "443(port)");
    }

    #[test]
    fn plain_drops_the_outer_decorator() {
        let v = Value::uint(Primitive::Port, 80);
        assert_eq!(v.to_string(), "80(port)");
        assert_eq!(Plain(v.view()).to_string(), "80");
        assert_eq!(Plain(Value::string("a").view()).to_string(), r#""a""#);
        assert_eq!(Plain(Value::unset(prim(Primitive::Int8)).view()).to_string(), "null");
    }

    #[test]
    fn malformed_is_rendered_not_panicking() {
        let v = Value::new(prim(Primitive::Float64), Some(vec![1, 2]));
        assert!(v.to_string().starts_with("<malformed"));
    }
}
