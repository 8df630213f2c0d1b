//! Parsing primitive values from text.
use std::net::IpAddr;

use zcode::codec::{self, Net};

use crate::{
    Error, Result, Value, nano,
    types::{Primitive, Type},
};

fn parse_err(ty: &Type, text: &str, reason: impl Into<String>) -> Error {
    Error::Parse {
        ty: ty.to_string(),
        text: text.to_string(),
        reason: reason.into(),
    }
}

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits = text.strip_prefix("0x")?;
    if digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok())
        .collect()
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        "+Inf" | "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => text.parse().ok(),
    }
}

/// Parse the body of primitive `p` from its text form.
pub fn parse_primitive_body(p: Primitive, text: &str) -> std::result::Result<Vec<u8>, String> {
    let body = match p {
        Primitive::Bool => match text {
            "true" => codec::encode_bool(true).to_vec(),
            "false" => codec::encode_bool(false).to_vec(),
            _ => return Err(String::from("expected true or false")),
        },
        Primitive::Int8 | Primitive::Int16 | Primitive::Int32 | Primitive::Int64 => {
            let v: i64 = text.parse().map_err(|e| format!("{e}"))?;
            let bits = p.int_width().unwrap_or(64);
            let (min, max) = (i64::MIN >> (64 - bits), i64::MAX >> (64 - bits));
            if v < min || v > max {
                return Err(format!("out of range for {p}"));
            }
            codec::encode_int(v).to_vec()
        }
        Primitive::Uint8
        | Primitive::Uint16
        | Primitive::Uint32
        | Primitive::Uint64
        | Primitive::Port
        | Primitive::Enum => {
            let v: u64 = text.parse().map_err(|e| format!("{e}"))?;
            let bits = p.int_width().unwrap_or(64);
            if v > u64::MAX >> (64 - bits) {
                return Err(format!("out of range for {p}"));
            }
            codec::encode_uint(v).to_vec()
        }
        Primitive::Float64 => {
            let v = parse_float(text).ok_or_else(|| String::from("invalid float"))?;
            codec::encode_float64(v).to_vec()
        }
        Primitive::Bytes => parse_hex(text).ok_or_else(|| String::from("expected 0x followed by hex digits"))?,
        Primitive::String => codec::nfc(text).as_bytes().to_vec(),
        Primitive::Bstring | Primitive::Error => text.as_bytes().to_vec(),
        Primitive::Ip => {
            let ip: IpAddr = text.parse().map_err(|e| format!("{e}"))?;
            codec::encode_ip(ip).to_vec()
        }
        Primitive::Net => {
            let (addr, bits) = text
                .split_once('/')
                .ok_or_else(|| String::from("expected address/prefix"))?;
            let addr: IpAddr = addr.parse().map_err(|e| format!("{e}"))?;
            let bits: u8 = bits.parse().map_err(|e| format!("{e}"))?;
            let net = Net::from_prefix(addr, bits).ok_or_else(|| String::from("prefix length out of range"))?;
            codec::encode_net(&net).to_vec()
        }
        Primitive::Time => codec::encode_time(nano::parse_time(text)?).to_vec(),
        Primitive::Duration => codec::encode_duration(nano::parse_duration(text)?).to_vec(),
        Primitive::Null => {
            return Err(String::from("null has no set values"));
        }
        Primitive::Type => return Err(String::from("type values have no primitive text form")),
    };
    Ok(body)
}

/// Parse `text` as a value of primitive type `ty` (or an alias of one).
pub fn parse_primitive(ty: &Type, text: &str) -> Result<Value> {
    let p = ty
        .primitive_kind()
        .ok_or_else(|| parse_err(ty, text, "not a primitive type"))?;
    if p == Primitive::Null && text == "null" {
        return Ok(Value::unset(ty.clone()));
    }
    let body = parse_primitive_body(p, text).map_err(|reason| parse_err(ty, text, reason))?;
    Ok(Value::new(ty.clone(), Some(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeContext;

    fn parse(p: Primitive, text: &str) -> Result<Value> {
        parse_primitive(&Type::primitive(p), text)
    }

    #[test]
    fn integers_are_range_checked() {
        assert_eq!(parse(Primitive::Int8, "127").unwrap().as_int(), Some(127));
        assert_eq!(parse(Primitive::Int8, "-128").unwrap().as_int(), Some(-128));
        assert!(parse(Primitive::Int8, "128").unwrap_err().is_parse());
        assert!(parse(Primitive::Uint16, "65536").is_err());
        assert_eq!(parse(Primitive::Port, "443").unwrap().as_uint(), Some(443));
        assert!(parse(Primitive::Uint8, "-1").is_err());
        assert_eq!(parse(Primitive::Uint64, "18446744073709551615").unwrap().as_uint(), Some(u64::MAX));
    }

    #[test]
    fn text_forms_reparse() {
        for (p, text) in [
            (Primitive::Float64, "2.5"),
            (Primitive::Bool, "true"),
            (Primitive::Bytes, "0x00ff"),
            (Primitive::Ip, "fe80::1"),
            (Primitive::Net, "10.0.0.0/8"),
            (Primitive::Time, "2024-05-06T07:08:09.500Z"),
            (Primitive::Duration, "1h2m3s"),
            (Primitive::Int64, "-42"),
        ] {
            assert_eq!(parse(p, text).unwrap().to_string(), text, "{p}");
        }
        assert_eq!(parse(Primitive::Float64, "-Inf").unwrap().to_string(), "-Inf");
        assert_eq!(parse(Primitive::Float64, "3").unwrap().to_string(), "3.");
    }

    #[test]
    fn strings_and_failures() {
        assert_eq!(parse(Primitive::String, "e\u{301}").unwrap().as_str(), Some("\u{e9}"));
        assert_eq!(parse(Primitive::Bstring, "e\u{301}").unwrap().bytes.unwrap().len(), 3);
        assert!(parse(Primitive::Ip, "10.0.0").is_err());
        assert!(parse(Primitive::Net, "10.0.0.0/33").is_err());
        assert!(parse(Primitive::Bytes, "0xabc").is_err());
        assert!(parse(Primitive::Time, "not a time").is_err());
        assert!(parse(Primitive::Null, "null").unwrap().is_unset());
    }

    #[test]
    fn aliases_parse_their_underlying_primitive() {
        let ctx = TypeContext::new();
        let port = ctx.lookup_type_alias("port", Type::primitive(Primitive::Uint16)).unwrap();
        let v = parse_primitive(&port, "8080").unwrap();
        assert_eq!(v.ty, port);
        assert_eq!(v.to_string(), "8080(port)");
        let arr = ctx.lookup_type_array(port);
        assert!(parse_primitive(&arr, "1").is_err());
    }
}
