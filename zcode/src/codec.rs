//! Primitive encoders and decoders.
//!
//! Integers are variable width: the body length is carried by the enclosing
//! ZCODE tag, so a body holds only the significant little-endian bytes.
//! Signed values are zigzag-mapped first. Zero encodes as an empty body.
//!
//! | Primitive            | Body                                            |
//! |----------------------|-------------------------------------------------|
//! | int*, time, duration | zigzag, little-endian, leading zeros stripped   |
//! | uint*, port, enum    | little-endian, leading zeros stripped           |
//! | float64              | IEEE-754 little-endian, 8 bytes                 |
//! | bool                 | one byte, 0 or 1                                |
//! | ip                   | 4 bytes (v4) or 16 bytes (v6)                   |
//! | net                  | address followed by mask: 8 or 32 bytes         |
//! | string               | NFC UTF-8                                       |
//! | bytes, bstring       | raw bytes                                       |
use std::{
    borrow::Cow,
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use smallvec::SmallVec;
use unicode_normalization::{UnicodeNormalization, is_nfc};

use crate::{Error, Result};

/// Encoded integer body, at most eight bytes.
pub type IntBuf = SmallVec<[u8; 8]>;

#[inline]
fn zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

#[inline]
fn unzigzag(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}

pub fn encode_uint(v: u64) -> IntBuf {
    let n = 8 - (v.leading_zeros() / 8) as usize;
    SmallVec::from_slice(&v.to_le_bytes()[..n])
}

pub fn append_uint(dst: &mut Vec<u8>, v: u64) {
    dst.extend_from_slice(&encode_uint(v));
}

pub fn decode_uint(body: &[u8]) -> Result<u64> {
    if body.len() > 8 {
        return Err(Error::BadWidth {
            kind: "uint",
            width: body.len(),
        });
    }
    let mut buf = [0u8; 8];
    buf[..body.len()].copy_from_slice(body);
    Ok(u64::from_le_bytes(buf))
}

pub fn encode_int(v: i64) -> IntBuf {
    encode_uint(zigzag(v))
}

pub fn append_int(dst: &mut Vec<u8>, v: i64) {
    dst.extend_from_slice(&encode_int(v));
}

pub fn decode_int(body: &[u8]) -> Result<i64> {
    decode_uint(body)
        .map(unzigzag)
        .map_err(|_| Error::BadWidth {
            kind: "int",
            width: body.len(),
        })
}

pub fn encode_float64(v: f64) -> [u8; 8] {
    v.to_le_bytes()
}

pub fn decode_float64(body: &[u8]) -> Result<f64> {
    let bytes: [u8; 8] = body.try_into().map_err(|_| Error::BadWidth {
        kind: "float64",
        width: body.len(),
    })?;
    Ok(f64::from_le_bytes(bytes))
}

pub fn encode_bool(v: bool) -> [u8; 1] {
    [v as u8]
}

pub fn decode_bool(body: &[u8]) -> Result<bool> {
    match body {
        [b] => Ok(*b != 0),
        _ => Err(Error::BadWidth {
            kind: "bool",
            width: body.len(),
        }),
    }
}

pub fn encode_time(ns: i64) -> IntBuf {
    encode_int(ns)
}

pub fn decode_time(body: &[u8]) -> Result<i64> {
    decode_int(body)
}

pub fn encode_duration(ns: i64) -> IntBuf {
    encode_int(ns)
}

pub fn decode_duration(body: &[u8]) -> Result<i64> {
    decode_int(body)
}

/// Map IPv4-mapped IPv6 addresses back to IPv4.
pub fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => ip,
        },
        v4 => v4,
    }
}

pub fn encode_ip(ip: IpAddr) -> SmallVec<[u8; 16]> {
    match canonical_ip(ip) {
        IpAddr::V4(v4) => SmallVec::from_slice(&v4.octets()),
        IpAddr::V6(v6) => SmallVec::from_slice(&v6.octets()),
    }
}

pub fn decode_ip(body: &[u8]) -> Result<IpAddr> {
    match body.len() {
        4 => {
            let b: [u8; 4] = body.try_into().map_err(|_| bad_ip(body))?;
            Ok(IpAddr::V4(Ipv4Addr::from(b)))
        }
        16 => {
            let b: [u8; 16] = body.try_into().map_err(|_| bad_ip(body))?;
            Ok(IpAddr::V6(Ipv6Addr::from(b)))
        }
        _ => Err(bad_ip(body)),
    }
}

fn bad_ip(body: &[u8]) -> Error {
    Error::BadWidth {
        kind: "ip",
        width: body.len(),
    }
}

/// A CIDR network: an address and a mask of the same family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Net {
    pub addr: IpAddr,
    pub mask: IpAddr,
}

impl Net {
    /// Build the network `addr/bits`, zeroing host bits of `addr`.
    /// Returns `None` if `bits` exceeds the address width.
    pub fn from_prefix(addr: IpAddr, bits: u8) -> Option<Self> {
        match canonical_ip(addr) {
            IpAddr::V4(v4) => {
                if bits > 32 {
                    return None;
                }
                let mask = u32::MAX.checked_shl(32 - bits as u32).unwrap_or(0);
                Some(Self {
                    addr: IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask)),
                    mask: IpAddr::V4(Ipv4Addr::from(mask)),
                })
            }
            IpAddr::V6(v6) => {
                if bits > 128 {
                    return None;
                }
                let mask = u128::MAX.checked_shl(128 - bits as u32).unwrap_or(0);
                Some(Self {
                    addr: IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask)),
                    mask: IpAddr::V6(Ipv6Addr::from(mask)),
                })
            }
        }
    }

    /// Prefix length, if the mask is contiguous.
    pub fn prefix_len(&self) -> Option<u8> {
        let (bits, width) = match self.mask {
            IpAddr::V4(m) => ((u32::from(m) as u128) << 96, 32),
            IpAddr::V6(m) => (u128::from(m), 128),
        };
        let ones = bits.leading_ones();
        if bits.checked_shl(ones).unwrap_or(0) != 0 || ones > width {
            return None;
        }
        Some(ones as u8)
    }

    /// True if `ip` lies within this network. Addresses of the other
    /// family never match.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (canonical_ip(ip), self.addr, self.mask) {
            (IpAddr::V4(ip), IpAddr::V4(net), IpAddr::V4(mask)) => {
                u32::from(ip) & u32::from(mask) == u32::from(net) & u32::from(mask)
            }
            (IpAddr::V6(ip), IpAddr::V6(net), IpAddr::V6(mask)) => {
                u128::from(ip) & u128::from(mask) == u128::from(net) & u128::from(mask)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix_len() {
            Some(bits) => write!(f, "{}/{}", self.addr, bits),
            None => write!(f, "{}/{}", self.addr, self.mask),
        }
    }
}

pub fn encode_net(net: &Net) -> SmallVec<[u8; 32]> {
    let mut out = SmallVec::new();
    match (net.addr, net.mask) {
        (IpAddr::V4(a), IpAddr::V4(m)) => {
            out.extend_from_slice(&a.octets());
            out.extend_from_slice(&m.octets());
        }
        (a, m) => {
            out.extend_from_slice(&to_v6(a).octets());
            out.extend_from_slice(&to_v6(m).octets());
        }
    }
    out
}

fn to_v6(ip: IpAddr) -> Ipv6Addr {
    match ip {
        IpAddr::V4(v4) => v4.to_ipv6_mapped(),
        IpAddr::V6(v6) => v6,
    }
}

pub fn decode_net(body: &[u8]) -> Result<Net> {
    let half = match body.len() {
        8 => 4,
        32 => 16,
        n => {
            return Err(Error::BadWidth {
                kind: "net",
                width: n,
            });
        }
    };
    Ok(Net {
        addr: decode_ip(&body[..half])?,
        mask: decode_ip(&body[half..])?,
    })
}

pub fn decode_string(body: &[u8]) -> Result<&str> {
    std::str::from_utf8(body).map_err(|_| Error::InvalidUtf8)
}

/// NFC-normalize `s`, borrowing when it is already normalized.
pub fn nfc(s: &str) -> Cow<'_, str> {
    if is_nfc(s) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(s.nfc().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_empty() {
        assert!(encode_int(0).is_empty());
        assert!(encode_uint(0).is_empty());
        assert_eq!(decode_int(&[]), Ok(0));
        assert_eq!(decode_uint(&[]), Ok(0));
    }

    #[test]
    fn int_widths_are_minimal() {
        assert_eq!(encode_int(-1).as_slice(), &[1]);
        assert_eq!(encode_int(1).as_slice(), &[2]);
        assert_eq!(encode_int(63).as_slice(), &[126]);
        assert_eq!(encode_int(64).as_slice(), &[128]);
        assert_eq!(encode_int(128).len(), 2);
        assert_eq!(encode_int(i64::MIN).len(), 8);
        assert_eq!(encode_int(i64::MAX).len(), 8);
        assert_eq!(encode_uint(255).as_slice(), &[255]);
        assert_eq!(encode_uint(256).as_slice(), &[0, 1]);
        assert_eq!(encode_uint(u64::MAX).len(), 8);
    }

    #[test]
    fn int_extremes_roundtrip() {
        for v in [i64::MIN, i64::MIN + 1, -300, -1, 0, 1, 300, i64::MAX] {
            assert_eq!(decode_int(&encode_int(v)), Ok(v));
        }
        for v in [0, 1, 255, 256, u32::MAX as u64, u64::MAX] {
            assert_eq!(decode_uint(&encode_uint(v)), Ok(v));
        }
    }

    #[test]
    fn oversized_int_is_rejected() {
        assert!(decode_int(&[0; 9]).unwrap_err().is_bad_width());
        assert!(decode_uint(&[0; 9]).unwrap_err().is_bad_width());
    }

    #[test]
    fn floats_roundtrip_special_values() {
        for v in [0.0, -0.0, 1.5, f64::INFINITY, f64::NEG_INFINITY, f64::MIN_POSITIVE] {
            assert_eq!(decode_float64(&encode_float64(v)).unwrap().to_bits(), v.to_bits());
        }
        assert!(decode_float64(&encode_float64(f64::NAN)).unwrap().is_nan());
        assert!(decode_float64(&[0; 4]).is_err());
    }

    #[test]
    fn bool_codec() {
        assert_eq!(decode_bool(&encode_bool(true)), Ok(true));
        assert_eq!(decode_bool(&encode_bool(false)), Ok(false));
        assert!(decode_bool(&[]).is_err());
    }

    #[test]
    fn ipv4_mapped_is_stored_as_v4() {
        let mapped: IpAddr = "::ffff:10.1.2.3".parse().unwrap();
        assert_eq!(encode_ip(mapped).len(), 4);
        assert_eq!(decode_ip(&encode_ip(mapped)).unwrap(), "10.1.2.3".parse::<IpAddr>().unwrap());
        let v6: IpAddr = "fe80::1".parse().unwrap();
        assert_eq!(encode_ip(v6).len(), 16);
        assert_eq!(decode_ip(&encode_ip(v6)).unwrap(), v6);
        assert!(decode_ip(&[1, 2, 3]).is_err());
    }

    #[test]
    fn net_codec_and_membership() {
        let net = Net::from_prefix("10.9.8.7".parse().unwrap(), 8).unwrap();
        assert_eq!(net.to_string(), "10.0.0.0/8");
        let body = encode_net(&net);
        assert_eq!(body.len(), 8);
        assert_eq!(decode_net(&body).unwrap(), net);
        assert!(net.contains("10.1.1.1".parse().unwrap()));
        assert!(!net.contains("192.168.0.1".parse().unwrap()));
        assert!(!net.contains("fe80::1".parse().unwrap()));

        let v6 = Net::from_prefix("2001:db8::1".parse().unwrap(), 32).unwrap();
        assert_eq!(encode_net(&v6).len(), 32);
        assert_eq!(v6.to_string(), "2001:db8::/32");
        assert_eq!(Net::from_prefix("1.2.3.4".parse().unwrap(), 0).unwrap().prefix_len(), Some(0));
        assert!(Net::from_prefix("1.2.3.4".parse().unwrap(), 33).is_none());
    }

    #[test]
    fn strings_are_nfc_normalized() {
        let decomposed = "e\u{301}";
        assert_eq!(nfc(decomposed), "\u{e9}");
        assert!(matches!(nfc("plain"), Cow::Borrowed(_)));
        assert!(decode_string(&[0xff]).is_err());
    }
}
