//! Text forms of `time` and `duration`.
//!
//! Times are RFC 3339 in UTC with as many fractional digits as needed.
//! Durations use the `1h2m3.5s` notation, with `ms`, `us` and `ns` for
//! values under a second.
use chrono::{DateTime, SecondsFormat, Utc};

const MICROSECOND: u64 = 1_000;
const MILLISECOND: u64 = 1_000_000;
const SECOND: u64 = 1_000_000_000;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;

pub fn format_time(ns: i64) -> String {
    DateTime::<Utc>::from_timestamp_nanos(ns).to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_time(s: &str) -> Result<i64, String> {
    let t = DateTime::parse_from_rfc3339(s).map_err(|e| e.to_string())?;
    t.timestamp_nanos_opt()
        .ok_or_else(|| String::from("time out of range"))
}

/// `whole.frac` of `v / div` with trailing zeros trimmed.
fn frac(v: u64, div: u64) -> String {
    let whole = v / div;
    let rem = v % div;
    if rem == 0 {
        return whole.to_string();
    }
    let width = div.ilog10() as usize;
    let digits = format!("{rem:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

pub fn format_duration(ns: i64) -> String {
    if ns == 0 {
        return String::from("0s");
    }
    let sign = if ns < 0 { "-" } else { "" };
    let u = ns.unsigned_abs();
    if u < MICROSECOND {
        return format!("{sign}{u}ns");
    }
    if u < MILLISECOND {
        return format!("{sign}{}us", frac(u, MICROSECOND));
    }
    if u < SECOND {
        return format!("{sign}{}ms", frac(u, MILLISECOND));
    }
    let h = u / HOUR;
    let m = (u % HOUR) / MINUTE;
    let s = frac(u % MINUTE, SECOND);
    if h > 0 {
        format!("{sign}{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{sign}{m}m{s}s")
    } else {
        format!("{sign}{s}s")
    }
}

fn unit_of(s: &str) -> Option<(u64, usize)> {
    // Longest units first so "ms" is not read as "m".
    const UNITS: [(&str, u64); 8] = [
        ("ns", 1),
        ("us", MICROSECOND),
        ("\u{b5}s", MICROSECOND),
        ("\u{3bc}s", MICROSECOND),
        ("ms", MILLISECOND),
        ("s", SECOND),
        ("m", MINUTE),
        ("h", HOUR),
    ];
    UNITS
        .iter()
        .find(|(name, _)| s.starts_with(name))
        .map(|(name, scale)| (*scale, name.len()))
}

pub fn parse_duration(text: &str) -> Result<i64, String> {
    let (neg, mut s) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if s == "0" {
        return Ok(0);
    }
    if s.is_empty() {
        return Err(String::from("empty duration"));
    }

    let mut total: u128 = 0;
    while !s.is_empty() {
        let int_len = s.bytes().take_while(u8::is_ascii_digit).count();
        let whole = &s[..int_len];
        s = &s[int_len..];
        let mut fraction = "";
        if let Some(rest) = s.strip_prefix('.') {
            let n = rest.bytes().take_while(u8::is_ascii_digit).count();
            fraction = &rest[..n];
            s = &rest[n..];
        }
        if whole.is_empty() && fraction.is_empty() {
            return Err(format!("invalid duration {text:?}"));
        }
        let (scale, unit_len) = unit_of(s).ok_or_else(|| format!("missing or unknown unit in duration {text:?}"))?;
        s = &s[unit_len..];

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| format!("invalid duration {text:?}"))?
        };
        let mut part = whole
            .checked_mul(scale as u128)
            .ok_or_else(|| format!("duration {text:?} out of range"))?;
        if !fraction.is_empty() {
            // Digits beyond nanosecond precision cannot contribute.
            let fraction = &fraction[..fraction.len().min(19)];
            let f: u128 = fraction.parse().map_err(|_| format!("invalid duration {text:?}"))?;
            part += f * scale as u128 / 10u128.pow(fraction.len() as u32);
        }
        total = total
            .checked_add(part)
            .filter(|t| *t <= i64::MAX as u128 + neg as u128)
            .ok_or_else(|| format!("duration {text:?} out of range"))?;
    }

    if neg {
        Ok((total as i128).wrapping_neg() as i64)
    } else {
        Ok(total as i64)
    }
}
