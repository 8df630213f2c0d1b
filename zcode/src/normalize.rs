use crate::{Error, Iter, Result};

/// Canonicalize a set body: entries sorted by their tag-counted bytes
/// (tag followed by body) with duplicates removed.
pub fn normalize_set(body: &[u8]) -> Result<Vec<u8>> {
    let mut elements: Vec<&[u8]> = Vec::with_capacity(8);
    let mut it = Iter::new(body);
    while !it.done() {
        elements.push(it.next_tag_and_body()?);
    }
    if elements.len() < 2 {
        return Ok(body.to_vec());
    }
    elements.sort_unstable();
    elements.dedup();
    Ok(elements.concat())
}

/// Canonicalize a map body: `(key, value)` pairs sorted by the key's
/// tag-counted bytes. When a key repeats, the first pair wins.
pub fn normalize_map(body: &[u8]) -> Result<Vec<u8>> {
    let mut entries: Vec<(&[u8], &[u8])> = Vec::with_capacity(8);
    let mut it = Iter::new(body);
    while !it.done() {
        let key = it.next_tag_and_body()?;
        if it.done() {
            return Err(Error::OddMapEntries);
        }
        let val = it.next_tag_and_body()?;
        entries.push((key, val));
    }
    if entries.len() < 2 {
        return Ok(body.to_vec());
    }
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.dedup_by(|later, earlier| later.0 == earlier.0);
    let mut out = Vec::with_capacity(body.len());
    for (key, val) in entries {
        out.extend_from_slice(key);
        out.extend_from_slice(val);
    }
    Ok(out)
}

/// True if `body` already satisfies set ordering (strictly ascending).
pub fn is_normalized_set(body: &[u8]) -> Result<bool> {
    let mut it = Iter::new(body);
    let mut prev: Option<&[u8]> = None;
    while !it.done() {
        let cur = it.next_tag_and_body()?;
        if let Some(prev) = prev {
            if prev >= cur {
                return Ok(false);
            }
        }
        prev = Some(cur);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Builder, append};

    fn strings(body: &[u8]) -> Vec<Vec<u8>> {
        Iter::new(body)
            .map(|it| it.unwrap().body.unwrap().to_vec())
            .collect()
    }

    #[test]
    fn set_sorts_by_tag_then_body() {
        let mut body = Vec::new();
        for s in ["dup", "dup", "z", "a"] {
            append(&mut body, Some(s.as_bytes()), false);
        }
        let norm = normalize_set(&body).unwrap();
        // Shorter bodies carry smaller tags and so sort first.
        assert_eq!(
            strings(&norm),
            vec![b"a".to_vec(), b"z".to_vec(), b"dup".to_vec()]
        );
        assert!(is_normalized_set(&norm).unwrap());
        assert!(!is_normalized_set(&body).unwrap());
    }

    #[test]
    fn set_normalization_is_idempotent() {
        let mut body = Vec::new();
        for s in ["b", "a", "b", "c", "a"] {
            append(&mut body, Some(s.as_bytes()), false);
        }
        let once = normalize_set(&body).unwrap();
        let twice = normalize_set(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(strings(&once).len(), 3);
    }

    #[test]
    fn unset_sorts_first_in_set() {
        let mut body = Vec::new();
        append(&mut body, Some(b"a"), false);
        append(&mut body, None, false);
        let norm = normalize_set(&body).unwrap();
        let first = Iter::new(&norm).next().unwrap().unwrap();
        assert_eq!(first.body, None);
    }

    #[test]
    fn map_keeps_first_duplicate_key() {
        let mut b = Builder::new();
        b.begin_container();
        for (k, v) in [("k2", "x"), ("k1", "first"), ("k1", "second")] {
            b.append_primitive(Some(k.as_bytes()));
            b.append_primitive(Some(v.as_bytes()));
        }
        b.normalize_map().unwrap();
        b.end_container();
        let map = Iter::new(b.bytes()).next().unwrap().unwrap().body.unwrap();
        assert_eq!(
            strings(map),
            vec![
                b"k1".to_vec(),
                b"first".to_vec(),
                b"k2".to_vec(),
                b"x".to_vec()
            ]
        );
    }

    #[test]
    fn map_with_dangling_key_fails() {
        let mut body = Vec::new();
        append(&mut body, Some(b"k"), false);
        append(&mut body, Some(b"v"), false);
        append(&mut body, Some(b"k2"), false);
        assert_eq!(normalize_map(&body), Err(Error::OddMapEntries));
    }
}
