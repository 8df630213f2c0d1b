use smallvec::SmallVec;

use crate::{Result, container_tag, varint};

/// Incremental ZCODE builder.
///
/// Primitives and complete containers are appended directly. Nested
/// containers are opened with [`Builder::begin_container`] and closed with
/// [`Builder::end_container`]; the container tag is written at close time
/// once the body length is known.
///
/// ```rust
/// use zcode::{Builder, Iter};
///
/// let mut b = Builder::new();
/// b.begin_container();
/// b.append_primitive(Some(b"dup"));
/// b.append_primitive(Some(b"a"));
/// b.append_primitive(Some(b"dup"));
/// b.normalize_set().unwrap();
/// b.end_container();
///
/// let set = Iter::new(b.bytes()).next().unwrap().unwrap();
/// let elems: Vec<_> = Iter::new(set.body.unwrap())
///     .map(|it| it.unwrap().body.unwrap())
///     .collect();
/// assert_eq!(elems, vec![&b"a"[..], &b"dup"[..]]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Builder {
    bytes: Vec<u8>,
    containers: SmallVec<[usize; 8]>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            containers: SmallVec::new(),
        }
    }

    /// Clear all content while keeping the allocation.
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.containers.clear();
    }

    pub fn append_primitive(&mut self, body: Option<&[u8]>) {
        crate::append(&mut self.bytes, body, false);
    }

    pub fn append_container(&mut self, body: Option<&[u8]>) {
        crate::append(&mut self.bytes, body, true);
    }

    pub fn append(&mut self, body: Option<&[u8]>, container: bool) {
        crate::append(&mut self.bytes, body, container);
    }

    /// Open a nested container. Items appended until the matching
    /// [`Builder::end_container`] form its body.
    pub fn begin_container(&mut self) {
        self.containers.push(self.bytes.len());
    }

    /// Close the innermost open container.
    pub fn end_container(&mut self) {
        let Some(offset) = self.containers.pop() else {
            debug_assert!(false, "end_container without begin_container");
            return;
        };
        let tag = container_tag(self.bytes.len() - offset);
        let mut header = Vec::with_capacity(varint::MAX_VARINT_LEN);
        varint::append_uvarint(&mut header, tag);
        self.bytes.splice(offset..offset, header);
    }

    /// Rewrite the body of the innermost open container with `f`.
    /// On error the body is left untouched.
    pub fn transform_container<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>>,
    {
        let Some(&offset) = self.containers.last() else {
            debug_assert!(false, "transform_container outside of a container");
            return Ok(());
        };
        let body = f(&self.bytes[offset..])?;
        self.bytes.truncate(offset);
        self.bytes.extend_from_slice(&body);
        Ok(())
    }

    /// Sort and deduplicate the entries of the open container as a set.
    pub fn normalize_set(&mut self) -> Result<()> {
        self.transform_container(crate::normalize_set)
    }

    /// Sort the open container's `(key, value)` pairs by key and drop
    /// duplicate keys.
    pub fn normalize_map(&mut self) -> Result<()> {
        self.transform_container(crate::normalize_map)
    }

    /// Depth of currently open containers.
    pub fn depth(&self) -> usize {
        self.containers.len()
    }

    pub fn is_balanced(&self) -> bool {
        self.containers.is_empty()
    }

    /// The encoded bytes. Only a complete concatenation of items once every
    /// container has been closed.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Iter;

    #[test]
    fn nested_containers_get_tags() {
        let mut b = Builder::new();
        b.append_primitive(Some(b"x"));
        b.begin_container();
        b.append_primitive(Some(b"y"));
        b.begin_container();
        b.append_primitive(Some(b"z"));
        b.end_container();
        b.end_container();
        assert!(b.is_balanced());

        let items: Vec<_> = Iter::new(b.bytes()).map(|i| i.unwrap()).collect();
        assert_eq!(items.len(), 2);
        assert!(!items[0].container);
        assert!(items[1].container);
        let inner: Vec<_> = Iter::new(items[1].body.unwrap()).map(|i| i.unwrap()).collect();
        assert_eq!(inner[0].body, Some(&b"y"[..]));
        assert!(inner[1].container);
    }

    #[test]
    fn empty_container_is_not_unset() {
        let mut b = Builder::new();
        b.begin_container();
        b.end_container();
        b.append_container(None);
        assert_eq!(b.bytes(), &[3, 1]);
    }

    #[test]
    fn long_container_uses_multibyte_tag() {
        let mut b = Builder::new();
        b.begin_container();
        let body = vec![0xaa; 100];
        b.append_primitive(Some(&body));
        b.end_container();
        let item = Iter::new(b.bytes()).next().unwrap().unwrap();
        assert!(item.container);
        let inner = Iter::new(item.body.unwrap()).next().unwrap().unwrap();
        assert_eq!(inner.body.unwrap().len(), 100);
    }

    #[test]
    fn reset_reuses_buffer() {
        let mut b = Builder::with_capacity(64);
        b.append_primitive(Some(b"abc"));
        b.reset();
        assert!(b.bytes().is_empty());
        b.append_primitive(None);
        assert_eq!(b.bytes(), &[0]);
    }
}
