use crate::{Error, Result, tag_is_container, tag_is_unset, varint};

/// One decoded ZCODE item. `body` is `None` for an unset value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item<'a> {
    pub body: Option<&'a [u8]>,
    pub container: bool,
}

/// Iterator over the items of a ZCODE body.
///
/// Iteration stops after the first error; the error is yielded once.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Iter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// True when no bytes remain.
    #[inline]
    pub fn done(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.buf
    }

    fn read_tag(&mut self) -> Result<(u64, usize)> {
        let (tag, n) = varint::uvarint(self.buf).map_err(|_| Error::MalformedTag {
            offset: self.offset,
        })?;
        if tag_is_unset(tag) {
            return Ok((tag, n));
        }
        let len = (tag >> 1) - 1;
        let len = usize::try_from(len)
            .ok()
            .filter(|l| *l <= isize::MAX as usize)
            .ok_or(Error::LengthOverflow { tag })?;
        let remaining = self.buf.len() - n;
        if len > remaining {
            return Err(Error::TruncatedBody {
                expected: len,
                remaining,
            });
        }
        Ok((tag, n))
    }

    fn fail<T>(&mut self, err: Error) -> Result<T> {
        self.buf = &[];
        Err(err)
    }

    /// Decode the next item.
    pub fn next_item(&mut self) -> Result<Item<'a>> {
        let (tag, n) = match self.read_tag() {
            Ok(t) => t,
            Err(err) => return self.fail(err),
        };
        let container = tag_is_container(tag);
        if tag_is_unset(tag) {
            self.buf = &self.buf[n..];
            self.offset += n;
            return Ok(Item {
                body: None,
                container,
            });
        }
        let len = ((tag >> 1) - 1) as usize;
        let body = &self.buf[n..n + len];
        self.buf = &self.buf[n + len..];
        self.offset += n + len;
        Ok(Item {
            body: Some(body),
            container,
        })
    }

    /// Return the next item's tag and body as one contiguous slice.
    /// Sorting these slices bytewise is the canonical set order.
    pub fn next_tag_and_body(&mut self) -> Result<&'a [u8]> {
        let start = self.buf;
        let (tag, n) = match self.read_tag() {
            Ok(t) => t,
            Err(err) => return self.fail(err),
        };
        let len = if tag_is_unset(tag) {
            0
        } else {
            ((tag >> 1) - 1) as usize
        };
        self.buf = &self.buf[n + len..];
        self.offset += n + len;
        Ok(&start[..n + len])
    }

    /// Skip `n` items and return the one after them.
    pub fn nth_item(&mut self, n: usize) -> Result<Option<Item<'a>>> {
        for _ in 0..n {
            if self.done() {
                return Ok(None);
            }
            self.next_item()?;
        }
        if self.done() {
            return Ok(None);
        }
        self.next_item().map(Some)
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Result<Item<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done() {
            None
        } else {
            Some(self.next_item())
        }
    }
}
