//! ZCODE byte-stream framing and primitive codecs.
//!
//! A ZCODE stream is a concatenation of items. Each item starts with an
//! unsigned varint tag whose low bit tells containers (1) from primitives
//! (0) and whose remaining bits carry the body length plus one, so that an
//! empty body and an unset value are distinct:
//!
//! | Tag        | Meaning                        |
//! |------------|--------------------------------|
//! | `0`        | unset primitive                |
//! | `1`        | unset container                |
//! | `2n`       | primitive of length `n - 1`    |
//! | `2n + 1`   | container of length `n - 1`    |
//!
//! The crate is split into:
//! - [`varint`]: LEB128 unsigned varints used by tags and type values.
//! - [`codec`]: byte-exact primitive encoders/decoders.
//! - [`Iter`]: a fallible iterator over the items of a body.
//! - [`Builder`]: an append-only builder with nested containers and
//!   in-place set/map normalization.
//!
//! ```rust
//! use zcode::{Builder, Iter};
//!
//! let mut b = Builder::new();
//! b.append_primitive(Some(b"hi"));
//! b.begin_container();
//! b.append_primitive(None);
//! b.end_container();
//!
//! let items: Vec<_> = Iter::new(b.bytes()).collect::<Result<_, _>>().unwrap();
//! assert_eq!(items.len(), 2);
//! assert_eq!(items[0].body, Some(&b"hi"[..]));
//! assert!(items[1].container);
//! ```
mod builder;
pub mod codec;
mod error;
mod iter;
mod normalize;
pub mod varint;

pub use builder::Builder;
pub use error::{Error, Result};
pub use iter::{Item, Iter};
pub use normalize::{is_normalized_set, normalize_map, normalize_set};

/// A small, stack-allocated-first buffer for encoded primitives.
///
/// Every fixed-width primitive (ints, floats, IPs, nets) fits inline.
pub type DynBuf = smallvec::SmallVec<[u8; 32]>;

/// Tag of an unset primitive.
pub const TAG_UNSET_PRIMITIVE: u64 = 0;
/// Tag of an unset container.
pub const TAG_UNSET_CONTAINER: u64 = 1;

/// Tag of a primitive body of length `len`.
#[inline]
pub fn primitive_tag(len: usize) -> u64 {
    ((len as u64) + 1) << 1
}

/// Tag of a container body of length `len`.
#[inline]
pub fn container_tag(len: usize) -> u64 {
    (((len as u64) + 1) << 1) | 1
}

#[inline]
pub fn tag_is_container(tag: u64) -> bool {
    tag & 1 == 1
}

#[inline]
pub fn tag_is_unset(tag: u64) -> bool {
    tag >> 1 == 0
}

/// Append a single item (tag and body) to `dst`. `None` appends the unset
/// tag of the requested kind.
pub fn append(dst: &mut Vec<u8>, body: Option<&[u8]>, container: bool) {
    match body {
        None => {
            let tag = if container {
                TAG_UNSET_CONTAINER
            } else {
                TAG_UNSET_PRIMITIVE
            };
            varint::append_uvarint(dst, tag);
        }
        Some(body) => {
            let tag = if container {
                container_tag(body.len())
            } else {
                primitive_tag(body.len())
            };
            varint::append_uvarint(dst, tag);
            dst.extend_from_slice(body);
        }
    }
}

/// Number of bytes [`append`] writes for a body of the given length.
pub fn size_of_item(len: Option<usize>) -> usize {
    match len {
        None => 1,
        Some(len) => varint::size_of_uvarint(primitive_tag(len)) + len,
    }
}
