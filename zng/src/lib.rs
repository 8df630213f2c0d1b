//! Typed values over ZCODE bytes.
//!
//! This crate layers a type system on top of the [`zcode`] framing:
//!
//! - [`types`]: primitive and composite types, handed out as cheap
//!   [`Type`](types::Type) handles.
//! - [`TypeContext`]: the structural interner. Every structurally unique
//!   type gets exactly one handle and a dense ID; types travel between
//!   contexts as canonical type values (see [`typevalue`]).
//! - [`Value`] / [`ValueRef`]: an owned or borrowed `(type, bytes)` pair,
//!   with text formatting ([`format`]), parsing ([`parse`]), a structural
//!   [`check`], field access and a depth-first [`FieldIter`].
//! - [`RecordBuilder`] and [`ColumnBuilder`] for constructing records.
//!
//! ```rust
//! use zng::{RecordBuilder, TypeContext, Value, types::{Column, Primitive, Type}};
//!
//! let ctx = TypeContext::new();
//! let rt = ctx
//!     .lookup_type_record(vec![Column::new("a", Type::primitive(Primitive::Int64))])
//!     .unwrap();
//! let mut b = RecordBuilder::new(rt).unwrap();
//! b.append_value(Value::int64(1).view());
//! let rec = b.build().unwrap();
//! let rec = ctx.add_fields(rec.view(), [("b".to_string(), Value::string("x"))]).unwrap();
//! assert_eq!(rec.to_string(), r#"{a:1,b:"x"}"#);
//! ```
mod builder;
mod check;
pub mod config;
mod context;
mod error;
pub mod format;
pub mod nano;
pub mod parse;
pub mod path;
mod record;
pub mod types;
pub mod typevalue;
mod value;
mod walk;

pub use builder::{ColumnBuilder, RecordBuilder};
pub use check::check;
pub use config::{EngineConfig, ErrorPolicy};
pub use context::{Limits, TypeContext};
pub use error::{CheckFailure, Error, Result};
pub use parse::parse_primitive;
pub use path::Path;
pub use record::Record;
pub use value::{ErrorKind, Value, ValueRef};
pub use walk::FieldIter;
