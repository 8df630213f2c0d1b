//! Expressions and record transformers over [`zng`] values.
//!
//! - [`eval`]: the expression tree. Every node implements [`Evaluator`],
//!   which maps an input value (`this`) to an output value and never fails
//!   with a Rust error: failures become error values.
//! - [`coerce`] and [`cast`]: numeric promotion for operators and explicit
//!   `cast_to_<type>` conversions.
//! - [`function`]: the named functions available to [`Call`].
//! - [`transform`]: cut, drop, put, rename, shape, flatten and unflatten,
//!   each caching its output type per input type.
//! - [`agg`], [`search`] and [`pipeline`]: aggregation, string search and
//!   the error policy at the top of a transformer chain.
//!
//! ```rust
//! use zexpr::{Evaluator, eval::{Compare, CompareOp, FieldRef, Literal}};
//! use zng::{RecordBuilder, TypeContext, Value, types::{Column, Primitive, Type}};
//!
//! let ctx = TypeContext::new();
//! let rt = ctx
//!     .lookup_type_record(vec![Column::new("x", Type::primitive(Primitive::Int64))])
//!     .unwrap();
//! let mut b = RecordBuilder::new(rt).unwrap();
//! b.append_value(Value::int64(10).view());
//! let rec = b.build().unwrap();
//!
//! let mut gt = Compare::new(
//!     CompareOp::Gt,
//!     FieldRef::parse("x").boxed(),
//!     Literal::new(Value::int64(5)).boxed(),
//! );
//! assert_eq!(gt.eval(&ctx, rec.view()), Value::bool(true));
//! ```
pub mod agg;
pub mod cast;
pub mod coerce;
mod error;
pub mod eval;
pub mod function;
pub mod pipeline;
pub mod search;
pub mod transform;

#[cfg(test)]
mod testing;

pub use agg::{Aggregator, ReducerKind};
pub use cast::Cast;
pub use error::{Error, Result};
pub use eval::Evaluator;
pub use function::Call;
pub use pipeline::Pipeline;
pub use search::SearchString;
