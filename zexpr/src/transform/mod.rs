//! Record transformers.
//!
//! Each transformer is an [`Evaluator`](crate::eval::Evaluator) from a record
//! to a record. Output types are derived once per input type and cached, so
//! a stream of records sharing a type pays for type construction once.
use zng::{ErrorKind, Path, Value, ValueRef};

use crate::{Error, Result};

mod cutter;
mod dropper;
mod flatten;
mod putter;
mod renamer;
mod shaper;

pub use cutter::Cutter;
pub use dropper::Dropper;
pub use flatten::{Flattener, Unflattener};
pub use putter::Putter;
pub use renamer::Renamer;
pub use shaper::{Shaper, ShaperTransform};

/// Reject equal paths and paths nested under one another.
fn check_disjoint(paths: &[Path]) -> Result<()> {
    for (i, a) in paths.iter().enumerate() {
        for b in &paths[i + 1..] {
            if a == b {
                return Err(Error::DuplicateField { field: a.to_string() });
            }
            if a.has_strict_prefix(b) || b.has_strict_prefix(a) {
                return Err(Error::ConflictingFields {
                    a: a.to_string(),
                    b: b.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Error values and non-record inputs pass through unchanged.
fn passthrough(this: ValueRef<'_>) -> Option<Value> {
    if this.is_error() || this.ty.record().is_none() {
        return Some(this.copy());
    }
    None
}

fn not_a_record(op: &str, this: ValueRef<'_>) -> Value {
    Value::error_of(ErrorKind::NotContainer, format_args!("{op}: not a record: {this}"))
}
