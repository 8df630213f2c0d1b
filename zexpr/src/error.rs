use strum::EnumIs;
use thiserror::Error;

/// Errors raised while building evaluators.
///
/// Evaluation itself never fails with an `Error`; it produces error values
/// instead (see [`zng::ErrorKind`]).
#[derive(Debug, EnumIs, Error)]
pub enum Error {
    #[error(transparent)]
    Zng(#[from] zng::Error),

    #[error("duplicate output field {field}")]
    DuplicateField { field: String },

    #[error("conflicting output fields {a} and {b}")]
    ConflictingFields { a: String, b: String },

    #[error("put: left-hand side cannot be 'this'")]
    PutToThis,

    #[error("put: multiple assignments to {field}")]
    DuplicateAssignment { field: String },

    #[error("put: conflicting nested assignments to {outer} and {inner}")]
    NestedAssignment { outer: String, inner: String },

    #[error("rename: {src} and {dst} must have the same parent and differ in the last name")]
    RenameAcrossParents { src: String, dst: String },

    #[error("rename: {srcs} sources but {dsts} destinations")]
    RenameArity { srcs: usize, dsts: usize },

    #[error("cut: {fields} fields but {exprs} expressions")]
    CutArity { fields: usize, exprs: usize },

    #[error("invalid regular expression {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error("unknown function {name}")]
    UnknownFunction { name: String },

    #[error("function {name} expects {min} to {max} arguments, got {got}")]
    Arity {
        name: String,
        min: usize,
        max: usize,
        got: usize,
    },

    #[error("cast to {target} is not supported")]
    UnknownCast { target: String },

    #[error("unknown operator {op:?}")]
    UnknownOperator { op: String },

    #[error("shape target must be a record type, found {ty}")]
    ShapeTarget { ty: String },

    #[error("unknown aggregate function {name}")]
    UnknownReducer { name: String },
}

pub type Result<T> = std::result::Result<T, Error>;
