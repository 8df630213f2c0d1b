use std::fmt;

use strum::EnumIs;
use thiserror::Error;

/// What a structural check found wrong at a given position.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
pub enum CheckFailure {
    MissingField,
    ExtraField,
    NotContainer,
    NotPrimitive,
    SetOrder,
    MapOrder,
    DuplicateMapKey,
    UnionSelector(i64),
    BadPrimitive(String),
    Malformed(zcode::Error),
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckFailure::MissingField => f.write_str("missing field"),
            CheckFailure::ExtraField => f.write_str("extra field"),
            CheckFailure::NotContainer => f.write_str("expected container value but found primitive"),
            CheckFailure::NotPrimitive => f.write_str("expected primitive value but found container"),
            CheckFailure::SetOrder => f.write_str("set elements are not in strictly ascending order"),
            CheckFailure::MapOrder => f.write_str("map keys are not in ascending order"),
            CheckFailure::DuplicateMapKey => f.write_str("duplicate map key"),
            CheckFailure::UnionSelector(sel) => write!(f, "union selector {sel} out of range"),
            CheckFailure::BadPrimitive(reason) => f.write_str(reason),
            CheckFailure::Malformed(err) => write!(f, "malformed body: {err}"),
        }
    }
}

#[derive(Debug, EnumIs, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] zcode::Error),

    /// Two columns of one record share a name.
    #[error("duplicate field: {name:?}")]
    DuplicateField { name: String },

    /// An alias name was bound before to a different underlying type.
    #[error("alias {name:?} is already defined as {existing}; cannot redefine it as {requested}")]
    AliasRedefinition {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("set element type must be primitive, found {ty}")]
    SetInnerNotPrimitive { ty: String },

    #[error("type ID {id} is not defined in this type context")]
    UnknownTypeId { id: u32 },

    #[error("bad type value: {reason}")]
    BadTypeValue { reason: String },

    #[error("type value declares {count} {what}, exceeding the limit of {max}")]
    LimitExceeded {
        what: &'static str,
        count: u64,
        max: u64,
    },

    /// A value body does not match its type.
    #[error("type check failed at {path} ({ty}): {failure}")]
    TypeCheck {
        path: String,
        ty: String,
        failure: CheckFailure,
    },

    #[error("cannot parse {text:?} as {ty}: {reason}")]
    Parse {
        ty: String,
        text: String,
        reason: String,
    },

    #[error("expected a record but found {ty}")]
    NotARecord { ty: String },

    #[error("field {path} not found")]
    FieldNotFound { path: String },

    #[error("field {path} has type {found}, expected {expected}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("empty field path")]
    EmptyPath,

    #[error("fields in record {record} must be adjacent")]
    NonAdjacentFields { record: String },

    #[error("record builder expected {expected} columns but received {got}")]
    IncompleteRecord { expected: usize, got: usize },

    #[error("failed to parse configuration file '{file}': {source}")]
    ConfigParse {
        source: toml::de::Error,
        file: String,
    },

    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(String),
}

pub type Result<T> = std::result::Result<T, Error>;
