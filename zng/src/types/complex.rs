//! Composite type payloads.
//!
//! These structs hold the children of a composite [`Type`]. They are built by
//! the [`TypeContext`](crate::TypeContext) and are immutable once interned.
use std::collections::HashMap;

use super::Type;

/// A named record column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    pub name: String,
    pub ty: Type,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// An ordered list of uniquely named columns.
#[derive(Debug, Clone)]
pub struct TypeRecord {
    pub columns: Vec<Column>,
    lut: HashMap<String, usize>,
}

impl TypeRecord {
    /// Build the payload, or return the first duplicated name.
    pub(crate) fn new(columns: Vec<Column>) -> Result<Self, String> {
        let mut lut = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if lut.insert(col.name.clone(), i).is_some() {
                return Err(col.name.clone());
            }
        }
        Ok(Self { columns, lut })
    }

    /// Position of the column called `name`.
    pub fn column_of_field(&self, name: &str) -> Option<usize> {
        self.lut.get(name).copied()
    }

    pub fn type_of_field(&self, name: &str) -> Option<&Type> {
        self.column_of_field(name).map(|i| &self.columns[i].ty)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.lut.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TypeMap {
    pub key: Type,
    pub val: Type,
}

#[derive(Debug, Clone)]
pub struct TypeUnion {
    pub types: Vec<Type>,
}

impl TypeUnion {
    /// Member type carried by `selector`.
    pub fn type_of(&self, selector: i64) -> Option<&Type> {
        usize::try_from(selector).ok().and_then(|i| self.types.get(i))
    }

    /// Selector of the first member equal to `ty`.
    pub fn selector_of(&self, ty: &Type) -> Option<usize> {
        self.types.iter().position(|t| t == ty)
    }
}

#[derive(Debug, Clone)]
pub struct TypeEnum {
    pub symbols: Vec<String>,
}

impl TypeEnum {
    pub fn symbol(&self, index: u64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.symbols.get(i))
            .map(String::as_str)
    }

    pub fn lookup(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// A named type. Identity is structural on `(name, ty)`.
#[derive(Debug, Clone)]
pub struct TypeAlias {
    pub name: String,
    pub ty: Type,
}
