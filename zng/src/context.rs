//! The type context: a structural interner for types.
//!
//! A [`TypeContext`] hands out one [`Type`] handle per structurally unique
//! type and assigns composite types dense IDs starting at
//! [`ID_TYPEDEF`](crate::typevalue::ID_TYPEDEF). Interning is keyed by the
//! canonical type value, which also makes contexts able to exchange types:
//! a foreign type is re-interned by decoding its type value.
use std::collections::HashMap;

use log::{debug, info};
use parking_lot::RwLock;
use zcode::varint;

use crate::{
    Error, Result, Value, ValueRef,
    config::EngineConfig,
    types::{Column, Primitive, Type, TypeAlias, TypeEnum, TypeKind, TypeMap, TypeRecord, TypeUnion},
    typevalue::{
        self, ID_TYPE_ARRAY, ID_TYPE_ENUM, ID_TYPE_MAP, ID_TYPE_RECORD, ID_TYPE_SET,
        ID_TYPE_UNION, ID_TYPEDEF, ID_TYPENAME, Typedefs, bad,
    },
};

/// Bounds applied while decoding untrusted type values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_columns: u64,
    pub max_union_types: u64,
    pub max_enum_symbols: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_columns: 100_000,
            max_union_types: 100_000,
            max_enum_symbols: 100_000,
        }
    }
}

#[derive(Default)]
struct Inner {
    /// Composite types, indexed by `id - ID_TYPEDEF`.
    by_id: Vec<Type>,
    to_type: HashMap<Vec<u8>, Type>,
    /// Alias currently bound to each name.
    typedefs: HashMap<String, Type>,
}

impl Inner {
    fn insert(&mut self, kind: TypeKind, tv: Vec<u8>) -> Type {
        let id = ID_TYPEDEF as u32 + self.by_id.len() as u32;
        let ty = Type::new_composite(id, kind, tv.clone());
        debug!("New type encountered {}. Registered with ID {}.", ty, id);
        if let TypeKind::Alias(alias) = ty.kind() {
            self.typedefs.insert(alias.name.clone(), ty.clone());
        }
        self.by_id.push(ty.clone());
        self.to_type.insert(tv, ty.clone());
        ty
    }
}

/// A process-local type interner.
///
/// # A note on concurrency
/// Every method takes `&self` and may be called from several threads. Reads
/// of already interned types take a shared lock only. Interning uses an
/// upgradable read lock that is upgraded to a write lock only when a new
/// node must be inserted, so two concurrent callers interning the same type
/// always observe the same handle.
///
/// Example:
/// ```rust
/// use zng::{TypeContext, types::{Column, Primitive, Type}};
///
/// let ctx = TypeContext::new();
/// let int64 = Type::primitive(Primitive::Int64);
/// let a = ctx.lookup_type_record(vec![Column::new("a", int64.clone())]).unwrap();
/// let b = ctx.lookup_type_record(vec![Column::new("a", int64)]).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.id(), 23);
/// assert_eq!(ctx.lookup_by_value(a.type_value()).unwrap(), a);
/// ```
pub struct TypeContext {
    inner: RwLock<Inner>,
    limits: Limits,
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeContext {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            limits,
        }
    }

    /// Create a context that enforces the decode bounds of `config`.
    pub fn with_config(config: &EngineConfig) -> Self {
        Self::with_limits(config.limits())
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Number of composite types interned so far.
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn intern(&self, kind: TypeKind) -> Type {
        let tv = typevalue::encode_kind(&kind);
        if let Some(ty) = self.inner.read().to_type.get(&tv) {
            return ty.clone();
        }

        let mut inner = self.inner.upgradable_read();
        if let Some(ty) = inner.to_type.get(&tv) {
            return ty.clone();
        }
        inner.with_upgraded(|inner| inner.insert(kind, tv))
    }

    pub fn lookup_primitive(&self, name: &str) -> Option<Type> {
        Primitive::from_str(name).map(Type::primitive)
    }

    pub fn lookup_primitive_by_id(&self, id: u8) -> Option<Type> {
        Primitive::from_id(id).map(Type::primitive)
    }

    /// Intern a record type. Fails if two columns share a name.
    pub fn lookup_type_record(&self, columns: Vec<Column>) -> Result<Type> {
        let rec = TypeRecord::new(columns).map_err(|name| Error::DuplicateField { name })?;
        Ok(self.intern(TypeKind::Record(rec)))
    }

    pub fn lookup_type_array(&self, inner: Type) -> Type {
        self.intern(TypeKind::Array(inner))
    }

    /// Intern a set type. The element type must be a primitive, possibly
    /// behind aliases.
    pub fn lookup_type_set(&self, inner: Type) -> Result<Type> {
        if inner.primitive_kind().is_none() {
            return Err(Error::SetInnerNotPrimitive {
                ty: inner.to_string(),
            });
        }
        Ok(self.intern(TypeKind::Set(inner)))
    }

    pub fn lookup_type_map(&self, key: Type, val: Type) -> Type {
        self.intern(TypeKind::Map(TypeMap { key, val }))
    }

    pub fn lookup_type_union(&self, types: Vec<Type>) -> Type {
        self.intern(TypeKind::Union(TypeUnion { types }))
    }

    pub fn lookup_type_enum(&self, symbols: Vec<String>) -> Type {
        self.intern(TypeKind::Enum(TypeEnum { symbols }))
    }

    /// Intern the alias `name = ty`.
    ///
    /// Fails if `name` is already bound to a different underlying type in
    /// this context.
    pub fn lookup_type_alias(&self, name: &str, ty: Type) -> Result<Type> {
        let mut inner = self.inner.upgradable_read();
        if let Some(existing) = inner.typedefs.get(name) {
            let bound = existing.alias().map(|a| &a.ty);
            if bound == Some(&ty) {
                return Ok(existing.clone());
            }
            info!(
                "Rejected redefinition of alias {:?}: bound to {}, requested {}.",
                name,
                bound.map_or_else(String::new, |t| t.to_string()),
                ty
            );
            return Err(Error::AliasRedefinition {
                name: name.to_string(),
                existing: bound.map_or_else(String::new, |t| t.to_string()),
                requested: ty.to_string(),
            });
        }

        let kind = TypeKind::Alias(TypeAlias {
            name: name.to_string(),
            ty,
        });
        let tv = typevalue::encode_kind(&kind);
        Ok(inner.with_upgraded(|inner| inner.insert(kind, tv)))
    }

    /// The alias currently bound to `name`.
    pub fn lookup_type_def(&self, name: &str) -> Option<Type> {
        self.inner.read().typedefs.get(name).cloned()
    }

    /// Resolve a type ID. Primitive IDs never take the lock.
    pub fn lookup_type(&self, id: u32) -> Result<Type> {
        if id < ID_TYPEDEF as u32 {
            return u8::try_from(id)
                .ok()
                .and_then(Primitive::from_id)
                .map(Type::primitive)
                .ok_or(Error::UnknownTypeId { id });
        }
        self.inner
            .read()
            .by_id
            .get((id - ID_TYPEDEF as u32) as usize)
            .cloned()
            .ok_or(Error::UnknownTypeId { id })
    }

    /// Decode a type value into a type of this context.
    pub fn lookup_by_value(&self, tv: &[u8]) -> Result<Type> {
        if let [id] = tv {
            if let Some(p) = Primitive::from_id(*id) {
                return Ok(Type::primitive(p));
            }
        }
        if let Some(ty) = self.inner.read().to_type.get(tv) {
            return Ok(ty.clone());
        }

        let mut rest = tv;
        let ty = self.decode(&mut rest, &mut Typedefs::new(), 0)?;
        if !rest.is_empty() {
            return Err(bad("trailing bytes after type value"));
        }
        Ok(ty)
    }

    fn check_limit(what: &'static str, count: u64, max: u64) -> Result<()> {
        if count > max {
            return Err(Error::LimitExceeded { what, count, max });
        }
        Ok(())
    }

    fn decode(&self, tv: &mut &[u8], typedefs: &mut Typedefs, depth: usize) -> Result<Type> {
        if depth > typevalue::MAX_DEPTH {
            return Err(bad("type value nested too deeply"));
        }
        let id = typevalue::read_byte(tv)?;
        match id {
            ID_TYPEDEF => {
                let name = typevalue::read_name(tv)?;
                let under = self.decode(tv, typedefs, depth + 1)?;
                let alias = self.lookup_type_alias(name, under)?;
                typedefs.insert(name.to_string(), alias.clone());
                Ok(alias)
            }
            ID_TYPENAME => {
                let name = typevalue::read_name(tv)?;
                match typedefs.get(name) {
                    Some(ty) => Ok(ty.clone()),
                    None => self
                        .lookup_type_def(name)
                        .ok_or_else(|| bad("reference to undefined alias")),
                }
            }
            ID_TYPE_RECORD => {
                let n = varint::read_uvarint(tv)?;
                Self::check_limit("columns", n, self.limits.max_columns)?;
                let mut columns = Vec::new();
                for _ in 0..n {
                    let name = typevalue::read_name(tv)?;
                    let ty = self.decode(tv, typedefs, depth + 1)?;
                    columns.push(Column::new(name, ty));
                }
                self.lookup_type_record(columns)
            }
            ID_TYPE_ARRAY => {
                let inner = self.decode(tv, typedefs, depth + 1)?;
                Ok(self.lookup_type_array(inner))
            }
            ID_TYPE_SET => {
                let inner = self.decode(tv, typedefs, depth + 1)?;
                self.lookup_type_set(inner)
            }
            ID_TYPE_MAP => {
                let key = self.decode(tv, typedefs, depth + 1)?;
                let val = self.decode(tv, typedefs, depth + 1)?;
                Ok(self.lookup_type_map(key, val))
            }
            ID_TYPE_UNION => {
                let n = varint::read_uvarint(tv)?;
                Self::check_limit("union types", n, self.limits.max_union_types)?;
                let mut types = Vec::new();
                for _ in 0..n {
                    types.push(self.decode(tv, typedefs, depth + 1)?);
                }
                Ok(self.lookup_type_union(types))
            }
            ID_TYPE_ENUM => {
                let n = varint::read_uvarint(tv)?;
                Self::check_limit("enum symbols", n, self.limits.max_enum_symbols)?;
                let mut symbols = Vec::new();
                for _ in 0..n {
                    symbols.push(typevalue::read_name(tv)?.to_string());
                }
                Ok(self.lookup_type_enum(symbols))
            }
            id => Primitive::from_id(id)
                .map(Type::primitive)
                .ok_or(Error::UnknownTypeId { id: id as u32 }),
        }
    }

    /// The type value of `ty` as a value of type `type`.
    pub fn lookup_type_value(&self, ty: &Type) -> Value {
        Value::new(
            Type::primitive(Primitive::Type),
            Some(ty.type_value().to_vec()),
        )
    }

    /// Re-intern a type that may belong to another context.
    pub fn translate_type(&self, foreign: &Type) -> Result<Type> {
        if let TypeKind::Primitive(p) = foreign.kind() {
            return Ok(Type::primitive(*p));
        }
        self.lookup_by_value(foreign.type_value())
    }

    /// Forget every composite type. IDs restart at `ID_TYPEDEF`; handles
    /// already given out stay valid but are no longer interned.
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        debug!("Resetting type context holding {} types.", inner.by_id.len());
        *inner = Inner::default();
    }

    pub fn missing(&self) -> Value {
        Value::missing()
    }

    pub fn quiet(&self) -> Value {
        Value::quiet()
    }

    /// An error value whose message embeds the formatted `val`.
    pub fn wrap_error(&self, msg: &str, val: ValueRef<'_>) -> Value {
        Value::error(&format!("{msg}: {val}"))
    }

    /// Append new rightmost columns to a record.
    pub fn add_fields(
        &self,
        rec: ValueRef<'_>,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<Value> {
        let rt = rec.ty.record().ok_or_else(|| Error::NotARecord {
            ty: rec.ty.to_string(),
        })?;
        let mut columns = rt.columns.clone();
        let mut body = rec.bytes.map(<[u8]>::to_vec).unwrap_or_default();
        for (name, val) in fields {
            if rt.has_field(&name) {
                return Err(Error::DuplicateField { name });
            }
            zcode::append(&mut body, val.bytes.as_deref(), val.ty.is_container());
            columns.push(Column::new(name, val.ty));
        }
        let ty = self.lookup_type_record(columns)?;
        Ok(Value::new(ty, Some(body)))
    }
}
