//! Types module
//!
//! A [`Type`] is a cheap, reference-counted handle to an immutable type node
//! interned by a [`TypeContext`](crate::TypeContext). The type system has
//! two layers:
//!
//! - Primitive types: a fixed table shared by every context (see
//!   `primitive.rs`).
//! - Composite types: records, arrays, sets, maps, unions, enums and
//!   aliases (see `complex.rs`), interned per context.
//!
//! Two handles compare equal iff they point at the same node. Within one
//! context that is equivalent to structural equality, since the context
//! never creates two nodes for the same canonical type value.
use std::{
    collections::HashSet,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use once_cell::sync::Lazy;
use strum::{EnumIs, IntoEnumIterator};

use crate::format::write_name;

pub mod complex;
pub mod primitive;

pub use complex::{Column, TypeAlias, TypeEnum, TypeMap, TypeRecord, TypeUnion};
pub use primitive::Primitive;

/// The structural kind of a type node.
#[derive(Debug, Clone, EnumIs)]
pub enum TypeKind {
    Primitive(Primitive),
    Record(TypeRecord),
    Array(Type),
    /// Inner type is a primitive, possibly behind aliases.
    Set(Type),
    Map(TypeMap),
    Union(TypeUnion),
    Enum(TypeEnum),
    Alias(TypeAlias),
}

pub(crate) struct TypeNode {
    id: u32,
    kind: TypeKind,
    /// Canonical type value of this node.
    tv: Vec<u8>,
}

/// A handle to an interned type.
#[derive(Clone)]
pub struct Type(Arc<TypeNode>);

static PRIMITIVES: Lazy<Vec<Type>> = Lazy::new(|| {
    Primitive::iter()
        .map(|p| {
            Type(Arc::new(TypeNode {
                id: p.id() as u32,
                kind: TypeKind::Primitive(p),
                tv: vec![p.id()],
            }))
        })
        .collect()
});

impl Type {
    pub(crate) fn new_composite(id: u32, kind: TypeKind, tv: Vec<u8>) -> Self {
        Type(Arc::new(TypeNode { id, kind, tv }))
    }

    /// The shared handle of a primitive type.
    pub fn primitive(p: Primitive) -> Self {
        PRIMITIVES[p.id() as usize].clone()
    }

    pub fn id(&self) -> u32 {
        self.0.id
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    /// Canonical type value.
    pub fn type_value(&self) -> &[u8] {
        &self.0.tv
    }

    /// Strip every alias layer.
    pub fn under(&self) -> &Type {
        let mut ty = self;
        while let TypeKind::Alias(alias) = ty.kind() {
            ty = &alias.ty;
        }
        ty
    }

    /// Values of container types are encoded with container tags. Enum
    /// values are primitive indices.
    pub fn is_container(&self) -> bool {
        matches!(
            self.under().kind(),
            TypeKind::Record(_) | TypeKind::Array(_) | TypeKind::Set(_) | TypeKind::Map(_) | TypeKind::Union(_)
        )
    }

    /// The primitive kind, looking through aliases.
    pub fn primitive_kind(&self) -> Option<Primitive> {
        match self.under().kind() {
            TypeKind::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_primitive(&self, p: Primitive) -> bool {
        self.primitive_kind() == Some(p)
    }

    pub fn is_error(&self) -> bool {
        self.is_primitive(Primitive::Error)
    }

    pub fn is_null(&self) -> bool {
        self.is_primitive(Primitive::Null)
    }

    pub fn record(&self) -> Option<&TypeRecord> {
        match self.under().kind() {
            TypeKind::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Element type of arrays and sets.
    pub fn inner(&self) -> Option<&Type> {
        match self.under().kind() {
            TypeKind::Array(t) | TypeKind::Set(t) => Some(t),
            _ => None,
        }
    }

    pub fn map(&self) -> Option<&TypeMap> {
        match self.under().kind() {
            TypeKind::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn union(&self) -> Option<&TypeUnion> {
        match self.under().kind() {
            TypeKind::Union(u) => Some(u),
            _ => None,
        }
    }

    pub fn enumeration(&self) -> Option<&TypeEnum> {
        match self.under().kind() {
            TypeKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// The outermost alias layer, if any.
    pub fn alias(&self) -> Option<&TypeAlias> {
        match self.kind() {
            TypeKind::Alias(a) => Some(a),
            _ => None,
        }
    }

    fn write(&self, seen: &mut HashSet<String>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TypeKind::Primitive(p) => f.write_str(p.to_str()),
            TypeKind::Record(r) => {
                f.write_str("{")?;
                for (i, col) in r.columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write_name(f, &col.name)?;
                    f.write_str(":")?;
                    col.ty.write(seen, f)?;
                }
                f.write_str("}")
            }
            TypeKind::Array(inner) => {
                f.write_str("[")?;
                inner.write(seen, f)?;
                f.write_str("]")
            }
            TypeKind::Set(inner) => {
                f.write_str("|[")?;
                inner.write(seen, f)?;
                f.write_str("]|")
            }
            TypeKind::Map(m) => {
                f.write_str("|{")?;
                m.key.write(seen, f)?;
                f.write_str(":")?;
                m.val.write(seen, f)?;
                f.write_str("}|")
            }
            TypeKind::Union(u) => {
                f.write_str("(")?;
                for (i, t) in u.types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    t.write(seen, f)?;
                }
                f.write_str(")")
            }
            TypeKind::Enum(e) => {
                f.write_str("<")?;
                for (i, s) in e.symbols.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write_name(f, s)?;
                }
                f.write_str(">")
            }
            TypeKind::Alias(a) => {
                write_name(f, &a.name)?;
                if seen.insert(a.name.clone()) {
                    f.write_str("=(")?;
                    a.ty.write(seen, f)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state)
    }
}

/// Renders the type in text form. An alias is spelled `name=(type)` on its
/// first mention and `name` afterwards.
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(&mut HashSet::new(), f)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({}, {})", self.id(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_shared() {
        let a = Type::primitive(Primitive::Int32);
        let b = Type::primitive(Primitive::Int32);
        assert_eq!(a, b);
        assert_eq!(a.id(), 5);
        assert_eq!(a.type_value(), &[5]);
        assert_ne!(a, Type::primitive(Primitive::Uint32));
        assert!(!a.is_container());
        assert_eq!(a.to_string(), "int32");
    }

    #[test]
    fn composite_accessors_look_through_aliases() {
        let rec = TypeRecord::new(vec![Column::new("a", Type::primitive(Primitive::Int64))]).unwrap();
        let rec = Type::new_composite(23, TypeKind::Record(rec), vec![]);
        let alias = Type::new_composite(
            24,
            TypeKind::Alias(TypeAlias {
                name: "r".into(),
                ty: rec.clone(),
            }),
            vec![],
        );
        assert_eq!(alias.under(), &rec);
        assert!(alias.is_container());
        assert_eq!(alias.record().unwrap().column_of_field("a"), Some(0));
        assert_eq!(alias.to_string(), "r=({a:int64})");
    }

    #[test]
    fn duplicate_columns_are_reported() {
        let int = Type::primitive(Primitive::Int64);
        let err = TypeRecord::new(vec![Column::new("a", int.clone()), Column::new("a", int)]).unwrap_err();
        assert_eq!(err, "a");
    }
}
