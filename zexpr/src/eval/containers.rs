//! Record, array, set and map literals built from sub-expressions.
//!
//! Each node caches its output type on the tuple of operand types and only
//! interns a new type when that tuple changes. Collections whose elements
//! have different types get a union element type.
use std::collections::HashSet;

use log::trace;
use smallvec::SmallVec;
use zcode::{Builder, codec};
use zng::{
    ErrorKind, TypeContext, Value, ValueRef,
    types::{Column, Primitive, Type},
};

use super::{Evaluator, malformed};
use crate::{Error, Result};

type TypeKey = SmallVec<[Type; 4]>;

fn type_key<'a>(vals: impl IntoIterator<Item = &'a Value>) -> TypeKey {
    vals.into_iter().map(|v| v.ty.clone()).collect()
}

/// Evaluate every expression, stopping at the first error.
fn eval_all(
    exprs: &mut [Box<dyn Evaluator>],
    ctx: &TypeContext,
    this: ValueRef<'_>,
) -> std::result::Result<SmallVec<[Value; 4]>, Value> {
    let mut vals = SmallVec::with_capacity(exprs.len());
    for e in exprs {
        let v = e.eval(ctx, this);
        if v.is_error() {
            return Err(v);
        }
        vals.push(v);
    }
    Ok(vals)
}

/// The common type of `types`, a union of the distinct ones, or `null`.
fn unify(ctx: &TypeContext, types: &[Type]) -> Type {
    let mut distinct: Vec<Type> = Vec::new();
    for t in types {
        if !distinct.contains(t) {
            distinct.push(t.clone());
        }
    }
    match distinct.len() {
        0 => Type::primitive(Primitive::Null),
        1 => distinct.swap_remove(0),
        _ => ctx.lookup_type_union(distinct),
    }
}

/// Append `v` as an element of type `elem`, wrapping it as a union member
/// when `elem` is a union of which `v` is a member.
fn append_elem(b: &mut Builder, elem: &Type, v: &Value) {
    if &v.ty != elem {
        if let Some(sel) = elem.union().and_then(|u| u.selector_of(&v.ty)) {
            b.begin_container();
            b.append_primitive(Some(&codec::encode_int(sel as i64)));
            b.append(v.bytes.as_deref(), v.ty.is_container());
            b.end_container();
            return;
        }
    }
    b.append(v.bytes.as_deref(), v.ty.is_container());
}

/// `{name: expr, ...}`.
pub struct RecordExpr {
    names: Vec<String>,
    exprs: Vec<Box<dyn Evaluator>>,
    cached: Option<(TypeKey, Type)>,
    builder: Builder,
}

impl RecordExpr {
    pub fn new(fields: Vec<(String, Box<dyn Evaluator>)>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (name, _) in &fields {
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateField { field: name.clone() });
            }
        }
        let (names, exprs) = fields.into_iter().unzip();
        Ok(Self {
            names,
            exprs,
            cached: None,
            builder: Builder::new(),
        })
    }

    fn record_type(&mut self, ctx: &TypeContext, vals: &[Value]) -> zng::Result<Type> {
        let key = type_key(vals);
        if let Some((k, ty)) = &self.cached {
            if *k == key {
                return Ok(ty.clone());
            }
        }
        let cols = self
            .names
            .iter()
            .zip(&key)
            .map(|(name, ty)| Column::new(name.clone(), ty.clone()))
            .collect();
        let ty = ctx.lookup_type_record(cols)?;
        trace!("Record expression output type is now {ty}.");
        self.cached = Some((key, ty.clone()));
        Ok(ty)
    }
}

impl Evaluator for RecordExpr {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let vals = match eval_all(&mut self.exprs, ctx, this) {
            Ok(vals) => vals,
            Err(err) => return err,
        };
        let ty = match self.record_type(ctx, &vals) {
            Ok(ty) => ty,
            Err(err) => return malformed(err),
        };
        self.builder.reset();
        for v in &vals {
            self.builder.append(v.bytes.as_deref(), v.ty.is_container());
        }
        Value::new(ty, Some(self.builder.bytes().to_vec()))
    }
}

/// Element type and collection type cached on the element types.
#[derive(Default)]
struct Shape {
    cached: Option<(TypeKey, Type, Type)>,
}

impl Shape {
    fn get(
        &mut self,
        ctx: &TypeContext,
        vals: &[Value],
        outer: impl FnOnce(Type) -> zng::Result<Type>,
    ) -> zng::Result<(Type, Type)> {
        let key = type_key(vals);
        if let Some((k, elem, ty)) = &self.cached {
            if *k == key {
                return Ok((elem.clone(), ty.clone()));
            }
        }
        let elem = unify(ctx, &key);
        let ty = outer(elem.clone())?;
        trace!("Collection expression output type is now {ty}.");
        self.cached = Some((key, elem.clone(), ty.clone()));
        Ok((elem, ty))
    }
}

/// `[expr, ...]`.
pub struct ArrayExpr {
    exprs: Vec<Box<dyn Evaluator>>,
    shape: Shape,
    builder: Builder,
}

impl ArrayExpr {
    pub fn new(exprs: Vec<Box<dyn Evaluator>>) -> Self {
        Self {
            exprs,
            shape: Shape::default(),
            builder: Builder::new(),
        }
    }
}

impl Evaluator for ArrayExpr {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let vals = match eval_all(&mut self.exprs, ctx, this) {
            Ok(vals) => vals,
            Err(err) => return err,
        };
        let (elem, ty) = match self.shape.get(ctx, &vals, |elem| Ok(ctx.lookup_type_array(elem))) {
            Ok(shape) => shape,
            Err(err) => return malformed(err),
        };
        let b = &mut self.builder;
        b.reset();
        for v in &vals {
            append_elem(b, &elem, v);
        }
        Value::new(ty, Some(b.bytes().to_vec()))
    }
}

/// `|[expr, ...]|`. Elements are sorted and deduplicated.
pub struct SetExpr {
    exprs: Vec<Box<dyn Evaluator>>,
    shape: Shape,
    builder: Builder,
}

impl SetExpr {
    pub fn new(exprs: Vec<Box<dyn Evaluator>>) -> Self {
        Self {
            exprs,
            shape: Shape::default(),
            builder: Builder::new(),
        }
    }
}

impl Evaluator for SetExpr {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let vals = match eval_all(&mut self.exprs, ctx, this) {
            Ok(vals) => vals,
            Err(err) => return err,
        };
        let (elem, ty) = match self.shape.get(ctx, &vals, |elem| ctx.lookup_type_set(elem)) {
            Ok(shape) => shape,
            Err(err) => return Value::error_of(ErrorKind::NotPrimitive, err),
        };
        let b = &mut self.builder;
        b.reset();
        b.begin_container();
        for v in &vals {
            append_elem(b, &elem, v);
        }
        if let Err(err) = b.normalize_set() {
            return malformed(err);
        }
        b.end_container();
        body_of(ty, b.bytes())
    }
}

/// The value whose body is the single container item in `bytes`.
fn body_of(ty: Type, bytes: &[u8]) -> Value {
    match zcode::Iter::new(bytes).next_item() {
        Ok(item) => Value::new(ty, item.body.map(<[u8]>::to_vec)),
        Err(err) => malformed(err),
    }
}

/// `|{key: val, ...}|`. Entries are sorted by key; the first of several
/// equal keys wins.
pub struct MapExpr {
    keys: Vec<Box<dyn Evaluator>>,
    vals: Vec<Box<dyn Evaluator>>,
    key_shape: Shape,
    val_shape: Shape,
    cached: Option<(Type, Type, Type)>,
    builder: Builder,
}

impl MapExpr {
    pub fn new(entries: Vec<(Box<dyn Evaluator>, Box<dyn Evaluator>)>) -> Self {
        let (keys, vals) = entries.into_iter().unzip();
        Self {
            keys,
            vals,
            key_shape: Shape::default(),
            val_shape: Shape::default(),
            cached: None,
            builder: Builder::new(),
        }
    }

    fn map_type(&mut self, ctx: &TypeContext, key: &Type, val: &Type) -> Type {
        if let Some((k, v, ty)) = &self.cached {
            if k == key && v == val {
                return ty.clone();
            }
        }
        let ty = ctx.lookup_type_map(key.clone(), val.clone());
        self.cached = Some((key.clone(), val.clone(), ty.clone()));
        ty
    }
}

impl Evaluator for MapExpr {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let keys = match eval_all(&mut self.keys, ctx, this) {
            Ok(vals) => vals,
            Err(err) => return err,
        };
        let vals = match eval_all(&mut self.vals, ctx, this) {
            Ok(vals) => vals,
            Err(err) => return err,
        };
        let shapes = self
            .key_shape
            .get(ctx, &keys, Ok)
            .and_then(|(k, _)| self.val_shape.get(ctx, &vals, Ok).map(|(v, _)| (k, v)));
        let (key_ty, val_ty) = match shapes {
            Ok(shapes) => shapes,
            Err(err) => return malformed(err),
        };
        let ty = self.map_type(ctx, &key_ty, &val_ty);
        let b = &mut self.builder;
        b.reset();
        b.begin_container();
        for (k, v) in keys.iter().zip(&vals) {
            append_elem(b, &key_ty, k);
            append_elem(b, &val_ty, v);
        }
        if let Err(err) = b.normalize_map() {
            return malformed(err);
        }
        b.end_container();
        body_of(ty, b.bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{FieldRef, Literal};

    fn lit(v: Value) -> Box<dyn Evaluator> {
        Literal::new(v).boxed()
    }

    #[test]
    fn record_expr_caches_its_type() {
        let ctx = TypeContext::new();
        let this = Value::null();
        let mut e = RecordExpr::new(vec![
            ("a".to_string(), lit(Value::int64(1))),
            ("b".to_string(), lit(Value::string("x"))),
        ])
        .unwrap();
        let first = e.eval(&ctx, this.view());
        assert_eq!(first.to_string(), r#"{a:1,b:"x"}"#);
        let before = ctx.len();
        assert_eq!(e.eval(&ctx, this.view()), first);
        assert_eq!(ctx.len(), before);

        let dup = RecordExpr::new(vec![("a".to_string(), lit(Value::int64(1))), ("a".to_string(), lit(Value::int64(2)))]);
        assert!(dup.err().is_some_and(|e| e.is_duplicate_field()));

        let mut e = RecordExpr::new(vec![("a".to_string(), FieldRef::parse("x").boxed())]).unwrap();
        assert!(e.eval(&ctx, this.view()).is_missing());
    }

    #[test]
    fn arrays_use_unions_for_mixed_elements() {
        let ctx = TypeContext::new();
        let this = Value::null();
        let mut e = ArrayExpr::new(vec![lit(Value::int64(1)), lit(Value::int64(2))]);
        assert_eq!(e.eval(&ctx, this.view()).to_string(), "[1,2]");

        let mut e = ArrayExpr::new(vec![lit(Value::int64(1)), lit(Value::string("a"))]);
        let v = e.eval(&ctx, this.view());
        assert_eq!(v.ty.to_string(), "[(int64,string)]");
        v.view().check().unwrap();
        assert_eq!(v.to_string(), r#"[1,"a"]"#);

        let mut e = ArrayExpr::new(vec![]);
        assert_eq!(e.eval(&ctx, this.view()).ty.to_string(), "[null]");
    }

    #[test]
    fn sets_and_maps_are_normalized() {
        let ctx = TypeContext::new();
        let this = Value::null();
        let mut e = SetExpr::new(
            ["b", "a", "b"].iter().map(|s| lit(Value::string(s))).collect(),
        );
        let v = e.eval(&ctx, this.view());
        v.view().check().unwrap();
        assert_eq!(v.to_string(), r#"|["a","b"]|"#);

        let mut e = SetExpr::new(vec![lit(Value::int64(1)), lit(Value::string("a"))]);
        assert_eq!(e.eval(&ctx, this.view()).error_kind(), Some(ErrorKind::NotPrimitive));

        let mut e = MapExpr::new(vec![
            (lit(Value::string("z")), lit(Value::int64(1))),
            (lit(Value::string("a")), lit(Value::int64(2))),
        ]);
        let v = e.eval(&ctx, this.view());
        v.view().check().unwrap();
        assert_eq!(v.to_string(), r#"|{"a":2,"z":1}|"#);
    }

    #[test]
    fn collections_reuse_their_builder() {
        let ctx = TypeContext::new();
        let rec = crate::testing::record(&ctx, vec![("x", Value::int64(3))]);
        let other = crate::testing::record(&ctx, vec![("x", Value::int64(1))]);

        let mut arr = ArrayExpr::new(vec![FieldRef::parse("x").boxed(), lit(Value::int64(2))]);
        assert_eq!(arr.eval(&ctx, rec.view()).to_string(), "[3,2]");
        assert_eq!(arr.eval(&ctx, other.view()).to_string(), "[1,2]");

        let mut set = SetExpr::new(vec![FieldRef::parse("x").boxed(), lit(Value::int64(2))]);
        assert_eq!(set.eval(&ctx, rec.view()).to_string(), "|[2,3]|");
        assert_eq!(set.eval(&ctx, other.view()).to_string(), "|[1,2]|");

        let mut map = MapExpr::new(vec![(lit(Value::string("k")), FieldRef::parse("x").boxed())]);
        assert_eq!(map.eval(&ctx, rec.view()).to_string(), r#"|{"k":3}|"#);
        assert_eq!(map.eval(&ctx, other.view()).to_string(), r#"|{"k":1}|"#);
    }
}
