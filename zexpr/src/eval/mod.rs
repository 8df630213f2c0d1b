//! Expression nodes.
//!
//! An expression is a tree of boxed [`Evaluator`]s. Evaluation never fails
//! with a Rust error: a node that cannot produce a result returns an error
//! value, and every node hands an error operand back unchanged.
use std::fmt;

use zng::{ErrorKind, Path, TypeContext, Value, ValueRef, parse_primitive, types::Type};

use crate::{Result, coerce::to_int};

pub mod arith;
pub mod compare;
pub mod containers;
pub mod logic;

pub use arith::{Arith, ArithOp};
pub use compare::{Compare, CompareOp, In, RegexpMatch};
pub use containers::{ArrayExpr, MapExpr, RecordExpr, SetExpr};
pub use logic::{And, Filter, Not, Or};

/// A compiled expression node.
///
/// `eval` takes `&mut self` so nodes can cache per-input-type state (output
/// types, plans, builders) across calls.
pub trait Evaluator: Send {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value;

    fn boxed(self) -> Box<dyn Evaluator>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

impl Evaluator for Box<dyn Evaluator> {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        (**self).eval(ctx, this)
    }
}

pub(crate) fn malformed(err: impl fmt::Display) -> Value {
    Value::error_of(ErrorKind::Malformed, err)
}

/// A field lookup result. Absent fields and non-record inputs read as
/// `missing`. A body that fails to decode is `malformed`.
fn field_value(res: zng::Result<Option<ValueRef<'_>>>) -> Value {
    match res {
        Ok(Some(v)) => v.copy(),
        Err(zng::Error::Codec(err)) => malformed(err),
        Ok(None) | Err(_) => Value::missing(),
    }
}

pub(crate) fn incompatible(detail: impl fmt::Display) -> Value {
    Value::error_of(ErrorKind::IncompatibleTypes, detail)
}

/// A constant.
#[derive(Debug, Clone)]
pub struct Literal(pub Value);

impl Literal {
    pub fn new(val: Value) -> Self {
        Self(val)
    }

    /// Parse `text` as a value of the primitive type `ty`.
    pub fn parse(ty: &Type, text: &str) -> Result<Self> {
        Ok(Self(parse_primitive(ty, text)?))
    }
}

impl Evaluator for Literal {
    fn eval(&mut self, _ctx: &TypeContext, _this: ValueRef<'_>) -> Value {
        self.0.clone()
    }
}

/// The input value itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct This;

impl Evaluator for This {
    fn eval(&mut self, _ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        this.copy()
    }
}

/// A field path resolved against the input record, `a.b.c`.
#[derive(Debug, Clone)]
pub struct FieldRef {
    path: Path,
}

impl FieldRef {
    pub fn new(path: Path) -> Self {
        Self { path }
    }

    pub fn parse(path: &str) -> Self {
        Self::new(Path::parse(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Evaluator for FieldRef {
    fn eval(&mut self, _ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        if self.path.is_this() {
            return this.copy();
        }
        field_value(this.deref(&self.path))
    }
}

/// `expr.field`, where `expr` is any expression.
pub struct DotAccess {
    record: Box<dyn Evaluator>,
    field: String,
}

impl DotAccess {
    pub fn new(record: Box<dyn Evaluator>, field: impl Into<String>) -> Self {
        Self {
            record,
            field: field.into(),
        }
    }
}

impl Evaluator for DotAccess {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let rec = self.record.eval(ctx, this);
        if rec.is_error() {
            return rec;
        }
        field_value(rec.view().value_by_field(&self.field))
    }
}

/// `container[index]` over arrays, sets, records and maps.
pub struct Index {
    container: Box<dyn Evaluator>,
    index: Box<dyn Evaluator>,
}

impl Index {
    pub fn new(container: Box<dyn Evaluator>, index: Box<dyn Evaluator>) -> Self {
        Self { container, index }
    }
}

fn found(res: zng::Result<Option<ValueRef<'_>>>) -> Value {
    match res {
        Ok(Some(v)) => v.copy(),
        Ok(None) => Value::missing(),
        Err(err) => malformed(err),
    }
}

/// Look up `index` in `container`.
pub fn index_value(container: ValueRef<'_>, index: ValueRef<'_>) -> Value {
    if container.ty.inner().is_some() {
        let p = index.ty.primitive_kind();
        if !p.is_some_and(|p| p.is_integer()) {
            return incompatible(format_args!("index is not an integer: {index}"));
        }
        if index.is_unset() {
            return Value::missing();
        }
        return match to_int(index).and_then(|i| usize::try_from(i).ok()) {
            Some(i) => found(container.index(i)),
            None => Value::missing(),
        };
    }
    if container.ty.record().is_some() {
        let Some(name) = index.ty.primitive_kind().filter(|p| p.is_stringy()).and(index.as_str()) else {
            return incompatible(format_args!("record index is not a string: {index}"));
        };
        return found(container.value_by_field(name));
    }
    if let Some(m) = container.ty.map() {
        if &m.key != index.ty {
            return incompatible(format_args!("map key type is {} but index is {}", m.key, index.ty));
        }
        return found(container.map_get(index));
    }
    Value::error_of(ErrorKind::NotContainer, format_args!("cannot index {}", container.ty))
}

impl Evaluator for Index {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let container = self.container.eval(ctx, this);
        if container.is_error() {
            return container;
        }
        let index = self.index.eval(ctx, this);
        if index.is_error() {
            return index;
        }
        index_value(container.view(), index.view())
    }
}

/// `pred ? then : otherwise`. Only the selected branch is evaluated.
pub struct Conditional {
    pred: Box<dyn Evaluator>,
    then: Box<dyn Evaluator>,
    otherwise: Box<dyn Evaluator>,
}

impl Conditional {
    pub fn new(pred: Box<dyn Evaluator>, then: Box<dyn Evaluator>, otherwise: Box<dyn Evaluator>) -> Self {
        Self { pred, then, otherwise }
    }
}

impl Evaluator for Conditional {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let pred = self.pred.eval(ctx, this);
        if pred.is_error() {
            return pred;
        }
        if !pred.ty.is_primitive(zng::types::Primitive::Bool) {
            return incompatible(format_args!("?-operator: bool predicate required, found {pred}"));
        }
        // An unset predicate selects the else branch.
        if pred.as_bool() == Some(true) {
            self.then.eval(ctx, this)
        } else {
            self.otherwise.eval(ctx, this)
        }
    }
}
