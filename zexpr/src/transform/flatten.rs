use std::collections::HashMap;

use log::trace;
use zcode::{Builder, Iter};
use zng::{
    ColumnBuilder, ErrorKind, Path, TypeContext, Value, ValueRef,
    types::{Column, Type, TypeRecord},
};

use crate::eval::{Evaluator, malformed};

fn flat_columns(prefix: &str, rec: &TypeRecord, out: &mut Vec<Column>) {
    for col in &rec.columns {
        let name = if prefix.is_empty() {
            col.name.clone()
        } else {
            format!("{prefix}.{}", col.name)
        };
        match col.ty.record() {
            Some(nested) if !nested.is_empty() => flat_columns(&name, nested, out),
            _ => out.push(Column::new(name, col.ty.clone())),
        }
    }
}

/// Append the leaves of `body`. An unset nested record contributes one
/// unset value per leaf.
fn flat_body(rec: &TypeRecord, body: Option<&[u8]>, b: &mut Builder) -> zcode::Result<()> {
    let mut it = body.map(Iter::new);
    for col in &rec.columns {
        let item = match it.as_mut() {
            Some(it) => it.next_item()?.body,
            None => None,
        };
        match col.ty.record() {
            Some(nested) if !nested.is_empty() => flat_body(nested, item, b)?,
            _ => b.append(item, col.ty.is_container()),
        }
    }
    Ok(())
}

/// Turns nested records into one flat record with dotted column names.
/// Arrays, sets, maps and unions are left as they are.
///
/// The output type depends only on the input type, so an unset nested
/// record becomes unset leaves. [`Unflattener`] gives those back as a set
/// record whose fields are unset, not as an unset record.
#[derive(Default)]
pub struct Flattener {
    types: HashMap<Type, Type>,
    builder: Builder,
}

impl Flattener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_len(&self) -> usize {
        self.types.len()
    }

    fn output_type(&mut self, ctx: &TypeContext, ty: &Type, rec: &TypeRecord) -> zng::Result<Type> {
        if let Some(out) = self.types.get(ty) {
            return Ok(out.clone());
        }
        let mut columns = Vec::with_capacity(rec.len());
        flat_columns("", rec, &mut columns);
        let out = ctx.lookup_type_record(columns)?;
        trace!("Flattened type {out} for {ty} added to the cache.");
        self.types.insert(ty.clone(), out.clone());
        Ok(out)
    }
}

impl Evaluator for Flattener {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        if let Some(v) = super::passthrough(this) {
            return v;
        }
        let Some(rec) = this.ty.record() else {
            return this.copy();
        };
        let ty = match self.output_type(ctx, this.ty, rec) {
            Ok(ty) => ty,
            Err(err) => return malformed(err),
        };
        let Some(body) = this.bytes else {
            return Value::unset(ty);
        };
        self.builder.reset();
        match flat_body(rec, Some(body), &mut self.builder) {
            Ok(()) => Value::new(ty, Some(self.builder.bytes().to_vec())),
            Err(err) => malformed(err),
        }
    }
}

struct Nesting {
    builder: ColumnBuilder,
    ty: Type,
}

/// Groups top-level columns with dotted names into nested records.
///
/// Only the top level is split; names inside nested records stay as they
/// are. Columns of one group must be adjacent.
#[derive(Default)]
pub struct Unflattener {
    /// `None` when no column name has a dot.
    nestings: HashMap<Type, Option<Nesting>>,
}

impl Unflattener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_len(&self) -> usize {
        self.nestings.len()
    }

    fn nesting(ctx: &TypeContext, rec: &TypeRecord) -> zng::Result<Option<Nesting>> {
        if !rec.columns.iter().any(|c| c.name.contains('.')) {
            return Ok(None);
        }
        let paths: Vec<Path> = rec.columns.iter().map(|c| Path::parse(&c.name)).collect();
        let types: Vec<Type> = rec.columns.iter().map(|c| c.ty.clone()).collect();
        let builder = ColumnBuilder::new(&paths)?;
        let ty = ctx.lookup_type_record(builder.typed_columns(ctx, &types)?)?;
        Ok(Some(Nesting { builder, ty }))
    }
}

impl Evaluator for Unflattener {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        if let Some(v) = super::passthrough(this) {
            return v;
        }
        let Some(rec) = this.ty.record() else {
            return this.copy();
        };
        if !self.nestings.contains_key(this.ty) {
            let nesting = match Self::nesting(ctx, rec) {
                Ok(nesting) => nesting,
                Err(err) => return Value::error_of(ErrorKind::BadValue, format_args!("unflatten: {err}")),
            };
            trace!("Unflatten layout for {} added to the cache.", this.ty);
            self.nestings.insert(this.ty.clone(), nesting);
        }
        let Some(Some(nesting)) = self.nestings.get_mut(this.ty) else {
            return this.copy();
        };
        let Some(body) = this.bytes else {
            return Value::unset(nesting.ty.clone());
        };
        nesting.builder.reset();
        for item in Iter::new(body) {
            match item {
                Ok(item) => nesting.builder.append(item.body, item.container),
                Err(err) => return malformed(err),
            }
        }
        match nesting.builder.encode() {
            Ok(body) => Value::new(nesting.ty.clone(), Some(body)),
            Err(err) => malformed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use zng::types::Primitive;

    use super::*;
    use crate::testing::{collection, record};

    #[test]
    fn flattens_nested_records_only() {
        let ctx = TypeContext::new();
        let arr = collection(ctx.lookup_type_array(Type::primitive(Primitive::Int64)), &[Value::int64(1)]);
        let inner = record(&ctx, vec![("y", Value::int64(2)), ("v", arr)]);
        let rec = record(&ctx, vec![("a", Value::int64(1)), ("r", inner)]);
        let mut flat = Flattener::new();
        let out = flat.eval(&ctx, rec.view());
        out.view().check().unwrap();
        assert_eq!(out.to_string(), r#"{a:1,"r.y":2,"r.v":[1]}"#);
    }

    #[test]
    fn unset_nested_records_flatten_to_unset_leaves() {
        let ctx = TypeContext::new();
        let inner = record(&ctx, vec![("x", Value::int64(2))]);
        let rec = record(&ctx, vec![("r", Value::unset(inner.ty.clone()))]);
        let out = Flattener::new().eval(&ctx, rec.view());
        assert_eq!(out.to_string(), r#"{"r.x":null(int64)}"#);

        let back = Unflattener::new().eval(&ctx, out.view());
        let int64 = Value::unset(Type::primitive(Primitive::Int64));
        let spread = record(&ctx, vec![("r", record(&ctx, vec![("x", int64)]))]);
        assert_eq!(back, spread);
        assert_ne!(back, rec);
    }

    #[test]
    fn unflatten_inverts_flatten() {
        let ctx = TypeContext::new();
        let deep = record(&ctx, vec![("z", Value::string("s"))]);
        let inner = record(&ctx, vec![("x", Value::int64(2)), ("d", deep)]);
        let rec = record(&ctx, vec![("a", Value::int64(1)), ("r", inner), ("b", Value::bool(false))]);
        let flat = Flattener::new().eval(&ctx, rec.view());
        let mut unflat = Unflattener::new();
        assert_eq!(unflat.eval(&ctx, flat.view()), rec);
        assert_eq!(unflat.cache_len(), 1);
    }

    #[test]
    fn unflatten_without_dots_is_a_copy() {
        let ctx = TypeContext::new();
        let rec = record(&ctx, vec![("a", Value::int64(1))]);
        assert_eq!(Unflattener::new().eval(&ctx, rec.view()), rec);
    }

    #[test]
    fn unflatten_rejects_split_groups() {
        let ctx = TypeContext::new();
        let rec = record(
            &ctx,
            vec![("r.x", Value::int64(1)), ("b", Value::int64(2)), ("r.y", Value::int64(3))],
        );
        let out = Unflattener::new().eval(&ctx, rec.view());
        assert_eq!(out.error_kind(), Some(ErrorKind::BadValue));
    }
}
