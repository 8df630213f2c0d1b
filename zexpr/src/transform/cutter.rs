use std::collections::{HashMap, hash_map::Entry};

use log::trace;
use zng::{ColumnBuilder, ErrorKind, Path, TypeContext, Value, ValueRef, types::Type};

use crate::{
    Error, Result,
    eval::{Evaluator, malformed},
};

/// Output layout for one combination of present fields and their types.
struct Layout {
    builder: ColumnBuilder,
    ty: Type,
}

/// Builds a record from `field := expr` assignments.
///
/// Fields whose expression is `missing` are left out of the output; when
/// every field is missing the result is `quiet`.
pub struct Cutter {
    paths: Vec<Path>,
    exprs: Vec<Box<dyn Evaluator>>,
    /// Keyed by the type of each field, `None` where the field is missing.
    layouts: HashMap<Vec<Option<Type>>, Layout>,
}

impl Cutter {
    pub fn new(paths: Vec<Path>, exprs: Vec<Box<dyn Evaluator>>) -> Result<Self> {
        if paths.len() != exprs.len() {
            return Err(Error::CutArity {
                fields: paths.len(),
                exprs: exprs.len(),
            });
        }
        super::check_disjoint(&paths)?;
        ColumnBuilder::new(&paths)?;
        Ok(Self {
            paths,
            exprs,
            layouts: HashMap::new(),
        })
    }

    pub fn cache_len(&self) -> usize {
        self.layouts.len()
    }

    fn layout(&mut self, ctx: &TypeContext, key: Vec<Option<Type>>) -> zng::Result<&mut Layout> {
        let entry = match self.layouts.entry(key) {
            Entry::Occupied(e) => return Ok(e.into_mut()),
            Entry::Vacant(e) => e,
        };
        let (paths, types): (Vec<Path>, Vec<Type>) = self
            .paths
            .iter()
            .zip(entry.key())
            .filter_map(|(path, ty)| ty.clone().map(|ty| (path.clone(), ty)))
            .unzip();
        let builder = ColumnBuilder::new(&paths)?;
        let ty = ctx.lookup_type_record(builder.typed_columns(ctx, &types)?)?;
        trace!("Cut output type {ty} added to the cache.");
        Ok(entry.insert(Layout { builder, ty }))
    }
}

impl Evaluator for Cutter {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        if this.is_error() {
            return this.copy();
        }
        let vals: Vec<Value> = self.exprs.iter_mut().map(|e| e.eval(ctx, this)).collect();
        let key: Vec<Option<Type>> = vals
            .iter()
            .map(|v| (!v.is_missing()).then(|| v.ty.clone()))
            .collect();
        if key.iter().all(Option::is_none) {
            return Value::quiet();
        }
        let layout = match self.layout(ctx, key) {
            Ok(layout) => layout,
            Err(err) => return Value::error_of(ErrorKind::BadValue, format_args!("cut: {err}")),
        };
        layout.builder.reset();
        for v in vals.iter().filter(|v| !v.is_missing()) {
            layout.builder.append_value(v.view());
        }
        match layout.builder.encode() {
            Ok(body) => Value::new(layout.ty.clone(), Some(body)),
            Err(err) => malformed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        eval::{FieldRef, Literal},
        testing::record,
    };

    fn cutter(fields: &[(&str, &str)]) -> Cutter {
        let (paths, exprs) = fields
            .iter()
            .map(|(dst, src)| (Path::parse(dst), FieldRef::parse(src).boxed()))
            .unzip();
        Cutter::new(paths, exprs).unwrap()
    }

    #[test]
    fn cuts_and_nests() {
        let ctx = TypeContext::new();
        let rec = record(
            &ctx,
            vec![("a", Value::int64(1)), ("b", Value::string("x")), ("c", Value::int64(3))],
        );
        let mut cut = cutter(&[("c", "c"), ("r.a", "a")]);
        assert_eq!(cut.eval(&ctx, rec.view()).to_string(), "{c:3,r:{a:1}}");
        cut.eval(&ctx, rec.view());
        assert_eq!(cut.cache_len(), 1);
    }

    #[test]
    fn missing_fields_are_omitted() {
        let ctx = TypeContext::new();
        let rec = record(&ctx, vec![("a", Value::int64(1))]);
        let mut cut = cutter(&[("a", "a"), ("z", "z")]);
        assert_eq!(cut.eval(&ctx, rec.view()).to_string(), "{a:1}");
        let mut cut = cutter(&[("y", "y"), ("z", "z")]);
        assert!(cut.eval(&ctx, rec.view()).is_quiet());
    }

    #[test]
    fn compile_time_rejections() {
        let lit = || Literal::new(Value::int64(1)).boxed();
        let err = Cutter::new(vec![Path::parse("a"), Path::parse("a")], vec![lit(), lit()]);
        assert!(err.err().is_some_and(|e| e.is_duplicate_field()));
        let err = Cutter::new(vec![Path::parse("a"), Path::parse("a.b")], vec![lit(), lit()]);
        assert!(err.err().is_some_and(|e| e.is_conflicting_fields()));
        let err = Cutter::new(vec![Path::parse("a")], vec![]);
        assert!(err.err().is_some_and(|e| e.is_cut_arity()));
        let err = Cutter::new(
            vec![Path::parse("r.x"), Path::parse("b"), Path::parse("r.y")],
            vec![lit(), lit(), lit()],
        );
        assert!(err.err().is_some_and(|e| e.is_zng()));
    }
}
