use std::collections::HashMap;

use log::trace;
use zcode::{Builder, Iter};
use zng::{
    Path, TypeContext, Value, ValueRef,
    types::{Column, Type},
};

use crate::eval::{Evaluator, malformed};

#[derive(Debug, Clone)]
enum ColumnPlan {
    Keep,
    Drop,
    Nested(Plan),
}

/// What to keep of one record type.
#[derive(Debug, Clone)]
struct Plan {
    ty: Type,
    columns: Vec<ColumnPlan>,
}

/// Outcome of planning a drop over one record type.
#[derive(Debug, Clone)]
enum Outcome {
    /// None of the paths occur in the type.
    Unchanged,
    /// Every column is dropped.
    Empty,
    Plan(Plan),
}

fn plan(ctx: &TypeContext, ty: &Type, drops: &[&[String]]) -> zng::Result<Outcome> {
    let Some(rec) = ty.record() else {
        return Ok(Outcome::Unchanged);
    };
    let mut columns = Vec::with_capacity(rec.len());
    let mut kept = Vec::with_capacity(rec.len());
    let mut changed = false;
    for col in &rec.columns {
        let here: Vec<&[String]> = drops
            .iter()
            .filter(|p| p.first() == Some(&col.name))
            .map(|p| &p[1..])
            .collect();
        if here.iter().any(|rest| rest.is_empty()) {
            columns.push(ColumnPlan::Drop);
            changed = true;
            continue;
        }
        let cp = if here.is_empty() {
            ColumnPlan::Keep
        } else {
            match plan(ctx, &col.ty, &here)? {
                Outcome::Unchanged => ColumnPlan::Keep,
                Outcome::Empty => ColumnPlan::Drop,
                Outcome::Plan(p) => ColumnPlan::Nested(p),
            }
        };
        match &cp {
            ColumnPlan::Keep => kept.push(col.clone()),
            ColumnPlan::Nested(p) => kept.push(Column::new(col.name.clone(), p.ty.clone())),
            ColumnPlan::Drop => {}
        }
        changed |= !matches!(cp, ColumnPlan::Keep);
        columns.push(cp);
    }
    if !changed {
        return Ok(Outcome::Unchanged);
    }
    if kept.is_empty() {
        return Ok(Outcome::Empty);
    }
    let ty = ctx.lookup_type_record(kept)?;
    Ok(Outcome::Plan(Plan { ty, columns }))
}

fn apply(plan: &Plan, body: &[u8], b: &mut Builder) -> zcode::Result<()> {
    let mut it = Iter::new(body);
    for cp in &plan.columns {
        let item = it.next_item()?;
        match cp {
            ColumnPlan::Keep => b.append(item.body, item.container),
            ColumnPlan::Drop => {}
            ColumnPlan::Nested(nested) => match item.body {
                // An unset nested record stays unset under its new type.
                None => b.append(None, true),
                Some(inner) => {
                    b.begin_container();
                    apply(nested, inner, b)?;
                    b.end_container();
                }
            },
        }
    }
    Ok(())
}

/// Removes fields, recursing into nested records. A nested record left
/// with no fields is removed too, and a record left with no fields at all
/// becomes `quiet`.
pub struct Dropper {
    paths: Vec<Path>,
    plans: HashMap<Type, Outcome>,
    builder: Builder,
}

impl Dropper {
    pub fn new(paths: Vec<Path>) -> Self {
        Self {
            paths,
            plans: HashMap::new(),
            builder: Builder::new(),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.plans.len()
    }
}

impl Evaluator for Dropper {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        if let Some(v) = super::passthrough(this) {
            return v;
        }
        if !self.plans.contains_key(this.ty) {
            let drops: Vec<&[String]> = self.paths.iter().map(|p| p.names()).collect();
            let outcome = match plan(ctx, this.ty, &drops) {
                Ok(outcome) => outcome,
                Err(err) => return malformed(err),
            };
            trace!("Drop plan for {} added to the cache.", this.ty);
            self.plans.insert(this.ty.clone(), outcome);
        }
        match self.plans.get(this.ty) {
            Some(Outcome::Plan(plan)) => {
                let Some(body) = this.bytes else {
                    return Value::unset(plan.ty.clone());
                };
                self.builder.reset();
                match apply(plan, body, &mut self.builder) {
                    Ok(()) => Value::new(plan.ty.clone(), Some(self.builder.bytes().to_vec())),
                    Err(err) => malformed(err),
                }
            }
            Some(Outcome::Empty) => Value::quiet(),
            _ => this.copy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    fn dropper(paths: &[&str]) -> Dropper {
        Dropper::new(paths.iter().map(|p| Path::parse(p)).collect())
    }

    #[test]
    fn drops_top_level_and_nested_fields() {
        let ctx = TypeContext::new();
        let r = record(&ctx, vec![("x", Value::int64(2)), ("y", Value::int64(3))]);
        let rec = record(&ctx, vec![("a", Value::int64(1)), ("r", r), ("b", Value::string("s"))]);

        let mut d = dropper(&["a", "r.x"]);
        assert_eq!(d.eval(&ctx, rec.view()).to_string(), r#"{r:{y:3},b:"s"}"#);
        assert_eq!(d.cache_len(), 1);

        let mut d = dropper(&["r.x", "r.y"]);
        assert_eq!(d.eval(&ctx, rec.view()).to_string(), r#"{a:1,b:"s"}"#);

        let mut d = dropper(&["nope", "a.b"]);
        assert_eq!(d.eval(&ctx, rec.view()), rec);

        let mut d = dropper(&["a", "r", "b"]);
        assert!(d.eval(&ctx, rec.view()).is_quiet());
    }

    #[test]
    fn unset_nested_records_stay_unset() {
        let ctx = TypeContext::new();
        let r = record(&ctx, vec![("x", Value::int64(2)), ("y", Value::int64(3))]);
        let rec = record(&ctx, vec![("r", Value::unset(r.ty.clone()))]);
        let mut d = dropper(&["r.x"]);
        let out = d.eval(&ctx, rec.view());
        assert_eq!(out.to_string(), "{r:null({y:int64})}");
        out.view().check().unwrap();
    }

    #[test]
    fn non_records_pass_through() {
        let ctx = TypeContext::new();
        let mut d = dropper(&["a"]);
        assert_eq!(d.eval(&ctx, Value::int64(1).view()), Value::int64(1));
        assert!(d.eval(&ctx, Value::missing().view()).is_missing());
    }
}
