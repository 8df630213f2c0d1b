use std::collections::{HashMap, hash_map::Entry};

use log::trace;
use smallvec::SmallVec;
use zcode::{Builder, Iter};
use zng::{
    Path, TypeContext, Value, ValueRef,
    types::{Column, Type, TypeRecord},
};

use crate::{
    Error, Result,
    eval::{Evaluator, malformed},
};

/// How one output column is produced.
#[derive(Debug, Clone)]
enum Step {
    /// Copy input column `index`.
    FromInput { index: usize, container: bool },
    /// Take the value of clause `index`.
    FromClause(usize),
    /// Build a nested record, reading from input column `input` if the
    /// input has a record there.
    Record { input: Option<usize>, steps: Vec<Step> },
}

struct Rule {
    ty: Type,
    steps: Vec<Step>,
}

/// A clause path relative to the record being planned.
#[derive(Clone, Copy)]
struct Target<'a> {
    names: &'a [String],
    clause: usize,
}

/// Clauses under the column `name`, with that name stripped.
fn under<'a>(targets: &[Target<'a>], name: &str) -> Vec<Target<'a>> {
    targets
        .iter()
        .filter(|t| t.names.len() > 1 && t.names[0] == name)
        .map(|t| Target {
            names: &t.names[1..],
            clause: t.clause,
        })
        .collect()
}

fn derive(
    ctx: &TypeContext,
    rec: Option<&TypeRecord>,
    targets: &[Target<'_>],
    types: &[Type],
) -> zng::Result<(Vec<Column>, Vec<Step>)> {
    let input: &[Column] = rec.map_or(&[], |r| r.columns.as_slice());
    let mut columns = Vec::new();
    let mut steps = Vec::new();
    for (index, col) in input.iter().enumerate() {
        if let Some(t) = targets.iter().find(|t| t.names.len() == 1 && t.names[0] == col.name) {
            columns.push(Column::new(col.name.clone(), types[t.clause].clone()));
            steps.push(Step::FromClause(t.clause));
            continue;
        }
        let nested = under(targets, &col.name);
        if nested.is_empty() {
            columns.push(col.clone());
            steps.push(Step::FromInput {
                index,
                container: col.ty.is_container(),
            });
            continue;
        }
        // A non-record column is replaced by a record of the nested clauses.
        let inner = col.ty.record();
        let (cols, inner_steps) = derive(ctx, inner, &nested, types)?;
        columns.push(Column::new(col.name.clone(), ctx.lookup_type_record(cols)?));
        steps.push(Step::Record {
            input: inner.map(|_| index),
            steps: inner_steps,
        });
    }

    // New fields, in clause order.
    let mut added: Vec<&str> = Vec::new();
    for t in targets {
        let name = t.names[0].as_str();
        if input.iter().any(|c| c.name == name) || added.contains(&name) {
            continue;
        }
        added.push(name);
        if t.names.len() == 1 {
            columns.push(Column::new(name, types[t.clause].clone()));
            steps.push(Step::FromClause(t.clause));
        } else {
            let (cols, inner_steps) = derive(ctx, None, &under(targets, name), types)?;
            columns.push(Column::new(name, ctx.lookup_type_record(cols)?));
            steps.push(Step::Record {
                input: None,
                steps: inner_steps,
            });
        }
    }
    Ok((columns, steps))
}

fn apply(steps: &[Step], body: Option<&[u8]>, vals: &[Value], b: &mut Builder) -> zcode::Result<()> {
    let items = match body {
        Some(body) => Iter::new(body).collect::<zcode::Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    for step in steps {
        match step {
            Step::FromInput { index, container } => {
                let body = items.get(*index).and_then(|item| item.body);
                b.append(body, *container);
            }
            Step::FromClause(k) => {
                let v = &vals[*k];
                b.append(v.bytes.as_deref(), v.ty.is_container());
            }
            Step::Record { input, steps } => {
                let inner = input.and_then(|i| items.get(i)).and_then(|item| item.body);
                b.begin_container();
                apply(steps, inner, vals, b)?;
                b.end_container();
            }
        }
    }
    Ok(())
}

/// Assigns `path := expr` clauses to a record, replacing existing fields in
/// place and appending new ones in clause order.
pub struct Putter {
    paths: Vec<Path>,
    exprs: Vec<Box<dyn Evaluator>>,
    rules: HashMap<(Type, SmallVec<[Type; 4]>), Rule>,
    builder: Builder,
}

impl Putter {
    pub fn new(clauses: Vec<(Path, Box<dyn Evaluator>)>) -> Result<Self> {
        let (paths, exprs): (Vec<Path>, Vec<_>) = clauses.into_iter().unzip();
        for (i, a) in paths.iter().enumerate() {
            if a.is_this() {
                return Err(Error::PutToThis);
            }
            for b in &paths[i + 1..] {
                if a == b {
                    return Err(Error::DuplicateAssignment { field: a.to_string() });
                }
                let (outer, inner) = if b.has_strict_prefix(a) { (a, b) } else { (b, a) };
                if inner.has_strict_prefix(outer) {
                    return Err(Error::NestedAssignment {
                        outer: outer.to_string(),
                        inner: inner.to_string(),
                    });
                }
            }
        }
        Ok(Self {
            paths,
            exprs,
            rules: HashMap::new(),
            builder: Builder::new(),
        })
    }

    /// Number of cached `(input type, clause types)` rules.
    pub fn cache_len(&self) -> usize {
        self.rules.len()
    }

    fn rule(&mut self, ctx: &TypeContext, ty: &Type, vals: &[Value]) -> zng::Result<&Rule> {
        let types: SmallVec<[Type; 4]> = vals.iter().map(|v| v.ty.clone()).collect();
        let entry = match self.rules.entry((ty.clone(), types)) {
            Entry::Occupied(e) => return Ok(&*e.into_mut()),
            Entry::Vacant(e) => e,
        };
        let targets: Vec<Target<'_>> = self
            .paths
            .iter()
            .enumerate()
            .map(|(clause, p)| Target {
                names: p.names(),
                clause,
            })
            .collect();
        let (columns, steps) = derive(ctx, ty.record(), &targets, &entry.key().1)?;
        let out = ctx.lookup_type_record(columns)?;
        trace!("Put rule {ty} -> {out} added to the cache.");
        Ok(&*entry.insert(Rule { ty: out, steps }))
    }
}

impl Evaluator for Putter {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        if this.is_error() {
            return this.copy();
        }
        if this.ty.record().is_none() {
            return super::not_a_record("put", this);
        }
        let vals: Vec<Value> = self.exprs.iter_mut().map(|e| e.eval(ctx, this)).collect();
        let mut builder = std::mem::take(&mut self.builder);
        let out = match self.rule(ctx, this.ty, &vals) {
            Ok(rule) => {
                builder.reset();
                match apply(&rule.steps, this.bytes, &vals, &mut builder) {
                    Ok(()) => Value::new(rule.ty.clone(), Some(builder.bytes().to_vec())),
                    Err(err) => malformed(err),
                }
            }
            Err(err) => malformed(err),
        };
        self.builder = builder;
        out
    }
}

#[cfg(test)]
mod tests {
    use zng::ErrorKind;

    use super::*;
    use crate::{
        eval::{FieldRef, Literal},
        testing::record,
    };

    fn putter(clauses: Vec<(&str, Box<dyn Evaluator>)>) -> Result<Putter> {
        Putter::new(clauses.into_iter().map(|(p, e)| (Path::parse(p), e)).collect())
    }

    fn lit(v: Value) -> Box<dyn Evaluator> {
        Literal::new(v).boxed()
    }

    #[test]
    fn adds_a_nested_field() {
        let ctx = TypeContext::new();
        let rec = record(&ctx, vec![("a", Value::int64(1))]);
        let mut put = putter(vec![("b.c", lit(Value::int64(2)))]).unwrap();
        assert_eq!(put.eval(&ctx, rec.view()).to_string(), "{a:1,b:{c:2}}");
        assert_eq!(put.cache_len(), 1);
        put.eval(&ctx, rec.view());
        assert_eq!(put.cache_len(), 1);
    }

    #[test]
    fn replaces_in_place_and_appends_in_clause_order() {
        let ctx = TypeContext::new();
        let r = record(&ctx, vec![("x", Value::int64(1)), ("y", Value::int64(2))]);
        let rec = record(&ctx, vec![("a", Value::int64(1)), ("r", r)]);
        let mut put = putter(vec![
            ("z", lit(Value::string("new"))),
            ("r.y", FieldRef::parse("a").boxed()),
            ("a", lit(Value::string("s"))),
            ("r.w", lit(Value::bool(true))),
        ])
        .unwrap();
        let out = put.eval(&ctx, rec.view());
        out.view().check().unwrap();
        assert_eq!(out.to_string(), r#"{a:"s",r:{x:1,y:1,w:true},z:"new"}"#);
    }

    #[test]
    fn overwrites_a_non_record_with_a_record() {
        let ctx = TypeContext::new();
        let rec = record(&ctx, vec![("a", Value::int64(1))]);
        let mut put = putter(vec![("a.b", lit(Value::int64(2)))]).unwrap();
        assert_eq!(put.eval(&ctx, rec.view()).to_string(), "{a:{b:2}}");
    }

    #[test]
    fn cache_tracks_clause_types() {
        let ctx = TypeContext::new();
        let one = record(&ctx, vec![("a", Value::int64(1))]);
        let two = record(&ctx, vec![("a", Value::string("x"))]);
        let mut put = putter(vec![("b", FieldRef::parse("a").boxed())]).unwrap();
        put.eval(&ctx, one.view());
        put.eval(&ctx, two.view());
        assert_eq!(put.cache_len(), 2);
    }

    #[test]
    fn rejections() {
        assert!(putter(vec![("this", lit(Value::int64(1)))]).err().is_some_and(|e| e.is_put_to_this()));
        assert!(
            putter(vec![("a", lit(Value::int64(1))), ("a", lit(Value::int64(2)))])
                .err()
                .is_some_and(|e| e.is_duplicate_assignment())
        );
        assert!(
            putter(vec![("a.b", lit(Value::int64(1))), ("a", lit(Value::int64(2)))])
                .err()
                .is_some_and(|e| e.is_nested_assignment())
        );

        let ctx = TypeContext::new();
        let mut put = putter(vec![("a", lit(Value::int64(1)))]).unwrap();
        assert_eq!(put.eval(&ctx, Value::int64(1).view()).error_kind(), Some(ErrorKind::NotContainer));
        assert!(put.eval(&ctx, Value::missing().view()).is_missing());
    }
}
