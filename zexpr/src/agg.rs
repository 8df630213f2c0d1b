//! Aggregate functions fed one record at a time.
use std::cmp::Ordering;

use strum::{EnumIter, IntoEnumIterator};
use zng::{TypeContext, Value, ValueRef, types::Primitive};

use crate::{
    Error, Result,
    coerce::{coerce, to_float},
    eval::{ArithOp, Evaluator, arith::arith},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum ReducerKind {
    Count,
    Sum,
    Min,
    Max,
    Avg,
    Any,
}

impl ReducerKind {
    pub fn from_str(s: &str) -> Option<Self> {
        ReducerKind::iter().find(|r| r.to_str() == s)
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            ReducerKind::Count => "count",
            ReducerKind::Sum => "sum",
            ReducerKind::Min => "min",
            ReducerKind::Max => "max",
            ReducerKind::Avg => "avg",
            ReducerKind::Any => "any",
        }
    }
}

#[derive(Debug)]
enum State {
    Count(u64),
    Value(Option<Value>),
    Avg { sum: f64, n: u64 },
}

fn is_summable(v: &Value) -> bool {
    v.ty.primitive_kind()
        .is_some_and(|p| p.is_number() || p == Primitive::Duration)
}

/// Runs one reducer over the values an expression yields per record.
///
/// Error values, `missing` and `quiet` included, are skipped, as are unset
/// values. `count` without an expression counts records.
pub struct Aggregator {
    kind: ReducerKind,
    expr: Option<Box<dyn Evaluator>>,
    state: State,
}

impl Aggregator {
    pub fn new(name: &str, expr: Option<Box<dyn Evaluator>>) -> Result<Self> {
        let kind = ReducerKind::from_str(name).ok_or_else(|| Error::UnknownReducer { name: name.to_string() })?;
        let state = match kind {
            ReducerKind::Count => State::Count(0),
            ReducerKind::Avg => State::Avg { sum: 0.0, n: 0 },
            _ => State::Value(None),
        };
        Ok(Self { kind, expr, state })
    }

    pub fn kind(&self) -> ReducerKind {
        self.kind
    }

    pub fn consume(&mut self, ctx: &TypeContext, this: ValueRef<'_>) {
        let v = match self.expr.as_mut() {
            Some(expr) => expr.eval(ctx, this),
            None if self.kind == ReducerKind::Count => {
                if let State::Count(n) = &mut self.state {
                    *n += 1;
                }
                return;
            }
            None => this.copy(),
        };
        if v.is_error() || v.is_unset() {
            return;
        }
        match (&mut self.state, self.kind) {
            (State::Count(n), _) => *n += 1,
            (State::Avg { sum, n }, _) => {
                if let Some(f) = to_float(v.view()).filter(|_| is_summable(&v)) {
                    *sum += f;
                    *n += 1;
                }
            }
            (State::Value(acc), ReducerKind::Sum) => {
                if !is_summable(&v) {
                    return;
                }
                *acc = Some(match acc.take() {
                    // An error total stays put.
                    Some(total) if total.is_error() => total,
                    Some(total) => arith(ArithOp::Add, total.view(), v.view()),
                    None => v,
                });
            }
            (State::Value(acc), ReducerKind::Min | ReducerKind::Max) => {
                let want = if self.kind == ReducerKind::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let replace = match acc.as_ref() {
                    None => true,
                    Some(cur) => coerce(v.view(), cur.view())
                        .ok()
                        .and_then(|c| c.compare())
                        .is_some_and(|ord| ord == want),
                };
                if replace {
                    *acc = Some(v);
                }
            }
            (State::Value(acc), _) => {
                if acc.is_none() {
                    *acc = Some(v);
                }
            }
        }
    }

    /// The aggregate so far. Reducers other than `count` give `null` before
    /// any value has been consumed.
    pub fn result(&self) -> Value {
        match &self.state {
            State::Count(n) => Value::uint64(*n),
            State::Avg { n: 0, .. } => Value::null(),
            State::Avg { sum, n } => Value::float64(sum / *n as f64),
            State::Value(acc) => acc.clone().unwrap_or_else(Value::null),
        }
    }
}
