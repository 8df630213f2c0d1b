//! Boolean nodes and the filter boundary.
use zng::{TypeContext, Value, ValueRef, types::Primitive};

use super::{Evaluator, incompatible};

/// Outcome of a boolean operand.
enum Truth {
    True,
    False,
    Missing,
    Fail(Value),
}

fn truth(op: &str, v: Value) -> Truth {
    if v.is_missing() || v.is_quiet() {
        return Truth::Missing;
    }
    if v.is_error() {
        return Truth::Fail(v);
    }
    if !v.ty.is_primitive(Primitive::Bool) {
        return Truth::Fail(incompatible(format_args!("{op}: bool operand required, found {v}")));
    }
    // Unset booleans are false.
    match v.as_bool() {
        Some(true) => Truth::True,
        _ => Truth::False,
    }
}

/// Logical negation. An unset operand stays unset.
pub struct Not(Box<dyn Evaluator>);

impl Not {
    pub fn new(expr: Box<dyn Evaluator>) -> Self {
        Self(expr)
    }
}

impl Evaluator for Not {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let v = self.0.eval(ctx, this);
        if v.is_error() {
            return v;
        }
        if !v.ty.is_primitive(Primitive::Bool) {
            return incompatible(format_args!("!: bool operand required, found {v}"));
        }
        match v.as_bool() {
            Some(b) => Value::bool(!b),
            None => v,
        }
    }
}

/// Short-circuit conjunction.
///
/// `false` on either side decides the result even when the other side is
/// missing; otherwise a missing operand makes the result missing.
pub struct And {
    lhs: Box<dyn Evaluator>,
    rhs: Box<dyn Evaluator>,
}

impl And {
    pub fn new(lhs: Box<dyn Evaluator>, rhs: Box<dyn Evaluator>) -> Self {
        Self { lhs, rhs }
    }
}

impl Evaluator for And {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let lhs = match truth("and", self.lhs.eval(ctx, this)) {
            Truth::False => return Value::bool(false),
            Truth::Fail(err) => return err,
            lhs => lhs,
        };
        match truth("and", self.rhs.eval(ctx, this)) {
            Truth::False => Value::bool(false),
            Truth::Fail(err) => err,
            Truth::True if matches!(lhs, Truth::True) => Value::bool(true),
            _ => Value::missing(),
        }
    }
}

/// Short-circuit disjunction, the dual of [`And`].
pub struct Or {
    lhs: Box<dyn Evaluator>,
    rhs: Box<dyn Evaluator>,
}

impl Or {
    pub fn new(lhs: Box<dyn Evaluator>, rhs: Box<dyn Evaluator>) -> Self {
        Self { lhs, rhs }
    }
}

impl Evaluator for Or {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let lhs = match truth("or", self.lhs.eval(ctx, this)) {
            Truth::True => return Value::bool(true),
            Truth::Fail(err) => return err,
            lhs => lhs,
        };
        match truth("or", self.rhs.eval(ctx, this)) {
            Truth::True => Value::bool(true),
            Truth::Fail(err) => err,
            Truth::False if matches!(lhs, Truth::False) => Value::bool(false),
            _ => Value::missing(),
        }
    }
}

/// A predicate that never yields an error: anything other than `true`,
/// including `missing` and other error values, reads as `false`.
pub struct Filter(Box<dyn Evaluator>);

impl Filter {
    pub fn new(pred: Box<dyn Evaluator>) -> Self {
        Self(pred)
    }

    pub fn matches(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> bool {
        let v = self.0.eval(ctx, this);
        v.ty.is_primitive(Primitive::Bool) && v.as_bool() == Some(true)
    }
}

impl Evaluator for Filter {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        Value::bool(self.matches(ctx, this))
    }
}
