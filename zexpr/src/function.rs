//! Built-in functions for [`Call`].
//!
//! Each function declares its arity, checked when the call is built, and
//! validates argument kinds when it runs. Wrong kinds yield an
//! `incompatible_types` error value naming the function.
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use zng::{
    ErrorKind, TypeContext, Value, ValueRef,
    types::{Primitive, Type, TypeKind},
};

use crate::{
    Error, Result,
    eval::{Evaluator, incompatible, malformed},
};

type Func = fn(&TypeContext, &[Value]) -> Value;

struct Entry {
    name: &'static str,
    min: usize,
    max: usize,
    /// Receives error-typed arguments instead of short-circuiting on them.
    sees_errors: bool,
    func: Func,
}

const FUNCTIONS: &[Entry] = &[
    Entry { name: "abs", min: 1, max: 1, sees_errors: false, func: abs },
    Entry { name: "ceil", min: 1, max: 1, sees_errors: false, func: ceil },
    Entry { name: "floor", min: 1, max: 1, sees_errors: false, func: floor },
    Entry { name: "from_base64", min: 1, max: 1, sees_errors: false, func: from_base64 },
    Entry { name: "is_err", min: 1, max: 1, sees_errors: true, func: is_err },
    Entry { name: "len", min: 1, max: 1, sees_errors: false, func: len },
    Entry { name: "round", min: 1, max: 1, sees_errors: false, func: round },
    Entry { name: "sqrt", min: 1, max: 1, sees_errors: false, func: sqrt },
    Entry { name: "to_base64", min: 1, max: 1, sees_errors: false, func: to_base64 },
    Entry { name: "to_lower", min: 1, max: 1, sees_errors: false, func: to_lower },
    Entry { name: "to_upper", min: 1, max: 1, sees_errors: false, func: to_upper },
    Entry { name: "trim", min: 1, max: 1, sees_errors: false, func: trim },
    Entry { name: "typeof", min: 1, max: 1, sees_errors: true, func: type_of },
];

fn bad_arg(name: &str, v: &Value) -> Value {
    incompatible(format_args!("{name}: bad argument {v}"))
}

fn prim(v: &Value) -> Option<Primitive> {
    v.ty.primitive_kind()
}

fn abs(_ctx: &TypeContext, args: &[Value]) -> Value {
    let v = &args[0];
    match prim(v) {
        Some(p) if p.is_signed() => match v.as_int() {
            Some(i) => Value::int(p, i.wrapping_abs()),
            None => v.clone(),
        },
        Some(p) if p.is_unsigned() => v.clone(),
        Some(Primitive::Float64) => v.as_float().map_or_else(|| v.clone(), |f| Value::float64(f.abs())),
        _ => bad_arg("abs", v),
    }
}

/// Applies `f` to floats; integers are already whole.
fn rounding(name: &str, v: &Value, f: fn(f64) -> f64) -> Value {
    match prim(v) {
        Some(Primitive::Float64) => v.as_float().map_or_else(|| v.clone(), |x| Value::float64(f(x))),
        Some(p) if p.is_integer() => v.clone(),
        _ => bad_arg(name, v),
    }
}

fn ceil(_ctx: &TypeContext, args: &[Value]) -> Value {
    rounding("ceil", &args[0], f64::ceil)
}

fn floor(_ctx: &TypeContext, args: &[Value]) -> Value {
    rounding("floor", &args[0], f64::floor)
}

fn round(_ctx: &TypeContext, args: &[Value]) -> Value {
    rounding("round", &args[0], f64::round)
}

fn sqrt(_ctx: &TypeContext, args: &[Value]) -> Value {
    let v = &args[0];
    if !prim(v).is_some_and(Primitive::is_number) {
        return bad_arg("sqrt", v);
    }
    match crate::coerce::to_float(v.view()) {
        Some(f) => Value::float64(f.sqrt()),
        None => Value::unset(Type::primitive(Primitive::Float64)),
    }
}

fn len(_ctx: &TypeContext, args: &[Value]) -> Value {
    let v = &args[0];
    let n = match v.ty.under().kind() {
        _ if v.is_unset() => 0,
        TypeKind::Primitive(p) if p.is_stringy() || *p == Primitive::Bytes => {
            v.bytes.as_deref().map_or(0, <[u8]>::len)
        }
        TypeKind::Primitive(Primitive::Null) => 0,
        TypeKind::Array(_) | TypeKind::Set(_) => match v.view().elements() {
            Ok(e) => e.len(),
            Err(err) => return malformed(err),
        },
        TypeKind::Map(_) => match v.view().entries() {
            Ok(e) => e.len(),
            Err(err) => return malformed(err),
        },
        TypeKind::Record(r) => r.len(),
        _ => return bad_arg("len", v),
    };
    Value::int64(n as i64)
}

fn string_fn(name: &str, v: &Value, f: impl FnOnce(&str) -> String) -> Value {
    if !v.ty.is_primitive(Primitive::String) {
        return bad_arg(name, v);
    }
    match v.as_str() {
        Some(s) => Value::string(&f(s)),
        None if v.is_unset() => v.clone(),
        None => malformed(format_args!("{name}: invalid UTF-8")),
    }
}

fn to_lower(_ctx: &TypeContext, args: &[Value]) -> Value {
    string_fn("to_lower", &args[0], str::to_lowercase)
}

fn to_upper(_ctx: &TypeContext, args: &[Value]) -> Value {
    string_fn("to_upper", &args[0], str::to_uppercase)
}

fn trim(_ctx: &TypeContext, args: &[Value]) -> Value {
    string_fn("trim", &args[0], |s| s.trim().to_string())
}

fn type_of(_ctx: &TypeContext, args: &[Value]) -> Value {
    Value::type_value(&args[0].ty)
}

fn is_err(_ctx: &TypeContext, args: &[Value]) -> Value {
    Value::bool(args[0].is_error())
}

fn to_base64(_ctx: &TypeContext, args: &[Value]) -> Value {
    let v = &args[0];
    match prim(v) {
        Some(p) if p.is_stringy() || p == Primitive::Bytes => match v.bytes.as_deref() {
            Some(b) => Value::string(&BASE64.encode(b)),
            None => Value::unset(Type::primitive(Primitive::String)),
        },
        _ => bad_arg("to_base64", v),
    }
}

fn from_base64(_ctx: &TypeContext, args: &[Value]) -> Value {
    let v = &args[0];
    if !prim(v).is_some_and(Primitive::is_stringy) {
        return bad_arg("from_base64", v);
    }
    let Some(b) = v.bytes.as_deref() else {
        return Value::unset(Type::primitive(Primitive::Bytes));
    };
    match BASE64.decode(b) {
        Ok(decoded) => Value::bytes(&decoded),
        Err(err) => Value::error_of(ErrorKind::BadValue, format_args!("from_base64: {err}")),
    }
}

/// A call to a built-in function.
pub struct Call {
    name: &'static str,
    func: Func,
    sees_errors: bool,
    args: Vec<Box<dyn Evaluator>>,
}

impl Call {
    pub fn new(name: &str, args: Vec<Box<dyn Evaluator>>) -> Result<Self> {
        let entry = FUNCTIONS
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::UnknownFunction { name: name.to_string() })?;
        if args.len() < entry.min || args.len() > entry.max {
            return Err(Error::Arity {
                name: name.to_string(),
                min: entry.min,
                max: entry.max,
                got: args.len(),
            });
        }
        Ok(Self {
            name: entry.name,
            func: entry.func,
            sees_errors: entry.sees_errors,
            args,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Names of the built-in functions.
pub fn function_names() -> impl Iterator<Item = &'static str> {
    FUNCTIONS.iter().map(|e| e.name)
}

impl Evaluator for Call {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let mut vals = Vec::with_capacity(self.args.len());
        for arg in &mut self.args {
            let v = arg.eval(ctx, this);
            if v.is_error() && !self.sees_errors {
                return v;
            }
            vals.push(v);
        }
        (self.func)(ctx, &vals)
    }
}
