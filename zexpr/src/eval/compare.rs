//! Comparison, membership and pattern matching.
use std::cmp::Ordering;

use either::Either;
use regex::bytes::Regex;
use strum::{EnumIter, IntoEnumIterator};
use zng::{ErrorKind, TypeContext, Value, ValueRef, types::TypeKind};

use super::{Evaluator, incompatible, malformed};
use crate::{
    Error, Result,
    coerce::{CoerceError, coerce, deunion},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn from_str(s: &str) -> Option<Self> {
        CompareOp::iter().find(|op| op.to_str() == s)
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s).ok_or_else(|| Error::UnknownOperator { op: s.to_string() })
    }

    pub fn is_relational(&self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    fn holds(&self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord.is_eq(),
            CompareOp::Ne => ord.is_ne(),
            CompareOp::Lt => ord.is_lt(),
            CompareOp::Le => ord.is_le(),
            CompareOp::Gt => ord.is_gt(),
            CompareOp::Ge => ord.is_ge(),
        }
    }
}

/// Compare two values under `op`.
///
/// Equality across incompatible kinds is `false` (`true` for `!=`) rather
/// than an error. Relational operators return `false` when either side is
/// unset or NaN.
pub fn compare_values(op: CompareOp, lhs: ValueRef<'_>, rhs: ValueRef<'_>) -> Value {
    match coerce(lhs, rhs) {
        Ok(c) => Value::bool(match op {
            CompareOp::Eq => c.equal(),
            CompareOp::Ne => !c.equal(),
            op => c.compare().is_some_and(|ord| op.holds(ord)),
        }),
        Err(CoerceError::Overflow { signed_lhs }) => {
            // A negative signed operand against an unsigned one above
            // i64::MAX: the signed side is the smaller.
            let ord = if signed_lhs { Ordering::Less } else { Ordering::Greater };
            Value::bool(op.holds(ord))
        }
        Err(CoerceError::Incompatible) => match op {
            CompareOp::Eq => Value::bool(false),
            CompareOp::Ne => Value::bool(true),
            op => incompatible(format_args!("{} {} {}", lhs.ty, op.to_str(), rhs.ty)),
        },
        Err(CoerceError::Malformed) => malformed(format_args!("{lhs} {} {rhs}", op.to_str())),
    }
}

/// `lhs <op> rhs`.
pub struct Compare {
    op: CompareOp,
    lhs: Box<dyn Evaluator>,
    rhs: Box<dyn Evaluator>,
}

impl Compare {
    pub fn new(op: CompareOp, lhs: Box<dyn Evaluator>, rhs: Box<dyn Evaluator>) -> Self {
        Self { op, lhs, rhs }
    }
}

impl Evaluator for Compare {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let lhs = self.lhs.eval(ctx, this);
        if lhs.is_error() {
            return lhs;
        }
        let rhs = self.rhs.eval(ctx, this);
        if rhs.is_error() {
            return rhs;
        }
        compare_values(self.op, lhs.view(), rhs.view())
    }
}

/// `elem in container`.
///
/// Arrays and sets match any element equal to `elem`, maps any key or
/// value, and a `net` matches the IP addresses it contains.
pub struct In {
    elem: Box<dyn Evaluator>,
    container: Box<dyn Evaluator>,
}

impl In {
    pub fn new(elem: Box<dyn Evaluator>, container: Box<dyn Evaluator>) -> Self {
        Self { elem, container }
    }
}

fn equal(a: ValueRef<'_>, b: ValueRef<'_>) -> bool {
    coerce(a, b).is_ok_and(|c| c.equal())
}

/// Membership of `elem` in `container`.
pub fn contains(elem: ValueRef<'_>, container: ValueRef<'_>) -> Value {
    let container = deunion(container);
    let items = match container.ty.under().kind() {
        TypeKind::Array(_) | TypeKind::Set(_) => container.elements().map(|e| Either::Left(e.into_iter())),
        TypeKind::Map(_) => container
            .entries()
            .map(|e| Either::Right(e.into_iter().flat_map(|(k, v)| [k, v]))),
        TypeKind::Primitive(zng::types::Primitive::Net) => {
            let Some(net) = container.as_net() else {
                return Value::bool(false);
            };
            return match deunion(elem).as_ip() {
                Some(ip) => Value::bool(net.contains(ip)),
                None => incompatible(format_args!("in: {elem} is not an IP address")),
            };
        }
        _ => {
            return Value::error_of(
                ErrorKind::NotContainer,
                format_args!("in: cannot search {}", container.ty),
            );
        }
    };
    match items {
        Ok(mut items) => Value::bool(items.any(|item| equal(elem, item))),
        Err(err) => malformed(err),
    }
}

impl Evaluator for In {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let elem = self.elem.eval(ctx, this);
        if elem.is_error() {
            return elem;
        }
        let container = self.container.eval(ctx, this);
        if container.is_error() {
            return container;
        }
        contains(elem.view(), container.view())
    }
}

/// Matches `string` and `bstring` values against a regular expression
/// compiled once at construction. Other values do not match.
pub struct RegexpMatch {
    re: Regex,
    expr: Box<dyn Evaluator>,
}

impl std::fmt::Debug for RegexpMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexpMatch").field("re", &self.re).finish_non_exhaustive()
    }
}

impl RegexpMatch {
    pub fn new(pattern: &str, expr: Box<dyn Evaluator>) -> Result<Self> {
        let re = Regex::new(pattern).map_err(|source| Error::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { re, expr })
    }
}

impl Evaluator for RegexpMatch {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        let v = self.expr.eval(ctx, this);
        if v.is_error() {
            return v;
        }
        let stringy = v.ty.primitive_kind().is_some_and(|p| p.is_stringy());
        Value::bool(stringy && v.bytes.as_deref().is_some_and(|b| self.re.is_match(b)))
    }
}

#[cfg(test)]
mod tests {
    use zcode::codec::Net;
    use zng::types::{Primitive, Type};

    use super::*;
    use crate::{
        eval::{FieldRef, Literal, This},
        testing::{collection, record},
    };

    fn cmp(op: &str, a: Value, b: Value) -> Value {
        compare_values(CompareOp::parse(op).unwrap(), a.view(), b.view())
    }

    #[test]
    fn operators_parse() {
        assert_eq!(CompareOp::from_str("<="), Some(CompareOp::Le));
        assert_eq!(CompareOp::Ne.to_str(), "!=");
        assert!(CompareOp::parse("=~").unwrap_err().is_unknown_operator());
    }

    #[test]
    fn numeric_comparisons() {
        let ctx = TypeContext::new();
        let rec = record(
            &ctx,
            vec![("x", Value::int(Primitive::Int32, 10)), ("f", Value::float64(2.5))],
        );
        let mut gt = Compare::new(
            CompareOp::Gt,
            FieldRef::parse("x").boxed(),
            Literal::new(Value::int64(5)).boxed(),
        );
        assert_eq!(gt.eval(&ctx, rec.view()), Value::bool(true));
        let mut lt = Compare::new(CompareOp::Lt, FieldRef::parse("f").boxed(), FieldRef::parse("x").boxed());
        assert_eq!(lt.eval(&ctx, rec.view()), Value::bool(true));

        assert_eq!(cmp("<", Value::int64(-1), Value::uint64(u64::MAX)), Value::bool(true));
        assert_eq!(cmp("==", Value::int64(-1), Value::uint64(u64::MAX)), Value::bool(false));
        assert_eq!(cmp("!=", Value::int64(-1), Value::uint64(u64::MAX)), Value::bool(true));
        assert_eq!(cmp(">=", Value::uint64(u64::MAX), Value::int64(-1)), Value::bool(true));
        assert_eq!(cmp("<", Value::float64(f64::NAN), Value::float64(1.0)), Value::bool(false));
    }

    #[test]
    fn cross_kind_and_unset() {
        assert_eq!(cmp("==", Value::string("1"), Value::int64(1)), Value::bool(false));
        assert_eq!(cmp("!=", Value::string("1"), Value::int64(1)), Value::bool(true));
        assert_eq!(
            cmp("<", Value::string("1"), Value::int64(1)).error_kind(),
            Some(ErrorKind::IncompatibleTypes)
        );
        assert_eq!(cmp("==", Value::null(), Value::null()), Value::bool(true));
        assert_eq!(cmp("<", Value::null(), Value::int64(1)), Value::bool(false));
        assert_eq!(cmp("<", Value::string("a"), Value::bstring(b"b")), Value::bool(true));
    }

    #[test]
    fn membership() {
        let ctx = TypeContext::new();
        let arr = ctx.lookup_type_array(Type::primitive(Primitive::Int32));
        let arr = collection(arr, &[Value::int(Primitive::Int32, 1), Value::int(Primitive::Int32, 2)]);
        assert_eq!(contains(Value::int64(2).view(), arr.view()), Value::bool(true));
        assert_eq!(contains(Value::float64(3.0).view(), arr.view()), Value::bool(false));
        assert_eq!(contains(Value::string("x").view(), arr.view()), Value::bool(false));

        let map = ctx.lookup_type_map(Type::primitive(Primitive::String), Type::primitive(Primitive::Int64));
        let map = collection(map, &[Value::string("k"), Value::int64(9)]);
        assert_eq!(contains(Value::string("k").view(), map.view()), Value::bool(true));
        assert_eq!(contains(Value::int64(9).view(), map.view()), Value::bool(true));

        let net = |s: &str, bits| Value::net(&Net::from_prefix(s.parse().unwrap(), bits).unwrap());
        let ip = Value::ip("10.1.1.1".parse().unwrap());
        assert_eq!(contains(ip.view(), net("10.0.0.0", 8).view()), Value::bool(true));
        assert_eq!(contains(ip.view(), net("192.168.0.0", 16).view()), Value::bool(false));
        assert_eq!(
            contains(Value::int64(1).view(), net("10.0.0.0", 8).view()).error_kind(),
            Some(ErrorKind::IncompatibleTypes)
        );
        assert_eq!(
            contains(ip.view(), Value::int64(1).view()).error_kind(),
            Some(ErrorKind::NotContainer)
        );
    }

    #[test]
    fn regexp_match() {
        let ctx = TypeContext::new();
        let this = Value::null();
        let mut m = RegexpMatch::new("^a.c$", Literal::new(Value::string("abc")).boxed()).unwrap();
        assert_eq!(m.eval(&ctx, this.view()), Value::bool(true));
        let mut m = RegexpMatch::new("^a", Literal::new(Value::int64(1)).boxed()).unwrap();
        assert_eq!(m.eval(&ctx, this.view()), Value::bool(false));
        let mut m = RegexpMatch::new("^a", FieldRef::parse("x").boxed()).unwrap();
        assert!(m.eval(&ctx, this.view()).is_missing());
        assert!(RegexpMatch::new("(", This.boxed()).unwrap_err().is_invalid_regex());
    }
}
