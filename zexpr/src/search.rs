//! Substring search over the string leaves of a value.
use zng::{TypeContext, Value, ValueRef};

use crate::eval::Evaluator;

/// True when any `string` or `bstring` leaf contains the needle.
/// Case-sensitive; the empty needle matches every value.
pub struct SearchString {
    needle: Vec<u8>,
}

fn is_text(v: &ValueRef<'_>) -> bool {
    v.ty.primitive_kind().is_some_and(|p| p.is_stringy())
}

impl SearchString {
    pub fn new(needle: impl Into<Vec<u8>>) -> Self {
        Self { needle: needle.into() }
    }

    fn contains(&self, haystack: &[u8]) -> bool {
        self.needle.is_empty() || haystack.windows(self.needle.len()).any(|w| w == self.needle.as_slice())
    }

    pub fn matches(&self, this: ValueRef<'_>) -> bool {
        if this.is_error() {
            return false;
        }
        if this.ty.record().is_none() {
            return is_text(&this) && this.bytes.is_some_and(|b| self.contains(b));
        }
        this.fields()
            .filter_map(|leaf| leaf.ok())
            .any(|(_, v)| is_text(&v) && v.bytes.is_some_and(|b| self.contains(b)))
    }
}

impl Evaluator for SearchString {
    fn eval(&mut self, _ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        Value::bool(self.matches(this))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    #[test]
    fn searches_nested_string_leaves() {
        let ctx = TypeContext::new();
        let inner = record(&ctx, vec![("msg", Value::bstring(b"disk full"))]);
        let rec = record(&ctx, vec![("n", Value::int64(404)), ("r", inner)]);

        assert!(SearchString::new("full").matches(rec.view()));
        assert!(!SearchString::new("Full").matches(rec.view()));
        assert!(!SearchString::new("404").matches(rec.view()));
        assert!(SearchString::new("").matches(rec.view()));
    }

    #[test]
    fn scalars_and_errors() {
        let ctx = TypeContext::new();
        let mut search = SearchString::new("ell");
        assert_eq!(search.eval(&ctx, Value::string("hello").view()), Value::bool(true));
        assert_eq!(search.eval(&ctx, Value::int64(1).view()), Value::bool(false));
        assert_eq!(search.eval(&ctx, Value::error("hello").view()), Value::bool(false));
    }
}
