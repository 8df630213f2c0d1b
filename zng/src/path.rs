//! Dotted field paths.
use std::fmt;

/// A path of field names from the root of a record. The empty path is the
/// record itself and prints as `this`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(pub Vec<String>);

impl Path {
    /// The root path.
    pub fn this() -> Self {
        Self(Vec::new())
    }

    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Split `a.b.c` on dots. `this` and the empty string are the root.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() || s == "this" {
            return Self::this();
        }
        Self(s.split('.').map(String::from).collect())
    }

    pub fn is_this(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn parent(&self) -> Path {
        Path(self.0[..self.0.len().saturating_sub(1)].to_vec())
    }

    pub fn child(&self, name: impl Into<String>) -> Path {
        let mut names = self.0.clone();
        names.push(name.into());
        Path(names)
    }

    /// True if `prefix` equals this path or is one of its ancestors.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// True if `prefix` is an ancestor of this path.
    pub fn has_strict_prefix(&self, prefix: &Path) -> bool {
        self.0.len() > prefix.0.len() && self.has_prefix(prefix)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("this");
        }
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}
