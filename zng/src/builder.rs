//! Record construction.
//!
//! [`RecordBuilder`] fills a record of a known type one column at a time.
//! [`ColumnBuilder`] turns a flat list of dotted paths into a nested
//! record: it precomputes, for every leaf, which records open before it and
//! how many close after it, so appending leaves in order produces the
//! nested body directly.
use std::collections::HashSet;

use crate::{
    Error, Path, Result, TypeContext, Value, ValueRef,
    types::{Column, Type},
};

/// Builds records of one fixed record type, reusing its buffer.
pub struct RecordBuilder {
    ty: Type,
    builder: zcode::Builder,
    appended: usize,
}

impl RecordBuilder {
    pub fn new(ty: Type) -> Result<Self> {
        if ty.record().is_none() {
            return Err(Error::NotARecord { ty: ty.to_string() });
        }
        Ok(Self {
            ty,
            builder: zcode::Builder::new(),
            appended: 0,
        })
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn reset(&mut self) {
        self.builder.reset();
        self.appended = 0;
    }

    /// Append the next column's body.
    pub fn append(&mut self, body: Option<&[u8]>, container: bool) {
        self.builder.append(body, container);
        self.appended += 1;
    }

    pub fn append_value(&mut self, val: ValueRef<'_>) {
        self.append(val.bytes, val.ty.is_container());
    }

    /// Finish the current record and reset for the next one.
    pub fn build(&mut self) -> Result<Value> {
        let expected = self.ty.record().map_or(0, |r| r.len());
        if self.appended != expected {
            let got = self.appended;
            self.reset();
            return Err(Error::IncompleteRecord { expected, got });
        }
        let val = Value::new(self.ty.clone(), Some(self.builder.bytes().to_vec()));
        self.reset();
        Ok(val)
    }
}

#[derive(Debug, Clone)]
struct FieldInfo {
    name: String,
    /// Records opened before this leaf, outermost first.
    begins: Vec<String>,
    /// Records closed after this leaf.
    ends: usize,
}

/// Builds a nested record body from leaves given as dotted paths.
///
/// Leaves that share a record must be adjacent, so `a.x, b, a.y` is
/// rejected while `a.x, a.y, b` is accepted.
#[derive(Debug, Clone)]
pub struct ColumnBuilder {
    fields: Vec<FieldInfo>,
    paths: Vec<Path>,
    builder: zcode::Builder,
    cursor: usize,
}

impl ColumnBuilder {
    pub fn new(paths: &[Path]) -> Result<Self> {
        for (i, a) in paths.iter().enumerate() {
            if a.is_empty() {
                return Err(Error::EmptyPath);
            }
            for b in &paths[i + 1..] {
                if a == b || a.has_strict_prefix(b) || b.has_strict_prefix(a) {
                    return Err(Error::DuplicateField { name: b.to_string() });
                }
            }
        }

        let mut seen: HashSet<Path> = HashSet::new();
        let mut current: Vec<String> = Vec::new();
        let mut fields: Vec<FieldInfo> = Vec::with_capacity(paths.len());
        for path in paths {
            let names = path.names();
            let records = &names[..names.len() - 1];
            let common = current
                .iter()
                .zip(records)
                .take_while(|(a, b)| a == b)
                .count();
            if let Some(prev) = fields.last_mut() {
                prev.ends = current.len() - common;
            }
            current.truncate(common);
            let mut begins = Vec::new();
            for name in &records[common..] {
                current.push(name.clone());
                if !seen.insert(Path(current.clone())) {
                    return Err(Error::NonAdjacentFields {
                        record: Path(current).to_string(),
                    });
                }
                begins.push(name.clone());
            }
            fields.push(FieldInfo {
                name: names[names.len() - 1].clone(),
                begins,
                ends: 0,
            });
        }
        if let Some(last) = fields.last_mut() {
            last.ends = current.len();
        }

        Ok(Self {
            fields,
            paths: paths.to_vec(),
            builder: zcode::Builder::new(),
            cursor: 0,
        })
    }

    /// The leaf paths, in append order.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn reset(&mut self) {
        self.builder.reset();
        self.cursor = 0;
    }

    /// Append the next leaf. Leaves beyond the last path are counted but
    /// not written, and make [`encode`](Self::encode) fail.
    pub fn append(&mut self, body: Option<&[u8]>, container: bool) {
        if let Some(info) = self.fields.get(self.cursor) {
            for _ in &info.begins {
                self.builder.begin_container();
            }
            self.builder.append(body, container);
            for _ in 0..info.ends {
                self.builder.end_container();
            }
        }
        self.cursor += 1;
    }

    pub fn append_value(&mut self, val: ValueRef<'_>) {
        self.append(val.bytes, val.ty.is_container());
    }

    /// The nested record body built so far. Every leaf must have been
    /// appended exactly once.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.cursor != self.fields.len() {
            return Err(Error::IncompleteRecord {
                expected: self.fields.len(),
                got: self.cursor,
            });
        }
        Ok(self.builder.bytes().to_vec())
    }

    /// Nest `types`, given per leaf, into the record columns this builder
    /// produces.
    pub fn typed_columns(&self, ctx: &TypeContext, types: &[Type]) -> Result<Vec<Column>> {
        if types.len() != self.fields.len() {
            return Err(Error::IncompleteRecord {
                expected: self.fields.len(),
                got: types.len(),
            });
        }
        let mut stack: Vec<(String, Vec<Column>)> = vec![(String::new(), Vec::new())];
        for (info, ty) in self.fields.iter().zip(types) {
            for name in &info.begins {
                stack.push((name.clone(), Vec::new()));
            }
            if let Some((_, cols)) = stack.last_mut() {
                cols.push(Column::new(info.name.clone(), ty.clone()));
            }
            for _ in 0..info.ends {
                let Some((name, cols)) = stack.pop() else { break };
                let rec = ctx.lookup_type_record(cols)?;
                if let Some((_, parent)) = stack.last_mut() {
                    parent.push(Column::new(name, rec));
                }
            }
        }
        Ok(stack.pop().map(|(_, cols)| cols).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use zcode::codec;

    use super::*;
    use crate::types::Primitive;

    fn paths(names: &[&str]) -> Vec<Path> {
        names.iter().map(|s| Path::parse(s)).collect()
    }

    #[test]
    fn record_builder_is_reusable() {
        let ctx = TypeContext::new();
        let rt = ctx
            .lookup_type_record(vec![
                Column::new("a", Type::primitive(Primitive::Int64)),
                Column::new("b", Type::primitive(Primitive::String)),
            ])
            .unwrap();
        let mut b = RecordBuilder::new(rt).unwrap();
        for i in 0..2 {
            b.append(Some(&codec::encode_int(i)), false);
            b.append_value(Value::string("x").view());
            assert_eq!(b.build().unwrap().to_string(), format!(r#"{{a:{i},b:"x"}}"#));
        }
        b.append(None, false);
        assert!(b.build().unwrap_err().is_incomplete_record());
        assert!(RecordBuilder::new(Type::primitive(Primitive::Int64)).is_err());
    }

    #[test]
    fn column_builder_nests_adjacent_paths() {
        let ctx = TypeContext::new();
        let mut cb = ColumnBuilder::new(&paths(&["a", "r.x", "r.s.y", "r.z", "b"])).unwrap();
        for i in 1..=5 {
            cb.append(Some(&codec::encode_int(i)), false);
        }
        let body = cb.encode().unwrap();
        let int64 = Type::primitive(Primitive::Int64);
        let cols = cb.typed_columns(&ctx, &vec![int64; 5]).unwrap();
        let rt = ctx.lookup_type_record(cols).unwrap();
        assert_eq!(rt.to_string(), "{a:int64,r:{x:int64,s:{y:int64},z:int64},b:int64}");
        let rec = Value::new(rt, Some(body));
        assert_eq!(rec.to_string(), "{a:1,r:{x:2,s:{y:3},z:4},b:5}");
        rec.view().check().unwrap();

        cb.reset();
        cb.append(None, false);
        assert!(cb.encode().unwrap_err().is_incomplete_record());
    }

    #[test]
    fn column_builder_closes_trailing_records() {
        let ctx = TypeContext::new();
        let mut cb = ColumnBuilder::new(&paths(&["r.s.x", "t.y"])).unwrap();
        cb.append(Some(&codec::encode_int(1)), false);
        cb.append(Some(&codec::encode_int(2)), false);
        let int64 = Type::primitive(Primitive::Int64);
        let rt = ctx
            .lookup_type_record(cb.typed_columns(&ctx, &[int64.clone(), int64]).unwrap())
            .unwrap();
        let rec = Value::new(rt, Some(cb.encode().unwrap()));
        assert_eq!(rec.to_string(), "{r:{s:{x:1}},t:{y:2}}");
    }

    #[test]
    fn column_builder_rejections() {
        assert!(ColumnBuilder::new(&paths(&["a.x", "b", "a.y"]))
            .unwrap_err()
            .is_non_adjacent_fields());
        assert!(ColumnBuilder::new(&paths(&["a", "a"])).unwrap_err().is_duplicate_field());
        assert!(ColumnBuilder::new(&paths(&["a", "a.b"])).unwrap_err().is_duplicate_field());
        assert!(ColumnBuilder::new(&[Path::this()]).unwrap_err().is_empty_path());
    }
}
