//! Depth-first traversal of record leaves.
use zcode::Iter;

use crate::{Result, ValueRef, types::TypeRecord};

struct Frame<'a> {
    rec: &'a TypeRecord,
    iter: Iter<'a>,
    col: usize,
}

/// Yields every leaf of a record together with the names leading to it.
///
/// Nested records are descended into; arrays, sets, maps and unions are
/// leaves. An unset or empty nested record is yielded as a leaf. Iterating a
/// value that is not a set record yields nothing.
pub struct FieldIter<'a> {
    stack: Vec<Frame<'a>>,
    /// One name per open nested record.
    names: Vec<&'a str>,
}

impl<'a> FieldIter<'a> {
    pub fn new(val: ValueRef<'a>) -> Self {
        let mut stack = Vec::new();
        if let (Some(rec), Some(body)) = (val.ty.record(), val.bytes) {
            stack.push(Frame {
                rec,
                iter: Iter::new(body),
                col: 0,
            });
        }
        Self {
            stack,
            names: Vec::new(),
        }
    }
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = Result<(Vec<&'a str>, ValueRef<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let rec = frame.rec;
            if frame.col >= rec.columns.len() || frame.iter.done() {
                self.stack.pop();
                if !self.stack.is_empty() {
                    self.names.pop();
                }
                continue;
            }
            let item = match frame.iter.next_item() {
                Ok(item) => item,
                Err(err) => {
                    self.stack.clear();
                    return Some(Err(err.into()));
                }
            };
            let col = &rec.columns[frame.col];
            frame.col += 1;

            if let (Some(nested), Some(body)) = (col.ty.record(), item.body) {
                if !nested.is_empty() {
                    self.names.push(&col.name);
                    self.stack.push(Frame {
                        rec: nested,
                        iter: Iter::new(body),
                        col: 0,
                    });
                    continue;
                }
            }
            let mut path = self.names.clone();
            path.push(&col.name);
            return Some(Ok((path, ValueRef::new(&col.ty, item.body))));
        }
    }
}

impl<'a> ValueRef<'a> {
    /// Leaves of this record, depth first.
    pub fn fields(&self) -> FieldIter<'a> {
        FieldIter::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use zcode::codec;

    use super::*;
    use crate::{
        TypeContext, Value,
        types::{Column, Primitive, Type},
    };

    #[test]
    fn walks_nested_records_depth_first() {
        let ctx = TypeContext::new();
        let int64 = Type::primitive(Primitive::Int64);
        let inner = ctx
            .lookup_type_record(vec![Column::new("c", int64.clone()), Column::new("d", int64.clone())])
            .unwrap();
        let arr = ctx.lookup_type_array(inner.clone());
        let rt = ctx
            .lookup_type_record(vec![
                Column::new("a", int64),
                Column::new("b", inner.clone()),
                Column::new("e", arr),
                Column::new("f", inner),
            ])
            .unwrap();
        let mut b = zcode::Builder::new();
        b.append_primitive(Some(&codec::encode_int(1)));
        b.begin_container();
        b.append_primitive(Some(&codec::encode_int(2)));
        b.append_primitive(None);
        b.end_container();
        b.begin_container();
        b.end_container();
        b.append_container(None);
        let rec = Value::new(rt, Some(b.into_bytes()));

        let leaves: Vec<_> = rec
            .view()
            .fields()
            .map(|r| {
                let (path, v) = r.unwrap();
                format!("{}={}", path.join("."), v)
            })
            .collect();
        assert_eq!(
            leaves,
            vec![
                "a=1",
                "b.c=2",
                "b.d=null(int64)",
                "e=[]",
                "f=null({c:int64,d:int64})"
            ]
        );
    }

    #[test]
    fn non_records_yield_nothing() {
        assert_eq!(Value::int64(3).view().fields().count(), 0);
    }
}
