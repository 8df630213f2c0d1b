use std::collections::HashMap;

use log::trace;
use zng::{ErrorKind, Path, TypeContext, Value, ValueRef, types::Type};

use crate::{
    Error, Result,
    eval::{Evaluator, malformed},
};

/// Renames fields in place. Only the record type changes; bodies are
/// shared with the input.
pub struct Renamer {
    srcs: Vec<Path>,
    dsts: Vec<Path>,
    types: HashMap<Type, std::result::Result<Type, Value>>,
}

impl Renamer {
    /// Each `src` and `dst` must share a parent and differ in the last name.
    pub fn new(srcs: Vec<Path>, dsts: Vec<Path>) -> Result<Self> {
        if srcs.len() != dsts.len() {
            return Err(Error::RenameArity {
                srcs: srcs.len(),
                dsts: dsts.len(),
            });
        }
        for (src, dst) in srcs.iter().zip(&dsts) {
            if src.is_empty() || src.len() != dst.len() || src.parent() != dst.parent() || src.leaf() == dst.leaf() {
                return Err(Error::RenameAcrossParents {
                    src: src.to_string(),
                    dst: dst.to_string(),
                });
            }
        }
        Ok(Self {
            srcs,
            dsts,
            types: HashMap::new(),
        })
    }

    fn rename(ctx: &TypeContext, ty: &Type, src: &[String], dst: &str) -> std::result::Result<Type, Value> {
        let Some(rec) = ty.record() else {
            return Ok(ty.clone());
        };
        let Some(i) = rec.column_of_field(&src[0]) else {
            return Ok(ty.clone());
        };
        let mut columns = rec.columns.clone();
        if src.len() == 1 {
            if rec.has_field(dst) {
                return Err(Value::error_of(
                    ErrorKind::DuplicateField,
                    format_args!("rename: {dst} already exists in {ty}"),
                ));
            }
            columns[i].name = dst.to_string();
        } else {
            columns[i].ty = Self::rename(ctx, &columns[i].ty, &src[1..], dst)?;
        }
        ctx.lookup_type_record(columns).map_err(malformed)
    }

    fn output_type(&mut self, ctx: &TypeContext, ty: &Type) -> std::result::Result<Type, Value> {
        if let Some(out) = self.types.get(ty) {
            return out.clone();
        }
        let mut out = Ok(ty.clone());
        for (src, dst) in self.srcs.iter().zip(&self.dsts) {
            let leaf = dst.leaf().unwrap_or_default();
            out = out.and_then(|t| Self::rename(ctx, &t, src.names(), leaf));
        }
        trace!("Rename output type for {ty} added to the cache.");
        self.types.insert(ty.clone(), out.clone());
        out
    }
}

impl Evaluator for Renamer {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        if let Some(v) = super::passthrough(this) {
            return v;
        }
        match self.output_type(ctx, this.ty) {
            Ok(ty) => Value::new(ty, this.bytes.map(<[u8]>::to_vec)),
            Err(err) => err,
        }
    }
}
