use std::collections::HashMap;

use bitflags::bitflags;
use log::trace;
use zcode::{Builder, Iter, codec};
use zng::{
    TypeContext, Value, ValueRef,
    types::{Column, Primitive, Type, TypeKind, TypeRecord},
};

use crate::{
    Error, Result,
    cast::{Caster, lookup_primitive_caster},
    eval::{Evaluator, malformed},
};

bitflags! {
    /// Steps a [`Shaper`] applies to move a record toward its target type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaperTransform: u8 {
        /// Cast primitive leaves to the target's leaf types.
        const CAST = 1 << 0;
        /// Drop fields the target does not have.
        const CROP = 1 << 1;
        /// Add target fields the input lacks, as unset values.
        const FILL = 1 << 2;
        /// Put fields in target order. Extra input fields go last.
        const ORDER = 1 << 3;
    }
}

#[derive(Debug, Clone)]
enum Op {
    Copy,
    Cast(Caster),
    Record(Vec<Step>),
    /// Wrap the input as member `selector` of a union.
    Union { selector: usize },
    /// Shape each element of an array or set.
    Elements {
        elem: Type,
        op: Box<Op>,
        container: bool,
        set: bool,
    },
}

/// One output column of a record program.
#[derive(Debug, Clone)]
struct Step {
    /// Input column index, or `None` for a filled column.
    input: Option<usize>,
    /// Type of the input column (the target type for filled columns).
    ty: Type,
    op: Op,
    container: bool,
}

struct Program {
    ty: Type,
    op: Op,
}

fn derive_value(ctx: &TypeContext, input: &Type, target: &Type, tf: ShaperTransform) -> zng::Result<(Type, Op)> {
    if input == target {
        return Ok((input.clone(), Op::Copy));
    }
    if let (Some(i), Some(t)) = (input.record(), target.record()) {
        return derive_record(ctx, input, i, t, tf);
    }
    if !tf.contains(ShaperTransform::CAST) {
        return Ok((input.clone(), Op::Copy));
    }
    if let (Some(from), Some(to)) = (input.primitive_kind(), target.primitive_kind()) {
        if from != Primitive::Error {
            if let Some(caster) = lookup_primitive_caster(to) {
                return Ok((target.clone(), Op::Cast(caster)));
            }
        }
    }
    if let Some(selector) = target.union().and_then(|u| u.selector_of(input)) {
        return Ok((target.clone(), Op::Union { selector }));
    }
    match (input.under().kind(), target.under().kind()) {
        (TypeKind::Array(a), TypeKind::Array(b)) => {
            let (elem, op) = derive_value(ctx, a, b, tf)?;
            let ty = ctx.lookup_type_array(elem.clone());
            Ok((ty, elements(a, &elem, op, false)))
        }
        (TypeKind::Set(a), TypeKind::Set(b)) => {
            let (elem, op) = derive_value(ctx, a, b, tf)?;
            let ty = ctx.lookup_type_set(elem.clone())?;
            Ok((ty, elements(a, &elem, op, true)))
        }
        _ => Ok((input.clone(), Op::Copy)),
    }
}

fn elements(input: &Type, output: &Type, op: Op, set: bool) -> Op {
    Op::Elements {
        elem: input.clone(),
        op: Box::new(op),
        container: output.is_container(),
        set,
    }
}

fn shape_column(
    ctx: &TypeContext,
    index: usize,
    col: &Column,
    target: &TypeRecord,
    tf: ShaperTransform,
) -> zng::Result<(Column, Step)> {
    let (ty, op) = match target.type_of_field(&col.name) {
        Some(t) => derive_value(ctx, &col.ty, t, tf)?,
        None => (col.ty.clone(), Op::Copy),
    };
    let step = Step {
        input: Some(index),
        ty: col.ty.clone(),
        op,
        container: ty.is_container(),
    };
    Ok((Column::new(col.name.clone(), ty), step))
}

fn fill_column(col: &Column) -> (Column, Step) {
    let step = Step {
        input: None,
        ty: col.ty.clone(),
        op: Op::Copy,
        container: col.ty.is_container(),
    };
    (col.clone(), step)
}

fn derive_record(
    ctx: &TypeContext,
    input: &Type,
    rec: &TypeRecord,
    target: &TypeRecord,
    tf: ShaperTransform,
) -> zng::Result<(Type, Op)> {
    let mut out = Vec::new();
    if tf.contains(ShaperTransform::ORDER) {
        for tcol in &target.columns {
            match rec.column_of_field(&tcol.name) {
                Some(index) => out.push(shape_column(ctx, index, &rec.columns[index], target, tf)?),
                None if tf.contains(ShaperTransform::FILL) => out.push(fill_column(tcol)),
                None => {}
            }
        }
        if !tf.contains(ShaperTransform::CROP) {
            for (index, col) in rec.columns.iter().enumerate() {
                if !target.has_field(&col.name) {
                    out.push(shape_column(ctx, index, col, target, tf)?);
                }
            }
        }
    } else {
        for (index, col) in rec.columns.iter().enumerate() {
            if target.has_field(&col.name) || !tf.contains(ShaperTransform::CROP) {
                out.push(shape_column(ctx, index, col, target, tf)?);
            }
        }
        if tf.contains(ShaperTransform::FILL) {
            for tcol in target.columns.iter().filter(|c| !rec.has_field(&c.name)) {
                out.push(fill_column(tcol));
            }
        }
    }

    let (columns, steps): (Vec<Column>, Vec<Step>) = out.into_iter().unzip();
    let ty = ctx.lookup_type_record(columns)?;
    if &ty == input {
        return Ok((ty, Op::Copy));
    }
    Ok((ty, Op::Record(steps)))
}

fn apply(op: &Op, ty: &Type, body: Option<&[u8]>, container: bool, b: &mut Builder) -> std::result::Result<(), Value> {
    match op {
        Op::Copy => b.append(body, container),
        Op::Cast(caster) => {
            let v = caster.cast(ValueRef::new(ty, body));
            if v.is_error() {
                return Err(v);
            }
            b.append(v.bytes.as_deref(), false);
        }
        Op::Union { selector } => match body {
            None => b.append(None, true),
            Some(body) => {
                b.begin_container();
                b.append_primitive(Some(&codec::encode_int(*selector as i64)));
                b.append(Some(body), ty.is_container());
                b.end_container();
            }
        },
        Op::Record(steps) => match body {
            None => b.append(None, true),
            Some(body) => {
                b.begin_container();
                apply_columns(steps, body, b)?;
                b.end_container();
            }
        },
        Op::Elements {
            elem,
            op,
            container,
            set,
        } => match body {
            None => b.append(None, true),
            Some(body) => {
                b.begin_container();
                for item in Iter::new(body) {
                    let item = item.map_err(malformed)?;
                    apply(op, elem, item.body, *container, b)?;
                }
                if *set {
                    b.normalize_set().map_err(malformed)?;
                }
                b.end_container();
            }
        },
    }
    Ok(())
}

fn apply_columns(steps: &[Step], body: &[u8], b: &mut Builder) -> std::result::Result<(), Value> {
    let items = Iter::new(body).collect::<zcode::Result<Vec<_>>>().map_err(malformed)?;
    for step in steps {
        let body = match step.input {
            Some(i) => items.get(i).and_then(|item| item.body),
            None => None,
        };
        apply(&step.op, &step.ty, body, step.container, b)?;
    }
    Ok(())
}

/// Moves records toward a target record type.
///
/// A cast that fails turns the whole record into the cast's error value.
/// Inputs that are not records pass through.
pub struct Shaper {
    target: Type,
    tf: ShaperTransform,
    programs: HashMap<Type, Program>,
    builder: Builder,
}

impl Shaper {
    pub fn new(target: Type, tf: ShaperTransform) -> Result<Self> {
        if target.record().is_none() {
            return Err(Error::ShapeTarget { ty: target.to_string() });
        }
        Ok(Self {
            target,
            tf,
            programs: HashMap::new(),
            builder: Builder::new(),
        })
    }

    pub fn cache_len(&self) -> usize {
        self.programs.len()
    }
}

impl Evaluator for Shaper {
    fn eval(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Value {
        if let Some(v) = super::passthrough(this) {
            return v;
        }
        if !self.programs.contains_key(this.ty) {
            let (ty, op) = match derive_value(ctx, this.ty, &self.target, self.tf) {
                Ok(derived) => derived,
                Err(err) => return malformed(err),
            };
            trace!("Shape program {} -> {ty} added to the cache.", this.ty);
            self.programs.insert(this.ty.clone(), Program { ty, op });
        }
        let Some(program) = self.programs.get(this.ty) else {
            return this.copy();
        };
        let (Op::Record(steps), Some(body)) = (&program.op, this.bytes) else {
            return Value::new(program.ty.clone(), this.bytes.map(<[u8]>::to_vec));
        };
        self.builder.reset();
        match apply_columns(steps, body, &mut self.builder) {
            Ok(()) => Value::new(program.ty.clone(), Some(self.builder.bytes().to_vec())),
            Err(err) => err,
        }
    }
}
