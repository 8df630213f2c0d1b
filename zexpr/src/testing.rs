use zcode::Builder;
use zng::{
    RecordBuilder, TypeContext, Value,
    types::{Column, Type},
};

/// A record with one column per `(name, value)` pair.
pub(crate) fn record(ctx: &TypeContext, fields: Vec<(&str, Value)>) -> Value {
    let cols = fields
        .iter()
        .map(|(name, v)| Column::new(*name, v.ty.clone()))
        .collect();
    let mut b = RecordBuilder::new(ctx.lookup_type_record(cols).unwrap()).unwrap();
    for (_, v) in &fields {
        b.append_value(v.view());
    }
    b.build().unwrap()
}

/// An array or set of type `ty` holding `elems`.
pub(crate) fn collection(ty: Type, elems: &[Value]) -> Value {
    let mut b = Builder::new();
    for e in elems {
        b.append(e.bytes.as_deref(), e.ty.is_container());
    }
    Value::new(ty, Some(b.into_bytes()))
}
