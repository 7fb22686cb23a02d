// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Form-encoded serializer emission for the query RPC protocol.
//!
//! Values flatten into `A.B.1.C=value` pairs: nested scopes append their key,
//! lists append a 1-based index, maps append `entry.N.key`/`entry.N.value`.
//! The protocol is request-only — responses travel as XML (see [`crate::xml`])
//! — so this family emits no deserializers.

use crate::common;
use crate::error::{GenError, Result};
use crate::indent::IndentedWriter;
use crate::protocol::GenContext;
use crate::registry::FunctionHandle;
use std::io::Write;
use wire_schema::{Member, Shape, ShapeId, TimestampFormat};

pub(crate) const SER_MODULE: &str = "query_ser";

const PROTOCOL: &str = "query";

/// Intern the serializer flattening a structure into form-encoded pairs.
pub(crate) fn structure_serializer(
    ctx: &GenContext<'_>,
    id: &ShapeId,
    default_ts: TimestampFormat,
) -> Result<FunctionHandle> {
    let structure = ctx.schema.expect_structure(id)?;
    let suffix = common::compose_suffix(
        None,
        common::inline_timestamp_dependency(ctx.schema, &structure.members, default_ts),
    );
    let name = common::shape_fn("ser", "structure", id, suffix.as_deref());
    let rt = ctx.rt().to_string();
    let input_type = ctx.symbols.model_type(id);

    ctx.registry.intern(SER_MODULE, &name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        writeln!(
            w,
            "pub fn {}(scope: &mut {rt}::query::QueryScope<'_>, input: &{ty}) -> Result<(), {rt}::error::SerializeError> {{",
            handle.name(),
            rt = rt,
            ty = input_type,
        )?;
        w.indent();
        for member in &structure.members {
            emit_ser_member(ctx, w, member, default_ts)?;
        }
        writeln!(w, "Ok(())")?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    })
}

/// Intern the serializer flattening a union value under its single key.
pub(crate) fn union_serializer(
    ctx: &GenContext<'_>,
    id: &ShapeId,
    default_ts: TimestampFormat,
) -> Result<FunctionHandle> {
    let union = ctx.schema.expect_union(id)?;
    let suffix = common::compose_suffix(
        None,
        common::inline_timestamp_dependency(ctx.schema, &union.members, default_ts),
    );
    let name = common::shape_fn("ser", "union", id, suffix.as_deref());
    let rt = ctx.rt().to_string();
    let input_type = ctx.symbols.model_type(id);

    ctx.registry.intern(SER_MODULE, &name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        writeln!(
            w,
            "pub fn {}(scope: &mut {rt}::query::QueryScope<'_>, input: &{ty}) -> Result<(), {rt}::error::SerializeError> {{",
            handle.name(),
            rt = rt,
            ty = input_type,
        )?;
        w.indent();
        writeln!(w, "match input {{")?;
        w.indent();
        for member in &union.members {
            let variant = ctx.symbols.variant_name(member);
            writeln!(w, "{}::{}(inner) => {{", input_type, variant)?;
            w.indent();
            if let Shape::Structure(target) = ctx.schema.expect(&member.target)? {
                if let Some(guard) = common::unused_payload_guard(target) {
                    writeln!(w, "{}", guard)?;
                    writeln!(
                        w,
                        "let _ = scope.value({:?}).scope();",
                        member.wire_name()
                    )?;
                    w.unindent();
                    writeln!(w, "}}")?;
                    continue;
                }
            }
            emit_ser_value(
                ctx,
                w,
                &format!("scope.value({:?})", member.wire_name()),
                &member.target,
                member.traits.timestamp_format,
                "inner",
                0,
                default_ts,
            )?;
            w.unindent();
            writeln!(w, "}}")?;
        }
        w.unindent();
        writeln!(w, "}}")?;
        writeln!(w, "Ok(())")?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    })
}

fn emit_ser_member(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    member: &Member,
    default_ts: TimestampFormat,
) -> Result<()> {
    if member.is_streaming() || member.is_event_stream() {
        return Ok(());
    }
    let field = ctx.symbols.field_name(member);
    let var = format!("var_{}", field);
    let optional = ctx.symbols.is_optional(member);
    if optional {
        writeln!(w, "if let Some({}) = &input.{} {{", var, field)?;
        w.indent();
    } else {
        writeln!(w, "let {} = &input.{};", var, field)?;
    }
    emit_ser_value(
        ctx,
        w,
        &format!("scope.value({:?})", member.wire_name()),
        &member.target,
        member.traits.timestamp_format,
        &var,
        0,
        default_ts,
    )?;
    if optional {
        w.unindent();
        writeln!(w, "}}")?;
    }
    Ok(())
}

/// Emit the statements serializing one value expression into a `QueryValue`
/// expression (`value_expr` is not yet evaluated; scalars consume it once).
fn emit_ser_value(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    sink: &str,
    target: &ShapeId,
    ts_override: Option<TimestampFormat>,
    value: &str,
    depth: usize,
    default_ts: TimestampFormat,
) -> Result<()> {
    let rt = ctx.rt();
    match ctx.schema.expect(target)? {
        Shape::Boolean => writeln!(w, "{}.boolean(*{});", sink, value)?,
        Shape::Byte | Shape::Short | Shape::Integer | Shape::Long => {
            writeln!(w, "{}.int(*{} as i64);", sink, value)?
        }
        Shape::Float | Shape::Double => writeln!(w, "{}.float(*{} as f64);", sink, value)?,
        Shape::String(_) => writeln!(w, "{}.string({}.as_str());", sink, value)?,
        Shape::Blob => writeln!(w, "{}.base64({});", sink, value)?,
        Shape::Timestamp => {
            let format = ts_override.unwrap_or(default_ts);
            writeln!(
                w,
                "{}.timestamp({}, {}::time::Format::{});",
                sink,
                value,
                rt,
                format.variant()
            )?
        }
        Shape::Document => {
            return Err(GenError::unsupported(
                PROTOCOL,
                target,
                "document values have no form-encoded representation",
            ))
        }
        Shape::List(list) => {
            let list_var = format!("list_{}", depth + 1);
            let item = format!("item_{}", depth + 1);
            writeln!(w, "let mut {} = {}.list();", list_var, sink)?;
            writeln!(w, "for {} in {} {{", item, value)?;
            w.indent();
            emit_ser_value(
                ctx,
                w,
                &format!("{}.entry()", list_var),
                &list.member.target,
                list.member.traits.timestamp_format.or(ts_override),
                &item,
                depth + 1,
                default_ts,
            )?;
            w.unindent();
            writeln!(w, "}}")?;
        }
        Shape::Map(map) => {
            let map_var = format!("map_{}", depth + 1);
            let key_var = format!("key_{}", depth + 1);
            let value_var = format!("value_{}", depth + 1);
            writeln!(w, "let mut {} = {}.map();", map_var, sink)?;
            writeln!(w, "for ({}, {}) in {} {{", key_var, value_var, value)?;
            w.indent();
            emit_ser_value(
                ctx,
                w,
                &format!("{}.entry({}.as_str())", map_var, key_var),
                &map.value.target,
                map.value.traits.timestamp_format.or(ts_override),
                &value_var,
                depth + 1,
                default_ts,
            )?;
            w.unindent();
            writeln!(w, "}}")?;
        }
        Shape::Structure(_) => {
            let scope_var = format!("scope_{}", depth + 1);
            let nested = structure_serializer(ctx, target, default_ts)?;
            writeln!(w, "let mut {} = {}.scope();", scope_var, sink)?;
            writeln!(w, "{}(&mut {}, {})?;", nested, scope_var, value)?;
        }
        Shape::Union(_) => {
            let scope_var = format!("scope_{}", depth + 1);
            let nested = union_serializer(ctx, target, default_ts)?;
            writeln!(w, "let mut {} = {}.scope();", scope_var, sink)?;
            writeln!(w, "{}(&mut {}, {})?;", nested, scope_var, value)?;
        }
        other @ Shape::Operation(_) | other @ Shape::Service(_) => {
            return Err(GenError::unsupported(
                PROTOCOL,
                target,
                format!("cannot serialize a {} as a form value", other.kind_name()),
            ))
        }
    }
    Ok(())
}
