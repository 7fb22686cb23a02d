// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shape (de)serializer emission for the binary (CBOR) wire family.
//!
//! Blobs travel as raw byte strings, never base64. Document values can be
//! *serialized* (the runtime encoder maps them onto CBOR), but document
//! deserialization is deliberately unimplemented: requesting it is a
//! generation-time "not supported" failure rather than broken emitted code.

use crate::common;
use crate::error::{GenError, Result};
use crate::indent::IndentedWriter;
use crate::protocol::GenContext;
use crate::registry::FunctionHandle;
use std::io::Write;
use wire_schema::{Member, Shape, ShapeId, TimestampFormat};

pub(crate) const SER_MODULE: &str = "cbor_ser";
pub(crate) const DE_MODULE: &str = "cbor_de";

const PROTOCOL: &str = "cbor";

/// Intern the serializer writing a structure as a CBOR map.
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
            "pub fn {}(encoder: &mut {rt}::cbor::Encoder, input: &{ty}) -> Result<(), {rt}::error::SerializeError> {{",
            handle.name(),
            rt = rt,
            ty = input_type,
        )?;
        w.indent();
        writeln!(w, "encoder.begin_map();")?;
        for member in &structure.members {
            emit_ser_member(ctx, w, member, default_ts)?;
        }
        writeln!(w, "encoder.end();")?;
        writeln!(w, "Ok(())")?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    })
}

/// Intern the serializer writing a union as a singleton CBOR map.
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
            "pub fn {}(encoder: &mut {rt}::cbor::Encoder, input: &{ty}) -> Result<(), {rt}::error::SerializeError> {{",
            handle.name(),
            rt = rt,
            ty = input_type,
        )?;
        w.indent();
        writeln!(w, "encoder.begin_map();")?;
        writeln!(w, "match input {{")?;
        w.indent();
        for member in &union.members {
            let variant = ctx.symbols.variant_name(member);
            writeln!(w, "{}::{}(inner) => {{", input_type, variant)?;
            w.indent();
            if let Shape::Structure(target) = ctx.schema.expect(&member.target)? {
                if let Some(guard) = common::unused_payload_guard(target) {
                    writeln!(w, "{}", guard)?;
                    writeln!(w, "encoder.str({:?});", member.wire_name())?;
                    writeln!(w, "encoder.begin_map();")?;
                    writeln!(w, "encoder.end();")?;
                    w.unindent();
                    writeln!(w, "}}")?;
                    continue;
                }
            }
            writeln!(w, "encoder.str({:?});", member.wire_name())?;
            emit_ser_value(
                ctx,
                w,
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
        writeln!(w, "encoder.end();")?;
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
    writeln!(w, "encoder.str({:?});", member.wire_name())?;
    emit_ser_value(
        ctx,
        w,
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

/// Emit the statements encoding one value (its key, if any, is already
/// written).
fn emit_ser_value(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    target: &ShapeId,
    ts_override: Option<TimestampFormat>,
    value: &str,
    depth: usize,
    default_ts: TimestampFormat,
) -> Result<()> {
    let rt = ctx.rt();
    match ctx.schema.expect(target)? {
        Shape::Boolean => writeln!(w, "encoder.bool(*{});", value)?,
        Shape::Byte | Shape::Short | Shape::Integer | Shape::Long => {
            writeln!(w, "encoder.int(*{} as i64);", value)?
        }
        Shape::Float | Shape::Double => writeln!(w, "encoder.float(*{} as f64);", value)?,
        Shape::String(_) => writeln!(w, "encoder.str({}.as_str());", value)?,
        Shape::Blob => writeln!(w, "encoder.blob({});", value)?,
        Shape::Timestamp => {
            let format = ts_override.unwrap_or(default_ts);
            writeln!(
                w,
                "encoder.timestamp({}, {}::time::Format::{});",
                value,
                rt,
                format.variant()
            )?
        }
        Shape::Document => writeln!(w, "encoder.document({})?;", value)?,
        Shape::List(list) => {
            let item = format!("item_{}", depth + 1);
            writeln!(w, "encoder.begin_array();")?;
            writeln!(w, "for {} in {} {{", item, value)?;
            w.indent();
            emit_ser_value(
                ctx,
                w,
                &list.member.target,
                list.member.traits.timestamp_format.or(ts_override),
                &item,
                depth + 1,
                default_ts,
            )?;
            w.unindent();
            writeln!(w, "}}")?;
            writeln!(w, "encoder.end();")?;
        }
        Shape::Map(map) => {
            let key_var = format!("key_{}", depth + 1);
            let value_var = format!("value_{}", depth + 1);
            writeln!(w, "encoder.begin_map();")?;
            writeln!(w, "for ({}, {}) in {} {{", key_var, value_var, value)?;
            w.indent();
            writeln!(w, "encoder.str({}.as_str());", key_var)?;
            emit_ser_value(
                ctx,
                w,
                &map.value.target,
                map.value.traits.timestamp_format.or(ts_override),
                &value_var,
                depth + 1,
                default_ts,
            )?;
            w.unindent();
            writeln!(w, "}}")?;
            writeln!(w, "encoder.end();")?;
        }
        Shape::Structure(_) => {
            let nested = structure_serializer(ctx, target, default_ts)?;
            writeln!(w, "{}(encoder, {})?;", nested, value)?;
        }
        Shape::Union(_) => {
            let nested = union_serializer(ctx, target, default_ts)?;
            writeln!(w, "{}(encoder, {})?;", nested, value)?;
        }
        other @ Shape::Operation(_) | other @ Shape::Service(_) => {
            return Err(GenError::unsupported(
                PROTOCOL,
                target,
                format!("cannot serialize a {} as a value", other.kind_name()),
            ))
        }
    }
    Ok(())
}

/// Intern the parser populating a structure builder from a CBOR map.
///
/// `body` selects the whole-buffered-body signature (`&[u8]` plus a
/// caller-supplied builder) used at operation level; nested shapes read from
/// the shared decoder instead.
pub(crate) fn structure_deserializer(
    ctx: &GenContext<'_>,
    id: &ShapeId,
    default_ts: TimestampFormat,
    body: bool,
) -> Result<FunctionHandle> {
    let structure = ctx.schema.expect_structure(id)?;
    let ts_suffix = common::inline_timestamp_dependency(ctx.schema, &structure.members, default_ts);
    let suffix = common::compose_suffix(if body { Some("body") } else { None }, ts_suffix);
    let name = common::shape_fn("de", "structure", id, suffix.as_deref());
    let rt = ctx.rt().to_string();
    let builder_type = ctx.symbols.builder_type(id);

    ctx.registry.intern(DE_MODULE, &name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        if body {
            writeln!(
                w,
                "pub fn {}(value: &[u8], mut builder: {builder}) -> Result<{builder}, {rt}::error::DeserializeError> {{",
                handle.name(),
                builder = builder_type,
                rt = rt,
            )?;
            w.indent();
            writeln!(w, "if value.is_empty() {{")?;
            w.indent();
            writeln!(w, "return Ok(builder);")?;
            w.unindent();
            writeln!(w, "}}")?;
            writeln!(w, "let mut decoder = {}::cbor::Decoder::new(value);", rt)?;
            writeln!(w, "let decoder = &mut decoder;")?;
        } else {
            writeln!(
                w,
                "pub fn {}(decoder: &mut {rt}::cbor::Decoder<'_>) -> Result<{builder}, {rt}::error::DeserializeError> {{",
                handle.name(),
                builder = builder_type,
                rt = rt,
            )?;
            w.indent();
            writeln!(w, "let mut builder = {}::default();", builder_type)?;
        }
        writeln!(w, "decoder.begin_map()?;")?;
        writeln!(w, "while let Some(key) = decoder.next_key()? {{")?;
        w.indent();
        writeln!(w, "match key.as_str() {{")?;
        w.indent();
        for member in &structure.members {
            if member.is_streaming() || member.is_event_stream() {
                continue;
            }
            let setter = ctx.symbols.setter_name(member);
            writeln!(w, "{:?} => {{", member.wire_name())?;
            w.indent();
            let expr = emit_de_value(
                ctx,
                w,
                &member.target,
                member.traits.timestamp_format,
                0,
                default_ts,
            )?;
            writeln!(w, "builder = builder.{}(Some({}));", setter, expr)?;
            w.unindent();
            writeln!(w, "}}")?;
        }
        writeln!(w, "_ => decoder.skip_value()?,")?;
        w.unindent();
        writeln!(w, "}}")?;
        w.unindent();
        writeln!(w, "}}")?;
        writeln!(w, "Ok(builder)")?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    })
}

/// Intern the parser decoding a union value from its singleton CBOR map.
pub(crate) fn union_deserializer(
    ctx: &GenContext<'_>,
    id: &ShapeId,
    default_ts: TimestampFormat,
) -> Result<FunctionHandle> {
    let union = ctx.schema.expect_union(id)?;
    let suffix = common::compose_suffix(
        None,
        common::inline_timestamp_dependency(ctx.schema, &union.members, default_ts),
    );
    let name = common::shape_fn("de", "union", id, suffix.as_deref());
    let rt = ctx.rt().to_string();
    let value_type = ctx.symbols.model_type(id);

    ctx.registry.intern(DE_MODULE, &name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        writeln!(
            w,
            "pub fn {}(decoder: &mut {rt}::cbor::Decoder<'_>) -> Result<{ty}, {rt}::error::DeserializeError> {{",
            handle.name(),
            ty = value_type,
            rt = rt,
        )?;
        w.indent();
        writeln!(w, "decoder.begin_map()?;")?;
        writeln!(w, "let mut value = None;")?;
        writeln!(w, "while let Some(key) = decoder.next_key()? {{")?;
        w.indent();
        writeln!(w, "match key.as_str() {{")?;
        w.indent();
        for member in &union.members {
            let variant = ctx.symbols.variant_name(member);
            writeln!(w, "{:?} => {{", member.wire_name())?;
            w.indent();
            let expr = emit_de_value(
                ctx,
                w,
                &member.target,
                member.traits.timestamp_format,
                0,
                default_ts,
            )?;
            writeln!(w, "value = Some({}::{}({}));", value_type, variant, expr)?;
            w.unindent();
            writeln!(w, "}}")?;
        }
        writeln!(
            w,
            "_ => return Err({}::error::DeserializeError::unknown_variant(key.as_str())),",
            rt
        )?;
        w.unindent();
        writeln!(w, "}}")?;
        w.unindent();
        writeln!(w, "}}")?;
        writeln!(
            w,
            "value.ok_or_else(|| {}::error::DeserializeError::custom(\"empty union on the wire\"))",
            rt
        )?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    })
}

fn emit_de_value(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    target: &ShapeId,
    ts_override: Option<TimestampFormat>,
    depth: usize,
    default_ts: TimestampFormat,
) -> Result<String> {
    let rt = ctx.rt();
    let expr = match ctx.schema.expect(target)? {
        Shape::Boolean => "decoder.bool()?".to_string(),
        Shape::Byte => "decoder.int()? as i8".to_string(),
        Shape::Short => "decoder.int()? as i16".to_string(),
        Shape::Integer => "decoder.int()? as i32".to_string(),
        Shape::Long => "decoder.int()?".to_string(),
        Shape::Float => "decoder.float()? as f32".to_string(),
        Shape::Double => "decoder.float()?".to_string(),
        Shape::String(_) => "decoder.str()?".to_string(),
        Shape::Blob => "decoder.blob()?".to_string(),
        Shape::Timestamp => {
            let format = ts_override.unwrap_or(default_ts);
            format!(
                "decoder.timestamp({}::time::Format::{})?",
                rt,
                format.variant()
            )
        }
        Shape::Document => {
            // Serialization-only support; the decoder has no document path.
            return Err(GenError::not_supported(
                PROTOCOL,
                "document deserialization",
            ));
        }
        Shape::List(list) => {
            let len = format!("len_{}", depth + 1);
            let items = format!("items_{}", depth + 1);
            writeln!(w, "let {} = decoder.begin_array()?;", len)?;
            writeln!(w, "let mut {} = Vec::with_capacity({});", items, len)?;
            writeln!(w, "for _ in 0..{} {{", len)?;
            w.indent();
            let element = emit_de_value(
                ctx,
                w,
                &list.member.target,
                list.member.traits.timestamp_format.or(ts_override),
                depth + 1,
                default_ts,
            )?;
            writeln!(w, "{}.push({});", items, element)?;
            w.unindent();
            writeln!(w, "}}")?;
            items
        }
        Shape::Map(map) => {
            let map_var = format!("map_{}", depth + 1);
            let key_var = format!("key_{}", depth + 1);
            writeln!(w, "decoder.begin_map()?;")?;
            writeln!(w, "let mut {} = std::collections::HashMap::new();", map_var)?;
            writeln!(w, "while let Some({}) = decoder.next_key()? {{", key_var)?;
            w.indent();
            let element = emit_de_value(
                ctx,
                w,
                &map.value.target,
                map.value.traits.timestamp_format.or(ts_override),
                depth + 1,
                default_ts,
            )?;
            writeln!(w, "{}.insert({}, {});", map_var, key_var, element)?;
            w.unindent();
            writeln!(w, "}}")?;
            map_var
        }
        Shape::Structure(_) => {
            let nested = structure_deserializer(ctx, target, default_ts, false)?;
            format!("{}(decoder)?.build()?", nested)
        }
        Shape::Union(_) => {
            let nested = union_deserializer(ctx, target, default_ts)?;
            format!("{}(decoder)?", nested)
        }
        other @ Shape::Operation(_) | other @ Shape::Service(_) => {
            return Err(GenError::unsupported(
                PROTOCOL,
                target,
                format!("cannot deserialize a {} as a value", other.kind_name()),
            ))
        }
    };
    Ok(expr)
}

/// Intern the generic error parser scanning the CBOR error map for
/// `__type`/`code` and `message`.
pub(crate) fn generic_error_parser(ctx: &GenContext<'_>) -> Result<FunctionHandle> {
    let rt = ctx.rt().to_string();
    ctx.registry.intern(DE_MODULE, "de_generic_error", |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        writeln!(
            w,
            "pub fn {}(response: &{rt}::http::Response) -> Result<{rt}::error::ErrorEnvelope, {rt}::error::DeserializeError> {{",
            handle.name(),
            rt = rt,
        )?;
        w.indent();
        writeln!(w, "let mut envelope = {}::error::ErrorEnvelope::default();", rt)?;
        writeln!(
            w,
            "let mut decoder = {}::cbor::Decoder::new(response.body());",
            rt
        )?;
        writeln!(w, "decoder.begin_map()?;")?;
        writeln!(w, "while let Some(key) = decoder.next_key()? {{")?;
        w.indent();
        writeln!(w, "match key.as_str() {{")?;
        w.indent();
        writeln!(
            w,
            "\"__type\" | \"code\" => envelope.code = Some({}::error::sanitize_error_code(decoder.str()?.as_str()).to_string()),",
            rt
        )?;
        writeln!(
            w,
            "\"message\" | \"Message\" => envelope.message = Some(decoder.str()?),"
        )?;
        writeln!(w, "_ => decoder.skip_value()?,")?;
        w.unindent();
        writeln!(w, "}}")?;
        w.unindent();
        writeln!(w, "}}")?;
        writeln!(w, "Ok(envelope)")?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    })
}
