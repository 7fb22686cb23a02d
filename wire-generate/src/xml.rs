// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shape (de)serializer emission for the XML wire family, shared by the REST
//! XML protocol and the query RPC protocol's responses.
//!
//! Emitted serializers drive the runtime's scoped element writer; emitted
//! parsers walk a `ScopedDecoder` tag by tag, reading element data with the
//! `try_*` helpers. Documents have no XML representation: requesting one is a
//! generation-time error, never broken emitted code.

use crate::common;
use crate::error::{GenError, Result};
use crate::indent::IndentedWriter;
use crate::protocol::{BodyScope, GenContext};
use crate::registry::FunctionHandle;
use std::io::Write;
use wire_schema::{Member, Shape, ShapeId, TimestampFormat};

pub(crate) const SER_MODULE: &str = "xml_ser";
pub(crate) const DE_MODULE: &str = "xml_de";

const PROTOCOL: &str = "xml";

/// Intern the serializer writing a structure's members as child elements.
pub(crate) fn structure_serializer(
    ctx: &GenContext<'_>,
    id: &ShapeId,
    default_ts: TimestampFormat,
    scope: BodyScope<'_>,
) -> Result<FunctionHandle> {
    let structure = ctx.schema.expect_structure(id)?;
    let members = scope.members(structure);
    let suffix = common::compose_suffix(
        scope.name_suffix(),
        common::inline_timestamp_dependency(ctx.schema, members.iter().copied(), default_ts),
    );
    let name = common::shape_fn("ser", "structure", id, suffix.as_deref());
    let rt = ctx.rt().to_string();
    let input_type = ctx.symbols.model_type(id);

    ctx.registry.intern(SER_MODULE, &name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        writeln!(
            w,
            "pub fn {}(scope: &mut {rt}::xml::ScopeWriter<'_>, input: &{ty}) -> Result<(), {rt}::error::SerializeError> {{",
            handle.name(),
            rt = rt,
            ty = input_type,
        )?;
        w.indent();
        for member in &members {
            emit_ser_member(ctx, w, member, default_ts)?;
        }
        writeln!(w, "Ok(())")?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    })
}

/// Intern the serializer dispatching a union value into one child element.
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
            "pub fn {}(scope: &mut {rt}::xml::ScopeWriter<'_>, input: &{ty}) -> Result<(), {rt}::error::SerializeError> {{",
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
                        "let mut el_1 = scope.start_el({:?});",
                        member.wire_name()
                    )?;
                    writeln!(w, "el_1.finish();")?;
                    w.unindent();
                    writeln!(w, "}}")?;
                    continue;
                }
            }
            emit_ser_value(
                ctx,
                w,
                "scope",
                member.wire_name(),
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
        "scope",
        member.wire_name(),
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

/// Text expression for a scalar leaf, or `None` for container shapes.
fn leaf_data_expr(
    rt: &str,
    shape: &Shape,
    format: TimestampFormat,
    value: &str,
) -> Option<String> {
    match shape {
        Shape::Boolean => Some(format!("if *{} {{ \"true\" }} else {{ \"false\" }}", value)),
        Shape::Byte | Shape::Short | Shape::Integer | Shape::Long | Shape::Float
        | Shape::Double => Some(format!("{}.to_string().as_str()", value)),
        Shape::String(_) => Some(format!("{}.as_str()", value)),
        Shape::Blob => Some(format!("{}::base64::encode({}).as_str()", rt, value)),
        Shape::Timestamp => Some(format!(
            "{rt}::time::format({}, {rt}::time::Format::{}).as_str()",
            value,
            format.variant(),
            rt = rt,
        )),
        _ => None,
    }
}

fn emit_ser_value(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    parent: &str,
    element: &str,
    target: &ShapeId,
    ts_override: Option<TimestampFormat>,
    value: &str,
    depth: usize,
    default_ts: TimestampFormat,
) -> Result<()> {
    let rt = ctx.rt();
    let el = format!("el_{}", depth + 1);
    let shape = ctx.schema.expect(target)?;
    let format = ts_override.unwrap_or(default_ts);

    if let Some(data) = leaf_data_expr(rt, shape, format, value) {
        writeln!(w, "let mut {} = {}.start_el({:?});", el, parent, element)?;
        writeln!(w, "{}.data({});", el, data)?;
        writeln!(w, "{}.finish();", el)?;
        return Ok(());
    }

    match shape {
        Shape::Document => {
            return Err(GenError::unsupported(
                PROTOCOL,
                target,
                "document values have no XML representation",
            ))
        }
        Shape::List(list) => {
            let wrap = format!("wrap_{}", depth + 1);
            let item = format!("item_{}", depth + 1);
            writeln!(w, "let mut {} = {}.start_el({:?});", wrap, parent, element)?;
            writeln!(w, "for {} in {} {{", item, value)?;
            w.indent();
            emit_ser_value(
                ctx,
                w,
                &wrap,
                list.member.wire_name(),
                &list.member.target,
                list.member.traits.timestamp_format.or(ts_override),
                &item,
                depth + 1,
                default_ts,
            )?;
            w.unindent();
            writeln!(w, "}}")?;
            writeln!(w, "{}.finish();", wrap)?;
        }
        Shape::Map(map) => {
            let wrap = format!("wrap_{}", depth + 1);
            let entry = format!("entry_{}", depth + 1);
            let key_var = format!("key_{}", depth + 1);
            let value_var = format!("value_{}", depth + 1);
            let key_el = format!("key_el_{}", depth + 1);
            writeln!(w, "let mut {} = {}.start_el({:?});", wrap, parent, element)?;
            writeln!(w, "for ({}, {}) in {} {{", key_var, value_var, value)?;
            w.indent();
            writeln!(w, "let mut {} = {}.start_el(\"entry\");", entry, wrap)?;
            writeln!(w, "let mut {} = {}.start_el(\"key\");", key_el, entry)?;
            writeln!(w, "{}.data({}.as_str());", key_el, key_var)?;
            writeln!(w, "{}.finish();", key_el)?;
            emit_ser_value(
                ctx,
                w,
                &entry,
                "value",
                &map.value.target,
                map.value.traits.timestamp_format.or(ts_override),
                &value_var,
                depth + 1,
                default_ts,
            )?;
            writeln!(w, "{}.finish();", entry)?;
            w.unindent();
            writeln!(w, "}}")?;
            writeln!(w, "{}.finish();", wrap)?;
        }
        Shape::Structure(_) => {
            let nested = structure_serializer(ctx, target, default_ts, BodyScope::Full)?;
            writeln!(w, "let mut {} = {}.start_el({:?});", el, parent, element)?;
            writeln!(w, "{}(&mut {}, {})?;", nested, el, value)?;
            writeln!(w, "{}.finish();", el)?;
        }
        Shape::Union(_) => {
            let nested = union_serializer(ctx, target, default_ts)?;
            writeln!(w, "let mut {} = {}.start_el({:?});", el, parent, element)?;
            writeln!(w, "{}(&mut {}, {})?;", nested, el, value)?;
            writeln!(w, "{}.finish();", el)?;
        }
        other => {
            return Err(GenError::unsupported(
                PROTOCOL,
                target,
                format!("cannot serialize a {} as an element", other.kind_name()),
            ))
        }
    }
    Ok(())
}

/// Intern the parser populating a structure builder from element children.
pub(crate) fn structure_deserializer(
    ctx: &GenContext<'_>,
    id: &ShapeId,
    default_ts: TimestampFormat,
    scope: BodyScope<'_>,
) -> Result<FunctionHandle> {
    let structure = ctx.schema.expect_structure(id)?;
    let members = scope.members(structure);
    let suffix = common::compose_suffix(
        scope.name_suffix(),
        common::inline_timestamp_dependency(ctx.schema, members.iter().copied(), default_ts),
    );
    let name = common::shape_fn("de", "structure", id, suffix.as_deref());
    let rt = ctx.rt().to_string();
    let builder_type = ctx.symbols.builder_type(id);
    let body_scope = matches!(scope, BodyScope::DocumentOnly(_));

    ctx.registry.intern(DE_MODULE, &name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        let decoder = if body_scope {
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
            writeln!(w, "let mut doc = {}::xml::Document::try_from(value)?;", rt)?;
            writeln!(w, "let mut root = doc.root_element()?;")?;
            "root"
        } else {
            writeln!(
                w,
                "pub fn {}(decoder: &mut {rt}::xml::ScopedDecoder<'_>) -> Result<{builder}, {rt}::error::DeserializeError> {{",
                handle.name(),
                builder = builder_type,
                rt = rt,
            )?;
            w.indent();
            writeln!(w, "let mut builder = {}::default();", builder_type)?;
            "decoder"
        };
        writeln!(w, "while let Some(mut tag) = {}.next_tag() {{", decoder)?;
        w.indent();
        writeln!(w, "match tag.start_el().local() {{")?;
        w.indent();
        for member in &members {
            emit_de_member_arm(ctx, w, member, default_ts)?;
        }
        writeln!(w, "_ => {{}}")?;
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

/// Intern the parser populating one error shape's builder from a wrapped
/// error body: the fields live under `<ErrorResponse><Error>…</Error>`, not
/// at the document root, so this cannot reuse the plain body parser.
pub(crate) fn error_body_deserializer(
    ctx: &GenContext<'_>,
    id: &ShapeId,
    default_ts: TimestampFormat,
    bindings: &wire_schema::bindings::MessageBindings,
) -> Result<FunctionHandle> {
    let structure = ctx.schema.expect_structure(id)?;
    let members = BodyScope::DocumentOnly(bindings).members(structure);
    let suffix = common::compose_suffix(
        Some("error_body"),
        common::inline_timestamp_dependency(ctx.schema, members.iter().copied(), default_ts),
    );
    let name = common::shape_fn("de", "structure", id, suffix.as_deref());
    let rt = ctx.rt().to_string();
    let builder_type = ctx.symbols.builder_type(id);

    ctx.registry.intern(DE_MODULE, &name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
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
        writeln!(w, "let mut doc = {}::xml::Document::try_from(value)?;", rt)?;
        writeln!(w, "let mut scope = {}::xml::error_scope(&mut doc)?;", rt)?;
        writeln!(w, "while let Some(mut tag) = scope.next_tag() {{")?;
        w.indent();
        writeln!(w, "match tag.start_el().local() {{")?;
        w.indent();
        for member in &members {
            emit_de_member_arm(ctx, w, member, default_ts)?;
        }
        writeln!(w, "_ => {{}}")?;
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

/// Intern the parser decoding a union value from its single child element.
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
            "pub fn {}(decoder: &mut {rt}::xml::ScopedDecoder<'_>) -> Result<{ty}, {rt}::error::DeserializeError> {{",
            handle.name(),
            ty = value_type,
            rt = rt,
        )?;
        w.indent();
        writeln!(w, "let mut value = None;")?;
        writeln!(w, "while let Some(mut tag) = decoder.next_tag() {{")?;
        w.indent();
        writeln!(w, "match tag.start_el().local() {{")?;
        w.indent();
        for member in &union.members {
            let variant = ctx.symbols.variant_name(member);
            writeln!(w, "{:?} => {{", member.wire_name())?;
            w.indent();
            let expr = emit_de_value(
                ctx,
                w,
                "tag",
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
            "other => return Err({}::error::DeserializeError::unknown_variant(other)),",
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

fn emit_de_member_arm(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    member: &Member,
    default_ts: TimestampFormat,
) -> Result<()> {
    if member.is_streaming() || member.is_event_stream() {
        return Ok(());
    }
    let setter = ctx.symbols.setter_name(member);
    writeln!(w, "{:?} => {{", member.wire_name())?;
    w.indent();
    let expr = emit_de_value(
        ctx,
        w,
        "tag",
        &member.target,
        member.traits.timestamp_format,
        0,
        default_ts,
    )?;
    writeln!(w, "builder = builder.{}(Some({}));", setter, expr)?;
    w.unindent();
    writeln!(w, "}}")?;
    Ok(())
}

/// Emit the statements decoding one value out of `tag` and return the
/// expression yielding it.
fn emit_de_value(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    tag: &str,
    target: &ShapeId,
    ts_override: Option<TimestampFormat>,
    depth: usize,
    default_ts: TimestampFormat,
) -> Result<String> {
    let rt = ctx.rt();
    let format = ts_override.unwrap_or(default_ts);
    let expr = match ctx.schema.expect(target)? {
        Shape::Boolean => format!("{}::xml::try_bool(&mut {})?", rt, tag),
        Shape::Byte => format!("{}::xml::try_i64(&mut {})? as i8", rt, tag),
        Shape::Short => format!("{}::xml::try_i64(&mut {})? as i16", rt, tag),
        Shape::Integer => format!("{}::xml::try_i64(&mut {})? as i32", rt, tag),
        Shape::Long => format!("{}::xml::try_i64(&mut {})?", rt, tag),
        Shape::Float => format!("{}::xml::try_f64(&mut {})? as f32", rt, tag),
        Shape::Double => format!("{}::xml::try_f64(&mut {})?", rt, tag),
        Shape::String(_) => format!("{}::xml::try_data(&mut {})?.to_string()", rt, tag),
        Shape::Blob => format!("{}::xml::try_base64(&mut {})?", rt, tag),
        Shape::Timestamp => format!(
            "{rt}::xml::try_timestamp(&mut {}, {rt}::time::Format::{})?",
            tag,
            format.variant(),
            rt = rt,
        ),
        Shape::Document => {
            return Err(GenError::unsupported(
                PROTOCOL,
                target,
                "document values have no XML representation",
            ))
        }
        Shape::List(list) => {
            let items = format!("items_{}", depth + 1);
            let item_tag = format!("item_tag_{}", depth + 1);
            writeln!(w, "let mut {} = Vec::new();", items)?;
            writeln!(w, "while let Some(mut {}) = {}.next_tag() {{", item_tag, tag)?;
            w.indent();
            let element = emit_de_value(
                ctx,
                w,
                &item_tag,
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
            let entry_tag = format!("entry_tag_{}", depth + 1);
            let field_tag = format!("field_tag_{}", depth + 1);
            let key_var = format!("key_{}", depth + 1);
            let value_var = format!("value_{}", depth + 1);
            writeln!(w, "let mut {} = std::collections::HashMap::new();", map_var)?;
            writeln!(w, "while let Some(mut {}) = {}.next_tag() {{", entry_tag, tag)?;
            w.indent();
            writeln!(w, "let mut {} = None;", key_var)?;
            writeln!(w, "let mut {} = None;", value_var)?;
            writeln!(
                w,
                "while let Some(mut {}) = {}.next_tag() {{",
                field_tag, entry_tag
            )?;
            w.indent();
            writeln!(w, "match {}.start_el().local() {{", field_tag)?;
            w.indent();
            writeln!(
                w,
                "\"key\" => {} = Some({}::xml::try_data(&mut {})?.to_string()),",
                key_var, rt, field_tag
            )?;
            writeln!(w, "\"value\" => {{")?;
            w.indent();
            let element = emit_de_value(
                ctx,
                w,
                &field_tag,
                &map.value.target,
                map.value.traits.timestamp_format.or(ts_override),
                depth + 1,
                default_ts,
            )?;
            writeln!(w, "{} = Some({});", value_var, element)?;
            w.unindent();
            writeln!(w, "}}")?;
            writeln!(w, "_ => {{}}")?;
            w.unindent();
            writeln!(w, "}}")?;
            w.unindent();
            writeln!(w, "}}")?;
            writeln!(
                w,
                "if let (Some({key}), Some({value})) = ({key}, {value}) {{",
                key = key_var,
                value = value_var
            )?;
            w.indent();
            writeln!(w, "{}.insert({}, {});", map_var, key_var, value_var)?;
            w.unindent();
            writeln!(w, "}}")?;
            w.unindent();
            writeln!(w, "}}")?;
            map_var
        }
        Shape::Structure(_) => {
            let nested = structure_deserializer(ctx, target, default_ts, BodyScope::Full)?;
            format!("{}(&mut {})?.build()?", nested, tag)
        }
        Shape::Union(_) => {
            let nested = union_deserializer(ctx, target, default_ts)?;
            format!("{}(&mut {})?", nested, tag)
        }
        other @ Shape::Operation(_) | other @ Shape::Service(_) => {
            return Err(GenError::unsupported(
                PROTOCOL,
                target,
                format!("cannot deserialize a {} as an element", other.kind_name()),
            ))
        }
    };
    Ok(expr)
}

/// Intern the wrapped-envelope generic error parser shared by the XML-bodied
/// protocols: `<ErrorResponse><Error><Code>…</Code><Message>…</Message>`.
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
            "let mut doc = {}::xml::Document::try_from(response.body())?;",
            rt
        )?;
        writeln!(w, "let mut root = doc.root_element()?;")?;
        writeln!(w, "if !root.start_el().matches(\"ErrorResponse\") {{")?;
        w.indent();
        writeln!(
            w,
            "return Err({}::error::DeserializeError::custom(\"expected ErrorResponse root\"));",
            rt
        )?;
        w.unindent();
        writeln!(w, "}}")?;
        writeln!(w, "while let Some(mut tag) = root.next_tag() {{")?;
        w.indent();
        writeln!(w, "if tag.start_el().local() == \"Error\" {{")?;
        w.indent();
        writeln!(w, "while let Some(mut field) = tag.next_tag() {{")?;
        w.indent();
        writeln!(w, "match field.start_el().local() {{")?;
        w.indent();
        writeln!(
            w,
            "\"Code\" => envelope.code = Some({}::xml::try_data(&mut field)?.to_string()),",
            rt
        )?;
        writeln!(
            w,
            "\"Message\" => envelope.message = Some({}::xml::try_data(&mut field)?.to_string()),",
            rt
        )?;
        writeln!(w, "_ => {{}}")?;
        w.unindent();
        writeln!(w, "}}")?;
        w.unindent();
        writeln!(w, "}}")?;
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
