// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shape (de)serializer emission for the JSON wire family.
//!
//! Both JSON protocols share these helpers: identical bodies resolve to
//! identical registry keys, so a service generated for one protocol reuses the
//! other's shape functions. Emitted serializers drive the runtime's
//! `JsonObjectWriter`/`JsonArrayWriter`; emitted parsers walk its `TokenIter`
//! and populate builders.

use crate::common;
use crate::error::{GenError, Result};
use crate::indent::IndentedWriter;
use crate::protocol::{BodyScope, GenContext};
use crate::registry::FunctionHandle;
use std::io::Write;
use wire_schema::{Member, Shape, ShapeId, TimestampFormat};

pub(crate) const SER_MODULE: &str = "json_ser";
pub(crate) const DE_MODULE: &str = "json_de";

const PROTOCOL: &str = "json";

/// Intern the serializer writing a structure's members into a JSON object.
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
            "pub fn {}(object: &mut {rt}::json::JsonObjectWriter<'_>, input: &{ty}) -> Result<(), {rt}::error::SerializeError> {{",
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

/// Intern the serializer dispatching a union value into its singleton-keyed
/// JSON object.
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
            "pub fn {}(object: &mut {rt}::json::JsonObjectWriter<'_>, input: &{ty}) -> Result<(), {rt}::error::SerializeError> {{",
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
            emit_ser_variant(ctx, w, member, default_ts)?;
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

fn emit_ser_variant(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    member: &Member,
    default_ts: TimestampFormat,
) -> Result<()> {
    let key = format!("{:?}", member.wire_name());
    if let Shape::Structure(target) = ctx.schema.expect(&member.target)? {
        // An empty structure writes nothing, but the payload binding must
        // still be named and discarded in every protocol's union path.
        if let Some(guard) = common::unused_payload_guard(target) {
            writeln!(w, "{}", guard)?;
            writeln!(w, "let mut object_1 = object.start_object({});", key)?;
            writeln!(w, "object_1.finish();")?;
            return Ok(());
        }
    }
    emit_ser_value(
        ctx,
        w,
        "object",
        Some(&key),
        &member.target,
        member.traits.timestamp_format,
        "inner",
        0,
        default_ts,
    )
}

fn emit_ser_member(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    member: &Member,
    default_ts: TimestampFormat,
) -> Result<()> {
    // Stream-valued members never serialize structurally; the streaming
    // paths own them.
    if member.is_streaming() || member.is_event_stream() {
        return Ok(());
    }
    let field = ctx.symbols.field_name(member);
    let var = format!("var_{}", field);
    let key = format!("{:?}", member.wire_name());
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
        "object",
        Some(&key),
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

/// Emit the statements serializing one value expression (of type `&T`) into
/// the given writer. `key` is a Rust expression when writing into an object,
/// `None` when writing an array element.
fn emit_ser_value(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    writer: &str,
    key: Option<&str>,
    target: &ShapeId,
    ts_override: Option<TimestampFormat>,
    value: &str,
    depth: usize,
    default_ts: TimestampFormat,
) -> Result<()> {
    let rt = ctx.rt();
    let leaf = |w: &mut IndentedWriter<&mut Vec<u8>>, method: &str, args: String, fallible: bool| {
        let question = if fallible { "?" } else { "" };
        match key {
            Some(key) => writeln!(w, "{}.{}({}, {}){};", writer, method, key, args, question),
            None => writeln!(w, "{}.{}({}){};", writer, method, args, question),
        }
    };
    match ctx.schema.expect(target)? {
        Shape::Boolean => leaf(w, "boolean", format!("*{}", value), false)?,
        Shape::Byte | Shape::Short | Shape::Integer | Shape::Long => {
            leaf(w, "int", format!("*{} as i64", value), false)?
        }
        Shape::Float | Shape::Double => leaf(w, "float", format!("*{} as f64", value), false)?,
        Shape::String(_) => leaf(w, "string", format!("{}.as_str()", value), false)?,
        Shape::Blob => leaf(w, "base64", value.to_string(), false)?,
        Shape::Timestamp => {
            let format = ts_override.unwrap_or(default_ts);
            leaf(
                w,
                "date_time",
                format!("{}, {}::time::Format::{}", value, rt, format.variant()),
                false,
            )?
        }
        Shape::Document => leaf(w, "document", value.to_string(), true)?,
        Shape::List(list) => {
            let array = format!("array_{}", depth + 1);
            let item = format!("item_{}", depth + 1);
            match key {
                Some(key) => writeln!(w, "let mut {} = {}.start_array({});", array, writer, key)?,
                None => writeln!(w, "let mut {} = {}.start_array();", array, writer)?,
            }
            writeln!(w, "for {} in {} {{", item, value)?;
            w.indent();
            emit_ser_value(
                ctx,
                w,
                &array,
                None,
                &list.member.target,
                list.member.traits.timestamp_format.or(ts_override),
                &item,
                depth + 1,
                default_ts,
            )?;
            w.unindent();
            writeln!(w, "}}")?;
            writeln!(w, "{}.finish();", array)?;
        }
        Shape::Map(map) => {
            let object = format!("object_{}", depth + 1);
            let key_var = format!("key_{}", depth + 1);
            let value_var = format!("value_{}", depth + 1);
            match key {
                Some(key) => writeln!(w, "let mut {} = {}.start_object({});", object, writer, key)?,
                None => writeln!(w, "let mut {} = {}.start_object();", object, writer)?,
            }
            writeln!(w, "for ({}, {}) in {} {{", key_var, value_var, value)?;
            w.indent();
            let dynamic_key = format!("{}.as_str()", key_var);
            emit_ser_value(
                ctx,
                w,
                &object,
                Some(&dynamic_key),
                &map.value.target,
                map.value.traits.timestamp_format.or(ts_override),
                &value_var,
                depth + 1,
                default_ts,
            )?;
            w.unindent();
            writeln!(w, "}}")?;
            writeln!(w, "{}.finish();", object)?;
        }
        Shape::Structure(_) => {
            let object = format!("object_{}", depth + 1);
            let nested = structure_serializer(ctx, target, default_ts, BodyScope::Full)?;
            match key {
                Some(key) => writeln!(w, "let mut {} = {}.start_object({});", object, writer, key)?,
                None => writeln!(w, "let mut {} = {}.start_object();", object, writer)?,
            }
            writeln!(w, "{}(&mut {}, {})?;", nested, object, value)?;
            writeln!(w, "{}.finish();", object)?;
        }
        Shape::Union(_) => {
            let object = format!("object_{}", depth + 1);
            let nested = union_serializer(ctx, target, default_ts)?;
            match key {
                Some(key) => writeln!(w, "let mut {} = {}.start_object({});", object, writer, key)?,
                None => writeln!(w, "let mut {} = {}.start_object();", object, writer)?,
            }
            writeln!(w, "{}(&mut {}, {})?;", nested, object, value)?;
            writeln!(w, "{}.finish();", object)?;
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

/// Intern the parser populating a structure builder from a JSON object.
///
/// With [`BodyScope::Full`] the function reads from a token iterator and
/// returns a fresh builder; with [`BodyScope::DocumentOnly`] it decodes a
/// whole buffered body into a caller-supplied builder in one step.
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
        if body_scope {
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
            writeln!(w, "let mut tokens = {}::json::TokenIter::new(value);", rt)?;
            writeln!(w, "let tokens = &mut tokens;")?;
        } else {
            writeln!(
                w,
                "pub fn {}(tokens: &mut {rt}::json::TokenIter<'_>) -> Result<{builder}, {rt}::error::DeserializeError> {{",
                handle.name(),
                builder = builder_type,
                rt = rt,
            )?;
            w.indent();
            writeln!(w, "let mut builder = {}::default();", builder_type)?;
        }
        writeln!(w, "tokens.expect_start_object()?;")?;
        writeln!(w, "loop {{")?;
        w.indent();
        writeln!(w, "match tokens.next_token()? {{")?;
        w.indent();
        writeln!(w, "{}::json::Token::EndObject => break,", rt)?;
        writeln!(w, "{}::json::Token::ObjectKey(key) => match key.as_str() {{", rt)?;
        w.indent();
        for member in &members {
            emit_de_member_arm(ctx, w, member, default_ts)?;
        }
        writeln!(w, "_ => tokens.skip_value()?,")?;
        w.unindent();
        writeln!(w, "}},")?;
        writeln!(
            w,
            "_ => return Err({}::error::DeserializeError::custom(\"expected object key\")),",
            rt
        )?;
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

/// Intern the parser decoding a union value from its singleton-keyed object.
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
            "pub fn {}(tokens: &mut {rt}::json::TokenIter<'_>) -> Result<{ty}, {rt}::error::DeserializeError> {{",
            handle.name(),
            ty = value_type,
            rt = rt,
        )?;
        w.indent();
        writeln!(w, "tokens.expect_start_object()?;")?;
        writeln!(w, "let mut value = None;")?;
        writeln!(w, "loop {{")?;
        w.indent();
        writeln!(w, "match tokens.next_token()? {{")?;
        w.indent();
        writeln!(w, "{}::json::Token::EndObject => break,", rt)?;
        writeln!(w, "{}::json::Token::ObjectKey(key) => match key.as_str() {{", rt)?;
        w.indent();
        for member in &union.members {
            let variant = ctx.symbols.variant_name(member);
            writeln!(w, "{:?} => {{", member.wire_name())?;
            w.indent();
            let expr = emit_de_value(ctx, w, &member.target, member.traits.timestamp_format, 0, default_ts)?;
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
        writeln!(w, "}},")?;
        writeln!(
            w,
            "_ => return Err({}::error::DeserializeError::custom(\"expected variant key\")),",
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
    let rt = ctx.rt();
    let setter = ctx.symbols.setter_name(member);
    let key = format!("{:?}", member.wire_name());
    let format = member.traits.timestamp_format.unwrap_or(default_ts);

    let nullable = match ctx.schema.expect(&member.target)? {
        Shape::Boolean => Some("tokens.expect_bool_or_null()?".to_string()),
        Shape::Byte => Some("tokens.expect_number_or_null()?.map(|n| n as i8)".to_string()),
        Shape::Short => Some("tokens.expect_number_or_null()?.map(|n| n as i16)".to_string()),
        Shape::Integer => Some("tokens.expect_number_or_null()?.map(|n| n as i32)".to_string()),
        Shape::Long => Some("tokens.expect_number_or_null()?.map(|n| n as i64)".to_string()),
        Shape::Float => Some("tokens.expect_number_or_null()?.map(|n| n as f32)".to_string()),
        Shape::Double => Some("tokens.expect_number_or_null()?".to_string()),
        Shape::String(_) => Some("tokens.expect_string_or_null()?".to_string()),
        Shape::Blob => Some("tokens.expect_base64_or_null()?".to_string()),
        Shape::Timestamp => Some(format!(
            "tokens.expect_timestamp_or_null({}::time::Format::{})?",
            rt,
            format.variant()
        )),
        _ => None,
    };
    if let Some(expr) = nullable {
        writeln!(w, "{} => builder = builder.{}({}),", key, setter, expr)?;
        return Ok(());
    }

    writeln!(w, "{} => {{", key)?;
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
    Ok(())
}

/// Emit the statements decoding one non-null value from the token stream and
/// return the expression yielding it.
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
        Shape::Boolean => "tokens.expect_bool()?".to_string(),
        Shape::Byte => "tokens.expect_number()? as i8".to_string(),
        Shape::Short => "tokens.expect_number()? as i16".to_string(),
        Shape::Integer => "tokens.expect_number()? as i32".to_string(),
        Shape::Long => "tokens.expect_number()? as i64".to_string(),
        Shape::Float => "tokens.expect_number()? as f32".to_string(),
        Shape::Double => "tokens.expect_number()?".to_string(),
        Shape::String(_) => "tokens.expect_string()?".to_string(),
        Shape::Blob => "tokens.expect_base64()?".to_string(),
        Shape::Timestamp => {
            let format = ts_override.unwrap_or(default_ts);
            format!(
                "tokens.expect_timestamp({}::time::Format::{})?",
                rt,
                format.variant()
            )
        }
        Shape::Document => "tokens.expect_document()?".to_string(),
        Shape::List(list) => {
            let items = format!("items_{}", depth + 1);
            writeln!(w, "tokens.expect_start_array()?;")?;
            writeln!(w, "let mut {} = Vec::new();", items)?;
            writeln!(w, "while !tokens.next_is_end_array()? {{")?;
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
            writeln!(w, "tokens.expect_end_array()?;")?;
            items
        }
        Shape::Map(map) => {
            let map_var = format!("map_{}", depth + 1);
            let key_var = format!("key_{}", depth + 1);
            writeln!(w, "tokens.expect_start_object()?;")?;
            writeln!(
                w,
                "let mut {} = std::collections::HashMap::new();",
                map_var
            )?;
            writeln!(w, "while let Some({}) = tokens.next_object_key()? {{", key_var)?;
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
            let nested = structure_deserializer(ctx, target, default_ts, BodyScope::Full)?;
            format!("{}(tokens)?.build()?", nested)
        }
        Shape::Union(_) => {
            let nested = union_deserializer(ctx, target, default_ts)?;
            format!("{}(tokens)?", nested)
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

/// Intern the protocol-wide generic error-envelope parser shared by the JSON
/// protocols: the `x-wire-error` header wins, then the `__type`/`code` body
/// fields; codes are stripped of namespace prefixes and uri suffixes.
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
        writeln!(w, "if let Some(code) = response.header(\"x-wire-error\") {{")?;
        w.indent();
        writeln!(
            w,
            "envelope.code = Some({}::error::sanitize_error_code(code).to_string());",
            rt
        )?;
        w.unindent();
        writeln!(w, "}}")?;
        writeln!(w, "let body = response.body();")?;
        writeln!(w, "if body.is_empty() {{")?;
        w.indent();
        writeln!(w, "return Ok(envelope);")?;
        w.unindent();
        writeln!(w, "}}")?;
        writeln!(w, "let mut tokens = {}::json::TokenIter::new(body);", rt)?;
        writeln!(w, "tokens.expect_start_object()?;")?;
        writeln!(w, "loop {{")?;
        w.indent();
        writeln!(w, "match tokens.next_token()? {{")?;
        w.indent();
        writeln!(w, "{}::json::Token::EndObject => break,", rt)?;
        writeln!(w, "{}::json::Token::ObjectKey(key) => match key.as_str() {{", rt)?;
        w.indent();
        writeln!(w, "\"__type\" | \"code\" => {{")?;
        w.indent();
        writeln!(w, "let code = tokens.expect_string_or_null()?;")?;
        writeln!(w, "if envelope.code.is_none() {{")?;
        w.indent();
        writeln!(
            w,
            "envelope.code = code.map(|code| {}::error::sanitize_error_code(code.as_str()).to_string());",
            rt
        )?;
        w.unindent();
        writeln!(w, "}}")?;
        w.unindent();
        writeln!(w, "}}")?;
        writeln!(
            w,
            "\"message\" | \"Message\" => envelope.message = tokens.expect_string_or_null()?,"
        )?;
        writeln!(w, "_ => tokens.skip_value()?,")?;
        w.unindent();
        writeln!(w, "}},")?;
        writeln!(w, "_ => break,")?;
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
