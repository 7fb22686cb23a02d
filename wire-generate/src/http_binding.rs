// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operation-level request/response emission for protocols with native HTTP
//! bindings, shared by the REST JSON and REST XML backends.
//!
//! Header, query, label and status bindings are decoded independently per
//! descriptor; the document body is delegated to the wire family in a single
//! step. Streaming payloads transfer body ownership instead of buffering;
//! only the error path ever buffers a streaming operation's response.

use crate::error::{GenError, Result};
use crate::event_stream;
use crate::indent::IndentedWriter;
use crate::protocol::{BodyScope, GenContext};
use crate::registry::FunctionHandle;
use crate::{common, json, xml};
use std::io::Write;
use wire_schema::bindings::{
    request_content_type, resolve_operation, BindingLocation, BindingMode, HttpBindingDescriptor,
    MessageBindings, OperationBindings, UriSegment,
};
use wire_schema::{Member, Shape, ShapeId, TimestampFormat};

/// Which wire family carries the document body.
#[derive(Clone, Copy, PartialEq)]
pub(crate) enum BodyFamily {
    Json,
    Xml,
}

impl BodyFamily {
    pub(crate) fn http_body_serializer(
        self,
        ctx: &GenContext<'_>,
        id: &ShapeId,
        default_ts: TimestampFormat,
        bindings: &MessageBindings,
    ) -> Result<FunctionHandle> {
        match self {
            BodyFamily::Json => {
                json::structure_serializer(ctx, id, default_ts, BodyScope::DocumentOnly(bindings))
            }
            BodyFamily::Xml => {
                xml::structure_serializer(ctx, id, default_ts, BodyScope::DocumentOnly(bindings))
            }
        }
    }

    pub(crate) fn http_body_deserializer(
        self,
        ctx: &GenContext<'_>,
        id: &ShapeId,
        default_ts: TimestampFormat,
        bindings: &MessageBindings,
    ) -> Result<FunctionHandle> {
        match self {
            BodyFamily::Json => {
                json::structure_deserializer(ctx, id, default_ts, BodyScope::DocumentOnly(bindings))
            }
            BodyFamily::Xml => {
                xml::structure_deserializer(ctx, id, default_ts, BodyScope::DocumentOnly(bindings))
            }
        }
    }

    pub(crate) fn full_serializer(
        self,
        ctx: &GenContext<'_>,
        id: &ShapeId,
        default_ts: TimestampFormat,
    ) -> Result<FunctionHandle> {
        match self {
            BodyFamily::Json => json::structure_serializer(ctx, id, default_ts, BodyScope::Full),
            BodyFamily::Xml => xml::structure_serializer(ctx, id, default_ts, BodyScope::Full),
        }
    }

    pub(crate) fn full_deserializer(
        self,
        ctx: &GenContext<'_>,
        id: &ShapeId,
        default_ts: TimestampFormat,
    ) -> Result<FunctionHandle> {
        match self {
            BodyFamily::Json => json::structure_deserializer(ctx, id, default_ts, BodyScope::Full),
            BodyFamily::Xml => xml::structure_deserializer(ctx, id, default_ts, BodyScope::Full),
        }
    }
}

/// Timestamp default per binding location; sits between the member override
/// and the protocol default.
fn location_ts_default(location: &BindingLocation, protocol_default: TimestampFormat) -> TimestampFormat {
    match location {
        BindingLocation::Header(_) | BindingLocation::PrefixHeaders(_) => TimestampFormat::HttpDate,
        BindingLocation::Query(_) | BindingLocation::Label { .. } => TimestampFormat::DateTime,
        _ => protocol_default,
    }
}

fn member_ts(member: &Member, location: &BindingLocation, protocol_default: TimestampFormat) -> TimestampFormat {
    member
        .traits
        .timestamp_format
        .unwrap_or_else(|| location_ts_default(location, protocol_default))
}

/// The member carrying an unbounded stream, if any.
fn stream_member(bindings: &MessageBindings) -> Option<&HttpBindingDescriptor> {
    bindings
        .bindings
        .iter()
        .find(|b| b.member.is_streaming() || b.member.is_event_stream())
}

/// Intern the request serializer of a REST-bound operation.
pub(crate) fn request_serializer(
    ctx: &GenContext<'_>,
    protocol_name: &'static str,
    family: BodyFamily,
    default_content_type: &'static str,
    operation: &ShapeId,
    default_ts: TimestampFormat,
) -> Result<FunctionHandle> {
    let bindings = resolve_operation(ctx.schema, operation, &BindingMode::Http)?;
    let module = format!("{}_ops", protocol_name);
    let name = common::op_fn("ser", operation, "http_request");
    let rt = ctx.rt().to_string();

    let input_shape = bindings.input.shape.clone();
    let input_type = match &input_shape {
        Some(id) => ctx.symbols.model_type(id),
        None => format!("{}::http::NoInput", rt),
    };
    let streaming = stream_member(&bindings.input).cloned();
    let content_type = request_content_type(ctx.schema, &bindings, default_content_type)?;

    // Helpers must exist before the op function is interned so that failures
    // stay local and nothing half-generated is referenced.
    let body_plan = plan_request_body(ctx, family, &bindings, default_ts, protocol_name)?;

    ctx.registry.intern(&module, &name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        let by_value = streaming.is_some();
        writeln!(
            w,
            "pub fn {}({} {ty}) -> Result<{rt}::http::Request, {rt}::error::SerializeError> {{",
            handle.name(),
            if by_value { "input:" } else { "input: &" },
            ty = input_type,
            rt = rt,
        )?;
        w.indent();
        if input_shape.is_none() {
            writeln!(w, "let _ = input;")?;
        }
        emit_uri(ctx, w, &bindings, default_ts)?;
        writeln!(
            w,
            "let mut request = {}::http::Request::new({:?}, uri.as_str());",
            rt, bindings.method
        )?;
        for (key, value) in &bindings.uri.query_literals {
            writeln!(
                w,
                "request.query({:?}, {:?});",
                key,
                value.as_deref().unwrap_or("")
            )?;
        }
        for descriptor in bindings.input.queries() {
            emit_query_param(ctx, w, descriptor, default_ts)?;
        }
        if let Some(content_type) = &content_type {
            writeln!(w, "request.header(\"content-type\", {:?});", content_type)?;
        }
        for descriptor in bindings.input.headers() {
            emit_request_header(ctx, w, descriptor, default_ts)?;
        }
        for descriptor in bindings.input.prefix_headers() {
            emit_request_prefix_headers(ctx, w, descriptor)?;
        }
        emit_request_body(ctx, w, &body_plan)?;
        writeln!(w, "Ok(request)")?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    })
}

/// What the request body step emits; computed before interning the function.
enum RequestBody {
    None,
    Document {
        serializer: FunctionHandle,
        shape_name: String,
        family: BodyFamily,
    },
    BlobPayload {
        field: String,
        optional: bool,
    },
    StringPayload {
        field: String,
        optional: bool,
    },
    StructuredPayload {
        serializer: FunctionHandle,
        shape_name: String,
        field: String,
        optional: bool,
        family: BodyFamily,
    },
    DocumentPayload {
        field: String,
        optional: bool,
    },
    StreamingBlob {
        field: String,
    },
    EventStream {
        field: String,
        marshaller: FunctionHandle,
    },
}

fn plan_request_body(
    ctx: &GenContext<'_>,
    family: BodyFamily,
    bindings: &OperationBindings,
    default_ts: TimestampFormat,
    protocol_name: &'static str,
) -> Result<RequestBody> {
    let input = &bindings.input;
    if let Some(descriptor) = input.payload() {
        let member = &descriptor.member;
        let field = ctx.symbols.field_name(member);
        let optional = ctx.symbols.is_optional(member);
        if member.is_event_stream() {
            let marshaller = event_stream::marshaller(
                ctx,
                protocol_name,
                family,
                &member.target,
                default_ts,
            )?;
            // Frames flow both ways on one connection; the unmarshaller is
            // part of the stream's contract even on the request side.
            event_stream::unmarshaller(ctx, protocol_name, family, &member.target, default_ts)?;
            return Ok(RequestBody::EventStream { field, marshaller });
        }
        if member.is_streaming() {
            return Ok(RequestBody::StreamingBlob { field });
        }
        return match ctx.schema.expect(&member.target)? {
            Shape::Blob => Ok(RequestBody::BlobPayload { field, optional }),
            Shape::String(_) => Ok(RequestBody::StringPayload { field, optional }),
            Shape::Structure(_) => Ok(RequestBody::StructuredPayload {
                serializer: family.full_serializer(ctx, &member.target, default_ts)?,
                shape_name: member.target.name().to_string(),
                field,
                optional,
                family,
            }),
            Shape::Union(_) => {
                let serializer = match family {
                    BodyFamily::Json => {
                        json::union_serializer(ctx, &member.target, default_ts)?
                    }
                    BodyFamily::Xml => xml::union_serializer(ctx, &member.target, default_ts)?,
                };
                Ok(RequestBody::StructuredPayload {
                    serializer,
                    shape_name: member.target.name().to_string(),
                    field,
                    optional,
                    family,
                })
            }
            Shape::Document => match family {
                BodyFamily::Json => Ok(RequestBody::DocumentPayload { field, optional }),
                BodyFamily::Xml => Err(GenError::unsupported(
                    protocol_name,
                    &member.target,
                    "document payloads have no XML representation",
                )),
            },
            other => Err(GenError::unsupported(
                protocol_name,
                &member.target,
                format!("{} cannot be an HTTP payload", other.kind_name()),
            )),
        };
    }
    if input.document_members().next().is_some() {
        let shape = input
            .shape
            .as_ref()
            .ok_or_else(|| GenError::unsupported(protocol_name, &bindings.operation, "document body without an input shape"))?;
        return Ok(RequestBody::Document {
            serializer: family.http_body_serializer(ctx, shape, default_ts, input)?,
            shape_name: shape.name().to_string(),
            family,
        });
    }
    Ok(RequestBody::None)
}

fn emit_request_body(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    plan: &RequestBody,
) -> Result<()> {
    let rt = ctx.rt();
    match plan {
        RequestBody::None => {}
        RequestBody::Document {
            serializer,
            shape_name,
            family,
        } => {
            emit_structured_body(w, rt, serializer, shape_name, *family, "input")?;
        }
        RequestBody::BlobPayload { field, optional } => {
            if *optional {
                writeln!(w, "if let Some(var_{f}) = &input.{f} {{", f = field)?;
                w.indent();
                writeln!(
                    w,
                    "request.body({}::body::Body::from_blob(var_{}.clone()));",
                    rt, field
                )?;
                w.unindent();
                writeln!(w, "}}")?;
            } else {
                writeln!(
                    w,
                    "request.body({}::body::Body::from_blob(input.{}.clone()));",
                    rt, field
                )?;
            }
        }
        RequestBody::StringPayload { field, optional } => {
            if *optional {
                writeln!(w, "if let Some(var_{f}) = &input.{f} {{", f = field)?;
                w.indent();
                writeln!(
                    w,
                    "request.body({}::body::Body::from_string(var_{}.clone()));",
                    rt, field
                )?;
                w.unindent();
                writeln!(w, "}}")?;
            } else {
                writeln!(
                    w,
                    "request.body({}::body::Body::from_string(input.{}.clone()));",
                    rt, field
                )?;
            }
        }
        RequestBody::StructuredPayload {
            serializer,
            shape_name,
            field,
            optional,
            family,
        } => {
            let value = format!("var_{}", field);
            if *optional {
                writeln!(w, "if let Some({v}) = &input.{f} {{", v = value, f = field)?;
                w.indent();
            } else {
                writeln!(w, "let {} = &input.{};", value, field)?;
            }
            emit_structured_body(w, rt, serializer, shape_name, *family, &value)?;
            if *optional {
                w.unindent();
                writeln!(w, "}}")?;
            }
        }
        RequestBody::DocumentPayload { field, optional } => {
            let value = format!("var_{}", field);
            if *optional {
                writeln!(w, "if let Some({v}) = &input.{f} {{", v = value, f = field)?;
                w.indent();
            } else {
                writeln!(w, "let {} = &input.{};", value, field)?;
            }
            writeln!(w, "let mut body = String::new();")?;
            writeln!(w, "{}::json::write_document(&mut body, {})?;", rt, value)?;
            writeln!(w, "request.body({}::body::Body::from_string(body));", rt)?;
            if *optional {
                w.unindent();
                writeln!(w, "}}")?;
            }
        }
        RequestBody::StreamingBlob { field } => {
            writeln!(
                w,
                "request.body({}::body::Body::from_stream(input.{}));",
                rt, field
            )?;
        }
        RequestBody::EventStream { field, marshaller } => {
            writeln!(
                w,
                "request.body({}::body::Body::from_event_stream(input.{}, {}));",
                rt, field, marshaller
            )?;
        }
    }
    Ok(())
}

fn emit_structured_body(
    w: &mut IndentedWriter<&mut Vec<u8>>,
    rt: &str,
    serializer: &FunctionHandle,
    shape_name: &str,
    family: BodyFamily,
    value: &str,
) -> Result<()> {
    writeln!(w, "let mut body = String::new();")?;
    match family {
        BodyFamily::Json => {
            writeln!(
                w,
                "let mut object = {}::json::JsonObjectWriter::new(&mut body);",
                rt
            )?;
            writeln!(w, "{}(&mut object, {})?;", serializer, value)?;
            writeln!(w, "object.finish();")?;
        }
        BodyFamily::Xml => {
            writeln!(w, "let mut writer = {}::xml::XmlWriter::new(&mut body);", rt)?;
            writeln!(w, "let mut root = writer.start_el({:?});", shape_name)?;
            writeln!(w, "{}(&mut root, {})?;", serializer, value)?;
            writeln!(w, "root.finish();")?;
        }
    }
    writeln!(w, "request.body({}::body::Body::from_string(body));", rt)?;
    Ok(())
}

fn emit_uri(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    bindings: &OperationBindings,
    default_ts: TimestampFormat,
) -> Result<()> {
    let rt = ctx.rt();
    // Bind label values first; absent optional labels are a serialization
    // error, not a panic.
    for descriptor in bindings.input.labels() {
        let member = &descriptor.member;
        let field = ctx.symbols.field_name(member);
        if ctx.symbols.is_optional(member) {
            writeln!(
                w,
                "let var_{f} = input.{f}.as_ref().ok_or_else(|| {rt}::error::SerializeError::missing_member({name:?}))?;",
                f = field,
                rt = rt,
                name = member.name,
            )?;
        } else {
            writeln!(w, "let var_{f} = &input.{f};", f = field)?;
        }
    }
    writeln!(w, "let mut uri = String::new();")?;
    for segment in &bindings.uri.segments {
        match segment {
            UriSegment::Literal(text) => {
                writeln!(w, "uri.push_str({:?});", format!("/{}", text))?;
            }
            UriSegment::Label { name, greedy } => {
                let descriptor = bindings
                    .input
                    .labels()
                    .find(|d| d.member.name == *name)
                    .expect("checked during binding resolution");
                let member = &descriptor.member;
                let field = ctx.symbols.field_name(member);
                let text = label_text_expr(
                    ctx,
                    member,
                    &format!("var_{}", field),
                    member_ts(member, &descriptor.location, default_ts),
                )?;
                writeln!(w, "uri.push('/');")?;
                writeln!(
                    w,
                    "uri.push_str({}::http::encode_label({}, {}).as_str());",
                    rt, text, greedy
                )?;
            }
        }
    }
    if bindings.uri.segments.is_empty() {
        writeln!(w, "uri.push('/');")?;
    }
    Ok(())
}

fn label_text_expr(
    ctx: &GenContext<'_>,
    member: &Member,
    var: &str,
    format: TimestampFormat,
) -> Result<String> {
    let rt = ctx.rt();
    let expr = match ctx.schema.expect(&member.target)? {
        Shape::String(_) => format!("{}.as_str()", var),
        Shape::Boolean
        | Shape::Byte
        | Shape::Short
        | Shape::Integer
        | Shape::Long
        | Shape::Float
        | Shape::Double => format!("{}.to_string().as_str()", var),
        Shape::Timestamp => format!(
            "{rt}::time::format({}, {rt}::time::Format::{}).as_str()",
            var,
            format.variant(),
            rt = rt,
        ),
        other => {
            return Err(GenError::unsupported(
                "http",
                &member.target,
                format!("{} cannot be a uri label", other.kind_name()),
            ))
        }
    };
    Ok(expr)
}

fn emit_query_param(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    descriptor: &HttpBindingDescriptor,
    default_ts: TimestampFormat,
) -> Result<()> {
    let rt = ctx.rt();
    let member = &descriptor.member;
    let field = ctx.symbols.field_name(member);
    let var = format!("var_{}", field);
    let name = match &descriptor.location {
        BindingLocation::Query(name) => name.clone(),
        _ => member.wire_name().to_string(),
    };
    let format = member_ts(member, &descriptor.location, default_ts);

    let optional = ctx.symbols.is_optional(member);
    if optional {
        writeln!(w, "if let Some({v}) = &input.{f} {{", v = var, f = field)?;
        w.indent();
    } else {
        writeln!(w, "let {} = &input.{};", var, field)?;
    }
    match ctx.schema.expect(&member.target)? {
        Shape::List(list) => {
            let item = "item_1";
            writeln!(w, "for {} in {} {{", item, var)?;
            w.indent();
            let scalar = query_text_expr(ctx, &list.member.target, item, format)?;
            writeln!(w, "request.query({:?}, {});", name, scalar)?;
            w.unindent();
            writeln!(w, "}}")?;
        }
        _ => {
            let scalar = query_text_expr(ctx, &member.target, &var, format)?;
            writeln!(w, "request.query({:?}, {});", name, scalar)?;
        }
    }
    if optional {
        w.unindent();
        writeln!(w, "}}")?;
    }
    Ok(())
}

fn query_text_expr(
    ctx: &GenContext<'_>,
    target: &ShapeId,
    var: &str,
    format: TimestampFormat,
) -> Result<String> {
    let rt = ctx.rt();
    let expr = match ctx.schema.expect(target)? {
        Shape::String(_) => format!("{}.as_str()", var),
        Shape::Boolean
        | Shape::Byte
        | Shape::Short
        | Shape::Integer
        | Shape::Long
        | Shape::Float
        | Shape::Double => format!("{}.to_string().as_str()", var),
        Shape::Timestamp => format!(
            "{rt}::time::format({}, {rt}::time::Format::{}).as_str()",
            var,
            format.variant(),
            rt = rt,
        ),
        other => {
            return Err(GenError::unsupported(
                "http",
                target,
                format!("{} cannot be a query param", other.kind_name()),
            ))
        }
    };
    Ok(expr)
}

fn emit_request_header(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    descriptor: &HttpBindingDescriptor,
    default_ts: TimestampFormat,
) -> Result<()> {
    let rt = ctx.rt();
    let member = &descriptor.member;
    let field = ctx.symbols.field_name(member);
    let var = format!("var_{}", field);
    let name = match &descriptor.location {
        BindingLocation::Header(name) => name.to_ascii_lowercase(),
        _ => member.wire_name().to_string(),
    };
    let format = member_ts(member, &descriptor.location, default_ts);

    let optional = ctx.symbols.is_optional(member);
    if optional {
        writeln!(w, "if let Some({v}) = &input.{f} {{", v = var, f = field)?;
        w.indent();
    } else {
        writeln!(w, "let {} = &input.{};", var, field)?;
    }
    let expr = match ctx.schema.expect(&member.target)? {
        Shape::String(_) => format!("{}.as_str()", var),
        Shape::Boolean
        | Shape::Byte
        | Shape::Short
        | Shape::Integer
        | Shape::Long
        | Shape::Float
        | Shape::Double => format!("{}.to_string().as_str()", var),
        Shape::Timestamp => format!(
            "{rt}::time::format({}, {rt}::time::Format::{}).as_str()",
            var,
            format.variant(),
            rt = rt,
        ),
        Shape::Blob => format!("{}::base64::encode({}).as_str()", rt, var),
        Shape::List(list) => match ctx.schema.expect(&list.member.target)? {
            Shape::String(_) => format!("{}::http::comma_join({}).as_str()", rt, var),
            other => {
                return Err(GenError::unsupported(
                    "http",
                    &list.member.target,
                    format!("header-bound lists of {} are not supported", other.kind_name()),
                ))
            }
        },
        other => {
            return Err(GenError::unsupported(
                "http",
                &member.target,
                format!("{} cannot be a header value", other.kind_name()),
            ))
        }
    };
    writeln!(w, "request.header({:?}, {});", name, expr)?;
    if optional {
        w.unindent();
        writeln!(w, "}}")?;
    }
    Ok(())
}

fn emit_request_prefix_headers(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    descriptor: &HttpBindingDescriptor,
) -> Result<()> {
    let member = &descriptor.member;
    let field = ctx.symbols.field_name(member);
    let var = format!("var_{}", field);
    let prefix = match &descriptor.location {
        BindingLocation::PrefixHeaders(prefix) => prefix.to_ascii_lowercase(),
        _ => String::new(),
    };
    let map = match ctx.schema.expect(&member.target)? {
        Shape::Map(map) => map,
        other => {
            return Err(GenError::unsupported(
                "http",
                &member.target,
                format!("prefix headers require a map, found {}", other.kind_name()),
            ))
        }
    };
    match ctx.schema.expect(&map.value.target)? {
        Shape::String(_) => {}
        other => {
            return Err(GenError::unsupported(
                "http",
                &map.value.target,
                format!("prefix header values must be strings, found {}", other.kind_name()),
            ))
        }
    }

    let optional = ctx.symbols.is_optional(member);
    if optional {
        writeln!(w, "if let Some({v}) = &input.{f} {{", v = var, f = field)?;
        w.indent();
    } else {
        writeln!(w, "let {} = &input.{};", var, field)?;
    }
    writeln!(w, "for (key_1, value_1) in {} {{", var)?;
    w.indent();
    writeln!(
        w,
        "request.header(format!(\"{}{{}}\", key_1).as_str(), value_1.as_str());",
        prefix
    )?;
    w.unindent();
    writeln!(w, "}}")?;
    if optional {
        w.unindent();
        writeln!(w, "}}")?;
    }
    Ok(())
}

/// Intern the success-response parser of a REST-bound operation.
pub(crate) fn response_parser(
    ctx: &GenContext<'_>,
    protocol_name: &'static str,
    family: BodyFamily,
    operation: &ShapeId,
    default_ts: TimestampFormat,
) -> Result<FunctionHandle> {
    let bindings = resolve_operation(ctx.schema, operation, &BindingMode::Http)?;
    let module = format!("{}_ops", protocol_name);
    let name = common::op_fn("de", operation, "http_response");
    let rt = ctx.rt().to_string();

    let output_shape = match &bindings.output.shape {
        Some(id) => id.clone(),
        None => {
            // No output shape: parse to the unit output type.
            return unit_response_parser(ctx, &module, &name, &rt);
        }
    };
    let builder_type = ctx.symbols.builder_type(&output_shape);
    let output_type = ctx.symbols.model_type(&output_shape);
    let streaming = stream_member(&bindings.output).cloned();

    let body_plan = plan_response_body(ctx, protocol_name, family, &bindings, default_ts)?;
    let field_steps = plan_field_decodes(ctx, &bindings.output, default_ts)?;

    ctx.registry.intern(&module, &name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        let by_value = streaming.is_some();
        writeln!(
            w,
            "pub fn {}({} {rt}::http::Response) -> Result<{ty}, {rt}::error::ResponseError> {{",
            handle.name(),
            if by_value { "mut response:" } else { "response: &" },
            ty = output_type,
            rt = rt,
        )?;
        w.indent();
        writeln!(w, "let mut builder = {}::default();", builder_type)?;
        emit_response_body(ctx, w, &body_plan)?;
        for step in &field_steps {
            w.write_all(step.as_bytes())?;
        }
        writeln!(
            w,
            "builder.build().map_err({}::error::ResponseError::missing_field)",
            rt
        )?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    })
}

pub(crate) fn unit_response_parser(
    ctx: &GenContext<'_>,
    module: &str,
    name: &str,
    rt: &str,
) -> Result<FunctionHandle> {
    let rt = rt.to_string();
    ctx.registry.intern(module, name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        writeln!(
            w,
            "pub fn {}(response: &{rt}::http::Response) -> Result<(), {rt}::error::ResponseError> {{",
            handle.name(),
            rt = rt,
        )?;
        w.indent();
        writeln!(w, "let _ = response;")?;
        writeln!(w, "Ok(())")?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    })
}

enum ResponseBody {
    None,
    Document {
        deserializer: FunctionHandle,
    },
    BlobPayload {
        setter: String,
    },
    StringPayload {
        setter: String,
    },
    StructuredPayload {
        deserializer: FunctionHandle,
        setter: String,
        family: BodyFamily,
        union: bool,
    },
    StreamingBlob {
        setter: String,
    },
    EventStream {
        setter: String,
        unmarshaller: FunctionHandle,
        initial: Option<FunctionHandle>,
    },
}

fn plan_response_body(
    ctx: &GenContext<'_>,
    protocol_name: &'static str,
    family: BodyFamily,
    bindings: &OperationBindings,
    default_ts: TimestampFormat,
) -> Result<ResponseBody> {
    let output = &bindings.output;
    if let Some(descriptor) = output.payload() {
        let member = &descriptor.member;
        let setter = ctx.symbols.setter_name(member);
        if member.is_event_stream() {
            let unmarshaller = event_stream::unmarshaller(
                ctx,
                protocol_name,
                family,
                &member.target,
                default_ts,
            )?;
            event_stream::marshaller(ctx, protocol_name, family, &member.target, default_ts)?;
            let initial = match &output.shape {
                Some(shape) if output.document_members().next().is_some() => Some(
                    family.http_body_deserializer(ctx, shape, default_ts, output)?,
                ),
                _ => None,
            };
            return Ok(ResponseBody::EventStream {
                setter,
                unmarshaller,
                initial,
            });
        }
        if member.is_streaming() {
            return Ok(ResponseBody::StreamingBlob { setter });
        }
        return match ctx.schema.expect(&member.target)? {
            Shape::Blob => Ok(ResponseBody::BlobPayload { setter }),
            Shape::String(_) => Ok(ResponseBody::StringPayload { setter }),
            Shape::Structure(_) => Ok(ResponseBody::StructuredPayload {
                deserializer: family.full_deserializer(ctx, &member.target, default_ts)?,
                setter,
                family,
                union: false,
            }),
            Shape::Union(_) => {
                let deserializer = match family {
                    BodyFamily::Json => json::union_deserializer(ctx, &member.target, default_ts)?,
                    BodyFamily::Xml => xml::union_deserializer(ctx, &member.target, default_ts)?,
                };
                Ok(ResponseBody::StructuredPayload {
                    deserializer,
                    setter,
                    family,
                    union: true,
                })
            }
            other => Err(GenError::unsupported(
                protocol_name,
                &member.target,
                format!("{} cannot be an HTTP payload", other.kind_name()),
            )),
        };
    }
    if output.document_members().next().is_some() {
        let shape = output.shape.as_ref().ok_or_else(|| {
            GenError::unsupported(
                protocol_name,
                &bindings.operation,
                "document body without an output shape",
            )
        })?;
        return Ok(ResponseBody::Document {
            deserializer: family.http_body_deserializer(ctx, shape, default_ts, output)?,
        });
    }
    Ok(ResponseBody::None)
}

fn emit_response_body(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    plan: &ResponseBody,
) -> Result<()> {
    let rt = ctx.rt();
    match plan {
        ResponseBody::None => {}
        ResponseBody::Document { deserializer } => {
            writeln!(
                w,
                "builder = {}(response.body(), builder).map_err(|err| {}::error::ResponseError::unhandled_in(\"document body\", err))?;",
                deserializer, rt
            )?;
        }
        ResponseBody::BlobPayload { setter } => {
            writeln!(
                w,
                "builder = builder.{}(Some({}::blob::Blob::new(response.body().to_vec())));",
                setter, rt
            )?;
        }
        ResponseBody::StringPayload { setter } => {
            writeln!(
                w,
                "let text = String::from_utf8(response.body().to_vec()).map_err(|err| {}::error::ResponseError::unhandled_in(\"payload\", err))?;",
                rt
            )?;
            writeln!(w, "builder = builder.{}(Some(text));", setter)?;
        }
        ResponseBody::StructuredPayload {
            deserializer,
            setter,
            family,
            union,
        } => {
            match family {
                BodyFamily::Json => {
                    writeln!(
                        w,
                        "let mut tokens = {}::json::TokenIter::new(response.body());",
                        rt
                    )?;
                    if *union {
                        writeln!(
                            w,
                            "let value = {}(&mut tokens).map_err(|err| {}::error::ResponseError::unhandled_in(\"payload\", err))?;",
                            deserializer, rt
                        )?;
                    } else {
                        writeln!(
                            w,
                            "let value = {}(&mut tokens).and_then(|builder| Ok(builder.build()?)).map_err(|err| {}::error::ResponseError::unhandled_in(\"payload\", err))?;",
                            deserializer, rt
                        )?;
                    }
                }
                BodyFamily::Xml => {
                    writeln!(
                        w,
                        "let mut doc = {}::xml::Document::try_from(response.body()).map_err(|err| {}::error::ResponseError::unhandled_in(\"payload\", err))?;",
                        rt, rt
                    )?;
                    writeln!(
                        w,
                        "let mut root = doc.root_element().map_err(|err| {}::error::ResponseError::unhandled_in(\"payload\", err))?;",
                        rt
                    )?;
                    if *union {
                        writeln!(
                            w,
                            "let value = {}(&mut root).map_err(|err| {}::error::ResponseError::unhandled_in(\"payload\", err))?;",
                            deserializer, rt
                        )?;
                    } else {
                        writeln!(
                            w,
                            "let value = {}(&mut root).and_then(|builder| Ok(builder.build()?)).map_err(|err| {}::error::ResponseError::unhandled_in(\"payload\", err))?;",
                            deserializer, rt
                        )?;
                    }
                }
            }
            writeln!(w, "builder = builder.{}(Some(value));", setter)?;
        }
        ResponseBody::StreamingBlob { setter } => {
            // Success path: hand the raw body through without decoding.
            writeln!(
                w,
                "builder = builder.{}(Some(response.take_body().into_stream()));",
                setter
            )?;
        }
        ResponseBody::EventStream {
            setter,
            unmarshaller,
            initial,
        } => {
            writeln!(
                w,
                "let mut stream = response.take_body().into_event_stream();"
            )?;
            if let Some(initial) = initial {
                // Out-of-band fields of the first frame merge into the output
                // before the stream is handed to the caller.
                writeln!(
                    w,
                    "if let Some(first) = stream.try_recv_initial().map_err(|err| {}::error::ResponseError::unhandled_in(\"initial response\", err))? {{",
                    rt
                )?;
                w.indent();
                writeln!(
                    w,
                    "builder = {}(first.payload(), builder).map_err(|err| {}::error::ResponseError::unhandled_in(\"initial response\", err))?;",
                    initial, rt
                )?;
                w.unindent();
                writeln!(w, "}}")?;
            }
            writeln!(
                w,
                "builder = builder.{}(Some({}::event_stream::EventStream::new(stream, {})));",
                setter, rt, unmarshaller
            )?;
        }
    }
    Ok(())
}

/// Emit the independent per-descriptor decodes (headers, prefix headers,
/// status) of a buffered message as ready-to-write snippets.
pub(crate) fn plan_field_decodes(
    ctx: &GenContext<'_>,
    message: &MessageBindings,
    default_ts: TimestampFormat,
) -> Result<Vec<String>> {
    let rt = ctx.rt();
    let mut steps = Vec::new();
    for descriptor in message.headers() {
        let member = &descriptor.member;
        let name = match &descriptor.location {
            BindingLocation::Header(name) => name.to_ascii_lowercase(),
            _ => member.wire_name().to_string(),
        };
        let location = format!("header `{}`", name);
        let setter = ctx.symbols.setter_name(member);
        let format = member_ts(member, &descriptor.location, default_ts);
        let value = match ctx.schema.expect(&member.target)? {
            Shape::String(_) => "raw.to_string()".to_string(),
            Shape::Boolean => format!(
                "raw.parse::<bool>().map_err(|err| {}::error::ResponseError::unhandled_in({:?}, err))?",
                rt, location
            ),
            Shape::Byte => parse_number(rt, &location, "i8"),
            Shape::Short => parse_number(rt, &location, "i16"),
            Shape::Integer => parse_number(rt, &location, "i32"),
            Shape::Long => parse_number(rt, &location, "i64"),
            Shape::Float => parse_number(rt, &location, "f32"),
            Shape::Double => parse_number(rt, &location, "f64"),
            Shape::Timestamp => format!(
                "{rt}::time::parse(raw, {rt}::time::Format::{}).map_err(|err| {rt}::error::ResponseError::unhandled_in({:?}, err))?",
                format.variant(),
                location,
                rt = rt,
            ),
            Shape::Blob => format!(
                "{rt}::base64::decode(raw).map_err(|err| {rt}::error::ResponseError::unhandled_in({:?}, err))?",
                location,
                rt = rt,
            ),
            Shape::List(list) => match ctx.schema.expect(&list.member.target)? {
                Shape::String(_) => format!("{}::http::split_header(raw)", rt),
                other => {
                    return Err(GenError::unsupported(
                        "http",
                        &list.member.target,
                        format!("header-bound lists of {} are not supported", other.kind_name()),
                    ))
                }
            },
            other => {
                return Err(GenError::unsupported(
                    "http",
                    &member.target,
                    format!("{} cannot be a header value", other.kind_name()),
                ))
            }
        };
        steps.push(format!(
            "if let Some(raw) = response.header({:?}) {{\n    builder = builder.{}(Some({}));\n}}\n",
            name, setter, value
        ));
    }
    for descriptor in message.prefix_headers() {
        let member = &descriptor.member;
        let prefix = match &descriptor.location {
            BindingLocation::PrefixHeaders(prefix) => prefix.to_ascii_lowercase(),
            _ => String::new(),
        };
        let setter = ctx.symbols.setter_name(member);
        steps.push(format!(
            "let mut prefixed = std::collections::HashMap::new();\nfor (name, value) in response.headers_with_prefix({prefix:?}) {{\n    prefixed.insert(name.to_string(), value.to_string());\n}}\nif !prefixed.is_empty() {{\n    builder = builder.{setter}(Some(prefixed));\n}}\n",
            prefix = prefix,
            setter = setter,
        ));
    }
    if let Some(descriptor) = message.status_code() {
        // Copying the numeric status can never fail.
        let setter = ctx.symbols.setter_name(&descriptor.member);
        steps.push(format!(
            "builder = builder.{}(Some(response.status() as i32));\n",
            setter
        ));
    }
    Ok(steps)
}

fn parse_number(rt: &str, location: &str, ty: &str) -> String {
    format!(
        "raw.parse::<{ty}>().map_err(|err| {rt}::error::ResponseError::unhandled_in({location:?}, err))?",
        ty = ty,
        rt = rt,
        location = location,
    )
}
