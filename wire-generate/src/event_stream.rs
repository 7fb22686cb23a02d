// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event-stream frame marshaller/unmarshaller emission.
//!
//! An event stream is a union-typed sequence of framed messages. The emitted
//! marshaller maps one union value to a frame — `:message-type`,
//! `:event-type` and `:content-type` headers plus a payload encoded by the
//! wire family — and runs the per-frame signing hook before returning. The
//! unmarshaller dispatches on the frame headers: events decode into union
//! variants, exceptions discriminate against the union's error-carrying
//! variants, everything else surfaces as unhandled.

use crate::common;
use crate::error::{GenError, Result};
use crate::http_binding::BodyFamily;
use crate::indent::IndentedWriter;
use crate::protocol::{BodyScope, GenContext};
use crate::registry::FunctionHandle;
use crate::{cbor, json, xml};
use std::io::Write;
use wire_schema::{Member, Shape, ShapeId, TimestampFormat};

/// How frame payloads are encoded.
#[derive(Clone, Copy, PartialEq)]
pub(crate) enum FrameEncoding {
    Json,
    Xml,
    Cbor,
}

impl From<BodyFamily> for FrameEncoding {
    fn from(family: BodyFamily) -> Self {
        match family {
            BodyFamily::Json => FrameEncoding::Json,
            BodyFamily::Xml => FrameEncoding::Xml,
        }
    }
}

impl FrameEncoding {
    fn module(self) -> &'static str {
        match self {
            FrameEncoding::Json => "json_event",
            FrameEncoding::Xml => "xml_event",
            FrameEncoding::Cbor => "cbor_event",
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            FrameEncoding::Json => "application/json",
            FrameEncoding::Xml => "application/xml",
            FrameEncoding::Cbor => "application/cbor",
        }
    }

    fn structure_serializer(
        self,
        ctx: &GenContext<'_>,
        id: &ShapeId,
        default_ts: TimestampFormat,
    ) -> Result<FunctionHandle> {
        match self {
            FrameEncoding::Json => {
                json::structure_serializer(ctx, id, default_ts, BodyScope::Full)
            }
            FrameEncoding::Xml => xml::structure_serializer(ctx, id, default_ts, BodyScope::Full),
            FrameEncoding::Cbor => cbor::structure_serializer(ctx, id, default_ts),
        }
    }

    fn structure_deserializer(
        self,
        ctx: &GenContext<'_>,
        id: &ShapeId,
        default_ts: TimestampFormat,
    ) -> Result<FunctionHandle> {
        match self {
            FrameEncoding::Json => {
                json::structure_deserializer(ctx, id, default_ts, BodyScope::Full)
            }
            FrameEncoding::Xml => xml::structure_deserializer(ctx, id, default_ts, BodyScope::Full),
            FrameEncoding::Cbor => cbor::structure_deserializer(ctx, id, default_ts, false),
        }
    }
}

/// Intern the per-message marshaller of an event-stream union.
pub(crate) fn marshaller<E>(
    ctx: &GenContext<'_>,
    _protocol_name: &'static str,
    encoding: E,
    union_id: &ShapeId,
    default_ts: TimestampFormat,
) -> Result<FunctionHandle>
where
    E: Into<FrameEncoding>,
{
    let encoding = encoding.into();
    let union = ctx.schema.expect_union(union_id)?;
    let name = common::shape_fn("marshall", "event", union_id, None);
    let rt = ctx.rt().to_string();
    let input_type = ctx.symbols.model_type(union_id);

    // Per-variant payload serializers are interned up front.
    let mut serializers = Vec::with_capacity(union.members.len());
    for member in &union.members {
        serializers.push(variant_serializer(ctx, encoding, member, default_ts)?);
    }

    ctx.registry.intern(encoding.module(), &name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        writeln!(
            w,
            "pub fn {}(input: &{ty}, signer: &mut dyn {rt}::event_stream::SignMessage) -> Result<{rt}::event_stream::Message, {rt}::error::SerializeError> {{",
            handle.name(),
            ty = input_type,
            rt = rt,
        )?;
        w.indent();
        writeln!(w, "let mut headers = Vec::new();")?;
        writeln!(w, "let payload;")?;
        writeln!(w, "match input {{")?;
        w.indent();
        for (member, serializer) in union.members.iter().zip(&serializers) {
            let variant = ctx.symbols.variant_name(member);
            let exception = matches!(
                ctx.schema.expect(&member.target)?,
                Shape::Structure(target) if target.is_error()
            );
            writeln!(w, "{}::{}(inner) => {{", input_type, variant)?;
            w.indent();
            writeln!(
                w,
                "headers.push({}::event_stream::Header::new(\":message-type\", {:?}));",
                rt,
                if exception { "exception" } else { "event" }
            )?;
            writeln!(
                w,
                "headers.push({}::event_stream::Header::new({:?}, {:?}));",
                rt,
                if exception { ":exception-type" } else { ":event-type" },
                member.wire_name()
            )?;
            emit_variant_payload(ctx, w, encoding, member, serializer, default_ts)?;
            w.unindent();
            writeln!(w, "}}")?;
        }
        w.unindent();
        writeln!(w, "}}")?;
        writeln!(
            w,
            "let message = {}::event_stream::Message::new(headers, payload);",
            rt
        )?;
        writeln!(
            w,
            "signer.sign(message).map_err({}::error::SerializeError::signing)",
            rt
        )?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    })
}

fn variant_serializer(
    ctx: &GenContext<'_>,
    encoding: FrameEncoding,
    member: &Member,
    default_ts: TimestampFormat,
) -> Result<Option<FunctionHandle>> {
    match ctx.schema.expect(&member.target)? {
        Shape::Structure(target) => {
            if target.members.is_empty() {
                Ok(None)
            } else {
                Ok(Some(encoding.structure_serializer(
                    ctx,
                    &member.target,
                    default_ts,
                )?))
            }
        }
        Shape::Blob | Shape::String(_) => Ok(None),
        other => Err(GenError::unsupported(
            "event_stream",
            &member.target,
            format!("{} cannot be an event payload", other.kind_name()),
        )),
    }
}

fn emit_variant_payload(
    ctx: &GenContext<'_>,
    w: &mut IndentedWriter<&mut Vec<u8>>,
    encoding: FrameEncoding,
    member: &Member,
    serializer: &Option<FunctionHandle>,
    _default_ts: TimestampFormat,
) -> Result<()> {
    let rt = ctx.rt();
    let content_type = |w: &mut IndentedWriter<&mut Vec<u8>>, value: &str| {
        writeln!(
            w,
            "headers.push({}::event_stream::Header::new(\":content-type\", {:?}));",
            rt, value
        )
    };
    match ctx.schema.expect(&member.target)? {
        Shape::Blob => {
            content_type(w, "application/octet-stream")?;
            writeln!(w, "payload = inner.as_ref().to_vec();")?;
        }
        Shape::String(_) => {
            content_type(w, "text/plain")?;
            writeln!(w, "payload = inner.clone().into_bytes();")?;
        }
        Shape::Structure(target) => {
            content_type(w, encoding.content_type())?;
            if let Some(guard) = common::unused_payload_guard(target) {
                writeln!(w, "{}", guard)?;
                match encoding {
                    FrameEncoding::Json => writeln!(w, "payload = b\"{{}}\".to_vec();")?,
                    FrameEncoding::Xml => writeln!(w, "payload = Vec::new();")?,
                    FrameEncoding::Cbor => {
                        writeln!(w, "let mut encoder = {}::cbor::Encoder::new();", rt)?;
                        writeln!(w, "encoder.begin_map();")?;
                        writeln!(w, "encoder.end();")?;
                        writeln!(w, "payload = encoder.into_bytes();")?;
                    }
                }
                return Ok(());
            }
            let serializer = serializer
                .as_ref()
                .expect("non-empty structure variants have a serializer");
            match encoding {
                FrameEncoding::Json => {
                    writeln!(w, "let mut body = String::new();")?;
                    writeln!(
                        w,
                        "let mut object = {}::json::JsonObjectWriter::new(&mut body);",
                        rt
                    )?;
                    writeln!(w, "{}(&mut object, inner)?;", serializer)?;
                    writeln!(w, "object.finish();")?;
                    writeln!(w, "payload = body.into_bytes();")?;
                }
                FrameEncoding::Xml => {
                    writeln!(w, "let mut body = String::new();")?;
                    writeln!(w, "let mut writer = {}::xml::XmlWriter::new(&mut body);", rt)?;
                    writeln!(
                        w,
                        "let mut root = writer.start_el({:?});",
                        member.target.name()
                    )?;
                    writeln!(w, "{}(&mut root, inner)?;", serializer)?;
                    writeln!(w, "root.finish();")?;
                    writeln!(w, "payload = body.into_bytes();")?;
                }
                FrameEncoding::Cbor => {
                    writeln!(w, "let mut encoder = {}::cbor::Encoder::new();", rt)?;
                    writeln!(w, "{}(&mut encoder, inner)?;", serializer)?;
                    writeln!(w, "payload = encoder.into_bytes();")?;
                }
            }
        }
        other => {
            return Err(GenError::unsupported(
                "event_stream",
                &member.target,
                format!("{} cannot be an event payload", other.kind_name()),
            ))
        }
    }
    Ok(())
}

/// Intern the per-message unmarshaller of an event-stream union.
pub(crate) fn unmarshaller<E>(
    ctx: &GenContext<'_>,
    _protocol_name: &'static str,
    encoding: E,
    union_id: &ShapeId,
    default_ts: TimestampFormat,
) -> Result<FunctionHandle>
where
    E: Into<FrameEncoding>,
{
    let encoding = encoding.into();
    let union = ctx.schema.expect_union(union_id)?;
    let name = common::shape_fn("unmarshall", "event", union_id, None);
    let rt = ctx.rt().to_string();
    let value_type = ctx.symbols.model_type(union_id);

    struct Variant {
        wire_name: String,
        variant: String,
        deserializer: Option<FunctionHandle>,
        exception: bool,
        kind: VariantKind,
    }
    enum VariantKind {
        Structure,
        Blob,
        Text,
    }

    let mut variants = Vec::with_capacity(union.members.len());
    for member in &union.members {
        let (kind, deserializer, exception) = match ctx.schema.expect(&member.target)? {
            Shape::Structure(target) => (
                VariantKind::Structure,
                Some(encoding.structure_deserializer(ctx, &member.target, default_ts)?),
                target.is_error(),
            ),
            Shape::Blob => (VariantKind::Blob, None, false),
            Shape::String(_) => (VariantKind::Text, None, false),
            other => {
                return Err(GenError::unsupported(
                    "event_stream",
                    &member.target,
                    format!("{} cannot be an event payload", other.kind_name()),
                ))
            }
        };
        variants.push(Variant {
            wire_name: member.wire_name().to_string(),
            variant: ctx.symbols.variant_name(member),
            deserializer,
            exception,
            kind,
        });
    }

    let interned = ctx.registry.intern(encoding.module(), &name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        writeln!(
            w,
            "pub fn {}(message: &{rt}::event_stream::Message) -> Result<{ty}, {rt}::error::EventError> {{",
            handle.name(),
            ty = value_type,
            rt = rt,
        )?;
        w.indent();
        writeln!(
            w,
            "match message.header(\":message-type\").unwrap_or_default() {{"
        )?;
        w.indent();

        writeln!(
            w,
            "\"event\" => match message.header(\":event-type\").unwrap_or_default() {{"
        )?;
        w.indent();
        for variant in variants.iter().filter(|v| !v.exception) {
            writeln!(w, "{:?} => {{", variant.wire_name)?;
            w.indent();
            emit_payload_decode(w, &rt, encoding, variant.deserializer.as_ref(), &variant.kind)?;
            writeln!(w, "Ok({}::{}(value))", value_type, variant.variant)?;
            w.unindent();
            writeln!(w, "}}")?;
        }
        writeln!(
            w,
            "other => Err({}::error::EventError::unknown_variant(other)),",
            rt
        )?;
        w.unindent();
        writeln!(w, "}},")?;

        writeln!(w, "\"exception\" => {{")?;
        w.indent();
        writeln!(
            w,
            "let code = message.header(\":exception-type\").unwrap_or_default();"
        )?;
        writeln!(w, "match code {{")?;
        w.indent();
        for variant in variants.iter().filter(|v| v.exception) {
            writeln!(w, "{:?} => {{", variant.wire_name)?;
            w.indent();
            emit_payload_decode(w, &rt, encoding, variant.deserializer.as_ref(), &variant.kind)?;
            writeln!(w, "Err({}::error::EventError::typed(code, value))", rt)?;
            w.unindent();
            writeln!(w, "}}")?;
        }
        writeln!(w, "_ => Err({}::error::EventError::unhandled(code)),", rt)?;
        w.unindent();
        writeln!(w, "}}")?;
        w.unindent();
        writeln!(w, "}}")?;

        writeln!(
            w,
            "other => Err({}::error::EventError::unhandled(other)),",
            rt
        )?;
        w.unindent();
        writeln!(w, "}}")?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    });

    // Item, not a closure: the interning closure above calls it by name.
    fn emit_payload_decode(
        w: &mut IndentedWriter<&mut Vec<u8>>,
        rt: &str,
        encoding: FrameEncoding,
        deserializer: Option<&FunctionHandle>,
        kind: &VariantKind,
    ) -> Result<()> {
        match kind {
            VariantKind::Blob => {
                writeln!(
                    w,
                    "let value = {}::blob::Blob::new(message.payload().to_vec());",
                    rt
                )?;
            }
            VariantKind::Text => {
                writeln!(
                    w,
                    "let value = String::from_utf8(message.payload().to_vec()).map_err({}::error::EventError::payload)?;",
                    rt
                )?;
            }
            VariantKind::Structure => {
                let deserializer =
                    deserializer.expect("structure variants have a deserializer");
                match encoding {
                    FrameEncoding::Json => {
                        writeln!(
                            w,
                            "let mut tokens = {}::json::TokenIter::new(message.payload());",
                            rt
                        )?;
                        writeln!(
                            w,
                            "let value = {}(&mut tokens).and_then(|builder| Ok(builder.build()?)).map_err({}::error::EventError::payload)?;",
                            deserializer, rt
                        )?;
                    }
                    FrameEncoding::Xml => {
                        writeln!(
                            w,
                            "let mut doc = {}::xml::Document::try_from(message.payload()).map_err({}::error::EventError::payload)?;",
                            rt, rt
                        )?;
                        writeln!(
                            w,
                            "let mut root = doc.root_element().map_err({}::error::EventError::payload)?;",
                            rt
                        )?;
                        writeln!(
                            w,
                            "let value = {}(&mut root).and_then(|builder| Ok(builder.build()?)).map_err({}::error::EventError::payload)?;",
                            deserializer, rt
                        )?;
                    }
                    FrameEncoding::Cbor => {
                        writeln!(
                            w,
                            "let mut decoder = {}::cbor::Decoder::new(message.payload());",
                            rt
                        )?;
                        writeln!(
                            w,
                            "let value = {}(&mut decoder).and_then(|builder| Ok(builder.build()?)).map_err({}::error::EventError::payload)?;",
                            deserializer, rt
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    interned
}
