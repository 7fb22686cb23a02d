// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The binary RPC protocol: every operation posts a CBOR body to
//! `/service/<service>/operation/<operation>`. Blobs travel as raw bytes and
//! event streams are supported, with out-of-band initial-response fields
//! merged from the first frame.

use crate::cbor;
use crate::common;
use crate::error::{GenError, Result};
use crate::event_stream::{self, FrameEncoding};
use crate::http_binding;
use crate::indent::IndentedWriter;
use crate::protocol::{GenContext, Protocol, ServiceContext};
use crate::registry::FunctionHandle;
use std::io::Write;
use wire_schema::bindings::{BindingMode, MessageBindings};
use wire_schema::{Member, Schema, ShapeId, TimestampFormat};

/// Marker for the binary RPC protocol.
pub struct CborRpc;

const CONTENT_TYPE: &str = "application/cbor";
const EVENT_CONTENT_TYPE: &str = "application/vnd.wire.eventstream";

impl Protocol for CborRpc {
    fn name(&self) -> &'static str {
        "cbor_rpc"
    }

    fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    fn default_timestamp_format(&self) -> TimestampFormat {
        TimestampFormat::EpochSeconds
    }

    fn binding_mode(&self, service: &ServiceContext<'_>, operation: &ShapeId) -> BindingMode {
        BindingMode::Synthetic {
            method: "POST".to_string(),
            uri: format!(
                "/service/{}/operation/{}",
                service.name(),
                operation.name()
            ),
        }
    }

    fn serializer_for(
        &self,
        ctx: &GenContext<'_>,
        service: &ServiceContext<'_>,
        operation: &ShapeId,
    ) -> Result<FunctionHandle> {
        let op = ctx.schema.expect_operation(operation)?;
        let default_ts = self.default_timestamp_format();
        let uri = format!(
            "/service/{}/operation/{}",
            service.name(),
            operation.name()
        );
        let name = common::op_fn("ser", operation, "http_request");
        let module = format!("{}_ops", self.name());
        let rt = ctx.rt().to_string();

        let stream = match &op.input {
            Some(input) => stream_member(ctx, input)?,
            None => None,
        };
        if let Some(member) = &stream {
            if member.is_streaming() {
                return Err(GenError::not_supported(
                    self.name(),
                    "streaming blob payloads",
                ));
            }
            let input_id = op.input.as_ref().expect("stream member implies an input");
            let input_structure = ctx.schema.expect_structure(input_id)?;
            if input_structure.members.len() > 1 {
                return Err(GenError::not_supported(
                    self.name(),
                    "initial-request fields alongside an event stream",
                ));
            }
            let marshaller = event_stream::marshaller(
                ctx,
                self.name(),
                FrameEncoding::Cbor,
                &member.target,
                default_ts,
            )?;
            event_stream::unmarshaller(
                ctx,
                self.name(),
                FrameEncoding::Cbor,
                &member.target,
                default_ts,
            )?;
            let field = ctx.symbols.field_name(member);
            let input_type = ctx.symbols.model_type(input_id);
            return ctx.registry.intern(&module, &name, |handle| {
                let mut buf = Vec::new();
                let w = &mut IndentedWriter::new(&mut buf);
                writeln!(
                    w,
                    "pub fn {}(input: {ty}) -> Result<{rt}::http::Request, {rt}::error::SerializeError> {{",
                    handle.name(),
                    ty = input_type,
                    rt = rt,
                )?;
                w.indent();
                writeln!(
                    w,
                    "let mut request = {}::http::Request::new(\"POST\", {:?});",
                    rt, uri
                )?;
                writeln!(
                    w,
                    "request.header(\"content-type\", {:?});",
                    EVENT_CONTENT_TYPE
                )?;
                writeln!(w, "request.header(\"accept\", {:?});", CONTENT_TYPE)?;
                writeln!(
                    w,
                    "request.body({}::body::Body::from_event_stream(input.{}, {}));",
                    rt, field, marshaller
                )?;
                writeln!(w, "Ok(request)")?;
                w.unindent();
                writeln!(w, "}}")?;
                Ok(common::into_source(buf))
            });
        }

        let body_serializer = match &op.input {
            Some(input) => Some(cbor::structure_serializer(ctx, input, default_ts)?),
            None => None,
        };
        let input_type = match &op.input {
            Some(input) => ctx.symbols.model_type(input),
            None => format!("{}::http::NoInput", ctx.rt()),
        };

        ctx.registry.intern(&module, &name, |handle| {
            let mut buf = Vec::new();
            let w = &mut IndentedWriter::new(&mut buf);
            writeln!(
                w,
                "pub fn {}(input: &{ty}) -> Result<{rt}::http::Request, {rt}::error::SerializeError> {{",
                handle.name(),
                ty = input_type,
                rt = rt,
            )?;
            w.indent();
            writeln!(w, "let mut encoder = {}::cbor::Encoder::new();", rt)?;
            match &body_serializer {
                Some(serializer) => writeln!(w, "{}(&mut encoder, input)?;", serializer)?,
                None => {
                    writeln!(w, "let _ = input;")?;
                    writeln!(w, "encoder.begin_map();")?;
                    writeln!(w, "encoder.end();")?;
                }
            }
            writeln!(
                w,
                "let mut request = {}::http::Request::new(\"POST\", {:?});",
                rt, uri
            )?;
            writeln!(w, "request.header(\"content-type\", {:?});", CONTENT_TYPE)?;
            writeln!(w, "request.header(\"accept\", {:?});", CONTENT_TYPE)?;
            writeln!(
                w,
                "request.body({}::body::Body::from_bytes(encoder.into_bytes()));",
                rt
            )?;
            writeln!(w, "Ok(request)")?;
            w.unindent();
            writeln!(w, "}}")?;
            Ok(common::into_source(buf))
        })
    }

    fn parser_for(
        &self,
        ctx: &GenContext<'_>,
        _service: &ServiceContext<'_>,
        operation: &ShapeId,
    ) -> Result<FunctionHandle> {
        let op = ctx.schema.expect_operation(operation)?;
        let default_ts = self.default_timestamp_format();
        let module = format!("{}_ops", self.name());
        let name = common::op_fn("de", operation, "http_response");
        let rt = ctx.rt().to_string();

        let output = match &op.output {
            Some(output) => output.clone(),
            None => return http_binding::unit_response_parser(ctx, &module, &name, &rt),
        };
        let output_type = ctx.symbols.model_type(&output);
        let builder_type = ctx.symbols.builder_type(&output);

        if let Some(member) = stream_member(ctx, &output)? {
            if member.is_streaming() {
                return Err(GenError::not_supported(
                    self.name(),
                    "streaming blob payloads",
                ));
            }
            let unmarshaller = event_stream::unmarshaller(
                ctx,
                self.name(),
                FrameEncoding::Cbor,
                &member.target,
                default_ts,
            )?;
            event_stream::marshaller(
                ctx,
                self.name(),
                FrameEncoding::Cbor,
                &member.target,
                default_ts,
            )?;
            let structure = ctx.schema.expect_structure(&output)?;
            let initial = if structure.members.len() > 1 {
                // Out-of-band fields arrive with the first frame.
                Some(cbor::structure_deserializer(ctx, &output, default_ts, true)?)
            } else {
                None
            };
            let setter = ctx.symbols.setter_name(&member);
            return ctx.registry.intern(&module, &name, |handle| {
                let mut buf = Vec::new();
                let w = &mut IndentedWriter::new(&mut buf);
                writeln!(
                    w,
                    "pub fn {}(mut response: {rt}::http::Response) -> Result<{ty}, {rt}::error::ResponseError> {{",
                    handle.name(),
                    ty = output_type,
                    rt = rt,
                )?;
                w.indent();
                writeln!(w, "let mut builder = {}::default();", builder_type)?;
                writeln!(
                    w,
                    "let mut stream = response.take_body().into_event_stream();"
                )?;
                if let Some(initial) = &initial {
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
                writeln!(
                    w,
                    "builder.build().map_err({}::error::ResponseError::missing_field)",
                    rt
                )?;
                w.unindent();
                writeln!(w, "}}")?;
                Ok(common::into_source(buf))
            });
        }

        let deserializer = cbor::structure_deserializer(ctx, &output, default_ts, false)?;
        ctx.registry.intern(&module, &name, |handle| {
            let mut buf = Vec::new();
            let w = &mut IndentedWriter::new(&mut buf);
            writeln!(
                w,
                "pub fn {}(response: &{rt}::http::Response) -> Result<{ty}, {rt}::error::ResponseError> {{",
                handle.name(),
                ty = output_type,
                rt = rt,
            )?;
            w.indent();
            writeln!(
                w,
                "let mut decoder = {}::cbor::Decoder::new(response.body());",
                rt
            )?;
            writeln!(
                w,
                "let builder = {}(&mut decoder).map_err(|err| {}::error::ResponseError::unhandled_in(\"document body\", err))?;",
                deserializer, rt
            )?;
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

    fn generic_error_parser(&self, ctx: &GenContext<'_>) -> Result<FunctionHandle> {
        cbor::generic_error_parser(ctx)
    }

    fn error_body_parser(
        &self,
        ctx: &GenContext<'_>,
        error: &ShapeId,
        _bindings: &MessageBindings,
    ) -> Result<FunctionHandle> {
        cbor::structure_deserializer(ctx, error, self.default_timestamp_format(), true)
    }
}

fn stream_member(ctx: &GenContext<'_>, shape: &ShapeId) -> Result<Option<Member>> {
    let structure = ctx.schema.expect_structure(shape)?;
    Ok(structure
        .members
        .iter()
        .find(|member| member.is_streaming() || member.is_event_stream())
        .cloned())
}

impl CborRpc {
    /// Convenience for callers generating a full service in one call.
    pub fn generate(
        schema: &Schema,
        service: &ShapeId,
        config: &crate::GeneratorConfig,
    ) -> Result<crate::protocol::GeneratedService> {
        crate::protocol::generate_service(schema, service, &CborRpc, config)
    }
}
