// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The RPC-over-JSON protocol: every operation posts to `/` with the target
//! operation named in the `x-wire-target` header and every input member in
//! the document body. The body is always present — an operation without
//! bound members sends the empty document `{}`.

use crate::common;
use crate::error::{GenError, Result};
use crate::indent::IndentedWriter;
use crate::json;
use crate::protocol::{BodyScope, GenContext, Protocol, ServiceContext};
use crate::registry::FunctionHandle;
use crate::http_binding;
use std::io::Write;
use wire_schema::bindings::{BindingMode, MessageBindings};
use wire_schema::{Schema, ShapeId, TimestampFormat};

/// Marker for the RPC-over-JSON protocol.
pub struct JsonRpc;

const CONTENT_TYPE: &str = "application/x-wire-json-1.1";

impl Protocol for JsonRpc {
    fn name(&self) -> &'static str {
        "json_rpc"
    }

    fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    fn default_timestamp_format(&self) -> TimestampFormat {
        TimestampFormat::EpochSeconds
    }

    fn binding_mode(&self, _service: &ServiceContext<'_>, _operation: &ShapeId) -> BindingMode {
        BindingMode::Synthetic {
            method: "POST".to_string(),
            uri: "/".to_string(),
        }
    }

    fn serializer_for(
        &self,
        ctx: &GenContext<'_>,
        service: &ServiceContext<'_>,
        operation: &ShapeId,
    ) -> Result<FunctionHandle> {
        let op = ctx.schema.expect_operation(operation)?;
        reject_streams(ctx, self.name(), op.input.as_ref())?;
        reject_streams(ctx, self.name(), op.output.as_ref())?;

        let default_ts = self.default_timestamp_format();
        let body_serializer = match &op.input {
            Some(input) => Some(json::structure_serializer(
                ctx,
                input,
                default_ts,
                BodyScope::Full,
            )?),
            None => None,
        };
        let input_type = match &op.input {
            Some(input) => ctx.symbols.model_type(input),
            None => format!("{}::http::NoInput", ctx.rt()),
        };
        let target = format!("{}.{}", service.name(), operation.name());
        let name = common::op_fn("ser", operation, "http_request");
        let module = format!("{}_ops", self.name());
        let rt = ctx.rt().to_string();

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
            match &body_serializer {
                Some(serializer) => {
                    writeln!(w, "let mut body = String::new();")?;
                    writeln!(
                        w,
                        "let mut object = {}::json::JsonObjectWriter::new(&mut body);",
                        rt
                    )?;
                    writeln!(w, "{}(&mut object, input)?;", serializer)?;
                    writeln!(w, "object.finish();")?;
                }
                None => {
                    // The protocol requires a body even without an input
                    // shape: substitute the empty document.
                    writeln!(w, "let _ = input;")?;
                    writeln!(w, "let body = \"{{}}\".to_string();")?;
                }
            }
            writeln!(
                w,
                "let mut request = {}::http::Request::new(\"POST\", \"/\");",
                rt
            )?;
            writeln!(w, "request.header(\"content-type\", {:?});", CONTENT_TYPE)?;
            writeln!(w, "request.header(\"x-wire-target\", {:?});", target)?;
            writeln!(w, "request.body({}::body::Body::from_string(body));", rt)?;
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
        let module = format!("{}_ops", self.name());
        let name = common::op_fn("de", operation, "http_response");
        let rt = ctx.rt().to_string();

        let output = match &op.output {
            Some(output) => output.clone(),
            None => return http_binding::unit_response_parser(ctx, &module, &name, &rt),
        };
        let deserializer = json::structure_deserializer(
            ctx,
            &output,
            self.default_timestamp_format(),
            BodyScope::Full,
        )?;
        let output_type = ctx.symbols.model_type(&output);

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
            // One body decode covers every member; there are no other
            // binding locations under the synthetic mapping.
            writeln!(
                w,
                "let mut tokens = {}::json::TokenIter::new(response.body());",
                rt
            )?;
            writeln!(
                w,
                "let builder = {}(&mut tokens).map_err(|err| {}::error::ResponseError::unhandled_in(\"document body\", err))?;",
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
        json::generic_error_parser(ctx)
    }

    fn error_body_parser(
        &self,
        ctx: &GenContext<'_>,
        error: &ShapeId,
        bindings: &MessageBindings,
    ) -> Result<FunctionHandle> {
        json::structure_deserializer(
            ctx,
            error,
            self.default_timestamp_format(),
            BodyScope::DocumentOnly(bindings),
        )
    }
}

fn reject_streams(
    ctx: &GenContext<'_>,
    protocol: &'static str,
    shape: Option<&ShapeId>,
) -> Result<()> {
    if let Some(id) = shape {
        let structure = ctx.schema.expect_structure(id)?;
        for member in &structure.members {
            if member.is_streaming() || member.is_event_stream() {
                return Err(GenError::not_supported(
                    protocol,
                    format!("stream member {:?} on shape {}", member.name, id),
                ));
            }
        }
    }
    Ok(())
}

impl JsonRpc {
    /// Convenience for callers generating a full service in one call.
    pub fn generate(
        schema: &Schema,
        service: &ShapeId,
        config: &crate::GeneratorConfig,
    ) -> Result<crate::protocol::GeneratedService> {
        crate::protocol::generate_service(schema, service, &JsonRpc, config)
    }
}
