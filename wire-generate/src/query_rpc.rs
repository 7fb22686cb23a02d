// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The form-encoded query RPC protocol: requests post
//! `Action=<operation>&Version=<service version>` plus the flattened input
//! members as `application/x-www-form-urlencoded`; responses come back as XML
//! with the output fields wrapped in `<OperationNameResult>`. This is the one
//! protocol honoring the explicit wire error-code trait on error shapes.

use crate::common;
use crate::error::{GenError, Result};
use crate::http_binding;
use crate::indent::IndentedWriter;
use crate::protocol::{GenContext, Protocol, ServiceContext};
use crate::query;
use crate::registry::FunctionHandle;
use crate::xml;
use std::io::Write;
use wire_schema::bindings::{BindingMode, MessageBindings};
use wire_schema::{Schema, ShapeId, TimestampFormat};

/// Marker for the query RPC protocol.
pub struct QueryRpc;

const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

impl Protocol for QueryRpc {
    fn name(&self) -> &'static str {
        "query_rpc"
    }

    fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    fn default_timestamp_format(&self) -> TimestampFormat {
        TimestampFormat::DateTime
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

        let body_serializer = match &op.input {
            Some(input) => Some(query::structure_serializer(
                ctx,
                input,
                self.default_timestamp_format(),
            )?),
            None => None,
        };
        let input_type = match &op.input {
            Some(input) => ctx.symbols.model_type(input),
            None => format!("{}::http::NoInput", ctx.rt()),
        };
        let action = operation.name().to_string();
        let version = service.version().to_string();
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
            writeln!(w, "let mut body = String::new();")?;
            writeln!(
                w,
                "let mut writer = {}::query::QueryWriter::new(&mut body, {:?}, {:?});",
                rt, action, version
            )?;
            match &body_serializer {
                Some(serializer) => {
                    writeln!(w, "let mut scope = writer.scope();")?;
                    writeln!(w, "{}(&mut scope, input)?;", serializer)?;
                }
                None => {
                    writeln!(w, "let _ = input;")?;
                }
            }
            writeln!(w, "writer.finish();")?;
            writeln!(
                w,
                "let mut request = {}::http::Request::new(\"POST\", \"/\");",
                rt
            )?;
            writeln!(w, "request.header(\"content-type\", {:?});", CONTENT_TYPE)?;
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
        let deserializer = xml::structure_deserializer(
            ctx,
            &output,
            self.default_timestamp_format(),
            crate::protocol::BodyScope::Full,
        )?;
        let output_type = ctx.symbols.model_type(&output);
        let builder_type = ctx.symbols.builder_type(&output);
        let result_wrapper = format!("{}Result", operation.name());

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
            writeln!(w, "let mut builder = {}::default();", builder_type)?;
            writeln!(w, "let body = response.body();")?;
            writeln!(w, "if !body.is_empty() {{")?;
            w.indent();
            writeln!(
                w,
                "let mut doc = {}::xml::Document::try_from(body).map_err(|err| {}::error::ResponseError::unhandled_in(\"document body\", err))?;",
                rt, rt
            )?;
            writeln!(
                w,
                "let mut root = doc.root_element().map_err(|err| {}::error::ResponseError::unhandled_in(\"document body\", err))?;",
                rt
            )?;
            writeln!(w, "while let Some(mut tag) = root.next_tag() {{")?;
            w.indent();
            writeln!(
                w,
                "if tag.start_el().local() == {:?} {{",
                result_wrapper
            )?;
            w.indent();
            writeln!(
                w,
                "builder = {}(&mut tag).map_err(|err| {}::error::ResponseError::unhandled_in(\"document body\", err))?;",
                deserializer, rt
            )?;
            w.unindent();
            writeln!(w, "}}")?;
            w.unindent();
            writeln!(w, "}}")?;
            w.unindent();
            writeln!(w, "}}")?;
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
        xml::generic_error_parser(ctx)
    }

    fn error_body_parser(
        &self,
        ctx: &GenContext<'_>,
        error: &ShapeId,
        bindings: &MessageBindings,
    ) -> Result<FunctionHandle> {
        xml::error_body_deserializer(ctx, error, self.default_timestamp_format(), bindings)
    }

    /// The explicit wire error-code trait takes precedence over the declared
    /// shape name. This policy is specific to error codes; it never reuses
    /// the member wire-name logic.
    fn error_code(&self, schema: &Schema, error: &ShapeId) -> Result<String> {
        let structure = schema.expect_structure(error)?;
        Ok(structure
            .wire_code
            .clone()
            .unwrap_or_else(|| error.name().to_string()))
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

impl QueryRpc {
    /// Convenience for callers generating a full service in one call.
    pub fn generate(
        schema: &Schema,
        service: &ShapeId,
        config: &crate::GeneratorConfig,
    ) -> Result<crate::protocol::GeneratedService> {
        crate::protocol::generate_service(schema, service, &QueryRpc, config)
    }
}
