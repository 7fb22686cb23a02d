// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error-discrimination function emission.
//!
//! The emitted classifier is a two-phase parse: first the protocol's generic
//! envelope parser extracts a wire code and optional message (cheap), then the
//! matched error shape's structural parser runs (expensive) — never the
//! reverse, since the code decides which parser applies. Unknown codes fall
//! back to the generic/unhandled error carrying the raw envelope.

use crate::common;
use crate::error::Result;
use crate::http_binding;
use crate::indent::IndentedWriter;
use crate::protocol::{GenContext, Protocol, ServiceContext};
use crate::registry::FunctionHandle;
use heck::CamelCase;
use std::io::Write;
use wire_schema::bindings::resolve_operation;
use wire_schema::ShapeId;

struct ErrorBranch {
    code: String,
    variant: String,
    parser: FunctionHandle,
    builder_type: String,
    field_steps: Vec<String>,
    /// The shape carries a conventional `message` field: backfill it from the
    /// envelope when the structural parse left it empty.
    backfill_message: bool,
}

/// Intern the error classifier of one operation.
pub(crate) fn error_parser(
    ctx: &GenContext<'_>,
    protocol: &dyn Protocol,
    service: &ServiceContext<'_>,
    operation: &ShapeId,
) -> Result<FunctionHandle> {
    let mode = protocol.binding_mode(service, operation);
    let bindings = resolve_operation(ctx.schema, operation, &mode)?;
    let module = format!("{}_ops", protocol.name());
    let name = common::op_fn("de", operation, "http_error");
    let rt = ctx.rt().to_string();
    let error_enum = ctx.symbols.error_enum(operation);
    let generic = protocol.generic_error_parser(ctx)?;
    let default_ts = protocol.default_timestamp_format();

    // Dispatch order follows the operation's error declaration order.
    let mut branches = Vec::with_capacity(bindings.errors.len());
    for message in &bindings.errors {
        let id = message
            .shape
            .as_ref()
            .expect("error bindings always carry their shape");
        let structure = ctx.schema.expect_structure(id)?;
        let backfill_message = structure
            .members
            .iter()
            .any(|member| ctx.symbols.field_name(member) == "message");
        branches.push(ErrorBranch {
            code: protocol.error_code(ctx.schema, id)?,
            variant: id.name().to_camel_case(),
            parser: protocol.error_body_parser(ctx, id, message)?,
            builder_type: ctx.symbols.builder_type(id),
            field_steps: http_binding::plan_field_decodes(ctx, message, default_ts)?,
            backfill_message,
        });
    }

    ctx.registry.intern(&module, &name, |handle| {
        let mut buf = Vec::new();
        let w = &mut IndentedWriter::new(&mut buf);
        writeln!(
            w,
            "pub fn {}(response: &{rt}::http::Response) -> Result<{ty}, {rt}::error::ResponseError> {{",
            handle.name(),
            ty = error_enum,
            rt = rt,
        )?;
        w.indent();
        writeln!(
            w,
            "let envelope = {}(response).map_err(|err| {}::error::ResponseError::unhandled_in(\"error envelope\", err))?;",
            generic, rt
        )?;
        if branches.is_empty() {
            writeln!(
                w,
                "Ok({}::Unhandled({}::error::GenericError::from_envelope(envelope)))",
                error_enum, rt
            )?;
            w.unindent();
            writeln!(w, "}}")?;
            return Ok(common::into_source(buf));
        }
        writeln!(w, "let code = envelope.code.clone().unwrap_or_default();")?;
        writeln!(w, "match code.as_str() {{")?;
        w.indent();
        for branch in &branches {
            writeln!(w, "{:?} => {{", branch.code)?;
            w.indent();
            writeln!(w, "let mut builder = {}::default();", branch.builder_type)?;
            writeln!(
                w,
                "builder = {}(response.body(), builder).map_err(|err| {}::error::ResponseError::unhandled_in(\"document body\", err))?;",
                branch.parser, rt
            )?;
            for step in &branch.field_steps {
                w.write_all(step.as_bytes())?;
            }
            if branch.backfill_message {
                writeln!(
                    w,
                    "let mut error = builder.build().map_err({}::error::ResponseError::missing_field)?;",
                    rt
                )?;
                writeln!(
                    w,
                    "if error.message.as_deref().map_or(true, str::is_empty) {{"
                )?;
                w.indent();
                writeln!(w, "error.message = envelope.message.clone();")?;
                w.unindent();
                writeln!(w, "}}")?;
                writeln!(w, "Ok({}::{}(error))", error_enum, branch.variant)?;
            } else {
                writeln!(
                    w,
                    "let error = builder.build().map_err({}::error::ResponseError::missing_field)?;",
                    rt
                )?;
                writeln!(w, "Ok({}::{}(error))", error_enum, branch.variant)?;
            }
            w.unindent();
            writeln!(w, "}}")?;
        }
        writeln!(
            w,
            "_ => Ok({}::Unhandled({}::error::GenericError::from_envelope(envelope))),",
            error_enum, rt
        )?;
        w.unindent();
        writeln!(w, "}}")?;
        w.unindent();
        writeln!(w, "}}")?;
        Ok(common::into_source(buf))
    })
}
