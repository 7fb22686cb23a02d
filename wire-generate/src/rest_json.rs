// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The REST protocol with JSON bodies: native HTTP bindings, JSON document
//! bodies, errors discriminated through the `x-wire-error` header or the
//! `__type`/`code` body fields.

use crate::error::Result;
use crate::http_binding::{self, BodyFamily};
use crate::json;
use crate::protocol::{BodyScope, GenContext, Protocol, ServiceContext};
use crate::registry::FunctionHandle;
use wire_schema::bindings::{BindingMode, MessageBindings};
use wire_schema::{Schema, ShapeId, TimestampFormat};

/// Marker for the REST JSON protocol.
pub struct RestJson;

impl Protocol for RestJson {
    fn name(&self) -> &'static str {
        "rest_json"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn default_timestamp_format(&self) -> TimestampFormat {
        TimestampFormat::EpochSeconds
    }

    fn binding_mode(&self, _service: &ServiceContext<'_>, _operation: &ShapeId) -> BindingMode {
        BindingMode::Http
    }

    fn serializer_for(
        &self,
        ctx: &GenContext<'_>,
        _service: &ServiceContext<'_>,
        operation: &ShapeId,
    ) -> Result<FunctionHandle> {
        http_binding::request_serializer(
            ctx,
            self.name(),
            BodyFamily::Json,
            self.content_type(),
            operation,
            self.default_timestamp_format(),
        )
    }

    fn parser_for(
        &self,
        ctx: &GenContext<'_>,
        _service: &ServiceContext<'_>,
        operation: &ShapeId,
    ) -> Result<FunctionHandle> {
        http_binding::response_parser(
            ctx,
            self.name(),
            BodyFamily::Json,
            operation,
            self.default_timestamp_format(),
        )
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

// The default `error_code` applies: the declared shape name, with no use of
// member wire-name traits.
impl RestJson {
    /// Convenience for callers generating a full service in one call.
    pub fn generate(
        schema: &Schema,
        service: &ShapeId,
        config: &crate::GeneratorConfig,
    ) -> Result<crate::protocol::GeneratedService> {
        crate::protocol::generate_service(schema, service, &RestJson, config)
    }
}
