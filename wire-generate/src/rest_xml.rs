// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The REST protocol with XML bodies: native HTTP bindings, XML document
//! bodies, errors wrapped in an `ErrorResponse` envelope.

use crate::error::Result;
use crate::http_binding::{self, BodyFamily};
use crate::protocol::{GenContext, Protocol, ServiceContext};
use crate::registry::FunctionHandle;
use crate::xml;
use wire_schema::bindings::{BindingMode, MessageBindings};
use wire_schema::{Schema, ShapeId, TimestampFormat};

/// Marker for the REST XML protocol.
pub struct RestXml;

impl Protocol for RestXml {
    fn name(&self) -> &'static str {
        "rest_xml"
    }

    fn content_type(&self) -> &'static str {
        "application/xml"
    }

    fn default_timestamp_format(&self) -> TimestampFormat {
        TimestampFormat::DateTime
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
            BodyFamily::Xml,
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
            BodyFamily::Xml,
            operation,
            self.default_timestamp_format(),
        )
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
}

impl RestXml {
    /// Convenience for callers generating a full service in one call.
    pub fn generate(
        schema: &Schema,
        service: &ShapeId,
        config: &crate::GeneratorConfig,
    ) -> Result<crate::protocol::GeneratedService> {
        crate::protocol::generate_service(schema, service, &RestXml, config)
    }
}
