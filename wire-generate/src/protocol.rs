// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The protocol capability interface and the generation driver.
//!
//! Each wire protocol implements [`Protocol`]: entry points producing the
//! request serializer and response parser of an operation, the service-wide
//! generic error parser, and the wire error-code policy. The driver walks a
//! service's operations, requests those entry points, and flushes the shared
//! [`FunctionRegistry`] once into [`GeneratedModules`].

use crate::error::Result;
use crate::errors;
use crate::registry::{FunctionHandle, FunctionRegistry, GeneratedModules};
use crate::symbols::{DefaultSymbols, SymbolProvider};
use crate::GeneratorConfig;
use std::io::Write;
use std::path::PathBuf;
use wire_schema::bindings::{BindingMode, MessageBindings};
use wire_schema::{Schema, ServiceShape, ShapeId, TimestampFormat};

/// Everything the recursive generation algorithms need, passed down
/// explicitly; there is no ambient state besides the registry it carries.
pub struct GenContext<'a> {
    pub schema: &'a Schema,
    pub config: &'a GeneratorConfig,
    pub registry: &'a FunctionRegistry,
    pub symbols: &'a dyn SymbolProvider,
}

impl<'a> GenContext<'a> {
    /// Path of the runtime support crate in emitted code.
    pub fn rt(&self) -> &str {
        self.config.runtime_crate()
    }
}

/// Which members of a structure a body (de)serializer covers.
///
/// RPC protocols carry every member in the document body, so their body
/// functions coincide with the plain structure functions. REST protocols
/// carry only the document-bound subset; those functions get a distinct
/// deterministic name (`…_http_body`) since their text differs.
#[derive(Clone, Copy)]
pub enum BodyScope<'a> {
    Full,
    DocumentOnly(&'a MessageBindings),
}

impl<'a> BodyScope<'a> {
    /// Members covered by this scope, in declaration order.
    pub(crate) fn members(
        &self,
        structure: &'a wire_schema::StructureShape,
    ) -> Vec<&'a wire_schema::Member> {
        match self {
            BodyScope::Full => structure.members.iter().collect(),
            BodyScope::DocumentOnly(bindings) => structure
                .members
                .iter()
                .filter(|member| {
                    bindings
                        .document_members()
                        .any(|descriptor| descriptor.member.name == member.name)
                })
                .collect(),
        }
    }

    pub(crate) fn name_suffix(&self) -> Option<&'static str> {
        match self {
            BodyScope::Full => None,
            BodyScope::DocumentOnly(_) => Some("http_body"),
        }
    }
}

/// The service a generation request belongs to.
#[derive(Clone, Copy)]
pub struct ServiceContext<'a> {
    pub id: &'a ShapeId,
    pub shape: &'a ServiceShape,
}

impl<'a> ServiceContext<'a> {
    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn version(&self) -> &str {
        self.shape.version.as_deref().unwrap_or("")
    }
}

/// A wire protocol: content types, binding style, error-code conventions and
/// the generation entry points.
pub trait Protocol {
    /// Stable identifier, also used as the prefix of this protocol's
    /// operation-level module names.
    fn name(&self) -> &'static str;

    /// Default content type of document bodies.
    fn content_type(&self) -> &'static str;

    /// Timestamp encoding used when neither the member nor its binding
    /// location dictates one.
    fn default_timestamp_format(&self) -> TimestampFormat;

    /// How this protocol binds an operation onto HTTP.
    fn binding_mode(&self, service: &ServiceContext<'_>, operation: &ShapeId) -> BindingMode;

    /// Intern and return the request serializer for an operation.
    fn serializer_for(
        &self,
        ctx: &GenContext<'_>,
        service: &ServiceContext<'_>,
        operation: &ShapeId,
    ) -> Result<FunctionHandle>;

    /// Intern and return the success-response parser for an operation.
    fn parser_for(
        &self,
        ctx: &GenContext<'_>,
        service: &ServiceContext<'_>,
        operation: &ShapeId,
    ) -> Result<FunctionHandle>;

    /// Intern and return the protocol-wide generic error-envelope parser.
    fn generic_error_parser(&self, ctx: &GenContext<'_>) -> Result<FunctionHandle>;

    /// Intern and return the structural parser populating one declared error
    /// shape from a buffered response.
    fn error_body_parser(
        &self,
        ctx: &GenContext<'_>,
        error: &ShapeId,
        bindings: &MessageBindings,
    ) -> Result<FunctionHandle>;

    /// The wire code identifying an error shape.
    ///
    /// Defaults to the shape's declared name. This is a dedicated policy:
    /// member-level wire-name traits never apply to error codes, and only
    /// protocols that document an explicit error-code trait override this.
    fn error_code(&self, schema: &Schema, error: &ShapeId) -> Result<String> {
        schema.expect_structure(error)?;
        Ok(error.name().to_string())
    }
}

/// The generated entry points of one operation.
#[derive(Clone, Debug)]
pub struct OperationFunctions {
    pub operation: ShapeId,
    pub serializer: FunctionHandle,
    pub parser: FunctionHandle,
    /// Classifies an error response into the operation's typed error enum;
    /// produces the generic fallback when no error shapes are declared.
    pub error_parser: FunctionHandle,
}

/// An operation the protocol could not express; generation of the remaining
/// operations is unaffected.
#[derive(Debug)]
pub struct OperationFailure {
    pub operation: ShapeId,
    pub error: crate::GenError,
}

/// The result of one generation run over a service.
#[derive(Debug)]
pub struct GeneratedService {
    pub service: ShapeId,
    pub protocol: &'static str,
    /// One entry per successful operation, in the service's declaration order.
    pub operations: Vec<OperationFunctions>,
    /// Operations aborted with a descriptive error — never silently skipped.
    pub failures: Vec<OperationFailure>,
    pub modules: GeneratedModules,
}

/// Generate marshalling code for every operation of a service.
///
/// Generation is a pure function of `(schema, protocol, config)`; the only
/// shared state is the function registry created here and flushed before
/// returning. A failure is local to its operation: it is recorded in
/// [`GeneratedService::failures`] and leaves the registry untouched for every
/// other operation.
pub fn generate_service(
    schema: &Schema,
    service_id: &ShapeId,
    protocol: &dyn Protocol,
    config: &GeneratorConfig,
) -> Result<GeneratedService> {
    let service_shape = schema.expect_service(service_id)?;
    let registry = FunctionRegistry::new();
    let symbols = DefaultSymbols::new(config.runtime_crate());

    let (operations, failures) = {
        let ctx = GenContext {
            schema,
            config,
            registry: &registry,
            symbols: &symbols,
        };
        let service = ServiceContext {
            id: service_id,
            shape: service_shape,
        };

        let mut operations = Vec::with_capacity(service_shape.operations.len());
        let mut failures = Vec::new();
        for operation in &service_shape.operations {
            match generate_operation(&ctx, protocol, &service, operation) {
                Ok(functions) => operations.push(functions),
                Err(error) => failures.push(OperationFailure {
                    operation: operation.clone(),
                    error,
                }),
            }
        }
        (operations, failures)
    };

    Ok(GeneratedService {
        service: service_id.clone(),
        protocol: protocol.name(),
        operations,
        failures,
        modules: registry.into_modules(),
    })
}

fn generate_operation(
    ctx: &GenContext<'_>,
    protocol: &dyn Protocol,
    service: &ServiceContext<'_>,
    operation: &ShapeId,
) -> Result<OperationFunctions> {
    let serializer = protocol.serializer_for(ctx, service, operation)?;
    let parser = protocol.parser_for(ctx, service, operation)?;
    let error_parser = errors::error_parser(ctx, protocol, service, operation)?;
    Ok(OperationFunctions {
        operation: operation.clone(),
        serializer,
        parser,
        error_parser,
    })
}

/// Install generated modules as one Rust source file per logical module.
pub struct Installer {
    install_dir: PathBuf,
}

impl Installer {
    pub fn new(install_dir: PathBuf) -> Self {
        Installer { install_dir }
    }
}

impl crate::SourceInstaller for Installer {
    type Error = Box<dyn std::error::Error>;

    fn install_service(
        &self,
        config: &GeneratorConfig,
        generated: &GeneratedService,
    ) -> std::result::Result<(), Self::Error> {
        let dir_path = self.install_dir.join(config.module_name());
        std::fs::create_dir_all(&dir_path)?;

        let mut mod_file = std::fs::File::create(dir_path.join("mod.rs"))?;
        for (module, _) in generated.modules.modules() {
            writeln!(mod_file, "pub mod {};", module)?;
        }

        for (module, _) in generated.modules.modules() {
            let source = generated
                .modules
                .module_source(module)
                .unwrap_or_default();
            std::fs::write(dir_path.join(format!("{}.rs", module)), source)?;
        }
        Ok(())
    }
}
