// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! This crate compiles a [`wire_schema::Schema`] into Rust marshalling code for
//! several wire protocols: two JSON flavors, an XML-based REST protocol, a
//! form-encoded RPC protocol, and a binary (CBOR) protocol.
//!
//! For every operation of a service the generator emits a request serializer,
//! a response parser, and — when the operation declares error shapes — an
//! error parser that discriminates the wire error code into a typed error.
//! Helper functions for nested shapes are interned through a
//! [`registry::FunctionRegistry`] so each distinct body is produced exactly
//! once per run, no matter how many operations share a shape, and runs are
//! byte-for-byte reproducible.
//!
//! ## Quick start
//!
//! ```
//! use wire_generate::{json_rpc, protocol::generate_service, GeneratorConfig};
//!
//! let schema = wire_generate::test_utils::sample_schema();
//! let config = GeneratorConfig::new("widgets".to_string());
//! let generated = generate_service(
//!     &schema,
//!     &wire_schema::ShapeId::new("example.widgets#Widgets"),
//!     &json_rpc::JsonRpc,
//!     &config,
//! )
//! .unwrap();
//!
//! let mut source = Vec::new();
//! generated.modules.render(&mut source).unwrap();
//! assert!(String::from_utf8_lossy(&source).contains("pub fn ser_structure_example_widgets"));
//! ```
//!
//! The emitted functions call into a runtime support crate (default path
//! `wire_rt`, see [`GeneratorConfig::with_runtime_crate`]) and into the model
//! types produced by a builder-pattern generator; both are external
//! collaborators — this crate only decides function names, module membership
//! and bodies.
//!
//! ## Binary tool
//!
//! The `wiregen` binary loads a YAML-encoded schema and prints (or installs)
//! the generated modules:
//! ```bash
//! cargo run -p wire-generate -- --service example.widgets#Widgets --protocol rest-json schema.yaml
//! ```

/// Binary (CBOR) wire family: shape serializer/deserializer emission.
pub mod cbor;
/// Support for the binary RPC protocol.
pub mod cbor_rpc;
/// Generation-time error type.
pub mod error;
/// Error-discrimination function emission.
pub mod errors;
/// Event-stream frame marshaller/unmarshaller emission.
pub mod event_stream;
/// Header/query/label/status binding emission shared by the REST protocols.
pub mod http_binding;
/// JSON wire family: shape serializer/deserializer emission.
pub mod json;
/// Support for the RPC-over-JSON protocol.
pub mod json_rpc;
/// Support for the REST protocol with JSON bodies.
pub mod rest_json;
/// Support for the REST protocol with XML bodies.
pub mod rest_xml;
/// The protocol capability interface and the generation driver.
pub mod protocol;
/// Form-encoded serializer emission for the query RPC protocol.
pub mod query;
/// Support for the form-encoded query RPC protocol.
pub mod query_rpc;
/// The deduplicating registry of generated functions.
pub mod registry;
/// The symbol-resolution seam towards the target-language type generator.
pub mod symbols;
/// XML wire family: shape serializer/deserializer emission.
pub mod xml;

#[doc(hidden)]
/// Utility functions to help testing the generators.
pub mod test_utils;

/// Deterministic function-name derivation.
mod common;
/// Common configuration objects used in public APIs.
mod config;
/// Utility to generate indented text.
mod indent;

pub use config::*;
pub use error::GenError;
