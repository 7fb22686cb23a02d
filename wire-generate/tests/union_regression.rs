// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serializing a union variant whose target is an empty structure used to
//! emit an unused payload binding. Every protocol's union path must name the
//! binding and immediately discard it.

use wire_generate::protocol::{generate_service, GeneratedService, Protocol};
use wire_generate::{cbor_rpc, json_rpc, query_rpc, rest_json, rest_xml, test_utils, GeneratorConfig};

fn generate(protocol: &dyn Protocol) -> GeneratedService {
    let schema = test_utils::sample_schema();
    let config = GeneratorConfig::new("widgets".to_string());
    generate_service(&schema, &test_utils::service_id(), protocol, &config).unwrap()
}

fn union_serializer_body(generated: &GeneratedService, module: &str) -> String {
    let source = generated.modules.module_source(module).unwrap();
    let start = source
        .find("pub fn ser_union_example_widgets_widget_event(")
        .unwrap();
    let end = source[start..]
        .find("\n}\n")
        .map(|i| start + i)
        .unwrap_or(source.len());
    source[start..end].to_string()
}

fn assert_no_unused_binding(body: &str) {
    // The empty-structure variant still binds `inner` and discards it
    // explicitly, so the emitted code carries no unused-binding diagnostic.
    let arm_start = body.find("Ping(inner) => {").unwrap();
    let arm = &body[arm_start..];
    let next_arm = arm[1..]
        .find("(inner) => {")
        .map(|i| i + 1)
        .unwrap_or_else(|| arm.len());
    assert!(arm[..next_arm].contains("let _ = inner;"));
}

#[test]
fn json_union_path_discards_the_empty_payload() {
    let body = union_serializer_body(&generate(&rest_json::RestJson), "json_ser");
    assert_no_unused_binding(&body);
    assert!(body.contains("object.start_object(\"ping\")"));
}

#[test]
fn json_rpc_shares_the_same_union_path() {
    let body = union_serializer_body(&generate(&json_rpc::JsonRpc), "json_ser");
    assert_no_unused_binding(&body);
}

#[test]
fn xml_union_path_discards_the_empty_payload() {
    let body = union_serializer_body(&generate(&rest_xml::RestXml), "xml_ser");
    assert_no_unused_binding(&body);
    assert!(body.contains("scope.start_el(\"ping\")"));
}

#[test]
fn query_union_path_discards_the_empty_payload() {
    let body = union_serializer_body(&generate(&query_rpc::QueryRpc), "query_ser");
    assert_no_unused_binding(&body);
    assert!(body.contains("scope.value(\"ping\").scope()"));
}

#[test]
fn cbor_union_path_discards_the_empty_payload() {
    let body = union_serializer_body(&generate(&cbor_rpc::CborRpc), "cbor_ser");
    assert_no_unused_binding(&body);
    assert!(body.contains("encoder.str(\"ping\");"));
}

#[test]
fn event_marshaller_discards_the_empty_payload_too() {
    let generated = generate(&rest_json::RestJson);
    let events = generated.modules.module_source("json_event").unwrap();
    let arm_start = events.find("Ping(inner) => {").unwrap();
    let arm = &events[arm_start..];
    assert!(arm.contains("let _ = inner;"));
    assert!(arm.contains("payload = b\"{}\".to_vec();"));
}

#[test]
fn non_empty_variants_use_their_payload() {
    let body = union_serializer_body(&generate(&rest_json::RestJson), "json_ser");
    assert!(body.contains("Created(inner) => {"));
    assert!(body.contains("(&mut object_1, inner)?;"));
    // The plain-string variant consumes the binding directly.
    assert!(body.contains("Note(inner) => {"));
    assert!(body.contains("object.string(\"note\", inner.as_str());"));
}
