// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

use wire_generate::protocol::{generate_service, GeneratedService, Protocol};
use wire_generate::{json_rpc, query_rpc, rest_json, test_utils, GeneratorConfig};

fn generate(protocol: &dyn Protocol) -> GeneratedService {
    let schema = test_utils::sample_schema();
    let config = GeneratorConfig::new("widgets".to_string());
    generate_service(&schema, &test_utils::service_id(), protocol, &config).unwrap()
}

#[test]
fn dispatch_is_two_phase_and_in_declaration_order() {
    let generated = generate(&rest_json::RestJson);
    let ops = generated.modules.module_source("rest_json_ops").unwrap();
    let start = ops
        .find("pub fn de_example_widgets_put_widget_http_error(")
        .unwrap();
    let body = &ops[start..];

    // Phase one: the cheap envelope sniff runs before any match arm.
    let envelope = body.find("de_generic_error(response)").unwrap();
    let first = body.find("\"NoSuchWidget\" => {").unwrap();
    let second = body.find("\"InvalidWidget\" => {").unwrap();
    assert!(envelope < first && first < second);

    // Phase two: the matched branch runs the structural parser.
    assert!(body.contains("de_structure_example_widgets_no_such_widget_http_body(response.body(), builder)"));
    // Unknown codes fall back to the generic error with the raw envelope.
    assert!(body.contains(
        "_ => Ok(crate::error::PutWidgetError::Unhandled(wire_rt::error::GenericError::from_envelope(envelope)))"
    ));
}

#[test]
fn empty_message_fields_backfill_from_the_envelope() {
    let generated = generate(&rest_json::RestJson);
    let ops = generated.modules.module_source("rest_json_ops").unwrap();

    assert!(ops.contains("if error.message.as_deref().map_or(true, str::is_empty) {"));
    assert!(ops.contains("error.message = envelope.message.clone();"));
}

#[test]
fn explicit_wire_codes_apply_only_where_the_protocol_honors_them() {
    // `NoSuchWidget` declares the explicit wire code `WidgetMissing`.
    let query = generate(&query_rpc::QueryRpc);
    let ops = query.modules.module_source("query_rpc_ops").unwrap();
    assert!(ops.contains("\"WidgetMissing\" => {"));
    assert!(!ops.contains("\"NoSuchWidget\" => {"));

    // Every other protocol keeps the declared shape name.
    let rest = generate(&rest_json::RestJson);
    let ops = rest.modules.module_source("rest_json_ops").unwrap();
    assert!(ops.contains("\"NoSuchWidget\" => {"));
    assert!(!ops.contains("\"WidgetMissing\" => {"));
}

#[test]
fn operations_without_declared_errors_wrap_everything_generic() {
    let generated = generate(&rest_json::RestJson);
    let ops = generated.modules.module_source("rest_json_ops").unwrap();
    let start = ops
        .find("pub fn de_example_widgets_watch_widgets_http_error(")
        .unwrap();
    let end = ops[start..].find("\n}\n").map(|i| start + i).unwrap_or(ops.len());
    let body = &ops[start..end];

    assert!(body.contains("Unhandled"));
    assert!(!body.contains("match code"));
}

#[test]
fn json_protocols_share_one_generic_envelope_parser() {
    let rest = generate(&rest_json::RestJson);
    let rpc = generate(&json_rpc::JsonRpc);

    let rest_de = rest.modules.module_source("json_de").unwrap();
    let rpc_de = rpc.modules.module_source("json_de").unwrap();
    assert_eq!(
        rest_de.matches("pub fn de_generic_error(").count(),
        1
    );
    assert_eq!(rpc_de.matches("pub fn de_generic_error(").count(), 1);

    // Header wins over the body fields; codes are sanitized either way.
    assert!(rest_de.contains("response.header(\"x-wire-error\")"));
    assert!(rest_de.contains("\"__type\" | \"code\" => {"));
    assert!(rest_de.contains("sanitize_error_code"));
}
