// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

use wire_generate::protocol::{generate_service, GeneratedService, Protocol};
use wire_generate::{query_rpc, rest_json, rest_xml, test_utils, GeneratorConfig};

fn generate(protocol: &dyn Protocol) -> GeneratedService {
    let schema = test_utils::sample_schema();
    let config = GeneratorConfig::new("widgets".to_string());
    generate_service(&schema, &test_utils::service_id(), protocol, &config).unwrap()
}

#[test]
fn member_override_beats_the_protocol_default() {
    let generated = generate(&rest_json::RestJson);
    let source = generated.modules.module_source("json_ser").unwrap();

    // `expires_at` carries an explicit http-date override.
    assert!(source.contains(
        "object.date_time(\"expires_at\", var_expires_at, wire_rt::time::Format::HttpDate);"
    ));
    // `created_at` falls back to the protocol default.
    assert!(source.contains(
        "object.date_time(\"created_at\", var_created_at, wire_rt::time::Format::EpochSeconds);"
    ));
}

#[test]
fn xml_protocols_default_to_date_time() {
    let generated = generate(&rest_xml::RestXml);
    let source = generated.modules.module_source("xml_ser").unwrap();

    assert!(source.contains(
        "wire_rt::time::format(var_created_at, wire_rt::time::Format::DateTime)"
    ));
    assert!(source.contains(
        "wire_rt::time::format(var_expires_at, wire_rt::time::Format::HttpDate)"
    ));
}

#[test]
fn binding_locations_carry_their_own_defaults() {
    let generated = generate(&rest_json::RestJson);
    let ops = generated.modules.module_source("rest_json_ops").unwrap();

    // Query-bound timestamps default to date-time regardless of the body
    // default.
    assert!(ops.contains(
        "request.query(\"since\", wire_rt::time::format(var_since, wire_rt::time::Format::DateTime).as_str());"
    ));
}

#[test]
fn the_body_default_is_part_of_the_function_name() {
    // The same shape serialized under protocols with different defaults must
    // resolve to different registry keys, since the bodies differ.
    let json = generate(&rest_json::RestJson);
    let xml = generate(&rest_xml::RestXml);

    let json_ser = json.modules.module_source("json_ser").unwrap();
    let xml_ser = xml.modules.module_source("xml_ser").unwrap();
    assert!(json_ser.contains("ser_structure_example_widgets_widget_created_epoch_seconds("));
    assert!(xml_ser.contains("ser_structure_example_widgets_widget_created_date_time("));

    // Shapes without an inline timestamp dependency keep format-free names.
    assert!(json_ser.contains("pub fn ser_structure_example_widgets_part("));
    assert!(xml_ser.contains("pub fn ser_structure_example_widgets_part("));
}

#[test]
fn query_timestamps_parse_and_render_as_date_time() {
    let generated = generate(&query_rpc::QueryRpc);
    let ser = generated.modules.module_source("query_ser").unwrap();

    assert!(ser.contains(
        "scope.value(\"created_at\").timestamp(var_created_at, wire_rt::time::Format::DateTime);"
    ));
}
