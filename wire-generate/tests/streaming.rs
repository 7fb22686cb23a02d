// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

use wire_generate::protocol::{generate_service, GeneratedService, Protocol};
use wire_generate::{rest_json, test_utils, GeneratorConfig};

fn generate(protocol: &dyn Protocol) -> GeneratedService {
    let schema = test_utils::sample_schema();
    let config = GeneratorConfig::new("widgets".to_string());
    generate_service(&schema, &test_utils::service_id(), protocol, &config).unwrap()
}

fn op_body<'a>(source: &'a str, name: &str) -> &'a str {
    let start = source.find(name).unwrap();
    let end = source[start..]
        .find("\n}\n")
        .map(|i| start + i)
        .unwrap_or(source.len());
    &source[start..end]
}

#[test]
fn streaming_request_transfers_body_ownership() {
    let generated = generate(&rest_json::RestJson);
    let ops = generated.modules.module_source("rest_json_ops").unwrap();
    let body = op_body(&ops, "pub fn ser_example_widgets_upload_widget_data_http_request(");

    // The input moves in by value and its stream becomes the body directly;
    // nothing materializes the bytes.
    assert!(body.contains("(input: crate::model::UploadWidgetDataInput)"));
    assert!(body.contains("request.body(wire_rt::body::Body::from_stream(input.data));"));
    assert!(!body.contains("to_vec()"));
    assert!(!body.contains("JsonObjectWriter"));
}

#[test]
fn streaming_success_path_never_decodes_eagerly() {
    let generated = generate(&rest_json::RestJson);
    let ops = generated.modules.module_source("rest_json_ops").unwrap();
    let body = op_body(&ops, "pub fn de_example_widgets_download_widget_data_http_response(");

    assert!(body.contains("(mut response: wire_rt::http::Response)"));
    assert!(body.contains("response.take_body().into_stream()"));
    // Header bindings still decode independently of the streamed body.
    assert!(body.contains("response.header(\"content-length\")"));
    assert!(!body.contains("response.body()"));
}

#[test]
fn streaming_error_path_always_buffers() {
    let generated = generate(&rest_json::RestJson);
    let ops = generated.modules.module_source("rest_json_ops").unwrap();
    let body = op_body(&ops, "pub fn de_example_widgets_download_widget_data_http_error(");

    // Error responses are fully buffered and parsed even though the success
    // path streams.
    assert!(body.contains("response.body()"));
    assert!(!body.contains("into_stream()"));
}

#[test]
fn event_stream_output_merges_the_initial_response() {
    let generated = generate(&rest_json::RestJson);
    let ops = generated.modules.module_source("rest_json_ops").unwrap();
    let body = op_body(&ops, "pub fn de_example_widgets_watch_widgets_http_response(");

    assert!(body.contains("response.take_body().into_event_stream()"));
    assert!(body.contains("stream.try_recv_initial()"));
    // Out-of-band fields decode through the body subset parser before the
    // stream is handed over.
    assert!(body.contains("_http_body"));
    assert!(body.contains("wire_rt::event_stream::EventStream::new(stream, crate::json_event::unmarshall_event_example_widgets_widget_event)"));
}

#[test]
fn event_frames_carry_type_and_content_headers() {
    let generated = generate(&rest_json::RestJson);
    let events = generated.modules.module_source("json_event").unwrap();

    assert!(events.contains("pub fn marshall_event_example_widgets_widget_event("));
    assert!(events.contains("Header::new(\":message-type\", \"event\")"));
    assert!(events.contains("Header::new(\":event-type\", \"created\")"));
    assert!(events.contains("Header::new(\":content-type\", \"application/json\")"));
    // Every frame passes through the signing hook.
    assert!(events.contains("signer.sign(message)"));

    // The unmarshaller discriminates exceptions against error-carrying
    // variants and rejects unknown events.
    assert!(events.contains("\"exception\" => {"));
    assert!(events.contains("message.header(\":exception-type\")"));
    assert!(events.contains("\"failure\" => {"));
    assert!(events.contains("EventError::unknown_variant(other)"));
}
