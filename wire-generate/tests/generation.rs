// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

use maplit::btreemap;
use wire_generate::protocol::{generate_service, GeneratedService, Protocol};
use wire_generate::{
    cbor_rpc, json_rpc, query_rpc, rest_json, rest_xml, test_utils, GeneratorConfig,
    SourceInstaller,
};

fn generate(protocol: &dyn Protocol) -> GeneratedService {
    let schema = test_utils::sample_schema();
    let config = GeneratorConfig::new("widgets".to_string());
    generate_service(&schema, &test_utils::service_id(), protocol, &config).unwrap()
}

fn render(generated: &GeneratedService) -> String {
    let mut out = Vec::new();
    generated.modules.render(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn rest_json_covers_every_operation() {
    let generated = generate(&rest_json::RestJson);
    assert!(generated.failures.is_empty(), "{:?}", generated.failures);
    assert_eq!(generated.operations.len(), 6);

    let source = render(&generated);
    // Operation entry points land in the protocol's ops module.
    assert!(source.contains("pub mod rest_json_ops {"));
    assert!(source.contains("pub fn ser_example_widgets_put_widget_http_request("));
    assert!(source.contains("pub fn de_example_widgets_put_widget_http_response("));
    assert!(source.contains("pub fn de_example_widgets_put_widget_http_error("));
    // Shape helpers land in the shared family modules.
    assert!(source.contains("pub mod json_ser {"));
    assert!(source.contains("pub fn ser_structure_example_widgets_part("));
    assert!(source
        .contains("pub fn ser_structure_example_widgets_put_widget_input_http_body_epoch_seconds("));
}

#[test]
fn member_emission_follows_declaration_order() {
    let generated = generate(&rest_json::RestJson);
    let source = generated.modules.module_source("json_ser").unwrap();
    let name = source.find("object.string(\"name\"").unwrap();
    let count = source.find("object.int(\"count\"").unwrap();
    let tags = source.find("object.start_array(\"tags\")").unwrap();
    let created = source.find("\"created_at\"").unwrap();
    assert!(name < count && count < tags && tags < created);
}

#[test]
fn rest_json_binds_headers_queries_and_labels() {
    let generated = generate(&rest_json::RestJson);
    let ops = generated.modules.module_source("rest_json_ops").unwrap();

    assert!(ops.contains("uri.push_str(\"/widgets\");"));
    assert!(ops.contains("wire_rt::http::encode_label(var_id.as_str(), false)"));
    assert!(ops.contains("request.query(\"verbose\", var_verbose.to_string().as_str());"));
    assert!(ops.contains("request.header(\"if-match\", var_if_match.as_str());"));
    assert!(ops.contains("request.header(\"content-type\", \"application/json\");"));
    // Prefix headers fan out per map entry.
    assert!(ops.contains("request.header(format!(\"x-widget-{}\", key_1).as_str(), value_1.as_str());"));
    // Response side: status code and header bindings decode independently.
    assert!(ops.contains("builder = builder.set_status_code(Some(response.status() as i32));"));
    assert!(ops.contains("if let Some(raw) = response.header(\"x-request-id\")"));
}

#[test]
fn optional_members_are_omitted_and_defaults_serialize_as_is() {
    let generated = generate(&rest_json::RestJson);
    let source = generated.modules.module_source("json_ser").unwrap();

    // Absent optional member: wrapped in a presence check.
    assert!(source.contains("if let Some(var_name) = &input.name {"));
    // Defaulted member is present-by-default and always serialized as-is,
    // never substituted.
    assert!(source.contains("let var_count = &input.count;"));
    assert!(source.contains("object.int(\"count\", *var_count as i64);"));
}

#[test]
fn json_rpc_posts_to_root_with_target_header() {
    let generated = generate(&json_rpc::JsonRpc);
    let ops = generated.modules.module_source("json_rpc_ops").unwrap();

    assert!(ops.contains("wire_rt::http::Request::new(\"POST\", \"/\")"));
    assert!(ops.contains("request.header(\"x-wire-target\", \"Widgets.PutWidget\");"));
    assert!(ops.contains("request.header(\"content-type\", \"application/x-wire-json-1.1\");"));
    // Streams are out of scope for this protocol, reported per operation.
    let failed: Vec<_> = generated
        .failures
        .iter()
        .map(|f| f.operation.name().to_string())
        .collect();
    assert_eq!(
        failed,
        vec!["UploadWidgetData", "DownloadWidgetData", "WatchWidgets"]
    );
}

#[test]
fn query_rpc_flattens_input_into_form_body() {
    let generated = generate(&query_rpc::QueryRpc);
    let ops = generated.modules.module_source("query_rpc_ops").unwrap();
    let ser = generated.modules.module_source("query_ser").unwrap();

    assert!(ops.contains("wire_rt::query::QueryWriter::new(&mut body, \"PutWidget\", \"2020-08-01\")"));
    assert!(ops
        .contains("request.header(\"content-type\", \"application/x-www-form-urlencoded\");"));
    assert!(ser.contains("scope.value(\"name\").string(var_name.as_str());"));
    assert!(ser.contains("let mut list_1 = scope.value(\"tags\").list();"));
    assert!(ser.contains("let mut map_1 = scope.value(\"attributes\").map();"));
    // Responses come back as XML, wrapped in <OperationNameResult>.
    assert!(ops.contains("if tag.start_el().local() == \"PutWidgetResult\""));
}

#[test]
fn cbor_rpc_uses_raw_bytes_and_service_operation_uri() {
    let generated = generate(&cbor_rpc::CborRpc);
    let ops = generated.modules.module_source("cbor_rpc_ops").unwrap();
    let ser = generated.modules.module_source("cbor_ser").unwrap();
    let de = generated.modules.module_source("cbor_de").unwrap();

    assert!(ops.contains("wire_rt::http::Request::new(\"POST\", \"/service/Widgets/operation/PutWidget\")"));
    assert!(ops.contains("request.header(\"content-type\", \"application/cbor\");"));
    // Binary protocol: blobs are raw bytes, not base64.
    assert!(de.contains("decoder.blob()?"));
    assert!(!ser.contains("base64"));
    assert!(!de.contains("base64"));
}

#[test]
fn document_members_fail_generation_outside_json() {
    for (failures, expect) in [
        (generate(&rest_xml::RestXml).failures, true),
        (generate(&query_rpc::QueryRpc).failures, true),
        (generate(&rest_json::RestJson).failures, false),
    ] {
        let failed = failures
            .iter()
            .any(|f| f.operation.name() == "PutWidgetPolicy");
        assert_eq!(failed, expect, "{:?}", failures);
    }
}

#[test]
fn rest_xml_emits_elements_and_wrapped_errors() {
    let generated = generate(&rest_xml::RestXml);
    let ser = generated.modules.module_source("xml_ser").unwrap();
    let de = generated.modules.module_source("xml_de").unwrap();

    assert!(ser.contains("scope.start_el(\"name\")"));
    assert!(ser.contains("wrap_1.start_el(\"member\")"));
    assert!(de.contains("pub fn de_generic_error("));
    assert!(de.contains("root.start_el().matches(\"ErrorResponse\")"));
    assert!(de.contains("wire_rt::xml::error_scope(&mut doc)?"));
}

#[test]
fn generation_is_reproducible() {
    let first = render(&generate(&rest_json::RestJson));
    let second = render(&generate(&rest_json::RestJson));
    assert_eq!(first, second);
}

#[test]
fn shared_shape_functions_are_interned_once_across_protocols() {
    use wire_generate::registry::FunctionRegistry;
    use wire_generate::symbols::DefaultSymbols;

    let schema = test_utils::sample_schema();
    let config = GeneratorConfig::new("widgets".to_string());
    let registry = FunctionRegistry::new();
    let symbols = DefaultSymbols::new(config.runtime_crate());
    let ctx = wire_generate::protocol::GenContext {
        schema: &schema,
        config: &config,
        registry: &registry,
        symbols: &symbols,
    };
    let service_id = test_utils::service_id();
    let service_shape = schema.expect_service(&service_id).unwrap();
    let service = wire_generate::protocol::ServiceContext {
        id: &service_id,
        shape: service_shape,
    };

    // Both JSON protocols request the nested Part serializer; the registry
    // must resolve them to one key and one body.
    let op = wire_schema::ShapeId::new("example.widgets#PutWidget");
    json_rpc::JsonRpc.serializer_for(&ctx, &service, &op).unwrap();
    let before = registry.len();
    rest_json::RestJson.serializer_for(&ctx, &service, &op).unwrap();
    let after = registry.len();

    let modules = registry.into_modules();
    let source = modules.module_source("json_ser").unwrap();
    assert_eq!(
        source.matches("pub fn ser_structure_example_widgets_part(").count(),
        1
    );
    // The second protocol added its subset body function but reused every
    // nested shape function.
    assert!(after > before);
}

#[test]
fn comments_attach_to_generated_functions() {
    let schema = test_utils::sample_schema();
    let config = GeneratorConfig::new("widgets".to_string()).with_comments(btreemap! {
        (
            "rest_json_ops".to_string(),
            "ser_example_widgets_put_widget_http_request".to_string(),
        ) => "Serialize a PutWidget request.".to_string(),
    });
    let generated = generate_service(
        &schema,
        &test_utils::service_id(),
        &rest_json::RestJson,
        &config,
    )
    .unwrap();

    let mut out = Vec::new();
    generated
        .modules
        .render_with_config(&mut out, Some(&config))
        .unwrap();
    let source = String::from_utf8(out).unwrap();
    assert!(source.contains("/// Serialize a PutWidget request."));
}

#[test]
fn installer_writes_one_file_per_module() {
    let dir = tempfile::tempdir().unwrap();
    let generated = generate(&rest_json::RestJson);
    let config = GeneratorConfig::new("widgets".to_string());
    let installer = wire_generate::protocol::Installer::new(dir.path().to_path_buf());
    installer.install_service(&config, &generated).unwrap();

    let mod_rs = std::fs::read_to_string(dir.path().join("widgets/mod.rs")).unwrap();
    assert!(mod_rs.contains("pub mod json_ser;"));
    assert!(mod_rs.contains("pub mod rest_json_ops;"));
    let ser = std::fs::read_to_string(dir.path().join("widgets/json_ser.rs")).unwrap();
    assert!(ser.contains("pub fn ser_structure_example_widgets_part("));
}
