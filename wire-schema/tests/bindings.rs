// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

use wire_schema::bindings::{
    resolve_operation, response_content_type, BindingLocation, BindingMode,
};
use wire_schema::{
    ErrorKind, HttpBinding, HttpTrait, Member, MemberTraits, ModelError, OperationShape, Schema,
    Shape, ShapeId, StringShape, StructureShape,
};

fn string_id() -> ShapeId {
    ShapeId::new("wire#String")
}

fn blob_id() -> ShapeId {
    ShapeId::new("wire#Blob")
}

fn member_with_http(name: &str, target: ShapeId, http: HttpBinding) -> Member {
    Member::new(name, target).with_traits(MemberTraits {
        http: Some(http),
        ..MemberTraits::default()
    })
}

fn widget_schema(input_members: Vec<Member>, output_members: Vec<Member>) -> (Schema, ShapeId) {
    let op_id = ShapeId::new("example.widgets#GetWidget");
    let schema = Schema::from_shapes(vec![
        (string_id(), Shape::String(StringShape::plain())),
        (blob_id(), Shape::Blob),
        (
            ShapeId::new("example.widgets#GetWidgetInput"),
            Shape::Structure(StructureShape::new(input_members)),
        ),
        (
            ShapeId::new("example.widgets#GetWidgetOutput"),
            Shape::Structure(StructureShape::new(output_members)),
        ),
        (
            op_id.clone(),
            Shape::Operation(OperationShape {
                input: Some(ShapeId::new("example.widgets#GetWidgetInput")),
                output: Some(ShapeId::new("example.widgets#GetWidgetOutput")),
                errors: vec![],
                http: Some(HttpTrait::new("GET", "/widgets/{id}")),
            }),
        ),
    ]);
    (schema, op_id)
}

#[test]
fn native_bindings_follow_member_traits() {
    let (schema, op_id) = widget_schema(
        vec![
            member_with_http("id", string_id(), HttpBinding::Label),
            member_with_http("if_match", string_id(), HttpBinding::Header("If-Match".into())),
            member_with_http("verbose", string_id(), HttpBinding::Query("verbose".into())),
            Member::new("comment", string_id()),
        ],
        vec![Member::new("name", string_id())],
    );
    let resolved = resolve_operation(&schema, &op_id, &BindingMode::Http).unwrap();

    assert_eq!(resolved.method, "GET");
    assert_eq!(resolved.input.labels().count(), 1);
    assert_eq!(resolved.input.headers().count(), 1);
    assert_eq!(resolved.input.queries().count(), 1);
    let document: Vec<_> = resolved
        .input
        .document_members()
        .map(|b| b.member.name.as_str())
        .collect();
    assert_eq!(document, vec!["comment"]);
}

#[test]
fn synthetic_bindings_ignore_member_traits() {
    let (schema, op_id) = widget_schema(
        vec![
            member_with_http("id", string_id(), HttpBinding::Label),
            member_with_http("if_match", string_id(), HttpBinding::Header("If-Match".into())),
        ],
        vec![],
    );
    let mode = BindingMode::Synthetic {
        method: "POST".to_string(),
        uri: "/".to_string(),
    };
    let resolved = resolve_operation(&schema, &op_id, &mode).unwrap();

    assert_eq!(resolved.method, "POST");
    assert!(resolved
        .input
        .bindings
        .iter()
        .all(|b| b.location == BindingLocation::Document));
}

#[test]
fn unbound_label_is_an_error() {
    let (schema, op_id) = widget_schema(vec![Member::new("comment", string_id())], vec![]);
    match resolve_operation(&schema, &op_id, &BindingMode::Http).unwrap_err() {
        ModelError::UnboundLabel { label, .. } => assert_eq!(label, "id"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn payload_conflicts_with_document_members() {
    let (schema, op_id) = widget_schema(
        vec![
            member_with_http("id", string_id(), HttpBinding::Label),
            member_with_http("body", blob_id(), HttpBinding::Payload),
            Member::new("comment", string_id()),
        ],
        vec![],
    );
    match resolve_operation(&schema, &op_id, &BindingMode::Http).unwrap_err() {
        ModelError::InvalidBinding { member, .. } => assert_eq!(member, "body"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn plain_blob_response_payload_keeps_default_content_type() {
    let (schema, op_id) = widget_schema(
        vec![member_with_http("id", string_id(), HttpBinding::Label)],
        vec![member_with_http("data", blob_id(), HttpBinding::Payload)],
    );
    let resolved = resolve_operation(&schema, &op_id, &BindingMode::Http).unwrap();
    let content_type = response_content_type(&schema, &resolved, "application/json").unwrap();
    assert_eq!(content_type.as_deref(), Some("application/json"));
}

#[test]
fn streaming_blob_response_payload_is_octet_stream() {
    let streaming = Member::new("data", blob_id()).with_traits(MemberTraits {
        streaming: true,
        http: Some(HttpBinding::Payload),
        ..MemberTraits::default()
    });
    let (schema, op_id) = widget_schema(
        vec![member_with_http("id", string_id(), HttpBinding::Label)],
        vec![streaming],
    );
    let resolved = resolve_operation(&schema, &op_id, &BindingMode::Http).unwrap();
    let content_type = response_content_type(&schema, &resolved, "application/json").unwrap();
    assert_eq!(content_type.as_deref(), Some("application/octet-stream"));
}

#[test]
fn media_typed_blob_payload_uses_its_media_type() {
    let media = Member::new("data", blob_id()).with_traits(MemberTraits {
        media_type: Some("image/png".to_string()),
        http: Some(HttpBinding::Payload),
        ..MemberTraits::default()
    });
    let (schema, op_id) = widget_schema(
        vec![member_with_http("id", string_id(), HttpBinding::Label)],
        vec![media],
    );
    let resolved = resolve_operation(&schema, &op_id, &BindingMode::Http).unwrap();
    let content_type = response_content_type(&schema, &resolved, "application/json").unwrap();
    assert_eq!(content_type.as_deref(), Some("image/png"));
}

#[test]
fn error_shapes_must_carry_the_error_trait() {
    let op_id = ShapeId::new("example.widgets#GetWidget");
    let error_id = ShapeId::new("example.widgets#NotAnError");
    let schema = Schema::from_shapes(vec![
        (string_id(), Shape::String(StringShape::plain())),
        (
            error_id.clone(),
            Shape::Structure(StructureShape::new(vec![])),
        ),
        (
            op_id.clone(),
            Shape::Operation(OperationShape {
                input: None,
                output: None,
                errors: vec![error_id],
                http: Some(HttpTrait::new("POST", "/")),
            }),
        ),
    ]);
    assert!(matches!(
        resolve_operation(&schema, &op_id, &BindingMode::Http).unwrap_err(),
        ModelError::InvalidBinding { .. }
    ));
}

#[test]
fn declared_error_with_trait_resolves() {
    let op_id = ShapeId::new("example.widgets#GetWidget");
    let error_id = ShapeId::new("example.widgets#NoSuchWidget");
    let schema = Schema::from_shapes(vec![
        (string_id(), Shape::String(StringShape::plain())),
        (
            error_id.clone(),
            Shape::Structure(
                StructureShape::new(vec![Member::new("message", string_id())])
                    .with_error(ErrorKind::Client),
            ),
        ),
        (
            op_id.clone(),
            Shape::Operation(OperationShape {
                input: None,
                output: None,
                errors: vec![error_id.clone()],
                http: Some(HttpTrait::new("POST", "/")),
            }),
        ),
    ]);
    let resolved = resolve_operation(&schema, &op_id, &BindingMode::Http).unwrap();
    assert_eq!(resolved.errors.len(), 1);
    assert_eq!(resolved.errors[0].shape.as_ref(), Some(&error_id));
    assert_eq!(resolved.errors[0].document_members().count(), 1);
}
