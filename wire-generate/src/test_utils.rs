// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

use wire_schema::{
    DefaultValue, ErrorKind, HttpBinding, HttpTrait, ListShape, MapShape, Member, MemberTraits,
    OperationShape, Schema, ServiceShape, Shape, ShapeId, StringShape, StructureShape,
    TimestampFormat,
};

pub fn service_id() -> ShapeId {
    ShapeId::new("example.widgets#Widgets")
}

fn id(name: &str) -> ShapeId {
    ShapeId::new(format!("example.widgets#{}", name))
}

fn prim(name: &str) -> ShapeId {
    ShapeId::new(format!("wire#{}", name))
}

fn required() -> MemberTraits {
    MemberTraits {
        required: true,
        ..MemberTraits::default()
    }
}

fn bound(http: HttpBinding) -> MemberTraits {
    MemberTraits {
        http: Some(http),
        ..MemberTraits::default()
    }
}

/// One service exercising every feature the generators support: nested
/// containers, a union with an empty-structure variant, enum strings, all
/// three timestamp formats, blob and document members, a streaming-blob pair
/// of operations, an event stream with an initial response, and error shapes
/// with and without explicit wire codes.
pub fn sample_schema() -> Schema {
    let mut shapes: Vec<(ShapeId, Shape)> = vec![
        (prim("String"), Shape::String(StringShape::plain())),
        (prim("Boolean"), Shape::Boolean),
        (prim("Integer"), Shape::Integer),
        (prim("Long"), Shape::Long),
        (prim("Double"), Shape::Double),
        (prim("Blob"), Shape::Blob),
        (prim("Timestamp"), Shape::Timestamp),
        (prim("Document"), Shape::Document),
        (
            id("WidgetStatus"),
            Shape::String(StringShape::enumerated(vec!["ACTIVE", "ARCHIVED"])),
        ),
        (id("WidgetTags"), Shape::List(ListShape::new(prim("String")))),
        (
            id("WidgetAttributes"),
            Shape::Map(MapShape::new(prim("String"))),
        ),
        (
            id("PartList"),
            Shape::List(ListShape::new(id("Part"))),
        ),
        (
            id("Part"),
            Shape::Structure(StructureShape::new(vec![
                Member::new("part_number", prim("Integer")).with_traits(required()),
                Member::new("weight", prim("Double")),
            ])),
        ),
    ];

    // PutWidget: the kitchen-sink REST operation.
    shapes.push((
        id("PutWidgetInput"),
        Shape::Structure(StructureShape::new(vec![
            Member::new("id", prim("String")).with_traits(MemberTraits {
                required: true,
                http: Some(HttpBinding::Label),
                ..MemberTraits::default()
            }),
            Member::new("if_match", prim("String"))
                .with_traits(bound(HttpBinding::Header("If-Match".to_string()))),
            Member::new("verbose", prim("Boolean"))
                .with_traits(bound(HttpBinding::Query("verbose".to_string()))),
            Member::new("metadata", id("WidgetAttributes"))
                .with_traits(bound(HttpBinding::PrefixHeaders("x-widget-".to_string()))),
            Member::new("name", prim("String")),
            Member::new("count", prim("Integer")).with_traits(MemberTraits {
                default_value: Some(DefaultValue::Int(0)),
                ..MemberTraits::default()
            }),
            Member::new("status", id("WidgetStatus")),
            Member::new("tags", id("WidgetTags")),
            Member::new("attributes", id("WidgetAttributes")),
            Member::new("parts", id("PartList")),
            Member::new("created_at", prim("Timestamp")),
            Member::new("expires_at", prim("Timestamp")).with_traits(MemberTraits {
                timestamp_format: Some(TimestampFormat::HttpDate),
                ..MemberTraits::default()
            }),
            Member::new("event", id("WidgetEvent")),
        ])),
    ));
    shapes.push((
        id("PutWidgetOutput"),
        Shape::Structure(StructureShape::new(vec![
            Member::new("widget_id", prim("String")).with_traits(required()),
            Member::new("updated_at", prim("Timestamp")),
            Member::new("request_id", prim("String"))
                .with_traits(bound(HttpBinding::Header("x-request-id".to_string()))),
            Member::new("status_code", prim("Integer"))
                .with_traits(bound(HttpBinding::StatusCode)),
        ])),
    ));
    shapes.push((
        id("NoSuchWidget"),
        Shape::Structure(
            StructureShape::new(vec![Member::new("message", prim("String"))])
                .with_error(ErrorKind::Client)
                .with_wire_code("WidgetMissing"),
        ),
    ));
    shapes.push((
        id("InvalidWidget"),
        Shape::Structure(
            StructureShape::new(vec![
                Member::new("message", prim("String")),
                Member::new("field", prim("String")),
            ])
            .with_error(ErrorKind::Client),
        ),
    ));
    shapes.push((
        id("PutWidget"),
        Shape::Operation(OperationShape {
            input: Some(id("PutWidgetInput")),
            output: Some(id("PutWidgetOutput")),
            errors: vec![id("NoSuchWidget"), id("InvalidWidget")],
            http: Some(HttpTrait::new("PUT", "/widgets/{id}")),
        }),
    ));

    // The union, including the empty-structure variant and an exception
    // variant for event streams.
    shapes.push((
        id("WidgetCreated"),
        Shape::Structure(StructureShape::new(vec![
            Member::new("widget_id", prim("String")).with_traits(required()),
            Member::new("at", prim("Timestamp")),
        ])),
    ));
    shapes.push((id("Ping"), Shape::Structure(StructureShape::new(vec![]))));
    shapes.push((
        id("WatchFailed"),
        Shape::Structure(
            StructureShape::new(vec![Member::new("message", prim("String"))])
                .with_error(ErrorKind::Server),
        ),
    ));
    shapes.push((
        id("WidgetEvent"),
        Shape::Union(wire_schema::UnionShape::new(vec![
            Member::new("created", id("WidgetCreated")),
            Member::new("ping", id("Ping")),
            Member::new("note", prim("String")),
            Member::new("failure", id("WatchFailed")),
        ])),
    ));

    // Buffered blob payload: the response content-type special case.
    shapes.push((
        id("GetWidgetThumbnailInput"),
        Shape::Structure(StructureShape::new(vec![Member::new("id", prim("String"))
            .with_traits(MemberTraits {
                required: true,
                http: Some(HttpBinding::Label),
                ..MemberTraits::default()
            })])),
    ));
    shapes.push((
        id("GetWidgetThumbnailOutput"),
        Shape::Structure(StructureShape::new(vec![
            Member::new("data", prim("Blob")).with_traits(bound(HttpBinding::Payload))
        ])),
    ));
    shapes.push((
        id("GetWidgetThumbnail"),
        Shape::Operation(OperationShape {
            input: Some(id("GetWidgetThumbnailInput")),
            output: Some(id("GetWidgetThumbnailOutput")),
            errors: vec![id("NoSuchWidget")],
            http: Some(HttpTrait::new("GET", "/widgets/{id}/thumbnail")),
        }),
    ));

    // Streaming blob payloads, both directions.
    shapes.push((
        id("UploadWidgetDataInput"),
        Shape::Structure(StructureShape::new(vec![
            Member::new("id", prim("String")).with_traits(MemberTraits {
                required: true,
                http: Some(HttpBinding::Label),
                ..MemberTraits::default()
            }),
            Member::new("data", prim("Blob")).with_traits(MemberTraits {
                streaming: true,
                ..MemberTraits::default()
            }),
        ])),
    ));
    shapes.push((
        id("UploadWidgetData"),
        Shape::Operation(OperationShape {
            input: Some(id("UploadWidgetDataInput")),
            output: None,
            errors: vec![id("NoSuchWidget")],
            http: Some(HttpTrait::new("POST", "/widgets/{id}/data")),
        }),
    ));
    shapes.push((
        id("DownloadWidgetDataInput"),
        Shape::Structure(StructureShape::new(vec![Member::new("id", prim("String"))
            .with_traits(MemberTraits {
                required: true,
                http: Some(HttpBinding::Label),
                ..MemberTraits::default()
            })])),
    ));
    shapes.push((
        id("DownloadWidgetDataOutput"),
        Shape::Structure(StructureShape::new(vec![
            Member::new("data", prim("Blob")).with_traits(MemberTraits {
                streaming: true,
                ..MemberTraits::default()
            }),
            Member::new("content_length", prim("Long"))
                .with_traits(bound(HttpBinding::Header("content-length".to_string()))),
        ])),
    ));
    shapes.push((
        id("DownloadWidgetData"),
        Shape::Operation(OperationShape {
            input: Some(id("DownloadWidgetDataInput")),
            output: Some(id("DownloadWidgetDataOutput")),
            errors: vec![id("NoSuchWidget")],
            http: Some(HttpTrait::new("GET", "/widgets/{id}/data")),
        }),
    ));

    // Event stream with out-of-band initial-response fields.
    shapes.push((
        id("WatchWidgetsInput"),
        Shape::Structure(StructureShape::new(vec![Member::new(
            "since",
            prim("Timestamp"),
        )
        .with_traits(bound(HttpBinding::Query("since".to_string())))])),
    ));
    shapes.push((
        id("WatchWidgetsOutput"),
        Shape::Structure(StructureShape::new(vec![
            Member::new("subscription_id", prim("String")),
            Member::new("events", id("WidgetEvent")).with_traits(MemberTraits {
                event_stream: true,
                ..MemberTraits::default()
            }),
        ])),
    ));
    shapes.push((
        id("WatchWidgets"),
        Shape::Operation(OperationShape {
            input: Some(id("WatchWidgetsInput")),
            output: Some(id("WatchWidgetsOutput")),
            errors: vec![],
            http: Some(HttpTrait::new("GET", "/widgets/events")),
        }),
    ));

    // Document member: supported by the JSON protocols only.
    shapes.push((
        id("PutWidgetPolicyInput"),
        Shape::Structure(StructureShape::new(vec![
            Member::new("id", prim("String")).with_traits(MemberTraits {
                required: true,
                http: Some(HttpBinding::Label),
                ..MemberTraits::default()
            }),
            Member::new("policy", prim("Document")),
        ])),
    ));
    shapes.push((
        id("PutWidgetPolicy"),
        Shape::Operation(OperationShape {
            input: Some(id("PutWidgetPolicyInput")),
            output: None,
            errors: vec![],
            http: Some(HttpTrait::new("PUT", "/widgets/{id}/policy")),
        }),
    ));

    shapes.push((
        service_id(),
        Shape::Service(ServiceShape {
            version: Some("2020-08-01".to_string()),
            operations: vec![
                id("PutWidget"),
                id("GetWidgetThumbnail"),
                id("UploadWidgetData"),
                id("DownloadWidgetData"),
                id("WatchWidgets"),
                id("PutWidgetPolicy"),
            ],
        }),
    ));

    Schema::from_shapes(shapes)
}
