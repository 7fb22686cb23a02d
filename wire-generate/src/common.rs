// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

use heck::SnakeCase;
use wire_schema::{Schema, Shape, ShapeId, StructureShape, TimestampFormat};

/// Mangle a shape id into a function-name fragment:
/// `example.widgets#GetWidgetInput` becomes `example_widgets_get_widget_input`.
///
/// Names are derived from the fully-qualified path so that unrelated shapes
/// with the same local name never collide, and repeated generator runs are
/// byte-for-byte reproducible (no counters).
pub(crate) fn mangle_shape(id: &ShapeId) -> String {
    let name = id.name().to_snake_case();
    let namespace = id.namespace().replace('.', "_").to_snake_case();
    if namespace.is_empty() {
        name
    } else {
        format!("{}_{}", namespace, name)
    }
}

/// Function name for a shape-level helper, e.g.
/// `ser_structure_example_widgets_widget` or
/// `de_structure_example_widgets_widget_epoch_seconds`.
pub(crate) fn shape_fn(prefix: &str, kind: &str, id: &ShapeId, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{}_{}_{}_{}", prefix, kind, mangle_shape(id), suffix),
        None => format!("{}_{}_{}", prefix, kind, mangle_shape(id)),
    }
}

/// Function name for an operation-level entry point, e.g.
/// `ser_example_widgets_get_widget_http_request`.
pub(crate) fn op_fn(prefix: &str, id: &ShapeId, suffix: &str) -> String {
    format!("{}_{}_{}", prefix, mangle_shape(id), suffix)
}

/// The timestamp format a structure's serializer body depends on, if any.
///
/// Timestamps reached without crossing another structure or union are encoded
/// inline in this structure's function, so its body text depends on the
/// protocol default whenever such a timestamp carries no member override. The
/// returned format is embedded in the function name: requests from protocols
/// with different defaults then resolve to different registry keys, while
/// identical bodies keep sharing one key.
pub(crate) fn inline_timestamp_dependency<'a, I>(
    schema: &Schema,
    members: I,
    default: TimestampFormat,
) -> Option<TimestampFormat>
where
    I: IntoIterator<Item = &'a wire_schema::Member>,
{
    for member in members {
        if member.traits.timestamp_format.is_some() {
            continue;
        }
        if target_has_inline_timestamp(schema, &member.target, 0) {
            return Some(default);
        }
    }
    None
}

fn target_has_inline_timestamp(schema: &Schema, id: &ShapeId, depth: usize) -> bool {
    // Lists and maps nest inline; cycles among them are impossible without a
    // structure or union in between, but cap the walk anyway.
    if depth > 16 {
        return false;
    }
    match schema.get(id) {
        Some(Shape::Timestamp) => true,
        Some(Shape::List(list)) => {
            list.member.traits.timestamp_format.is_none()
                && target_has_inline_timestamp(schema, &list.member.target, depth + 1)
        }
        Some(Shape::Map(map)) => {
            map.value.traits.timestamp_format.is_none()
                && target_has_inline_timestamp(schema, &map.value.target, depth + 1)
        }
        _ => false,
    }
}

/// Compose the deterministic name suffix of a body function from its scope
/// and the timestamp format its text depends on.
pub(crate) fn compose_suffix(
    scope: Option<&'static str>,
    ts: Option<TimestampFormat>,
) -> Option<String> {
    match (scope, ts) {
        (None, None) => None,
        (Some(scope), None) => Some(scope.to_string()),
        (None, Some(ts)) => Some(ts.token().to_string()),
        (Some(scope), Some(ts)) => Some(format!("{}_{}", scope, ts.token())),
    }
}

/// Finish an emission buffer into a function body.
pub(crate) fn into_source(buf: Vec<u8>) -> String {
    String::from_utf8_lossy(&buf).into_owned()
}

/// Line discarding the bound payload of a union variant whose target has no
/// members. The binding must still be named so that every protocol's union
/// serializer stays free of unused-binding diagnostics.
pub(crate) fn unused_payload_guard(target: &StructureShape) -> Option<&'static str> {
    if target.members.is_empty() {
        Some("let _ = inner;")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire_schema::{ListShape, Member, MemberTraits};

    #[test]
    fn mangling_is_fully_qualified() {
        assert_eq!(
            mangle_shape(&ShapeId::new("example.widgets#GetWidgetInput")),
            "example_widgets_get_widget_input"
        );
        assert_eq!(mangle_shape(&ShapeId::new("Widget")), "widget");
        assert_eq!(
            shape_fn(
                "ser",
                "structure",
                &ShapeId::new("a.b#C"),
                Some("epoch_seconds")
            ),
            "ser_structure_a_b_c_epoch_seconds"
        );
    }

    #[test]
    fn timestamp_dependency_sees_through_collections() {
        let ts = ShapeId::new("wire#Timestamp");
        let list = ShapeId::new("example#Stamps");
        let schema = Schema::from_shapes(vec![
            (ts.clone(), Shape::Timestamp),
            (list.clone(), Shape::List(ListShape::new(ts.clone()))),
        ]);

        let direct = StructureShape::new(vec![Member::new("at", ts.clone())]);
        assert_eq!(
            inline_timestamp_dependency(&schema, &direct.members, TimestampFormat::DateTime),
            Some(TimestampFormat::DateTime)
        );

        let nested = StructureShape::new(vec![Member::new("stamps", list)]);
        assert_eq!(
            inline_timestamp_dependency(&schema, &nested.members, TimestampFormat::EpochSeconds),
            Some(TimestampFormat::EpochSeconds)
        );

        let overridden = StructureShape::new(vec![Member::new("at", ts).with_traits(
            MemberTraits {
                timestamp_format: Some(TimestampFormat::HttpDate),
                ..MemberTraits::default()
            },
        )]);
        assert_eq!(
            inline_timestamp_dependency(&schema, &overridden.members, TimestampFormat::EpochSeconds),
            None
        );
    }
}
