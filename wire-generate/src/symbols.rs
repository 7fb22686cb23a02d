// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The seam towards the target-language type generator.
//!
//! The engine never invents Rust types for schema shapes on its own: a
//! [`SymbolProvider`] answers what type a shape maps to, how a member's field
//! and setter are called, and whether a value is wrapped as optional. The
//! [`DefaultSymbols`] implementation mirrors the conventions of the companion
//! builder-pattern generator; code generators with their own naming policy
//! substitute their provider here.

use crate::error::Result;
use heck::{CamelCase, SnakeCase};
use wire_schema::{Member, ModelError, Schema, Shape, ShapeId};

pub trait SymbolProvider {
    /// Rust type representing values of the target shape.
    fn shape_type(&self, schema: &Schema, id: &ShapeId) -> Result<String>;

    /// Field name of a member inside its generated container type.
    fn field_name(&self, member: &Member) -> String;

    /// Builder setter for a member; always takes an `Option`.
    fn setter_name(&self, member: &Member) -> String;

    /// Enum variant representing a union member.
    fn variant_name(&self, member: &Member) -> String;

    /// Generated model type for a structure, union or enum shape.
    fn model_type(&self, id: &ShapeId) -> String;

    /// Builder type finalized by the parsers.
    fn builder_type(&self, id: &ShapeId) -> String;

    /// The per-operation error enum produced by error discrimination.
    fn error_enum(&self, operation: &ShapeId) -> String;

    /// Rust type of a member's value inside its container, accounting for
    /// member-level traits (a streaming blob is a byte stream, not a buffer).
    fn member_type(&self, schema: &Schema, member: &Member) -> Result<String>;

    /// Whether a member's value is wrapped as `Option` in its container
    /// (as opposed to present-by-default).
    fn is_optional(&self, member: &Member) -> bool;
}

/// Naming conventions of the companion model generator: `heck`-cased names
/// under `crate::model`, builders named `<Type>Builder`, every non-required
/// member wrapped as `Option`.
pub struct DefaultSymbols {
    runtime_crate: String,
}

impl DefaultSymbols {
    pub fn new<S: Into<String>>(runtime_crate: S) -> Self {
        Self {
            runtime_crate: runtime_crate.into(),
        }
    }
}

impl SymbolProvider for DefaultSymbols {
    fn shape_type(&self, schema: &Schema, id: &ShapeId) -> Result<String> {
        let rt = &self.runtime_crate;
        let quoted = match schema.expect(id)? {
            Shape::Boolean => "bool".to_string(),
            Shape::Byte => "i8".to_string(),
            Shape::Short => "i16".to_string(),
            Shape::Integer => "i32".to_string(),
            Shape::Long => "i64".to_string(),
            Shape::Float => "f32".to_string(),
            Shape::Double => "f64".to_string(),
            Shape::String(_) => "String".to_string(),
            Shape::Blob => format!("{}::blob::Blob", rt),
            Shape::Document => format!("{}::document::Document", rt),
            Shape::Timestamp => format!("{}::time::Timestamp", rt),
            Shape::List(list) => {
                format!("Vec<{}>", self.shape_type(schema, &list.member.target)?)
            }
            Shape::Map(map) => format!(
                "std::collections::HashMap<String, {}>",
                self.shape_type(schema, &map.value.target)?
            ),
            Shape::Structure(_) | Shape::Union(_) => self.model_type(id),
            other @ Shape::Operation(_) | other @ Shape::Service(_) => {
                return Err(ModelError::UnexpectedKind {
                    id: id.clone(),
                    expected: "data shape",
                    actual: other.kind_name(),
                }
                .into())
            }
        };
        Ok(quoted)
    }

    fn field_name(&self, member: &Member) -> String {
        member.name.to_snake_case()
    }

    fn setter_name(&self, member: &Member) -> String {
        format!("set_{}", member.name.to_snake_case())
    }

    fn variant_name(&self, member: &Member) -> String {
        member.name.to_camel_case()
    }

    fn model_type(&self, id: &ShapeId) -> String {
        format!("crate::model::{}", id.name().to_camel_case())
    }

    fn builder_type(&self, id: &ShapeId) -> String {
        format!("crate::model::{}Builder", id.name().to_camel_case())
    }

    fn error_enum(&self, operation: &ShapeId) -> String {
        format!("crate::error::{}Error", operation.name().to_camel_case())
    }

    fn member_type(&self, schema: &Schema, member: &Member) -> Result<String> {
        if member.is_streaming() {
            return Ok(format!("{}::byte_stream::ByteStream", self.runtime_crate));
        }
        if member.is_event_stream() {
            return Ok(format!(
                "{}::event_stream::EventStream<{}>",
                self.runtime_crate,
                self.model_type(&member.target)
            ));
        }
        self.shape_type(schema, &member.target)
    }

    fn is_optional(&self, member: &Member) -> bool {
        // Required members, members carrying a declared default, and stream
        // members are present-by-default in the generated model.
        !(member.is_required()
            || member.traits.default_value.is_some()
            || member.is_streaming()
            || member.is_event_stream())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire_schema::{ListShape, StringShape};

    #[test]
    fn default_symbols_follow_model_conventions() {
        let string_id = ShapeId::new("wire#String");
        let list_id = ShapeId::new("example#Names");
        let schema = Schema::from_shapes(vec![
            (string_id.clone(), Shape::String(StringShape::plain())),
            (list_id.clone(), Shape::List(ListShape::new(string_id.clone()))),
        ]);
        let symbols = DefaultSymbols::new("wire_rt");

        assert_eq!(symbols.shape_type(&schema, &list_id).unwrap(), "Vec<String>");
        assert_eq!(
            symbols.model_type(&ShapeId::new("example#widget_thing")),
            "crate::model::WidgetThing"
        );

        let member = Member::new("CreatedAt", ShapeId::new("wire#Timestamp"));
        assert_eq!(symbols.field_name(&member), "created_at");
        assert_eq!(symbols.setter_name(&member), "set_created_at");
        assert_eq!(symbols.variant_name(&member), "CreatedAt");
        assert!(symbols.is_optional(&member));
    }
}
