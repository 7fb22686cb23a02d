// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! This crate provides the immutable schema model consumed by the `wire-generate`
//! code generator: a graph of typed *shapes* (structures, unions, collections,
//! maps, enums, primitives, blobs, documents, timestamps) connected by named
//! *members* carrying protocol-relevant traits, plus the resolution of
//! per-operation HTTP binding descriptors.
//!
//! The model is pure data. It is built once (typically deserialized from a YAML
//! file with [`serde`]), never mutated afterwards, and offers only lookups:
//! ```
//! use wire_schema::{Schema, Shape, ShapeId, StructureShape, Member};
//!
//! let id = ShapeId::new("example.widgets#Widget");
//! let schema = Schema::from_shapes(vec![(
//!     id.clone(),
//!     Shape::Structure(StructureShape::new(vec![Member::new(
//!         "name",
//!         ShapeId::new("wire#String"),
//!     )])),
//! )]);
//! assert!(schema.expect_structure(&id).is_ok());
//! ```
//!
//! Validation of the schema itself (trait combinations, reference integrity
//! beyond what lookups need) is the responsibility of the loader; this crate
//! reports broken references through [`ModelError`] when they are hit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Resolution of HTTP binding descriptors for operations.
pub mod bindings;

/// Error type for schema lookups and binding resolution.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("shape {0} is not defined in the schema")]
    MissingShape(ShapeId),

    #[error("shape {id} is a {actual}, expected a {expected}")]
    UnexpectedKind {
        id: ShapeId,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("operation {0} carries no HTTP trait but the protocol requires one")]
    MissingHttpTrait(ShapeId),

    #[error("invalid uri template {uri:?}: {reason}")]
    InvalidUriTemplate { uri: String, reason: String },

    #[error("uri template {uri:?} references label {label:?} but {shape} has no matching member")]
    UnboundLabel {
        uri: String,
        label: String,
        shape: ShapeId,
    },

    #[error("shape {shape}: member {member:?}: {reason}")]
    InvalidBinding {
        shape: ShapeId,
        member: String,
        reason: String,
    },
}

/// Result of schema lookups and binding resolution.
pub type Result<T, E = ModelError> = std::result::Result<T, E>;

/// The stable identity of a shape, `"namespace#Name"`.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ShapeId(String);

impl ShapeId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after `#`, or the whole id when there is no namespace.
    pub fn name(&self) -> &str {
        match self.0.find('#') {
            Some(index) => &self.0[index + 1..],
            None => &self.0,
        }
    }

    /// The part before `#`, or the empty string.
    pub fn namespace(&self) -> &str {
        match self.0.find('#') {
            Some(index) => &self.0[..index],
            None => "",
        }
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeId({})", self.0)
    }
}

impl From<&str> for ShapeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Timestamp encodings supported on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// Fractional seconds since the Unix epoch, e.g. `1515531081.123`.
    EpochSeconds,
    /// RFC 3339-style date time, e.g. `1985-04-12T23:20:50.52Z`.
    DateTime,
    /// IMF-fixdate, e.g. `Tue, 29 Apr 2014 18:30:38 GMT`.
    HttpDate,
}

impl TimestampFormat {
    /// Stable lowercase token used in mangled function names and in the
    /// emitted runtime `Format::` path.
    pub fn token(self) -> &'static str {
        match self {
            TimestampFormat::EpochSeconds => "epoch_seconds",
            TimestampFormat::DateTime => "date_time",
            TimestampFormat::HttpDate => "http_date",
        }
    }

    /// Variant name in the emitted runtime enum.
    pub fn variant(self) -> &'static str {
        match self {
            TimestampFormat::EpochSeconds => "EpochSeconds",
            TimestampFormat::DateTime => "DateTime",
            TimestampFormat::HttpDate => "HttpDate",
        }
    }
}

/// A scalar constant recorded as a member's declared default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Whether an error shape is the caller's fault or the service's.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ErrorKind {
    Client,
    Server,
}

/// Member-level HTTP binding trait as declared in the schema.
///
/// Only protocols with native HTTP bindings read these; RPC protocols
/// synthesize a uniform document binding instead (see [`bindings`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HttpBinding {
    Header(String),
    PrefixHeaders(String),
    Query(String),
    Label,
    Payload,
    StatusCode,
}

/// Traits local to one member edge.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberTraits {
    /// Required members must be set before a builder finalizes.
    #[serde(default)]
    pub required: bool,
    /// Wire name override; wins over the protocol field-name derivation.
    #[serde(default)]
    pub wire_name: Option<String>,
    /// Timestamp format override; wins over location and protocol defaults.
    #[serde(default)]
    pub timestamp_format: Option<TimestampFormat>,
    /// The member's value is an unbounded byte stream (blob targets only).
    #[serde(default)]
    pub streaming: bool,
    /// The member's value is a multiplexed event stream (union targets only).
    #[serde(default)]
    pub event_stream: bool,
    /// Redact this member's value in diagnostics.
    #[serde(default)]
    pub sensitive: bool,
    /// Declared default; serialized as-is when the value equals it.
    #[serde(default)]
    pub default_value: Option<DefaultValue>,
    /// Native HTTP binding, when the schema declares one.
    #[serde(default)]
    pub http: Option<HttpBinding>,
    /// Media type carried by a blob target bound through this member.
    #[serde(default)]
    pub media_type: Option<String>,
}

/// A named, possibly-optional edge from a container shape to a target shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub target: ShapeId,
    #[serde(default)]
    pub traits: MemberTraits,
}

impl Member {
    pub fn new<S: Into<String>, T: Into<ShapeId>>(name: S, target: T) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            traits: MemberTraits::default(),
        }
    }

    pub fn with_traits(mut self, traits: MemberTraits) -> Self {
        self.traits = traits;
        self
    }

    /// The member's name on the wire: the explicit wire-name trait wins,
    /// otherwise the declared member name is used.
    pub fn wire_name(&self) -> &str {
        self.traits.wire_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_required(&self) -> bool {
        self.traits.required
    }

    pub fn is_streaming(&self) -> bool {
        self.traits.streaming
    }

    pub fn is_event_stream(&self) -> bool {
        self.traits.event_stream
    }
}

/// Ordered named members plus error traits.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureShape {
    /// Declaration order is preserved and observable in generated code.
    pub members: Vec<Member>,
    /// Present when this structure models a service error.
    #[serde(default)]
    pub error: Option<ErrorKind>,
    /// Explicit wire error-code trait. Only some protocols honor it; the
    /// default wire code is the shape's declared name.
    #[serde(default)]
    pub wire_code: Option<String>,
}

impl StructureShape {
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members,
            error: None,
            wire_code: None,
        }
    }

    pub fn with_error(mut self, kind: ErrorKind) -> Self {
        self.error = Some(kind);
        self
    }

    pub fn with_wire_code<S: Into<String>>(mut self, code: S) -> Self {
        self.wire_code = Some(code.into());
        self
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Tagged, mutually exclusive named members.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnionShape {
    pub members: Vec<Member>,
}

impl UnionShape {
    pub fn new(members: Vec<Member>) -> Self {
        Self { members }
    }
}

/// A sequence of values of one target shape.
///
/// The element is a full [`Member`] so element-level traits (e.g. a timestamp
/// format override inside a list) have somewhere to live.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListShape {
    pub member: Member,
}

impl ListShape {
    pub fn new<T: Into<ShapeId>>(target: T) -> Self {
        Self {
            member: Member::new("member", target),
        }
    }
}

/// String-keyed values of one target shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapShape {
    pub value: Member,
}

impl MapShape {
    pub fn new<T: Into<ShapeId>>(target: T) -> Self {
        Self {
            value: Member::new("value", target),
        }
    }
}

/// A string, possibly constrained to a closed set of wire values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StringShape {
    #[serde(default)]
    pub enum_values: Vec<String>,
}

impl StringShape {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn enumerated<I: IntoIterator<Item = S>, S: Into<String>>(values: I) -> Self {
        Self {
            enum_values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_enum(&self) -> bool {
        !self.enum_values.is_empty()
    }
}

/// Method, uri template and success status of an HTTP-bound operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HttpTrait {
    pub method: String,
    pub uri: String,
    #[serde(default = "default_status")]
    pub code: u16,
}

fn default_status() -> u16 {
    200
}

impl HttpTrait {
    pub fn new<M: Into<String>, U: Into<String>>(method: M, uri: U) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            code: 200,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }
}

/// An operation: input and output structures plus declared error shapes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationShape {
    #[serde(default)]
    pub input: Option<ShapeId>,
    #[serde(default)]
    pub output: Option<ShapeId>,
    /// Declaration order drives error-discrimination dispatch order.
    #[serde(default)]
    pub errors: Vec<ShapeId>,
    #[serde(default)]
    pub http: Option<HttpTrait>,
}

/// A service: the operations reachable from it, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceShape {
    #[serde(default)]
    pub version: Option<String>,
    pub operations: Vec<ShapeId>,
}

/// A typed node in the schema graph.
///
/// The enum is closed on purpose: every consumer matches exhaustively, so
/// adding or removing a shape kind is a compile-time-checked change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Structure(StructureShape),
    Union(UnionShape),
    List(ListShape),
    Map(MapShape),
    String(StringShape),
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Blob,
    Document,
    Timestamp,
    Operation(OperationShape),
    Service(ServiceShape),
}

impl Shape {
    pub fn kind_name(&self) -> &'static str {
        use Shape::*;
        match self {
            Structure(_) => "structure",
            Union(_) => "union",
            List(_) => "list",
            Map(_) => "map",
            String(_) => "string",
            Boolean => "boolean",
            Byte => "byte",
            Short => "short",
            Integer => "integer",
            Long => "long",
            Float => "float",
            Double => "double",
            Blob => "blob",
            Document => "document",
            Timestamp => "timestamp",
            Operation(_) => "operation",
            Service(_) => "service",
        }
    }

    /// Whether values of this shape serialize as a JSON/CBOR number.
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Shape::Byte | Shape::Short | Shape::Integer | Shape::Long | Shape::Float | Shape::Double
        )
    }

    /// Whether the emitted number conversion must go through a float.
    pub fn is_float(&self) -> bool {
        matches!(self, Shape::Float | Shape::Double)
    }
}

/// The immutable shape graph.
///
/// Built once at generator start, discarded at the end of a run. Lookups
/// return [`ModelError`] for dangling references so that generation failures
/// carry the offending shape id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    shapes: BTreeMap<ShapeId, Shape>,
}

impl Schema {
    pub fn from_shapes<I>(shapes: I) -> Self
    where
        I: IntoIterator<Item = (ShapeId, Shape)>,
    {
        Self {
            shapes: shapes.into_iter().collect(),
        }
    }

    pub fn get(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    pub fn expect(&self, id: &ShapeId) -> Result<&Shape> {
        self.shapes
            .get(id)
            .ok_or_else(|| ModelError::MissingShape(id.clone()))
    }

    pub fn expect_structure(&self, id: &ShapeId) -> Result<&StructureShape> {
        match self.expect(id)? {
            Shape::Structure(s) => Ok(s),
            other => Err(ModelError::UnexpectedKind {
                id: id.clone(),
                expected: "structure",
                actual: other.kind_name(),
            }),
        }
    }

    pub fn expect_union(&self, id: &ShapeId) -> Result<&UnionShape> {
        match self.expect(id)? {
            Shape::Union(u) => Ok(u),
            other => Err(ModelError::UnexpectedKind {
                id: id.clone(),
                expected: "union",
                actual: other.kind_name(),
            }),
        }
    }

    pub fn expect_operation(&self, id: &ShapeId) -> Result<&OperationShape> {
        match self.expect(id)? {
            Shape::Operation(op) => Ok(op),
            other => Err(ModelError::UnexpectedKind {
                id: id.clone(),
                expected: "operation",
                actual: other.kind_name(),
            }),
        }
    }

    pub fn expect_service(&self, id: &ShapeId) -> Result<&ServiceShape> {
        match self.expect(id)? {
            Shape::Service(s) => Ok(s),
            other => Err(ModelError::UnexpectedKind {
                id: id.clone(),
                expected: "service",
                actual: other.kind_name(),
            }),
        }
    }

    pub fn shapes(&self) -> impl Iterator<Item = (&ShapeId, &Shape)> {
        self.shapes.iter()
    }

    /// The input structure of an operation, or an interned empty structure
    /// when the operation declares none.
    pub fn operation_input(&self, op: &OperationShape) -> Result<&StructureShape> {
        match &op.input {
            Some(id) => self.expect_structure(id),
            None => Ok(empty_structure()),
        }
    }

    /// The output structure of an operation, or an interned empty structure.
    pub fn operation_output(&self, op: &OperationShape) -> Result<&StructureShape> {
        match &op.output {
            Some(id) => self.expect_structure(id),
            None => Ok(empty_structure()),
        }
    }
}

fn empty_structure() -> &'static StructureShape {
    static EMPTY: once_cell::sync::OnceCell<StructureShape> = once_cell::sync::OnceCell::new();
    EMPTY.get_or_init(StructureShape::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_id_parts() {
        let id = ShapeId::new("example.widgets#Widget");
        assert_eq!(id.namespace(), "example.widgets");
        assert_eq!(id.name(), "Widget");

        let bare = ShapeId::new("Widget");
        assert_eq!(bare.namespace(), "");
        assert_eq!(bare.name(), "Widget");
    }

    #[test]
    fn wire_name_override_wins() {
        let plain = Member::new("created_at", ShapeId::new("wire#Timestamp"));
        assert_eq!(plain.wire_name(), "created_at");

        let renamed = plain.clone().with_traits(MemberTraits {
            wire_name: Some("CreatedAt".to_string()),
            ..MemberTraits::default()
        });
        assert_eq!(renamed.wire_name(), "CreatedAt");
    }

    #[test]
    fn lookup_errors_carry_context() {
        let schema = Schema::default();
        let id = ShapeId::new("example#Missing");
        assert_eq!(
            schema.expect(&id).unwrap_err(),
            ModelError::MissingShape(id.clone())
        );

        let schema = Schema::from_shapes(vec![(id.clone(), Shape::Blob)]);
        match schema.expect_structure(&id).unwrap_err() {
            ModelError::UnexpectedKind {
                expected, actual, ..
            } => {
                assert_eq!(expected, "structure");
                assert_eq!(actual, "blob");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn schema_round_trips_through_yaml() {
        let id = ShapeId::new("example#Widget");
        let schema = Schema::from_shapes(vec![(
            id.clone(),
            Shape::Structure(StructureShape::new(vec![Member::new(
                "name",
                ShapeId::new("wire#String"),
            )])),
        )]);
        let text = serde_yaml::to_string(&schema).unwrap();
        let parsed: Schema = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed, schema);
    }
}
