// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-operation HTTP binding descriptors.
//!
//! Protocols with native HTTP bindings read the member traits declared in the
//! schema; RPC protocols synthesize a uniform binding (fixed method and path,
//! every member carried in the document body) instead. Either way the result
//! is computed once per operation and consumed immutably by the generation
//! algorithms.

use crate::{HttpBinding, Member, ModelError, Result, Schema, Shape, ShapeId, StructureShape};
use serde::{Deserialize, Serialize};

/// Where in an HTTP-style message a member's value is carried.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BindingLocation {
    Header(String),
    PrefixHeaders(String),
    Query(String),
    Label { greedy: bool },
    Payload,
    Document,
    StatusCode,
}

impl BindingLocation {
    /// Human-readable location name, used to tag "unhandled" parse errors in
    /// emitted code.
    pub fn describe(&self) -> String {
        match self {
            BindingLocation::Header(name) => format!("header `{}`", name),
            BindingLocation::PrefixHeaders(prefix) => format!("headers prefixed `{}`", prefix),
            BindingLocation::Query(name) => format!("query param `{}`", name),
            BindingLocation::Label { .. } => "uri label".to_string(),
            BindingLocation::Payload => "payload".to_string(),
            BindingLocation::Document => "document body".to_string(),
            BindingLocation::StatusCode => "status code".to_string(),
        }
    }
}

/// One member together with its resolved location.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpBindingDescriptor {
    pub member: Member,
    pub location: BindingLocation,
}

/// How an operation's bindings are obtained.
#[derive(Clone, Debug, PartialEq)]
pub enum BindingMode {
    /// Read the member-level HTTP traits declared in the schema.
    Http,
    /// Ignore member traits: fixed method and uri, everything in the body.
    Synthetic { method: String, uri: String },
}

/// A parsed uri template segment.
#[derive(Clone, Debug, PartialEq)]
pub enum UriSegment {
    Literal(String),
    Label { name: String, greedy: bool },
}

/// A parsed uri template, e.g. `/widgets/{id}/parts/{path+}?archived=true`.
#[derive(Clone, Debug, PartialEq)]
pub struct UriTemplate {
    raw: String,
    pub segments: Vec<UriSegment>,
    /// Static query pairs appearing after `?` in the template.
    pub query_literals: Vec<(String, Option<String>)>,
}

impl UriTemplate {
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = |reason: &str| ModelError::InvalidUriTemplate {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };
        if !uri.starts_with('/') {
            return Err(invalid("must start with `/`"));
        }
        let (path, query) = match uri.find('?') {
            Some(index) => (&uri[..index], Some(&uri[index + 1..])),
            None => (uri, None),
        };

        let mut segments = Vec::new();
        for part in path.split('/').skip(1) {
            if part.is_empty() {
                continue;
            }
            if part.starts_with('{') {
                if !part.ends_with('}') {
                    return Err(invalid("unterminated label"));
                }
                let inner = &part[1..part.len() - 1];
                let (name, greedy) = match inner.strip_suffix('+') {
                    Some(name) => (name, true),
                    None => (inner, false),
                };
                if name.is_empty() {
                    return Err(invalid("empty label"));
                }
                segments.push(UriSegment::Label {
                    name: name.to_string(),
                    greedy,
                });
            } else if part.contains('{') || part.contains('}') {
                return Err(invalid("label braces inside a literal segment"));
            } else {
                segments.push(UriSegment::Literal(part.to_string()));
            }
        }

        let mut query_literals = Vec::new();
        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                match pair.find('=') {
                    Some(index) => query_literals.push((
                        pair[..index].to_string(),
                        Some(pair[index + 1..].to_string()),
                    )),
                    None => query_literals.push((pair.to_string(), None)),
                }
            }
        }

        Ok(Self {
            raw: uri.to_string(),
            segments,
            query_literals,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, bool)> {
        self.segments.iter().filter_map(|segment| match segment {
            UriSegment::Label { name, greedy } => Some((name.as_str(), *greedy)),
            UriSegment::Literal(_) => None,
        })
    }
}

/// The binding descriptors of one message (input, output or error shape).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageBindings {
    pub shape: Option<ShapeId>,
    /// Declaration order of the underlying members is preserved.
    pub bindings: Vec<HttpBindingDescriptor>,
}

impl MessageBindings {
    pub fn document_members(&self) -> impl Iterator<Item = &HttpBindingDescriptor> {
        self.bindings
            .iter()
            .filter(|b| b.location == BindingLocation::Document)
    }

    pub fn payload(&self) -> Option<&HttpBindingDescriptor> {
        self.bindings
            .iter()
            .find(|b| b.location == BindingLocation::Payload)
    }

    pub fn headers(&self) -> impl Iterator<Item = &HttpBindingDescriptor> {
        self.bindings
            .iter()
            .filter(|b| matches!(b.location, BindingLocation::Header(_)))
    }

    pub fn prefix_headers(&self) -> impl Iterator<Item = &HttpBindingDescriptor> {
        self.bindings
            .iter()
            .filter(|b| matches!(b.location, BindingLocation::PrefixHeaders(_)))
    }

    pub fn queries(&self) -> impl Iterator<Item = &HttpBindingDescriptor> {
        self.bindings
            .iter()
            .filter(|b| matches!(b.location, BindingLocation::Query(_)))
    }

    pub fn labels(&self) -> impl Iterator<Item = &HttpBindingDescriptor> {
        self.bindings
            .iter()
            .filter(|b| matches!(b.location, BindingLocation::Label { .. }))
    }

    pub fn status_code(&self) -> Option<&HttpBindingDescriptor> {
        self.bindings
            .iter()
            .find(|b| b.location == BindingLocation::StatusCode)
    }

    /// Whether any member is carried in the message body.
    pub fn has_body(&self) -> bool {
        self.payload().is_some() || self.document_members().next().is_some()
    }
}

/// Everything the generation algorithms need to know about one operation's
/// transport shape.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationBindings {
    pub operation: ShapeId,
    pub method: String,
    pub uri: UriTemplate,
    pub status: u16,
    pub input: MessageBindings,
    pub output: MessageBindings,
    /// One entry per declared error shape, in declaration order.
    pub errors: Vec<MessageBindings>,
}

#[derive(Clone, Copy, PartialEq)]
enum Direction {
    Request,
    Response,
}

/// Resolve the binding descriptors of one operation.
pub fn resolve_operation(
    schema: &Schema,
    id: &ShapeId,
    mode: &BindingMode,
) -> Result<OperationBindings> {
    let operation = schema.expect_operation(id)?;
    let (method, uri, status) = match mode {
        BindingMode::Http => {
            let http = operation
                .http
                .as_ref()
                .ok_or_else(|| ModelError::MissingHttpTrait(id.clone()))?;
            (
                http.method.clone(),
                UriTemplate::parse(&http.uri)?,
                http.code,
            )
        }
        BindingMode::Synthetic { method, uri } => {
            (method.clone(), UriTemplate::parse(uri)?, 200)
        }
    };

    let input = resolve_message(
        schema,
        operation.input.as_ref(),
        schema.operation_input(operation)?,
        Direction::Request,
        mode,
    )?;
    check_labels(id, &uri, &input)?;

    let output = resolve_message(
        schema,
        operation.output.as_ref(),
        schema.operation_output(operation)?,
        Direction::Response,
        mode,
    )?;

    let mut errors = Vec::with_capacity(operation.errors.len());
    for error_id in &operation.errors {
        let structure = schema.expect_structure(error_id)?;
        if !structure.is_error() {
            return Err(ModelError::InvalidBinding {
                shape: error_id.clone(),
                member: String::new(),
                reason: "declared as an operation error but carries no error trait".to_string(),
            });
        }
        errors.push(resolve_message(
            schema,
            Some(error_id),
            structure,
            Direction::Response,
            mode,
        )?);
    }

    Ok(OperationBindings {
        operation: id.clone(),
        method,
        uri,
        status,
        input,
        output,
        errors,
    })
}

fn resolve_message(
    schema: &Schema,
    shape: Option<&ShapeId>,
    structure: &StructureShape,
    direction: Direction,
    mode: &BindingMode,
) -> Result<MessageBindings> {
    let mut bindings = Vec::with_capacity(structure.members.len());
    for member in &structure.members {
        let location = resolve_member(schema, shape, member, direction, mode)?;
        bindings.push(HttpBindingDescriptor {
            member: member.clone(),
            location,
        });
    }

    let message = MessageBindings {
        shape: shape.cloned(),
        bindings,
    };

    if let Some(payload) = message.payload() {
        // Document members may coexist with an event-stream payload: they are
        // the out-of-band fields of the initial frame.
        let stream_payload =
            payload.member.is_streaming() || payload.member.is_event_stream();
        if !stream_payload {
            if let Some(other) = message.document_members().next() {
                return Err(ModelError::InvalidBinding {
                    shape: shape.cloned().unwrap_or_else(|| ShapeId::new("")),
                    member: payload.member.name.clone(),
                    reason: format!(
                        "payload binding conflicts with document-bound member {:?}",
                        other.member.name
                    ),
                });
            }
        }
        if message
            .bindings
            .iter()
            .filter(|b| b.location == BindingLocation::Payload)
            .count()
            > 1
        {
            return Err(ModelError::InvalidBinding {
                shape: shape.cloned().unwrap_or_else(|| ShapeId::new("")),
                member: payload.member.name.clone(),
                reason: "more than one member is bound to the payload".to_string(),
            });
        }
    }
    Ok(message)
}

fn resolve_member(
    schema: &Schema,
    shape: Option<&ShapeId>,
    member: &Member,
    direction: Direction,
    mode: &BindingMode,
) -> Result<BindingLocation> {
    let invalid = |reason: String| ModelError::InvalidBinding {
        shape: shape.cloned().unwrap_or_else(|| ShapeId::new("")),
        member: member.name.clone(),
        reason,
    };

    // Streaming members always travel as the payload, even under a synthetic
    // binding: there is no way to carry an unbounded stream inside a document.
    if member.is_streaming() || member.is_event_stream() {
        return Ok(BindingLocation::Payload);
    }

    if let BindingMode::Synthetic { .. } = mode {
        return Ok(BindingLocation::Document);
    }

    match &member.traits.http {
        None => Ok(BindingLocation::Document),
        Some(HttpBinding::Header(name)) => Ok(BindingLocation::Header(name.clone())),
        Some(HttpBinding::PrefixHeaders(prefix)) => {
            match schema.expect(&member.target)? {
                Shape::Map(_) => Ok(BindingLocation::PrefixHeaders(prefix.clone())),
                other => Err(invalid(format!(
                    "prefix-headers binding requires a map target, found {}",
                    other.kind_name()
                ))),
            }
        }
        Some(HttpBinding::Query(name)) => match direction {
            Direction::Request => Ok(BindingLocation::Query(name.clone())),
            Direction::Response => Err(invalid("query binding on a response member".to_string())),
        },
        Some(HttpBinding::Label) => match direction {
            Direction::Request => Ok(BindingLocation::Label { greedy: false }),
            Direction::Response => Err(invalid("label binding on a response member".to_string())),
        },
        Some(HttpBinding::Payload) => Ok(BindingLocation::Payload),
        Some(HttpBinding::StatusCode) => match direction {
            Direction::Request => {
                Err(invalid("status-code binding on a request member".to_string()))
            }
            Direction::Response => Ok(BindingLocation::StatusCode),
        },
    }
}

fn check_labels(op: &ShapeId, uri: &UriTemplate, input: &MessageBindings) -> Result<()> {
    for (label, greedy) in uri.labels() {
        let found = input
            .labels()
            .any(|descriptor| descriptor.member.name == label);
        if !found {
            return Err(ModelError::UnboundLabel {
                uri: uri.as_str().to_string(),
                label: label.to_string(),
                shape: op.clone(),
            });
        }
        // Greediness lives in the template; record it on the descriptor side
        // only through the template, which generated code walks directly.
        let _ = greedy;
    }
    for descriptor in input.labels() {
        let in_template = uri
            .labels()
            .any(|(name, _)| name == descriptor.member.name);
        if !in_template {
            return Err(ModelError::InvalidBinding {
                shape: op.clone(),
                member: descriptor.member.name.clone(),
                reason: "label-bound member missing from the uri template".to_string(),
            });
        }
    }
    Ok(())
}

/// Content type of the request body, `None` when there is no body.
pub fn request_content_type(
    schema: &Schema,
    bindings: &OperationBindings,
    default: &str,
) -> Result<Option<String>> {
    match bindings.input.payload() {
        Some(descriptor) => payload_content_type(schema, descriptor, default, false),
        None => {
            if bindings.input.document_members().next().is_some() {
                Ok(Some(default.to_string()))
            } else {
                Ok(None)
            }
        }
    }
}

/// Content type of the success response body, `None` when there is no body.
pub fn response_content_type(
    schema: &Schema,
    bindings: &OperationBindings,
    default: &str,
) -> Result<Option<String>> {
    match bindings.output.payload() {
        Some(descriptor) => payload_content_type(schema, descriptor, default, true),
        None => {
            if bindings.output.document_members().next().is_some() {
                Ok(Some(default.to_string()))
            } else {
                Ok(None)
            }
        }
    }
}

fn payload_content_type(
    schema: &Schema,
    descriptor: &HttpBindingDescriptor,
    default: &str,
    response: bool,
) -> Result<Option<String>> {
    if let Some(media_type) = &descriptor.member.traits.media_type {
        return Ok(Some(media_type.clone()));
    }
    let content_type = match schema.expect(&descriptor.member.target)? {
        Shape::Blob => {
            // A response payload targeting a plain, non-streaming blob keeps
            // the protocol's default content type. Known schema inconsistency;
            // requests are unaffected.
            if response && !descriptor.member.is_streaming() {
                default.to_string()
            } else {
                "application/octet-stream".to_string()
            }
        }
        Shape::String(_) => "text/plain".to_string(),
        Shape::Union(_) if descriptor.member.is_event_stream() => {
            "application/vnd.wire.eventstream".to_string()
        }
        _ => default.to_string(),
    };
    Ok(Some(content_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_template_parsing() {
        let uri = UriTemplate::parse("/widgets/{id}/parts/{path+}?archived=true&flat").unwrap();
        assert_eq!(
            uri.segments,
            vec![
                UriSegment::Literal("widgets".to_string()),
                UriSegment::Label {
                    name: "id".to_string(),
                    greedy: false
                },
                UriSegment::Literal("parts".to_string()),
                UriSegment::Label {
                    name: "path".to_string(),
                    greedy: true
                },
            ]
        );
        assert_eq!(
            uri.query_literals,
            vec![
                ("archived".to_string(), Some("true".to_string())),
                ("flat".to_string(), None),
            ]
        );

        assert!(UriTemplate::parse("widgets").is_err());
        assert!(UriTemplate::parse("/widgets/{id").is_err());
        assert!(UriTemplate::parse("/widgets/{}").is_err());
    }
}
