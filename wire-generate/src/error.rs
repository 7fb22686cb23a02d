// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;
use wire_schema::{ModelError, ShapeId};

/// Generation-time failures.
///
/// Every variant is local to one operation or shape: a failed generation
/// request leaves the function registry exactly as it was, so unrelated
/// operations are unaffected.
#[derive(Debug, Error)]
pub enum GenError {
    /// The schema combines shapes in a way the protocol cannot express,
    /// e.g. a document-valued payload in a protocol without document support.
    #[error("{protocol}: shape {shape}: {reason}")]
    UnsupportedShape {
        shape: ShapeId,
        protocol: &'static str,
        reason: String,
    },

    /// A leaf encoding this protocol deliberately does not implement.
    #[error("{protocol} does not support {what}")]
    NotSupported {
        what: String,
        protocol: &'static str,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("failed to write generated code: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = GenError> = std::result::Result<T, E>;

impl GenError {
    pub(crate) fn unsupported(
        protocol: &'static str,
        shape: &ShapeId,
        reason: impl Into<String>,
    ) -> Self {
        GenError::UnsupportedShape {
            shape: shape.clone(),
            protocol,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_supported(protocol: &'static str, what: impl Into<String>) -> Self {
        GenError::NotSupported {
            what: what.into(),
            protocol,
        }
    }
}
