// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

/// Code generation options shared by all protocols.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub(crate) module_name: String,
    pub(crate) runtime_crate: String,
    pub(crate) comments: DocComments,
}

/// Documentation to be attached to particular generated functions, keyed by
/// `(module, function name)`.
pub type DocComments = BTreeMap<(String, String), String>;

impl GeneratorConfig {
    /// Default config for the given module name.
    pub fn new(module_name: String) -> Self {
        Self {
            module_name,
            runtime_crate: "wire_rt".to_string(),
            comments: BTreeMap::new(),
        }
    }

    /// Path of the runtime support crate referenced by emitted code.
    pub fn with_runtime_crate(mut self, runtime_crate: String) -> Self {
        self.runtime_crate = runtime_crate;
        self
    }

    /// Comments attached to particular generated functions.
    pub fn with_comments(mut self, comments: DocComments) -> Self {
        self.comments = comments;
        self
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn runtime_crate(&self) -> &str {
        &self.runtime_crate
    }
}

/// How to copy generated source code into a target crate.
pub trait SourceInstaller {
    type Error;

    /// Write the generated modules for one service.
    fn install_service(
        &self,
        config: &GeneratorConfig,
        generated: &crate::protocol::GeneratedService,
    ) -> std::result::Result<(), Self::Error>;
}
