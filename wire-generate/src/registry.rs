// Copyright (c) Facebook, Inc. and its affiliates
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The deduplicating registry of generated helper functions.
//!
//! Every generated function is identified by a [`FunctionKey`] `(module,
//! name)`. The first caller interning a key executes its generator closure to
//! materialize the body exactly once; every caller receives a
//! [`FunctionHandle`] usable as a call target in emitted code. The registry
//! grows monotonically during a run and is flushed once at the end.

use crate::error::Result;
use crate::GeneratorConfig;
use once_cell::sync::OnceCell;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// The unit of memoization: two generation requests that would produce
/// byte-identical code resolve to the same key.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FunctionKey {
    pub module: String,
    pub name: String,
}

/// A materialized function body, immutable once produced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneratedFunction {
    pub key: FunctionKey,
    pub body: String,
}

/// A reference to a generated function, usable as a call target.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FunctionHandle {
    key: FunctionKey,
}

impl FunctionHandle {
    pub fn module(&self) -> &str {
        &self.key.module
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }
}

impl fmt::Display for FunctionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crate::{}::{}", self.key.module, self.key.name)
    }
}

thread_local! {
    // Keys whose generator closure is currently running on this thread, per
    // registry instance. Shape graphs may be cyclic through optional members;
    // a recursive request for an in-flight key returns its handle right away
    // (the name is deterministic) and lets the outer frame finish the body.
    static IN_PROGRESS: RefCell<HashSet<(usize, FunctionKey)>> = RefCell::new(HashSet::new());
}

/// The function registry. Interning is atomic with respect to key
/// presence-check-and-insert, so generation for independent operations may be
/// driven concurrently; concurrent callers of one key block until its single
/// body exists.
#[derive(Default)]
pub struct FunctionRegistry {
    slots: Mutex<BTreeMap<FunctionKey, Arc<OnceCell<Arc<GeneratedFunction>>>>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `(module, name)`, materializing the body with `generator` if no
    /// caller did before. The closure receives the function's own handle so
    /// recursive shapes can emit self-referencing calls.
    ///
    /// A failing closure leaves the slot empty: generation-time errors stay
    /// local to the requesting operation and do not poison the key.
    pub fn intern<F>(&self, module: &str, name: &str, generator: F) -> Result<FunctionHandle>
    where
        F: FnOnce(&FunctionHandle) -> Result<String>,
    {
        let key = FunctionKey {
            module: module.to_string(),
            name: name.to_string(),
        };
        let handle = FunctionHandle { key: key.clone() };
        let registry_id = self as *const Self as usize;
        let tag = (registry_id, key.clone());

        let reentrant = IN_PROGRESS.with(|set| set.borrow().contains(&tag));
        if reentrant {
            return Ok(handle);
        }

        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        if slot.get().is_some() {
            return Ok(handle);
        }

        IN_PROGRESS.with(|set| set.borrow_mut().insert(tag.clone()));
        let outcome = slot.get_or_try_init(|| {
            generator(&handle).map(|body| Arc::new(GeneratedFunction { key: key.clone(), body }))
        });
        IN_PROGRESS.with(|set| set.borrow_mut().remove(&tag));
        outcome.map(|_| handle)
    }

    /// Number of materialized bodies.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush the registry, grouping bodies by module. Keys are emitted in
    /// sorted order so repeated runs produce identical output.
    pub fn into_modules(self) -> GeneratedModules {
        let slots = self
            .slots
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let mut modules: BTreeMap<String, Vec<Arc<GeneratedFunction>>> = BTreeMap::new();
        for (key, slot) in slots {
            if let Some(function) = slot.get() {
                modules.entry(key.module).or_default().push(function.clone());
            }
        }
        GeneratedModules { modules }
    }
}

/// The flushed output of one generation run: function bodies grouped into
/// named logical modules. File placement is the output writer's concern.
#[derive(Clone, Debug, Default)]
pub struct GeneratedModules {
    modules: BTreeMap<String, Vec<Arc<GeneratedFunction>>>,
}

impl GeneratedModules {
    pub fn modules(&self) -> impl Iterator<Item = (&str, &[Arc<GeneratedFunction>])> {
        self.modules
            .iter()
            .map(|(name, functions)| (name.as_str(), functions.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Source text of one module, without the `pub mod` wrapper.
    pub fn module_source(&self, module: &str) -> Option<String> {
        self.modules.get(module).map(|functions| {
            let mut source = String::new();
            for function in functions {
                source.push_str(&function.body);
                source.push('\n');
            }
            source
        })
    }

    /// Render every module as a `pub mod` block.
    pub fn render(&self, out: &mut dyn Write) -> std::io::Result<()> {
        self.render_with_config(out, None)
    }

    /// Render with per-function doc comments taken from the config.
    pub fn render_with_config(
        &self,
        out: &mut dyn Write,
        config: Option<&GeneratorConfig>,
    ) -> std::io::Result<()> {
        let mut out = crate::indent::IndentedWriter::new(out);
        for (module, functions) in &self.modules {
            writeln!(out, "pub mod {} {{", module)?;
            out.indent();
            for function in functions {
                if let Some(config) = config {
                    let key = (module.clone(), function.key.name.clone());
                    if let Some(doc) = config.comments.get(&key) {
                        write!(out, "{}", textwrap::indent(doc, "/// "))?;
                    }
                }
                write!(out, "{}", function.body)?;
                writeln!(out)?;
            }
            out.unindent();
            writeln!(out, "}}\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenError;

    fn body(text: &str) -> String {
        format!("pub fn f() {{ /* {} */ }}\n", text)
    }

    #[test]
    fn intern_runs_the_closure_once() {
        let registry = FunctionRegistry::new();
        let first = registry
            .intern("json_ser", "ser_widget", |_| Ok(body("one")))
            .unwrap();
        let second = registry
            .intern("json_ser", "ser_widget", |_| {
                panic!("second closure must not run")
            })
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);

        let modules = registry.into_modules();
        assert!(modules
            .module_source("json_ser")
            .unwrap()
            .contains("/* one */"));
    }

    #[test]
    fn failed_closures_are_not_cached() {
        let registry = FunctionRegistry::new();
        let err = registry.intern("json_ser", "ser_widget", |_| {
            Err(GenError::not_supported("test", "anything"))
        });
        assert!(err.is_err());
        assert_eq!(registry.len(), 0);

        registry
            .intern("json_ser", "ser_widget", |_| Ok(body("retry")))
            .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn recursive_interning_returns_the_handle() {
        let registry = FunctionRegistry::new();
        registry
            .intern("json_ser", "ser_node", |handle| {
                // A self-referencing shape generates a call to itself.
                let inner = registry
                    .intern("json_ser", "ser_node", |_| {
                        panic!("reentrant closure must not run")
                    })
                    .unwrap();
                Ok(format!("pub fn {}() {{ {}(); }}\n", handle.name(), inner))
            })
            .unwrap();
        assert_eq!(registry.len(), 1);
        let source = registry.into_modules().module_source("json_ser").unwrap();
        assert!(source.contains("crate::json_ser::ser_node();"));
    }

    #[test]
    fn concurrent_callers_share_one_body() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let registry = Arc::new(FunctionRegistry::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let runs = runs.clone();
            handles.push(std::thread::spawn(move || {
                registry
                    .intern("json_ser", "ser_widget", |_| {
                        runs.fetch_add(1, Ordering::SeqCst);
                        Ok(body("shared"))
                    })
                    .unwrap()
            }));
        }
        let resolved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(resolved.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let registry = Arc::try_unwrap(registry).ok().unwrap();
        assert_eq!(registry.len(), 1);
    }
}
