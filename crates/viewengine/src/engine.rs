// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The view engine.
//!
//! This module provides [`ViewEngine`], which owns the partial registry and
//! the page store and exposes registration and rendering.
//!
//! # Quick Start
//!
//! ```rust
//! use viewengine::ViewEngine;
//! use serde_json::json;
//!
//! let engine = ViewEngine::new();
//! engine
//!     .register("master", "<main>{{template \"__body\" .}}</main>")?
//!     .register("home", "{{define \"__body\"}}Hello, {{.name}}!{{end}}{{template \"master\" .}}")?;
//!
//! let html = engine.render_to_string("home", &json!({ "name": "World" }))?;
//! assert_eq!(html, "<main>Hello, World!</main>");
//! # Ok::<(), viewengine::ViewError>(())
//! ```
//!
//! # Thread Safety
//!
//! Both stores sit behind one `Mutex`. Registration holds it for the whole
//! duplicate-check-and-insert. Rendering holds it only while it snapshots the
//! page chain and the registry pointer, so renders never wait on each other.

use crate::compose::RenderPlan;
use crate::config::EngineConfig;
use crate::error::{Result, ViewError};
use crate::loader;
use crate::names::{is_reserved, normalize_name};
use crate::parser::parse;
use crate::registry::Stores;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Master-page view engine.
///
/// Source units that define a content section (`{{define "__name"}}`) are
/// pages; everything else is split into partial trees shared by every render.
#[derive(Debug, Default)]
pub struct ViewEngine {
    stores: Mutex<Stores>,
    config: EngineConfig,
}

impl ViewEngine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            stores: Mutex::default(),
            config,
        }
    }

    /// The configuration used for every render.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // Admission never leaves the stores half-written, so a poisoned lock
    // still guards consistent data.
    fn stores(&self) -> MutexGuard<'_, Stores> {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parses `source` and registers it under `name`.
    ///
    /// A single leading `/` or `\` is stripped from `name`.
    ///
    /// # Errors
    ///
    /// - [`ViewError::ReservedName`] when `name` starts with `~`
    /// - [`ViewError::DuplicateDefinition`] when `name`, or a partial tree
    ///   the source defines, is already registered
    /// - [`ViewError::Parse`] for malformed source
    ///
    /// On error nothing from `source` is registered.
    pub fn register(&self, name: &str, source: &str) -> Result<&Self> {
        let name = normalize_name(name);
        if is_reserved(name) {
            return Err(ViewError::ReservedName(name.to_string()));
        }

        let mut stores = self.stores();
        if stores.is_defined(name) {
            return Err(ViewError::DuplicateDefinition(name.to_string()));
        }
        let forest = parse(name, source)?;
        stores.admit(name, forest)?;
        Ok(self)
    }

    /// Reads and registers each file, relative to `root`, in order.
    ///
    /// Each file is registered under its relative name. Every file is read
    /// before any is registered, so an unreadable file registers nothing. A
    /// registration error stops the loop; files registered before it stay
    /// registered.
    ///
    /// # Errors
    ///
    /// [`ViewError::NoFiles`] when `names` is empty, [`ViewError::Io`] for an
    /// unreadable file, and any error of [`ViewEngine::register`].
    pub fn register_files<S>(&self, root: impl AsRef<Path>, names: &[S]) -> Result<&Self>
    where
        S: AsRef<str>,
    {
        if names.is_empty() {
            return Err(ViewError::NoFiles);
        }
        let root = root.as_ref();
        let sources = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                loader::read_source(root, normalize_name(name)).map(|source| (name, source))
            })
            .collect::<Result<Vec<_>>>()?;
        for (name, source) in &sources {
            self.register(name, source)?;
        }
        Ok(self)
    }

    /// Registers every file under `root` matching `pattern`.
    ///
    /// # Errors
    ///
    /// [`ViewError::NoMatch`] when nothing matches, and any error of
    /// [`ViewEngine::register_files`].
    pub fn register_glob(&self, root: impl AsRef<Path>, pattern: &str) -> Result<&Self> {
        let root = root.as_ref();
        let names = loader::expand_glob(root, pattern)?;
        self.register_files(root, &names)
    }

    /// Renders `name` into `out` with `data` bound as dot.
    ///
    /// # Errors
    ///
    /// - [`ViewError::NotFound`] when `name` is not registered; nothing is written
    /// - [`ViewError::Composition`] when the page chain cannot be composed;
    ///   nothing is written
    /// - [`ViewError::Runtime`] and [`ViewError::Io`] during execution; output
    ///   written before the failure stays in `out`
    pub fn render(&self, out: &mut dyn Write, name: &str, data: &Value) -> Result<()> {
        let name = normalize_name(name);
        let plan = {
            let stores = self.stores();
            RenderPlan::prepare(&stores, name)?
        };
        plan.execute(name, &self.config, out, data)
    }

    /// Renders `name` into a new string.
    pub fn render_to_string(&self, name: &str, data: &Value) -> Result<String> {
        let mut out = Vec::new();
        self.render(&mut out, name, data)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Returns true when `name` is a registered page.
    pub fn is_page(&self, name: &str) -> bool {
        self.stores().pages().contains(normalize_name(name))
    }

    /// Returns true when `name` is a registered partial tree.
    pub fn is_partial(&self, name: &str) -> bool {
        self.stores().partials().contains(normalize_name(name))
    }

    /// Sorted names of every registered page.
    pub fn page_names(&self) -> Vec<String> {
        self.stores().pages().names()
    }

    /// Sorted names of every registered partial tree.
    pub fn partial_names(&self) -> Vec<String> {
        self.stores().partials().names()
    }
}
