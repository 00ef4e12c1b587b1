// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]
#![allow(clippy::result_large_err)]

//! # viewengine
//!
//! Master-page composition for Go-style HTML templates.
//!
//! Source units are parsed into forests of named trees. A unit that defines a
//! content section (`{{define "__body"}}`) is a *page*; any other unit is a
//! *partial* and its trees join a shared registry of layouts and snippets. At
//! render time a page's sections are spliced into its chain of masters inside a
//! namespace private to that render, so pages can reuse section names freely.
//!
//! ## Features
//!
//! - Go template syntax: `if`, `range`, `with`, pipelines and built-in functions
//! - Nested master pages, each level scoped by its own page name
//! - Optional sections via `{{optional "__sidebar"}}`
//! - HTML escaping of interpolations by default
//! - File and glob registration
//!
//! ## Quick Start
//!
//! ```rust
//! use viewengine::ViewEngine;
//! use serde_json::json;
//!
//! let engine = ViewEngine::new();
//! engine.register("layout", "<x>{{template \"__body\"}}</x>")?;
//! engine.register("page", "{{define \"__body\"}}hi{{end}}{{template \"layout\"}}")?;
//!
//! assert_eq!(engine.render_to_string("page", &json!(null))?, "<x>hi</x>");
//! # Ok::<(), viewengine::ViewError>(())
//! ```

/// Abstract Syntax Tree types for templates.
pub mod ast;
/// Page/partial classification.
pub mod classify;
/// Render-time composition of page chains.
pub mod compose;
/// Engine configuration.
pub mod config;
/// The view engine.
pub mod engine;
/// Error types and reporting.
pub mod error;
/// Template execution.
pub mod exec;
/// Built-in template functions.
pub mod funcs;
/// File and glob loading.
pub mod loader;
/// Section and reserved name conventions.
pub mod names;
/// Template parser.
pub mod parser;
/// Partial registry and page store.
pub mod registry;
/// Content-section name rewriting.
pub mod rewrite;

pub use ast::{Forest, Node, TemplateTree};
pub use classify::{classify, Classification};
pub use config::{EngineConfig, MissingKey};
pub use engine::ViewEngine;
pub use error::{Result, SourceContext, ViewError};
pub use names::{normalize_name, ScopeToken};
pub use parser::parse;
pub use rewrite::rewrite_tree;

#[cfg(test)]
mod tests;
