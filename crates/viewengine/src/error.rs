// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for the view engine.
//!
//! This module defines [`ViewError`], the single error enum returned by every
//! fallible operation, and [`SourceContext`] for rich parse error messages.
//!
//! # Error Categories
//!
//! - **Parse errors**: malformed template source, registration aborted
//! - **Definition errors**: duplicate or reserved names at registration
//! - **Loading errors**: file and glob access failures
//! - **Lookup errors**: rendering a name nothing registered
//! - **Composition errors**: a page chain that cannot be spliced together
//! - **Runtime errors**: failures while executing against the supplied data

use std::fmt;
use thiserror::Error;

/// The lines around a parse error, with the failing column marked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    /// Line of the error (1-indexed).
    pub line: usize,
    /// Column of the error (1-indexed).
    pub column: usize,
    /// Numbered source lines, at most two either side of `line`.
    pub excerpt: Vec<(usize, String)>,
}

impl SourceContext {
    /// Cuts the excerpt for `line` out of `source`.
    pub fn from_source(source: &str, line: usize, column: usize) -> Self {
        let first = line.saturating_sub(2).max(1);
        let excerpt = source
            .lines()
            .enumerate()
            .map(|(index, text)| (index + 1, text.to_string()))
            .skip_while(|(number, _)| *number < first)
            .take_while(|(number, _)| *number <= line + 2)
            .collect();

        Self { line, column, excerpt }
    }

    /// Renders the excerpt, with a caret row under the error line.
    ///
    /// ```text
    ///    1 | <html>
    ///    2 |   {{if}}
    ///      |       ^
    /// ```
    pub fn format_snippet(&self) -> String {
        let mut result = String::new();
        for (number, text) in &self.excerpt {
            result.push_str(&format!("{:4} | {}\n", number, text));
            if *number == self.line {
                let pad = " ".repeat(self.column.saturating_sub(1));
                result.push_str(&format!("     | {}^\n", pad));
            }
        }
        result
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_snippet())
    }
}

fn snippet_suffix(context: &Option<SourceContext>) -> String {
    context
        .as_ref()
        .map(|context| format!("\n{}", context))
        .unwrap_or_default()
}

/// The main error type for view engine operations.
#[derive(Error, Debug)]
pub enum ViewError {
    /// Template source is malformed. Nothing from the source unit was registered.
    #[error("parse error in {file:?}: {message} at line {line}, column {column}{}", snippet_suffix(.source_context))]
    Parse {
        /// Description of the parse error.
        message: String,
        /// Line number where the error occurred.
        line: usize,
        /// Column number where the error occurred.
        column: usize,
        /// The registration name of the source unit, if known.
        file: Option<String>,
        /// Source context for rich error display.
        source_context: Option<SourceContext>,
    },

    /// A page or tree name is already registered.
    #[error("redefinition of template {0:?}")]
    DuplicateDefinition(String),

    /// A registration name uses the prefix reserved for the engine.
    #[error("template name {0:?} is reserved")]
    ReservedName(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The glob pattern itself is malformed.
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// A path matched by a glob could not be read.
    #[error("glob error: {0}")]
    Glob(#[from] glob::GlobError),

    /// `register_files` was called without any file names.
    #[error("no files named in call to register_files")]
    NoFiles,

    /// A glob pattern matched no files.
    #[error("pattern matches no files: `{0}`")]
    NoMatch(String),

    /// Render requested for a name that is neither a page nor a partial.
    #[error("template {0:?} not found")]
    NotFound(String),

    /// The page chain for a render could not be composed.
    #[error("cannot compose page {page:?}: {message}")]
    Composition {
        /// The page being rendered.
        page: String,
        /// What went wrong.
        message: String,
    },

    /// Execution failed against the supplied data.
    #[error("template {template:?}: {message}")]
    Runtime {
        /// The tree executing when the error occurred.
        template: String,
        /// Error message.
        message: String,
    },
}

impl ViewError {
    /// Builds a runtime error for the named tree.
    pub(crate) fn runtime(template: &str, message: impl Into<String>) -> Self {
        ViewError::Runtime {
            template: template.to_string(),
            message: message.into(),
        }
    }

    /// Builds a composition error for the named page.
    pub(crate) fn composition(page: &str, message: impl Into<String>) -> Self {
        ViewError::Composition {
            page: page.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results with [`ViewError`].
pub type Result<T> = std::result::Result<T, ViewError>;
