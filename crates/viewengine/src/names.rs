// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Naming conventions shared by the classifier, rewriter and composer.
//!
//! - A tree whose name starts with [`CONTENT_SECTION_PREFIX`] is a content section.
//! - Names starting with [`RESERVED_PREFIX`] belong to the engine: scoped section
//!   names and the render root [`ROOT_NAME`]. Source text can never declare them.

use std::fmt;

/// Marks a tree as a content section, e.g. `{{define "__body"}}`.
pub const CONTENT_SECTION_PREFIX: &str = "__";

/// Marks an engine-internal composition name.
pub const RESERVED_PREFIX: char = '~';

/// The name the requested page's top-level tree is re-keyed to at render time.
pub const ROOT_NAME: &str = "~page";

/// Returns true when `name` carries the content-section marker.
pub fn is_content_section(name: &str) -> bool {
    name.starts_with(CONTENT_SECTION_PREFIX)
}

/// Returns true when `name` is reserved for the engine.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Strips a single leading path separator from a registration or render name.
///
/// `"/home.gohtml"` and `"home.gohtml"` name the same template.
pub fn normalize_name(name: &str) -> &str {
    name.strip_prefix('/')
        .or_else(|| name.strip_prefix('\\'))
        .unwrap_or(name)
}

/// A render-unique prefix applied to content-section names.
///
/// Derived from the identity of the page that defines the sections, so two
/// levels of one master chain never scope a section onto the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeToken(String);

impl ScopeToken {
    /// Creates the token for sections defined by `page`.
    pub fn for_page(page: &str) -> Self {
        Self(format!("{}{}/", RESERVED_PREFIX, page))
    }

    /// Returns `self + name`.
    pub fn scope(&self, name: &str) -> String {
        format!("{}{}", self.0, name)
    }

    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
