// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Engine configuration.
//!
//! [`EngineConfig`] deserializes from any serde format. The CLI reads it from
//! the `[render]` table of `viewengine.toml`:
//!
//! ```toml
//! [render]
//! escape_html = true
//! missing_key = "error"
//! max_depth = 32
//! ```

use serde::Deserialize;

/// What a field lookup on a missing object key produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingKey {
    /// The lookup yields null, which prints as nothing.
    #[default]
    Default,
    /// The lookup fails the render with a runtime error.
    Error,
}

/// Runtime behaviour shared by every render of one engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// HTML-escape interpolated values (default: true).
    #[serde(default = "default_escape_html")]
    pub escape_html: bool,

    /// Missing-key policy for field lookups.
    #[serde(default)]
    pub missing_key: MissingKey,

    /// Maximum nesting of template invocations (default: 64).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_escape_html() -> bool {
    true
}

fn default_max_depth() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            escape_html: default_escape_html(),
            missing_key: MissingKey::default(),
            max_depth: default_max_depth(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable HTML escaping of interpolations
    pub fn with_escape_html(mut self, escape_html: bool) -> Self {
        self.escape_html = escape_html;
        self
    }

    /// Set the missing-key policy
    pub fn with_missing_key(mut self, missing_key: MissingKey) -> Self {
        self.missing_key = missing_key;
        self
    }

    /// Set the maximum invocation depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
