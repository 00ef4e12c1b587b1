// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! viewengine project configuration.
//!
//! Configuration is loaded from `viewengine.toml` at the project root.
//!
//! # Example Configuration
//!
//! ```toml
//! [views]
//! root = "views"
//! patterns = ["**/*.gohtml"]
//!
//! [render]
//! escape_html = true
//! missing_key = "error"
//! max_depth = 32
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;
use viewengine::EngineConfig;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "viewengine.toml";

/// Main configuration structure loaded from `viewengine.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Where views are loaded from.
    #[serde(default)]
    pub views: ViewsConfig,
    /// Engine settings used for every render.
    #[serde(default)]
    pub render: EngineConfig,
}

/// View loading configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewsConfig {
    /// Directory the view names are relative to (default: "views").
    #[serde(default = "default_root")]
    pub root: String,

    /// Glob patterns under `root` (default: `["**/*.gohtml"]`).
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
}

fn default_root() -> String {
    "views".to_string()
}

fn default_patterns() -> Vec<String> {
    vec!["**/*.gohtml".to_string()]
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            patterns: default_patterns(),
        }
    }
}

impl ViewsConfig {
    /// Replaces the root and patterns with command-line values, when given.
    pub fn apply_overrides(&mut self, root: Option<String>, patterns: Vec<String>) {
        if let Some(root) = root {
            self.root = root;
        }
        if !patterns.is_empty() {
            self.patterns = patterns;
        }
    }
}

impl Config {
    /// Loads configuration from `viewengine.toml` in the current directory.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Loads configuration from `path`.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|err| anyhow::anyhow!("invalid {}: {}", path.display(), err))?;
        Ok(config)
    }
}
