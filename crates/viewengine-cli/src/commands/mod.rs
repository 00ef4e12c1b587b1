// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI command implementations.
//!
//! - `render`: Render one page or partial to stdout
//! - `list`: List registered pages and partials

use crate::config::Config;
use viewengine::ViewEngine;

/// Template listing command.
pub mod list;
/// Single template render command.
pub mod render;

/// Builds an engine from the configured view root and patterns.
pub fn load_engine(config: &Config) -> anyhow::Result<ViewEngine> {
    let engine = ViewEngine::with_config(config.render.clone());
    for pattern in &config.views.patterns {
        engine
            .register_glob(&config.views.root, pattern)
            .map_err(|err| anyhow::anyhow!("loading views from {}: {}", config.views.root, err))?;
    }
    tracing::info!(
        root = %config.views.root,
        pages = engine.page_names().len(),
        partials = engine.partial_names().len(),
        "views loaded"
    );
    Ok(engine)
}
