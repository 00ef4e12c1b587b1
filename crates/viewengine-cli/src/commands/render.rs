// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Render command: renders one view against JSON data.

use crate::commands::load_engine;
use crate::config::Config;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Reads the render data from `path`, or null when no file is given.
pub fn read_data(path: Option<&Path>) -> anyhow::Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Null);
    };
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|err| anyhow::anyhow!("invalid JSON in {}: {}", path.display(), err))
}

/// Runs the render command, writing the output to `out`.
pub fn run(config: &Config, name: &str, data: Option<&Path>, out: &mut dyn Write) -> anyhow::Result<()> {
    let engine = load_engine(config)?;
    let data = read_data(data)?;
    engine.render(out, name, &data)?;
    out.flush()?;
    Ok(())
}
