// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! List command: prints every registered view with its kind.

use crate::commands::load_engine;
use crate::config::Config;
use std::io::Write;

/// Runs the list command, writing one `<kind>\t<name>` line per view to `out`.
pub fn run(config: &Config, out: &mut dyn Write) -> anyhow::Result<()> {
    let engine = load_engine(config)?;
    for name in engine.page_names() {
        writeln!(out, "page\t{}", name)?;
    }
    for name in engine.partial_names() {
        writeln!(out, "partial\t{}", name)?;
    }
    Ok(())
}
