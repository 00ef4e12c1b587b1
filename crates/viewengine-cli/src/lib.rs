// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! viewengine CLI library.
//!
//! This crate provides the command-line interface for the viewengine
//! master-page template engine.
//!
//! # Usage
//!
//! This crate is primarily used through the `viewengine` binary:
//!
//! ```bash
//! viewengine list                         # List pages and partials
//! viewengine render home.gohtml --data data.json
//! ```
//!
//! # Configuration
//!
//! Projects are configured via `viewengine.toml` at the project root.

/// CLI commands (render, list).
pub mod commands;
/// Project configuration from `viewengine.toml`.
pub mod config;
