// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Page / partial classification of a freshly parsed forest.

use crate::ast::Forest;
use crate::names::is_content_section;

/// Where a parsed source unit belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The forest declares at least one content section. It is stored whole,
    /// keyed by its registration name, and only merged into a namespace at render time.
    Page,
    /// The forest declares no content sections. Each of its trees joins the
    /// shared partial registry under its own name.
    Partial,
}

/// Classifies a forest by scanning its tree names for the content-section marker.
///
/// A tree that is merely *invoked* as a section does not count: masters invoke
/// `__body` without being pages.
pub fn classify(forest: &Forest) -> Classification {
    if forest.keys().any(|name| is_content_section(name)) {
        Classification::Page
    } else {
        Classification::Partial
    }
}
