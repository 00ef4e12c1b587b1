// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template stores.
//!
//! - [`PartialRegistry`]: the shared pool of reusable trees (layouts, snippets, masters).
//! - [`PageStore`]: each page's private forest, keyed by the page's registration name.
//! - [`Stores`]: both of the above, admitted into atomically. The engine keeps one
//!   `Stores` behind its lock.
//!
//! Trees are immutable once admitted and held through [`SharedTree`], so taking a
//! snapshot of the registry for a render copies pointers, never tree bodies.

use crate::ast::{Forest, TemplateTree};
use crate::classify::{classify, Classification};
use crate::error::{Result, ViewError};
use crate::names::is_content_section;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared, immutable handle to an admitted tree.
pub type SharedTree = Arc<TemplateTree>;

/// Name-based tree lookup used by the execution runtime.
pub trait TemplateLookup {
    /// Returns the tree registered under `name`, if any.
    fn lookup(&self, name: &str) -> Option<&TemplateTree>;
}

/// The shared pool of partial trees.
#[derive(Debug, Clone, Default)]
pub struct PartialRegistry {
    trees: HashMap<String, SharedTree>,
}

impl PartialRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when a tree named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.trees.contains_key(name)
    }

    /// Returns the shared handle for `name`.
    pub fn get(&self, name: &str) -> Option<&SharedTree> {
        self.trees.get(name)
    }

    /// Number of registered trees.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Returns true when no trees are registered.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Sorted list of registered tree names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.trees.keys().cloned().collect();
        names.sort();
        names
    }

    /// Iterates over every registered tree.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &SharedTree)> {
        self.trees.iter()
    }

    fn insert(&mut self, tree: TemplateTree) {
        self.trees.insert(tree.name.clone(), Arc::new(tree));
    }
}

impl TemplateLookup for PartialRegistry {
    fn lookup(&self, name: &str) -> Option<&TemplateTree> {
        self.trees.get(name).map(|tree| tree.as_ref())
    }
}

/// A page's private forest.
pub type PageEntry = Arc<Forest>;

/// Mapping from page name to its private forest.
#[derive(Debug, Clone, Default)]
pub struct PageStore {
    pages: HashMap<String, PageEntry>,
}

impl PageStore {
    /// Creates an empty page store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when a page named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.pages.contains_key(name)
    }

    /// Returns the page's forest.
    pub fn get(&self, name: &str) -> Option<&PageEntry> {
        self.pages.get(name)
    }

    /// Sorted list of page names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pages.keys().cloned().collect();
        names.sort();
        names
    }

    fn insert(&mut self, name: &str, forest: Forest) {
        self.pages.insert(name.to_string(), Arc::new(forest));
    }
}

/// Both stores, mutated only through [`Stores::admit`].
///
/// The partial registry sits behind an `Arc` so a render can hold a snapshot
/// while later registrations copy-on-write a fresh map.
#[derive(Debug, Clone, Default)]
pub struct Stores {
    partials: Arc<PartialRegistry>,
    pages: PageStore,
}

impl Stores {
    /// Creates empty stores.
    pub fn new() -> Self {
        Self::default()
    }

    /// The partial registry.
    pub fn partials(&self) -> &PartialRegistry {
        &self.partials
    }

    /// A pointer-copy of the partial registry that later admissions cannot affect.
    pub fn partials_snapshot(&self) -> Arc<PartialRegistry> {
        Arc::clone(&self.partials)
    }

    /// The page store.
    pub fn pages(&self) -> &PageStore {
        &self.pages
    }

    /// Returns true when `name` is taken by a page or a partial tree.
    pub fn is_defined(&self, name: &str) -> bool {
        self.pages.contains(name) || self.partials.contains(name)
    }

    /// Classifies `forest` and admits it under `name`.
    ///
    /// Every name check happens before any insertion, so on error neither store
    /// has changed.
    ///
    /// # Errors
    ///
    /// [`ViewError::DuplicateDefinition`] when the page name, or any partial
    /// tree name, is already a page or a partial.
    pub fn admit(&mut self, name: &str, forest: Forest) -> Result<Classification> {
        let classification = classify(&forest);
        match classification {
            Classification::Page => {
                if self.is_defined(name) {
                    return Err(ViewError::DuplicateDefinition(name.to_string()));
                }
                for private in forest.keys().filter(|tree| *tree != name && !is_content_section(tree)) {
                    tracing::warn!(page = name, tree = %private, "page defines a non-section tree");
                }
                tracing::info!(page = name, trees = forest.len(), "adding page");
                self.pages.insert(name, forest);
            }
            Classification::Partial => {
                if let Some(taken) = forest.keys().find(|tree| self.is_defined(tree)) {
                    return Err(ViewError::DuplicateDefinition(taken.clone()));
                }
                let partials = Arc::make_mut(&mut self.partials);
                for tree in forest.into_values() {
                    tracing::info!(partial = %tree.name, "adding partial");
                    partials.insert(tree);
                }
            }
        }
        Ok(classification)
    }
}
