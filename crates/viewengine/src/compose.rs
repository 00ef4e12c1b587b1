// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Render composer.
//!
//! A render moves through `Lookup → Clone → MergePage → RewriteMasters → Execute`.
//! [`RenderPlan::prepare`] is the lookup: it runs under the engine lock and only
//! copies pointers. Everything after it runs on data private to the render.
//!
//! # Master chains
//!
//! A page may invoke another page by name, which then acts as its master. Level
//! 0 is the requested page and level k+1 is the page invoked from level k.
//! Level k's sections are merged as `~<page k>/__name`. A section reference
//! made by level k resolves to the nearest lower level that defines it, then
//! to level k itself. A reference made by a registry tree resolves from the
//! outermost level inwards.

use crate::ast::TemplateTree;
use crate::config::EngineConfig;
use crate::error::{Result, ViewError};
use crate::exec;
use crate::names::{is_content_section, ScopeToken, ROOT_NAME};
use crate::registry::{PageEntry, PageStore, PartialRegistry, SharedTree, Stores, TemplateLookup};
use crate::rewrite::{references_sections, rewrite_invocations};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Composition stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Resolve the requested name against the stores.
    Lookup,
    /// Copy the partial registry into a render namespace.
    Clone,
    /// Merge every chain level's forest under scoped names.
    MergePage,
    /// Scope the section references of registry trees.
    RewriteMasters,
    /// Run the root tree.
    Execute,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lookup => "lookup",
            Stage::Clone => "clone",
            Stage::MergePage => "merge-page",
            Stage::RewriteMasters => "rewrite-masters",
            Stage::Execute => "execute",
        };
        f.write_str(name)
    }
}

/// One page of a master chain.
#[derive(Debug, Clone)]
pub struct Level {
    page: String,
    token: ScopeToken,
    forest: PageEntry,
}

impl Level {
    fn new(page: &str, forest: PageEntry) -> Self {
        Self {
            page: page.to_string(),
            token: ScopeToken::for_page(page),
            forest,
        }
    }

    /// The page name of this level.
    pub fn page(&self) -> &str {
        &self.page
    }

    fn defines(&self, section: &str) -> bool {
        self.forest.contains_key(section)
    }
}

/// Discovers the master chain of `page`, innermost level first.
///
/// Returns `None` when `page` is not a registered page.
///
/// # Errors
///
/// [`ViewError::Composition`] when a level invokes more than one page, or the
/// chain comes back to a page it already contains.
pub fn master_chain(page: &str, pages: &PageStore) -> Result<Option<Vec<Level>>> {
    let Some(entry) = pages.get(page) else {
        return Ok(None);
    };

    let mut chain = vec![Level::new(page, Arc::clone(entry))];
    loop {
        let current = &chain[chain.len() - 1];
        let masters: BTreeSet<String> = current
            .forest
            .values()
            .flat_map(TemplateTree::invoked_names)
            .filter(|name| !is_content_section(name) && pages.contains(name))
            .map(str::to_string)
            .collect();

        let master = match masters.iter().collect::<Vec<_>>().as_slice() {
            [] => break,
            [master] => master.to_string(),
            [first, second, ..] => {
                return Err(ViewError::composition(
                    page,
                    format!(
                        "page {:?} invokes more than one page ({:?} and {:?})",
                        current.page, first, second
                    ),
                ))
            }
        };
        if chain.iter().any(|level| level.page == master) {
            let path: Vec<&str> = chain.iter().map(Level::page).collect();
            return Err(ViewError::composition(
                page,
                format!("master cycle: {} -> {}", path.join(" -> "), master),
            ));
        }
        let Some(entry) = pages.get(&master) else {
            break;
        };
        chain.push(Level::new(&master, Arc::clone(entry)));
    }

    tracing::debug!(
        page,
        chain = ?chain.iter().map(Level::page).collect::<Vec<_>>(),
        "resolved master chain"
    );
    Ok(Some(chain))
}

/// The tree namespace one render executes against.
#[derive(Debug, Default)]
pub struct RenderNamespace {
    trees: HashMap<String, SharedTree>,
}

impl RenderNamespace {
    /// Copies every tree handle of `partials`.
    pub fn from_registry(partials: &PartialRegistry) -> Self {
        let trees = partials
            .iter()
            .map(|(name, tree)| (name.clone(), Arc::clone(tree)))
            .collect();
        Self { trees }
    }

    /// Returns true when `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.trees.contains_key(name)
    }

    /// Number of trees in the namespace.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Returns true when the namespace holds no trees.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Sorted tree names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.trees.keys().cloned().collect();
        names.sort();
        names
    }
}

impl TemplateLookup for RenderNamespace {
    fn lookup(&self, name: &str) -> Option<&TemplateTree> {
        self.trees.get(name).map(|tree| tree.as_ref())
    }
}

/// Builds the namespace for rendering `chain[0]`.
///
/// # Errors
///
/// [`ViewError::Composition`] when a page's non-section tree collides with a
/// registry tree or with another level's tree.
pub fn compose(chain: &[Level], partials: &PartialRegistry) -> Result<RenderNamespace> {
    let Some(requested) = chain.first() else {
        return Ok(RenderNamespace::default());
    };
    let page = requested.page.as_str();

    tracing::debug!(page, stage = %Stage::Clone, trees = partials.len(), "cloning partial registry");
    let mut namespace = RenderNamespace::from_registry(partials);

    for (depth, level) in chain.iter().enumerate() {
        let resolver = |section: &str| {
            resolve(chain[..depth].iter().rev().chain(std::iter::once(level)), section)
        };
        for (name, tree) in level.forest.iter() {
            let key = if *name == level.page {
                if depth == 0 {
                    tracing::debug!(page, root = ROOT_NAME, "selected render root");
                    ROOT_NAME.to_string()
                } else {
                    level.page.clone()
                }
            } else if is_content_section(name) {
                level.token.scope(name)
            } else {
                name.clone()
            };

            if namespace.contains(&key) {
                return Err(ViewError::composition(
                    page,
                    format!("tree {:?} of page {:?} is already defined", key, level.page),
                ));
            }
            let merged = rewrite_invocations(tree, key.as_str(), &resolver);
            namespace.trees.insert(key, Arc::new(merged));
        }
        tracing::debug!(page, stage = %Stage::MergePage, level = %level.page, depth, "merged page level");
    }

    let outermost_first = |section: &str| resolve(chain.iter().rev(), section);
    let mut rewritten = 0usize;
    for (name, tree) in partials.iter() {
        if !references_sections(tree) {
            continue;
        }
        let scoped = rewrite_invocations(tree, name.as_str(), &outermost_first);
        namespace.trees.insert(name.clone(), Arc::new(scoped));
        rewritten += 1;
    }
    tracing::debug!(page, stage = %Stage::RewriteMasters, rewritten, "scoped master references");

    Ok(namespace)
}

fn resolve<'l>(mut levels: impl Iterator<Item = &'l Level>, section: &str) -> Option<String> {
    levels
        .find(|level| level.defines(section))
        .map(|level| level.token.scope(section))
}

/// What a render needs once the engine lock is released.
#[derive(Debug)]
pub enum RenderPlan {
    /// Compose the page chain, then execute the root.
    Page {
        /// Master chain, innermost first.
        chain: Vec<Level>,
        /// Registry snapshot.
        partials: Arc<PartialRegistry>,
    },
    /// Execute a registry tree directly.
    Partial {
        /// Registry snapshot.
        partials: Arc<PartialRegistry>,
    },
}

impl RenderPlan {
    /// Resolves `name` against the stores.
    ///
    /// # Errors
    ///
    /// [`ViewError::NotFound`] when `name` is neither a page nor a partial, and
    /// the errors of [`master_chain`].
    pub fn prepare(stores: &Stores, name: &str) -> Result<Self> {
        tracing::debug!(name, stage = %Stage::Lookup, "looking up template");
        let partials = stores.partials_snapshot();
        if let Some(chain) = master_chain(name, stores.pages())? {
            return Ok(RenderPlan::Page { chain, partials });
        }
        if partials.contains(name) {
            return Ok(RenderPlan::Partial { partials });
        }
        Err(ViewError::NotFound(name.to_string()))
    }

    /// Composes if needed, then executes `name` into `out`.
    pub fn execute(self, name: &str, config: &EngineConfig, out: &mut dyn Write, data: &Value) -> Result<()> {
        match self {
            RenderPlan::Page { chain, partials } => {
                let namespace = compose(&chain, &partials)?;
                tracing::debug!(page = name, stage = %Stage::Execute, trees = namespace.len(), "executing page");
                exec::execute(&namespace, config, ROOT_NAME, out, data)
            }
            RenderPlan::Partial { partials } => {
                tracing::debug!(partial = name, stage = %Stage::Execute, "executing partial");
                exec::execute(partials.as_ref(), config, name, out, data)
            }
        }
    }
}
