// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Namespace rewriting of content-section names.
//!
//! Pages may all define `__body`; once several forests share one render
//! namespace those names must be told apart. The rewriter builds a new tree in
//! which content-section names are scoped. Trees held by the stores are never
//! touched.
//!
//! Only invocation *targets* are rewritten. Argument pipelines and ordinary
//! (non-section) invocation names pass through unchanged.

use crate::ast::{Node, TemplateTree};
use crate::names::{is_content_section, ScopeToken};

/// Maps a content-section name to the scoped name it should invoke.
pub trait SectionResolver {
    /// Returns the scoped name, or `None` to leave the reference as written.
    fn resolve(&self, section: &str) -> Option<String>;
}

impl SectionResolver for ScopeToken {
    fn resolve(&self, section: &str) -> Option<String> {
        Some(self.scope(section))
    }
}

impl<F> SectionResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, section: &str) -> Option<String> {
        self(section)
    }
}

/// Scopes a tree with a single token.
///
/// The tree's own name is scoped when it is a content section, and so is every
/// content-section invocation inside it. Scoped names no longer carry the
/// section marker, so applying the same rewrite twice changes nothing.
pub fn rewrite_tree(tree: &TemplateTree, token: &ScopeToken) -> TemplateTree {
    let name = if is_content_section(&tree.name) {
        token.scope(&tree.name)
    } else {
        tree.name.clone()
    };
    TemplateTree::new(name, rewrite_nodes(&tree.nodes, token))
}

/// Rewrites the section invocations of `tree` through `resolver`, naming the result `name`.
pub fn rewrite_invocations<R>(tree: &TemplateTree, name: impl Into<String>, resolver: &R) -> TemplateTree
where
    R: SectionResolver + ?Sized,
{
    TemplateTree::new(name, rewrite_nodes(&tree.nodes, resolver))
}

/// Returns true when `tree` invokes at least one content section.
pub fn references_sections(tree: &TemplateTree) -> bool {
    tree.invoked_names()
        .into_iter()
        .any(is_content_section)
}

/// Rewrites a node list, recursing into every branch that can hold nodes.
pub fn rewrite_nodes<R>(nodes: &[Node], resolver: &R) -> Vec<Node>
where
    R: SectionResolver + ?Sized,
{
    nodes.iter().map(|node| rewrite_node(node, resolver)).collect()
}

fn rewrite_branch<R>(branch: &Option<Vec<Node>>, resolver: &R) -> Option<Vec<Node>>
where
    R: SectionResolver + ?Sized,
{
    branch.as_deref().map(|nodes| rewrite_nodes(nodes, resolver))
}

fn rewrite_node<R>(node: &Node, resolver: &R) -> Node
where
    R: SectionResolver + ?Sized,
{
    match node {
        Node::Invoke {
            name,
            pipeline,
            optional,
            span,
        } => {
            let target = if is_content_section(name) {
                match resolver.resolve(name) {
                    Some(scoped) => {
                        tracing::trace!(section = %name, scoped = %scoped, "scoping section reference");
                        scoped
                    }
                    None => name.clone(),
                }
            } else {
                name.clone()
            };
            Node::Invoke {
                name: target,
                pipeline: pipeline.clone(),
                optional: *optional,
                span: *span,
            }
        }
        Node::If {
            pipeline,
            then_branch,
            else_branch,
            span,
        } => Node::If {
            pipeline: pipeline.clone(),
            then_branch: rewrite_nodes(then_branch, resolver),
            else_branch: rewrite_branch(else_branch, resolver),
            span: *span,
        },
        Node::Range {
            pipeline,
            body,
            else_branch,
            span,
        } => Node::Range {
            pipeline: pipeline.clone(),
            body: rewrite_nodes(body, resolver),
            else_branch: rewrite_branch(else_branch, resolver),
            span: *span,
        },
        Node::With {
            pipeline,
            body,
            else_branch,
            span,
        } => Node::With {
            pipeline: pipeline.clone(),
            body: rewrite_nodes(body, resolver),
            else_branch: rewrite_branch(else_branch, resolver),
            span: *span,
        },
        Node::Text { .. } | Node::Interpolation { .. } => node.clone(),
    }
}
