// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree (AST) types for view templates.
//!
//! The parser turns one source unit into a [`Forest`]: a map from tree name to
//! [`TemplateTree`]. The source unit's own body becomes the tree named after
//! the registration name; every `{{define "x"}}` block becomes one more tree.
//!
//! # Node Types
//!
//! The [`Node`] enum covers the constructs the composition engine cares about:
//! - Text runs and interpolations (`{{.field}}`)
//! - Control blocks (`{{if}}`, `{{range}}`, `{{with}}`)
//! - Invocations of named trees (`{{template "x"}}`, `{{optional "x"}}`)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parsed source unit: every tree it declared, keyed by tree name.
pub type Forest = BTreeMap<String, TemplateTree>;

/// One named template tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateTree {
    /// The tree name, unique within whichever store holds it.
    pub name: String,
    /// Top-level nodes of the tree body.
    pub nodes: Vec<Node>,
}

impl TemplateTree {
    /// Creates a tree from its name and body.
    pub fn new(name: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            nodes,
        }
    }

    /// Returns the target name of every invocation in this tree, in source order.
    ///
    /// Invocations nested in `if`/`range`/`with` branches are included.
    pub fn invoked_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_invocations(&self.nodes, &mut names);
        names
    }
}

fn collect_invocations<'a>(nodes: &'a [Node], out: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            Node::Invoke { name, .. } => out.push(name),
            Node::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_invocations(then_branch, out);
                if let Some(branch) = else_branch {
                    collect_invocations(branch, out);
                }
            }
            Node::Range { body, else_branch, .. } | Node::With { body, else_branch, .. } => {
                collect_invocations(body, out);
                if let Some(branch) = else_branch {
                    collect_invocations(branch, out);
                }
            }
            Node::Text { .. } | Node::Interpolation { .. } => {}
        }
    }
}

/// AST node types representing template structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Literal text, already whitespace-trimmed where `{{-`/`-}}` asked for it.
    Text {
        /// The text content.
        content: String,
    },
    /// An action that prints the value of a pipeline: `{{.title}}`.
    Interpolation {
        /// The pipeline to evaluate.
        pipeline: Pipeline,
        /// Source location of the action.
        span: Span,
    },
    /// Conditional block `{{if p}}...{{else}}...{{end}}`.
    ///
    /// `{{else if q}}` is represented as a nested `If` inside `else_branch`.
    If {
        /// The condition pipeline.
        pipeline: Pipeline,
        /// Nodes rendered when the condition is truthy.
        then_branch: Vec<Node>,
        /// Nodes rendered otherwise.
        else_branch: Option<Vec<Node>>,
        /// Source location of the opening action.
        span: Span,
    },
    /// Iteration block `{{range p}}...{{else}}...{{end}}`.
    Range {
        /// The pipeline producing the collection.
        pipeline: Pipeline,
        /// Nodes rendered once per element, with dot bound to the element.
        body: Vec<Node>,
        /// Nodes rendered when the collection is empty.
        else_branch: Option<Vec<Node>>,
        /// Source location of the opening action.
        span: Span,
    },
    /// Scoped binding `{{with p}}...{{else}}...{{end}}`.
    With {
        /// The pipeline whose value becomes dot.
        pipeline: Pipeline,
        /// Nodes rendered when the value is truthy.
        body: Vec<Node>,
        /// Nodes rendered otherwise.
        else_branch: Option<Vec<Node>>,
        /// Source location of the opening action.
        span: Span,
    },
    /// Invocation of a named tree: `{{template "x" .}}` or `{{optional "x" .}}`.
    Invoke {
        /// The target tree name.
        name: String,
        /// The value passed as the invoked tree's dot. `None` passes null.
        pipeline: Option<Pipeline>,
        /// When true a missing target renders nothing instead of failing.
        optional: bool,
        /// Source location of the action.
        span: Span,
    },
}

/// A chain of commands separated by `|`.
///
/// The result of each command is appended as the final argument of the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// The commands, in evaluation order. Never empty.
    pub commands: Vec<Command>,
}

/// A single command: a function call or a lone operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// The operands. When the first is a [`Operand::Function`] the rest are its arguments.
    pub args: Vec<Operand>,
}

/// One term inside a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// The current value: `.`
    Dot,
    /// A field chain on the current value: `.user.name`
    Field(Vec<String>),
    /// The value the current tree was invoked with, optionally followed by fields: `$`, `$.site`
    Root(Vec<String>),
    /// A string literal.
    String(String),
    /// A numeric literal.
    Number(serde_json::Number),
    /// `true` or `false`.
    Bool(bool),
    /// `nil`
    Nil,
    /// A function name such as `len` or `htmlEncode`.
    Function(String),
    /// A parenthesised pipeline.
    Pipeline(Box<Pipeline>),
}

/// Source location information for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset from the start of the source.
    pub start: usize,
    /// Byte offset of the end (exclusive).
    pub end: usize,
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number.
    pub column: usize,
}

impl Span {
    /// Creates a new source span.
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}
