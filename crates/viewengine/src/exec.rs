// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Execution runtime.
//!
//! Walks a [`TemplateTree`] against a `serde_json::Value`, writing output to
//! any [`Write`] sink. Named invocations resolve through a [`TemplateLookup`]:
//! either the partial registry or a composed render namespace.
//!
//! Output is streamed. When execution fails part-way, whatever was already
//! written stays in the sink.

use crate::ast::{Command, Node, Operand, Pipeline, Span, TemplateTree};
use crate::config::{EngineConfig, MissingKey};
use crate::error::{Result, ViewError};
use crate::funcs::{self, html_escape, kind_of, Evaluated};
use crate::registry::TemplateLookup;
use serde_json::Value;
use std::io::Write;

/// Executes `entry` from `lookup`, binding `data` as dot.
///
/// # Errors
///
/// [`ViewError::NotFound`] when `entry` is missing, [`ViewError::Runtime`] for
/// evaluation failures and [`ViewError::Io`] when the sink rejects a write.
pub fn execute<L>(
    lookup: &L,
    config: &EngineConfig,
    entry: &str,
    out: &mut dyn Write,
    data: &Value,
) -> Result<()>
where
    L: TemplateLookup + ?Sized,
{
    let tree = lookup
        .lookup(entry)
        .ok_or_else(|| ViewError::NotFound(entry.to_string()))?;
    let executor = Executor { lookup, config };
    executor.run_tree(tree, data, 0, out)
}

struct Executor<'a, L: ?Sized> {
    lookup: &'a L,
    config: &'a EngineConfig,
}

/// Per-tree state: which tree is running, what `$` is, and how deep we are.
struct Frame<'v> {
    template: &'v str,
    root: &'v Value,
    depth: usize,
}

impl<L> Executor<'_, L>
where
    L: TemplateLookup + ?Sized,
{
    fn run_tree(&self, tree: &TemplateTree, dot: &Value, depth: usize, out: &mut dyn Write) -> Result<()> {
        let frame = Frame {
            template: &tree.name,
            root: dot,
            depth,
        };
        self.walk(&frame, &tree.nodes, dot, out)
    }

    fn walk(&self, frame: &Frame<'_>, nodes: &[Node], dot: &Value, out: &mut dyn Write) -> Result<()> {
        for node in nodes {
            self.walk_node(frame, node, dot, out)?;
        }
        Ok(())
    }

    fn walk_node(&self, frame: &Frame<'_>, node: &Node, dot: &Value, out: &mut dyn Write) -> Result<()> {
        match node {
            Node::Text { content } => out.write_all(content.as_bytes())?,
            Node::Interpolation { pipeline, span } => {
                let value = self.eval_pipeline(frame, pipeline, dot, *span)?;
                let text = match value {
                    Evaluated::Html(html) => html,
                    Evaluated::Data(data) if self.config.escape_html => html_escape(&funcs::stringify(&data)),
                    Evaluated::Data(data) => funcs::stringify(&data),
                };
                out.write_all(text.as_bytes())?;
            }
            Node::If {
                pipeline,
                then_branch,
                else_branch,
                span,
            } => {
                if self.eval_pipeline(frame, pipeline, dot, *span)?.is_truthy() {
                    self.walk(frame, then_branch, dot, out)?;
                } else if let Some(branch) = else_branch {
                    self.walk(frame, branch, dot, out)?;
                }
            }
            Node::With {
                pipeline,
                body,
                else_branch,
                span,
            } => {
                let value = self.eval_pipeline(frame, pipeline, dot, *span)?;
                if value.is_truthy() {
                    self.walk(frame, body, &value.into_value(), out)?;
                } else if let Some(branch) = else_branch {
                    self.walk(frame, branch, dot, out)?;
                }
            }
            Node::Range {
                pipeline,
                body,
                else_branch,
                span,
            } => {
                let value = self.eval_pipeline(frame, pipeline, dot, *span)?.into_value();
                let items: Vec<&Value> = match &value {
                    Value::Array(items) => items.iter().collect(),
                    Value::Object(map) => map.values().collect(),
                    Value::Null => Vec::new(),
                    other => {
                        return Err(self.error(
                            frame,
                            *span,
                            format!("range can't iterate over {}", kind_of(other)),
                        ))
                    }
                };
                if items.is_empty() {
                    if let Some(branch) = else_branch {
                        self.walk(frame, branch, dot, out)?;
                    }
                }
                for item in items {
                    self.walk(frame, body, item, out)?;
                }
            }
            Node::Invoke {
                name,
                pipeline,
                optional,
                span,
            } => self.invoke(frame, name, pipeline.as_ref(), *optional, dot, *span, out)?,
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn invoke(
        &self,
        frame: &Frame<'_>,
        name: &str,
        pipeline: Option<&Pipeline>,
        optional: bool,
        dot: &Value,
        span: Span,
        out: &mut dyn Write,
    ) -> Result<()> {
        let Some(tree) = self.lookup.lookup(name) else {
            if optional {
                return Ok(());
            }
            return Err(self.error(frame, span, format!("no such template {:?}", name)));
        };

        if frame.depth >= self.config.max_depth {
            return Err(self.error(
                frame,
                span,
                format!("exceeded maximum template depth ({})", self.config.max_depth),
            ));
        }

        let arg = match pipeline {
            Some(pipeline) => self.eval_pipeline(frame, pipeline, dot, span)?.into_value(),
            None => Value::Null,
        };

        if optional {
            // Rendered aside and spliced in whole.
            let mut buffer = Vec::new();
            self.run_tree(tree, &arg, frame.depth + 1, &mut buffer)?;
            out.write_all(&buffer)?;
            Ok(())
        } else {
            self.run_tree(tree, &arg, frame.depth + 1, out)
        }
    }

    fn eval_pipeline(&self, frame: &Frame<'_>, pipeline: &Pipeline, dot: &Value, span: Span) -> Result<Evaluated> {
        let mut piped = None;
        for command in &pipeline.commands {
            piped = Some(self.eval_command(frame, command, dot, piped, span)?);
        }
        Ok(piped.unwrap_or(Evaluated::Data(Value::Null)))
    }

    fn eval_command(
        &self,
        frame: &Frame<'_>,
        command: &Command,
        dot: &Value,
        piped: Option<Evaluated>,
        span: Span,
    ) -> Result<Evaluated> {
        let Some((first, rest)) = command.args.split_first() else {
            return Err(self.error(frame, span, "empty command"));
        };

        if let Operand::Function(name) = first {
            let mut args = rest
                .iter()
                .map(|operand| self.eval_operand(frame, operand, dot, span))
                .collect::<Result<Vec<_>>>()?;
            args.extend(piped);
            return funcs::call(name, args).map_err(|message| self.error(frame, span, message));
        }

        if !rest.is_empty() || piped.is_some() {
            return Err(self.error(frame, span, "can't give argument to non-function"));
        }
        self.eval_operand(frame, first, dot, span)
    }

    fn eval_operand(&self, frame: &Frame<'_>, operand: &Operand, dot: &Value, span: Span) -> Result<Evaluated> {
        let value = match operand {
            Operand::Dot => dot.clone(),
            Operand::Field(path) => self.field_chain(frame, dot, path, span)?,
            Operand::Root(path) => self.field_chain(frame, frame.root, path, span)?,
            Operand::String(s) => Value::String(s.clone()),
            Operand::Number(n) => Value::Number(n.clone()),
            Operand::Bool(b) => Value::Bool(*b),
            Operand::Nil => Value::Null,
            Operand::Function(name) => {
                return funcs::call(name, Vec::new()).map_err(|message| self.error(frame, span, message))
            }
            Operand::Pipeline(pipeline) => return self.eval_pipeline(frame, pipeline, dot, span),
        };
        Ok(Evaluated::Data(value))
    }

    fn field_chain(&self, frame: &Frame<'_>, base: &Value, path: &[String], span: Span) -> Result<Value> {
        let mut current = base;
        for field in path {
            current = match current {
                Value::Object(map) => match map.get(field) {
                    Some(value) => value,
                    None if self.config.missing_key == MissingKey::Error => {
                        return Err(self.error(frame, span, format!("map has no entry for key {:?}", field)))
                    }
                    None => return Ok(Value::Null),
                },
                Value::Null if self.config.missing_key == MissingKey::Error => {
                    return Err(self.error(frame, span, format!("nil data; no entry for key {:?}", field)))
                }
                Value::Null => return Ok(Value::Null),
                other => {
                    return Err(self.error(
                        frame,
                        span,
                        format!("can't evaluate field {} in type {}", field, kind_of(other)),
                    ))
                }
            };
        }
        Ok(current.clone())
    }

    fn error(&self, frame: &Frame<'_>, span: Span, message: impl Into<String>) -> ViewError {
        ViewError::runtime(
            frame.template,
            format!("{}:{}: {}", span.line, span.column, message.into()),
        )
    }
}
