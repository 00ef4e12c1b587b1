// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template parser.
//!
//! Parsing happens in three passes over a source unit:
//!
//! 1. The pest grammar in `template.pest` splits the source into a flat run of
//!    text, comments and actions, each action already reduced to a [`Tag`].
//! 2. `{{-` and `-}}` trim markers strip whitespace from the neighbouring text.
//! 3. A stack of open blocks assembles `if`/`range`/`with`/`define` bodies and
//!    emits one [`TemplateTree`] per `define` plus the unit's own top-level tree.

use crate::ast::{Command, Forest, Node, Operand, Pipeline, Span, TemplateTree};
use crate::error::{Result, SourceContext, ViewError};
use crate::funcs::is_builtin;
use crate::names::is_reserved;
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

/// The pest parser generated from `template.pest`.
#[derive(Parser)]
#[grammar = "template.pest"]
pub struct TemplateParser;

/// Parses `source` into a forest whose top-level tree is named `name`.
///
/// # Errors
///
/// Returns [`ViewError::Parse`] with line, column and a source snippet when
/// the source is malformed: unbalanced blocks, a `define` nested inside a
/// block, a tree declared twice, or a tree name using the reserved `~` prefix.
pub fn parse(name: &str, source: &str) -> Result<Forest> {
    let mut items = lex(source).map_err(|err| err.into_view_error(name, source))?;
    apply_trim_markers(&mut items);
    build_forest(name, items).map_err(|err| err.into_view_error(name, source))
}

/// A parse failure before it is attached to a source unit.
#[derive(Debug)]
struct SyntaxError {
    message: String,
    line: usize,
    column: usize,
}

impl SyntaxError {
    fn at(span: Span, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }

    fn into_view_error(self, name: &str, source: &str) -> ViewError {
        ViewError::Parse {
            source_context: Some(SourceContext::from_source(source, self.line, self.column)),
            message: self.message,
            line: self.line,
            column: self.column,
            file: Some(name.to_string()),
        }
    }
}

impl From<pest::error::Error<Rule>> for SyntaxError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, column) = match err.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        let err = err.renamed_rules(describe_rule);
        Self {
            message: err.variant.message().into_owned(),
            line,
            column,
        }
    }
}

fn describe_rule(rule: &Rule) -> String {
    match rule {
        Rule::close => "`}}`".to_string(),
        Rule::pipeline | Rule::command => "a pipeline".to_string(),
        Rule::string | Rule::quoted | Rule::raw_string => "a quoted template name".to_string(),
        Rule::field | Rule::root | Rule::dot => "a value".to_string(),
        Rule::function => "a function name".to_string(),
        Rule::text | Rule::comment | Rule::action => "text or an action".to_string(),
        Rule::EOI => "end of input".to_string(),
        other => format!("{:?}", other),
    }
}

/// One action reduced to what the block builder needs.
#[derive(Debug, Clone, PartialEq)]
enum Tag {
    Define(String),
    Invoke {
        name: String,
        pipeline: Option<Pipeline>,
        optional: bool,
    },
    If(Pipeline),
    ElseIf(Pipeline),
    ElseWith(Pipeline),
    Else,
    Range(Pipeline),
    With(Pipeline),
    End,
    Print(Pipeline),
}

#[derive(Debug)]
enum Item {
    Text(String),
    Comment {
        trim_left: bool,
        trim_right: bool,
    },
    Action {
        tag: Tag,
        span: Span,
        trim_left: bool,
        trim_right: bool,
    },
}

impl Item {
    fn trims(&self) -> (bool, bool) {
        match self {
            Item::Text(_) => (false, false),
            Item::Comment {
                trim_left,
                trim_right,
            }
            | Item::Action {
                trim_left,
                trim_right,
                ..
            } => (*trim_left, *trim_right),
        }
    }
}

fn span_of(pair: &Pair<'_, Rule>) -> Span {
    let span = pair.as_span();
    let (line, column) = span.start_pos().line_col();
    Span::new(span.start(), span.end(), line, column)
}

fn lex(source: &str) -> std::result::Result<Vec<Item>, SyntaxError> {
    let template = TemplateParser::parse(Rule::template, source)?
        .next()
        .ok_or_else(|| SyntaxError::at(Span::new(0, 0, 1, 1), "empty parse"))?;

    let mut items = Vec::new();
    for pair in template.into_inner() {
        match pair.as_rule() {
            Rule::text => items.push(Item::Text(pair.as_str().to_string())),
            Rule::comment => {
                let (trim_left, trim_right) = delimiter_trims(pair);
                items.push(Item::Comment {
                    trim_left,
                    trim_right,
                });
            }
            Rule::action => {
                let span = span_of(&pair);
                let mut trim_left = false;
                let mut trim_right = false;
                let mut tag = None;
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::open => trim_left = inner.into_inner().next().is_some(),
                        Rule::close => trim_right = inner.into_inner().next().is_some(),
                        _ => tag = Some(build_tag(inner)?),
                    }
                }
                let tag = tag.ok_or_else(|| SyntaxError::at(span, "empty action"))?;
                items.push(Item::Action {
                    tag,
                    span,
                    trim_left,
                    trim_right,
                });
            }
            _ => {}
        }
    }
    Ok(items)
}

fn delimiter_trims(pair: Pair<'_, Rule>) -> (bool, bool) {
    let mut trims = (false, false);
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::open => trims.0 = inner.into_inner().next().is_some(),
            Rule::close => trims.1 = inner.into_inner().next().is_some(),
            _ => {}
        }
    }
    trims
}

fn build_tag(pair: Pair<'_, Rule>) -> std::result::Result<Tag, SyntaxError> {
    let span = span_of(&pair);
    let rule = pair.as_rule();
    let mut inner = pair.into_inner();

    let tag = match rule {
        Rule::define_tag => {
            let name = string_literal(
                inner
                    .next()
                    .ok_or_else(|| SyntaxError::at(span, "define requires a name"))?,
            )?;
            if is_reserved(&name) {
                return Err(SyntaxError::at(
                    span,
                    format!("template name {:?} uses a reserved prefix", name),
                ));
            }
            Tag::Define(name)
        }
        Rule::template_tag | Rule::optional_tag => {
            let name = string_literal(
                inner
                    .next()
                    .ok_or_else(|| SyntaxError::at(span, "invocation requires a name"))?,
            )?;
            let pipeline = inner.next().map(build_pipeline).transpose()?;
            Tag::Invoke {
                name,
                pipeline,
                optional: rule == Rule::optional_tag,
            }
        }
        Rule::if_tag => Tag::If(required_pipeline(&mut inner, span)?),
        Rule::else_if_tag => Tag::ElseIf(required_pipeline(&mut inner, span)?),
        Rule::else_with_tag => Tag::ElseWith(required_pipeline(&mut inner, span)?),
        Rule::else_tag => Tag::Else,
        Rule::range_tag => Tag::Range(required_pipeline(&mut inner, span)?),
        Rule::with_tag => Tag::With(required_pipeline(&mut inner, span)?),
        Rule::end_tag => Tag::End,
        Rule::pipeline => {
            // The pair itself is the pipeline.
            return build_pipeline_from_commands(inner, span).map(Tag::Print);
        }
        other => {
            return Err(SyntaxError::at(
                span,
                format!("unexpected {:?} in action", other),
            ))
        }
    };
    Ok(tag)
}

fn required_pipeline(
    inner: &mut Pairs<'_, Rule>,
    span: Span,
) -> std::result::Result<Pipeline, SyntaxError> {
    inner
        .next()
        .ok_or_else(|| SyntaxError::at(span, "missing pipeline"))
        .and_then(build_pipeline)
}

fn build_pipeline(pair: Pair<'_, Rule>) -> std::result::Result<Pipeline, SyntaxError> {
    let span = span_of(&pair);
    build_pipeline_from_commands(pair.into_inner(), span)
}

fn build_pipeline_from_commands(
    commands: Pairs<'_, Rule>,
    span: Span,
) -> std::result::Result<Pipeline, SyntaxError> {
    let mut built = Vec::new();
    for command in commands {
        let args = command
            .into_inner()
            .map(build_operand)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        built.push(Command { args });
    }
    if built.is_empty() {
        return Err(SyntaxError::at(span, "empty pipeline"));
    }
    Ok(Pipeline { commands: built })
}

fn build_operand(pair: Pair<'_, Rule>) -> std::result::Result<Operand, SyntaxError> {
    let span = span_of(&pair);
    let operand = match pair.as_rule() {
        Rule::dot => Operand::Dot,
        Rule::field => Operand::Field(pair.into_inner().map(|p| p.as_str().to_string()).collect()),
        Rule::root => Operand::Root(pair.into_inner().map(|p| p.as_str().to_string()).collect()),
        Rule::string => Operand::String(string_literal(pair)?),
        Rule::number => Operand::Number(number_literal(pair.as_str(), span)?),
        Rule::boolean => Operand::Bool(pair.as_str() == "true"),
        Rule::nil => Operand::Nil,
        Rule::function => {
            let name = pair.as_str();
            if !is_builtin(name) {
                return Err(SyntaxError::at(span, format!("function {:?} not defined", name)));
            }
            Operand::Function(name.to_string())
        }
        Rule::paren => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| SyntaxError::at(span, "empty parenthesis"))?;
            Operand::Pipeline(Box::new(build_pipeline(inner)?))
        }
        other => {
            return Err(SyntaxError::at(
                span,
                format!("unexpected {:?} in pipeline", other),
            ))
        }
    };
    Ok(operand)
}

fn number_literal(text: &str, span: Span) -> std::result::Result<serde_json::Number, SyntaxError> {
    let invalid = || SyntaxError::at(span, format!("invalid number {}", text));
    if text.contains(['.', 'e', 'E']) {
        let value: f64 = text.parse().map_err(|_| invalid())?;
        serde_json::Number::from_f64(value).ok_or_else(invalid)
    } else if let Ok(value) = text.parse::<i64>() {
        Ok(value.into())
    } else {
        text.parse::<u64>().map(Into::into).map_err(|_| invalid())
    }
}

fn string_literal(pair: Pair<'_, Rule>) -> std::result::Result<String, SyntaxError> {
    let span = span_of(&pair);
    // string -> quoted|raw_string -> *_inner
    let literal = match pair.as_rule() {
        Rule::string => pair
            .into_inner()
            .next()
            .ok_or_else(|| SyntaxError::at(span, "empty string literal"))?,
        _ => pair,
    };
    let kind = literal.as_rule();
    let body = literal
        .into_inner()
        .next()
        .map(|p| p.as_str())
        .unwrap_or_default();

    if kind == Rule::raw_string {
        return Ok(body.to_string());
    }

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(c @ ('\\' | '"' | '\'')) => out.push(c),
            Some(other) => {
                return Err(SyntaxError::at(
                    span,
                    format!("unknown escape sequence \\{}", other),
                ))
            }
            None => return Err(SyntaxError::at(span, "unterminated escape sequence")),
        }
    }
    Ok(out)
}

/// Applies `{{-` and `-}}`: strip all whitespace from the adjacent text.
fn apply_trim_markers(items: &mut Vec<Item>) {
    for idx in 0..items.len() {
        let (trim_left, trim_right) = items[idx].trims();
        if trim_left && idx > 0 {
            if let Item::Text(text) = &mut items[idx - 1] {
                let kept = text.trim_end().len();
                text.truncate(kept);
            }
        }
        if trim_right {
            if let Some(Item::Text(text)) = items.get_mut(idx + 1) {
                *text = text.trim_start().to_string();
            }
        }
    }
    items.retain(|item| !matches!(item, Item::Text(text) if text.is_empty()));
}

#[derive(Debug)]
enum BlockKind {
    Define(String),
    If(Pipeline),
    Range(Pipeline),
    With(Pipeline),
}

impl BlockKind {
    fn keyword(&self) -> &'static str {
        match self {
            BlockKind::Define(_) => "define",
            BlockKind::If(_) => "if",
            BlockKind::Range(_) => "range",
            BlockKind::With(_) => "with",
        }
    }
}

#[derive(Debug)]
struct Block {
    kind: BlockKind,
    span: Span,
    body: Vec<Node>,
    else_body: Option<Vec<Node>>,
    /// Opened by `{{else if}}`/`{{else with}}`, so it shares its parent's `{{end}}`.
    chained: bool,
}

impl Block {
    fn new(kind: BlockKind, span: Span, chained: bool) -> Self {
        Self {
            kind,
            span,
            body: Vec::new(),
            else_body: None,
            chained,
        }
    }

    fn target(&mut self) -> &mut Vec<Node> {
        match self.else_body.as_mut() {
            Some(else_body) => else_body,
            None => &mut self.body,
        }
    }
}

struct ForestBuilder {
    forest: Forest,
    top: Vec<Node>,
    stack: Vec<Block>,
}

impl ForestBuilder {
    fn push(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(block) => block.target().push(node),
            None => self.top.push(node),
        }
    }

    fn open(&mut self, block: Block) -> std::result::Result<(), SyntaxError> {
        if matches!(block.kind, BlockKind::Define(_)) && !self.stack.is_empty() {
            return Err(SyntaxError::at(
                block.span,
                "{{define}} is only allowed at the top level",
            ));
        }
        self.stack.push(block);
        Ok(())
    }

    fn begin_else(&mut self, span: Span) -> std::result::Result<&mut Block, SyntaxError> {
        let block = self
            .stack
            .last_mut()
            .ok_or_else(|| SyntaxError::at(span, "unexpected {{else}}"))?;
        if matches!(block.kind, BlockKind::Define(_)) {
            return Err(SyntaxError::at(span, "unexpected {{else}} in {{define}}"));
        }
        if block.else_body.is_some() {
            return Err(SyntaxError::at(span, "multiple {{else}} in one block"));
        }
        block.else_body = Some(Vec::new());
        Ok(block)
    }

    fn close(&mut self, span: Span) -> std::result::Result<(), SyntaxError> {
        loop {
            let block = self
                .stack
                .pop()
                .ok_or_else(|| SyntaxError::at(span, "unexpected {{end}}"))?;
            let chained = block.chained;
            let node = match block.kind {
                BlockKind::Define(name) => {
                    if self.forest.contains_key(&name) {
                        return Err(SyntaxError::at(
                            block.span,
                            format!("multiple definition of template {:?}", name),
                        ));
                    }
                    self.forest
                        .insert(name.clone(), TemplateTree::new(name, block.body));
                    return Ok(());
                }
                BlockKind::If(pipeline) => Node::If {
                    pipeline,
                    then_branch: block.body,
                    else_branch: block.else_body,
                    span: block.span,
                },
                BlockKind::Range(pipeline) => Node::Range {
                    pipeline,
                    body: block.body,
                    else_branch: block.else_body,
                    span: block.span,
                },
                BlockKind::With(pipeline) => Node::With {
                    pipeline,
                    body: block.body,
                    else_branch: block.else_body,
                    span: block.span,
                },
            };
            self.push(node);
            if !chained {
                return Ok(());
            }
        }
    }
}

fn build_forest(name: &str, items: Vec<Item>) -> std::result::Result<Forest, SyntaxError> {
    let mut builder = ForestBuilder {
        forest: Forest::new(),
        top: Vec::new(),
        stack: Vec::new(),
    };

    for item in items {
        let (tag, span) = match item {
            Item::Text(content) => {
                builder.push(Node::Text { content });
                continue;
            }
            Item::Comment { .. } => continue,
            Item::Action { tag, span, .. } => (tag, span),
        };

        match tag {
            Tag::Define(tree) => builder.open(Block::new(BlockKind::Define(tree), span, false))?,
            Tag::If(pipeline) => builder.open(Block::new(BlockKind::If(pipeline), span, false))?,
            Tag::Range(pipeline) => {
                builder.open(Block::new(BlockKind::Range(pipeline), span, false))?
            }
            Tag::With(pipeline) => {
                builder.open(Block::new(BlockKind::With(pipeline), span, false))?
            }
            Tag::Else => {
                builder.begin_else(span)?;
            }
            Tag::ElseIf(pipeline) => {
                let parent = builder.begin_else(span)?;
                if !matches!(parent.kind, BlockKind::If(_)) {
                    return Err(SyntaxError::at(span, "{{else if}} outside of {{if}}"));
                }
                builder.open(Block::new(BlockKind::If(pipeline), span, true))?;
            }
            Tag::ElseWith(pipeline) => {
                let parent = builder.begin_else(span)?;
                if !matches!(parent.kind, BlockKind::With(_)) {
                    return Err(SyntaxError::at(span, "{{else with}} outside of {{with}}"));
                }
                builder.open(Block::new(BlockKind::With(pipeline), span, true))?;
            }
            Tag::End => builder.close(span)?,
            Tag::Invoke {
                name: target,
                pipeline,
                optional,
            } => builder.push(Node::Invoke {
                name: target,
                pipeline,
                optional,
                span,
            }),
            Tag::Print(pipeline) => builder.push(Node::Interpolation { pipeline, span }),
        }
    }

    if let Some(block) = builder.stack.last() {
        return Err(SyntaxError::at(
            block.span,
            format!("unclosed {{{{{}}}}}", block.kind.keyword()),
        ));
    }

    if builder.forest.contains_key(name) {
        return Err(SyntaxError::at(
            Span::new(0, 0, 1, 1),
            format!("multiple definition of template {:?}", name),
        ));
    }
    builder
        .forest
        .insert(name.to_string(), TemplateTree::new(name, builder.top));
    Ok(builder.forest)
}
