// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Built-in template functions and value helpers.

use serde_json::Value;

/// Names accepted in function position. Anything else is rejected by the parser.
pub const BUILTINS: &[&str] = &[
    "and",
    "eq",
    "htmlEncode",
    "index",
    "len",
    "ne",
    "not",
    "or",
    "print",
    "safe",
];

/// Returns true when `name` is a built-in function.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// The result of evaluating a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    /// Plain data, escaped on output when escaping is enabled.
    Data(Value),
    /// Markup that must be written as-is.
    Html(String),
}

impl Evaluated {
    /// Views the result as data. Markup becomes a string.
    pub fn into_value(self) -> Value {
        match self {
            Evaluated::Data(value) => value,
            Evaluated::Html(html) => Value::String(html),
        }
    }

    /// Go-style truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Evaluated::Data(value) => is_truthy(value),
            Evaluated::Html(html) => !html.is_empty(),
        }
    }

    /// Text form without escaping.
    pub fn to_text(&self) -> String {
        match self {
            Evaluated::Data(value) => stringify(value),
            Evaluated::Html(html) => html.clone(),
        }
    }
}

/// Go-style truthiness: false, 0, null and empty collections are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text form of a value. Null prints as nothing; collections print as JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Escapes the five HTML-significant characters.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Short type name used in error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Equality with numeric coercion, so `1` equals `1.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Calls the built-in `name`. The piped value, if any, is already the last argument.
pub fn call(name: &str, args: Vec<Evaluated>) -> Result<Evaluated, String> {
    match name {
        "htmlEncode" => {
            let text: String = args.iter().map(Evaluated::to_text).collect();
            Ok(Evaluated::Html(html_escape(&text)))
        }
        "safe" => {
            let [arg] = exactly::<1>(name, args)?;
            Ok(Evaluated::Html(arg.to_text()))
        }
        "len" => {
            let [arg] = exactly::<1>(name, args)?;
            let len = match arg.into_value() {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                other => return Err(format!("len of {}", kind_of(&other))),
            };
            Ok(Evaluated::Data(Value::from(len)))
        }
        "not" => {
            let [arg] = exactly::<1>(name, args)?;
            Ok(Evaluated::Data(Value::Bool(!arg.is_truthy())))
        }
        "and" | "or" => {
            let want = name == "or";
            let mut last = None;
            for arg in args {
                if arg.is_truthy() == want {
                    return Ok(arg);
                }
                last = Some(arg);
            }
            last.ok_or_else(|| format!("wrong number of args for {}: want at least 1 got 0", name))
        }
        "eq" | "ne" => {
            if args.len() < 2 {
                return Err(format!(
                    "wrong number of args for {}: want at least 2 got {}",
                    name,
                    args.len()
                ));
            }
            let mut values = args.into_iter().map(Evaluated::into_value);
            let first = values.next().unwrap_or(Value::Null);
            let mut rest = values;
            let equal = if name == "eq" {
                rest.any(|other| values_equal(&first, &other))
            } else {
                !rest.all(|other| values_equal(&first, &other))
            };
            Ok(Evaluated::Data(Value::Bool(equal)))
        }
        "index" => {
            let mut args = args.into_iter().map(Evaluated::into_value);
            let mut current = args
                .next()
                .ok_or_else(|| "wrong number of args for index: want at least 1 got 0".to_string())?;
            for key in args {
                current = index_value(current, &key)?;
            }
            Ok(Evaluated::Data(current))
        }
        "print" => {
            let mut out = String::new();
            let mut prev_was_string = true;
            for (i, arg) in args.iter().enumerate() {
                let is_string = matches!(arg, Evaluated::Html(_) | Evaluated::Data(Value::String(_)));
                if i > 0 && !is_string && !prev_was_string {
                    out.push(' ');
                }
                out.push_str(&arg.to_text());
                prev_was_string = is_string;
            }
            Ok(Evaluated::Data(Value::String(out)))
        }
        other => Err(format!("function {:?} not defined", other)),
    }
}

fn exactly<const N: usize>(name: &str, args: Vec<Evaluated>) -> Result<[Evaluated; N], String> {
    let got = args.len();
    args.try_into()
        .map_err(|_| format!("wrong number of args for {}: want {} got {}", name, N, got))
}

fn index_value(collection: Value, key: &Value) -> Result<Value, String> {
    match (collection, key) {
        (Value::Array(mut items), Value::Number(n)) => {
            let len = items.len();
            let idx = n
                .as_u64()
                .and_then(|i| usize::try_from(i).ok())
                .filter(|i| *i < len)
                .ok_or_else(|| format!("index out of range: {}", n))?;
            Ok(items.swap_remove(idx))
        }
        (Value::Object(mut map), Value::String(k)) => Ok(map.remove(k).unwrap_or(Value::Null)),
        (Value::Null, _) => Ok(Value::Null),
        (other, key) => Err(format!(
            "can't index item of type {} with {}",
            kind_of(&other),
            kind_of(key)
        )),
    }
}
