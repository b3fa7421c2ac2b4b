//! Secondary parser for the `<Class>.<method>(<args>)` call form.
//!
//! Supported argument shapes:
//!
//! - `User.all()`, `User.count()`, `User.create()`
//! - `User.show("id")`, `User.destroy("id")`
//! - `User.update("id", "attribute", "value")`
//! - `User.update("id", {"attribute": value, ...})` where the mapping is a JSON
//!   object
//!
//! Positional arguments are separated by commas and may be wrapped in single
//! or double quotes. Anything else is rejected, and the result is always one of
//! the canonical [`Command`]s so validation stays in one place.

use serde_json::{Map, Value};

use super::common::Command;

#[derive(Debug, Clone, PartialEq)]
struct DottedCall<'a> {
    class_name: &'a str,
    method: &'a str,
    positionals: Vec<String>,
    mapping: Option<Map<String, Value>>,
}

pub fn parse(line: &str) -> Option<Command> {
    let call = split_call(line.trim())?;
    let class_name = Some(call.class_name.to_string());
    let arg = |index: usize| call.positionals.get(index).cloned();

    if call.mapping.is_some() && call.method != "update" {
        return None;
    }

    let command = match call.method {
        "all" => Command::All { class_name },
        "count" => Command::Count { class_name },
        "create" => Command::Create { class_name },
        "show" => Command::Show { class_name, id: arg(0) },
        "destroy" => Command::Destroy { class_name, id: arg(0) },
        "update" => match call.mapping {
            Some(attributes) => Command::UpdateMany { class_name, id: arg(0), attributes },
            None => Command::Update {
                class_name,
                id: arg(0),
                attribute: arg(1),
                value: arg(2),
            },
        },
        _ => return None,
    };
    Some(command)
}

fn split_call(line: &str) -> Option<DottedCall<'_>> {
    let body = line.strip_suffix(')')?;
    let (head, inner) = body.split_once('(')?;
    let (class_name, method) = head.split_once('.')?;

    let is_word = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_');
    if !is_word(class_name) || !is_word(method) {
        return None;
    }

    let (positional_part, mapping) = match inner.find('{') {
        Some(brace) => {
            let mapping: Map<String, Value> = serde_json::from_str(inner[brace..].trim()).ok()?;
            let positional_part = inner[..brace].trim_end();
            let positional_part = positional_part.strip_suffix(',')?;
            (positional_part, Some(mapping))
        }
        None => (inner, None),
    };

    Some(DottedCall {
        class_name,
        method,
        positionals: split_positionals(positional_part)?,
        mapping,
    })
}

/// Comma separated values with optional surrounding quotes. Commas inside
/// quotes belong to the value.
fn split_positionals(input: &str) -> Option<Vec<String>> {
    if input.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut values = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(c);
                current.push(c);
            }
            (None, ',') => values.push(unquote(&std::mem::take(&mut current))?),
            (None, c) => current.push(c),
        }
    }

    if quote.is_some() {
        return None;
    }
    values.push(unquote(&current)?);
    Some(values)
}

fn unquote(raw: &str) -> Option<String> {
    let raw = raw.trim();
    for q in ['"', '\''] {
        if let Some(stripped) = raw.strip_prefix(q) {
            return stripped.strip_suffix(q).map(str::to_string);
        }
    }
    if raw.is_empty() {
        return None;
    }
    Some(raw.to_string())
}
