//! Filters and functions available to every caster template on top of the
//! MiniJinja builtins.

use cruet::Inflector;
use minijinja::value::{Rest, Value};
use minijinja::{Environment, Error, ErrorKind};

/// Registers the caster function library on `env`.
pub fn register(env: &mut Environment<'static>) {
    env.add_filter("snakecase", |value: String| value.to_snake_case());
    env.add_filter("camelcase", |value: String| value.to_camel_case());
    env.add_filter("kebabcase", |value: String| value.to_kebab_case());
    env.add_filter("pascalcase", |value: String| value.to_pascal_case());
    env.add_filter("screamingsnakecase", |value: String| value.to_screaming_snake_case());
    env.add_filter("titlecase", |value: String| value.to_title_case());
    env.add_filter("nindent", nindent);
    env.add_filter("wrap", wrap);
    env.add_filter("trimprefix", |value: String, prefix: String| {
        match value.strip_prefix(prefix.as_str()) {
            Some(rest) => rest.to_string(),
            None => value,
        }
    });
    env.add_filter("trimsuffix", |value: String, suffix: String| {
        match value.strip_suffix(suffix.as_str()) {
            Some(rest) => rest.to_string(),
            None => value,
        }
    });
    env.add_filter("quote", quote);
    env.add_filter("squote", |value: Value| format!("'{value}'"));
    env.add_function("coalesce", coalesce);
    env.add_function("required", required);
}

/// Starts a new line and indents every line of `value` by `width` spaces.
fn nindent(value: String, width: usize) -> String {
    let pad = " ".repeat(width);
    format!("\n{pad}{}", value.replace('\n', &format!("\n{pad}")))
}

/// Greedy word wrap; existing line breaks are kept.
fn wrap(value: String, width: usize) -> String {
    let width = width.max(1);
    let mut lines = Vec::new();
    for line in value.split('\n') {
        let mut current = String::new();
        for word in line.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines.join("\n")
}

fn quote(value: Value) -> Result<String, Error> {
    serde_json::to_string(&value.to_string()).map_err(|e| {
        Error::new(ErrorKind::InvalidOperation, "cannot quote value").with_source(e)
    })
}

/// Returns the first argument that is set, or undefined when there is none.
/// `0` and `false` count as set.
fn coalesce(values: Rest<Value>) -> Value {
    values.iter().find(|value| is_set(value)).cloned().unwrap_or(Value::UNDEFINED)
}

/// Neither undefined, none, nor an empty string.
fn is_set(value: &Value) -> bool {
    !value.is_undefined() && !value.is_none() && value.as_str() != Some("")
}

/// Fails the render with `message` when `value` is undefined, none or empty.
fn required(message: String, value: Option<Value>) -> Result<Value, Error> {
    match value {
        Some(value) if is_set(&value) => Ok(value),
        _ => Err(Error::new(ErrorKind::InvalidOperation, message)),
    }
}
