//! Scoped-variable interpolation for template strings.
use serde_json::Value;

use crate::query::ScopedVars;

/// Interpolate scoped variables into a template string.
///
/// Both `$name` and `${name}` forms are recognized. Variables missing from
/// `scoped_vars` are left intact, as are stray `$` characters.
///
/// # Example
///
/// ```rust
/// use panel_query_runner::query::{template::replace, ScopedVar, ScopedVars};
///
/// let mut vars = ScopedVars::default();
/// vars.insert("interval".to_string(), ScopedVar::new("30s"));
///
/// assert_eq!(replace("$interval", &vars), "30s");
/// assert_eq!(replace("rate[${interval}]", &vars), "rate[30s]");
/// assert_eq!(replace("$unknown", &vars), "$unknown");
/// ```
pub fn replace(template: &str, scoped_vars: &ScopedVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let braced = matches!(chars.peek(), Some((_, '{')));
        if braced {
            chars.next();
        }
        let name_start = chars.peek().map(|(i, _)| *i).unwrap_or(template.len());
        let mut name_end = name_start;
        while let Some((i, c)) = chars.peek().copied() {
            if c.is_ascii_alphanumeric() || c == '_' {
                chars.next();
                name_end = i + c.len_utf8();
            } else {
                break;
            }
        }
        let name = &template[name_start..name_end];
        let closed = if braced {
            matches!(chars.peek(), Some((_, '}')))
        } else {
            true
        };
        match scoped_vars.get(name) {
            Some(var) if !name.is_empty() && closed => {
                if braced {
                    chars.next();
                }
                out.push_str(&value_to_string(&var.value));
            }
            _ => {
                // No substitution: emit the original text and carry on.
                out.push_str(&template[start..name_end]);
            }
        }
    }
    out
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
