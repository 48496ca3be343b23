//! Secret redaction for anything that might end up in logs.

use serde_json::{Map, Value};

/// Replacement written in place of secret values.
pub const REDACTED: &str = "***REDACTED***";

const SECRET_MARKERS: &[&str] = &[
    "key",
    "token",
    "secret",
    "password",
    "authorization",
    "credential",
];

/// Whether a parameter name looks like it carries a secret (`api_key`, `access_token`, ...).
pub fn is_secret_key(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SECRET_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Copy of `params` with every secret-looking value replaced by [`REDACTED`].
///
/// Nested objects and arrays are walked recursively.
pub fn redact_params(params: &Map<String, Value>) -> Map<String, Value> {
    params
        .iter()
        .map(|(name, value)| {
            let value = if is_secret_key(name) {
                Value::String(REDACTED.to_owned())
            } else {
                redact_value(value)
            };
            (name.clone(), value)
        })
        .collect()
}

fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(redact_params(map)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        other => other.clone(),
    }
}

/// Dotted paths (`prefix.name.inner`) of every secret-looking key under `params`.
pub fn secret_paths(prefix: &str, params: &Map<String, Value>) -> Vec<String> {
    let mut out = Vec::new();
    collect_secret_paths(prefix, params, &mut out);
    out
}

fn collect_secret_paths(prefix: &str, params: &Map<String, Value>, out: &mut Vec<String>) {
    for (name, value) in params {
        let path = format!("{prefix}.{name}");
        if is_secret_key(name) {
            out.push(path);
        } else if let Value::Object(inner) = value {
            collect_secret_paths(&path, inner, out);
        }
    }
}
