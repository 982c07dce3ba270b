//! Canonical request identity.
//!
//! Response caching and in-flight deduplication both key on a request
//! signature. Two logically identical requests must produce the same
//! signature regardless of how their parameter maps were built, so query
//! pairs are sorted and JSON bodies are serialized with recursively sorted
//! object keys.

use std::fmt;

use serde_json::Value;

/// Canonical string identity of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSignature(String);

impl RequestSignature {
    /// Computes the signature for a request.
    #[must_use]
    pub fn compute(
        method: &str,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Self {
        let mut pairs: Vec<&(String, String)> = query.iter().collect();
        pairs.sort();

        let mut out = String::with_capacity(64);
        out.push_str(&method.to_ascii_uppercase());
        out.push(' ');
        out.push_str(path);
        out.push('?');
        for (i, (k, v)) in pairs.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            out.push_str(k);
            out.push('=');
            out.push_str(v);
        }
        out.push('#');
        if let Some(body) = body {
            out.push_str(&canonical_json(body));
        }
        Self(out)
    }

    /// Signature for a request identified by method and path only, used to
    /// build invalidation prefixes.
    #[must_use]
    pub fn prefix(method: &str, path: &str) -> String {
        format!("{} {path}", method.to_ascii_uppercase())
    }

    /// The signature as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this signature starts with `prefix`.
    #[must_use]
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serializes a JSON value with object keys recursively sorted.
///
/// `serde_json`'s map ordering depends on enabled cargo features, so the
/// sort is done explicitly here to keep signatures deterministic.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            // serde_json escapes the string the same way it would in a document
            out.push_str(&Value::String(s.clone()).to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}
