//! RFC 6901 JSON Pointer parsing and resolution.
//!
//! [`JsonPointer`] is a parsed token list; [`at`]/[`at_mut`] walk a
//! `serde_json::Value` tree and return `None` (the "Missing" sentinel from
//! the spec this crate realizes) rather than an error when the addressed
//! location does not exist; traversal itself never fails, only array
//! index *tokens* can be malformed.

use serde_json::Value;
use thiserror::Error;

/// Reason a pointer string or an index token failed to parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PointerError {
    #[error("json pointer must be empty or begin with '/': {0:?}")]
    InvalidPointer(String),
    #[error("array index token is not a valid RFC 6901 index: {0:?}")]
    InvalidIndex(String),
}

/// A parsed RFC 6901 pointer: an ordered list of unescaped tokens. The
/// empty token list addresses the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonPointer(Vec<String>);

impl JsonPointer {
    /// The pointer addressing the document root.
    pub fn root() -> Self {
        JsonPointer(Vec::new())
    }

    /// Builds a pointer directly from already-unescaped tokens.
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        JsonPointer(tokens)
    }

    /// Parses the wire form of a pointer (`""`, `/a/b`, `/a~1b/c~0d`, ...).
    pub fn parse(raw: &str) -> Result<Self, PointerError> {
        if raw.is_empty() {
            return Ok(JsonPointer::root());
        }
        if !raw.starts_with('/') {
            return Err(PointerError::InvalidPointer(raw.to_owned()));
        }
        let tokens = raw[1..]
            .split('/')
            .map(unescape_token)
            .collect::<Vec<_>>();
        Ok(JsonPointer(tokens))
    }

    /// True if this pointer addresses the document root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw (unescaped) tokens.
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// The last token, or `None` for the root pointer.
    pub fn last_token(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// The pointer with its last token dropped. The parent of the root
    /// pointer is the root pointer itself.
    pub fn parent(&self) -> JsonPointer {
        if self.0.is_empty() {
            self.clone()
        } else {
            JsonPointer(self.0[..self.0.len() - 1].to_vec())
        }
    }

    /// Appends a token, returning a new, longer pointer.
    pub fn child(&self, token: impl Into<String>) -> JsonPointer {
        let mut tokens = self.0.clone();
        tokens.push(token.into());
        JsonPointer(tokens)
    }

    /// True if `self` is a proper prefix of `other` (i.e. `other` addresses
    /// a location strictly inside the subtree rooted at `self`).
    pub fn is_proper_prefix_of(&self, other: &JsonPointer) -> bool {
        self.0.len() < other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Re-escapes the pointer back to its RFC 6901 wire form.
    pub fn to_wire_string(&self) -> String {
        let mut out = String::new();
        for token in &self.0 {
            out.push('/');
            out.push_str(&escape_token(token));
        }
        out
    }
}

impl std::fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wire_string())
    }
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Parses an array-index token (`"0"`, `"12"`, ...), rejecting empty
/// strings, non-digit characters, and leading zeros (other than the
/// literal `"0"`). Does not apply any bounds check; callers compare the
/// result against the array length themselves, since the acceptable bound
/// differs between lookup (`< len`) and insertion (`<= len`).
pub fn decode_index(token: &str) -> Result<usize, PointerError> {
    if token == "0" {
        return Ok(0);
    }
    if token.is_empty() || token.starts_with('0') || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PointerError::InvalidIndex(token.to_owned()));
    }
    token
        .parse::<usize>()
        .map_err(|_| PointerError::InvalidIndex(token.to_owned()))
}

/// True if `token` is the literal `-`, denoting the array append position.
pub fn is_append(token: &str) -> bool {
    token == "-"
}

/// Resolves `pointer` against `node`, returning `None` (the Missing
/// sentinel) if any segment does not exist. Never mutates `node`.
pub fn at<'v>(node: &'v Value, pointer: &JsonPointer) -> Option<&'v Value> {
    let mut current = node;
    for token in &pointer.0 {
        current = step(current, token)?;
    }
    Some(current)
}

/// Mutable counterpart of [`at`], used by the patch engine to edit
/// in place.
pub fn at_mut<'v>(node: &'v mut Value, pointer: &JsonPointer) -> Option<&'v mut Value> {
    let mut current = node;
    for token in &pointer.0 {
        current = step_mut(current, token)?;
    }
    Some(current)
}

fn step<'v>(node: &'v Value, token: &str) -> Option<&'v Value> {
    match node {
        Value::Object(map) => map.get(token),
        Value::Array(arr) => {
            if is_append(token) {
                None
            } else {
                let idx = decode_index(token).ok()?;
                arr.get(idx)
            }
        }
        _ => None,
    }
}

fn step_mut<'v>(node: &'v mut Value, token: &str) -> Option<&'v mut Value> {
    match node {
        Value::Object(map) => map.get_mut(token),
        Value::Array(arr) => {
            if is_append(token) {
                None
            } else {
                let idx = decode_index(token).ok()?;
                arr.get_mut(idx)
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_pointer_addresses_root() {
        let pointer = JsonPointer::parse("").unwrap();
        assert!(pointer.is_root());
        let doc = json!({"a": 1});
        assert_eq!(at(&doc, &pointer), Some(&doc));
    }

    #[test]
    fn parent_of_root_is_root() {
        let pointer = JsonPointer::root();
        assert_eq!(pointer.parent(), JsonPointer::root());
    }

    #[test]
    fn escape_round_trip_is_an_involution() {
        let pointer = JsonPointer::parse("/a~1b/c~0d").unwrap();
        assert_eq!(pointer.tokens(), &["a/b", "c~d"]);
        assert_eq!(pointer.to_wire_string(), "/a~1b/c~0d");
    }

    #[test]
    fn at_returns_missing_for_absent_key() {
        let doc = json!({"a": 1});
        let pointer = JsonPointer::parse("/b").unwrap();
        assert_eq!(at(&doc, &pointer), None);
    }

    #[test]
    fn at_resolves_array_index() {
        let doc = json!({"a": [10, 20, 30]});
        let pointer = JsonPointer::parse("/a/1").unwrap();
        assert_eq!(at(&doc, &pointer), Some(&json!(20)));
    }

    #[test]
    fn append_token_never_resolves_to_a_node() {
        let doc = json!({"a": [1, 2, 3]});
        let pointer = JsonPointer::parse("/a/-").unwrap();
        assert_eq!(at(&doc, &pointer), None);
    }

    #[test]
    fn decode_index_rejects_leading_zero() {
        assert!(decode_index("01").is_err());
        assert!(decode_index("0").is_ok());
    }

    #[test]
    fn proper_prefix_detection() {
        let a = JsonPointer::parse("/a").unwrap();
        let ab = JsonPointer::parse("/a/b").unwrap();
        assert!(a.is_proper_prefix_of(&ab));
        assert!(!ab.is_proper_prefix_of(&a));
        assert!(!a.is_proper_prefix_of(&a));
    }
}
