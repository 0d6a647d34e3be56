//! JSON-pointer (RFC 6901) navigation used by the tracked mutation helpers.
//!
//! Reads go through `serde_json::Value::pointer`; this module only adds the
//! two writes the standard library of `serde_json` does not offer: inserting
//! at a path (creating intermediate objects) and removing at a path.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised when a pointer cannot be applied to the document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PointerError {
    /// The pointer is neither empty nor starts with `/`.
    #[error("JSON pointer must be empty or start with '/': {0:?}")]
    Malformed(String),

    /// The empty pointer addresses the root, which cannot be set or removed.
    #[error("the document root cannot be replaced or removed through a pointer")]
    Root,

    /// A path segment runs into a string, number, bool or null.
    #[error("cannot descend into a scalar value at {0:?}")]
    NotAContainer(String),

    /// A segment addressing an array is not a valid index.
    #[error("invalid array index {token:?} at {at:?}")]
    BadIndex { at: String, token: String },
}

/// Splits `pointer` into unescaped reference tokens.
pub(crate) fn tokens(pointer: &str) -> Result<Vec<String>, PointerError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let rest = pointer
        .strip_prefix('/')
        .ok_or_else(|| PointerError::Malformed(pointer.to_string()))?;
    Ok(rest.split('/').map(unescape).collect())
}

fn unescape(token: &str) -> String {
    // Order matters: "~01" must decode to "~1", not "/".
    token.replace("~1", "/").replace("~0", "~")
}

fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Re-assembles the first `depth` tokens into a pointer for error messages.
fn prefix(tokens: &[String], depth: usize) -> String {
    tokens[..depth]
        .iter()
        .map(|t| format!("/{}", escape(t)))
        .collect()
}

fn array_index(tokens: &[String], depth: usize, len: usize) -> Result<usize, PointerError> {
    let token = &tokens[depth];
    token
        .parse::<usize>()
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| PointerError::BadIndex {
            at: prefix(tokens, depth),
            token: token.clone(),
        })
}

/// Writes `value` at `tokens`, creating missing intermediate objects.
///
/// Returns the value previously stored at that location, if any.  The token
/// `-` on an array appends.
pub(crate) fn set_at(
    root: &mut Value,
    tokens: &[String],
    value: Value,
) -> Result<Option<Value>, PointerError> {
    let (last, parents) = tokens.split_last().ok_or(PointerError::Root)?;

    let mut cursor = root;
    for depth in 0..parents.len() {
        cursor = match cursor {
            Value::Object(map) => map
                .entry(tokens[depth].clone())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                let index = array_index(tokens, depth, items.len())?;
                &mut items[index]
            }
            _ => return Err(PointerError::NotAContainer(prefix(tokens, depth))),
        };
    }

    let depth = parents.len();
    match cursor {
        Value::Object(map) => Ok(map.insert(last.clone(), value)),
        Value::Array(items) if last == "-" => {
            items.push(value);
            Ok(None)
        }
        Value::Array(items) => {
            let index = array_index(tokens, depth, items.len())?;
            Ok(Some(std::mem::replace(&mut items[index], value)))
        }
        _ => Err(PointerError::NotAContainer(prefix(tokens, depth))),
    }
}

/// Removes the value at `pointer`, returning it.  Missing paths yield `None`.
pub(crate) fn remove_at(root: &mut Value, pointer: &str) -> Result<Option<Value>, PointerError> {
    if tokens(pointer)?.is_empty() {
        return Err(PointerError::Root);
    }
    // `tokens` guaranteed a leading '/', so a split point exists.
    let split = pointer.rfind('/').ok_or(PointerError::Root)?;
    let last = unescape(&pointer[split + 1..]);

    let Some(parent) = root.pointer_mut(&pointer[..split]) else {
        return Ok(None);
    };
    let removed = match parent {
        Value::Object(map) => map.remove(&last),
        Value::Array(items) => match last.parse::<usize>() {
            Ok(index) if index < items.len() => Some(items.remove(index)),
            _ => None,
        },
        _ => None,
    };
    Ok(removed)
}
