//! Text encodings of the configuration tree.
//!
//! Every format converts between file text and the shared in-memory tree
//! (`serde_json::Value`).  The store never looks inside the text itself, so
//! adding a format means implementing [`DocumentFormat`] and registering it.
//!
//! Rendering must be stable: pretty printed, object keys in sorted order,
//! trailing newline.  Two saves of the same tree produce identical bytes, which
//! keeps settings files meaningful under diff and version control.

use serde_json::Value;
use thiserror::Error;

pub mod json;
pub mod toml;

/// Error type for converting between text and the tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
    /// The text is not a valid document in this format.
    #[error("invalid {tag} document: {message}")]
    Parse { tag: &'static str, message: String },

    /// The tree holds something this format cannot express.
    #[error("cannot render document as {tag}: {message}")]
    Render { tag: &'static str, message: String },
}

impl FormatError {
    pub(crate) fn parse(tag: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            tag,
            message: err.to_string(),
        }
    }

    pub(crate) fn render(tag: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Render {
            tag,
            message: err.to_string(),
        }
    }
}

/// A tree-structured text format a provider can persist documents in.
pub trait DocumentFormat: 'static {
    /// Short registry name, e.g. `"json"`.
    const TAG: &'static str;

    /// File extensions (without the dot, lowercase) this format claims.
    const EXTENSIONS: &'static [&'static str];

    /// Parses file text into a tree.  The root must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Parse`] for malformed text or a non-object root.
    fn parse(text: &str) -> Result<Value, FormatError>;

    /// Renders a tree as pretty, deterministic text.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Render`] if the tree cannot be expressed in this
    /// format.
    fn render(tree: &Value) -> Result<String, FormatError>;

    /// Decodes raw file bytes, rejecting invalid UTF-8 and skipping a BOM.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Parse`] when the bytes are not UTF-8 or
    /// [`parse`](Self::parse) fails.
    fn decode(bytes: &[u8]) -> Result<Value, FormatError> {
        let text = std::str::from_utf8(bytes).map_err(|e| FormatError::parse(Self::TAG, e))?;
        Self::parse(text.strip_prefix('\u{feff}').unwrap_or(text))
    }
}
