//! JSON, the reference document format.

use serde_json::Value;

use super::{DocumentFormat, FormatError};

/// Pretty-printed JSON with two-space indentation and sorted keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl DocumentFormat for Json {
    const TAG: &'static str = "json";
    const EXTENSIONS: &'static [&'static str] = &["json", "cfg"];

    fn parse(text: &str) -> Result<Value, FormatError> {
        let tree: Value = serde_json::from_str(text).map_err(|e| FormatError::parse(Self::TAG, e))?;
        if !tree.is_object() {
            return Err(FormatError::parse(Self::TAG, "top-level value is not an object"));
        }
        Ok(tree)
    }

    fn render(tree: &Value) -> Result<String, FormatError> {
        if !tree.is_object() {
            return Err(FormatError::render(Self::TAG, "top-level value is not an object"));
        }
        // serde_json's default map is a BTreeMap, so keys come out sorted.
        let mut text =
            serde_json::to_string_pretty(tree).map_err(|e| FormatError::render(Self::TAG, e))?;
        text.push('\n');
        Ok(text)
    }
}
