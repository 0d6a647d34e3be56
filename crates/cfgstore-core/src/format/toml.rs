//! TOML documents.
//!
//! TOML is stricter than the tree it is rendered from: the root must be a
//! table and there is no null.  A tree containing null cannot be saved as
//! TOML; the render error surfaces from `save` and the file is left untouched.
//!
//! Datetimes have no counterpart in the tree.  They arrive as a one-key
//! object `{ "$__toml_private_datetime": "<text>" }`, which still deserializes
//! into `toml::value::Datetime`, and render turns that object back into a bare
//! TOML datetime.

use ::toml::value::{Datetime, Value as TomlValue};
use serde_json::{Map, Number, Value};

use super::{DocumentFormat, FormatError};

/// Key of the object the `toml` crate uses to carry a datetime through serde.
const DATETIME_FIELD: &str = "$__toml_private_datetime";

/// TOML rendered with `toml::to_string_pretty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Toml;

impl DocumentFormat for Toml {
    const TAG: &'static str = "toml";
    const EXTENSIONS: &'static [&'static str] = &["toml"];

    fn parse(text: &str) -> Result<Value, FormatError> {
        let table: ::toml::Table =
            ::toml::from_str(text).map_err(|e| FormatError::parse(Self::TAG, e))?;
        serde_json::to_value(table).map_err(|e| FormatError::parse(Self::TAG, e))
    }

    fn render(tree: &Value) -> Result<String, FormatError> {
        let Value::Object(map) = tree else {
            return Err(FormatError::render(Self::TAG, "top-level value is not a table"));
        };
        let table = to_toml_table(map)?;
        ::toml::to_string_pretty(&table).map_err(|e| FormatError::render(Self::TAG, e))
    }
}

fn to_toml_table(map: &Map<String, Value>) -> Result<::toml::Table, FormatError> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), to_toml(value)?)))
        .collect()
}

fn to_toml(value: &Value) -> Result<TomlValue, FormatError> {
    Ok(match value {
        Value::Null => {
            return Err(FormatError::render(Toml::TAG, "TOML has no null value"));
        }
        Value::Bool(b) => TomlValue::Boolean(*b),
        Value::Number(n) => to_toml_number(n)?,
        Value::String(s) => TomlValue::String(s.clone()),
        Value::Array(items) => {
            TomlValue::Array(items.iter().map(to_toml).collect::<Result<_, _>>()?)
        }
        Value::Object(map) => match datetime_of(map) {
            Some(datetime) => TomlValue::Datetime(datetime),
            None => TomlValue::Table(to_toml_table(map)?),
        },
    })
}

fn to_toml_number(n: &Number) -> Result<TomlValue, FormatError> {
    if let Some(i) = n.as_i64() {
        Ok(TomlValue::Integer(i))
    } else if n.is_u64() {
        Err(FormatError::render(
            Toml::TAG,
            format!("integer {n} does not fit in a TOML integer"),
        ))
    } else {
        n.as_f64()
            .map(TomlValue::Float)
            .ok_or_else(|| FormatError::render(Toml::TAG, format!("unsupported number {n}")))
    }
}

/// The datetime carried by a `toml` datetime marker object, if `map` is one.
fn datetime_of(map: &Map<String, Value>) -> Option<Datetime> {
    if map.len() != 1 {
        return None;
    }
    match map.get(DATETIME_FIELD)? {
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}
