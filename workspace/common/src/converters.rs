//! Converters from free-form JSON values to CSV cells.
//!
//! Clients post loosely typed payloads: a temperature may arrive as the
//! string `"28.5"` or the number `28.5`. Both land in the file as the same
//! text.

use serde_json::Value;

/// Renders a JSON value as a single CSV cell.
///
/// Strings pass through unchanged and numbers use their JSON text.
/// Booleans are written `True`/`False`, matching files produced by the
/// previous backend. `null` and missing values become an empty cell. Nested
/// arrays and objects are written as compact JSON.
pub fn json_to_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Like [`json_to_cell`], but a key that is absent yields `default`.
/// A key that is present with `null` still yields an empty cell.
pub fn json_to_cell_or(value: Option<&Value>, default: &str) -> String {
    match value {
        None => default.to_string(),
        present => json_to_cell(present),
    }
}
