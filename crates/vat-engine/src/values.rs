//! Cell-level value helpers shared by the selector and annotation code.
//!
//! List-valued cells are stored as JSON arrays inside string columns; the
//! helpers here parse and re-encode them.

use polars::prelude::{AnyValue, DataFrame};

/// Converts a cell value to a String representation.
/// Returns empty string for Null, properly formats numeric types.
pub fn any_to_string(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int8(v) => v.to_string(),
        AnyValue::Int16(v) => v.to_string(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::UInt8(v) => v.to_string(),
        AnyValue::UInt16(v) => v.to_string(),
        AnyValue::UInt32(v) => v.to_string(),
        AnyValue::UInt64(v) => v.to_string(),
        AnyValue::Float32(v) => format_numeric(f64::from(v)),
        AnyValue::Float64(v) => format_numeric(v),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Boolean(b) => if b { "true" } else { "false" }.to_string(),
        other => other.to_string(),
    }
}

/// Converts a cell value to String, returning None for null or empty cells.
pub fn any_to_string_non_empty(value: AnyValue<'_>) -> Option<String> {
    let s = any_to_string(value);
    if s.trim().is_empty() { None } else { Some(s) }
}

/// Formats a floating-point number as a string without trailing zeros.
pub fn format_numeric(v: f64) -> String {
    let s = format!("{v}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Converts a cell value to f64, returning None for non-numeric or null values.
pub fn any_to_f64(value: AnyValue<'_>) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(v) => Some(f64::from(v)),
        AnyValue::Int16(v) => Some(f64::from(v)),
        AnyValue::Int32(v) => Some(f64::from(v)),
        AnyValue::Int64(v) => Some(v as f64),
        AnyValue::UInt8(v) => Some(f64::from(v)),
        AnyValue::UInt16(v) => Some(f64::from(v)),
        AnyValue::UInt32(v) => Some(f64::from(v)),
        AnyValue::UInt64(v) => Some(v as f64),
        AnyValue::Float32(v) => Some(f64::from(v)),
        AnyValue::Float64(v) => Some(v),
        AnyValue::String(s) => parse_f64(s),
        AnyValue::StringOwned(s) => parse_f64(&s),
        _ => None,
    }
}

/// Converts a cell value to i64, returning None for non-integer or null values.
pub fn any_to_i64(value: AnyValue<'_>) -> Option<i64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(v) => Some(i64::from(v)),
        AnyValue::Int16(v) => Some(i64::from(v)),
        AnyValue::Int32(v) => Some(i64::from(v)),
        AnyValue::Int64(v) => Some(v),
        AnyValue::UInt8(v) => Some(i64::from(v)),
        AnyValue::UInt16(v) => Some(i64::from(v)),
        AnyValue::UInt32(v) => Some(i64::from(v)),
        AnyValue::UInt64(v) => i64::try_from(v).ok(),
        AnyValue::Float32(v) => Some(v as i64),
        AnyValue::Float64(v) => Some(v as i64),
        AnyValue::String(s) => parse_i64(s),
        AnyValue::StringOwned(s) => parse_i64(&s),
        _ => None,
    }
}

/// Parses a string as f64, returning None for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    if value.trim().is_empty() {
        return None;
    }
    value.trim().parse::<f64>().ok()
}

/// Parses a string as i64, returning None for invalid or empty strings.
pub fn parse_i64(value: &str) -> Option<i64> {
    if value.trim().is_empty() {
        return None;
    }
    value.trim().parse::<i64>().ok()
}

/// Reads a cell as a string, empty on missing column or null.
pub fn column_value_string(df: &DataFrame, name: &str, idx: usize) -> String {
    match df.column(name) {
        Ok(column) => any_to_string(column.get(idx).unwrap_or(AnyValue::Null)),
        Err(_) => String::new(),
    }
}

/// Reads a cell as i64, None on missing column, null, or non-numeric value.
pub fn column_value_i64(df: &DataFrame, name: &str, idx: usize) -> Option<i64> {
    let column = df.column(name).ok()?;
    any_to_i64(column.get(idx).unwrap_or(AnyValue::Null))
}

/// Reads a cell as f64, None on missing column, null, or non-numeric value.
pub fn column_value_f64(df: &DataFrame, name: &str, idx: usize) -> Option<f64> {
    let column = df.column(name).ok()?;
    any_to_f64(column.get(idx).unwrap_or(AnyValue::Null))
}

/// Whether a string cell holds a JSON array.
pub fn is_json_list(cell: &str) -> bool {
    cell.trim_start().starts_with('[')
}

/// Parses a JSON-array cell into its string elements. Non-string elements
/// are rendered through their JSON form. Returns None when the cell is not
/// a JSON array.
pub fn parse_json_list(cell: &str) -> Option<Vec<String>> {
    let parsed: serde_json::Value = serde_json::from_str(cell.trim()).ok()?;
    let items = parsed.as_array()?;
    Some(
        items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
    )
}

/// Encodes string elements as a JSON-array cell.
pub fn encode_json_list<S: AsRef<str>>(items: &[S]) -> String {
    let values: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    serde_json::to_string(&values).unwrap_or_else(|_| "[]".to_string())
}

/// Encodes optional ordinals as a JSON-array cell; misses render as null.
pub fn encode_json_ordinals(items: &[Option<i64>]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}
