//! Enum encoding: categorical values replaced by their ordinal in a fixed
//! vocabulary.
//!
//! Scalar fields become `{field}_id` (i64 ordinal); list-valued fields
//! (JSON-array cells) become `{field}_ids` (JSON array of ordinals). A
//! value absent from the vocabulary encodes to null; downstream treats it
//! as unannotated, never as a failure.

use std::collections::BTreeMap;

use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::warn;

use vat_engine::values::{column_value_string, encode_json_ordinals, is_json_list, parse_json_list};
use vat_model::{PipelineError, Result};

/// Field name -> ordered vocabulary.
pub type EnumSpec = BTreeMap<String, Vec<String>>;

/// Ordinal of a value in a vocabulary.
pub fn ordinal_of(vocabulary: &[String], value: &str) -> Option<i64> {
    vocabulary
        .iter()
        .position(|candidate| candidate == value)
        .map(|pos| pos as i64)
}

/// Inverse lookup, for decoding stored ordinals.
pub fn value_at(vocabulary: &[String], ordinal: i64) -> Option<&str> {
    usize::try_from(ordinal)
        .ok()
        .and_then(|idx| vocabulary.get(idx))
        .map(String::as_str)
}

/// Replace each spec'd field with its ordinal-encoded form, in place.
pub fn apply_enum_encoding(df: &mut DataFrame, spec: &EnumSpec) -> Result<()> {
    for (field, vocabulary) in spec {
        if df.column(field).is_err() {
            return Err(PipelineError::configuration(format!(
                "enum spec names field {field:?} absent from the selected columns"
            )));
        }
        let list_valued = (0..df.height()).any(|idx| {
            let cell = column_value_string(df, field, idx);
            !cell.is_empty() && is_json_list(&cell)
        });
        let mut misses = 0usize;
        let encoded: Series = if list_valued {
            let values: Vec<Option<String>> = (0..df.height())
                .map(|idx| {
                    let cell = column_value_string(df, field, idx);
                    if cell.is_empty() {
                        return None;
                    }
                    let items = parse_json_list(&cell)?;
                    let ordinals: Vec<Option<i64>> = items
                        .iter()
                        .map(|item| {
                            let ordinal = ordinal_of(vocabulary, item);
                            if ordinal.is_none() {
                                misses += 1;
                            }
                            ordinal
                        })
                        .collect();
                    Some(encode_json_ordinals(&ordinals))
                })
                .collect();
            Series::new(format!("{field}_ids").as_str().into(), values)
        } else {
            let values: Vec<Option<i64>> = (0..df.height())
                .map(|idx| {
                    let cell = column_value_string(df, field, idx);
                    if cell.is_empty() {
                        return None;
                    }
                    let ordinal = ordinal_of(vocabulary, &cell);
                    if ordinal.is_none() {
                        misses += 1;
                    }
                    ordinal
                })
                .collect();
            Series::new(format!("{field}_id").as_str().into(), values)
        };
        if misses > 0 {
            warn!(field = %field, misses, "values missing from enum vocabulary left unannotated");
        }
        *df = df.drop(field).map_err(PipelineError::engine)?;
        df.with_column(encoded).map_err(PipelineError::engine)?;
    }
    Ok(())
}
