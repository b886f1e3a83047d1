//! Keyed tables over the columnar engine.
//!
//! A [`KeyedTable`] is an ordered collection of rows with a declared key
//! schema and a blob of table-scoped globals. All join, union, and dedup
//! semantics the pipeline relies on live here; no other crate touches the
//! underlying engine's combinators directly, so the engine can be swapped
//! behind this interface.
//!
//! Keys are compared through their composite string form (key cells joined
//! with `|`), matching the declared key column order.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::{
    AnyValue, BooleanChunked, Column, DataFrame, DataType, NewChunkedArray, Series,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use vat_model::{KeySchema, PipelineError, Result};

const KEY_SEPARATOR: char = '|';

#[derive(Debug, Clone)]
pub struct KeyedTable {
    data: DataFrame,
    key_schema: KeySchema,
    globals: serde_json::Value,
}

impl KeyedTable {
    /// Wrap a frame, validating that every declared key column is present.
    pub fn new(data: DataFrame, key_schema: KeySchema) -> Result<Self> {
        for key in key_schema.columns() {
            if data.column(key).is_err() {
                return Err(PipelineError::SchemaMismatch {
                    expected: format!("{key_schema} key ({})", key_schema.columns().join(", ")),
                    found: format!(
                        "columns [{}]",
                        data.get_column_names()
                            .iter()
                            .map(|name| name.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                });
            }
        }
        Ok(Self {
            data,
            key_schema,
            globals: serde_json::Value::Null,
        })
    }

    /// An empty table carrying only the key columns of the given schema.
    pub fn empty(key_schema: KeySchema) -> Self {
        let columns = key_schema
            .columns()
            .iter()
            .map(|name| Series::new_empty((*name).into(), &key_column_dtype(name)).into())
            .collect::<Vec<Column>>();
        Self {
            data: DataFrame::new(columns).expect("empty key frame"),
            key_schema,
            globals: serde_json::Value::Null,
        }
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataFrame {
        &mut self.data
    }

    pub fn key_schema(&self) -> KeySchema {
        self.key_schema
    }

    pub fn key_columns(&self) -> &'static [&'static str] {
        self.key_schema.columns()
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn globals(&self) -> &serde_json::Value {
        &self.globals
    }

    pub fn set_globals(&mut self, globals: serde_json::Value) {
        self.globals = globals;
    }

    pub fn with_globals(mut self, globals: serde_json::Value) -> Self {
        self.globals = globals;
        self
    }

    /// Deserialize the globals blob into a typed metadata struct.
    pub fn typed_globals<T: DeserializeOwned + Default>(&self) -> Result<T> {
        if self.globals.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(self.globals.clone()).map_err(PipelineError::engine)
    }

    pub fn set_typed_globals<T: Serialize>(&mut self, value: &T) -> Result<()> {
        self.globals = serde_json::to_value(value).map_err(PipelineError::engine)?;
        Ok(())
    }

    /// Non-key column names, in frame order.
    pub fn payload_columns(&self) -> Vec<String> {
        let keys = self.key_columns();
        self.data
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .filter(|name| !keys.contains(&name.as_str()))
            .collect()
    }

    /// Composite key of one row: key cells joined in declared column order.
    pub fn row_key(&self, idx: usize) -> String {
        composite_key(&self.data, self.key_columns(), idx)
    }

    /// Key -> first row index holding it.
    pub fn key_index(&self) -> BTreeMap<String, usize> {
        let mut index = BTreeMap::new();
        for idx in 0..self.height() {
            index.entry(self.row_key(idx)).or_insert(idx);
        }
        index
    }

    pub fn key_set(&self) -> BTreeSet<String> {
        (0..self.height()).map(|idx| self.row_key(idx)).collect()
    }

    /// Stable dedup by key: the first occurrence of each key survives.
    pub fn distinct(&self) -> Result<Self> {
        let mut seen = BTreeSet::new();
        let keep: Vec<bool> = (0..self.height())
            .map(|idx| seen.insert(self.row_key(idx)))
            .collect();
        let mask = BooleanChunked::from_slice("distinct".into(), &keep);
        let data = self.data.filter(&mask).map_err(PipelineError::engine)?;
        Ok(Self {
            data,
            key_schema: self.key_schema,
            globals: self.globals.clone(),
        })
    }

    /// Rows of `self` whose key does not appear in `other`.
    pub fn anti_join(&self, other: &Self) -> Result<Self> {
        self.require_same_schema(other)?;
        let existing = other.key_set();
        let keep: Vec<bool> = (0..self.height())
            .map(|idx| !existing.contains(&self.row_key(idx)))
            .collect();
        let mask = BooleanChunked::from_slice("anti_join".into(), &keep);
        let data = self.data.filter(&mask).map_err(PipelineError::engine)?;
        Ok(Self {
            data,
            key_schema: self.key_schema,
            globals: self.globals.clone(),
        })
    }

    /// Key-wise union. Schemas must match; columns present on only one side
    /// are null-filled on the other. Row order: `self` rows, then `other`.
    pub fn union(&self, other: &Self) -> Result<Self> {
        self.require_same_schema(other)?;
        let mut layout = frame_layout(&self.data);
        for (name, dtype) in frame_layout(&other.data) {
            if !layout.iter().any(|(existing, _)| *existing == name) {
                layout.push((name, dtype));
            }
        }
        let mut data = aligned_frame(&self.data, &layout)?;
        let right = aligned_frame(&other.data, &layout)?;
        data.vstack_mut(&right).map_err(PipelineError::engine)?;
        Ok(Self {
            data,
            key_schema: self.key_schema,
            globals: self.globals.clone(),
        })
    }

    /// Left join on key: attach `other`'s payload columns to matching rows
    /// of `self`, null where no match exists.
    pub fn left_join(&self, other: &Self) -> Result<Self> {
        self.require_same_schema(other)?;
        let index = other.key_index();
        let picks: Vec<Option<usize>> = (0..self.height())
            .map(|idx| index.get(&self.row_key(idx)).copied())
            .collect();
        let mut data = self.data.clone();
        attach_payload(&mut data, other, &picks)?;
        Ok(Self {
            data,
            key_schema: self.key_schema,
            globals: self.globals.clone(),
        })
    }

    /// Outer join on key: matched rows carry both payloads, unmatched rows
    /// from either side carry nulls for the other side's payload. Row
    /// order: `self` rows first, then `other`-only rows in `other` order.
    pub fn outer_join(&self, other: &Self) -> Result<Self> {
        let joined = self.left_join(other)?;
        let self_keys = self.key_set();
        let keep: Vec<bool> = (0..other.height())
            .map(|idx| !self_keys.contains(&other.row_key(idx)))
            .collect();
        if keep.iter().all(|flag| !flag) {
            return Ok(joined);
        }
        let mask = BooleanChunked::from_slice("outer_right".into(), &keep);
        let right_only = other.data.filter(&mask).map_err(PipelineError::engine)?;
        let layout = frame_layout(&joined.data);
        let mut data = joined.data;
        let right = aligned_frame(&right_only, &layout)?;
        data.vstack_mut(&right).map_err(PipelineError::engine)?;
        Ok(Self {
            data,
            key_schema: self.key_schema,
            globals: self.globals.clone(),
        })
    }

    /// Attach a position-keyed table's payload by exact locus lookup.
    ///
    /// For each row of `self`, the first `other` row at the same
    /// (contig, position) contributes its payload; rows with no match get
    /// nulls. `self` must carry a genomic position.
    pub fn position_attach(&self, other: &Self) -> Result<Self> {
        if !self.key_schema.position_compatible() {
            return Err(PipelineError::SchemaMismatch {
                expected: "position-compatible key".to_string(),
                found: self.key_schema.to_string(),
            });
        }
        if !other.key_schema.position_compatible() {
            return Err(PipelineError::SchemaMismatch {
                expected: "position-keyed lookup table".to_string(),
                found: other.key_schema.to_string(),
            });
        }
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        for idx in 0..other.height() {
            index.entry(locus_key(&other.data, idx)).or_insert(idx);
        }
        let picks: Vec<Option<usize>> = (0..self.height())
            .map(|idx| index.get(&locus_key(&self.data, idx)).copied())
            .collect();
        let mut data = self.data.clone();
        attach_payload(&mut data, other, &picks)?;
        Ok(Self {
            data,
            key_schema: self.key_schema,
            globals: self.globals.clone(),
        })
    }

    /// Rename every payload column to `{namespace}.{name}`.
    pub fn prefix_payload(&mut self, namespace: &str) -> Result<()> {
        for name in self.payload_columns() {
            let prefixed = format!("{namespace}.{name}");
            self.data
                .rename(&name, prefixed.into())
                .map_err(PipelineError::engine)?;
        }
        Ok(())
    }

    fn require_same_schema(&self, other: &Self) -> Result<()> {
        if self.key_schema != other.key_schema {
            return Err(PipelineError::SchemaMismatch {
                expected: self.key_schema.to_string(),
                found: other.key_schema.to_string(),
            });
        }
        Ok(())
    }
}

/// Composite key of a frame row over the given key columns, in order.
pub fn composite_key(df: &DataFrame, columns: &[&str], idx: usize) -> String {
    let mut composite = String::new();
    for (pos, name) in columns.iter().enumerate() {
        if pos > 0 {
            composite.push(KEY_SEPARATOR);
        }
        composite.push_str(&crate::values::column_value_string(df, name, idx));
    }
    composite
}

fn key_column_dtype(name: &str) -> DataType {
    match name {
        "position" | "start" | "end" => DataType::Int64,
        _ => DataType::String,
    }
}

fn locus_key(df: &DataFrame, idx: usize) -> String {
    format!(
        "{}{KEY_SEPARATOR}{}",
        crate::values::column_value_string(df, "contig", idx),
        crate::values::column_value_string(df, "position", idx)
    )
}

fn frame_layout(df: &DataFrame) -> Vec<(String, DataType)> {
    df.get_columns()
        .iter()
        .map(|column| (column.name().to_string(), column.dtype().clone()))
        .collect()
}

/// Project a frame onto a target column layout: reorder, cast where dtypes
/// drifted, null-fill columns the frame does not carry.
fn aligned_frame(df: &DataFrame, layout: &[(String, DataType)]) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(layout.len());
    for (name, dtype) in layout {
        match df.column(name) {
            Ok(column) if column.dtype() == dtype => columns.push(column.clone()),
            Ok(column) => columns.push(column.cast(dtype).map_err(PipelineError::engine)?),
            Err(_) => {
                columns.push(Series::full_null(name.as_str().into(), df.height(), dtype).into());
            }
        }
    }
    DataFrame::new(columns).map_err(PipelineError::engine)
}

/// Attach `other`'s payload columns to `data`, row `i` taking values from
/// `other` row `picks[i]` (null when absent). Payload names must not
/// already exist on `data`.
fn attach_payload(data: &mut DataFrame, other: &KeyedTable, picks: &[Option<usize>]) -> Result<()> {
    for name in other.payload_columns() {
        if data.column(&name).is_ok() {
            return Err(PipelineError::configuration(format!(
                "join would duplicate column {name}; namespace the dataset payloads"
            )));
        }
        let source = other.data.column(&name).map_err(PipelineError::engine)?;
        let mut values: Vec<AnyValue> = Vec::with_capacity(picks.len());
        for pick in picks {
            match pick {
                Some(idx) => values.push(source.get(*idx).map_err(PipelineError::engine)?),
                None => values.push(AnyValue::Null),
            }
        }
        let series =
            Series::from_any_values_and_dtype(name.as_str().into(), &values, source.dtype(), false)
                .map_err(PipelineError::engine)?;
        data.with_column(series).map_err(PipelineError::engine)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::NamedFrom;

    fn canonical(rows: &[(&str, i64, &str)], payload: Option<(&str, Vec<Option<f64>>)>) -> KeyedTable {
        let contigs: Vec<&str> = rows.iter().map(|(c, _, _)| *c).collect();
        let positions: Vec<i64> = rows.iter().map(|(_, p, _)| *p).collect();
        let alleles: Vec<&str> = rows.iter().map(|(_, _, a)| *a).collect();
        let mut columns: Vec<Column> = vec![
            Series::new("contig".into(), contigs).into(),
            Series::new("position".into(), positions).into(),
            Series::new("alleles".into(), alleles).into(),
        ];
        if let Some((name, values)) = payload {
            columns.push(Series::new(name.into(), values).into());
        }
        KeyedTable::new(DataFrame::new(columns).unwrap(), KeySchema::LocusAlleles).unwrap()
    }

    #[test]
    fn new_rejects_missing_key_columns() {
        let df = DataFrame::new(vec![Series::new("contig".into(), vec!["1"]).into()]).unwrap();
        assert!(matches!(
            KeyedTable::new(df, KeySchema::LocusAlleles),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn distinct_keeps_first_occurrence() {
        let table = canonical(
            &[("1", 100, "[\"A\",\"T\"]"), ("1", 100, "[\"A\",\"T\"]"), ("2", 5, "[\"G\",\"C\"]")],
            Some(("score", vec![Some(1.0), Some(2.0), Some(3.0)])),
        );
        let deduped = table.distinct().unwrap();
        assert_eq!(deduped.height(), 2);
        assert_eq!(
            crate::values::column_value_f64(deduped.data(), "score", 0),
            Some(1.0)
        );
    }

    #[test]
    fn anti_join_drops_existing_keys() {
        let table = canonical(
            &[("1", 100, "[\"A\",\"T\"]"), ("2", 5, "[\"G\",\"C\"]")],
            None,
        );
        let existing = canonical(&[("1", 100, "[\"A\",\"T\"]")], None);
        let delta = table.anti_join(&existing).unwrap();
        assert_eq!(delta.height(), 1);
        assert_eq!(delta.row_key(0), "2|5|[\"G\",\"C\"]");
    }

    #[test]
    fn left_join_nulls_unmatched() {
        let left = canonical(
            &[("1", 100, "[\"A\",\"T\"]"), ("2", 5, "[\"G\",\"C\"]")],
            None,
        );
        let right = canonical(
            &[("1", 100, "[\"A\",\"T\"]")],
            Some(("clinvar.score", vec![Some(9.5)])),
        );
        let joined = left.left_join(&right).unwrap();
        assert_eq!(joined.height(), 2);
        assert_eq!(
            crate::values::column_value_f64(joined.data(), "clinvar.score", 0),
            Some(9.5)
        );
        assert_eq!(
            crate::values::column_value_f64(joined.data(), "clinvar.score", 1),
            None
        );
    }

    #[test]
    fn outer_join_disjoint_keys_is_additive() {
        let left = canonical(
            &[("1", 100, "[\"A\",\"T\"]")],
            Some(("a.x", vec![Some(1.0)])),
        );
        let right = canonical(&[("2", 5, "[\"G\",\"C\"]")], Some(("b.y", vec![Some(2.0)])));
        let joined = left.outer_join(&right).unwrap();
        assert_eq!(joined.height(), 2);
        assert_eq!(crate::values::column_value_f64(joined.data(), "b.y", 1), Some(2.0));
        assert_eq!(crate::values::column_value_f64(joined.data(), "a.x", 1), None);
    }

    #[test]
    fn outer_join_identical_keys_merges_payloads() {
        let left = canonical(
            &[("1", 100, "[\"A\",\"T\"]")],
            Some(("a.x", vec![Some(1.0)])),
        );
        let right = canonical(
            &[("1", 100, "[\"A\",\"T\"]")],
            Some(("b.y", vec![Some(2.0)])),
        );
        let joined = left.outer_join(&right).unwrap();
        assert_eq!(joined.height(), 1);
        assert_eq!(crate::values::column_value_f64(joined.data(), "a.x", 0), Some(1.0));
        assert_eq!(crate::values::column_value_f64(joined.data(), "b.y", 0), Some(2.0));
    }

    #[test]
    fn union_null_fills_missing_columns() {
        let left = canonical(
            &[("1", 100, "[\"A\",\"T\"]")],
            Some(("a.x", vec![Some(1.0)])),
        );
        let right = canonical(&[("2", 5, "[\"G\",\"C\"]")], Some(("b.y", vec![Some(2.0)])));
        let unioned = left.union(&right).unwrap();
        assert_eq!(unioned.height(), 2);
        assert_eq!(crate::values::column_value_f64(unioned.data(), "a.x", 1), None);
        assert_eq!(crate::values::column_value_f64(unioned.data(), "b.y", 0), None);
    }

    #[test]
    fn join_refuses_duplicate_payload_names() {
        let left = canonical(
            &[("1", 100, "[\"A\",\"T\"]")],
            Some(("score", vec![Some(1.0)])),
        );
        let right = canonical(
            &[("1", 100, "[\"A\",\"T\"]")],
            Some(("score", vec![Some(2.0)])),
        );
        assert!(matches!(
            left.left_join(&right),
            Err(PipelineError::Configuration(_))
        ));
    }
}
