//! Position lookup against interval-keyed reference tables.

use std::collections::BTreeMap;

use vat_model::{KeySchema, PipelineError, Result};

use crate::table::KeyedTable;
use crate::values::{column_value_i64, column_value_string};

#[derive(Debug, Clone, Copy)]
struct IntervalEntry {
    start: i64,
    end: i64,
    row: usize,
}

/// Row index over an interval-keyed table, queryable by point position.
///
/// Matches are returned in table row order, which is what makes the
/// first-qualifying-match tie-break of position-overlap annotation
/// deterministic across runs.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    by_contig: BTreeMap<String, Vec<IntervalEntry>>,
}

impl IntervalIndex {
    pub fn build(table: &KeyedTable) -> Result<Self> {
        if table.key_schema() != KeySchema::Interval {
            return Err(PipelineError::SchemaMismatch {
                expected: KeySchema::Interval.to_string(),
                found: table.key_schema().to_string(),
            });
        }
        let mut by_contig: BTreeMap<String, Vec<IntervalEntry>> = BTreeMap::new();
        for row in 0..table.height() {
            let contig = column_value_string(table.data(), "contig", row);
            let (Some(start), Some(end)) = (
                column_value_i64(table.data(), "start", row),
                column_value_i64(table.data(), "end", row),
            ) else {
                return Err(PipelineError::engine(format!(
                    "interval table row {row} has a null bound"
                )));
            };
            by_contig
                .entry(contig)
                .or_default()
                .push(IntervalEntry { start, end, row });
        }
        Ok(Self { by_contig })
    }

    /// Every row whose half-open `[start, end)` interval covers the
    /// position, in table row order.
    pub fn all_matches(&self, contig: &str, position: i64) -> Vec<usize> {
        let Some(entries) = self.by_contig.get(contig) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter(|entry| entry.start <= position && position < entry.end)
            .map(|entry| entry.row)
            .collect()
    }
}
