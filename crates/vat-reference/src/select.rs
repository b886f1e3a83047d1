//! Field selection over source tables.
//!
//! Selection specs are parsed into a typed path form when a dataset config
//! is registered, so malformed specs fail at load time rather than per row.
//! A path selects the column named by its dotted form (`info.AF` is the
//! column literally named `info.AF`). The trailing `#` marker selects the
//! row's allele slot out of a list-valued cell: `info.AF#` reads the cell
//! as a JSON array and takes element `a_index - 1`.

use polars::prelude::{NamedFrom, Series};

use vat_engine::KeyedTable;
use vat_engine::values::{column_value_i64, column_value_string, parse_json_list};
use vat_model::{PipelineError, Result};

/// Column in the allele-split source carrying the 1-based allele index.
pub const ALLELE_INDEX_COLUMN: &str = "a_index";

const ALLELE_MARKER: char = '#';

/// A parsed selection path: the flattened column name plus whether the
/// terminal segment is allele-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    column: String,
    allele_indexed: bool,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(PipelineError::configuration("empty selection path"));
        }
        let segments: Vec<&str> = raw.split('.').collect();
        let last = segments.len() - 1;
        let mut column = String::new();
        let mut allele_indexed = false;
        for (pos, segment) in segments.iter().enumerate() {
            let (name, indexed) = match segment.strip_suffix(ALLELE_MARKER) {
                Some(name) => (name, true),
                None => (*segment, false),
            };
            if name.is_empty() || name.contains(ALLELE_MARKER) {
                return Err(PipelineError::configuration(format!(
                    "malformed selection path segment {segment:?} in {raw:?}"
                )));
            }
            if indexed && pos != last {
                return Err(PipelineError::configuration(format!(
                    "allele marker only allowed on the final segment of {raw:?}"
                )));
            }
            if pos > 0 {
                column.push('.');
            }
            column.push_str(name);
            allele_indexed |= indexed;
        }
        Ok(Self {
            column,
            allele_indexed,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn is_allele_indexed(&self) -> bool {
        self.allele_indexed
    }

    /// Resolve this path against a source table as a named output series.
    pub fn resolve(&self, table: &KeyedTable, output: &str) -> Result<Series> {
        let df = table.data();
        let column = df.column(&self.column).map_err(|_| {
            PipelineError::configuration(format!(
                "selection path {:?} names a column absent from the source",
                self.column
            ))
        })?;
        if !self.allele_indexed {
            let mut series = column.as_materialized_series().clone();
            series.rename(output.into());
            return Ok(series);
        }
        if df.column(ALLELE_INDEX_COLUMN).is_err() {
            return Err(PipelineError::configuration(format!(
                "allele-indexed path {:?} requires an {ALLELE_INDEX_COLUMN} column",
                self.column
            )));
        }
        let values: Vec<Option<String>> = (0..df.height())
            .map(|idx| {
                let cell = column_value_string(df, &self.column, idx);
                if cell.is_empty() {
                    return None;
                }
                let items = parse_json_list(&cell)?;
                let a_index = column_value_i64(df, ALLELE_INDEX_COLUMN, idx)?;
                let slot = usize::try_from(a_index.checked_sub(1)?).ok()?;
                items.get(slot).cloned()
            })
            .collect();
        Ok(Series::new(output.into(), values))
    }
}

/// A declarative field-selection spec.
#[derive(Debug, Clone)]
pub enum SelectSpec {
    /// Each name selected verbatim from the source under the same name.
    Columns(Vec<String>),
    /// Output name -> parsed source path, applied in declaration order.
    Mapped(Vec<(String, FieldPath)>),
}

impl SelectSpec {
    /// Parse a name -> dotted-path mapping into a spec, failing on any
    /// malformed path.
    pub fn mapped<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut parsed = Vec::new();
        for (output, path) in entries {
            parsed.push((output.to_string(), FieldPath::parse(path)?));
        }
        Ok(Self::Mapped(parsed))
    }

    pub fn columns<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self::Columns(names.into_iter().map(str::to_string).collect())
    }

    /// Project the spec against a source table.
    pub fn apply(&self, table: &KeyedTable) -> Result<Vec<(String, Series)>> {
        match self {
            Self::Columns(names) => names
                .iter()
                .map(|name| {
                    let path = FieldPath {
                        column: name.clone(),
                        allele_indexed: false,
                    };
                    path.resolve(table, name).map(|series| (name.clone(), series))
                })
                .collect(),
            Self::Mapped(entries) => entries
                .iter()
                .map(|(output, path)| {
                    path.resolve(table, output)
                        .map(|series| (output.clone(), series))
                })
                .collect(),
        }
    }
}
