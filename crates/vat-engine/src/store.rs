//! On-disk table storage.
//!
//! A persisted table is a directory holding `rows.ndjson` (one JSON object
//! per row) and `metadata.json` (key schema, column types, globals).
//! Writes stage into a temporary sibling directory and swap it into place,
//! so readers only ever observe the previous or the new table, never a
//! partial one.
//!
//! Raw reference sources shipped as delimited text (TSV/CSV) are ingested
//! through [`read_delimited`].

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use polars::prelude::{AnyValue, Column, DataFrame, DataType, NamedFrom, Series};
use serde::{Deserialize, Serialize};

use vat_model::{KeySchema, PipelineError, Result};

use crate::table::KeyedTable;

const ROWS_FILE: &str = "rows.ndjson";
const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Serialize, Deserialize)]
struct TableManifest {
    key_schema: KeySchema,
    columns: Vec<ColumnSpec>,
    #[serde(default)]
    globals: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ColumnSpec {
    name: String,
    dtype: StoredType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoredType {
    Str,
    I64,
    F64,
    Bool,
}

impl StoredType {
    fn from_dtype(dtype: &DataType, column: &str) -> Result<Self> {
        match dtype {
            DataType::String => Ok(Self::Str),
            DataType::Boolean => Ok(Self::Bool),
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => Ok(Self::I64),
            DataType::Float32 | DataType::Float64 => Ok(Self::F64),
            // Null-born columns (never observed a value) persist as strings.
            DataType::Null => Ok(Self::Str),
            other => Err(PipelineError::engine(format!(
                "column {column} has unsupported storage type {other:?}"
            ))),
        }
    }

    fn dtype(self) -> DataType {
        match self {
            Self::Str => DataType::String,
            Self::I64 => DataType::Int64,
            Self::F64 => DataType::Float64,
            Self::Bool => DataType::Boolean,
        }
    }
}

pub fn table_exists(path: &Path) -> bool {
    path.join(METADATA_FILE).is_file()
}

pub fn read_table(path: &Path) -> Result<KeyedTable> {
    let manifest_path = path.join(METADATA_FILE);
    let manifest_file =
        fs::File::open(&manifest_path).map_err(|e| PipelineError::io(&manifest_path, e))?;
    let manifest: TableManifest =
        serde_json::from_reader(BufReader::new(manifest_file)).map_err(PipelineError::engine)?;

    let rows_path = path.join(ROWS_FILE);
    let rows_file = fs::File::open(&rows_path).map_err(|e| PipelineError::io(&rows_path, e))?;
    let mut cells: Vec<Vec<AnyValue>> = manifest.columns.iter().map(|_| Vec::new()).collect();
    for line in BufReader::new(rows_file).lines() {
        let line = line.map_err(|e| PipelineError::io(&rows_path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let row: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&line).map_err(PipelineError::engine)?;
        for (spec, column) in manifest.columns.iter().zip(cells.iter_mut()) {
            column.push(match row.get(&spec.name) {
                Some(value) => json_to_cell(value, spec.dtype),
                None => AnyValue::Null,
            });
        }
    }

    let columns: Vec<Column> = manifest
        .columns
        .iter()
        .zip(cells.iter())
        .map(|(spec, values)| {
            Series::from_any_values_and_dtype(
                spec.name.as_str().into(),
                values,
                &spec.dtype.dtype(),
                false,
            )
            .map(Column::from)
            .map_err(PipelineError::engine)
        })
        .collect::<Result<_>>()?;
    let table = KeyedTable::new(
        DataFrame::new(columns).map_err(PipelineError::engine)?,
        manifest.key_schema,
    )?;
    Ok(table.with_globals(manifest.globals))
}

/// Persist the table, atomically replacing whatever was at `path`.
pub fn write_table(table: &KeyedTable, path: &Path) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| PipelineError::configuration(format!("invalid table path {path:?}")))?;
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    let staging = parent.join(format!(".{file_name}.staging"));
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(|e| PipelineError::io(&staging, e))?;
    }
    fs::create_dir_all(&staging).map_err(|e| PipelineError::io(&staging, e))?;

    write_manifest(table, &staging)?;
    write_rows(table, &staging)?;

    let retired = parent.join(format!(".{file_name}.retired"));
    if retired.exists() {
        fs::remove_dir_all(&retired).map_err(|e| PipelineError::io(&retired, e))?;
    }
    if path.exists() {
        fs::rename(path, &retired).map_err(|e| PipelineError::io(path, e))?;
    }
    fs::rename(&staging, path).map_err(|e| PipelineError::io(path, e))?;
    if retired.exists() {
        fs::remove_dir_all(&retired).map_err(|e| PipelineError::io(&retired, e))?;
    }
    tracing::debug!(path = %path.display(), rows = table.height(), "table written");
    Ok(())
}

fn write_manifest(table: &KeyedTable, dir: &Path) -> Result<()> {
    let columns = table
        .data()
        .get_columns()
        .iter()
        .map(|column| {
            StoredType::from_dtype(column.dtype(), column.name()).map(|dtype| ColumnSpec {
                name: column.name().to_string(),
                dtype,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let manifest = TableManifest {
        key_schema: table.key_schema(),
        columns,
        globals: table.globals().clone(),
    };
    let manifest_path = dir.join(METADATA_FILE);
    let file = fs::File::create(&manifest_path).map_err(|e| PipelineError::io(&manifest_path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &manifest).map_err(PipelineError::engine)?;
    Ok(())
}

fn write_rows(table: &KeyedTable, dir: &Path) -> Result<()> {
    let rows_path = dir.join(ROWS_FILE);
    let file = fs::File::create(&rows_path).map_err(|e| PipelineError::io(&rows_path, e))?;
    let mut writer = BufWriter::new(file);
    let columns = table.data().get_columns();
    for idx in 0..table.height() {
        let mut row = serde_json::Map::with_capacity(columns.len());
        for column in columns {
            let value = column.get(idx).map_err(PipelineError::engine)?;
            row.insert(column.name().to_string(), cell_to_json(value));
        }
        serde_json::to_writer(&mut writer, &serde_json::Value::Object(row))
            .map_err(PipelineError::engine)?;
        writer
            .write_all(b"\n")
            .map_err(|e| PipelineError::io(&rows_path, e))?;
    }
    writer.flush().map_err(|e| PipelineError::io(&rows_path, e))?;
    Ok(())
}

fn cell_to_json(value: AnyValue<'_>) -> serde_json::Value {
    match value {
        AnyValue::Null => serde_json::Value::Null,
        AnyValue::Boolean(b) => serde_json::Value::Bool(b),
        AnyValue::String(s) => serde_json::Value::String(s.to_string()),
        AnyValue::StringOwned(s) => serde_json::Value::String(s.to_string()),
        AnyValue::Int8(v) => serde_json::Value::from(v),
        AnyValue::Int16(v) => serde_json::Value::from(v),
        AnyValue::Int32(v) => serde_json::Value::from(v),
        AnyValue::Int64(v) => serde_json::Value::from(v),
        AnyValue::UInt8(v) => serde_json::Value::from(v),
        AnyValue::UInt16(v) => serde_json::Value::from(v),
        AnyValue::UInt32(v) => serde_json::Value::from(v),
        AnyValue::UInt64(v) => serde_json::Value::from(v),
        AnyValue::Float32(v) => serde_json::Number::from_f64(f64::from(v))
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        AnyValue::Float64(v) => serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        other => serde_json::Value::String(other.to_string()),
    }
}

fn json_to_cell(value: &serde_json::Value, dtype: StoredType) -> AnyValue<'static> {
    match (dtype, value) {
        (_, serde_json::Value::Null) => AnyValue::Null,
        (StoredType::Str, serde_json::Value::String(s)) => AnyValue::StringOwned(s.as_str().into()),
        (StoredType::Str, other) => AnyValue::StringOwned(other.to_string().into()),
        (StoredType::I64, v) => v.as_i64().map_or(AnyValue::Null, AnyValue::Int64),
        (StoredType::F64, v) => v.as_f64().map_or(AnyValue::Null, AnyValue::Float64),
        (StoredType::Bool, v) => v.as_bool().map_or(AnyValue::Null, AnyValue::Boolean),
    }
}

/// Ingest a delimited text file (TSV by default, CSV by extension) as a
/// keyed table. Cells are strings except the integer key columns
/// (`position`, `start`, `end`), which are parsed.
pub fn read_delimited(path: &Path, key_schema: KeySchema) -> Result<KeyedTable> {
    let delimiter = match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => b',',
        _ => b'\t',
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| PipelineError::configuration(format!("open {}: {e}", path.display())))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::configuration(format!("headers of {}: {e}", path.display())))?
        .iter()
        .map(|h| h.trim().trim_matches('\u{feff}').to_string())
        .collect();
    let mut cells: Vec<Vec<String>> = headers.iter().map(|_| Vec::new()).collect();
    for record in reader.records() {
        let record = record
            .map_err(|e| PipelineError::configuration(format!("row of {}: {e}", path.display())))?;
        for (column, cell) in cells.iter_mut().zip(record.iter().chain(std::iter::repeat(""))) {
            column.push(cell.trim().to_string());
        }
    }
    let integer_keys = ["position", "start", "end"];
    let columns: Vec<Column> = headers
        .iter()
        .zip(cells.into_iter())
        .map(|(name, values)| {
            if integer_keys.contains(&name.as_str()) && key_schema.columns().contains(&name.as_str())
            {
                let parsed: Vec<Option<i64>> = values
                    .iter()
                    .map(|cell| crate::values::parse_i64(cell))
                    .collect();
                Series::new(name.as_str().into(), parsed).into()
            } else {
                let parsed: Vec<Option<String>> = values
                    .into_iter()
                    .map(|cell| if cell.is_empty() { None } else { Some(cell) })
                    .collect();
                Series::new(name.as_str().into(), parsed).into()
            }
        })
        .collect();
    KeyedTable::new(
        DataFrame::new(columns).map_err(PipelineError::engine)?,
        key_schema,
    )
}
