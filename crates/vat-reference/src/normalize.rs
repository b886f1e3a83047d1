//! Dataset normalization: raw reference table to a namespaced, keyed,
//! deduplicated payload.

use polars::prelude::{BooleanChunked, NewChunkedArray};
use tracing::debug;

use vat_engine::{KeyedTable, store};
use vat_model::{GenomeBuild, PipelineError, Result};

use crate::config::DatasetConfigRegistry;
use crate::encode::apply_enum_encoding;

/// Normalize one reference dataset for a genome build.
///
/// Loads the configured source, applies the filter predicate, projects the
/// selection spec (custom selector winning on name collisions), encodes
/// enum fields, namespaces the payload under the dataset's field name, and
/// deduplicates by key (first occurrence wins).
pub fn normalize(
    registry: &DatasetConfigRegistry,
    dataset: &str,
    genome_build: GenomeBuild,
) -> Result<KeyedTable> {
    let config = registry.get(dataset, genome_build)?;

    let table = match config.path.extension().and_then(|ext| ext.to_str()) {
        Some("tsv") | Some("csv") => store::read_delimited(&config.path, config.key_schema)?,
        _ => store::read_table(&config.path)?,
    };
    if table.key_schema() != config.key_schema {
        return Err(PipelineError::SchemaMismatch {
            expected: config.key_schema.to_string(),
            found: table.key_schema().to_string(),
        });
    }

    let table = match config.filter {
        Some(predicate) => {
            let keep = predicate(table.data())?;
            let mask = BooleanChunked::from_slice("filter".into(), &keep);
            let data = table.data().filter(&mask).map_err(PipelineError::engine)?;
            KeyedTable::new(data, config.key_schema)?
        }
        None => table,
    };

    let mut selected = config.select.apply(&table)?;
    if let Some(custom) = config.custom_select {
        for (name, series) in custom(&table)? {
            match selected.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = series,
                None => selected.push((name, series)),
            }
        }
    }

    let mut data = table
        .data()
        .select(config.key_schema.columns().iter().copied())
        .map_err(PipelineError::engine)?;
    for (name, mut series) in selected {
        series.rename(name.as_str().into());
        data.with_column(series).map_err(PipelineError::engine)?;
    }

    if let Some(spec) = &config.enum_select {
        apply_enum_encoding(&mut data, spec)?;
    }

    let mut normalized = KeyedTable::new(data, config.key_schema)?;
    normalized.prefix_payload(config.field_name.as_deref().unwrap_or(dataset))?;
    let normalized = normalized.distinct()?;
    debug!(
        dataset,
        genome_build = %genome_build,
        rows = normalized.height(),
        "normalized reference dataset"
    );
    Ok(normalized)
}
