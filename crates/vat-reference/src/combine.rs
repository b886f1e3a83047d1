//! Folding normalized datasets into one reference dataset collection.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;

use vat_engine::KeyedTable;
use vat_model::{CollectionMetadata, EnumDefinitions, GenomeBuild, PipelineError, Result};

use crate::config::DatasetConfigRegistry;
use crate::normalize::normalize;

/// Combine named datasets into a single collection table.
///
/// Datasets sharing the running table's key schema fold in by outer join;
/// a position-keyed dataset folds into a position-compatible running table
/// by exact locus lookup. Anything else is a fatal schema mismatch.
///
/// The resulting globals are a full replacement: nothing from a previous
/// build of the collection survives.
pub fn combine(
    registry: &DatasetConfigRegistry,
    datasets: &[&str],
    version: &str,
    genome_build: GenomeBuild,
) -> Result<KeyedTable> {
    if datasets.is_empty() {
        return Err(PipelineError::configuration(
            "cannot combine an empty dataset list",
        ));
    }

    let mut joined: Option<KeyedTable> = None;
    for dataset in datasets {
        let normalized = normalize(registry, dataset, genome_build)?;
        joined = Some(match joined {
            None => normalized,
            Some(running) => fold(running, normalized, dataset)?,
        });
    }
    let mut joined = joined.expect("non-empty dataset list");

    let mut dataset_paths = BTreeMap::new();
    let mut enum_definitions = EnumDefinitions::new();
    for dataset in datasets {
        let config = registry.get(dataset, genome_build)?;
        dataset_paths.insert((*dataset).to_string(), config.path.display().to_string());
        if let Some(spec) = &config.enum_select {
            enum_definitions.insert((*dataset).to_string(), spec.clone());
        }
    }
    let metadata = CollectionMetadata {
        date: Utc::now().to_rfc3339(),
        version: version.to_string(),
        datasets: dataset_paths,
        enum_definitions,
    };
    joined.set_typed_globals(&metadata)?;
    info!(
        datasets = datasets.len(),
        rows = joined.height(),
        version,
        "combined reference dataset collection"
    );
    Ok(joined)
}

fn fold(running: KeyedTable, next: KeyedTable, dataset: &str) -> Result<KeyedTable> {
    if running.key_schema() == next.key_schema() {
        return running.outer_join(&next);
    }
    if running.key_schema().position_compatible() && next.key_schema().position_compatible() {
        return running.position_attach(&next);
    }
    Err(PipelineError::SchemaMismatch {
        expected: format!("{} or a position-keyed table", running.key_schema()),
        found: format!("{} ({dataset})", next.key_schema()),
    })
}
