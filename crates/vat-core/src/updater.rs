//! The incremental annotation-table update pipeline.
//!
//! One run folds a batch of project callsets into the long-lived
//! annotation table for an assay type:
//!
//! 1. completion gate on the `updates` ledger (at-most-once per batch)
//! 2. delta computation (union of project rows, anti-joined against the
//!    existing table)
//! 3. external annotation of the new rows only
//! 4. formatting pipeline, with preattached interval collections
//! 5. direct left joins against the merge-time collections
//! 6. union into the existing table
//! 7. sample-aggregate pass over the unioned table
//! 8. provenance reconciliation and enum re-derivation
//! 9. commit: ledger update and atomic table replace
//!
//! Nothing is written unless every step succeeds; a failed run leaves the
//! previous table (and its ledger) as the system of record.

use polars::prelude::DataFrame;
use tracing::info;

use vat_engine::{KeyedTable, store};
use vat_model::{
    AnnotationMetadata, CollectionMetadata, CollisionPolicy, EnumDefinitions, EnvConfig,
    GenomeBuild, PipelineError, Result, UpdateRecord,
};
use vat_policy::{AnnotationContext, DatasetType, ReferenceCollection, apply_pipeline};
use vat_reference::{EnumSpec, apply_enum_encoding};

use crate::external::{ExternalAnnotator, verify_annotator_contract};
use crate::paths;

/// One ingestion batch: a callset with the projects it was subsetted to.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub callset_path: String,
    pub project_guids: Vec<String>,
}

impl UpdateRequest {
    pub fn new(callset_path: impl Into<String>, project_guids: Vec<String>) -> Self {
        Self {
            callset_path: callset_path.into(),
            project_guids,
        }
    }

    pub fn update_records(&self) -> Vec<UpdateRecord> {
        self.project_guids
            .iter()
            .map(|guid| UpdateRecord::new(self.callset_path.clone(), guid.clone()))
            .collect()
    }
}

/// Outcome summary of one run, for operator reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// False when the completion gate short-circuited the run.
    pub applied: bool,
    pub new_rows: usize,
    pub total_rows: usize,
}

pub struct AnnotationTableUpdater<'a> {
    env: &'a EnvConfig,
    genome_build: GenomeBuild,
    dataset_type: DatasetType,
    collision_policy: CollisionPolicy,
}

impl<'a> AnnotationTableUpdater<'a> {
    pub fn new(env: &'a EnvConfig, genome_build: GenomeBuild, dataset_type: DatasetType) -> Self {
        Self {
            env,
            genome_build,
            dataset_type,
            collision_policy: CollisionPolicy::default(),
        }
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn run(
        &self,
        request: &UpdateRequest,
        annotator: &dyn ExternalAnnotator,
    ) -> Result<UpdateOutcome> {
        if request.project_guids.is_empty() {
            return Err(PipelineError::configuration(
                "update request carries no projects",
            ));
        }
        let table_path =
            paths::annotation_table_path(self.env, self.genome_build, self.dataset_type);
        let key_schema = self.dataset_type.key_schema(self.genome_build);
        let existing = if store::table_exists(&table_path) {
            store::read_table(&table_path)?
        } else {
            KeyedTable::empty(key_schema)
        };
        let mut metadata: AnnotationMetadata = existing.typed_globals()?;

        let records = request.update_records();
        if metadata.contains_all(&records) {
            info!(
                callset = %request.callset_path,
                projects = request.project_guids.len(),
                "batch already applied; nothing to do"
            );
            return Ok(UpdateOutcome {
                applied: false,
                new_rows: 0,
                total_rows: existing.height(),
            });
        }

        // Delta: one row per variant seen across the requested projects,
        // minus everything the table already knows.
        let callset = self.read_callset_union(request)?;
        let mut new_variants = callset.anti_join(&existing)?;
        let new_rows = new_variants.height();
        info!(
            callset_rows = callset.height(),
            new_rows,
            existing_rows = existing.height(),
            "computed new-variant delta"
        );

        if self.dataset_type.supports_external_annotation() && new_variants.height() > 0 {
            let annotated = annotator.annotate(&new_variants, self.env, self.genome_build)?;
            verify_annotator_contract(&new_variants, &annotated)?;
            new_variants = annotated;
        }

        // Preattached interval collections feed the formatting pipeline.
        let mut consulted: Vec<(String, CollectionMetadata)> = Vec::new();
        let mut ctx = AnnotationContext::new(self.env, self.genome_build);
        for collection in self.dataset_type.preattached_collections() {
            let table = self.read_collection(*collection)?;
            consulted.push((collection.name().to_string(), table.typed_globals()?));
            ctx.attach(*collection, table)?;
        }
        apply_pipeline(
            new_variants.data_mut(),
            self.dataset_type.formatting_annotations(),
            &ctx,
        )?;

        // Direct key-equality joins against the merge-time collections.
        for collection in self.dataset_type.merge_joined_collections(self.env) {
            let table = self.read_collection(collection)?;
            consulted.push((collection.name().to_string(), table.typed_globals()?));
            new_variants = new_variants.left_join(&table)?;
        }

        let mut merged = existing.union(&new_variants)?;

        // Aggregates run over the whole unioned table: the lookup table was
        // rebuilt from the full updated sample set upstream.
        if self.dataset_type.has_sample_aggregates() {
            let lookup_path =
                paths::sample_lookup_table_path(self.env, self.genome_build, self.dataset_type);
            let lookup = store::read_table(&lookup_path)?;
            let aggregate_ctx =
                AnnotationContext::new(self.env, self.genome_build).with_sample_lookup(&lookup);
            apply_pipeline(
                merged.data_mut(),
                self.dataset_type.sample_aggregate_annotations(),
                &aggregate_ctx,
            )?;
        }

        // Provenance is re-derived from scratch out of the collections this
        // run consulted, in their deterministic consultation order.
        metadata.reset_provenance();
        for (name, collection_metadata) in &consulted {
            metadata.merge_collection(name, collection_metadata, self.collision_policy)?;
        }
        rederive_enum_ids(merged.data_mut(), &metadata.enums)?;

        metadata.record_updates(records);
        merged.set_typed_globals(&metadata)?;
        store::write_table(&merged, &table_path)?;
        info!(
            callset = %request.callset_path,
            projects = request.project_guids.len(),
            new_rows,
            total_rows = merged.height(),
            "annotation table updated"
        );
        Ok(UpdateOutcome {
            applied: true,
            new_rows,
            total_rows: merged.height(),
        })
    }

    /// Union of all requested projects' callset rows, one row per key.
    fn read_callset_union(&self, request: &UpdateRequest) -> Result<KeyedTable> {
        let mut unioned: Option<KeyedTable> = None;
        for project_guid in &request.project_guids {
            let path = paths::remapped_and_subsetted_callset_path(
                self.env,
                self.genome_build,
                self.dataset_type,
                &request.callset_path,
                project_guid,
            );
            let rows = store::read_table(&path)?;
            unioned = Some(match unioned {
                None => rows,
                Some(table) => table.union(&rows)?,
            });
        }
        unioned
            .ok_or_else(|| PipelineError::configuration("update request carries no projects"))?
            .distinct()
    }

    fn read_collection(&self, collection: ReferenceCollection) -> Result<KeyedTable> {
        store::read_table(&paths::reference_collection_path(
            self.env,
            self.genome_build,
            collection,
        ))
    }
}

/// Recompute enum ordinal columns from the accumulated vocabularies.
///
/// Only fields whose raw value column is still present can be re-derived;
/// collection payloads arrive pre-encoded and keep their ordinals.
fn rederive_enum_ids(df: &mut DataFrame, enums: &EnumDefinitions) -> Result<()> {
    for (dataset, fields) in enums {
        for (field, vocabulary) in fields {
            let raw = format!("{dataset}.{field}");
            if df.column(&raw).is_err() {
                continue;
            }
            let spec = EnumSpec::from([(raw.clone(), vocabulary.clone())]);
            apply_enum_encoding(df, &spec)?;
        }
    }
    Ok(())
}
