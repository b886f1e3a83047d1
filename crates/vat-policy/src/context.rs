//! Shared context handed to every annotation function.

use std::collections::BTreeMap;

use vat_engine::{IntervalIndex, KeyedTable};
use vat_model::{EnvConfig, GenomeBuild, PipelineError, Result};

use crate::collections::ReferenceCollection;

/// An interval-keyed reference collection, loaded and indexed for
/// position-overlap lookups during formatting.
#[derive(Debug, Clone)]
pub struct PreattachedCollection {
    pub table: KeyedTable,
    pub index: IntervalIndex,
}

/// Everything an annotation function may need beyond the frame it
/// annotates: the environment, the genome build, handles to preattached
/// interval collections, and the sample lookup table for aggregates.
pub struct AnnotationContext<'a> {
    pub env: &'a EnvConfig,
    pub genome_build: GenomeBuild,
    preattached: BTreeMap<ReferenceCollection, PreattachedCollection>,
    sample_lookup: Option<&'a KeyedTable>,
}

impl<'a> AnnotationContext<'a> {
    pub fn new(env: &'a EnvConfig, genome_build: GenomeBuild) -> Self {
        Self {
            env,
            genome_build,
            preattached: BTreeMap::new(),
            sample_lookup: None,
        }
    }

    /// Register an interval collection for position lookups, building its
    /// index up front.
    pub fn attach(&mut self, collection: ReferenceCollection, table: KeyedTable) -> Result<()> {
        let index = IntervalIndex::build(&table)?;
        self.preattached
            .insert(collection, PreattachedCollection { table, index });
        Ok(())
    }

    pub fn with_sample_lookup(mut self, table: &'a KeyedTable) -> Self {
        self.sample_lookup = Some(table);
        self
    }

    /// Handle on a preattached collection. An annotation function asking
    /// for a collection the policy never attached is a wiring bug.
    pub fn preattached(&self, collection: ReferenceCollection) -> Result<&PreattachedCollection> {
        self.preattached.get(&collection).ok_or_else(|| {
            PipelineError::configuration(format!(
                "annotation requires preattached collection {collection} which was not loaded"
            ))
        })
    }

    pub fn preattached_collections(&self) -> impl Iterator<Item = ReferenceCollection> + '_ {
        self.preattached.keys().copied()
    }

    pub fn sample_lookup(&self) -> Result<&KeyedTable> {
        self.sample_lookup.ok_or_else(|| {
            PipelineError::configuration(
                "sample-aggregate annotation requires a sample lookup table".to_string(),
            )
        })
    }

    pub fn has_sample_lookup(&self) -> bool {
        self.sample_lookup.is_some()
    }
}
