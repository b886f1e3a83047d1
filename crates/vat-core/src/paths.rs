//! Storage layout of tables under the environment roots.

use std::path::PathBuf;

use vat_model::{AccessControl, EnvConfig, GenomeBuild};
use vat_policy::{DatasetType, ReferenceCollection};

/// The long-lived annotation table for one assay type and build.
pub fn annotation_table_path(
    env: &EnvConfig,
    genome_build: GenomeBuild,
    dataset_type: DatasetType,
) -> PathBuf {
    env.annotation_tables_root
        .join(genome_build.as_str())
        .join(dataset_type.name())
        .join("annotations")
}

/// The per-variant sample lookup table backing aggregate statistics.
pub fn sample_lookup_table_path(
    env: &EnvConfig,
    genome_build: GenomeBuild,
    dataset_type: DatasetType,
) -> PathBuf {
    env.annotation_tables_root
        .join(genome_build.as_str())
        .join(dataset_type.name())
        .join("sample_lookup")
}

/// An assembled reference collection; private collections live under the
/// private root.
pub fn reference_collection_path(
    env: &EnvConfig,
    genome_build: GenomeBuild,
    collection: ReferenceCollection,
) -> PathBuf {
    let root = match collection.access_control() {
        AccessControl::Private => &env.private_reference_datasets_root,
        AccessControl::Public => &env.reference_datasets_root,
    };
    root.join(genome_build.as_str()).join(collection.name())
}

/// The validated, remapped, project-subsetted callset rows produced by the
/// ingestion stages for one project.
pub fn remapped_and_subsetted_callset_path(
    env: &EnvConfig,
    genome_build: GenomeBuild,
    dataset_type: DatasetType,
    callset_path: &str,
    project_guid: &str,
) -> PathBuf {
    env.loading_datasets_root
        .join(genome_build.as_str())
        .join(dataset_type.name())
        .join(sanitize(callset_path))
        .join(project_guid)
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' { ch } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callset_paths_are_distinct_per_project() {
        let env = EnvConfig::default();
        let a = remapped_and_subsetted_callset_path(
            &env,
            GenomeBuild::Grch38,
            DatasetType::Snv,
            "gs://callsets/batch_1.vcf.gz",
            "P1",
        );
        let b = remapped_and_subsetted_callset_path(
            &env,
            GenomeBuild::Grch38,
            DatasetType::Snv,
            "gs://callsets/batch_1.vcf.gz",
            "P2",
        );
        assert_ne!(a, b);
        assert!(a.to_string_lossy().contains("gs___callsets_batch_1.vcf.gz"));
    }

    #[test]
    fn private_collections_resolve_under_the_private_root() {
        let env = EnvConfig::default();
        let hgmd =
            reference_collection_path(&env, GenomeBuild::Grch38, ReferenceCollection::Hgmd);
        assert!(hgmd.starts_with(&env.private_reference_datasets_root));
        let combined =
            reference_collection_path(&env, GenomeBuild::Grch38, ReferenceCollection::Combined);
        assert!(combined.starts_with(&env.reference_datasets_root));
    }
}
