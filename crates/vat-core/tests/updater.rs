//! End-to-end updater scenarios over an on-disk store.

use std::cell::RefCell;
use std::collections::BTreeMap;

use polars::prelude::{Column, DataFrame, NamedFrom, Series};

use vat_core::external::ExternalAnnotator;
use vat_core::{AnnotationTableUpdater, UpdateRequest, paths};
use vat_engine::store::{read_table, write_table};
use vat_engine::table::KeyedTable;
use vat_engine::values::{column_value_i64, column_value_string};
use vat_model::{
    AnnotationMetadata, CollectionMetadata, EnvConfig, GenomeBuild, KeySchema, PipelineError,
    Result, RuntimeMode, UpdateRecord,
};
use vat_policy::{DatasetType, ReferenceCollection};

const BUILD: GenomeBuild = GenomeBuild::Grch38;

const V1: (&str, i64, &str) = ("chr1", 100, "[\"A\",\"T\"]");
const V2: (&str, i64, &str) = ("chr1", 200, "[\"C\",\"G\"]");
const V3: (&str, i64, &str) = ("chr2", 300, "[\"G\",\"A\"]");

/// Annotator stamping each row with a per-run marker, recording the keys
/// it was asked to annotate.
struct MarkingAnnotator {
    marker: &'static str,
    seen: RefCell<Vec<String>>,
}

impl MarkingAnnotator {
    fn new(marker: &'static str) -> Self {
        Self {
            marker,
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl ExternalAnnotator for MarkingAnnotator {
    fn annotate(
        &self,
        table: &KeyedTable,
        _env: &EnvConfig,
        _genome_build: GenomeBuild,
    ) -> Result<KeyedTable> {
        let mut seen = self.seen.borrow_mut();
        for idx in 0..table.height() {
            seen.push(table.row_key(idx));
        }
        let mut annotated = table.clone();
        let markers = vec![self.marker; table.height()];
        annotated
            .data_mut()
            .with_column(Series::new("effects.marker".into(), markers))
            .map_err(PipelineError::engine)?;
        Ok(annotated)
    }
}

fn canonical_rows(rows: &[(&str, i64, &str)]) -> KeyedTable {
    let contigs: Vec<&str> = rows.iter().map(|(c, _, _)| *c).collect();
    let positions: Vec<i64> = rows.iter().map(|(_, p, _)| *p).collect();
    let alleles: Vec<&str> = rows.iter().map(|(_, _, a)| *a).collect();
    let columns: Vec<Column> = vec![
        Series::new("contig".into(), contigs).into(),
        Series::new("position".into(), positions).into(),
        Series::new("alleles".into(), alleles).into(),
    ];
    KeyedTable::new(DataFrame::new(columns).unwrap(), KeySchema::LocusAlleles).unwrap()
}

/// A minimal deployment: interval and combined collections, a sample
/// lookup table, and per-project callset row tables.
fn deploy(env: &EnvConfig) {
    // Interval collection with constraint and screen payloads.
    let interval_columns: Vec<Column> = vec![
        Series::new("contig".into(), vec!["chr1"]).into(),
        Series::new("start".into(), vec![50i64]).into(),
        Series::new("end".into(), vec![250i64]).into(),
        Series::new("gnomad_non_coding_constraint.z_score".into(), vec![Some(1.5f64)]).into(),
        Series::new("screen.region_type_ids".into(), vec![Some("[3]")]).into(),
    ];
    let mut interval = KeyedTable::new(
        DataFrame::new(interval_columns).unwrap(),
        KeySchema::Interval,
    )
    .unwrap();
    interval
        .set_typed_globals(&CollectionMetadata {
            date: "2026-08-01T00:00:00Z".to_string(),
            version: "1.0.0".to_string(),
            datasets: BTreeMap::from([
                (
                    "gnomad_non_coding_constraint".to_string(),
                    "/raw/gnomad_non_coding_constraint".to_string(),
                ),
                ("screen".to_string(), "/raw/screen".to_string()),
            ]),
            enum_definitions: BTreeMap::from([(
                "screen".to_string(),
                BTreeMap::from([(
                    "region_type".to_string(),
                    vec!["PLS".to_string(), "dELS".to_string()],
                )]),
            )]),
        })
        .unwrap();
    write_table(
        &interval,
        &paths::reference_collection_path(env, BUILD, ReferenceCollection::Interval),
    )
    .unwrap();

    // Combined collection keyed canonically.
    let mut combined = {
        let mut table = canonical_rows(&[V1, V2, V3]);
        table
            .data_mut()
            .with_column(Series::new(
                "gnomad_genomes.AF".into(),
                vec![Some(0.001f64), Some(0.25), None],
            ))
            .unwrap();
        table
    };
    combined
        .set_typed_globals(&CollectionMetadata {
            date: "2026-08-01T00:00:00Z".to_string(),
            version: "1.1.0".to_string(),
            datasets: BTreeMap::from([(
                "gnomad_genomes".to_string(),
                "/raw/gnomad_genomes".to_string(),
            )]),
            enum_definitions: BTreeMap::new(),
        })
        .unwrap();
    write_table(
        &combined,
        &paths::reference_collection_path(env, BUILD, ReferenceCollection::Combined),
    )
    .unwrap();

    // Sample lookup counts for the aggregate pass.
    let mut lookup = canonical_rows(&[V1, V2, V3]);
    lookup
        .data_mut()
        .with_column(Series::new("ref_samples".into(), vec![8i64, 6, 9]))
        .unwrap();
    lookup
        .data_mut()
        .with_column(Series::new("het_samples".into(), vec![2i64, 3, 1]))
        .unwrap();
    lookup
        .data_mut()
        .with_column(Series::new("hom_samples".into(), vec![0i64, 1, 0]))
        .unwrap();
    write_table(
        &lookup,
        &paths::sample_lookup_table_path(env, BUILD, DatasetType::Snv),
    )
    .unwrap();
}

fn write_callset(env: &EnvConfig, callset: &str, project: &str, rows: &[(&str, i64, &str)]) {
    write_table(
        &canonical_rows(rows),
        &paths::remapped_and_subsetted_callset_path(env, BUILD, DatasetType::Snv, callset, project),
    )
    .unwrap();
}

fn test_env(root: &std::path::Path) -> EnvConfig {
    EnvConfig {
        mode: RuntimeMode::Local,
        access_private_datasets: false,
        reference_datasets_root: root.join("reference"),
        private_reference_datasets_root: root.join("reference-private"),
        annotation_tables_root: root.join("tables"),
        loading_datasets_root: root.join("loading"),
    }
}

fn find_row(table: &KeyedTable, position: i64) -> usize {
    (0..table.height())
        .find(|&idx| column_value_i64(table.data(), "position", idx) == Some(position))
        .expect("row present")
}

#[test]
fn incremental_runs_accumulate_without_recomputing_known_rows() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(dir.path());
    deploy(&env);
    write_callset(&env, "gs://callsets/c1.vcf.gz", "P1", &[V1, V2]);
    write_callset(&env, "gs://callsets/c2.vcf.gz", "P2", &[V2, V3]);

    let updater = AnnotationTableUpdater::new(&env, BUILD, DatasetType::Snv);
    let table_path = paths::annotation_table_path(&env, BUILD, DatasetType::Snv);

    // Run 1: P1 introduces v1 and v2.
    let run1 = MarkingAnnotator::new("run1");
    let outcome = updater
        .run(
            &UpdateRequest::new("gs://callsets/c1.vcf.gz", vec!["P1".to_string()]),
            &run1,
        )
        .unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.new_rows, 2);
    assert_eq!(outcome.total_rows, 2);
    assert_eq!(run1.seen.borrow().len(), 2);

    let after_run1 = read_table(&table_path).unwrap();
    let metadata: AnnotationMetadata = after_run1.typed_globals().unwrap();
    assert_eq!(metadata.updates.len(), 1);
    assert!(metadata.updates.contains(&UpdateRecord::new(
        "gs://callsets/c1.vcf.gz",
        "P1"
    )));
    let v1_row = find_row(&after_run1, V1.1);
    assert_eq!(
        column_value_string(after_run1.data(), "effects.marker", v1_row),
        "run1"
    );
    assert_eq!(
        column_value_string(after_run1.data(), "variant_id", v1_row),
        "chr1-100-A-T"
    );
    // Interval formatting and direct join both attached.
    assert!(after_run1.data().column("gnomad_non_coding_constraint.z_score").is_ok());
    assert!(after_run1.data().column("gnomad_genomes.AF").is_ok());
    // Aggregate pass: v2 has 3 hets + 1 hom out of 10 samples.
    let v2_row = find_row(&after_run1, V2.1);
    assert_eq!(
        column_value_i64(after_run1.data(), "gt_stats.AC", v2_row),
        Some(5)
    );
    assert_eq!(
        column_value_i64(after_run1.data(), "gt_stats.AN", v2_row),
        Some(20)
    );

    // Run 2: P2 brings v2 (already known) and v3 (new).
    let run2 = MarkingAnnotator::new("run2");
    let outcome = updater
        .run(
            &UpdateRequest::new("gs://callsets/c2.vcf.gz", vec!["P2".to_string()]),
            &run2,
        )
        .unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.new_rows, 1);
    assert_eq!(outcome.total_rows, 3);
    // Only the genuinely new key went through external annotation.
    assert_eq!(run2.seen.borrow().as_slice(), &[canonical_rows(&[V3]).row_key(0)]);

    let after_run2 = read_table(&table_path).unwrap();
    // Monotone keys: everything from run 1 is still there.
    for key in after_run1.key_set() {
        assert!(after_run2.key_set().contains(&key));
    }
    // v2 was not recomputed: its marker is still run1's.
    let v2_row = find_row(&after_run2, V2.1);
    assert_eq!(
        column_value_string(after_run2.data(), "effects.marker", v2_row),
        "run1"
    );
    let v3_row = find_row(&after_run2, V3.1);
    assert_eq!(
        column_value_string(after_run2.data(), "effects.marker", v3_row),
        "run2"
    );
    let metadata: AnnotationMetadata = after_run2.typed_globals().unwrap();
    assert_eq!(metadata.updates.len(), 2);

    // Provenance was rebuilt from both consulted collections.
    assert_eq!(
        metadata.versions.get("interval").map(String::as_str),
        Some("1.0.0")
    );
    assert_eq!(
        metadata.versions.get("combined").map(String::as_str),
        Some("1.1.0")
    );
    assert!(metadata.paths.contains_key("screen"));
    assert!(metadata.paths.contains_key("gnomad_genomes"));
    assert!(metadata.enums.contains_key("screen"));
}

#[test]
fn replaying_an_applied_batch_is_a_byte_identical_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(dir.path());
    deploy(&env);
    write_callset(&env, "gs://callsets/c1.vcf.gz", "P1", &[V1, V2]);

    let updater = AnnotationTableUpdater::new(&env, BUILD, DatasetType::Snv);
    let request = UpdateRequest::new("gs://callsets/c1.vcf.gz", vec!["P1".to_string()]);
    let table_path = paths::annotation_table_path(&env, BUILD, DatasetType::Snv);

    updater.run(&request, &MarkingAnnotator::new("run1")).unwrap();
    let rows_before = std::fs::read(table_path.join("rows.ndjson")).unwrap();
    let manifest_before = std::fs::read(table_path.join("metadata.json")).unwrap();

    let replay = MarkingAnnotator::new("replay");
    let outcome = updater.run(&request, &replay).unwrap();
    assert!(!outcome.applied);
    assert_eq!(outcome.new_rows, 0);
    assert!(replay.seen.borrow().is_empty());
    assert_eq!(std::fs::read(table_path.join("rows.ndjson")).unwrap(), rows_before);
    assert_eq!(
        std::fs::read(table_path.join("metadata.json")).unwrap(),
        manifest_before
    );
}

#[test]
fn multi_project_batches_deduplicate_shared_variants() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(dir.path());
    deploy(&env);
    write_callset(&env, "gs://callsets/c1.vcf.gz", "P1", &[V1, V2]);
    write_callset(&env, "gs://callsets/c1.vcf.gz", "P2", &[V2, V3]);

    let updater = AnnotationTableUpdater::new(&env, BUILD, DatasetType::Snv);
    let outcome = updater
        .run(
            &UpdateRequest::new(
                "gs://callsets/c1.vcf.gz",
                vec!["P1".to_string(), "P2".to_string()],
            ),
            &MarkingAnnotator::new("run1"),
        )
        .unwrap();
    assert!(outcome.applied);
    // v2 appears in both projects but contributes one row.
    assert_eq!(outcome.new_rows, 3);
    assert_eq!(outcome.total_rows, 3);

    let table_path = paths::annotation_table_path(&env, BUILD, DatasetType::Snv);
    let metadata: AnnotationMetadata = read_table(&table_path).unwrap().typed_globals().unwrap();
    assert_eq!(metadata.updates.len(), 2);
}

#[test]
fn partial_batch_overlap_reprocesses_the_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(dir.path());
    deploy(&env);
    write_callset(&env, "gs://callsets/c1.vcf.gz", "P1", &[V1]);
    write_callset(&env, "gs://callsets/c1.vcf.gz", "P2", &[V2]);

    let updater = AnnotationTableUpdater::new(&env, BUILD, DatasetType::Snv);
    updater
        .run(
            &UpdateRequest::new("gs://callsets/c1.vcf.gz", vec!["P1".to_string()]),
            &MarkingAnnotator::new("run1"),
        )
        .unwrap();

    // P1 is applied, P2 is not: the pair set is incomplete, so the batch
    // runs, but the row-level anti-join keeps v1 untouched.
    let outcome = updater
        .run(
            &UpdateRequest::new(
                "gs://callsets/c1.vcf.gz",
                vec!["P1".to_string(), "P2".to_string()],
            ),
            &MarkingAnnotator::new("run2"),
        )
        .unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.new_rows, 1);
    assert_eq!(outcome.total_rows, 2);

    let table = read_table(&paths::annotation_table_path(&env, BUILD, DatasetType::Snv)).unwrap();
    let v1_row = find_row(&table, V1.1);
    assert_eq!(column_value_string(table.data(), "effects.marker", v1_row), "run1");
}

#[test]
fn metadata_collision_aborts_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(dir.path());
    deploy(&env);
    // Corrupt the combined collection so it claims `screen` with a path
    // that contradicts the interval collection's claim.
    let combined_path = paths::reference_collection_path(&env, BUILD, ReferenceCollection::Combined);
    let mut combined = read_table(&combined_path).unwrap();
    let mut globals: CollectionMetadata = combined.typed_globals().unwrap();
    globals
        .datasets
        .insert("screen".to_string(), "/elsewhere/screen".to_string());
    combined.set_typed_globals(&globals).unwrap();
    write_table(&combined, &combined_path).unwrap();

    write_callset(&env, "gs://callsets/c1.vcf.gz", "P1", &[V1]);
    let updater = AnnotationTableUpdater::new(&env, BUILD, DatasetType::Snv);
    let err = updater
        .run(
            &UpdateRequest::new("gs://callsets/c1.vcf.gz", vec!["P1".to_string()]),
            &MarkingAnnotator::new("run1"),
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::MetadataCollision { .. }));
    // No table was written.
    let table_path = paths::annotation_table_path(&env, BUILD, DatasetType::Snv);
    assert!(!vat_engine::store::table_exists(&table_path));
}
