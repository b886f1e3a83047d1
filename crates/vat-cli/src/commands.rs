//! Subcommand implementations.

use anyhow::{Context, Result};
use tracing::info;

use vat_core::{AnnotationTableUpdater, NoopAnnotator, RetryingAnnotator, UpdateRequest, paths};
use vat_engine::store;
use vat_model::{CollisionPolicy, EnvConfig, GenomeBuild};
use vat_policy::{DatasetType, ReferenceCollection};
use vat_reference::{builtin_registry, combine};

use crate::cli::{
    BuildCollectionArgs, CollisionPolicyArg, DatasetTypeArg, GenomeBuildArg, InspectArgs,
    UpdateArgs,
};
use crate::summary::{CollectionSummary, InspectSummary, UpdateSummary};

pub fn run_update(args: &UpdateArgs) -> Result<UpdateSummary> {
    let env = EnvConfig::from_env();
    let genome_build = genome_build(args.genome_build);
    let dataset_type = dataset_type(args.dataset_type);
    let updater = AnnotationTableUpdater::new(&env, genome_build, dataset_type)
        .with_collision_policy(match args.collision_policy {
            CollisionPolicyArg::Reject => CollisionPolicy::Reject,
            CollisionPolicyArg::LastWriteWins => CollisionPolicy::LastWriteWins,
        });
    let request = UpdateRequest::new(args.callset_path.clone(), args.project_guids.clone());
    // Offline runs exercise the full pipeline without a variant-effect
    // service; a deployment substitutes its service client here.
    let annotator = RetryingAnnotator::new(NoopAnnotator);
    let outcome = updater
        .run(&request, &annotator)
        .with_context(|| format!("update from callset {}", args.callset_path))?;
    Ok(UpdateSummary {
        callset_path: args.callset_path.clone(),
        projects: args.project_guids.len(),
        applied: outcome.applied,
        new_rows: outcome.new_rows,
        total_rows: outcome.total_rows,
        table_path: paths::annotation_table_path(&env, genome_build, dataset_type),
    })
}

pub fn run_build_collection(args: &BuildCollectionArgs) -> Result<CollectionSummary> {
    let env = EnvConfig::from_env();
    let genome_build = genome_build(args.genome_build);
    let collection: ReferenceCollection = args
        .collection
        .parse()
        .with_context(|| format!("collection {}", args.collection))?;
    let registry = builtin_registry(&env)?;
    let table = combine(&registry, collection.datasets(), &args.version, genome_build)?;
    let destination = paths::reference_collection_path(&env, genome_build, collection);
    store::write_table(&table, &destination)
        .with_context(|| format!("write collection to {}", destination.display()))?;
    info!(collection = %collection, rows = table.height(), "collection written");
    Ok(CollectionSummary {
        collection: collection.name().to_string(),
        version: args.version.clone(),
        rows: table.height(),
        datasets: collection.datasets().len(),
        path: destination,
    })
}

pub fn run_inspect(args: &InspectArgs) -> Result<InspectSummary> {
    let table = store::read_table(&args.table_path)
        .with_context(|| format!("read table at {}", args.table_path.display()))?;
    Ok(InspectSummary {
        path: args.table_path.clone(),
        key_schema: table.key_schema().to_string(),
        rows: table.height(),
        columns: table.data().get_column_names().len(),
        globals: serde_json::to_string_pretty(table.globals()).unwrap_or_default(),
    })
}

fn genome_build(arg: GenomeBuildArg) -> GenomeBuild {
    match arg {
        GenomeBuildArg::Grch37 => GenomeBuild::Grch37,
        GenomeBuildArg::Grch38 => GenomeBuild::Grch38,
    }
}

fn dataset_type(arg: DatasetTypeArg) -> DatasetType {
    match arg {
        DatasetTypeArg::Snv => DatasetType::Snv,
        DatasetTypeArg::Mito => DatasetType::Mito,
        DatasetTypeArg::Sv => DatasetType::Sv,
        DatasetTypeArg::Gcnv => DatasetType::Gcnv,
    }
}
