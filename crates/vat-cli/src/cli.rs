//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "vat",
    version,
    about = "Variant annotation table pipeline",
    long_about = "Incrementally fold new sample callsets into the canonical \
                  variant annotation table,\nand build the reference dataset \
                  collections it joins against."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fold a batch of project callsets into the annotation table.
    Update(UpdateArgs),

    /// Build a reference dataset collection from its member datasets.
    BuildCollection(BuildCollectionArgs),

    /// Print a stored table's shape and global metadata.
    Inspect(InspectArgs),
}

#[derive(Parser)]
pub struct UpdateArgs {
    /// Path of the raw callset this batch was loaded from.
    #[arg(long = "callset-path", value_name = "PATH")]
    pub callset_path: String,

    /// Project GUIDs subsetted out of the callset (repeatable).
    #[arg(long = "project-guid", value_name = "GUID", required = true)]
    pub project_guids: Vec<String>,

    /// Assay category of the callset.
    #[arg(long = "dataset-type", value_enum, default_value = "snv")]
    pub dataset_type: DatasetTypeArg,

    /// Reference genome build.
    #[arg(long = "genome-build", value_enum, default_value = "grch38")]
    pub genome_build: GenomeBuildArg,

    /// How provenance merges resolve a key claimed by two sources.
    #[arg(long = "on-metadata-collision", value_enum, default_value = "reject")]
    pub collision_policy: CollisionPolicyArg,
}

#[derive(Parser)]
pub struct BuildCollectionArgs {
    /// Collection to assemble.
    #[arg(value_name = "COLLECTION")]
    pub collection: String,

    /// Semantic version recorded in the collection metadata.
    #[arg(long = "collection-version", value_name = "VERSION")]
    pub version: String,

    /// Reference genome build.
    #[arg(long = "genome-build", value_enum, default_value = "grch38")]
    pub genome_build: GenomeBuildArg,
}

#[derive(Parser)]
pub struct InspectArgs {
    /// Path of the stored table directory.
    #[arg(value_name = "TABLE_PATH")]
    pub table_path: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DatasetTypeArg {
    Snv,
    Mito,
    Sv,
    Gcnv,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GenomeBuildArg {
    Grch37,
    Grch38,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CollisionPolicyArg {
    Reject,
    LastWriteWins,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
