//! Per-dataset selection configs and the registry that resolves them.
//!
//! Configs are static data supplied per (dataset, genome build): where the
//! raw table lives, how to filter and project it, and which fields carry
//! enum vocabularies. The biological meaning of the selections is opaque
//! to the pipeline; it only interprets the declarative shape.

use std::collections::BTreeMap;
use std::path::PathBuf;

use polars::prelude::{DataFrame, Series};

use vat_engine::KeyedTable;
use vat_engine::values::column_value_string;
use vat_model::{EnvConfig, GenomeBuild, KeySchema, PipelineError, Result};

use crate::encode::EnumSpec;
use crate::select::SelectSpec;

/// Row filter applied before selection; rows mapped to `false` are dropped.
pub type RowPredicate = fn(&DataFrame) -> Result<Vec<bool>>;

/// Escape hatch for selections the declarative spec cannot express.
/// Wins over the plain spec on output-name collisions.
pub type CustomSelect = fn(&KeyedTable) -> Result<Vec<(String, Series)>>;

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub key_schema: KeySchema,
    /// Namespace for the dataset's payload columns; defaults to the
    /// dataset name.
    pub field_name: Option<String>,
    pub filter: Option<RowPredicate>,
    pub select: SelectSpec,
    pub custom_select: Option<CustomSelect>,
    pub enum_select: Option<EnumSpec>,
}

impl DatasetConfig {
    pub fn new(path: impl Into<PathBuf>, key_schema: KeySchema, select: SelectSpec) -> Self {
        Self {
            path: path.into(),
            key_schema,
            field_name: None,
            filter: None,
            select,
            custom_select: None,
            enum_select: None,
        }
    }

    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = Some(name.into());
        self
    }

    pub fn with_filter(mut self, filter: RowPredicate) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_custom_select(mut self, custom: CustomSelect) -> Self {
        self.custom_select = Some(custom);
        self
    }

    pub fn with_enum_select(mut self, spec: EnumSpec) -> Self {
        self.enum_select = Some(spec);
        self
    }
}

/// Registry of dataset configs, keyed by dataset name and genome build.
#[derive(Debug, Default)]
pub struct DatasetConfigRegistry {
    configs: BTreeMap<(String, GenomeBuild), DatasetConfig>,
}

impl DatasetConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a config. An existing entry for the same pair is replaced.
    pub fn register(
        &mut self,
        dataset: impl Into<String>,
        genome_build: GenomeBuild,
        config: DatasetConfig,
    ) {
        self.configs.insert((dataset.into(), genome_build), config);
    }

    pub fn get(&self, dataset: &str, genome_build: GenomeBuild) -> Result<&DatasetConfig> {
        self.configs
            .get(&(dataset.to_string(), genome_build))
            .ok_or_else(|| PipelineError::UnknownDataset {
                dataset: dataset.to_string(),
                genome_build,
            })
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

fn vocab(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

fn enum_spec(field: &str, values: &[&str]) -> EnumSpec {
    EnumSpec::from([(field.to_string(), vocab(values))])
}

fn keep_rows_with_rsid(df: &DataFrame) -> Result<Vec<bool>> {
    Ok((0..df.height())
        .map(|idx| !column_value_string(df, "rsid", idx).is_empty())
        .collect())
}

const CLINVAR_PATHOGENICITY: &[&str] = &[
    "Pathogenic",
    "Likely_pathogenic",
    "Uncertain_significance",
    "Likely_benign",
    "Benign",
];

const HGMD_CLASS: &[&str] = &["DM", "DM?", "DP", "DFP", "FP", "R"];

const SCREEN_REGION_TYPES: &[&str] = &[
    "CTCF-bound",
    "CTCF-only",
    "DNase-H3K4me3",
    "PLS",
    "dELS",
    "pELS",
];

const SPLICE_CONSEQUENCES: &[&str] = &[
    "Acceptor gain",
    "Acceptor loss",
    "Donor gain",
    "Donor loss",
    "No consequence",
];

/// The stock registry: one entry per reference dataset the deployed
/// pipeline carries, paths resolved under the environment's dataset roots.
pub fn builtin_registry(env: &EnvConfig) -> Result<DatasetConfigRegistry> {
    let mut registry = DatasetConfigRegistry::new();
    for build in [GenomeBuild::Grch37, GenomeBuild::Grch38] {
        let public = |name: &str| {
            env.reference_datasets_root
                .join(build.as_str())
                .join(name)
        };
        registry.register(
            "clinvar",
            build,
            DatasetConfig::new(
                public("clinvar"),
                KeySchema::LocusAlleles,
                SelectSpec::mapped([("allele_id", "info.ALLELEID"), ("gold_stars", "gold_stars")])?,
            )
            .with_enum_select(enum_spec("pathogenicity", CLINVAR_PATHOGENICITY)),
        );
        registry.register(
            "gnomad_genomes",
            build,
            DatasetConfig::new(
                public("gnomad_genomes"),
                KeySchema::LocusAlleles,
                SelectSpec::columns(["AF", "AN", "AC", "Hom"]),
            ),
        );
        registry.register(
            "gnomad_exomes",
            build,
            DatasetConfig::new(
                public("gnomad_exomes"),
                KeySchema::LocusAlleles,
                SelectSpec::columns(["AF", "AN", "AC", "Hom"]),
            ),
        );
        registry.register(
            "cadd",
            build,
            DatasetConfig::new(
                public("cadd"),
                KeySchema::LocusAlleles,
                SelectSpec::columns(["PHRED"]),
            ),
        );
        registry.register(
            "eigen",
            build,
            DatasetConfig::new(
                public("eigen"),
                KeySchema::LocusAlleles,
                SelectSpec::mapped([("Eigen_phred", "info.Eigen-phred")])?,
            ),
        );
        registry.register(
            "exac",
            build,
            DatasetConfig::new(
                public("exac"),
                KeySchema::LocusAlleles,
                SelectSpec::mapped([
                    ("AF_POPMAX", "info.AF_POPMAX#"),
                    ("AC_Adj", "info.AC_Adj#"),
                ])?,
            ),
        );
        registry.register(
            "splice_ai",
            build,
            DatasetConfig::new(
                public("splice_ai"),
                KeySchema::LocusAlleles,
                SelectSpec::mapped([
                    ("delta_score", "info.max_DS"),
                    ("splice_consequence", "info.splice_consequence"),
                ])?,
            )
            .with_enum_select(enum_spec("splice_consequence", SPLICE_CONSEQUENCES)),
        );
        registry.register(
            "gnomad_genome_coverage",
            build,
            DatasetConfig::new(
                public("gnomad_genome_coverage"),
                KeySchema::Locus,
                SelectSpec::columns(["over_20"]),
            ),
        );
        registry.register(
            "hgmd",
            build,
            DatasetConfig::new(
                env.private_reference_datasets_root
                    .join(build.as_str())
                    .join("hgmd"),
                KeySchema::LocusAlleles,
                SelectSpec::mapped([("accession", "rsid"), ("class", "info.CLASS")])?,
            )
            .with_filter(keep_rows_with_rsid)
            .with_enum_select(enum_spec("class", HGMD_CLASS)),
        );
        registry.register(
            "gnomad_mito",
            build,
            DatasetConfig::new(
                public("gnomad_mito"),
                KeySchema::LocusAlleles,
                SelectSpec::columns(["AF_hom", "AF_het", "AN"]),
            ),
        );
        registry.register(
            "helix_mito",
            build,
            DatasetConfig::new(
                public("helix_mito"),
                KeySchema::LocusAlleles,
                SelectSpec::columns(["AF_hom", "AF_het"]),
            ),
        );
        registry.register(
            "mitomap",
            build,
            DatasetConfig::new(
                public("mitomap"),
                KeySchema::LocusAlleles,
                SelectSpec::columns(["pathogenic"]),
            ),
        );
    }
    // Interval datasets only ship on GRCh38.
    let interval = |name: &str| {
        env.reference_datasets_root
            .join(GenomeBuild::Grch38.as_str())
            .join(name)
    };
    registry.register(
        "screen",
        GenomeBuild::Grch38,
        DatasetConfig::new(
            interval("screen"),
            KeySchema::Interval,
            SelectSpec::mapped([("region_type", "target")])?,
        )
        .with_enum_select(enum_spec("region_type", SCREEN_REGION_TYPES)),
    );
    registry.register(
        "gnomad_non_coding_constraint",
        GenomeBuild::Grch38,
        DatasetConfig::new(
            interval("gnomad_non_coding_constraint"),
            KeySchema::Interval,
            SelectSpec::columns(["z_score"]),
        ),
    );
    // Membership-only interval set: the key columns are the payload.
    registry.register(
        "high_constraint_region",
        GenomeBuild::Grch38,
        DatasetConfig::new(
            interval("high_constraint_region"),
            KeySchema::Interval,
            SelectSpec::Columns(Vec::new()),
        ),
    );
    Ok(registry)
}
