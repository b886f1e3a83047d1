//! The per-assay policy registry.
//!
//! One variant per assay category, each exposing fixed data and function
//! lists. There is no computation here beyond static dispatch; treat the
//! match arms as configuration.

use std::fmt;
use std::str::FromStr;

use vat_model::{EnvConfig, GenomeBuild, KeySchema, PipelineError};

use crate::annotations::{NamedAnnotation, mito, shared, snv, sv};
use crate::collections::ReferenceCollection;
use crate::genotypes::{DIPLOID_BUCKETS, GenotypeBucket, MITO_BUCKETS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatasetType {
    /// Point mutations and small indels.
    Snv,
    /// Mitochondrial variants.
    Mito,
    /// Structural variants.
    Sv,
    /// Germline copy-number variants.
    Gcnv,
}

const SNV_FORMATTING: &[NamedAnnotation] = &[
    NamedAnnotation {
        name: "gnomad_non_coding_constraint",
        run: snv::gnomad_non_coding_constraint,
    },
    NamedAnnotation {
        name: "screen",
        run: snv::screen,
    },
    NamedAnnotation {
        name: "variant_id",
        run: shared::variant_id,
    },
    NamedAnnotation {
        name: "xpos",
        run: shared::xpos,
    },
];

const MITO_FORMATTING: &[NamedAnnotation] = &[
    NamedAnnotation {
        name: "high_constraint_region",
        run: mito::high_constraint_region,
    },
    NamedAnnotation {
        name: "variant_id",
        run: shared::variant_id,
    },
    NamedAnnotation {
        name: "xpos",
        run: shared::xpos,
    },
];

const SV_FORMATTING: &[NamedAnnotation] = &[
    NamedAnnotation {
        name: "sv_type_id",
        run: sv::sv_type_id,
    },
    NamedAnnotation {
        name: "xpos",
        run: shared::xpos,
    },
];

const GCNV_FORMATTING: &[NamedAnnotation] = &[
    NamedAnnotation {
        name: "sv_type_id",
        run: sv::sv_type_id,
    },
    NamedAnnotation {
        name: "xpos",
        run: shared::xpos,
    },
];

const SNV_ENTRIES: &[NamedAnnotation] = &[
    NamedAnnotation {
        name: "gt",
        run: shared::gt,
    },
    NamedAnnotation {
        name: "ab",
        run: snv::ab,
    },
    NamedAnnotation {
        name: "dp",
        run: snv::dp,
    },
    NamedAnnotation {
        name: "gq",
        run: shared::gq,
    },
];

const MITO_ENTRIES: &[NamedAnnotation] = &[
    NamedAnnotation {
        name: "dp",
        run: mito::dp,
    },
    NamedAnnotation {
        name: "hl",
        run: mito::hl,
    },
];

const SV_ENTRIES: &[NamedAnnotation] = &[
    NamedAnnotation {
        name: "gt",
        run: shared::gt,
    },
    NamedAnnotation {
        name: "gq",
        run: shared::gq,
    },
];

const GCNV_ENTRIES: &[NamedAnnotation] = &[NamedAnnotation {
    name: "gt",
    run: shared::gt,
}];

const SNV_AGGREGATES: &[NamedAnnotation] = &[NamedAnnotation {
    name: "gt_stats",
    run: snv::gt_stats,
}];

const MITO_AGGREGATES: &[NamedAnnotation] = &[NamedAnnotation {
    name: "gt_stats",
    run: mito::gt_stats,
}];

impl DatasetType {
    pub fn all() -> &'static [DatasetType] {
        &[Self::Snv, Self::Mito, Self::Sv, Self::Gcnv]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Snv => "snv",
            Self::Mito => "mito",
            Self::Sv => "sv",
            Self::Gcnv => "gcnv",
        }
    }

    /// Key shape of this assay's tables. The canonical genomic key for
    /// sequence variants, identifier keys for SV/CNV callers that do not
    /// emit a stable locus.
    pub fn key_schema(&self, _genome_build: GenomeBuild) -> KeySchema {
        match self {
            Self::Snv | Self::Mito => KeySchema::LocusAlleles,
            Self::Sv => KeySchema::Rsid,
            Self::Gcnv => KeySchema::VariantId,
        }
    }

    pub fn row_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Snv => &["rsid", "filters"],
            Self::Mito => &[
                "rsid",
                "filters",
                "common_low_heteroplasmy",
                "hap_defining_variant",
                "AF_het",
                "AC_het",
                "AN",
                "mitotip_trna_prediction",
            ],
            Self::Sv => &["contig", "position", "filters", "svtype"],
            Self::Gcnv => &[
                "contig",
                "position",
                "end",
                "filters",
                "gene_ids",
                "num_exon",
                "sc",
                "sf",
                "strvctvre_score",
                "svtype",
            ],
        }
    }

    pub fn entry_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Snv => &["GT", "AD", "GQ"],
            Self::Mito => &["GT", "DP", "MQ", "HL"],
            Self::Sv => &["GT", "CONC_ST", "GQ", "RD_CN"],
            Self::Gcnv => &["CN", "GT", "QS", "defragmented", "sample_start", "sample_end"],
        }
    }

    /// Filter-status values that disqualify a row at ingest time.
    pub fn excluded_filter_values(&self) -> &'static [&'static str] {
        match self {
            Self::Snv | Self::Gcnv => &[],
            Self::Mito => &["PASS"],
            Self::Sv => &["PASS", "BOTHSIDES_SUPPORT"],
        }
    }

    /// Ordered predicates bucketing samples per variant.
    pub fn genotype_buckets(&self) -> &'static [GenotypeBucket] {
        match self {
            Self::Snv => DIPLOID_BUCKETS,
            Self::Mito => MITO_BUCKETS,
            Self::Sv | Self::Gcnv => &[],
        }
    }

    pub fn formatting_annotations(&self) -> &'static [NamedAnnotation] {
        match self {
            Self::Snv => SNV_FORMATTING,
            Self::Mito => MITO_FORMATTING,
            Self::Sv => SV_FORMATTING,
            Self::Gcnv => GCNV_FORMATTING,
        }
    }

    pub fn entry_annotations(&self) -> &'static [NamedAnnotation] {
        match self {
            Self::Snv => SNV_ENTRIES,
            Self::Mito => MITO_ENTRIES,
            Self::Sv => SV_ENTRIES,
            Self::Gcnv => GCNV_ENTRIES,
        }
    }

    pub fn sample_aggregate_annotations(&self) -> &'static [NamedAnnotation] {
        match self {
            Self::Snv => SNV_AGGREGATES,
            Self::Mito => MITO_AGGREGATES,
            Self::Sv | Self::Gcnv => &[],
        }
    }

    /// Interval collections consulted by position lookup during formatting.
    pub fn preattached_collections(&self) -> &'static [ReferenceCollection] {
        match self {
            Self::Snv => &[ReferenceCollection::Interval],
            Self::Mito => &[ReferenceCollection::IntervalMito],
            Self::Sv | Self::Gcnv => &[],
        }
    }

    /// Collections joined by key equality at merge time, filtered to what
    /// the running environment may access.
    pub fn merge_joined_collections(&self, env: &EnvConfig) -> Vec<ReferenceCollection> {
        let all: &[ReferenceCollection] = match self {
            Self::Snv => &[ReferenceCollection::Combined, ReferenceCollection::Hgmd],
            Self::Mito => &[ReferenceCollection::CombinedMito],
            Self::Sv | Self::Gcnv => &[],
        };
        all.iter()
            .copied()
            .filter(|collection| env.allows(collection.access_control()))
            .collect()
    }

    /// Whether new rows of this assay go through the external
    /// variant-effect annotation service.
    pub fn supports_external_annotation(&self) -> bool {
        matches!(self, Self::Snv)
    }

    /// Whether the assay maintains per-variant sample aggregates.
    pub fn has_sample_aggregates(&self) -> bool {
        !self.sample_aggregate_annotations().is_empty()
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatasetType {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "snv" => Ok(Self::Snv),
            "mito" => Ok(Self::Mito),
            "sv" => Ok(Self::Sv),
            "gcnv" => Ok(Self::Gcnv),
            other => Err(PipelineError::configuration(format!(
                "unknown dataset type: {other}"
            ))),
        }
    }
}
