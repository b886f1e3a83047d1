use std::fmt;
use std::str::FromStr;

use vat_model::{AccessControl, PipelineError};

/// The assembled reference collections the pipeline can consult.
///
/// Interval collections attach during formatting via position lookup;
/// the rest join directly at merge time by key equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReferenceCollection {
    Combined,
    CombinedMito,
    Hgmd,
    Interval,
    IntervalMito,
}

impl ReferenceCollection {
    /// Storage directory name of the collection.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Combined => "combined",
            Self::CombinedMito => "combined_mito",
            Self::Hgmd => "hgmd",
            Self::Interval => "interval",
            Self::IntervalMito => "interval_mito",
        }
    }

    pub fn access_control(&self) -> AccessControl {
        match self {
            Self::Hgmd => AccessControl::Private,
            _ => AccessControl::Public,
        }
    }

    /// Whether the collection is interval-keyed (consulted by position
    /// overlap rather than key equality).
    pub fn is_interval(&self) -> bool {
        matches!(self, Self::Interval | Self::IntervalMito)
    }

    /// The reference datasets folded into this collection when it is built.
    pub fn datasets(&self) -> &'static [&'static str] {
        match self {
            Self::Combined => &[
                "cadd",
                "clinvar",
                "eigen",
                "exac",
                "gnomad_exomes",
                "gnomad_genome_coverage",
                "gnomad_genomes",
                "splice_ai",
            ],
            Self::CombinedMito => &["gnomad_mito", "helix_mito", "mitomap"],
            Self::Hgmd => &["hgmd"],
            Self::Interval => &["gnomad_non_coding_constraint", "screen"],
            Self::IntervalMito => &["high_constraint_region"],
        }
    }
}

impl fmt::Display for ReferenceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReferenceCollection {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "combined" => Ok(Self::Combined),
            "combined_mito" => Ok(Self::CombinedMito),
            "hgmd" => Ok(Self::Hgmd),
            "interval" => Ok(Self::Interval),
            "interval_mito" => Ok(Self::IntervalMito),
            other => Err(PipelineError::configuration(format!(
                "unknown reference collection: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_hgmd_is_private() {
        for collection in [
            ReferenceCollection::Combined,
            ReferenceCollection::CombinedMito,
            ReferenceCollection::Interval,
            ReferenceCollection::IntervalMito,
        ] {
            assert_eq!(collection.access_control(), AccessControl::Public);
        }
        assert_eq!(
            ReferenceCollection::Hgmd.access_control(),
            AccessControl::Private
        );
    }

    #[test]
    fn names_round_trip() {
        for collection in [
            ReferenceCollection::Combined,
            ReferenceCollection::CombinedMito,
            ReferenceCollection::Hgmd,
            ReferenceCollection::Interval,
            ReferenceCollection::IntervalMito,
        ] {
            assert_eq!(
                collection.name().parse::<ReferenceCollection>().unwrap(),
                collection
            );
        }
    }
}
