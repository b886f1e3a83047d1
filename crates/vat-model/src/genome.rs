use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Reference genome build. Contig naming differs between builds:
/// GRCh38 uses the `chr` prefix, GRCh37 does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GenomeBuild {
    #[serde(rename = "GRCh37")]
    Grch37,
    #[serde(rename = "GRCh38")]
    Grch38,
}

impl GenomeBuild {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grch37 => "GRCh37",
            Self::Grch38 => "GRCh38",
        }
    }

    /// All primary contig names in this build's naming convention,
    /// in karyotype order.
    pub fn contigs(&self) -> Vec<String> {
        let mut names: Vec<String> = (1..=22).map(|n| n.to_string()).collect();
        names.push("X".to_string());
        names.push("Y".to_string());
        names.push("MT".to_string());
        match self {
            Self::Grch37 => names,
            Self::Grch38 => names.into_iter().map(|n| format!("chr{n}")).collect(),
        }
    }

    /// Karyotype ordinal of a contig (1-based; X=23, Y=24, MT=25),
    /// accepting either naming convention. Used for xpos encoding.
    pub fn contig_ordinal(&self, contig: &str) -> Option<i64> {
        let name = contig.strip_prefix("chr").unwrap_or(contig);
        match name {
            "X" => Some(23),
            "Y" => Some(24),
            "MT" | "M" => Some(25),
            _ => {
                let n: i64 = name.parse().ok()?;
                (1..=22).contains(&n).then_some(n)
            }
        }
    }
}

impl fmt::Display for GenomeBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenomeBuild {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "GRCh37" | "grch37" | "37" => Ok(Self::Grch37),
            "GRCh38" | "grch38" | "38" => Ok(Self::Grch38),
            other => Err(PipelineError::configuration(format!(
                "unknown genome build: {other}"
            ))),
        }
    }
}
