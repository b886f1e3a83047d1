use std::fmt;

use serde::{Deserialize, Serialize};

/// The shape of a keyed table's key tuple.
///
/// Keys are fixed column sets. The canonical genomic key is
/// (`contig`, `position`, `alleles`); assay types with non-genomic
/// identity use a single identifier column instead. Interval tables
/// are keyed by half-open (`start`, `end`) ranges per contig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySchema {
    /// Canonical point-variant key: locus plus allele list.
    LocusAlleles,
    /// Position-only key, used by coverage-style reference datasets.
    Locus,
    /// Genomic interval key with half-open `[start, end)` bounds.
    Interval,
    /// Assay-specific variant identifier.
    VariantId,
    /// dbSNP-style identifier key.
    Rsid,
}

impl KeySchema {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::LocusAlleles => &["contig", "position", "alleles"],
            Self::Locus => &["contig", "position"],
            Self::Interval => &["contig", "start", "end"],
            Self::VariantId => &["variant_id"],
            Self::Rsid => &["rsid"],
        }
    }

    /// Whether this is the canonical (locus, alleles) key the exact-match
    /// combine path requires.
    pub fn is_canonical(&self) -> bool {
        matches!(self, Self::LocusAlleles)
    }

    /// Whether rows carry a genomic position a point lookup can target.
    pub fn position_compatible(&self) -> bool {
        matches!(self, Self::LocusAlleles | Self::Locus)
    }
}

impl fmt::Display for KeySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LocusAlleles => "locus_alleles",
            Self::Locus => "locus",
            Self::Interval => "interval",
            Self::VariantId => "variant_id",
            Self::Rsid => "rsid",
        })
    }
}
