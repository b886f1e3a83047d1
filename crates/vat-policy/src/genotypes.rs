//! Genotype classification rules used to bucket samples per variant.

/// Heteroplasmy level at or above which a mitochondrial call counts as
/// homoplasmic.
pub const MITO_MIN_HOM_THRESHOLD: f64 = 0.95;

/// One sample's genotype call, reduced to what classification needs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenotypeEntry {
    /// Alternate allele count of the call (0 = reference, 1 = het, 2 = hom).
    pub num_alt: Option<i64>,
    /// Mitochondrial heteroplasmy level in `[0, 1]`.
    pub heteroplasmy: Option<f64>,
}

impl GenotypeEntry {
    pub fn diploid(num_alt: i64) -> Self {
        Self {
            num_alt: Some(num_alt),
            heteroplasmy: None,
        }
    }

    pub fn mito(heteroplasmy: f64) -> Self {
        Self {
            num_alt: None,
            heteroplasmy: Some(heteroplasmy),
        }
    }
}

/// A named sample bucket with its membership predicate.
#[derive(Debug, Clone, Copy)]
pub struct GenotypeBucket {
    pub name: &'static str,
    pub matches: fn(&GenotypeEntry) -> bool,
}

pub(crate) const DIPLOID_BUCKETS: &[GenotypeBucket] = &[
    GenotypeBucket {
        name: "ref_samples",
        matches: |entry| entry.num_alt == Some(0),
    },
    GenotypeBucket {
        name: "het_samples",
        matches: |entry| entry.num_alt == Some(1),
    },
    GenotypeBucket {
        name: "hom_samples",
        matches: |entry| entry.num_alt == Some(2),
    },
];

pub(crate) const MITO_BUCKETS: &[GenotypeBucket] = &[
    GenotypeBucket {
        name: "ref_samples",
        matches: |entry| entry.heteroplasmy == Some(0.0),
    },
    GenotypeBucket {
        name: "heteroplasmic_samples",
        matches: |entry| {
            entry
                .heteroplasmy
                .is_some_and(|hl| hl > 0.0 && hl < MITO_MIN_HOM_THRESHOLD)
        },
    },
    GenotypeBucket {
        name: "homoplasmic_samples",
        matches: |entry| entry.heteroplasmy.is_some_and(|hl| hl >= MITO_MIN_HOM_THRESHOLD),
    },
];
