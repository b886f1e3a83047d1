pub mod annotations;
pub mod collections;
pub mod context;
pub mod dataset_type;
pub mod genotypes;

pub use annotations::{AnnotationFn, NamedAnnotation, apply_pipeline};
pub use collections::ReferenceCollection;
pub use context::{AnnotationContext, PreattachedCollection};
pub use dataset_type::DatasetType;
pub use genotypes::{GenotypeBucket, GenotypeEntry, MITO_MIN_HOM_THRESHOLD};
