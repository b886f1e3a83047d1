pub mod env;
pub mod error;
pub mod genome;
pub mod key;
pub mod metadata;

pub use env::{AccessControl, EnvConfig, RuntimeMode};
pub use error::{PipelineError, Result};
pub use genome::GenomeBuild;
pub use key::KeySchema;
pub use metadata::{
    AnnotationMetadata, CollectionMetadata, CollisionPolicy, EnumDefinitions, UpdateRecord,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_record_serializes() {
        let record = UpdateRecord::new("gs://callsets/batch_1.vcf.gz", "R0123_project");
        let json = serde_json::to_string(&record).expect("serialize record");
        let round: UpdateRecord = serde_json::from_str(&json).expect("deserialize record");
        assert_eq!(round, record);
    }

    #[test]
    fn annotation_metadata_defaults_from_empty_json() {
        let meta: AnnotationMetadata = serde_json::from_str("{}").expect("deserialize empty");
        assert!(meta.paths.is_empty());
        assert!(meta.updates.is_empty());
    }
}
