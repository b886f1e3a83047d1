use std::path::PathBuf;

use thiserror::Error;

use crate::genome::GenomeBuild;

/// Error taxonomy for the annotation pipeline.
///
/// Configuration and schema errors are developer errors and abort a run
/// immediately. `ExternalService` is the only retryable variant; the
/// annotation call boundary retries it with bounded attempts. Data-quality
/// events (enum lookup misses) are logged warnings, never errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown reference dataset {dataset} for {genome_build}")]
    UnknownDataset {
        dataset: String,
        genome_build: GenomeBuild,
    },

    #[error("key schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },

    #[error("external annotation service: {0}")]
    ExternalService(String),

    #[error("metadata collision in {section}: key {key} already provided by another source")]
    MetadataCollision { section: String, key: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("table engine error: {0}")]
    Engine(String),
}

impl PipelineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn engine(source: impl std::fmt::Display) -> Self {
        Self::Engine(source.to_string())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the failing operation may be re-attempted with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalService(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
