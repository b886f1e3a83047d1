//! Annotation function library.
//!
//! Each function adds one output field (or field group) to the frame it is
//! given, reading whatever context it declares needing. Functions are
//! referenced by the per-assay policies as ordered pipelines; they never
//! decide for themselves which assay they run under.

pub mod mito;
pub mod shared;
pub mod snv;
pub mod sv;

use polars::prelude::DataFrame;

use vat_model::Result;

use crate::context::AnnotationContext;

pub type AnnotationFn = fn(&mut DataFrame, &AnnotationContext) -> Result<()>;

/// An annotation function with a stable name for logging and ordering.
#[derive(Debug, Clone, Copy)]
pub struct NamedAnnotation {
    pub name: &'static str,
    pub run: AnnotationFn,
}

/// Run an ordered annotation pipeline over a frame.
pub fn apply_pipeline(
    df: &mut DataFrame,
    pipeline: &[NamedAnnotation],
    ctx: &AnnotationContext<'_>,
) -> Result<()> {
    for annotation in pipeline {
        tracing::debug!(annotation = annotation.name, "applying annotation");
        (annotation.run)(df, ctx)?;
    }
    Ok(())
}
