//! Structural-variant and copy-number annotations.

use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::warn;

use vat_engine::values::column_value_string;
use vat_model::{PipelineError, Result};

use crate::annotations::shared::require_columns;
use crate::context::AnnotationContext;

/// Structural variant classes, in ordinal order.
pub const SV_TYPES: &[&str] = &["BND", "CNV", "CPX", "CTX", "DEL", "DUP", "INS", "INV"];

/// Ordinal-encode the `svtype` class. Unknown classes encode to null.
pub fn sv_type_id(df: &mut DataFrame, _ctx: &AnnotationContext<'_>) -> Result<()> {
    require_columns(df, &["svtype"], "sv_type_id")?;
    let mut misses = 0usize;
    let values: Vec<Option<i64>> = (0..df.height())
        .map(|idx| {
            let cell = column_value_string(df, "svtype", idx);
            if cell.is_empty() {
                return None;
            }
            let ordinal = SV_TYPES.iter().position(|candidate| *candidate == cell);
            if ordinal.is_none() {
                misses += 1;
            }
            ordinal.map(|pos| pos as i64)
        })
        .collect();
    if misses > 0 {
        warn!(misses, "svtype values outside the known classes left unannotated");
    }
    df.with_column(Series::new("sv_type_id".into(), values))
        .map_err(PipelineError::engine)?;
    Ok(())
}
