//! Mitochondrial-variant annotations.

use polars::prelude::{DataFrame, NamedFrom, Series};

use vat_engine::table::composite_key;
use vat_engine::values::{column_value_f64, column_value_i64, column_value_string};
use vat_model::{PipelineError, Result};

use crate::annotations::shared::require_columns;
use crate::collections::ReferenceCollection;
use crate::context::AnnotationContext;

/// Membership in a high-constraint mitochondrial region.
pub fn high_constraint_region(df: &mut DataFrame, ctx: &AnnotationContext<'_>) -> Result<()> {
    require_columns(df, &["contig", "position"], "high_constraint_region")?;
    let preattached = ctx.preattached(ReferenceCollection::IntervalMito)?;
    let values: Vec<bool> = (0..df.height())
        .map(|idx| {
            let contig = column_value_string(df, "contig", idx);
            match column_value_i64(df, "position", idx) {
                Some(position) => !preattached.index.all_matches(&contig, position).is_empty(),
                None => false,
            }
        })
        .collect();
    df.with_column(Series::new("high_constraint_region".into(), values))
        .map_err(PipelineError::engine)?;
    Ok(())
}

/// Entry-level heteroplasmy level, normalized to a float.
pub fn hl(df: &mut DataFrame, _ctx: &AnnotationContext<'_>) -> Result<()> {
    require_columns(df, &["HL"], "hl")?;
    let values: Vec<Option<f64>> = (0..df.height())
        .map(|idx| column_value_f64(df, "HL", idx))
        .collect();
    df.with_column(Series::new("HL".into(), values))
        .map_err(PipelineError::engine)?;
    Ok(())
}

/// Entry-level read depth, normalized to an integer.
pub fn dp(df: &mut DataFrame, _ctx: &AnnotationContext<'_>) -> Result<()> {
    require_columns(df, &["DP"], "dp")?;
    let values: Vec<Option<i64>> = (0..df.height())
        .map(|idx| column_value_i64(df, "DP", idx))
        .collect();
    df.with_column(Series::new("DP".into(), values))
        .map_err(PipelineError::engine)?;
    Ok(())
}

/// Per-variant heteroplasmy-class statistics from the sample lookup table.
pub fn gt_stats(df: &mut DataFrame, ctx: &AnnotationContext<'_>) -> Result<()> {
    let lookup = ctx.sample_lookup()?;
    let index = lookup.key_index();
    let key_columns = lookup.key_columns();
    require_columns(df, key_columns, "gt_stats")?;

    let mut ac_het: Vec<Option<i64>> = Vec::with_capacity(df.height());
    let mut ac_hom: Vec<Option<i64>> = Vec::with_capacity(df.height());
    let mut an: Vec<Option<i64>> = Vec::with_capacity(df.height());
    let mut af_het: Vec<Option<f64>> = Vec::with_capacity(df.height());
    let mut af_hom: Vec<Option<f64>> = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let key = composite_key(df, key_columns, idx);
        match index.get(&key) {
            Some(&row) => {
                let refs = column_value_i64(lookup.data(), "ref_samples", row).unwrap_or(0);
                let hets =
                    column_value_i64(lookup.data(), "heteroplasmic_samples", row).unwrap_or(0);
                let homs =
                    column_value_i64(lookup.data(), "homoplasmic_samples", row).unwrap_or(0);
                let total = refs + hets + homs;
                ac_het.push(Some(hets));
                ac_hom.push(Some(homs));
                an.push(Some(total));
                if total > 0 {
                    af_het.push(Some(hets as f64 / total as f64));
                    af_hom.push(Some(homs as f64 / total as f64));
                } else {
                    af_het.push(None);
                    af_hom.push(None);
                }
            }
            None => {
                ac_het.push(None);
                ac_hom.push(None);
                an.push(None);
                af_het.push(None);
                af_hom.push(None);
            }
        }
    }
    df.with_column(Series::new("gt_stats.AC_het".into(), ac_het))
        .map_err(PipelineError::engine)?;
    df.with_column(Series::new("gt_stats.AC_hom".into(), ac_hom))
        .map_err(PipelineError::engine)?;
    df.with_column(Series::new("gt_stats.AN".into(), an))
        .map_err(PipelineError::engine)?;
    df.with_column(Series::new("gt_stats.AF_het".into(), af_het))
        .map_err(PipelineError::engine)?;
    df.with_column(Series::new("gt_stats.AF_hom".into(), af_hom))
        .map_err(PipelineError::engine)?;
    Ok(())
}
