//! Point-mutation (SNV/indel) annotations.

use polars::prelude::{DataFrame, NamedFrom, Series};

use vat_engine::table::composite_key;
use vat_engine::values::{column_value_f64, column_value_i64, column_value_string, parse_json_list};
use vat_model::{PipelineError, Result};

use crate::annotations::shared::require_columns;
use crate::collections::ReferenceCollection;
use crate::context::AnnotationContext;

/// Regional constraint z-score from the interval collection.
///
/// All interval rows overlapping the variant position are candidates; the
/// first one (in collection row order) carrying a defined z-score wins.
pub fn gnomad_non_coding_constraint(
    df: &mut DataFrame,
    ctx: &AnnotationContext<'_>,
) -> Result<()> {
    require_columns(df, &["contig", "position"], "gnomad_non_coding_constraint")?;
    let preattached = ctx.preattached(ReferenceCollection::Interval)?;
    let source = "gnomad_non_coding_constraint.z_score";
    let values: Vec<Option<f64>> = (0..df.height())
        .map(|idx| {
            let contig = column_value_string(df, "contig", idx);
            let position = column_value_i64(df, "position", idx)?;
            preattached
                .index
                .all_matches(&contig, position)
                .into_iter()
                .find_map(|row| column_value_f64(preattached.table.data(), source, row))
        })
        .collect();
    df.with_column(Series::new(source.into(), values))
        .map_err(PipelineError::engine)?;
    Ok(())
}

/// Regulatory region-type ids from the interval collection, flat-mapped
/// across every overlapping interval row.
pub fn screen(df: &mut DataFrame, ctx: &AnnotationContext<'_>) -> Result<()> {
    require_columns(df, &["contig", "position"], "screen")?;
    let preattached = ctx.preattached(ReferenceCollection::Interval)?;
    let source = "screen.region_type_ids";
    let values: Vec<Option<String>> = (0..df.height())
        .map(|idx| {
            let contig = column_value_string(df, "contig", idx);
            let position = column_value_i64(df, "position", idx)?;
            let mut ids: Vec<serde_json::Value> = Vec::new();
            for row in preattached.index.all_matches(&contig, position) {
                let cell = column_value_string(preattached.table.data(), source, row);
                if cell.is_empty() {
                    continue;
                }
                if let Ok(serde_json::Value::Array(items)) = serde_json::from_str(cell.trim()) {
                    ids.extend(items);
                }
            }
            serde_json::to_string(&ids).ok()
        })
        .collect();
    df.with_column(Series::new(source.into(), values))
        .map_err(PipelineError::engine)?;
    Ok(())
}

/// Entry-level allele balance from the `AD` depth pair.
pub fn ab(df: &mut DataFrame, _ctx: &AnnotationContext<'_>) -> Result<()> {
    require_columns(df, &["AD"], "ab")?;
    let values: Vec<Option<f64>> = (0..df.height())
        .map(|idx| {
            let depths = parse_json_list(&column_value_string(df, "AD", idx))?;
            let reference: f64 = depths.first()?.parse().ok()?;
            let alternate: f64 = depths.get(1)?.parse().ok()?;
            let total = reference + alternate;
            if total == 0.0 {
                return None;
            }
            Some(alternate / total)
        })
        .collect();
    df.with_column(Series::new("ab".into(), values))
        .map_err(PipelineError::engine)?;
    Ok(())
}

/// Entry-level read depth: the sum of the `AD` pair, falling back to a
/// pre-existing `DP` value.
pub fn dp(df: &mut DataFrame, _ctx: &AnnotationContext<'_>) -> Result<()> {
    let values: Vec<Option<i64>> = (0..df.height())
        .map(|idx| {
            let cell = column_value_string(df, "AD", idx);
            if !cell.is_empty() {
                if let Some(depths) = parse_json_list(&cell) {
                    let mut total = 0i64;
                    let mut any = false;
                    for depth in depths {
                        if let Ok(parsed) = depth.parse::<i64>() {
                            total += parsed;
                            any = true;
                        }
                    }
                    if any {
                        return Some(total);
                    }
                }
            }
            column_value_i64(df, "DP", idx)
        })
        .collect();
    df.with_column(Series::new("DP".into(), values))
        .map_err(PipelineError::engine)?;
    Ok(())
}

/// Per-variant genotype-class statistics from the sample lookup table:
/// allele counts, allele number, frequency, and homozygote count.
pub fn gt_stats(df: &mut DataFrame, ctx: &AnnotationContext<'_>) -> Result<()> {
    let lookup = ctx.sample_lookup()?;
    let index = lookup.key_index();
    let key_columns = lookup.key_columns();
    require_columns(df, key_columns, "gt_stats")?;

    let mut ac: Vec<Option<i64>> = Vec::with_capacity(df.height());
    let mut an: Vec<Option<i64>> = Vec::with_capacity(df.height());
    let mut af: Vec<Option<f64>> = Vec::with_capacity(df.height());
    let mut hom: Vec<Option<i64>> = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let key = composite_key(df, key_columns, idx);
        match index.get(&key) {
            Some(&row) => {
                let refs = column_value_i64(lookup.data(), "ref_samples", row).unwrap_or(0);
                let hets = column_value_i64(lookup.data(), "het_samples", row).unwrap_or(0);
                let homs = column_value_i64(lookup.data(), "hom_samples", row).unwrap_or(0);
                let allele_count = hets + 2 * homs;
                let allele_number = 2 * (refs + hets + homs);
                ac.push(Some(allele_count));
                an.push(Some(allele_number));
                af.push(if allele_number > 0 {
                    Some(allele_count as f64 / allele_number as f64)
                } else {
                    None
                });
                hom.push(Some(homs));
            }
            None => {
                ac.push(None);
                an.push(None);
                af.push(None);
                hom.push(None);
            }
        }
    }
    df.with_column(Series::new("gt_stats.AC".into(), ac))
        .map_err(PipelineError::engine)?;
    df.with_column(Series::new("gt_stats.AN".into(), an))
        .map_err(PipelineError::engine)?;
    df.with_column(Series::new("gt_stats.AF".into(), af))
        .map_err(PipelineError::engine)?;
    df.with_column(Series::new("gt_stats.hom".into(), hom))
        .map_err(PipelineError::engine)?;
    Ok(())
}
