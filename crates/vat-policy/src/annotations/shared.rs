//! Annotations shared across assay types.

use polars::prelude::{DataFrame, NamedFrom, Series};

use vat_engine::values::{
    any_to_i64, column_value_i64, column_value_string, parse_json_list,
};
use vat_model::{PipelineError, Result};

use crate::context::AnnotationContext;

const XPOS_CONTIG_STRIDE: i64 = 1_000_000_000;

/// Canonical display identifier `contig-position-ref-alt`, from the key
/// columns. Rows with fewer than two alleles get no identifier.
pub fn variant_id(df: &mut DataFrame, _ctx: &AnnotationContext<'_>) -> Result<()> {
    require_columns(df, &["contig", "position", "alleles"], "variant_id")?;
    let values: Vec<Option<String>> = (0..df.height())
        .map(|idx| {
            let contig = column_value_string(df, "contig", idx);
            let position = column_value_i64(df, "position", idx)?;
            let alleles = parse_json_list(&column_value_string(df, "alleles", idx))?;
            let reference = alleles.first()?;
            let alternate = alleles.get(1)?;
            Some(format!("{contig}-{position}-{reference}-{alternate}"))
        })
        .collect();
    df.with_column(Series::new("variant_id".into(), values))
        .map_err(PipelineError::engine)?;
    Ok(())
}

/// Globally sortable position encoding: contig ordinal scaled out of the
/// position range, plus the position.
pub fn xpos(df: &mut DataFrame, ctx: &AnnotationContext<'_>) -> Result<()> {
    require_columns(df, &["contig", "position"], "xpos")?;
    let values: Vec<Option<i64>> = (0..df.height())
        .map(|idx| {
            let contig = column_value_string(df, "contig", idx);
            let ordinal = ctx.genome_build.contig_ordinal(&contig)?;
            let position = column_value_i64(df, "position", idx)?;
            Some(ordinal * XPOS_CONTIG_STRIDE + position)
        })
        .collect();
    df.with_column(Series::new("xpos".into(), values))
        .map_err(PipelineError::engine)?;
    Ok(())
}

/// Entry-level genotype normalization: a VCF-style `GT` call string becomes
/// an alternate-allele count under `num_alt` (-1 convention is not used;
/// uncalled genotypes stay null).
pub fn gt(df: &mut DataFrame, _ctx: &AnnotationContext<'_>) -> Result<()> {
    require_columns(df, &["GT"], "gt")?;
    let values: Vec<Option<i64>> = (0..df.height())
        .map(|idx| {
            let call = column_value_string(df, "GT", idx);
            if call.is_empty() {
                return None;
            }
            let mut num_alt = 0i64;
            for part in call.split(['/', '|']) {
                match part {
                    "." => return None,
                    "0" => {}
                    _ => num_alt += 1,
                }
            }
            Some(num_alt)
        })
        .collect();
    df.with_column(Series::new("num_alt".into(), values))
        .map_err(PipelineError::engine)?;
    Ok(())
}

/// Entry-level genotype quality, normalized to an integer.
pub fn gq(df: &mut DataFrame, _ctx: &AnnotationContext<'_>) -> Result<()> {
    require_columns(df, &["GQ"], "gq")?;
    let source = df.column("GQ").map_err(PipelineError::engine)?;
    let values: Vec<Option<i64>> = (0..df.height())
        .map(|idx| any_to_i64(source.get(idx).ok()?))
        .collect();
    let series = Series::new("GQ".into(), values);
    df.with_column(series).map_err(PipelineError::engine)?;
    Ok(())
}

pub(crate) fn require_columns(df: &DataFrame, columns: &[&str], annotation: &str) -> Result<()> {
    for column in columns {
        if df.column(column).is_err() {
            return Err(PipelineError::configuration(format!(
                "annotation {annotation} requires column {column}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::Column;
    use vat_model::{EnvConfig, GenomeBuild};

    fn ctx(env: &EnvConfig) -> AnnotationContext<'_> {
        AnnotationContext::new(env, GenomeBuild::Grch38)
    }

    #[test]
    fn variant_id_formats_canonical_keys() {
        let env = EnvConfig::default();
        let columns: Vec<Column> = vec![
            Series::new("contig".into(), vec!["chr1", "chr2"]).into(),
            Series::new("position".into(), vec![100i64, 200]).into(),
            Series::new("alleles".into(), vec!["[\"A\",\"T\"]", "[\"G\"]"]).into(),
        ];
        let mut df = DataFrame::new(columns).unwrap();
        variant_id(&mut df, &ctx(&env)).unwrap();
        let ids = df.column("variant_id").unwrap().str().unwrap();
        assert_eq!(ids.get(0), Some("chr1-100-A-T"));
        assert_eq!(ids.get(1), None); // single-allele row has no alternate
    }

    #[test]
    fn xpos_encodes_contig_and_position() {
        let env = EnvConfig::default();
        let columns: Vec<Column> = vec![
            Series::new("contig".into(), vec!["chr1", "chrX", "weird"]).into(),
            Series::new("position".into(), vec![100i64, 5, 1]).into(),
        ];
        let mut df = DataFrame::new(columns).unwrap();
        xpos(&mut df, &ctx(&env)).unwrap();
        let xs = df.column("xpos").unwrap().i64().unwrap();
        assert_eq!(xs.get(0), Some(1_000_000_100));
        assert_eq!(xs.get(1), Some(23_000_000_005));
        assert_eq!(xs.get(2), None);
    }

    #[test]
    fn gt_counts_alternate_alleles() {
        let env = EnvConfig::default();
        let columns: Vec<Column> = vec![
            Series::new("GT".into(), vec![Some("0/0"), Some("0/1"), Some("1|1"), Some("./."), None])
                .into(),
        ];
        let mut df = DataFrame::new(columns).unwrap();
        gt(&mut df, &ctx(&env)).unwrap();
        let alts = df.column("num_alt").unwrap().i64().unwrap();
        assert_eq!(alts.get(0), Some(0));
        assert_eq!(alts.get(1), Some(1));
        assert_eq!(alts.get(2), Some(2));
        assert_eq!(alts.get(3), None);
        assert_eq!(alts.get(4), None);
    }
}
