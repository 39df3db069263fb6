//! Column and table transforms behind each cleaning action.

use super::stats;
use crate::error::{CleaningError, Result};
use crate::plan::{ImputeMethod, ScaleMethod};
use crate::utils::{
    dtype_label, is_float_dtype, is_integer_dtype, is_numeric_dtype, json_scalar_text,
    numeric_values, text_values,
};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use serde_json::Value;

/// Characters removed by `standardize` with `remove_special_chars`.
static SPECIAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("Invalid regex: special characters"));

/// Numeric values of a column that must hold numbers.
pub fn require_numeric(series: &Series) -> Result<Vec<Option<f64>>> {
    let dtype = series.dtype();
    if !is_numeric_dtype(dtype) && !matches!(dtype, DataType::Boolean) {
        return Err(CleaningError::NonNumericColumn {
            column: series.name().to_string(),
            dtype: dtype_label(dtype),
        });
    }
    Ok(numeric_values(series)?)
}

fn has_missing(series: &Series) -> Result<bool> {
    if series.null_count() > 0 {
        return Ok(true);
    }
    if is_float_dtype(series.dtype()) {
        return Ok(numeric_values(series)?.iter().any(Option::is_none));
    }
    Ok(false)
}

// =============================================================================
// Imputation
// =============================================================================

/// Replace missing values of a column.
pub fn impute(series: &Series, method: &ImputeMethod) -> Result<Series> {
    match method {
        ImputeMethod::Mean => impute_statistic(series, stats::mean),
        ImputeMethod::Median => impute_statistic(series, stats::median),
        ImputeMethod::Mode => impute_mode(series),
        ImputeMethod::Constant(value) => impute_constant(series, value),
    }
}

fn impute_statistic(series: &Series, statistic: fn(&[Option<f64>]) -> Option<f64>) -> Result<Series> {
    let values = require_numeric(series)?;
    if !has_missing(series)? {
        return Ok(series.clone());
    }
    let Some(fill) = statistic(&values) else {
        return Ok(series.clone());
    };
    let filled: Vec<Option<f64>> = values.into_iter().map(|v| Some(v.unwrap_or(fill))).collect();
    Ok(Series::new(series.name().clone(), filled))
}

fn impute_mode(series: &Series) -> Result<Series> {
    if !has_missing(series)? {
        return Ok(series.clone());
    }
    let dtype = series.dtype().clone();

    if is_numeric_dtype(&dtype) || matches!(dtype, DataType::Boolean) {
        let values = numeric_values(series)?;
        let Some(fill) = stats::mode(&values) else {
            return Ok(series.clone());
        };
        let filled: Vec<Option<f64>> = values.into_iter().map(|v| Some(v.unwrap_or(fill))).collect();
        let filled = Series::new(series.name().clone(), filled);
        if is_float_dtype(&dtype) {
            return Ok(filled);
        }
        return Ok(filled.cast(&DataType::Int64)?.cast(&dtype)?);
    }

    let texts = text_values(series)?;
    let Some(fill) = stats::mode_text(&texts) else {
        return Ok(series.clone());
    };
    let filled: Vec<String> = texts
        .into_iter()
        .map(|t| t.unwrap_or_else(|| fill.clone()))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

fn impute_constant(series: &Series, value: &Value) -> Result<Series> {
    if value.is_null() || !has_missing(series)? {
        return Ok(series.clone());
    }
    let name = series.name().clone();
    let dtype = series.dtype();

    if is_integer_dtype(dtype)
        && let Some(fill) = value.as_i64()
    {
        let ints = series.cast(&DataType::Int64)?;
        let filled: Vec<Option<i64>> = ints.i64()?.into_iter().map(|v| Some(v.unwrap_or(fill))).collect();
        return Ok(Series::new(name, filled));
    }

    if is_numeric_dtype(dtype)
        && let Some(fill) = value.as_f64()
    {
        let filled: Vec<Option<f64>> = numeric_values(series)?
            .into_iter()
            .map(|v| Some(v.unwrap_or(fill)))
            .collect();
        return Ok(Series::new(name, filled));
    }

    if matches!(dtype, DataType::Boolean)
        && let Some(fill) = value.as_bool()
    {
        let filled: Vec<Option<bool>> = series.bool()?.into_iter().map(|v| Some(v.unwrap_or(fill))).collect();
        return Ok(Series::new(name, filled));
    }

    // Mixed fill: the column falls back to text.
    let fill = json_scalar_text(value).unwrap_or_default();
    let filled: Vec<String> = text_values(series)?
        .into_iter()
        .map(|t| t.unwrap_or_else(|| fill.clone()))
        .collect();
    Ok(Series::new(name, filled))
}

// =============================================================================
// Text Actions
// =============================================================================

fn text_or_nan(series: &Series) -> Result<Vec<String>> {
    Ok(text_values(series)?
        .into_iter()
        .map(|t| t.unwrap_or_else(|| "nan".to_string()))
        .collect())
}

/// Lower-case and trim; optionally drop everything but word characters and whitespace.
pub fn standardize(series: &Series, remove_special_chars: bool) -> Result<Series> {
    let values: Vec<String> = text_or_nan(series)?
        .into_iter()
        .map(|text| {
            let text = text.to_lowercase().trim().to_string();
            if remove_special_chars {
                SPECIAL_CHARS.replace_all(&text, "").into_owned()
            } else {
                text
            }
        })
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Trim leading and trailing whitespace.
pub fn strip_whitespace(series: &Series) -> Result<Series> {
    let values: Vec<String> = text_or_nan(series)?
        .into_iter()
        .map(|text| text.trim().to_string())
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

// =============================================================================
// Rescaling
// =============================================================================

/// `(x - min) / (max - min)`; a constant column becomes NaN.
pub fn min_max(series: &Series) -> Result<Series> {
    let values = require_numeric(series)?;
    let (Some(min), Some(max)) = (stats::min(&values), stats::max(&values)) else {
        return Ok(Series::new(series.name().clone(), values));
    };
    let range = max - min;
    let scaled: Vec<Option<f64>> = values.iter().map(|v| v.map(|x| (x - min) / range)).collect();
    Ok(Series::new(series.name().clone(), scaled))
}

/// `(x - mean) / std` with the sample standard deviation.
pub fn z_score(series: &Series) -> Result<Series> {
    let values = require_numeric(series)?;
    let (Some(mean), Some(std)) = (stats::mean(&values), stats::sample_std(&values)) else {
        return Ok(Series::new(series.name().clone(), values));
    };
    let scaled: Vec<Option<f64>> = values.iter().map(|v| v.map(|x| (x - mean) / std)).collect();
    Ok(Series::new(series.name().clone(), scaled))
}

pub fn scale(series: &Series, method: ScaleMethod) -> Result<Series> {
    match method {
        ScaleMethod::ZScore => z_score(series),
        ScaleMethod::MinMax => min_max(series),
    }
}

// =============================================================================
// Value Mapping
// =============================================================================

/// Replace values equal to a mapping key with the mapped value.
///
/// Numeric columns compare numerically, everything else compares on text form.
/// When every mapped value fits the column type the type is kept. A text column
/// whose present values all map onto numbers becomes `Int64` (or `Float64` when a
/// target is fractional). Any other mix yields text.
pub fn map_values(series: &Series, mapping: &[(Value, Value)]) -> Result<Series> {
    if mapping.is_empty() {
        return Ok(series.clone());
    }
    let name = series.name().clone();
    let dtype = series.dtype();

    if is_numeric_dtype(dtype) {
        let keys: Vec<(Option<f64>, &Value)> = mapping
            .iter()
            .map(|(from, to)| (numeric_key(from), to))
            .collect();
        let values = numeric_values(series)?;
        let lookup = |x: f64| keys.iter().find(|(k, _)| *k == Some(x)).map(|(_, to)| *to);

        if mapping.iter().all(|(_, to)| to.is_null() || to.is_number()) {
            let mapped: Vec<Option<f64>> = values
                .iter()
                .map(|v| match v.map(|x| (x, lookup(x))) {
                    Some((_, Some(to))) => to.as_f64(),
                    Some((x, None)) => Some(x),
                    None => None,
                })
                .collect();
            let mapped = Series::new(name, mapped);
            let all_integral = is_integer_dtype(dtype)
                && mapping.iter().all(|(_, to)| to.is_null() || to.is_i64() || to.is_u64());
            return Ok(if all_integral {
                mapped.cast(&DataType::Int64)?
            } else {
                mapped
            });
        }

        let texts = text_values(series)?;
        let mapped: Vec<Option<String>> = values
            .iter()
            .zip(texts)
            .map(|(v, text)| match v.and_then(lookup) {
                Some(to) => json_scalar_text(to),
                None => text,
            })
            .collect();
        return Ok(Series::new(name, mapped));
    }

    let keys: Vec<(Option<String>, &Value)> = mapping
        .iter()
        .map(|(from, to)| (json_scalar_text(from), to))
        .collect();
    let texts = text_values(series)?;
    let hits: Vec<Option<&Value>> = texts
        .iter()
        .map(|text| {
            text.as_ref()
                .and_then(|t| keys.iter().find(|(k, _)| k.as_deref() == Some(t.as_str())))
                .map(|(_, to)| *to)
        })
        .collect();

    // Every present value mapped onto a number: the column becomes numeric.
    let all_numeric = texts.iter().zip(&hits).all(|(text, hit)| match hit {
        Some(to) => to.is_null() || to.is_number(),
        None => text.is_none(),
    });
    if all_numeric && hits.iter().flatten().any(|to| to.is_number()) {
        let numbers: Vec<Option<f64>> = hits.iter().map(|hit| hit.and_then(Value::as_f64)).collect();
        let numbers = Series::new(name, numbers);
        let all_integral = hits
            .iter()
            .flatten()
            .all(|to| to.is_null() || to.is_i64() || to.is_u64());
        return Ok(if all_integral {
            numbers.cast(&DataType::Int64)?
        } else {
            numbers
        });
    }

    let mapped: Vec<Option<String>> = texts
        .into_iter()
        .zip(&hits)
        .map(|(text, hit)| match hit {
            Some(to) => json_scalar_text(to),
            None => text,
        })
        .collect();

    let mapped = Series::new(name, mapped);
    if matches!(dtype, DataType::Boolean) {
        // Keep booleans when the mapping only swaps True/False.
        if let Ok(back) = mapped.strict_cast(&DataType::Boolean) {
            return Ok(back);
        }
    }
    Ok(mapped)
}

fn numeric_key(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

// =============================================================================
// Table Actions
// =============================================================================

/// Remove a column; an absent column leaves the table unchanged.
pub fn drop_column(df: &DataFrame, column: &str) -> Result<DataFrame> {
    if df.column(column).is_err() {
        return Ok(df.clone());
    }
    Ok(df.drop_many(vec![PlSmallStr::from(column)]))
}

/// Remove rows equal to an earlier row across all columns, keeping the first.
pub fn remove_duplicates(df: &DataFrame) -> Result<DataFrame> {
    Ok(df.unique_stable(None, UniqueKeepStrategy::First, None)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn floats(series: &Series) -> Vec<Option<f64>> {
        series.f64().unwrap().into_iter().collect()
    }

    fn strings(series: &Series) -> Vec<Option<String>> {
        series
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_impute_mean_and_median() {
        let series = Series::new("x".into(), &[Some(1.0), None, Some(2.0), Some(9.0)]);
        assert_eq!(
            floats(&impute(&series, &ImputeMethod::Mean).unwrap()),
            vec![Some(1.0), Some(4.0), Some(2.0), Some(9.0)]
        );
        assert_eq!(
            floats(&impute(&series, &ImputeMethod::Median).unwrap()),
            vec![Some(1.0), Some(2.0), Some(2.0), Some(9.0)]
        );
    }

    #[test]
    fn test_impute_mean_rejects_text() {
        let series = Series::new("city".into(), &[Some("a"), None]);
        let err = impute(&series, &ImputeMethod::Mean).unwrap_err();
        assert_eq!(err.error_code(), "NON_NUMERIC_COLUMN");
    }

    #[test]
    fn test_impute_mode_text_and_numbers() {
        let text = Series::new("c".into(), &[Some("b"), Some("a"), None, Some("b")]);
        assert_eq!(
            strings(&impute(&text, &ImputeMethod::Mode).unwrap()),
            vec![Some("b".into()), Some("a".into()), Some("b".into()), Some("b".into())]
        );

        let ints = Series::new("n".into(), &[Some(2i64), Some(1), None, Some(2), Some(1)]);
        let out = impute(&ints, &ImputeMethod::Mode).unwrap();
        assert_eq!(out.dtype(), &DataType::Int64);
        let values: Vec<Option<i64>> = out.i64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(2), Some(1), Some(1), Some(2), Some(1)]);
    }

    #[test]
    fn test_impute_constant() {
        let series = Series::new("x".into(), &[Some(1.5), None]);
        assert_eq!(
            floats(&impute(&series, &ImputeMethod::Constant(json!(0))).unwrap()),
            vec![Some(1.5), Some(0.0)]
        );

        let ints = Series::new("n".into(), &[Some(7i64), None]);
        let out = impute(&ints, &ImputeMethod::Constant(json!(0))).unwrap();
        let values: Vec<Option<i64>> = out.i64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(7), Some(0)]);

        let text = Series::new("c".into(), &[None, Some("x")]);
        assert_eq!(
            strings(&impute(&text, &ImputeMethod::Constant(json!("Unknown"))).unwrap()),
            vec![Some("Unknown".into()), Some("x".into())]
        );
    }

    #[test]
    fn test_standardize() {
        let series = Series::new("c".into(), &[Some("  Hello, World! "), None]);
        assert_eq!(
            strings(&standardize(&series, false).unwrap()),
            vec![Some("hello, world!".into()), Some("nan".into())]
        );
        assert_eq!(
            strings(&standardize(&series, true).unwrap()),
            vec![Some("hello world".into()), Some("nan".into())]
        );
    }

    #[test]
    fn test_strip_whitespace_on_numbers() {
        let series = Series::new("n".into(), &[Some(1i64), None]);
        assert_eq!(
            strings(&strip_whitespace(&series).unwrap()),
            vec![Some("1".into()), Some("nan".into())]
        );
    }

    #[test]
    fn test_min_max_and_constant_column() {
        let series = Series::new("x".into(), &[Some(10.0), None, Some(20.0), Some(15.0)]);
        assert_eq!(
            floats(&min_max(&series).unwrap()),
            vec![Some(0.0), None, Some(1.0), Some(0.5)]
        );

        let constant = Series::new("x".into(), &[3.0, 3.0]);
        assert!(floats(&min_max(&constant).unwrap()).iter().all(|v| v.unwrap().is_nan()));
    }

    #[test]
    fn test_z_score() {
        let series = Series::new("x".into(), &[1.0, 2.0, 3.0]);
        assert_eq!(
            floats(&z_score(&series).unwrap()),
            vec![Some(-1.0), Some(0.0), Some(1.0)]
        );
    }

    #[test]
    fn test_map_values_text() {
        let series = Series::new("g".into(), &[Some("M"), Some("F"), None, Some("X")]);
        let mapping = vec![(json!("M"), json!("Male")), (json!("F"), json!("Female"))];
        assert_eq!(
            strings(&map_values(&series, &mapping).unwrap()),
            vec![Some("Male".into()), Some("Female".into()), None, Some("X".into())]
        );
    }

    #[test]
    fn test_map_values_numeric_keys() {
        let series = Series::new("n".into(), &[1i64, 2, 3]);
        let mapping = vec![(json!("1"), json!(10)), (json!("9"), json!(90))];
        let out = map_values(&series, &mapping).unwrap();
        assert_eq!(out.dtype(), &DataType::Int64);
        let values: Vec<Option<i64>> = out.i64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(10), Some(2), Some(3)]);
    }

    #[test]
    fn test_map_values_numeric_to_text() {
        let series = Series::new("n".into(), &[0i64, 1]);
        let mapping = vec![(json!("0"), json!("no")), (json!("1"), json!("yes"))];
        assert_eq!(
            strings(&map_values(&series, &mapping).unwrap()),
            vec![Some("no".into()), Some("yes".into())]
        );
    }

    #[test]
    fn test_map_values_text_to_numbers() {
        let series = Series::new("answer".into(), &[Some("yes"), Some("no"), None, Some("yes")]);
        let mapping = vec![(json!("yes"), json!(1)), (json!("no"), json!(0))];
        let out = map_values(&series, &mapping).unwrap();
        assert_eq!(out.dtype(), &DataType::Int64);
        let values: Vec<Option<i64>> = out.i64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1), Some(0), None, Some(1)]);

        let mapping = vec![(json!("yes"), json!(0.5)), (json!("no"), json!(0))];
        assert_eq!(
            floats(&map_values(&series, &mapping).unwrap()),
            vec![Some(0.5), Some(0.0), None, Some(0.5)]
        );
    }

    #[test]
    fn test_map_values_partial_numeric_stays_text() {
        let series = Series::new("answer".into(), &["yes", "maybe"]);
        let mapping = vec![(json!("yes"), json!(1))];
        assert_eq!(
            strings(&map_values(&series, &mapping).unwrap()),
            vec![Some("1".into()), Some("maybe".into())]
        );
    }

    #[test]
    fn test_drop_column() {
        let df = df!["a" => [1, 2], "b" => [3, 4]].unwrap();
        let out = drop_column(&df, "a").unwrap();
        let names: Vec<String> = out.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["b".to_string()]);
        let same = drop_column(&out, "a").unwrap();
        assert_eq!(same.width(), 1);
    }

    #[test]
    fn test_remove_duplicates() {
        let df = df![
            "a" => [Some(1), Some(1), None, None, Some(2)],
            "b" => [Some("x"), Some("x"), None, None, Some("x")],
        ]
        .unwrap();
        let out = remove_duplicates(&df).unwrap();
        assert_eq!(out.height(), 3);
        let a: Vec<Option<i32>> = out.column("a").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(a, vec![Some(1), None, Some(2)]);
    }

    #[test]
    fn test_remove_duplicates_signed_zero() {
        let df = df!["x" => [0.0, -0.0, 1.0], "y" => ["a", "a", "a"]].unwrap();
        let out = remove_duplicates(&df).unwrap();
        assert_eq!(out.height(), 2);
        let x: Vec<Option<f64>> = out.column("x").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(x, vec![Some(0.0), Some(1.0)]);
    }
}
