//! Type conversion for `convert_dtype`.
//!
//! Numeric conversion runs in three separate passes: [`filter_numeric_rows`]
//! drops rows whose value does not look like an unsigned decimal number,
//! [`coerce_numeric`] parses what is left, and [`cast_numeric`] produces the
//! final column.

use super::stats;
use crate::error::Result;
use crate::plan::NumericFill;
use crate::utils::{is_datetime_dtype, is_numeric_dtype, numeric_values, text_values};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

/// Text that survives the numeric row filter: digits with an optional fraction.
static NUMERIC_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(?:\.[0-9]+)?$").expect("Invalid regex: numeric text"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y%m%d", "%b %d, %Y",
    "%d %b %Y", "%B %d, %Y", "%d %B %Y",
];

/// Numeric target of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericTarget {
    Int,
    Float,
}

/// Keep rows whose value in `column` is missing or matches `^[0-9]+(\.[0-9]+)?$`.
///
/// Signs, exponents and surrounding whitespace do not match, so such rows are
/// removed together with non-numeric text.
pub fn filter_numeric_rows(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let series = df.column(column)?.as_materialized_series();
    let mask_values: Vec<bool> = text_values(series)?
        .iter()
        .map(|text| match text {
            None => true,
            Some(text) => NUMERIC_TEXT.is_match(text),
        })
        .collect();

    let mask = BooleanChunked::from_slice("mask".into(), &mask_values);
    Ok(df.filter(&mask)?)
}

/// Parse every value as a float; values that do not parse become missing.
pub fn coerce_numeric(series: &Series) -> Result<Vec<Option<f64>>> {
    if is_numeric_dtype(series.dtype()) || matches!(series.dtype(), DataType::Boolean) {
        return Ok(numeric_values(series)?);
    }

    Ok(text_values(series)?
        .into_iter()
        .map(|text| {
            text.and_then(|t| t.trim().parse::<f64>().ok())
                .filter(|v| !v.is_nan())
        })
        .collect())
}

/// Fill missing values with the mean or median of the present ones.
pub fn fill_numeric(values: Vec<Option<f64>>, fill: NumericFill) -> Vec<Option<f64>> {
    let statistic = match fill {
        NumericFill::Mean => stats::mean(&values),
        NumericFill::Median => stats::median(&values),
    };
    match statistic {
        Some(stat) => values.into_iter().map(|v| Some(v.unwrap_or(stat))).collect(),
        None => values,
    }
}

/// Build the final column; integer targets truncate toward zero.
pub fn cast_numeric(name: PlSmallStr, values: &[Option<f64>], target: NumericTarget) -> Series {
    match target {
        NumericTarget::Int => {
            let ints: Vec<Option<i64>> = values
                .iter()
                .map(|v| v.filter(|x| x.is_finite()).map(|x| x.trunc() as i64))
                .collect();
            Series::new(name, ints)
        }
        NumericTarget::Float => Series::new(name, values.to_vec()),
    }
}

/// Full numeric conversion of one column: filter, coerce, optionally fill, cast.
pub fn convert_numeric(
    df: &DataFrame,
    column: &str,
    target: NumericTarget,
    fill: Option<NumericFill>,
) -> Result<DataFrame> {
    let mut filtered = filter_numeric_rows(df, column)?;
    let series = filtered.column(column)?.as_materialized_series().clone();

    let mut values = coerce_numeric(&series)?;
    if let Some(fill) = fill {
        values = fill_numeric(values, fill);
    }

    let converted = cast_numeric(series.name().clone(), &values, target);
    filtered.replace(column, converted)?;
    Ok(filtered)
}

/// Text form of every value, with missing values written as `"nan"`.
pub fn to_text(series: &Series) -> Result<Series> {
    let texts: Vec<String> = text_values(series)?
        .into_iter()
        .map(|t| t.unwrap_or_else(|| "nan".to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), texts))
}

/// Parse one value into milliseconds since the epoch.
pub fn parse_datetime(text: &str, format: Option<&str>) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(format) = format {
        return parse_with_format(text, format);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }

    DATETIME_FORMATS
        .iter()
        .chain(DATE_FORMATS)
        .find_map(|format| parse_with_format(text, format))
}

fn parse_with_format(text: &str, format: &str) -> Option<i64> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
        return Some(dt.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Convert a column to a millisecond datetime; unparseable values become missing.
pub fn to_datetime(series: &Series, format: Option<&str>) -> Result<Series> {
    if is_datetime_dtype(series.dtype()) && !matches!(series.dtype(), DataType::Time) {
        return Ok(series.clone());
    }

    let millis: Vec<Option<i64>> = text_values(series)?
        .iter()
        .map(|text| text.as_deref().and_then(|t| parse_datetime(t, format)))
        .collect();

    Ok(Series::new(series.name().clone(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?)
}
