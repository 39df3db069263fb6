//! Shared utilities for reading and rebuilding columns.
//!
//! Cleaning actions work on plain vectors extracted from a column and rebuild a
//! `Series` afterwards. The helpers here do the extraction in one place so every
//! action agrees on what "missing" and "text form" mean.

use polars::prelude::*;
use serde_json::Value;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || is_float_dtype(dtype)
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Check if a DataType is a floating point type.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Short dtype label used in dataset analysis (`int64`, `float64`, `object`, ...).
pub fn dtype_label(dtype: &DataType) -> String {
    match dtype {
        DataType::Boolean => "bool".to_string(),
        DataType::String | DataType::Categorical(_, _) => "object".to_string(),
        DataType::Datetime(_, _) => "datetime64".to_string(),
        DataType::Date => "date".to_string(),
        DataType::Int8 => "int8".to_string(),
        DataType::Int16 => "int16".to_string(),
        DataType::Int32 => "int32".to_string(),
        DataType::Int64 => "int64".to_string(),
        DataType::UInt8 => "uint8".to_string(),
        DataType::UInt16 => "uint16".to_string(),
        DataType::UInt32 => "uint32".to_string(),
        DataType::UInt64 => "uint64".to_string(),
        DataType::Float32 => "float32".to_string(),
        DataType::Float64 => "float64".to_string(),
        other => other.to_string(),
    }
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Format a float the way a Python `str()` call renders it (`3.0`, `0.25`, `1e-05`, `nan`).
///
/// Magnitudes below `1e-4` or from `1e16` up use exponent form with a signed,
/// two-digit exponent.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{value:e}");
        let (mantissa, exponent) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        return format!("{mantissa}e{sign}{digits:0>2}");
    }
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Numeric values of a column, with nulls and NaN both reported as missing.
///
/// Booleans and temporal columns are read through their physical integer value.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let as_float = if is_datetime_dtype(series.dtype()) {
        series.cast(&DataType::Int64)?.cast(&DataType::Float64)?
    } else {
        series.cast(&DataType::Float64)?
    };
    Ok(as_float
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Text form of every value of a column; `None` marks a missing value.
pub fn text_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let dtype = series.dtype();

    if matches!(dtype, DataType::String) {
        return Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect());
    }

    if is_integer_dtype(dtype) {
        let ints = series.cast(&DataType::Int64)?;
        return Ok(ints
            .i64()?
            .into_iter()
            .map(|v| v.map(|i| i.to_string()))
            .collect());
    }

    if is_float_dtype(dtype) {
        let floats = series.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()).map(format_float))
            .collect());
    }

    if matches!(dtype, DataType::Boolean) {
        return Ok(series
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { "True" } else { "False" }.to_string()))
            .collect());
    }

    if matches!(dtype, DataType::Categorical(_, _)) {
        return text_values(&series.cast(&DataType::String)?);
    }

    let mut values = Vec::with_capacity(series.len());
    for i in 0..series.len() {
        let value = series.get(i)?;
        if value.is_null() {
            values.push(None);
        } else {
            values.push(Some(format!("{value}")));
        }
    }
    Ok(values)
}

/// JSON form of every value of a column; missing values become `null`.
pub fn json_values(series: &Series) -> PolarsResult<Vec<Value>> {
    let dtype = series.dtype();

    if is_integer_dtype(dtype) {
        let ints = series.cast(&DataType::Int64)?;
        return Ok(ints
            .i64()?
            .into_iter()
            .map(|v| v.map(Value::from).unwrap_or(Value::Null))
            .collect());
    }

    if is_float_dtype(dtype) {
        return Ok(numeric_values(series)?
            .into_iter()
            .map(|v| v.map(Value::from).unwrap_or(Value::Null))
            .collect());
    }

    if matches!(dtype, DataType::Boolean) {
        return Ok(series
            .bool()?
            .into_iter()
            .map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
            .collect());
    }

    Ok(text_values(series)?
        .into_iter()
        .map(|v| v.map(Value::String).unwrap_or(Value::Null))
        .collect())
}

/// Text form of a JSON scalar as it would be written into a text column.
pub fn json_scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => n.as_f64().map(format_float),
        },
        other => Some(other.to_string()),
    }
}

/// Collect the first `max_values` distinct non-missing values, in order of appearance.
pub fn first_distinct_values(series: &Series, max_values: usize) -> PolarsResult<Vec<Value>> {
    let texts = text_values(series)?;
    let jsons = json_values(series)?;
    let mut seen = std::collections::HashSet::new();
    let mut samples = Vec::new();

    for (text, json) in texts.into_iter().zip(jsons) {
        if samples.len() >= max_values {
            break;
        }
        if let Some(text) = text
            && seen.insert(text)
        {
            samples.push(json);
        }
    }

    Ok(samples)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_dtype_label() {
        assert_eq!(dtype_label(&DataType::Int64), "int64");
        assert_eq!(dtype_label(&DataType::Float64), "float64");
        assert_eq!(dtype_label(&DataType::String), "object");
        assert_eq!(dtype_label(&DataType::Boolean), "bool");
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(3.0), "3.0");
        assert_eq!(format_float(0.25), "0.25");
        assert_eq!(format_float(-2.0), "-2.0");
        assert_eq!(format_float(f64::NAN), "nan");
    }

    #[test]
    fn test_format_float_exponent_form() {
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(-2.5e20), "-2.5e+20");
        assert_eq!(format_float(1e-4), "0.0001");
        assert_eq!(format_float(1e15), "1000000000000000.0");
        assert_eq!(format_float(0.0), "0.0");
    }

    #[test]
    fn test_numeric_values_treat_nan_as_missing() {
        let series = Series::new("x".into(), &[Some(1.0), None, Some(f64::NAN)]);
        let values = numeric_values(&series).unwrap();
        assert_eq!(values, vec![Some(1.0), None, None]);
    }

    #[test]
    fn test_text_values_per_dtype() {
        let ints = Series::new("i".into(), &[Some(3i64), None]);
        assert_eq!(
            text_values(&ints).unwrap(),
            vec![Some("3".to_string()), None]
        );

        let floats = Series::new("f".into(), &[1.5f64, 2.0]);
        assert_eq!(
            text_values(&floats).unwrap(),
            vec![Some("1.5".to_string()), Some("2.0".to_string())]
        );

        let bools = Series::new("b".into(), &[true, false]);
        assert_eq!(
            text_values(&bools).unwrap(),
            vec![Some("True".to_string()), Some("False".to_string())]
        );
    }

    #[test]
    fn test_json_scalar_text() {
        assert_eq!(json_scalar_text(&Value::from(0)), Some("0".to_string()));
        assert_eq!(json_scalar_text(&Value::from(2.5)), Some("2.5".to_string()));
        assert_eq!(json_scalar_text(&Value::from("x")), Some("x".to_string()));
        assert_eq!(json_scalar_text(&Value::Null), None);
    }

    #[test]
    fn test_first_distinct_values() {
        let series = Series::new(
            "city".into(),
            &[Some("a"), None, Some("b"), Some("a"), Some("c")],
        );
        let samples = first_distinct_values(&series, 2).unwrap();
        assert_eq!(samples, vec![Value::from("a"), Value::from("b")]);
    }
}
