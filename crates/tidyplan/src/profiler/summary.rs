//! Describe-style summary statistics.

use crate::engine::stats;
use crate::utils::{is_numeric_dtype, numeric_values, text_values};
use polars::prelude::*;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Summary statistics of one column.
///
/// Every column gets `count`. Numeric columns add `mean`, `std`, `min`, `25%`,
/// `50%`, `75%` and `max`; other columns add `unique`, `top` and `freq`.
/// Statistics that cannot be computed are `null`.
pub(crate) fn describe_column(series: &Series) -> PolarsResult<BTreeMap<String, Value>> {
    let mut stats_map = BTreeMap::new();

    if is_numeric_dtype(series.dtype()) {
        let values = numeric_values(series)?;
        let sorted = stats::sorted_present(&values);
        let number = |v: Option<f64>| v.map(Value::from).unwrap_or(Value::Null);

        stats_map.insert("count".to_string(), Value::from(sorted.len()));
        stats_map.insert("mean".to_string(), number(stats::mean(&values)));
        stats_map.insert("std".to_string(), number(stats::sample_std(&values)));
        stats_map.insert("min".to_string(), number(sorted.first().copied()));
        stats_map.insert("25%".to_string(), number(stats::quantile_sorted(&sorted, 0.25)));
        stats_map.insert("50%".to_string(), number(stats::quantile_sorted(&sorted, 0.5)));
        stats_map.insert("75%".to_string(), number(stats::quantile_sorted(&sorted, 0.75)));
        stats_map.insert("max".to_string(), number(sorted.last().copied()));
        return Ok(stats_map);
    }

    let texts = text_values(series)?;
    let present = texts.iter().flatten().count();
    let unique = texts.iter().flatten().collect::<HashSet<_>>().len();
    stats_map.insert("count".to_string(), Value::from(present));
    stats_map.insert("unique".to_string(), Value::from(unique));

    match stats::top_text(&texts) {
        Some((top, freq)) => {
            stats_map.insert("top".to_string(), Value::from(top));
            stats_map.insert("freq".to_string(), Value::from(freq));
        }
        None => {
            stats_map.insert("top".to_string(), Value::Null);
            stats_map.insert("freq".to_string(), Value::Null);
        }
    }

    Ok(stats_map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_numeric() {
        let series = Series::new("x".into(), &[Some(1.0), Some(2.0), None, Some(3.0), Some(4.0)]);
        let summary = describe_column(&series).unwrap();
        assert_eq!(summary["count"], 4);
        assert_eq!(summary["mean"], 2.5);
        assert_eq!(summary["min"], 1.0);
        assert_eq!(summary["50%"], 2.5);
        assert_eq!(summary["max"], 4.0);
        assert!(!summary.contains_key("top"));
    }

    #[test]
    fn test_describe_text() {
        let series = Series::new("c".into(), &[Some("a"), Some("b"), Some("b"), None]);
        let summary = describe_column(&series).unwrap();
        assert_eq!(summary["count"], 3);
        assert_eq!(summary["unique"], 2);
        assert_eq!(summary["top"], "b");
        assert_eq!(summary["freq"], 2);
    }

    #[test]
    fn test_describe_single_value_std_is_null() {
        let series = Series::new("x".into(), &[5i64]);
        let summary = describe_column(&series).unwrap();
        assert_eq!(summary["std"], Value::Null);
    }
}
