//! Dataset analysis.
//!
//! Produces the facts the language model sees about a table: shape, and for
//! every column its dtype, share of missing values, number of distinct values
//! and a few example values, plus describe-style summary statistics.

mod summary;

use crate::config::DEFAULT_MAX_EXAMPLE_VALUES;
use crate::error::Result;
use crate::types::{ColumnAnalysis, DatasetAnalysis};
use crate::utils::{dtype_label, first_distinct_values, text_values};
use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Dataset profiler.
#[derive(Debug, Clone, Copy)]
pub struct DataProfiler {
    max_examples: usize,
}

impl Default for DataProfiler {
    fn default() -> Self {
        Self {
            max_examples: DEFAULT_MAX_EXAMPLE_VALUES,
        }
    }
}

impl DataProfiler {
    pub fn new(max_examples: usize) -> Self {
        Self { max_examples }
    }

    /// Analyze a table.
    pub fn analyze(&self, df: &DataFrame) -> Result<DatasetAnalysis> {
        let mut columns = Vec::with_capacity(df.width());
        let mut summary = BTreeMap::new();

        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let name = series.name().to_string();
            columns.push((name.clone(), self.analyze_column(series)?));
            summary.insert(name, summary::describe_column(series)?);
        }

        debug!(
            "Analyzed {} rows x {} columns",
            df.height(),
            df.width()
        );

        Ok(DatasetAnalysis {
            shape: (df.height(), df.width()),
            columns,
            summary,
        })
    }

    fn analyze_column(&self, series: &Series) -> Result<ColumnAnalysis> {
        let texts = text_values(series)?;
        let missing = texts.iter().filter(|t| t.is_none()).count();
        let missing_pct = if texts.is_empty() {
            0.0
        } else {
            missing as f64 / texts.len() as f64 * 100.0
        };
        let unique_vals = texts.iter().flatten().collect::<HashSet<_>>().len();

        Ok(ColumnAnalysis {
            dtype: dtype_label(series.dtype()),
            missing_pct,
            unique_vals,
            example_vals: first_distinct_values(series, self.max_examples)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_analyze_shape_and_order() {
        let df = df![
            "b" => [1, 2, 3],
            "a" => ["x", "y", "z"],
        ]
        .unwrap();
        let analysis = DataProfiler::default().analyze(&df).unwrap();
        assert_eq!(analysis.shape, (3, 2));
        let names: Vec<&str> = analysis.columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_missing_pct_and_unique() {
        let df = df!["age" => [Some(30.0), None, Some(30.0), Some(f64::NAN)]].unwrap();
        let analysis = DataProfiler::default().analyze(&df).unwrap();
        let age = analysis.column("age").unwrap();
        assert_eq!(age.missing_pct, 50.0);
        assert_eq!(age.unique_vals, 1);
        assert_eq!(age.dtype, "float64");
        assert_eq!(age.example_vals, vec![json!(30.0)]);
    }

    #[test]
    fn test_first_five_examples() {
        let df = df!["n" => [7, 1, 7, 2, 3, 4, 5, 6]].unwrap();
        let analysis = DataProfiler::default().analyze(&df).unwrap();
        assert_eq!(
            analysis.column("n").unwrap().example_vals,
            vec![json!(7), json!(1), json!(2), json!(3), json!(4)]
        );
    }

    #[test]
    fn test_example_limit_is_configurable() {
        let df = df!["c" => ["a", "b", "c"]].unwrap();
        let analysis = DataProfiler::new(2).analyze(&df).unwrap();
        assert_eq!(analysis.column("c").unwrap().example_vals.len(), 2);
    }

    #[test]
    fn test_analysis_serializes() {
        let df = df!["c" => ["a", "b"]].unwrap();
        let analysis = DataProfiler::default().analyze(&df).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["shape"], json!([2, 1]));
        assert_eq!(json["summary"]["c"]["unique"], 2);
    }
}
