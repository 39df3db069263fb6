//! Writes reports and the cleaned table to an output directory.

use super::Report;
use crate::error::{CleaningError, Result, ResultExt};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the cleaned table.
pub const CLEANED_FILE_NAME: &str = "cleaned_data.csv";

/// Writes the cleaned table and the report files into one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `<stem>_report.md` and `<stem>_report.json`; returns both paths.
    pub fn write_report(&self, report: &Report, stem: &str) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(&self.output_dir)?;

        let md_path = self.output_dir.join(format!("{stem}_report.md"));
        fs::write(&md_path, report.to_markdown())
            .map_err(|e| CleaningError::ReportFailed(format!("{}: {e}", md_path.display())))?;

        let json_path = self.output_dir.join(format!("{stem}_report.json"));
        let mut file = File::create(&json_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", md_path.display());
        Ok((md_path, json_path))
    }

    /// Write the cleaned table as `cleaned_data.csv`.
    pub fn write_table(&self, df: &mut DataFrame) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(CLEANED_FILE_NAME);
        let mut file = File::create(&path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(df)
            .context(format!("Writing {}", path.display()))?;

        info!("Dataset saved: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::ReportBuilder;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tidyplan_writer_{name}"));
        fs::remove_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn test_write_report_files() {
        let dir = temp_dir("report");
        let report = ReportBuilder::new().add_section("EDA Summary", "ok").build();

        let (md, json) = ReportWriter::new(&dir).write_report(&report, "eda").unwrap();
        assert!(md.ends_with("eda_report.md"));
        assert!(fs::read_to_string(&md).unwrap().contains("## EDA Summary"));

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed["sections"][0]["body"], "ok");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_write_table() {
        let dir = temp_dir("table");
        let mut df = df!["a" => [1, 2], "b" => ["x", "y"]].unwrap();

        let path = ReportWriter::new(&dir).write_table(&mut df).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("a,b\n"));
        assert!(content.contains("2,y"));

        fs::remove_dir_all(&dir).ok();
    }
}
