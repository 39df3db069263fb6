//! Report document model and Markdown rendering.

use crate::advisor::VisualPlan;
use crate::types::StepOutcome;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;
use tracing::debug;

/// Title of the report written by the assistant.
pub const REPORT_TITLE: &str = "Data Cleaning & EDA Report";

/// A titled block of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub body: String,
}

/// An image referenced by the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEntry {
    pub path: String,
    pub caption: String,
}

/// A rendered-agnostic report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub generated_at: String,
    pub sections: Vec<ReportSection>,
    pub charts: Vec<ChartEntry>,
}

impl Report {
    /// Render the report as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", self.title);
        let _ = writeln!(out, "_Generated at {}_\n", self.generated_at);

        for section in &self.sections {
            let _ = writeln!(out, "## {}\n", section.title);
            let body = section.body.trim();
            if body.is_empty() {
                out.push_str("_Nothing to report._\n\n");
            } else {
                let _ = writeln!(out, "{body}\n");
            }
        }

        if !self.charts.is_empty() {
            out.push_str("## Charts\n\n");
            for chart in &self.charts {
                let _ = writeln!(out, "![{}]({})\n", chart.caption, chart.path);
                let _ = writeln!(out, "{}\n", chart.caption);
            }
        }

        out
    }

    /// Look up a section by title.
    pub fn section(&self, title: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.title == title)
    }
}

/// Builder for [`Report`].
#[derive(Debug, Default)]
pub struct ReportBuilder {
    title: Option<String>,
    sections: Vec<ReportSection>,
    charts: Vec<ChartEntry>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn add_section(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.sections.push(ReportSection {
            title: title.into(),
            body: body.into(),
        });
        self
    }

    /// Add a chart; charts whose image file does not exist are skipped.
    pub fn add_chart(mut self, path: impl AsRef<Path>, caption: impl Into<String>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            self.charts.push(ChartEntry {
                path: path.to_string_lossy().into_owned(),
                caption: caption.into(),
            });
        } else {
            debug!("Skipping chart {}: file not found", path.display());
        }
        self
    }

    pub fn build(self) -> Report {
        Report {
            title: self.title.unwrap_or_else(|| REPORT_TITLE.to_string()),
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            sections: self.sections,
            charts: self.charts,
        }
    }
}

/// The report produced at the end of an assistant run.
pub fn assistant_report(
    explanation: &str,
    outcomes: &[StepOutcome],
    failure: Option<&str>,
    insights: &str,
    visual_plan: &VisualPlan,
) -> Report {
    let mut steps: Vec<String> = outcomes.iter().map(|o| format!("- {}", o.describe())).collect();
    if let Some(failure) = failure {
        steps.push(format!("- Stopped: {failure}"));
    }

    let mut builder = ReportBuilder::new()
        .add_title(REPORT_TITLE)
        .add_section("Cleaning Summary", explanation)
        .add_section("Applied Steps", steps.join("\n"))
        .add_section("EDA Summary", insights);

    for spec in &visual_plan.visualizations {
        if let Some(path) = spec.chart_path() {
            builder = builder.add_chart(path, spec.description.clone());
        }
    }

    builder.build()
}
