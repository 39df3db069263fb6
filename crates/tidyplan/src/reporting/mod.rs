//! Report composition and output files.
//!
//! A [`Report`] is a title, a list of text sections and a list of charts. It
//! renders to Markdown and serializes to JSON; [`ReportWriter`] puts both on
//! disk next to the cleaned table.
//!
//! # Example
//!
//! ```rust,ignore
//! use tidyplan::reporting::{ReportBuilder, ReportWriter};
//!
//! let report = ReportBuilder::new()
//!     .add_title("Data Cleaning & EDA Report")
//!     .add_section("Cleaning Summary", explanation)
//!     .build();
//!
//! let writer = ReportWriter::new("outputs");
//! writer.write_report(&report, "eda")?;
//! ```

mod report;
mod writer;

pub use report::{ChartEntry, REPORT_TITLE, Report, ReportBuilder, ReportSection, assistant_report};
pub use writer::{CLEANED_FILE_NAME, ReportWriter};
