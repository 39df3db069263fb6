//! CLI entry point for the cleaning assistant.

use anyhow::{Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tidyplan::{
    Assistant, AssistantConfig, AssistantResult, CleaningPlanResponse, DatasetAnalysis,
};
use tracing::{debug, error, info, warn};

#[cfg(feature = "ai")]
use std::env;
#[cfg(feature = "ai")]
use std::sync::Arc;
#[cfg(feature = "ai")]
use tidyplan::ai::{OpenRouterConfig, OpenRouterProvider};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LLM-planned data cleaning and exploratory analysis",
    long_about = "Profiles a CSV file, asks a language model for a cleaning plan, runs it,\n\
                  and writes the cleaned table together with an EDA report.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  OPENROUTER_API_KEY    API key for OpenRouter (required for AI mode)\n\n\
                  EXAMPLES:\n  \
                  # Let the model plan the cleaning\n  \
                  tidyplan -i data.csv\n\n  \
                  # Run a hand-written plan without a model\n  \
                  tidyplan -i data.csv --plan plan.json --no-ai\n\n  \
                  # Preview the plan without executing it\n  \
                  tidyplan -i data.csv --dry-run"
)]
struct Args {
    /// Path to the CSV file to clean
    #[arg(short, long)]
    input: String,

    /// Output directory for the cleaned table and the report
    #[arg(short, long, default_value = "outputs")]
    output: String,

    /// Stem of the report files (<stem>_report.md, <stem>_report.json)
    #[arg(long, default_value = "eda")]
    output_name: String,

    /// JSON file holding a list of cleaning steps to run instead of asking the model
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Never call the model
    #[arg(long)]
    no_ai: bool,

    /// Skip the insight and visualization requests
    #[arg(long)]
    no_insights: bool,

    /// Print the analysis and the plan without executing it
    #[arg(long)]
    dry_run: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs so stdout only holds the JSON document.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the result)
    #[arg(short, long)]
    quiet: bool,

    /// Model to request from OpenRouter
    #[arg(long)]
    model: Option<String>,

    /// Language the insights are written in
    #[arg(long, default_value = "English")]
    language: String,

    /// Exit with an error when a plan step fails
    #[arg(long)]
    strict: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true no subscriber is installed, so stdout only
/// carries the JSON document.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    dotenv().ok();

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Loading dataset from: {}", args.input);
    let data = load_csv_with_fallbacks(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let mut config_builder = AssistantConfig::builder()
        .use_ai(!args.no_ai)
        .generate_insights(!args.no_insights)
        .generate_visual_plan(!args.no_insights)
        .insight_language(&args.language)
        .output_dir(&args.output)
        .output_name(&args.output_name)
        .save_to_disk(!args.dry_run);

    if let Some(path) = &args.plan {
        config_builder = config_builder.plan_override(read_plan_file(path)?);
    }

    let assistant = build_assistant(&args, config_builder.build()?)?;

    if args.dry_run {
        let (analysis, response) = assistant.preview(&data)?;
        if args.json {
            let doc = serde_json::json!({
                "analysis": analysis,
                "plan": response.plan.to_json(),
                "ignored": response.plan.ignored,
                "explanation": response.explanation,
                "diagnostics": response.diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        } else {
            print_dry_run(&args, &analysis, &response);
        }
        return Ok(());
    }

    info!("{}", "=".repeat(80));
    info!("Starting cleaning assistant...");
    info!("{}", "=".repeat(80));

    let result = assistant.run(data).map_err(|e| {
        error!("Assistant failed: {}", e);
        anyhow!("Assistant failed: {}", e)
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.summary_json())?);
    } else {
        print_human_readable_summary(&result, &args);
    }

    if let Some(failure) = &result.plan_failure {
        if args.strict {
            return Err(anyhow!(
                "Plan failed at step {}: {}",
                failure.failed_step,
                failure.cause
            ));
        }
        warn!("Partial results written; plan stopped at step {}", failure.failed_step);
    }

    Ok(())
}

/// Read a JSON list of steps.
fn read_plan_file(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Could not read plan file {}: {}", path.display(), e))?;
    match serde_json::from_str::<Value>(&text)? {
        Value::Array(steps) => Ok(steps),
        Value::Object(mut map) => match map.remove("plan") {
            Some(Value::Array(steps)) => Ok(steps),
            _ => Err(anyhow!("{} has no 'plan' list", path.display())),
        },
        _ => Err(anyhow!("{} must hold a list of steps", path.display())),
    }
}

fn progress_logger(update: tidyplan::ProgressUpdate) {
    info!(
        "[{:.0}%] {}: {}",
        update.progress * 100.0,
        update.stage.display_name(),
        update.message
    );
}

/// Build the assistant with a model when one is available.
#[cfg(feature = "ai")]
fn build_assistant(args: &Args, config: AssistantConfig) -> Result<Assistant> {
    let mut builder = Assistant::builder();

    if args.no_ai {
        info!("Running without a model (AI disabled)");
    } else {
        match env::var("OPENROUTER_API_KEY") {
            Ok(api_key) if !api_key.trim().is_empty() => {
                let mut provider_config = OpenRouterConfig::builder();
                if let Some(model) = &args.model {
                    provider_config = provider_config.model(model);
                }
                let provider = OpenRouterProvider::with_config(api_key, provider_config.build())?;
                info!("Running with OpenRouter planning");
                builder = builder.ai_provider(Arc::new(provider));
            }
            _ => {
                warn!("OPENROUTER_API_KEY not set. Running without a model.");
            }
        }
    }

    if !args.quiet {
        builder = builder.on_progress(progress_logger);
    }

    Ok(builder.config(config).build()?)
}

/// Build the assistant without a model (the "ai" feature is disabled).
#[cfg(not(feature = "ai"))]
fn build_assistant(args: &Args, config: AssistantConfig) -> Result<Assistant> {
    if !args.no_ai {
        warn!("AI support not compiled in. Running without a model.");
        warn!("Compile with --features ai to enable AI support.");
    }

    let mut builder = Assistant::builder().config(config);
    if !args.quiet {
        builder = builder.on_progress(progress_logger);
    }
    Ok(builder.build()?)
}

/// Print the analysis and the plan.
///
/// Uses `println!` on purpose: this is the output of `--dry-run` and must be
/// visible regardless of the log level.
fn print_dry_run(args: &Args, analysis: &DatasetAnalysis, response: &CleaningPlanResponse) {
    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Preview of the cleaning plan");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", args.input);
    println!("  Rows: {}", analysis.shape.0);
    println!("  Columns: {}", analysis.shape.1);
    println!();

    println!("COLUMN ANALYSIS");
    println!("{}", "-".repeat(40));
    println!(
        "{:<20} {:<12} {:<10} {:<8} {}",
        "Column", "Type", "Missing %", "Unique", "Examples"
    );
    println!("{}", "-".repeat(70));
    for (name, col) in &analysis.columns {
        let examples: Vec<String> = col.example_vals.iter().map(Value::to_string).collect();
        println!(
            "{:<20} {:<12} {:<10.1} {:<8} {}",
            truncate_str(name, 19),
            col.dtype,
            col.missing_pct,
            col.unique_vals,
            truncate_str(&examples.join(", "), 40)
        );
    }
    println!();

    println!("PROPOSED STEPS");
    println!("{}", "-".repeat(40));
    if response.plan.is_empty() {
        println!("  No steps proposed");
    }
    for (index, step) in &response.plan.steps {
        println!(
            "  {}. {} on {}",
            index + 1,
            step.action.name(),
            step.column.as_deref().unwrap_or("<table>")
        );
        if let Some(reason) = &step.reason {
            println!("     {}", reason);
        }
    }
    for outcome in &response.plan.ignored {
        println!("  ! {}", outcome.describe());
    }
    for diagnostic in &response.diagnostics {
        println!("  ! {}", diagnostic);
    }
    println!();

    if !response.explanation.is_empty() {
        println!("EXPLANATION");
        println!("{}", "-".repeat(40));
        println!("  {}", response.explanation);
        println!();
    }

    println!("{}", "=".repeat(80));
    println!("To execute this plan, run without --dry-run");
    println!("{}", "=".repeat(80));
}

/// Truncate a string to max characters with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

/// Print a human-readable summary of the run.
fn print_human_readable_summary(result: &AssistantResult, args: &Args) {
    let before = result.analysis_before.shape;
    let after = result.analysis_after.shape;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input:  {} ({} rows x {} columns)", args.input, before.0, before.1);
    println!("Output: {} ({} rows x {} columns)", args.output, after.0, after.1);
    println!();

    println!("Summary:");
    println!("  Duration: {}ms", result.duration_ms);
    println!(
        "  Rows: {} -> {} ({} removed)",
        before.0,
        after.0,
        result.rows_removed()
    );
    println!(
        "  Columns: {} -> {} ({} removed)",
        before.1,
        after.1,
        result.columns_removed()
    );
    println!(
        "  Missing cells: {} -> {}",
        result.analysis_before.missing_cells(),
        result.analysis_after.missing_cells()
    );
    println!();

    if !result.outcomes.is_empty() {
        println!("Steps:");
        for outcome in &result.outcomes {
            println!("  - {}", outcome.describe());
        }
        if let Some(failure) = &result.plan_failure {
            println!("  x Step {} failed: {}", failure.failed_step, failure.cause);
        }
        println!();
    }

    if !result.explanation.is_empty() {
        println!("Explanation:");
        println!("  {}", result.explanation);
        println!();
    }

    if !result.warnings.is_empty() {
        println!("Warnings:");
        for warning in &result.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    if !result.saved_files.is_empty() {
        println!("Files:");
        for path in &result.saved_files {
            println!("  {}", path.display());
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}

/// Load CSV with multiple fallback strategies
fn load_csv_with_fallbacks(path: &str) -> Result<DataFrame> {
    // Standard loading with quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Standard loading failed: {}", e),
    }

    // Without quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(None))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Loading without quotes failed: {}", e),
    }

    // Pre-cleaned content
    let content = std::fs::read_to_string(path).map_err(|e| {
        error!("Could not read file: {}", e);
        e
    })?;
    let cursor = std::io::Cursor::new(clean_csv_content(&content));

    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .into_reader_with_file_handle(cursor)
        .finish()
        .map_err(|e| anyhow!("Could not parse {}: {}", path, e))
}

/// Collapse doubled quotes and drop blank lines.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
