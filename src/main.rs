use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use rusty_trials::data::loader::load_file;
use rusty_trials::pipeline::ViewResult;
use rusty_trials::render::{cleaned_batch, pretty, summary_batch, view_batch};
use rusty_trials::{Pipeline, PipelineConfig};

/// Clean an experiment export and print its summary and grouped views.
#[derive(Parser, Debug)]
#[command(name = "rusty-trials", version, about)]
struct Args {
    /// Path to the CSV export
    input: PathBuf,

    /// JSON file with column declarations and views (defaults to the
    /// seven-column experiment schema)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the whole report as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Rows of the cleaned table to print
    #[arg(long, default_value_t = 5)]
    head: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    let pipeline = Pipeline::new(config);
    info!(
        "{} columns and {} views configured",
        pipeline.config().columns.len(),
        pipeline.config().views.len()
    );

    let raw = load_file(&args.input)?;
    info!("loaded {} rows from {}", raw.len(), args.input.display());
    let report = pipeline.run_table(raw);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let cleaning = &report.cleaning;
    println!(
        "Loaded {} rows x {} columns; kept {} rows, dropped {}.",
        cleaning.raw_rows, cleaning.raw_columns, cleaning.cleaned_rows, cleaning.dropped_rows
    );
    if !cleaning.dropped_columns.is_empty() {
        println!("Empty columns removed: {}", cleaning.dropped_columns.join(", "));
    }
    if !cleaning.absent_columns.is_empty() {
        println!("Required columns not found: {}", cleaning.absent_columns.join(", "));
    }

    if !report.has_data() {
        println!("No data available after cleaning.");
        return Ok(());
    }

    println!("\nCleaned data (first {} rows):", args.head);
    println!("{}", pretty(&cleaned_batch(&report.cleaned)?, Some(args.head))?);

    if let Some(summary) = &report.summary {
        println!("\nSummary:");
        println!("{}", pretty(&summary_batch(summary)?, None)?);
    }

    for view in &report.views {
        match view {
            ViewResult::Ready { title, table, legend } => {
                println!("\n{title}");
                println!("{}", pretty(&view_batch(table)?, None)?);
                let legend: Vec<String> =
                    legend.iter().map(|l| format!("{} {}", l.label, l.color)).collect();
                println!("legend: {}", legend.join(", "));
            }
            ViewResult::Failed { title, error, .. } => {
                println!("\n{title}: unavailable ({error})");
            }
        }
    }

    Ok(())
}
