mod acquire;
mod config;
mod error;
mod report;
mod statement;
mod tagger;

use acquire::{RawDocument, TextAcquirer};
use clap::Parser;
use config::{Config, DEFAULT_CONFIG_PATH};
use statement::StatementParser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Summarize underwriting signals from a bank statement PDF.
#[derive(Parser)]
#[command(name = "quick-underwriter", version)]
struct Cli {
    /// Statement PDF to analyze
    file: PathBuf,

    /// Config file (missing file means defaults)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print the summary as JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Include the extracted text verbatim
    #[arg(long)]
    raw: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing; stdout is reserved for the report
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load_or_default(&cli.config)?;

    // No tagger, no service: fail before touching any document.
    let tagger = tagger::build_tagger(&cfg.tagger)?;
    let parser = StatementParser::new(tagger.as_ref(), cfg.parser.header_lines);
    let acquirer = TextAcquirer::from_config(&cfg.acquisition);

    let doc = RawDocument::read(&cli.file)?;
    let span = tracing::info_span!("statement", filename = %doc.filename);
    let _guard = span.enter();
    info!(bytes = doc.bytes.len(), "Processing statement");

    let acquired = acquirer.acquire(&doc)?;
    let summary = parser.parse(&acquired.text);

    let (filled, total) = summary.coverage();
    info!(
        filled,
        total,
        company = ?summary.company_name,
        deposit_days = summary.deposits.len(),
        average_daily_balance = ?summary.average_daily_balance,
        negative_days = summary.negative_balance_day_count,
        "Extraction result"
    );

    if cli.json {
        let value = report::to_json(&doc.filename, &summary, &acquired, cli.raw);
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let report = report::Report {
            filename: &doc.filename,
            summary: &summary,
            acquired: &acquired,
            include_raw: cli.raw,
        };
        print!("{report}");
    }

    Ok(())
}
