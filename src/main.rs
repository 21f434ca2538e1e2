use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod coerce;
mod db;
mod map;
mod models;
mod pipeline;
mod report;
mod risk;

use models::HotspotPayload;
use pipeline::PipelineOptions;

#[derive(Parser)]
#[command(name = "outbreak-hotspots")]
#[command(about = "Disease outbreak hotspot ranking and map generator", long_about = None)]
struct Cli {
    /// MongoDB connection string
    #[arg(long, env = "MONGO_URI", global = true, hide_env_values = true)]
    mongo_uri: Option<String>,
    /// Database to use when the URI names none
    #[arg(long, env = "MONGO_DB", global = true)]
    database: Option<String>,
    /// Collection override
    #[arg(long, env = "MONGO_COLL", global = true)]
    collection: Option<String>,
    /// Lowest per-disease case threshold
    #[arg(long, env = "HOTSPOT_MIN_CASES", global = true, default_value_t = risk::DEFAULT_MIN_CASES, value_parser = parse_min_cases)]
    min_cases: f64,
    /// Public assets root the map is written under
    #[arg(long, env = "HOTSPOT_PUBLIC_DIR", global = true, default_value = "public")]
    public_dir: PathBuf,
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the hotspot JSON payload and render the map (default)
    Report,
    /// Print a ranked summary to the terminal
    Score {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Load sample outbreak records
    Seed,
    /// Import outbreak records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
}

fn parse_min_cases(raw: &str) -> Result<f64, String> {
    let value = coerce::parse_number(raw).ok_or_else(|| format!("`{raw}` is not a number"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err("min cases must be a positive number".to_string())
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the JSON payload
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .init();
}

impl Cli {
    fn mongo_settings(&self) -> anyhow::Result<db::MongoSettings> {
        let uri = self
            .mongo_uri
            .clone()
            .filter(|uri| !uri.is_empty())
            .context("MONGO_URI must be set to the outbreak MongoDB instance")?;

        Ok(db::MongoSettings {
            uri,
            database: self.database.clone(),
            collection: self.collection.clone(),
        })
    }

    fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            min_cases: self.min_cases,
            public_dir: self.public_dir.clone(),
        }
    }
}

async fn run_report(cli: &Cli) -> anyhow::Result<HotspotPayload> {
    let collection = db::connect(&cli.mongo_settings()?).await?;
    let records = db::fetch_records(&collection).await?;
    Ok(pipeline::build_payload(records, &cli.pipeline_options()))
}

async fn run_command(cli: &Cli, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Report => {
            let payload = run_report(cli).await?;
            pipeline::emit(&payload, &mut std::io::stdout().lock())?;
        }
        Commands::Score { limit } => {
            let collection = db::connect(&cli.mongo_settings()?).await?;
            let records = db::fetch_records(&collection).await?;
            let scored = risk::score_records(records, cli.min_cases);
            print!("{}", report::build_ranking(&scored, limit));
        }
        Commands::Seed => {
            let collection = db::connect(&cli.mongo_settings()?).await?;
            let inserted = db::seed(&collection).await?;
            println!("Seed data ready ({inserted} new records).");
        }
        Commands::Import { csv } => {
            let collection = db::connect(&cli.mongo_settings()?).await?;
            let inserted = db::import_csv(&collection, &csv).await?;
            println!("Inserted {inserted} outbreak records from {}.", csv.display());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut cli = Cli::parse();
    init_logging(cli.verbose);

    let command = cli.command.take().unwrap_or(Commands::Report);
    let is_report = matches!(command, Commands::Report);
    debug!(min_cases = cli.min_cases, public_dir = %cli.public_dir.display(), "starting");

    let result = run_command(&cli, command).await;
    finish(result, is_report, &mut std::io::stdout().lock())
}

/// A failed `report` still leaves the empty payload on stdout.
fn finish(result: anyhow::Result<()>, is_report: bool, out: &mut impl Write) -> ExitCode {
    let Err(err) = result else {
        return ExitCode::SUCCESS;
    };

    eprintln!("outbreak-hotspots error: {err:#}");
    if is_report {
        if let Err(emit_err) = pipeline::emit(&HotspotPayload::empty(), out) {
            eprintln!("failed to write fallback payload: {emit_err:#}");
        }
    }
    ExitCode::FAILURE
}
