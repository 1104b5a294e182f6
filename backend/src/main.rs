//! Salesflow CLI - retail sales ETL and dashboard
//!
//! # Main Commands
//!
//! ```bash
//! salesflow run data/raw_sales.csv          # Extract, transform and load
//! salesflow dashboard --category Food       # Print KPIs and charts
//! salesflow serve                           # Start HTTP dashboard (port 3000)
//! ```
//!
//! # Stage Commands
//!
//! ```bash
//! salesflow extract data/raw_sales.csv      # Check columns, preview rows
//! salesflow transform data/raw_sales.csv    # Write the cleaned CSV
//! salesflow load data/cleaned_sales.csv     # Load a cleaned CSV
//! ```
//!
//! Database settings come from `DB_BACKEND`, `DB_HOST`, `DB_PORT`,
//! `DB_USER`, `DB_PASSWORD` and `DB_NAME` (a `.env` file is read if present).

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use salesflow::config::DEFAULT_SERVER_PORT;
use salesflow::dashboard::render_text;
use salesflow::pipeline::DEFAULT_STAGING_PATH;
use salesflow::{
    build_view, extract_and_transform, extract_sales_data, fetch_sales, load_sales,
    read_cleaned_csv, run_etl, write_cleaned_csv, DashboardFilter, DbConfig, EtlOptions,
    LoadOptions,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "salesflow")]
#[command(about = "Clean and load retail sales CSV data, then explore it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a raw CSV, check its columns and preview rows
    Extract {
        /// Raw sales CSV file
        input: PathBuf,

        /// Number of rows to print
        #[arg(long, default_value = "5")]
        preview: usize,
    },

    /// Clean a raw CSV and write the staging file
    Transform {
        /// Raw sales CSV file
        input: PathBuf,

        /// Cleaned CSV output
        #[arg(short, long, default_value = DEFAULT_STAGING_PATH)]
        output: PathBuf,
    },

    /// Load a cleaned CSV into the sales table
    Load {
        /// Cleaned CSV file
        input: PathBuf,

        /// Delete existing rows first
        #[arg(long)]
        truncate: bool,
    },

    /// Full pipeline: extract → transform → staging file → load
    Run {
        /// Raw sales CSV file
        input: PathBuf,

        /// Cleaned CSV written between transform and load
        #[arg(long, default_value = DEFAULT_STAGING_PATH)]
        staging: PathBuf,

        /// Delete existing rows first
        #[arg(long)]
        truncate: bool,
    },

    /// Print dashboard KPIs and charts
    Dashboard {
        /// First day included (YYYY-MM-DD, default: earliest sale)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day included (YYYY-MM-DD, default: latest sale)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Category to include (repeatable, default: all)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Print the full view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_SERVER_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract { input, preview } => cmd_extract(&input, preview),

        Commands::Transform { input, output } => cmd_transform(&input, &output),

        Commands::Load { input, truncate } => cmd_load(&input, truncate).await,

        Commands::Run {
            input,
            staging,
            truncate,
        } => cmd_run(&input, staging, truncate).await,

        Commands::Dashboard {
            start,
            end,
            categories,
            json,
        } => {
            let filter = DashboardFilter {
                start,
                end,
                categories: (!categories.is_empty()).then_some(categories),
            };
            cmd_dashboard(&filter, json).await
        }

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_extract(input: &Path, preview: usize) -> Result<(), Box<dyn std::error::Error>> {
    let raw = extract_sales_data(input)?;

    eprintln!("   Encoding: {}", raw.info.encoding);
    eprintln!("   Columns: {}", raw.info.headers.join(", "));
    eprintln!("   Rows: {}", raw.len());

    let rows: Vec<_> = raw.records.iter().take(preview).collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn cmd_transform(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let prepared = extract_and_transform(input)?;
    write_cleaned_csv(&prepared.dataset, output)?;

    eprintln!("\n📊 {}", prepared.report.summary());
    eprintln!("💾 Cleaned data written to: {}", output.display());
    Ok(())
}

async fn cmd_load(input: &Path, truncate: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = DbConfig::from_env()?;
    let dataset = read_cleaned_csv(input)?;

    let summary = load_sales(&dataset, &config, LoadOptions { truncate }).await?;
    eprintln!(
        "\n✨ Loaded {} rows ({} in table)",
        summary.inserted, summary.total_rows
    );
    Ok(())
}

async fn cmd_run(input: &Path, staging: PathBuf, truncate: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = DbConfig::from_env()?;
    let options = EtlOptions {
        staging_path: staging,
        truncate,
    };

    let summary = run_etl(input, &config, options).await?;

    eprintln!("\n{}", "=".repeat(70));
    eprintln!("📊 SUMMARY");
    eprintln!("{}", "=".repeat(70));
    eprintln!("   Encoding:       {}", summary.csv_info.encoding);
    eprintln!("   Rows read:      {}", summary.report.rows_in);
    eprintln!("   Rows dropped:   {}", summary.report.dropped_count());
    eprintln!("   Rows loaded:    {}", summary.load.inserted);
    eprintln!("   Rows in table:  {}", summary.load.total_rows);
    eprintln!("{}\n", "=".repeat(70));
    Ok(())
}

async fn cmd_dashboard(filter: &DashboardFilter, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = DbConfig::from_env()?;
    let rows = fetch_sales(&config).await?;
    let view = build_view(&rows, filter);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render_text(&view));
    }
    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let config = DbConfig::from_env()?;
    salesflow::server::start_server(port, config).await
}
