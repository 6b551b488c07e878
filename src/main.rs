use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error};

/// Export the daily registry queries to CSV and email an HTML summary report
#[derive(Parser)]
#[command(name = "registry-report")]
#[command(about = "Daily registry export and report job", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Report date (YYYY-MM-DD, defaults to yesterday)
    #[arg(long)]
    run_date: Option<NaiveDate>,

    /// Directory for the merged CSV files and the report artifact
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Render and write the report without emailing it
    #[arg(long)]
    skip_delivery: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("registry-report started with verbosity level: {}", cli.verbose);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = registry_report::config::Config::from_env()?;
    if let Some(run_date) = cli.run_date {
        config.run_date = run_date;
    }
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if cli.skip_delivery {
        config.notify = None;
    }

    let report = registry_report::run::execute(&config).await?;

    for query in &report.queries {
        match &query.error {
            Some(message) => println!("{}: Error: {}", query.title, message),
            None => println!(
                "{}: Success ({} rows)",
                query.title,
                query.total_rows.unwrap_or(0)
            ),
        }
    }

    Ok(())
}
