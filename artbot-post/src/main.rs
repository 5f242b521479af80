//! artbot-post - Post a random card's art to Bluesky

use clap::Parser;
use libartbot::config::Config;
use libartbot::logging::{LogFormat, LoggingConfig};
use libartbot::service::ArtbotService;
use libartbot::{InvocationReport, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "artbot-post")]
#[command(version, about = "Post a random card's art to Bluesky")]
#[command(long_about = r#"Select a card from the catalog, avoiding recently posted ones, and post
its art and caption to Bluesky. Meant to be run from cron.

EXAMPLES:
    # Post using ~/.config/artbot/config.toml
    artbot-post

    # Use another configuration file
    artbot-post --config ./artbot.toml

    # Show which card would be picked, without posting or updating the ledger
    artbot-post --dry-run

    # JSON report for scripting
    artbot-post --format json | jq -r '.post_uri'

OUTPUT:
    text - the AT URI of the new post (dry run: the card and caption)
    json - the full invocation report

EXIT CODES:
    0 - Success
    1 - Error (catalog, ledger, network, posting, etc.)
    2 - Authentication error (credentials missing or rejected)
    3 - Invalid input (no postable catalog records)
"#)]
struct Cli {
    /// Configuration file (default: $ARTBOT_CONFIG or ~/.config/artbot/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Select and format a card without posting or writing to the ledger
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env(LogFormat::Text);
    logging.verbose = cli.verbose;
    logging.init();

    match run(&cli).await {
        Ok(report) => {
            if report.ledger_degraded {
                eprintln!(
                    "Warning: posted {} ({}) but could not record it in the ledger",
                    report.name, report.set
                );
            }

            if let Err(e) = print_report(&report, &cli.format) {
                eprintln!("Error: failed to encode report: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: &Cli) -> Result<InvocationReport> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let service = ArtbotService::from_config(&config).await?;

    if cli.dry_run {
        tracing::debug!("dry run: the ledger will not be updated");
        service.dry_run().await
    } else {
        service.run_once().await
    }
}

fn print_report(report: &InvocationReport, format: &str) -> serde_json::Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        _ => match &report.post_uri {
            Some(uri) => println!("{}", uri),
            None => {
                println!("{} ({})", report.name, report.set);
                println!();
                println!("{}", report.text);
            }
        },
    }

    Ok(())
}
