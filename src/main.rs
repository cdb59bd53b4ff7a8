mod backends;
mod config;
mod dataset;
mod jobs;
mod news;
mod notify;
mod publish;
mod query;
mod reconcile;
mod record;
mod report;

pub const USER_AGENT: &str = concat!("reportbot/", env!("CARGO_PKG_VERSION"));

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::Client;
use tracing::{error, info};

use config::Config;
use jobs::{ChatObserver, Dispatcher, JobError};
use query::QueryOptions;
use report::{ReportOutcome, ReportRequest, ReportService, parse_secondary};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "reportbot")]
#[command(version, about = "Research, patent and news reports from one boolean query")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and publish one report
    Report {
        /// Boolean query, e.g. `solar AND (battery OR storage)`
        #[arg(short, long)]
        query: String,

        /// Comma-separated keywords to tag results with
        #[arg(short, long, default_value = "")]
        secondary: String,

        /// Email address to share the report folder with
        #[arg(short, long)]
        email: Option<String>,

        /// Chat channel to post the dataset links to
        #[arg(short, long)]
        channel: Option<String>,
    },

    /// Run every request in a JSON Lines file
    Batch {
        file: PathBuf,
    },

    /// Print each backend's form of a query without calling anything
    Translate {
        query: String,
    },

    /// List the news category buckets and their filters
    Buckets,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reportbot=info".parse()?),
        )
        .init();

    match Cli::parse().command {
        Commands::Report {
            query,
            secondary,
            email,
            channel,
        } => {
            let request = ReportRequest {
                secondary: parse_secondary(&secondary),
                share_with: email,
                channel,
                ..ReportRequest::new(query)
            };
            let outcomes = run_jobs(vec![request]).await?;
            print_outcomes(&outcomes)?;
        }
        Commands::Batch { file } => {
            let requests = read_batch(&file).await?;
            info!(requests = requests.len(), file = %file.display(), "batch loaded");
            let outcomes = run_jobs(requests).await?;
            print_outcomes(&outcomes)?;
        }
        Commands::Translate { query } => {
            let translated = QueryOptions::from_env()?.translate(&query);
            println!("{}", serde_json::to_string_pretty(&translated)?);
        }
        Commands::Buckets => {
            for bucket in news::buckets_excluding_catch_all() {
                println!("{}\t{}", bucket.name, bucket.aql());
            }
        }
    }
    Ok(())
}

async fn run_jobs(
    requests: Vec<ReportRequest>,
) -> Result<Vec<Result<ReportOutcome, JobError>>, Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;

    let service = ReportService::from_config(&http, &config);
    let observer = ChatObserver::new(service.notifier().cloned());
    let dispatcher = Dispatcher::new(service, observer, config.max_concurrent_jobs);
    info!(
        jobs = requests.len(),
        max_concurrent = config.max_concurrent_jobs,
        "dispatching report jobs"
    );

    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| dispatcher.submit(request))
        .collect();
    let ids: Vec<_> = handles.iter().map(|h| h.id).collect();
    let results = futures::future::join_all(handles.into_iter().map(|h| h.wait())).await;

    for (id, result) in ids.iter().zip(&results) {
        if let Err(e) = result {
            error!(job = %id, error = %e, "job failed");
        }
    }
    Ok(results)
}

fn print_outcomes(
    results: &[Result<ReportOutcome, JobError>],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut failed = 0;
    for result in results {
        match result {
            Ok(outcome) => println!("{}", serde_json::to_string(outcome)?),
            Err(_) => failed += 1,
        }
    }
    if failed > 0 {
        return Err(format!("{failed} of {} report jobs failed", results.len()).into());
    }
    Ok(())
}

/// One JSON request per line; blank lines and `#` comments are skipped.
async fn read_batch(path: &Path) -> Result<Vec<ReportRequest>, Box<dyn std::error::Error>> {
    let text = tokio::fs::read_to_string(path).await?;
    parse_batch(&text)
}

fn parse_batch(text: &str) -> Result<Vec<ReportRequest>, Box<dyn std::error::Error>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|(n, line)| {
            serde_json::from_str(line)
                .map(ReportRequest::normalized)
                .map_err(|e| -> Box<dyn std::error::Error> { format!("line {}: {e}", n + 1).into() })
        })
        .collect()
}
