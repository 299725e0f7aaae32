//! PageScope main entry point
//!
//! This is the command-line interface for the PageScope crawl engine.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pagescope::config::{load_config_with_hash, Config};
use pagescope::output::{
    format_job_page, format_result, print_statistics, write_result_markdown,
};
use pagescope::service::{CrawlService, ListQuery, DEFAULT_PAGE_SIZE};
use pagescope::JobStatus;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// PageScope: a background single-page crawl engine
///
/// PageScope fetches submitted pages, summarizes their structure, classifies
/// their links and probes a sample of them for broken targets.
#[derive(Parser, Debug)]
#[command(name = "pagescope")]
#[command(version)]
#[command(about = "A background single-page crawl engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler until Ctrl-C
    Serve,

    /// Submit URLs for crawling
    Submit {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Run one crawl attempt on a job and wait for it
    Crawl { id: i64 },

    /// Show a job's result and broken links
    #[command(name = "result")]
    Show {
        id: i64,

        /// Also write the result as markdown to this file
        #[arg(long, value_name = "FILE")]
        markdown: Option<PathBuf>,
    },

    /// List jobs, newest first
    List {
        /// Only jobs in this status (queued, running, completed, error)
        #[arg(long)]
        status: Option<JobStatus>,

        /// Case-insensitive substring of the URL or title
        #[arg(long)]
        search: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,
    },

    /// Re-queue jobs for another attempt
    Recrawl {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Delete jobs and their broken links
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Show job counts per status
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_ref())?;
    let service = CrawlService::open(config).context("Failed to open crawl database")?;

    match cli.command {
        Command::Serve => handle_serve(&service).await,
        Command::Submit { urls } => handle_submit(&service, &urls),
        Command::Crawl { id } => handle_crawl(&service, id).await,
        Command::Show { id, markdown } => handle_result(&service, id, markdown),
        Command::List {
            status,
            search,
            page,
            limit,
        } => {
            let query = ListQuery {
                status,
                search,
                page,
                limit,
            };
            let jobs = service.list(&query)?;
            print!("{}", format_job_page(&jobs, query.page, query.limit));
            Ok(())
        }
        Command::Recrawl { ids } => {
            let requeued = service.recrawl(&ids)?;
            println!("Re-queued {} of {} job(s)", requeued, ids.len());
            Ok(())
        }
        Command::Delete { ids } => {
            let removed = service.delete(&ids)?;
            println!("Deleted {} of {} job(s)", removed, ids.len());
            Ok(())
        }
        Command::Stats => {
            print_statistics(&service.stats()?);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagescope=info,warn"),
            1 => EnvFilter::new("pagescope=debug,info"),
            2 => EnvFilter::new("pagescope=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file if one was given, otherwise the built-in defaults
fn load_configuration(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Runs the scheduler until Ctrl-C, then stops it gracefully
async fn handle_serve(service: &CrawlService) -> anyhow::Result<()> {
    let mut scheduler = service.scheduler();
    scheduler.start()?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown requested");

    scheduler.stop().await;
    Ok(())
}

fn handle_submit(service: &CrawlService, urls: &[String]) -> anyhow::Result<()> {
    let outcome = service.submit_many(urls);

    for job in &outcome.submitted {
        println!("#{} {} [{}]", job.id, job.url, job.status);
    }
    for (url, reason) in &outcome.rejected {
        eprintln!("rejected {}: {}", url, reason);
    }

    if !outcome.rejected.is_empty() {
        bail!("{} URL(s) rejected", outcome.rejected.len());
    }
    Ok(())
}

async fn handle_crawl(service: &CrawlService, id: i64) -> anyhow::Result<()> {
    let attempt = service.crawl(id)?;
    let job = attempt.await.context("Crawl task failed")?;
    tracing::info!(job_id = job.id, status = %job.status, "Attempt finished");

    print!("{}", format_result(&service.result(id)?));
    Ok(())
}

fn handle_result(
    service: &CrawlService,
    id: i64,
    markdown: Option<PathBuf>,
) -> anyhow::Result<()> {
    let result = service.result(id)?;
    print!("{}", format_result(&result));

    if let Some(path) = markdown {
        write_result_markdown(&result, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("\nMarkdown report written to: {}", path.display());
    }
    Ok(())
}
