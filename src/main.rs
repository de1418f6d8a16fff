use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ghstats::github::{self, Fetcher, ReqwestTransport};
use ghstats::report;
use ghstats::stats::RepositoryStatsRunner;
use ghstats::util::config::AppConfig;

#[derive(Parser, Debug)]
#[command(
    name = "ghstats",
    version,
    about = "Pull request, issue, commit and comment activity for GitHub repositories"
)]
struct Cli {
    /// Repositories to analyze (owner/repo, comma or space separated)
    #[arg(value_delimiter = ',')]
    repos: Vec<String>,

    /// Number of days to analyze [default: 30]
    #[arg(short = 'n', long)]
    days: Option<u32>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the JSON report is written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// GitHub REST API base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Enable debug logging to file
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if !cli.repos.is_empty() {
        config.github.repos = cli.repos;
    }
    if let Some(days) = cli.days {
        config.stats.window_days = days;
    }
    if let Some(api_url) = cli.api_url {
        config.github.api_url = api_url;
    }
    if let Some(dir) = cli.output_dir {
        config.output.dir = Some(dir);
    }
    config.validate()?;

    let _guard = setup_logging(&config, cli.debug)?;

    info!("ghstats starting");

    if config.github.repos.is_empty() {
        eprintln!(
            "No repositories given. Pass them as arguments or add them to your config file.\n\
             Example config (~/.config/ghstats/config.toml):\n\n\
             [github]\n\
             repos = [\"owner/repo\"]"
        );
        std::process::exit(1);
    }

    // The token must be present before any request is made
    let credential = match github::auth::resolve_token() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Authentication error: {e}");
            std::process::exit(1);
        }
    };

    let transport = ReqwestTransport::new(credential)?;
    let fetcher = Fetcher::new(transport, config.retry.to_policy());
    let runner = RepositoryStatsRunner::new(fetcher, config.github.api_url.as_str());

    info!(
        repos = config.github.repos.len(),
        days = config.stats.window_days,
        "Collecting statistics"
    );
    let summary = runner
        .run(&config.github.repos, config.stats.window_days)
        .await;

    println!("\n{}", report::render(&summary));
    let path = report::write_json(&summary, &config.output_dir())?;
    println!("Detailed results saved to {}", path.display());

    Ok(())
}

fn setup_logging(
    config: &AppConfig,
    debug: bool,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ghstats=info")),
    );

    if !debug {
        tracing_subscriber::registry().with(stderr_layer).init();
        return Ok(None);
    }

    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "ghstats.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(EnvFilter::new("ghstats=debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(Some(guard))
}
