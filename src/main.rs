mod config;
mod metrics;
mod request;
mod runner;
#[cfg(test)]
mod test_support;
mod worker_pool;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, CommandFactory, Parser};
use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{RunConfiguration, Settings, Verbosity};
use metrics::ErrorClass;
use request::{Fetcher, FetcherOptions};

const LOG_ENV: &str = "WBENCH_LOG";

/// Simple program to fire a fixed number of GET requests at a URL with concurrent workers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of concurrent requests to make
    #[arg(short = 'c', default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    concurrent: u64,
    /// Number of requests to perform
    #[arg(short = 'n', default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    requests: u64,
    /// Show info while running: 0 = nothing, 1 = a snapshot every `snapshot_interval` successful
    /// calls (default 100), 2 = every call
    #[arg(short = 'v', default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    verbosity: u8,
    /// Reuse one HTTP client across all workers
    #[arg(
        short = 'r',
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true"
    )]
    reuse: bool,
    /// Display logs in standard error
    #[arg(short, long, default_value_t = false)]
    logs: bool,
    /// Settings file with timeouts and user agent
    #[arg(long)]
    config: Option<PathBuf>,
    /// Target url
    url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let Some(url) = args.url else {
        eprintln!("{}", Args::command().render_help());
        return Ok(());
    };
    init_tracing(args.logs);

    let settings = Settings::load(args.config.as_deref()).context("error reading settings")?;
    let conf = RunConfiguration::new(
        url,
        usize::try_from(args.concurrent)?,
        usize::try_from(args.requests)?,
        Verbosity::try_from(args.verbosity)?,
        args.reuse,
    )?
    .with_snapshot_interval(settings.snapshot_interval);
    info!("initialization");

    // creating a client is an expensive task
    let options = FetcherOptions::from_settings(&settings, conf.verbosity);
    let fetchers = Fetcher::for_workers(&options, conf.concurrency, conf.reuse_client)
        .context("error creating http client")?;

    let report = runner::run(&conf, fetchers, io::stdout()).await?;
    write!(io::stdout().lock(), "{report}").context("error writing report")?;

    info!(
        failed = report.errors.len(),
        timeouts = report.count_of(ErrorClass::Timeout),
        "Done!"
    );
    Ok(())
}

fn init_tracing(display_logs: bool) {
    let mut layers = Vec::new();
    if display_logs {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
        let log = fmt::layer()
            .with_writer(io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_level(true)
            .with_filter(filter)
            .boxed();
        layers.push(log);
    }

    tracing_subscriber::registry().with(layers).init();
}
