use anyhow::{Context, Result};
use clap::Parser;
use num_format::{Locale, ToFormattedString};
use tracing::{debug, info};

mod api;
mod config;
mod error;
mod fetcher;
mod table;
mod window;

use api::BlsClient;
use config::{request_timeout, resolve_api_key, Args, FetchConfig};
use fetcher::SeriesFetcher;
use window::YearWindow;

// ----------------------- Main -----------------------
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args);

    let cfg = FetchConfig::from_args(&args)?;
    let api_key = resolve_api_key(&args)?;
    let client = BlsClient::new(&args.endpoint, &api_key, request_timeout(&args))?;

    debug!(
        endpoint = %args.endpoint,
        years = %format!("{}-{}", cfg.min_year, cfg.max_year),
        requests_per_series = YearWindow::request_count(cfg.min_year, cfg.max_year, cfg.window_years),
        clamp = cfg.clamp_end_year,
        "configuration"
    );

    let summary = SeriesFetcher::new(&client, &cfg)
        .run()
        .await
        .with_context(|| format!("Pull from {} aborted", cfg.input.display()))?;

    info!(
        "Wrote {} files ({} observations, {} requests, {} windows without data)",
        summary.written.len().to_formatted_string(&Locale::en),
        summary.total_rows().to_formatted_string(&Locale::en),
        summary.requests.to_formatted_string(&Locale::en),
        summary.missing.len().to_formatted_string(&Locale::en),
    );

    Ok(())
}

// ----------------------- Logging -----------------------
fn setup_logging(args: &Args) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cpi_pull={}", args.log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}
