//! fetchcache: fetch a URL through the cache from the command line.
//!
//! Useful for observing coalescing, spacing and freshness behaviour against
//! a real endpoint: `--repeat` issues several calls, `--concurrent` issues
//! them at once instead of one after another.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use futures_util::future::join_all;
use tracing::info;

use fetchcache::{CachedFetcher, FetchOptions, FetchTarget, FetcherConfig, JsonOptions, Method};

/// Fetch a URL through the coalescing cache.
#[derive(Parser)]
#[command(name = "fetchcache")]
#[command(version = fetchcache::PKG_VERSION)]
#[command(about = "Request-coalescing fetch cache")]
struct Args {
    /// URL to fetch
    url: String,

    /// Path to configuration file
    #[arg(short, long, env = "FETCHCACHE_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request body (part of the cache key)
    #[arg(short, long)]
    body: Option<String>,

    /// Extra header, `name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Reuse a successful response younger than this many milliseconds
    #[arg(long)]
    fresh_ms: Option<u64>,

    /// Skip the freshness check
    #[arg(long)]
    ignore_cache: bool,

    /// On failure, fall back to the last successful response
    #[arg(long)]
    stale_on_error: bool,

    /// Parse the body as JSON and pretty-print it
    #[arg(long)]
    json: bool,

    /// Number of calls to make
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Delay between sequential calls, in milliseconds
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// Issue all calls at once
    #[arg(long)]
    concurrent: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let config = FetcherConfig::load(args.config.as_deref())?;
    let fetcher = CachedFetcher::builder().config(&config).build()?;

    let target = build_target(&args)?;
    let mut options = FetchOptions::new()
        .ignore_cache(args.ignore_cache)
        .stale_on_error(args.stale_on_error);
    if let Some(body) = &args.body {
        options = options.body(body.clone());
    }
    if let Some(ms) = args.fresh_ms {
        options = options.cache_fresh_time(Duration::from_millis(ms));
    }

    info!(url = %args.url, repeat = args.repeat, concurrent = args.concurrent, "fetching");

    let mut failures = 0;
    if args.concurrent {
        let calls = (0..args.repeat).map(|_| fetch_once(&fetcher, &target, &options, args.json));
        for output in join_all(calls).await {
            failures += print_output(output);
        }
    } else {
        for i in 0..args.repeat {
            if i > 0 && args.interval_ms > 0 {
                tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
            }
            failures += print_output(fetch_once(&fetcher, &target, &options, args.json).await);
        }
    }

    if failures > 0 {
        return Err(format!("{failures} of {} calls returned no value", args.repeat).into());
    }
    Ok(())
}

fn build_target(args: &Args) -> Result<FetchTarget, Box<dyn std::error::Error>> {
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .map_err(|e| format!("invalid method {:?}: {e}", args.method))?;
    let mut target = FetchTarget::new(args.url.clone()).method(method);
    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("invalid header {header:?}, expected `name: value`"))?;
        target = target.header(name.trim(), value.trim());
    }
    Ok(target)
}

async fn fetch_once(
    fetcher: &CachedFetcher,
    target: &FetchTarget,
    options: &FetchOptions,
    json: bool,
) -> Option<String> {
    if json {
        let options = JsonOptions::from(options.clone());
        let value: serde_json::Value = fetcher.fetch_json(target, &options).await?;
        serde_json::to_string_pretty(&value).ok()
    } else {
        fetcher
            .fetch_text(target, options)
            .await
            .map(|text| text.to_string())
    }
}

fn print_output(output: Option<String>) -> u32 {
    match output {
        Some(text) => {
            println!("{text}");
            0
        }
        None => {
            eprintln!("(no value)");
            1
        }
    }
}
