//! tagtrend - Check which hashtags are trending
//!
//! Reduces the given queries, answers repeats from a persistent cache, looks
//! up the rest in parallel through Apify and writes a JSON report.

use std::error::Error;
use std::process;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use log::{info, warn};

use tagtrend::cache::{CacheStore, FileCache, MemoryCache};
use tagtrend::cli::{CacheLocation, Cli, StartupConfig};
use tagtrend::fetch::{ApifyClient, TrendSource};
use tagtrend::{TrendPipeline, TrendReport};

/// Opens the configured cache store
fn open_cache(config: &StartupConfig) -> Result<Arc<dyn CacheStore>, Box<dyn Error>> {
    let ttl = config.trend.default_ttl;
    match &config.cache {
        CacheLocation::File(path) => {
            let cache = FileCache::open(path, ttl)?;
            info!("Using cache file {} ({} live entries)", cache.path().display(), cache.len());
            Ok(Arc::new(cache))
        }
        CacheLocation::Memory => {
            warn!("Results will not be cached between runs");
            Ok(Arc::new(MemoryCache::new(ttl)))
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = StartupConfig::from_cli(&cli)?;
    let cache = open_cache(&config)?;

    let mut client = ApifyClient::new(config.token.clone());
    if let Some(endpoint) = &config.endpoint {
        client = client.with_endpoint(endpoint.clone());
    }
    let source: Arc<dyn TrendSource> = Arc::new(client);
    let pipeline = TrendPipeline::new(&config.trend, cache, source)?;

    let start = Instant::now();
    let output = pipeline.run(config.queries.as_slice()).await;
    let report = TrendReport::from_output(config.topic.clone(), &output, start.elapsed());

    info!(
        "Finished {} queries in {:.2}s ({} cached, {} fetched, {} unresolved)",
        report.queries.len(),
        report.duration_secs,
        report.cache_hits,
        report.fetched,
        report.unresolved
    );
    info!("Total unique hashtags found: {}", report.total_unique);

    report.save_json(&config.output)?;
    info!("Report written to {}", config.output.display());

    println!("{}", serde_json::to_string_pretty(&report.minimal())?);
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
