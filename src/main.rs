// gemcache - keep Gemini context caches coherent with local content
// Author: kelexine (https://github.com/kelexine)

use anyhow::{Context, Result};
use clap::Parser;
use gemcache::cache::CacheManager;
use gemcache::cli::{Args, Command};
use gemcache::config::AppConfig;
use gemcache::gemini::{CachedContentService, GeminiClient};
use gemcache::metrics::gather_metrics;
use gemcache::models::Content;
use gemcache::utils::logging;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let config = AppConfig::load(args.config.as_deref())?;

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting gemcache v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Build the remote client
    let client = Arc::new(GeminiClient::new(&config.gemini)?);
    info!("Using Gemini API at {}", client.base_url());

    // Phase 4: Run the requested command
    match args.command {
        Command::List => {
            let manager = CacheManager::with_config(client, &config.cache).await?;
            for entry in manager.entries().await {
                println!(
                    "{}\t{}\t{}\t{}",
                    entry.key,
                    entry.id,
                    entry.expire_time.to_rfc3339(),
                    entry.checksum.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Ensure { key, model, ttl_seconds, text, file } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("either --text or --file is required"),
            };
            let ttl = Duration::from_secs(ttl_seconds.unwrap_or(config.cache.default_ttl_seconds));

            let manager = CacheManager::with_config(client, &config.cache).await?;
            let content = Content::text("model", text);
            match manager.get_or_create(&key, ttl, &content, None, None, &model).await {
                Some(id) => println!("{}", id),
                None => println!("no cached content"),
            }
        }
        Command::Delete { id } => {
            client.delete_cached_content(&id).await?;
            println!("deleted {}", id);
        }
    }

    if args.metrics {
        print!("{}", gather_metrics());
    }

    Ok(())
}
