// CLI module for gemcache
// Author: kelexine (https://github.com/kelexine)

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// gemcache - keep Gemini context caches coherent with local content
#[derive(Parser, Debug)]
#[command(name = "gemcache", version, about, long_about = None)]
pub struct Args {
    /// Path to a config file (defaults to ~/.gemcache/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Print Prometheus metrics before exiting
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List cached contents known to the remote service
    List,

    /// Get or create a cached content for a key and print its id
    #[command(group(ArgGroup::new("source").required(true).args(["text", "file"])))]
    Ensure {
        /// Application key the cached content is registered under
        #[arg(long)]
        key: String,

        /// Model the cached content is created for
        #[arg(long)]
        model: String,

        /// Time to live in seconds (defaults to cache.default_ttl_seconds)
        #[arg(long)]
        ttl_seconds: Option<u64>,

        /// System instruction text
        #[arg(long)]
        text: Option<String>,

        /// File holding the system instruction text
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Delete a cached content by id
    Delete {
        /// Cached content id, with or without the `cachedContents/` prefix
        #[arg(long)]
        id: String,
    },
}
