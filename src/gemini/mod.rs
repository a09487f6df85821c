// Gemini cachedContents API module
// Author: kelexine (https://github.com/kelexine)

pub mod cache_models;
mod client;

pub use cache_models::{CachedContent, CachedContentUpdate, ListCachedContentsResponse};
pub use client::GeminiClient;

use crate::error::Result;
use async_trait::async_trait;

/// Remote service holding cached contents.
///
/// Every call is independently failable and is never retried by the cache
/// manager; implementations may retry at the transport level.
#[async_trait]
pub trait CachedContentService: Send + Sync {
    /// List up to `page_size` existing cached contents.
    async fn list_cached_contents(&self, page_size: u32) -> Result<Vec<CachedContent>>;

    /// Create a cached content for `model`. The response carries `name` and `expireTime`.
    async fn create_cached_content(&self, model: &str, content: CachedContent) -> Result<CachedContent>;

    /// Extend the TTL of an existing cached content without changing what it holds.
    async fn update_cached_content(&self, id: &str, update: CachedContentUpdate) -> Result<CachedContent>;

    /// Delete a cached content.
    async fn delete_cached_content(&self, id: &str) -> Result<()>;
}
