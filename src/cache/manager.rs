// Cache manager - keeps remote cached contents coherent with local content
// Author: kelexine (https://github.com/kelexine)

use super::checksum::checksum;
use super::directory::CacheDirectory;
use super::models::{display_name, CacheEntry};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::gemini::cache_models::format_ttl;
use crate::gemini::{CachedContent, CachedContentService, CachedContentUpdate};
use crate::metrics;
use crate::models::gemini::{Content, ToolConfig, ToolDeclaration};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Entries with less than this many seconds left are extended before reuse.
pub const GRACE_WINDOW_SECS: i64 = 60;

/// What to do with the entry for a key, given the current request.
#[derive(Debug, Clone, PartialEq)]
enum Decision {
    /// No entry: create one.
    Create,
    /// Entry has expired remotely: create a replacement.
    Recreate(CacheEntry),
    /// Content matches but expiry is inside the grace window.
    Extend(CacheEntry),
    /// Content matches and enough time is left.
    Reuse(CacheEntry),
    /// Content changed: delete the remote object.
    Delete(CacheEntry),
}

impl Decision {
    fn evaluate(current: Option<CacheEntry>, checksum: &str, now: DateTime<Utc>) -> Self {
        let Some(entry) = current else {
            return Decision::Create;
        };

        if entry.has_expired(now) {
            Decision::Recreate(entry)
        } else if !entry.checksum_matches(checksum) {
            Decision::Delete(entry)
        } else if entry.expires_within(now, chrono::Duration::seconds(GRACE_WINDOW_SECS)) {
            Decision::Extend(entry)
        } else {
            Decision::Reuse(entry)
        }
    }
}

/// Cache manager for Gemini cached contents.
///
/// Decides per key whether to reuse, extend, recreate or delete the remote
/// cached content, keeping a local directory of what exists remotely. All
/// remote failures are logged and reported as "no cached content"; callers
/// should then proceed without caching.
#[derive(Clone)]
pub struct CacheManager {
    service: Arc<dyn CachedContentService>,
    directory: Arc<CacheDirectory>,
}

impl CacheManager {
    /// Create a manager, loading existing cached contents with the default page size.
    ///
    /// # Errors
    ///
    /// Returns the listing error if existing cached contents cannot be loaded.
    pub async fn new(service: Arc<dyn CachedContentService>) -> Result<Self> {
        Self::with_config(service, &CacheConfig::default()).await
    }

    /// Create a manager using `config` for the startup listing.
    pub async fn with_config(service: Arc<dyn CachedContentService>, config: &CacheConfig) -> Result<Self> {
        let directory = CacheDirectory::bootstrap(service.as_ref(), config.list_page_size).await?;
        info!("Loaded {} existing cached contents", directory.len());
        metrics::update_cache_entries(directory.len());

        Ok(Self {
            service,
            directory: Arc::new(directory),
        })
    }

    /// Get the id of a cached content holding `content`, creating or
    /// refreshing it as needed.
    ///
    /// Returns `None` when no cached content is available for this call: a
    /// remote call failed, or the existing entry was built from different
    /// content and has just been deleted. In the latter case the next call
    /// creates a fresh cached content.
    pub async fn get_or_create(
        &self,
        key: &str,
        ttl: Duration,
        content: &Content,
        tools: Option<&ToolDeclaration>,
        tool_config: Option<&ToolConfig>,
        model: &str,
    ) -> Option<String> {
        if key.is_empty() {
            warn!("Refusing to cache content under an empty key");
            return None;
        }
        // The remote TTL has whole-second resolution
        if ttl.as_secs() == 0 {
            warn!("Refusing to cache content for key '{}' with a TTL under one second", key);
            return None;
        }

        let checksum = checksum(content, tools, tool_config);

        let outcome = self
            .directory
            .upsert(key, |current| async move {
                match Decision::evaluate(current, &checksum, Utc::now()) {
                    Decision::Create => {
                        self.create(key, ttl, content, tools, tool_config, model, &checksum).await
                    }
                    Decision::Recreate(entry) => {
                        debug!("Cached content for key '{}' has expired: {:?}", key, entry);
                        self.create(key, ttl, content, tools, tool_config, model, &checksum).await
                    }
                    Decision::Extend(entry) => {
                        debug!(
                            "Using existing cached content for key '{}' and extending TTL due to approaching expiration: {:?}",
                            key, entry
                        );
                        self.extend(entry, ttl).await
                    }
                    Decision::Reuse(entry) => {
                        debug!("Using existing cached content for key '{}': {:?}", key, entry);
                        metrics::record_cache_hit();
                        Some(entry)
                    }
                    Decision::Delete(entry) => {
                        debug!("Cached content for key '{}' has different checksum, deleting: {:?}", key, entry);
                        self.delete(entry).await;
                        None
                    }
                }
            })
            .await;

        metrics::update_cache_entries(self.directory.len());
        outcome.map(|entry| entry.id)
    }

    /// Forget the entry for `key` without touching the remote object.
    ///
    /// The remote cached content is left to expire on its own; the next
    /// `get_or_create` for `key` creates a new one.
    pub async fn invalidate(&self, key: &str) {
        if let Some(removed) = self.directory.remove(key).await {
            info!("Invalidated cached content for key '{}': {:?}", key, removed);
            metrics::record_cache_invalidate();
            metrics::update_cache_entries(self.directory.len());
        }
    }

    /// Snapshot of the entry currently recorded for `key`.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.directory.get(key).await
    }

    /// Snapshot of all recorded entries, ordered by key.
    pub async fn entries(&self) -> Vec<CacheEntry> {
        self.directory.entries().await
    }

    /// Number of keys with a recorded entry.
    pub fn len(&self) -> usize {
        self.directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    #[allow(clippy::too_many_arguments)]
    async fn create(
        &self,
        key: &str,
        ttl: Duration,
        content: &Content,
        tools: Option<&ToolDeclaration>,
        tool_config: Option<&ToolConfig>,
        model: &str,
        checksum: &str,
    ) -> Option<CacheEntry> {
        let request = CachedContent {
            display_name: Some(display_name(key, checksum)),
            system_instruction: Some(content.clone()),
            tools: tools.map(|t| vec![t.clone()]),
            tool_config: tool_config.cloned(),
            ttl: Some(format_ttl(ttl)),
            ..Default::default()
        };

        let created = self
            .service
            .create_cached_content(model, request)
            .await
            .and_then(|response| CacheEntry::created(key, checksum, &response));

        match created {
            Ok(entry) => {
                debug!("Created new cached content for key '{}': {:?}", key, entry);
                metrics::record_cache_create();
                Some(entry)
            }
            Err(e) => {
                error!("Failed to create cached content for key '{}': {}", key, e);
                metrics::record_cache_failure();
                None
            }
        }
    }

    async fn extend(&self, entry: CacheEntry, ttl: Duration) -> Option<CacheEntry> {
        let extended = self
            .service
            .update_cached_content(&entry.id, CachedContentUpdate::with_ttl(ttl))
            .await
            .and_then(|response| entry.extended(&response));

        match extended {
            Ok(extended) => {
                debug!("Extended TTL for cached content '{}': {:?}", entry.key, extended);
                metrics::record_cache_extend();
                Some(extended)
            }
            Err(e) => {
                error!("Failed to extend TTL for cached content '{}': {:?}: {}", entry.key, entry, e);
                metrics::record_cache_failure();
                None
            }
        }
    }

    /// Delete the remote object. The local entry is dropped either way.
    async fn delete(&self, entry: CacheEntry) {
        match self.service.delete_cached_content(&entry.id).await {
            Ok(()) => {
                debug!("Deleted cached content for key '{}': {}", entry.key, entry.id);
                metrics::record_cache_delete();
            }
            Err(e) => {
                error!("Failed to delete cached content for key '{}': {:?}: {}", entry.key, entry, e);
                metrics::record_cache_failure();
            }
        }
    }
}
