//! In-memory directory of cached content metadata.
//!
//! The directory maps application keys to [`CacheEntry`] values and is the
//! only place entries are mutated. Each key owns a slot guarded by an async
//! mutex; [`CacheDirectory::upsert`] holds that mutex across the caller's
//! decision (including any remote calls it makes), so two operations on the
//! same key never interleave while operations on different keys run in
//! parallel. The table of slots is only locked long enough to look a slot up.

// Author: kelexine (https://github.com/kelexine)

use super::models::CacheEntry;
use crate::error::Result;
use crate::gemini::CachedContentService;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

type Slot = Arc<tokio::sync::Mutex<Option<CacheEntry>>>;

/// Concurrency-safe key → entry map with per-key exclusive updates.
#[derive(Default)]
pub struct CacheDirectory {
    slots: Mutex<HashMap<String, Slot>>,
    /// Number of slots currently holding an entry
    live: AtomicUsize,
}

impl CacheDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from known entries.
    ///
    /// When several entries share a key, the one expiring last wins.
    pub fn from_entries(entries: impl IntoIterator<Item = CacheEntry>) -> Self {
        let mut by_key: HashMap<String, CacheEntry> = HashMap::new();
        for entry in entries {
            match by_key.get(&entry.key) {
                Some(existing) if existing.expire_time >= entry.expire_time => {
                    debug!("Ignoring older duplicate for key '{}': {}", entry.key, entry.id);
                }
                _ => {
                    by_key.insert(entry.key.clone(), entry);
                }
            }
        }

        let live = by_key.len();
        let slots = by_key
            .into_iter()
            .map(|(key, entry)| (key, Arc::new(tokio::sync::Mutex::new(Some(entry)))))
            .collect();

        Self {
            slots: Mutex::new(slots),
            live: AtomicUsize::new(live),
        }
    }

    /// Load the initial view from the remote service's listing.
    ///
    /// Remote objects that cannot be mapped to an entry are skipped. A failed
    /// listing is returned to the caller.
    pub async fn bootstrap(service: &dyn CachedContentService, page_size: u32) -> Result<Self> {
        let contents = service.list_cached_contents(page_size).await?;

        let entries = contents.iter().filter_map(|content| {
            match CacheEntry::from_cached_content(content) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping cached content {:?}: {}", content.name, e);
                    None
                }
            }
        });

        let directory = Self::from_entries(entries);
        debug!("Loaded {} existing cached contents", directory.len());
        Ok(directory)
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock();
        Arc::clone(
            slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None))),
        )
    }

    /// Atomically replace the entry for `key` with the outcome of `decide`.
    ///
    /// `decide` receives the current entry (or `None`) and resolves to the
    /// entry to store, `None` removing it. It runs while the key's slot is
    /// held, so it may await remote calls without racing other operations on
    /// the same key. A cancelled upsert leaves the key absent.
    pub async fn upsert<F, Fut>(&self, key: &str, decide: F) -> Option<CacheEntry>
    where
        F: FnOnce(Option<CacheEntry>) -> Fut,
        Fut: Future<Output = Option<CacheEntry>>,
    {
        let slot = self.slot(key);

        let outcome = {
            let mut guard = slot.lock().await;
            let current = guard.take();
            if current.is_some() {
                self.live.fetch_sub(1, Ordering::SeqCst);
            }

            let next = decide(current).await;
            if next.is_some() {
                self.live.fetch_add(1, Ordering::SeqCst);
            }
            *guard = next.clone();
            next
        };

        self.prune(key, &slot);
        outcome
    }

    /// Remove the entry for `key`, waiting for any in-flight update of it.
    pub async fn remove(&self, key: &str) -> Option<CacheEntry> {
        let slot = self.slots.lock().get(key).cloned()?;

        let removed = slot.lock().await.take();
        if removed.is_some() {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }

        self.prune(key, &slot);
        removed
    }

    /// Snapshot of the entry for `key`.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let slot = self.slots.lock().get(key).cloned()?;
        let entry = slot.lock().await.clone();
        entry
    }

    /// Snapshot of every entry, waiting for in-flight updates.
    pub async fn entries(&self) -> Vec<CacheEntry> {
        let slots: Vec<Slot> = self.slots.lock().values().cloned().collect();

        let mut entries = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(entry) = slot.lock().await.clone() {
                entries.push(entry);
            }
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Number of keys currently holding an entry.
    pub fn len(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop an empty slot nobody else holds.
    ///
    /// Slot handles are only handed out under the table lock, so a strong
    /// count of two (table plus `slot`) observed here cannot grow.
    fn prune(&self, key: &str, slot: &Slot) {
        let mut slots = self.slots.lock();
        let removable = match slots.get(key) {
            Some(current) => {
                Arc::ptr_eq(current, slot)
                    && Arc::strong_count(slot) == 2
                    && slot.try_lock().map(|entry| entry.is_none()).unwrap_or(false)
            }
            None => false,
        };
        if removable {
            slots.remove(key);
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots.lock().len()
    }
}
