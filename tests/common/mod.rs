// In-memory cachedContents service used by the integration tests
// Author: kelexine (https://github.com/kelexine)

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use gemcache::error::{CacheError, Result};
use gemcache::gemini::{CachedContent, CachedContentService, CachedContentUpdate};
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    listed: Vec<CachedContent>,
    next_id: u32,
    created: Vec<(String, CachedContent)>,
    updated: Vec<(String, CachedContentUpdate)>,
    deleted: Vec<String>,
    fail_list: bool,
    fail_create: bool,
    fail_update: bool,
    fail_delete: bool,
    /// Lifetime given to created objects; `None` uses the requested ttl
    created_lifetime: Option<ChronoDuration>,
    delay: Duration,
    in_flight: usize,
    max_in_flight: usize,
}

/// Fake remote service recording every call it receives.
#[derive(Default)]
pub struct FakeService {
    state: Mutex<FakeState>,
}

pub fn parse_ttl(ttl: &str) -> ChronoDuration {
    let secs: i64 = ttl.trim_end_matches('s').parse().unwrap_or(0);
    ChronoDuration::seconds(secs)
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects returned by the startup listing.
    pub fn with_listed(listed: Vec<CachedContent>) -> Self {
        let service = Self::default();
        service.state.lock().listed = listed;
        service
    }

    pub fn fail_list(&self, fail: bool) {
        self.state.lock().fail_list = fail;
    }

    pub fn fail_create(&self, fail: bool) {
        self.state.lock().fail_create = fail;
    }

    pub fn fail_update(&self, fail: bool) {
        self.state.lock().fail_update = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.state.lock().fail_delete = fail;
    }

    /// Make created objects expire `lifetime` after creation regardless of ttl.
    pub fn created_lifetime(&self, lifetime: ChronoDuration) {
        self.state.lock().created_lifetime = Some(lifetime);
    }

    /// Hold every call for `delay` before answering.
    pub fn delay(&self, delay: Duration) {
        self.state.lock().delay = delay;
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().created.len()
    }

    pub fn created(&self) -> Vec<(String, CachedContent)> {
        self.state.lock().created.clone()
    }

    pub fn update_calls(&self) -> usize {
        self.state.lock().updated.len()
    }

    pub fn updated(&self) -> Vec<(String, CachedContentUpdate)> {
        self.state.lock().updated.clone()
    }

    pub fn delete_calls(&self) -> usize {
        self.state.lock().deleted.len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    pub fn remote_calls(&self) -> usize {
        let state = self.state.lock();
        state.created.len() + state.updated.len() + state.deleted.len()
    }

    /// Highest number of calls that were being served at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().max_in_flight
    }

    async fn enter(&self) {
        let delay = {
            let mut state = self.state.lock();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CachedContentService for FakeService {
    async fn list_cached_contents(&self, _page_size: u32) -> Result<Vec<CachedContent>> {
        let state = self.state.lock();
        if state.fail_list {
            return Err(CacheError::remote(503, "Service Unavailable"));
        }
        Ok(state.listed.clone())
    }

    async fn create_cached_content(&self, model: &str, content: CachedContent) -> Result<CachedContent> {
        self.enter().await;
        let mut state = self.state.lock();
        state.in_flight -= 1;
        state.created.push((model.to_string(), content.clone()));
        if state.fail_create {
            return Err(CacheError::remote(500, "Internal Server Error"));
        }

        state.next_id += 1;
        let lifetime = state
            .created_lifetime
            .unwrap_or_else(|| parse_ttl(content.ttl.as_deref().unwrap_or("0s")));
        Ok(CachedContent {
            name: Some(format!("cachedContents/cache-{}", state.next_id)),
            create_time: Some(Utc::now()),
            expire_time: Some(Utc::now() + lifetime),
            ttl: None,
            ..content
        })
    }

    async fn update_cached_content(&self, id: &str, update: CachedContentUpdate) -> Result<CachedContent> {
        self.enter().await;
        let mut state = self.state.lock();
        state.in_flight -= 1;
        state.updated.push((id.to_string(), update.clone()));
        if state.fail_update {
            return Err(CacheError::remote(403, "CachedContent not found"));
        }

        Ok(CachedContent {
            name: Some(id.to_string()),
            update_time: Some(Utc::now()),
            expire_time: Some(Utc::now() + parse_ttl(&update.ttl)),
            ..Default::default()
        })
    }

    async fn delete_cached_content(&self, id: &str) -> Result<()> {
        self.enter().await;
        let mut state = self.state.lock();
        state.in_flight -= 1;
        state.deleted.push(id.to_string());
        if state.fail_delete {
            return Err(CacheError::remote(403, "CachedContent not found"));
        }
        Ok(())
    }
}

/// A listed remote object as the API would return it.
pub fn listed(id: &str, display_name: &str, expires_in: ChronoDuration) -> CachedContent {
    CachedContent {
        name: Some(id.to_string()),
        display_name: Some(display_name.to_string()),
        expire_time: Some(Utc::now() + expires_in),
        ..Default::default()
    }
}
