//! Metadata tracked for each remote cached content.

// Author: kelexine (https://github.com/kelexine)

use crate::error::{CacheError, Result};
use crate::gemini::CachedContent;
use chrono::{DateTime, Duration, Utc};

/// Separates the application key from the checksum in a display name.
const DISPLAY_NAME_SEPARATOR: char = ':';

/// Local view of one remote cached content.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Remote resource name, e.g. `cachedContents/abc123`.
    pub id: String,
    /// Application key this entry is registered under.
    pub key: String,
    /// Fingerprint of the content the remote object was built from.
    /// `None` when the remote display name carried no checksum.
    pub checksum: Option<String>,
    /// Expiration last confirmed by the remote service.
    pub expire_time: DateTime<Utc>,
}

/// Compose the display name recorded on the remote object.
pub fn display_name(key: &str, checksum: &str) -> String {
    format!("{}{}{}", key, DISPLAY_NAME_SEPARATOR, checksum)
}

/// Split a remote display name back into key and checksum.
///
/// Splits at the last separator so keys may themselves contain `:`.
pub fn parse_display_name(display_name: &str) -> (String, Option<String>) {
    match display_name.rsplit_once(DISPLAY_NAME_SEPARATOR) {
        Some((key, checksum)) if !checksum.is_empty() => {
            (key.to_string(), Some(checksum.to_string()))
        }
        Some((key, _)) => (key.to_string(), None),
        None => (display_name.to_string(), None),
    }
}

impl CacheEntry {
    /// Rebuild an entry from a listed remote object.
    pub fn from_cached_content(content: &CachedContent) -> Result<Self> {
        let display_name = content.display_name.as_deref().ok_or_else(|| {
            CacheError::InvalidResponse("cached content has no displayName".to_string())
        })?;
        let (key, checksum) = parse_display_name(display_name);

        Ok(Self {
            id: required_name(content)?,
            key,
            checksum,
            expire_time: required_expire_time(content)?,
        })
    }

    /// Entry for an object just created from content with `checksum`.
    pub fn created(key: &str, checksum: &str, content: &CachedContent) -> Result<Self> {
        Ok(Self {
            id: required_name(content)?,
            key: key.to_string(),
            checksum: Some(checksum.to_string()),
            expire_time: required_expire_time(content)?,
        })
    }

    /// Same entry with the expiration confirmed by a TTL update.
    pub fn extended(&self, updated: &CachedContent) -> Result<Self> {
        Ok(Self {
            expire_time: required_expire_time(updated)?,
            ..self.clone()
        })
    }

    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_time < now
    }

    /// True once less than `window` remains before expiration.
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.expire_time - window < now
    }

    pub fn checksum_matches(&self, checksum: &str) -> bool {
        self.checksum.as_deref() == Some(checksum)
    }
}

fn required_name(content: &CachedContent) -> Result<String> {
    content
        .name
        .clone()
        .ok_or_else(|| CacheError::InvalidResponse("cached content has no name".to_string()))
}

fn required_expire_time(content: &CachedContent) -> Result<DateTime<Utc>> {
    content
        .expire_time
        .ok_or_else(|| CacheError::InvalidResponse("cached content has no expireTime".to_string()))
}
