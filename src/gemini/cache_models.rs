// Gemini cached content models for the cachedContents API
// Author: kelexine (https://github.com/kelexine)

use crate::models::gemini::{Content, ToolConfig, ToolDeclaration};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached content resource, used both as create request and as response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>, // e.g., "cachedContents/abc123"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>, // e.g., "models/gemini-2.0-flash"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDeclaration>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>, // e.g., "1800s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<DateTime<Utc>>,
}

/// Patch body for extending a cached content's TTL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedContentUpdate {
    pub ttl: String,
}

impl CachedContentUpdate {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: format_ttl(ttl) }
    }
}

/// Response from listing cached contents
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCachedContentsResponse {
    #[serde(default)]
    pub cached_contents: Option<Vec<CachedContent>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Render a TTL in the protobuf Duration JSON form ("300s").
pub fn format_ttl(ttl: Duration) -> String {
    format!("{}s", ttl.as_secs())
}
