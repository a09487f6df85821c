// Gemini cachedContents API client
// Author: kelexine (https://github.com/kelexine)

use super::cache_models::{CachedContent, CachedContentUpdate, ListCachedContentsResponse};
use super::CachedContentService;
use crate::config::GeminiConfig;
use crate::error::{CacheError, Result};
use crate::utils::logging::sanitize;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, error};
use zeroize::Zeroizing;

const CACHE_RESOURCE_PREFIX: &str = "cachedContents/";
const MODEL_RESOURCE_PREFIX: &str = "models/";

/// Client for the Gemini `cachedContents` REST resource.
///
/// Authenticates with an API key and retries retryable statuses with
/// backoff. Transport failures are only repeated when the connection was
/// never established; a timed-out request may already have taken effect.
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    api_key: Zeroizing<String>,
    max_retries: u32,
}

impl GeminiClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Config` if no API key is configured.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            CacheError::Config(format!(
                "No Gemini API key configured (set gemini.api_key or {})",
                crate::config::API_KEY_ENV
            ))
        })?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .use_rustls_tls()
            .build()
            .map_err(|e| CacheError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created HTTP client for {}", config.api_base_url);

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: Zeroizing::new(api_key),
            max_retries: config.max_retries,
        })
    }

    /// Get the API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a single cached content, accepting ids with or without the resource prefix.
    fn resource_url(&self, id: &str) -> String {
        let name = id.strip_prefix(CACHE_RESOURCE_PREFIX).unwrap_or(id);
        format!("{}/{}{}", self.base_url, CACHE_RESOURCE_PREFIX, name)
    }

    fn collection_url(&self) -> String {
        format!("{}/cachedContents", self.base_url)
    }

    fn model_resource(model: &str) -> String {
        if model.starts_with(MODEL_RESOURCE_PREFIX) {
            model.to_string()
        } else {
            format!("{}{}", MODEL_RESOURCE_PREFIX, model)
        }
    }

    fn build_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("x-goog-api-key", self.api_key.as_str())
            .header("Content-Type", "application/json")
    }

    /// Send a request and return the body of a successful response.
    async fn execute(operation: &str, request: RequestBuilder) -> Result<String> {
        let response = request.send().await.map_err(|e| {
            error!("{} request failed: {}", operation, e);
            CacheError::Http(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Sanitized body keeps the JSON shape, so RetryInfo hints still parse
            let body = sanitize(&body);
            let message = Self::extract_error_message(&body).unwrap_or_else(|| body.clone());
            error!("{} failed: HTTP {} - {}", operation, status, message);
            return Err(CacheError::remote(status.as_u16(), body));
        }

        Ok(body)
    }

    /// Issue a request with retries and record its outcome.
    async fn call<F>(&self, operation: &'static str, build: F) -> Result<String>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let started = Instant::now();
        let result = crate::utils::retry::with_retry(operation, self.max_retries, || {
            let request = build();
            async move { Self::execute(operation, request).await }
        })
        .await;

        crate::metrics::record_remote_call(
            operation,
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );
        result
    }

    fn parse<T: DeserializeOwned>(operation: &str, body: &str) -> Result<T> {
        serde_json::from_str(body).map_err(|e| {
            error!("Failed to parse {} response: {}", operation, e);
            CacheError::InvalidResponse(format!("{}: {}", operation, e))
        })
    }

    /// Extract the `error.message` from a Google API error body.
    pub fn extract_error_message(response_text: &str) -> Option<String> {
        #[derive(serde::Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(serde::Deserialize)]
        struct ErrorDetail {
            message: Option<String>,
            status: Option<String>,
        }

        if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(response_text) {
            if let Some(error) = error_resp.error {
                return error.message.or(error.status);
            }
        }
        None
    }
}

#[async_trait]
impl CachedContentService for GeminiClient {
    async fn list_cached_contents(&self, page_size: u32) -> Result<Vec<CachedContent>> {
        let url = self.collection_url();
        debug!("Listing cached contents (pageSize={})", page_size);

        let body = self
            .call("list", || {
                self.build_request(Method::GET, &url)
                    .query(&[("pageSize", page_size)])
            })
            .await?;

        let response: ListCachedContentsResponse = Self::parse("list", &body)?;
        if response.next_page_token.is_some() {
            debug!("More cached contents exist beyond the first {}", page_size);
        }
        Ok(response.cached_contents.unwrap_or_default())
    }

    async fn create_cached_content(&self, model: &str, mut content: CachedContent) -> Result<CachedContent> {
        let url = self.collection_url();
        content.model = Some(Self::model_resource(model));
        debug!("Creating cached content for model: {}", model);

        let body = self
            .call("create", || self.build_request(Method::POST, &url).json(&content))
            .await?;

        Self::parse("create", &body)
    }

    async fn update_cached_content(&self, id: &str, update: CachedContentUpdate) -> Result<CachedContent> {
        let url = self.resource_url(id);
        debug!("Extending cached content {} to ttl {}", id, update.ttl);

        let body = self
            .call("update", || {
                self.build_request(Method::PATCH, &url)
                    .query(&[("updateMask", "ttl")])
                    .json(&update)
            })
            .await?;

        Self::parse("update", &body)
    }

    async fn delete_cached_content(&self, id: &str) -> Result<()> {
        let url = self.resource_url(id);
        debug!("Deleting cached content {}", id);

        self.call("delete", || self.build_request(Method::DELETE, &url))
            .await
            .map(|_| ())
    }
}
