//! Optional paid search APIs behind one uniform interface.
//!
//! Disabled by default — the free crawler is always preferred.  Each
//! provider enforces a daily quota and goes silent (empty results) when
//! it runs out, so the pipeline falls through gracefully.

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sahayak_config::PaidApiConfig;
use sahayak_types::WebHit;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Uniform interface over third-party web-search providers.
#[async_trait]
pub trait SearchApi: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<WebHit>>;
    fn remaining_quota(&self) -> u32;
}

// ── Quota tracking ───────────────────────────────────────────────────────────

/// Daily request budget.  Checked before the upstream call, consumed
/// after a successful one.
struct Quota {
    daily_limit: u32,
    used: AtomicU32,
}

impl Quota {
    fn new(daily_limit: u32) -> Self {
        Self {
            daily_limit,
            used: AtomicU32::new(0),
        }
    }

    fn exhausted(&self) -> bool {
        self.used.load(Ordering::Relaxed) >= self.daily_limit
    }

    fn consume(&self) {
        self.used.fetch_add(1, Ordering::Relaxed);
    }

    fn remaining(&self) -> u32 {
        self.daily_limit
            .saturating_sub(self.used.load(Ordering::Relaxed))
    }
}

fn api_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?)
}

// ── Providers ────────────────────────────────────────────────────────────────

/// The default provider: always empty, zero quota.
pub struct DisabledApi;

#[async_trait]
impl SearchApi for DisabledApi {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<WebHit>> {
        debug!(query, "search api disabled - skipping");
        Ok(Vec::new())
    }

    fn remaining_quota(&self) -> u32 {
        0
    }
}

/// Google Custom Search.  Needs both an API key and a custom search
/// engine id (`cx`).
pub struct GoogleCustomSearch {
    api_key: String,
    cx: String,
    quota: Quota,
    client: reqwest::Client,
}

impl GoogleCustomSearch {
    pub fn new(api_key: impl Into<String>, cx: impl Into<String>, daily_limit: u32) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            cx: cx.into(),
            quota: Quota::new(daily_limit),
            client: api_client()?,
        })
    }
}

#[async_trait]
impl SearchApi for GoogleCustomSearch {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<WebHit>> {
        if self.quota.exhausted() {
            warn!("google api daily limit reached");
            return Ok(Vec::new());
        }

        let resp = self
            .client
            .get("https://www.googleapis.com/customsearch/v1")
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx.as_str()),
                ("q", query),
                ("num", &limit.min(10).to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("google api error: {}", resp.status());
        }
        let json: Value = resp.json().await?;
        self.quota.consume();

        let hits = json["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| WebHit {
                        title: item["title"].as_str().unwrap_or("").to_string(),
                        url: item["link"].as_str().unwrap_or("").to_string(),
                        snippet: item["snippet"].as_str().unwrap_or("").to_string(),
                    })
                    .filter(|hit| !hit.url.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }

    fn remaining_quota(&self) -> u32 {
        self.quota.remaining()
    }
}

/// Bing Web Search, scoped to the India market.
pub struct BingWebSearch {
    api_key: String,
    quota: Quota,
    client: reqwest::Client,
}

impl BingWebSearch {
    pub fn new(api_key: impl Into<String>, daily_limit: u32) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            quota: Quota::new(daily_limit),
            client: api_client()?,
        })
    }
}

#[async_trait]
impl SearchApi for BingWebSearch {
    fn name(&self) -> &'static str {
        "bing"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<WebHit>> {
        if self.quota.exhausted() {
            warn!("bing api daily limit reached");
            return Ok(Vec::new());
        }

        let resp = self
            .client
            .get("https://api.bing.microsoft.com/v7.0/search")
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .query(&[
                ("q", query),
                ("count", &limit.min(50).to_string()),
                ("mkt", "en-IN"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("bing api error: {}", resp.status());
        }
        let json: Value = resp.json().await?;
        self.quota.consume();

        let hits = json["webPages"]["value"]
            .as_array()
            .map(|pages| {
                pages
                    .iter()
                    .map(|page| WebHit {
                        title: page["name"].as_str().unwrap_or("").to_string(),
                        url: page["url"].as_str().unwrap_or("").to_string(),
                        snippet: page["snippet"].as_str().unwrap_or("").to_string(),
                    })
                    .filter(|hit| !hit.url.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }

    fn remaining_quota(&self) -> u32 {
        self.quota.remaining()
    }
}

/// SerpAPI (scraped Google results), localised to Hindi/India.
pub struct SerpApi {
    api_key: String,
    quota: Quota,
    client: reqwest::Client,
}

impl SerpApi {
    pub fn new(api_key: impl Into<String>, daily_limit: u32) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            quota: Quota::new(daily_limit),
            client: api_client()?,
        })
    }
}

#[async_trait]
impl SearchApi for SerpApi {
    fn name(&self) -> &'static str {
        "serpapi"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<WebHit>> {
        if self.quota.exhausted() {
            warn!("serpapi daily limit reached");
            return Ok(Vec::new());
        }

        let resp = self
            .client
            .get("https://serpapi.com/search")
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("q", query),
                ("num", &limit.min(10).to_string()),
                ("gl", "in"),
                ("hl", "hi"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("serpapi error: {}", resp.status());
        }
        let json: Value = resp.json().await?;
        self.quota.consume();

        let hits = json["organic_results"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| WebHit {
                        title: item["title"].as_str().unwrap_or("").to_string(),
                        url: item["link"].as_str().unwrap_or("").to_string(),
                        snippet: item["snippet"].as_str().unwrap_or("").to_string(),
                    })
                    .filter(|hit| !hit.url.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }

    fn remaining_quota(&self) -> u32 {
        self.quota.remaining()
    }
}

// ── Manager ──────────────────────────────────────────────────────────────────

/// Status snapshot for the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct ApiStatus {
    pub enabled: bool,
    pub provider: String,
    pub remaining_quota: u32,
    pub daily_limit: u32,
}

struct ManagerState {
    enabled: bool,
    daily_limit: u32,
    provider: Arc<dyn SearchApi>,
}

/// Holds the active provider and hands out searches.  Enabling and
/// disabling are admin operations; request handling only reads.
pub struct ApiManager {
    state: RwLock<ManagerState>,
}

impl ApiManager {
    /// Build from configuration.  Anything short of a complete credential
    /// set leaves the manager disabled.
    pub fn from_config(config: &PaidApiConfig) -> Self {
        let manager = Self {
            state: RwLock::new(ManagerState {
                enabled: false,
                daily_limit: config.daily_limit,
                provider: Arc::new(DisabledApi),
            }),
        };
        if config.enabled {
            let cx = (!config.google_cx.is_empty()).then_some(config.google_cx.as_str());
            manager.enable(&config.provider, &config.api_key, cx, config.daily_limit);
        }
        manager
    }

    /// Switch on a provider.  Returns `false` (and stays disabled) when
    /// the provider cannot be constructed — e.g. Google without its `cx`.
    pub fn enable(
        &self,
        provider: &str,
        api_key: &str,
        google_cx: Option<&str>,
        daily_limit: u32,
    ) -> bool {
        if api_key.is_empty() {
            warn!(provider, "cannot enable search api without a key");
            return false;
        }

        let built: Option<Arc<dyn SearchApi>> = match provider {
            "google" => match google_cx {
                Some(cx) if !cx.is_empty() => GoogleCustomSearch::new(api_key, cx, daily_limit)
                    .ok()
                    .map(|p| Arc::new(p) as Arc<dyn SearchApi>),
                _ => {
                    warn!("google search api needs a custom search engine id");
                    None
                }
            },
            "bing" => BingWebSearch::new(api_key, daily_limit)
                .ok()
                .map(|p| Arc::new(p) as Arc<dyn SearchApi>),
            "serpapi" => SerpApi::new(api_key, daily_limit)
                .ok()
                .map(|p| Arc::new(p) as Arc<dyn SearchApi>),
            other => {
                warn!(provider = other, "unknown search api provider");
                None
            }
        };

        match built {
            Some(provider_impl) => {
                let mut state = self.state.write().expect("api manager lock poisoned");
                state.enabled = true;
                state.daily_limit = daily_limit;
                state.provider = provider_impl;
                info!(provider, daily_limit, "search api enabled");
                true
            }
            None => false,
        }
    }

    pub fn disable(&self) {
        let mut state = self.state.write().expect("api manager lock poisoned");
        state.enabled = false;
        state.provider = Arc::new(DisabledApi);
        info!("search api disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.state.read().expect("api manager lock poisoned").enabled
    }

    /// Search through the active provider.  Failures and exhausted quotas
    /// degrade to an empty result set.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<WebHit> {
        let provider = {
            let state = self.state.read().expect("api manager lock poisoned");
            if !state.enabled {
                return Vec::new();
            }
            Arc::clone(&state.provider)
        };

        match provider.search(query, limit).await {
            Ok(hits) => hits,
            Err(err) => {
                warn!(provider = provider.name(), error = %err, "search api call failed");
                Vec::new()
            }
        }
    }

    pub fn status(&self) -> ApiStatus {
        let state = self.state.read().expect("api manager lock poisoned");
        ApiStatus {
            enabled: state.enabled,
            provider: state.provider.name().to_string(),
            remaining_quota: state.provider.remaining_quota(),
            daily_limit: state.daily_limit,
        }
    }
}

impl Default for ApiManager {
    fn default() -> Self {
        Self::from_config(&PaidApiConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_provider_returns_empty() {
        let api = DisabledApi;
        assert!(api.search("ssc cgl", 5).await.unwrap().is_empty());
        assert_eq!(api.remaining_quota(), 0);
    }

    #[tokio::test]
    async fn exhausted_quota_short_circuits_without_network() {
        // daily_limit 0 means the very first call is already over budget;
        // an unroutable key proves no request is attempted.
        let api = BingWebSearch::new("test-key", 0).unwrap();
        let hits = api.search("ssc cgl result", 5).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(api.remaining_quota(), 0);
    }

    #[test]
    fn manager_defaults_to_disabled() {
        let manager = ApiManager::default();
        assert!(!manager.is_enabled());
        let status = manager.status();
        assert_eq!(status.provider, "disabled");
        assert_eq!(status.remaining_quota, 0);
    }

    #[test]
    fn google_without_cx_stays_disabled() {
        let manager = ApiManager::default();
        assert!(!manager.enable("google", "some-key", None, 100));
        assert!(!manager.is_enabled());

        assert!(manager.enable("google", "some-key", Some("cx-id"), 100));
        assert!(manager.is_enabled());
        assert_eq!(manager.status().provider, "google");
        assert_eq!(manager.status().remaining_quota, 100);
    }

    #[test]
    fn enable_then_disable_round_trip() {
        let manager = ApiManager::default();
        assert!(manager.enable("serpapi", "key", None, 25));
        assert!(manager.is_enabled());
        assert_eq!(manager.status().daily_limit, 25);

        manager.disable();
        assert!(!manager.is_enabled());
        assert_eq!(manager.status().provider, "disabled");
    }

    #[tokio::test]
    async fn manager_search_while_disabled_is_empty() {
        let manager = ApiManager::default();
        assert!(manager.search("pm kisan", 5).await.is_empty());
    }

    #[test]
    fn config_with_bing_credentials_enables_on_construction() {
        let config = PaidApiConfig {
            enabled: true,
            provider: "bing".to_string(),
            api_key: "key".to_string(),
            google_cx: String::new(),
            daily_limit: 10,
        };
        let manager = ApiManager::from_config(&config);
        assert!(manager.is_enabled());
        assert_eq!(manager.status().provider, "bing");
    }
}
