use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory for the sharded file tier.
    pub cache_dir: String,
    pub default_ttl_hours: u64,
    /// Hard cap on the in-memory LRU tier.
    pub memory_cache_max: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: "cache/search".to_string(),
            default_ttl_hours: 6,
            memory_cache_max: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_searches_per_user_per_day: usize,
    pub max_searches_per_minute: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_searches_per_user_per_day: 50,
            max_searches_per_minute: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Search scores at or above this trigger external retrieval.
    pub search_score_threshold: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            search_score_threshold: 0.55,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerWeights {
    pub relevance: f64,
    pub trust: f64,
    pub freshness: f64,
    pub title_match: f64,
}

impl Default for RankerWeights {
    fn default() -> Self {
        Self {
            relevance: 0.40,
            trust: 0.35,
            freshness: 0.15,
            title_match: 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    pub min_result_score: f64,
    pub max_results: usize,
    pub weights: RankerWeights,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            min_result_score: 0.40,
            max_results: 5,
            weights: RankerWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Politeness budget for domains without a registry override,
    /// in requests per second.
    pub rate_limit_default: f64,
    pub timeout_secs: u64,
    pub max_pages_default: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            rate_limit_default: 1.0,
            timeout_secs: 15,
            max_pages_default: 5,
        }
    }
}

/// Paid search API settings.  Disabled by default; the free crawler is
/// always preferred.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaidApiConfig {
    pub enabled: bool,
    /// One of "google", "bing", "serpapi", "none".
    pub provider: String,
    pub api_key: String,
    /// Google Custom Search additionally needs the engine id.
    pub google_cx: String,
    pub daily_limit: u32,
}

impl Default for PaidApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "none".to_string(),
            api_key: String::new(),
            google_cx: String::new(),
            daily_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub cache: CacheConfig,
    pub limits: LimitsConfig,
    pub policy: PolicyConfig,
    pub ranker: RankerConfig,
    pub crawler: CrawlerConfig,
    pub paid_api: PaidApiConfig,
}

impl SearchConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SearchConfig::default();
        assert_eq!(config.cache.default_ttl_hours, 6);
        assert_eq!(config.cache.memory_cache_max, 500);
        assert_eq!(config.limits.max_searches_per_user_per_day, 50);
        assert_eq!(config.limits.max_searches_per_minute, 5);
        assert_eq!(config.policy.search_score_threshold, 0.55);
        assert_eq!(config.ranker.min_result_score, 0.40);
        assert_eq!(config.ranker.max_results, 5);
        assert!(!config.paid_api.enabled);
        assert_eq!(config.paid_api.provider, "none");
        assert_eq!(config.crawler.rate_limit_default, 1.0);
    }

    #[test]
    fn ranker_weights_sum_to_one() {
        let w = RankerWeights::default();
        let sum = w.relevance + w.trust + w.freshness + w.title_match;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let config = SearchConfig::load_from("/nonexistent/sahayak.toml").unwrap();
        assert_eq!(config.cache.memory_cache_max, 500);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.toml");

        let mut config = SearchConfig::default();
        config.cache.default_ttl_hours = 24;
        config.paid_api.provider = "bing".to_string();
        config.save_to(&path).unwrap();

        let loaded = SearchConfig::load_from(&path).unwrap();
        assert_eq!(loaded.cache.default_ttl_hours, 24);
        assert_eq!(loaded.paid_api.provider, "bing");
    }

    #[test]
    fn partial_toml_fills_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        fs::write(&path, "[limits]\nmax_searches_per_minute = 2\n").unwrap();

        let loaded = SearchConfig::load_from(&path).unwrap();
        assert_eq!(loaded.limits.max_searches_per_minute, 2);
        assert_eq!(loaded.limits.max_searches_per_user_per_day, 50);
        assert_eq!(loaded.policy.search_score_threshold, 0.55);
    }
}
