//! The search orchestrator: one long-lived engine owning every pipeline
//! component, exposing `ask` as the single entry point.
//!
//! Flow per request: policy → cache → query generation → crawl (paid API
//! fallback) → rank → evidence → cache write → log.  Every stage is
//! fail-soft; callers always get a well-formed response, never an error.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use sahayak_cache::{CacheStatus, SearchCache};
use sahayak_config::SearchConfig;
use sahayak_crawler::Crawler;
use sahayak_evidence::EvidenceExtractor;
use sahayak_policy::PolicyEngine;
use sahayak_querygen::QueryGenerator;
use sahayak_ranker::Ranker;
use sahayak_registry::{RegistryStats, TrustRegistry};
use sahayak_searchapi::{ApiManager, ApiStatus};
use sahayak_store::SearchStore;
use sahayak_types::{
    Language, LogAction, PolicyDecision, RawResult, ResponseMeta, ResultOrigin, SearchIntent,
    SearchLogEntry, SearchResponse, SourceType, TrustedSource, UrlSummary,
};
use tracing::{info, warn};

/// In-memory outcome log bound; on overflow the ring is trimmed to the
/// most recent half.
const MAX_LOG_ENTRIES: usize = 1_000;
const TRIMMED_LOG_ENTRIES: usize = 500;

pub struct SearchEngine {
    config: SearchConfig,
    registry: Arc<TrustRegistry>,
    cache: SearchCache,
    policy: PolicyEngine,
    querygen: QueryGenerator,
    crawler: Arc<Crawler>,
    api: ApiManager,
    ranker: Ranker,
    evidence: EvidenceExtractor,
    logs: Mutex<VecDeque<SearchLogEntry>>,
    store: Option<Arc<SearchStore>>,
}

impl SearchEngine {
    /// Memory-and-file mode: no persistent store attached.
    pub fn new(config: SearchConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// With a persistent store backing the cache, registry and logs.
    pub fn with_store(config: SearchConfig, store: Arc<SearchStore>) -> Result<Self> {
        Self::build(config, Some(store))
    }

    fn build(config: SearchConfig, store: Option<Arc<SearchStore>>) -> Result<Self> {
        let registry = Arc::new(match store.clone() {
            Some(store) => TrustRegistry::with_store(store),
            None => TrustRegistry::new(),
        });

        let cache = SearchCache::new(
            &config.cache.cache_dir,
            config.cache.memory_cache_max,
            config.cache.default_ttl_hours,
            store.clone(),
        );

        let policy = PolicyEngine::new(
            Arc::clone(&registry),
            config.policy.search_score_threshold,
            config.limits.max_searches_per_user_per_day,
            config.limits.max_searches_per_minute,
        );

        let crawler = Arc::new(Crawler::new(
            Arc::clone(&registry),
            std::time::Duration::from_secs(config.crawler.timeout_secs),
            config.crawler.rate_limit_default,
        )?);

        let ranker = Ranker::new(Arc::clone(&registry), config.ranker.clone());
        let api = ApiManager::from_config(&config.paid_api);
        let evidence = EvidenceExtractor::with_crawler(Arc::clone(&crawler));

        info!("search engine initialised");
        Ok(Self {
            config,
            registry,
            cache,
            policy,
            querygen: QueryGenerator::new(),
            crawler,
            api,
            ranker,
            evidence,
            logs: Mutex::new(VecDeque::new()),
            store,
        })
    }

    // ── Primary operation ────────────────────────────────────────────────────

    /// Answer a user utterance with ranked, trust-weighted results.
    pub async fn ask(
        &self,
        query: &str,
        user_id: Option<&str>,
        language: Language,
    ) -> SearchResponse {
        self.run(query, user_id, language, false).await
    }

    /// Like [`SearchEngine::ask`], additionally extracting a structured
    /// [`Facts`] record from the top results.
    pub async fn ask_with_facts(
        &self,
        query: &str,
        user_id: Option<&str>,
        language: Language,
    ) -> SearchResponse {
        self.run(query, user_id, language, true).await
    }

    async fn run(
        &self,
        query: &str,
        user_id: Option<&str>,
        language: Language,
        want_facts: bool,
    ) -> SearchResponse {
        let started = Instant::now();

        if query.trim().is_empty() {
            return self.empty_response(query, language, "empty query");
        }

        // Step 1: policy. The internal index is consulted by the hosting
        // application; the core sees its hit count (0 when absent).
        let decision = self.policy.evaluate(query, user_id, 0);

        if !decision.should_search {
            let action = if decision.rate_limited {
                LogAction::RateLimited
            } else {
                LogAction::Suppressed
            };
            self.log(SearchLogEntry {
                query: query.to_string(),
                user_id: user_id.map(String::from),
                timestamp: Utc::now(),
                intent: decision.intent,
                score: decision.score,
                action,
                source: None,
                result_count: 0,
                duration_ms: started.elapsed().as_millis() as u64,
            });

            return SearchResponse {
                success: false,
                query: query.to_string(),
                results: Vec::new(),
                formatted: self.suppressed_response(&decision, language),
                source: ResultOrigin::None,
                score: decision.score,
                intent: decision.intent,
                metadata: ResponseMeta {
                    reason: Some(decision.reason.clone()),
                    duration_ms: started.elapsed().as_millis() as u64,
                    ..Default::default()
                },
                facts: None,
            };
        }

        // Step 2: cache. Hits are re-ranked because score weights may
        // have changed since the entry was written.
        if let Some(entry) = self.cache.get(query).await {
            let ranked = self.ranker.rank(&entry.results, query);
            let top = self.ranker.get_top(ranked);
            let facts = if want_facts {
                Some(self.evidence.extract(&top, query, None).await)
            } else {
                None
            };

            self.log(SearchLogEntry {
                query: query.to_string(),
                user_id: user_id.map(String::from),
                timestamp: Utc::now(),
                intent: decision.intent,
                score: decision.score,
                action: LogAction::CacheHit,
                source: Some(ResultOrigin::Cache),
                result_count: top.len(),
                duration_ms: started.elapsed().as_millis() as u64,
            });

            let formatted = if top.is_empty() {
                self.ranker.no_results_response(query, language)
            } else {
                self.ranker.format_response(&top, language)
            };
            return SearchResponse {
                success: !top.is_empty(),
                query: query.to_string(),
                results: top,
                formatted,
                source: ResultOrigin::Cache,
                score: decision.score,
                intent: decision.intent,
                metadata: ResponseMeta {
                    cache_hit: true,
                    duration_ms: started.elapsed().as_millis() as u64,
                    ..Default::default()
                },
                facts,
            };
        }

        // Steps 3-4: query generation and crawl planning.
        let query_type = self.policy.query_type_for_intent(decision.intent);
        let generated = self.querygen.generate(query, query_type);
        let texts: Vec<String> = generated.iter().map(|g| g.text.clone()).collect();
        let plan = self.policy.choose_plan(decision.intent, query);

        // Step 5: free crawler first, paid API only as a fallback.
        let mut raw = self.crawler.search_and_crawl(&texts, &plan).await;
        let mut origin = ResultOrigin::Crawler;
        if raw.is_empty() && self.api.is_enabled() {
            let first = texts.first().map(String::as_str).unwrap_or(query);
            let hits = self.api.search(first, self.config.ranker.max_results).await;
            if !hits.is_empty() {
                raw = hits
                    .into_iter()
                    .map(|hit| {
                        let domain = url_domain(&hit.url);
                        RawResult {
                            url: hit.url,
                            title: hit.title,
                            snippet: hit.snippet.clone(),
                            content: hit.snippet,
                            domain,
                            crawled_at: Utc::now(),
                            success: true,
                            links: Vec::new(),
                            metadata: Default::default(),
                        }
                    })
                    .collect();
                origin = ResultOrigin::Api;
            }
        }
        let crawled = raw.len();

        // Step 6: rank and select.
        let ranked = self.ranker.rank(&raw, query);
        let ranked_count = ranked.len();
        let top = self.ranker.get_top(ranked);

        // Step 7: evidence, when asked for.
        let facts = if want_facts {
            Some(self.evidence.extract(&top, query, query_type).await)
        } else {
            None
        };

        // Step 8: cache only non-empty outcomes.
        if !top.is_empty() {
            let raw_top: Vec<RawResult> = top.iter().map(|r| r.result.clone()).collect();
            self.cache.put(query, raw_top, None, origin).await;
        }

        // Step 9: the external attempt counts against the user's budget.
        if let Some(user_id) = user_id {
            self.policy.record_search(user_id);
        }

        // Step 10: outcome log.
        self.log(SearchLogEntry {
            query: query.to_string(),
            user_id: user_id.map(String::from),
            timestamp: Utc::now(),
            intent: decision.intent,
            score: decision.score,
            action: LogAction::SearchComplete,
            source: Some(origin),
            result_count: top.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        });

        let formatted = if top.is_empty() {
            self.ranker.no_results_response(query, language)
        } else {
            self.ranker.format_response(&top, language)
        };

        SearchResponse {
            success: !top.is_empty(),
            query: query.to_string(),
            results: top,
            formatted,
            source: origin,
            score: decision.score,
            intent: decision.intent,
            metadata: ResponseMeta {
                reason: None,
                cache_hit: false,
                queries_generated: generated.len(),
                crawled,
                ranked: ranked_count,
                duration_ms: started.elapsed().as_millis() as u64,
            },
            facts,
        }
    }

    // ── Auxiliary operations ─────────────────────────────────────────────────

    /// Crawl one specific URL and summarise it.
    pub async fn fetch_url(&self, url: &str, user_id: Option<&str>) -> UrlSummary {
        let summary = self.crawler.fetch_and_summarize(url).await;
        self.log(SearchLogEntry {
            query: url.to_string(),
            user_id: user_id.map(String::from),
            timestamp: Utc::now(),
            intent: SearchIntent::UrlFetch,
            score: 0.0,
            action: LogAction::UrlFetch,
            source: Some(ResultOrigin::Crawler),
            result_count: usize::from(summary.success),
            duration_ms: 0,
        });
        summary
    }

    // ── Admin operations ─────────────────────────────────────────────────────

    pub fn add_trusted_source(
        &self,
        domain: &str,
        display_name: &str,
        source_type: SourceType,
        priority: u8,
        categories: &[&str],
    ) -> bool {
        self.registry.add_source(TrustedSource::new(
            domain,
            source_type,
            display_name,
            priority.clamp(1, 10),
            categories,
        ))
    }

    pub fn block_domain(&self, domain: &str, reason: &str) {
        self.registry.block_domain(domain, reason);
    }

    pub fn list_sources(&self) -> Vec<TrustedSource> {
        self.registry.all_sources()
    }

    pub fn registry_stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    pub async fn cache_status(&self) -> CacheStatus {
        self.cache.status().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear_all().await;
    }

    pub async fn cleanup_cache(&self) -> usize {
        self.cache.cleanup_expired().await
    }

    /// Most recent `limit` outcome records, newest last.
    pub fn recent_logs(&self, limit: usize) -> Vec<SearchLogEntry> {
        let logs = self.logs.lock().expect("log lock poisoned");
        logs.iter()
            .rev()
            .take(limit)
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }

    pub fn enable_search_api(
        &self,
        provider: &str,
        api_key: &str,
        google_cx: Option<&str>,
        daily_limit: u32,
    ) -> bool {
        self.api.enable(provider, api_key, google_cx, daily_limit)
    }

    pub fn disable_search_api(&self) {
        self.api.disable();
    }

    pub fn api_status(&self) -> ApiStatus {
        self.api.status()
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn empty_response(&self, query: &str, language: Language, reason: &str) -> SearchResponse {
        SearchResponse {
            success: false,
            query: query.to_string(),
            results: Vec::new(),
            formatted: match language {
                Language::Hindi => "कृपया अपना सवाल स्पष्ट रूप से पूछें।".to_string(),
                Language::English => "Please ask your question clearly.".to_string(),
            },
            source: ResultOrigin::None,
            score: 0.0,
            intent: SearchIntent::Unknown,
            metadata: ResponseMeta {
                reason: Some(reason.to_string()),
                ..Default::default()
            },
            facts: None,
        }
    }

    fn suppressed_response(&self, decision: &PolicyDecision, language: Language) -> String {
        if decision.rate_limited {
            return format!("⚠️ {}", decision.reason);
        }
        match (decision.intent, language) {
            (SearchIntent::Greeting, Language::Hindi) => {
                "नमस्ते! मैं आपका सहायक हूं। कैसे मदद कर सकता हूं?".to_string()
            }
            (SearchIntent::Greeting, Language::English) => {
                "Hello! I'm your sahayak. How can I help you?".to_string()
            }
            (SearchIntent::PersonalStatus, Language::Hindi) => {
                "आपके व्यक्तिगत डेटा के लिए, कृपया 'My Applications' या 'Profile' section देखें।".to_string()
            }
            (SearchIntent::PersonalStatus, Language::English) => {
                "For your personal data, please check the 'My Applications' or 'Profile' section.".to_string()
            }
            (SearchIntent::Blocked, Language::Hindi) => {
                "यह जानकारी प्रदान करना संभव नहीं है।".to_string()
            }
            (SearchIntent::Blocked, Language::English) => {
                "I cannot provide this information.".to_string()
            }
            (_, Language::Hindi) => "कृपया अपना सवाल स्पष्ट रूप से पूछें।".to_string(),
            (_, Language::English) => "Please ask your question clearly.".to_string(),
        }
    }

    fn log(&self, entry: SearchLogEntry) {
        if let Some(ref store) = self.store {
            if let Err(err) = store.append_log(&entry) {
                warn!(error = %err, "failed to persist search log");
            }
        }

        let mut logs = self.logs.lock().expect("log lock poisoned");
        logs.push_back(entry);
        if logs.len() > MAX_LOG_ENTRIES {
            let excess = logs.len() - TRIMMED_LOG_ENTRIES;
            logs.drain(..excess);
        }
    }
}

fn url_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn engine() -> (tempfile::TempDir, SearchEngine) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SearchConfig::default();
        config.cache.cache_dir = dir.path().join("cache").display().to_string();
        let engine = SearchEngine::new(config).unwrap();
        (dir, engine)
    }

    fn official_result(url: &str, title: &str, content: &str) -> RawResult {
        RawResult {
            url: url.to_string(),
            title: title.to_string(),
            snippet: content.chars().take(150).collect(),
            content: content.to_string(),
            domain: url_domain(url),
            crawled_at: Utc::now(),
            success: true,
            links: Vec::new(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn greeting_suppresses_search() {
        let (_dir, engine) = engine();
        let response = engine.ask("namaste", Some("u1"), Language::Hindi).await;

        assert!(!response.success);
        assert_eq!(response.source, ResultOrigin::None);
        assert_eq!(response.intent, SearchIntent::Greeting);
        assert!(response.formatted.contains("नमस्ते"));
        assert!(response.results.is_empty());

        let logs = engine.recent_logs(10);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, LogAction::Suppressed);
    }

    #[tokio::test]
    async fn empty_query_is_malformed() {
        let (_dir, engine) = engine();
        let response = engine.ask("   ", None, Language::English).await;
        assert!(!response.success);
        assert_eq!(response.metadata.reason.as_deref(), Some("empty query"));
        assert_eq!(response.intent, SearchIntent::Unknown);
    }

    #[tokio::test]
    async fn blocked_query_does_no_external_work() {
        let (_dir, engine) = engine();
        let response = engine
            .ask("account hack kaise kare", None, Language::English)
            .await;
        assert!(!response.success);
        assert_eq!(response.intent, SearchIntent::Blocked);
        assert_eq!(response.source, ResultOrigin::None);
        assert!(response.formatted.contains("cannot provide"));
    }

    #[tokio::test]
    async fn cache_hit_skips_the_crawler() {
        let (_dir, engine) = engine();
        let query = "ssc cgl 2026 notification";
        let content = "SSC CGL 2026 notification released, apply online, official last date announced";
        engine
            .cache
            .put(
                query,
                vec![official_result("https://ssc.nic.in/cgl", "SSC CGL 2026 Notification", content)],
                None,
                ResultOrigin::Crawler,
            )
            .await;

        let response = engine.ask(query, Some("u1"), Language::English).await;
        assert!(response.success);
        assert_eq!(response.source, ResultOrigin::Cache);
        assert!(response.metadata.cache_hit);
        assert_eq!(response.results[0].result.domain, "ssc.nic.in");

        // Cache hits do not count against the rate budget.
        assert!(engine.policy.check_rate_limit("u1").is_ok());
        let logs = engine.recent_logs(1);
        assert_eq!(logs[0].action, LogAction::CacheHit);
    }

    #[tokio::test]
    async fn cached_results_are_reranked_with_current_weights() {
        let (_dir, engine) = engine();
        let query = "ssc cgl 2026 notification";
        let body = "SSC CGL 2026 notification released, apply online, official last date announced";
        engine
            .cache
            .put(
                query,
                vec![
                    official_result("https://sarkariresult.com/cgl", "SSC CGL 2026 Notification", body),
                    official_result("https://ssc.nic.in/cgl", "SSC CGL 2026 Notification", body),
                ],
                None,
                ResultOrigin::Crawler,
            )
            .await;

        let response = engine.ask(query, None, Language::English).await;
        assert!(response.success);
        // Trust re-ranking puts the official source first regardless of
        // stored order.
        assert_eq!(response.results[0].result.domain, "ssc.nic.in");
    }

    #[tokio::test]
    async fn rate_limit_trips_on_the_sixth_burst_call() {
        let (_dir, engine) = engine();
        // A fetch-intent query for a blocked domain clears the policy
        // threshold but produces zero crawl traffic and zero results.
        let query = "check https://fakesite.com/jobs abhi";

        for _ in 0..5 {
            let response = engine.ask(query, Some("u9"), Language::English).await;
            assert!(!response.metadata.cache_hit);
            assert!(!response.success);
        }

        let sixth = engine.ask(query, Some("u9"), Language::English).await;
        assert!(!sixth.success);
        assert_eq!(sixth.intent, SearchIntent::UrlFetch);
        let logs = engine.recent_logs(1);
        assert_eq!(logs[0].action, LogAction::RateLimited);
        assert!(sixth.formatted.contains("⚠️"));

        // Nothing was cached along the way.
        assert_eq!(engine.cache_status().await.memory_entries, 0);
    }

    #[tokio::test]
    async fn fetch_url_refuses_blocked_domains() {
        let (_dir, engine) = engine();
        let summary = engine.fetch_url("https://fakesite.com/x", Some("u1")).await;
        assert!(!summary.success);
        assert_eq!(summary.error.as_deref(), Some("blocked_domain"));

        let logs = engine.recent_logs(1);
        assert_eq!(logs[0].action, LogAction::UrlFetch);
    }

    #[tokio::test]
    async fn admin_surface_round_trips() {
        let (_dir, engine) = engine();

        assert!(engine.add_trusted_source(
            "jharkhand.gov.in",
            "Jharkhand Government",
            SourceType::Official,
            9,
            &["state", "job"],
        ));
        assert!(engine.list_sources().iter().any(|s| s.domain == "jharkhand.gov.in"));

        engine.block_domain("badjobs.com", "spam");
        assert!(!engine.add_trusted_source("badjobs.com", "Bad", SourceType::Aggregator, 3, &[]));

        let stats = engine.registry_stats();
        assert!(stats.blocked_domains >= 4);

        assert!(!engine.api_status().enabled);
        assert!(engine.enable_search_api("serpapi", "key", None, 10));
        assert!(engine.api_status().enabled);
        engine.disable_search_api();
        assert!(!engine.api_status().enabled);

        let status = engine.cache_status().await;
        assert_eq!(status.memory_entries, 0);
    }

    #[tokio::test]
    async fn log_ring_stays_bounded() {
        let (_dir, engine) = engine();
        for i in 0..(MAX_LOG_ENTRIES + 10) {
            engine.log(SearchLogEntry {
                query: format!("q{i}"),
                user_id: None,
                timestamp: Utc::now(),
                intent: SearchIntent::GeneralInfo,
                score: 0.5,
                action: LogAction::SearchComplete,
                source: Some(ResultOrigin::Crawler),
                result_count: 0,
                duration_ms: 1,
            });
        }
        let logs = engine.recent_logs(MAX_LOG_ENTRIES * 2);
        assert!(logs.len() <= MAX_LOG_ENTRIES);
        // The newest entry survives trimming.
        assert_eq!(logs.last().unwrap().query, format!("q{}", MAX_LOG_ENTRIES + 9));
    }

    #[tokio::test]
    async fn facts_ride_along_on_cache_hits_when_requested() {
        let (_dir, engine) = engine();
        let query = "ssc cgl 2026 notification";
        let content = "SSC CGL 2026 notification. Last date: 21/07/2026. Eligibility: Graduate degree holders. Fee Rs 100.";
        engine
            .cache
            .put(
                query,
                vec![official_result("https://ssc.nic.in/cgl", "SSC CGL 2026 Notification", content)],
                None,
                ResultOrigin::Crawler,
            )
            .await;

        let response = engine.ask_with_facts(query, None, Language::English).await;
        assert!(response.success);
        let facts = response.facts.expect("facts requested");
        assert_eq!(facts.last_date.as_deref(), Some("21/07/2026"));
        assert_eq!(facts.fees.total, Some(120.0));
        assert!(facts.is_valid());
    }
}
