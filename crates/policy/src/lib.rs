//! Policy engine: decides when external retrieval is worth it.
//!
//! Scoring model:
//! ```text
//! score = Σ trigger weights − conversational penalties
//!         + internal-index shortfall + intent bonus + state mention
//! ```
//! clamped to `[0, 1]`; scores at or above the configured threshold
//! (default 0.55) green-light the crawler.  Greetings, personal-data
//! requests and abusive queries short-circuit before scoring, and a
//! per-user sliding-window rate limit caps external searches at
//! 50/day and 5/minute.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration as StdDuration, Instant};

use sahayak_registry::TrustRegistry;
use sahayak_types::{CrawlPlan, PolicyDecision, QueryType, SearchIntent, SearchTier};
use tracing::debug;

mod rules;

use rules::{IntentRules, score_triggers};

const DAY: StdDuration = StdDuration::from_secs(24 * 60 * 60);
const MINUTE: StdDuration = StdDuration::from_secs(60);

/// Timestamps of a user's recent external searches, oldest first.
#[derive(Default)]
struct SearchWindow {
    searches: VecDeque<Instant>,
}

impl SearchWindow {
    fn prune(&mut self, now: Instant) {
        while let Some(&front) = self.searches.front() {
            if now.duration_since(front) > DAY {
                self.searches.pop_front();
            } else {
                break;
            }
        }
    }

    fn daily_count(&self) -> usize {
        self.searches.len()
    }

    fn minute_count(&self, now: Instant) -> usize {
        self.searches
            .iter()
            .rev()
            .take_while(|&&t| now.duration_since(t) <= MINUTE)
            .count()
    }
}

pub struct PolicyEngine {
    registry: Arc<TrustRegistry>,
    rules: IntentRules,
    triggers: Vec<(regex::Regex, f64)>,
    threshold: f64,
    daily_limit: usize,
    minute_limit: usize,
    windows: Mutex<HashMap<String, SearchWindow>>,
}

impl PolicyEngine {
    pub fn new(
        registry: Arc<TrustRegistry>,
        threshold: f64,
        daily_limit: usize,
        minute_limit: usize,
    ) -> Self {
        Self {
            registry,
            rules: IntentRules::new(),
            triggers: score_triggers(),
            threshold,
            daily_limit,
            minute_limit,
            windows: Mutex::new(HashMap::new()),
        }
    }

    // ── Intent detection ─────────────────────────────────────────────────────

    /// Ordered first-match-wins classification.
    pub fn detect_intent(&self, query: &str) -> SearchIntent {
        let query = query.trim().to_lowercase();

        if self.rules.blocked.iter().any(|p| p.is_match(&query)) {
            return SearchIntent::Blocked;
        }
        if self.rules.greeting.iter().any(|p| p.is_match(&query)) {
            return SearchIntent::Greeting;
        }
        if self.rules.personal_status.iter().any(|p| p.is_match(&query)) {
            return SearchIntent::PersonalStatus;
        }
        if self.rules.url.is_match(&query) && self.rules.has_fetch_verb(&query) {
            return SearchIntent::UrlFetch;
        }
        if self.rules.result.is_match(&query) {
            return SearchIntent::ResultQuery;
        }
        if self.rules.job_keywords.is_match(&query) {
            return SearchIntent::JobQuery;
        }
        if self.rules.scheme_keywords.is_match(&query) {
            return SearchIntent::SchemeQuery;
        }
        if self.rules.date.is_match(&query) {
            return SearchIntent::DateQuery;
        }
        if self.rules.document.is_match(&query) {
            return SearchIntent::DocumentQuery;
        }

        if query.split_whitespace().count() >= 3 {
            SearchIntent::GeneralInfo
        } else {
            SearchIntent::Unknown
        }
    }

    // ── Scoring ──────────────────────────────────────────────────────────────

    /// Search score in `[0, 1]` for a query with a known intent and the
    /// number of hits the internal index already produced.
    pub fn search_score(
        &self,
        query: &str,
        intent: SearchIntent,
        internal_hits: usize,
    ) -> f64 {
        let query = query.to_lowercase();
        let mut score: f64 = 0.0;

        match intent {
            SearchIntent::Greeting => score -= 0.40,
            SearchIntent::SmallTalk => score -= 0.35,
            SearchIntent::PersonalStatus => score -= 0.30,
            SearchIntent::Blocked => score -= 1.0,
            _ => {}
        }

        for (pattern, weight) in &self.triggers {
            if pattern.is_match(&query) {
                score += weight;
            }
        }

        if internal_hits == 0 {
            score += 0.20;
        } else if internal_hits < 3 {
            score += 0.10;
        }

        match intent {
            SearchIntent::JobQuery
            | SearchIntent::SchemeQuery
            | SearchIntent::ResultQuery
            | SearchIntent::DateQuery => score += 0.15,
            SearchIntent::UrlFetch => score += 0.30,
            _ => {}
        }

        if self.rules.state.is_match(&query) {
            score += 0.05;
        }

        score.clamp(0.0, 1.0)
    }

    // ── Rate limiting ────────────────────────────────────────────────────────

    /// `Err(reason)` when the user has exhausted either sliding window.
    pub fn check_rate_limit(&self, user_id: &str) -> Result<(), String> {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limit lock poisoned");
        let window = windows.entry(user_id.to_string()).or_default();
        window.prune(now);

        if window.daily_count() >= self.daily_limit {
            return Err("Daily search limit reached. Try again tomorrow.".to_string());
        }
        if window.minute_count(now) >= self.minute_limit {
            return Err("Too many searches. Please wait a moment.".to_string());
        }
        Ok(())
    }

    /// Count one external search against the user.  Called only after a
    /// successful external retrieval; cache hits never reach here.
    pub fn record_search(&self, user_id: &str) {
        let mut windows = self.windows.lock().expect("rate limit lock poisoned");
        windows
            .entry(user_id.to_string())
            .or_default()
            .searches
            .push_back(Instant::now());
    }

    // ── Evaluation ───────────────────────────────────────────────────────────

    pub fn evaluate(
        &self,
        query: &str,
        user_id: Option<&str>,
        internal_hits: usize,
    ) -> PolicyDecision {
        let intent = self.detect_intent(query);

        match intent {
            SearchIntent::Blocked => {
                return PolicyDecision {
                    should_search: false,
                    score: 0.0,
                    intent,
                    search_tier: SearchTier::None,
                    reason: "Query blocked by safety policy".to_string(),
                    rate_limited: false,
                };
            }
            SearchIntent::Greeting | SearchIntent::SmallTalk => {
                return PolicyDecision {
                    should_search: false,
                    score: 0.0,
                    intent,
                    search_tier: SearchTier::None,
                    reason: "Conversational query - no search needed".to_string(),
                    rate_limited: false,
                };
            }
            SearchIntent::PersonalStatus => {
                return PolicyDecision {
                    should_search: false,
                    score: 0.0,
                    intent,
                    search_tier: SearchTier::InternalOnly,
                    reason: "Personal data query - internal records only".to_string(),
                    rate_limited: false,
                };
            }
            _ => {}
        }

        if let Some(user_id) = user_id {
            if let Err(reason) = self.check_rate_limit(user_id) {
                return PolicyDecision {
                    should_search: false,
                    score: 0.0,
                    intent,
                    search_tier: SearchTier::None,
                    reason,
                    rate_limited: true,
                };
            }
        }

        let score = self.search_score(query, intent, internal_hits);
        let should_search = score >= self.threshold;
        debug!(score, ?intent, should_search, "policy evaluated");

        PolicyDecision {
            should_search,
            score,
            intent,
            search_tier: if should_search {
                SearchTier::Crawler
            } else {
                SearchTier::InternalOnly
            },
            reason: if should_search {
                format!("Search triggered (score: {score:.2})")
            } else {
                format!("Internal search only (score: {score:.2})")
            },
            rate_limited: false,
        }
    }

    // ── Crawl planning ───────────────────────────────────────────────────────

    /// Query type used for query generation and domain selection.
    pub fn query_type_for_intent(&self, intent: SearchIntent) -> Option<QueryType> {
        match intent {
            SearchIntent::JobQuery => Some(QueryType::Job),
            SearchIntent::SchemeQuery => Some(QueryType::Scheme),
            SearchIntent::ResultQuery => Some(QueryType::Result),
            SearchIntent::DateQuery | SearchIntent::DocumentQuery => Some(QueryType::General),
            _ => None,
        }
    }

    /// Build the crawl plan for a green-lit decision.  Domain whitelists
    /// come from the trust registry for the intent's query type.
    pub fn choose_plan(&self, intent: SearchIntent, query: &str) -> CrawlPlan {
        let mut plan = CrawlPlan::default();

        match intent {
            SearchIntent::JobQuery => {
                plan.domains = self.registry.domains_for_query_type(QueryType::Job);
                plan.max_pages = 8;
            }
            SearchIntent::SchemeQuery => {
                plan.domains = self.registry.domains_for_query_type(QueryType::Scheme);
                plan.max_pages = 6;
            }
            SearchIntent::ResultQuery => {
                plan.domains = self.registry.domains_for_query_type(QueryType::Result);
                plan.max_pages = 10;
                plan.timeout = StdDuration::from_secs(15);
            }
            SearchIntent::UrlFetch => {
                // Match against the raw query: URL paths are case-sensitive.
                plan.specific_url = self.rules.url.find(query).map(|m| m.as_str().to_string());
                plan.max_pages = 1;
            }
            _ => {
                plan.domains = self.registry.domains_for_query_type(QueryType::General);
            }
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PolicyEngine {
        PolicyEngine::new(Arc::new(TrustRegistry::new()), 0.55, 50, 5)
    }

    #[test]
    fn greeting_is_detected_and_suppresses_search() {
        let policy = engine();
        assert_eq!(policy.detect_intent("namaste"), SearchIntent::Greeting);
        assert_eq!(policy.detect_intent("good morning!"), SearchIntent::Greeting);

        let decision = policy.evaluate("namaste", Some("u1"), 0);
        assert!(!decision.should_search);
        assert_eq!(decision.intent, SearchIntent::Greeting);
        assert_eq!(decision.search_tier, SearchTier::None);
        assert!(decision.score <= 0.0 + f64::EPSILON);
    }

    #[test]
    fn abusive_query_is_blocked_before_any_work() {
        let policy = engine();
        let decision = policy.evaluate("otp bypass kaise kare", None, 0);
        assert_eq!(decision.intent, SearchIntent::Blocked);
        assert!(!decision.should_search);
        assert_eq!(decision.search_tier, SearchTier::None);
    }

    #[test]
    fn personal_status_routes_internal_only() {
        let policy = engine();
        let decision = policy.evaluate("mera application status dikhao", None, 0);
        assert_eq!(decision.intent, SearchIntent::PersonalStatus);
        assert_eq!(decision.search_tier, SearchTier::InternalOnly);
        assert!(!decision.should_search);
    }

    #[test]
    fn url_with_fetch_verb_is_url_fetch() {
        let policy = engine();
        let intent = policy.detect_intent("check https://ssc.nic.in/notice please");
        assert_eq!(intent, SearchIntent::UrlFetch);

        let plan = policy.choose_plan(intent, "check https://ssc.nic.in/notice please");
        assert_eq!(plan.specific_url.as_deref(), Some("https://ssc.nic.in/notice"));
        assert_eq!(plan.max_pages, 1);
    }

    #[test]
    fn intent_order_prefers_result_over_job() {
        let policy = engine();
        // Contains both a job keyword (ssc) and a result cue; result wins.
        assert_eq!(
            policy.detect_intent("ssc cgl result kab aayega"),
            SearchIntent::ResultQuery
        );
        assert_eq!(
            policy.detect_intent("ssc cgl 2026 notification"),
            SearchIntent::JobQuery
        );
        assert_eq!(
            policy.detect_intent("pm kisan yojana eligibility"),
            SearchIntent::SchemeQuery
        );
    }

    #[test]
    fn short_unmatched_query_is_unknown() {
        let policy = engine();
        assert_eq!(policy.detect_intent("acha theek"), SearchIntent::Unknown);
        assert_eq!(
            policy.detect_intent("tell me something interesting today"),
            SearchIntent::GeneralInfo
        );
    }

    #[test]
    fn score_is_always_clamped() {
        let policy = engine();
        for query in [
            "",
            "namaste",
            "latest ssc cgl 2026 result last date notification apply link kab",
            "otp bypass",
        ] {
            let intent = policy.detect_intent(query);
            let score = policy.search_score(query, intent, 0);
            assert!((0.0..=1.0).contains(&score), "score {score} for {query:?}");
        }
    }

    #[test]
    fn fresh_job_query_clears_threshold() {
        let policy = engine();
        let intent = policy.detect_intent("ssc cgl 2026 notification");
        let score = policy.search_score("ssc cgl 2026 notification", intent, 0);
        assert!(score >= 0.55, "score was {score}");
    }

    #[test]
    fn scheme_eligibility_query_clears_threshold_on_empty_index() {
        let policy = engine();
        let query = "pm kisan yojana eligibility";
        let intent = policy.detect_intent(query);
        let score = policy.search_score(query, intent, 0);
        assert!(score >= 0.55, "score was {score}");

        // With plenty of internal results the same query stays internal.
        let throttled = policy.search_score(query, intent, 10);
        assert!(throttled < 0.55, "score was {throttled}");
    }

    #[test]
    fn minute_window_limits_bursts() {
        let policy = PolicyEngine::new(Arc::new(TrustRegistry::new()), 0.55, 50, 5);
        for _ in 0..5 {
            assert!(policy.check_rate_limit("u1").is_ok());
            policy.record_search("u1");
        }
        let err = policy.check_rate_limit("u1").unwrap_err();
        assert!(err.contains("wait"), "unexpected reason: {err}");

        // A different user is unaffected.
        assert!(policy.check_rate_limit("u2").is_ok());
    }

    #[test]
    fn daily_window_limits_totals() {
        let policy = PolicyEngine::new(Arc::new(TrustRegistry::new()), 0.55, 3, 100);
        for _ in 0..3 {
            policy.record_search("u1");
        }
        let err = policy.check_rate_limit("u1").unwrap_err();
        assert!(err.contains("Daily"), "unexpected reason: {err}");

        let decision = policy.evaluate("ssc cgl 2026 notification", Some("u1"), 0);
        assert!(decision.rate_limited);
        assert!(!decision.should_search);
    }

    #[test]
    fn result_plan_widens_page_budget_and_timeout() {
        let policy = engine();
        let plan = policy.choose_plan(SearchIntent::ResultQuery, "ssc cgl result 2026");
        assert_eq!(plan.max_pages, 10);
        assert_eq!(plan.timeout, StdDuration::from_secs(15));
        assert!(!plan.domains.is_empty());

        let job_plan = policy.choose_plan(SearchIntent::JobQuery, "ssc cgl vacancy");
        assert_eq!(job_plan.max_pages, 8);
        assert!(job_plan.domains.contains(&"ssc.nic.in".to_string()));
    }
}
