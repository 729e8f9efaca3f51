//! Shared record types exchanged between the search pipeline stages.
//!
//! Every stage boundary (policy → query generation → crawl → rank →
//! evidence) passes one of these named records.  Serialisation to the
//! persistence layer uses the same serde projections.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Language & intent ────────────────────────────────────────────────────────

/// Response language requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(rename = "hi")]
    Hindi,
    #[serde(rename = "en")]
    English,
}

impl Default for Language {
    fn default() -> Self {
        Language::Hindi
    }
}

/// Classification of what the user is asking for.
///
/// Detection rules are ordered; the first matching rule wins (see the
/// policy engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchIntent {
    Greeting,
    SmallTalk,
    PersonalStatus,
    JobQuery,
    SchemeQuery,
    ResultQuery,
    DateQuery,
    DocumentQuery,
    GeneralInfo,
    UrlFetch,
    Blocked,
    Unknown,
}

impl SearchIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchIntent::Greeting => "greeting",
            SearchIntent::SmallTalk => "small_talk",
            SearchIntent::PersonalStatus => "personal_status",
            SearchIntent::JobQuery => "job_query",
            SearchIntent::SchemeQuery => "scheme_query",
            SearchIntent::ResultQuery => "result_query",
            SearchIntent::DateQuery => "date_query",
            SearchIntent::DocumentQuery => "document_query",
            SearchIntent::GeneralInfo => "general_info",
            SearchIntent::UrlFetch => "url_fetch",
            SearchIntent::Blocked => "blocked",
            SearchIntent::Unknown => "unknown",
        }
    }
}

/// Which retrieval backend the policy engine green-lit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTier {
    None,
    InternalOnly,
    Crawler,
    Api,
}

/// Per-request decision produced by the policy engine.  Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub should_search: bool,
    /// Search score in `[0, 1]`; values at or above the configured
    /// threshold trigger external retrieval.
    pub score: f64,
    pub intent: SearchIntent,
    pub search_tier: SearchTier,
    pub reason: String,
    pub rate_limited: bool,
}

// ── Query generation ─────────────────────────────────────────────────────────

/// Kind of information the query is after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Job,
    Scheme,
    Result,
    AdmitCard,
    Cutoff,
    Syllabus,
    General,
}

/// Language/scoping variant of a generated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryVariant {
    Hindi,
    English,
    /// Scoped to official portals via a `site:gov.in` prefix.
    OfficialSitesOnly,
    Mixed,
}

/// One optimised retrieval query emitted by the query generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub text: String,
    pub variant: QueryVariant,
    pub query_type: QueryType,
    /// 1 is highest; the cleaned original query always carries 4.
    pub priority: u8,
}

// ── Trusted sources ──────────────────────────────────────────────────────────

/// Trust level of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Government sites (`.gov.in`, `.nic.in`) — highest trust.
    Official,
    SemiOfficial,
    Educational,
    Aggregator,
    News,
    Blocked,
    /// Domain not present in the registry and matching no known suffix.
    Unknown,
}

/// A registered source domain with its crawl parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedSource {
    /// Normalised domain: lowercase, no leading `www.`.
    pub domain: String,
    pub source_type: SourceType,
    pub display_name: String,
    /// 1–10, higher is better.
    pub priority: u8,
    pub enabled: bool,
    /// Politeness budget in requests per second.
    pub rate_limit: f64,
    pub categories: Vec<String>,
    pub last_crawled: Option<DateTime<Utc>>,
    /// EWMA of crawl outcomes, factors 0.9 (history) / 0.1 (latest).
    pub success_rate: f64,
}

impl TrustedSource {
    pub fn new(
        domain: impl Into<String>,
        source_type: SourceType,
        display_name: impl Into<String>,
        priority: u8,
        categories: &[&str],
    ) -> Self {
        Self {
            domain: domain.into(),
            source_type,
            display_name: display_name.into(),
            priority,
            enabled: true,
            rate_limit: 1.0,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            last_crawled: None,
            success_rate: 1.0,
        }
    }
}

// ── Crawl records ────────────────────────────────────────────────────────────

/// A `{title, url, snippet}` record from a discovery backend (free web
/// search or a paid API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Per-request crawler configuration chosen by the policy engine.
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    /// Preferred domains for this query type; results from these bubble up.
    pub domains: Vec<String>,
    pub max_pages: usize,
    pub timeout: Duration,
    pub prefer_official: bool,
    /// When set, the crawler fetches exactly this URL and nothing else.
    pub specific_url: Option<String>,
}

impl Default for CrawlPlan {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            max_pages: 5,
            timeout: Duration::from_secs(10),
            prefer_official: true,
            specific_url: None,
        }
    }
}

/// Raw output of fetching a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// Extracted page text, truncated to 10,000 characters.
    pub content: String,
    pub domain: String,
    pub crawled_at: DateTime<Utc>,
    pub success: bool,
    /// Action links found on the page (apply/download/result/…), at most 10.
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RawResult {
    /// A failed fetch carrying an error marker in `metadata.error`.
    pub fn failure(url: impl Into<String>, domain: impl Into<String>, error: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("error".to_string(), error.into());
        Self {
            url: url.into(),
            title: String::new(),
            snippet: String::new(),
            content: String::new(),
            domain: domain.into(),
            crawled_at: Utc::now(),
            success: false,
            links: Vec::new(),
            metadata,
        }
    }
}

// ── Ranking ──────────────────────────────────────────────────────────────────

/// Signal breakdown behind a ranked result's total score, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResultScores {
    pub relevance: f64,
    pub trust: f64,
    pub freshness: f64,
    pub title_match: f64,
    pub total: f64,
}

/// A raw result plus its fused ranking scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    #[serde(flatten)]
    pub result: RawResult,
    pub scores: ResultScores,
    pub source_type: SourceType,
}

// ── Extracted facts ──────────────────────────────────────────────────────────

/// Minimum/maximum age bounds detected in eligibility text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeLimit {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

/// Application fee breakdown.  Any detected government fee is augmented
/// with the fixed platform service fee and summed into `total`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeDetails {
    pub govt_fee: Option<f64>,
    pub service_fee: f64,
    pub total: Option<f64>,
    #[serde(default)]
    pub category_wise: HashMap<String, f64>,
}

/// Structured extraction from ranked results, suitable for templated
/// rendering downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facts {
    pub fact_type: QueryType,
    pub title: String,
    pub state: Option<String>,
    pub department: Option<String>,
    pub last_date: Option<String>,
    pub start_date: Option<String>,
    pub exam_date: Option<String>,
    pub eligibility: Vec<String>,
    pub age_limit: Option<AgeLimit>,
    pub qualifications: Vec<String>,
    pub vacancies: Option<u32>,
    pub documents: Vec<String>,
    pub fees: FeeDetails,
    pub links: Vec<String>,
    pub pdf_links: Vec<String>,
    pub source_url: String,
    pub source_trust: f64,
    pub confidence: f64,
}

impl Facts {
    pub fn empty(fact_type: QueryType) -> Self {
        Self {
            fact_type,
            title: String::new(),
            state: None,
            department: None,
            last_date: None,
            start_date: None,
            exam_date: None,
            eligibility: Vec::new(),
            age_limit: None,
            qualifications: Vec::new(),
            vacancies: None,
            documents: Vec::new(),
            fees: FeeDetails::default(),
            links: Vec::new(),
            pdf_links: Vec::new(),
            source_url: String::new(),
            source_trust: 0.0,
            confidence: 0.0,
        }
    }

    /// A record is usable for rendering only with a title plus at least one
    /// of: a last date, links, or eligibility lines.
    pub fn is_valid(&self) -> bool {
        !self.title.is_empty()
            && (self.last_date.is_some() || !self.links.is_empty() || !self.eligibility.is_empty())
    }
}

// ── Responses & logs ─────────────────────────────────────────────────────────

/// Where a response's results ultimately came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultOrigin {
    Cache,
    Crawler,
    Api,
    Internal,
    None,
}

/// Pipeline accounting attached to every response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub reason: Option<String>,
    pub cache_hit: bool,
    pub queries_generated: usize,
    pub crawled: usize,
    pub ranked: usize,
    pub duration_ms: u64,
}

/// The single value returned to callers of `ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    pub results: Vec<RankedResult>,
    /// Rendered bilingual summary ready for display.
    pub formatted: String,
    pub source: ResultOrigin,
    pub score: f64,
    pub intent: SearchIntent,
    pub metadata: ResponseMeta,
    /// Populated only when the caller asked for structured facts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts: Option<Facts>,
}

/// What the orchestrator did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Suppressed,
    RateLimited,
    CacheHit,
    SearchComplete,
    UrlFetch,
    Error,
}

/// One outcome record, kept in a bounded in-memory ring and optionally
/// appended to the persistent store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchLogEntry {
    pub query: String,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub intent: SearchIntent,
    pub score: f64,
    pub action: LogAction,
    pub source: Option<ResultOrigin>,
    pub result_count: usize,
    pub duration_ms: u64,
}

/// Output of the auxiliary `fetch_url` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlSummary {
    pub success: bool,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub key_points: Vec<String>,
    pub links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_serialises_to_short_codes() {
        assert_eq!(serde_json::to_string(&Language::Hindi).unwrap(), "\"hi\"");
        assert_eq!(serde_json::to_string(&Language::English).unwrap(), "\"en\"");
    }

    #[test]
    fn facts_validity_requires_title_and_substance() {
        let mut facts = Facts::empty(QueryType::Job);
        assert!(!facts.is_valid());

        facts.title = "SSC CGL 2026".to_string();
        assert!(!facts.is_valid(), "title alone is not enough");

        facts.last_date = Some("21/07/2026".to_string());
        assert!(facts.is_valid());

        facts.last_date = None;
        facts.links.push("https://ssc.nic.in".to_string());
        assert!(facts.is_valid());
    }

    #[test]
    fn ranked_result_flattens_raw_fields() {
        let raw = RawResult::failure("https://example.com/x", "example.com", "http_404");
        let ranked = RankedResult {
            result: raw,
            scores: ResultScores::default(),
            source_type: SourceType::Unknown,
        };
        let json = serde_json::to_value(&ranked).unwrap();
        assert_eq!(json["url"], "https://example.com/x");
        assert_eq!(json["metadata"]["error"], "http_404");
        assert!(json["scores"]["total"].is_number());
    }

    #[test]
    fn raw_result_round_trips_through_json() {
        let mut raw = RawResult::failure("https://a.gov.in/b", "a.gov.in", "timeout");
        raw.links.push("https://a.gov.in/apply".to_string());
        let json = serde_json::to_string(&raw).unwrap();
        let back: RawResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.url, raw.url);
        assert_eq!(back.links, raw.links);
        assert_eq!(back.metadata.get("error"), raw.metadata.get("error"));
    }
}
