//! Politeness-aware concurrent fetcher.
//!
//! One long-lived HTTP client, per-domain pacing driven by the trust
//! registry's rate limits, free DuckDuckGo discovery for URL resolution,
//! and profile-based HTML extraction.  Fetch failures never propagate:
//! every URL yields a [`RawResult`], failed ones carrying their error in
//! `metadata.error`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use regex::Regex;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use sahayak_registry::TrustRegistry;
use sahayak_types::{CrawlPlan, RawResult, UrlSummary, WebHit};
use tracing::{info, warn};
use url::Url;

mod discovery;
mod extract;

pub use discovery::search_web;
pub use extract::{Extracted, MAX_CONTENT_CHARS, extract_content};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Pause between successive fetches inside one crawl batch.
const INTER_REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Content cap for the `fetch_url` summary payload.
const SUMMARY_CONTENT_CHARS: usize = 3_000;

pub struct Crawler {
    client: reqwest::Client,
    registry: Arc<TrustRegistry>,
    /// Timestamp of the last outbound request per domain.
    last_request: Mutex<HashMap<String, Instant>>,
    default_rate: f64,
    key_point_patterns: Vec<Regex>,
}

impl Crawler {
    pub fn new(registry: Arc<TrustRegistry>, timeout: Duration, default_rate: f64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,hi;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        let key_point_patterns = [
            r"(?i)(?:last date|अंतिम तिथि)[:\s]*([^\n.]{10,100})",
            r"(?i)(?:eligibility|पात्रता)[:\s]*([^\n.]{10,150})",
            r"(?i)(?:salary|वेतन)[:\s]*([^\n.]{10,100})",
            r"(?i)(?:age limit|आयु सीमा)[:\s]*([^\n.]{10,100})",
            r"(?i)(?:apply|आवेदन)[:\s]*([^\n.]{10,100})",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("key point pattern"))
        .collect();

        Ok(Self {
            client,
            registry,
            last_request: Mutex::new(HashMap::new()),
            default_rate: if default_rate > 0.0 { default_rate } else { 1.0 },
            key_point_patterns,
        })
    }

    // ── Politeness ───────────────────────────────────────────────────────────

    /// Sleep long enough to respect the domain's requests-per-second
    /// budget, then stamp the outbound request.
    async fn politeness_gate(&self, domain: &str) {
        let rate = self
            .registry
            .get(domain)
            .map(|s| s.rate_limit)
            .unwrap_or(self.default_rate)
            .max(0.01);
        let min_interval = Duration::from_secs_f64(1.0 / rate);

        let wait = {
            let last = self.last_request.lock().expect("crawler lock poisoned");
            last.get(domain)
                .and_then(|prev| min_interval.checked_sub(prev.elapsed()))
                .unwrap_or(Duration::ZERO)
        };
        if wait > Duration::ZERO {
            tokio::time::sleep(wait).await;
        }

        self.last_request
            .lock()
            .expect("crawler lock poisoned")
            .insert(domain.to_string(), Instant::now());
    }

    // ── Single-URL fetch ─────────────────────────────────────────────────────

    /// Fetch one URL and extract its content.  Blocked domains are
    /// refused before any network traffic.
    pub async fn crawl_url(&self, url: &str, timeout: Option<Duration>) -> RawResult {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(url, error = %err, "unparseable url");
                return RawResult::failure(url, "", "invalid_url");
            }
        };
        let domain = parsed.host_str().unwrap_or_default().to_string();

        if self.registry.is_blocked(&domain) {
            warn!(%domain, "refusing blocked domain");
            return RawResult::failure(url, domain, "blocked_domain");
        }

        self.politeness_gate(&domain).await;

        let mut request = self.client.get(parsed.clone());
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(err) => {
                let kind = if err.is_timeout() {
                    "timeout".to_string()
                } else if err.is_connect() {
                    "connect_error".to_string()
                } else {
                    format!("request_error: {err}")
                };
                warn!(url, error = %err, "crawl failed");
                self.registry.update_crawl_stats(&domain, false);
                return RawResult::failure(url, domain, kind);
            }
        };

        let status = resp.status();
        if !status.is_success() {
            warn!(url, %status, "non-success response");
            self.registry.update_crawl_stats(&domain, false);
            return RawResult::failure(url, domain, format!("http_{}", status.as_u16()));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // PDFs are reported as downloadable, not parsed.
        if content_type.contains("application/pdf") {
            self.registry.update_crawl_stats(&domain, true);
            let mut metadata = HashMap::new();
            metadata.insert("is_pdf".to_string(), "true".to_string());
            metadata.insert("content_type".to_string(), "pdf".to_string());
            let title = parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or("document.pdf")
                .to_string();
            return RawResult {
                url: url.to_string(),
                title,
                snippet: "PDF file available for download".to_string(),
                content: "PDF document".to_string(),
                domain,
                crawled_at: Utc::now(),
                success: true,
                links: Vec::new(),
                metadata,
            };
        }

        let body = match resp.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!(url, error = %err, "body read failed");
                self.registry.update_crawl_stats(&domain, false);
                return RawResult::failure(url, domain, "body_read_error");
            }
        };

        // Html is !Send, keep the parse in a sync scope.
        let extracted = extract_content(&body, &parsed);
        self.registry.update_crawl_stats(&domain, true);

        RawResult {
            url: url.to_string(),
            title: extracted.title,
            snippet: extracted.snippet,
            content: extracted.content,
            domain,
            crawled_at: Utc::now(),
            success: true,
            links: extracted.links,
            metadata: extracted.metadata,
        }
    }

    // ── Search and crawl ─────────────────────────────────────────────────────

    /// Resolve queries to URLs via discovery, then fetch the top pages.
    ///
    /// Results come back preferred-domains-first, then by discovery
    /// position; failed fetches fall back to their search snippet so the
    /// pipeline can still rank them.
    pub async fn search_and_crawl(&self, queries: &[String], plan: &CrawlPlan) -> Vec<RawResult> {
        if let Some(ref specific) = plan.specific_url {
            let result = self.crawl_url(specific, Some(plan.timeout)).await;
            return if result.success { vec![result] } else { Vec::new() };
        }

        let mut hits: Vec<WebHit> = Vec::new();
        for query in queries.iter().take(3) {
            match search_web(&self.client, query, plan.max_pages).await {
                Ok(found) => hits.extend(found),
                Err(err) => warn!(query, error = %err, "discovery failed"),
            }
        }

        // Dedupe by URL, preserving discovery order.
        let mut seen = HashSet::new();
        hits.retain(|hit| !hit.url.is_empty() && seen.insert(hit.url.clone()));

        // Preferred domains bubble up ahead of the rest.
        if plan.prefer_official && !plan.domains.is_empty() {
            let (preferred, others): (Vec<WebHit>, Vec<WebHit>) = hits
                .into_iter()
                .partition(|hit| {
                    let domain = Url::parse(&hit.url)
                        .ok()
                        .and_then(|u| u.host_str().map(str::to_lowercase))
                        .unwrap_or_default();
                    plan.domains.iter().any(|pref| domain.contains(pref))
                });
            hits = preferred.into_iter().chain(others).collect();
        }

        let mut results = Vec::new();
        for hit in hits.into_iter().take(plan.max_pages) {
            let mut result = self.crawl_url(&hit.url, Some(plan.timeout)).await;
            if !result.success {
                // Keep the discovery snippet as degraded content.
                result.title = hit.title;
                result.snippet = hit.snippet.clone();
                result.content = hit.snippet;
            }
            results.push(result);
            tokio::time::sleep(INTER_REQUEST_DELAY).await;
        }

        info!(pages = results.len(), "crawl batch finished");
        results
    }

    /// Official-only sweep: `site:<domain>` discovery against each given
    /// domain, fetching up to `max_per_domain` pages from each.
    pub async fn crawl_domains(
        &self,
        query: &str,
        domains: &[String],
        max_per_domain: usize,
    ) -> Vec<RawResult> {
        let mut results = Vec::new();
        for domain in domains.iter().take(5) {
            let scoped = format!("site:{domain} {query}");
            let hits = match search_web(&self.client, &scoped, max_per_domain).await {
                Ok(hits) => hits,
                Err(err) => {
                    warn!(%domain, error = %err, "scoped discovery failed");
                    continue;
                }
            };
            for hit in hits {
                let result = self.crawl_url(&hit.url, None).await;
                if result.success {
                    results.push(result);
                }
                tokio::time::sleep(INTER_REQUEST_DELAY).await;
            }
        }
        results
    }

    // ── URL summarisation ────────────────────────────────────────────────────

    /// Fetch one URL and boil it down to a summary with labelled key
    /// points (last date, eligibility, salary, …).
    pub async fn fetch_and_summarize(&self, url: &str) -> UrlSummary {
        let result = self.crawl_url(url, None).await;

        if !result.success {
            let error = result
                .metadata
                .get("error")
                .cloned()
                .unwrap_or_else(|| "unknown error".to_string());
            return UrlSummary {
                success: false,
                url: url.to_string(),
                title: String::new(),
                summary: String::new(),
                content: String::new(),
                key_points: Vec::new(),
                links: Vec::new(),
                error: Some(error),
            };
        }

        let mut key_points = Vec::new();
        for pattern in &self.key_point_patterns {
            for caps in pattern.captures_iter(&result.content).take(2) {
                if let Some(m) = caps.get(1) {
                    key_points.push(m.as_str().trim().to_string());
                }
            }
            if key_points.len() >= 5 {
                break;
            }
        }
        key_points.truncate(5);

        UrlSummary {
            success: true,
            url: url.to_string(),
            title: result.title,
            summary: result.snippet,
            content: extract::truncate_chars(&result.content, SUMMARY_CONTENT_CHARS),
            key_points,
            links: result.links,
            error: None,
        }
    }
}
