//! Evidence extractor: turns ranked raw results into one structured
//! [`Facts`] record for templated rendering.
//!
//! Seeding works over the combined titles and snippets of the ranked set;
//! when key fields stay empty the extractor optionally fetches the full
//! content of the top one or two official results to fill the gaps.

use std::sync::Arc;

use regex::Regex;
use sahayak_crawler::Crawler;
use sahayak_types::{Facts, QueryType, RankedResult, SourceType};
use tracing::debug;

mod patterns;

pub use patterns::*;

/// Fixed platform service fee added on top of any detected government fee.
pub const SERVICE_FEE: f64 = 20.0;

/// How many official results may be fetched to fill seeding gaps.
const GAP_FILL_FETCHES: usize = 2;

pub struct EvidenceExtractor {
    crawler: Option<Arc<Crawler>>,
    result_cue: Regex,
    admit_cue: Regex,
    scheme_cue: Regex,
    job_cue: Regex,
}

impl EvidenceExtractor {
    pub fn new() -> Self {
        Self {
            crawler: None,
            result_cue: Regex::new(r"(result|रिजल्ट|परिणाम|merit)").expect("result cue"),
            admit_cue: Regex::new(r"(admit\s*card|एडमिट|hall\s*ticket)").expect("admit cue"),
            scheme_cue: Regex::new(r"(yojana|योजना|scheme)").expect("scheme cue"),
            job_cue: Regex::new(r"(vacancy|भर्ती|recruitment|job|नौकरी|bharti)").expect("job cue"),
        }
    }

    /// With gap-fill fetching enabled.
    pub fn with_crawler(crawler: Arc<Crawler>) -> Self {
        Self {
            crawler: Some(crawler),
            ..Self::new()
        }
    }

    /// Classify what kind of facts the query is after.
    pub fn detect_fact_type(&self, query: &str) -> QueryType {
        let query = query.to_lowercase();
        if self.admit_cue.is_match(&query) {
            QueryType::AdmitCard
        } else if self.result_cue.is_match(&query) {
            QueryType::Result
        } else if self.scheme_cue.is_match(&query) {
            QueryType::Scheme
        } else if self.job_cue.is_match(&query) {
            QueryType::Job
        } else {
            QueryType::General
        }
    }

    /// Build a [`Facts`] record from the ranked results.  `fact_type`
    /// overrides cue detection when the caller already classified the
    /// query.
    pub async fn extract(
        &self,
        ranked: &[RankedResult],
        query: &str,
        fact_type: Option<QueryType>,
    ) -> Facts {
        let fact_type = fact_type.unwrap_or_else(|| self.detect_fact_type(query));
        let mut facts = Facts::empty(fact_type);

        let Some(top) = ranked.first() else {
            return facts;
        };

        facts.title = top.result.title.clone();
        facts.source_url = top.result.url.clone();
        facts.source_trust = top.scores.trust;

        // Seed from combined titles and snippets.
        let seed_text = ranked
            .iter()
            .map(|r| format!("{} {}", r.result.title, r.result.snippet))
            .collect::<Vec<_>>()
            .join("\n");
        self.apply_patterns(&mut facts, &seed_text);

        // Collect action links from every result.
        let all_links: Vec<String> = ranked
            .iter()
            .flat_map(|r| r.result.links.iter().cloned())
            .chain(ranked.iter().map(|r| r.result.url.clone()))
            .collect();
        let (official, pdfs) = partition_links(&all_links);
        facts.links = official;
        facts.pdf_links = pdfs;

        // Fill gaps from the full content of the top official results.
        if facts.last_date.is_none() || facts.eligibility.is_empty() {
            let official_text = self.gap_fill_text(ranked).await;
            if !official_text.is_empty() {
                self.apply_patterns(&mut facts, &official_text);
            }
        }

        // Any government fee is paired with the fixed service fee.
        if let Some(govt) = facts.fees.govt_fee {
            facts.fees.service_fee = SERVICE_FEE;
            facts.fees.total = Some(govt + SERVICE_FEE);
        }

        facts.confidence = confidence(&facts);
        debug!(
            confidence = facts.confidence,
            valid = facts.is_valid(),
            "facts extracted"
        );
        facts
    }

    /// Run the full pattern catalogue over `text`, keeping existing
    /// values (the seed pass wins over gap-fill).
    fn apply_patterns(&self, facts: &mut Facts, text: &str) {
        if facts.last_date.is_none() {
            facts.last_date = extract_last_date(text);
        }
        if facts.start_date.is_none() {
            facts.start_date = extract_start_date(text);
        }
        if facts.exam_date.is_none() {
            facts.exam_date = extract_exam_date(text);
        }
        if facts.state.is_none() {
            facts.state = detect_state(text);
        }
        if facts.department.is_none() {
            facts.department = detect_department(text);
        }
        if facts.age_limit.is_none() {
            facts.age_limit = extract_age_limit(text);
        }
        if facts.vacancies.is_none() {
            facts.vacancies = extract_vacancies(text);
        }
        if facts.fees.govt_fee.is_none() {
            let (flat, category_wise) = extract_fees(text);
            facts.fees.govt_fee = flat;
            if facts.fees.category_wise.is_empty() {
                facts.fees.category_wise = category_wise;
            }
        }
        if facts.eligibility.is_empty() {
            facts.eligibility = extract_eligibility(text);
        }
        if facts.qualifications.is_empty() {
            facts.qualifications = extract_qualifications(text);
        }
        if facts.documents.is_empty() {
            facts.documents = extract_documents(text);
        }
    }

    /// Content of the top official/semi-official results.  Uses already
    /// crawled content when present, fetches otherwise (when a crawler
    /// was attached).
    async fn gap_fill_text(&self, ranked: &[RankedResult]) -> String {
        let mut chunks = Vec::new();
        let officials = ranked.iter().filter(|r| {
            matches!(
                r.source_type,
                SourceType::Official | SourceType::SemiOfficial
            )
        });

        for result in officials.take(GAP_FILL_FETCHES) {
            if !result.result.content.is_empty() {
                chunks.push(result.result.content.clone());
            } else if let Some(ref crawler) = self.crawler {
                let fetched = crawler.crawl_url(&result.result.url, None).await;
                if fetched.success {
                    chunks.push(fetched.content);
                }
            }
        }
        chunks.join("\n")
    }
}

impl Default for EvidenceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Weighted field-presence confidence, clamped to `[0, 1]`.
fn confidence(facts: &Facts) -> f64 {
    let mut score = 0.0;
    if !facts.title.is_empty() {
        score += 0.15;
    }
    score += 0.25 * facts.source_trust.clamp(0.0, 1.0);
    if facts.last_date.is_some() {
        score += 0.15;
    }
    if !facts.eligibility.is_empty() {
        score += 0.10;
    }
    if facts.fees.govt_fee.is_some() || !facts.fees.category_wise.is_empty() {
        score += 0.10;
    }
    if !facts.links.is_empty() {
        score += 0.15;
    }
    if facts.vacancies.is_some() {
        score += 0.05;
    }
    if !facts.documents.is_empty() {
        score += 0.05;
    }
    score.clamp(0.0, 1.0)
}
