//! Result ranker: fuses trust, relevance, freshness and title match into
//! one score per result.
//!
//! Scoring model (weights configurable, defaults shown):
//! ```text
//! total = relevance(0.40) + trust(0.35) + freshness(0.15) + title_match(0.10)
//! ```
//! Official government sources outrank aggregators at equal relevance.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use sahayak_config::RankerConfig;
use sahayak_registry::TrustRegistry;
use sahayak_types::{Language, RankedResult, RawResult, ResultScores, SourceType};
use tracing::{debug, trace};

/// Bilingual markers that boost relevance when present in a result.
const IMPORTANT_KEYWORDS: &[&str] = &[
    "official", "आधिकारिक", "notification", "नोटिफिकेशन", "apply", "आवेदन", "download",
    "डाउनलोड", "result", "रिजल्ट", "admit", "एडमिट", "last date", "अंतिम तिथि", "deadline",
];

/// Tokens that signal freshly-updated content.
const FRESHNESS_MARKERS: &[&str] = &["latest", "new", "recent", "नया", "नई", "ताजा"];

/// Query words ignored when extracting match keywords.
const KEYWORD_FILLERS: &[&str] = &[
    "kya", "hai", "hain", "ka", "ki", "ke", "me", "mein", "the", "is", "are", "what", "how",
    "when", "please", "batao", "bataiye", "dikhao", "show", "tell",
];

pub struct Ranker {
    registry: Arc<TrustRegistry>,
    config: RankerConfig,
}

impl Ranker {
    pub fn new(registry: Arc<TrustRegistry>, config: RankerConfig) -> Self {
        Self { registry, config }
    }

    /// Significant query words: fillers dropped, short tokens dropped.
    pub fn extract_keywords(query: &str) -> Vec<String> {
        query
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 2 && !KEYWORD_FILLERS.contains(w))
            .map(String::from)
            .collect()
    }

    // ── Ranking ──────────────────────────────────────────────────────────────

    /// Score every result and return them sorted by total score
    /// descending (stable; ties broken by trust, then freshness).
    pub fn rank(&self, results: &[RawResult], query: &str) -> Vec<RankedResult> {
        if results.is_empty() {
            return Vec::new();
        }

        let keywords = Self::extract_keywords(query);
        let weights = &self.config.weights;

        let mut ranked: Vec<RankedResult> = results
            .iter()
            .map(|result| {
                let trust = self.trust_score(&result.domain);
                let relevance = relevance_score(result, query, &keywords);
                let freshness = freshness_score(result);
                let title_match = title_match_score(&result.title, &keywords);

                let total = relevance * weights.relevance
                    + trust * weights.trust
                    + freshness * weights.freshness
                    + title_match * weights.title_match;

                trace!(url = %result.url, relevance, trust, freshness, title_match, total, "scored result");

                RankedResult {
                    result: result.clone(),
                    scores: ResultScores {
                        relevance,
                        trust,
                        freshness,
                        title_match,
                        total,
                    },
                    source_type: self.source_type_for(&result.domain),
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.scores
                .total
                .total_cmp(&a.scores.total)
                .then_with(|| b.scores.trust.total_cmp(&a.scores.trust))
                .then_with(|| b.scores.freshness.total_cmp(&a.scores.freshness))
        });

        debug!(
            count = ranked.len(),
            top = ranked.first().map(|r| r.scores.total).unwrap_or(0.0),
            "ranked results"
        );
        ranked
    }

    /// Keep results at or above the minimum score, up to the configured
    /// maximum.
    pub fn get_top(&self, ranked: Vec<RankedResult>) -> Vec<RankedResult> {
        ranked
            .into_iter()
            .filter(|r| r.scores.total >= self.config.min_result_score)
            .take(self.config.max_results)
            .collect()
    }

    /// Highest-ranked result from an official or semi-official source.
    pub fn best_official<'a>(&self, ranked: &'a [RankedResult]) -> Option<&'a RankedResult> {
        ranked.iter().find(|r| {
            matches!(
                r.source_type,
                SourceType::Official | SourceType::SemiOfficial
            )
        })
    }

    // ── Signals ──────────────────────────────────────────────────────────────

    fn trust_score(&self, domain: &str) -> f64 {
        (self.registry.priority(domain) as f64 / 10.0).clamp(0.0, 1.0)
    }

    fn source_type_for(&self, domain: &str) -> SourceType {
        if let Some(source) = self.registry.get(domain) {
            return source.source_type;
        }
        let domain = domain.to_lowercase();
        if domain.ends_with(".gov.in") || domain.ends_with(".nic.in") {
            SourceType::Official
        } else if domain.ends_with(".ac.in") || domain.ends_with(".edu.in") {
            SourceType::Educational
        } else if domain.contains("sarkari") || domain.contains("jobalert") {
            SourceType::Aggregator
        } else if domain.contains("news") || domain.contains("times") || domain.contains("daily") {
            SourceType::News
        } else {
            SourceType::Unknown
        }
    }

    // ── Rendering ────────────────────────────────────────────────────────────

    /// Render the top results into a short bilingual markdown block.
    pub fn format_response(&self, results: &[RankedResult], language: Language) -> String {
        if results.is_empty() {
            return match language {
                Language::Hindi => "कोई प्रासंगिक जानकारी नहीं मिली।".to_string(),
                Language::English => "No relevant information found.".to_string(),
            };
        }

        let mut out = match language {
            Language::Hindi => "🔍 **आपके सवाल के लिए मैंने खोजा:**\n\n".to_string(),
            Language::English => "🔍 **Here's what I found:**\n\n".to_string(),
        };

        for (idx, result) in results.iter().take(3).enumerate() {
            let marker = if result.source_type == SourceType::Official {
                "✅"
            } else {
                "📄"
            };
            out.push_str(&format!("{marker} **{}. {}**\n", idx + 1, result.result.title));

            let snippet = &result.result.snippet;
            if !snippet.is_empty() {
                if snippet.chars().count() > 200 {
                    let short: String = snippet.chars().take(200).collect();
                    out.push_str(&format!("   {short}...\n"));
                } else {
                    out.push_str(&format!("   {snippet}\n"));
                }
            }
            out.push_str(&format!("   🔗 {}\n", result.result.url));

            if result.source_type == SourceType::Official {
                out.push_str(match language {
                    Language::Hindi => "   _(आधिकारिक स्रोत)_\n",
                    Language::English => "   _(Official Source)_\n",
                });
            }
            out.push('\n');
        }

        out.push_str(match language {
            Language::Hindi => "💡 *आधिकारिक वेबसाइट पर जाकर जानकारी verify करें।*",
            Language::English => "💡 *Please verify on the official website.*",
        });
        out
    }

    /// Suggestions shown when nothing cleared the score floor.
    pub fn no_results_response(&self, query: &str, language: Language) -> String {
        let short: String = query.chars().take(30).collect();
        match language {
            Language::Hindi => format!(
                "🔍 **\"{short}...\" के लिए कोई प्रासंगिक जानकारी नहीं मिली।**\n\n\
                 💡 **सुझाव:**\n\
                 • योजना/नौकरी का official नाम use करें\n\
                 • अपने सवाल में state का नाम add करें\n\
                 • Official website का link provide करें\n\n\
                 📝 *उदाहरण: \"PM Kisan योजना Bihar\", \"SSC CGL result\"*"
            ),
            Language::English => format!(
                "🔍 **No relevant information found for \"{short}...\"**\n\n\
                 💡 **Suggestions:**\n\
                 • Use the official scheme/job name\n\
                 • Add your state to the query\n\
                 • Provide the official website link\n\n\
                 📝 *Example: \"PM Kisan scheme Bihar\", \"SSC CGL result\"*"
            ),
        }
    }
}

// ── Signal functions ─────────────────────────────────────────────────────────

fn relevance_score(result: &RawResult, query: &str, keywords: &[String]) -> f64 {
    let title = result.title.to_lowercase();
    let snippet = result.snippet.to_lowercase();
    let content = result.content.to_lowercase();
    let all_text = format!("{title} {snippet} {content}");

    let query_lower = query.to_lowercase();
    let query_words: Vec<&str> = query_lower.split_whitespace().collect();

    let mut score = 0.0;

    if all_text.contains(&query_lower) {
        score += 0.30;
    }

    if !keywords.is_empty() {
        let found = keywords.iter().filter(|kw| all_text.contains(kw.as_str())).count();
        score += (found as f64 / keywords.len() as f64) * 0.40;
    }

    for keyword in IMPORTANT_KEYWORDS {
        if all_text.contains(keyword) {
            score += 0.05;
        }
    }

    if !query_words.is_empty() {
        let in_title = query_words.iter().filter(|w| title.contains(*w)).count();
        score += (in_title as f64 / query_words.len() as f64) * 0.20;
    }

    if snippet.len() > 100 {
        score += 0.05;
    }

    score.clamp(0.0, 1.0)
}

/// Heuristic year-based freshness.  When several years appear, the
/// highest applicable bucket wins.
fn freshness_score(result: &RawResult) -> f64 {
    let text = format!("{} {}", result.content, result.snippet);
    let current_year = Utc::now().year();

    let mut score: f64 = 0.5;
    if text.contains(&current_year.to_string()) {
        score = 0.9;
    } else if text.contains(&(current_year - 1).to_string()) {
        score = 0.7;
    } else if text.contains(&(current_year - 2).to_string()) {
        score = 0.5;
    }

    let text_lower = text.to_lowercase();
    if FRESHNESS_MARKERS.iter().any(|m| text_lower.contains(m)) {
        score += 0.20;
    }

    score.clamp(0.0, 1.0)
}

fn title_match_score(title: &str, keywords: &[String]) -> f64 {
    if title.is_empty() || keywords.is_empty() {
        return 0.0;
    }
    let title = title.to_lowercase();
    let matches = keywords.iter().filter(|kw| title.contains(kw.as_str())).count();
    matches as f64 / keywords.len() as f64
}
