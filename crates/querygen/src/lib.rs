//! Query generator: turns a messy bilingual user utterance into 2–4
//! ranked retrieval queries (Hindi, English, `site:gov.in`-scoped, plus
//! the cleaned original).
//!
//! Output order is deterministic for identical input — cache keys depend
//! on it.

use chrono::{Datelike, Utc};
use regex::Regex;
use sahayak_types::{GeneratedQuery, QueryType, QueryVariant};
use tracing::debug;

// ── Filler words ─────────────────────────────────────────────────────────────

const FILLER_WORDS_HI: &[&str] = &[
    "bhai", "भाई", "yaar", "यार", "प्लीज", "batao", "बताओ", "bata", "बता", "do", "दो",
    "kya", "क्या", "hai", "है", "hain", "हैं", "mujhe", "मुझे", "humko", "हमको", "hamein",
    "हमें", "chahiye", "चाहिए", "chahie", "dikhao", "दिखाओ", "na", "ना", "ji", "जी",
    "sir", "सर", "madam", "मैडम",
];

const FILLER_WORDS_EN: &[&str] = &[
    "please", "kindly", "can", "you", "tell", "me", "about", "what", "is", "are", "the",
    "a", "an", "show", "give", "i", "want", "need", "looking", "for", "find", "help",
];

// ── Entity catalogues ────────────────────────────────────────────────────────

/// Canonical state forms, checked in order.  Multi-word keys are matched
/// as substrings, single-word keys as whole tokens (so "up" never fires
/// inside "group d").
const STATE_MAPPING: &[(&str, &str)] = &[
    ("uttar pradesh", "Uttar Pradesh"),
    ("उत्तर प्रदेश", "Uttar Pradesh"),
    ("madhya pradesh", "Madhya Pradesh"),
    ("मध्य प्रदेश", "Madhya Pradesh"),
    ("andhra pradesh", "Andhra Pradesh"),
    ("आंध्र प्रदेश", "Andhra Pradesh"),
    ("west bengal", "West Bengal"),
    ("पश्चिम बंगाल", "West Bengal"),
    ("tamil nadu", "Tamil Nadu"),
    ("तमिलनाडु", "Tamil Nadu"),
    ("bihar", "Bihar"),
    ("बिहार", "Bihar"),
    ("up", "Uttar Pradesh"),
    ("mp", "Madhya Pradesh"),
    ("rajasthan", "Rajasthan"),
    ("राजस्थान", "Rajasthan"),
    ("maharashtra", "Maharashtra"),
    ("महाराष्ट्र", "Maharashtra"),
    ("gujarat", "Gujarat"),
    ("गुजरात", "Gujarat"),
    ("delhi", "Delhi"),
    ("दिल्ली", "Delhi"),
    ("haryana", "Haryana"),
    ("हरियाणा", "Haryana"),
    ("punjab", "Punjab"),
    ("पंजाब", "Punjab"),
    ("jharkhand", "Jharkhand"),
    ("झारखंड", "Jharkhand"),
    ("chhattisgarh", "Chhattisgarh"),
    ("छत्तीसगढ़", "Chhattisgarh"),
    ("odisha", "Odisha"),
    ("ओडिशा", "Odisha"),
    ("karnataka", "Karnataka"),
    ("कर्नाटक", "Karnataka"),
    ("kerala", "Kerala"),
    ("केरल", "Kerala"),
    ("telangana", "Telangana"),
    ("तेलंगाना", "Telangana"),
    ("assam", "Assam"),
    ("असम", "Assam"),
];

/// Curated scheme names, checked in order; first match wins.
const SCHEME_MAPPING: &[(&str, &str)] = &[
    ("pm kisan", "PM Kisan Samman Nidhi"),
    ("पीएम किसान", "PM Kisan Samman Nidhi"),
    ("pmkisan", "PM Kisan Samman Nidhi"),
    ("ayushman", "Ayushman Bharat"),
    ("आयुष्मान", "Ayushman Bharat"),
    ("ujjwala", "PM Ujjwala Yojana"),
    ("उज्ज्वला", "PM Ujjwala Yojana"),
    ("mudra", "PM MUDRA Yojana"),
    ("मुद्रा", "PM MUDRA Yojana"),
    ("awas", "PM Awas Yojana"),
    ("आवास", "PM Awas Yojana"),
    ("jan dhan", "Jan Dhan Yojana"),
    ("जन धन", "Jan Dhan Yojana"),
    ("sukanya", "Sukanya Samriddhi Yojana"),
    ("सुकन्या", "Sukanya Samriddhi Yojana"),
    ("kaushal vikas", "PM Kaushal Vikas Yojana"),
    ("कौशल विकास", "PM Kaushal Vikas Yojana"),
    ("fasal bima", "PM Fasal Bima Yojana"),
    ("फसल बीमा", "PM Fasal Bima Yojana"),
];

/// Entities pulled out of a query before template expansion.
#[derive(Debug, Clone, Default)]
pub struct QueryEntities {
    pub exam: Option<String>,
    pub state: Option<String>,
    pub year: String,
    pub scheme: Option<String>,
    pub keyword: Option<String>,
}

pub struct QueryGenerator {
    exam_patterns: Vec<Regex>,
    year_pattern: Regex,
    result_pattern: Regex,
    admit_pattern: Regex,
    cutoff_pattern: Regex,
    syllabus_pattern: Regex,
    scheme_pattern: Regex,
    job_pattern: Regex,
    current_year: i32,
}

impl QueryGenerator {
    pub fn new() -> Self {
        let exam_patterns = [
            r"ssc\s*(cgl|chsl|mts|gd|stenographer|je)",
            r"upsc\s*(cse|ias|ips|nda|cds|capf|epfo)",
            r"rrb\s*(ntpc|alp|je|group\s*d)",
            r"ibps\s*(po|clerk|so|rrb)",
            r"\b(neet|jee\s*(main|advanced)?|gate|cat|mat)\b",
            r"\b(ctet|stet|tet|net|set)\b",
            r"(bihar\s*board|bseb|cbse|icse)",
            r"(police\s*(constable|si)|army|navy|airforce)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("exam pattern"))
        .collect();

        Self {
            exam_patterns,
            year_pattern: Regex::new(r"20[2-9]\d").expect("year pattern"),
            result_pattern: Regex::new(r"(result|रिजल्ट|परिणाम|merit|answer\s*key)").expect("result"),
            admit_pattern: Regex::new(r"(admit\s*card|एडमिट\s*कार्ड|hall\s*ticket)").expect("admit"),
            cutoff_pattern: Regex::new(r"(cutoff|cut\s*off|कटऑफ)").expect("cutoff"),
            syllabus_pattern: Regex::new(r"(syllabus|सिलेबस|pattern|पैटर्न|topics)").expect("syllabus"),
            scheme_pattern: Regex::new(r"(yojana|योजना|scheme|subsidy|pension)").expect("scheme"),
            job_pattern: Regex::new(r"(vacancy|भर्ती|recruitment|job|नौकरी|bharti)").expect("job"),
            current_year: Utc::now().year(),
        }
    }

    // ── Cleaning ─────────────────────────────────────────────────────────────

    /// Lowercase, drop filler words, strip punctuation except hyphens.
    pub fn clean_query(&self, query: &str) -> String {
        query
            .to_lowercase()
            .split_whitespace()
            .map(|word| {
                word.trim_matches(|c: char| !c.is_alphanumeric() && c != '-')
            })
            .filter(|word| {
                !word.is_empty()
                    && !FILLER_WORDS_HI.contains(word)
                    && !FILLER_WORDS_EN.contains(word)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    // ── Entity extraction ────────────────────────────────────────────────────

    pub fn extract_entities(&self, query: &str) -> QueryEntities {
        let query_lower = query.to_lowercase();
        let tokens: Vec<&str> = query_lower.split_whitespace().collect();
        let mut entities = QueryEntities {
            year: self
                .year_pattern
                .find(query)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| self.current_year.to_string()),
            ..Default::default()
        };

        for pattern in &self.exam_patterns {
            if let Some(m) = pattern.find(&query_lower) {
                let exam = m.as_str().to_uppercase();
                entities.exam = Some(exam.split_whitespace().collect::<Vec<_>>().join(" "));
                break;
            }
        }

        for (key, value) in STATE_MAPPING {
            let found = if key.contains(' ') {
                query_lower.contains(key)
            } else {
                tokens.contains(key)
            };
            if found {
                entities.state = Some(value.to_string());
                break;
            }
        }

        for (key, value) in SCHEME_MAPPING {
            if query_lower.contains(key) {
                entities.scheme = Some(value.to_string());
                break;
            }
        }

        let cleaned = self.clean_query(query);
        entities.keyword = cleaned.split_whitespace().next().map(String::from);

        entities
    }

    // ── Type classification ──────────────────────────────────────────────────

    /// Keyword priority: result, admit card, cutoff, syllabus, scheme,
    /// job, general.
    pub fn detect_query_type(&self, query: &str) -> QueryType {
        let query = query.to_lowercase();
        if self.result_pattern.is_match(&query) {
            QueryType::Result
        } else if self.admit_pattern.is_match(&query) {
            QueryType::AdmitCard
        } else if self.cutoff_pattern.is_match(&query) {
            QueryType::Cutoff
        } else if self.syllabus_pattern.is_match(&query) {
            QueryType::Syllabus
        } else if self.scheme_pattern.is_match(&query) {
            QueryType::Scheme
        } else if self.job_pattern.is_match(&query) {
            QueryType::Job
        } else {
            QueryType::General
        }
    }

    // ── Emission ─────────────────────────────────────────────────────────────

    /// Generate ranked retrieval queries.  `query_type` overrides
    /// classification when the policy engine already knows the intent.
    pub fn generate(&self, query: &str, query_type: Option<QueryType>) -> Vec<GeneratedQuery> {
        let entities = self.extract_entities(query);
        let query_type = query_type.unwrap_or_else(|| self.detect_query_type(query));

        let mut generated = match query_type {
            QueryType::Job => self.job_queries(&entities),
            QueryType::Scheme => self.scheme_queries(&entities),
            QueryType::Result => self.exam_queries(
                &entities,
                QueryType::Result,
                "{exam} रिजल्ट {year} लिंक आधिकारिक",
                "{exam} result {year} official link direct",
                "site:gov.in \"{exam}\" result {year}",
            ),
            QueryType::AdmitCard => self.exam_queries(
                &entities,
                QueryType::AdmitCard,
                "{exam} एडमिट कार्ड {year} डाउनलोड लिंक",
                "{exam} admit card {year} download link official",
                "site:gov.in \"{exam}\" admit card download {year}",
            ),
            QueryType::Cutoff => self.exam_queries(
                &entities,
                QueryType::Cutoff,
                "{exam} कटऑफ {year} श्रेणीवार",
                "{exam} cutoff {year} category wise expected",
                "site:gov.in \"{exam}\" cutoff marks {year}",
            ),
            QueryType::Syllabus => self.exam_queries(
                &entities,
                QueryType::Syllabus,
                "{exam} सिलेबस {year} परीक्षा पैटर्न",
                "{exam} syllabus {year} exam pattern topics",
                "site:gov.in \"{exam}\" syllabus exam pattern",
            ),
            QueryType::General => self.general_queries(query),
        };

        // The cleaned original always rides along at priority 4, unless it
        // duplicates an emitted variant.
        let cleaned = self.clean_query(query);
        if !cleaned.is_empty()
            && !generated
                .iter()
                .any(|g| g.text.eq_ignore_ascii_case(&cleaned))
        {
            generated.push(GeneratedQuery {
                text: cleaned,
                variant: QueryVariant::Mixed,
                query_type,
                priority: 4,
            });
        }

        debug!(count = generated.len(), ?query_type, "generated retrieval queries");
        generated
    }

    fn job_queries(&self, entities: &QueryEntities) -> Vec<GeneratedQuery> {
        let keyword = entities
            .exam
            .clone()
            .or_else(|| entities.keyword.clone())
            .unwrap_or_else(|| "government".to_string());
        let state = entities.state.as_deref().unwrap_or("");
        let year = &entities.year;

        vec![
            query(
                format!("{keyword} भर्ती {state} {year} अंतिम तिथि आधिकारिक वेबसाइट"),
                QueryVariant::Hindi,
                QueryType::Job,
                1,
            ),
            query(
                format!("{keyword} recruitment {state} {year} last date official notification"),
                QueryVariant::English,
                QueryType::Job,
                2,
            ),
            query(
                format!("site:gov.in {keyword} recruitment {state} notification {year}"),
                QueryVariant::OfficialSitesOnly,
                QueryType::Job,
                3,
            ),
        ]
    }

    fn scheme_queries(&self, entities: &QueryEntities) -> Vec<GeneratedQuery> {
        let name = entities
            .scheme
            .clone()
            .or_else(|| entities.keyword.clone())
            .unwrap_or_else(|| "government scheme".to_string());

        vec![
            query(
                format!("{name} योजना पात्रता दस्तावेज आवेदन लिंक आधिकारिक"),
                QueryVariant::Hindi,
                QueryType::Scheme,
                1,
            ),
            query(
                format!("{name} scheme eligibility documents apply link official"),
                QueryVariant::English,
                QueryType::Scheme,
                2,
            ),
            query(
                format!("site:gov.in \"{name}\" apply eligibility documents"),
                QueryVariant::OfficialSitesOnly,
                QueryType::Scheme,
                3,
            ),
        ]
    }

    fn exam_queries(
        &self,
        entities: &QueryEntities,
        query_type: QueryType,
        hi: &str,
        en: &str,
        gov: &str,
    ) -> Vec<GeneratedQuery> {
        let exam = entities
            .exam
            .clone()
            .or_else(|| entities.keyword.clone())
            .unwrap_or_else(|| "exam".to_string());
        let year = &entities.year;

        let fill = |template: &str| {
            template
                .replace("{exam}", &exam)
                .replace("{year}", year)
        };

        vec![
            query(fill(hi), QueryVariant::Hindi, query_type, 1),
            query(fill(en), QueryVariant::English, query_type, 2),
            query(fill(gov), QueryVariant::OfficialSitesOnly, query_type, 3),
        ]
    }

    fn general_queries(&self, original: &str) -> Vec<GeneratedQuery> {
        let cleaned = self.clean_query(original);
        let cleaned = if cleaned.is_empty() {
            original.trim().to_lowercase()
        } else {
            cleaned
        };

        vec![
            query(cleaned.clone(), QueryVariant::Mixed, QueryType::General, 1),
            query(
                format!("{cleaned} official website"),
                QueryVariant::English,
                QueryType::General,
                2,
            ),
            query(
                format!("site:gov.in {cleaned}"),
                QueryVariant::OfficialSitesOnly,
                QueryType::General,
                3,
            ),
        ]
    }
}

impl Default for QueryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse template gaps left by empty entities, then wrap.
fn query(text: String, variant: QueryVariant, query_type: QueryType, priority: u8) -> GeneratedQuery {
    GeneratedQuery {
        text: text.split_whitespace().collect::<Vec<_>>().join(" "),
        variant,
        query_type,
        priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaning_drops_fillers_and_punctuation() {
        let qg = QueryGenerator::new();
        assert_eq!(
            qg.clean_query("Bhai please SSC CGL ka form batao!"),
            "ssc cgl ka form"
        );
        assert_eq!(qg.clean_query("pm-kisan status?"), "pm-kisan status");
    }

    #[test]
    fn entity_extraction_covers_exam_state_year() {
        let qg = QueryGenerator::new();
        let entities = qg.extract_entities("bihar ssc cgl last date 2026");
        assert_eq!(entities.exam.as_deref(), Some("SSC CGL"));
        assert_eq!(entities.state.as_deref(), Some("Bihar"));
        assert_eq!(entities.year, "2026");
    }

    #[test]
    fn missing_year_defaults_to_current() {
        let qg = QueryGenerator::new();
        let entities = qg.extract_entities("ssc cgl notification");
        assert_eq!(entities.year, Utc::now().year().to_string());
    }

    #[test]
    fn short_state_abbreviations_match_whole_tokens_only() {
        let qg = QueryGenerator::new();
        let entities = qg.extract_entities("rrb group d vacancy up");
        assert_eq!(entities.state.as_deref(), Some("Uttar Pradesh"));

        // "up" inside another word must not count as a state.
        let entities = qg.extract_entities("follow up on upsc cse");
        assert_eq!(entities.state.as_deref(), Some("Uttar Pradesh")); // token "up" present
        let entities = qg.extract_entities("upcoming upsc cse exams");
        assert_eq!(entities.state, None);
    }

    #[test]
    fn scheme_names_resolve_to_canonical_forms() {
        let qg = QueryGenerator::new();
        let entities = qg.extract_entities("pm kisan yojana eligibility");
        assert_eq!(entities.scheme.as_deref(), Some("PM Kisan Samman Nidhi"));

        let entities = qg.extract_entities("उज्ज्वला योजना apply");
        assert_eq!(entities.scheme.as_deref(), Some("PM Ujjwala Yojana"));
    }

    #[test]
    fn type_detection_follows_keyword_priority() {
        let qg = QueryGenerator::new();
        assert_eq!(qg.detect_query_type("ssc cgl result 2026"), QueryType::Result);
        assert_eq!(qg.detect_query_type("neet admit card download"), QueryType::AdmitCard);
        assert_eq!(qg.detect_query_type("ssc chsl cutoff marks"), QueryType::Cutoff);
        assert_eq!(qg.detect_query_type("upsc cse syllabus"), QueryType::Syllabus);
        assert_eq!(qg.detect_query_type("pm awas yojana"), QueryType::Scheme);
        assert_eq!(qg.detect_query_type("railway vacancy"), QueryType::Job);
        assert_eq!(qg.detect_query_type("india capital"), QueryType::General);
        // Result outranks job when both cues appear.
        assert_eq!(qg.detect_query_type("ssc cgl vacancy result"), QueryType::Result);
    }

    #[test]
    fn job_emission_produces_all_variants() {
        let qg = QueryGenerator::new();
        let queries = qg.generate("bihar ssc cgl last date 2026", Some(QueryType::Job));

        assert!(queries.len() >= 3, "got {} queries", queries.len());
        assert!(queries.iter().all(|q| !q.text.is_empty()));
        assert!(queries.iter().any(|q| q.variant == QueryVariant::Hindi));
        assert!(
            queries
                .iter()
                .any(|q| q.variant == QueryVariant::OfficialSitesOnly
                    && q.text.starts_with("site:gov.in"))
        );
        // Entities flow into the emitted text.
        assert!(queries.iter().any(|q| q.text.contains("SSC CGL") && q.text.contains("2026")));
        assert!(queries.iter().any(|q| q.text.contains("Bihar")));
        // Priorities 1..3 for variants, 4 for the cleaned original.
        assert_eq!(queries[0].priority, 1);
        assert_eq!(queries.last().unwrap().priority, 4);
    }

    #[test]
    fn missing_entities_fall_back_to_defaults() {
        let qg = QueryGenerator::new();
        let queries = qg.generate("", Some(QueryType::Job));
        assert!(queries.iter().all(|q| !q.text.trim().is_empty()));
        assert!(queries[0].text.contains("government"));
    }

    #[test]
    fn general_queries_keep_cleaned_original_first() {
        let qg = QueryGenerator::new();
        let queries = qg.generate("konark temple history", None);
        assert_eq!(queries[0].text, "konark temple history");
        assert_eq!(queries[0].variant, QueryVariant::Mixed);
        assert!(queries[1].text.ends_with("official website"));
        assert!(queries[2].text.starts_with("site:gov.in"));
        // Cleaned original equals variant 1, so no duplicate priority-4 entry.
        assert_eq!(queries.len(), 3);
    }

    #[test]
    fn output_is_stable_for_identical_input() {
        let qg = QueryGenerator::new();
        let a = qg.generate("pm kisan yojana eligibility", Some(QueryType::Scheme));
        let b = qg.generate("pm kisan yojana eligibility", Some(QueryType::Scheme));
        let texts_a: Vec<&str> = a.iter().map(|q| q.text.as_str()).collect();
        let texts_b: Vec<&str> = b.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts_a, texts_b);
    }
}
