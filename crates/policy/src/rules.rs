//! The compiled pattern catalogue behind intent detection and search
//! scoring.  All patterns run against the lowercased query; Hindi forms
//! (Devanagari and romanised) sit alongside the English ones.

use regex::Regex;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("pattern catalogue must compile"))
        .collect()
}

pub struct IntentRules {
    pub blocked: Vec<Regex>,
    pub greeting: Vec<Regex>,
    pub personal_status: Vec<Regex>,
    pub url: Regex,
    pub result: Regex,
    pub job_keywords: Regex,
    pub scheme_keywords: Regex,
    pub date: Regex,
    pub document: Regex,
    pub state: Regex,
}

impl IntentRules {
    pub fn new() -> Self {
        Self {
            blocked: compile(&[
                r"(hack|bypass|crack|cheat|pirate)",
                r"(otp\s*bypass|captcha\s*(bypass|break))",
                r"(password\s*crack|account\s*hack)",
                r"(free\s*recharge|unlimited\s*money)",
                r"(phishing|scam|fraud\s*kaise)",
            ]),
            greeting: compile(&[
                r"^(hi|hello|hey|namaste|namaskar|good\s*(morning|evening|night|afternoon))[\s!.]*$",
                r"^(धन्यवाद|शुक्रिया|thanks|thank\s*you|ok|okay|thik|ठीक)[\s!.]*$",
                r"^(bye|goodbye|alvida|फिर\s*मिलेंगे)[\s!.]*$",
                r"^(haan|ha|yes|no|nahi|नहीं)[\s!.]*$",
            ]),
            personal_status: compile(&[
                r"(mera|my|apna)\s*(status|application|payment|profile|account)",
                r"(मेरा|अपना)\s*(स्टेटस|आवेदन|भुगतान|प्रोफाइल)",
                r"(show|check|dekho|dikhao)\s*(my|mera|apna)",
                r"(login|logout|password|otp)\s*(karo|karna|change)",
            ]),
            url: Regex::new(r"https?://\S+").expect("url pattern"),
            result: Regex::new(r"(result|रिजल्ट|परिणाम|merit|answer\s*key)").expect("result pattern"),
            job_keywords: Regex::new(
                r"\b(ssc|upsc|railway|rrb|ibps|bank|police|army|navy|airforce|nda|cds|capf|cisf|crpf|bsf|itbp|ssb|constable|si|inspector|clerk|po|so|assistant|steno|typist|teacher|tet|ctet|stet|lecturer|professor|engineer|je|ae|scientist|drdo|isro)\b|भर्ती|नौकरी|वैकेंसी|सरकारी",
            )
            .expect("job keywords"),
            scheme_keywords: Regex::new(
                r"\b(yojana|scheme|pradhan\s*mantri|mukhyamantri|subsidy|pension|scholarship|loan|kisan|mahila|yuva|awas|ration|aadhar|ayushman|ujjwala|mudra|jan\s*dhan|sukanya)\b|योजना|प्रधानमंत्री|मुख्यमंत्री|अनुदान|पेंशन|छात्रवृत्ति|ऋण|किसान|महिला|युवा|आवास|राशन|आधार|आयुष्मान|उज्ज्वला|मुद्रा",
            )
            .expect("scheme keywords"),
            date: Regex::new(r"\b(kab|when|date|schedule|time)\b|कब|तारीख").expect("date pattern"),
            document: Regex::new(r"\b(document|paper|form|certificate)\b|दस्तावेज|फॉर्म")
                .expect("document pattern"),
            state: Regex::new(
                r"\b(bihar|uttar\s*pradesh|madhya\s*pradesh|rajasthan|maharashtra|gujarat|delhi|haryana|punjab|jharkhand|chhattisgarh|odisha|assam|west\s*bengal|tamil\s*nadu|karnataka|kerala|telangana|andhra\s*pradesh)\b|बिहार|उत्तर\s*प्रदेश|मध्य\s*प्रदेश|राजस्थान|महाराष्ट्र|गुजरात|दिल्ली|हरियाणा|पंजाब|झारखंड|छत्तीसगढ़|ओडिशा|असम|पश्चिम\s*बंगाल|तमिलनाडु|कर्नाटक|केरल|तेलंगाना|आंध्र\s*प्रदेश",
            )
            .expect("state pattern"),
        }
    }

    /// A URL plus a fetch verb means the user wants that page, not a search.
    pub fn has_fetch_verb(&self, query: &str) -> bool {
        ["check", "fetch", "summarize", "open", "देखो", "बताओ"]
            .iter()
            .any(|verb| query.contains(verb))
    }
}

impl Default for IntentRules {
    fn default() -> Self {
        Self::new()
    }
}

/// Additive search-score triggers.  Each pattern contributes its weight
/// once; the running sum is clamped to `[0, 1]` by the caller.
pub fn score_triggers() -> Vec<(Regex, f64)> {
    [
        (r"(latest|new|नया|नई|recent|fresh|20[2-9]\d)", 0.30),
        (r"(last\s*date|अंतिम\s*तिथि|deadline|cutoff|cut\s*off)", 0.30),
        (r"(result|रिजल्ट|परिणाम|merit\s*list|answer\s*key)", 0.30),
        (r"(notification|नोटिफिकेशन|admit\s*card|एडमिट)", 0.25),
        (r"(vacancy|भर्ती|recruitment|bharti|job\s*opening)", 0.25),
        (r"\b(kab|when|date|schedule)\b|कब|तारीख", 0.25),
        (r"\b(kya|what|kaise|how|link)\b|क्या|कैसे|लिंक", 0.25),
        (r"(eligibility|पात्रता|योग्यता|criteria)", 0.20),
        (r"(form|फॉर्म|apply|आवेदन|registration)", 0.20),
        (r"(salary|सैलरी|वेतन|pay\s*scale)", 0.20),
        (r"(syllabus|सिलेबस|pattern|पैटर्न)", 0.20),
        (r"https?://\S+", 0.10),
    ]
    .iter()
    .map(|(p, w)| (Regex::new(p).expect("trigger pattern"), *w))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_compiles() {
        let rules = IntentRules::new();
        assert!(rules.url.is_match("see https://ssc.nic.in/notice"));
        assert_eq!(score_triggers().len(), 12);
    }

    #[test]
    fn short_job_tokens_need_word_boundaries() {
        let rules = IntentRules::new();
        // "po" and "so" must not fire inside ordinary words.
        assert!(!rules.job_keywords.is_match("point of sale solutions"));
        assert!(rules.job_keywords.is_match("ibps po vacancy"));
        assert!(rules.job_keywords.is_match("सरकारी नौकरी"));
    }

    #[test]
    fn greeting_patterns_are_anchored() {
        let rules = IntentRules::new();
        assert!(rules.greeting.iter().any(|p| p.is_match("namaste")));
        assert!(rules.greeting.iter().any(|p| p.is_match("thank you!")));
        // A greeting word inside a real question is not a greeting.
        assert!(!rules.greeting.iter().any(|p| p.is_match("hello, ssc cgl result kab aayega")));
    }
}
