//! Regex catalogue for pulling structured fields out of bilingual
//! job/scheme text: dates, fees, age limits, vacancies, documents,
//! qualifications, departments.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use sahayak_types::AgeLimit;

static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}[/-]\d{1,2}[/-]\d{4})\b").expect("numeric date"));

static WORDY_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2}(?:st|nd|rd|th)?\s+(?:january|february|march|april|may|june|july|august|september|october|november|december)[,.]?\s*\d{4})\b",
    )
    .expect("wordy date")
});

static LAST_DATE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:last\s*date|अंतिम\s*तिथि|closing\s*date|apply\s*(?:by|before))[^\n]{0,60}")
        .expect("last date label")
});

static START_DATE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:start(?:ing)?\s*date|apply\s*from|आवेदन\s*शुरू|opening\s*date)[^\n]{0,60}")
        .expect("start date label")
});

static EXAM_DATE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:exam\s*date|date\s*of\s*exam(?:ination)?|परीक्षा\s*तिथि)[^\n]{0,60}")
        .expect("exam date label")
});

static FEE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:fee|fees|शुल्क)[^\d₹]{0,20}(?:rs\.?|₹|inr)?\s*(\d{2,5})\b").expect("fee")
});

static CATEGORY_FEE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(general|gen|ur|obc|sc/st|sc|st|ews|female|women|pwd)\b[^\d\n]{0,20}(?:rs\.?|₹|inr)\s*(\d{2,5})\b")
        .expect("category fee")
});

static AGE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*(?:to|-|–)\s*(\d{1,2})\s*(?:years|yrs|वर्ष)").expect("age range")
});

static MAX_AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:max(?:imum)?\s*age|upper\s*age|आयु\s*सीमा)[^\d]{0,15}(\d{1,2})")
        .expect("max age")
});

static VACANCIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,6})\s*(?:vacancies|vacancy|posts?|पद|रिक्तियां)\b").expect("vacancies")
});

static ELIGIBILITY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:eligibility|eligible|पात्रता|योग्यता)[:\s-]*([^\n.]{10,150})")
        .expect("eligibility line")
});

static DEPARTMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(staff selection commission|union public service commission|railway recruitment board|institute of banking personnel selection|national testing agency|ministry of [a-z&\s]{3,40}|department of [a-z&\s]{3,40})",
    )
    .expect("department")
});

/// `(marker in text, canonical name)` pairs for required documents.
const DOCUMENT_MARKERS: &[(&str, &str)] = &[
    ("aadhaar", "Aadhaar Card"),
    ("aadhar", "Aadhaar Card"),
    ("आधार", "Aadhaar Card"),
    ("photograph", "Photograph"),
    ("photo", "Photograph"),
    ("signature", "Signature"),
    ("marksheet", "Marksheet"),
    ("mark sheet", "Marksheet"),
    ("caste certificate", "Caste Certificate"),
    ("income certificate", "Income Certificate"),
    ("domicile", "Domicile Certificate"),
    ("pan card", "PAN Card"),
    ("voter id", "Voter ID"),
    ("बैंक पासबुक", "Bank Passbook"),
    ("bank passbook", "Bank Passbook"),
];

const QUALIFICATION_MARKERS: &[(&str, &str)] = &[
    ("10th", "10th Pass"),
    ("matric", "10th Pass"),
    ("12th", "12th Pass"),
    ("intermediate", "12th Pass"),
    ("graduation", "Graduate"),
    ("graduate", "Graduate"),
    ("bachelor", "Graduate"),
    ("post graduate", "Post Graduate"),
    ("master", "Post Graduate"),
    ("diploma", "Diploma"),
    ("iti", "ITI"),
    ("b.tech", "B.Tech/B.E."),
    ("b.e.", "B.Tech/B.E."),
];

const STATE_NAMES: &[&str] = &[
    "Bihar", "Uttar Pradesh", "Madhya Pradesh", "Rajasthan", "Maharashtra", "Gujarat", "Delhi",
    "Haryana", "Punjab", "Jharkhand", "Chhattisgarh", "Odisha", "West Bengal", "Tamil Nadu",
    "Karnataka", "Kerala", "Telangana", "Andhra Pradesh", "Assam",
];

pub fn extract_dates(text: &str) -> Vec<String> {
    let mut dates: Vec<String> = NUMERIC_DATE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    dates.extend(WORDY_DATE.find_iter(text).map(|m| m.as_str().to_string()));
    dates
}

fn labelled_date(label: &Regex, text: &str) -> Option<String> {
    label
        .find_iter(text)
        .find_map(|m| extract_dates(m.as_str()).into_iter().next())
}

pub fn extract_last_date(text: &str) -> Option<String> {
    labelled_date(&LAST_DATE_LABEL, text)
}

pub fn extract_start_date(text: &str) -> Option<String> {
    labelled_date(&START_DATE_LABEL, text)
}

pub fn extract_exam_date(text: &str) -> Option<String> {
    labelled_date(&EXAM_DATE_LABEL, text)
}

/// Flat application fee plus any category-wise breakdown.
pub fn extract_fees(text: &str) -> (Option<f64>, HashMap<String, f64>) {
    let flat = FEE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok());

    let mut category_wise = HashMap::new();
    for caps in CATEGORY_FEE.captures_iter(text) {
        let category = match caps.get(1).map(|m| m.as_str().to_lowercase()).as_deref() {
            Some("general") | Some("gen") | Some("ur") => "general",
            Some("obc") => "obc",
            Some("sc") | Some("st") | Some("sc/st") => "sc_st",
            Some("ews") => "ews",
            Some("female") | Some("women") => "female",
            Some("pwd") => "pwd",
            _ => continue,
        };
        if let Some(amount) = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok()) {
            category_wise.entry(category.to_string()).or_insert(amount);
        }
    }

    (flat, category_wise)
}

pub fn extract_age_limit(text: &str) -> Option<AgeLimit> {
    if let Some(caps) = AGE_RANGE.captures(text) {
        let min = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let max = caps.get(2).and_then(|m| m.as_str().parse().ok());
        return Some(AgeLimit { min, max });
    }
    MAX_AGE.captures(text).map(|caps| AgeLimit {
        min: None,
        max: caps.get(1).and_then(|m| m.as_str().parse().ok()),
    })
}

pub fn extract_vacancies(text: &str) -> Option<u32> {
    VACANCIES
        .captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .max()
}

pub fn extract_eligibility(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for caps in ELIGIBILITY_LINE.captures_iter(text).take(4) {
        if let Some(m) = caps.get(1) {
            let line = m.as_str().trim().to_string();
            if !lines.contains(&line) {
                lines.push(line);
            }
        }
    }
    lines
}

pub fn extract_documents(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut documents = Vec::new();
    for (marker, name) in DOCUMENT_MARKERS {
        if lower.contains(marker) && !documents.contains(&name.to_string()) {
            documents.push(name.to_string());
        }
    }
    documents
}

pub fn extract_qualifications(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut qualifications = Vec::new();
    for (marker, name) in QUALIFICATION_MARKERS {
        if lower.contains(marker) && !qualifications.contains(&name.to_string()) {
            qualifications.push(name.to_string());
        }
    }
    qualifications
}

pub fn detect_state(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    STATE_NAMES
        .iter()
        .find(|state| lower.contains(&state.to_lowercase()))
        .map(|state| state.to_string())
}

pub fn detect_department(text: &str) -> Option<String> {
    DEPARTMENT
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Split links into official (government) and PDF buckets.
pub fn partition_links(links: &[String]) -> (Vec<String>, Vec<String>) {
    let mut official = Vec::new();
    let mut pdfs = Vec::new();
    for link in links {
        let lower = link.to_lowercase();
        if lower.contains(".pdf") && !pdfs.contains(link) {
            pdfs.push(link.clone());
        }
        if (lower.contains(".gov.in") || lower.contains(".nic.in")) && !official.contains(link) {
            official.push(link.clone());
        }
    }
    (official, pdfs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labelled_dates_are_separated() {
        let text = "Notification out. Last Date: 21/07/2026. Exam Date: 14 September 2026. Apply from 01/06/2026.";
        assert_eq!(extract_last_date(text).as_deref(), Some("21/07/2026"));
        assert_eq!(extract_exam_date(text).as_deref(), Some("14 September 2026"));
        assert_eq!(extract_start_date(text).as_deref(), Some("01/06/2026"));
    }

    #[test]
    fn fees_capture_flat_and_category_wise() {
        let text = "Application fee Rs. 100. General Rs 100, OBC Rs 100, SC ₹ 50, Female Rs 0 exempted";
        let (flat, categories) = extract_fees(text);
        assert_eq!(flat, Some(100.0));
        assert_eq!(categories.get("general"), Some(&100.0));
        assert_eq!(categories.get("sc_st"), Some(&50.0));
    }

    #[test]
    fn age_range_beats_max_only() {
        let text = "Age limit: 18 to 27 years as on 01/01/2026";
        let age = extract_age_limit(text).unwrap();
        assert_eq!(age.min, Some(18));
        assert_eq!(age.max, Some(27));

        let age = extract_age_limit("Maximum age 30 for this post").unwrap();
        assert_eq!(age.min, None);
        assert_eq!(age.max, Some(30));
    }

    #[test]
    fn vacancies_take_the_largest_figure() {
        let text = "Total 17727 vacancies announced including 220 posts for this region";
        assert_eq!(extract_vacancies(text), Some(17727));
        assert_eq!(extract_vacancies("no figures here"), None);
    }

    #[test]
    fn documents_and_qualifications_are_canonicalised() {
        let text = "Candidates need Aadhaar card, photograph, signature and 10th marksheet. Graduation required.";
        let documents = extract_documents(text);
        assert!(documents.contains(&"Aadhaar Card".to_string()));
        assert!(documents.contains(&"Marksheet".to_string()));

        let qualifications = extract_qualifications(text);
        assert!(qualifications.contains(&"10th Pass".to_string()));
        assert!(qualifications.contains(&"Graduate".to_string()));
    }

    #[test]
    fn link_partition_buckets_official_and_pdf() {
        let links = vec![
            "https://ssc.nic.in/notice.pdf".to_string(),
            "https://sarkariresult.com/cgl".to_string(),
            "https://pmkisan.gov.in/apply".to_string(),
        ];
        let (official, pdfs) = partition_links(&links);
        assert_eq!(official.len(), 2);
        assert_eq!(pdfs, vec!["https://ssc.nic.in/notice.pdf".to_string()]);
    }

    #[test]
    fn department_detection_matches_known_bodies() {
        let text = "Recruitment by Staff Selection Commission under Ministry of Home Affairs";
        assert_eq!(
            detect_department(text).as_deref(),
            Some("Staff Selection Commission")
        );
    }
}
