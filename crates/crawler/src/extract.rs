//! HTML content extraction with per-domain selector profiles.
//!
//! Government portals, job aggregators and everything else get different
//! content-container selectors; noise tags are stripped from the text in
//! all cases.

use std::collections::{HashMap, HashSet};

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Tags whose text never belongs in extracted content.
const STRIP_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "aside", "noscript"];

/// Link text markers worth keeping (apply/download/result/… and Hindi forms).
const LINK_KEYWORDS: &[&str] = &[
    "apply", "download", "result", "notification", "official", "pdf", "आवेदन", "डाउनलोड",
];

/// Extracted page content cap, in characters.
pub const MAX_CONTENT_CHARS: usize = 10_000;

const SNIPPET_CHARS: usize = 300;
const MAX_LINKS: usize = 10;

struct DomainProfile {
    title: &'static [&'static str],
    content: &'static [&'static str],
    date: &'static [&'static str],
}

const GOV_PROFILE: DomainProfile = DomainProfile {
    title: &["h1", ".page-title", "#page-title", "title"],
    content: &[".content-area", "#content", "main", ".main-content", "article"],
    date: &[".date", ".last-updated", "time"],
};

const AGGREGATOR_PROFILE: DomainProfile = DomainProfile {
    title: &["h1", ".post-title"],
    content: &[".job-info", ".post-content", "article"],
    date: &[".date"],
};

const DEFAULT_PROFILE: DomainProfile = DomainProfile {
    title: &["h1", "title", ".page-title", "#title"],
    content: &["article", "main", ".content", "#content", ".post-content", "body"],
    date: &[".date", ".published", "time", ".post-date"],
};

fn profile_for(domain: &str) -> &'static DomainProfile {
    let domain = domain.to_lowercase();
    if domain.ends_with(".gov.in") || domain.ends_with(".nic.in") {
        &GOV_PROFILE
    } else if domain.contains("sarkari") {
        &AGGREGATOR_PROFILE
    } else {
        &DEFAULT_PROFILE
    }
}

/// The structured pieces pulled out of one HTML document.
#[derive(Debug, Default)]
pub struct Extracted {
    pub title: String,
    pub content: String,
    pub snippet: String,
    pub links: Vec<String>,
    pub metadata: HashMap<String, String>,
}

/// Parse `html` and extract title, cleaned content, snippet, action links
/// and metadata according to the domain's profile.
pub fn extract_content(html: &str, url: &Url) -> Extracted {
    let doc = Html::parse_document(html);
    let domain = url.host_str().unwrap_or_default();
    let profile = profile_for(domain);

    let mut extracted = Extracted::default();

    // Title: first matching profile selector, then <title>.
    for sel_str in profile.title.iter().copied().chain(std::iter::once("title")) {
        if let Ok(sel) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&sel).next() {
                let title = collapse_whitespace(&element_text(el));
                if !title.is_empty() {
                    extracted.title = title;
                    break;
                }
            }
        }
    }

    // Content: first non-trivial profile container, whole document as a
    // last resort.
    for &sel_str in profile.content {
        if let Ok(sel) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&sel).next() {
                let text = collapse_whitespace(&element_text(el));
                if text.len() >= 40 {
                    extracted.content = text;
                    break;
                }
            }
        }
    }
    if extracted.content.is_empty() {
        extracted.content = collapse_whitespace(&element_text(doc.root_element()));
    }
    extracted.content = truncate_chars(&extracted.content, MAX_CONTENT_CHARS);

    extracted.snippet = if extracted.content.chars().count() > SNIPPET_CHARS {
        format!("{}...", truncate_chars(&extracted.content, SNIPPET_CHARS))
    } else {
        extracted.content.clone()
    };

    extracted.links = action_links(&doc, url);

    // Dates and the meta description travel in the metadata map.
    for &sel_str in profile.date {
        if let Ok(sel) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&sel).next() {
                let date = collapse_whitespace(&element_text(el));
                if !date.is_empty() {
                    extracted.metadata.insert("date".to_string(), date);
                    break;
                }
            }
        }
    }
    if let Ok(sel) = Selector::parse("meta[name=\"description\"]") {
        if let Some(el) = doc.select(&sel).next() {
            if let Some(content) = el.value().attr("content") {
                let content = content.trim();
                if !content.is_empty() {
                    extracted
                        .metadata
                        .insert("meta_description".to_string(), content.to_string());
                }
            }
        }
    }

    extracted
}

/// Hyperlinks whose text suggests an action (apply/download/…), resolved
/// to absolute URLs, deduplicated, capped at [`MAX_LINKS`].
fn action_links(doc: &Html, base: &Url) -> Vec<String> {
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for el in doc.select(&sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let text: String = el.text().collect::<String>().to_lowercase();
        if !LINK_KEYWORDS.iter().any(|kw| text.contains(kw)) {
            continue;
        }
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        let resolved = resolved.to_string();
        if resolved.starts_with("http") && seen.insert(resolved.clone()) {
            links.push(resolved);
            if links.len() >= MAX_LINKS {
                break;
            }
        }
    }
    links
}

/// Text of an element subtree with noise-tag subtrees skipped.
fn element_text(root: ElementRef<'_>) -> String {
    let root_id = root.id();
    let mut out = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let mut noisy = false;
        for ancestor in node.ancestors() {
            if ancestor.id() == root_id {
                break;
            }
            if let Some(el) = ancestor.value().as_element() {
                if STRIP_TAGS.contains(&el.name()) {
                    noisy = true;
                    break;
                }
            }
        }
        if !noisy {
            out.push_str(&text.text);
            out.push(' ');
        }
    }
    out
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://ssc.nic.in/portal/cgl").unwrap()
    }

    #[test]
    fn scripts_and_nav_are_stripped() {
        let html = r#"<html><head><title>SSC CGL</title></head><body>
            <nav>Home | About | Contact</nav>
            <script>var tracker = "noise";</script>
            <main>SSC CGL 2026 notification released. Apply online before the last date.</main>
            <footer>Copyright</footer>
        </body></html>"#;
        let extracted = extract_content(html, &base());
        assert!(extracted.content.contains("notification released"));
        assert!(!extracted.content.contains("tracker"));
        assert!(!extracted.content.contains("Home | About"));
    }

    #[test]
    fn gov_profile_prefers_content_area() {
        let html = r#"<html><body>
            <div class="content-area">Recruitment of Combined Graduate Level posts, apply by 21 July.</div>
            <div class="other">unrelated sidebar text that is long enough to qualify as content</div>
        </body></html>"#;
        let extracted = extract_content(html, &base());
        assert!(extracted.content.starts_with("Recruitment of Combined"));
    }

    #[test]
    fn title_falls_back_to_title_tag() {
        let html = "<html><head><title>Result Portal</title></head><body><p>text</p></body></html>";
        let extracted = extract_content(html, &base());
        assert_eq!(extracted.title, "Result Portal");
    }

    #[test]
    fn action_links_are_resolved_filtered_and_capped() {
        let mut anchors = String::new();
        for i in 0..20 {
            anchors.push_str(&format!("<a href=\"/download/{i}\">Download notice {i}</a>"));
        }
        let html = format!(
            r#"<html><body>
                <a href="/apply">Apply Online</a>
                <a href="/about">About us</a>
                {anchors}
            </body></html>"#
        );
        let extracted = extract_content(&html, &base());
        assert!(extracted.links.contains(&"https://ssc.nic.in/apply".to_string()));
        assert!(!extracted.links.iter().any(|l| l.ends_with("/about")));
        assert_eq!(extracted.links.len(), 10);
    }

    #[test]
    fn meta_description_and_date_land_in_metadata() {
        let html = r#"<html><head>
            <meta name="description" content="Official CGL portal">
        </head><body>
            <span class="date">12 July 2026</span>
            <main>Some page body content that is definitely long enough.</main>
        </body></html>"#;
        let extracted = extract_content(html, &base());
        assert_eq!(extracted.metadata.get("meta_description").unwrap(), "Official CGL portal");
        assert_eq!(extracted.metadata.get("date").unwrap(), "12 July 2026");
    }

    #[test]
    fn snippet_is_a_bounded_prefix() {
        let body = "word ".repeat(200);
        let html = format!("<html><body><main>{body}</main></body></html>");
        let extracted = extract_content(&html, &base());
        assert!(extracted.snippet.chars().count() <= SNIPPET_CHARS + 3);
        assert!(extracted.snippet.ends_with("..."));
    }

    #[test]
    fn truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("अंतिम तिथि", 5), "अंतिम");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
