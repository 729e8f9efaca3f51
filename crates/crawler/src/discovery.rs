//! Free URL discovery via the DuckDuckGo HTML endpoint.  No key, no
//! quota; result URLs arrive wrapped in redirect links and are unwrapped
//! before use.

use anyhow::Result;
use percent_encoding::percent_decode_str;
use sahayak_types::WebHit;
use scraper::{Html, Selector};
use tracing::debug;

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Search the web and return up to `max` `{title, url, snippet}` records.
pub async fn search_web(
    client: &reqwest::Client,
    query: &str,
    max: usize,
) -> Result<Vec<WebHit>> {
    let resp = client
        .post(ENDPOINT)
        .form(&[("q", query)])
        .header("Accept", "text/html")
        .send()
        .await?;

    if !resp.status().is_success() {
        anyhow::bail!("discovery backend error: {}", resp.status());
    }

    let body = resp.text().await?;

    // Html is !Send, scope it.
    let hits = {
        let doc = Html::parse_document(&body);
        let result_sel = Selector::parse(".result").expect("result selector");
        let link_sel = Selector::parse("a.result__a").expect("link selector");
        let snippet_sel = Selector::parse(".result__snippet").expect("snippet selector");

        let mut hits = Vec::new();
        for result in doc.select(&result_sel) {
            let Some(anchor) = result.select(&link_sel).next() else {
                continue;
            };
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let url = unwrap_redirect(href);
            if !url.starts_with("http") {
                continue;
            }

            let title: String = anchor.text().collect::<String>().trim().to_string();
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            hits.push(WebHit { title, url, snippet });
            if hits.len() >= max {
                break;
            }
        }
        hits
    };

    debug!(count = hits.len(), query, "discovery results");
    Ok(hits)
}

/// DuckDuckGo wraps result URLs in `uddg=`-style redirects; pull out and
/// decode the real target.
pub(crate) fn unwrap_redirect(href: &str) -> String {
    if let Some(pos) = href.find("uddg=") {
        let start = pos + 5;
        let end = href[start..]
            .find('&')
            .map(|i| start + i)
            .unwrap_or(href.len());
        let encoded = &href[start..end];
        if !encoded.is_empty() {
            return percent_decode_str(encoded).decode_utf8_lossy().into_owned();
        }
    }
    href.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_urls_are_unwrapped_and_decoded() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fssc.nic.in%2Fportal&rut=abc";
        assert_eq!(unwrap_redirect(href), "https://ssc.nic.in/portal");
    }

    #[test]
    fn plain_urls_pass_through() {
        assert_eq!(unwrap_redirect("https://india.gov.in"), "https://india.gov.in");
    }
}
