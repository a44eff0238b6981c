//! Contact and follower enrichment: visit an advertiser's page and its
//! "about" variants in a fixed order until the wanted fields are found.
//!
//! The phone and address patterns are US-centric heuristics over raw markup;
//! they can over- or under-match depending on how a page renders its
//! contact block.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::browser::{dismiss_overlays, PageDriver};
use crate::util::{first_some, normalize_page_url};

const CANDIDATE_SETTLE_MS: u64 = 1200;

static FOLLOWERS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d[\d,.]*\s*[km]?)\s*followers").unwrap());

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").unwrap());

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?1?\s*\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}").unwrap());

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\d{2,6}[^\n<]{0,40}\b(?:St|Street|Ave|Avenue|Rd|Road|Blvd|Boulevard|Dr|Drive|Ct|Court)\b[^<\n]{0,80}",
    )
    .unwrap()
});

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Fields mined from one advertiser's pages. Each field is filled at most
/// once across the candidate visits; earlier candidates win.
#[derive(Debug, Clone, Default)]
pub struct PageDetails {
    pub followers: Option<u64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl PageDetails {
    pub fn has_contact(&self) -> bool {
        self.email.is_some() || self.phone.is_some() || self.address.is_some()
    }
}

/// The page itself, then the three "about" variants, in that order.
pub fn candidate_about_urls(page_url: &str) -> Vec<String> {
    let base = normalize_page_url(page_url);
    vec![
        base.clone(),
        format!("{base}/about"),
        format!("{base}/about_contact_and_basic_info"),
        format!("{base}/about_profile_transparency"),
    ]
}

/// Visit the candidate URLs in order, filling still-unset fields from each.
/// Navigation or snapshot failures skip to the next candidate. Stops early
/// once followers is known and at least one contact field is known.
pub async fn enrich_page_details<P: PageDriver>(page: &mut P, page_url: &str) -> PageDetails {
    let mut details = PageDetails::default();

    for url in candidate_about_urls(page_url) {
        if let Err(err) = page.navigate(&url) {
            debug!(%url, "candidate navigation failed (trying next): {err:#}");
            continue;
        }
        sleep(Duration::from_millis(CANDIDATE_SETTLE_MS)).await;
        dismiss_overlays(page);

        let html = match page.content() {
            Ok(html) => html,
            Err(err) => {
                debug!(%url, "could not snapshot candidate (trying next): {err:#}");
                continue;
            }
        };

        if details.followers.is_none() {
            details.followers = extract_followers(&html);
        }
        fill_missing_contact(&mut details, &html);

        if details.followers.is_some() && details.has_contact() {
            break;
        }
    }

    details
}

/// Look for a "<number> followers" disclosure, first in individual text
/// nodes, then in span elements whose pieces only join up as rendered text.
pub fn extract_followers(html: &str) -> Option<u64> {
    let document = Html::parse_document(html);
    let strategies = [
        followers_from_text_nodes as fn(&Html) -> Option<u64>,
        followers_from_spans,
    ];
    first_some(strategies.iter().map(|strategy| strategy(&document)))
}

fn followers_from_text_nodes(document: &Html) -> Option<u64> {
    document.tree.root().descendants().find_map(|node| {
        let text: &str = match node.value() {
            Node::Text(text) => &text.text,
            _ => return None,
        };
        followers_in(text)
    })
}

fn followers_from_spans(document: &Html) -> Option<u64> {
    let span_selector = Selector::parse("span").unwrap();
    document
        .select(&span_selector)
        .find_map(|span| followers_in(&span.text().collect::<String>()))
}

fn followers_in(text: &str) -> Option<u64> {
    let captures = FOLLOWERS_RE.captures(text)?;
    parse_follower_count(&captures[1])
}

/// Parse a follower figure honoring thousands separators and k/m suffixes
/// (×1,000 / ×1,000,000, rounded).
pub fn parse_follower_count(raw: &str) -> Option<u64> {
    let normalized = raw.trim().to_lowercase().replace(',', "");
    if let Some(number) = normalized.strip_suffix('k') {
        return Some((number.trim().parse::<f64>().ok()? * 1_000.0).round() as u64);
    }
    if let Some(number) = normalized.strip_suffix('m') {
        return Some((number.trim().parse::<f64>().ok()? * 1_000_000.0).round() as u64);
    }
    let digits: String = normalized
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Fill only the fields still unset; each pattern is independent.
fn fill_missing_contact(details: &mut PageDetails, html: &str) {
    if details.email.is_none() {
        details.email = EMAIL_RE.find(html).map(|m| m.as_str().to_string());
    }
    if details.phone.is_none() {
        details.phone = PHONE_RE.find(html).map(|m| m.as_str().to_string());
    }
    if details.address.is_none() {
        details.address = ADDRESS_RE
            .find(html)
            .map(|m| TAG_RE.replace_all(m.as_str(), "").trim().to_string());
    }
}
