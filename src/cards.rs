//! Ad-card discovery and field extraction over a rendered-page snapshot.
//!
//! Cards have no stable markup, so discovery anchors on the start-date
//! disclosure phrase and climbs a bounded number of ancestors to approximate
//! the card container. Containers may overlap or duplicate; deduplication
//! happens later, keyed by advertiser identity.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::util::first_some;

/// Element ancestors climbed from the disclosure text to the assumed card
/// container. Too few clips the card, too many merges neighbouring cards.
pub const CARD_ANCESTOR_LEVELS: usize = 6;

static AD_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ad\s+started\s+running\s+on").unwrap());

static AD_START_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)ad\s+started\s+running\s+on\s+([A-Za-z]+\s+\d{1,2},\s+\d{4})").unwrap()
});

// Page links look like https://www.facebook.com/<slug> or a bare /<slug>.
static PAGE_SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/[A-Za-z0-9_.-]+/?$").unwrap());

/// One detected card. Any field can be missing; records with a missing field
/// are dropped by the orchestrator, not here.
#[derive(Debug, Clone, Default)]
pub struct AdCard {
    pub page_url: Option<String>,
    pub page_name: Option<String>,
    pub started_at: Option<NaiveDate>,
}

pub fn extract_ad_cards(html: &str) -> Vec<AdCard> {
    let document = Html::parse_document(html);
    locate_card_containers(&document)
        .into_iter()
        .map(|container| parse_ad_card(&container))
        .collect()
}

/// Find every text node carrying the disclosure phrase and climb to its
/// approximate card container.
fn locate_card_containers(document: &Html) -> Vec<ElementRef<'_>> {
    let mut containers = Vec::new();
    for node in document.tree.root().descendants() {
        let text: &str = match node.value() {
            Node::Text(text) => &text.text,
            _ => continue,
        };
        if !AD_START_RE.is_match(text) {
            continue;
        }
        let Some(mut current) = node.parent().filter(|p| p.value().is_element()) else {
            continue;
        };
        for _ in 0..CARD_ANCESTOR_LEVELS {
            match current.parent() {
                Some(parent) if parent.value().is_element() => current = parent,
                _ => break,
            }
        }
        if let Some(container) = ElementRef::wrap(current) {
            containers.push(container);
        }
    }
    containers
}

fn parse_ad_card(container: &ElementRef<'_>) -> AdCard {
    let anchor_selector = Selector::parse("a").unwrap();
    let title_selector = Selector::parse(r#"strong, h3, h4, a[role="link"] span"#).unwrap();

    let page_url = first_some(
        container
            .select(&anchor_selector)
            .map(|anchor| page_url_from_anchor(&anchor)),
    );

    let page_name = container
        .select(&title_selector)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty());

    let started_at = first_some(container.text().map(parse_started_at));

    AdCard {
        page_url,
        page_name,
        started_at,
    }
}

fn page_url_from_anchor(anchor: &ElementRef<'_>) -> Option<String> {
    let href = anchor.value().attr("href")?;
    // The listing itself is full of ads/library links; those are never pages.
    if href.contains("ads/library") {
        return None;
    }
    if href.contains("facebook.com/") || PAGE_SLUG_RE.is_match(href) {
        if href.starts_with("http") {
            Some(href.to_string())
        } else {
            Some(format!("https://www.facebook.com{href}"))
        }
    } else {
        None
    }
}

fn parse_started_at(text: &str) -> Option<NaiveDate> {
    let captures = AD_START_DATE_RE.captures(text)?;
    NaiveDate::parse_from_str(captures[1].trim(), "%B %d, %Y").ok()
}
