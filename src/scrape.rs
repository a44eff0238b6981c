//! Scrape orchestration: keyword iteration, card folding and the enrichment
//! pass, all over one browser page reused sequentially. Nothing in here
//! aborts the run for a single keyword or advertiser; the run always
//! completes with whatever was successfully built.

use anyhow::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::advertisers::{Advertiser, AdvertiserBook};
use crate::browser::{auto_scroll, dismiss_overlays, ChromeSession, PageDriver, ScrollOptions};
use crate::cards::extract_ad_cards;
use crate::enrich::enrich_page_details;
use crate::progress::Progress;
use crate::util::months_between;

pub const ADS_LIBRARY_BASE: &str = "https://www.facebook.com/ads/library/";

const NAVIGATION_SETTLE_MS: u64 = 1500;
const NETWORK_SETTLE_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub keywords: Vec<String>,
    pub country: String,
    pub min_months: u32,
    pub limit_per_keyword: usize,
    pub headless: bool,
    pub timeout_ms: u64,
    pub out_dir: PathBuf,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            country: "US".to_string(),
            min_months: 3,
            limit_per_keyword: 100,
            headless: true,
            timeout_ms: 30_000,
            out_dir: PathBuf::from("output"),
        }
    }
}

pub fn search_url_for(keyword: &str, country: &str) -> String {
    format!(
        "{ADS_LIBRARY_BASE}?active_status=active&ad_type=all&country={}&q={}&sort_data[mode]=relevancy_monthly_grouped&sort_data[direction]=desc",
        urlencoding::encode(country),
        urlencoding::encode(keyword),
    )
}

/// Launch a session and run one full scrape. The browser closes when the
/// session drops, before this returns.
pub async fn run_scrape(config: &ScrapeConfig, progress: &dyn Progress) -> Result<Vec<Advertiser>> {
    info!(headless = config.headless, "launching browser");
    let mut session = ChromeSession::launch(config.headless, config.timeout_ms)?;
    let advertisers = scrape_advertisers(&mut session, config, progress).await?;
    info!(count = advertisers.len(), "scrape completed");
    Ok(advertisers)
}

pub async fn scrape_advertisers<P: PageDriver>(
    page: &mut P,
    config: &ScrapeConfig,
    progress: &dyn Progress,
) -> Result<Vec<Advertiser>> {
    let mut book = AdvertiserBook::default();
    let today = Utc::now().date_naive();

    for keyword in &config.keywords {
        let url = search_url_for(keyword, &config.country);
        info!(%keyword, %url, "searching ads library");
        if let Err(err) = page.navigate(&url) {
            warn!(%keyword, "navigation error (continuing): {err:#}");
        }
        sleep(Duration::from_millis(NAVIGATION_SETTLE_MS)).await;
        dismiss_overlays(page);
        sleep(Duration::from_millis(NETWORK_SETTLE_MS)).await;

        auto_scroll(page, &ScrollOptions::for_limit(config.limit_per_keyword)).await;
        let mut cards = extract_ad_cards(&page.content().unwrap_or_default());

        if cards.is_empty() {
            info!(%keyword, "no cards detected by text, retrying after overlay dismiss and a short scroll");
            dismiss_overlays(page);
            auto_scroll(page, &ScrollOptions::fallback()).await;
            cards = extract_ad_cards(&page.content().unwrap_or_default());
            if cards.is_empty() {
                save_debug_snapshot(page, keyword, &config.out_dir);
            }
        }

        let inspect_count = cards.len().min(config.limit_per_keyword);
        info!(found = cards.len(), inspect = inspect_count, %keyword, "ad cards located");

        for (index, card) in cards.into_iter().take(config.limit_per_keyword).enumerate() {
            let (Some(page_url), Some(page_name), Some(started_at)) =
                (card.page_url, card.page_name, card.started_at)
            else {
                continue;
            };
            let months = months_between(started_at, today);
            if months < config.min_months {
                continue;
            }
            let verb = if book.record(&page_url, &page_name, months, keyword) {
                "Added"
            } else {
                "Updated"
            };
            progress.line(&format!(
                "[{}/{inspect_count}] {verb} advertiser: {page_name} ({months} months)",
                index + 1
            ));
        }
    }

    let mut advertisers = book.into_advertisers();
    let total = advertisers.len();
    info!(total, "unique advertisers to enrich");

    for (index, advertiser) in advertisers.iter_mut().enumerate() {
        progress.line(&format!(
            "[Enrich {}/{total}] Visiting page: {}",
            index + 1,
            advertiser.facebook_page_url
        ));
        let details = enrich_page_details(page, &advertiser.facebook_page_url).await;
        advertiser.followers = advertiser.followers.or(details.followers);
        advertiser.contact.phone = advertiser.contact.phone.take().or(details.phone);
        advertiser.contact.email = advertiser.contact.email.take().or(details.email);
        advertiser.contact.address = advertiser.contact.address.take().or(details.address);
        progress.line(&format!(
            "[Enrich {}/{total}] Done: followers={}",
            index + 1,
            advertiser
                .followers
                .map_or_else(|| "n/a".to_string(), |f| f.to_string())
        ));
    }

    Ok(advertisers)
}

/// Keep the raw markup and a full-page screenshot around when a keyword
/// yielded nothing, so the markup drift can be diagnosed after the run.
fn save_debug_snapshot<P: PageDriver>(page: &mut P, keyword: &str, out_dir: &Path) {
    if let Err(err) = std::fs::create_dir_all(out_dir) {
        warn!("could not create output dir for debug snapshot: {err:#}");
        return;
    }
    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
    let mut safe_keyword: String = keyword
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .take(40)
        .collect();
    if safe_keyword.is_empty() {
        safe_keyword.push_str("kw");
    }
    let html_path = out_dir.join(format!("debug-{safe_keyword}-{timestamp}.html"));
    let png_path = out_dir.join(format!("debug-{safe_keyword}-{timestamp}.png"));
    if let Ok(html) = page.content() {
        let _ = std::fs::write(&html_path, html);
    }
    match page.screenshot(&png_path) {
        Ok(()) => info!(html = %html_path.display(), png = %png_path.display(), "saved debug snapshot"),
        Err(err) => warn!("debug screenshot failed: {err:#}"),
    }
}
