//! Browser plumbing: session launch, the page capability the scraping core
//! consumes, and the shared overlay-dismiss / scroll-to-load behaviours.

use anyhow::Result;
use headless_chrome::{Browser, LaunchOptions};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use serde_json::Value;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

static USER_AGENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    ]
});

/// The page capability the scraping core needs from the automation engine:
/// navigation, read-only script evaluation, a markup snapshot and a
/// full-page screenshot. Scroll probes and overlay clicks are built on
/// `evaluate`, so extraction logic never touches engine types directly.
pub trait PageDriver {
    fn navigate(&mut self, url: &str) -> Result<()>;
    fn evaluate(&mut self, script: &str) -> Result<Value>;
    fn content(&mut self) -> Result<String>;
    fn screenshot(&mut self, path: &Path) -> Result<()>;
}

/// One launched Chrome with a single tab, reused sequentially for every
/// keyword search and enrichment visit in a run.
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<headless_chrome::Tab>,
}

impl ChromeSession {
    pub fn launch(headless: bool, timeout_ms: u64) -> Result<Self> {
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36");
        let ua_arg = format!("--user-agent={user_agent}");

        let mut args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-infobars"),
            OsStr::new("--disable-notifications"),
            OsStr::new("--ignore-certificate-errors"),
        ];
        args.push(OsStr::new(&ua_arg));
        if headless {
            args.push(OsStr::new("--headless=new"));
        }

        let browser = Browser::new(LaunchOptions {
            headless: false, // modern headless goes through --headless=new above
            window_size: Some((1440, 900)),
            args,
            ..Default::default()
        })?;

        let tab = browser.new_tab()?;
        tab.set_default_timeout(Duration::from_millis(timeout_ms));

        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

impl PageDriver for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab.navigate_to(url)?;
        self.tab.wait_until_navigated()?;
        Ok(())
    }

    fn evaluate(&mut self, script: &str) -> Result<Value> {
        Ok(self.tab.evaluate(script, false)?.value.unwrap_or(Value::Null))
    }

    fn content(&mut self) -> Result<String> {
        Ok(self.tab.get_content()?)
    }

    fn screenshot(&mut self, path: &Path) -> Result<()> {
        let png = self.tab.capture_screenshot(
            headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption::Png,
            None,
            None,
            true,
        )?;
        std::fs::write(path, png)?;
        Ok(())
    }
}

/// Ordered overlay matchers: scope selector + button label. Tried top to
/// bottom, every attempt independently best-effort; none is required to
/// exist.
const OVERLAY_BUTTONS: &[(&str, &str)] = &[
    ("button", "Allow all cookies"),
    ("button", "Accept All Cookies"),
    ("button", "Accept all"),
    ("button", "Accept"),
    ("button", "Only allow essential cookies"),
    ("button", "Essential cookies only"),
    ("button", "Continue"),
    ("button", "Not Now"),
    (r#"div[role="dialog"] button"#, "OK"),
];

pub fn dismiss_overlays<P: PageDriver>(page: &mut P) {
    for &(scope, label) in OVERLAY_BUTTONS {
        let script = format!(
            r#"(() => {{
                const candidates = Array.from(document.querySelectorAll('{scope}'));
                const button = candidates.find(el => (el.textContent || '').trim().includes('{label}'));
                if (button && button.offsetParent !== null) {{ button.click(); return true; }}
                return false;
            }})();"#
        );
        match page.evaluate(&script) {
            Ok(Value::Bool(true)) => debug!(label, "dismissed overlay"),
            Ok(_) => {}
            Err(err) => debug!(label, "overlay probe failed (ignored): {err:#}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrollOptions {
    pub max_scrolls: usize,
    pub delay: Duration,
}

impl ScrollOptions {
    /// Scroll budget for a keyword search, derived from how many cards the
    /// caller wants to inspect.
    pub fn for_limit(limit: usize) -> Self {
        Self {
            max_scrolls: limit.div_ceil(10).max(10),
            delay: Duration::from_millis(800),
        }
    }

    /// Shorter retry pass used when the first round surfaced nothing.
    pub fn fallback() -> Self {
        Self {
            max_scrolls: 8,
            delay: Duration::from_millis(700),
        }
    }
}

/// Scroll-and-settle until the document stops growing or the bound is hit.
/// Probe failures degrade to "height unchanged", so a flaky page ends the
/// loop instead of aborting the keyword.
pub async fn auto_scroll<P: PageDriver>(page: &mut P, options: &ScrollOptions) {
    let mut previous_height = 0i64;
    for _ in 0..options.max_scrolls {
        let _ = page.evaluate("window.scrollBy(0, window.innerHeight * 0.9);");
        sleep(options.delay).await;
        let current_height = page
            .evaluate("document.body.scrollHeight")
            .ok()
            .and_then(|value| value.as_i64())
            .unwrap_or(previous_height);
        if current_height == previous_height {
            break;
        }
        previous_height = current_height;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::PageDriver;
    use anyhow::{anyhow, Result};
    use serde_json::{json, Value};
    use std::collections::{HashMap, HashSet};
    use std::path::{Path, PathBuf};

    /// Scripted in-memory page: maps URLs to markup, replays a height
    /// sequence for scroll probes, and records navigations/screenshots.
    #[derive(Default)]
    pub struct FakePage {
        pub pages: HashMap<String, String>,
        pub failing_urls: HashSet<String>,
        pub heights: Vec<i64>,
        pub height_cursor: usize,
        pub navigations: Vec<String>,
        pub screenshots: Vec<PathBuf>,
        pub current: Option<String>,
    }

    impl FakePage {
        pub fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }
    }

    impl PageDriver for FakePage {
        fn navigate(&mut self, url: &str) -> Result<()> {
            self.navigations.push(url.to_string());
            if self.failing_urls.contains(url) {
                return Err(anyhow!("navigation refused: {url}"));
            }
            self.current = Some(url.to_string());
            Ok(())
        }

        fn evaluate(&mut self, script: &str) -> Result<Value> {
            if script.contains("scrollHeight") {
                let height = self
                    .heights
                    .get(self.height_cursor)
                    .copied()
                    .unwrap_or_else(|| self.heights.last().copied().unwrap_or(0));
                self.height_cursor += 1;
                return Ok(json!(height));
            }
            Ok(Value::Null)
        }

        fn content(&mut self) -> Result<String> {
            let current = self
                .current
                .as_ref()
                .ok_or_else(|| anyhow!("no page loaded"))?;
            Ok(self.pages.get(current).cloned().unwrap_or_default())
        }

        fn screenshot(&mut self, path: &Path) -> Result<()> {
            self.screenshots.push(path.to_path_buf());
            Ok(())
        }
    }
}
