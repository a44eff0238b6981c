//! HTTP surface: one scrape endpoint plus the shared state that serializes
//! browser sessions (the target is sensitive to concurrent automation, so
//! requests queue behind a single session).

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;
use utoipa::ToSchema;

use crate::advertisers::Advertiser;
use crate::progress::LogProgress;
use crate::scrape::{run_scrape, ScrapeConfig};

pub struct AppState {
    pub scrape_lock: Mutex<()>,
}

/// Keywords arrive either as a JSON array or as one comma-separated string.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum KeywordsInput {
    List(Vec<String>),
    Joined(String),
}

impl KeywordsInput {
    pub fn into_list(self) -> Vec<String> {
        let raw = match self {
            KeywordsInput::List(list) => list,
            KeywordsInput::Joined(joined) => {
                joined.split(',').map(|s| s.to_string()).collect()
            }
        };
        raw.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub keywords: Option<KeywordsInput>,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_min_months")]
    pub min_months: u32,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_country() -> String {
    "US".to_string()
}
fn default_min_months() -> u32 {
    3
}
fn default_limit() -> usize {
    100
}
fn default_headless() -> bool {
    true
}
fn default_timeout() -> u64 {
    30_000
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScrapeResponse {
    pub count: usize,
    pub results: Vec<Advertiser>,
}

#[utoipa::path(
    post,
    path = "/api/scrape",
    request_body = ScrapeRequest,
    responses(
        (status = 200, description = "Scrape finished", body = ScrapeResponse),
        (status = 400, description = "Missing keywords"),
        (status = 500, description = "Browser session failed"),
    ),
    tag = "scraper"
)]
pub async fn trigger_scrape(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScrapeRequest>,
) -> Result<Json<ScrapeResponse>, (StatusCode, String)> {
    let keywords = request
        .keywords
        .map(KeywordsInput::into_list)
        .unwrap_or_default();
    if keywords.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Missing keywords".to_string()));
    }

    let config = ScrapeConfig {
        keywords,
        country: request.country,
        min_months: request.min_months,
        limit_per_keyword: request.limit,
        headless: request.headless,
        timeout_ms: request.timeout,
        out_dir: PathBuf::from("output"),
    };

    let _session_guard = state.scrape_lock.lock().await;
    match run_scrape(&config, &LogProgress).await {
        Ok(results) => Ok(Json(ScrapeResponse {
            count: results.len(),
            results,
        })),
        Err(err) => {
            error!("scrape failed: {err:#}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Scrape failed: {err:#}"),
            ))
        }
    }
}
