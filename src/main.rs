mod advertisers;
mod api;
mod browser;
mod cards;
mod enrich;
mod output;
mod progress;
mod scrape;
mod util;

use anyhow::Result;
use axum::{routing::post, Router};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::progress::LogProgress;
use crate::scrape::{run_scrape, ScrapeConfig};

#[derive(OpenApi)]
#[openapi(
    paths(api::trigger_scrape),
    components(schemas(
        api::ScrapeRequest,
        api::ScrapeResponse,
        api::KeywordsInput,
        crate::advertisers::Advertiser,
        crate::advertisers::Contact
    )),
    tags(
        (name = "scraper", description = "Ads Library Scraper API")
    )
)]
struct ApiDoc;

#[derive(Parser)]
#[command(
    name = "ads-library-scraper",
    about = "Scrape long-running advertisers from the Facebook Ads Library"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scrape and write CSV/JSON results
    Scrape(ScrapeArgs),
    /// Serve the HTTP API and dashboard
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Args)]
struct ScrapeArgs {
    /// Comma-separated list of keywords to search (e.g. "home painter, Benjamin Moore")
    #[arg(long)]
    keywords: String,

    /// Country code for the Ads Library filter
    #[arg(long, default_value = "US")]
    country: String,

    /// Minimum months the ad has been running
    #[arg(long, default_value_t = 3)]
    min_months: u32,

    /// Maximum number of ad cards to inspect per keyword
    #[arg(long, default_value_t = 100)]
    limit: usize,

    /// Run the browser in headless mode
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    headless: bool,

    /// Navigation and action timeout (ms)
    #[arg(long, default_value_t = 30_000)]
    timeout: u64,

    /// Output directory
    #[arg(long, default_value = "output")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    match Cli::parse().command {
        Command::Scrape(args) => scrape_to_files(args).await,
        Command::Serve { port } => serve(port).await,
    }
}

async fn scrape_to_files(args: ScrapeArgs) -> Result<()> {
    let keywords: Vec<String> = args
        .keywords
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    anyhow::ensure!(!keywords.is_empty(), "no keywords given");

    let config = ScrapeConfig {
        keywords,
        country: args.country,
        min_months: args.min_months,
        limit_per_keyword: args.limit,
        headless: args.headless,
        timeout_ms: args.timeout,
        out_dir: args.out.clone(),
    };

    let results = run_scrape(&config, &LogProgress).await?;
    let paths = output::write_csv_and_json(&results, &args.out)?;

    println!(
        "Finished. Found {} advertisers matching the criteria.",
        results.len()
    );
    println!(
        "Results: {} and {}",
        paths.json_path.display(),
        paths.csv_path.display()
    );
    Ok(())
}

async fn serve(port: u16) -> Result<()> {
    let state = Arc::new(api::AppState {
        scrape_lock: tokio::sync::Mutex::new(()),
    });

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/scrape", post(api::trigger_scrape))
        .nest_service("/", ServeDir::new("public")) // Serve dashboard
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    println!("UI available at http://localhost:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
