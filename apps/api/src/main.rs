mod applications;
mod auth;
mod config;
mod dashboard;
mod db;
mod errors;
mod favorites;
mod listings;
mod llm_client;
mod matching;
mod models;
mod notifications;
mod profiles;
mod routes;
mod state;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::matching::cache::{connect_redis, MatchScoreCache};
use crate::matching::llm::LlmMatchScorer;
use crate::matching::scorer::{KeywordMatchScorer, MatchScorer};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hireboard API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let match_cache = build_match_cache(&config).await;

    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    let match_scorer = build_match_scorer(&config)?;
    info!("Match scorer: {}", match_scorer.backend());

    let state = AppState {
        db,
        s3,
        config: config.clone(),
        match_scorer,
        match_cache,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Redis being down only costs cache hits, so startup continues without it.
async fn build_match_cache(config: &Config) -> MatchScoreCache {
    if config.match_cache_ttl_secs == 0 {
        info!("Match score cache disabled (TTL 0)");
        return MatchScoreCache::disabled();
    }
    match connect_redis(&config.redis_url).await {
        Ok(conn) => {
            info!(
                ttl_secs = config.match_cache_ttl_secs,
                "Match score cache initialized"
            );
            MatchScoreCache::new(conn, config.match_cache_ttl_secs)
        }
        Err(e) => {
            warn!("Redis unavailable, match score cache disabled: {e}");
            MatchScoreCache::disabled()
        }
    }
}

/// Keyword scoring unless LLM summaries are switched on.
fn build_match_scorer(config: &Config) -> Result<Arc<dyn MatchScorer>> {
    match (&config.anthropic_api_key, config.enable_llm_match_summary) {
        (Some(key), true) => {
            let client = LlmClient::new(key.clone()).context("Failed to build LLM client")?;
            info!("LLM match summaries enabled (model: {})", llm_client::MODEL);
            Ok(Arc::new(LlmMatchScorer(client)))
        }
        _ => Ok(Arc::new(KeywordMatchScorer)),
    }
}

/// S3 client for MinIO locally or AWS in production.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "hireboard-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
