use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::matching::cache::MatchScoreCache;
use crate::matching::scorer::MatchScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub config: Config,
    /// Pluggable match scorer. Default: KeywordMatchScorer. Swap via ENABLE_LLM_MATCH_SUMMARY.
    pub match_scorer: Arc<dyn MatchScorer>,
    /// Redis-backed cache of batch-computed match scores.
    pub match_cache: MatchScoreCache,
}
