//! Redis cache for batch-computed match scores.
//!
//! Keys embed the profile's and listing's `updated_at`, so any edit to either
//! side produces a new key and stale entries simply age out via TTL.

use std::time::Duration;

use chrono::{DateTime, Utc};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::Client as RedisClient;
use tracing::{debug, warn};
use uuid::Uuid;

const KEY_PREFIX: &str = "match:v1";
const NOT_COMPUTABLE: &str = "na";

const CONNECT_TIMEOUT: Duration = Duration::from_millis(100);
const RESPONSE_TIMEOUT: Duration = Duration::from_millis(250);
const RECONNECT_RETRIES: usize = 1;

/// Opens the shared, auto-reconnecting connection. Timeouts are short
/// because every caller treats Redis as optional.
pub async fn connect_redis(redis_url: &str) -> redis::RedisResult<ConnectionManager> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(RECONNECT_RETRIES)
        .set_connection_timeout(CONNECT_TIMEOUT)
        .set_response_timeout(RESPONSE_TIMEOUT);
    RedisClient::open(redis_url)?
        .get_connection_manager_with_config(config)
        .await
}

#[derive(Clone)]
pub struct MatchScoreCache {
    conn: Option<ConnectionManager>,
    ttl_secs: u64,
}

impl MatchScoreCache {
    pub fn new(conn: ConnectionManager, ttl_secs: u64) -> Self {
        Self {
            conn: Some(conn),
            ttl_secs,
        }
    }

    /// Every read is a miss and writes are dropped.
    pub fn disabled() -> Self {
        Self {
            conn: None,
            ttl_secs: 0,
        }
    }

    /// Clones the manager; clones share one multiplexed connection.
    fn connection(&self) -> Option<ConnectionManager> {
        if self.ttl_secs == 0 {
            return None;
        }
        self.conn.clone()
    }

    /// One MGET for all keys. Outer `None` = miss; inner `None` = cached N/A.
    /// Redis failures degrade to all misses.
    pub async fn get_many(&self, keys: &[String]) -> Vec<Option<Option<f64>>> {
        let Some(mut conn) = self.connection().filter(|_| !keys.is_empty()) else {
            return vec![None; keys.len()];
        };

        let result: redis::RedisResult<Vec<Option<String>>> =
            redis::cmd("MGET").arg(keys).query_async(&mut conn).await;
        match result {
            Ok(values) if values.len() == keys.len() => values
                .iter()
                .map(|v| v.as_deref().and_then(decode_score))
                .collect(),
            Ok(values) => {
                warn!(
                    "Match cache MGET returned {} values for {} keys",
                    values.len(),
                    keys.len()
                );
                vec![None; keys.len()]
            }
            Err(e) => {
                warn!("Match cache read failed, scoring without cache: {e}");
                vec![None; keys.len()]
            }
        }
    }

    /// Writes all entries in one pipeline with `SET key value EX ttl`.
    pub async fn put_many(&self, entries: &[(String, Option<f64>)]) {
        let Some(mut conn) = self.connection().filter(|_| !entries.is_empty()) else {
            return;
        };

        let mut pipe = redis::pipe();
        for (key, score) in entries {
            pipe.cmd("SET")
                .arg(key)
                .arg(encode_score(*score))
                .arg("EX")
                .arg(self.ttl_secs)
                .ignore();
        }

        let result: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
        match result {
            Ok(()) => debug!("Cached {} match scores", entries.len()),
            Err(e) => warn!("Match cache write failed: {e}"),
        }
    }
}

pub fn cache_key(
    seeker_id: Uuid,
    profile_updated_at: DateTime<Utc>,
    listing_id: Uuid,
    listing_updated_at: DateTime<Utc>,
) -> String {
    format!(
        "{KEY_PREFIX}:{seeker_id}:{}:{listing_id}:{}",
        profile_updated_at.timestamp_millis(),
        listing_updated_at.timestamp_millis()
    )
}

pub fn encode_score(score: Option<f64>) -> String {
    match score {
        Some(s) if s.is_finite() => s.to_string(),
        _ => NOT_COMPUTABLE.to_string(),
    }
}

/// `None` for values this cache never writes, so they count as misses.
pub fn decode_score(raw: &str) -> Option<Option<f64>> {
    if raw == NOT_COMPUTABLE {
        return Some(None);
    }
    match raw.parse::<f64>() {
        Ok(s) if s.is_finite() && (0.0..=1.0).contains(&s) => Some(Some(s)),
        _ => None,
    }
}
