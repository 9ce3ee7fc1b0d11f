use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub anthropic_api_key: Option<String>,
    pub enable_llm_match_summary: bool,
    pub match_cache_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let enable_llm_match_summary = parse_bool(
            "ENABLE_LLM_MATCH_SUMMARY",
            &std::env::var("ENABLE_LLM_MATCH_SUMMARY").unwrap_or_default(),
        )?;
        if enable_llm_match_summary && anthropic_api_key.is_none() {
            bail!("ENABLE_LLM_MATCH_SUMMARY is set but ANTHROPIC_API_KEY is missing");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_ttl_hours: std::env::var("JWT_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse::<i64>()
                .context("JWT_TTL_HOURS must be an integer")?,
            anthropic_api_key,
            enable_llm_match_summary,
            match_cache_ttl_secs: std::env::var("MATCH_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse::<u64>()
                .context("MATCH_CACHE_TTL_SECS must be a non-negative integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Accepts the usual spellings; empty means false.
fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => bail!("{key} must be a boolean, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", " YES ").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(!parse_bool("X", "").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
    }

    #[test]
    fn test_parse_bool_rejects_garbage() {
        let err = parse_bool("ENABLE_LLM_MATCH_SUMMARY", "maybe").unwrap_err();
        assert!(err.to_string().contains("ENABLE_LLM_MATCH_SUMMARY"));
    }
}
