use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub llm_model: String,
    pub jwt_secret: String,
    pub jwt_expires_min: i64,
    pub s3_bucket: String,
    /// Custom endpoint for MinIO or other S3-compatible stores. AWS when unset.
    pub s3_endpoint: Option<String>,
    pub s3_prefix: String,
    pub s3_presign_expires_seconds: u64,
    pub aws_region: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub agent_timeout_secs: u64,
    pub cors_allowed_origin_regex: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llm_model: optional_env("LLM_MODEL")
                .unwrap_or_else(|| crate::llm_client::DEFAULT_MODEL.to_string()),
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_expires_min: parse_env("JWT_EXPIRES_MIN", 60)?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: optional_env("S3_ENDPOINT"),
            s3_prefix: optional_env("S3_PREFIX").unwrap_or_else(|| "applications".to_string()),
            s3_presign_expires_seconds: parse_env("S3_PRESIGN_EXPIRES_SECONDS", 60)?,
            aws_region: optional_env("AWS_REGION").unwrap_or_else(|| "eu-north-1".to_string()),
            aws_access_key_id: optional_env("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: optional_env("AWS_SECRET_ACCESS_KEY"),
            agent_timeout_secs: parse_env("AGENT_TIMEOUT_SECS", 90)?,
            cors_allowed_origin_regex: optional_env("CORS_ALLOWED_ORIGIN_REGEX")
                .unwrap_or_else(|| r"^http://(localhost|127\.0\.0\.1)(:\d+)?$".to_string()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} has an invalid value: '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_accepts_padded_numbers() {
        let port: u16 = parse_value("PORT", " 9000 ").unwrap();
        assert_eq!(port, 9000);
    }

    #[test]
    fn test_parse_value_rejects_garbage_with_key_in_message() {
        let err = parse_value::<u64>("AGENT_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("AGENT_TIMEOUT_SECS"));
    }

    #[test]
    fn test_parse_value_rejects_out_of_range_port() {
        assert!(parse_value::<u16>("PORT", "70000").is_err());
    }
}
