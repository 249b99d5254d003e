use std::env;
use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub access_ttl: Duration,
    pub refresh_secret: String,
    pub refresh_ttl: Duration,
    pub bcrypt_cost: u32,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub auth: AuthConfig,
    pub media: MediaConfig,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = env::var("MINIO_ENDPOINT").ok();
        let bucket = env::var("MINIO_BUCKET").unwrap_or_else(|_| "media".to_string());
        let public_url = match env::var("MEDIA_PUBLIC_URL") {
            Ok(url) => url,
            Err(_) => format!(
                "{}/{}",
                endpoint.as_deref().unwrap_or("http://localhost:9000"),
                bucket
            ),
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8000)?,
            database_url: required("DATABASE_URL")?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            auth: AuthConfig {
                access_secret: required("ACCESS_TOKEN_SECRET")?,
                access_ttl: duration_var("ACCESS_TOKEN_EXPIRY", "1d")?,
                refresh_secret: required("REFRESH_TOKEN_SECRET")?,
                refresh_ttl: duration_var("REFRESH_TOKEN_EXPIRY", "10d")?,
                bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
                cookie_secure: parse_var("COOKIE_SECURE", true)?,
            },
            media: MediaConfig {
                endpoint,
                access_key: env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minio".to_string()),
                secret_key: env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minio123".to_string()),
                bucket,
                public_url: public_url.trim_end_matches('/').to_string(),
            },
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 200 * 1024 * 1024)?,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn duration_var(name: &'static str, default: &str) -> Result<Duration, ConfigError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    parse_duration(&value).ok_or(ConfigError::Invalid { name, value })
}

const MAX_DURATION_SECS: u64 = 100 * 365 * 86_400;

/// Parses `90`, `90s`, `15m`, `12h` or `10d`, up to 100 years.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let factor: u64 = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        _ => return None,
    };
    let seconds = digits.parse::<u64>().ok()?.checked_mul(factor)?;
    if seconds > MAX_DURATION_SECS {
        return None;
    }
    Some(Duration::seconds(i64::try_from(seconds).ok()?))
}
