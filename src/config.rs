use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub ai_service_url: url::Url,
    pub ai_service_timeout_secs: u64,
    pub uploads_dir: String,
    pub public_base_url: String,
    pub max_resume_bytes: usize,
    pub resume_pdf_only: bool,
    pub log_format: LogFormat,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

pub const DEFAULT_MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let ai_service_url = get_env_or("AI_SERVICE_URL", "http://localhost:8000");
        let ai_service_url = parse_base_url(&ai_service_url)?;

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:5000"),
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            ai_service_url,
            ai_service_timeout_secs: get_env_parse_or("AI_SERVICE_TIMEOUT_SECS", 60)?,
            uploads_dir: get_env_or("UPLOADS_DIR", "./uploads"),
            public_base_url: get_env_or("PUBLIC_BASE_URL", "http://localhost:5000")
                .trim_end_matches('/')
                .to_string(),
            max_resume_bytes: get_env_parse_or("MAX_RESUME_BYTES", DEFAULT_MAX_RESUME_BYTES)?,
            resume_pdf_only: get_env_parse_or("RESUME_PDF_ONLY", true)?,
            log_format: match env::var("LOG_FORMAT").ok().as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            cors_allowed_origins: split_list(&get_env_or("CORS_ALLOWED_ORIGINS", "")),
        })
    }
}

/// Parses the collaborator base URL so that `join("recommend")` appends instead of
/// replacing the last path segment.
pub fn parse_base_url(raw: &str) -> Result<url::Url> {
    let mut normalized = raw.trim().trim_end_matches('/').to_string();
    normalized.push('/');
    url::Url::parse(&normalized)
        .map_err(|e| Error::Config(format!("Invalid value for AI_SERVICE_URL: {}", e)))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().trim_end_matches('/').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
