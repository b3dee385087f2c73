//! TOML configuration parsing.
//!
//! Every section has defaults, so a missing config file is not an error:
//! [`load_config`] falls back to [`Config::default`]. The QA API key is
//! never read from the file; it comes from the environment
//! (see [`QaConfig::api_key_from_env`]).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GOOGLE_GEMINI_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub qa: QaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/pdf-chat.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// The single web client origin allowed by CORS.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origin: default_allowed_origin(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_allowed_origin() -> String {
    "http://localhost:5173".to_string()
}
fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadsConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploaded_pdfs")
}

#[derive(Debug, Deserialize, Clone)]
pub struct QaConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_temperature() -> f32 {
    1.0
}
fn default_top_p() -> f32 {
    0.95
}
fn default_top_k() -> u32 {
    64
}
fn default_max_output_tokens() -> u32 {
    8192
}
fn default_timeout_secs() -> u64 {
    120
}

impl QaConfig {
    /// Reads the API key from [`API_KEY_ENV`].
    ///
    /// The server refuses to start without it.
    pub fn api_key_from_env(&self) -> Result<String> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => anyhow::bail!("{} environment variable not set", API_KEY_ENV),
        }
    }
}

/// Loads and validates the config at `path`, or the defaults if the file
/// does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.allowed_origin.trim().is_empty() {
        anyhow::bail!("server.allowed_origin must not be empty");
    }
    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be > 0");
    }

    match config.qa.provider.as_str() {
        "gemini" => {}
        other => anyhow::bail!("Unknown QA provider: '{}'. Must be gemini.", other),
    }
    if config.qa.model.trim().is_empty() {
        anyhow::bail!("qa.model must not be empty");
    }
    if !(0.0..=2.0).contains(&config.qa.temperature) {
        anyhow::bail!("qa.temperature must be in [0.0, 2.0]");
    }
    if !(0.0..=1.0).contains(&config.qa.top_p) {
        anyhow::bail!("qa.top_p must be in [0.0, 1.0]");
    }
    if config.qa.max_output_tokens == 0 {
        anyhow::bail!("qa.max_output_tokens must be > 0");
    }

    Ok(())
}
