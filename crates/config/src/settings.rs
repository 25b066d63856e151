//! Main settings module

use config::{Config, Environment, File};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Text-to-speech vendor and chunking
    #[serde(default)]
    pub tts: TtsConfig,

    /// LLM chat-completion proxy
    #[serde(default)]
    pub llm: LlmConfig,

    /// Audio cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tts.max_chunk_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tts.max_chunk_length".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if !is_http_url(&self.tts.endpoint) {
            return Err(ConfigError::InvalidValue {
                field: "tts.endpoint".to_string(),
                message: format!("not a valid URL: '{}'", self.tts.endpoint),
            });
        }

        if !is_http_url(&self.llm.base_url) {
            return Err(ConfigError::InvalidValue {
                field: "llm.base_url".to_string(),
                message: format!("not a valid URL: '{}'", self.llm.base_url),
            });
        }

        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("{} is outside 0.0..=2.0", self.llm.temperature),
            });
        }

        if self.llm.api_key.is_none() {
            tracing::warn!("llm.api_key is not set; /api/llm/chat will fail until it is configured");
        }

        Ok(())
    }
}

/// Check for an absolute http(s) URL with a host
fn is_http_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins (empty allows any origin)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Text-to-speech configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Vendor endpoint receiving form-encoded `selectedVoiceValue` and `text`
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,

    /// `Origin` header the vendor expects
    #[serde(default = "default_tts_origin")]
    pub origin: String,

    /// `Referer` header the vendor expects
    #[serde(default = "default_tts_referer")]
    pub referer: String,

    /// `User-Agent` header the vendor expects
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Voice used when a request does not name one
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// Maximum characters per chunk
    #[serde(default = "default_max_chunk_length")]
    pub max_chunk_length: usize,

    /// Delay between chunk events in milliseconds
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Optional HTTP client timeout for vendor calls (none by default)
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_tts_endpoint() -> String {
    "http://127.0.0.1:7860/api/tts".to_string()
}
fn default_tts_origin() -> String {
    "http://127.0.0.1:7860".to_string()
}
fn default_tts_referer() -> String {
    "http://127.0.0.1:7860/".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
        .to_string()
}
fn default_voice() -> String {
    "en_us_001".to_string()
}
fn default_max_chunk_length() -> usize {
    300
}
fn default_pacing_ms() -> u64 {
    50
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_tts_endpoint(),
            origin: default_tts_origin(),
            referer: default_tts_referer(),
            user_agent: default_user_agent(),
            default_voice: default_voice(),
            max_chunk_length: default_max_chunk_length(),
            pacing_ms: default_pacing_ms(),
            request_timeout_secs: None,
        }
    }
}

/// LLM proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the chat-completion API
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Bearer token (should be set via MEDASSIST__LLM__API_KEY or PERPLEXITY_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used when a request does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upstream timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    "https://api.perplexity.ai".to_string()
}
fn default_model() -> String {
    "sonar".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_llm_timeout() -> u64 {
    25
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: None,
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Audio cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Consult and fill the cache during dispatch
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum cached chunks before the oldest is evicted
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_max_entries() -> usize {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable the Prometheus recorder
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (MEDASSIST__ prefix, `__` separator)
/// 2. config/{env} (if env specified)
/// 3. config/default
///
/// `PERPLEXITY_API_KEY` fills `llm.api_key` when nothing else set it.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("MEDASSIST")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let mut settings: Settings = config.try_deserialize()?;

    if settings.llm.api_key.is_none() {
        settings.llm.api_key = std::env::var("PERPLEXITY_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
    }

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.tts.max_chunk_length, 300);
        assert_eq!(settings.tts.pacing_ms, 50);
        assert_eq!(settings.llm.timeout_secs, 25);
        assert!(settings.tts.request_timeout_secs.is_none());
        assert!(settings.cache.enabled);
    }

    #[test]
    fn test_default_settings_validate() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        settings.tts.max_chunk_length = 0;
        assert!(settings.validate().is_err());

        settings.tts.max_chunk_length = 300;
        settings.llm.temperature = 3.5;
        assert!(settings.validate().is_err());

        settings.llm.temperature = 0.7;
        settings.llm.timeout_secs = 0;
        assert!(settings.validate().is_err());

        settings.llm.timeout_secs = 25;
        settings.tts.endpoint = "not a url".to_string();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("tts.endpoint"));
    }

    #[test]
    fn test_endpoint_urls_must_parse() {
        for bad in ["http://exa mple", "https://:99999", "https://host:99999/x", "ftp://host/", "http://", "host/api"] {
            assert!(!is_http_url(bad), "{bad} accepted");
        }
        for good in ["https://api.perplexity.ai", "http://127.0.0.1:9000/tts", "https://tts.example.com/api/v1"] {
            assert!(is_http_url(good), "{good} rejected");
        }

        let mut settings = Settings::default();
        settings.llm.base_url = "https://:99999".to_string();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("llm.base_url"));
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let settings: Settings = settings_from_json(r#"{"tts": {"default_voice": "en_uk_003"}}"#);
        assert_eq!(settings.tts.default_voice, "en_uk_003");
        assert_eq!(settings.tts.max_chunk_length, 300);
        assert_eq!(settings.llm.default_model, "sonar");
    }

    fn settings_from_json(json: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(json, config::FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
