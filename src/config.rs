use serde::Deserialize;
use std::time::Duration;

/// Upper bound for `CACHE_TTL_SECS` (one year)
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding one `<category>.json` file per catalog
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: String,

    /// PostgreSQL connection URL; history stays in memory when unset
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL; enrichment cache stays in memory when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Number of recommendations returned when the request omits `count`
    #[serde(default = "default_count")]
    pub default_count: usize,

    /// Hard cap applied to `count`
    #[serde(default = "default_max_count")]
    pub max_count: usize,

    /// Whether external enrichers (Jikan, OMDb) are consulted
    #[serde(default)]
    pub enrichment_enabled: bool,

    #[serde(default = "default_enrichment_timeout_ms")]
    pub enrichment_timeout_ms: u64,

    #[serde(default = "default_jikan_api_url")]
    pub jikan_api_url: String,

    /// OMDb API key; movie and web series enrichment is skipped when unset
    #[serde(default)]
    pub omdb_api_key: Option<String>,

    #[serde(default = "default_omdb_api_url")]
    pub omdb_api_url: String,

    /// Gemini API key; explanations use the built-in template when unset
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_explainer_timeout_ms")]
    pub explainer_timeout_ms: u64,

    /// TTL of cached enrichment payloads
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Period of the in-memory cache eviction sweep
    #[serde(default = "default_cache_sweep_interval_secs")]
    pub cache_sweep_interval_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_catalog_dir() -> String {
    "catalogs".to_string()
}

fn default_count() -> usize {
    10
}

fn default_max_count() -> usize {
    50
}

fn default_enrichment_timeout_ms() -> u64 {
    2000
}

fn default_jikan_api_url() -> String {
    "https://api.jikan.moe".to_string()
}

fn default_omdb_api_url() -> String {
    "https://www.omdbapi.com".to_string()
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_explainer_timeout_ms() -> u64 {
    5000
}

fn default_cache_ttl_secs() -> u64 {
    86400
}

fn default_cache_sweep_interval_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.max_count == 0 {
            anyhow::bail!("MAX_COUNT must be positive");
        }
        if self.default_count == 0 || self.default_count > self.max_count {
            anyhow::bail!(
                "DEFAULT_COUNT must be between 1 and MAX_COUNT ({})",
                self.max_count
            );
        }
        if self.cache_ttl_secs == 0 || self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            anyhow::bail!(
                "CACHE_TTL_SECS must be between 1 and {}",
                MAX_CACHE_TTL_SECS
            );
        }
        if self.cache_sweep_interval_secs == 0 {
            anyhow::bail!("CACHE_SWEEP_INTERVAL_SECS must be positive");
        }
        Ok(())
    }

    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_millis(self.enrichment_timeout_ms)
    }

    pub fn explainer_timeout(&self) -> Duration {
        Duration::from_millis(self.explainer_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs)
    }
}
