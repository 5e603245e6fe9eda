use serde::Deserialize;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Same-origin proxy used for scrape requests; scraping is skipped when unset
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Backend credential sent to the proxy as `apikey` and bearer token
    #[serde(default)]
    pub proxy_api_key: Option<String>,

    /// OMDb endpoint (or a proxy in front of it); the structured API is skipped when unset
    #[serde(default)]
    pub omdb_url: Option<String>,

    /// OMDb API key, only needed when talking to OMDb directly
    #[serde(default)]
    pub omdb_api_key: Option<String>,

    /// Base URL of the scraped ratings site; also the only host the proxy will relay to
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,

    /// Minimum spacing between outbound scrape requests
    #[serde(default = "default_scrape_delay_ms")]
    pub scrape_delay_ms: u64,

    /// Timeout for a single scrape or ratings API request
    #[serde(default = "default_scrape_timeout_secs")]
    pub scrape_timeout_secs: u64,

    /// Result cache expiry
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// How often the background sweeper removes expired cache entries
    #[serde(default = "default_cache_sweep_interval_secs")]
    pub cache_sweep_interval_secs: u64,

    /// Serve canned scores when nothing else resolves (local development only)
    #[serde(default)]
    pub mock_scores: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_upstream_base_url() -> String {
    "https://www.rottentomatoes.com".to_string()
}

fn default_scrape_delay_ms() -> u64 {
    1000
}

fn default_scrape_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    86400
}

fn default_cache_sweep_interval_secs() -> u64 {
    3600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            proxy_url: None,
            proxy_api_key: None,
            omdb_url: None,
            omdb_api_key: None,
            upstream_base_url: default_upstream_base_url(),
            scrape_delay_ms: default_scrape_delay_ms(),
            scrape_timeout_secs: default_scrape_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_sweep_interval_secs: default_cache_sweep_interval_secs(),
            mock_scores: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn scrape_delay(&self) -> Duration {
        Duration::from_millis(self.scrape_delay_ms)
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs)
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
