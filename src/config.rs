use serde::Deserialize;
use std::time::Duration;

use crate::api::ViewLimits;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TMDB v3 API key
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Redis connection URL; caching is disabled when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on a single favorite/watchlist mutation
    #[serde(default = "default_mutation_timeout_secs")]
    pub mutation_timeout_secs: u64,

    /// Per-session views untouched for this long are dropped
    #[serde(default = "default_view_idle_secs")]
    pub view_idle_secs: u64,

    /// Upper bound on live per-session views
    #[serde(default = "default_max_views")]
    pub max_views: usize,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_mutation_timeout_secs() -> u64 {
    10
}

fn default_view_idle_secs() -> u64 {
    30 * 60
}

fn default_max_views() -> usize {
    10_000
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

    /// Rejects values that would leave the service unusable
    ///
    /// A zero mutation timeout would roll back every toggle, and a zero view
    /// limit would drop every session's view as soon as it is created.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mutation_timeout_secs == 0 {
            anyhow::bail!("MUTATION_TIMEOUT_SECS must be greater than 0");
        }
        if self.view_idle_secs == 0 {
            anyhow::bail!("VIEW_IDLE_SECS must be greater than 0");
        }
        if self.max_views == 0 {
            anyhow::bail!("MAX_VIEWS must be greater than 0");
        }
        Ok(())
    }

    pub fn view_limits(&self) -> ViewLimits {
        ViewLimits {
            idle_timeout: Duration::from_secs(self.view_idle_secs),
            max_views: self.max_views,
        }
    }

    pub fn mutation_timeout(&self) -> Duration {
        Duration::from_secs(self.mutation_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
