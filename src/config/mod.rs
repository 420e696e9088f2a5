use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub chain: ChainConfig,
    pub auth: AuthConfig,
    pub rate_limiting: RateLimitingConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self> {
        let configured_path =
            std::env::var("ARCMINT_API_CONFIG").unwrap_or_else(|_| "config/api.toml".to_string());
        assert!(
            !configured_path.is_empty(),
            "Configuration path must be non-empty"
        );
        assert!(
            configured_path.len() < 4096,
            "Configuration path length exceeds hard limit"
        );

        let mut builder = Config::builder()
            .add_source(File::new(&configured_path, FileFormat::Toml).required(true));

        if let Ok(env_override) = std::env::var("ARCMINT_API_ENV") {
            if !env_override.is_empty() {
                let env_file = format!("config/api.{}.toml", env_override);
                if Path::new(&env_file).exists() {
                    builder = builder.add_source(File::new(&env_file, FileFormat::Toml));
                }
            }
        }

        let settings = builder
            .build()
            .map_err(|err| map_config_error(err, &configured_path))?;
        let config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize API configuration")?;

        config.validate();
        Ok(config)
    }

    fn validate(&self) {
        assert!(
            !self.database.url.is_empty(),
            "Database URL must be specified"
        );
        assert!(
            self.server.port > 0,
            "Server port must be greater than zero"
        );
        let _ = self.chain.request_timeout();
        let _ = self.auth.challenge_ttl();
        self.rate_limiting.ensure_bounds();
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Option<IpAddr>,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        let host = self.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(self.port != 0, "HTTP port cannot be zero");
        assert!(self.port < 65535, "HTTP port must be below 65535");
        SocketAddr::new(host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub request_timeout_ms: Option<u64>,
}

impl ChainConfig {
    pub fn request_timeout(&self) -> Duration {
        let millis = self.request_timeout_ms.unwrap_or(3_000);
        assert!(millis >= 100, "RPC timeout must be at least 100ms");
        assert!(millis <= 60_000, "RPC timeout cannot exceed 60 seconds");
        Duration::from_millis(millis)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_challenge_ttl_secs")]
    pub challenge_ttl_secs: u64,
}

impl AuthConfig {
    pub fn challenge_ttl(&self) -> Duration {
        assert!(self.challenge_ttl_secs >= 1, "Challenge TTL must be >= 1s");
        assert!(
            self.challenge_ttl_secs <= 3_600,
            "Challenge TTL cannot exceed one hour"
        );
        Duration::from_secs(self.challenge_ttl_secs)
    }

    const fn default_challenge_ttl_secs() -> u64 {
        300
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitingConfig {
    #[serde(default = "RateLimitingConfig::default_window_ms")]
    pub window_ms: u64,
    #[serde(default = "RateLimitingConfig::default_max_keys")]
    pub max_keys: u64,
    #[serde(default = "RateLimitingConfig::default_mint_per_window")]
    pub mint_per_window: u32,
}

impl RateLimitingConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    fn ensure_bounds(&self) {
        assert!(self.window_ms >= 100, "Rate limit window must be >= 100ms");
        assert!(
            self.window_ms <= 3_600_000,
            "Rate limit window cannot exceed one hour"
        );
        assert!(self.max_keys > 0, "Rate limit key capacity must be positive");
        assert!(
            self.mint_per_window > 0,
            "Mint rate limit must be positive"
        );
    }

    const fn default_window_ms() -> u64 {
        60_000
    }

    const fn default_max_keys() -> u64 {
        10_000
    }

    const fn default_mint_per_window() -> u32 {
        10
    }
}

fn map_config_error(err: ConfigError, path: &str) -> ConfigError {
    match err {
        ConfigError::NotFound(_) => ConfigError::NotFound(path.to_string()),
        other => other,
    }
}
