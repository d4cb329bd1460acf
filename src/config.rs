//! Configuration management

use crate::decision::{ChannelConfig, RuleConfig};
use crate::notify::TelegramConfig;
use crate::storage::TOKEN_TTL_SECS;
use crate::stream::StreamConfig;
use serde::Deserialize;
use std::path::Path;

/// Environment variable prefix, e.g. `SIGNAL_BOT__REDIS__URL`
pub const ENV_PREFIX: &str = "SIGNAL_BOT";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub redis: RedisConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default)]
    pub rules: RuleConfig,
    pub telegram: Option<TelegramConfig>,
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Connection URL shared by the log and the cache
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Record lifetime, refreshed on every write
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: TOKEN_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite archive path
    pub path: String,
}

impl DatabaseConfig {
    /// Path with `~` expanded
    pub fn expanded_path(&self) -> String {
        shellexpand::tilde(&self.path).into_owned()
    }
}

impl Config {
    /// Load configuration from file, overridden by `SIGNAL_BOT__*` variables
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let expanded = shellexpand::tilde(&path.as_ref().to_string_lossy()).into_owned();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&expanded))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations
    pub fn load_default() -> anyhow::Result<Self> {
        let paths = ["config.toml", "~/.config/token-signal-bot/config.toml"];

        for path in paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::load(expanded.as_ref());
            }
        }

        anyhow::bail!("No configuration file found")
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.redis.url.trim().is_empty() {
            anyhow::bail!("redis.url must not be empty");
        }
        if self.stream.batch_size == 0 {
            anyhow::bail!("stream.batch_size must be at least 1");
        }
        if self.stream.concurrency == 0 {
            anyhow::bail!("stream.concurrency must be at least 1");
        }
        if self.cache.ttl_secs == 0 {
            anyhow::bail!("cache.ttl_secs must be at least 1");
        }
        Ok(())
    }
}
