//! Gateway config file.
//!
//! Everything non-secret lives in a TOML file loaded once at startup; secrets
//! (provider API key, Redis URL, IP-hash salt) come from the environment and
//! are resolved in `gateway_util`.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use url::Url;

use crate::error::{Error, ErrorDetails};
use crate::quota::QuotaLimits;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Defaults to 0.0.0.0:3000 when unset.
    pub bind_address: Option<SocketAddr>,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    #[serde(default = "default_quota_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub limits: QuotaLimits,
    /// Timeout for ledger and session operations against Redis.
    #[serde(default = "default_redis_timeout_ms")]
    pub redis_timeout_ms: u64,
}

fn default_quota_enabled() -> bool {
    true
}

fn default_redis_timeout_ms() -> u64 {
    100
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            enabled: default_quota_enabled(),
            limits: QuotaLimits::default(),
            redis_timeout_ms: default_redis_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default = "default_api_base")]
    pub api_base: Url,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_api_base() -> Url {
    #[expect(clippy::expect_used)]
    let url = Url::parse("https://api.openai.com/v1/").expect("default provider base URL is valid");
    url
}

fn default_model() -> String {
    "gpt-5-mini-2025-08-07".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
        }
    }
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::new(ErrorDetails::FileRead {
                message: e.to_string(),
                file_path: path.display().to_string(),
            })
        })?;
        Self::load_from_str(&contents)
    }

    pub fn load_from_str(contents: &str) -> Result<Self, Error> {
        let deserializer = toml::de::Deserializer::new(contents);
        serde_path_to_error::deserialize(deserializer).map_err(|e| {
            Error::new(ErrorDetails::Config {
                message: format!("Failed to parse config file: {e}"),
            })
        })
    }
}
