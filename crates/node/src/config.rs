//! Node configuration.
//!
//! Loaded from a TOML file with the private key overridable through the
//! `NODE_PRIVATE_KEY` environment variable, so keys stay out of config
//! files in deployments.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Which worker this node runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Ingest entities and commit bundles on chain.
    Upload,
    /// Compete in challenges and shelter peer bundles.
    Shelterer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub node: NodeSection,
    #[serde(default)]
    pub upload: UploadSection,
    #[serde(default)]
    pub challenge: ChallengeSection,
    #[serde(default)]
    pub chain: ChainSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSection {
    pub role: NodeRole,
    /// 0x-prefixed secp256k1 private key; prefer NODE_PRIVATE_KEY.
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default = "default_timestamp_limit")]
    pub timestamp_limit_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSection {
    #[serde(default = "default_upload_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_storage_periods")]
    pub storage_periods: u32,
    #[serde(default = "default_retry_period")]
    pub retry_period: u32,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            interval_secs: default_upload_interval(),
            storage_periods: default_storage_periods(),
            retry_period: default_retry_period(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeSection {
    #[serde(default = "default_challenge_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_retry_timeout")]
    pub retry_timeout_secs: u64,
}

impl Default for ChallengeSection {
    fn default() -> Self {
        Self {
            interval_secs: default_challenge_interval(),
            retry_timeout_secs: default_retry_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainSection {
    #[serde(default = "default_sync_poll")]
    pub sync_poll_secs: u64,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            sync_poll_secs: default_sync_poll(),
        }
    }
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let mut config: NodeConfig = toml::from_str(&raw)
            .with_context(|| format!("cannot parse config file {}", path.display()))?;
        if let Ok(key) = std::env::var("NODE_PRIVATE_KEY") {
            config.node.private_key = Some(key);
        }
        Ok(config)
    }

    pub fn private_key(&self) -> Result<&str> {
        self.node
            .private_key
            .as_deref()
            .ok_or_else(|| anyhow!("no private key: set NODE_PRIVATE_KEY or node.private_key"))
    }
}

fn default_timestamp_limit() -> u64 {
    entities::DEFAULT_TIMESTAMP_LIMIT_SECS
}

fn default_upload_interval() -> u64 {
    300
}

fn default_storage_periods() -> u32 {
    1
}

fn default_retry_period() -> u32 {
    12
}

fn default_challenge_interval() -> u64 {
    30
}

fn default_retry_timeout() -> u64 {
    600
}

fn default_sync_poll() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: NodeConfig = toml::from_str("[node]\nrole = \"upload\"\n").unwrap();
        assert_eq!(config.node.role, NodeRole::Upload);
        assert_eq!(config.node.timestamp_limit_secs, 86400);
        assert_eq!(config.upload.interval_secs, 300);
        assert_eq!(config.upload.retry_period, 12);
        assert_eq!(config.challenge.retry_timeout_secs, 600);
        assert_eq!(config.chain.sync_poll_secs, 5);
    }

    #[test]
    fn sections_override_defaults() {
        let config: NodeConfig = toml::from_str(
            "[node]\nrole = \"shelterer\"\nprivate_key = \"0xabc\"\n\
             [challenge]\ninterval_secs = 7\nretry_timeout_secs = 60\n",
        )
        .unwrap();
        assert_eq!(config.node.role, NodeRole::Shelterer);
        assert_eq!(config.private_key().unwrap(), "0xabc");
        assert_eq!(config.challenge.interval_secs, 7);
        assert_eq!(config.challenge.retry_timeout_secs, 60);
    }

    #[test]
    fn missing_private_key_is_an_error() {
        let config: NodeConfig = toml::from_str("[node]\nrole = \"upload\"\n").unwrap();
        assert!(config.private_key().is_err());
    }
}
