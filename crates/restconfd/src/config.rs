//! Daemon configuration (TOML)
//!
//! ```toml
//! [server]
//! port = 8181
//! root_path = "/onos/restconf"
//!
//! [streams]
//! worker_pool_size = 5
//! queue_capacity = 64
//! overflow = "block"   # or "drop"
//! ```
//!
//! Every field is optional. Unknown keys are rejected.

use std::path::Path;

use anyhow::Context;
use restconf_api::{HubConfig, ServiceConfig};
use serde::Deserialize;

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub streams: HubConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
    /// RESTCONF root mount point
    pub root_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8181,
            root_path: ServiceConfig::default().root_path,
        }
    }
}

impl ServerConfig {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            root_path: self.root_path.clone(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn validate(&self) -> anyhow::Result<()> {
        let root = &self.server.root_path;
        if !root.is_empty() && !root.starts_with('/') {
            anyhow::bail!("server.root_path must start with '/': {}", root);
        }
        if root.contains(['{', '}', '*']) {
            anyhow::bail!("server.root_path contains route syntax: {}", root);
        }
        if self.streams.worker_pool_size == 0 {
            anyhow::bail!("streams.worker_pool_size must be at least 1");
        }
        if self.streams.queue_capacity == 0 {
            anyhow::bail!("streams.queue_capacity must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restconf_api::OverflowPolicy;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 8181);
        assert_eq!(config.server.root_path, "/onos/restconf");
        assert_eq!(config.streams, HubConfig::default());
        assert_eq!(config.streams.worker_pool_size, 5);
        assert_eq!(config.streams.overflow, OverflowPolicy::Block);
    }

    #[test]
    fn test_full_document() {
        let config = Config::parse(
            r#"
            [server]
            port = 9000
            root_path = "/restconf"

            [streams]
            worker_pool_size = 2
            queue_capacity = 8
            overflow = "drop"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.service_config().root_path, "/restconf");
        assert_eq!(
            config.streams,
            HubConfig {
                worker_pool_size: 2,
                queue_capacity: 8,
                overflow: OverflowPolicy::Drop,
            }
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Config::parse("[server]\nhost = \"0.0.0.0\"").is_err());
        assert!(Config::parse("[metrics]\nenabled = true").is_err());
        assert!(Config::parse("[streams]\noverflow = \"drop-oldest\"").is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::parse("[streams]\nworker_pool_size = 0").is_err());
        assert!(Config::parse("[streams]\nqueue_capacity = 0").is_err());
        assert!(Config::parse("[server]\nroot_path = \"restconf\"").is_err());
        assert!(Config::parse("[server]\nroot_path = \"/{x}\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 18181").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 18181);

        assert!(Config::load(Path::new("/nonexistent/restconfd.toml")).is_err());
    }
}
