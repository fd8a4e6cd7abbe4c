//! otto.toml configuration parser.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::MigrationStrategy;

/// Default chunk size for the chunked transfer protocol (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OttoConfig {
    pub transfer: Option<TransferConfig>,
    pub migration: Option<MigrationConfig>,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    pub chunk_size: Option<usize>,
    pub content_type: Option<String>,
    pub topic_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub strategy: Option<String>,
    pub remove_source: Option<bool>,
    pub default_command: Option<String>,
    pub image_prefix: Option<String>,
    pub image_tag: Option<String>,
    pub chunked: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    pub host: String,
    #[serde(default = "default_runtime_url")]
    pub runtime_url: String,
}

fn default_runtime_url() -> String {
    "unix:///var/run/docker.sock".to_string()
}

/// Resolved transfer parameters handed to the chunked sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    pub chunk_size: usize,
    pub content_type: String,
    pub topic_prefix: String,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            content_type: "application/x-tar".to_string(),
            topic_prefix: "otto/migration".to_string(),
        }
    }
}

/// Resolved migration parameters handed to executors and the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSettings {
    pub strategy: MigrationStrategy,
    pub remove_source: bool,
    /// Command used for imported images when the source had none.
    pub default_command: String,
    pub image_prefix: String,
    pub image_tag: String,
    /// Route export payloads through the chunked transfer protocol.
    pub chunked: bool,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            strategy: MigrationStrategy::ExportImport,
            remove_source: true,
            default_command: "sh".to_string(),
            image_prefix: "migrated_".to_string(),
            image_tag: "latest".to_string(),
            chunked: false,
        }
    }
}

impl MigrationSettings {
    /// Repository name for the image imported on behalf of `container_name`.
    pub fn image_repository(&self, container_name: &str) -> String {
        format!("{}{}", self.image_prefix, container_name)
    }

    /// Full `repository:tag` reference for the imported image.
    pub fn image_reference(&self, container_name: &str) -> String {
        format!("{}:{}", self.image_repository(container_name), self.image_tag)
    }
}

impl OttoConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: OttoConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.transfer.as_ref().and_then(|t| t.chunk_size) == Some(0) {
            anyhow::bail!("transfer.chunk_size must be greater than zero");
        }

        if let Some(strategy) = self.migration.as_ref().and_then(|m| m.strategy.as_deref()) {
            strategy.parse::<MigrationStrategy>()?;
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                anyhow::bail!("duplicate node id: {}", node.id);
            }
        }
        Ok(())
    }

    pub fn transfer_settings(&self) -> TransferSettings {
        let defaults = TransferSettings::default();
        let Some(cfg) = &self.transfer else {
            return defaults;
        };
        TransferSettings {
            chunk_size: cfg.chunk_size.unwrap_or(defaults.chunk_size),
            content_type: cfg.content_type.clone().unwrap_or(defaults.content_type),
            topic_prefix: cfg.topic_prefix.clone().unwrap_or(defaults.topic_prefix),
        }
    }

    /// Resolve migration settings. Call [`OttoConfig::validate`] first;
    /// an unparseable strategy name falls back to the default strategy.
    pub fn migration_settings(&self) -> MigrationSettings {
        let defaults = MigrationSettings::default();
        let Some(cfg) = &self.migration else {
            return defaults;
        };
        MigrationSettings {
            strategy: cfg
                .strategy
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.strategy),
            remove_source: cfg.remove_source.unwrap_or(defaults.remove_source),
            default_command: cfg
                .default_command
                .clone()
                .unwrap_or(defaults.default_command),
            image_prefix: cfg.image_prefix.clone().unwrap_or(defaults.image_prefix),
            image_tag: cfg.image_tag.clone().unwrap_or(defaults.image_tag),
            chunked: cfg.chunked.unwrap_or(defaults.chunked),
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = OttoConfig::from_toml_str("").unwrap();
        assert_eq!(config.transfer_settings().chunk_size, 64 * 1024);
        let migration = config.migration_settings();
        assert_eq!(migration.default_command, "sh");
        assert_eq!(migration.strategy, MigrationStrategy::ExportImport);
        assert!(migration.remove_source);
        assert!(!migration.chunked);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[transfer]
chunk_size = 1024
topic_prefix = "otto/nodes/node2/migration"

[migration]
strategy = "stop_start"
remove_source = false
default_command = "/bin/ash"
chunked = true

[[nodes]]
id = "node1"
host = "192.168.2.6"

[[nodes]]
id = "node2"
host = "192.168.2.7"
runtime_url = "ssh://pi@192.168.2.7"
"#;
        let config = OttoConfig::from_toml_str(toml_str).unwrap();
        let transfer = config.transfer_settings();
        assert_eq!(transfer.chunk_size, 1024);
        assert_eq!(transfer.content_type, "application/x-tar");
        assert_eq!(transfer.topic_prefix, "otto/nodes/node2/migration");

        let migration = config.migration_settings();
        assert_eq!(migration.strategy, MigrationStrategy::StopStart);
        assert!(!migration.remove_source);
        assert_eq!(migration.default_command, "/bin/ash");
        assert!(migration.chunked);

        assert_eq!(
            config.node("node1").unwrap().runtime_url,
            "unix:///var/run/docker.sock"
        );
        assert_eq!(config.node("node2").unwrap().runtime_url, "ssh://pi@192.168.2.7");
        assert!(config.node("node3").is_none());
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let err = OttoConfig::from_toml_str("[transfer]\nchunk_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn unknown_strategy_rejected() {
        let err = OttoConfig::from_toml_str("[migration]\nstrategy = \"teleport\"\n").unwrap_err();
        assert!(err.to_string().contains("teleport"));
    }

    #[test]
    fn duplicate_node_ids_rejected() {
        let toml_str = r#"
[[nodes]]
id = "a"
host = "h1"

[[nodes]]
id = "a"
host = "h2"
"#;
        assert!(OttoConfig::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("otto.toml");
        std::fs::write(&path, "[migration]\nimage_prefix = \"moved_\"\n").unwrap();
        let config = OttoConfig::from_file(&path).unwrap();
        let migration = config.migration_settings();
        assert_eq!(migration.image_repository("web"), "moved_web");
        assert_eq!(migration.image_reference("web"), "moved_web:latest");
    }

    #[test]
    fn toml_round_trip_keeps_nodes() {
        let config = OttoConfig {
            nodes: vec![NodeConfig {
                id: "n1".to_string(),
                host: "10.0.0.1".to_string(),
                runtime_url: default_runtime_url(),
            }],
            ..Default::default()
        };
        let text = config.to_toml_string().unwrap();
        let parsed = OttoConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.nodes, config.nodes);
    }
}
