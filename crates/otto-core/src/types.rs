//! Shared types used across Otto crates.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declarative blueprint used to recreate a container on another host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: String,
    pub name: String,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// Container port spec (e.g. "80/tcp") → host port.
    #[serde(default)]
    pub ports: BTreeMap<String, u16>,
    /// Host path → container path.
    #[serde(default)]
    pub volumes: BTreeMap<String, String>,
    /// `None` means "use the image default".
    #[serde(default)]
    pub command: Option<String>,
}

impl ContainerSpec {
    pub fn new(image: &str, name: &str) -> Self {
        Self {
            image: image.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Port bindings rendered as `"host:container"` strings, ordered by
    /// container port.
    pub fn port_mappings(&self) -> Vec<String> {
        self.ports
            .iter()
            .map(|(container, host)| format!("{host}:{container}"))
            .collect()
    }
}

/// Migration strategy identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStrategy {
    /// Stop on source, recreate from spec on target. No state survives.
    StopStart,
    /// Export the filesystem as an archive and import it as an image.
    ExportImport,
    /// Checkpoint/restore. Reserved; not implemented.
    Criu,
}

impl MigrationStrategy {
    pub const ALL: [MigrationStrategy; 3] = [
        MigrationStrategy::StopStart,
        MigrationStrategy::ExportImport,
        MigrationStrategy::Criu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStrategy::StopStart => "stop_start",
            MigrationStrategy::ExportImport => "export_import",
            MigrationStrategy::Criu => "criu",
        }
    }
}

impl fmt::Display for MigrationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strategy name that does not map to any [`MigrationStrategy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown migration strategy: {0}")]
pub struct UnknownStrategy(pub String);

impl FromStr for MigrationStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "stop_start" => Ok(MigrationStrategy::StopStart),
            "export_import" => Ok(MigrationStrategy::ExportImport),
            "criu" => Ok(MigrationStrategy::Criu),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}
