//! Container inspection record.
//!
//! Mirrors the subset of the Docker `GET /containers/{id}/json` payload
//! that Otto reads. Every field is defaulted so that partial or legacy
//! records deserialize without error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Full inspection record for one container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContainerInfo {
    pub id: String,
    /// Container name as reported by the runtime (Docker prefixes a `/`).
    pub name: String,
    /// Image ID the container was created from.
    pub image: String,
    pub config: ContainerConfig,
    pub host_config: HostConfig,
    pub state: ContainerState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContainerConfig {
    /// Configured image reference (e.g. `nginx:latest`).
    pub image: String,
    /// `KEY=VALUE` entries.
    pub env: Option<Vec<String>>,
    pub cmd: Option<CommandLine>,
}

/// A configured command. Current runtimes report an argument list; some
/// legacy records carry a single shell string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Args(Vec<String>),
    Shell(String),
}

impl CommandLine {
    /// Join into a single space-separated command string.
    pub fn joined(&self) -> String {
        match self {
            CommandLine::Args(args) => args.join(" "),
            CommandLine::Shell(s) => s.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CommandLine::Args(args) => args.is_empty(),
            CommandLine::Shell(s) => s.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HostConfig {
    /// Container port spec (e.g. `80/tcp`) → host bindings.
    pub port_bindings: Option<HashMap<String, Option<Vec<PortBinding>>>>,
    /// Bind mounts in `host:container[:mode]` form.
    pub binds: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PortBinding {
    pub host_ip: String,
    pub host_port: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContainerState {
    /// `created`, `running`, `exited`, ...
    pub status: String,
    pub running: bool,
}

/// One row of a container listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}
