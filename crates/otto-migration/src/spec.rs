//! Container spec extraction.
//!
//! Derives a [`ContainerSpec`] from a live container's inspection record.
//! Extraction is read-only and best-effort: malformed or missing fields
//! yield empty spec fields rather than errors.

use otto_core::ContainerSpec;
use otto_runtime::{ContainerInfo, ContainerRuntime};
use tracing::debug;

use crate::error::Result;

/// Build a recreation blueprint from an inspection record.
pub fn extract_container_spec(info: &ContainerInfo) -> ContainerSpec {
    let mut spec = ContainerSpec::new(&info.config.image, info.name.trim_start_matches('/'));

    for entry in info.config.env.iter().flatten() {
        if let Some((key, value)) = entry.split_once('=') {
            spec.environment.insert(key.to_string(), value.to_string());
        }
    }

    // Only the first binding of each port is replayed; unbound ports are
    // dropped.
    for (container_port, bindings) in info.host_config.port_bindings.iter().flatten() {
        let host_port = bindings
            .as_ref()
            .and_then(|b| b.first())
            .and_then(|b| b.host_port.parse::<u16>().ok());
        if let Some(host_port) = host_port {
            spec.ports.insert(container_port.clone(), host_port);
        }
    }

    // `host:container[:mode]`; the mode is not carried over.
    for bind in info.host_config.binds.iter().flatten() {
        let mut parts = bind.split(':');
        if let (Some(host), Some(container)) = (parts.next(), parts.next()) {
            spec.volumes.insert(host.to_string(), container.to_string());
        }
    }

    spec.command = info
        .config
        .cmd
        .as_ref()
        .filter(|cmd| !cmd.is_empty())
        .map(|cmd| cmd.joined());

    spec
}

/// Inspect `container_id` on `runtime` and extract its spec.
pub async fn inspect_container_spec(
    runtime: &dyn ContainerRuntime,
    container_id: &str,
) -> Result<ContainerSpec> {
    let info = runtime.get_container_info(container_id).await?;
    let spec = extract_container_spec(&info);
    debug!(
        container = %container_id,
        name = %spec.name,
        image = %spec.image,
        ports = spec.ports.len(),
        env = spec.environment.len(),
        "extracted container spec"
    );
    Ok(spec)
}
