use std::path::Path;
use std::sync::Arc;

use otto_core::{MigrationStrategy, OttoConfig};
use otto_migration::{MigrationResult, RemoteMigrationCoordinator};
use otto_runtime::{ContainerRuntime, CreateRequest, MemoryRuntime};
use tracing::info;

use super::load_config;

const SEED_CONTAINER: &str = "otto-demo";
const SEED_FILE: &str = "/var/lib/otto/state.txt";

pub async fn simulate(
    strategy: Option<&str>,
    config: Option<&Path>,
    chunked: bool,
    keep_source: bool,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let result = run(&config, strategy, chunked, keep_source).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        anyhow::bail!(result.message);
    }
    println!("✓ {}", result.message);
    for (name, value) in result.metrics.to_map() {
        println!("  {name:<24} {value:.6}");
    }
    Ok(())
}

/// Seed a container on an in-memory source host and migrate it to an
/// in-memory target host.
pub async fn run(
    config: &OttoConfig,
    strategy: Option<&str>,
    chunked: bool,
    keep_source: bool,
) -> anyhow::Result<MigrationResult> {
    let mut settings = config.migration_settings();
    if let Some(name) = strategy {
        settings.strategy = name.parse::<MigrationStrategy>()?;
    }
    settings.chunked |= chunked;
    let remove_source = settings.remove_source && !keep_source;

    let (source_endpoint, target_endpoint) = endpoints(config);
    let source = Arc::new(MemoryRuntime::new(&source_endpoint));
    let target = Arc::new(MemoryRuntime::new(&target_endpoint));

    let container = seed(&source).await?;
    info!(
        container = %SEED_CONTAINER,
        source = %source_endpoint,
        target = %target_endpoint,
        strategy = %settings.strategy,
        "seeded source host"
    );

    let strategy = settings.strategy;
    let coordinator = RemoteMigrationCoordinator::new(source, target)
        .with_settings(settings)
        .with_transfer_settings(config.transfer_settings());
    Ok(coordinator.migrate(&container, strategy, remove_source).await)
}

/// Endpoints of the first two configured nodes, or placeholders.
fn endpoints(config: &OttoConfig) -> (String, String) {
    let mut hosts = config.nodes.iter().map(|n| n.host.clone());
    let source = hosts.next().unwrap_or_else(|| "node-a".to_string());
    let target = hosts.next().unwrap_or_else(|| "node-b".to_string());
    (source, target)
}

async fn seed(source: &MemoryRuntime) -> anyhow::Result<String> {
    source.connect().await?;
    let id = source
        .create_container(
            &CreateRequest::new("busybox:latest", SEED_CONTAINER)
                .command(Some("sleep 3600".to_string()))
                .ports(vec!["8080:80".to_string()])
                .environment([("OTTO_DEMO".to_string(), "1".to_string())]),
        )
        .await?;
    source.write_file(&id, SEED_FILE, b"hello from the source host\n")?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_runs_export_import() {
        let result = run(&OttoConfig::default(), None, false, false).await.unwrap();
        assert!(result.success, "{}", result.message);
        assert_eq!(result.strategy, MigrationStrategy::ExportImport);
        assert!(result.metrics.transfer_size_bytes > 0);
        assert_eq!(result.metrics.source_host, "node-a");
    }

    #[tokio::test]
    async fn strategy_flag_overrides_config() {
        let config = OttoConfig::from_toml_str(
            r#"
[migration]
strategy = "export_import"

[[nodes]]
id = "a"
host = "ssh://pi@10.0.0.2"

[[nodes]]
id = "b"
host = "ssh://pi@10.0.0.3"
"#,
        )
        .unwrap();

        let result = run(&config, Some("stop-start"), false, true).await.unwrap();
        assert!(result.success, "{}", result.message);
        assert_eq!(result.strategy, MigrationStrategy::StopStart);
        assert_eq!(result.metrics.target_host, "ssh://pi@10.0.0.3");
    }

    #[tokio::test]
    async fn chunked_flag_times_transfer_hop() {
        let config = OttoConfig::from_toml_str("[transfer]\nchunk_size = 256\n").unwrap();
        let result = run(&config, None, true, false).await.unwrap();
        assert!(result.success, "{}", result.message);
        assert!(result.metrics.transfer_size_bytes > 256);
    }

    #[tokio::test]
    async fn criu_reports_failure() {
        let result = run(&OttoConfig::default(), Some("criu"), false, false).await.unwrap();
        assert!(!result.success);
        assert!(result.message.contains("not implemented"));
    }

    #[tokio::test]
    async fn unknown_strategy_is_an_error() {
        assert!(run(&OttoConfig::default(), Some("live"), false, false).await.is_err());
    }
}
