//! End-to-end remote migrations between two in-memory engines.

use std::sync::Arc;

use otto_core::{MigrationSettings, MigrationStrategy, TransferSettings};
use otto_migration::RemoteMigrationCoordinator;
use otto_runtime::{ContainerRuntime, CreateRequest, MemoryRuntime, RuntimeOp};

struct Hosts {
    source: Arc<MemoryRuntime>,
    target: Arc<MemoryRuntime>,
    container: String,
}

impl Hosts {
    /// Host A runs `c1` (busybox, sleeping) with one file written into it.
    /// Neither engine is connected: the coordinator connects them.
    async fn new() -> Self {
        let source = Arc::new(MemoryRuntime::new("ssh://pi@node-a"));
        let target = Arc::new(MemoryRuntime::new("ssh://pi@node-b"));

        source.connect().await.unwrap();
        let container = source
            .create_container(
                &CreateRequest::new("busybox", "c1")
                    .command(Some("sleep 3600".to_string()))
                    .ports(vec!["8080:80".to_string()])
                    .environment([("MODE".to_string(), "prod".to_string())]),
            )
            .await
            .unwrap();
        source
            .write_file(&container, "/var/lib/app/counter", b"42")
            .unwrap();
        source.disconnect().await.unwrap();

        Self {
            source,
            target,
            container,
        }
    }

    fn coordinator(&self) -> RemoteMigrationCoordinator {
        RemoteMigrationCoordinator::new(self.source.clone(), self.target.clone())
    }

    async fn source_names(&self) -> Vec<String> {
        self.source
            .list_containers()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect()
    }
}

#[tokio::test]
async fn stop_start_moves_container() {
    let hosts = Hosts::new().await;
    let result = hosts
        .coordinator()
        .migrate(&hosts.container, MigrationStrategy::StopStart, true)
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.strategy, MigrationStrategy::StopStart);
    assert_eq!(result.source_container_id, hosts.container);
    assert!(hosts.source.is_connected());
    assert!(hosts.target.is_connected());
    assert!(hosts.source_names().await.is_empty());

    let target_id = result.target_container_id.unwrap();
    let info = hosts.target.get_container_info(&target_id).await.unwrap();
    assert_eq!(info.name, "/c1");
    assert_eq!(info.config.image, "busybox");
    assert!(info.state.running);

    // Fresh container: nothing from the source filesystem.
    assert_eq!(
        hosts
            .target
            .read_file(&target_id, "/var/lib/app/counter")
            .unwrap(),
        None
    );
    assert_eq!(result.metrics.transfer_size_bytes, 0);
    assert_eq!(result.metrics.source_host, "ssh://pi@node-a");
    assert_eq!(result.metrics.target_host, "ssh://pi@node-b");
}

#[tokio::test]
async fn export_import_carries_filesystem_and_metrics() {
    let hosts = Hosts::new().await;
    let result = hosts
        .coordinator()
        .migrate(&hosts.container, MigrationStrategy::ExportImport, true)
        .await;

    assert!(result.success, "{}", result.message);
    let target_id = result.target_container_id.clone().unwrap();
    assert_eq!(
        hosts
            .target
            .read_file(&target_id, "/var/lib/app/counter")
            .unwrap()
            .as_deref(),
        Some(&b"42"[..])
    );

    let info = hosts.target.get_container_info(&target_id).await.unwrap();
    assert_eq!(info.config.image, "migrated_c1:latest");
    assert_eq!(info.config.cmd.unwrap().joined(), "sleep 3600");
    let bindings = info.host_config.port_bindings.unwrap();
    assert_eq!(bindings["80/tcp"].as_ref().unwrap()[0].host_port, "8080");

    let metrics = &result.metrics;
    assert!(metrics.transfer_size_bytes > 0);
    assert_eq!(metrics.transfer_time_s, 0.0);
    assert!(metrics.total_time_s >= metrics.export_time_s);
    assert!(result.message.contains(&metrics.transfer_size_bytes.to_string()));
}

#[tokio::test]
async fn chunked_hop_is_transparent() {
    let hosts = Hosts::new().await;
    let settings = MigrationSettings {
        chunked: true,
        ..Default::default()
    };
    let transfer = TransferSettings {
        chunk_size: 100,
        ..Default::default()
    };
    let result = hosts
        .coordinator()
        .with_settings(settings)
        .with_transfer_settings(transfer)
        .migrate(&hosts.container, MigrationStrategy::ExportImport, true)
        .await;

    assert!(result.success, "{}", result.message);
    let target_id = result.target_container_id.unwrap();
    assert_eq!(
        hosts
            .target
            .read_file(&target_id, "/var/lib/app/counter")
            .unwrap()
            .as_deref(),
        Some(&b"42"[..])
    );
    // The archive spans several chunks.
    assert!(result.metrics.transfer_size_bytes > 100);
}

#[tokio::test]
async fn relay_failure_fails_migration_before_import() {
    let hosts = Hosts::new().await;
    let settings = MigrationSettings {
        chunked: true,
        ..Default::default()
    };
    let transfer = TransferSettings {
        chunk_size: 0,
        ..Default::default()
    };
    let result = hosts
        .coordinator()
        .with_settings(settings)
        .with_transfer_settings(transfer)
        .migrate(&hosts.container, MigrationStrategy::ExportImport, true)
        .await;

    assert!(!result.success);
    assert!(result.target_container_id.is_none());
    assert!(result.source_stopped);
    assert!(result.metrics.transfer_size_bytes > 0);
    assert!(result.message.contains("transfer failed"), "{}", result.message);
    assert!(
        !hosts
            .target
            .calls()
            .iter()
            .any(|(op, _)| *op == RuntimeOp::Import)
    );
    assert!(
        !hosts
            .source
            .calls()
            .iter()
            .any(|(op, _)| *op == RuntimeOp::Remove)
    );
    assert_eq!(hosts.source_names().await, vec!["c1".to_string()]);
}

#[tokio::test]
async fn export_failure_leaves_source_in_place() {
    let hosts = Hosts::new().await;
    hosts.source.inject_failure(RuntimeOp::Export, "disk full");

    let result = hosts
        .coordinator()
        .migrate(&hosts.container, MigrationStrategy::ExportImport, true)
        .await;

    assert!(!result.success);
    assert!(result.target_container_id.is_none());
    assert!(result.message.starts_with("Migration failed:"));
    assert!(result.message.contains("disk full"));
    assert!(result.source_stopped);
    assert_eq!(hosts.source_names().await, vec!["c1".to_string()]);
    assert!(
        !hosts
            .source
            .calls()
            .iter()
            .any(|(op, _)| *op == RuntimeOp::Remove)
    );
    assert!(
        !hosts
            .target
            .calls()
            .iter()
            .any(|(op, _)| *op == RuntimeOp::Create)
    );
}

#[tokio::test]
async fn import_failure_reports_stopped_source() {
    let hosts = Hosts::new().await;
    hosts.target.inject_failure(RuntimeOp::Import, "no space left");

    let result = hosts
        .coordinator()
        .migrate(&hosts.container, MigrationStrategy::ExportImport, true)
        .await;

    assert!(!result.success);
    assert!(result.source_stopped);
    assert!(result.metrics.transfer_size_bytes > 0);
    assert_eq!(hosts.source_names().await, vec!["c1".to_string()]);
}

#[tokio::test]
async fn criu_fails_without_touching_either_host() {
    let hosts = Hosts::new().await;
    let result = hosts
        .coordinator()
        .migrate(&hosts.container, MigrationStrategy::Criu, true)
        .await;

    assert!(!result.success);
    assert!(result.target_container_id.is_none());
    assert!(
        result.message.contains("CRIU checkpoint not implemented"),
        "{}",
        result.message
    );
    assert!(!result.source_stopped);

    let info = hosts
        .source
        .get_container_info(&hosts.container)
        .await
        .unwrap();
    assert!(info.state.running);
    assert!(hosts.target.list_containers().await.unwrap().is_empty());
}

#[tokio::test]
async fn source_kept_when_removal_disabled() {
    let hosts = Hosts::new().await;
    let result = hosts
        .coordinator()
        .migrate(&hosts.container, MigrationStrategy::StopStart, false)
        .await;

    assert!(result.success, "{}", result.message);
    let info = hosts
        .source
        .get_container_info(&hosts.container)
        .await
        .unwrap();
    assert_eq!(info.state.status, "exited");
}

#[tokio::test]
async fn removal_failure_does_not_fail_migration() {
    let hosts = Hosts::new().await;
    hosts.source.inject_failure(RuntimeOp::Remove, "device busy");

    let result = hosts
        .coordinator()
        .migrate(&hosts.container, MigrationStrategy::StopStart, true)
        .await;

    assert!(result.success);
    assert!(result.target_container_id.is_some());
    assert!(result.message.contains("source not removed"));
}

#[tokio::test]
async fn target_created_before_source_removed() {
    let hosts = Hosts::new().await;
    let result = hosts
        .coordinator()
        .migrate(&hosts.container, MigrationStrategy::StopStart, true)
        .await;
    assert!(result.success);

    let source_ops: Vec<RuntimeOp> = hosts.source.calls().into_iter().map(|(op, _)| op).collect();
    let target_ops: Vec<RuntimeOp> = hosts.target.calls().into_iter().map(|(op, _)| op).collect();
    assert_eq!(source_ops.last(), Some(&RuntimeOp::Remove));
    assert!(target_ops.contains(&RuntimeOp::Create));
}

#[tokio::test]
async fn default_settings_drive_migrate_default() {
    let hosts = Hosts::new().await;
    let settings = MigrationSettings {
        strategy: MigrationStrategy::StopStart,
        remove_source: false,
        ..Default::default()
    };
    let result = hosts
        .coordinator()
        .with_settings(settings)
        .migrate_default(&hosts.container)
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.strategy, MigrationStrategy::StopStart);
    assert_eq!(hosts.source_names().await, vec!["c1".to_string()]);
}

#[tokio::test]
async fn unknown_container_fails_cleanly() {
    let hosts = Hosts::new().await;
    let result = hosts
        .coordinator()
        .migrate("missing", MigrationStrategy::StopStart, true)
        .await;

    assert!(!result.success);
    assert!(!result.source_stopped);
    assert!(result.message.contains("missing"));
}
