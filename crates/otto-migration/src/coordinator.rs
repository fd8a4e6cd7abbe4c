//! Remote migration coordinator.
//!
//! Runs one end-to-end migration between two independently addressed
//! engines: extract the container spec on the source, export, optionally
//! relay the payload through the chunked protocol, import and start on
//! the target, then remove the source. The source is only removed once
//! the target container exists.

use std::sync::Arc;
use std::time::Instant;

use otto_core::{ContainerSpec, MigrationSettings, MigrationStrategy, TransferSettings};
use otto_runtime::ContainerRuntime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::metrics::{RemoteMigrationMetrics, elapsed_s};
use crate::relay::relay_chunked;
use crate::spec::inspect_container_spec;
use crate::strategy::{CriuMigration, ExportImportMigration, MigrationExecutor, StopStartMigration};

/// Outcome of one migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    pub success: bool,
    pub source_container_id: String,
    /// `None` on failure.
    pub target_container_id: Option<String>,
    pub strategy: MigrationStrategy,
    pub message: String,
    /// The source container is stopped (or gone). On failure this means
    /// the workload is currently not running anywhere.
    pub source_stopped: bool,
    pub metrics: RemoteMigrationMetrics,
}

/// Coordinates migrations from `source` to `target`.
pub struct RemoteMigrationCoordinator {
    source: Arc<dyn ContainerRuntime>,
    target: Arc<dyn ContainerRuntime>,
    settings: MigrationSettings,
    transfer: TransferSettings,
}

impl RemoteMigrationCoordinator {
    pub fn new(source: Arc<dyn ContainerRuntime>, target: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            source,
            target,
            settings: MigrationSettings::default(),
            transfer: TransferSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: MigrationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_transfer_settings(mut self, transfer: TransferSettings) -> Self {
        self.transfer = transfer;
        self
    }

    /// Migrate using the configured strategy and `remove_source` flag.
    pub async fn migrate_default(&self, container_id: &str) -> MigrationResult {
        self.migrate(container_id, self.settings.strategy, self.settings.remove_source)
            .await
    }

    /// Migrate `container_id` from source to target. Never fails: errors
    /// are captured into an unsuccessful [`MigrationResult`] carrying the
    /// metrics gathered so far.
    pub async fn migrate(
        &self,
        container_id: &str,
        strategy: MigrationStrategy,
        remove_source: bool,
    ) -> MigrationResult {
        let mut metrics = RemoteMigrationMetrics::new(self.source.endpoint(), self.target.endpoint());
        let started = Instant::now();

        info!(
            container = %container_id,
            %strategy,
            source = %metrics.source_host,
            target = %metrics.target_host,
            "starting migration"
        );

        let outcome = self
            .run(container_id, strategy, remove_source, &mut metrics)
            .await;
        metrics.total_time_s = elapsed_s(started);

        match outcome {
            Ok((target_id, message)) => {
                info!(
                    container = %container_id,
                    target_id = %target_id,
                    total_time_s = metrics.total_time_s,
                    bytes = metrics.transfer_size_bytes,
                    "migration completed"
                );
                MigrationResult {
                    success: true,
                    source_container_id: container_id.to_string(),
                    target_container_id: Some(target_id),
                    strategy,
                    message,
                    source_stopped: true,
                    metrics,
                }
            }
            Err(e) => {
                warn!(container = %container_id, %strategy, error = %e, "migration failed");
                MigrationResult {
                    success: false,
                    source_container_id: container_id.to_string(),
                    target_container_id: None,
                    strategy,
                    message: format!("Migration failed: {e}"),
                    source_stopped: e.source_stopped(),
                    metrics,
                }
            }
        }
    }

    async fn run(
        &self,
        container_id: &str,
        strategy: MigrationStrategy,
        remove_source: bool,
        metrics: &mut RemoteMigrationMetrics,
    ) -> Result<(String, String)> {
        self.ensure_connected().await?;
        let spec = inspect_container_spec(self.source.as_ref(), container_id).await?;

        let (target_id, mut message) = match strategy {
            MigrationStrategy::StopStart => {
                self.stop_start(container_id, &spec, metrics).await?
            }
            MigrationStrategy::ExportImport => {
                self.export_import(container_id, &spec, metrics).await?
            }
            MigrationStrategy::Criu => {
                let data = CriuMigration::new(self.source.clone())
                    .export_container(container_id)
                    .await?;
                let target_id = CriuMigration::new(self.target.clone())
                    .import_container(&spec, data.as_deref())
                    .await?;
                (target_id, "Migration completed (checkpoint/restore)".to_string())
            }
        };

        if remove_source {
            // The target exists at this point; a failed cleanup does not
            // undo the migration.
            if let Err(e) = self.source.remove_container(container_id, true).await {
                warn!(container = %container_id, error = %e, "failed to remove source container");
                message.push_str(&format!(" (source not removed: {e})"));
            }
        }

        Ok((target_id, message))
    }

    async fn ensure_connected(&self) -> Result<()> {
        for runtime in [&self.source, &self.target] {
            if !runtime.is_connected() {
                runtime.connect().await?;
            }
        }
        Ok(())
    }

    async fn stop_start(
        &self,
        container_id: &str,
        spec: &ContainerSpec,
        metrics: &mut RemoteMigrationMetrics,
    ) -> Result<(String, String)> {
        let source = StopStartMigration::new(self.source.clone());
        let target = StopStartMigration::new(self.target.clone());

        let phase = Instant::now();
        source.export_container(container_id).await?;
        metrics.export_time_s = elapsed_s(phase);
        metrics.transfer_size_bytes = 0;

        let phase = Instant::now();
        let target_id = target.import_container(spec, None).await?;
        metrics.import_time_s = elapsed_s(phase);

        Ok((target_id, "Migration completed (stop/start)".to_string()))
    }

    async fn export_import(
        &self,
        container_id: &str,
        spec: &ContainerSpec,
        metrics: &mut RemoteMigrationMetrics,
    ) -> Result<(String, String)> {
        let source = ExportImportMigration::new(self.source.clone(), self.settings.clone());
        let target = ExportImportMigration::new(self.target.clone(), self.settings.clone());

        let phase = Instant::now();
        let mut data = source.export_archive(container_id).await?;
        metrics.export_time_s = elapsed_s(phase);
        metrics.transfer_size_bytes = data.len() as u64;

        if self.settings.chunked {
            let phase = Instant::now();
            data = relay_chunked(&data, &self.transfer).await?;
            metrics.transfer_time_s = elapsed_s(phase);
        }

        let phase = Instant::now();
        let image = target.import_image(spec, &data).await?;
        metrics.import_time_s = elapsed_s(phase);

        let phase = Instant::now();
        let target_id = target.start_from_image(spec, &image).await?;
        metrics.container_start_time_s = elapsed_s(phase);

        Ok((
            target_id,
            format!(
                "Migration completed (export/import, {} bytes)",
                metrics.transfer_size_bytes
            ),
        ))
    }
}
