//! Migration strategies.
//!
//! Every strategy implements [`MigrationExecutor`]: `export_container`
//! runs against the source engine and `import_container` against the
//! target engine. [`executor_for`] maps the closed [`MigrationStrategy`]
//! enumeration onto the concrete executor.

use std::sync::Arc;

use async_trait::async_trait;
use otto_core::{ContainerSpec, MigrationSettings, MigrationStrategy};
use otto_runtime::{ContainerRuntime, CreateRequest};
use tracing::{debug, info};

use crate::error::{MigrationError, Result};

#[async_trait]
pub trait MigrationExecutor: Send + Sync {
    fn strategy(&self) -> MigrationStrategy;

    /// Take the container down and return its transferable state, if the
    /// strategy carries any.
    async fn export_container(&self, container_id: &str) -> Result<Option<Vec<u8>>>;

    /// Recreate the container from `spec` (and exported state) and return
    /// the new container ID.
    async fn import_container(&self, spec: &ContainerSpec, data: Option<&[u8]>) -> Result<String>;
}

/// Build the create request shared by both implemented strategies.
fn create_request(spec: &ContainerSpec, image: &str, command: Option<String>) -> CreateRequest {
    CreateRequest::new(image, &spec.name)
        .command(command)
        .ports(spec.port_mappings())
        .environment(spec.environment.clone())
}

// ── Stop/start ────────────────────────────────────────────────────

/// Stop on the source, recreate fresh from the container spec on the target.
/// No state is carried over.
pub struct StopStartMigration {
    runtime: Arc<dyn ContainerRuntime>,
}

impl StopStartMigration {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl MigrationExecutor for StopStartMigration {
    fn strategy(&self) -> MigrationStrategy {
        MigrationStrategy::StopStart
    }

    async fn export_container(&self, container_id: &str) -> Result<Option<Vec<u8>>> {
        self.runtime
            .stop_container(container_id)
            .await
            .map_err(|e| MigrationError::export(container_id, false, e))?;
        debug!(container = %container_id, "source stopped, nothing to export");
        Ok(None)
    }

    async fn import_container(&self, spec: &ContainerSpec, _data: Option<&[u8]>) -> Result<String> {
        let request = create_request(spec, &spec.image, spec.command.clone());
        let id = self
            .runtime
            .create_container(&request)
            .await
            .map_err(|e| MigrationError::import(&spec.name, e))?;
        info!(container = %spec.name, image = %spec.image, "recreated container from spec");
        Ok(id)
    }
}

// ── Export/import ─────────────────────────────────────────────────

/// Carry the container filesystem as a tar archive and rebuild it as a
/// new image on the target. Process memory is not preserved.
pub struct ExportImportMigration {
    runtime: Arc<dyn ContainerRuntime>,
    settings: MigrationSettings,
}

impl ExportImportMigration {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, settings: MigrationSettings) -> Self {
        Self { runtime, settings }
    }

    /// Stop the container and archive its filesystem.
    pub async fn export_archive(&self, container_id: &str) -> Result<Vec<u8>> {
        self.runtime
            .stop_container(container_id)
            .await
            .map_err(|e| MigrationError::export(container_id, false, e))?;
        let data = self
            .runtime
            .export_container(container_id)
            .await
            .map_err(|e| MigrationError::export(container_id, true, e))?;
        debug!(container = %container_id, bytes = data.len(), "filesystem exported");
        Ok(data)
    }

    /// Register `data` as an image named after `spec.name`. Returns the
    /// `repository:tag` reference.
    pub async fn import_image(&self, spec: &ContainerSpec, data: &[u8]) -> Result<String> {
        let repository = self.settings.image_repository(&spec.name);
        self.runtime
            .import_image(data, &repository, &self.settings.image_tag)
            .await
            .map_err(|e| MigrationError::import(&spec.name, e))?;
        Ok(self.settings.image_reference(&spec.name))
    }

    /// Create and start the container from an imported image. Imports
    /// lose the image's entrypoint/cmd, so a command is always supplied.
    pub async fn start_from_image(&self, spec: &ContainerSpec, image: &str) -> Result<String> {
        let command = spec
            .command
            .clone()
            .unwrap_or_else(|| self.settings.default_command.clone());
        let request = create_request(spec, image, Some(command));
        let id = self
            .runtime
            .create_container(&request)
            .await
            .map_err(|e| MigrationError::import(&spec.name, e))?;
        info!(container = %spec.name, image = %image, "container started from imported image");
        Ok(id)
    }
}

#[async_trait]
impl MigrationExecutor for ExportImportMigration {
    fn strategy(&self) -> MigrationStrategy {
        MigrationStrategy::ExportImport
    }

    async fn export_container(&self, container_id: &str) -> Result<Option<Vec<u8>>> {
        self.export_archive(container_id).await.map(Some)
    }

    async fn import_container(&self, spec: &ContainerSpec, data: Option<&[u8]>) -> Result<String> {
        let data = data.ok_or_else(|| {
            MigrationError::import(&spec.name, "export/import strategy requires export data")
        })?;
        let image = self.import_image(spec, data).await?;
        self.start_from_image(spec, &image).await
    }
}

// ── Checkpoint/restore ────────────────────────────────────────────

/// Reserved for CRIU checkpoint/restore. Both directions fail.
pub struct CriuMigration {
    _runtime: Arc<dyn ContainerRuntime>,
}

impl CriuMigration {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { _runtime: runtime }
    }
}

#[async_trait]
impl MigrationExecutor for CriuMigration {
    fn strategy(&self) -> MigrationStrategy {
        MigrationStrategy::Criu
    }

    async fn export_container(&self, _container_id: &str) -> Result<Option<Vec<u8>>> {
        Err(MigrationError::NotImplemented("CRIU checkpoint"))
    }

    async fn import_container(&self, _spec: &ContainerSpec, _data: Option<&[u8]>) -> Result<String> {
        Err(MigrationError::NotImplemented("CRIU restore"))
    }
}

// ── Factory ───────────────────────────────────────────────────────

/// One executor per strategy.
pub enum Executor {
    StopStart(StopStartMigration),
    ExportImport(ExportImportMigration),
    Criu(CriuMigration),
}

/// Build the executor for `strategy`, bound to `runtime`.
pub fn executor_for(
    strategy: MigrationStrategy,
    runtime: Arc<dyn ContainerRuntime>,
    settings: &MigrationSettings,
) -> Executor {
    match strategy {
        MigrationStrategy::StopStart => Executor::StopStart(StopStartMigration::new(runtime)),
        MigrationStrategy::ExportImport => {
            Executor::ExportImport(ExportImportMigration::new(runtime, settings.clone()))
        }
        MigrationStrategy::Criu => Executor::Criu(CriuMigration::new(runtime)),
    }
}

/// Like [`executor_for`], from a strategy name such as `"export_import"`.
pub fn executor_for_name(
    name: &str,
    runtime: Arc<dyn ContainerRuntime>,
    settings: &MigrationSettings,
) -> Result<Executor> {
    let strategy: MigrationStrategy = name.parse()?;
    Ok(executor_for(strategy, runtime, settings))
}

impl Executor {
    fn inner(&self) -> &dyn MigrationExecutor {
        match self {
            Executor::StopStart(e) => e,
            Executor::ExportImport(e) => e,
            Executor::Criu(e) => e,
        }
    }
}

#[async_trait]
impl MigrationExecutor for Executor {
    fn strategy(&self) -> MigrationStrategy {
        self.inner().strategy()
    }

    async fn export_container(&self, container_id: &str) -> Result<Option<Vec<u8>>> {
        self.inner().export_container(container_id).await
    }

    async fn import_container(&self, spec: &ContainerSpec, data: Option<&[u8]>) -> Result<String> {
        self.inner().import_container(spec, data).await
    }
}
