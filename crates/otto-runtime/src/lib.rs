//! otto-runtime: the container runtime interface consumed by migrations.
//!
//! A [`ContainerRuntime`] is one independently addressed container engine
//! (a local daemon, a remote host over SSH, ...). The migration core only
//! talks to engines through this trait. Connection lifecycle is explicit:
//! callers `connect()` once and adapters return
//! [`RuntimeError::NotConnected`] for any call made before that, instead
//! of reconnecting behind the caller's back.
//!
//! # Architecture
//!
//! ```text
//! ContainerRuntime (trait)
//!   ├── lifecycle: connect / disconnect
//!   ├── containers: create / start / stop / remove / inspect / list
//!   └── archives: export (filesystem tar) / import_image (tar → image)
//!
//! MemoryRuntime (in-process engine)
//!   ├── images: reference → file tree + default command
//!   └── containers: id → config, state, file tree
//! ```

pub mod error;
pub mod info;
pub mod memory;

use async_trait::async_trait;

pub use error::{RuntimeError, RuntimeOp, RuntimeResult};
pub use info::{
    CommandLine, ContainerConfig, ContainerInfo, ContainerState, ContainerSummary, HostConfig,
    PortBinding,
};
pub use memory::MemoryRuntime;

/// Parameters for creating a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRequest {
    pub image: String,
    pub name: String,
    /// Space-separated command; `None` uses the image default.
    pub command: Option<String>,
    /// Port mappings in `host:container` form (e.g. `8080:80/tcp`).
    pub ports: Vec<String>,
    pub environment: Vec<(String, String)>,
    /// Start the container right after creating it.
    pub start: bool,
}

impl CreateRequest {
    /// A request that creates and starts `name` from `image`.
    pub fn new(image: &str, name: &str) -> Self {
        Self {
            image: image.to_string(),
            name: name.to_string(),
            start: true,
            ..Default::default()
        }
    }

    pub fn command(mut self, command: Option<String>) -> Self {
        self.command = command;
        self
    }

    pub fn ports(mut self, ports: Vec<String>) -> Self {
        self.ports = ports;
        self
    }

    pub fn environment<I>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.environment = env.into_iter().collect();
        self.environment.sort();
        self
    }

    pub fn detached(mut self) -> Self {
        self.start = false;
        self
    }
}

/// One container engine endpoint.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Address of this engine (e.g. `unix:///var/run/docker.sock`).
    fn endpoint(&self) -> &str;

    fn is_connected(&self) -> bool;

    async fn connect(&self) -> RuntimeResult<()>;

    async fn disconnect(&self) -> RuntimeResult<()>;

    /// Create a container and, if `request.start` is set, start it.
    /// Returns the new container ID.
    async fn create_container(&self, request: &CreateRequest) -> RuntimeResult<String>;

    async fn start_container(&self, id: &str) -> RuntimeResult<()>;

    /// Stop a container. Stopping an already stopped container succeeds.
    async fn stop_container(&self, id: &str) -> RuntimeResult<()>;

    async fn remove_container(&self, id: &str, force: bool) -> RuntimeResult<()>;

    /// Serialize the container filesystem as a tar archive.
    async fn export_container(&self, id: &str) -> RuntimeResult<Vec<u8>>;

    /// Register a filesystem tar archive as image `repository:tag`.
    /// Returns the image ID.
    async fn import_image(&self, data: &[u8], repository: &str, tag: &str)
    -> RuntimeResult<String>;

    async fn get_container_info(&self, id: &str) -> RuntimeResult<ContainerInfo>;

    async fn list_containers(&self) -> RuntimeResult<Vec<ContainerSummary>>;
}
