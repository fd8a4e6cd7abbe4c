//! In-process container engine.
//!
//! `MemoryRuntime` keeps images and containers in memory, each with its
//! own file tree, and implements the full [`ContainerRuntime`] contract:
//! explicit connection lifecycle, name conflicts, create/start/stop/remove
//! state transitions, and real tar archives for export and import. It
//! backs the test suites and the `otto simulate` command.
//!
//! Failures can be injected per operation with
//! [`MemoryRuntime::inject_failure`], and every trait call is recorded
//! (see [`MemoryRuntime::calls`]) so callers can assert on ordering.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{RuntimeError, RuntimeOp, RuntimeResult};
use crate::info::{
    CommandLine, ContainerConfig, ContainerInfo, ContainerState, ContainerSummary, HostConfig,
    PortBinding,
};
use crate::{ContainerRuntime, CreateRequest};

/// Default command given to images fetched implicitly on create.
const PULLED_IMAGE_CMD: &str = "sh";

#[derive(Debug, Clone)]
struct Image {
    id: String,
    cmd: Option<Vec<String>>,
    files: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Created,
    Running,
    Exited,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Created => "created",
            Status::Running => "running",
            Status::Exited => "exited",
        }
    }
}

#[derive(Debug, Clone)]
struct Container {
    id: String,
    name: String,
    image_ref: String,
    image_id: String,
    env: Vec<String>,
    cmd: Vec<String>,
    port_bindings: HashMap<String, Vec<PortBinding>>,
    status: Status,
    files: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Default)]
struct Engine {
    /// `repository:tag` → image.
    images: HashMap<String, Image>,
    /// Container ID → container.
    containers: BTreeMap<String, Container>,
    sequence: u64,
    failures: HashMap<RuntimeOp, String>,
    calls: Vec<(RuntimeOp, String)>,
}

impl Engine {
    /// Resolve an exact ID, a name (with or without the leading `/`), or
    /// a unique ID prefix.
    fn resolve(&self, key: &str) -> RuntimeResult<String> {
        if self.containers.contains_key(key) {
            return Ok(key.to_string());
        }
        let name = key.trim_start_matches('/');
        if let Some(c) = self.containers.values().find(|c| c.name == name) {
            return Ok(c.id.clone());
        }
        let mut matches = self.containers.keys().filter(|id| id.starts_with(key));
        match (matches.next(), matches.next()) {
            (Some(id), None) if !key.is_empty() => Ok(id.clone()),
            _ => Err(RuntimeError::ContainerNotFound(key.to_string())),
        }
    }

    fn container_mut(&mut self, key: &str) -> RuntimeResult<&mut Container> {
        let id = self.resolve(key)?;
        self.containers
            .get_mut(&id)
            .ok_or(RuntimeError::ContainerNotFound(id))
    }
}

/// An in-memory container engine addressed as `endpoint`.
pub struct MemoryRuntime {
    endpoint: String,
    connected: AtomicBool,
    auto_pull: bool,
    engine: Mutex<Engine>,
}

impl MemoryRuntime {
    /// Create an engine. Unknown images are "pulled" (registered with an
    /// empty file tree) on first use.
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            connected: AtomicBool::new(false),
            auto_pull: true,
            engine: Mutex::new(Engine::default()),
        }
    }

    /// Fail `create_container` for images that were not added or imported.
    pub fn without_auto_pull(mut self) -> Self {
        self.auto_pull = false;
        self
    }

    fn engine(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().expect("memory runtime lock")
    }

    /// Register an image with an optional default command.
    pub fn add_image(&self, reference: &str, cmd: Option<Vec<String>>) -> String {
        let id = format!("sha256:{}", digest(reference.as_bytes()));
        self.engine().images.insert(
            normalize_reference(reference),
            Image {
                id: id.clone(),
                cmd,
                files: BTreeMap::new(),
            },
        );
        id
    }

    pub fn has_image(&self, reference: &str) -> bool {
        self.engine()
            .images
            .contains_key(&normalize_reference(reference))
    }

    /// Write a file inside a container, as `docker cp` would.
    pub fn write_file(&self, container: &str, path: &str, data: &[u8]) -> RuntimeResult<()> {
        let mut engine = self.engine();
        let c = engine.container_mut(container)?;
        c.files.insert(normalize_path(path), data.to_vec());
        Ok(())
    }

    /// Read a file from a container's filesystem.
    pub fn read_file(&self, container: &str, path: &str) -> RuntimeResult<Option<Vec<u8>>> {
        let mut engine = self.engine();
        let c = engine.container_mut(container)?;
        Ok(c.files.get(&normalize_path(path)).cloned())
    }

    /// Make every subsequent call of `op` fail with `reason`.
    pub fn inject_failure(&self, op: RuntimeOp, reason: &str) {
        self.engine().failures.insert(op, reason.to_string());
    }

    pub fn clear_failure(&self, op: RuntimeOp) {
        self.engine().failures.remove(&op);
    }

    /// Trait calls made so far, in order, with their target.
    pub fn calls(&self) -> Vec<(RuntimeOp, String)> {
        self.engine().calls.clone()
    }

    /// Record the call, then enforce connection state and injected failures.
    fn begin(&self, engine: &mut Engine, op: RuntimeOp, target: &str) -> RuntimeResult<()> {
        engine.calls.push((op, target.to_string()));
        if op != RuntimeOp::Connect && !self.is_connected() {
            return Err(RuntimeError::NotConnected(self.endpoint.clone()));
        }
        if let Some(reason) = engine.failures.get(&op) {
            return Err(RuntimeError::operation(op, target, reason.clone()));
        }
        Ok(())
    }

    fn lookup_image(&self, engine: &mut Engine, reference: &str) -> RuntimeResult<Image> {
        let key = normalize_reference(reference);
        if let Some(image) = engine.images.get(&key) {
            return Ok(image.clone());
        }
        if !self.auto_pull {
            return Err(RuntimeError::ImageNotFound(reference.to_string()));
        }
        debug!(endpoint = %self.endpoint, image = %key, "pulling image");
        let image = Image {
            id: format!("sha256:{}", digest(key.as_bytes())),
            cmd: Some(vec![PULLED_IMAGE_CMD.to_string()]),
            files: BTreeMap::new(),
        };
        engine.images.insert(key, image.clone());
        Ok(image)
    }
}

#[async_trait]
impl ContainerRuntime for MemoryRuntime {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> RuntimeResult<()> {
        let mut engine = self.engine();
        self.begin(&mut engine, RuntimeOp::Connect, &self.endpoint)?;
        if !self.connected.swap(true, Ordering::SeqCst) {
            debug!(endpoint = %self.endpoint, "connected");
        }
        Ok(())
    }

    async fn disconnect(&self) -> RuntimeResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        debug!(endpoint = %self.endpoint, "disconnected");
        Ok(())
    }

    async fn create_container(&self, request: &CreateRequest) -> RuntimeResult<String> {
        let mut engine = self.engine();
        let name = if request.name.is_empty() {
            request.image.replace([':', '/'], "_")
        } else {
            request.name.clone()
        };
        self.begin(&mut engine, RuntimeOp::Create, &name)?;

        if engine.containers.values().any(|c| c.name == name) {
            return Err(RuntimeError::NameConflict(name));
        }

        let image = self.lookup_image(&mut engine, &request.image)?;
        let cmd = match &request.command {
            Some(command) => command.split_whitespace().map(str::to_string).collect(),
            None => image.cmd.clone().unwrap_or_default(),
        };
        if cmd.is_empty() {
            return Err(RuntimeError::operation(
                RuntimeOp::Create,
                &name,
                "no command specified",
            ));
        }

        let mut port_bindings: HashMap<String, Vec<PortBinding>> = HashMap::new();
        for mapping in &request.ports {
            let (host_port, container_port) = match mapping.split_once(':') {
                Some((host, container)) => (host.to_string(), container.to_string()),
                None => (String::new(), mapping.clone()),
            };
            let container_port = if container_port.contains('/') {
                container_port
            } else {
                format!("{container_port}/tcp")
            };
            let bindings = port_bindings.entry(container_port).or_default();
            if !host_port.is_empty() {
                bindings.push(PortBinding {
                    host_ip: String::new(),
                    host_port,
                });
            }
        }

        engine.sequence += 1;
        let id = digest(format!("{}/{}/{}", self.endpoint, name, engine.sequence).as_bytes());
        let status = if request.start {
            Status::Running
        } else {
            Status::Created
        };
        engine.containers.insert(
            id.clone(),
            Container {
                id: id.clone(),
                name: name.clone(),
                image_ref: request.image.clone(),
                image_id: image.id.clone(),
                env: request
                    .environment
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect(),
                cmd,
                port_bindings,
                status,
                files: image.files.clone(),
            },
        );

        info!(
            endpoint = %self.endpoint,
            container = %name,
            id = %&id[..12],
            image = %request.image,
            started = request.start,
            "container created"
        );
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> RuntimeResult<()> {
        let mut engine = self.engine();
        self.begin(&mut engine, RuntimeOp::Start, id)?;
        engine.container_mut(id)?.status = Status::Running;
        debug!(endpoint = %self.endpoint, container = %id, "container started");
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> RuntimeResult<()> {
        let mut engine = self.engine();
        self.begin(&mut engine, RuntimeOp::Stop, id)?;
        let c = engine.container_mut(id)?;
        if c.status == Status::Running {
            c.status = Status::Exited;
        }
        debug!(endpoint = %self.endpoint, container = %id, "container stopped");
        Ok(())
    }

    async fn remove_container(&self, id: &str, force: bool) -> RuntimeResult<()> {
        let mut engine = self.engine();
        self.begin(&mut engine, RuntimeOp::Remove, id)?;
        let resolved = engine.resolve(id)?;
        let running = engine
            .containers
            .get(&resolved)
            .is_some_and(|c| c.status == Status::Running);
        if running && !force {
            return Err(RuntimeError::operation(
                RuntimeOp::Remove,
                id,
                "container is running; stop it first or force removal",
            ));
        }
        engine.containers.remove(&resolved);
        debug!(endpoint = %self.endpoint, container = %id, "container removed");
        Ok(())
    }

    async fn export_container(&self, id: &str) -> RuntimeResult<Vec<u8>> {
        let mut engine = self.engine();
        self.begin(&mut engine, RuntimeOp::Export, id)?;
        let c = engine.container_mut(id)?;
        let archive = pack_files(&c.files)
            .map_err(|e| RuntimeError::operation(RuntimeOp::Export, id, e.to_string()))?;
        debug!(
            endpoint = %self.endpoint,
            container = %id,
            files = c.files.len(),
            bytes = archive.len(),
            "container exported"
        );
        Ok(archive)
    }

    async fn import_image(
        &self,
        data: &[u8],
        repository: &str,
        tag: &str,
    ) -> RuntimeResult<String> {
        let reference = format!("{repository}:{tag}");
        let mut engine = self.engine();
        self.begin(&mut engine, RuntimeOp::Import, &reference)?;
        let files = unpack_files(data)?;
        let id = format!("sha256:{}", digest(data));
        info!(
            endpoint = %self.endpoint,
            image = %reference,
            files = files.len(),
            bytes = data.len(),
            "image imported"
        );
        engine.images.insert(
            reference,
            Image {
                id: id.clone(),
                cmd: None,
                files,
            },
        );
        Ok(id)
    }

    async fn get_container_info(&self, id: &str) -> RuntimeResult<ContainerInfo> {
        let mut engine = self.engine();
        self.begin(&mut engine, RuntimeOp::Inspect, id)?;
        let c = engine.container_mut(id)?;
        Ok(ContainerInfo {
            id: c.id.clone(),
            name: format!("/{}", c.name),
            image: c.image_id.clone(),
            config: ContainerConfig {
                image: c.image_ref.clone(),
                env: Some(c.env.clone()),
                cmd: Some(CommandLine::Args(c.cmd.clone())),
            },
            host_config: HostConfig {
                port_bindings: Some(
                    c.port_bindings
                        .iter()
                        .map(|(port, bindings)| (port.clone(), Some(bindings.clone())))
                        .collect(),
                ),
                binds: None,
            },
            state: ContainerState {
                status: c.status.as_str().to_string(),
                running: c.status == Status::Running,
            },
        })
    }

    async fn list_containers(&self) -> RuntimeResult<Vec<ContainerSummary>> {
        let mut engine = self.engine();
        self.begin(&mut engine, RuntimeOp::List, &self.endpoint)?;
        Ok(engine
            .containers
            .values()
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                image: c.image_ref.clone(),
                status: c.status.as_str().to_string(),
            })
            .collect())
    }
}

fn digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// `nginx` → `nginx:latest`; references with a tag or digest are kept.
fn normalize_reference(reference: &str) -> String {
    let last = reference.rsplit('/').next().unwrap_or(reference);
    if last.contains(':') || last.contains('@') {
        reference.to_string()
    } else {
        format!("{reference}:latest")
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_start_matches("./").trim_start_matches('/');
    format!("/{trimmed}")
}

fn pack_files(files: &BTreeMap<String, Vec<u8>>) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, path.trim_start_matches('/'), data.as_slice())?;
    }
    builder.into_inner()
}

fn unpack_files(data: &[u8]) -> RuntimeResult<BTreeMap<String, Vec<u8>>> {
    let mut archive = tar::Archive::new(data);
    let mut files = BTreeMap::new();
    let entries = archive
        .entries()
        .map_err(|e| RuntimeError::Archive(e.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| RuntimeError::Archive(e.to_string()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry
            .path()
            .map_err(|e| RuntimeError::Archive(e.to_string()))?
            .to_string_lossy()
            .into_owned();
        if path.split('/').any(|part| part == "..") {
            return Err(RuntimeError::Archive(format!("path traversal in {path}")));
        }
        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .map_err(|e| RuntimeError::Archive(e.to_string()))?;
        files.insert(normalize_path(&path), buf);
    }
    Ok(files)
}
