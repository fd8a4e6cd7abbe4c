//! otto-migration: move running containers between engines.
//!
//! Three strategies trade fidelity for cost:
//!
//! | Strategy | Carries | Payload |
//! |---|---|---|
//! | `stop_start` | nothing (fresh container from spec) | none |
//! | `export_import` | filesystem | tar archive of the container |
//! | `criu` | memory + filesystem | reserved, not implemented |
//!
//! # Architecture
//!
//! ```text
//! RemoteMigrationCoordinator
//!   ├── source: ContainerRuntime ── inspect → ContainerSpec
//!   │                            └─ stop / export (strategy export phase)
//!   ├── relay (optional) ── ChunkedTransferSender → ChunkedTransferReceiver
//!   ├── target: ContainerRuntime ── import image / create + start
//!   └── RemoteMigrationMetrics (per-phase timings, payload size)
//! ```

pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod relay;
pub mod spec;
pub mod strategy;

pub use coordinator::{MigrationResult, RemoteMigrationCoordinator};
pub use error::MigrationError;
pub use metrics::RemoteMigrationMetrics;
pub use relay::relay_chunked;
pub use spec::{extract_container_spec, inspect_container_spec};
pub use strategy::{
    CriuMigration, Executor, ExportImportMigration, MigrationExecutor, StopStartMigration,
    executor_for, executor_for_name,
};
