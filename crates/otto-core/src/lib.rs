pub mod config;
pub mod types;

pub use config::{MigrationSettings, NodeConfig, OttoConfig, TransferSettings};
pub use types::*;
