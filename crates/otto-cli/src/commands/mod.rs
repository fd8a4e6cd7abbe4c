pub mod simulate;
pub mod spec;
pub mod transfer;

use std::path::Path;

use otto_core::OttoConfig;

/// Load otto.toml if a path was given, otherwise use defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<OttoConfig> {
    match path {
        Some(path) => OttoConfig::from_file(path),
        None => Ok(OttoConfig::default()),
    }
}
