use std::path::Path;

use anyhow::Context;
use otto_core::ContainerSpec;
use otto_migration::extract_container_spec;
use otto_runtime::ContainerInfo;

pub fn spec(inspect: &Path) -> anyhow::Result<()> {
    let spec = load_spec(inspect)?;
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}

/// Read an inspection record and extract its spec. `docker inspect`
/// prints an array; the first element is used.
pub fn load_spec(path: &Path) -> anyhow::Result<ContainerSpec> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let record = match value {
        serde_json::Value::Array(mut items) => {
            if items.is_empty() {
                anyhow::bail!("{} contains no inspection records", path.display());
            }
            items.swap_remove(0)
        }
        other => other,
    };
    let info: ContainerInfo = serde_json::from_value(record)?;
    Ok(extract_container_spec(&info))
}
