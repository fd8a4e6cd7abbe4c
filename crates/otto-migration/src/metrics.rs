//! Per-migration timing and size record.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Timings (seconds) and sizes gathered phase by phase during a migration.
/// Phases that did not run stay at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteMigrationMetrics {
    /// Stopping (and for export/import, exporting) the source.
    pub export_time_s: f64,
    pub transfer_size_bytes: u64,
    /// Moving the payload through the chunked protocol, when enabled.
    pub transfer_time_s: f64,
    /// Creating the target container (stop/start) or importing the
    /// image (export/import).
    pub import_time_s: f64,
    /// Creating and starting the container from the imported image.
    pub container_start_time_s: f64,
    pub total_time_s: f64,
    pub source_host: String,
    pub target_host: String,
}

impl RemoteMigrationMetrics {
    pub fn new(source_host: &str, target_host: &str) -> Self {
        Self {
            source_host: source_host.to_string(),
            target_host: target_host.to_string(),
            ..Default::default()
        }
    }

    /// Numeric fields keyed by name, for reporting.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        [
            ("export_time_s", self.export_time_s),
            ("transfer_size_bytes", self.transfer_size_bytes as f64),
            ("transfer_time_s", self.transfer_time_s),
            ("import_time_s", self.import_time_s),
            ("container_start_time_s", self.container_start_time_s),
            ("total_time_s", self.total_time_s),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

/// Seconds elapsed since `start`.
pub(crate) fn elapsed_s(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_has_numeric_fields_only() {
        let mut metrics = RemoteMigrationMetrics::new("unix:///var/run/docker.sock", "ssh://pi@n2");
        metrics.transfer_size_bytes = 2048;
        metrics.export_time_s = 0.5;

        let map = metrics.to_map();
        assert_eq!(map.len(), 6);
        assert_eq!(map["transfer_size_bytes"], 2048.0);
        assert_eq!(map["export_time_s"], 0.5);
        assert_eq!(map["import_time_s"], 0.0);
        assert!(!map.contains_key("source_host"));
    }
}
