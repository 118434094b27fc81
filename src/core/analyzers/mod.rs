// crashlog-sleuth - core/analyzers/mod.rs
//
// Concrete analyzer implementations and the default
// registration order used by the Scan Pipeline.

pub mod documents;
pub mod fcx;
pub mod gpu;
pub mod plugin;
pub mod record;
pub mod settings;
pub mod suspect;
pub mod version;

use crate::app::config::ConfigStore;
use crate::core::analyzer::Analyzer;

/// Build the standard analyzer set in registration order. The Settings
/// analyzer runs serially at the lowest priority; the rest are
/// `parallel_safe` and sorted by priority before execution.
pub fn default_analyzers(config: &ConfigStore) -> Vec<Box<dyn Analyzer + '_>> {
    vec![
        Box::new(settings::SettingsAnalyzer::new(config)),
        Box::new(version::VersionAnalyzer::new(config)),
        Box::new(gpu::GpuAnalyzer),
        Box::new(suspect::SuspectAnalyzer::new(config)),
        Box::new(plugin::PluginAnalyzer::new(config)),
        Box::new(record::RecordAnalyzer::new(config)),
        Box::new(documents::DocumentsAnalyzer::new(config)),
        Box::new(fcx::FcxAnalyzer::new(config)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analyzer::partition_serial_parallel;

    #[test]
    fn default_analyzers_partition_settings_as_serial() {
        let config = ConfigStore::from_value(toml::Value::Table(Default::default()));
        let analyzers = default_analyzers(&config);
        let (serial, parallel) = partition_serial_parallel(analyzers);
        assert_eq!(serial.len(), 1);
        assert_eq!(serial[0].name(), "Settings");
        assert_eq!(parallel.len(), 7);
    }
}
