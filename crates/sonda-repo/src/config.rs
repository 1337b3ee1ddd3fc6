use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use sonda_analyze::AnalyzerConfig;
use sonda_core::{Error, Result};
use sonda_introspect::DiscoveryOptions;

/// Engine configuration, loadable from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Tables dropped from discovery entirely.
    pub exclude_tables: Vec<String>,
    /// Whether views are discovered alongside tables.
    pub include_views: bool,
    /// Overrides for the native-to-Rust type mapper, keyed by native type.
    pub custom_type_mappings: BTreeMap<String, String>,
    pub slow_query_threshold_ms: u64,
    pub large_result_set_threshold: u64,
    pub repeat_threshold: usize,
    pub repeat_window_ms: u64,
    pub repeat_retention_ms: u64,
    pub detect_slow_queries: bool,
    pub detect_repeated_queries: bool,
    pub detect_missing_indexes: bool,
    pub detect_large_result_sets: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let analyzer = AnalyzerConfig::default();
        Self {
            exclude_tables: Vec::new(),
            include_views: true,
            custom_type_mappings: BTreeMap::new(),
            slow_query_threshold_ms: analyzer.slow_query_threshold_ms,
            large_result_set_threshold: analyzer.large_result_set_threshold,
            repeat_threshold: analyzer.repeat_threshold,
            repeat_window_ms: analyzer.repeat_window.as_millis() as u64,
            repeat_retention_ms: analyzer.repeat_retention.as_millis() as u64,
            detect_slow_queries: analyzer.detect_slow_queries,
            detect_repeated_queries: analyzer.detect_repeated_queries,
            detect_missing_indexes: analyzer.detect_missing_indexes,
            detect_large_result_sets: analyzer.detect_large_result_sets,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| Error::Validation(format!("invalid config: {err}")))
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            exclude_tables: self.exclude_tables.clone(),
            include_views: self.include_views,
        }
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            slow_query_threshold_ms: self.slow_query_threshold_ms,
            large_result_set_threshold: self.large_result_set_threshold,
            repeat_threshold: self.repeat_threshold,
            repeat_window: Duration::from_millis(self.repeat_window_ms),
            repeat_retention: Duration::from_millis(self.repeat_retention_ms),
            history_cap: AnalyzerConfig::default().history_cap,
            detect_slow_queries: self.detect_slow_queries,
            detect_repeated_queries: self.detect_repeated_queries,
            detect_missing_indexes: self.detect_missing_indexes,
            detect_large_result_sets: self.detect_large_result_sets,
        }
    }
}
