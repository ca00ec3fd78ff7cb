use crate::error::{AudienceError, AudienceResult};
use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `AUDIENCE_PLANNER__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub population: PopulationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Limits applied by the segmentation engine. Request overrides are
/// clamped against these values, never the other way round.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationConfig {
    /// Hard cap on the number of segments returned per strategy.
    #[serde(default = "default_max_segment_groups")]
    pub max_segment_groups: usize,
    /// Minimum group size and marginal gain in automatic mode.
    #[serde(default = "default_min_group_size")]
    pub min_group_size: usize,
    /// Minimum marginal gain in custom mode when the request sets none.
    #[serde(default = "default_custom_min_group_size")]
    pub custom_min_group_size: usize,
    /// How many entries of the automatic attribute list are scanned.
    #[serde(default = "default_max_attributes")]
    pub max_attributes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopulationConfig {
    /// JSON snapshot of decrypted client records.
    #[serde(default = "default_population_path")]
    pub path: String,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_max_segment_groups() -> usize {
    5
}
fn default_min_group_size() -> usize {
    3
}
fn default_custom_min_group_size() -> usize {
    1
}
fn default_max_attributes() -> usize {
    8
}
fn default_population_path() -> String {
    "data/clients.json".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_segment_groups: default_max_segment_groups(),
            min_group_size: default_min_group_size(),
            custom_min_group_size: default_custom_min_group_size(),
            max_attributes: default_max_attributes(),
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            path: default_population_path(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            segmentation: SegmentationConfig::default(),
            population: PopulationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    /// A file that was named but cannot be read or parsed is an error.
    pub fn load(file: Option<&str>) -> AudienceResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("AUDIENCE_PLANNER")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            )
            .build()
            .map_err(|e| AudienceError::Config(e.to_string()))?;
        config
            .try_deserialize()
            .map_err(|e| AudienceError::Config(e.to_string()))
    }
}
