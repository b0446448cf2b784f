use config::{Config, ConfigError, Environment, File, FileFormat};
use domain::{AccessRights, DataType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hardware the runtime is deployed on
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TargetConfig {
    #[serde(default = "default_target_model")]
    pub model: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            model: default_target_model(),
        }
    }
}

fn default_target_model() -> String {
    "Panel PP886M".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FeaturesConfig {
    #[serde(default)]
    pub fast_logging: bool,
}

/// Bounds for poll group intervals, in milliseconds.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PollLimits {
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,
    #[serde(default = "default_max_interval")]
    pub max_interval_ms: u64,
    #[serde(default = "default_fast_log_min_interval")]
    pub fast_log_min_interval_ms: u64,
    /// Models allowed to poll below `min_interval_ms` with fast logging
    #[serde(default = "default_fast_log_models")]
    pub fast_log_models: Vec<String>,
}

impl Default for PollLimits {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval(),
            max_interval_ms: default_max_interval(),
            fast_log_min_interval_ms: default_fast_log_min_interval(),
            fast_log_models: default_fast_log_models(),
        }
    }
}

fn default_min_interval() -> u64 {
    100
}
fn default_max_interval() -> u64 {
    3_600_000
}
fn default_fast_log_min_interval() -> u64 {
    10
}
fn default_fast_log_models() -> Vec<String> {
    vec!["Panel PP886H".to_string()]
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollGroupConfig {
    pub name: String,
    pub interval_ms: u64,
}

/// A data exchange trigger. Without `interval_ms` values pass through
/// immediately.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TriggerConfig {
    pub name: String,
    #[serde(default)]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ControllerConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub connected: bool,
    /// Simulated round trip of a batch commit
    #[serde(default)]
    pub latency_ms: Option<u64>,
    #[serde(default)]
    pub registers: Vec<RegisterConfig>,
}

/// Initial content of one controller register
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegisterConfig {
    pub item: String,
    pub value: Value,
}

fn default_true() -> bool {
    true
}

/// One controller data item attached to a tag slot.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConstituentConfig {
    pub controller: String,
    pub item: String,
    #[serde(default)]
    pub access: AccessRights,
    #[serde(default)]
    pub index: usize,
    /// Type of the data item; inherited from the tag when omitted
    #[serde(default)]
    pub data_type: Option<DataType>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TagConfig {
    pub name: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub offset: f64,
    #[serde(default = "default_gain")]
    pub gain: f64,
    #[serde(default)]
    pub access_right: AccessRights,
    #[serde(default)]
    pub log_to_audit_trail: bool,
    #[serde(default)]
    pub non_volatile: bool,
    #[serde(default)]
    pub array_size: Option<usize>,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub poll_group: Option<String>,
    #[serde(default)]
    pub initial_value: Option<Value>,
    #[serde(default)]
    pub items: Vec<ConstituentConfig>,
}

fn default_gain() -> f64 {
    1.0
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub poll_limits: PollLimits,
    #[serde(default)]
    pub poll_groups: Vec<PollGroupConfig>,
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
    #[serde(default)]
    pub tags: Vec<TagConfig>,
}

impl RuntimeConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Project file; the runtime refuses to start without it
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. TAGSYNC__TARGET__MODEL="Panel PP886H")
            .add_source(Environment::with_prefix("TAGSYNC").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn controller(&self, name: &str) -> Option<&ControllerConfig> {
        self.controllers.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config.poll_limits, PollLimits::default());
        assert_eq!(config.poll_limits.min_interval_ms, 100);
        assert_eq!(config.poll_limits.fast_log_models, vec!["Panel PP886H"]);
        assert!(!config.features.fast_logging);
        assert!(config.tags.is_empty());
    }

    #[test]
    fn parses_tags_and_constituents() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [target]
            model = "Panel PP886H"

            [features]
            fast_logging = true

            [[controllers]]
            name = "PLC1"
            latency_ms = 5

            [[tags]]
            name = "Tank.Level"
            data_type = "Int16"
            offset = 50.5
            access_right = "Read"

            [[tags.items]]
            controller = "PLC1"
            item = "DB1.DBW0"
            access = "Write"
            "#,
        )
        .unwrap();

        assert_eq!(config.target.model, "Panel PP886H");
        assert!(config.features.fast_logging);
        assert_eq!(config.controller("PLC1").unwrap().latency_ms, Some(5));
        assert!(config.controller("PLC1").unwrap().connected);

        let tag = &config.tags[0];
        assert_eq!(tag.data_type, DataType::Int16);
        assert_eq!(tag.offset, 50.5);
        assert_eq!(tag.gain, 1.0);
        assert_eq!(tag.access_right, AccessRights::Read);
        assert_eq!(tag.items[0].access, AccessRights::Write);
        assert_eq!(tag.items[0].index, 0);
    }
}
