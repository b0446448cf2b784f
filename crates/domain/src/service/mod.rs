//! Interfaces of the runtime services consumed by the tag core.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tracks how many global tags are connected to controllers.
pub trait DataItemCountingService: Send + Sync {
    fn add_connected_data_items(&self, count: usize);
    fn remove_connected_data_items(&self, count: usize);
}

/// Receives one entry per operator change of an audited tag.
pub trait AuditTrailService: Send + Sync {
    fn log_data_item_changed(&self, tag_name: &str, old_value: &Value, new_value: &Value);
}

/// Licensed runtime capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// Poll intervals below the normal minimum
    FastLogging,
}

pub trait FeatureActivationService: Send + Sync {
    fn is_feature_enabled(&self, feature: Feature) -> bool;
}
