use serde::{Deserialize, Serialize};

mod observer;
pub use observer::{ObserverList, SubscriptionId};

use crate::tag::{DataQuality, VariantValue};

/// Events raised by a single controller data item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DataItemEvent {
    /// The device reported a different value
    ValueChanged { value: VariantValue },
    /// Value went from zero to non-zero
    ValueOn,
    /// Value went from non-zero to zero
    ValueOff,
    /// Raised on a value change and on every report with non-Good quality
    ValueChangedOrError { value: VariantValue },
    /// Quality of the item changed
    QualityChanged { quality: DataQuality },
}

/// Events raised by a global tag
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TagEvent {
    /// Visible value changed; `index` is the subitem (0 for scalar tags)
    ValueChanged { index: usize, value: VariantValue },
    ValueOn { index: usize },
    ValueOff { index: usize },
    QualityChanged { quality: DataQuality },
    /// A write or action was refused because the tag is read-only
    AccessDenied { operation: String },
}

impl DataItemEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ValueChanged { .. } => "ValueChanged",
            Self::ValueOn => "ValueOn",
            Self::ValueOff => "ValueOff",
            Self::ValueChangedOrError { .. } => "ValueChangedOrError",
            Self::QualityChanged { .. } => "QualityChanged",
        }
    }
}

impl TagEvent {
    pub fn access_denied(operation: impl Into<String>) -> Self {
        Self::AccessDenied {
            operation: operation.into(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ValueChanged { .. } => "ValueChanged",
            Self::ValueOn { .. } => "ValueOn",
            Self::ValueOff { .. } => "ValueOff",
            Self::QualityChanged { .. } => "QualityChanged",
            Self::AccessDenied { .. } => "AccessDenied",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_types() {
        assert_eq!(DataItemEvent::ValueOn.event_type(), "ValueOn");
        assert_eq!(
            TagEvent::access_denied("batch_write").event_type(),
            "AccessDenied"
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = TagEvent::ValueChanged {
            index: 2,
            value: VariantValue::good(json!(12)),
        };
        let json_str = serde_json::to_string(&event).unwrap();
        let deserialized: TagEvent = serde_json::from_str(&json_str).unwrap();
        assert_eq!(deserialized.event_type(), "ValueChanged");
    }
}
