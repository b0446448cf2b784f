use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DataQuality, DataType};

/// A typed value together with its quality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantValue {
    pub value: Value,
    pub quality: DataQuality,
    /// Time the value was produced (device time if known, else arrival)
    pub timestamp: DateTime<Utc>,
}

impl VariantValue {
    pub fn new(value: Value, quality: DataQuality) -> Self {
        Self {
            value,
            quality,
            timestamp: Utc::now(),
        }
    }

    pub fn good(value: Value) -> Self {
        Self::new(value, DataQuality::Good)
    }

    /// Zero value of the given type with Unknown quality.
    pub fn unknown(data_type: DataType) -> Self {
        Self::new(data_type.default_value(), DataQuality::Unknown)
    }

    pub fn as_f64(&self) -> Option<f64> {
        DataType::to_f64(&self.value)
    }

    /// True when the value is numerically zero (or false).
    pub fn is_zero(&self) -> bool {
        self.as_f64().map(|n| n == 0.0).unwrap_or(false)
    }

    /// Compares payloads only; quality and timestamp are ignored.
    pub fn same_value(&self, other: &Self) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) if self.value.is_number() || other.value.is_number() => a == b,
            _ => self.value == other.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_sentinel() {
        let v = VariantValue::unknown(DataType::Int16);
        assert_eq!(v.value, json!(0));
        assert_eq!(v.quality, DataQuality::Unknown);
        assert!(v.is_zero());
    }

    #[test]
    fn test_same_value_ignores_quality_and_number_repr() {
        let a = VariantValue::good(json!(5));
        let b = VariantValue::new(json!(5.0), DataQuality::Bad);
        assert!(a.same_value(&b));
        assert!(!a.same_value(&VariantValue::good(json!(6))));
        assert!(VariantValue::good(json!("x")).same_value(&VariantValue::good(json!("x"))));
    }

    #[test]
    fn test_serialization() {
        let v = VariantValue::good(json!(true));
        let serialized = serde_json::to_string(&v).unwrap();
        let deserialized: VariantValue = serde_json::from_str(&serialized).unwrap();
        assert_eq!(v, deserialized);
    }
}
