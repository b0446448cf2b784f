use domain::{DataType, DomainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inclusive limits for Increment/Decrement actions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionBounds {
    min: f64,
    max: f64,
}

impl ActionBounds {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(DomainError::InvalidArgument(format!(
                "Action bounds out of order: min {min} > max {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Operator actions on a global tag.
///
/// Each action reads the current value of every constituent, combines it
/// and writes the result back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TagAction {
    Increment {
        amount: f64,
        #[serde(default)]
        bounds: Option<ActionBounds>,
    },
    Decrement {
        amount: f64,
        #[serde(default)]
        bounds: Option<ActionBounds>,
    },
    SetAnalog {
        value: f64,
    },
    /// Sets the tag to 1 (true)
    SetTag,
    /// Sets the tag to 0 (false)
    ResetTag,
    ToggleTag,
    SetString {
        value: String,
    },
}

impl TagAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Increment { .. } => "IncrementAnalog",
            Self::Decrement { .. } => "DecrementAnalog",
            Self::SetAnalog { .. } => "SetAnalog",
            Self::SetTag => "SetTag",
            Self::ResetTag => "ResetTag",
            Self::ToggleTag => "ToggleTag",
            Self::SetString { .. } => "SetString",
        }
    }

    /// Combines the current tag value with this action.
    pub fn apply(&self, current: &Value, data_type: DataType) -> Value {
        let current_num = || DataType::to_f64(current).unwrap_or(0.0);
        let numeric = |num: f64| match data_type {
            DataType::Default => DataType::Double.from_f64(num),
            other => other.from_f64(num),
        };

        match self {
            Self::Increment { amount, bounds } => {
                let next = current_num() + amount;
                numeric(bounds.map(|b| b.clamp(next)).unwrap_or(next))
            }
            Self::Decrement { amount, bounds } => {
                let next = current_num() - amount;
                numeric(bounds.map(|b| b.clamp(next)).unwrap_or(next))
            }
            Self::SetAnalog { value } => numeric(*value),
            Self::SetTag => numeric(1.0),
            Self::ResetTag => numeric(0.0),
            Self::ToggleTag => numeric(if current_num() == 0.0 { 1.0 } else { 0.0 }),
            Self::SetString { value } => data_type.convert(&Value::String(value.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bounds_order() {
        assert!(ActionBounds::new(0.0, 10.0).is_ok());
        let err = ActionBounds::new(10.0, 0.0).unwrap_err();
        assert!(err.is_argument_error());
    }

    #[test]
    fn test_increment_with_bounds() {
        let action = TagAction::Increment {
            amount: 5.0,
            bounds: Some(ActionBounds::new(0.0, 12.0).unwrap()),
        };
        assert_eq!(action.apply(&json!(4), DataType::Int16), json!(9));
        assert_eq!(action.apply(&json!(9), DataType::Int16), json!(12));
    }

    #[test]
    fn test_decrement_without_bounds() {
        let action = TagAction::Decrement {
            amount: 1.5,
            bounds: None,
        };
        assert_eq!(action.apply(&json!(1.0), DataType::Double), json!(-0.5));
    }

    #[test]
    fn test_toggle_and_set() {
        assert_eq!(TagAction::ToggleTag.apply(&json!(false), DataType::Bit), json!(true));
        assert_eq!(TagAction::ToggleTag.apply(&json!(3), DataType::Int32), json!(0));
        assert_eq!(TagAction::SetTag.apply(&json!(0), DataType::Bit), json!(true));
        assert_eq!(TagAction::ResetTag.apply(&json!(7), DataType::UInt16), json!(0));
    }

    #[test]
    fn test_set_string() {
        let action = TagAction::SetString {
            value: "RUN".to_string(),
        };
        assert_eq!(action.apply(&json!(""), DataType::String), json!("RUN"));
    }
}
