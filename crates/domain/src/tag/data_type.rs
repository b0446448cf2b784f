use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Data type of a tag or of one controller data item
///
/// `Default` marks a type that has not been resolved yet; an aggregate in
/// this state takes the type of the first data item added during live edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataType {
    #[default]
    Default,
    Bit,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float,
    Double,
    String,
    DateTime,
}

impl DataType {
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int16 | Self::UInt16 | Self::Int32 | Self::UInt32)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Self::Float | Self::Double)
    }

    /// Types whose values can be compared against zero (ValueOn/ValueOff).
    pub fn is_numeric_comparable(&self) -> bool {
        self.is_numeric() || matches!(self, Self::Bit | Self::Default)
    }

    fn integer_bounds(&self) -> Option<(f64, f64)> {
        match self {
            Self::Int16 => Some((i16::MIN as f64, i16::MAX as f64)),
            Self::UInt16 => Some((0.0, u16::MAX as f64)),
            Self::Int32 => Some((i32::MIN as f64, i32::MAX as f64)),
            Self::UInt32 => Some((0.0, u32::MAX as f64)),
            _ => None,
        }
    }

    /// Zero value of this type
    pub fn default_value(&self) -> Value {
        match self {
            Self::Bit => Value::Bool(false),
            Self::String => Value::String(String::new()),
            Self::DateTime => Value::String(DateTime::<Utc>::UNIX_EPOCH.to_rfc3339()),
            _ => Value::from(0),
        }
    }

    /// Numeric view of a JSON value: numbers as-is, booleans as 0/1,
    /// strings when they parse as a number.
    pub fn to_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Converts a floating point result into this type.
    ///
    /// Integer types round half to even and saturate at their bounds.
    pub fn from_f64(&self, num: f64) -> Value {
        if let Some((min, max)) = self.integer_bounds() {
            let rounded = num.round_ties_even().clamp(min, max);
            return Value::from(rounded as i64);
        }

        match self {
            Self::Bit => Value::Bool(num != 0.0),
            Self::Float => number((num as f32) as f64),
            Self::String => Value::String(num.to_string()),
            Self::DateTime => self.default_value(),
            _ => number(num),
        }
    }

    /// Detects a zero crossing between two values of this type.
    ///
    /// `Some(true)` when the value switched on (zero to non-zero),
    /// `Some(false)` when it switched off. Strings and timestamps never cross.
    pub fn zero_crossing(&self, old: &Value, new: &Value) -> Option<bool> {
        if !self.is_numeric_comparable() {
            return None;
        }
        let numeric = |v: &Value| match v {
            Value::Number(_) | Value::Bool(_) => Self::to_f64(v),
            _ => None,
        };
        match (numeric(old)? == 0.0, numeric(new)? == 0.0) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }

    /// Converts an arbitrary value into this type, falling back to the
    /// type's zero value when no conversion exists.
    pub fn convert(&self, value: &Value) -> Value {
        match self {
            Self::Default => value.clone(),
            Self::String => match value {
                Value::String(_) => value.clone(),
                Value::Null => self.default_value(),
                other => Value::String(other.to_string()),
            },
            Self::DateTime => match value {
                Value::String(s) if DateTime::parse_from_rfc3339(s).is_ok() => value.clone(),
                _ => self.default_value(),
            },
            _ => match Self::to_f64(value) {
                Some(num) => self.from_f64(num),
                None => self.default_value(),
            },
        }
    }
}

fn number(num: f64) -> Value {
    serde_json::Number::from_f64(num)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_rounds_half_to_even() {
        assert_eq!(DataType::Int16.from_f64(49.5), json!(50));
        assert_eq!(DataType::Int16.from_f64(100.5), json!(100));
        assert_eq!(DataType::Int32.from_f64(-2.5), json!(-2));
        assert_eq!(DataType::Int32.from_f64(7.2), json!(7));
    }

    #[test]
    fn test_integer_saturates() {
        assert_eq!(DataType::Int16.from_f64(40000.0), json!(32767));
        assert_eq!(DataType::UInt16.from_f64(-5.0), json!(0));
    }

    #[test]
    fn test_convert_between_types() {
        assert_eq!(DataType::Bit.convert(&json!(3)), json!(true));
        assert_eq!(DataType::Double.convert(&json!(true)), json!(1.0));
        assert_eq!(DataType::Int32.convert(&json!("12")), json!(12));
        assert_eq!(DataType::String.convert(&json!(12)), json!("12"));
        assert_eq!(DataType::Int16.convert(&json!("abc")), json!(0));
        assert_eq!(DataType::Default.convert(&json!("abc")), json!("abc"));
    }

    #[test]
    fn test_datetime_keeps_valid_timestamps_only() {
        let ts = json!("2024-05-01T10:00:00+00:00");
        assert_eq!(DataType::DateTime.convert(&ts), ts);
        assert_eq!(
            DataType::DateTime.convert(&json!(5)),
            DataType::DateTime.default_value()
        );
    }

    #[test]
    fn test_zero_crossing() {
        assert_eq!(DataType::Int16.zero_crossing(&json!(0), &json!(5)), Some(true));
        assert_eq!(DataType::Int16.zero_crossing(&json!(5), &json!(0)), Some(false));
        assert_eq!(DataType::Int16.zero_crossing(&json!(5), &json!(7)), None);
        assert_eq!(DataType::Bit.zero_crossing(&json!(false), &json!(true)), Some(true));
        assert_eq!(DataType::String.zero_crossing(&json!("0"), &json!("1")), None);
    }

    #[test]
    fn test_numeric_comparable() {
        assert!(DataType::Bit.is_numeric_comparable());
        assert!(DataType::Float.is_numeric_comparable());
        assert!(!DataType::String.is_numeric_comparable());
        assert!(!DataType::DateTime.is_numeric_comparable());
    }
}
