use domain::{DataType, DomainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Linear conversion between device units and tag units.
///
/// `tag = device * gain + offset`. Only applied when the tag has at least
/// one data item and a numeric type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    offset: f64,
    gain: f64,
}

impl Default for Scaling {
    fn default() -> Self {
        Self {
            offset: 0.0,
            gain: 1.0,
        }
    }
}

impl Scaling {
    pub fn new(offset: f64, gain: f64) -> Result<Self> {
        let scaling = Self::default().with_offset(offset)?;
        scaling.with_gain(gain)
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn with_offset(mut self, offset: f64) -> Result<Self> {
        if !offset.is_finite() {
            return Err(DomainError::InvalidArgument(format!(
                "Offset must be finite, got {offset}"
            )));
        }
        self.offset = offset;
        Ok(self)
    }

    pub fn with_gain(mut self, gain: f64) -> Result<Self> {
        if !gain.is_finite() || gain == 0.0 {
            return Err(DomainError::InvalidArgument(format!(
                "Gain must be finite and non-zero, got {gain}"
            )));
        }
        self.gain = gain;
        Ok(self)
    }

    pub fn is_identity(&self) -> bool {
        self.offset == 0.0 && self.gain == 1.0
    }

    /// Device value to tag value
    pub fn to_external(&self, data_type: DataType, internal: &Value) -> Value {
        if self.is_identity() || !data_type.is_numeric() {
            return internal.clone();
        }
        match DataType::to_f64(internal) {
            Some(num) => data_type.from_f64(num * self.gain + self.offset),
            None => internal.clone(),
        }
    }

    /// Tag value to device value, converted to `data_type`
    pub fn to_internal(&self, data_type: DataType, external: &Value) -> Value {
        if self.is_identity() || !data_type.is_numeric() {
            return data_type.convert(external);
        }
        match DataType::to_f64(external) {
            Some(num) => data_type.from_f64((num - self.offset) / self.gain),
            None => data_type.default_value(),
        }
    }
}
