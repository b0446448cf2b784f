use serde::{Deserialize, Serialize};

/// Data quality annotation carried by every value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataQuality {
    /// Value is valid and trustworthy
    Good,
    /// Value is invalid or the device could not be reached
    Bad,
    /// No value has been received yet
    Unknown,
}

impl DataQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Bad => "bad",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self, Self::Good)
    }

    /// Combines two qualities, keeping the worse one (Bad < Unknown < Good).
    pub fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Bad, _) | (_, Self::Bad) => Self::Bad,
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            _ => Self::Good,
        }
    }
}

impl Default for DataQuality {
    fn default() -> Self {
        Self::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_as_str() {
        assert_eq!(DataQuality::Good.as_str(), "good");
        assert_eq!(DataQuality::Bad.as_str(), "bad");
        assert_eq!(DataQuality::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_worst() {
        assert_eq!(DataQuality::Good.worst(DataQuality::Good), DataQuality::Good);
        assert_eq!(DataQuality::Good.worst(DataQuality::Unknown), DataQuality::Unknown);
        assert_eq!(DataQuality::Unknown.worst(DataQuality::Bad), DataQuality::Bad);
        assert_eq!(DataQuality::Bad.worst(DataQuality::Good), DataQuality::Bad);
    }

    #[test]
    fn test_default() {
        assert_eq!(DataQuality::default(), DataQuality::Unknown);
    }
}
