use thiserror::Error;

/// Domain-level errors
///
/// Only configuration and usage errors are reported through this type.
/// Device I/O failures degrade data quality instead of surfacing here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid tag name: {0}")]
    InvalidTagName(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Key already exists: {0}")]
    DuplicateKey(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Controller not registered: {0}")]
    ControllerNotRegistered(String),

    #[error("Controller I/O error: {0}")]
    Io(String),
}

impl DomainError {
    /// Argument-class errors are raised synchronously for bad configuration.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::DuplicateKey(_) | Self::InvalidTagName(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_errors() {
        assert!(DomainError::InvalidArgument("x".into()).is_argument_error());
        assert!(DomainError::DuplicateKey("PLC1".into()).is_argument_error());
        assert!(!DomainError::Io("timeout".into()).is_argument_error());
        assert!(!DomainError::ControllerNotRegistered("PLC1".into()).is_argument_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            DomainError::DuplicateKey("PLC2".into()).to_string(),
            "Key already exists: PLC2"
        );
    }
}
