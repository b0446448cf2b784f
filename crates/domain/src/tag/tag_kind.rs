use serde::{Deserialize, Serialize};

/// Kind of a global tag, derived from its configuration.
///
/// Behaviour that differs between tags is decided from this discriminant:
/// system tags never exchange their data type with constituents and array
/// tags are only reachable per index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    /// No controller data items; the value lives in the runtime only
    Internal,
    /// Backed by one or more controller data items
    Connected,
    /// Runtime-provided tag with a fixed data type
    System,
    /// More than one subitem (ArraySize > 1)
    Array,
}

impl TagKind {
    pub fn resolve(is_system: bool, array_size: usize, constituent_count: usize) -> Self {
        if is_system {
            Self::System
        } else if array_size > 1 {
            Self::Array
        } else if constituent_count == 0 {
            Self::Internal
        } else {
            Self::Connected
        }
    }

    /// Whether the data type may be inferred from or reset by constituents.
    pub fn inherits_data_type(&self) -> bool {
        !matches!(self, Self::System)
    }

    pub fn allows_direct_value(&self) -> bool {
        !matches!(self, Self::Array)
    }
}
