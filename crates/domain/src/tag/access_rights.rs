use serde::{Deserialize, Serialize};

/// Read/write direction policy between a tag and one controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessRights {
    None,
    Read,
    Write,
    ReadWrite,
}

impl AccessRights {
    pub fn includes_read(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn includes_write(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    /// Targets of an operator write (`batch_write`): None is treated as
    /// an unrestricted constituent.
    pub fn accepts_operator_write(&self) -> bool {
        !matches!(self, Self::Read)
    }

    /// Targets of `batch_read`.
    pub fn accepts_read_request(&self) -> bool {
        !matches!(self, Self::Write)
    }
}

impl Default for AccessRights {
    fn default() -> Self {
        Self::ReadWrite
    }
}
