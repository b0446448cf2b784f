use serde::{Deserialize, Serialize};

/// Whether a data item is being polled by its controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ActiveState {
    Active,
    #[default]
    Inactive,
}

impl ActiveState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}
