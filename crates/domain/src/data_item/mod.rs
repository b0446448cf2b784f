mod active_state;
mod entity;

pub use active_state::ActiveState;
pub use entity::DataItem;
