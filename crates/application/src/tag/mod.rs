mod action;
mod global_data_item;
mod logic;
mod scaling;
mod sub_item;

pub use action::{ActionBounds, TagAction};
pub use global_data_item::{GlobalDataItem, TagServices};
pub use logic::DataItemLogic;
pub use scaling::Scaling;
pub use sub_item::GlobalDataSubItem;
