mod bootstrap;
mod global_controller;

pub use bootstrap::{Runtime, build_runtime};
pub use global_controller::GlobalController;
