pub mod memory_controller;

pub use memory_controller::{MemoryController, WriteRecord};
