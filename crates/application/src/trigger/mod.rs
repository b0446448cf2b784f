mod data_trigger;
mod scheduler;

pub use data_trigger::{DataTrigger, TriggerMode};
pub use scheduler::TriggerScheduler;
