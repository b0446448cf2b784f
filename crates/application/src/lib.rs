//! Application layer - the global tag aggregate and the runtime around it

pub mod batch;
pub mod poll;
pub mod runtime;
pub mod tag;
pub mod trigger;

pub use batch::{BatchService, BatchTransaction};
pub use poll::{PollGroup, PollIntervalPolicy};
pub use runtime::{GlobalController, Runtime, build_runtime};
pub use tag::{
    ActionBounds, DataItemLogic, GlobalDataItem, GlobalDataSubItem, Scaling, TagAction,
    TagServices,
};
pub use trigger::{DataTrigger, TriggerMode, TriggerScheduler};
