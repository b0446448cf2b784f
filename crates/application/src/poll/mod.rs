mod poll_group;

pub use poll_group::{PollGroup, PollIntervalPolicy};
