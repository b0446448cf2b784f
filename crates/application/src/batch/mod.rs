mod service;

pub use service::{BatchService, BatchTransaction};
