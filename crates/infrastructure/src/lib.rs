//! Infrastructure layer - configuration, controllers and runtime services

pub mod config;
pub mod controllers;
pub mod services;

pub use config::{PollLimits, RuntimeConfig};
pub use controllers::{MemoryController, WriteRecord};
pub use services::{ConfiguredFeatures, ConnectedItemCounter, TracingAuditTrail};
