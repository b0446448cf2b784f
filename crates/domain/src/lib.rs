//! Domain layer - Pure tag synchronization model
//!
//! This crate contains:
//! - Value objects (AccessRights, DataQuality, DataType, VariantValue, TagName)
//! - The controller-backed leaf entity (DataItem)
//! - Observer lists and the events they carry
//! - Interfaces of the external collaborators (Controller, services)
//!
//! Principles:
//! - No dependencies on infrastructure
//! - I/O failure is expressed as data quality, never as a panic
//! - Testable in isolation

pub mod controller;
pub mod data_item;
pub mod error;
pub mod event;
pub mod service;
pub mod tag;

// Re-export commonly used types
pub use controller::Controller;
pub use data_item::{ActiveState, DataItem};
pub use error::{DomainError, Result};
pub use event::{DataItemEvent, ObserverList, SubscriptionId, TagEvent};
pub use tag::{
    AccessRights, ControllerMap, DataQuality, DataType, TagKind, TagName, VariantValue,
};
