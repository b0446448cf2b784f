//! Runtime services reported to by the tag core

mod audit_trail;
mod counting;
mod features;

pub use audit_trail::TracingAuditTrail;
pub use counting::ConnectedItemCounter;
pub use features::ConfiguredFeatures;
