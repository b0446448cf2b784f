use std::sync::atomic::{AtomicUsize, Ordering};

use domain::service::AuditTrailService;
use serde_json::Value;
use tracing::info;

/// Writes audit entries to the `audit` tracing target.
#[derive(Debug, Default)]
pub struct TracingAuditTrail {
    entries: AtomicUsize,
}

impl TracingAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.load(Ordering::SeqCst)
    }
}

impl AuditTrailService for TracingAuditTrail {
    fn log_data_item_changed(&self, tag_name: &str, old_value: &Value, new_value: &Value) {
        self.entries.fetch_add(1, Ordering::SeqCst);
        info!(target: "audit", tag = tag_name, old = %old_value, new = %new_value, "Tag changed by operator");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_entries() {
        let audit = TracingAuditTrail::new();
        audit.log_data_item_changed("Tank.Level", &json!(1), &json!(2));
        audit.log_data_item_changed("Tank.Level", &json!(2), &json!(3));
        assert_eq!(audit.entry_count(), 2);
    }
}
