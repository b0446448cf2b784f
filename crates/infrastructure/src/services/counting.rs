use std::sync::atomic::{AtomicUsize, Ordering};

use domain::service::DataItemCountingService;
use tracing::{debug, warn};

/// Number of tags currently connected to a controller.
#[derive(Debug, Default)]
pub struct ConnectedItemCounter {
    count: AtomicUsize,
}

impl ConnectedItemCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl DataItemCountingService for ConnectedItemCounter {
    fn add_connected_data_items(&self, count: usize) {
        let total = self.count.fetch_add(count, Ordering::SeqCst) + count;
        debug!(total, "Connected data items added");
    }

    fn remove_connected_data_items(&self, count: usize) {
        let result = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_sub(count))
            });
        if let Ok(previous) = result {
            if previous < count {
                warn!(previous, count, "Connected data item count would go negative");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_goes_below_zero() {
        let counter = ConnectedItemCounter::new();
        counter.add_connected_data_items(2);
        counter.remove_connected_data_items(1);
        assert_eq!(counter.count(), 1);
        counter.remove_connected_data_items(5);
        assert_eq!(counter.count(), 0);
    }
}
