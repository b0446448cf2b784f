use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Handle returned by `ObserverList::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Explicit observer list with registration-ordered fan-out.
///
/// `notify` works on a snapshot of the list and holds no lock while the
/// callbacks run, so a callback may subscribe, unsubscribe or trigger
/// further notifications.
pub struct ObserverList<E> {
    next_id: AtomicU64,
    observers: Mutex<Vec<(SubscriptionId, Callback<E>)>>,
}

impl<E> Default for ObserverList<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            observers: Mutex::new(Vec::new()),
        }
    }
}

impl<E> ObserverList<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(callback)));
        id
    }

    /// Returns false when the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(sid, _)| *sid != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }

    pub fn notify(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .observers
            .lock()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }
}

impl<E> std::fmt::Debug for ObserverList<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order() {
        let list = ObserverList::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let seen = seen.clone();
            list.subscribe(move |v: &u32| seen.lock().push(format!("{tag}{v}")));
        }
        list.notify(&1);

        assert_eq!(*seen.lock(), vec!["a1", "b1", "c1"]);
    }

    #[test]
    fn test_unsubscribe() {
        let list = ObserverList::<u32>::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let id = list.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        list.notify(&0);
        assert!(list.unsubscribe(id));
        assert!(!list.unsubscribe(id));
        list.notify(&0);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(list.is_empty());
    }

    #[test]
    fn test_reentrant_subscribe_does_not_deadlock() {
        let list = Arc::new(ObserverList::<u32>::new());
        let inner = list.clone();
        list.subscribe(move |_| {
            inner.subscribe(|_| {});
        });
        list.notify(&0);
        assert_eq!(list.len(), 2);
    }
}
