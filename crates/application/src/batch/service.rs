use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use domain::{Controller, DomainError, Result};

use crate::tag::GlobalDataItem;

/// An open batch on one controller.
///
/// Holds the controller's batch lock until committed; dropping it without
/// committing releases the lock but sends nothing.
pub struct BatchTransaction {
    controller: Arc<dyn Controller>,
    _guard: OwnedMutexGuard<()>,
}

impl BatchTransaction {
    pub fn controller(&self) -> &Arc<dyn Controller> {
        &self.controller
    }

    pub fn controller_name(&self) -> String {
        self.controller.name()
    }
}

/// Coordinates batch transactions per controller.
///
/// Each registered controller has its own lock, so batches on different
/// controllers run concurrently while two batches on the same controller
/// are serialized.
#[derive(Default)]
pub struct BatchService {
    controllers: DashMap<String, Arc<dyn Controller>>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl BatchService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_controller(&self, controller: Arc<dyn Controller>) {
        let name = controller.name();
        self.locks
            .entry(name.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        self.controllers.insert(name.clone(), controller);
        debug!(controller = %name, "Controller registered for batch operations");
    }

    pub fn unregister_controller(&self, name: &str) {
        self.controllers.remove(name);
        self.locks.remove(name);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.controllers.contains_key(name)
    }

    /// Moves the lock table entry of a renamed controller.
    pub fn rename_controller(&self, old: &str, new: &str) -> Result<()> {
        if old != new && self.controllers.contains_key(new) {
            return Err(DomainError::DuplicateKey(new.to_string()));
        }
        if let Some((_, controller)) = self.controllers.remove(old) {
            self.controllers.insert(new.to_string(), controller);
        }
        if let Some((_, lock)) = self.locks.remove(old) {
            self.locks.insert(new.to_string(), lock);
        }
        Ok(())
    }

    fn lock_for(&self, name: &str) -> Result<Arc<Mutex<()>>> {
        if !self.controllers.contains_key(name) {
            return Err(not_registered(name));
        }
        self.locks
            .get(name)
            .map(|lock| lock.value().clone())
            .ok_or_else(|| not_registered(name))
    }

    /// Waits for the controller's batch lock, then opens its native batch.
    pub async fn batch_start(&self, controller: &Arc<dyn Controller>) -> Result<BatchTransaction> {
        let name = controller.name();
        let lock = self.lock_for(&name)?;
        let guard = lock.lock_owned().await;

        controller.batch_start().await?;
        debug!(controller = %name, "Batch started");
        Ok(BatchTransaction {
            controller: controller.clone(),
            _guard: guard,
        })
    }

    /// Commits the controller's native batch and releases its lock.
    pub async fn batch_commit(&self, transaction: BatchTransaction) -> Result<()> {
        let name = transaction.controller_name();
        if !self.is_registered(&name) {
            return Err(not_registered(&name));
        }

        let result = transaction.controller.batch_commit().await;
        match &result {
            Ok(()) => debug!(controller = %name, "Batch committed"),
            Err(e) => warn!(controller = %name, error = %e, "Batch commit failed"),
        }
        drop(transaction);
        result
    }

    /// Controllers referenced by `tags`, first occurrence first.
    pub fn controllers_in_use(tags: &[Arc<GlobalDataItem>]) -> Vec<Arc<dyn Controller>> {
        Self::collect_controllers(tags, false)
    }

    /// Like `controllers_in_use`, limited to controllers that some tag may
    /// write (Write or ReadWrite access).
    pub fn writable_controllers_in_use(tags: &[Arc<GlobalDataItem>]) -> Vec<Arc<dyn Controller>> {
        Self::collect_controllers(tags, true)
    }

    fn collect_controllers(tags: &[Arc<GlobalDataItem>], writable_only: bool) -> Vec<Arc<dyn Controller>> {
        let mut seen = HashSet::new();
        let mut controllers = Vec::new();

        for tag in tags {
            for (controller_name, item) in tag.data_items() {
                if writable_only && !tag.access_rights_for(&controller_name).includes_write() {
                    continue;
                }
                if !seen.insert(controller_name) {
                    continue;
                }
                if let Some(controller) = item.controller() {
                    controllers.push(controller);
                }
            }
        }
        controllers
    }
}

fn not_registered(name: &str) -> DomainError {
    DomainError::InvalidOperation(format!("Controller {name} is not registered for batches"))
}
