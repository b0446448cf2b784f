use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info};

use domain::{Controller, DataItem, DataQuality, DataType, DomainError, Result, VariantValue};

use crate::config::ControllerConfig;

/// One write that reached the device registers.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub item_id: String,
    pub value: Value,
    pub batched: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
enum QueuedOp {
    Read(String),
    Write(String, Value),
}

#[derive(Default)]
struct BatchStats {
    starts: AtomicUsize,
    commits: AtomicUsize,
}

/// Controller backed by an in-memory register map.
///
/// Used as the device double in tests and by the runtime binary when no
/// field bus is configured. Writes land in the registers immediately (or
/// on commit inside a batch); values reach the data items on `poll`,
/// on a queued batch read, or through `set_device_value`.
pub struct MemoryController {
    self_ref: Weak<MemoryController>,
    name: RwLock<String>,
    active: AtomicBool,
    connected: AtomicBool,
    latency: Option<Duration>,
    registers: RwLock<HashMap<String, Value>>,
    items: Mutex<Vec<Arc<DataItem>>>,
    batch_open: AtomicBool,
    queue: Mutex<Vec<QueuedOp>>,
    journal: Mutex<Vec<WriteRecord>>,
    stats: BatchStats,
    removed: AtomicUsize,
}

impl MemoryController {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::build(name.into(), None)
    }

    /// Every batch start waits `latency` before returning.
    pub fn with_latency(name: impl Into<String>, latency: Duration) -> Arc<Self> {
        Self::build(name.into(), Some(latency))
    }

    pub fn from_config(config: &ControllerConfig) -> Arc<Self> {
        let controller = Self::build(
            config.name.clone(),
            config.latency_ms.map(Duration::from_millis),
        );
        controller.active.store(config.active, Ordering::SeqCst);
        controller.set_connected(config.connected);
        {
            let mut registers = controller.registers.write();
            for register in &config.registers {
                registers.insert(register.item.clone(), register.value.clone());
            }
        }
        controller
    }

    fn build(name: String, latency: Option<Duration>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            name: RwLock::new(name),
            active: AtomicBool::new(true),
            connected: AtomicBool::new(true),
            latency,
            registers: RwLock::new(HashMap::new()),
            items: Mutex::new(Vec::new()),
            batch_open: AtomicBool::new(false),
            queue: Mutex::new(Vec::new()),
            journal: Mutex::new(Vec::new()),
            stats: BatchStats::default(),
            removed: AtomicUsize::new(0),
        })
    }

    /// Creates a data item owned by this controller.
    pub fn add_data_item(&self, item_id: &str, data_type: DataType) -> Arc<DataItem> {
        let controller: Weak<dyn Controller> = self.self_ref.clone();
        let name = self.name();
        let item = DataItem::new(
            format!("{name}.{item_id}"),
            item_id,
            controller,
            name,
            data_type,
        );
        self.items.lock().push(item.clone());
        item
    }

    pub fn data_items(&self) -> Vec<Arc<DataItem>> {
        self.items.lock().clone()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn register(&self, item_id: &str) -> Option<Value> {
        self.registers.read().get(item_id).cloned()
    }

    /// Simulates a value change on the device and reports it to every
    /// data item mapped on the register.
    pub fn set_device_value(&self, item_id: &str, value: Value) {
        self.registers
            .write()
            .insert(item_id.to_string(), value.clone());
        for item in self.items_for(item_id) {
            item.apply_device_value(value.clone(), DataQuality::Good);
        }
    }

    /// Reports the register contents to every active data item.
    /// Disconnected controllers degrade the quality instead.
    pub fn poll(&self) -> usize {
        let items: Vec<Arc<DataItem>> = self
            .items
            .lock()
            .iter()
            .filter(|item| item.active_state().is_active())
            .cloned()
            .collect();

        for item in &items {
            self.deliver(item);
        }
        items.len()
    }

    /// Writes received for one register, oldest first.
    pub fn writes(&self, item_id: &str) -> Vec<WriteRecord> {
        self.journal
            .lock()
            .iter()
            .filter(|w| w.item_id == item_id)
            .cloned()
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.journal.lock().len()
    }

    pub fn batch_start_count(&self) -> usize {
        self.stats.starts.load(Ordering::SeqCst)
    }

    pub fn batch_commit_count(&self) -> usize {
        self.stats.commits.load(Ordering::SeqCst)
    }

    pub fn removed_count(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }

    fn items_for(&self, item_id: &str) -> Vec<Arc<DataItem>> {
        self.items
            .lock()
            .iter()
            .filter(|item| item.item_id() == item_id)
            .cloned()
            .collect()
    }

    fn deliver(&self, item: &DataItem) {
        if !self.is_controller_connected() {
            item.set_quality(DataQuality::Bad);
            return;
        }
        match self.register(item.item_id()) {
            Some(value) => item.apply_device_value(value, DataQuality::Good),
            None => item.set_quality(DataQuality::Unknown),
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_controller_connected() {
            Ok(())
        } else {
            Err(DomainError::Io(format!(
                "controller {} is not connected",
                self.name()
            )))
        }
    }

    fn store(&self, item_id: &str, value: &Value, batched: bool) {
        self.registers
            .write()
            .insert(item_id.to_string(), value.clone());
        self.journal.lock().push(WriteRecord {
            item_id: item_id.to_string(),
            value: value.clone(),
            batched,
            timestamp: Utc::now(),
        });
    }
}

#[async_trait]
impl Controller for MemoryController {
    fn name(&self) -> String {
        self.name.read().clone()
    }

    fn rename(&self, new_name: &str) {
        let old = std::mem::replace(&mut *self.name.write(), new_name.to_string());
        for item in self.items.lock().iter() {
            item.set_controller_name(new_name);
        }
        info!(old = %old, new = %new_name, "Controller renamed");
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn is_controller_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn batch_start(&self) -> Result<()> {
        self.ensure_connected()?;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.batch_open.store(true, Ordering::SeqCst);
        self.stats.starts.fetch_add(1, Ordering::SeqCst);
        debug!(controller = %self.name(), "Batch started");
        Ok(())
    }

    async fn batch_commit(&self) -> Result<()> {
        self.batch_open.store(false, Ordering::SeqCst);
        let queued: Vec<QueuedOp> = self.queue.lock().drain(..).collect();
        self.stats.commits.fetch_add(1, Ordering::SeqCst);
        self.ensure_connected()?;

        let mut reads = Vec::new();
        for op in queued {
            match op {
                QueuedOp::Write(item_id, value) => self.store(&item_id, &value, true),
                QueuedOp::Read(item_id) => reads.push(item_id),
            }
        }
        for item_id in reads {
            for item in self.items_for(&item_id) {
                self.deliver(&item);
            }
        }
        debug!(controller = %self.name(), "Batch committed");
        Ok(())
    }

    fn remove_data_item(&self, item: &DataItem) {
        let mut items = self.items.lock();
        let before = items.len();
        items.retain(|owned| !std::ptr::eq(owned.as_ref(), item));
        if items.len() < before {
            self.removed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn read(&self, item: &DataItem) -> Result<VariantValue> {
        self.ensure_connected()?;
        Ok(match self.register(item.item_id()) {
            Some(value) => VariantValue::good(value),
            None => VariantValue::unknown(item.data_type()),
        })
    }

    fn batch_read(&self, item: &DataItem) -> Result<()> {
        self.ensure_connected()?;
        if self.batch_open.load(Ordering::SeqCst) {
            self.queue
                .lock()
                .push(QueuedOp::Read(item.item_id().to_string()));
        } else {
            self.deliver(item);
        }
        Ok(())
    }

    fn write(&self, item: &DataItem, value: &Value) -> Result<()> {
        self.ensure_connected()?;
        self.store(item.item_id(), value, false);
        Ok(())
    }

    fn batch_write(&self, item: &DataItem, value: &Value) -> Result<()> {
        self.ensure_connected()?;
        if self.batch_open.load(Ordering::SeqCst) {
            self.queue
                .lock()
                .push(QueuedOp::Write(item.item_id().to_string(), value.clone()));
        } else {
            self.store(item.item_id(), value, true);
        }
        Ok(())
    }
}
