use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::warn;

use super::ActiveState;
use crate::controller::Controller;
use crate::error::DomainError;
use crate::event::{DataItemEvent, ObserverList, SubscriptionId};
use crate::tag::{DataQuality, DataType, VariantValue};

#[derive(Debug)]
struct DataItemState {
    value: VariantValue,
    data_type: DataType,
    size: usize,
    active: ActiveState,
}

/// One controller-backed value.
///
/// Owned by its controller (held as `Arc`), referenced by global tags.
/// All I/O goes through the owning controller; failures degrade quality
/// and are reported through `QualityChanged`, never returned.
pub struct DataItem {
    name: String,
    item_id: String,
    controller: Weak<dyn Controller>,
    controller_name: RwLock<String>,
    state: Mutex<DataItemState>,
    events: ObserverList<DataItemEvent>,
}

impl DataItem {
    pub fn new(
        name: impl Into<String>,
        item_id: impl Into<String>,
        controller: Weak<dyn Controller>,
        controller_name: impl Into<String>,
        data_type: DataType,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            item_id: item_id.into(),
            controller,
            controller_name: RwLock::new(controller_name.into()),
            state: Mutex::new(DataItemState {
                value: VariantValue::unknown(data_type),
                data_type,
                size: 0,
                active: ActiveState::default(),
            }),
            events: ObserverList::new(),
        })
    }

    // Getters
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn controller_name(&self) -> String {
        self.controller_name.read().clone()
    }

    #[doc(hidden)]
    pub fn set_controller_name(&self, name: impl Into<String>) {
        *self.controller_name.write() = name.into();
    }

    pub fn controller(&self) -> Option<Arc<dyn Controller>> {
        self.controller.upgrade()
    }

    pub fn value(&self) -> VariantValue {
        self.state.lock().value.clone()
    }

    pub fn quality(&self) -> DataQuality {
        self.state.lock().value.quality
    }

    pub fn data_type(&self) -> DataType {
        self.state.lock().data_type
    }

    pub fn set_data_type(&self, data_type: DataType) {
        self.state.lock().data_type = data_type;
    }

    pub fn size(&self) -> usize {
        self.state.lock().size
    }

    pub fn set_size(&self, size: usize) {
        self.state.lock().size = size;
    }

    pub fn active_state(&self) -> ActiveState {
        self.state.lock().active
    }

    pub fn set_active_state(&self, active: ActiveState) {
        self.state.lock().active = active;
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DataItemEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Synchronous read through the controller.
    pub fn read(&self) -> VariantValue {
        let result = self.with_controller(|c| c.read(self));
        match result {
            Ok(v) => self.apply_device_value(v.value, v.quality),
            Err(e) => self.report_io_failure("read", e),
        }
        self.value()
    }

    pub fn batch_read(&self) {
        if let Err(e) = self.with_controller(|c| c.batch_read(self)) {
            self.report_io_failure("batch_read", e);
        }
    }

    pub fn write(&self, value: &Value) {
        let converted = self.data_type().convert(value);
        if let Err(e) = self.with_controller(|c| c.write(self, &converted)) {
            self.report_io_failure("write", e);
        }
    }

    pub fn batch_write(&self, value: &Value) {
        let converted = self.data_type().convert(value);
        if let Err(e) = self.with_controller(|c| c.batch_write(self, &converted)) {
            self.report_io_failure("batch_write", e);
        }
    }

    /// Entry point for values reported by the device (poll result or
    /// write echo). Raises the item events synchronously on this thread.
    pub fn apply_device_value(&self, value: Value, quality: DataQuality) {
        let (previous, current, data_type) = {
            let mut state = self.state.lock();
            let next = VariantValue::new(state.data_type.convert(&value), quality);
            let previous = std::mem::replace(&mut state.value, next);
            (previous, state.value.clone(), state.data_type)
        };

        let mut events = Vec::new();
        if previous.quality != current.quality {
            events.push(DataItemEvent::QualityChanged {
                quality: current.quality,
            });
        }

        let changed = !previous.same_value(&current);
        if changed {
            events.push(DataItemEvent::ValueChanged {
                value: current.clone(),
            });
            match data_type.zero_crossing(&previous.value, &current.value) {
                Some(true) => events.push(DataItemEvent::ValueOn),
                Some(false) => events.push(DataItemEvent::ValueOff),
                None => {}
            }
        }
        if changed || !current.quality.is_good() {
            events.push(DataItemEvent::ValueChangedOrError { value: current });
        }

        for event in &events {
            self.events.notify(event);
        }
    }

    /// Degrades quality without touching the value.
    pub fn set_quality(&self, quality: DataQuality) {
        let (changed, current) = {
            let mut state = self.state.lock();
            let changed = state.value.quality != quality;
            state.value.quality = quality;
            (changed, state.value.clone())
        };

        if changed {
            self.events
                .notify(&DataItemEvent::QualityChanged { quality });
        }
        if !quality.is_good() {
            self.events
                .notify(&DataItemEvent::ValueChangedOrError { value: current });
        }
    }

    fn with_controller<T>(
        &self,
        op: impl FnOnce(&dyn Controller) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        match self.controller.upgrade() {
            Some(controller) => op(controller.as_ref()),
            None => Err(DomainError::Io(format!(
                "controller {} is no longer available",
                self.controller_name()
            ))),
        }
    }

    fn report_io_failure(&self, operation: &str, error: DomainError) {
        warn!(
            item = %self.name,
            controller = %self.controller_name(),
            operation,
            error = %error,
            "Data item I/O failed - degrading quality"
        );
        self.set_quality(DataQuality::Bad);
    }
}

impl std::fmt::Debug for DataItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataItem")
            .field("name", &self.name)
            .field("item_id", &self.item_id)
            .field("controller", &self.controller_name())
            .field("value", &self.value())
            .finish()
    }
}
