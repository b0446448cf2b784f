use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard, RwLock};
use serde_json::Value;
use tracing::{debug, info, warn};

use domain::service::{AuditTrailService, DataItemCountingService};
use domain::{
    AccessRights, ActiveState, ControllerMap, DataItem, DataItemEvent, DataQuality, DataType,
    DomainError, ObserverList, Result, SubscriptionId, TagEvent, TagKind, TagName, VariantValue,
};

use super::action::TagAction;
use super::logic::DataItemLogic;
use super::scaling::Scaling;
use super::sub_item::{Constituent, GlobalDataSubItem, access_of};
use crate::poll::PollGroup;
use crate::trigger::DataTrigger;

/// Runtime services a registered tag reports to
#[derive(Clone, Default)]
pub struct TagServices {
    pub counting: Option<Arc<dyn DataItemCountingService>>,
    pub audit: Option<Arc<dyn AuditTrailService>>,
}

#[derive(Debug)]
pub(crate) struct TagState {
    pub(crate) data_type: DataType,
    pub(crate) global_data_type: Option<DataType>,
    pub(crate) size: usize,
    pub(crate) scaling: Scaling,
    pub(crate) index_register_number: Option<u32>,
    pub(crate) log_to_audit_trail: bool,
    pub(crate) non_volatile: bool,
    pub(crate) is_system: bool,
    pub(crate) access_right: AccessRights,
    pub(crate) access_rights: ControllerMap<AccessRights>,
    pub(crate) sub_items: Vec<GlobalDataSubItem>,
    pub(crate) trigger: Option<DataTrigger>,
    pub(crate) poll_group: Option<Arc<PollGroup>>,
    pub(crate) quality: DataQuality,
    pub(crate) registered: bool,
    pub(crate) disposed: bool,
}

impl TagState {
    pub(crate) fn constituent_count(&self) -> usize {
        self.sub_items.iter().map(|s| s.len()).sum()
    }

    pub(crate) fn kind(&self) -> TagKind {
        TagKind::resolve(
            self.is_system,
            self.sub_items.len(),
            self.constituent_count(),
        )
    }

    fn is_internal(&self) -> bool {
        self.constituent_count() == 0
    }

    fn is_immediate(&self) -> bool {
        self.trigger.as_ref().map(|t| t.is_immediate()).unwrap_or(true)
    }

    /// Scaling only applies once a data item is attached.
    fn effective_scaling(&self) -> Scaling {
        if self.is_internal() {
            Scaling::default()
        } else {
            self.scaling
        }
    }

    fn to_internal(&self, external: &Value) -> Value {
        self.effective_scaling()
            .to_internal(self.data_type, external)
    }

    fn to_external(&self, internal: &Value) -> Value {
        self.effective_scaling()
            .to_external(self.data_type, internal)
    }

    /// Visible value of one slot, in tag units.
    fn compose(&self, index: usize) -> VariantValue {
        let sub = &self.sub_items[index];
        let raw = if sub.is_empty() || !sub.has_reader(&self.access_rights) {
            &sub.internal_value
        } else {
            &sub.value
        };
        VariantValue {
            value: self.to_external(&raw.value),
            quality: raw.quality,
            timestamp: raw.timestamp,
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.sub_items.len() {
            return Err(DomainError::InvalidArgument(format!(
                "Index {index} out of range for array size {}",
                self.sub_items.len()
            )));
        }
        Ok(())
    }

    /// Recomputes the aggregate quality; returns it when it changed.
    fn refresh_quality(&mut self) -> Option<DataQuality> {
        let quality = self
            .sub_items
            .iter()
            .map(|s| s.quality(&self.access_rights))
            .fold(DataQuality::Good, DataQuality::worst);
        if quality != self.quality {
            self.quality = quality;
            Some(quality)
        } else {
            None
        }
    }

    fn value_events(
        &self,
        index: usize,
        before: &VariantValue,
        after: &VariantValue,
        events: &mut Vec<TagEvent>,
    ) {
        if before.same_value(after) {
            return;
        }
        events.push(TagEvent::ValueChanged {
            index,
            value: after.clone(),
        });
        match self.data_type.zero_crossing(&before.value, &after.value) {
            Some(true) => events.push(TagEvent::ValueOn { index }),
            Some(false) => events.push(TagEvent::ValueOff { index }),
            None => {}
        }
    }
}

/// The logical tag exposed to the application.
///
/// Aggregates one data item per controller in each of its subitems and
/// keeps them in sync according to the per-controller access rights.
/// A tag is owned by a single writer; the internal lock only guards
/// against re-entrant fan-out and is never held while calling data items
/// or observers.
pub struct GlobalDataItem {
    name: TagName,
    self_ref: Weak<GlobalDataItem>,
    state: Mutex<TagState>,
    events: ObserverList<TagEvent>,
    services: RwLock<TagServices>,
}

impl GlobalDataItem {
    /// Scalar tag; stays an internal variable until a data item is added.
    pub fn new(name: TagName, data_type: DataType) -> Arc<Self> {
        Self::build(name, data_type, 1, false)
    }

    pub fn new_array(name: TagName, data_type: DataType, array_size: usize) -> Result<Arc<Self>> {
        if array_size == 0 {
            return Err(DomainError::InvalidArgument(format!(
                "Array size of {name} must be at least 1"
            )));
        }
        Ok(Self::build(name, data_type, array_size, false))
    }

    /// Runtime-provided tag whose data type is never inferred or reset.
    pub fn new_system(name: TagName, data_type: DataType) -> Arc<Self> {
        Self::build(name, data_type, 1, true)
    }

    fn build(name: TagName, data_type: DataType, array_size: usize, is_system: bool) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            name,
            self_ref: self_ref.clone(),
            state: Mutex::new(TagState {
                data_type,
                global_data_type: None,
                size: 0,
                scaling: Scaling::default(),
                index_register_number: None,
                log_to_audit_trail: false,
                non_volatile: false,
                is_system,
                access_right: AccessRights::ReadWrite,
                access_rights: ControllerMap::new(),
                sub_items: (0..array_size)
                    .map(|_| GlobalDataSubItem::new(data_type))
                    .collect(),
                trigger: None,
                poll_group: None,
                quality: DataQuality::Good,
                registered: false,
                disposed: false,
            }),
            events: ObserverList::new(),
            services: RwLock::new(TagServices::default()),
        })
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, TagState> {
        self.state.lock()
    }

    // Getters
    pub fn name(&self) -> &TagName {
        &self.name
    }

    pub fn kind(&self) -> TagKind {
        self.state.lock().kind()
    }

    pub fn data_type(&self) -> DataType {
        self.state.lock().data_type
    }

    /// Type shown to external consumers; falls back to `data_type`.
    pub fn global_data_type(&self) -> DataType {
        let state = self.state.lock();
        state.global_data_type.unwrap_or(state.data_type)
    }

    pub fn size(&self) -> usize {
        self.state.lock().size
    }

    pub fn offset(&self) -> f64 {
        self.state.lock().scaling.offset()
    }

    pub fn gain(&self) -> f64 {
        self.state.lock().scaling.gain()
    }

    pub fn index_register_number(&self) -> Option<u32> {
        self.state.lock().index_register_number
    }

    pub fn log_to_audit_trail(&self) -> bool {
        self.state.lock().log_to_audit_trail
    }

    pub fn non_volatile(&self) -> bool {
        self.state.lock().non_volatile
    }

    pub fn access_right(&self) -> AccessRights {
        self.state.lock().access_right
    }

    pub fn access_rights(&self) -> ControllerMap<AccessRights> {
        self.state.lock().access_rights.clone()
    }

    pub fn access_rights_for(&self, controller: &str) -> AccessRights {
        access_of(&self.state.lock().access_rights, controller)
    }

    pub fn array_size(&self) -> usize {
        self.state.lock().sub_items.len()
    }

    pub fn sub_item(&self, index: usize) -> Option<GlobalDataSubItem> {
        self.state.lock().sub_items.get(index).cloned()
    }

    pub fn constituent_count(&self) -> usize {
        self.state.lock().constituent_count()
    }

    /// Every attached data item with its controller key, slot by slot.
    pub fn data_items(&self) -> Vec<(String, Arc<DataItem>)> {
        self.state
            .lock()
            .sub_items
            .iter()
            .flat_map(|s| s.data_items())
            .collect()
    }

    pub fn trigger(&self) -> Option<DataTrigger> {
        self.state.lock().trigger.clone()
    }

    pub fn poll_group(&self) -> Option<Arc<PollGroup>> {
        self.state.lock().poll_group.clone()
    }

    pub fn quality(&self) -> DataQuality {
        self.state.lock().quality
    }

    pub fn is_registered(&self) -> bool {
        self.state.lock().registered
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    // Setters
    pub fn set_data_type(&self, data_type: DataType) {
        self.state.lock().data_type = data_type;
    }

    pub fn set_global_data_type(&self, data_type: Option<DataType>) {
        self.state.lock().global_data_type = data_type;
    }

    pub fn set_size(&self, size: usize) {
        self.state.lock().size = size;
    }

    pub fn set_offset(&self, offset: f64) -> Result<()> {
        let mut state = self.state.lock();
        state.scaling = state.scaling.with_offset(offset)?;
        Ok(())
    }

    pub fn set_gain(&self, gain: f64) -> Result<()> {
        let mut state = self.state.lock();
        state.scaling = state.scaling.with_gain(gain)?;
        Ok(())
    }

    pub fn set_index_register_number(&self, register: Option<u32>) {
        self.state.lock().index_register_number = register;
    }

    pub fn set_log_to_audit_trail(&self, enabled: bool) {
        self.state.lock().log_to_audit_trail = enabled;
    }

    pub fn set_non_volatile(&self, enabled: bool) {
        self.state.lock().non_volatile = enabled;
    }

    pub fn set_access_right(&self, access: AccessRights) {
        self.state.lock().access_right = access;
    }

    /// Changes the access of an attached controller.
    pub fn set_access_rights(&self, controller: &str, access: AccessRights) -> Result<()> {
        let mut state = self.state.lock();
        match state.access_rights.get_mut(controller) {
            Some(current) => {
                *current = access;
                Ok(())
            }
            None => Err(DomainError::InvalidArgument(format!(
                "Controller {controller} is not attached to tag {}",
                self.name
            ))),
        }
    }

    pub fn set_trigger(&self, trigger: Option<DataTrigger>) {
        self.state.lock().trigger = trigger;
    }

    pub fn set_poll_group(&self, poll_group: Option<Arc<PollGroup>>) {
        self.state.lock().poll_group = poll_group;
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&TagEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Marks the tag as owned by a controller registry and starts
    /// reporting to the given services.
    pub fn attach_services(&self, services: TagServices) {
        let counting = services.counting.clone();
        *self.services.write() = services;

        let count_it = {
            let mut state = self.state.lock();
            let first = !state.registered;
            state.registered = true;
            first && !state.is_internal()
        };
        if count_it {
            if let Some(counting) = counting {
                counting.add_connected_data_items(1);
            }
        }
    }

    // Composition

    /// Adds a controller data item to slot `index`.
    ///
    /// During live edit the data type is inferred as described in
    /// `DataItemLogic::item_added_to_global_data_item`.
    pub fn add_data_item(
        &self,
        index: usize,
        item: Arc<DataItem>,
        access: AccessRights,
        is_live_edit: bool,
    ) -> Result<()> {
        let controller = item.controller_name();
        let subscription = self.subscribe_to(index, &item);

        let became_connected = {
            let mut state = self.state.lock();
            let result = state.check_index(index).and_then(|_| {
                if state.sub_items[index].constituents.contains_key(&controller) {
                    Err(DomainError::DuplicateKey(controller.clone()))
                } else {
                    Ok(())
                }
            });
            if let Err(e) = result {
                drop(state);
                item.unsubscribe(subscription);
                return Err(e);
            }

            let was_internal = state.is_internal();
            state.sub_items[index].constituents.insert(
                controller.clone(),
                Constituent {
                    item: item.clone(),
                    subscription,
                },
            );
            state.access_rights.insert(controller.clone(), access);
            state.refresh_quality();
            state.registered && was_internal
        };

        debug!(tag = %self.name, controller = %controller, item = %item.name(), index, "Data item added");
        DataItemLogic::item_added_to_global_data_item(self, &item, is_live_edit);

        if became_connected {
            if let Some(counting) = &self.services.read().counting {
                counting.add_connected_data_items(1);
            }
        }
        Ok(())
    }

    /// Detaches the data item of `controller` from slot `index` and
    /// removes it from its controller.
    pub fn remove_data_item(
        &self,
        index: usize,
        controller: &str,
        reset_if_empty: bool,
    ) -> Result<Arc<DataItem>> {
        let (constituent, became_internal) = {
            let mut state = self.state.lock();
            state.check_index(index)?;
            let constituent = state.sub_items[index]
                .constituents
                .remove(controller)
                .ok_or_else(|| {
                    DomainError::InvalidArgument(format!(
                        "No data item of controller {controller} in slot {index} of {}",
                        self.name
                    ))
                })?;
            let still_used = state
                .sub_items
                .iter()
                .any(|s| s.constituents.contains_key(controller));
            if !still_used {
                state.access_rights.remove(controller);
            }
            state.refresh_quality();
            (constituent, state.registered && state.is_internal())
        };

        constituent.item.unsubscribe(constituent.subscription);
        if let Some(owner) = constituent.item.controller() {
            owner.remove_data_item(&constituent.item);
        }
        DataItemLogic::item_removed_from_global_data_item(self, reset_if_empty);

        if became_internal {
            if let Some(counting) = &self.services.read().counting {
                counting.remove_connected_data_items(1);
            }
        }
        debug!(tag = %self.name, controller = %controller, index, "Data item removed");
        Ok(constituent.item)
    }

    /// Re-keys the controller in the access rights and every subitem.
    pub fn rename_controller(&self, old: &str, new: &str) -> Result<()> {
        DataItemLogic::controller_renamed(self, old, new)
    }

    fn subscribe_to(&self, index: usize, item: &Arc<DataItem>) -> SubscriptionId {
        let tag = self.self_ref.clone();
        let source = Arc::downgrade(item);
        item.subscribe(move |event| {
            if let (Some(tag), Some(item)) = (tag.upgrade(), source.upgrade()) {
                tag.on_data_item_event(index, &item, event);
            }
        })
    }

    // Value access

    /// Visible value of a scalar tag.
    ///
    /// Array tags return a zero value with Unknown quality; use `value_at`.
    pub fn value(&self) -> VariantValue {
        let state = self.state.lock();
        if !state.kind().allows_direct_value() {
            return VariantValue::unknown(state.data_type);
        }
        state.compose(0)
    }

    pub fn value_at(&self, index: usize) -> Result<VariantValue> {
        let state = self.state.lock();
        state.check_index(index)?;
        Ok(state.compose(index))
    }

    /// Writes through to every constituent of a scalar tag.
    pub fn set_value(&self, value: Value) -> Result<()> {
        if !self.kind().allows_direct_value() {
            return Err(DomainError::InvalidOperation(format!(
                "{} is an array tag; write through an index",
                self.name
            )));
        }
        self.set_value_at(0, value)
    }

    /// Writes `value` to every constituent of slot `index`.
    ///
    /// Internal variables and write-only slots raise ValueChanged right
    /// away; other slots raise it when the device echo arrives.
    pub fn set_value_at(&self, index: usize, value: Value) -> Result<()> {
        let (targets, internal, events) = {
            let mut state = self.state.lock();
            state.check_index(index)?;
            if state.access_right == AccessRights::Read {
                drop(state);
                self.deny("set_value");
                return Ok(());
            }

            let internal = state.to_internal(&value);
            let mut events = Vec::new();
            let before = state.compose(index);
            state.sub_items[index].internal_value = VariantValue::good(internal.clone());
            let after = state.compose(index);
            if !state.sub_items[index].has_reader(&state.access_rights) {
                state.value_events(index, &before, &after, &mut events);
            }
            let targets = state.sub_items[index].items_where(&state.access_rights, None, |_| true);
            (targets, internal, events)
        };

        for item in &targets {
            item.write(&internal);
        }
        self.publish(&events);
        Ok(())
    }

    // Batch operations

    /// Operator write inside a batch. Reaches Write, ReadWrite and
    /// None-access items; refused on read-only tags.
    pub fn batch_write(&self, value: Value) -> bool {
        if self.access_right() == AccessRights::Read {
            self.deny("batch_write");
            return false;
        }
        if !self.accepts_direct_write("batch_write") {
            return false;
        }
        self.write_slot(0, &value, AccessRights::accepts_operator_write);
        true
    }

    /// Exchange write between controllers. Reaches Write and ReadWrite
    /// items only and never raises AccessDenied.
    pub fn batch_write_for_data_exchange(&self, value: Value) {
        if !self.accepts_direct_write("batch_write_for_data_exchange") {
            return;
        }
        self.write_slot(0, &value, |access| access.includes_write());
    }

    /// Array tags are only written through an index.
    fn accepts_direct_write(&self, operation: &str) -> bool {
        if self.kind().allows_direct_value() {
            return true;
        }
        warn!(tag = %self.name, operation, "Rejected on array tag; write through an index");
        false
    }

    fn write_slot(&self, index: usize, value: &Value, filter: fn(&AccessRights) -> bool) {
        let (targets, internal, events) = {
            let mut state = self.state.lock();
            let internal = state.to_internal(value);
            let before = state.compose(index);
            state.sub_items[index].internal_value = VariantValue::good(internal.clone());
            let after = state.compose(index);

            let mut events = Vec::new();
            if !state.sub_items[index].has_reader(&state.access_rights) {
                state.value_events(index, &before, &after, &mut events);
            }
            let targets =
                state.sub_items[index].items_where(&state.access_rights, None, |a| filter(&a));
            (targets, internal, events)
        };

        for item in &targets {
            item.batch_write(&internal);
        }
        self.publish(&events);
    }

    /// Queues a read of every readable item (Read, ReadWrite or None).
    pub fn batch_read(&self) {
        let targets: Vec<Arc<DataItem>> = {
            let state = self.state.lock();
            state
                .sub_items
                .iter()
                .flat_map(|s| {
                    s.items_where(&state.access_rights, None, |a| a.accepts_read_request())
                })
                .collect()
        };
        for item in targets {
            item.batch_read();
        }
    }

    // Action API

    /// Runs an operator action against every constituent.
    ///
    /// Returns false (and raises AccessDenied) on read-only tags. One
    /// audit entry is written per call when audit logging is enabled.
    pub fn execute(&self, action: &TagAction) -> bool {
        if !self.accepts_direct_write(action.name()) {
            return false;
        }
        let (writes, events, audit) = {
            let mut state = self.state.lock();
            if state.access_right == AccessRights::Read {
                drop(state);
                self.deny(action.name());
                return false;
            }

            let before = state.compose(0);
            let mut written = None;
            let mut writes = Vec::new();
            for (controller, item) in state.sub_items[0].data_items() {
                // Items that cannot be read have no device value to combine with.
                let current = if access_of(&state.access_rights, &controller).includes_read() {
                    state.to_external(&item.value().value)
                } else {
                    before.value.clone()
                };
                let combined = action.apply(&current, state.data_type);
                writes.push((item, state.to_internal(&combined)));
                written.get_or_insert(combined);
            }
            let written = written.unwrap_or_else(|| action.apply(&before.value, state.data_type));

            let internal = writes
                .first()
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| state.to_internal(&written));
            state.sub_items[0].internal_value = VariantValue::good(internal);
            let after = state.compose(0);

            let mut events = Vec::new();
            if !state.sub_items[0].has_reader(&state.access_rights) {
                state.value_events(0, &before, &after, &mut events);
            }
            let audit = state.log_to_audit_trail.then(|| (before.value, written));
            (writes, events, audit)
        };

        for (item, value) in &writes {
            item.write(value);
        }
        if let Some((old, new)) = audit {
            if let Some(audit_trail) = &self.services.read().audit {
                audit_trail.log_data_item_changed(self.name.as_str(), &old, &new);
            }
        }
        debug!(tag = %self.name, action = action.name(), constituents = writes.len(), "Action executed");
        self.publish(&events);
        true
    }

    // Exchange

    /// Activates the items that feed the exchange.
    ///
    /// Per slot, the single readable item is polled when at least one
    /// other item can be written; every other item is left inactive.
    pub fn run(&self) {
        let plan: Vec<(Arc<DataItem>, ActiveState)> = {
            let state = self.state.lock();
            let mut plan = Vec::new();
            for sub in &state.sub_items {
                let readers = sub.items_where(&state.access_rights, None, |a| a.includes_read());
                let feeder = match readers.as_slice() {
                    [single] => {
                        let source = sub.controller_of(single);
                        let has_writer = !sub
                            .items_where(&state.access_rights, source.as_deref(), |a| {
                                a.includes_write()
                            })
                            .is_empty();
                        has_writer.then(|| single.clone())
                    }
                    _ => None,
                };
                for (_, item) in sub.data_items() {
                    let active = match &feeder {
                        Some(f) if Arc::ptr_eq(f, &item) => ActiveState::Active,
                        _ => ActiveState::Inactive,
                    };
                    plan.push((item, active));
                }
            }
            plan
        };

        for (item, active) in plan {
            item.set_active_state(active);
        }
    }

    /// Forwards every value held back by a scheduled trigger to the
    /// writable siblings of its source. Returns the number of writes.
    pub fn exchange_pending(&self) -> usize {
        let writes: Vec<(Arc<DataItem>, Value)> = {
            let mut state = self.state.lock();
            let rights = state.access_rights.clone();
            let mut writes = Vec::new();
            for sub in state.sub_items.iter_mut().filter(|s| s.exchange_pending) {
                sub.exchange_pending = false;
                let value = sub.trigger_value.value.clone();
                for item in sub.items_where(&rights, sub.trigger_source.as_deref(), |a| {
                    a.includes_write()
                }) {
                    writes.push((item, value.clone()));
                }
            }
            writes
        };

        for (item, value) in &writes {
            item.batch_write(value);
        }
        writes.len()
    }

    fn on_data_item_event(&self, index: usize, item: &DataItem, event: &DataItemEvent) {
        match event {
            DataItemEvent::ValueChanged { value } => self.on_value_changed(index, item, value),
            DataItemEvent::QualityChanged { .. } => self.on_quality_changed(),
            _ => {}
        }
    }

    fn on_value_changed(&self, index: usize, item: &DataItem, value: &VariantValue) {
        let (siblings, events) = {
            let mut state = self.state.lock();
            if state.disposed || index >= state.sub_items.len() {
                return;
            }
            let Some(controller) = state.sub_items[index].controller_of(item) else {
                return;
            };
            let access = access_of(&state.access_rights, &controller);
            let immediate = state.is_immediate();

            let sub = &mut state.sub_items[index];
            sub.trigger_value = value.clone();
            sub.trigger_source = Some(controller.clone());

            let mut events = Vec::new();
            let mut siblings = Vec::new();
            if access.includes_read() {
                let before = state.compose(index);
                state.sub_items[index].value = value.clone();
                let after = state.compose(index);
                state.value_events(index, &before, &after, &mut events);

                if immediate {
                    siblings = state.sub_items[index].items_where(
                        &state.access_rights,
                        Some(controller.as_str()),
                        |a| a.includes_write(),
                    );
                } else {
                    state.sub_items[index].exchange_pending = true;
                }
            }
            if let Some(quality) = state.refresh_quality() {
                events.push(TagEvent::QualityChanged { quality });
            }
            (siblings, events)
        };

        for sibling in &siblings {
            sibling.batch_write(&value.value);
        }
        self.publish(&events);
    }

    /// Quality changes never raise ValueChanged.
    fn on_quality_changed(&self) {
        let changed = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.refresh_quality()
        };
        if let Some(quality) = changed {
            self.events.notify(&TagEvent::QualityChanged { quality });
        }
    }

    fn deny(&self, operation: &str) {
        warn!(tag = %self.name, operation, "Access denied - tag is read-only");
        self.events.notify(&TagEvent::access_denied(operation));
    }

    fn publish(&self, events: &[TagEvent]) {
        for event in events {
            self.events.notify(event);
        }
    }

    /// Removes every data item from its controller and releases the tag.
    /// Calling it again has no effect.
    pub fn dispose(&self) {
        let (constituents, counted) = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            let counted = state.registered && !state.is_internal();
            let mut constituents = Vec::new();
            for sub in state.sub_items.iter_mut() {
                constituents.extend(sub.constituents.values().cloned());
                sub.constituents.clear();
            }
            state.access_rights.clear();
            (constituents, counted)
        };

        for constituent in &constituents {
            constituent.item.unsubscribe(constituent.subscription);
            if let Some(owner) = constituent.item.controller() {
                owner.remove_data_item(&constituent.item);
            }
        }
        if counted {
            if let Some(counting) = &self.services.read().counting {
                counting.remove_connected_data_items(1);
            }
        }
        info!(tag = %self.name, items = constituents.len(), "Tag disposed");
    }
}

impl std::fmt::Debug for GlobalDataItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalDataItem")
            .field("name", &self.name)
            .field("state", &*self.state.lock())
            .finish()
    }
}
