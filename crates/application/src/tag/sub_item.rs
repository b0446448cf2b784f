use std::sync::Arc;

use domain::{
    AccessRights, ControllerMap, DataItem, DataQuality, DataType, SubscriptionId, VariantValue,
};

/// A data item attached to a subitem, with its event subscription
#[derive(Debug, Clone)]
pub(crate) struct Constituent {
    pub(crate) item: Arc<DataItem>,
    pub(crate) subscription: SubscriptionId,
}

/// One slot of a global tag.
///
/// Holds at most one data item per controller. The value the tag shows is
/// built from the items whose access includes Read; the internal value is
/// what was last written explicitly.
#[derive(Debug, Clone)]
pub struct GlobalDataSubItem {
    pub(crate) constituents: ControllerMap<Constituent>,
    /// Last explicitly written value, in device units
    pub(crate) internal_value: VariantValue,
    /// Last value reported by any constituent, in device units
    pub(crate) trigger_value: VariantValue,
    pub(crate) trigger_source: Option<String>,
    /// A scheduled trigger still has to forward `trigger_value`
    pub(crate) exchange_pending: bool,
    /// Last value reported by a readable constituent, in device units
    pub(crate) value: VariantValue,
}

impl GlobalDataSubItem {
    pub(crate) fn new(data_type: DataType) -> Self {
        Self {
            constituents: ControllerMap::new(),
            internal_value: VariantValue::good(data_type.default_value()),
            trigger_value: VariantValue::unknown(data_type),
            trigger_source: None,
            exchange_pending: false,
            value: VariantValue::unknown(data_type),
        }
    }

    pub fn len(&self) -> usize {
        self.constituents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constituents.is_empty()
    }

    pub fn internal_value(&self) -> &VariantValue {
        &self.internal_value
    }

    pub fn trigger_value(&self) -> &VariantValue {
        &self.trigger_value
    }

    /// Controller name to data item name, in insertion order
    pub fn data_item_names(&self) -> Vec<(String, String)> {
        self.constituents
            .iter()
            .map(|(controller, c)| (controller.to_string(), c.item.name().to_string()))
            .collect()
    }

    pub fn data_items(&self) -> Vec<(String, Arc<DataItem>)> {
        self.constituents
            .iter()
            .map(|(controller, c)| (controller.to_string(), c.item.clone()))
            .collect()
    }

    pub fn data_item(&self, controller: &str) -> Option<Arc<DataItem>> {
        self.constituents.get(controller).map(|c| c.item.clone())
    }

    /// Controller key of the given item, matched by identity.
    pub(crate) fn controller_of(&self, item: &DataItem) -> Option<String> {
        self.constituents
            .iter()
            .find(|(_, c)| std::ptr::eq(Arc::as_ptr(&c.item), item))
            .map(|(controller, _)| controller.to_string())
    }

    /// Items whose access rights satisfy `filter`, excluding `skip`.
    pub(crate) fn items_where(
        &self,
        rights: &ControllerMap<AccessRights>,
        skip: Option<&str>,
        filter: impl Fn(AccessRights) -> bool,
    ) -> Vec<Arc<DataItem>> {
        self.constituents
            .iter()
            .filter(|(controller, _)| Some(*controller) != skip)
            .filter(|(controller, _)| filter(access_of(rights, controller)))
            .map(|(_, c)| c.item.clone())
            .collect()
    }

    pub(crate) fn has_reader(&self, rights: &ControllerMap<AccessRights>) -> bool {
        self.constituents
            .keys()
            .any(|controller| access_of(rights, controller).includes_read())
    }

    /// Worst quality among readable constituents.
    ///
    /// A slot nothing reads from reports its internal value, degraded to
    /// Bad once a write to any constituent failed.
    pub(crate) fn quality(&self, rights: &ControllerMap<AccessRights>) -> DataQuality {
        if !self.has_reader(rights) {
            let write_failed = self
                .constituents
                .values()
                .any(|c| c.item.quality() == DataQuality::Bad);
            return if write_failed {
                DataQuality::Bad
            } else {
                self.internal_value.quality
            };
        }
        self.constituents
            .iter()
            .filter(|(controller, _)| access_of(rights, controller).includes_read())
            .map(|(_, c)| c.item.quality())
            .fold(DataQuality::Good, DataQuality::worst)
    }
}

pub(crate) fn access_of(rights: &ControllerMap<AccessRights>, controller: &str) -> AccessRights {
    rights.get(controller).copied().unwrap_or(AccessRights::None)
}
