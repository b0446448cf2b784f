use async_trait::async_trait;
use serde_json::Value;

use crate::data_item::DataItem;
use crate::error::Result;
use crate::tag::VariantValue;

/// A physical controller (PLC) as seen by the tag core.
///
/// The controller owns its data items. Synchronous methods are called
/// from the value fan-out path and must not block on other controllers.
/// Errors returned by the I/O methods are turned into Bad quality by the
/// calling `DataItem`; they never reach tag consumers.
#[async_trait]
pub trait Controller: Send + Sync {
    fn name(&self) -> String;

    /// Renames the controller and the controller name of its data items.
    fn rename(&self, new_name: &str);

    /// Controller is enabled in the project
    fn is_active(&self) -> bool;

    /// Communication with the device is currently established
    fn is_controller_connected(&self) -> bool;

    /// Opens the controller's native batch
    async fn batch_start(&self) -> Result<()>;

    /// Sends every queued batch read/write as one unit
    async fn batch_commit(&self) -> Result<()>;

    /// Detaches and destroys a data item owned by this controller
    fn remove_data_item(&self, item: &DataItem);

    fn read(&self, item: &DataItem) -> Result<VariantValue>;

    /// Queues a read into the open batch; the result arrives through
    /// `DataItem::apply_device_value` on commit.
    fn batch_read(&self, item: &DataItem) -> Result<()>;

    fn write(&self, item: &DataItem, value: &Value) -> Result<()>;

    /// Queues a write into the open batch; without one the write is sent
    /// right away.
    fn batch_write(&self, item: &DataItem, value: &Value) -> Result<()>;
}
