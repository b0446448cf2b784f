use domain::{DataItem, DataType, Result};
use tracing::{debug, info};

use super::global_data_item::GlobalDataItem;

/// Rules shared by every global tag: data type and size inheritance
/// between a tag and its data items, and controller renaming.
pub struct DataItemLogic;

impl DataItemLogic {
    /// Applies type inheritance after `item` was attached to `tag`.
    ///
    /// While editing live, the first item added to an empty tag donates its
    /// data type and size (system tags excepted); every later item receives
    /// the tag's. Loading a project (`is_live_edit == false`) infers nothing.
    pub fn item_added_to_global_data_item(tag: &GlobalDataItem, item: &DataItem, is_live_edit: bool) {
        if !is_live_edit {
            return;
        }

        let mut state = tag.lock_state();
        let was_empty = state.constituent_count() == 1;
        let donates = was_empty && state.kind().inherits_data_type();

        if donates && !item.data_type().is_default() {
            state.data_type = item.data_type();
            state.size = item.size();
            debug!(tag = %tag.name(), data_type = ?state.data_type, "Data type taken from first data item");
        } else {
            if !state.data_type.is_default() {
                item.set_data_type(state.data_type);
            }
            item.set_size(state.size);
        }
    }

    /// Resets the data type once the last item is gone, unless the tag is a
    /// system tag or `reset_if_empty` is false.
    pub fn item_removed_from_global_data_item(tag: &GlobalDataItem, reset_if_empty: bool) {
        let mut state = tag.lock_state();
        if reset_if_empty && state.constituent_count() == 0 && !state.is_system {
            state.data_type = DataType::Default;
            debug!(tag = %tag.name(), "Data type reset - no data items left");
        }
    }

    /// Checks that `new` is free in the access rights and in every subitem.
    pub fn validate_controller_rename(tag: &GlobalDataItem, old: &str, new: &str) -> Result<()> {
        let state = tag.lock_state();
        state.access_rights.check_rename(old, new)?;
        for sub in &state.sub_items {
            sub.constituents.check_rename(old, new)?;
        }
        Ok(())
    }

    /// Re-keys `old` to `new` in the access rights and in every subitem.
    ///
    /// Every map is validated before the first one is touched; on a
    /// conflict nothing changes.
    pub fn controller_renamed(tag: &GlobalDataItem, old: &str, new: &str) -> Result<()> {
        let mut state = tag.lock_state();
        state.access_rights.check_rename(old, new)?;
        for sub in &state.sub_items {
            sub.constituents.check_rename(old, new)?;
        }

        state.access_rights.rename_key(old, new)?;
        for sub in state.sub_items.iter_mut() {
            sub.constituents.rename_key(old, new)?;
            if sub.trigger_source.as_deref() == Some(old) {
                sub.trigger_source = Some(new.to_string());
            }
        }
        info!(tag = %tag.name(), old, new, "Controller renamed");
        Ok(())
    }
}
