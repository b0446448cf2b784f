use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;

use domain::{Controller, TagName};
use infrastructure::config::TagConfig;
use infrastructure::{
    ConfiguredFeatures, ConnectedItemCounter, MemoryController, RuntimeConfig, TracingAuditTrail,
};

use super::GlobalController;
use crate::poll::{PollGroup, PollIntervalPolicy};
use crate::tag::{GlobalDataItem, TagServices};
use crate::trigger::DataTrigger;

/// A project built from configuration, with handles on its services.
pub struct Runtime {
    pub controller: Arc<GlobalController>,
    pub devices: Vec<Arc<MemoryController>>,
    pub counter: Arc<ConnectedItemCounter>,
    pub audit: Arc<TracingAuditTrail>,
    pub policy: Arc<PollIntervalPolicy>,
}

pub fn build_runtime(config: &RuntimeConfig) -> Result<Runtime> {
    let counter = Arc::new(ConnectedItemCounter::new());
    let audit = Arc::new(TracingAuditTrail::new());
    let features = Arc::new(ConfiguredFeatures::from_config(&config.features));
    let policy = Arc::new(PollIntervalPolicy::new(
        config.poll_limits.clone(),
        config.target.model.clone(),
        features,
    ));
    let global = GlobalController::new(TagServices {
        counting: Some(counter.clone()),
        audit: Some(audit.clone()),
    });

    for group in &config.poll_groups {
        let poll_group = PollGroup::new(&group.name, group.interval_ms, policy.clone())
            .with_context(|| format!("Poll group {}", group.name))?;
        global.add_poll_group(poll_group)?;
    }

    for trigger in &config.triggers {
        let data_trigger = match trigger.interval_ms {
            Some(ms) => DataTrigger::scheduled(&trigger.name, Duration::from_millis(ms)),
            None => DataTrigger::immediate(&trigger.name),
        };
        global.add_trigger(data_trigger)?;
    }

    let mut devices = Vec::with_capacity(config.controllers.len());
    for controller in &config.controllers {
        let device = MemoryController::from_config(controller);
        global
            .add_controller(device.clone())
            .with_context(|| format!("Controller {}", controller.name))?;
        devices.push(device);
    }

    for tag_config in &config.tags {
        let tag = build_tag(&global, &devices, tag_config)
            .with_context(|| format!("Tag {}", tag_config.name))?;
        global.add_tag(tag)?;
    }

    info!(
        model = %config.target.model,
        controllers = devices.len(),
        tags = global.tag_count(),
        "Runtime built from configuration"
    );

    Ok(Runtime {
        controller: Arc::new(global),
        devices,
        counter,
        audit,
        policy,
    })
}

fn build_tag(
    global: &GlobalController,
    devices: &[Arc<MemoryController>],
    config: &TagConfig,
) -> Result<Arc<GlobalDataItem>> {
    let name = TagName::new(config.name.as_str())?;
    let tag = match config.array_size {
        Some(size) => GlobalDataItem::new_array(name, config.data_type, size)?,
        None => GlobalDataItem::new(name, config.data_type),
    };
    tag.set_offset(config.offset)?;
    tag.set_gain(config.gain)?;
    tag.set_access_right(config.access_right);
    tag.set_log_to_audit_trail(config.log_to_audit_trail);
    tag.set_non_volatile(config.non_volatile);

    if let Some(trigger) = &config.trigger {
        let Some(trigger) = global.trigger(trigger) else {
            bail!("unknown trigger {trigger}");
        };
        tag.set_trigger(Some(trigger));
    }
    if let Some(group) = &config.poll_group {
        let Some(group) = global.poll_group(group) else {
            bail!("unknown poll group {group}");
        };
        tag.set_poll_group(Some(group));
    }

    for item in &config.items {
        let Some(device) = devices.iter().find(|d| d.name() == item.controller) else {
            bail!("unknown controller {}", item.controller);
        };
        let data_type = item.data_type.unwrap_or(config.data_type);
        let data_item = device.add_data_item(&item.item, data_type);
        tag.add_data_item(item.index, data_item, item.access, false)?;
    }

    if let Some(value) = &config.initial_value {
        if tag.constituent_count() == 0 {
            tag.set_value(value.clone())?;
        }
    }
    Ok(tag)
}
