use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use domain::{Controller, DataType, DomainError, Result, TagName};

use crate::batch::BatchService;
use crate::poll::PollGroup;
use crate::tag::{DataItemLogic, GlobalDataItem, TagServices};
use crate::trigger::{DataTrigger, TriggerScheduler};

/// Registry of every global tag and controller of a running project.
pub struct GlobalController {
    tags: RwLock<Vec<Arc<GlobalDataItem>>>,
    controllers: RwLock<Vec<Arc<dyn Controller>>>,
    poll_groups: RwLock<Vec<Arc<PollGroup>>>,
    triggers: RwLock<Vec<DataTrigger>>,
    services: TagServices,
    batch: Arc<BatchService>,
    scheduler: TriggerScheduler,
}

impl GlobalController {
    pub fn new(services: TagServices) -> Self {
        let batch = Arc::new(BatchService::new());
        Self {
            tags: RwLock::new(Vec::new()),
            controllers: RwLock::new(Vec::new()),
            poll_groups: RwLock::new(Vec::new()),
            triggers: RwLock::new(Vec::new()),
            services,
            scheduler: TriggerScheduler::new(batch.clone()),
            batch,
        }
    }

    pub fn batch_service(&self) -> Arc<BatchService> {
        self.batch.clone()
    }

    pub fn services(&self) -> &TagServices {
        &self.services
    }

    // Controllers

    pub fn add_controller(&self, controller: Arc<dyn Controller>) -> Result<()> {
        let name = controller.name();
        let mut controllers = self.controllers.write();
        if controllers.iter().any(|c| c.name() == name) {
            return Err(DomainError::DuplicateKey(name));
        }
        self.batch.register_controller(controller.clone());
        controllers.push(controller);
        info!(controller = %name, "Controller added");
        Ok(())
    }

    pub fn controller(&self, name: &str) -> Option<Arc<dyn Controller>> {
        self.controllers
            .read()
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    pub fn controllers(&self) -> Vec<Arc<dyn Controller>> {
        self.controllers.read().clone()
    }

    /// Renames a controller in every tag, or in none of them.
    pub fn rename_controller(&self, old: &str, new: &str) -> Result<()> {
        let controller = self
            .controller(old)
            .ok_or_else(|| DomainError::ControllerNotRegistered(old.to_string()))?;
        if old == new {
            return Ok(());
        }
        if self.controller(new).is_some() {
            return Err(DomainError::DuplicateKey(new.to_string()));
        }

        let tags = self.tags();
        for tag in &tags {
            DataItemLogic::validate_controller_rename(tag, old, new)?;
        }
        for tag in &tags {
            tag.rename_controller(old, new)?;
        }
        controller.rename(new);
        self.batch.rename_controller(old, new)?;
        info!(old, new, tags = tags.len(), "Controller renamed in every tag");
        Ok(())
    }

    // Tags

    /// Registers `tag`; from now on it reports to the runtime services.
    pub fn add_tag(&self, tag: Arc<GlobalDataItem>) -> Result<()> {
        {
            let mut tags = self.tags.write();
            if tags.iter().any(|t| t.name() == tag.name()) {
                return Err(DomainError::DuplicateKey(tag.name().to_string()));
            }
            tags.push(tag.clone());
        }
        tag.attach_services(self.services.clone());
        debug!(tag = %tag.name(), kind = ?tag.kind(), "Tag added");
        Ok(())
    }

    /// Creates and registers a tag without data items.
    pub fn create_internal_variable(
        &self,
        name: &str,
        data_type: DataType,
    ) -> Result<Arc<GlobalDataItem>> {
        let tag = GlobalDataItem::new(TagName::new(name)?, data_type);
        self.add_tag(tag.clone())?;
        Ok(tag)
    }

    pub fn tag(&self, name: &str) -> Option<Arc<GlobalDataItem>> {
        self.tags
            .read()
            .iter()
            .find(|t| t.name().as_str() == name)
            .cloned()
    }

    pub fn tags(&self) -> Vec<Arc<GlobalDataItem>> {
        self.tags.read().clone()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.read().len()
    }

    /// Unregisters and disposes a tag.
    pub fn remove_tag(&self, name: &str) -> Result<Arc<GlobalDataItem>> {
        let tag = {
            let mut tags = self.tags.write();
            let position = tags
                .iter()
                .position(|t| t.name().as_str() == name)
                .ok_or_else(|| DomainError::TagNotFound(name.to_string()))?;
            tags.remove(position)
        };
        tag.dispose();
        Ok(tag)
    }

    // Poll groups and triggers

    pub fn add_poll_group(&self, group: PollGroup) -> Result<Arc<PollGroup>> {
        let mut groups = self.poll_groups.write();
        if groups.iter().any(|g| g.name() == group.name()) {
            return Err(DomainError::DuplicateKey(group.name().to_string()));
        }
        let group = Arc::new(group);
        groups.push(group.clone());
        Ok(group)
    }

    pub fn poll_group(&self, name: &str) -> Option<Arc<PollGroup>> {
        self.poll_groups
            .read()
            .iter()
            .find(|g| g.name() == name)
            .cloned()
    }

    pub fn poll_groups(&self) -> Vec<Arc<PollGroup>> {
        self.poll_groups.read().clone()
    }

    pub fn add_trigger(&self, trigger: DataTrigger) -> Result<()> {
        let mut triggers = self.triggers.write();
        if triggers.iter().any(|t| t.name() == trigger.name()) {
            return Err(DomainError::DuplicateKey(trigger.name().to_string()));
        }
        triggers.push(trigger);
        Ok(())
    }

    pub fn trigger(&self, name: &str) -> Option<DataTrigger> {
        self.triggers
            .read()
            .iter()
            .find(|t| t.name() == name)
            .cloned()
    }

    // Lifecycle

    /// Activates the data items that feed the exchange of every tag.
    pub fn run(&self) {
        let tags = self.tags();
        for tag in &tags {
            tag.run();
        }
        info!(tags = tags.len(), "Tag exchange activated");
    }

    /// Starts one sweep loop per scheduled trigger in use.
    pub fn start_triggers(&self) {
        let mut groups: Vec<(DataTrigger, Vec<Arc<GlobalDataItem>>)> = Vec::new();
        for tag in self.tags() {
            let Some(trigger) = tag.trigger() else {
                continue;
            };
            if trigger.is_immediate() {
                continue;
            }
            match groups.iter_mut().find(|(t, _)| t.name() == trigger.name()) {
                Some((_, tags)) => tags.push(tag),
                None => groups.push((trigger, vec![tag])),
            }
        }

        if groups.is_empty() {
            debug!("No scheduled triggers in use");
        }
        for (trigger, tags) in groups {
            self.scheduler.start(trigger, tags);
        }
    }

    /// Starts one batched read loop per poll group that has tags.
    pub fn start_polling(&self) {
        let tags = self.tags();
        for group in self.poll_groups() {
            let members: Vec<Arc<GlobalDataItem>> = tags
                .iter()
                .filter(|t| t.poll_group().is_some_and(|g| Arc::ptr_eq(&g, &group)))
                .cloned()
                .collect();
            if members.is_empty() {
                debug!(poll_group = %group.name(), "Poll group has no tags");
                continue;
            }
            self.scheduler.start_poll(group, members);
        }
    }

    pub fn active_loop_count(&self) -> usize {
        self.scheduler.active_count()
    }

    /// Stops the trigger loops and disposes every tag.
    pub async fn shutdown(&self) {
        self.scheduler.stop_all().await;
        let tags: Vec<Arc<GlobalDataItem>> = self.tags.write().drain(..).collect();
        for tag in &tags {
            tag.dispose();
        }
        info!(tags = tags.len(), "Global controller shut down");
    }
}
