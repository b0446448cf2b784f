use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// Insertion-ordered map keyed by controller name.
///
/// Holds the per-controller access rights of a tag and the data items of
/// each subitem. Keys are compared exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for ControllerMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> ControllerMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, controller: &str) -> bool {
        self.position(controller).is_some()
    }

    pub fn get(&self, controller: &str) -> Option<&V> {
        self.position(controller).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, controller: &str) -> Option<&mut V> {
        self.position(controller).map(move |i| &mut self.entries[i].1)
    }

    /// Inserts or replaces, keeping the original position on replace.
    pub fn insert(&mut self, controller: impl Into<String>, value: V) -> Option<V> {
        let controller = controller.into();
        match self.position(&controller) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((controller, value));
                None
            }
        }
    }

    pub fn remove(&mut self, controller: &str) -> Option<V> {
        self.position(controller).map(|i| self.entries.remove(i).1)
    }

    /// Fails when `new` is already present; `old` may be missing.
    pub fn check_rename(&self, old: &str, new: &str) -> Result<()> {
        if old != new && self.contains_key(new) {
            return Err(DomainError::DuplicateKey(new.to_string()));
        }
        Ok(())
    }

    /// Re-keys `old` to `new` in place. No-op when `old` is absent.
    pub fn rename_key(&mut self, old: &str, new: &str) -> Result<()> {
        self.check_rename(old, new)?;
        if let Some(i) = self.position(old) {
            self.entries[i].0 = new.to_string();
        }
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, controller: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == controller)
    }
}
