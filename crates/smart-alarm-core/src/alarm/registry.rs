//! Ordered in-memory collection of alarm definitions.
//!
//! The registry holds at most one definition per id. Adding a definition whose
//! id is already present replaces the existing entry in place, keeping its
//! position, so "last write wins" holds for `add`, `update` and `toggle` alike.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::definition::AlarmDefinition;
use crate::error::NotFoundError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmRegistry {
    alarms: Vec<AlarmDefinition>,
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from stored definitions, collapsing duplicate ids.
    pub fn from_definitions(definitions: impl IntoIterator<Item = AlarmDefinition>) -> Self {
        let mut registry = Self::new();
        for def in definitions {
            registry.add(def);
        }
        registry
    }

    /// Append a definition. An existing entry with the same id is replaced.
    pub fn add(&mut self, definition: AlarmDefinition) {
        if let Some(existing) = self.alarms.iter_mut().find(|a| a.id == definition.id) {
            warn!(id = %definition.id, "alarm id already registered, replacing");
            *existing = definition;
            return;
        }
        info!(id = %definition.id, time = %definition.time, "added alarm");
        self.alarms.push(definition);
    }

    /// Remove every entry with `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.alarms.len();
        self.alarms.retain(|a| a.id != id);
        let removed = self.alarms.len() != before;
        if removed {
            info!(id, "removed alarm");
        }
        removed
    }

    /// Replace the entry with a matching id, or append if absent.
    pub fn update(&mut self, definition: AlarmDefinition) {
        match self.alarms.iter_mut().find(|a| a.id == definition.id) {
            Some(existing) => {
                info!(id = %definition.id, "updated alarm");
                *existing = definition;
            }
            None => self.add(definition),
        }
    }

    /// Set the enabled flag of the alarm with `id`.
    pub fn toggle(&mut self, id: &str, enabled: bool) -> Result<(), NotFoundError> {
        let alarm = self
            .alarms
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| NotFoundError::Alarm(id.to_string()))?;
        alarm.enabled = enabled;
        info!(id, enabled, "toggled alarm");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&AlarmDefinition> {
        self.alarms.iter().find(|a| a.id == id)
    }

    pub fn list(&self) -> &[AlarmDefinition] {
        &self.alarms
    }

    /// Enabled alarms in registry order.
    pub fn enabled(&self) -> impl Iterator<Item = &AlarmDefinition> {
        self.alarms.iter().filter(|a| a.enabled)
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    /// Smallest positive integer id not yet taken, as a string.
    pub fn next_id(&self) -> String {
        let mut n = 1usize;
        while self.get(&n.to_string()).is_some() {
            n += 1;
        }
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::definition::DayName;

    fn alarm(id: &str, time: &str) -> AlarmDefinition {
        AlarmDefinition::weekly(id, format!("Alarm {id}"), time.parse().unwrap(), [DayName::Monday])
    }

    #[test]
    fn add_preserves_insertion_order() {
        let mut reg = AlarmRegistry::new();
        reg.add(alarm("b", "08:00"));
        reg.add(alarm("a", "07:00"));
        let ids: Vec<_> = reg.list().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn add_with_existing_id_replaces_in_place() {
        let mut reg = AlarmRegistry::new();
        reg.add(alarm("1", "07:00"));
        reg.add(alarm("2", "08:00"));
        reg.add(alarm("1", "09:30"));

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.list()[0].id, "1");
        assert_eq!(reg.list()[0].time.to_string(), "09:30");
    }

    #[test]
    fn toggle_after_duplicate_add_hits_the_only_entry() {
        let mut reg = AlarmRegistry::new();
        reg.add(alarm("1", "07:00"));
        reg.add(alarm("1", "07:15"));
        reg.toggle("1", false).unwrap();

        assert_eq!(reg.enabled().count(), 0);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn toggle_unknown_id_is_not_found() {
        let mut reg = AlarmRegistry::new();
        assert_eq!(
            reg.toggle("missing", true),
            Err(NotFoundError::Alarm("missing".into()))
        );
    }

    #[test]
    fn remove_reports_whether_anything_went() {
        let mut reg = AlarmRegistry::new();
        reg.add(alarm("1", "07:00"));
        assert!(reg.remove("1"));
        assert!(!reg.remove("1"));
        assert!(reg.is_empty());
    }

    #[test]
    fn update_replaces_or_appends() {
        let mut reg = AlarmRegistry::new();
        reg.add(alarm("1", "07:00"));
        reg.update(alarm("1", "07:45"));
        reg.update(alarm("2", "10:00"));

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get("1").unwrap().time.to_string(), "07:45");
        assert_eq!(reg.list()[1].id, "2");
    }

    #[test]
    fn next_id_skips_taken_ids() {
        let mut reg = AlarmRegistry::new();
        reg.add(alarm("2", "07:00"));
        assert_eq!(reg.next_id(), "1");
        reg.add(alarm("1", "07:00"));
        assert_eq!(reg.next_id(), "3");
    }

    #[test]
    fn from_definitions_collapses_duplicates() {
        let reg = AlarmRegistry::from_definitions([alarm("1", "07:00"), alarm("1", "08:00")]);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("1").unwrap().time.to_string(), "08:00");
    }
}
