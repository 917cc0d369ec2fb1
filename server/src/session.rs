// server/src/session.rs
//
// Per-character durable state: the set of tabs where placeholders are not
// recreated. The character storage is wiped at load time, so the value is
// read first and written back unchanged afterwards.

use std::collections::{BTreeSet, HashMap};
use log;

use crate::models::TabIndex;

pub const DISABLED_TABS_KEY: &str = "disabledTabs";

/// Durable per-character key/value store.
pub trait CharacterStorage {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: String);
    fn clear(&mut self);
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    pub entries: HashMap<String, String>,
}

impl CharacterStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Tabs with placeholder recreation suppressed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisabledTabs(BTreeSet<TabIndex>);

impl DisabledTabs {
    pub fn contains(&self, tab: TabIndex) -> bool {
        self.0.contains(&tab)
    }

    pub fn insert(&mut self, tab: TabIndex) -> bool {
        self.0.insert(tab)
    }

    pub fn remove(&mut self, tab: TabIndex) -> bool {
        self.0.remove(&tab)
    }

    pub fn iter(&self) -> impl Iterator<Item = TabIndex> + '_ {
        self.0.iter().copied()
    }

    /// Parses the stored JSON array of tab indices.
    pub fn parse(raw: &str) -> Result<Self, String> {
        serde_json::from_str::<Vec<TabIndex>>(raw)
            .map(|tabs| DisabledTabs(tabs.into_iter().collect()))
            .map_err(|e| format!("Invalid disabled tab list {:?}: {}", raw, e))
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(&self.0.iter().collect::<Vec<_>>())
            .map_err(|e| format!("Failed to encode disabled tabs: {}", e))
    }
}

impl FromIterator<TabIndex> for DisabledTabs {
    fn from_iter<I: IntoIterator<Item = TabIndex>>(iter: I) -> Self {
        DisabledTabs(iter.into_iter().collect())
    }
}

/// Reads the disabled tabs, wipes the character storage, and writes the value back.
/// A value that does not parse is kept verbatim but treated as no disabled tabs.
pub fn restore_disabled_tabs<S: CharacterStorage + ?Sized>(storage: &mut S) -> DisabledTabs {
    let raw = storage.get_item(DISABLED_TABS_KEY);
    storage.clear();

    let Some(raw) = raw else {
        log::debug!("[BankSession] No disabled tabs stored.");
        return DisabledTabs::default();
    };
    let disabled = DisabledTabs::parse(&raw).unwrap_or_else(|e| {
        log::warn!("[BankSession] {}. Treating every tab as enabled.", e);
        DisabledTabs::default()
    });
    storage.set_item(DISABLED_TABS_KEY, raw);
    log::info!("[BankSession] Restored {} disabled tab(s).", disabled.0.len());
    disabled
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn survives_the_load_time_wipe() {
        let mut storage = MemoryStorage::default();
        storage.set_item(DISABLED_TABS_KEY, "[2,0]".to_string());
        storage.set_item("scratch", "stale".to_string());

        let disabled = restore_disabled_tabs(&mut storage);

        assert_eq!(disabled.iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(storage.get_item(DISABLED_TABS_KEY).as_deref(), Some("[2,0]"));
        assert_eq!(storage.get_item("scratch"), None);
    }

    #[test]
    fn missing_key_means_nothing_disabled() {
        let mut storage = MemoryStorage::default();
        storage.set_item("scratch", "stale".to_string());
        assert_eq!(restore_disabled_tabs(&mut storage), DisabledTabs::default());
        assert!(storage.entries.is_empty());
    }

    #[test]
    fn garbage_is_written_back_but_ignored() {
        let mut storage = MemoryStorage::default();
        storage.set_item(DISABLED_TABS_KEY, "not json".to_string());

        assert_eq!(restore_disabled_tabs(&mut storage), DisabledTabs::default());
        assert_eq!(storage.get_item(DISABLED_TABS_KEY).as_deref(), Some("not json"));
    }

    #[test]
    fn json_encoding_is_sorted() {
        let disabled: DisabledTabs = [3, 1].into_iter().collect();
        assert_eq!(disabled.to_json().unwrap(), "[1,3]");
    }
}
