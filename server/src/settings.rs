// server/src/settings.rs
//
// Placeholder policy flags, read by name from whatever settings store the
// host provides. This crate never writes them.

use std::collections::HashMap;
use serde::{Serialize, Deserialize};

pub const ONLY_LOCKED_KEY: &str = "only-locked";
pub const USE_SLOTS_KEY: &str = "use-slots";

/// Read-only access to boolean settings by name.
pub trait SettingsSource {
    fn get_bool(&self, key: &str) -> Option<bool>;
}

impl SettingsSource for HashMap<String, bool> {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).copied()
    }
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicySettings {
    /// Only locked items get a placeholder when their last unit is removed.
    pub only_locked: bool,
    /// Placeholders occupy slots; empty sentinel items do not.
    pub use_slots: bool,
}

impl PolicySettings {
    /// Missing keys read as `false`.
    pub fn from_source<S: SettingsSource + ?Sized>(source: &S) -> Self {
        PolicySettings {
            only_locked: source.get_bool(ONLY_LOCKED_KEY).unwrap_or(false),
            use_slots: source.get_bool(USE_SLOTS_KEY).unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_flags_by_name() {
        let mut store = HashMap::new();
        store.insert(ONLY_LOCKED_KEY.to_string(), true);
        let settings = PolicySettings::from_source(&store);
        assert!(settings.only_locked);
        assert!(!settings.use_slots);
    }
}
