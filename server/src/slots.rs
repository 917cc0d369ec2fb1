// server/src/slots.rs
//
// Slot accounting under the two counting policies. With `use_slots` off every
// placeholder is free; with it on only empty sentinel items are free and the
// capacity check is done here instead of by the host.

use std::collections::HashSet;
use log;

use crate::bank_operations::BankOperations;
use crate::collaborators::{ItemRegistry, Notifier, SelectionView};
use crate::models::ItemId;
use crate::placeholder_bank::PlaceholderBank;
use crate::settings::PolicySettings;

/// Slots counted against the bank's capacity.
pub fn occupied_slots<B, R>(bank: &B, registry: &R, policy: PolicySettings) -> u32
where
    B: BankOperations + ?Sized,
    R: ItemRegistry + ?Sized,
{
    let state = bank.state();
    let free = if policy.use_slots {
        state.items.keys().filter(|id| registry.is_empty_item(**id)).count()
    } else {
        state.placeholder_count()
    };
    bank.occupied_slots().saturating_sub(free as u32)
}

/// Whether a batch of incoming items fits. Items already held, placeholders
/// included, never take a new slot. Without `use_slots` the host rule runs
/// against the placeholder-free count.
pub fn will_items_fit<B, R>(bank: &B, registry: &R, policy: PolicySettings, items: &[ItemId]) -> bool
where
    B: BankOperations + ?Sized,
    R: ItemRegistry + ?Sized,
{
    let occupied = occupied_slots(bank, registry, policy);
    if !policy.use_slots {
        return bank.will_items_fit(items, occupied);
    }

    let state = bank.state();
    let mut tentative: u32 = 0;
    let mut counted: HashSet<ItemId> = HashSet::new();
    for item in items {
        if state.items.contains_key(item) || !counted.insert(*item) {
            continue;
        }
        tentative += 1;
        if occupied + tentative > state.max_slots {
            log::debug!("[BankSlots] Item {} would exceed {} slots ({} occupied).", item, state.max_slots, occupied);
            return false;
        }
    }
    true
}

impl<B, N, V, R> PlaceholderBank<B, N, V, R>
where
    B: BankOperations,
    N: Notifier,
    V: SelectionView,
    R: ItemRegistry,
{
    pub fn occupied_slots(&self) -> u32 {
        occupied_slots(&self.inner, &self.registry, self.policy)
    }

    pub fn will_items_fit(&self, items: &[ItemId]) -> bool {
        will_items_fit(&self.inner, &self.registry, self.policy, items)
    }
}
