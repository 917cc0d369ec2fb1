/******************************************************************************
 *                                                                            *
 * The host bank surface that placeholder handling wraps. Implementors are    *
 * the unmodified storage engine: they know nothing about placeholders and    *
 * treat a zero-quantity entry like any other entry. PlaceholderBank layers   *
 * the placeholder behaviour on top of any implementor.                       *
 *                                                                            *
 ******************************************************************************/

use crate::bank::BankState;
use crate::models::{BankItem, ItemAction, ItemId, Removal, TabIndex};

/// Options for a host add request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AddItemOptions {
    /// Count the quantity as lost if the add is refused.
    pub log_lost: bool,
    /// Tab that receives a brand new entry.
    pub tab: TabIndex,
    /// Skip the host's own capacity check.
    pub ignore_space: bool,
}

impl Default for AddItemOptions {
    fn default() -> Self {
        AddItemOptions { log_lost: false, tab: 0, ignore_space: false }
    }
}

/// Operations of the host bank.
pub trait BankOperations {
    fn state(&self) -> &BankState;

    fn state_mut(&mut self) -> &mut BankState;

    /// Removes quantity from an item. Removing an entry's whole quantity (or more)
    /// deletes the entry and closes the gap in its tab.
    /// Errors if the item is not in the bank.
    fn remove_item_quantity(&mut self, item: ItemId, removal: Removal, remove_charges: bool) -> Result<(), String>;

    /// Adds quantity to an item, creating the entry if needed.
    /// Returns `Ok(false)` if the bank had no room for it.
    fn add_item(&mut self, item: ItemId, quantity: u32, options: AddItemOptions) -> Result<bool, String>;

    /// Raw count of entries, every entry occupying one slot.
    fn occupied_slots(&self) -> u32 {
        self.state().items.len() as u32
    }

    /// Applies the host's capacity rule (each distinct item not yet banked takes
    /// one slot) on top of the given occupied-slot count.
    fn will_items_fit(&self, items: &[ItemId], occupied: u32) -> bool;

    fn has_item(&self, item: ItemId) -> bool {
        self.state().items.contains_key(&item)
    }

    /// Runs the non-quantity part of an action and returns how many units it consumes.
    /// The caller is responsible for removing the consumed units.
    fn perform_action(&mut self, action: ItemAction, item: ItemId) -> Result<u32, String>;

    /// Checks the first slots of the first tab against the clue chaser sequence.
    fn check_for_clue_chasers(&mut self) -> bool;

    /// Adds `quantity` to every entry accepted by `include`.
    fn add_quantity_to_existing_items(&mut self, quantity: u32, include: &dyn Fn(&BankItem) -> bool);
}
