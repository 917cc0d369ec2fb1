// Shared fixtures for the unit tests.

use std::collections::HashSet;

use crate::bank::{BankState, HostBank};
use crate::bank_operations::{AddItemOptions, BankOperations};
use crate::collaborators::{ItemRegistry, SelectionView};
use crate::models::{BankItem, ItemAction, ItemId, Removal};

/// Builds a host bank from `(item, quantity, locked)` rows, one slice per tab.
pub fn bank_with(tabs: &[&[(ItemId, u32, bool)]], max_slots: u32) -> HostBank {
    let mut state = BankState::with_capacity(max_slots);
    for (tab, rows) in tabs.iter().enumerate() {
        let mut ids = Vec::new();
        for (position, (item_id, quantity, locked)) in rows.iter().enumerate() {
            let mut bank_item = BankItem::new(*item_id, *quantity, tab as u32, position as u32);
            bank_item.locked = *locked;
            state.items.insert(*item_id, bank_item);
            ids.push(*item_id);
        }
        state.tabs.push(ids);
    }
    HostBank::new(state)
}

/// Checks the map/tab mirror and that every tab runs `0..n-1`.
pub fn assert_contiguous(state: &BankState) {
    let mut seen = 0;
    for (tab, ids) in state.tabs.iter().enumerate() {
        for (position, id) in ids.iter().enumerate() {
            let bank_item = state.item(*id).unwrap_or_else(|| panic!("item {} in tab {} has no entry", id, tab));
            assert_eq!((bank_item.tab, bank_item.tab_position), (tab as u32, position as u32), "item {}", id);
            seen += 1;
        }
    }
    assert_eq!(seen, state.items.len(), "every entry appears in exactly one tab slot");
}

#[derive(Debug, Default)]
pub struct EmptyItems {
    pub empty: HashSet<ItemId>,
    pub readable: HashSet<ItemId>,
    pub released: Vec<ItemId>,
}

impl EmptyItems {
    pub fn with(empty: &[ItemId]) -> Self {
        EmptyItems { empty: empty.iter().copied().collect(), ..EmptyItems::default() }
    }
}

impl ItemRegistry for EmptyItems {
    fn is_empty_item(&self, item: ItemId) -> bool {
        self.empty.contains(&item)
    }

    fn release_empty_item(&mut self, _state: &mut BankState, item: ItemId) {
        self.released.push(item);
    }

    fn has_readable_contents(&self, item: ItemId) -> bool {
        self.readable.contains(&item)
    }
}

#[derive(Debug, Default)]
pub struct FocusedSelection {
    pub focused: Option<ItemId>,
    pub shown: Option<BankItem>,
}

impl FocusedSelection {
    pub fn on(item: ItemId) -> Self {
        FocusedSelection { focused: Some(item), shown: None }
    }
}

impl SelectionView for FocusedSelection {
    fn focused_item(&self) -> Option<ItemId> {
        self.focused
    }

    fn refresh(&mut self, bank_item: &BankItem) {
        self.shown = Some(bank_item.clone());
    }
}

/// Host bank that records which host routines were reached.
#[derive(Debug, Default)]
pub struct SpyBank {
    pub host: HostBank,
    pub actions: Vec<(ItemAction, ItemId)>,
    pub clue_checks: usize,
    pub top_ups: usize,
}

impl SpyBank {
    pub fn new(host: HostBank) -> Self {
        SpyBank { host, ..SpyBank::default() }
    }
}

impl BankOperations for SpyBank {
    fn state(&self) -> &BankState {
        self.host.state()
    }

    fn state_mut(&mut self) -> &mut BankState {
        self.host.state_mut()
    }

    fn remove_item_quantity(&mut self, item: ItemId, removal: Removal, remove_charges: bool) -> Result<(), String> {
        self.host.remove_item_quantity(item, removal, remove_charges)
    }

    fn add_item(&mut self, item: ItemId, quantity: u32, options: AddItemOptions) -> Result<bool, String> {
        self.host.add_item(item, quantity, options)
    }

    fn will_items_fit(&self, items: &[ItemId], occupied: u32) -> bool {
        self.host.will_items_fit(items, occupied)
    }

    fn perform_action(&mut self, action: ItemAction, item: ItemId) -> Result<u32, String> {
        self.actions.push((action, item));
        self.host.perform_action(action, item)
    }

    fn check_for_clue_chasers(&mut self) -> bool {
        self.clue_checks += 1;
        self.host.check_for_clue_chasers()
    }

    fn add_quantity_to_existing_items(&mut self, quantity: u32, include: &dyn Fn(&BankItem) -> bool) {
        self.top_ups += 1;
        self.host.add_quantity_to_existing_items(quantity, include)
    }
}
