/******************************************************************************
 *                                                                            *
 * Defines the in-memory bank: the per-item map, the per-tab ordered          *
 * sequences mirroring it, and the bookkeeping the host keeps alongside       *
 * (selection, lost items, charges, render queue). HostBank is the plain      *
 * storage engine implementing BankOperations over that state.                *
 *                                                                            *
 ******************************************************************************/

use std::collections::{BTreeSet, HashMap, HashSet};
use serde::{Serialize, Deserialize};
use log;

use crate::bank_operations::{AddItemOptions, BankOperations};
use crate::models::{BankItem, ItemAction, ItemId, Removal, TabIndex};

// --- Constants ---
pub const DEFAULT_MAX_SLOTS: u32 = 12;
/// Tab indices run `0..MAX_TABS`.
pub const MAX_TABS: TabIndex = 16;
/// Number of leading slots of tab 0 inspected by the clue chaser check.
pub const CLUE_CHASER_SLOTS: usize = 6;
const USE_EIGHT_QUANTITY: u32 = 8;

/// --- Bank Data Structure ---
/// Invariant: every key of `items` appears exactly once in `tabs`, at the
/// recorded tab and position, and positions in a tab run `0..n-1`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BankState {
    pub items: HashMap<ItemId, BankItem>,
    pub tabs: Vec<Vec<ItemId>>,
    pub selected_items: Vec<ItemId>,
    pub selected_tab: TabIndex,
    pub max_slots: u32,
    pub lost_items: HashMap<ItemId, u32>,
    pub item_charges: HashMap<ItemId, u32>,
    pub sale_prices: HashMap<ItemId, u64>,
    pub gp: u64,
    pub clue_chaser_items: Vec<ItemId>,
    pub clue_chasers_found: bool,
    pub last_read: Option<ItemId>,
    /// Items whose slot needs re-rendering.
    pub render_queue: BTreeSet<ItemId>,
}

impl Default for BankState {
    fn default() -> Self {
        BankState::with_capacity(DEFAULT_MAX_SLOTS)
    }
}

impl BankState {
    pub fn with_capacity(max_slots: u32) -> Self {
        BankState {
            items: HashMap::new(),
            tabs: Vec::new(),
            selected_items: Vec::new(),
            selected_tab: 0,
            max_slots,
            lost_items: HashMap::new(),
            item_charges: HashMap::new(),
            sale_prices: HashMap::new(),
            gp: 0,
            clue_chaser_items: Vec::new(),
            clue_chasers_found: false,
            last_read: None,
            render_queue: BTreeSet::new(),
        }
    }

    pub fn item(&self, item_id: ItemId) -> Option<&BankItem> {
        self.items.get(&item_id)
    }

    /// Ordered item ids of a tab; empty for a tab that was never used.
    pub fn tab(&self, tab: TabIndex) -> &[ItemId] {
        self.tabs.get(tab as usize).map(|t| t.as_slice()).unwrap_or(&[])
    }

    /// Entries of a tab in slot order.
    pub fn tab_items(&self, tab: TabIndex) -> Vec<&BankItem> {
        self.tab(tab).iter().filter_map(|id| self.items.get(id)).collect()
    }

    pub(crate) fn tab_mut(&mut self, tab: TabIndex) -> &mut Vec<ItemId> {
        let index = tab as usize;
        if self.tabs.len() <= index {
            self.tabs.resize_with(index + 1, Vec::new);
        }
        &mut self.tabs[index]
    }

    /// Rewrites the recorded position of every entry of `tab` from `start` onwards.
    pub fn reposition_tab(&mut self, tab: TabIndex, start: usize) {
        let Some(ids) = self.tabs.get(tab as usize) else {
            return;
        };
        for (position, id) in ids.iter().enumerate().skip(start) {
            if let Some(bank_item) = self.items.get_mut(id) {
                bank_item.tab = tab;
                bank_item.tab_position = position as u32;
            }
        }
    }

    /// Installs sale prices and the clue chaser sequence from item definitions,
    /// given as `(item, sale_price, clue_chaser_slot)`. The sequence is only kept
    /// when the definitions fill slots `0..CLUE_CHASER_SLOTS` exactly once each.
    pub fn apply_item_definitions<I>(&mut self, definitions: I)
    where
        I: IntoIterator<Item = (ItemId, u64, Option<u32>)>,
    {
        let mut sequence: Vec<(u32, ItemId)> = Vec::new();
        for (item_id, sale_price, clue_chaser_slot) in definitions {
            if sale_price > 0 {
                self.sale_prices.insert(item_id, sale_price);
            }
            if let Some(slot) = clue_chaser_slot {
                sequence.push((slot, item_id));
            }
        }
        sequence.sort_unstable();

        let complete = sequence.len() == CLUE_CHASER_SLOTS
            && sequence.iter().enumerate().all(|(i, (slot, _))| *slot as usize == i);
        if complete {
            self.clue_chaser_items = sequence.into_iter().map(|(_, item_id)| item_id).collect();
        } else {
            if !sequence.is_empty() {
                log::warn!("[Bank] Ignoring incomplete clue chaser sequence: {:?}", sequence);
            }
            self.clue_chaser_items.clear();
        }
    }

    pub fn mark_dirty(&mut self, item_id: ItemId) {
        self.render_queue.insert(item_id);
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &BankItem> {
        self.items.values().filter(|b| b.is_placeholder())
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders().count()
    }

    /// Appends a new entry to the end of its tab.
    pub(crate) fn push_item(&mut self, item_id: ItemId, quantity: u32, tab: TabIndex) {
        let ids = self.tab_mut(tab);
        let position = ids.len() as u32;
        ids.push(item_id);
        self.items.insert(item_id, BankItem::new(item_id, quantity, tab, position));
        self.mark_dirty(item_id);
    }

    /// Deletes an entry from the map and its tab, closing the gap.
    pub(crate) fn detach(&mut self, item_id: ItemId) -> Option<BankItem> {
        let bank_item = self.items.remove(&item_id)?;
        let tab = bank_item.tab;
        let ids = self.tab_mut(tab);
        if let Some(index) = ids.iter().position(|id| *id == item_id) {
            ids.remove(index);
            self.reposition_tab(tab, index);
        } else {
            log::warn!("[Bank] Item {} was mapped to tab {} but missing from its sequence.", item_id, tab);
        }
        self.selected_items.retain(|id| *id != item_id);
        self.mark_dirty(item_id);
        Some(bank_item)
    }
}

/// The host storage engine, unaware of placeholders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostBank {
    pub state: BankState,
}

impl HostBank {
    pub fn new(state: BankState) -> Self {
        HostBank { state }
    }

    fn held_quantity(&self, item: ItemId) -> Result<u32, String> {
        self.state
            .item(item)
            .map(|b| b.quantity)
            .ok_or_else(|| format!("Item {} not found in bank.", item))
    }
}

impl BankOperations for HostBank {
    fn state(&self) -> &BankState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BankState {
        &mut self.state
    }

    fn remove_item_quantity(&mut self, item: ItemId, removal: Removal, remove_charges: bool) -> Result<(), String> {
        let held = self.held_quantity(item)
            .map_err(|_| format!("Tried to remove item {} from the bank, but it is not in the bank.", item))?;
        let amount = match removal {
            Removal::Quantity(quantity) => quantity,
            Removal::Everything => held,
        };

        if held <= amount {
            self.state.detach(item);
            if remove_charges {
                self.state.item_charges.remove(&item);
            }
            log::debug!("[Bank] Removed item {} entirely (held {}, removed {:?}).", item, held, removal);
        } else if let Some(bank_item) = self.state.items.get_mut(&item) {
            bank_item.quantity = held - amount;
            self.state.mark_dirty(item);
        }
        Ok(())
    }

    fn add_item(&mut self, item: ItemId, quantity: u32, options: AddItemOptions) -> Result<bool, String> {
        if quantity == 0 {
            return Ok(false);
        }
        if let Some(bank_item) = self.state.items.get_mut(&item) {
            bank_item.quantity = bank_item.quantity.saturating_add(quantity);
            self.state.mark_dirty(item);
            return Ok(true);
        }
        if !options.ignore_space && self.occupied_slots() >= self.state.max_slots {
            if options.log_lost {
                let lost = self.state.lost_items.entry(item).or_insert(0);
                *lost = lost.saturating_add(quantity);
            }
            log::debug!("[Bank] No room for new item {} ({} slots).", item, self.state.max_slots);
            return Ok(false);
        }
        if options.tab >= MAX_TABS {
            return Err(format!("Bank tab {} does not exist (max {}).", options.tab, MAX_TABS));
        }
        self.state.push_item(item, quantity, options.tab);
        Ok(true)
    }

    fn will_items_fit(&self, items: &[ItemId], occupied: u32) -> bool {
        let new_items: HashSet<ItemId> = items
            .iter()
            .copied()
            .filter(|id| !self.state.items.contains_key(id))
            .collect();
        occupied.saturating_add(new_items.len() as u32) <= self.state.max_slots
    }

    fn perform_action(&mut self, action: ItemAction, item: ItemId) -> Result<u32, String> {
        let held = self.held_quantity(item)?;
        match action {
            ItemAction::DoubleClick => {
                if let Some(index) = self.state.selected_items.iter().position(|id| *id == item) {
                    self.state.selected_items.remove(index);
                } else {
                    self.state.selected_items.push(item);
                }
                Ok(0)
            }
            ItemAction::Sell { quantity } => {
                if self.state.item(item).map_or(false, |b| b.locked) {
                    return Err(format!("Item {} is locked and cannot be sold.", item));
                }
                let sold = quantity.min(held);
                let price = self.state.sale_prices.get(&item).copied().unwrap_or(0);
                self.state.gp = self.state.gp.saturating_add(price.saturating_mul(sold as u64));
                Ok(sold)
            }
            ItemAction::Bury | ItemAction::Open | ItemAction::Claim => Ok(1),
            ItemAction::UseEight => {
                if held < USE_EIGHT_QUANTITY {
                    return Err(format!("Need {} of item {} but only {} are banked.", USE_EIGHT_QUANTITY, item, held));
                }
                Ok(USE_EIGHT_QUANTITY)
            }
            ItemAction::Read => {
                self.state.last_read = Some(item);
                Ok(0)
            }
        }
    }

    fn check_for_clue_chasers(&mut self) -> bool {
        let wanted = &self.state.clue_chaser_items;
        if wanted.len() != CLUE_CHASER_SLOTS {
            return false;
        }
        let matches = self.state.tab(0).iter().take(CLUE_CHASER_SLOTS).eq(wanted.iter());
        if matches && !self.state.clue_chasers_found {
            log::info!("[Bank] Clue chaser sequence found in the first tab.");
            self.state.clue_chasers_found = true;
        }
        matches
    }

    fn add_quantity_to_existing_items(&mut self, quantity: u32, include: &dyn Fn(&BankItem) -> bool) {
        let ids: Vec<ItemId> = self.state.items.values().filter(|b| include(b)).map(|b| b.item_id).collect();
        log::debug!("[Bank] Topping up {} item(s) by {}.", ids.len(), quantity);
        for id in ids {
            if let Some(bank_item) = self.state.items.get_mut(&id) {
                bank_item.quantity = bank_item.quantity.saturating_add(quantity);
            }
            self.state.mark_dirty(id);
        }
    }
}
