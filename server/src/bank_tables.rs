/******************************************************************************
 *                                                                            *
 * SpacetimeDB tables and reducers for a player's bank. Each reducer loads    *
 * the caller's rows into a BankState, runs the placeholder-aware operation   *
 * through PlaceholderBank, and writes the state back. Notifications raised   *
 * along the way become rows of bank_notification for the client to show.    *
 *                                                                            *
 ******************************************************************************/

use spacetimedb::{Identity, ReducerContext, Table, Timestamp};
use log;

use crate::bank::{BankState, HostBank, CLUE_CHASER_SLOTS, DEFAULT_MAX_SLOTS, MAX_TABS};
use crate::bank_operations::{AddItemOptions, BankOperations};
use crate::collaborators::{NoEmptyItems, NoSelection};
use crate::models::{AddOutcome, BankItem, ItemAction, Notification, Removal};
use crate::placeholder_bank::PlaceholderBank;
use crate::session::{CharacterStorage, DisabledTabs, MemoryStorage, DISABLED_TABS_KEY};
use crate::settings::{PolicySettings, SettingsSource, ONLY_LOCKED_KEY, USE_SLOTS_KEY};

type ModuleBank = PlaceholderBank<HostBank, Vec<Notification>, NoSelection, NoEmptyItems>;

// --- Table Definitions ---

/// One bank slot of one player. Placeholders are rows with quantity 0.
#[spacetimedb::table(name = bank_item, public)]
#[derive(Clone, Debug)]
pub struct BankItemRow {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub owner_id: Identity,
    pub item_id: u64,
    pub quantity: u32,
    pub tab: u32,
    pub tab_position: u32,
    pub locked: bool,
}

#[spacetimedb::table(name = bank_account, public)]
#[derive(Clone, Debug)]
pub struct BankAccount {
    #[primary_key]
    pub owner_id: Identity,
    pub max_slots: u32,
    pub selected_tab: u32,
    pub selected_items: Vec<u64>,
    pub gp: u64,
    pub clue_chasers_found: bool,
    pub last_read: Option<u64>,
}

/// Bank-relevant facts about an item kind, shared by every player.
#[spacetimedb::table(name = bank_item_definition, public)]
#[derive(Clone, Debug)]
pub struct BankItemDefinition {
    #[primary_key]
    pub item_id: u64,
    pub name: String,
    pub sale_price: u64,
    pub clue_chaser_slot: Option<u32>, // Slot of the first tab this item must fill for the clue chaser check
}

#[spacetimedb::table(name = bank_item_charge)]
#[derive(Clone, Debug)]
pub struct BankItemCharge {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub owner_id: Identity,
    pub item_id: u64,
    pub charges: u32,
}

#[spacetimedb::table(name = bank_settings, public)]
#[derive(Clone, Debug)]
pub struct BankSettings {
    #[primary_key]
    pub owner_id: Identity,
    pub only_locked: bool,
    pub use_slots: bool,
}

impl SettingsSource for BankSettings {
    fn get_bool(&self, key: &str) -> Option<bool> {
        match key {
            ONLY_LOCKED_KEY => Some(self.only_locked),
            USE_SLOTS_KEY => Some(self.use_slots),
            _ => None,
        }
    }
}

/// Durable per-character key/value pairs.
#[spacetimedb::table(name = character_storage)]
#[derive(Clone, Debug)]
pub struct CharacterStorageEntry {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub owner_id: Identity,
    pub key: String,
    pub value: String,
}

#[spacetimedb::table(name = bank_lost_item, public)]
#[derive(Clone, Debug)]
pub struct BankLostItem {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub owner_id: Identity,
    pub item_id: u64,
    pub quantity: u32,
}

// Public so the client can subscribe with a recipient filter
#[spacetimedb::table(name = bank_notification, public)]
#[derive(Clone, Debug)]
pub struct BankNotification {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    pub recipient_identity: Identity,
    pub text: String,
    pub sent: Timestamp,
}

/******************************************************************************
 *                              LOAD / SAVE HELPERS                           *
 ******************************************************************************/

fn load_state(ctx: &ReducerContext, owner: Identity) -> BankState {
    let account = ctx.db.bank_account().owner_id().find(&owner);
    let mut state = BankState::with_capacity(account.as_ref().map_or(DEFAULT_MAX_SLOTS, |a| a.max_slots));
    if let Some(account) = account {
        state.selected_tab = account.selected_tab;
        state.selected_items = account.selected_items;
        state.gp = account.gp;
        state.clue_chasers_found = account.clue_chasers_found;
        state.last_read = account.last_read;
    }
    state.apply_item_definitions(
        ctx.db.bank_item_definition().iter().map(|d| (d.item_id, d.sale_price, d.clue_chaser_slot)),
    );

    let mut rows: Vec<BankItemRow> = ctx.db.bank_item().iter().filter(|r| r.owner_id == owner).collect();
    rows.sort_by_key(|r| (r.tab, r.tab_position, r.id));
    for row in rows {
        let tab = if row.tab < MAX_TABS {
            row.tab
        } else {
            log::warn!("[BankTables] Row {} of {:?} names tab {}; moved to tab 0.", row.id, owner, row.tab);
            0
        };
        state.tab_mut(tab).push(row.item_id);
        let mut bank_item = BankItem::new(row.item_id, row.quantity, tab, row.tab_position);
        bank_item.locked = row.locked;
        state.items.insert(row.item_id, bank_item);
    }

    for lost in ctx.db.bank_lost_item().iter().filter(|l| l.owner_id == owner) {
        let total = state.lost_items.entry(lost.item_id).or_insert(0);
        *total = total.saturating_add(lost.quantity);
    }
    for charge in ctx.db.bank_item_charge().iter().filter(|c| c.owner_id == owner) {
        state.item_charges.insert(charge.item_id, charge.charges);
    }
    state
}

fn save_state(ctx: &ReducerContext, owner: Identity, state: &BankState) {
    let items_table = ctx.db.bank_item();
    let stale: Vec<u64> = items_table.iter().filter(|r| r.owner_id == owner).map(|r| r.id).collect();
    for id in stale {
        items_table.id().delete(id);
    }
    for (tab, ids) in state.tabs.iter().enumerate() {
        for id in ids {
            let Some(bank_item) = state.item(*id) else { continue };
            items_table.insert(BankItemRow {
                id: 0, // Auto-incremented
                owner_id: owner,
                item_id: bank_item.item_id,
                quantity: bank_item.quantity,
                tab: tab as u32,
                tab_position: bank_item.tab_position,
                locked: bank_item.locked,
            });
        }
    }

    let lost_table = ctx.db.bank_lost_item();
    let stale_lost: Vec<u64> = lost_table.iter().filter(|l| l.owner_id == owner).map(|l| l.id).collect();
    for id in stale_lost {
        lost_table.id().delete(id);
    }
    for (item_id, quantity) in &state.lost_items {
        lost_table.insert(BankLostItem { id: 0, owner_id: owner, item_id: *item_id, quantity: *quantity });
    }

    let charges_table = ctx.db.bank_item_charge();
    let stale_charges: Vec<u64> = charges_table.iter().filter(|c| c.owner_id == owner).map(|c| c.id).collect();
    for id in stale_charges {
        charges_table.id().delete(id);
    }
    for (item_id, charges) in &state.item_charges {
        charges_table.insert(BankItemCharge { id: 0, owner_id: owner, item_id: *item_id, charges: *charges });
    }

    let account = BankAccount {
        owner_id: owner,
        max_slots: state.max_slots,
        selected_tab: state.selected_tab,
        selected_items: state.selected_items.clone(),
        gp: state.gp,
        clue_chasers_found: state.clue_chasers_found,
        last_read: state.last_read,
    };
    let accounts = ctx.db.bank_account();
    if accounts.owner_id().find(&owner).is_some() {
        accounts.owner_id().update(account);
    } else {
        accounts.insert(account);
    }
}

fn load_storage(ctx: &ReducerContext, owner: Identity) -> MemoryStorage {
    let mut storage = MemoryStorage::default();
    for entry in ctx.db.character_storage().iter().filter(|e| e.owner_id == owner) {
        storage.set_item(&entry.key, entry.value);
    }
    storage
}

fn save_storage(ctx: &ReducerContext, owner: Identity, storage: &MemoryStorage) {
    let table = ctx.db.character_storage();
    let stale: Vec<u64> = table.iter().filter(|e| e.owner_id == owner).map(|e| e.id).collect();
    for id in stale {
        table.id().delete(id);
    }
    for (key, value) in &storage.entries {
        table.insert(CharacterStorageEntry { id: 0, owner_id: owner, key: key.clone(), value: value.clone() });
    }
}

fn load_policy(ctx: &ReducerContext, owner: Identity) -> PolicySettings {
    ctx.db
        .bank_settings()
        .owner_id()
        .find(&owner)
        .map(|settings| PolicySettings::from_source(&settings))
        .unwrap_or_default()
}

fn load_disabled_tabs(ctx: &ReducerContext, owner: Identity) -> DisabledTabs {
    let storage = load_storage(ctx, owner);
    storage
        .get_item(DISABLED_TABS_KEY)
        .and_then(|raw| {
            DisabledTabs::parse(&raw)
                .map_err(|e| log::warn!("[BankTables] {} for {:?}.", e, owner))
                .ok()
        })
        .unwrap_or_default()
}

fn deliver_notifications(ctx: &ReducerContext, owner: Identity, notifications: &[Notification]) {
    for notification in notifications {
        ctx.db.bank_notification().insert(BankNotification {
            id: 0, // Auto-incremented
            recipient_identity: owner,
            text: notification.to_string(),
            sent: ctx.timestamp,
        });
    }
}

fn open_bank(ctx: &ReducerContext, owner: Identity) -> ModuleBank {
    PlaceholderBank::new(HostBank::new(load_state(ctx, owner)), Vec::new(), NoSelection, NoEmptyItems)
        .with_policy(load_policy(ctx, owner))
        .with_disabled_tabs(load_disabled_tabs(ctx, owner))
}

fn close_bank(ctx: &ReducerContext, owner: Identity, bank: ModuleBank) {
    deliver_notifications(ctx, owner, bank.notifier());
    let host = bank.into_inner();
    save_state(ctx, owner, host.state());
}

/// Runs one operation on the caller's bank and persists the result.
/// Nothing is written if the operation fails.
fn with_bank<T>(ctx: &ReducerContext, op: impl FnOnce(&mut ModuleBank) -> Result<T, String>) -> Result<T, String> {
    let owner = ctx.sender;
    let mut bank = open_bank(ctx, owner);
    let result = op(&mut bank)?;
    close_bank(ctx, owner, bank);
    Ok(result)
}

/// Character load: restore session state across the storage wipe, then repair the bank.
pub(crate) fn load_bank_for(ctx: &ReducerContext, owner: Identity) -> Result<(), String> {
    let mut storage = load_storage(ctx, owner);
    let mut bank = open_bank(ctx, owner);
    let report = bank.load_session(&mut storage);
    if !report.is_clean() {
        log::warn!("[BankTables] Repaired bank of {:?} on load: {:?}", owner, report);
    }
    save_storage(ctx, owner, &storage);
    close_bank(ctx, owner, bank);
    log::info!("[BankTables] Bank loaded for {:?}.", owner);
    Ok(())
}

/******************************************************************************
 *                                  REDUCERS                                  *
 ******************************************************************************/

#[spacetimedb::reducer]
pub fn load_bank(ctx: &ReducerContext) -> Result<(), String> {
    load_bank_for(ctx, ctx.sender)
}

#[spacetimedb::reducer]
pub fn withdraw_bank_item(ctx: &ReducerContext, item_id: u64, quantity: u32) -> Result<(), String> {
    if quantity == 0 {
        return Err("Withdraw quantity must be positive.".to_string());
    }
    with_bank(ctx, |bank| {
        let outcome = bank.remove_item_quantity(item_id, Removal::Quantity(quantity), false)?;
        log::debug!("[BankTables] Withdrew {} of item {} for {:?}: {:?}", quantity, item_id, ctx.sender, outcome);
        Ok(())
    })
}

#[spacetimedb::reducer]
pub fn release_bank_placeholder(ctx: &ReducerContext, item_id: u64) -> Result<(), String> {
    with_bank(ctx, |bank| bank.release_placeholder(item_id))
}

#[spacetimedb::reducer]
pub fn deposit_bank_item(ctx: &ReducerContext, item_id: u64, quantity: u32, tab: u32) -> Result<(), String> {
    with_bank(ctx, |bank| {
        let options = AddItemOptions { log_lost: true, tab, ignore_space: false };
        if bank.add_item(item_id, quantity, options)? == AddOutcome::Rejected {
            log::info!("[BankTables] Deposit of item {} refused for {:?}.", item_id, ctx.sender);
        }
        Ok(())
    })
}

#[spacetimedb::reducer]
pub fn sell_bank_tab(ctx: &ReducerContext, tab: u32) -> Result<(), String> {
    with_bank(ctx, |bank| bank.sell_tab(tab).map(|_| ()))
}

#[spacetimedb::reducer]
pub fn sell_selected_bank_items(ctx: &ReducerContext) -> Result<(), String> {
    with_bank(ctx, |bank| bank.sell_selected().map(|_| ()))
}

#[spacetimedb::reducer]
pub fn select_bank_item(ctx: &ReducerContext, item_id: u64) -> Result<(), String> {
    with_bank(ctx, |bank| bank.perform_action(ItemAction::DoubleClick, item_id))
}

#[spacetimedb::reducer]
pub fn use_bank_item(ctx: &ReducerContext, item_id: u64, action: String, quantity: u32) -> Result<(), String> {
    let action = ItemAction::from_name(&action, quantity)
        .ok_or_else(|| format!("Unknown bank action: {}", action))?;
    with_bank(ctx, |bank| bank.perform_action(action, item_id))
}

#[spacetimedb::reducer]
pub fn lock_bank_item(ctx: &ReducerContext, item_id: u64, locked: bool) -> Result<(), String> {
    with_bank(ctx, |bank| bank.set_locked(item_id, locked))
}

#[spacetimedb::reducer]
pub fn top_up_bank_items(ctx: &ReducerContext, quantity: u32) -> Result<(), String> {
    with_bank(ctx, |bank| {
        bank.add_quantity_to_existing_items(quantity);
        Ok(())
    })
}

#[spacetimedb::reducer]
pub fn check_bank_clue_chasers(ctx: &ReducerContext) -> Result<(), String> {
    with_bank(ctx, |bank| {
        if bank.check_for_clue_chasers() {
            log::info!("[BankTables] {:?} completed the clue chaser sequence.", ctx.sender);
        }
        Ok(())
    })
}

#[spacetimedb::reducer]
pub fn set_bank_item_charges(ctx: &ReducerContext, item_id: u64, charges: u32) -> Result<(), String> {
    with_bank(ctx, |bank| bank.set_item_charges(item_id, charges))
}

/// Creates or replaces the bank facts of an item kind.
#[spacetimedb::reducer]
pub fn define_bank_item(
    ctx: &ReducerContext,
    item_id: u64,
    name: String,
    sale_price: u64,
    clue_chaser_slot: Option<u32>,
) -> Result<(), String> {
    if let Some(slot) = clue_chaser_slot {
        if slot as usize >= CLUE_CHASER_SLOTS {
            return Err(format!("Clue chaser slot {} is outside the first {} slots.", slot, CLUE_CHASER_SLOTS));
        }
    }
    let definitions = ctx.db.bank_item_definition();
    let definition = BankItemDefinition { item_id, name, sale_price, clue_chaser_slot };
    if definitions.item_id().find(&item_id).is_some() {
        definitions.item_id().update(definition);
    } else {
        definitions.insert(definition);
    }
    log::info!("[BankTables] Defined bank item {} (price {}, clue slot {:?}).", item_id, sale_price, clue_chaser_slot);
    Ok(())
}

#[spacetimedb::reducer]
pub fn set_bank_settings(ctx: &ReducerContext, only_locked: bool, use_slots: bool) -> Result<(), String> {
    let settings = BankSettings { owner_id: ctx.sender, only_locked, use_slots };
    let table = ctx.db.bank_settings();
    if table.owner_id().find(&ctx.sender).is_some() {
        table.owner_id().update(settings);
    } else {
        table.insert(settings);
    }
    log::info!("[BankTables] Settings for {:?}: only_locked={}, use_slots={}", ctx.sender, only_locked, use_slots);
    Ok(())
}

#[spacetimedb::reducer]
pub fn set_bank_tab_disabled(ctx: &ReducerContext, tab: u32, disabled: bool) -> Result<(), String> {
    if tab >= MAX_TABS {
        return Err(format!("Bank tab {} does not exist.", tab));
    }
    let owner = ctx.sender;
    let mut storage = load_storage(ctx, owner);
    let mut tabs = load_disabled_tabs(ctx, owner);
    if disabled {
        tabs.insert(tab);
    } else {
        tabs.remove(tab);
    }
    storage.set_item(DISABLED_TABS_KEY, tabs.to_json()?);
    save_storage(ctx, owner, &storage);
    Ok(())
}
