// Bank placeholders: keeps an emptied bank slot at its tab and position as a
// zero-quantity entry, and keeps the rest of the bank honest about it.

mod models;
mod settings; // Policy flags read by name
mod collaborators; // Notifier, selection view, empty-item registry
mod session; // Disabled tabs surviving the load-time storage wipe
mod bank; // In-memory bank and the plain host engine
mod bank_operations; // Host surface wrapped by PlaceholderBank
mod metadata; // Capture phase of a removal
mod reconciler; // Reconcile phase of a removal
mod repair; // Load-time duplicate repair
mod slots; // Slot accounting
mod action_guard; // Placeholder-aware actions, sales and adds
mod placeholder_bank;

// Tables and reducers only exist inside the SpacetimeDB wasm module.
#[cfg(target_arch = "wasm32")]
mod bank_tables;

#[cfg(test)]
mod test_support;

pub use action_guard::{action_target, ActionTarget};
pub use bank::{BankState, HostBank, CLUE_CHASER_SLOTS, DEFAULT_MAX_SLOTS, MAX_TABS};
pub use bank_operations::{AddItemOptions, BankOperations};
pub use collaborators::{ItemRegistry, LogNotifier, NoEmptyItems, NoSelection, Notifier, SelectionView};
pub use metadata::{capture_before_removal, MetadataCache, RemovalRequest};
pub use models::{AddOutcome, BankItem, ItemAction, ItemId, ItemMetadata, Notification, Removal, TabIndex};
pub use placeholder_bank::PlaceholderBank;
pub use reconciler::{reconcile_after_removal, ReconcileContext, Reconciliation};
pub use repair::{repair_bank, RepairReport};
pub use session::{restore_disabled_tabs, CharacterStorage, DisabledTabs, MemoryStorage, DISABLED_TABS_KEY};
pub use settings::{PolicySettings, SettingsSource, ONLY_LOCKED_KEY, USE_SLOTS_KEY};
pub use slots::{occupied_slots, will_items_fit};

// --- Lifecycle Reducers ---

// Called once when the module is published or updated
#[cfg(target_arch = "wasm32")]
#[spacetimedb::reducer(init)]
pub fn init_module(_ctx: &spacetimedb::ReducerContext) -> Result<(), String> {
    log::info!("Bank placeholder module initialized.");
    Ok(())
}

// A connecting client gets its bank loaded the same way a character load does
#[cfg(target_arch = "wasm32")]
#[spacetimedb::reducer(client_connected)]
pub fn identity_connected(ctx: &spacetimedb::ReducerContext) -> Result<(), String> {
    crate::bank_tables::load_bank_for(ctx, ctx.sender)
}
