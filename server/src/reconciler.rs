/******************************************************************************
 *                                                                            *
 * Reconcile phase of a bank removal. Runs after the host mutated storage,    *
 * consumes the metadata captured before the mutation, and decides whether    *
 * the emptied item comes back as a zero-quantity placeholder in its old      *
 * slot.                                                                      *
 *                                                                            *
 ******************************************************************************/

use log;

use crate::bank::BankState;
use crate::collaborators::{ItemRegistry, SelectionView};
use crate::metadata::MetadataCache;
use crate::models::{BankItem, ItemId};
use crate::session::DisabledTabs;
use crate::settings::PolicySettings;

/// What the reconcile phase did with a removal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    /// The removal only decremented quantity.
    StillHeld,
    EmptyItemReleased,
    /// Nothing was captured for an item that left the bank.
    NotCaptured,
    /// A placeholder was deliberately released; its slot is gone.
    PlaceholderReleased,
    RejectedUnlocked,
    RejectedDisabledTab,
    InvalidPosition,
    Recreated,
}

/// Everything the reconcile phase reads or touches besides the bank itself.
pub struct ReconcileContext<'a, R: ItemRegistry, V: SelectionView> {
    pub policy: PolicySettings,
    pub disabled_tabs: &'a DisabledTabs,
    pub registry: &'a mut R,
    pub selection: &'a mut V,
}

pub fn reconcile_after_removal<R: ItemRegistry, V: SelectionView>(
    state: &mut BankState,
    cache: &mut MetadataCache,
    item: ItemId,
    ctx: ReconcileContext<'_, R, V>,
) -> Reconciliation {
    let metadata = cache.take(item);

    if state.items.contains_key(&item) {
        return Reconciliation::StillHeld;
    }

    if ctx.registry.is_empty_item(item) {
        ctx.registry.release_empty_item(state, item);
        log::debug!("[BankReconcile] Empty item {} handed back to its registry.", item);
        return Reconciliation::EmptyItemReleased;
    }

    let Some(metadata) = metadata else {
        log::warn!("[BankReconcile] Item {} left the bank without captured metadata. Skipping placeholder.", item);
        return Reconciliation::NotCaptured;
    };

    if metadata.is_placeholder {
        log::debug!("[BankReconcile] Placeholder {} released from tab {}.", item, metadata.tab);
        return Reconciliation::PlaceholderReleased;
    }

    // --- Recreation policy, in order ---
    if ctx.policy.only_locked && !metadata.locked {
        log::debug!("[BankReconcile] Item {} is unlocked and only locked items keep a placeholder.", item);
        return Reconciliation::RejectedUnlocked;
    }
    if ctx.disabled_tabs.contains(metadata.tab) {
        log::debug!("[BankReconcile] Placeholders are disabled for tab {}. Item {} not kept.", metadata.tab, item);
        return Reconciliation::RejectedDisabledTab;
    }

    let position = metadata.tab_position as usize;
    if position > state.tab(metadata.tab).len() {
        log::warn!(
            "[BankReconcile] Captured slot {} for item {} is past the end of tab {} ({} entries).",
            position, item, metadata.tab, state.tab(metadata.tab).len()
        );
        return Reconciliation::InvalidPosition;
    }

    // --- Recreate ---
    let placeholder = BankItem::placeholder(item, metadata.tab, metadata.tab_position, metadata.locked);
    state.items.insert(item, placeholder);
    state.tab_mut(metadata.tab).insert(position, item);
    state.reposition_tab(metadata.tab, 0);
    state.mark_dirty(item);

    if ctx.selection.focused_item() == Some(item) {
        if let Some(bank_item) = state.item(item) {
            ctx.selection.refresh(bank_item);
        }
    }

    log::info!("[BankReconcile] Kept placeholder for item {} at tab {} slot {}.", item, metadata.tab, position);
    Reconciliation::Recreated
}
