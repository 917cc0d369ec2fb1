/******************************************************************************
 *                                                                            *
 * Guards the bank actions that only make sense on items actually held.      *
 * A placeholder-targeted action is swapped for a notification; an action on  *
 * an item that is not in the bank at all falls through to the host so its   *
 * own error is returned untouched. Also keeps placeholders out of sales,     *
 * bulk top-ups, the clue chaser check, and capacity-exhausted adds.          *
 *                                                                            *
 ******************************************************************************/

use log;

use crate::bank::{BankState, CLUE_CHASER_SLOTS};
use crate::bank_operations::{AddItemOptions, BankOperations};
use crate::collaborators::{ItemRegistry, Notifier, SelectionView};
use crate::models::{AddOutcome, BankItem, ItemAction, ItemId, Notification, Removal, TabIndex};
use crate::placeholder_bank::PlaceholderBank;

/// How the bank holds the target of an action.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActionTarget {
    Held,
    Placeholder,
    Missing,
}

pub fn action_target(state: &BankState, item: ItemId) -> ActionTarget {
    match state.item(item) {
        Some(bank_item) if bank_item.is_placeholder() => ActionTarget::Placeholder,
        Some(_) => ActionTarget::Held,
        None => ActionTarget::Missing,
    }
}

impl<B, N, V, R> PlaceholderBank<B, N, V, R>
where
    B: BankOperations,
    N: Notifier,
    V: SelectionView,
    R: ItemRegistry,
{
    /// True only for a positive holding.
    pub fn has_item(&self, item: ItemId) -> bool {
        self.inner.state().item(item).map_or(false, |b| b.quantity > 0)
    }

    /// Runs a player action on an item. Units the action consumes are removed
    /// through the placeholder-aware removal path.
    pub fn perform_action(&mut self, action: ItemAction, item: ItemId) -> Result<(), String> {
        if action_target(self.inner.state(), item) == ActionTarget::Placeholder {
            self.substitute_action(action, item);
            return Ok(());
        }

        let consumed = self.inner.perform_action(action, item)?;
        if consumed > 0 {
            self.remove_item_quantity(item, Removal::Quantity(consumed), false)?;
        }
        Ok(())
    }

    fn substitute_action(&mut self, action: ItemAction, item: ItemId) {
        log::debug!("[BankGuard] Blocked {} on placeholder {}.", action, item);
        let notification = match action {
            ItemAction::Read if self.registry.has_readable_contents(item) => Notification::ItemContents { item },
            _ => Notification::PlaceholderAction { item, action },
        };
        self.notifier.notify(notification);
    }

    /// Sells every unlocked holding of a tab, last slot first, skipping placeholders.
    /// Returns how many entries were sold.
    pub fn sell_tab(&mut self, tab: TabIndex) -> Result<u32, String> {
        let ids: Vec<ItemId> = self.inner.state().tab(tab).to_vec();
        let mut sold = 0;
        for item in ids.into_iter().rev() {
            if self.sell_all(item, true)? {
                sold += 1;
            }
        }
        log::info!("[BankGuard] Sold {} item(s) from tab {}.", sold, tab);
        Ok(sold)
    }

    /// Sells the selected items in selection order, skipping placeholders.
    /// Locked selections reach the host, which refuses them.
    pub fn sell_selected(&mut self) -> Result<u32, String> {
        let ids = self.inner.state().selected_items.clone();
        let mut sold = 0;
        for item in ids {
            if self.sell_all(item, false)? {
                sold += 1;
            }
        }
        Ok(sold)
    }

    fn sell_all(&mut self, item: ItemId, skip_locked: bool) -> Result<bool, String> {
        let quantity = match self.inner.state().item(item) {
            Some(bank_item) if bank_item.quantity > 0 && !(skip_locked && bank_item.locked) => bank_item.quantity,
            _ => return Ok(false),
        };
        self.perform_action(ItemAction::Sell { quantity }, item)?;
        Ok(true)
    }

    /// Tops up every positive holding. Placeholders stay placeholders.
    pub fn add_quantity_to_existing_items(&mut self, quantity: u32) {
        if quantity == 0 {
            return;
        }
        self.inner.add_quantity_to_existing_items(quantity, &|b: &BankItem| !b.is_placeholder());
    }

    /// The host check only runs when the leading slots of the first tab hold no placeholder.
    pub fn check_for_clue_chasers(&mut self) -> bool {
        let state = self.inner.state();
        let has_placeholder = state
            .tab(0)
            .iter()
            .take(CLUE_CHASER_SLOTS)
            .any(|id| state.item(*id).map_or(false, |b| b.is_placeholder()));
        if has_placeholder {
            return false;
        }
        self.inner.check_for_clue_chasers()
    }

    /// Adds an item, measuring capacity with the placeholder-aware slot count.
    /// Refuses to turn a placeholder into a holding when that would overfill the bank.
    pub fn add_item(&mut self, item: ItemId, quantity: u32, options: AddItemOptions) -> Result<AddOutcome, String> {
        let full = self.occupied_slots() >= self.inner.state().max_slots;
        let rejected = match action_target(self.inner.state(), item) {
            ActionTarget::Placeholder => full && !self.policy.use_slots,
            ActionTarget::Held => false,
            ActionTarget::Missing => full,
        };

        if rejected {
            log::info!("[BankGuard] Bank full, refused {} of item {}.", quantity, item);
            self.notifier.notify(Notification::BankFull { item });
            if options.log_lost {
                let lost = self.inner.state_mut().lost_items.entry(item).or_insert(0);
                *lost = lost.saturating_add(quantity);
            }
            return Ok(AddOutcome::Rejected);
        }

        let added = self.inner.add_item(item, quantity, AddItemOptions { ignore_space: true, ..options })?;
        Ok(if added { AddOutcome::Added } else { AddOutcome::Rejected })
    }
}
