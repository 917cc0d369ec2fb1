// server/src/collaborators.rs
//
// Interfaces for the services placeholder handling consumes but does not own:
// player notifications, the selected-item view, and the empty-item subsystem.

use log;

use crate::bank::BankState;
use crate::models::{BankItem, ItemId, Notification};

/// Fire-and-forget channel to the player.
pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

/// Collects notifications for later delivery.
impl Notifier for Vec<Notification> {
    fn notify(&mut self, notification: Notification) {
        self.push(notification);
    }
}

/// Writes notifications to the log and drops them.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, notification: Notification) {
        log::info!("[BankNotify] {}", notification);
    }
}

/// The UI panel showing one focused bank item.
pub trait SelectionView {
    fn focused_item(&self) -> Option<ItemId>;
    fn refresh(&mut self, bank_item: &BankItem);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoSelection;

impl SelectionView for NoSelection {
    fn focused_item(&self) -> Option<ItemId> {
        None
    }

    fn refresh(&mut self, _bank_item: &BankItem) {}
}

/// The empty-item subsystem: sentinel items that only pad a tab layout.
pub trait ItemRegistry {
    fn is_empty_item(&self, item: ItemId) -> bool;

    /// Cleans up after an empty item left the bank.
    fn release_empty_item(&mut self, state: &mut BankState, item: ItemId);

    /// Whether the item has contents that can be shown without holding it.
    fn has_readable_contents(&self, _item: ItemId) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoEmptyItems;

impl ItemRegistry for NoEmptyItems {
    fn is_empty_item(&self, _item: ItemId) -> bool {
        false
    }

    fn release_empty_item(&mut self, _state: &mut BankState, _item: ItemId) {}
}
