/******************************************************************************
 *                                                                            *
 * PlaceholderBank wraps any BankOperations implementor and layers the       *
 * placeholder behaviour over it. Every removal runs capture, then the host   *
 * mutation, then reconciliation, in that order. The action guard and slot    *
 * accounting add further methods to this type in their own modules.          *
 *                                                                            *
 ******************************************************************************/

use log;

use crate::bank::BankState;
use crate::bank_operations::BankOperations;
use crate::collaborators::{ItemRegistry, LogNotifier, NoEmptyItems, NoSelection, Notifier, SelectionView};
use crate::metadata::{capture_before_removal, MetadataCache};
use crate::models::{BankItem, ItemId, Notification, Removal, TabIndex};
use crate::reconciler::{reconcile_after_removal, ReconcileContext, Reconciliation};
use crate::repair::{repair_bank, RepairReport};
use crate::session::{restore_disabled_tabs, CharacterStorage, DisabledTabs};
use crate::settings::{PolicySettings, SettingsSource};

pub struct PlaceholderBank<B, N = LogNotifier, V = NoSelection, R = NoEmptyItems> {
    pub(crate) inner: B,
    pub(crate) metadata: MetadataCache,
    pub(crate) policy: PolicySettings,
    pub(crate) disabled_tabs: DisabledTabs,
    pub(crate) notifier: N,
    pub(crate) selection: V,
    pub(crate) registry: R,
}

impl<B: BankOperations> PlaceholderBank<B> {
    /// Wraps a bank with log-only notifications and no selection view or empty items.
    pub fn wrap(inner: B) -> Self {
        PlaceholderBank::new(inner, LogNotifier, NoSelection, NoEmptyItems)
    }
}

impl<B, N, V, R> PlaceholderBank<B, N, V, R>
where
    B: BankOperations,
    N: Notifier,
    V: SelectionView,
    R: ItemRegistry,
{
    pub fn new(inner: B, notifier: N, selection: V, registry: R) -> Self {
        PlaceholderBank {
            inner,
            metadata: MetadataCache::default(),
            policy: PolicySettings::default(),
            disabled_tabs: DisabledTabs::default(),
            notifier,
            selection,
            registry,
        }
    }

    pub fn with_policy(mut self, policy: PolicySettings) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_disabled_tabs(mut self, disabled_tabs: DisabledTabs) -> Self {
        self.disabled_tabs = disabled_tabs;
        self
    }

    // --- Accessors ---

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn into_inner(self) -> B {
        self.inner
    }

    pub fn state(&self) -> &BankState {
        self.inner.state()
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn selection(&self) -> &V {
        &self.selection
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn policy(&self) -> PolicySettings {
        self.policy
    }

    pub fn set_policy(&mut self, policy: PolicySettings) {
        self.policy = policy;
    }

    /// Re-reads the policy flags from a settings store.
    pub fn refresh_policy<S: SettingsSource + ?Sized>(&mut self, source: &S) {
        self.policy = PolicySettings::from_source(source);
    }

    pub fn disabled_tabs(&self) -> &DisabledTabs {
        &self.disabled_tabs
    }

    pub fn is_tab_disabled(&self, tab: TabIndex) -> bool {
        self.disabled_tabs.contains(tab)
    }

    // --- Session ---

    /// Character load: restore the disabled tabs across the storage wipe,
    /// then repair the bank's tab sequences.
    pub fn load_session<S: CharacterStorage + ?Sized>(&mut self, storage: &mut S) -> RepairReport {
        self.disabled_tabs = restore_disabled_tabs(storage);
        let report = repair_bank(self.inner.state_mut());
        if report.is_clean() {
            log::debug!("[BankSession] Bank passed the consistency check.");
        } else {
            log::warn!("[BankSession] Bank repaired on load: {:?}", report);
        }
        report
    }

    // --- Removal ---

    /// Removes quantity from an item, keeping a placeholder in its slot when
    /// the removal empties it and policy allows. A placeholder only leaves the
    /// bank through `Removal::Everything`.
    pub fn remove_item_quantity(
        &mut self,
        item: ItemId,
        removal: Removal,
        remove_charges: bool,
    ) -> Result<Reconciliation, String> {
        if let (Removal::Quantity(quantity), Some(bank_item)) = (removal, self.inner.state().item(item)) {
            if bank_item.is_placeholder() {
                log::debug!("[BankGuard] Refused to remove {} of placeholder {}.", quantity, item);
                return Err(format!("Item {} is a placeholder with nothing to remove.", item));
            }
        }
        let request = capture_before_removal(self.inner.state(), &mut self.metadata, item, removal, remove_charges);

        if let Err(e) = self.inner.remove_item_quantity(item, request.removal, request.remove_charges) {
            self.metadata.discard(item);
            return Err(e);
        }

        let ctx = ReconcileContext {
            policy: self.policy,
            disabled_tabs: &self.disabled_tabs,
            registry: &mut self.registry,
            selection: &mut self.selection,
        };
        Ok(reconcile_after_removal(self.inner.state_mut(), &mut self.metadata, item, ctx))
    }

    /// Deletes a placeholder for good, freeing its slot.
    pub fn release_placeholder(&mut self, item: ItemId) -> Result<(), String> {
        match self.inner.state().item(item) {
            None => return Err(format!("Item {} not found in bank.", item)),
            Some(bank_item) if !bank_item.is_placeholder() => {
                return Err(format!("Item {} still holds {} and is not a placeholder.", item, bank_item.quantity));
            }
            Some(_) => {}
        }
        self.remove_item_quantity(item, Removal::Everything, false)?;
        self.notifier.notify(Notification::PlaceholderReleased { item });
        Ok(())
    }

    /// Locks or unlocks an entry. Under `only_locked` this decides whether an
    /// emptied slot keeps its placeholder.
    pub fn set_locked(&mut self, item: ItemId, locked: bool) -> Result<(), String> {
        let state = self.inner.state_mut();
        let bank_item = state.items.get_mut(&item).ok_or_else(|| format!("Item {} not found in bank.", item))?;
        if bank_item.locked != locked {
            bank_item.locked = locked;
            state.mark_dirty(item);
            log::debug!("[BankGuard] Item {} locked={}", item, locked);
        }
        Ok(())
    }

    /// Records the charges left on a banked item. Zero clears them.
    pub fn set_item_charges(&mut self, item: ItemId, charges: u32) -> Result<(), String> {
        let state = self.inner.state_mut();
        if !state.items.contains_key(&item) {
            return Err(format!("Item {} not found in bank.", item));
        }
        if charges == 0 {
            state.item_charges.remove(&item);
        } else {
            state.item_charges.insert(item, charges);
        }
        Ok(())
    }

    /// Placeholders ordered by tab and slot.
    pub fn placeholders(&self) -> Vec<BankItem> {
        let mut placeholders: Vec<BankItem> = self.inner.state().placeholders().cloned().collect();
        placeholders.sort_by_key(|b| (b.tab, b.tab_position));
        placeholders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::HostBank;
    use crate::bank_operations::AddItemOptions;
    use crate::models::AddOutcome;
    use crate::session::{MemoryStorage, DISABLED_TABS_KEY};
    use crate::settings::{ONLY_LOCKED_KEY, USE_SLOTS_KEY};
    use crate::test_support::{assert_contiguous, bank_with, EmptyItems};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn placeholder_bank(host: HostBank) -> PlaceholderBank<HostBank, Vec<Notification>, NoSelection, EmptyItems> {
        PlaceholderBank::new(host, Vec::new(), NoSelection, EmptyItems::default())
    }

    #[test]
    fn slot_lifecycle_real_placeholder_real_released() {
        let mut bank = placeholder_bank(bank_with(&[&[(1, 3, false), (2, 4, false), (3, 1, false)]], 10));

        assert_eq!(bank.remove_item_quantity(2, Removal::Quantity(4), false), Ok(Reconciliation::Recreated));
        assert_eq!(bank.state().item(2), Some(&BankItem::placeholder(2, 0, 1, false)));

        assert_eq!(bank.add_item(2, 6, AddItemOptions::default()), Ok(AddOutcome::Added));
        assert_eq!(bank.state().item(2), Some(&BankItem::new(2, 6, 0, 1)));

        bank.remove_item_quantity(2, Removal::Quantity(6), false).unwrap();
        bank.release_placeholder(2).unwrap();

        assert!(bank.state().item(2).is_none());
        assert_eq!(bank.state().tab(0), &[1, 3]);
        assert_contiguous(bank.state());
        assert_eq!(bank.notifier(), &vec![Notification::PlaceholderReleased { item: 2 }]);
    }

    #[test]
    fn releasing_a_real_holding_is_refused() {
        let mut bank = placeholder_bank(bank_with(&[&[(1, 3, false)]], 10));
        assert!(bank.release_placeholder(1).is_err());
        assert!(bank.release_placeholder(5).is_err());
        assert_eq!(bank.state().item(1).unwrap().quantity, 3);
    }

    #[test]
    fn quantity_removal_never_drops_a_placeholder() {
        let mut bank = placeholder_bank(bank_with(&[&[(1, 3, false), (2, 0, false), (3, 1, false)]], 10));

        let err = bank.remove_item_quantity(2, Removal::Quantity(1), false).unwrap_err();

        assert_eq!(err, "Item 2 is a placeholder with nothing to remove.");
        assert_eq!(bank.state().item(2), Some(&BankItem::placeholder(2, 0, 1, false)));
        assert_eq!(bank.state().tab(0), &[1, 2, 3]);
        assert!(bank.metadata.is_empty());
        assert!(bank.notifier().is_empty());
    }

    #[test]
    fn failed_host_removal_leaves_no_metadata() {
        let mut bank = placeholder_bank(bank_with(&[&[(1, 3, false)]], 10));
        let err = bank.remove_item_quantity(4, Removal::Quantity(1), false).unwrap_err();
        assert!(err.contains("not in the bank"));
        assert!(bank.metadata.is_empty());
    }

    #[test]
    fn policy_follows_the_settings_store() {
        let mut bank = placeholder_bank(bank_with(&[&[(1, 3, false)]], 10));
        let mut settings = HashMap::new();
        settings.insert(ONLY_LOCKED_KEY.to_string(), true);
        settings.insert(USE_SLOTS_KEY.to_string(), false);
        bank.refresh_policy(&settings);

        assert_eq!(bank.remove_item_quantity(1, Removal::Quantity(3), false), Ok(Reconciliation::RejectedUnlocked));
        assert!(bank.state().items.is_empty());
    }

    #[test]
    fn load_session_restores_tabs_then_repairs() {
        let mut host = bank_with(&[&[(1, 3, false), (2, 1, false)], &[(3, 2, false)]], 10);
        host.state.tabs[1].insert(0, 1);
        let mut storage = MemoryStorage::default();
        storage.set_item(DISABLED_TABS_KEY, "[1]".to_string());
        storage.set_item("lastSeen", "yesterday".to_string());
        let mut bank = placeholder_bank(host);

        let report = bank.load_session(&mut storage);

        assert_eq!(report.duplicates_removed, 1);
        assert!(bank.is_tab_disabled(1));
        assert_eq!(storage.get_item("lastSeen"), None);
        assert_eq!(bank.state().tab(1), &[3]);
        assert_contiguous(bank.state());

        bank.remove_item_quantity(3, Removal::Everything, false).unwrap();
        assert!(bank.state().item(3).is_none());
    }

    #[test]
    fn locking_keeps_the_slot_under_only_locked() {
        let mut bank = placeholder_bank(bank_with(&[&[(1, 3, false), (2, 1, false)]], 10))
            .with_policy(PolicySettings { only_locked: true, use_slots: false });
        bank.set_locked(1, true).unwrap();

        assert_eq!(bank.remove_item_quantity(1, Removal::Everything, false), Ok(Reconciliation::Recreated));
        assert_eq!(bank.state().item(1), Some(&BankItem::placeholder(1, 0, 0, true)));
        assert!(bank.set_locked(9, true).is_err());
    }

    #[test]
    fn releasing_a_placeholder_clears_its_charges() {
        let mut bank = placeholder_bank(bank_with(&[&[(1, 1, false), (2, 2, false)]], 10));
        bank.set_item_charges(1, 4).unwrap();
        assert!(bank.set_item_charges(9, 4).is_err());

        bank.remove_item_quantity(1, Removal::Quantity(1), false).unwrap();
        assert_eq!(bank.state().item_charges.get(&1), Some(&4));

        bank.release_placeholder(1).unwrap();
        assert!(bank.state().item_charges.is_empty());
    }

    #[test]
    fn placeholders_are_listed_in_slot_order() {
        let bank = placeholder_bank(bank_with(&[&[(1, 0, false), (2, 3, false)], &[(3, 0, true), (4, 0, false)]], 10));
        let ids: Vec<ItemId> = bank.placeholders().iter().map(|b| b.item_id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }
}
