// server/src/repair.rs
//
// Load-time consistency pass over the tab sequences. The host can hand back a
// bank where one item shows up in several tabs; the first occurrence (tab
// order, then slot order) wins and later ones are dropped bank-wide.

use std::collections::HashSet;
use log;

use crate::bank::BankState;
use crate::models::{ItemId, TabIndex};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Later occurrences of an item already seen in an earlier slot.
    pub duplicates_removed: usize,
    /// Tab entries with no item mapping behind them.
    pub orphans_dropped: usize,
    /// Mapped items missing from every tab, appended back to their tab.
    pub unplaced_restored: usize,
    /// Entries whose recorded tab or position disagreed with their slot.
    pub misplaced: usize,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        *self == RepairReport::default()
    }
}

pub fn repair_bank(state: &mut BankState) -> RepairReport {
    let mut report = RepairReport::default();
    let mut seen: HashSet<ItemId> = HashSet::new();
    let mut tabs: Vec<Vec<ItemId>> = Vec::with_capacity(state.tabs.len());

    for (tab, ids) in state.tabs.iter().enumerate() {
        let mut kept = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(bank_item) = state.items.get(id) else {
                log::warn!("[BankRepair] Dropped unmapped item {} from tab {}.", id, tab);
                report.orphans_dropped += 1;
                continue;
            };
            if !seen.insert(*id) {
                log::warn!("[BankRepair] Dropped duplicate of item {} from tab {}.", id, tab);
                report.duplicates_removed += 1;
                continue;
            }
            if bank_item.tab as usize != tab || bank_item.tab_position as usize != kept.len() {
                report.misplaced += 1;
            }
            kept.push(*id);
        }
        tabs.push(kept);
    }

    let mut unplaced: Vec<ItemId> = state.items.keys().filter(|id| !seen.contains(*id)).copied().collect();
    unplaced.sort_unstable();
    for id in unplaced {
        let recorded = state.items.get(&id).map_or(0, |b| b.tab) as usize;
        // Tabs are never created here; an unknown tab falls back to the first.
        let tab = if recorded < tabs.len() { recorded } else { 0 };
        if tabs.is_empty() {
            tabs.push(Vec::new());
        }
        log::warn!("[BankRepair] Item {} was in no tab; appended to tab {}.", id, tab);
        tabs[tab].push(id);
        report.unplaced_restored += 1;
    }

    if report.is_clean() {
        return report;
    }

    state.tabs = tabs;
    for tab in 0..state.tabs.len() {
        state.reposition_tab(tab as TabIndex, 0);
    }
    let ids: Vec<ItemId> = state.items.keys().copied().collect();
    for id in ids {
        state.mark_dirty(id);
    }
    log::info!("[BankRepair] Rebuilt {} tab(s): {:?}", state.tabs.len(), report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assert_contiguous, bank_with};
    use pretty_assertions::assert_eq;

    #[test]
    fn later_duplicate_across_tabs_is_dropped() {
        let mut bank = bank_with(&[&[(1, 2, false), (2, 1, false)], &[(3, 1, false)]], 10);
        bank.state.tabs[1].push(1);

        let report = repair_bank(&mut bank.state);

        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(bank.state.tab(0), &[1, 2]);
        assert_eq!(bank.state.tab(1), &[3]);
        assert_contiguous(&bank.state);
        assert_eq!(bank.state.render_queue.len(), 3);
    }

    #[test]
    fn kept_occurrence_becomes_the_recorded_slot() {
        let mut bank = bank_with(&[&[(1, 2, false)], &[(2, 1, false), (3, 1, false)]], 10);
        // Item 3 recorded in tab 1 but also occupying the head of tab 0.
        bank.state.tabs[0].insert(0, 3);

        repair_bank(&mut bank.state);

        assert_eq!(bank.state.tab(0), &[3, 1]);
        assert_eq!(bank.state.tab(1), &[2]);
        assert_eq!((bank.state.item(3).unwrap().tab, bank.state.item(3).unwrap().tab_position), (0, 0));
        assert_contiguous(&bank.state);
    }

    #[test]
    fn duplicates_within_one_tab_are_dropped() {
        let mut bank = bank_with(&[&[(1, 2, false), (2, 1, false)]], 10);
        bank.state.tabs[0].push(1);
        bank.state.tabs[0].push(2);

        let report = repair_bank(&mut bank.state);

        assert_eq!(report.duplicates_removed, 2);
        assert_eq!(bank.state.tab(0), &[1, 2]);
    }

    #[test]
    fn orphans_and_unplaced_entries_are_fixed() {
        let mut bank = bank_with(&[&[(1, 2, false), (2, 1, false)], &[(3, 1, false)]], 10);
        bank.state.tabs[0].push(77);
        bank.state.tabs[1].clear();

        let report = repair_bank(&mut bank.state);

        assert_eq!(report.orphans_dropped, 1);
        assert_eq!(report.unplaced_restored, 1);
        assert_eq!(bank.state.tab(1), &[3]);
        assert_contiguous(&bank.state);
    }

    #[test]
    fn unplaced_entry_with_unknown_tab_goes_to_the_first_tab() {
        let mut bank = bank_with(&[&[(1, 2, false)], &[(2, 1, false)]], 10);
        bank.state.tabs[1].clear();
        bank.state.items.get_mut(&2).unwrap().tab = u32::MAX;

        let report = repair_bank(&mut bank.state);

        assert_eq!(report.unplaced_restored, 1);
        assert_eq!(bank.state.tabs.len(), 2);
        assert_eq!(bank.state.tab(0), &[1, 2]);
        assert_contiguous(&bank.state);
    }

    #[test]
    fn unplaced_entry_in_a_bank_without_tabs_lands_in_tab_zero() {
        let mut bank = bank_with(&[&[(4, 1, false)]], 10);
        bank.state.tabs.clear();

        repair_bank(&mut bank.state);

        assert_eq!(bank.state.tab(0), &[4]);
        assert_contiguous(&bank.state);
    }

    #[test]
    fn clean_bank_is_untouched() {
        let mut bank = bank_with(&[&[(1, 2, false), (2, 0, false)]], 10);
        let before = bank.state.clone();

        assert!(repair_bank(&mut bank.state).is_clean());
        assert_eq!(bank.state, before);
    }
}
