// server/src/metadata.rs
//
// Capture phase of a bank removal. Runs before the host mutates storage and
// records where the item sat, so the reconcile phase can put a placeholder back.

use std::collections::HashMap;
use log;

use crate::bank::BankState;
use crate::models::{ItemId, ItemMetadata, Removal};

/// In-flight removal metadata, keyed by item. Entries are consumed on read.
#[derive(Clone, Debug, Default)]
pub struct MetadataCache {
    entries: HashMap<ItemId, ItemMetadata>,
}

impl MetadataCache {
    /// Stores metadata for an item, replacing anything left over for it.
    pub fn record(&mut self, item: ItemId, metadata: ItemMetadata) {
        self.entries.insert(item, metadata);
    }

    /// Removes and returns the metadata for an item.
    pub fn take(&mut self, item: ItemId) -> Option<ItemMetadata> {
        self.entries.remove(&item)
    }

    /// Drops leftover metadata for an item, e.g. from a removal whose host mutation failed.
    pub fn discard(&mut self, item: ItemId) {
        if self.entries.remove(&item).is_some() {
            log::warn!("[BankCapture] Discarded stale metadata for item {}.", item);
        }
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.entries.contains_key(&item)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The removal request as it should reach the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RemovalRequest {
    pub removal: Removal,
    pub remove_charges: bool,
}

/// Records metadata when a removal will empty an entry, and rewrites the
/// release of a placeholder into a one-unit removal with charges.
pub fn capture_before_removal(
    state: &BankState,
    cache: &mut MetadataCache,
    item: ItemId,
    removal: Removal,
    remove_charges: bool,
) -> RemovalRequest {
    cache.discard(item);
    let request = RemovalRequest { removal, remove_charges };

    let Some(bank_item) = state.item(item) else {
        return request;
    };

    let metadata = |is_placeholder| ItemMetadata {
        tab: bank_item.tab,
        tab_position: bank_item.tab_position,
        locked: bank_item.locked,
        is_placeholder,
    };

    match removal {
        Removal::Everything if bank_item.is_placeholder() => {
            cache.record(item, metadata(true));
            log::debug!("[BankCapture] Releasing placeholder {} at tab {} slot {}.", item, bank_item.tab, bank_item.tab_position);
            RemovalRequest { removal: Removal::Quantity(1), remove_charges: true }
        }
        Removal::Quantity(quantity) if !bank_item.is_placeholder() && bank_item.quantity <= quantity => {
            cache.record(item, metadata(false));
            log::debug!("[BankCapture] Item {} will be emptied from tab {} slot {}.", item, bank_item.tab, bank_item.tab_position);
            request
        }
        Removal::Everything if !bank_item.is_placeholder() => {
            cache.record(item, metadata(false));
            log::debug!("[BankCapture] Item {} will be emptied from tab {} slot {}.", item, bank_item.tab, bank_item.tab_position);
            request
        }
        _ => request,
    }
}
