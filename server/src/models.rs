use serde::{Serialize, Deserialize};
use std::fmt;

/// Stable identity of an item definition. Two bank entries never share one.
pub type ItemId = u64;

/// Index of a bank tab.
pub type TabIndex = u32;

/// One occupied (or placeholder) slot of the bank.
/// A `quantity` of zero marks a placeholder; there is no separate placeholder type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BankItem {
    pub item_id: ItemId,
    pub quantity: u32,
    pub tab: TabIndex,
    pub tab_position: u32,
    pub locked: bool,
}

impl BankItem {
    pub fn new(item_id: ItemId, quantity: u32, tab: TabIndex, tab_position: u32) -> Self {
        BankItem { item_id, quantity, tab, tab_position, locked: false }
    }

    /// Zero-quantity entry preserving a slot.
    pub fn placeholder(item_id: ItemId, tab: TabIndex, tab_position: u32, locked: bool) -> Self {
        BankItem { item_id, quantity: 0, tab, tab_position, locked }
    }

    pub fn is_placeholder(&self) -> bool {
        self.quantity == 0
    }
}

/// How much of an item a removal asks for.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Removal {
    Quantity(u32),
    /// Reserved sentinel: remove the entry outright, whatever it holds.
    Everything,
}

/// Last-known bank position of an item whose removal is in flight.
/// Lives only between the capture and reconcile phases of one removal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemMetadata {
    pub tab: TabIndex,
    pub tab_position: u32,
    pub locked: bool,
    pub is_placeholder: bool,
}

/// Player actions that are only defined on items actually held.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ItemAction {
    DoubleClick,
    Sell { quantity: u32 },
    Bury,
    Open,
    Claim,
    UseEight,
    Read,
}

impl ItemAction {
    /// Parses the action names used by clients of the module.
    pub fn from_name(name: &str, quantity: u32) -> Option<Self> {
        match name {
            "double_click" => Some(ItemAction::DoubleClick),
            "sell" => Some(ItemAction::Sell { quantity }),
            "bury" => Some(ItemAction::Bury),
            "open" => Some(ItemAction::Open),
            "claim" => Some(ItemAction::Claim),
            "use_eight" => Some(ItemAction::UseEight),
            "read" => Some(ItemAction::Read),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ItemAction::DoubleClick => "double_click",
            ItemAction::Sell { .. } => "sell",
            ItemAction::Bury => "bury",
            ItemAction::Open => "open",
            ItemAction::Claim => "claim",
            ItemAction::UseEight => "use_eight",
            ItemAction::Read => "read",
        }
    }
}

impl fmt::Display for ItemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fire-and-forget messages for the player.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// An action needing a real holding was aimed at a placeholder.
    PlaceholderAction { item: ItemId, action: ItemAction },
    BankFull { item: ItemId },
    ItemContents { item: ItemId },
    PlaceholderReleased { item: ItemId },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::PlaceholderAction { item, action } => {
                write!(f, "Cannot {} item {}: only a placeholder is held.", action, item)
            }
            Notification::BankFull { item } => write!(f, "Bank is full, item {} could not be added.", item),
            Notification::ItemContents { item } => write!(f, "Showing contents of item {}.", item),
            Notification::PlaceholderReleased { item } => write!(f, "Placeholder for item {} released.", item),
        }
    }
}

/// Result of an add request that went through the placeholder guard.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Rejected,
}
