use log::debug;
use serde::{Deserialize, Serialize};

use super::config::StockSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockKind {
    Drink,
    Food,
    Hookah,
}

impl std::fmt::Display for StockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockKind::Drink => write!(f, "drink"),
            StockKind::Food => write!(f, "food"),
            StockKind::Hookah => write!(f, "hookah"),
        }
    }
}

/// Handle to the physical shelf slot an item was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    pub kind: StockKind,
    pub index: usize,
}

/// Fixed-capacity shelf of one kind of item.
///
/// Slots are issued from index 0 upwards and freed in LIFO order, so the
/// slots in `[0, issued)` are claimed and `count == capacity - issued`.
#[derive(Debug, Clone)]
pub struct StockLedger {
    kind: StockKind,
    capacity: u32,
    count: u32,
    issued: usize,
}

impl StockLedger {
    pub fn new(kind: StockKind, capacity: u32, initial: u32) -> Self {
        let count = initial.min(capacity);
        Self {
            kind,
            capacity,
            count,
            issued: (capacity - count) as usize,
        }
    }

    pub fn from_spec(kind: StockKind, spec: &StockSpec) -> Self {
        Self::new(kind, spec.capacity, spec.initial)
    }

    pub fn kind(&self) -> StockKind {
        self.kind
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of slots currently claimed
    pub fn issued_slots(&self) -> usize {
        self.issued
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn slot_unclaimed(&self) -> bool {
        self.issued < self.capacity as usize
    }

    /// Take one item unless the caller already holds one or the shelf is empty
    pub fn take(&mut self, already_holding: bool) -> Option<SlotHandle> {
        if already_holding {
            debug!("[Stock {}] Refused take: hands are full", self.kind);
            return None;
        }
        if self.count == 0 || !self.slot_unclaimed() {
            debug!("[Stock {}] Refused take: out of stock", self.kind);
            return None;
        }

        let handle = SlotHandle {
            kind: self.kind,
            index: self.issued,
        };
        self.issued += 1;
        self.count -= 1;
        Some(handle)
    }

    /// Put one item back, freeing the most recently issued slot
    pub fn give_back(&mut self) {
        if self.count < self.capacity {
            self.count += 1;
        }
        self.issued = self.issued.saturating_sub(1);
    }

    /// Refill up to `units` items, returns how many fit on the shelf
    pub fn restock(&mut self, units: u32) -> u32 {
        let added = units.min(self.capacity - self.count);
        self.count += added;
        self.issued = self.issued.saturating_sub(added as usize);
        added
    }

    /// Free space on the shelf
    pub fn missing(&self) -> u32 {
        self.capacity - self.count
    }
}
