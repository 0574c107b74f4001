//! Index-addressed object table with idempotent removal.
//!
//! Resource managers hand out plain `u32` indices for the objects they create
//! and must tolerate the same index being released twice (teardown frees
//! everything, and a pass may already have released its own objects).
//! [`SlotTable`] gives exactly that contract: indices are never reused, and
//! [`remove`](SlotTable::remove) on an empty slot returns `None` instead of
//! panicking.
//!
//! ```
//! use gitech_core::slots::SlotTable;
//!
//! let mut table = SlotTable::new();
//! let a = table.insert("albedo");
//! let b = table.insert("normal");
//! assert_eq!(table.remove(a), Some("albedo"));
//! assert_eq!(table.remove(a), None);
//! assert_eq!(table.live(), 1);
//! assert_eq!(table.get(b), Some(&"normal"));
//! ```

/// A growable table of optional slots addressed by `u32` index.
#[derive(Debug, Clone)]
pub struct SlotTable<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> SlotTable<T> {
    /// Creates an empty table.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }

    /// Stores `value` in a fresh slot and returns its index.
    pub fn insert(&mut self, value: T) -> u32 {
        let index = self.slots.len() as u32;
        self.slots.push(Some(value));
        self.live += 1;
        index
    }

    /// Takes the value out of `index`, leaving the slot empty.
    ///
    /// Returns `None` if the slot was already empty or never existed.
    pub fn remove(&mut self, index: u32) -> Option<T> {
        let value = self.slots.get_mut(index as usize)?.take();
        if value.is_some() {
            self.live -= 1;
        }
        value
    }

    /// Returns the value at `index` if the slot is occupied.
    pub fn get(&self, index: u32) -> Option<&T> {
        self.slots.get(index as usize)?.as_ref()
    }

    /// Returns the value at `index` mutably if the slot is occupied.
    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.slots.get_mut(index as usize)?.as_mut()
    }

    /// Number of occupied slots.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Total number of slots ever handed out.
    pub fn capacity_used(&self) -> usize {
        self.slots.len()
    }

    /// Iterates occupied slots with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i as u32, v)))
    }

    /// Iterates occupied slots mutably with their indices.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|v| (i as u32, v)))
    }
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
