//! Primary and overflow shelf storage. Pure data structures — no knowledge of the event bus or
//! of placement policy, which lives in [`crate::shelf_manager`].

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::error::ShelfError;
use crate::event::Temp;

/// A capacity-bounded set of order IDs for a single temperature.
pub struct PrimaryShelf {
    capacity: usize,
    orders: HashSet<Uuid>,
}

impl PrimaryShelf {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            orders: HashSet::with_capacity(capacity),
        }
    }

    pub fn has(&self, id: Uuid) -> bool {
        self.orders.contains(&id)
    }

    /// Idempotent: storing an already-present ID succeeds without changing occupancy.
    pub fn store(&mut self, id: Uuid) -> bool {
        if self.orders.contains(&id) {
            return true;
        }
        if self.orders.len() >= self.capacity {
            return false;
        }
        self.orders.insert(id);
        true
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        self.orders.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Shared storage across temperatures for orders that didn't fit on their primary shelf. Sized by
/// total occupancy across all configured temps, not per-temp.
pub struct OverflowShelf {
    capacity: usize,
    sections: HashMap<Temp, HashMap<Uuid, f64>>,
}

impl OverflowShelf {
    /// `temps` is the set of temperatures this overflow shelf will accept; an operation naming a
    /// temp outside that set fails with [`ShelfError::InvalidTemp`].
    pub fn new(capacity: usize, temps: &[Temp]) -> Self {
        let mut sections = HashMap::with_capacity(temps.len());
        for temp in temps {
            sections.insert(*temp, HashMap::new());
        }
        Self { capacity, sections }
    }

    fn section(&self, temp: Temp) -> Result<&HashMap<Uuid, f64>, ShelfError> {
        self.sections.get(&temp).ok_or(ShelfError::InvalidTemp(temp))
    }

    fn section_mut(&mut self, temp: Temp) -> Result<&mut HashMap<Uuid, f64>, ShelfError> {
        self.sections
            .get_mut(&temp)
            .ok_or(ShelfError::InvalidTemp(temp))
    }

    pub fn size(&self) -> usize {
        self.sections.values().map(|s| s.len()).sum()
    }

    /// Returns `Ok(true)` if stored (or already present), `Ok(false)` if the shelf is at overall
    /// capacity.
    pub fn store(&mut self, id: Uuid, temp: Temp, decay_rate: f64) -> Result<bool, ShelfError> {
        if self.sections.get(&temp).is_none() {
            return Err(ShelfError::InvalidTemp(temp));
        }
        if self.size() >= self.capacity {
            return Ok(false);
        }
        let section = self.section_mut(temp)?;
        section.entry(id).or_insert(decay_rate);
        Ok(true)
    }

    pub fn has(&self, id: Uuid, temp: Temp) -> Result<bool, ShelfError> {
        Ok(self.section(temp)?.contains_key(&id))
    }

    /// Fails with [`ShelfError::NotFound`] if `id` isn't in `temp`'s section, even if it's present
    /// under a different temp — cross-section removal isn't supported.
    pub fn remove(&mut self, id: Uuid, temp: Temp) -> Result<(), ShelfError> {
        let section = self.section_mut(temp)?;
        section.remove(&id).ok_or(ShelfError::NotFound).map(|_| ())
    }

    /// Removes and returns the ID with the maximum decay rate in `temp`'s section, or `None` if
    /// that section is empty. Ties pick whichever is encountered first during iteration.
    pub fn pop_max(&mut self, temp: Temp) -> Result<Option<Uuid>, ShelfError> {
        let section = self.section_mut(temp)?;
        let max_id = section
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(id, _)| *id);
        if let Some(id) = max_id {
            section.remove(&id);
        }
        Ok(max_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_store_is_idempotent() {
        let mut shelf = PrimaryShelf::new(2);
        let id = Uuid::new_v4();
        assert!(shelf.store(id));
        assert!(shelf.store(id));
        assert_eq!(shelf.len(), 1);
    }

    #[test]
    fn primary_store_fails_at_capacity() {
        let mut shelf = PrimaryShelf::new(1);
        assert!(shelf.store(Uuid::new_v4()));
        assert!(!shelf.store(Uuid::new_v4()));
    }

    #[test]
    fn primary_remove_reports_presence() {
        let mut shelf = PrimaryShelf::new(2);
        let id = Uuid::new_v4();
        assert!(!shelf.remove(id));
        shelf.store(id);
        assert!(shelf.remove(id));
        assert!(!shelf.has(id));
    }

    #[test]
    fn overflow_rejects_unconfigured_temp() {
        let mut shelf = OverflowShelf::new(5, &[Temp::Hot]);
        let err = shelf.store(Uuid::new_v4(), Temp::Cold, 1.0).unwrap_err();
        assert_eq!(err, ShelfError::InvalidTemp(Temp::Cold));
    }

    #[test]
    fn overflow_store_respects_total_capacity_across_temps() {
        let mut shelf = OverflowShelf::new(2, &[Temp::Hot, Temp::Cold]);
        assert!(shelf.store(Uuid::new_v4(), Temp::Hot, 1.0).unwrap());
        assert!(shelf.store(Uuid::new_v4(), Temp::Cold, 1.0).unwrap());
        assert!(!shelf.store(Uuid::new_v4(), Temp::Hot, 1.0).unwrap());
    }

    #[test]
    fn overflow_remove_is_section_scoped() {
        let mut shelf = OverflowShelf::new(5, &[Temp::Hot, Temp::Cold]);
        let id = Uuid::new_v4();
        shelf.store(id, Temp::Hot, 1.0).unwrap();
        let err = shelf.remove(id, Temp::Cold).unwrap_err();
        assert_eq!(err, ShelfError::NotFound);
        shelf.remove(id, Temp::Hot).unwrap();
        assert!(!shelf.has(id, Temp::Hot).unwrap());
    }

    #[test]
    fn pop_max_returns_highest_decay_rate() {
        let mut shelf = OverflowShelf::new(10, &[Temp::Hot]);
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let rates = [1.1, 1.6, 1.2, 1.7, 1.2];
        for (id, rate) in ids.iter().zip(rates) {
            shelf.store(*id, Temp::Hot, rate).unwrap();
        }
        let popped = shelf.pop_max(Temp::Hot).unwrap().unwrap();
        assert_eq!(popped, ids[3]);
        assert!(!shelf.has(ids[3], Temp::Hot).unwrap());
    }

    #[test]
    fn pop_max_on_empty_section_is_none() {
        let mut shelf = OverflowShelf::new(5, &[Temp::Hot]);
        assert_eq!(shelf.pop_max(Temp::Hot).unwrap(), None);
    }
}
