// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::ids::EntityId;

/// Ids picked for a bulk action. Nothing ties them to the visible page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<EntityId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the id is selected afterwards.
    pub fn toggle(&mut self, id: EntityId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn insert(&mut self, id: EntityId) -> bool {
        self.ids.insert(id)
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        self.ids.remove(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ascending order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ids.iter().copied()
    }

    /// Drops ids that are not among `visible`; returns how many were dropped.
    pub fn retain_visible<I>(&mut self, visible: I) -> usize
    where
        I: IntoIterator<Item = EntityId>,
    {
        let visible: BTreeSet<EntityId> = visible.into_iter().collect();
        let before = self.ids.len();
        self.ids.retain(|id| visible.contains(id));
        before - self.ids.len()
    }
}

impl FromIterator<EntityId> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = EntityId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SelectionSet;
    use crate::EntityId;

    #[test]
    fn toggle_flips_membership() {
        let mut selection = SelectionSet::new();
        assert!(selection.toggle(EntityId::new(4)));
        assert!(selection.contains(EntityId::new(4)));
        assert!(!selection.toggle(EntityId::new(4)));
        assert!(selection.is_empty());
    }

    #[test]
    fn iteration_is_ascending() {
        let selection: SelectionSet = [9, 2, 5].into_iter().map(EntityId::new).collect();
        let ids: Vec<i64> = selection.iter().map(EntityId::get).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn retain_visible_drops_ids_missing_from_page() {
        let mut selection: SelectionSet = [1, 2, 3].into_iter().map(EntityId::new).collect();
        let dropped = selection.retain_visible([EntityId::new(2), EntityId::new(8)]);
        assert_eq!(dropped, 2);
        assert_eq!(selection.len(), 1);
        assert!(selection.contains(EntityId::new(2)));
    }
}
