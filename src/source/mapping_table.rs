use super::state::StateVector;

/// Action sets that apply in one state, keyed by event id, plus the tables
/// of the more general states above it.
///
/// Entries are indices into the source's [`super::ActionSetCollection`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActionMappingTable {
    state: StateVector,
    entries: Vec<(u32, usize)>,
    parents: Vec<ActionMappingTable>,
}

impl ActionMappingTable {
    pub fn new(state: StateVector) -> Self {
        Self {
            state,
            entries: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn state(&self) -> &StateVector {
        &self.state
    }

    pub fn set_actions(&mut self, id: u32, set_index: usize) {
        match self.entries.iter_mut().find(|(key, _)| *key == id) {
            Some(entry) => entry.1 = set_index,
            None => self.entries.push((id, set_index)),
        }
    }

    pub fn contains_id(&self, id: u32) -> bool {
        self.entries.iter().any(|(key, _)| *key == id)
    }

    pub fn add_parent_table(&mut self, table: ActionMappingTable) {
        self.parents.push(table);
    }

    pub fn parents(&self) -> &[ActionMappingTable] {
        &self.parents
    }

    /// Set indices of this table's own entries, in insertion order
    pub fn set_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|(_, index)| *index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Own entry first. With defaults, the direct parents are searched one
    /// level deep before any of them is searched recursively.
    pub fn get_actions(&self, id: u32, include_defaults: bool) -> Option<usize> {
        if let Some((_, index)) = self.entries.iter().find(|(key, _)| *key == id) {
            return Some(*index);
        }
        if !include_defaults {
            return None;
        }
        self.parents
            .iter()
            .find_map(|parent| parent.get_actions(id, false))
            .or_else(|| {
                self.parents
                    .iter()
                    .find_map(|parent| parent.get_actions(id, true))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_entry_overrides_parent() {
        let mut parent = ActionMappingTable::new(StateVector::new(1, -1, -1));
        parent.set_actions(10, 0);
        parent.set_actions(11, 1);

        let mut table = ActionMappingTable::new(StateVector::new(1, 1, -1));
        table.set_actions(10, 2);
        table.add_parent_table(parent);

        assert_eq!(table.get_actions(10, true), Some(2));
        assert_eq!(table.get_actions(11, true), Some(1));
        assert_eq!(table.get_actions(11, false), None);
        assert_eq!(table.get_actions(12, true), None);
    }

    #[test]
    fn test_nearest_parent_level_wins() {
        let mut root = ActionMappingTable::new(StateVector::root());
        root.set_actions(10, 0);

        let mut any_page = ActionMappingTable::new(StateVector::new(1, -1, 3));
        any_page.add_parent_table(root);
        let mut any_cell = ActionMappingTable::new(StateVector::new(1, 1, -1));
        any_cell.set_actions(10, 1);

        let mut table = ActionMappingTable::new(StateVector::new(1, 1, 3));
        table.add_parent_table(any_page);
        table.add_parent_table(any_cell);

        // Second direct parent beats the first parent's grandparent
        assert_eq!(table.get_actions(10, true), Some(1));
    }

    #[test]
    fn test_set_actions_replaces() {
        let mut table = ActionMappingTable::new(StateVector::root());
        table.set_actions(5, 0);
        table.set_actions(5, 3);
        assert_eq!(table.len(), 1);
        assert_eq!(table.set_indices().collect::<Vec<_>>(), vec![3]);
        assert!(table.contains_id(5));
    }
}
