//! Hierarchical source state: mode, page and cell.

use crate::error::ProfileError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Axis value meaning "any" / not set
pub const DEFAULT_ID: i32 = -1;
/// Relative axis value meaning "no change"
pub const NONE_ID: i32 = 0;
/// Relative axis value selecting the previous sibling
pub const PREVIOUS_ID: i32 = -2;
/// Relative axis value selecting the next sibling
pub const NEXT_ID: i32 = -3;

const AXES: usize = 3;

/// Position in a source's state tree.
///
/// A vector with `DEFAULT_ID` on an axis is more general than one with a
/// concrete id there, see [`StateVector::contains`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateVector {
    values: [i32; AXES],
}

impl StateVector {
    pub fn new(mode: i32, page: i32, cell: i32) -> Self {
        Self {
            values: [mode, page, cell],
        }
    }

    /// The most general state
    pub fn root() -> Self {
        Self::new(DEFAULT_ID, DEFAULT_ID, DEFAULT_ID)
    }

    pub fn mode(&self) -> i32 {
        self.values[0]
    }

    pub fn page(&self) -> i32 {
        self.values[1]
    }

    pub fn cell(&self) -> i32 {
        self.values[2]
    }

    pub fn axis(&self, index: usize) -> i32 {
        self.values[index]
    }

    pub fn set_axis(&mut self, index: usize, value: i32) {
        self.values[index] = value;
    }

    /// Compact key: mode in the upper half, page and cell one byte each
    pub fn id(&self) -> i32 {
        ((self.mode() as i16 as i32) << 16)
            | ((self.page() as u8 as i32) << 8)
            | (self.cell() as u8 as i32)
    }

    /// True if any axis uses a "no change", "next" or "previous" value
    pub fn is_relative(&self) -> bool {
        self.values.iter().any(|v| *v < 1 && *v != DEFAULT_ID)
    }

    pub fn is_specific(&self) -> bool {
        self.values.iter().all(|v| *v > 0)
    }

    pub fn is_same_as(&self, other: &StateVector) -> bool {
        self.values == other.values
    }

    /// True if `other` lies within this (possibly more general) state
    pub fn contains(&self, other: &StateVector) -> bool {
        self.values
            .iter()
            .zip(other.values.iter())
            .all(|(mine, theirs)| *mine <= 0 || mine == theirs)
    }

    /// The next more general states, most specific generalisation last
    pub fn get_parent_states(&self) -> Vec<StateVector> {
        let mut parents = Vec::new();
        if self.cell() != DEFAULT_ID {
            if self.page() != DEFAULT_ID {
                let mut any_page = *self;
                any_page.values[1] = DEFAULT_ID;
                parents.push(any_page);
            }
            let mut any_cell = *self;
            any_cell.values[2] = DEFAULT_ID;
            parents.push(any_cell);
        } else if self.page() != DEFAULT_ID {
            let mut parent = *self;
            parent.values[1] = DEFAULT_ID;
            parents.push(parent);
        } else if self.mode() != DEFAULT_ID {
            let mut parent = *self;
            parent.values[0] = DEFAULT_ID;
            parents.push(parent);
        }
        parents
    }
}

impl Default for StateVector {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.mode(), self.page(), self.cell())
    }
}

impl FromStr for StateVector {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|part| part.trim().parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ProfileError::Invalid(format!("state '{}': {}", s, e)))?;
        match parts.as_slice() {
            [mode, page, cell] => Ok(Self::new(*mode, *page, *cell)),
            _ => Err(ProfileError::Invalid(format!(
                "state '{}' must have 3 values",
                s
            ))),
        }
    }
}

impl TryFrom<String> for StateVector {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StateVector> for String {
    fn from(state: StateVector) -> Self {
        state.to_string()
    }
}

/// Named node of the state tree. Modes hold pages, pages hold cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateNode {
    pub id: i32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StateNode>,
    /// Child entered when this node is reached without a more specific
    /// value, e.g. the centre cell of a grid page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_child: Option<i32>,
}

impl StateNode {
    pub fn new(id: i32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            children: Vec::new(),
            default_child: None,
        }
    }

    pub fn with_children(mut self, children: Vec<StateNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_default_child(mut self, id: i32) -> Self {
        self.default_child = Some(id);
        self
    }
}

fn find(nodes: &[StateNode], id: i32) -> Option<&StateNode> {
    nodes.iter().find(|node| node.id == id)
}

// Next positive sibling after `id`, wrapping round to the first
fn next_id(nodes: &[StateNode], id: i32) -> i32 {
    let positive: Vec<i32> = nodes.iter().map(|n| n.id).filter(|v| *v > 0).collect();
    match positive.iter().position(|v| *v == id) {
        Some(pos) => positive[(pos + 1) % positive.len()],
        None => positive.first().copied().unwrap_or(id),
    }
}

// Previous positive sibling before `id`, wrapping round to the last
fn previous_id(nodes: &[StateNode], id: i32) -> i32 {
    let positive: Vec<i32> = nodes.iter().map(|n| n.id).filter(|v| *v > 0).collect();
    match positive.iter().position(|v| *v == id) {
        Some(pos) => positive[(pos + positive.len() - 1) % positive.len()],
        None => positive.last().copied().unwrap_or(id),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateTree {
    pub modes: Vec<StateNode>,
}

impl StateTree {
    pub fn new(modes: Vec<StateNode>) -> Self {
        Self { modes }
    }

    /// First declared non-default mode, else the root state
    pub fn initial_state(&self) -> StateVector {
        self.modes
            .iter()
            .find(|mode| mode.id != DEFAULT_ID)
            .map(|mode| StateVector::new(mode.id, DEFAULT_ID, DEFAULT_ID))
            .unwrap_or_else(StateVector::root)
    }

    pub fn has_state(&self, state: &StateVector) -> bool {
        let mut level = self.modes.as_slice();
        for axis in 0..AXES {
            let value = state.axis(axis);
            if value == DEFAULT_ID {
                continue;
            }
            match find(level, value) {
                Some(node) => level = &node.children,
                None => return false,
            }
        }
        true
    }

    /// Resolves "no change", "next" and "previous" axis values against
    /// `reference`. Resolution walks down the tree and stops at the first
    /// value the tree doesn't know, leaving the remaining axes at default.
    pub fn relative_to_absolute(&self, relative: &StateVector, reference: &StateVector) -> StateVector {
        if !relative.is_relative() {
            return *relative;
        }

        let mut absolute = StateVector::root();
        let mut level = self.modes.as_slice();
        for axis in 0..AXES {
            let value = match relative.axis(axis) {
                NONE_ID => reference.axis(axis),
                NEXT_ID => next_id(level, reference.axis(axis)),
                PREVIOUS_ID => previous_id(level, reference.axis(axis)),
                other => other,
            };

            match find(level, value) {
                Some(node) => {
                    absolute.set_axis(axis, value);
                    level = &node.children;
                }
                None => break,
            }
        }
        absolute
    }

    /// Fills default values with the parent's declared default child, or
    /// for modes and pages the first declared id at that level. A cell
    /// whose page declares no default stays -1. A value the tree doesn't
    /// know resets it and every axis below it.
    pub fn make_specific(&self, state: &StateVector) -> StateVector {
        if state.is_specific() {
            return *state;
        }

        let mut specific = *state;
        let mut level = self.modes.as_slice();
        let mut parent: Option<&StateNode> = None;
        for axis in 0..AXES {
            let mut value = specific.axis(axis);
            if value == DEFAULT_ID {
                let declared = parent.and_then(|node| node.default_child);
                let first = (axis < AXES - 1)
                    .then(|| level.iter().find(|node| node.id > 0).map(|node| node.id))
                    .flatten();
                if let Some(default) = declared.or(first) {
                    value = default;
                    specific.set_axis(axis, value);
                }
            }

            match find(level, value) {
                Some(node) => {
                    level = &node.children;
                    parent = Some(node);
                }
                None => {
                    for rest in axis..AXES {
                        specific.set_axis(rest, DEFAULT_ID);
                    }
                    break;
                }
            }
        }
        specific
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> StateTree {
        StateTree::new(vec![
            StateNode::new(1, "Pointer").with_children(vec![StateNode::new(1, "Main")]),
            StateNode::new(2, "Keyboard").with_children(vec![
                StateNode::new(1, "Letters").with_children(vec![
                    StateNode::new(1, "A"),
                    StateNode::new(2, "B"),
                ]),
                StateNode::new(2, "Symbols"),
                StateNode::new(3, "Numbers"),
            ]),
        ])
    }

    #[test]
    fn test_contains() {
        let general = StateVector::new(2, DEFAULT_ID, DEFAULT_ID);
        let specific = StateVector::new(2, 1, 1);
        assert!(general.contains(&specific));
        assert!(!specific.contains(&general));
        assert!(StateVector::root().contains(&specific));
        assert!(!StateVector::new(1, -1, -1).contains(&specific));
    }

    #[test]
    fn test_relative_and_specific() {
        assert!(StateVector::new(0, 0, 0).is_relative());
        assert!(StateVector::new(NEXT_ID, -1, -1).is_relative());
        assert!(!StateVector::new(1, -1, -1).is_relative());
        assert!(StateVector::new(1, 2, 3).is_specific());
        assert!(!StateVector::new(1, 2, -1).is_specific());
    }

    #[test]
    fn test_parent_states() {
        let parents = StateVector::new(2, 1, 3).get_parent_states();
        assert_eq!(parents, vec![StateVector::new(2, -1, 3), StateVector::new(2, 1, -1)]);
        assert_eq!(
            StateVector::new(2, 1, -1).get_parent_states(),
            vec![StateVector::new(2, -1, -1)]
        );
        assert_eq!(
            StateVector::new(2, -1, -1).get_parent_states(),
            vec![StateVector::root()]
        );
        assert!(StateVector::root().get_parent_states().is_empty());
    }

    #[test]
    fn test_id_packing() {
        assert_eq!(StateVector::new(2, 1, 3).id(), (2 << 16) | (1 << 8) | 3);
        assert_eq!(StateVector::root().id(), -1);
    }

    #[test]
    fn test_parse_and_display() {
        let state: StateVector = " 2, -1,3".parse().unwrap();
        assert_eq!(state, StateVector::new(2, -1, 3));
        assert_eq!(state.to_string(), "2,-1,3");
        assert!("1,2".parse::<StateVector>().is_err());
        assert!("a,b,c".parse::<StateVector>().is_err());
    }

    #[test]
    fn test_next_and_previous_wrap() {
        let tree = tree();
        let current = StateVector::new(2, 3, -1);
        assert_eq!(
            tree.relative_to_absolute(&StateVector::new(NONE_ID, NEXT_ID, -1), &current),
            StateVector::new(2, 1, -1)
        );
        assert_eq!(
            tree.relative_to_absolute(&StateVector::new(NONE_ID, PREVIOUS_ID, -1), &current),
            StateVector::new(2, 2, -1)
        );
        assert_eq!(
            tree.relative_to_absolute(&StateVector::new(NEXT_ID, -1, -1), &current),
            StateVector::new(1, -1, -1)
        );
    }

    #[test]
    fn test_relative_stops_at_unknown_value() {
        let tree = tree();
        let current = StateVector::new(1, 1, -1);
        assert_eq!(
            tree.relative_to_absolute(&StateVector::new(NONE_ID, 7, NONE_ID), &current),
            StateVector::new(1, -1, -1)
        );
        // Absolute states pass through untouched
        let absolute = StateVector::new(2, 2, -1);
        assert_eq!(tree.relative_to_absolute(&absolute, &current), absolute);
    }

    #[test]
    fn test_make_specific() {
        let tree = tree();
        assert_eq!(tree.make_specific(&StateVector::root()), StateVector::new(1, 1, -1));
        assert_eq!(
            tree.make_specific(&StateVector::new(2, -1, -1)),
            StateVector::new(2, 1, -1)
        );
        assert_eq!(
            tree.make_specific(&StateVector::new(9, -1, -1)),
            StateVector::root()
        );
        assert_eq!(
            tree.make_specific(&StateVector::new(2, 1, 2)),
            StateVector::new(2, 1, 2)
        );
    }

    #[test]
    fn test_make_specific_uses_declared_defaults() {
        let tree = StateTree::new(vec![StateNode::new(1, "Grid")
            .with_default_child(2)
            .with_children(vec![
                StateNode::new(1, "Small"),
                StateNode::new(2, "Large").with_default_child(5).with_children(
                    (1..=9).map(|id| StateNode::new(id, "Cell")).collect(),
                ),
            ])]);
        assert_eq!(tree.make_specific(&StateVector::root()), StateVector::new(1, 2, 5));
        assert_eq!(
            tree.make_specific(&StateVector::new(1, 1, -1)),
            StateVector::new(1, 1, -1)
        );
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(tree().initial_state(), StateVector::new(1, -1, -1));
        assert_eq!(StateTree::default().initial_state(), StateVector::root());
        assert!(tree().has_state(&StateVector::new(2, 1, 2)));
        assert!(!tree().has_state(&StateVector::new(1, 2, -1)));
    }
}
