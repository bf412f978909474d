//! Actions and the sets / lists that bind them to control events.
//!
//! An [`ActionSet`] belongs to one state and one control key and holds an
//! [`ActionList`] per event reason. Actions never touch their source
//! directly: changes to source state go through an [`ActionScope`] command
//! queue that the source applies once the triggering call returns.

use super::mapping_table::ActionMappingTable;
use super::state::StateVector;
use super::{SourceCommand, StateManager};
use crate::controls::DirectionMode;
use crate::events::{ControlKey, EventReason, SourceEvent};
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tracing::debug;

/// What an action may do while it runs
pub struct ActionScope<'a> {
    manager: &'a mut dyn StateManager,
    commands: &'a mut Vec<SourceCommand>,
}

impl<'a> ActionScope<'a> {
    pub fn new(manager: &'a mut dyn StateManager, commands: &'a mut Vec<SourceCommand>) -> Self {
        Self { manager, commands }
    }

    pub fn now(&self) -> Instant {
        self.manager.now()
    }

    /// Queues a change to the owning source
    pub fn queue(&mut self, command: SourceCommand) {
        self.commands.push(command);
    }

    /// Hands a named command to the external executor
    pub fn perform(&mut self, command: &str, event: &SourceEvent) {
        self.manager.perform(command, event);
    }
}

pub trait Action: Debug {
    /// Short description for logs
    fn name(&self) -> String;

    /// Called when the owning action set becomes applicable
    fn activate(&mut self, _scope: &mut ActionScope<'_>, _event: &SourceEvent) {}

    /// Called when the owning action set stops being applicable
    fn deactivate(&mut self, _scope: &mut ActionScope<'_>, _event: &SourceEvent) {}

    fn start(&mut self, scope: &mut ActionScope<'_>, event: &SourceEvent);

    /// Advances an ongoing action. Called once per tick.
    fn continue_action(&mut self, _scope: &mut ActionScope<'_>, _event: &SourceEvent) {}

    fn is_ongoing(&self) -> bool {
        false
    }
}

/// Moves the source to another, possibly relative, state
#[derive(Debug, Clone)]
pub struct ChangeStateAction {
    pub state: StateVector,
}

impl Action for ChangeStateAction {
    fn name(&self) -> String {
        format!("Change state to {}", self.state)
    }

    fn start(&mut self, scope: &mut ActionScope<'_>, _event: &SourceEvent) {
        scope.queue(SourceCommand::ChangeState(self.state));
    }
}

/// Overrides the direction mode of the control while its set is active
#[derive(Debug, Clone)]
pub struct SetDirectionModeAction {
    pub mode: DirectionMode,
}

impl SetDirectionModeAction {
    fn apply(&self, scope: &mut ActionScope<'_>, event: &SourceEvent, enable: bool) {
        scope.queue(SourceCommand::ApplyDirectionMode {
            key: event.key,
            mode: self.mode,
            enable,
        });
    }
}

impl Action for SetDirectionModeAction {
    fn name(&self) -> String {
        format!("Set direction mode {:?}", self.mode)
    }

    fn activate(&mut self, scope: &mut ActionScope<'_>, event: &SourceEvent) {
        self.apply(scope, event, true);
    }

    fn deactivate(&mut self, scope: &mut ActionScope<'_>, event: &SourceEvent) {
        self.apply(scope, event, false);
    }

    fn start(&mut self, _scope: &mut ActionScope<'_>, _event: &SourceEvent) {}
}

/// Overrides hold time and repeat interval while its set is active
#[derive(Debug, Clone)]
pub struct SetDwellAndAutorepeatAction {
    pub hold_ms: u64,
    pub repeat_ms: u64,
}

impl SetDwellAndAutorepeatAction {
    fn apply(&self, scope: &mut ActionScope<'_>, event: &SourceEvent, enable: bool) {
        scope.queue(SourceCommand::ApplyDwellAndRepeat {
            key: event.key,
            hold_ms: self.hold_ms,
            repeat_ms: self.repeat_ms,
            enable,
        });
    }
}

impl Action for SetDwellAndAutorepeatAction {
    fn name(&self) -> String {
        format!("Hold {}ms, repeat every {}ms", self.hold_ms, self.repeat_ms)
    }

    fn activate(&mut self, scope: &mut ActionScope<'_>, event: &SourceEvent) {
        self.apply(scope, event, true);
    }

    fn deactivate(&mut self, scope: &mut ActionScope<'_>, event: &SourceEvent) {
        self.apply(scope, event, false);
    }

    fn start(&mut self, _scope: &mut ActionScope<'_>, _event: &SourceEvent) {}
}

/// Pauses the list it belongs to
#[derive(Debug, Clone)]
pub struct WaitAction {
    pub duration: Duration,
    until: Option<Instant>,
}

impl WaitAction {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            until: None,
        }
    }
}

impl Action for WaitAction {
    fn name(&self) -> String {
        format!("Wait {}ms", self.duration.as_millis())
    }

    fn start(&mut self, scope: &mut ActionScope<'_>, _event: &SourceEvent) {
        self.until = Some(scope.now() + self.duration);
    }

    fn continue_action(&mut self, scope: &mut ActionScope<'_>, _event: &SourceEvent) {
        if self.until.is_some_and(|until| scope.now() >= until) {
            self.until = None;
        }
    }

    fn is_ongoing(&self) -> bool {
        self.until.is_some()
    }
}

/// Forwards a named command, e.g. a key press, to the executor
#[derive(Debug, Clone)]
pub struct CommandAction {
    pub command: String,
}

impl Action for CommandAction {
    fn name(&self) -> String {
        self.command.clone()
    }

    fn start(&mut self, scope: &mut ActionScope<'_>, event: &SourceEvent) {
        scope.perform(&self.command, event);
    }
}

/// Actions run in order for one event reason
#[derive(Debug)]
pub struct ActionList {
    reason: EventReason,
    actions: Vec<Box<dyn Action>>,
    ongoing: bool,
    current: usize,
    current_event: Option<SourceEvent>,
}

impl ActionList {
    pub fn new(reason: EventReason, actions: Vec<Box<dyn Action>>) -> Self {
        Self {
            reason,
            actions,
            ongoing: false,
            current: 0,
            current_event: None,
        }
    }

    pub fn reason(&self) -> EventReason {
        self.reason
    }

    pub fn actions(&self) -> &[Box<dyn Action>] {
        &self.actions
    }

    pub fn is_ongoing(&self) -> bool {
        self.ongoing
    }

    pub fn current_event(&self) -> Option<&SourceEvent> {
        self.current_event.as_ref()
    }

    pub fn activate(&mut self, scope: &mut ActionScope<'_>, event: &SourceEvent) {
        self.ongoing = false;
        for action in self.actions.iter_mut() {
            action.activate(scope, event);
        }
    }

    pub fn deactivate(&mut self, scope: &mut ActionScope<'_>, event: &SourceEvent) {
        self.ongoing = false;
        for action in self.actions.iter_mut() {
            action.deactivate(scope, event);
        }
    }

    /// Runs actions from the first until one of them is ongoing
    pub fn start(&mut self, scope: &mut ActionScope<'_>, event: SourceEvent) {
        self.ongoing = false;
        self.current_event = Some(event);
        self.run_from(0, scope, &event);
    }

    /// Advances the ongoing action and, once it finishes, starts the rest
    pub fn continue_actions(&mut self, scope: &mut ActionScope<'_>) {
        let Some(event) = self.current_event else {
            self.ongoing = false;
            return;
        };
        if !self.ongoing {
            return;
        }

        self.ongoing = false;
        let Some(action) = self.actions.get_mut(self.current) else {
            return;
        };
        action.continue_action(scope, &event);
        if action.is_ongoing() {
            self.ongoing = true;
            return;
        }
        self.run_from(self.current + 1, scope, &event);
    }

    fn run_from(&mut self, first: usize, scope: &mut ActionScope<'_>, event: &SourceEvent) {
        for (index, action) in self.actions.iter_mut().enumerate().skip(first) {
            debug!("Starting action: {}", action.name());
            action.start(scope, event);
            if action.is_ongoing() {
                self.ongoing = true;
                self.current = index;
                return;
            }
        }
    }
}

/// Actions bound to one control key in one state
#[derive(Debug)]
pub struct ActionSet {
    pub state: StateVector,
    pub key: ControlKey,
    lists: Vec<ActionList>,
    active: bool,
}

impl ActionSet {
    pub fn new(state: StateVector, key: ControlKey) -> Self {
        Self {
            state,
            key,
            lists: Vec::new(),
            active: false,
        }
    }

    /// Adds or replaces the list for its reason, keeping lists ordered
    pub fn set_list(&mut self, list: ActionList) {
        self.lists.retain(|existing| existing.reason != list.reason);
        let position = self
            .lists
            .iter()
            .position(|existing| existing.reason > list.reason)
            .unwrap_or(self.lists.len());
        self.lists.insert(position, list);
    }

    pub fn with_list(mut self, list: ActionList) -> Self {
        self.set_list(list);
        self
    }

    pub fn lists(&self) -> &[ActionList] {
        &self.lists
    }

    pub fn reasons(&self) -> Vec<EventReason> {
        self.lists.iter().map(|list| list.reason).collect()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn get_actions(&self, reason: EventReason) -> Option<&ActionList> {
        self.lists.iter().find(|list| list.reason == reason)
    }

    pub fn get_actions_mut(&mut self, reason: EventReason) -> Option<&mut ActionList> {
        self.lists.iter_mut().find(|list| list.reason == reason)
    }

    pub fn activate(&mut self, scope: &mut ActionScope<'_>, event: &SourceEvent) {
        self.active = true;
        for list in self.lists.iter_mut() {
            list.activate(scope, event);
        }
    }

    pub fn deactivate(&mut self, scope: &mut ActionScope<'_>, event: &SourceEvent) {
        self.active = false;
        for list in self.lists.iter_mut() {
            list.deactivate(scope, event);
        }
    }
}

/// Every action set a source declares
#[derive(Debug, Default)]
pub struct ActionSetCollection {
    sets: Vec<ActionSet>,
}

impl ActionSetCollection {
    pub fn new(sets: Vec<ActionSet>) -> Self {
        Self { sets }
    }

    pub fn add(&mut self, set: ActionSet) {
        self.sets.push(set);
    }

    pub fn get(&self, index: usize) -> Option<&ActionSet> {
        self.sets.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ActionSet> {
        self.sets.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionSet> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Builds the table of sets declared for exactly `state`. With
    /// defaults, the tables of its parent states are attached too; only
    /// the first parent recurses further so no set is reached twice.
    pub fn actions_for_state(&self, state: &StateVector, include_defaults: bool) -> ActionMappingTable {
        let mut table = ActionMappingTable::new(*state);
        for (index, set) in self.sets.iter().enumerate() {
            let id = set.key.to_id();
            if set.state.is_same_as(state) && !table.contains_id(id) {
                table.set_actions(id, index);
            }
        }

        if include_defaults {
            for (position, parent) in state.get_parent_states().iter().enumerate() {
                table.add_parent_table(self.actions_for_state(parent, position == 0));
            }
        }
        table
    }
}
