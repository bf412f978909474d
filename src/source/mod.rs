//! Virtual input sources
//!
//! A [`BaseSource`] owns the physical inputs and virtual controls of one
//! profile source, tracks its current position in the state tree and keeps
//! the action sets that apply there active.
//!
//! # State transitions
//!
//! ```text
//! requested ──► relative_to_absolute ──► make_specific ──► changed?
//!                                                            │
//!        deactivate old table (specific first, then parents) ◄┘
//!        build table for new state
//!        activate new table (parents first, then specific)
//! ```
//!
//! Tables whose state still contains the other end of the transition are
//! skipped, so bindings common to both states stay active throughout.

pub mod actions;
pub mod activation;
pub mod mapping_table;
pub mod state;

pub use actions::{
    Action, ActionList, ActionScope, ActionSet, ActionSetCollection, ChangeStateAction,
    CommandAction, SetDirectionModeAction, SetDwellAndAutorepeatAction, WaitAction,
};
pub use activation::{AutoActivation, AutoActivations, MatchType};
pub use mapping_table::ActionMappingTable;
pub use state::{StateNode, StateTree, StateVector};

use crate::config::ConfigSource;
use crate::controls::{ControlSet, DirectionMode, VirtualControl};
use crate::events::{ControlKey, EventReason, SourceEvent, UiEvent};
use crate::input::{BoundControl, DeviceStates, InputMapping, PhysicalInputs};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info, warn};

// State changes chained by actions before the source gives up
const MAX_COMMAND_ROUNDS: usize = 8;

/// Execution context the engine provides to sources and actions
pub trait StateManager {
    fn now(&self) -> Instant;

    /// Forwards a notification to observers outside the polling loop
    fn submit_ui_event(&mut self, event: UiEvent);

    /// Registers a list to be continued on every tick until it finishes
    fn add_ongoing_actions(&mut self, list: ActionListRef);

    /// Executes a named command. Side effects live outside the core.
    fn perform(&mut self, command: &str, event: &SourceEvent);
}

/// Address of an action list within a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionListRef {
    pub source_id: u8,
    pub set: usize,
    pub reason: EventReason,
}

/// Change to a source requested by an action
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceCommand {
    ChangeState(StateVector),
    ApplyDirectionMode {
        key: ControlKey,
        mode: DirectionMode,
        enable: bool,
    },
    ApplyDwellAndRepeat {
        key: ControlKey,
        hold_ms: u64,
        repeat_ms: u64,
        enable: bool,
    },
}

#[derive(Debug)]
pub struct BaseSource {
    id: u8,
    name: String,
    inputs: PhysicalInputs,
    controls: ControlSet,
    states: StateTree,
    auto_activations: AutoActivations,
    actions: ActionSetCollection,
    current_state: StateVector,
    current_mappings: Option<ActionMappingTable>,
    auto_activated: bool,
    pending: Vec<SourceCommand>,
}

impl BaseSource {
    pub fn new(id: u8, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            inputs: PhysicalInputs::default(),
            controls: ControlSet::new(),
            states: StateTree::default(),
            auto_activations: AutoActivations::default(),
            actions: ActionSetCollection::default(),
            current_state: StateVector::root(),
            current_mappings: None,
            auto_activated: false,
            pending: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: PhysicalInputs) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_controls(mut self, controls: ControlSet) -> Self {
        self.controls = controls;
        self
    }

    pub fn with_states(mut self, states: StateTree) -> Self {
        self.states = states;
        self
    }

    pub fn with_auto_activations(mut self, auto_activations: AutoActivations) -> Self {
        self.auto_activations = auto_activations;
        self
    }

    pub fn with_actions(mut self, actions: ActionSetCollection) -> Self {
        self.actions = actions;
        self
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn physical_inputs(&self) -> &PhysicalInputs {
        &self.inputs
    }

    pub fn physical_inputs_mut(&mut self) -> &mut PhysicalInputs {
        &mut self.inputs
    }

    pub fn controls(&self) -> &ControlSet {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlSet {
        &mut self.controls
    }

    pub fn state_tree(&self) -> &StateTree {
        &self.states
    }

    pub fn auto_activations(&self) -> &AutoActivations {
        &self.auto_activations
    }

    pub fn action_sets(&self) -> &ActionSetCollection {
        &self.actions
    }

    pub fn current_state(&self) -> StateVector {
        self.current_state
    }

    pub fn current_mappings(&self) -> Option<&ActionMappingTable> {
        self.current_mappings.as_ref()
    }

    pub fn initial_state(&self) -> StateVector {
        self.states.initial_state()
    }

    /// Device ids the declared physical inputs expect
    pub fn required_device_ids(&self) -> BTreeSet<u8> {
        self.inputs.iter().map(|input| input.device_id).collect()
    }

    /// Resolves every control's mappings through `resolve`. Unused slots
    /// stay unbound without asking.
    pub fn bind_controls<F>(&mut self, mut resolve: F)
    where
        F: FnMut(&InputMapping, &PhysicalInputs) -> Option<BoundControl>,
    {
        for control in self.controls.iter_mut() {
            let bound: Vec<Option<BoundControl>> = control
                .input_mappings()
                .iter()
                .map(|mapping| {
                    if mapping.is_unused() {
                        None
                    } else {
                        resolve(mapping, &self.inputs)
                    }
                })
                .collect();
            control.set_bound_controls(bound, &self.inputs);
            debug!(
                "Control {:?} {} ({}): binding valid = {}",
                control.control_type(),
                control.id(),
                control.name(),
                control.is_binding_valid()
            );
        }
    }

    pub fn apply_config(&mut self, config: &dyn ConfigSource) {
        for control in self.controls.iter_mut() {
            control.apply_config(config);
        }
    }

    /// Switches state from the focused window. Leaving an auto-activated
    /// window restores the declared default state, if any.
    pub fn set_current_window(&mut self, process_name: &str, window_title: &str, manager: &mut dyn StateManager) {
        let process = process_name.to_lowercase();
        let title = window_title.to_lowercase();
        match self.auto_activations.get_activation(&process, &title) {
            Some(state) => {
                debug!("Auto-activating {} for {} / {}", state, process, title);
                self.auto_activated = true;
                self.set_current_state(&state, manager);
            }
            None if self.auto_activated => {
                self.auto_activated = false;
                if let Some(default_state) = self.auto_activations.default_state {
                    self.set_current_state(&default_state, manager);
                }
            }
            None => {}
        }
    }

    /// Moves to `requested`, which may be relative to the current state,
    /// and applies whatever the (de)activated actions asked for.
    pub fn set_current_state(&mut self, requested: &StateVector, manager: &mut dyn StateManager) {
        self.transition_to(requested, manager);
        self.apply_pending(manager);
    }

    fn transition_to(&mut self, requested: &StateVector, manager: &mut dyn StateManager) {
        let absolute = self.states.relative_to_absolute(requested, &self.current_state);
        let new_state = self.states.make_specific(&absolute);
        if self.current_mappings.is_some() && new_state == self.current_state {
            return;
        }

        let old_table = self.current_mappings.take();
        let previous = old_table.as_ref().map(|_| self.current_state);
        let new_table = self.actions.actions_for_state(&new_state, true);

        let mut wiring = Wiring {
            source_id: self.id,
            actions: &mut self.actions,
            controls: &mut self.controls,
            pending: &mut self.pending,
            manager: &mut *manager,
        };
        if let Some(old_table) = old_table.as_ref() {
            wiring.deactivate_table(old_table, &new_state);
        }

        self.current_state = new_state;
        info!("Source {} ({}) entered state {}", self.id, self.name, new_state);
        wiring.manager.submit_ui_event(UiEvent::StateChanged {
            source_id: self.id,
            state: new_state,
        });

        wiring.activate_table(&new_table, previous.as_ref());
        self.current_mappings = Some(new_table);
    }

    fn apply_pending(&mut self, manager: &mut dyn StateManager) {
        let mut rounds = 0;
        while !self.pending.is_empty() {
            if rounds == MAX_COMMAND_ROUNDS {
                warn!(
                    "Source {} dropped {} commands after {} rounds",
                    self.id,
                    self.pending.len(),
                    rounds
                );
                self.pending.clear();
                return;
            }
            rounds += 1;

            for command in std::mem::take(&mut self.pending) {
                self.apply_command(command, manager);
            }
        }
    }

    fn apply_command(&mut self, command: SourceCommand, manager: &mut dyn StateManager) {
        match command {
            SourceCommand::ChangeState(state) => self.transition_to(&state, manager),
            SourceCommand::ApplyDirectionMode { key, mode, enable } => {
                if let Some(control) = self.controls.for_key(&key) {
                    control.apply_direction_mode(mode, enable);
                }
            }
            SourceCommand::ApplyDwellAndRepeat {
                key,
                hold_ms,
                repeat_ms,
                enable,
            } => {
                if let Some(control) = self.controls.for_key(&key) {
                    control.apply_hold_time(hold_ms, enable);
                    control.apply_repeat_interval(repeat_ms, enable);
                }
            }
        }
    }

    /// Reads the physical inputs and, if any of them changed, recomputes
    /// every control. False if any input has no connected device.
    pub fn update_state(&mut self, devices: &dyn DeviceStates) -> bool {
        let mut success = true;
        let mut changed = false;
        for input in self.inputs.iter_mut() {
            success &= input.update_state(devices);
            changed |= input.is_state_changed();
        }

        if changed {
            for control in self.controls.iter_mut() {
                control.update_state(&self.inputs);
            }
        }
        success
    }

    /// Runs the event state machines of controls with demand and routes
    /// what they raise
    pub fn raise_events(&mut self, manager: &mut dyn StateManager) {
        let now = manager.now();
        let mut raised = Vec::new();
        for control in self.controls.iter_mut().filter(|control| control.is_active()) {
            control.raise_events(now, &mut raised);
        }

        for event in raised {
            self.handle_input_event(SourceEvent::from_control(self.id, event), manager);
        }
    }

    /// Reports the event to observers and starts the list bound to its key
    /// and reason in the current state
    pub fn handle_input_event(&mut self, event: SourceEvent, manager: &mut dyn StateManager) {
        if event.reason.is_reported() {
            manager.submit_ui_event(UiEvent::Input(event));
        }

        let Some(index) = self
            .current_mappings
            .as_ref()
            .and_then(|table| table.get_actions(event.key.to_id(), true))
        else {
            return;
        };
        let Some(set) = self.actions.get_mut(index).filter(|set| set.is_active()) else {
            return;
        };
        let Some(list) = set.get_actions_mut(event.reason) else {
            return;
        };

        let was_ongoing = list.is_ongoing();
        {
            let mut scope = ActionScope::new(&mut *manager, &mut self.pending);
            list.start(&mut scope, event);
        }
        if list.is_ongoing() && !was_ongoing {
            manager.add_ongoing_actions(ActionListRef {
                source_id: self.id,
                set: index,
                reason: event.reason,
            });
        }
        self.apply_pending(manager);
    }

    /// Advances an ongoing list. Returns whether it is still ongoing.
    pub fn continue_actions(&mut self, list_ref: &ActionListRef, manager: &mut dyn StateManager) -> bool {
        let Some(list) = self
            .actions
            .get_mut(list_ref.set)
            .and_then(|set| set.get_actions_mut(list_ref.reason))
        else {
            return false;
        };

        {
            let mut scope = ActionScope::new(&mut *manager, &mut self.pending);
            list.continue_actions(&mut scope);
        }
        let ongoing = list.is_ongoing();
        self.apply_pending(manager);
        ongoing
    }
}

// Disjoint borrows of a source while its tables are walked
struct Wiring<'a> {
    source_id: u8,
    actions: &'a mut ActionSetCollection,
    controls: &'a mut ControlSet,
    pending: &'a mut Vec<SourceCommand>,
    manager: &'a mut dyn StateManager,
}

impl Wiring<'_> {
    fn activate_table(&mut self, table: &ActionMappingTable, previous: Option<&StateVector>) {
        if previous.is_some_and(|previous| table.state().contains(previous)) {
            return;
        }
        for parent in table.parents() {
            self.activate_table(parent, previous);
        }
        for index in table.set_indices() {
            self.set_active(index, true);
        }
    }

    fn deactivate_table(&mut self, table: &ActionMappingTable, next: &StateVector) {
        if table.state().contains(next) {
            return;
        }
        for index in table.set_indices() {
            self.set_active(index, false);
        }
        for parent in table.parents().iter().rev() {
            self.deactivate_table(parent, next);
        }
    }

    fn set_active(&mut self, index: usize, active: bool) {
        let Some(set) = self.actions.get_mut(index) else {
            return;
        };
        if set.is_active() == active {
            return;
        }

        let event = SourceEvent::new(self.source_id, set.key, EventReason::None);
        {
            let mut scope = ActionScope::new(&mut *self.manager, &mut *self.pending);
            if active {
                set.activate(&mut scope, &event);
            } else {
                set.deactivate(&mut scope, &event);
            }
        }

        let reasons = set.reasons();
        if let Some(control) = self.controls.for_key(&set.key) {
            control.enable_input_events(&reasons, active);
        }
        debug!(
            "{} action set {} for {:?} in {}",
            if active { "Activated" } else { "Deactivated" },
            index,
            set.key,
            set.state
        );
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Execution context that records everything it is asked to do
    pub struct Recorder {
        pub now: Instant,
        pub performed: Vec<String>,
        pub ui_events: Vec<UiEvent>,
        pub ongoing: Vec<ActionListRef>,
    }

    impl Recorder {
        pub fn at(now: Instant) -> Self {
            Self {
                now,
                performed: Vec::new(),
                ui_events: Vec::new(),
                ongoing: Vec::new(),
            }
        }

        pub fn new() -> Self {
            Self::at(Instant::now())
        }

        pub fn state_changes(&self) -> Vec<StateVector> {
            self.ui_events
                .iter()
                .filter_map(|event| match event {
                    UiEvent::StateChanged { state, .. } => Some(*state),
                    _ => None,
                })
                .collect()
        }
    }

    impl StateManager for Recorder {
        fn now(&self) -> Instant {
            self.now
        }

        fn submit_ui_event(&mut self, event: UiEvent) {
            self.ui_events.push(event);
        }

        fn add_ongoing_actions(&mut self, list: ActionListRef) {
            self.ongoing.push(list);
        }

        fn perform(&mut self, command: &str, _event: &SourceEvent) {
            self.performed.push(command.to_string());
        }
    }
}
