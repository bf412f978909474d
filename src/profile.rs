//! Profile documents
//!
//! A profile is a TOML document describing one or more sources: the
//! physical inputs they expect, the virtual controls built on them, the
//! state tree and the action sets bound in each state. Loading validates
//! cross references and turns each source document into a [`BaseSource`].

use crate::controls::{Button, ButtonDiamond, ControlSet, DPad, DirectionMode, Stick, Trigger};
use crate::error::ProfileError;
use crate::events::{ControlKey, ControlType, EventReason};
use crate::input::gamepad::gamepad_capabilities;
use crate::input::{ControlOption, InputMapping, PhysicalControlType, PhysicalInput, PhysicalInputs};
use crate::lrud::Lrud;
use crate::source::{
    Action, ActionList, ActionSet, ActionSetCollection, AutoActivations, BaseSource,
    ChangeStateAction, CommandAction, SetDirectionModeAction, SetDwellAndAutorepeatAction,
    StateNode, StateTree, StateVector, WaitAction,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlDoc {
    pub id: u8,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub annotation: String,
    pub input: InputMapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickDoc {
    pub id: u8,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub annotation: String,
    pub x: InputMapping,
    pub y: InputMapping,
    #[serde(default = "InputMapping::unused")]
    pub button: InputMapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiamondDoc {
    pub id: u8,
    pub name: String,
    pub left: u8,
    pub right: u8,
    pub up: u8,
    pub down: u8,
}

/// One step of an action list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionDecl {
    ChangeState { state: StateVector },
    SetDirectionMode { mode: DirectionMode },
    SetDwellAndAutorepeat { hold_ms: u64, repeat_ms: u64 },
    Wait { ms: u64 },
    Command { command: String },
}

impl ActionDecl {
    pub fn build(&self) -> Box<dyn Action> {
        match self {
            ActionDecl::ChangeState { state } => Box::new(ChangeStateAction { state: *state }),
            ActionDecl::SetDirectionMode { mode } => Box::new(SetDirectionModeAction { mode: *mode }),
            ActionDecl::SetDwellAndAutorepeat { hold_ms, repeat_ms } => {
                Box::new(SetDwellAndAutorepeatAction {
                    hold_ms: *hold_ms,
                    repeat_ms: *repeat_ms,
                })
            }
            ActionDecl::Wait { ms } => Box::new(WaitAction::new(Duration::from_millis(*ms))),
            ActionDecl::Command { command } => Box::new(CommandAction {
                command: command.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionListDoc {
    pub reason: EventReason,
    #[serde(default)]
    pub actions: Vec<ActionDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSetDoc {
    #[serde(default)]
    pub state: StateVector,
    pub control: ControlKey,
    #[serde(default)]
    pub lists: Vec<ActionListDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDoc {
    pub id: u8,
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<PhysicalInput>,
    #[serde(default)]
    pub buttons: Vec<ControlDoc>,
    #[serde(default)]
    pub triggers: Vec<ControlDoc>,
    #[serde(default)]
    pub sticks: Vec<StickDoc>,
    #[serde(default)]
    pub dpads: Vec<ControlDoc>,
    #[serde(default)]
    pub button_diamonds: Vec<DiamondDoc>,
    #[serde(default)]
    pub states: StateTree,
    #[serde(default)]
    pub auto_activations: AutoActivations,
    #[serde(default)]
    pub action_sets: Vec<ActionSetDoc>,
}

impl SourceDoc {
    fn declared_controls(&self) -> BTreeSet<(ControlType, u8)> {
        let mut declared = BTreeSet::new();
        declared.extend(self.buttons.iter().map(|c| (ControlType::Button, c.id)));
        declared.extend(self.triggers.iter().map(|c| (ControlType::Trigger, c.id)));
        declared.extend(self.sticks.iter().map(|c| (ControlType::Stick, c.id)));
        declared.extend(self.dpads.iter().map(|c| (ControlType::DPad, c.id)));
        declared.extend(self.button_diamonds.iter().map(|c| (ControlType::ButtonDiamond, c.id)));
        declared
    }

    fn mappings(&self) -> impl Iterator<Item = &InputMapping> {
        self.buttons
            .iter()
            .chain(self.triggers.iter())
            .chain(self.dpads.iter())
            .map(|c| &c.input)
            .chain(self.sticks.iter().flat_map(|s| [&s.x, &s.y, &s.button]))
    }

    /// Checks that every reference in the document resolves
    pub fn validate(&self) -> Result<(), ProfileError> {
        let input_ids: BTreeSet<u8> = self.inputs.iter().map(|input| input.id).collect();
        if input_ids.len() != self.inputs.len() {
            return Err(invalid(self, "duplicate input id"));
        }
        if let Some(mapping) = self
            .mappings()
            .find(|mapping| !mapping.is_unused() && !input_ids.contains(&mapping.input_id))
        {
            return Err(invalid(self, &format!("mapping reads undeclared input {}", mapping.input_id)));
        }

        let declared = self.declared_controls();
        let count = self.buttons.len()
            + self.triggers.len()
            + self.sticks.len()
            + self.dpads.len()
            + self.button_diamonds.len();
        if declared.len() != count {
            return Err(invalid(self, "duplicate control id"));
        }

        for diamond in &self.button_diamonds {
            for button in [diamond.left, diamond.right, diamond.up, diamond.down] {
                if !declared.contains(&(ControlType::Button, button)) {
                    return Err(invalid(
                        self,
                        &format!("button diamond {} uses undeclared button {}", diamond.id, button),
                    ));
                }
            }
        }

        for set in &self.action_sets {
            if !declared.contains(&(set.control.control_type, set.control.control_id)) {
                return Err(invalid(
                    self,
                    &format!("action set for undeclared control {:?}", set.control),
                ));
            }
            if set.state.is_relative() || !self.states.has_state(&set.state) {
                return Err(invalid(self, &format!("action set for unknown state {}", set.state)));
            }
        }

        // One set per state and key, the mapping table holds a single entry per key
        let mut bound = HashSet::new();
        for set in &self.action_sets {
            if !bound.insert((set.state, set.control.to_id())) {
                return Err(invalid(
                    self,
                    &format!("duplicate action set for {:?} in state {}", set.control, set.state),
                ));
            }
        }
        Ok(())
    }

    /// Builds the runtime source. Call [`SourceDoc::validate`] first.
    pub fn build(&self) -> BaseSource {
        let mut controls = ControlSet::new();
        for doc in &self.buttons {
            controls.add(Box::new(Button::new(doc.id, &doc.name, doc.input)));
        }
        for doc in &self.triggers {
            controls.add(Box::new(Trigger::new(doc.id, &doc.name, doc.input)));
        }
        for doc in &self.sticks {
            controls.add(Box::new(Stick::new(doc.id, &doc.name, vec![doc.x, doc.y, doc.button])));
        }
        for doc in &self.dpads {
            controls.add(Box::new(DPad::new(doc.id, &doc.name, doc.input)));
        }
        for doc in &self.button_diamonds {
            controls.add(Box::new(ButtonDiamond::new(
                doc.id,
                &doc.name,
                [doc.left, doc.right, doc.up, doc.down],
            )));
        }

        let sets = self
            .action_sets
            .iter()
            .map(|doc| {
                doc.lists.iter().fold(ActionSet::new(doc.state, doc.control), |set, list| {
                    set.with_list(ActionList::new(
                        list.reason,
                        list.actions.iter().map(ActionDecl::build).collect(),
                    ))
                })
            })
            .collect();

        BaseSource::new(self.id, &self.name)
            .with_inputs(PhysicalInputs::new(self.inputs.clone()))
            .with_controls(controls)
            .with_states(self.states.clone())
            .with_auto_activations(self.auto_activations.clone())
            .with_actions(ActionSetCollection::new(sets))
    }
}

fn invalid(source: &SourceDoc, reason: &str) -> ProfileError {
    ProfileError::Invalid(format!("source {} ({}): {}", source.id, source.name, reason))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sources: Vec<SourceDoc>,
}

impl Profile {
    pub fn from_toml_str(content: &str) -> Result<Self, ProfileError> {
        let profile: Profile = toml::from_str(content)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_toml_string(&self) -> Result<String, ProfileError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub async fn load(path: &Path) -> Result<Self, ProfileError> {
        let content = tokio::fs::read_to_string(path).await?;
        let profile = Self::from_toml_str(&content)?;
        info!("Loaded profile '{}' from {}", profile.name, path.display());
        Ok(profile)
    }

    pub async fn save(&self, path: &Path) -> Result<(), ProfileError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_toml_string()?).await?;
        debug!("Saved profile '{}' to {}", self.name, path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let ids: BTreeSet<u8> = self.sources.iter().map(|source| source.id).collect();
        if ids.len() != self.sources.len() {
            return Err(ProfileError::Invalid("duplicate source id".to_string()));
        }
        self.sources.iter().try_for_each(SourceDoc::validate)
    }

    pub fn build_sources(&self) -> Vec<BaseSource> {
        self.sources.iter().map(SourceDoc::build).collect()
    }
}

fn mapping(control_type: PhysicalControlType, index: u8) -> InputMapping {
    InputMapping::new(1, control_type, index, ControlOption::None)
}

fn control(id: u8, name: &str, input: InputMapping) -> ControlDoc {
    ControlDoc {
        id,
        name: name.to_string(),
        annotation: String::new(),
        input,
    }
}

fn command_set(key: ControlKey, reason: EventReason, command: &str) -> ActionSetDoc {
    ActionSetDoc {
        state: StateVector::root(),
        control: key,
        lists: vec![ActionListDoc {
            reason,
            actions: vec![ActionDecl::Command {
                command: command.to_string(),
            }],
        }],
    }
}

/// Profile for a single unified gamepad, used when none is configured
pub fn default_gamepad() -> Profile {
    let input = gamepad_capabilities(1, "Gamepad");
    let buttons = input
        .controls
        .iter()
        .filter(|c| c.control_type == PhysicalControlType::Button)
        .map(|c| control(c.control_index + 1, &c.name, mapping(c.control_type, c.control_index)))
        .collect();

    let dpad = ControlKey::new(ControlType::DPad, 1);
    // Stick press and movement events carry the centre direction
    let pointer = ControlKey::new(ControlType::Stick, 1).with_direction(Lrud::Centre);
    let mut pointer_set = command_set(pointer, EventReason::Moved, "pointer");
    pointer_set.lists.push(ActionListDoc {
        reason: EventReason::Pressed,
        actions: vec![ActionDecl::Command {
            command: "click".to_string(),
        }],
    });
    let mut action_sets = vec![
        command_set(ControlKey::new(ControlType::Button, 1), EventReason::Pressed, "confirm"),
        command_set(ControlKey::new(ControlType::Button, 2), EventReason::Pressed, "cancel"),
        pointer_set,
        ActionSetDoc {
            state: StateVector::root(),
            control: pointer.with_setting(crate::events::ControlSetting::DirectionMode),
            lists: vec![ActionListDoc {
                reason: EventReason::Activated,
                actions: vec![ActionDecl::SetDirectionMode {
                    mode: DirectionMode::Continuous,
                }],
            }],
        },
        ActionSetDoc {
            state: StateVector::root(),
            control: dpad.with_setting(crate::events::ControlSetting::DwellAndRepeat),
            lists: vec![ActionListDoc {
                reason: EventReason::Activated,
                actions: vec![ActionDecl::SetDwellAndAutorepeat {
                    hold_ms: 400,
                    repeat_ms: 100,
                }],
            }],
        },
    ];
    for (direction, name) in [
        (Lrud::Left, "left"),
        (Lrud::Right, "right"),
        (Lrud::Up, "up"),
        (Lrud::Down, "down"),
    ] {
        let mut set = command_set(dpad.with_direction(direction), EventReason::Directed, name);
        set.lists.push(ActionListDoc {
            reason: EventReason::DirectionRepeated,
            actions: vec![ActionDecl::Command {
                command: name.to_string(),
            }],
        });
        action_sets.push(set);
    }

    Profile {
        name: "Default gamepad".to_string(),
        sources: vec![SourceDoc {
            id: 1,
            name: "Gamepad".to_string(),
            inputs: vec![input],
            buttons,
            triggers: vec![
                control(1, "Left trigger", mapping(PhysicalControlType::Slider, 0)),
                control(2, "Right trigger", mapping(PhysicalControlType::Slider, 1)),
            ],
            sticks: vec![
                StickDoc {
                    id: 1,
                    name: "Left stick".to_string(),
                    annotation: String::new(),
                    x: mapping(PhysicalControlType::Axis, 0),
                    y: mapping(PhysicalControlType::Axis, 1),
                    button: mapping(PhysicalControlType::Button, 8),
                },
                StickDoc {
                    id: 2,
                    name: "Right stick".to_string(),
                    annotation: String::new(),
                    x: mapping(PhysicalControlType::Axis, 2),
                    y: mapping(PhysicalControlType::Axis, 3),
                    button: mapping(PhysicalControlType::Button, 9),
                },
            ],
            dpads: vec![control(1, "DPad", mapping(PhysicalControlType::Pov, 0))],
            button_diamonds: vec![DiamondDoc {
                id: 1,
                name: "Face buttons".to_string(),
                left: 3,
                right: 2,
                up: 4,
                down: 1,
            }],
            states: StateTree::new(vec![StateNode::new(1, "Default")]),
            auto_activations: AutoActivations::default(),
            action_sets,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::VirtualControl;
    use crate::events::SourceEvent;
    use crate::source::state::DEFAULT_ID;
    use crate::source::test_support::Recorder;
    use std::time::Instant;

    fn started(profile: &Profile, recorder: &mut Recorder) -> BaseSource {
        let mut source = profile.build_sources().remove(0);
        let initial = source.initial_state();
        source.set_current_state(&initial, recorder);
        source
    }

    fn route(source: &mut BaseSource, recorder: &mut Recorder, key: ControlKey, reason: EventReason) {
        let event = SourceEvent::new(source.id(), key, reason);
        source.handle_input_event(event, recorder);
    }

    const MINIMAL: &str = r#"
name = "Minimal"

[[sources]]
id = 1
name = "Pad"

[[sources.inputs]]
id = 1
name = "Pad"
device_id = 1

[[sources.inputs.controls]]
id = 1
name = "A"
control_type = "Button"
control_index = 0

[[sources.buttons]]
id = 1
name = "A"
input = { input_id = 1, control_type = "Button", control_index = 0 }

[[sources.states]]
id = 1
name = "Default"

[[sources.action_sets]]
control = { control_type = "Button", control_id = 1 }

[[sources.action_sets.lists]]
reason = "Pressed"
actions = [
    { type = "command", command = "confirm" },
    { type = "wait", ms = 50 },
    { type = "change_state", state = "1,-1,-1" },
]
"#;

    #[test]
    fn test_minimal_profile_defaults() {
        let profile = Profile::from_toml_str(MINIMAL).unwrap();
        let source = &profile.sources[0];
        assert_eq!(source.buttons[0].input.options, ControlOption::None);
        assert_eq!(source.action_sets[0].state, StateVector::new(DEFAULT_ID, DEFAULT_ID, DEFAULT_ID));
        assert_eq!(source.action_sets[0].control.direction, Lrud::None);
        assert_eq!(
            source.action_sets[0].lists[0].actions[1],
            ActionDecl::Wait { ms: 50 }
        );
        assert!(source.auto_activations.rules.is_empty());

        let built = profile.build_sources();
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].controls().len(), 1);
        assert_eq!(built[0].action_sets().len(), 1);
        assert_eq!(built[0].initial_state(), StateVector::new(1, DEFAULT_ID, DEFAULT_ID));
    }

    #[test]
    fn test_invalid_enum_aborts_load() {
        let broken = MINIMAL.replace("reason = \"Pressed\"", "reason = \"Squeezed\"");
        assert!(matches!(Profile::from_toml_str(&broken), Err(ProfileError::Parse(_))));
    }

    #[test]
    fn test_dangling_references_rejected() {
        let unknown_control = MINIMAL.replace("control_id = 1 }", "control_id = 7 }");
        assert!(matches!(
            Profile::from_toml_str(&unknown_control),
            Err(ProfileError::Invalid(_))
        ));

        let unknown_input = MINIMAL.replace("input = { input_id = 1", "input = { input_id = 4");
        assert!(matches!(
            Profile::from_toml_str(&unknown_input),
            Err(ProfileError::Invalid(_))
        ));

        let mut profile = Profile::from_toml_str(MINIMAL).unwrap();
        profile.sources[0].action_sets[0].state = StateVector::new(2, DEFAULT_ID, DEFAULT_ID);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_default_gamepad_round_trip() {
        let profile = default_gamepad();
        profile.validate().unwrap();

        let text = profile.to_toml_string().unwrap();
        let parsed = Profile::from_toml_str(&text).unwrap();
        assert_eq!(parsed, profile);

        let sources = parsed.build_sources();
        assert_eq!(sources[0].controls().len(), 10 + 2 + 2 + 1 + 1);
        assert_eq!(sources[0].required_device_ids().into_iter().collect::<Vec<_>>(), vec![1]);
    }

    // MINIMAL plus a second set for button 1, optionally scoped to a state
    fn with_second_set(state_line: &str) -> String {
        format!(
            r#"{MINIMAL}
[[sources.action_sets]]
{state_line}
control = {{ control_type = "Button", control_id = 1 }}

[[sources.action_sets.lists]]
reason = "Released"
actions = [{{ type = "command", command = "other" }}]
"#
        )
    }

    #[test]
    fn test_duplicate_action_sets_rejected() {
        assert!(matches!(
            Profile::from_toml_str(&with_second_set("")),
            Err(ProfileError::Invalid(_))
        ));
        // Same key in another state is fine
        assert!(Profile::from_toml_str(&with_second_set("state = \"1,-1,-1\"")).is_ok());
    }

    #[test]
    fn test_loaded_profile_routes_press() {
        let start = Instant::now();
        let profile = Profile::from_toml_str(MINIMAL).unwrap();
        let mut recorder = Recorder::at(start);
        let mut source = started(&profile, &mut recorder);

        route(
            &mut source,
            &mut recorder,
            ControlKey::new(ControlType::Button, 1),
            EventReason::Pressed,
        );
        assert_eq!(recorder.performed, vec!["confirm"]);
        assert_eq!(recorder.ongoing.len(), 1);

        let list_ref = recorder.ongoing[0];
        recorder.now = start + Duration::from_millis(50);
        assert!(!source.continue_actions(&list_ref, &mut recorder));
        assert_eq!(source.current_state(), StateVector::new(1, DEFAULT_ID, DEFAULT_ID));
    }

    #[test]
    fn test_default_gamepad_routes_commands() {
        let mut recorder = Recorder::new();
        let mut source = started(&default_gamepad(), &mut recorder);
        assert!(source.action_sets().iter().all(|set| set.is_active()));

        let stick = source
            .controls()
            .get(ControlType::Stick, 1)
            .map(|control| control.core().demand().clone());
        assert!(stick.is_some_and(|demand| {
            demand.wants(EventReason::Pressed) && demand.wants(EventReason::Moved)
        }));

        let pointer = ControlKey::new(ControlType::Stick, 1).with_direction(Lrud::Centre);
        let dpad = ControlKey::new(ControlType::DPad, 1);
        route(&mut source, &mut recorder, ControlKey::new(ControlType::Button, 1), EventReason::Pressed);
        route(&mut source, &mut recorder, ControlKey::new(ControlType::Button, 2), EventReason::Released);
        route(&mut source, &mut recorder, pointer, EventReason::Pressed);
        route(&mut source, &mut recorder, pointer, EventReason::Moved);
        route(&mut source, &mut recorder, dpad.with_direction(Lrud::Left), EventReason::Directed);
        route(&mut source, &mut recorder, dpad.with_direction(Lrud::Up), EventReason::DirectionRepeated);

        assert_eq!(recorder.performed, vec!["confirm", "click", "pointer", "left", "up"]);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("padsource-test-{}", std::process::id()))
            .join("profile.toml");
        let profile = default_gamepad();
        profile.save(&path).await.unwrap();
        let loaded = Profile::load(&path).await.unwrap();
        assert_eq!(loaded, profile);
        let _ = tokio::fs::remove_file(&path).await;
    }
}
