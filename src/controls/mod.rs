//! Virtual controls
//!
//! A virtual control reads one or more bound physical channels, derives a
//! pressed, direction or value state from them and raises typed events when
//! that state changes or a dwell / repeat timer fires.
//!
//! Variants share behaviour by composition: [`ControlCore`] carries
//! identity, binding, event demand and the press timers, and directional
//! variants add a [`DirectionTiming`].

pub mod button;
pub mod diamond;
pub mod direction;
pub mod dpad;
pub mod press;
pub mod stick;
pub mod trigger;

pub use button::Button;
pub use diamond::ButtonDiamond;
pub use direction::DirectionTiming;
pub use dpad::DPad;
pub use press::PressTiming;
pub use stick::Stick;
pub use trigger::Trigger;

use crate::config::ConfigSource;
use crate::events::{ControlEvent, ControlKey, ControlSetting, ControlType, EventReason};
use crate::input::{BoundControl, InputMapping, PhysicalInputs};
use crate::timing::{OverrideStack, DEFAULT_HOLD_TIME_MS, DEFAULT_REPEAT_INTERVAL_MS};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Instant;

/// How a directional control classifies and reports its direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DirectionMode {
    None,
    NonDirectional,
    TwoWay,
    FourWay,
    #[default]
    EightWay,
    AxisStyle,
    Continuous,
}

/// How many active action lists want each event reason
#[derive(Debug, Clone, Default)]
pub struct EventDemand {
    counts: [u32; EventReason::COUNT],
    total: u32,
}

impl EventDemand {
    pub fn enable(&mut self, reasons: &[EventReason], enable: bool) {
        for reason in reasons {
            let count = &mut self.counts[reason.index()];
            if enable {
                *count += 1;
                self.total += 1;
            } else if *count > 0 {
                *count -= 1;
                self.total -= 1;
            }
        }
    }

    pub fn wants(&self, reason: EventReason) -> bool {
        self.counts[reason.index()] != 0
    }

    pub fn wants_any(&self, reasons: &[EventReason]) -> bool {
        reasons.iter().any(|reason| self.wants(*reason))
    }

    pub fn is_active(&self) -> bool {
        self.total != 0
    }
}

/// State every variant carries
#[derive(Debug, Clone)]
pub struct ControlCore {
    pub id: u8,
    pub name: String,
    pub mappings: Vec<InputMapping>,
    bound: Vec<Option<BoundControl>>,
    binding_valid: bool,
    demand: EventDemand,
    hold_times: OverrideStack<u64>,
    repeat_intervals: OverrideStack<u64>,
    press: PressTiming,
}

impl ControlCore {
    pub fn new(id: u8, name: &str, mappings: Vec<InputMapping>) -> Self {
        Self {
            id,
            name: name.to_string(),
            mappings,
            bound: Vec::new(),
            binding_valid: false,
            demand: EventDemand::default(),
            hold_times: OverrideStack::new(DEFAULT_HOLD_TIME_MS),
            repeat_intervals: OverrideStack::new(DEFAULT_REPEAT_INTERVAL_MS),
            press: PressTiming::new(),
        }
    }

    /// Stores the resolved slots. The binding is valid when the slot count
    /// matches `arity` and at least `min_bound` slots resolved.
    pub fn set_bound(&mut self, bound: Vec<Option<BoundControl>>, arity: usize, min_bound: usize) {
        let resolved = bound.iter().filter(|slot| slot.is_some()).count();
        self.binding_valid = bound.len() == arity && resolved >= min_bound.max(1);
        self.bound = bound;
    }

    pub fn bound(&self, slot: usize) -> Option<&BoundControl> {
        self.bound.get(slot).and_then(|b| b.as_ref())
    }

    pub fn is_binding_valid(&self) -> bool {
        self.binding_valid
    }

    pub fn demand(&self) -> &EventDemand {
        &self.demand
    }

    pub fn press(&self) -> &PressTiming {
        &self.press
    }

    pub fn press_mut(&mut self) -> &mut PressTiming {
        &mut self.press
    }

    /// Pushes or pops a hold time override, returning the one now in force
    pub fn apply_hold_time(&mut self, hold_ms: u64, enable: bool) -> u64 {
        self.hold_times.apply(hold_ms, enable);
        let current = self.hold_times.current();
        self.press.set_hold_time(current);
        current
    }

    /// Pushes or pops a repeat interval override, returning the one now in
    /// force
    pub fn apply_repeat_interval(&mut self, repeat_ms: u64, enable: bool) -> u64 {
        self.repeat_intervals.apply(repeat_ms, enable);
        let current = self.repeat_intervals.current();
        self.press.set_repeat_interval(current);
        current
    }

    pub fn raise_press_events(&mut self, key: ControlKey, now: Instant, out: &mut Vec<ControlEvent>) {
        let Self { press, demand, .. } = self;
        press.raise_events(demand, key, now, out);
    }
}

/// Common capability set of the virtual control variants
pub trait VirtualControl: Debug {
    fn core(&self) -> &ControlCore;

    fn core_mut(&mut self) -> &mut ControlCore;

    fn control_type(&self) -> ControlType;

    fn id(&self) -> u8 {
        self.core().id
    }

    fn name(&self) -> &str {
        &self.core().name
    }

    /// Key of the plain (non-directional, non-setting) events
    fn key(&self) -> ControlKey {
        ControlKey::new(self.control_type(), self.id())
    }

    fn input_mappings(&self) -> &[InputMapping] {
        &self.core().mappings
    }

    /// Stores resolved slots, one per input mapping, and validates them
    fn set_bound_controls(&mut self, bound: Vec<Option<BoundControl>>, inputs: &PhysicalInputs);

    fn is_binding_valid(&self) -> bool {
        self.core().is_binding_valid()
    }

    fn is_pressable(&self) -> bool {
        false
    }

    fn apply_config(&mut self, _config: &dyn ConfigSource) {}

    /// Recomputes state from the bound channels. No-op when unbound.
    fn update_state(&mut self, _inputs: &PhysicalInputs) {}

    /// Appends the events due at `now`
    fn raise_events(&mut self, now: Instant, out: &mut Vec<ControlEvent>) {
        if self.is_pressable() {
            let key = self.key();
            self.core_mut().raise_press_events(key, now, out);
        }
    }

    /// Counts action list demand for `reasons` up or down
    fn enable_input_events(&mut self, reasons: &[EventReason], enable: bool) {
        self.core_mut().demand.enable(reasons, enable);
    }

    /// True while any action list wants events from this control
    fn is_active(&self) -> bool {
        self.core().demand().is_active()
    }

    fn apply_hold_time(&mut self, hold_ms: u64, enable: bool) {
        self.core_mut().apply_hold_time(hold_ms, enable);
    }

    fn apply_repeat_interval(&mut self, repeat_ms: u64, enable: bool) {
        self.core_mut().apply_repeat_interval(repeat_ms, enable);
    }

    fn apply_direction_mode(&mut self, _mode: DirectionMode, _enable: bool) {}

    fn supported_event_reasons(&self, key: &ControlKey) -> Vec<EventReason>;

    fn is_reason_supported(&self, key: &ControlKey, reason: EventReason) -> bool {
        self.supported_event_reasons(key).contains(&reason)
    }
}

const ALL_REASONS: [EventReason; EventReason::COUNT] = [
    EventReason::None,
    EventReason::Directed,
    EventReason::DirectedLong,
    EventReason::DirectionRepeated,
    EventReason::DirectedShort,
    EventReason::Undirected,
    EventReason::Moved,
    EventReason::Pressed,
    EventReason::PressedLong,
    EventReason::PressRepeated,
    EventReason::PressedShort,
    EventReason::Released,
    EventReason::Activated,
];

const PRESS_REASONS: [EventReason; 5] = [
    EventReason::Pressed,
    EventReason::PressedShort,
    EventReason::PressedLong,
    EventReason::PressRepeated,
    EventReason::Released,
];

// Reasons for a press-only control (button, trigger)
fn press_reasons(key: &ControlKey) -> Vec<EventReason> {
    if key.setting == ControlSetting::None {
        PRESS_REASONS.to_vec()
    } else {
        vec![EventReason::Activated]
    }
}

// Filters every reason through a per-variant predicate
fn reasons_matching(key: &ControlKey, supported: impl Fn(EventReason) -> bool) -> Vec<EventReason> {
    if key.setting != ControlSetting::None {
        return vec![EventReason::Activated];
    }
    ALL_REASONS.into_iter().filter(|reason| supported(*reason)).collect()
}

/// Virtual controls of one source, addressable by type and id
#[derive(Debug, Default)]
pub struct ControlSet {
    controls: Vec<Box<dyn VirtualControl>>,
}

impl ControlSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, control: Box<dyn VirtualControl>) {
        self.controls.push(control);
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn VirtualControl> {
        self.controls.iter().map(|c| c.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn VirtualControl>> {
        self.controls.iter_mut()
    }

    pub fn get(&self, control_type: ControlType, id: u8) -> Option<&dyn VirtualControl> {
        self.controls
            .iter()
            .find(|c| c.control_type() == control_type && c.id() == id)
            .map(|c| c.as_ref())
    }

    pub fn get_mut(&mut self, control_type: ControlType, id: u8) -> Option<&mut Box<dyn VirtualControl>> {
        self.controls
            .iter_mut()
            .find(|c| c.control_type() == control_type && c.id() == id)
    }

    /// Control an event key addresses
    pub fn for_key(&mut self, key: &ControlKey) -> Option<&mut Box<dyn VirtualControl>> {
        self.get_mut(key.control_type, key.control_id)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::input::{
        BoundControl, ControlOption, ControlValue, DeviceType, PhysicalControl,
        PhysicalControlType, PhysicalInput, PhysicalInputs,
    };
    use crate::lrud::Lrud;

    /// One input with a POV, two axes, a slider and a button, all bound
    pub fn inputs() -> PhysicalInputs {
        let mut input = PhysicalInput::new(1, "Pad", DeviceType::Gamepad, 1).with_controls(vec![
            PhysicalControl::new(1, "DPad", "DP", PhysicalControlType::Pov, 0, 0.0),
            PhysicalControl::new(2, "X1", "X1", PhysicalControlType::Axis, 0, 0.25),
            PhysicalControl::new(3, "Y1", "Y1", PhysicalControlType::Axis, 1, 0.25),
            PhysicalControl::new(4, "T1", "T1", PhysicalControlType::Slider, 0, 0.1),
            PhysicalControl::new(5, "A", "A", PhysicalControlType::Button, 0, 0.0),
        ]);
        input.set_bound_device(Some(1));
        PhysicalInputs::new(vec![input])
    }

    pub fn slot(control: usize) -> Option<BoundControl> {
        Some(BoundControl {
            input: 0,
            control,
            option: ControlOption::None,
        })
    }

    pub const POV: usize = 0;
    pub const X: usize = 1;
    pub const Y: usize = 2;
    pub const SLIDER: usize = 3;
    pub const BUTTON: usize = 4;

    pub fn set(inputs: &mut PhysicalInputs, control: usize, value: ControlValue) {
        if let Some(c) = inputs.control_mut(0, control) {
            c.set_current_value(value);
        }
    }

    pub fn set_stick(inputs: &mut PhysicalInputs, x: f32, y: f32) {
        set(inputs, X, ControlValue::Float(x));
        set(inputs, Y, ControlValue::Float(y));
    }

    pub fn set_pov(inputs: &mut PhysicalInputs, direction: Lrud) {
        set(inputs, POV, ControlValue::Direction(direction));
    }
}
