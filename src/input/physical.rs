//! Normalized model of the raw channels a device exposes.

use crate::lrud::Lrud;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a raw device channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalControlType {
    Pov,
    Axis,
    Slider,
    Button,
}

impl PhysicalControlType {
    pub fn code(self) -> u8 {
        match self {
            PhysicalControlType::Pov => 0,
            PhysicalControlType::Axis => 1,
            PhysicalControlType::Slider => 2,
            PhysicalControlType::Button => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PhysicalControlType::Pov),
            1 => Some(PhysicalControlType::Axis),
            2 => Some(PhysicalControlType::Slider),
            3 => Some(PhysicalControlType::Button),
            _ => None,
        }
    }
}

/// How a float channel is read by a particular input mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControlOption {
    #[default]
    None,
    Inverted,
    PositiveSide,
    NegativeSide,
}

impl ControlOption {
    pub fn code(self) -> u8 {
        match self {
            ControlOption::None => 0,
            ControlOption::Inverted => 1,
            ControlOption::PositiveSide => 2,
            ControlOption::NegativeSide => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ControlOption::None),
            1 => Some(ControlOption::Inverted),
            2 => Some(ControlOption::PositiveSide),
            3 => Some(ControlOption::NegativeSide),
            _ => None,
        }
    }
}

/// Last polled value of a channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    Bool(bool),
    Float(f32),
    Direction(Lrud),
}

impl ControlValue {
    /// Neutral value for a channel category
    pub fn neutral(control_type: PhysicalControlType) -> Self {
        match control_type {
            PhysicalControlType::Button => ControlValue::Bool(false),
            PhysicalControlType::Axis | PhysicalControlType::Slider => ControlValue::Float(0.0),
            PhysicalControlType::Pov => ControlValue::Direction(Lrud::Centre),
        }
    }
}

/// Device category reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceType {
    #[default]
    Controller,
    Gamepad,
    Wheel,
    ArcadeStick,
    FlightStick,
    DancePad,
    Guitar,
    DrumKit,
    Mouse,
    Keyboard,
    Joystick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalControl {
    pub id: u8,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    pub control_type: PhysicalControlType,
    pub control_index: u8,
    #[serde(default)]
    pub dead_zone: f32,
    #[serde(skip)]
    current_value: Option<ControlValue>,
}

impl PhysicalControl {
    pub fn new(
        id: u8,
        name: &str,
        short_name: &str,
        control_type: PhysicalControlType,
        control_index: u8,
        dead_zone: f32,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            short_name: short_name.to_string(),
            control_type,
            control_index,
            dead_zone,
            current_value: None,
        }
    }

    pub fn current_value(&self) -> ControlValue {
        self.current_value
            .unwrap_or_else(|| ControlValue::neutral(self.control_type))
    }

    pub fn set_current_value(&mut self, value: ControlValue) {
        self.current_value = Some(value);
    }

    pub fn get_bool_val(&self) -> bool {
        match self.current_value() {
            ControlValue::Bool(pressed) => pressed,
            _ => false,
        }
    }

    pub fn get_direction_val(&self) -> Lrud {
        match self.current_value() {
            ControlValue::Direction(direction) => direction,
            _ => Lrud::None,
        }
    }

    /// Reads the float value with the category specific transform for `option`
    pub fn get_float_val(&self, option: ControlOption) -> f32 {
        let ControlValue::Float(value) = self.current_value() else {
            return 0.0;
        };

        match (self.control_type, option) {
            (PhysicalControlType::Slider, ControlOption::Inverted) => 1.0 - value,
            (PhysicalControlType::Axis, ControlOption::Inverted) => -value,
            (PhysicalControlType::Axis, ControlOption::PositiveSide) => value.max(0.0),
            (PhysicalControlType::Axis, ControlOption::NegativeSide) => (-value).max(0.0),
            _ => value,
        }
    }

    pub fn has_non_default_value(&self) -> bool {
        match self.current_value() {
            ControlValue::Bool(pressed) => pressed,
            ControlValue::Direction(direction) => direction.is_directed(),
            ControlValue::Float(value) => value.abs() > self.dead_zone,
        }
    }
}

impl fmt::Display for PhysicalControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?} {})", self.name, self.control_type, self.control_index)
    }
}

/// A physical device as declared by a profile or described by a backend.
///
/// `bound_device` is the id of the connected device in the input manager.
/// The manager sets it, it never owns the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalInput {
    pub id: u8,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub device_type: DeviceType,
    pub device_id: u8,
    #[serde(default)]
    pub controls: Vec<PhysicalControl>,
    #[serde(skip)]
    bound_device: Option<u8>,
    #[serde(skip)]
    state_changed: bool,
}

impl PhysicalInput {
    pub fn new(id: u8, name: &str, device_type: DeviceType, device_id: u8) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: String::new(),
            device_type,
            device_id,
            controls: Vec::new(),
            bound_device: None,
            state_changed: false,
        }
    }

    pub fn with_controls(mut self, controls: Vec<PhysicalControl>) -> Self {
        self.controls = controls;
        self
    }

    pub fn control(&self, control_type: PhysicalControlType, index: u8) -> Option<&PhysicalControl> {
        self.controls
            .iter()
            .find(|c| c.control_type == control_type && c.control_index == index)
    }

    pub fn control_position(&self, control_type: PhysicalControlType, index: u8) -> Option<usize> {
        self.controls
            .iter()
            .position(|c| c.control_type == control_type && c.control_index == index)
    }

    pub fn bound_device(&self) -> Option<u8> {
        self.bound_device
    }

    pub fn set_bound_device(&mut self, device_id: Option<u8>) {
        self.bound_device = device_id;
    }

    pub fn is_state_changed(&self) -> bool {
        self.state_changed
    }

    /// Copies the latest device values into the controls. Controls keep
    /// their last value while unbound. Returns whether the bound device is
    /// connected.
    pub fn update_state(&mut self, devices: &dyn DeviceStates) -> bool {
        self.state_changed = false;
        let Some(device_id) = self.bound_device else {
            return false;
        };

        let Some(status) = devices.device_status(device_id) else {
            return false;
        };

        if status.state_changed {
            self.state_changed = true;
            for control in self.controls.iter_mut() {
                if let Some(value) = devices.input_value(device_id, control) {
                    control.set_current_value(value);
                }
            }
        }

        status.connected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    pub connected: bool,
    pub state_changed: bool,
}

/// Read access to the connected devices, keyed by device id
pub trait DeviceStates {
    fn device_status(&self, device_id: u8) -> Option<DeviceStatus>;
    fn input_value(&self, device_id: u8, control: &PhysicalControl) -> Option<ControlValue>;
}

/// Position of a bound physical control within a source's inputs, plus the
/// option the mapping reads it with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundControl {
    pub input: usize,
    pub control: usize,
    pub option: ControlOption,
}

/// Ordered physical inputs owned by a source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicalInputs {
    inputs: Vec<PhysicalInput>,
}

impl PhysicalInputs {
    pub fn new(inputs: Vec<PhysicalInput>) -> Self {
        Self { inputs }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhysicalInput> {
        self.inputs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PhysicalInput> {
        self.inputs.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn position(&self, input_id: u8) -> Option<usize> {
        self.inputs.iter().position(|input| input.id == input_id)
    }

    pub fn get(&self, index: usize) -> Option<&PhysicalInput> {
        self.inputs.get(index)
    }

    pub fn control(&self, bound: &BoundControl) -> Option<&PhysicalControl> {
        self.inputs
            .get(bound.input)
            .and_then(|input| input.controls.get(bound.control))
    }

    pub fn float_val(&self, bound: &BoundControl) -> f32 {
        self.control(bound)
            .map(|c| c.get_float_val(bound.option))
            .unwrap_or(0.0)
    }

    pub fn bool_val(&self, bound: &BoundControl) -> bool {
        self.control(bound).map(|c| c.get_bool_val()).unwrap_or(false)
    }

    pub fn direction_val(&self, bound: &BoundControl) -> Lrud {
        self.control(bound)
            .map(|c| c.get_direction_val())
            .unwrap_or(Lrud::None)
    }

    pub fn dead_zone(&self, bound: &BoundControl) -> f32 {
        self.control(bound).map(|c| c.dead_zone).unwrap_or(0.0)
    }

    #[cfg(test)]
    pub fn control_mut(&mut self, input: usize, control: usize) -> Option<&mut PhysicalControl> {
        self.inputs
            .get_mut(input)
            .and_then(|i| i.controls.get_mut(control))
    }
}
