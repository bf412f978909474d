//! Unified gamepad strategy: a fixed layout of two sticks, two triggers,
//! ten buttons and a d-pad, read from a single packet-numbered report.

use super::backend::{DeviceBackend, GamepadButtons, GamepadReport};
use super::device::InputDevice;
use super::physical::{
    ControlValue, DeviceType, PhysicalControl, PhysicalControlType, PhysicalInput,
};
use crate::error::DeviceError;
use crate::lrud::Lrud;
use tracing::{debug, info, warn};

/// Highest device id a unified gamepad can take
pub const MAX_GAMEPADS: u8 = 4;

const THUMB_DEAD_ZONE: f32 = 7849.0 / 32768.0;
const TRIGGER_DEAD_ZONE: f32 = 30.0 / 255.0;

const AXIS_NAMES: [&str; 4] = ["X1", "Y1", "X2", "Y2"];
const SLIDER_NAMES: [&str; 2] = ["T1", "T2"];

const BUTTONS: [(&str, &str, u16); 10] = [
    ("A", "A", GamepadButtons::A),
    ("B", "B", GamepadButtons::B),
    ("X", "X", GamepadButtons::X),
    ("Y", "Y", GamepadButtons::Y),
    ("Left shoulder", "LS", GamepadButtons::LEFT_SHOULDER),
    ("Right shoulder", "RS", GamepadButtons::RIGHT_SHOULDER),
    ("Back", "Bk", GamepadButtons::BACK),
    ("Start", "St", GamepadButtons::START),
    ("Left thumb", "LT", GamepadButtons::LEFT_THUMB),
    ("Right thumb", "RT", GamepadButtons::RIGHT_THUMB),
];

/// Channel description shared by every unified gamepad
pub fn gamepad_capabilities(device_id: u8, name: &str) -> PhysicalInput {
    let mut controls = Vec::new();
    let mut next_id = 1u8;
    let mut push = |name: &str, short: &str, control_type, index, dead_zone| {
        controls.push(PhysicalControl::new(
            next_id, name, short, control_type, index, dead_zone,
        ));
        next_id += 1;
    };

    push("DPad", "DP", PhysicalControlType::Pov, 0, 0.0);
    for (index, axis) in AXIS_NAMES.iter().enumerate() {
        push(axis, axis, PhysicalControlType::Axis, index as u8, THUMB_DEAD_ZONE);
    }
    for (index, slider) in SLIDER_NAMES.iter().enumerate() {
        push(slider, slider, PhysicalControlType::Slider, index as u8, TRIGGER_DEAD_ZONE);
    }
    for (index, (name, short, _)) in BUTTONS.iter().enumerate() {
        push(name, short, PhysicalControlType::Button, index as u8, 0.0);
    }

    PhysicalInput::new(device_id, name, DeviceType::Gamepad, device_id).with_controls(controls)
}

#[derive(Debug)]
pub struct GamepadDevice {
    handle: usize,
    capabilities: PhysicalInput,
    connected: bool,
    state_changed: bool,
    last_packet: Option<u64>,
    report: GamepadReport,
}

impl GamepadDevice {
    pub fn new(device_id: u8, handle: usize, name: &str) -> Self {
        Self {
            handle,
            capabilities: gamepad_capabilities(device_id, name),
            connected: false,
            state_changed: false,
            last_packet: None,
            report: GamepadReport::default(),
        }
    }

    fn axis_value(&self, index: u8) -> Option<f32> {
        let raw = match index {
            0 => self.report.thumb_lx,
            1 => self.report.thumb_ly,
            2 => self.report.thumb_rx,
            3 => self.report.thumb_ry,
            _ => return None,
        };
        Some((raw as f32 / 32768.0).clamp(-1.0, 1.0))
    }

    fn slider_value(&self, index: u8) -> Option<f32> {
        let raw = match index {
            0 => self.report.left_trigger,
            1 => self.report.right_trigger,
            _ => return None,
        };
        Some(raw as f32 / 255.0)
    }

    fn dpad(&self) -> Lrud {
        Lrud::from_buttons(
            self.report.is_pressed(GamepadButtons::DPAD_LEFT),
            self.report.is_pressed(GamepadButtons::DPAD_RIGHT),
            self.report.is_pressed(GamepadButtons::DPAD_UP),
            self.report.is_pressed(GamepadButtons::DPAD_DOWN),
        )
    }
}

impl InputDevice for GamepadDevice {
    fn device_id(&self) -> u8 {
        self.capabilities.device_id
    }

    fn handle(&self) -> usize {
        self.handle
    }

    fn capabilities(&self) -> &PhysicalInput {
        &self.capabilities
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn is_state_changed(&self) -> bool {
        self.state_changed
    }

    fn initialise_state(&mut self, backend: &mut dyn DeviceBackend) -> Result<(), DeviceError> {
        let report = backend.read_gamepad(self.handle)?;
        info!(
            "Gamepad {} ({}) initialised at packet {}",
            self.device_id(),
            self.capabilities.name,
            report.packet
        );
        self.report = report;
        self.last_packet = Some(report.packet);
        self.connected = true;
        self.state_changed = true;
        Ok(())
    }

    fn update_state(&mut self, backend: &mut dyn DeviceBackend) {
        match backend.read_gamepad(self.handle) {
            Ok(report) => {
                self.state_changed = self.last_packet != Some(report.packet);
                if self.state_changed {
                    debug!("Gamepad {} packet {}", self.device_id(), report.packet);
                }
                self.last_packet = Some(report.packet);
                self.report = report;
                self.connected = true;
            }
            Err(e) => {
                if self.connected {
                    warn!("Gamepad {} disconnected: {}", self.device_id(), e);
                    // Neutral state so nothing stays held
                    self.report = GamepadReport::default();
                    self.last_packet = None;
                    self.state_changed = true;
                } else {
                    self.state_changed = false;
                }
                self.connected = false;
            }
        }
    }

    fn get_input_value(&self, control: &PhysicalControl) -> Option<ControlValue> {
        match control.control_type {
            PhysicalControlType::Pov if control.control_index == 0 => {
                Some(ControlValue::Direction(self.dpad()))
            }
            PhysicalControlType::Pov => None,
            PhysicalControlType::Axis => self.axis_value(control.control_index).map(ControlValue::Float),
            PhysicalControlType::Slider => {
                self.slider_value(control.control_index).map(ControlValue::Float)
            }
            PhysicalControlType::Button => BUTTONS
                .get(control.control_index as usize)
                .map(|(_, _, flag)| ControlValue::Bool(self.report.is_pressed(*flag))),
        }
    }
}
