//! Platform seam: everything the device layer needs from the OS.

use crate::error::DeviceError;
use crate::lrud::Lrud;
use std::fmt::Debug;

/// Which device strategy a backend device is driven by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Fixed layout controller (sticks, triggers, face buttons, d-pad)
    Gamepad,
    /// Arbitrary axes, sliders, buttons and hats
    Joystick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Backend specific handle, stable while the device stays plugged in
    pub handle: usize,
    pub name: String,
    pub kind: DeviceKind,
}

/// Gamepad button flags
pub struct GamepadButtons;

impl GamepadButtons {
    pub const DPAD_UP: u16 = 0x0001;
    pub const DPAD_DOWN: u16 = 0x0002;
    pub const DPAD_LEFT: u16 = 0x0004;
    pub const DPAD_RIGHT: u16 = 0x0008;
    pub const START: u16 = 0x0010;
    pub const BACK: u16 = 0x0020;
    pub const LEFT_THUMB: u16 = 0x0040;
    pub const RIGHT_THUMB: u16 = 0x0080;
    pub const LEFT_SHOULDER: u16 = 0x0100;
    pub const RIGHT_SHOULDER: u16 = 0x0200;
    pub const A: u16 = 0x1000;
    pub const B: u16 = 0x2000;
    pub const X: u16 = 0x4000;
    pub const Y: u16 = 0x8000;
}

/// Raw state of a unified gamepad. `packet` changes whenever any value
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GamepadReport {
    pub packet: u64,
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

impl GamepadReport {
    pub fn is_pressed(&self, flag: u16) -> bool {
        self.buttons & flag != 0
    }
}

/// Native range of one axis or slider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
    /// Device reports positive values downwards
    pub inverted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoystickLayout {
    pub axes: Vec<AxisRange>,
    pub sliders: Vec<AxisRange>,
    pub buttons: usize,
    pub povs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoystickReport {
    pub axes: Vec<i32>,
    pub sliders: Vec<i32>,
    pub buttons: Vec<bool>,
    pub povs: Vec<Lrud>,
}

/// Source of raw device state
pub trait DeviceBackend: Debug {
    /// Processes pending OS events. Called once per tick before polling.
    fn pump(&mut self);

    fn available_devices(&self) -> Vec<DeviceInfo>;

    fn read_gamepad(&mut self, handle: usize) -> Result<GamepadReport, DeviceError>;

    fn joystick_layout(&self, handle: usize) -> Result<JoystickLayout, DeviceError>;

    fn read_joystick(&mut self, handle: usize) -> Result<JoystickReport, DeviceError>;

    /// Re-acquires a device after input was lost
    fn acquire(&mut self, handle: usize) -> Result<(), DeviceError>;
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::HashMap;

    /// In-memory backend for tests
    #[derive(Debug, Default)]
    pub struct FakeBackend {
        pub devices: Vec<DeviceInfo>,
        pub gamepads: HashMap<usize, GamepadReport>,
        pub layouts: HashMap<usize, JoystickLayout>,
        pub joysticks: HashMap<usize, JoystickReport>,
        /// Handles whose next read fails with `InputLost`
        pub lost: Vec<usize>,
        /// Handles that cannot be re-acquired
        pub unacquirable: Vec<usize>,
        pub acquire_calls: usize,
        pub pumps: usize,
    }

    impl FakeBackend {
        pub fn add_gamepad(&mut self, handle: usize, name: &str) {
            self.devices.push(DeviceInfo {
                handle,
                name: name.to_string(),
                kind: DeviceKind::Gamepad,
            });
            self.gamepads.insert(handle, GamepadReport::default());
        }

        pub fn add_joystick(&mut self, handle: usize, name: &str, layout: JoystickLayout) {
            self.devices.push(DeviceInfo {
                handle,
                name: name.to_string(),
                kind: DeviceKind::Joystick,
            });
            let report = JoystickReport {
                axes: layout.axes.iter().map(|r| (r.min + r.max) / 2).collect(),
                sliders: layout.sliders.iter().map(|r| r.min).collect(),
                buttons: vec![false; layout.buttons],
                povs: vec![Lrud::Centre; layout.povs],
            };
            self.layouts.insert(handle, layout);
            self.joysticks.insert(handle, report);
        }

        pub fn unplug(&mut self, handle: usize) {
            self.devices.retain(|d| d.handle != handle);
            self.gamepads.remove(&handle);
            self.joysticks.remove(&handle);
        }

        pub fn gamepad_mut(&mut self, handle: usize) -> &mut GamepadReport {
            self.gamepads.entry(handle).or_default()
        }
    }

    impl DeviceBackend for FakeBackend {
        fn pump(&mut self) {
            self.pumps += 1;
        }

        fn available_devices(&self) -> Vec<DeviceInfo> {
            self.devices.clone()
        }

        fn read_gamepad(&mut self, handle: usize) -> Result<GamepadReport, DeviceError> {
            self.gamepads
                .get(&handle)
                .copied()
                .ok_or_else(|| DeviceError::NotFound(format!("gamepad {}", handle)))
        }

        fn joystick_layout(&self, handle: usize) -> Result<JoystickLayout, DeviceError> {
            self.layouts
                .get(&handle)
                .cloned()
                .ok_or_else(|| DeviceError::NotFound(format!("joystick {}", handle)))
        }

        fn read_joystick(&mut self, handle: usize) -> Result<JoystickReport, DeviceError> {
            if let Some(pos) = self.lost.iter().position(|h| *h == handle) {
                self.lost.remove(pos);
                return Err(DeviceError::InputLost(format!("joystick {}", handle)));
            }
            self.joysticks
                .get(&handle)
                .cloned()
                .ok_or_else(|| DeviceError::NotFound(format!("joystick {}", handle)))
        }

        fn acquire(&mut self, handle: usize) -> Result<(), DeviceError> {
            self.acquire_calls += 1;
            if self.unacquirable.contains(&handle) {
                return Err(DeviceError::AcquireFailed(format!("joystick {}", handle)));
            }
            Ok(())
        }
    }
}
