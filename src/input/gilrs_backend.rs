//! Device backend built on gilrs.
//!
//! Devices gilrs has a mapping for are exposed as unified gamepads, unmapped
//! devices as generic joysticks. gilrs keeps the cached state, `pump` only
//! drains its event queue and bumps a per-device packet counter so gamepad
//! devices can detect changes cheaply.

use super::backend::{
    AxisRange, DeviceBackend, DeviceInfo, DeviceKind, GamepadButtons, GamepadReport,
    JoystickLayout, JoystickReport,
};
use crate::error::DeviceError;
use crate::lrud::Lrud;
use gilrs::{Axis, Button, Event, EventType, Gamepad, Gilrs, MappingSource};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

const JOYSTICK_AXES: [Axis; 4] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::RightStickX,
    Axis::RightStickY,
];

const JOYSTICK_SLIDERS: [Axis; 2] = [Axis::LeftZ, Axis::RightZ];

const JOYSTICK_BUTTONS: [Button; 15] = [
    Button::South,
    Button::East,
    Button::North,
    Button::West,
    Button::C,
    Button::Z,
    Button::LeftTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::Mode,
    Button::LeftThumb,
    Button::RightThumb,
];

const NATIVE_RANGE: AxisRange = AxisRange {
    min: -32768,
    max: 32767,
    inverted: false,
};

#[derive(Debug)]
pub struct GilrsBackend {
    gilrs: Gilrs,
    packets: HashMap<usize, u64>,
}

impl GilrsBackend {
    pub fn new() -> Result<Self, DeviceError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(DeviceError::Backend(e.to_string()));
            }
        };

        Ok(Self {
            gilrs,
            packets: HashMap::new(),
        })
    }

    fn gamepad(&self, handle: usize) -> Result<Gamepad<'_>, DeviceError> {
        self.gilrs
            .gamepads()
            .find(|(id, _)| usize::from(*id) == handle)
            .map(|(_, gamepad)| gamepad)
            .ok_or_else(|| DeviceError::NotFound(format!("gilrs device {}", handle)))
    }

    fn packet(&self, handle: usize) -> u64 {
        self.packets.get(&handle).copied().unwrap_or(0)
    }
}

impl DeviceBackend for GilrsBackend {
    fn pump(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            let handle = usize::from(id);
            match event {
                EventType::Connected => info!("Controller {} connected", handle),
                EventType::Disconnected => warn!("Controller {} disconnected", handle),
                EventType::ButtonRepeated(..) => {}
                _ => debug!("Controller {} event: {:?}", handle, event),
            }
            count_packet(&mut self.packets, handle, &event);
        }
    }

    fn available_devices(&self) -> Vec<DeviceInfo> {
        self.gilrs
            .gamepads()
            .map(|(id, gamepad)| {
                let kind = if matches!(gamepad.mapping_source(), MappingSource::None) {
                    DeviceKind::Joystick
                } else {
                    DeviceKind::Gamepad
                };
                DeviceInfo {
                    handle: usize::from(id),
                    name: gamepad.name().to_string(),
                    kind,
                }
            })
            .collect()
    }

    fn read_gamepad(&mut self, handle: usize) -> Result<GamepadReport, DeviceError> {
        let packet = self.packet(handle);
        let gamepad = self.gamepad(handle)?;

        let buttons = [
            Button::South,
            Button::East,
            Button::West,
            Button::North,
            Button::LeftTrigger,
            Button::RightTrigger,
            Button::Select,
            Button::Start,
            Button::LeftThumb,
            Button::RightThumb,
            Button::DPadUp,
            Button::DPadDown,
            Button::DPadLeft,
            Button::DPadRight,
        ]
        .into_iter()
        .filter(|button| gamepad.is_pressed(*button))
        .filter_map(map_button)
        .fold(0u16, |flags, flag| flags | flag);

        let trigger = |button| {
            let value = gamepad
                .button_data(button)
                .map(|data| data.value())
                .unwrap_or(0.0);
            (value.clamp(0.0, 1.0) * 255.0).round() as u8
        };
        let thumb = |axis| (gamepad.value(axis).clamp(-1.0, 1.0) * 32767.0).round() as i16;

        Ok(GamepadReport {
            packet,
            buttons,
            left_trigger: trigger(Button::LeftTrigger2),
            right_trigger: trigger(Button::RightTrigger2),
            thumb_lx: thumb(Axis::LeftStickX),
            thumb_ly: thumb(Axis::LeftStickY),
            thumb_rx: thumb(Axis::RightStickX),
            thumb_ry: thumb(Axis::RightStickY),
        })
    }

    fn joystick_layout(&self, handle: usize) -> Result<JoystickLayout, DeviceError> {
        self.gamepad(handle)?;
        Ok(JoystickLayout {
            axes: vec![NATIVE_RANGE; JOYSTICK_AXES.len()],
            sliders: vec![NATIVE_RANGE; JOYSTICK_SLIDERS.len()],
            buttons: JOYSTICK_BUTTONS.len(),
            povs: 1,
        })
    }

    fn read_joystick(&mut self, handle: usize) -> Result<JoystickReport, DeviceError> {
        let gamepad = self.gamepad(handle)?;
        if !gamepad.is_connected() {
            return Err(DeviceError::InputLost(format!("gilrs device {}", handle)));
        }

        let raw = |axis| (gamepad.value(axis).clamp(-1.0, 1.0) * 32767.0).round() as i32;
        let pov = Lrud::from_buttons(
            gamepad.is_pressed(Button::DPadLeft),
            gamepad.is_pressed(Button::DPadRight),
            gamepad.is_pressed(Button::DPadUp),
            gamepad.is_pressed(Button::DPadDown),
        );

        Ok(JoystickReport {
            axes: JOYSTICK_AXES.iter().map(|axis| raw(*axis)).collect(),
            sliders: JOYSTICK_SLIDERS.iter().map(|axis| raw(*axis)).collect(),
            buttons: JOYSTICK_BUTTONS
                .iter()
                .map(|button| gamepad.is_pressed(*button))
                .collect(),
            povs: vec![pov],
        })
    }

    fn acquire(&mut self, handle: usize) -> Result<(), DeviceError> {
        let gamepad = self
            .gamepad(handle)
            .map_err(|e| DeviceError::AcquireFailed(e.to_string()))?;
        if gamepad.is_connected() {
            Ok(())
        } else {
            Err(DeviceError::AcquireFailed(format!(
                "{} is not connected",
                gamepad.name()
            )))
        }
    }
}

// Bumps the packet number of a device, forgetting it once it disconnects
fn count_packet(packets: &mut HashMap<usize, u64>, handle: usize, event: &EventType) {
    match event {
        EventType::Disconnected => {
            packets.remove(&handle);
        }
        EventType::ButtonRepeated(..) => {}
        _ => *packets.entry(handle).or_default() += 1,
    }
}

// Maps a gilrs button to the unified gamepad flag
fn map_button(button: Button) -> Option<u16> {
    match button {
        Button::South => Some(GamepadButtons::A),
        Button::East => Some(GamepadButtons::B),
        Button::West => Some(GamepadButtons::X),
        Button::North => Some(GamepadButtons::Y),
        Button::Start => Some(GamepadButtons::START),
        Button::Select => Some(GamepadButtons::BACK),
        Button::LeftTrigger => Some(GamepadButtons::LEFT_SHOULDER),
        Button::RightTrigger => Some(GamepadButtons::RIGHT_SHOULDER),
        Button::LeftThumb => Some(GamepadButtons::LEFT_THUMB),
        Button::RightThumb => Some(GamepadButtons::RIGHT_THUMB),
        Button::DPadUp => Some(GamepadButtons::DPAD_UP),
        Button::DPadDown => Some(GamepadButtons::DPAD_DOWN),
        Button::DPadLeft => Some(GamepadButtons::DPAD_LEFT),
        Button::DPadRight => Some(GamepadButtons::DPAD_RIGHT),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_face_buttons() {
        assert_eq!(map_button(Button::South), Some(GamepadButtons::A));
        assert_eq!(map_button(Button::North), Some(GamepadButtons::Y));
        assert_eq!(map_button(Button::Select), Some(GamepadButtons::BACK));
    }

    #[test]
    fn test_disconnect_drops_packet_counter() {
        let mut packets = HashMap::new();
        count_packet(&mut packets, 3, &EventType::Connected);
        count_packet(&mut packets, 3, &EventType::Dropped);
        count_packet(&mut packets, 4, &EventType::Connected);
        assert_eq!(packets.get(&3), Some(&2));

        count_packet(&mut packets, 3, &EventType::Disconnected);
        assert!(!packets.contains_key(&3));
        assert_eq!(packets.get(&4), Some(&1));
    }

    #[test]
    fn test_unmapped_buttons() {
        assert_eq!(map_button(Button::Mode), None);
        assert_eq!(map_button(Button::LeftTrigger2), None);
    }
}
