//! Owns the connected devices and binds profile inputs to them.

use super::backend::{DeviceBackend, DeviceInfo, DeviceKind};
use super::device::InputDevice;
use super::gamepad::{GamepadDevice, MAX_GAMEPADS};
use super::joystick::{JoystickDevice, FIRST_JOYSTICK_ID};
use super::physical::{BoundControl, ControlValue, DeviceStatus, DeviceStates, PhysicalControl};
use crate::error::DeviceError;
use crate::source::BaseSource;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

#[derive(Debug)]
struct DeviceSlot {
    device: Box<dyn InputDevice>,
    required: bool,
}

#[derive(Debug)]
pub struct InputManager {
    backend: Box<dyn DeviceBackend>,
    devices: BTreeMap<u8, DeviceSlot>,
}

impl InputManager {
    pub fn new(backend: Box<dyn DeviceBackend>) -> Self {
        Self {
            backend,
            devices: BTreeMap::new(),
        }
    }

    pub fn device(&self, device_id: u8) -> Option<&dyn InputDevice> {
        self.devices.get(&device_id).map(|slot| slot.device.as_ref())
    }

    pub fn device_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.devices.keys().copied()
    }

    pub fn is_required(&self, device_id: u8) -> bool {
        self.devices
            .get(&device_id)
            .map(|slot| slot.required)
            .unwrap_or(false)
    }

    /// Assigns device ids to what the backend currently offers: unified
    /// gamepads take 1..=4, generic joysticks count up from 5.
    fn enumerate(&self) -> Vec<(u8, DeviceInfo)> {
        let mut next_gamepad = 1u8;
        let mut next_joystick = FIRST_JOYSTICK_ID;
        let mut assigned = Vec::new();

        for info in self.backend.available_devices() {
            match info.kind {
                DeviceKind::Gamepad if next_gamepad <= MAX_GAMEPADS => {
                    assigned.push((next_gamepad, info));
                    next_gamepad += 1;
                }
                DeviceKind::Gamepad => {
                    debug!("Ignoring gamepad {}, all slots in use", info.name);
                }
                DeviceKind::Joystick => {
                    assigned.push((next_joystick, info));
                    next_joystick = next_joystick.saturating_add(1);
                }
            }
        }

        assigned
    }

    fn create_device(
        &mut self,
        device_id: u8,
        info: &DeviceInfo,
    ) -> Result<Box<dyn InputDevice>, DeviceError> {
        let mut device: Box<dyn InputDevice> = match info.kind {
            DeviceKind::Gamepad => Box::new(GamepadDevice::new(device_id, info.handle, &info.name)),
            DeviceKind::Joystick => {
                let layout = self.backend.joystick_layout(info.handle)?;
                Box::new(JoystickDevice::new(device_id, info.handle, &info.name, &layout))
            }
        };
        device.initialise_state(self.backend.as_mut())?;
        Ok(device)
    }

    /// Drops stale devices and adds newly available ones. Only devices in
    /// `required` are created unless `add_all` is set. Returns whether the
    /// device set changed. Probe failures are logged and skipped.
    pub fn refresh_connected_device_list(&mut self, required: &BTreeSet<u8>, add_all: bool) -> bool {
        self.backend.pump();
        let available = self.enumerate();
        let mut changed = false;

        let before = self.devices.len();
        self.devices.retain(|id, slot| {
            let still_offered = available
                .iter()
                .any(|(available_id, info)| available_id == id && info.handle == slot.device.handle());
            let keep = slot.device.is_connected()
                && still_offered
                && (add_all || required.contains(id));
            if !keep {
                info!("Removing device {} ({})", id, slot.device.capabilities().name);
            }
            keep
        });
        changed |= self.devices.len() != before;

        for (device_id, info) in available.iter() {
            if self.devices.contains_key(device_id) {
                continue;
            }
            if !add_all && !required.contains(device_id) {
                continue;
            }

            match self.create_device(*device_id, info) {
                Ok(device) => {
                    info!("Added device {} ({:?}: {})", device_id, info.kind, info.name);
                    self.devices.insert(
                        *device_id,
                        DeviceSlot {
                            device,
                            required: required.contains(device_id),
                        },
                    );
                    changed = true;
                }
                Err(e) => warn!("Unable to open device {} ({}): {}", device_id, info.name, e),
            }
        }

        for (id, slot) in self.devices.iter_mut() {
            slot.required = required.contains(id);
        }

        if changed {
            info!("Connected devices: {:?}", self.devices.keys().collect::<Vec<_>>());
        }
        changed
    }

    /// Binds every physical input of the source to a connected device by
    /// id, then resolves each virtual control's mappings to concrete
    /// channels. Mappings the device cannot serve stay unbound. Returns
    /// whether every declared input found a connected device.
    pub fn bind_profile(&mut self, source: &mut BaseSource) -> bool {
        let mut all_bound = true;

        for input in source.physical_inputs_mut().iter_mut() {
            let bound = match self.devices.get_mut(&input.device_id) {
                Some(slot) if slot.device.is_connected() => {
                    slot.required = true;
                    Some(input.device_id)
                }
                _ => None,
            };
            if bound.is_none() {
                warn!(
                    "Input {} ({}) has no connected device {}",
                    input.id, input.name, input.device_id
                );
                all_bound = false;
            }
            input.set_bound_device(bound);
        }

        source.bind_controls(|mapping, inputs| {
            let input_index = inputs.position(mapping.input_id)?;
            let input = inputs.get(input_index)?;
            let device = self.devices.get(&input.bound_device()?)?;
            let control_index = input.control_position(mapping.control_type, mapping.control_index)?;
            device
                .device
                .capabilities()
                .control(mapping.control_type, mapping.control_index)?;
            Some(BoundControl {
                input: input_index,
                control: control_index,
                option: mapping.options,
            })
        });

        info!("Bound source {}: fully bound = {}", source.name(), all_bound);
        all_bound
    }

    /// Polls every required device. False if any of them is disconnected.
    pub fn update_state(&mut self) -> bool {
        self.backend.pump();
        let mut success = true;
        for slot in self.devices.values_mut().filter(|slot| slot.required) {
            slot.device.update_state(self.backend.as_mut());
            success &= slot.device.is_connected();
        }
        success
    }
}

impl DeviceStates for InputManager {
    fn device_status(&self, device_id: u8) -> Option<DeviceStatus> {
        self.device(device_id).map(|device| DeviceStatus {
            connected: device.is_connected(),
            state_changed: device.is_state_changed(),
        })
    }

    fn input_value(&self, device_id: u8, control: &PhysicalControl) -> Option<ControlValue> {
        self.device(device_id)?.get_input_value(control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::backend::fake::FakeBackend;
    use crate::input::backend::{AxisRange, JoystickLayout};

    fn ids(list: &[u8]) -> BTreeSet<u8> {
        list.iter().copied().collect()
    }

    fn backend_with_devices() -> FakeBackend {
        let mut backend = FakeBackend::default();
        backend.add_gamepad(10, "Pad A");
        backend.add_joystick(
            11,
            "Stick",
            JoystickLayout {
                axes: vec![AxisRange { min: 0, max: 1023, inverted: true }; 2],
                sliders: vec![],
                buttons: 2,
                povs: 0,
            },
        );
        backend.add_gamepad(12, "Pad B");
        backend
    }

    #[test]
    fn test_refresh_adds_required_devices_only() {
        let mut manager = InputManager::new(Box::new(backend_with_devices()));
        assert!(manager.refresh_connected_device_list(&ids(&[2, 5]), false));
        assert_eq!(manager.device_ids().collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(manager.device(2).unwrap().capabilities().name, "Pad B");
        assert!(manager.is_required(5));

        // Nothing new the second time
        assert!(!manager.refresh_connected_device_list(&ids(&[2, 5]), false));
    }

    #[test]
    fn test_refresh_add_all() {
        let mut manager = InputManager::new(Box::new(backend_with_devices()));
        assert!(manager.refresh_connected_device_list(&ids(&[]), true));
        assert_eq!(manager.device_ids().collect::<Vec<_>>(), vec![1, 2, 5]);
        assert!(!manager.is_required(1));
    }

    #[test]
    fn test_refresh_drops_no_longer_required() {
        let mut manager = InputManager::new(Box::new(backend_with_devices()));
        manager.refresh_connected_device_list(&ids(&[1, 2]), false);
        assert!(manager.refresh_connected_device_list(&ids(&[1]), false));
        assert_eq!(manager.device_ids().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_update_state_polls_required() {
        let mut manager = InputManager::new(Box::new(backend_with_devices()));
        manager.refresh_connected_device_list(&ids(&[1]), false);
        assert!(manager.update_state());
        let status = manager.device_status(1).unwrap();
        assert!(status.connected);
    }

    #[test]
    fn test_failed_device_is_skipped() {
        let mut backend = backend_with_devices();
        // Listed but cannot be read
        backend.gamepads.remove(&10);
        let mut manager = InputManager::new(Box::new(backend));
        assert!(manager.refresh_connected_device_list(&ids(&[1, 2]), false));
        assert_eq!(manager.device_ids().collect::<Vec<_>>(), vec![2]);
    }
}
