use super::backend::DeviceBackend;
use super::physical::{ControlValue, PhysicalControl, PhysicalInput};
use crate::error::DeviceError;
use std::fmt::Debug;

/// A connected device driven by one of the device strategies.
///
/// `capabilities` describes every channel the device exposes. The input
/// manager checks profile mappings against it when binding.
pub trait InputDevice: Debug {
    fn device_id(&self) -> u8;

    fn handle(&self) -> usize;

    fn capabilities(&self) -> &PhysicalInput;

    fn is_connected(&self) -> bool;

    /// Whether the last poll changed any raw value
    fn is_state_changed(&self) -> bool;

    /// Acquires the device and reads an initial state
    fn initialise_state(&mut self, backend: &mut dyn DeviceBackend) -> Result<(), DeviceError>;

    /// Polls the device. Failures mark it disconnected, they are not returned.
    fn update_state(&mut self, backend: &mut dyn DeviceBackend);

    fn get_input_value(&self, control: &PhysicalControl) -> Option<ControlValue>;
}
