//! Generic joystick strategy with per-channel range readers.

use super::backend::{AxisRange, DeviceBackend, JoystickLayout, JoystickReport};
use super::device::InputDevice;
use super::physical::{
    ControlValue, DeviceType, PhysicalControl, PhysicalControlType, PhysicalInput,
};
use crate::error::DeviceError;
use crate::lrud::Lrud;
use tracing::{debug, info, warn};

/// Lowest device id given to generic joysticks
pub const FIRST_JOYSTICK_ID: u8 = 5;

const AXIS_DEAD_ZONE: f32 = 0.2;
const SLIDER_DEAD_ZONE: f32 = 0.1;

/// Maps a signed native axis range onto -1..1 around its midpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisReader {
    midpoint: f32,
    half_range: f32,
    inverted: bool,
}

impl AxisReader {
    pub fn new(range: AxisRange) -> Self {
        let midpoint = (range.min as f32 + range.max as f32) / 2.0;
        let half_range = (range.max as f32 - midpoint).abs().max(1.0);
        Self {
            midpoint,
            half_range,
            inverted: range.inverted,
        }
    }

    pub fn read(&self, raw: i32) -> f32 {
        let offset = if self.inverted {
            self.midpoint - raw as f32
        } else {
            raw as f32 - self.midpoint
        };
        (offset / self.half_range).clamp(-1.0, 1.0)
    }
}

/// Maps a native slider range onto 0..1.
///
/// Some hardware reports a bogus mid-scale value until the slider is first
/// moved, so the first raw value is latched and reported as zero until the
/// raw value differs from it.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderReader {
    min: f32,
    range: f32,
    latched: Option<i32>,
    touched: bool,
}

impl SliderReader {
    pub fn new(range: AxisRange) -> Self {
        Self {
            min: range.min as f32,
            range: ((range.max - range.min) as f32).abs().max(1.0),
            latched: None,
            touched: false,
        }
    }

    pub fn read(&mut self, raw: i32) -> f32 {
        if !self.touched {
            match self.latched {
                None => {
                    self.latched = Some(raw);
                    return 0.0;
                }
                Some(first) if first == raw => return 0.0,
                Some(_) => self.touched = true,
            }
        }
        ((raw as f32 - self.min) / self.range).clamp(0.0, 1.0)
    }
}

/// Channel description for a joystick layout. Axes come first, then
/// sliders, buttons and hats, with ids counting up from 1.
pub fn joystick_capabilities(device_id: u8, name: &str, layout: &JoystickLayout) -> PhysicalInput {
    let mut controls = Vec::new();
    let mut id = 0u8;
    let mut next_id = || {
        id = id.saturating_add(1);
        id
    };

    for index in 0..layout.axes.len() {
        let label = format!("Axis {}", index + 1);
        controls.push(PhysicalControl::new(
            next_id(),
            &label,
            &format!("A{}", index + 1),
            PhysicalControlType::Axis,
            index as u8,
            AXIS_DEAD_ZONE,
        ));
    }
    for index in 0..layout.sliders.len() {
        controls.push(PhysicalControl::new(
            next_id(),
            &format!("Slider {}", index + 1),
            &format!("S{}", index + 1),
            PhysicalControlType::Slider,
            index as u8,
            SLIDER_DEAD_ZONE,
        ));
    }
    for index in 0..layout.buttons {
        controls.push(PhysicalControl::new(
            next_id(),
            &format!("Button {}", index + 1),
            &format!("B{}", index + 1),
            PhysicalControlType::Button,
            index as u8,
            0.0,
        ));
    }
    for index in 0..layout.povs {
        controls.push(PhysicalControl::new(
            next_id(),
            &format!("POV {}", index + 1),
            &format!("P{}", index + 1),
            PhysicalControlType::Pov,
            index as u8,
            0.0,
        ));
    }

    PhysicalInput::new(device_id, name, DeviceType::Joystick, device_id).with_controls(controls)
}

#[derive(Debug)]
pub struct JoystickDevice {
    handle: usize,
    capabilities: PhysicalInput,
    axis_readers: Vec<AxisReader>,
    slider_readers: Vec<SliderReader>,
    connected: bool,
    state_changed: bool,
    last_report: Option<JoystickReport>,
    axes: Vec<f32>,
    sliders: Vec<f32>,
    buttons: Vec<bool>,
    povs: Vec<Lrud>,
}

impl JoystickDevice {
    pub fn new(device_id: u8, handle: usize, name: &str, layout: &JoystickLayout) -> Self {
        Self {
            handle,
            capabilities: joystick_capabilities(device_id, name, layout),
            axis_readers: layout.axes.iter().copied().map(AxisReader::new).collect(),
            slider_readers: layout.sliders.iter().copied().map(SliderReader::new).collect(),
            connected: false,
            state_changed: false,
            last_report: None,
            axes: vec![0.0; layout.axes.len()],
            sliders: vec![0.0; layout.sliders.len()],
            buttons: vec![false; layout.buttons],
            povs: vec![Lrud::Centre; layout.povs],
        }
    }

    /// Reads once, re-acquiring and retrying a single time if input was lost
    fn poll(&mut self, backend: &mut dyn DeviceBackend) -> Result<JoystickReport, DeviceError> {
        match backend.read_joystick(self.handle) {
            Ok(report) => Ok(report),
            Err(DeviceError::InputLost(reason)) => {
                debug!("Joystick {} lost input ({}), re-acquiring", self.device_id(), reason);
                backend.acquire(self.handle)?;
                backend.read_joystick(self.handle)
            }
            Err(e) => Err(e),
        }
    }

    fn apply_report(&mut self, report: &JoystickReport) {
        for (value, (reader, raw)) in self
            .axes
            .iter_mut()
            .zip(self.axis_readers.iter().zip(report.axes.iter()))
        {
            *value = reader.read(*raw);
        }
        for (value, (reader, raw)) in self
            .sliders
            .iter_mut()
            .zip(self.slider_readers.iter_mut().zip(report.sliders.iter()))
        {
            *value = reader.read(*raw);
        }
        for (value, raw) in self.buttons.iter_mut().zip(report.buttons.iter()) {
            *value = *raw;
        }
        for (value, raw) in self.povs.iter_mut().zip(report.povs.iter()) {
            *value = *raw;
        }
    }

    fn reset(&mut self) {
        self.axes.iter_mut().for_each(|v| *v = 0.0);
        self.sliders.iter_mut().for_each(|v| *v = 0.0);
        self.buttons.iter_mut().for_each(|v| *v = false);
        self.povs.iter_mut().for_each(|v| *v = Lrud::Centre);
    }
}

impl InputDevice for JoystickDevice {
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
        backend.acquire(self.handle)?;
        let report = backend.read_joystick(self.handle)?;
        self.apply_report(&report);
        self.last_report = Some(report);
        self.connected = true;
        self.state_changed = true;
        info!(
            "Joystick {} ({}) initialised with {} controls",
            self.device_id(),
            self.capabilities.name,
            self.capabilities.controls.len()
        );
        Ok(())
    }

    fn update_state(&mut self, backend: &mut dyn DeviceBackend) {
        match self.poll(backend) {
            Ok(report) => {
                self.state_changed = self.last_report.as_ref() != Some(&report);
                if self.state_changed {
                    self.apply_report(&report);
                    self.last_report = Some(report);
                }
                self.connected = true;
            }
            Err(e) => {
                if self.connected {
                    warn!("Joystick {} unavailable: {}", self.device_id(), e);
                    self.reset();
                    self.last_report = None;
                    self.state_changed = true;
                } else {
                    self.state_changed = false;
                }
                self.connected = false;
            }
        }
    }

    fn get_input_value(&self, control: &PhysicalControl) -> Option<ControlValue> {
        let index = control.control_index as usize;
        match control.control_type {
            PhysicalControlType::Axis => self.axes.get(index).copied().map(ControlValue::Float),
            PhysicalControlType::Slider => self.sliders.get(index).copied().map(ControlValue::Float),
            PhysicalControlType::Button => self.buttons.get(index).copied().map(ControlValue::Bool),
            PhysicalControlType::Pov => self.povs.get(index).copied().map(ControlValue::Direction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::backend::fake::FakeBackend;

    fn range(min: i32, max: i32, inverted: bool) -> AxisRange {
        AxisRange { min, max, inverted }
    }

    fn layout() -> JoystickLayout {
        JoystickLayout {
            axes: vec![range(0, 65535, false), range(0, 65535, true)],
            sliders: vec![range(0, 255, false)],
            buttons: 4,
            povs: 1,
        }
    }

    #[test]
    fn test_axis_reader_normalizes_around_midpoint() {
        let reader = AxisReader::new(range(-100, 100, false));
        assert_eq!(reader.read(0), 0.0);
        assert_eq!(reader.read(100), 1.0);
        assert_eq!(reader.read(-50), -0.5);

        let inverted = AxisReader::new(range(-100, 100, true));
        assert_eq!(inverted.read(100), -1.0);
    }

    #[test]
    fn test_axis_reader_degenerate_range() {
        let reader = AxisReader::new(range(5, 5, false));
        assert_eq!(reader.read(6), 1.0);
        assert_eq!(reader.read(5), 0.0);
    }

    #[test]
    fn test_slider_latches_first_value() {
        let mut reader = SliderReader::new(range(0, 100, false));
        assert_eq!(reader.read(50), 0.0);
        assert_eq!(reader.read(50), 0.0);
        assert_eq!(reader.read(60), 0.6);
        // Once moved it reports normally, including the latched value
        assert_eq!(reader.read(50), 0.5);
    }

    #[test]
    fn test_capabilities_order() {
        let caps = joystick_capabilities(5, "Stick", &layout());
        let kinds: Vec<_> = caps.controls.iter().map(|c| c.control_type).collect();
        assert_eq!(kinds.len(), 8);
        assert_eq!(kinds[0], PhysicalControlType::Axis);
        assert_eq!(kinds[2], PhysicalControlType::Slider);
        assert_eq!(kinds[7], PhysicalControlType::Pov);
        assert_eq!(caps.controls[7].id, 8);
    }

    #[test]
    fn test_reacquire_after_lost_input() {
        let mut backend = FakeBackend::default();
        backend.add_joystick(3, "Stick", layout());
        let mut device = JoystickDevice::new(5, 3, "Stick", &layout());
        device.initialise_state(&mut backend).unwrap();

        backend.lost.push(3);
        device.update_state(&mut backend);
        assert!(device.is_connected());
        assert_eq!(backend.acquire_calls, 2);
    }

    #[test]
    fn test_failed_reacquire_disconnects() {
        let mut backend = FakeBackend::default();
        backend.add_joystick(3, "Stick", layout());
        let mut device = JoystickDevice::new(5, 3, "Stick", &layout());
        device.initialise_state(&mut backend).unwrap();

        backend.joysticks.get_mut(&3).unwrap().buttons[2] = true;
        device.update_state(&mut backend);
        let b3 = device
            .capabilities()
            .control(PhysicalControlType::Button, 2)
            .cloned()
            .unwrap();
        assert_eq!(device.get_input_value(&b3), Some(ControlValue::Bool(true)));

        backend.lost.push(3);
        backend.unacquirable.push(3);
        device.update_state(&mut backend);
        assert!(!device.is_connected());
        assert!(device.is_state_changed());
        assert_eq!(device.get_input_value(&b3), Some(ControlValue::Bool(false)));
    }

    #[test]
    fn test_axis_values_follow_report() {
        let mut backend = FakeBackend::default();
        backend.add_joystick(3, "Stick", layout());
        let mut device = JoystickDevice::new(5, 3, "Stick", &layout());
        device.initialise_state(&mut backend).unwrap();

        let report = backend.joysticks.get_mut(&3).unwrap();
        report.axes[1] = 65535;
        device.update_state(&mut backend);
        assert!(device.is_state_changed());

        let y = device
            .capabilities()
            .control(PhysicalControlType::Axis, 1)
            .cloned()
            .unwrap();
        // Inverted axis, full deflection reads as -1
        assert_eq!(device.get_input_value(&y), Some(ControlValue::Float(-1.0)));

        device.update_state(&mut backend);
        assert!(!device.is_state_changed());
    }
}
