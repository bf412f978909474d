use super::{press_reasons, ControlCore, VirtualControl};
use crate::events::{ControlKey, ControlType, EventReason};
use crate::input::{BoundControl, InputMapping, PhysicalInputs};

/// Digital button reading one physical button
#[derive(Debug, Clone)]
pub struct Button {
    core: ControlCore,
}

impl Button {
    pub fn new(id: u8, name: &str, mapping: InputMapping) -> Self {
        Self {
            core: ControlCore::new(id, name, vec![mapping]),
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.core.press().is_pressed()
    }
}

impl VirtualControl for Button {
    fn core(&self) -> &ControlCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ControlCore {
        &mut self.core
    }

    fn control_type(&self) -> ControlType {
        ControlType::Button
    }

    fn set_bound_controls(&mut self, bound: Vec<Option<BoundControl>>, _inputs: &PhysicalInputs) {
        self.core.set_bound(bound, 1, 1);
    }

    fn is_pressable(&self) -> bool {
        true
    }

    fn update_state(&mut self, inputs: &PhysicalInputs) {
        if !self.core.is_binding_valid() {
            return;
        }
        if let Some(bound) = self.core.bound(0).copied() {
            self.core.press_mut().set_pressed(inputs.bool_val(&bound));
        }
    }

    fn supported_event_reasons(&self, key: &ControlKey) -> Vec<EventReason> {
        press_reasons(key)
    }
}
