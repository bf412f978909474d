use super::{reasons_matching, ControlCore, DirectionMode, DirectionTiming, VirtualControl};
use crate::events::{ControlEvent, ControlKey, ControlType, EventReason};
use crate::input::{BoundControl, InputMapping, PhysicalInputs};
use crate::lrud::Lrud;
use std::time::Instant;

/// Directional pad reading one POV channel
#[derive(Debug, Clone)]
pub struct DPad {
    core: ControlCore,
    direction: DirectionTiming,
}

impl DPad {
    pub fn new(id: u8, name: &str, mapping: InputMapping) -> Self {
        Self {
            core: ControlCore::new(id, name, vec![mapping]),
            direction: DirectionTiming::new(),
        }
    }

    pub fn direction(&self) -> Lrud {
        self.direction.direction()
    }

    pub fn direction_mode(&self) -> DirectionMode {
        self.direction.mode()
    }
}

impl VirtualControl for DPad {
    fn core(&self) -> &ControlCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ControlCore {
        &mut self.core
    }

    fn control_type(&self) -> ControlType {
        ControlType::DPad
    }

    fn key(&self) -> ControlKey {
        ControlKey::new(ControlType::DPad, self.core.id).with_direction(Lrud::Centre)
    }

    fn set_bound_controls(&mut self, bound: Vec<Option<BoundControl>>, _inputs: &PhysicalInputs) {
        self.core.set_bound(bound, 1, 1);
    }

    fn update_state(&mut self, inputs: &PhysicalInputs) {
        if !self.core.is_binding_valid() {
            return;
        }
        if let Some(bound) = self.core.bound(0).copied() {
            self.direction.set_direction(inputs.direction_val(&bound));
        }
    }

    fn raise_events(&mut self, now: Instant, out: &mut Vec<ControlEvent>) {
        let key = self.key();
        self.direction.raise_events(self.core.demand(), key, now, out);
    }

    fn apply_hold_time(&mut self, hold_ms: u64, enable: bool) {
        let current = self.core.apply_hold_time(hold_ms, enable);
        self.direction.set_hold_time(current);
    }

    fn apply_repeat_interval(&mut self, repeat_ms: u64, enable: bool) {
        let current = self.core.apply_repeat_interval(repeat_ms, enable);
        self.direction.set_repeat_interval(current);
    }

    fn apply_direction_mode(&mut self, mode: DirectionMode, enable: bool) {
        self.direction.apply_mode(mode, enable);
    }

    fn supported_event_reasons(&self, key: &ControlKey) -> Vec<EventReason> {
        let centre = key.direction == Lrud::Centre;
        reasons_matching(key, |reason| match reason {
            EventReason::Directed | EventReason::Undirected => true,
            EventReason::DirectedShort
            | EventReason::DirectedLong
            | EventReason::DirectionRepeated => !centre,
            _ => false,
        })
    }
}
