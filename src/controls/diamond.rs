use super::{ControlCore, VirtualControl};
use crate::events::{ControlKey, ControlType, EventReason};
use crate::input::{BoundControl, PhysicalInputs};
use crate::lrud::Lrud;

/// Four buttons addressed as one directional group. Holds the ids of the
/// left, right, up and down buttons and nothing else.
#[derive(Debug, Clone)]
pub struct ButtonDiamond {
    core: ControlCore,
    buttons: [u8; 4],
}

impl ButtonDiamond {
    /// `buttons` in left, right, up, down order
    pub fn new(id: u8, name: &str, buttons: [u8; 4]) -> Self {
        Self {
            core: ControlCore::new(id, name, Vec::new()),
            buttons,
        }
    }

    pub fn button_ids(&self) -> [u8; 4] {
        self.buttons
    }

    pub fn set_button_ids(&mut self, buttons: [u8; 4]) {
        self.buttons = buttons;
    }

    pub fn control_id_for_direction(&self, direction: Lrud) -> Option<u8> {
        match direction {
            Lrud::Left => Some(self.buttons[0]),
            Lrud::Right => Some(self.buttons[1]),
            Lrud::Up => Some(self.buttons[2]),
            Lrud::Down => Some(self.buttons[3]),
            _ => None,
        }
    }

    pub fn direction_for_control_id(&self, id: u8) -> Lrud {
        const ORDER: [Lrud; 4] = [Lrud::Left, Lrud::Right, Lrud::Up, Lrud::Down];
        self.buttons
            .iter()
            .position(|button| *button == id)
            .map(|index| ORDER[index])
            .unwrap_or(Lrud::None)
    }
}

impl VirtualControl for ButtonDiamond {
    fn core(&self) -> &ControlCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ControlCore {
        &mut self.core
    }

    fn control_type(&self) -> ControlType {
        ControlType::ButtonDiamond
    }

    fn set_bound_controls(&mut self, bound: Vec<Option<BoundControl>>, _inputs: &PhysicalInputs) {
        self.core.set_bound(bound, 0, 0);
    }

    fn supported_event_reasons(&self, _key: &ControlKey) -> Vec<EventReason> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_lookup() {
        let diamond = ButtonDiamond::new(1, "Face buttons", [3, 2, 4, 1]);
        assert_eq!(diamond.control_id_for_direction(Lrud::Left), Some(3));
        assert_eq!(diamond.control_id_for_direction(Lrud::Down), Some(1));
        assert_eq!(diamond.control_id_for_direction(Lrud::UpLeft), None);
        assert_eq!(diamond.direction_for_control_id(4), Lrud::Up);
        assert_eq!(diamond.direction_for_control_id(9), Lrud::None);
    }

    #[test]
    fn test_never_raises_events() {
        let mut diamond = ButtonDiamond::new(1, "Face buttons", [3, 2, 4, 1]);
        diamond.enable_input_events(&[EventReason::Pressed], true);
        let mut out = Vec::new();
        diamond.raise_events(std::time::Instant::now(), &mut out);
        assert!(out.is_empty());
        assert!(!diamond.is_pressable());
    }
}
