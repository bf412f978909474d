//! Two-axis thumbstick with an optional push button.
//!
//! Slot 0 reads X, slot 1 reads Y and slot 2 the button. The dead zone is
//! radial: positions inside it read as centred and the remaining range is
//! stretched back to the unit circle.

use super::{reasons_matching, ControlCore, DirectionMode, DirectionTiming, VirtualControl};
use crate::config::{
    ConfigSource, CONFIG_THUMBSTICK_DEAD_ZONE_FRACTION, CONFIG_USE_DEFAULT_SENSITIVITY,
    DEFAULT_STICK_DEAD_ZONE_FRACTION, DEFAULT_USE_DEFAULT_SENSITIVITY, MAX_DEAD_ZONE_FRACTION,
};
use crate::events::{ControlEvent, ControlKey, ControlType, EventReason};
use crate::input::{BoundControl, InputMapping, PhysicalInputs};
use crate::lrud::Lrud;
use std::f32::consts::SQRT_2;
use std::time::Instant;

const TAN_22_5: f32 = SQRT_2 - 1.0;
const TAN_67_5: f32 = SQRT_2 + 1.0;

const SLOT_X: usize = 0;
const SLOT_Y: usize = 1;
const SLOT_BUTTON: usize = 2;
const SLOTS: usize = 3;

#[derive(Debug, Clone)]
pub struct Stick {
    core: ControlCore,
    direction: DirectionTiming,
    use_default_sensitivity: bool,
    user_dead_zone: f32,
    default_dead_zone: f32,
    default_dead_zone_sq: f32,
    dead_zone: f32,
    dead_zone_sq: f32,
    value: (f32, f32),
    old_value: (f32, f32),
}

impl Stick {
    /// `mappings` holds X, Y and optionally the button
    pub fn new(id: u8, name: &str, mappings: Vec<InputMapping>) -> Self {
        let dead_zone = DEFAULT_STICK_DEAD_ZONE_FRACTION;
        Self {
            core: ControlCore::new(id, name, mappings),
            direction: DirectionTiming::new(),
            use_default_sensitivity: DEFAULT_USE_DEFAULT_SENSITIVITY,
            user_dead_zone: dead_zone,
            default_dead_zone: dead_zone,
            default_dead_zone_sq: dead_zone * dead_zone,
            dead_zone,
            dead_zone_sq: dead_zone * dead_zone,
            value: (0.0, 0.0),
            old_value: (0.0, 0.0),
        }
    }

    /// Position after dead zone removal, each axis in -1..1
    pub fn value(&self) -> (f32, f32) {
        self.value
    }

    pub fn direction(&self) -> Lrud {
        self.direction.direction()
    }

    pub fn direction_mode(&self) -> DirectionMode {
        self.direction.mode()
    }

    pub fn dead_zone(&self) -> f32 {
        self.dead_zone
    }

    fn select_dead_zone(&mut self) {
        if self.use_default_sensitivity {
            self.dead_zone = self.default_dead_zone;
            self.dead_zone_sq = self.default_dead_zone_sq;
        } else {
            self.dead_zone = self.user_dead_zone;
            self.dead_zone_sq = self.user_dead_zone * self.user_dead_zone;
        }
    }

    fn classify(&self, x: f32, y: f32) -> Lrud {
        let (abs_x, abs_y) = (x.abs(), y.abs());
        let horizontal = if x > 0.0 { Lrud::Right } else { Lrud::Left };
        let vertical = if y > 0.0 { Lrud::Up } else { Lrud::Down };

        if self.direction.mode() == DirectionMode::FourWay {
            if abs_y < abs_x {
                horizontal
            } else {
                vertical
            }
        } else if abs_y < abs_x * TAN_22_5 {
            horizontal
        } else if abs_y > abs_x * TAN_67_5 {
            vertical
        } else {
            Lrud::from_bits(horizontal.bits() | vertical.bits())
        }
    }
}

impl VirtualControl for Stick {
    fn core(&self) -> &ControlCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ControlCore {
        &mut self.core
    }

    fn control_type(&self) -> ControlType {
        ControlType::Stick
    }

    fn key(&self) -> ControlKey {
        ControlKey::new(ControlType::Stick, self.core.id).with_direction(Lrud::Centre)
    }

    /// Valid with all three slots supplied and at least one resolved. The
    /// hardware dead zone comes from whichever axes resolved.
    fn set_bound_controls(&mut self, bound: Vec<Option<BoundControl>>, inputs: &PhysicalInputs) {
        self.core.set_bound(bound, SLOTS, 1);
        if !self.core.is_binding_valid() {
            return;
        }

        let x_dz = self.core.bound(SLOT_X).map(|slot| inputs.dead_zone(slot));
        let y_dz = self.core.bound(SLOT_Y).map(|slot| inputs.dead_zone(slot));
        self.default_dead_zone_sq = match (x_dz, y_dz) {
            (Some(x), Some(y)) => x * y,
            (Some(x), None) => x * x,
            (None, Some(y)) => y * y,
            (None, None) => DEFAULT_STICK_DEAD_ZONE_FRACTION * DEFAULT_STICK_DEAD_ZONE_FRACTION,
        };
        self.default_dead_zone = if self.default_dead_zone_sq > 1e-6 {
            self.default_dead_zone_sq.sqrt()
        } else {
            0.0
        };
        self.select_dead_zone();
    }

    fn is_pressable(&self) -> bool {
        self.core.mappings.len() == SLOTS && !self.core.mappings[SLOT_BUTTON].is_unused()
    }

    fn apply_config(&mut self, config: &dyn ConfigSource) {
        self.use_default_sensitivity =
            config.get_bool_val(CONFIG_USE_DEFAULT_SENSITIVITY, DEFAULT_USE_DEFAULT_SENSITIVITY);
        self.user_dead_zone = config
            .get_float_val(CONFIG_THUMBSTICK_DEAD_ZONE_FRACTION, DEFAULT_STICK_DEAD_ZONE_FRACTION)
            .clamp(0.0, MAX_DEAD_ZONE_FRACTION);
        self.select_dead_zone();
    }

    fn update_state(&mut self, inputs: &PhysicalInputs) {
        if !self.core.is_binding_valid() {
            return;
        }

        let read = |slot: usize| {
            self.core
                .bound(slot)
                .map(|bound| inputs.float_val(bound))
                .unwrap_or(0.0)
        };
        let (mut x, mut y) = (read(SLOT_X), read(SLOT_Y));

        let len_sq = x * x + y * y;
        let direction = if len_sq <= self.dead_zone_sq {
            x = 0.0;
            y = 0.0;
            Lrud::Centre
        } else {
            if len_sq > 1e-6 && self.dead_zone < 1.0 {
                let radius = len_sq.sqrt();
                let new_radius = ((radius - self.dead_zone) / (1.0 - self.dead_zone)).min(1.0);
                let scale = new_radius / radius;
                x *= scale;
                y *= scale;
            }
            self.classify(x, y)
        };

        self.value = (x, y);
        self.direction.set_direction(direction);

        let pressed = self
            .core
            .bound(SLOT_BUTTON)
            .map(|bound| inputs.bool_val(bound))
            .unwrap_or(false);
        self.core.press_mut().set_pressed(pressed);
    }

    fn raise_events(&mut self, now: Instant, out: &mut Vec<ControlEvent>) {
        let key = self.key();
        if self.is_pressable() {
            self.core.raise_press_events(key, now, out);
        }
        self.direction.raise_events(self.core.demand(), key, now, out);

        if self.direction.mode() == DirectionMode::Continuous
            && self.core.demand().wants(EventReason::Moved)
        {
            if self.value != self.old_value {
                let mut event = ControlEvent::new(key, EventReason::Moved);
                event.param0 = self.value.0;
                event.param1 = self.value.1;
                out.push(event);
            }
            self.old_value = self.value;
        }
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
        let pressable = self.is_pressable();
        reasons_matching(key, |reason| match reason {
            EventReason::Moved => centre,
            EventReason::Pressed
            | EventReason::PressedShort
            | EventReason::PressedLong
            | EventReason::PressRepeated
            | EventReason::Released => centre && pressable,
            EventReason::Directed | EventReason::Undirected => true,
            EventReason::DirectedShort
            | EventReason::DirectedLong
            | EventReason::DirectionRepeated => !centre,
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::test_support::{self, BUTTON, X, Y};
    use crate::input::{ControlOption, ControlValue, PhysicalControlType};

    fn mappings(with_button: bool) -> Vec<InputMapping> {
        let button = if with_button {
            InputMapping::new(1, PhysicalControlType::Button, 0, ControlOption::None)
        } else {
            InputMapping::unused()
        };
        vec![
            InputMapping::new(1, PhysicalControlType::Axis, 0, ControlOption::None),
            InputMapping::new(1, PhysicalControlType::Axis, 1, ControlOption::None),
            button,
        ]
    }

    fn bound_stick() -> (Stick, PhysicalInputs) {
        let inputs = test_support::inputs();
        let mut stick = Stick::new(1, "Left stick", mappings(true));
        stick.set_bound_controls(
            vec![
                test_support::slot(X),
                test_support::slot(Y),
                test_support::slot(BUTTON),
            ],
            &inputs,
        );
        (stick, inputs)
    }

    fn direction_at(stick: &mut Stick, inputs: &mut PhysicalInputs, x: f32, y: f32) -> Lrud {
        test_support::set_stick(inputs, x, y);
        stick.update_state(inputs);
        stick.direction()
    }

    #[test]
    fn test_eight_way_classification() {
        let (mut stick, mut inputs) = bound_stick();
        assert_eq!(direction_at(&mut stick, &mut inputs, 1.0, 0.0), Lrud::Right);
        assert_eq!(direction_at(&mut stick, &mut inputs, 0.1, 1.0), Lrud::Up);
        assert_eq!(direction_at(&mut stick, &mut inputs, 0.9, 1.0), Lrud::UpRight);
        assert_eq!(direction_at(&mut stick, &mut inputs, -1.0, -1.0), Lrud::DownLeft);
    }

    #[test]
    fn test_four_way_picks_dominant_axis() {
        let (mut stick, mut inputs) = bound_stick();
        stick.apply_direction_mode(DirectionMode::FourWay, true);
        assert_eq!(direction_at(&mut stick, &mut inputs, 0.9, 1.0), Lrud::Up);
        assert_eq!(direction_at(&mut stick, &mut inputs, -1.0, 0.5), Lrud::Left);
    }

    #[test]
    fn test_dead_zone_edge_is_centre() {
        let (mut stick, mut inputs) = bound_stick();
        assert!((stick.dead_zone() - 0.25).abs() < 1e-6);

        assert_eq!(direction_at(&mut stick, &mut inputs, 0.25, 0.0), Lrud::Centre);
        assert_eq!(stick.value(), (0.0, 0.0));
    }

    #[test]
    fn test_rescaled_magnitude_increases_to_one() {
        let (mut stick, mut inputs) = bound_stick();
        let mut last = 0.0;
        for step in 1..=15 {
            let raw = 0.25 + step as f32 * 0.05;
            direction_at(&mut stick, &mut inputs, raw, 0.0);
            let (x, _) = stick.value();
            assert!(x > last, "{} not above {} at raw {}", x, last, raw);
            last = x;
        }
        assert!((last - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_pressable_needs_button_mapping() {
        let (stick, _) = bound_stick();
        assert!(stick.is_pressable());

        let inputs = test_support::inputs();
        let mut no_button = Stick::new(2, "Right stick", mappings(false));
        no_button.set_bound_controls(
            vec![test_support::slot(X), test_support::slot(Y), None],
            &inputs,
        );
        assert!(no_button.is_binding_valid());
        assert!(!no_button.is_pressable());

        // Button slot unresolved but declared: still pressable
        let mut unresolved = Stick::new(3, "Stick", mappings(true));
        unresolved.set_bound_controls(
            vec![test_support::slot(X), test_support::slot(Y), None],
            &inputs,
        );
        assert!(unresolved.is_pressable());
    }

    #[test]
    fn test_two_slots_never_update() {
        let mut inputs = test_support::inputs();
        let mut stick = Stick::new(1, "Left stick", mappings(true));
        stick.set_bound_controls(vec![test_support::slot(X), test_support::slot(Y)], &inputs);
        assert!(!stick.is_binding_valid());

        test_support::set_stick(&mut inputs, 1.0, 0.0);
        test_support::set(&mut inputs, BUTTON, ControlValue::Bool(true));
        stick.update_state(&inputs);
        assert_eq!(stick.direction(), Lrud::Centre);
        assert_eq!(stick.value(), (0.0, 0.0));
        assert!(!stick.core().press().is_pressed());
    }

    #[test]
    fn test_moved_only_in_continuous_mode() {
        let (mut stick, mut inputs) = bound_stick();
        stick.enable_input_events(&[EventReason::Moved], true);
        let now = Instant::now();

        let mut out = Vec::new();
        direction_at(&mut stick, &mut inputs, 1.0, 0.0);
        stick.raise_events(now, &mut out);
        assert!(out.iter().all(|e| e.reason != EventReason::Moved));

        stick.apply_direction_mode(DirectionMode::Continuous, true);
        out.clear();
        direction_at(&mut stick, &mut inputs, 0.0, 1.0);
        stick.raise_events(now, &mut out);
        let moved: Vec<_> = out.iter().filter(|e| e.reason == EventReason::Moved).collect();
        assert_eq!(moved.len(), 1);
        assert!((moved[0].param1 - 1.0).abs() < 1e-5);
        assert_eq!(moved[0].key.direction, Lrud::Centre);

        // Unchanged value raises nothing more
        out.clear();
        stick.raise_events(now, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_supported_reasons_by_direction() {
        let (stick, _) = bound_stick();
        let centre = stick.key();
        let left = stick.key().with_direction(Lrud::Left);
        assert!(stick.is_reason_supported(&centre, EventReason::Moved));
        assert!(stick.is_reason_supported(&centre, EventReason::Pressed));
        assert!(!stick.is_reason_supported(&centre, EventReason::DirectedLong));
        assert!(stick.is_reason_supported(&left, EventReason::DirectedLong));
        assert!(stick.is_reason_supported(&left, EventReason::Directed));
        assert!(!stick.is_reason_supported(&left, EventReason::Pressed));
    }
}
