use super::{press_reasons, ControlCore, VirtualControl};
use crate::config::{
    ConfigSource, CONFIG_TRIGGER_DEAD_ZONE_FRACTION, CONFIG_USE_DEFAULT_SENSITIVITY,
    DEFAULT_TRIGGER_DEAD_ZONE_FRACTION, DEFAULT_USE_DEFAULT_SENSITIVITY, MAX_DEAD_ZONE_FRACTION,
};
use crate::events::{ControlKey, ControlType, EventReason};
use crate::input::{BoundControl, InputMapping, PhysicalInputs};

/// Analog trigger. Pressed whenever its value clears the dead zone.
#[derive(Debug, Clone)]
pub struct Trigger {
    core: ControlCore,
    use_default_sensitivity: bool,
    user_dead_zone: f32,
    default_dead_zone: f32,
    dead_zone: f32,
    value: f32,
}

impl Trigger {
    pub fn new(id: u8, name: &str, mapping: InputMapping) -> Self {
        Self {
            core: ControlCore::new(id, name, vec![mapping]),
            use_default_sensitivity: DEFAULT_USE_DEFAULT_SENSITIVITY,
            user_dead_zone: DEFAULT_TRIGGER_DEAD_ZONE_FRACTION,
            default_dead_zone: DEFAULT_TRIGGER_DEAD_ZONE_FRACTION,
            dead_zone: DEFAULT_TRIGGER_DEAD_ZONE_FRACTION,
            value: 0.0,
        }
    }

    /// Value in 0..1 with the dead zone removed
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn dead_zone(&self) -> f32 {
        self.dead_zone
    }

    fn select_dead_zone(&mut self) {
        self.dead_zone = if self.use_default_sensitivity {
            self.default_dead_zone
        } else {
            self.user_dead_zone
        };
    }
}

impl VirtualControl for Trigger {
    fn core(&self) -> &ControlCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ControlCore {
        &mut self.core
    }

    fn control_type(&self) -> ControlType {
        ControlType::Trigger
    }

    fn set_bound_controls(&mut self, bound: Vec<Option<BoundControl>>, inputs: &PhysicalInputs) {
        self.core.set_bound(bound, 1, 1);
        if let Some(slot) = self.core.bound(0) {
            self.default_dead_zone = inputs.dead_zone(slot);
            self.select_dead_zone();
        }
    }

    fn is_pressable(&self) -> bool {
        true
    }

    fn apply_config(&mut self, config: &dyn ConfigSource) {
        self.use_default_sensitivity =
            config.get_bool_val(CONFIG_USE_DEFAULT_SENSITIVITY, DEFAULT_USE_DEFAULT_SENSITIVITY);
        self.user_dead_zone = config
            .get_float_val(CONFIG_TRIGGER_DEAD_ZONE_FRACTION, DEFAULT_TRIGGER_DEAD_ZONE_FRACTION)
            .clamp(0.0, MAX_DEAD_ZONE_FRACTION);
        self.select_dead_zone();
    }

    fn update_state(&mut self, inputs: &PhysicalInputs) {
        if !self.core.is_binding_valid() {
            return;
        }
        let Some(slot) = self.core.bound(0).copied() else {
            return;
        };

        let raw = inputs.float_val(&slot);
        self.value = if raw < self.dead_zone {
            0.0
        } else {
            (raw - self.dead_zone) / (1.0 - self.dead_zone)
        };
        self.core.press_mut().set_pressed(self.value != 0.0);
    }

    fn supported_event_reasons(&self, key: &ControlKey) -> Vec<EventReason> {
        press_reasons(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::controls::test_support::{self, SLIDER};
    use crate::input::{ControlOption, ControlValue, PhysicalControlType};

    fn bound_trigger() -> (Trigger, PhysicalInputs) {
        let inputs = test_support::inputs();
        let mut trigger = Trigger::new(
            1,
            "LT",
            InputMapping::new(1, PhysicalControlType::Slider, 0, ControlOption::None),
        );
        trigger.set_bound_controls(vec![test_support::slot(SLIDER)], &inputs);
        (trigger, inputs)
    }

    #[test]
    fn test_hardware_dead_zone_by_default() {
        let (mut trigger, mut inputs) = bound_trigger();
        assert!((trigger.dead_zone() - 0.1).abs() < 1e-6);

        test_support::set(&mut inputs, SLIDER, ControlValue::Float(0.05));
        trigger.update_state(&inputs);
        assert_eq!(trigger.value(), 0.0);
        assert!(!trigger.core().press().is_pressed());

        test_support::set(&mut inputs, SLIDER, ControlValue::Float(0.55));
        trigger.update_state(&inputs);
        assert!((trigger.value() - 0.5).abs() < 1e-6);
        assert!(trigger.core().press().is_pressed());

        test_support::set(&mut inputs, SLIDER, ControlValue::Float(1.0));
        trigger.update_state(&inputs);
        assert!((trigger.value() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_user_dead_zone() {
        let (mut trigger, mut inputs) = bound_trigger();
        let mut config = AppConfig::default();
        config.set_bool_val(CONFIG_USE_DEFAULT_SENSITIVITY, false);
        config.set_float_val(CONFIG_TRIGGER_DEAD_ZONE_FRACTION, 0.5);
        trigger.apply_config(&config);
        assert!((trigger.dead_zone() - 0.5).abs() < 1e-6);

        test_support::set(&mut inputs, SLIDER, ControlValue::Float(0.4));
        trigger.update_state(&inputs);
        assert!(!trigger.core().press().is_pressed());
    }

    #[test]
    fn test_full_dead_zone_is_clamped() {
        let (mut trigger, mut inputs) = bound_trigger();
        let mut config = AppConfig::default();
        config.set_bool_val(CONFIG_USE_DEFAULT_SENSITIVITY, false);
        config.set_float_val(CONFIG_TRIGGER_DEAD_ZONE_FRACTION, 1.0);
        trigger.apply_config(&config);
        assert!((trigger.dead_zone() - MAX_DEAD_ZONE_FRACTION).abs() < 1e-6);

        test_support::set(&mut inputs, SLIDER, ControlValue::Float(1.0));
        trigger.update_state(&inputs);
        assert!(trigger.value().is_finite());
        assert!((trigger.value() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_two_slots_is_invalid() {
        let (mut trigger, inputs) = bound_trigger();
        trigger.set_bound_controls(vec![test_support::slot(SLIDER), None], &inputs);
        assert!(!trigger.is_binding_valid());
    }
}
