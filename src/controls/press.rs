//! Press sub-machine shared by every pressable control.

use super::EventDemand;
use crate::events::{ControlEvent, ControlKey, EventReason};
use crate::timing::{TimeoutMonitor, DEFAULT_HOLD_TIME_MS, DEFAULT_REPEAT_INTERVAL_MS};
use std::time::Instant;

const DWELL_REASONS: [EventReason; 3] = [
    EventReason::PressedShort,
    EventReason::PressedLong,
    EventReason::PressRepeated,
];

/// Pressed state with previous-tick snapshot, plus the dwell and
/// auto-repeat timers.
#[derive(Debug, Clone)]
pub struct PressTiming {
    pressed: bool,
    old_pressed: bool,
    hold: TimeoutMonitor,
    repeat: TimeoutMonitor,
}

impl PressTiming {
    pub fn new() -> Self {
        Self {
            pressed: false,
            old_pressed: false,
            hold: TimeoutMonitor::new(DEFAULT_HOLD_TIME_MS),
            repeat: TimeoutMonitor::new(DEFAULT_REPEAT_INTERVAL_MS),
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn set_pressed(&mut self, pressed: bool) {
        self.pressed = pressed;
    }

    pub fn set_hold_time(&mut self, hold_ms: u64) {
        self.hold.set_timeout(hold_ms);
    }

    pub fn set_repeat_interval(&mut self, repeat_ms: u64) {
        self.repeat.set_timeout(repeat_ms);
    }

    /// Emits press events for this tick. A state change takes priority over
    /// the dwell timer, which takes priority over the repeat timer.
    pub fn raise_events(
        &mut self,
        demand: &EventDemand,
        key: ControlKey,
        now: Instant,
        out: &mut Vec<ControlEvent>,
    ) {
        if self.pressed != self.old_pressed {
            if self.pressed {
                out.push(ControlEvent::new(key, EventReason::Pressed));
                if demand.wants_any(&DWELL_REASONS) {
                    self.hold.start_at(now);
                } else {
                    self.hold.stop();
                }
            } else {
                if demand.wants(EventReason::PressedShort) && self.hold.is_started() {
                    out.push(ControlEvent::new(key, EventReason::PressedShort));
                }
                out.push(ControlEvent::new(key, EventReason::Released));
                self.hold.stop();
            }
            self.repeat.stop();
            self.old_pressed = self.pressed;
        } else if self.hold.is_timeout_at(now) {
            self.hold.stop();
            if demand.wants(EventReason::PressedLong) {
                out.push(ControlEvent::new(key, EventReason::PressedLong));
            }
            if demand.wants(EventReason::PressRepeated) {
                out.push(ControlEvent::new(key, EventReason::PressRepeated));
                self.repeat.start_at(now);
            }
        } else if self.repeat.is_timeout_at(now) {
            out.push(ControlEvent::new(key, EventReason::PressRepeated));
        }
    }
}

impl Default for PressTiming {
    fn default() -> Self {
        Self::new()
    }
}
