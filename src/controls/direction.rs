//! Direction sub-machine shared by sticks and d-pads.

use super::{DirectionMode, EventDemand};
use crate::events::{ControlEvent, ControlKey, EventReason};
use crate::lrud::Lrud;
use crate::timing::{OverrideStack, TimeoutMonitor, DEFAULT_HOLD_TIME_MS, DEFAULT_REPEAT_INTERVAL_MS};
use std::time::Instant;

const DWELL_REASONS: [EventReason; 3] = [
    EventReason::DirectedShort,
    EventReason::DirectedLong,
    EventReason::DirectionRepeated,
];

#[derive(Debug, Clone)]
pub struct DirectionTiming {
    direction: Lrud,
    old_direction: Lrud,
    modes: OverrideStack<DirectionMode>,
    hold: TimeoutMonitor,
    repeat: TimeoutMonitor,
}

impl DirectionTiming {
    pub fn new() -> Self {
        Self {
            direction: Lrud::Centre,
            old_direction: Lrud::Centre,
            modes: OverrideStack::new(DirectionMode::default()),
            hold: TimeoutMonitor::new(DEFAULT_HOLD_TIME_MS),
            repeat: TimeoutMonitor::new(DEFAULT_REPEAT_INTERVAL_MS),
        }
    }

    pub fn direction(&self) -> Lrud {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Lrud) {
        self.direction = direction;
    }

    pub fn mode(&self) -> DirectionMode {
        self.modes.current()
    }

    pub fn apply_mode(&mut self, mode: DirectionMode, enable: bool) {
        self.modes.apply(mode, enable);
    }

    pub fn set_hold_time(&mut self, hold_ms: u64) {
        self.hold.set_timeout(hold_ms);
    }

    pub fn set_repeat_interval(&mut self, repeat_ms: u64) {
        self.repeat.set_timeout(repeat_ms);
    }

    /// Emits direction events for this tick. On a change the short dwell
    /// for the old direction comes first, then `Undirected`, then
    /// `Directed`.
    pub fn raise_events(
        &mut self,
        demand: &EventDemand,
        key: ControlKey,
        now: Instant,
        out: &mut Vec<ControlEvent>,
    ) {
        let (old, new) = (self.old_direction, self.direction);
        if new != old {
            if demand.wants(EventReason::DirectedShort) && self.hold.is_started() {
                self.raise(key, Lrud::Centre, old, EventReason::DirectedShort, out);
            }
            // Note the argument order: bits leaving `old`
            self.raise(key, new, old, EventReason::Undirected, out);
            self.raise(key, old, new, EventReason::Directed, out);

            if new != Lrud::Centre && demand.wants_any(&DWELL_REASONS) {
                self.hold.start_at(now);
            } else {
                self.hold.stop();
            }
            self.repeat.stop();
            self.old_direction = new;
        } else if self.hold.is_timeout_at(now) {
            self.hold.stop();
            if demand.wants(EventReason::DirectedLong) {
                self.raise(key, Lrud::Centre, new, EventReason::DirectedLong, out);
            }
            if demand.wants(EventReason::DirectionRepeated) {
                self.raise(key, Lrud::Centre, new, EventReason::DirectionRepeated, out);
                self.repeat.start_at(now);
            }
        } else if self.repeat.is_timeout_at(now) {
            self.raise(key, Lrud::Centre, new, EventReason::DirectionRepeated, out);
        }
    }

    // Axis-style mode raises one event per entering bit, horizontal first.
    // Other modes raise a single event for the whole target direction;
    // continuous mode only reports the return to centre.
    fn raise(
        &self,
        key: ControlKey,
        from: Lrud,
        to: Lrud,
        reason: EventReason,
        out: &mut Vec<ControlEvent>,
    ) {
        let entering = |flag: Lrud| to.has(flag) && !from.has(flag);
        let mut push = |direction: Lrud| {
            out.push(ControlEvent::new(key.with_direction(direction), reason));
        };

        match self.mode() {
            DirectionMode::AxisStyle => {
                if entering(Lrud::Left) {
                    push(Lrud::Left);
                } else if entering(Lrud::Right) {
                    push(Lrud::Right);
                }
                if entering(Lrud::Up) {
                    push(Lrud::Up);
                } else if entering(Lrud::Down) {
                    push(Lrud::Down);
                }
            }
            DirectionMode::Continuous if to != Lrud::Centre => {}
            _ => push(to),
        }
    }
}

impl Default for DirectionTiming {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ControlType;
    use std::time::Duration;

    fn key() -> ControlKey {
        ControlKey::new(ControlType::DPad, 1)
    }

    fn step(
        timing: &mut DirectionTiming,
        demand: &EventDemand,
        direction: Lrud,
        at: Instant,
    ) -> Vec<(EventReason, Lrud)> {
        timing.set_direction(direction);
        let mut out = Vec::new();
        timing.raise_events(demand, key(), at, &mut out);
        out.into_iter().map(|e| (e.reason, e.key.direction)).collect()
    }

    #[test]
    fn test_eight_way_change() {
        let mut timing = DirectionTiming::new();
        let demand = EventDemand::default();
        let now = Instant::now();

        assert_eq!(
            step(&mut timing, &demand, Lrud::Up, now),
            vec![
                (EventReason::Undirected, Lrud::Centre),
                (EventReason::Directed, Lrud::Up)
            ]
        );
        assert_eq!(
            step(&mut timing, &demand, Lrud::Centre, now),
            vec![
                (EventReason::Undirected, Lrud::Up),
                (EventReason::Directed, Lrud::Centre)
            ]
        );
    }

    #[test]
    fn test_short_dwell_comes_first() {
        let mut timing = DirectionTiming::new();
        let mut demand = EventDemand::default();
        demand.enable(&[EventReason::DirectedShort], true);
        let now = Instant::now();

        step(&mut timing, &demand, Lrud::Left, now);
        let events = step(&mut timing, &demand, Lrud::Centre, now + Duration::from_millis(50));
        assert_eq!(
            events,
            vec![
                (EventReason::DirectedShort, Lrud::Left),
                (EventReason::Undirected, Lrud::Left),
                (EventReason::Directed, Lrud::Centre)
            ]
        );
    }

    #[test]
    fn test_axis_style_splits_bits() {
        let mut timing = DirectionTiming::new();
        timing.apply_mode(DirectionMode::AxisStyle, true);
        let demand = EventDemand::default();
        let now = Instant::now();

        step(&mut timing, &demand, Lrud::Up, now);
        let events = step(&mut timing, &demand, Lrud::UpRight, now);
        // Up stays held, only Right enters
        assert_eq!(events, vec![(EventReason::Directed, Lrud::Right)]);

        let events = step(&mut timing, &demand, Lrud::DownLeft, now);
        assert_eq!(
            events,
            vec![
                (EventReason::Undirected, Lrud::Right),
                (EventReason::Undirected, Lrud::Up),
                (EventReason::Directed, Lrud::Left),
                (EventReason::Directed, Lrud::Down)
            ]
        );
    }

    #[test]
    fn test_continuous_only_reports_centre() {
        let mut timing = DirectionTiming::new();
        timing.apply_mode(DirectionMode::Continuous, true);
        let demand = EventDemand::default();
        let now = Instant::now();

        assert_eq!(
            step(&mut timing, &demand, Lrud::Right, now),
            vec![(EventReason::Undirected, Lrud::Centre)]
        );
        assert_eq!(
            step(&mut timing, &demand, Lrud::Centre, now),
            vec![(EventReason::Directed, Lrud::Centre)]
        );

        timing.apply_mode(DirectionMode::Continuous, false);
        assert_eq!(timing.mode(), DirectionMode::EightWay);
    }

    #[test]
    fn test_held_direction_repeats() {
        let mut timing = DirectionTiming::new();
        timing.set_hold_time(100);
        timing.set_repeat_interval(50);
        let mut demand = EventDemand::default();
        demand.enable(&[EventReason::DirectedLong, EventReason::DirectionRepeated], true);
        let start = Instant::now();

        let mut seen = Vec::new();
        for t in (0..=160).step_by(10) {
            let at = start + Duration::from_millis(t);
            for event in step(&mut timing, &demand, Lrud::Down, at) {
                seen.push((t, event));
            }
        }

        assert_eq!(
            seen,
            vec![
                (0, (EventReason::Undirected, Lrud::Centre)),
                (0, (EventReason::Directed, Lrud::Down)),
                (100, (EventReason::DirectedLong, Lrud::Down)),
                (100, (EventReason::DirectionRepeated, Lrud::Down)),
                (150, (EventReason::DirectionRepeated, Lrud::Down)),
            ]
        );
    }
}
