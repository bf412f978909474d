//! Event model shared by virtual controls, sources and observers.

use crate::lrud::Lrud;
use crate::source::state::StateVector;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Kind of virtual control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ControlType {
    Button,
    ButtonDiamond,
    DPad,
    Stick,
    Trigger,
}

impl ControlType {
    pub fn code(self) -> u32 {
        match self {
            ControlType::Button => 0,
            ControlType::ButtonDiamond => 1,
            ControlType::DPad => 2,
            ControlType::Stick => 3,
            ControlType::Trigger => 4,
        }
    }
}

/// Setting an action set configures instead of reacting to input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControlSetting {
    #[default]
    None,
    DirectionMode,
    DwellAndRepeat,
}

impl ControlSetting {
    pub fn code(self) -> u32 {
        match self {
            ControlSetting::None => 0,
            ControlSetting::DirectionMode => 1,
            ControlSetting::DwellAndRepeat => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventReason {
    None,
    Directed,
    DirectedLong,
    DirectionRepeated,
    DirectedShort,
    Undirected,
    Moved,
    Pressed,
    PressedLong,
    PressRepeated,
    PressedShort,
    Released,
    Activated,
}

impl EventReason {
    pub const COUNT: usize = 13;

    pub fn index(self) -> usize {
        match self {
            EventReason::None => 0,
            EventReason::Directed => 1,
            EventReason::DirectedLong => 2,
            EventReason::DirectionRepeated => 3,
            EventReason::DirectedShort => 4,
            EventReason::Undirected => 5,
            EventReason::Moved => 6,
            EventReason::Pressed => 7,
            EventReason::PressedLong => 8,
            EventReason::PressRepeated => 9,
            EventReason::PressedShort => 10,
            EventReason::Released => 11,
            EventReason::Activated => 12,
        }
    }

    /// Reasons always forwarded to observers, bound or not
    pub fn is_reported(self) -> bool {
        matches!(
            self,
            EventReason::Directed
                | EventReason::Undirected
                | EventReason::Pressed
                | EventReason::Released
        )
    }
}

/// Identity of an input event target: which control, which setting and
/// which direction. Action sets are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlKey {
    pub control_type: ControlType,
    pub control_id: u8,
    #[serde(default)]
    pub setting: ControlSetting,
    #[serde(default)]
    pub direction: Lrud,
}

impl ControlKey {
    pub fn new(control_type: ControlType, control_id: u8) -> Self {
        Self {
            control_type,
            control_id,
            setting: ControlSetting::None,
            direction: Lrud::None,
        }
    }

    pub fn with_direction(mut self, direction: Lrud) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_setting(mut self, setting: ControlSetting) -> Self {
        self.setting = setting;
        self
    }

    pub fn to_id(&self) -> u32 {
        self.control_type.code()
            | (self.control_id as u32) << 4
            | self.setting.code() << 12
            | (self.direction.bits() as u32) << 16
    }

    /// Id of the control alone, without setting or direction
    pub fn to_general_id(&self) -> u32 {
        self.to_id() & 0xFFF
    }
}

/// Event raised by a virtual control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlEvent {
    pub key: ControlKey,
    pub reason: EventReason,
    pub param0: f32,
    pub param1: f32,
}

impl ControlEvent {
    pub fn new(key: ControlKey, reason: EventReason) -> Self {
        Self {
            key,
            reason,
            param0: 0.0,
            param1: 0.0,
        }
    }
}

/// Control event attributed to the source that raised it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceEvent {
    pub source_id: u8,
    pub key: ControlKey,
    pub reason: EventReason,
    pub param0: f32,
    pub param1: f32,
}

impl SourceEvent {
    pub fn new(source_id: u8, key: ControlKey, reason: EventReason) -> Self {
        Self {
            source_id,
            key,
            reason,
            param0: 0.0,
            param1: 0.0,
        }
    }

    pub fn from_control(source_id: u8, event: ControlEvent) -> Self {
        Self {
            source_id,
            key: event.key,
            reason: event.reason,
            param0: event.param0,
            param1: event.param1,
        }
    }
}

/// Notifications for observers outside the polling loop
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    StateChanged { source_id: u8, state: StateVector },
    Input(SourceEvent),
    Command { command: String, event: SourceEvent },
    DevicesChanged { device_ids: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub timestamp: DateTime<Local>,
    pub event: UiEvent,
}

impl Notification {
    pub fn now(event: UiEvent) -> Self {
        Self {
            timestamp: Local::now(),
            event,
        }
    }
}
