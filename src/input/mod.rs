//! Physical input layer
//!
//! Turns raw device state into normalized physical control values:
//!
//! 1. [`backend`] - platform seam ([`gilrs_backend`] in production)
//! 2. [`gamepad`] / [`joystick`] - device strategies with range readers
//! 3. [`manager`] - connected device set, profile binding, polling
//! 4. [`physical`] - per-channel values read by virtual controls
//!
//! # Architecture
//!
//! ```text
//! Backend ──► InputDevice ──► InputManager ──► PhysicalInput ──► PhysicalControl
//!             (strategy)      (bind / poll)    (per source)     (typed value)
//! ```

pub mod backend;
pub mod device;
pub mod gamepad;
pub mod gilrs_backend;
pub mod joystick;
pub mod manager;
pub mod mapping;
pub mod physical;

pub use backend::{DeviceBackend, DeviceInfo, DeviceKind};
pub use device::InputDevice;
pub use manager::InputManager;
pub use mapping::InputMapping;
pub use physical::{
    BoundControl, ControlOption, ControlValue, DeviceStates, DeviceStatus, DeviceType,
    PhysicalControl, PhysicalControlType, PhysicalInput, PhysicalInputs,
};
