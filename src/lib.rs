//! Game controller input translated into state-scoped actions.
//!
//! ```text
//! DeviceBackend ──► InputManager ──► BaseSource ──► VirtualControl ──► ActionList
//!  (gilrs)          (bind / poll)    (states)       (events)           (commands)
//! ```

pub mod config;
pub mod controls;
pub mod engine;
pub mod error;
pub mod events;
pub mod input;
pub mod lrud;
pub mod profile;
pub mod source;
pub mod timing;
