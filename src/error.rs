//! Error types shared across the crate

use thiserror::Error;

/// Errors reported by device backends and concrete devices.
///
/// None of these are fatal: the input manager logs them and treats the
/// affected device as disconnected.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Input lost: {0}")]
    InputLost(String),

    #[error("Failed to acquire device: {0}")]
    AcquireFailed(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Errors raised while loading or saving a profile
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to access profile file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse profile: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize profile: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid profile: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to initialize engine: {0}")]
    InitializationError(String),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}
