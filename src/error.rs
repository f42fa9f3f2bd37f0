pub use anyhow::Result;

use thiserror::Error;

use crate::types::ControllerMode;

/// Reasons a [`ControllerRegistry`](crate::registry::ControllerRegistry) can refuse to attach.
///
/// All of these are setup errors, nothing here can happen once the simulation is stepping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttachError {
    #[error("persistent storage too small: {required} scalars required, {available} available")]
    StateCapacity { required: usize, available: usize },

    #[error("metadata storage too small: {required} slots required, {available} available")]
    MetadataCapacity { required: usize, available: usize },

    #[error("actuator {actuator} has unknown controller mode flag {flag}")]
    UnknownMode { actuator: usize, flag: i32 },

    #[error("actuator {actuator} ({mode:?}) needs {required} gain parameters, host provides {available}")]
    GainLayout {
        actuator: usize,
        mode: ControllerMode,
        required: usize,
        available: usize,
    },
}
