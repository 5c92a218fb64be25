use motion_device::{Capabilities, DeviceError};
use thiserror::Error;

pub type Result<T, E = WrapperError> = core::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WrapperError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("joint {joint} out of range [0, {joints})")]
    JointOutOfRange { joint: usize, joints: usize },
    #[error("subdevice '{subdevice}' does not expose {cap}", cap = .capability.label())]
    CapabilityAbsent {
        subdevice: String,
        capability: Capabilities,
    },
    #[error("subdevice '{0}' is not attached")]
    NotAttached(String),
    #[error("backend call failed: {0}")]
    Backend(#[from] DeviceError),
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("malformed or unknown request: {0}")]
    Protocol(String),
    #[error("{0}")]
    Ownership(&'static str),
    #[error("no calibrator attached")]
    NoCalibrator,
}

impl WrapperError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        WrapperError::Configuration(msg.into())
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        WrapperError::Protocol(msg.into())
    }

    /// Whether a request should be answered as "not recognized" rather than failed.
    pub fn is_protocol(&self) -> bool {
        matches!(self, WrapperError::Protocol(_))
    }
}
