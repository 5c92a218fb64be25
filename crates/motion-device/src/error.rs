use thiserror::Error;

pub type Result<T, E = DeviceError> = core::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    #[error("device is not open")]
    NotOpen,
    #[error("operation not supported on this backend: {0}")]
    Unsupported(&'static str),
    #[error("axis {axis} out of range (device has {axes} axes)")]
    AxisOutOfRange { axis: usize, axes: usize },
    #[error("argument length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("value out of range: {0}")]
    InvalidValue(String),
    #[error("hardware fault: {0}")]
    Fault(String),
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
}
