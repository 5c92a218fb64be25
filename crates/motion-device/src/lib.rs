//! motion-device: backend interfaces for multi-axis motor-control boards
//!
//! A backend implements [`MotionDevice`] plus one trait per control interface it
//! supports, and advertises each through an `as_*` accessor. [`Capabilities`]
//! summarises what a backend offers so callers can check before dispatching.
//! The default build enables a `mock` backend (`SimBoard`) that keeps all state
//! in memory, so binaries and tests run without hardware.

mod types;
pub use types::{
    CalibrationParams, ControlMode, Impedance, ImpedanceLimits, InteractionMode, JointType,
    MotorTorqueParams, Pid, Range, Sample,
};

mod error;
pub use error::{DeviceError, Result};

mod capability;
pub use capability::Capabilities;

mod traits;
pub use traits::{
    AmplifierControl, AxisInfo, CalibrationControl, ControlModeControl, CurrentControl,
    EncodersTimed, ImpedanceControl, InteractionModeControl, LimitsControl, MotionDevice,
    MotorControl, MotorEncoders, PidControl, PositionControl, PositionDirectControl,
    PositionGroupControl, PwmControl, RemoteCalibrator, RemoteVariables, SharedCalibrator,
    SharedDevice, TorqueControl, VelocityControl, VelocityGroupControl,
};

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{SimBoard, SimCalibrator, SimCall};
