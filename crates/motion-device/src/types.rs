use core::fmt;
use serde::{Deserialize, Serialize};

/// Control law currently applied to a joint.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    Idle,
    Position,
    PositionDirect,
    Velocity,
    Torque,
    ImpedancePosition,
    ImpedanceVelocity,
    Pwm,
    Current,
    Mixed,
    /// Request-only mode: asks the board to leave a fault state and go idle.
    ForceIdle,
    HardwareFault,
    Calibrating,
    CalibrationDone,
    NotConfigured,
    Configured,
    #[default]
    Unknown,
}

impl ControlMode {
    pub fn is_fault(&self) -> bool {
        matches!(self, ControlMode::HardwareFault)
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControlMode::Idle => "idle",
            ControlMode::Position => "position",
            ControlMode::PositionDirect => "position_direct",
            ControlMode::Velocity => "velocity",
            ControlMode::Torque => "torque",
            ControlMode::ImpedancePosition => "impedance_position",
            ControlMode::ImpedanceVelocity => "impedance_velocity",
            ControlMode::Pwm => "pwm",
            ControlMode::Current => "current",
            ControlMode::Mixed => "mixed",
            ControlMode::ForceIdle => "force_idle",
            ControlMode::HardwareFault => "hw_fault",
            ControlMode::Calibrating => "calibrating",
            ControlMode::CalibrationDone => "calibration_done",
            ControlMode::NotConfigured => "not_configured",
            ControlMode::Configured => "configured",
            ControlMode::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Interaction (compliance) mode of a joint.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    Stiff,
    Compliant,
    #[default]
    Unknown,
}

/// Kinematic type of a joint; decides the unit conversion for ROS output.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    Revolute,
    Prismatic,
    #[default]
    Unknown,
}

/// A value read from an encoder together with the time it was sampled (seconds).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: f64,
    pub time: f64,
}

impl Sample {
    pub fn new(value: f64, time: f64) -> Self {
        Self { value, time }
    }
}

/// Motor parameters used by torque control.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorTorqueParams {
    pub bemf: f64,
    pub bemf_scale: f64,
    pub ktau: f64,
    pub ktau_scale: f64,
}

/// Parameters for a per-joint calibration procedure. The meaning of the
/// numeric fields depends on `kind` and is owned by the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    pub kind: u32,
    pub param1: f64,
    pub param2: f64,
    pub param3: f64,
    pub param4: f64,
}

/// Stiffness/damping pair of impedance control.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Impedance {
    pub stiffness: f64,
    pub damping: f64,
}

/// Admissible impedance range for one joint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpedanceLimits {
    pub min_stiffness: f64,
    pub max_stiffness: f64,
    pub min_damping: f64,
    pub max_damping: f64,
}

/// Closed interval, used for position/velocity/torque/current ranges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Gains and limits of one axis' low-level position loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pid {
    pub kp: f64,
    pub kd: f64,
    pub ki: f64,
    pub max_int: f64,
    pub max_output: f64,
    pub offset: f64,
    pub scale: f64,
    pub stiction_up: f64,
    pub stiction_down: f64,
    pub kff: f64,
}

impl Pid {
    /// Length of the flat form used on the wire.
    pub const FIELDS: usize = 10;

    /// `kp kd ki max_int max_output offset scale stiction_up stiction_down kff`.
    pub fn to_array(&self) -> [f64; Self::FIELDS] {
        [
            self.kp,
            self.kd,
            self.ki,
            self.max_int,
            self.max_output,
            self.offset,
            self.scale,
            self.stiction_up,
            self.stiction_down,
            self.kff,
        ]
    }

    /// Inverse of [`to_array`](Self::to_array); `None` unless exactly ten values.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        let [kp, kd, ki, max_int, max_output, offset, scale, stiction_up, stiction_down, kff] =
            <[f64; Self::FIELDS]>::try_from(values).ok()?;
        Some(Self {
            kp,
            kd,
            ki,
            max_int,
            max_output,
            offset,
            scale,
            stiction_up,
            stiction_down,
            kff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_flat_form_keeps_field_order() {
        let pid = Pid {
            kp: 1.0,
            kff: 10.0,
            ..Pid::default()
        };
        let flat = pid.to_array();
        assert_eq!(flat[0], 1.0);
        assert_eq!(flat[9], 10.0);
        assert_eq!(Pid::from_slice(&flat), Some(pid));
        assert_eq!(Pid::from_slice(&flat[..9]), None);
    }
}
