use crate::{
    CalibrationParams, ControlMode, Impedance, ImpedanceLimits, InteractionMode, JointType,
    MotorTorqueParams, Pid, Range, Result, Sample,
};
use std::sync::{Arc, Mutex};

/// A backend shared between the wrapper's periodic task and its RPC/streaming threads.
pub type SharedDevice = Arc<Mutex<dyn MotionDevice>>;

/// The calibrator side channel, attached separately from the motion backends.
pub type SharedCalibrator = Arc<Mutex<dyn RemoteCalibrator>>;

/// A multi-axis motor-control backend.
///
/// Every optional interface is exposed through an accessor returning `None`
/// by default. A backend declares what it supports by overriding the
/// accessors for the traits it implements, typically with `Some(self)`.
/// All axis indices are local to the backend.
pub trait MotionDevice: Send {
    /// Whether the driver finished opening and can accept calls.
    fn is_open(&self) -> bool;

    /// Number of axes the backend drives.
    fn axes(&self) -> Result<usize>;

    /// Release hardware resources. Called once by an owning wrapper on close.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn as_position(&mut self) -> Option<&mut dyn PositionControl> {
        None
    }
    fn as_position_group(&mut self) -> Option<&mut dyn PositionGroupControl> {
        None
    }
    fn as_velocity(&mut self) -> Option<&mut dyn VelocityControl> {
        None
    }
    fn as_velocity_group(&mut self) -> Option<&mut dyn VelocityGroupControl> {
        None
    }
    fn as_position_direct(&mut self) -> Option<&mut dyn PositionDirectControl> {
        None
    }
    fn as_torque(&mut self) -> Option<&mut dyn TorqueControl> {
        None
    }
    fn as_impedance(&mut self) -> Option<&mut dyn ImpedanceControl> {
        None
    }
    fn as_pwm(&mut self) -> Option<&mut dyn PwmControl> {
        None
    }
    fn as_current(&mut self) -> Option<&mut dyn CurrentControl> {
        None
    }
    fn as_encoders(&mut self) -> Option<&mut dyn EncodersTimed> {
        None
    }
    fn as_motor_encoders(&mut self) -> Option<&mut dyn MotorEncoders> {
        None
    }
    fn as_amplifier(&mut self) -> Option<&mut dyn AmplifierControl> {
        None
    }
    fn as_limits(&mut self) -> Option<&mut dyn LimitsControl> {
        None
    }
    fn as_calibration(&mut self) -> Option<&mut dyn CalibrationControl> {
        None
    }
    fn as_control_mode(&mut self) -> Option<&mut dyn ControlModeControl> {
        None
    }
    fn as_interaction_mode(&mut self) -> Option<&mut dyn InteractionModeControl> {
        None
    }
    fn as_axis_info(&mut self) -> Option<&mut dyn AxisInfo> {
        None
    }
    fn as_remote_variables(&mut self) -> Option<&mut dyn RemoteVariables> {
        None
    }
    fn as_pid(&mut self) -> Option<&mut dyn PidControl> {
        None
    }
    fn as_motor(&mut self) -> Option<&mut dyn MotorControl> {
        None
    }
}

/// Trajectory-generated position moves, one axis at a time.
pub trait PositionControl {
    fn position_move(&mut self, axis: usize, target: f64) -> Result<()>;
    fn relative_move(&mut self, axis: usize, delta: f64) -> Result<()>;
    fn motion_done(&mut self, axis: usize) -> Result<bool>;
    fn set_ref_speed(&mut self, axis: usize, speed: f64) -> Result<()>;
    fn ref_speed(&mut self, axis: usize) -> Result<f64>;
    fn set_ref_acceleration(&mut self, axis: usize, acc: f64) -> Result<()>;
    fn ref_acceleration(&mut self, axis: usize) -> Result<f64>;
    fn stop(&mut self, axis: usize) -> Result<()>;
}

/// Position control over explicit axis lists; `axes` and the value slices
/// always have the same length.
pub trait PositionGroupControl {
    fn position_move_group(&mut self, axes: &[usize], targets: &[f64]) -> Result<()>;
    fn relative_move_group(&mut self, axes: &[usize], deltas: &[f64]) -> Result<()>;
    fn motion_done_group(&mut self, axes: &[usize]) -> Result<bool>;
    fn set_ref_speeds_group(&mut self, axes: &[usize], speeds: &[f64]) -> Result<()>;
    fn ref_speeds_group(&mut self, axes: &[usize], out: &mut [f64]) -> Result<()>;
    fn set_ref_accelerations_group(&mut self, axes: &[usize], accs: &[f64]) -> Result<()>;
    fn ref_accelerations_group(&mut self, axes: &[usize], out: &mut [f64]) -> Result<()>;
    fn stop_group(&mut self, axes: &[usize]) -> Result<()>;
    fn target_position(&mut self, axis: usize) -> Result<f64>;
    fn target_positions_group(&mut self, axes: &[usize], out: &mut [f64]) -> Result<()>;
}

pub trait VelocityControl {
    fn velocity_move(&mut self, axis: usize, speed: f64) -> Result<()>;
}

pub trait VelocityGroupControl {
    fn velocity_move_group(&mut self, axes: &[usize], speeds: &[f64]) -> Result<()>;
    fn ref_velocity(&mut self, axis: usize) -> Result<f64>;
    fn ref_velocities_group(&mut self, axes: &[usize], out: &mut [f64]) -> Result<()>;
}

/// Position references applied without trajectory generation.
pub trait PositionDirectControl {
    fn set_position(&mut self, axis: usize, reference: f64) -> Result<()>;
    fn set_positions_group(&mut self, axes: &[usize], refs: &[f64]) -> Result<()>;
    fn ref_position(&mut self, axis: usize) -> Result<f64>;
    fn ref_positions_group(&mut self, axes: &[usize], out: &mut [f64]) -> Result<()>;
}

pub trait TorqueControl {
    fn torque(&mut self, axis: usize) -> Result<f64>;
    fn ref_torque(&mut self, axis: usize) -> Result<f64>;
    fn set_ref_torque(&mut self, axis: usize, reference: f64) -> Result<()>;
    fn torque_range(&mut self, axis: usize) -> Result<Range>;
    fn bemf_param(&mut self, axis: usize) -> Result<f64>;
    fn set_bemf_param(&mut self, axis: usize, bemf: f64) -> Result<()>;
    fn motor_torque_params(&mut self, axis: usize) -> Result<MotorTorqueParams>;
    fn set_motor_torque_params(&mut self, axis: usize, params: MotorTorqueParams) -> Result<()>;
}

pub trait ImpedanceControl {
    fn impedance(&mut self, axis: usize) -> Result<Impedance>;
    fn set_impedance(&mut self, axis: usize, value: Impedance) -> Result<()>;
    fn impedance_offset(&mut self, axis: usize) -> Result<f64>;
    fn set_impedance_offset(&mut self, axis: usize, offset: f64) -> Result<()>;
    fn impedance_limits(&mut self, axis: usize) -> Result<ImpedanceLimits>;
}

/// Open-loop PWM duty-cycle control.
pub trait PwmControl {
    fn set_ref_duty_cycle(&mut self, axis: usize, duty: f64) -> Result<()>;
    fn ref_duty_cycle(&mut self, axis: usize) -> Result<f64>;
    fn duty_cycle(&mut self, axis: usize) -> Result<f64>;
}

pub trait CurrentControl {
    fn current(&mut self, axis: usize) -> Result<f64>;
    fn ref_current(&mut self, axis: usize) -> Result<f64>;
    fn set_ref_current(&mut self, axis: usize, current: f64) -> Result<()>;
    fn set_ref_currents_group(&mut self, axes: &[usize], currents: &[f64]) -> Result<()>;
    fn current_range(&mut self, axis: usize) -> Result<Range>;
}

/// Joint encoders reporting the sample time with each reading.
pub trait EncodersTimed {
    fn encoder_timed(&mut self, axis: usize) -> Result<Sample>;
    fn encoder_speed(&mut self, axis: usize) -> Result<f64>;
    fn encoder_acceleration(&mut self, axis: usize) -> Result<f64>;
    fn set_encoder(&mut self, axis: usize, value: f64) -> Result<()>;
    fn reset_encoder(&mut self, axis: usize) -> Result<()>;
}

pub trait MotorEncoders {
    fn motor_encoder_timed(&mut self, axis: usize) -> Result<Sample>;
    fn motor_encoder_speed(&mut self, axis: usize) -> Result<f64>;
    fn motor_encoder_acceleration(&mut self, axis: usize) -> Result<f64>;
    fn set_motor_encoder(&mut self, axis: usize, value: f64) -> Result<()>;
    fn reset_motor_encoder(&mut self, axis: usize) -> Result<()>;
    fn counts_per_revolution(&mut self, axis: usize) -> Result<f64>;
    fn set_counts_per_revolution(&mut self, axis: usize, cpr: f64) -> Result<()>;
}

pub trait AmplifierControl {
    fn enable_amp(&mut self, axis: usize) -> Result<()>;
    fn disable_amp(&mut self, axis: usize) -> Result<()>;
    fn amp_current(&mut self, axis: usize) -> Result<f64>;
    fn amp_status(&mut self, axis: usize) -> Result<i32>;
    fn max_current(&mut self, axis: usize) -> Result<f64>;
    fn set_max_current(&mut self, axis: usize, value: f64) -> Result<()>;
    fn nominal_current(&mut self, axis: usize) -> Result<f64>;
    fn set_nominal_current(&mut self, axis: usize, value: f64) -> Result<()>;
    fn peak_current(&mut self, axis: usize) -> Result<f64>;
    fn set_peak_current(&mut self, axis: usize, value: f64) -> Result<()>;
    fn pwm(&mut self, axis: usize) -> Result<f64>;
    fn pwm_limit(&mut self, axis: usize) -> Result<f64>;
    fn set_pwm_limit(&mut self, axis: usize, value: f64) -> Result<()>;
    fn power_supply_voltage(&mut self, axis: usize) -> Result<f64>;
}

/// The low-level position loop of each axis.
pub trait PidControl {
    fn pid(&mut self, axis: usize) -> Result<Pid>;
    fn set_pid(&mut self, axis: usize, pid: Pid) -> Result<()>;

    fn set_pids_group(&mut self, axes: &[usize], pids: &[Pid]) -> Result<()> {
        for (&axis, &pid) in axes.iter().zip(pids) {
            self.set_pid(axis, pid)?;
        }
        Ok(())
    }

    fn reference(&mut self, axis: usize) -> Result<f64>;
    fn set_reference(&mut self, axis: usize, reference: f64) -> Result<()>;
    fn error_limit(&mut self, axis: usize) -> Result<f64>;
    fn set_error_limit(&mut self, axis: usize, limit: f64) -> Result<()>;
    /// Current tracking error of the loop.
    fn error(&mut self, axis: usize) -> Result<f64>;
    fn output(&mut self, axis: usize) -> Result<f64>;
    fn set_offset(&mut self, axis: usize, offset: f64) -> Result<()>;
    fn enable_pid(&mut self, axis: usize) -> Result<()>;
    fn disable_pid(&mut self, axis: usize) -> Result<()>;
    /// Clear the integrator.
    fn reset_pid(&mut self, axis: usize) -> Result<()>;
    fn is_pid_enabled(&mut self, axis: usize) -> Result<bool>;
}

/// Motor diagnostics and drive-train configuration.
pub trait MotorControl {
    fn temperature(&mut self, axis: usize) -> Result<f64>;
    fn temperature_limit(&mut self, axis: usize) -> Result<f64>;
    fn set_temperature_limit(&mut self, axis: usize, limit: f64) -> Result<()>;
    fn gearbox_ratio(&mut self, axis: usize) -> Result<f64>;
    fn set_gearbox_ratio(&mut self, axis: usize, ratio: f64) -> Result<()>;
    fn motor_output_limit(&mut self, axis: usize) -> Result<f64>;
    fn set_motor_output_limit(&mut self, axis: usize, limit: f64) -> Result<()>;
}

/// Software position and velocity limits.
pub trait LimitsControl {
    fn limits(&mut self, axis: usize) -> Result<Range>;
    fn set_limits(&mut self, axis: usize, limits: Range) -> Result<()>;
    fn velocity_limits(&mut self, axis: usize) -> Result<Range>;
    fn set_velocity_limits(&mut self, axis: usize, limits: Range) -> Result<()>;
}

pub trait CalibrationControl {
    fn calibrate_axis(&mut self, axis: usize, kind: u32, p1: f64, p2: f64, p3: f64)
        -> Result<()>;
    fn set_calibration_params(&mut self, axis: usize, params: CalibrationParams) -> Result<()>;
    fn calibration_done(&mut self, axis: usize) -> Result<bool>;
}

pub trait ControlModeControl {
    fn control_mode(&mut self, axis: usize) -> Result<ControlMode>;
    fn set_control_mode(&mut self, axis: usize, mode: ControlMode) -> Result<()>;

    fn control_modes_group(&mut self, axes: &[usize], out: &mut [ControlMode]) -> Result<()> {
        for (slot, &axis) in out.iter_mut().zip(axes) {
            *slot = self.control_mode(axis)?;
        }
        Ok(())
    }

    fn set_control_modes_group(&mut self, axes: &[usize], modes: &[ControlMode]) -> Result<()> {
        for (&axis, &mode) in axes.iter().zip(modes) {
            self.set_control_mode(axis, mode)?;
        }
        Ok(())
    }
}

pub trait InteractionModeControl {
    fn interaction_mode(&mut self, axis: usize) -> Result<InteractionMode>;
    fn set_interaction_mode(&mut self, axis: usize, mode: InteractionMode) -> Result<()>;
    fn interaction_modes_group(
        &mut self,
        axes: &[usize],
        out: &mut [InteractionMode],
    ) -> Result<()>;
    fn set_interaction_modes_group(
        &mut self,
        axes: &[usize],
        modes: &[InteractionMode],
    ) -> Result<()>;
}

pub trait AxisInfo {
    fn axis_name(&mut self, axis: usize) -> Result<String>;
    fn joint_type(&mut self, axis: usize) -> Result<JointType>;
}

/// Free-form named parameters owned by the backend.
pub trait RemoteVariables {
    fn variable(&mut self, key: &str) -> Result<Vec<f64>>;
    fn set_variable(&mut self, key: &str, values: &[f64]) -> Result<()>;
    fn variable_names(&mut self) -> Result<Vec<String>>;
}

/// Calibration and parking procedures for a whole part, run by a separate
/// calibrator device. Joint indices are the wrapper's external indices.
pub trait RemoteCalibrator: Send {
    fn is_calibrator_present(&mut self) -> bool {
        true
    }
    fn calibrate_single_joint(&mut self, joint: usize) -> Result<()>;
    fn calibrate_whole_part(&mut self) -> Result<()>;
    fn homing_single_joint(&mut self, joint: usize) -> Result<()>;
    fn homing_whole_part(&mut self) -> Result<()>;
    fn park_single_joint(&mut self, joint: usize, wait: bool) -> Result<()>;
    fn park_whole_part(&mut self) -> Result<()>;
    fn quit_calibrate(&mut self) -> Result<()>;
    fn quit_park(&mut self) -> Result<()>;
}
