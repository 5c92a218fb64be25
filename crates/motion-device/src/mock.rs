use crate::traits::*;
use crate::{
    Capabilities, CalibrationParams, ControlMode, DeviceError, Impedance, ImpedanceLimits,
    InteractionMode, JointType, MotorTorqueParams, Pid, Range, Result, Sample,
};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

/// One backend call recorded by [`SimBoard`].
#[derive(Clone, Debug, PartialEq)]
pub struct SimCall {
    pub op: &'static str,
    pub axes: Vec<usize>,
    pub values: Vec<f64>,
}

#[derive(Clone, Debug, Default)]
struct SimAxis {
    name: String,
    joint_type: JointType,
    position: f64,
    target: f64,
    ref_speed: f64,
    ref_acceleration: f64,
    ref_velocity: f64,
    direct_ref: f64,
    torque: f64,
    ref_torque: f64,
    torque_params: MotorTorqueParams,
    impedance: Impedance,
    impedance_offset: f64,
    duty_ref: f64,
    current_ref: f64,
    motor_position: f64,
    motor_cpr: f64,
    amp_enabled: bool,
    max_current: f64,
    nominal_current: f64,
    peak_current: f64,
    pwm_limit: f64,
    pid: Pid,
    pid_enabled: bool,
    pid_reference: f64,
    pid_integral: f64,
    error_limit: f64,
    temperature: f64,
    temperature_limit: f64,
    gearbox_ratio: f64,
    motor_output_limit: f64,
    limits: Range,
    velocity_limits: Range,
    calibrated: bool,
    calibration: CalibrationParams,
    control_mode: ControlMode,
    interaction_mode: InteractionMode,
    faulted: bool,
}

/// An in-memory motor board. Every command takes effect immediately:
/// position moves land on the encoder, references are stored and read back.
pub struct SimBoard {
    name: String,
    open: bool,
    caps: Capabilities,
    clock: Option<f64>,
    axes: Vec<SimAxis>,
    variables: Vec<(String, Vec<f64>)>,
    calls: Vec<SimCall>,
}

impl SimBoard {
    pub fn new(name: &str, axes: usize) -> Self {
        let axes = (0..axes)
            .map(|i| SimAxis {
                name: format!("{name}_j{i}"),
                joint_type: JointType::Revolute,
                motor_cpr: 4096.0,
                max_current: 2.0,
                nominal_current: 1.0,
                peak_current: 4.0,
                pwm_limit: 100.0,
                pid: Pid {
                    kp: 10.0,
                    max_output: 100.0,
                    scale: 1.0,
                    ..Pid::default()
                },
                pid_enabled: true,
                error_limit: 5.0,
                temperature: 30.0,
                temperature_limit: 80.0,
                gearbox_ratio: 100.0,
                motor_output_limit: 100.0,
                limits: Range::new(-180.0, 180.0),
                velocity_limits: Range::new(0.0, 200.0),
                control_mode: ControlMode::Position,
                interaction_mode: InteractionMode::Stiff,
                ..SimAxis::default()
            })
            .collect();
        Self {
            name: name.to_string(),
            open: true,
            caps: Capabilities::all(),
            clock: None,
            axes,
            variables: vec![("kp".to_string(), vec![1.0])],
            calls: Vec::new(),
        }
    }

    /// Hide some interfaces from [`Capabilities::probe`].
    pub fn without(mut self, caps: Capabilities) -> Self {
        self.caps.remove(caps);
        self
    }

    /// Use a fixed sample time instead of the wall clock.
    pub fn with_clock(mut self, t: f64) -> Self {
        self.clock = Some(t);
        self
    }

    pub fn with_joint_type(mut self, axis: usize, kind: JointType) -> Self {
        if let Some(a) = self.axes.get_mut(axis) {
            a.joint_type = kind;
        }
        self
    }

    pub fn shared(self) -> Arc<Mutex<SimBoard>> {
        Arc::new(Mutex::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn set_clock(&mut self, t: f64) {
        self.clock = Some(t);
    }

    /// Make every call touching `axis` fail with [`DeviceError::Fault`].
    pub fn set_faulted(&mut self, axis: usize, faulted: bool) {
        if let Some(a) = self.axes.get_mut(axis) {
            a.faulted = faulted;
        }
    }

    pub fn set_torque(&mut self, axis: usize, torque: f64) {
        if let Some(a) = self.axes.get_mut(axis) {
            a.torque = torque;
        }
    }

    pub fn set_temperature(&mut self, axis: usize, celsius: f64) {
        if let Some(a) = self.axes.get_mut(axis) {
            a.temperature = celsius;
        }
    }

    pub fn position_of(&self, axis: usize) -> Option<f64> {
        self.axes.get(axis).map(|a| a.position)
    }

    pub fn calls(&self) -> &[SimCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<SimCall> {
        std::mem::take(&mut self.calls)
    }

    fn now(&self) -> f64 {
        self.clock.unwrap_or_else(|| {
            let now = OffsetDateTime::now_utc();
            now.unix_timestamp() as f64 + f64::from(now.nanosecond()) * 1e-9
        })
    }

    fn record(&mut self, op: &'static str, axes: &[usize], values: &[f64]) {
        self.calls.push(SimCall {
            op,
            axes: axes.to_vec(),
            values: values.to_vec(),
        });
    }

    fn axis(&mut self, axis: usize) -> Result<&mut SimAxis> {
        let count = self.axes.len();
        let a = self
            .axes
            .get_mut(axis)
            .ok_or(DeviceError::AxisOutOfRange { axis, axes: count })?;
        if a.faulted {
            return Err(DeviceError::Fault(format!("axis {axis} faulted")));
        }
        Ok(a)
    }

    fn check_lengths(axes: &[usize], values: usize) -> Result<()> {
        if axes.len() != values {
            return Err(DeviceError::LengthMismatch {
                expected: axes.len(),
                got: values,
            });
        }
        Ok(())
    }

    fn enabled(&mut self, cap: Capabilities) -> Option<&mut Self> {
        if self.caps.contains(cap) {
            Some(self)
        } else {
            None
        }
    }
}

impl MotionDevice for SimBoard {
    fn is_open(&self) -> bool {
        self.open
    }

    fn axes(&self) -> Result<usize> {
        if !self.open {
            return Err(DeviceError::NotOpen);
        }
        Ok(self.axes.len())
    }

    fn close(&mut self) -> Result<()> {
        tracing::debug!(board = %self.name, "sim board closed");
        self.open = false;
        Ok(())
    }

    fn as_position(&mut self) -> Option<&mut dyn PositionControl> {
        self.enabled(Capabilities::POSITION).map(|s| s as &mut dyn PositionControl)
    }
    fn as_position_group(&mut self) -> Option<&mut dyn PositionGroupControl> {
        self.enabled(Capabilities::POSITION_GROUP).map(|s| s as &mut dyn PositionGroupControl)
    }
    fn as_velocity(&mut self) -> Option<&mut dyn VelocityControl> {
        self.enabled(Capabilities::VELOCITY).map(|s| s as &mut dyn VelocityControl)
    }
    fn as_velocity_group(&mut self) -> Option<&mut dyn VelocityGroupControl> {
        self.enabled(Capabilities::VELOCITY_GROUP).map(|s| s as &mut dyn VelocityGroupControl)
    }
    fn as_position_direct(&mut self) -> Option<&mut dyn PositionDirectControl> {
        self.enabled(Capabilities::POSITION_DIRECT).map(|s| s as &mut dyn PositionDirectControl)
    }
    fn as_torque(&mut self) -> Option<&mut dyn TorqueControl> {
        self.enabled(Capabilities::TORQUE).map(|s| s as &mut dyn TorqueControl)
    }
    fn as_impedance(&mut self) -> Option<&mut dyn ImpedanceControl> {
        self.enabled(Capabilities::IMPEDANCE).map(|s| s as &mut dyn ImpedanceControl)
    }
    fn as_pwm(&mut self) -> Option<&mut dyn PwmControl> {
        self.enabled(Capabilities::PWM).map(|s| s as &mut dyn PwmControl)
    }
    fn as_current(&mut self) -> Option<&mut dyn CurrentControl> {
        self.enabled(Capabilities::CURRENT).map(|s| s as &mut dyn CurrentControl)
    }
    fn as_encoders(&mut self) -> Option<&mut dyn EncodersTimed> {
        self.enabled(Capabilities::ENCODERS).map(|s| s as &mut dyn EncodersTimed)
    }
    fn as_motor_encoders(&mut self) -> Option<&mut dyn MotorEncoders> {
        self.enabled(Capabilities::MOTOR_ENCODERS).map(|s| s as &mut dyn MotorEncoders)
    }
    fn as_amplifier(&mut self) -> Option<&mut dyn AmplifierControl> {
        self.enabled(Capabilities::AMPLIFIER).map(|s| s as &mut dyn AmplifierControl)
    }
    fn as_limits(&mut self) -> Option<&mut dyn LimitsControl> {
        self.enabled(Capabilities::LIMITS).map(|s| s as &mut dyn LimitsControl)
    }
    fn as_calibration(&mut self) -> Option<&mut dyn CalibrationControl> {
        self.enabled(Capabilities::CALIBRATION).map(|s| s as &mut dyn CalibrationControl)
    }
    fn as_control_mode(&mut self) -> Option<&mut dyn ControlModeControl> {
        self.enabled(Capabilities::CONTROL_MODE).map(|s| s as &mut dyn ControlModeControl)
    }
    fn as_interaction_mode(&mut self) -> Option<&mut dyn InteractionModeControl> {
        self.enabled(Capabilities::INTERACTION_MODE).map(|s| s as &mut dyn InteractionModeControl)
    }
    fn as_axis_info(&mut self) -> Option<&mut dyn AxisInfo> {
        self.enabled(Capabilities::AXIS_INFO).map(|s| s as &mut dyn AxisInfo)
    }
    fn as_remote_variables(&mut self) -> Option<&mut dyn RemoteVariables> {
        self.enabled(Capabilities::REMOTE_VARIABLES).map(|s| s as &mut dyn RemoteVariables)
    }
    fn as_pid(&mut self) -> Option<&mut dyn PidControl> {
        self.enabled(Capabilities::PID).map(|s| s as &mut dyn PidControl)
    }
    fn as_motor(&mut self) -> Option<&mut dyn MotorControl> {
        self.enabled(Capabilities::MOTOR).map(|s| s as &mut dyn MotorControl)
    }
}

impl PositionControl for SimBoard {
    fn position_move(&mut self, axis: usize, target: f64) -> Result<()> {
        self.record("position_move", &[axis], &[target]);
        let a = self.axis(axis)?;
        a.target = target;
        a.position = target;
        Ok(())
    }
    fn relative_move(&mut self, axis: usize, delta: f64) -> Result<()> {
        self.record("relative_move", &[axis], &[delta]);
        let a = self.axis(axis)?;
        a.target += delta;
        a.position = a.target;
        Ok(())
    }
    fn motion_done(&mut self, axis: usize) -> Result<bool> {
        let a = self.axis(axis)?;
        Ok((a.position - a.target).abs() < f64::EPSILON)
    }
    fn set_ref_speed(&mut self, axis: usize, speed: f64) -> Result<()> {
        self.axis(axis)?.ref_speed = speed;
        Ok(())
    }
    fn ref_speed(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.ref_speed)
    }
    fn set_ref_acceleration(&mut self, axis: usize, acc: f64) -> Result<()> {
        self.axis(axis)?.ref_acceleration = acc;
        Ok(())
    }
    fn ref_acceleration(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.ref_acceleration)
    }
    fn stop(&mut self, axis: usize) -> Result<()> {
        self.record("stop", &[axis], &[]);
        let a = self.axis(axis)?;
        a.target = a.position;
        a.ref_velocity = 0.0;
        Ok(())
    }
}

impl PositionGroupControl for SimBoard {
    fn position_move_group(&mut self, axes: &[usize], targets: &[f64]) -> Result<()> {
        Self::check_lengths(axes, targets.len())?;
        self.record("position_move_group", axes, targets);
        for (&axis, &t) in axes.iter().zip(targets) {
            let a = self.axis(axis)?;
            a.target = t;
            a.position = t;
        }
        Ok(())
    }
    fn relative_move_group(&mut self, axes: &[usize], deltas: &[f64]) -> Result<()> {
        Self::check_lengths(axes, deltas.len())?;
        self.record("relative_move_group", axes, deltas);
        for (&axis, &d) in axes.iter().zip(deltas) {
            let a = self.axis(axis)?;
            a.target += d;
            a.position = a.target;
        }
        Ok(())
    }
    fn motion_done_group(&mut self, axes: &[usize]) -> Result<bool> {
        let mut done = true;
        for &axis in axes {
            done &= PositionControl::motion_done(self, axis)?;
        }
        Ok(done)
    }
    fn set_ref_speeds_group(&mut self, axes: &[usize], speeds: &[f64]) -> Result<()> {
        Self::check_lengths(axes, speeds.len())?;
        self.record("set_ref_speeds_group", axes, speeds);
        for (&axis, &v) in axes.iter().zip(speeds) {
            self.axis(axis)?.ref_speed = v;
        }
        Ok(())
    }
    fn ref_speeds_group(&mut self, axes: &[usize], out: &mut [f64]) -> Result<()> {
        Self::check_lengths(axes, out.len())?;
        for (slot, &axis) in out.iter_mut().zip(axes) {
            *slot = self.axis(axis)?.ref_speed;
        }
        Ok(())
    }
    fn set_ref_accelerations_group(&mut self, axes: &[usize], accs: &[f64]) -> Result<()> {
        Self::check_lengths(axes, accs.len())?;
        for (&axis, &v) in axes.iter().zip(accs) {
            self.axis(axis)?.ref_acceleration = v;
        }
        Ok(())
    }
    fn ref_accelerations_group(&mut self, axes: &[usize], out: &mut [f64]) -> Result<()> {
        Self::check_lengths(axes, out.len())?;
        for (slot, &axis) in out.iter_mut().zip(axes) {
            *slot = self.axis(axis)?.ref_acceleration;
        }
        Ok(())
    }
    fn stop_group(&mut self, axes: &[usize]) -> Result<()> {
        self.record("stop_group", axes, &[]);
        for &axis in axes {
            let a = self.axis(axis)?;
            a.target = a.position;
            a.ref_velocity = 0.0;
        }
        Ok(())
    }
    fn target_position(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.target)
    }
    fn target_positions_group(&mut self, axes: &[usize], out: &mut [f64]) -> Result<()> {
        Self::check_lengths(axes, out.len())?;
        for (slot, &axis) in out.iter_mut().zip(axes) {
            *slot = self.axis(axis)?.target;
        }
        Ok(())
    }
}

impl VelocityControl for SimBoard {
    fn velocity_move(&mut self, axis: usize, speed: f64) -> Result<()> {
        self.record("velocity_move", &[axis], &[speed]);
        self.axis(axis)?.ref_velocity = speed;
        Ok(())
    }
}

impl VelocityGroupControl for SimBoard {
    fn velocity_move_group(&mut self, axes: &[usize], speeds: &[f64]) -> Result<()> {
        Self::check_lengths(axes, speeds.len())?;
        self.record("velocity_move_group", axes, speeds);
        for (&axis, &v) in axes.iter().zip(speeds) {
            self.axis(axis)?.ref_velocity = v;
        }
        Ok(())
    }
    fn ref_velocity(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.ref_velocity)
    }
    fn ref_velocities_group(&mut self, axes: &[usize], out: &mut [f64]) -> Result<()> {
        Self::check_lengths(axes, out.len())?;
        for (slot, &axis) in out.iter_mut().zip(axes) {
            *slot = self.axis(axis)?.ref_velocity;
        }
        Ok(())
    }
}

impl PositionDirectControl for SimBoard {
    fn set_position(&mut self, axis: usize, reference: f64) -> Result<()> {
        self.record("set_position", &[axis], &[reference]);
        let a = self.axis(axis)?;
        a.direct_ref = reference;
        a.position = reference;
        Ok(())
    }
    fn set_positions_group(&mut self, axes: &[usize], refs: &[f64]) -> Result<()> {
        Self::check_lengths(axes, refs.len())?;
        self.record("set_positions_group", axes, refs);
        for (&axis, &r) in axes.iter().zip(refs) {
            let a = self.axis(axis)?;
            a.direct_ref = r;
            a.position = r;
        }
        Ok(())
    }
    fn ref_position(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.direct_ref)
    }
    fn ref_positions_group(&mut self, axes: &[usize], out: &mut [f64]) -> Result<()> {
        Self::check_lengths(axes, out.len())?;
        for (slot, &axis) in out.iter_mut().zip(axes) {
            *slot = self.axis(axis)?.direct_ref;
        }
        Ok(())
    }
}

impl TorqueControl for SimBoard {
    fn torque(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.torque)
    }
    fn ref_torque(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.ref_torque)
    }
    fn set_ref_torque(&mut self, axis: usize, reference: f64) -> Result<()> {
        self.record("set_ref_torque", &[axis], &[reference]);
        self.axis(axis)?.ref_torque = reference;
        Ok(())
    }
    fn torque_range(&mut self, axis: usize) -> Result<Range> {
        self.axis(axis)?;
        Ok(Range::new(-10.0, 10.0))
    }
    fn bemf_param(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.torque_params.bemf)
    }
    fn set_bemf_param(&mut self, axis: usize, bemf: f64) -> Result<()> {
        self.axis(axis)?.torque_params.bemf = bemf;
        Ok(())
    }
    fn motor_torque_params(&mut self, axis: usize) -> Result<MotorTorqueParams> {
        Ok(self.axis(axis)?.torque_params)
    }
    fn set_motor_torque_params(&mut self, axis: usize, params: MotorTorqueParams) -> Result<()> {
        self.axis(axis)?.torque_params = params;
        Ok(())
    }
}

impl ImpedanceControl for SimBoard {
    fn impedance(&mut self, axis: usize) -> Result<Impedance> {
        Ok(self.axis(axis)?.impedance)
    }
    fn set_impedance(&mut self, axis: usize, value: Impedance) -> Result<()> {
        let limits = self.impedance_limits(axis)?;
        if value.stiffness < limits.min_stiffness || value.stiffness > limits.max_stiffness {
            return Err(DeviceError::InvalidValue(format!(
                "stiffness {} outside [{}, {}]",
                value.stiffness, limits.min_stiffness, limits.max_stiffness
            )));
        }
        self.axis(axis)?.impedance = value;
        Ok(())
    }
    fn impedance_offset(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.impedance_offset)
    }
    fn set_impedance_offset(&mut self, axis: usize, offset: f64) -> Result<()> {
        self.axis(axis)?.impedance_offset = offset;
        Ok(())
    }
    fn impedance_limits(&mut self, axis: usize) -> Result<ImpedanceLimits> {
        self.axis(axis)?;
        Ok(ImpedanceLimits {
            min_stiffness: 0.0,
            max_stiffness: 5.0,
            min_damping: 0.0,
            max_damping: 1.0,
        })
    }
}

impl PwmControl for SimBoard {
    fn set_ref_duty_cycle(&mut self, axis: usize, duty: f64) -> Result<()> {
        self.record("set_ref_duty_cycle", &[axis], &[duty]);
        self.axis(axis)?.duty_ref = duty;
        Ok(())
    }
    fn ref_duty_cycle(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.duty_ref)
    }
    fn duty_cycle(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.duty_ref)
    }
}

impl CurrentControl for SimBoard {
    fn current(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.current_ref)
    }
    fn ref_current(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.current_ref)
    }
    fn set_ref_current(&mut self, axis: usize, current: f64) -> Result<()> {
        self.record("set_ref_current", &[axis], &[current]);
        self.axis(axis)?.current_ref = current;
        Ok(())
    }
    fn set_ref_currents_group(&mut self, axes: &[usize], currents: &[f64]) -> Result<()> {
        Self::check_lengths(axes, currents.len())?;
        self.record("set_ref_currents_group", axes, currents);
        for (&axis, &c) in axes.iter().zip(currents) {
            self.axis(axis)?.current_ref = c;
        }
        Ok(())
    }
    fn current_range(&mut self, axis: usize) -> Result<Range> {
        let peak = self.axis(axis)?.peak_current;
        Ok(Range::new(-peak, peak))
    }
}

impl EncodersTimed for SimBoard {
    fn encoder_timed(&mut self, axis: usize) -> Result<Sample> {
        let now = self.now();
        Ok(Sample::new(self.axis(axis)?.position, now))
    }
    fn encoder_speed(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.ref_velocity)
    }
    fn encoder_acceleration(&mut self, axis: usize) -> Result<f64> {
        self.axis(axis)?;
        Ok(0.0)
    }
    fn set_encoder(&mut self, axis: usize, value: f64) -> Result<()> {
        let a = self.axis(axis)?;
        a.position = value;
        a.target = value;
        Ok(())
    }
    fn reset_encoder(&mut self, axis: usize) -> Result<()> {
        self.set_encoder(axis, 0.0)
    }
}

impl MotorEncoders for SimBoard {
    fn motor_encoder_timed(&mut self, axis: usize) -> Result<Sample> {
        let now = self.now();
        let a = self.axis(axis)?;
        Ok(Sample::new(a.motor_position + a.position, now))
    }
    fn motor_encoder_speed(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.ref_velocity)
    }
    fn motor_encoder_acceleration(&mut self, axis: usize) -> Result<f64> {
        self.axis(axis)?;
        Ok(0.0)
    }
    fn set_motor_encoder(&mut self, axis: usize, value: f64) -> Result<()> {
        let a = self.axis(axis)?;
        a.motor_position = value - a.position;
        Ok(())
    }
    fn reset_motor_encoder(&mut self, axis: usize) -> Result<()> {
        self.set_motor_encoder(axis, 0.0)
    }
    fn counts_per_revolution(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.motor_cpr)
    }
    fn set_counts_per_revolution(&mut self, axis: usize, cpr: f64) -> Result<()> {
        if cpr <= 0.0 {
            return Err(DeviceError::InvalidValue(format!("cpr {cpr}")));
        }
        self.axis(axis)?.motor_cpr = cpr;
        Ok(())
    }
}

impl AmplifierControl for SimBoard {
    fn enable_amp(&mut self, axis: usize) -> Result<()> {
        self.axis(axis)?.amp_enabled = true;
        Ok(())
    }
    fn disable_amp(&mut self, axis: usize) -> Result<()> {
        self.axis(axis)?.amp_enabled = false;
        Ok(())
    }
    fn amp_current(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.current_ref)
    }
    fn amp_status(&mut self, axis: usize) -> Result<i32> {
        Ok(i32::from(self.axis(axis)?.amp_enabled))
    }
    fn max_current(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.max_current)
    }
    fn set_max_current(&mut self, axis: usize, value: f64) -> Result<()> {
        self.axis(axis)?.max_current = value;
        Ok(())
    }
    fn nominal_current(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.nominal_current)
    }
    fn set_nominal_current(&mut self, axis: usize, value: f64) -> Result<()> {
        let a = self.axis(axis)?;
        if value > a.peak_current {
            return Err(DeviceError::InvalidValue(format!(
                "nominal current {value} above peak {}",
                a.peak_current
            )));
        }
        a.nominal_current = value;
        Ok(())
    }
    fn peak_current(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.peak_current)
    }
    fn set_peak_current(&mut self, axis: usize, value: f64) -> Result<()> {
        self.axis(axis)?.peak_current = value;
        Ok(())
    }
    fn pwm(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.duty_ref)
    }
    fn pwm_limit(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.pwm_limit)
    }
    fn set_pwm_limit(&mut self, axis: usize, value: f64) -> Result<()> {
        self.axis(axis)?.pwm_limit = value;
        Ok(())
    }
    fn power_supply_voltage(&mut self, axis: usize) -> Result<f64> {
        self.axis(axis)?;
        Ok(48.0)
    }
}

impl LimitsControl for SimBoard {
    fn limits(&mut self, axis: usize) -> Result<Range> {
        Ok(self.axis(axis)?.limits)
    }
    fn set_limits(&mut self, axis: usize, limits: Range) -> Result<()> {
        if limits.min > limits.max {
            return Err(DeviceError::InvalidValue("min > max".to_string()));
        }
        self.axis(axis)?.limits = limits;
        Ok(())
    }
    fn velocity_limits(&mut self, axis: usize) -> Result<Range> {
        Ok(self.axis(axis)?.velocity_limits)
    }
    fn set_velocity_limits(&mut self, axis: usize, limits: Range) -> Result<()> {
        self.axis(axis)?.velocity_limits = limits;
        Ok(())
    }
}

impl CalibrationControl for SimBoard {
    fn calibrate_axis(
        &mut self,
        axis: usize,
        kind: u32,
        p1: f64,
        p2: f64,
        p3: f64,
    ) -> Result<()> {
        self.record("calibrate_axis", &[axis], &[f64::from(kind), p1, p2, p3]);
        let a = self.axis(axis)?;
        a.calibration.kind = kind;
        a.calibrated = true;
        Ok(())
    }
    fn set_calibration_params(&mut self, axis: usize, params: CalibrationParams) -> Result<()> {
        self.axis(axis)?.calibration = params;
        Ok(())
    }
    fn calibration_done(&mut self, axis: usize) -> Result<bool> {
        Ok(self.axis(axis)?.calibrated)
    }
}

impl ControlModeControl for SimBoard {
    fn control_mode(&mut self, axis: usize) -> Result<ControlMode> {
        Ok(self.axis(axis)?.control_mode)
    }
    fn set_control_mode(&mut self, axis: usize, mode: ControlMode) -> Result<()> {
        let a = self.axis(axis)?;
        a.control_mode = match mode {
            ControlMode::ForceIdle => ControlMode::Idle,
            other => other,
        };
        Ok(())
    }
}

impl InteractionModeControl for SimBoard {
    fn interaction_mode(&mut self, axis: usize) -> Result<InteractionMode> {
        Ok(self.axis(axis)?.interaction_mode)
    }
    fn set_interaction_mode(&mut self, axis: usize, mode: InteractionMode) -> Result<()> {
        self.axis(axis)?.interaction_mode = mode;
        Ok(())
    }
    fn interaction_modes_group(
        &mut self,
        axes: &[usize],
        out: &mut [InteractionMode],
    ) -> Result<()> {
        Self::check_lengths(axes, out.len())?;
        for (slot, &axis) in out.iter_mut().zip(axes) {
            *slot = self.axis(axis)?.interaction_mode;
        }
        Ok(())
    }
    fn set_interaction_modes_group(
        &mut self,
        axes: &[usize],
        modes: &[InteractionMode],
    ) -> Result<()> {
        Self::check_lengths(axes, modes.len())?;
        for (&axis, &mode) in axes.iter().zip(modes) {
            self.axis(axis)?.interaction_mode = mode;
        }
        Ok(())
    }
}

impl AxisInfo for SimBoard {
    fn axis_name(&mut self, axis: usize) -> Result<String> {
        Ok(self.axis(axis)?.name.clone())
    }
    fn joint_type(&mut self, axis: usize) -> Result<JointType> {
        Ok(self.axis(axis)?.joint_type)
    }
}

impl RemoteVariables for SimBoard {
    fn variable(&mut self, key: &str) -> Result<Vec<f64>> {
        self.variables
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| DeviceError::UnknownVariable(key.to_string()))
    }
    fn set_variable(&mut self, key: &str, values: &[f64]) -> Result<()> {
        match self.variables.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = values.to_vec(),
            None => self.variables.push((key.to_string(), values.to_vec())),
        }
        Ok(())
    }
    fn variable_names(&mut self) -> Result<Vec<String>> {
        Ok(self.variables.iter().map(|(k, _)| k.clone()).collect())
    }
}

/// Each `output` read is one loop step on the encoder position.
impl PidControl for SimBoard {
    fn pid(&mut self, axis: usize) -> Result<Pid> {
        Ok(self.axis(axis)?.pid)
    }
    fn set_pid(&mut self, axis: usize, pid: Pid) -> Result<()> {
        self.record("set_pid", &[axis], &pid.to_array());
        self.axis(axis)?.pid = pid;
        Ok(())
    }
    fn set_pids_group(&mut self, axes: &[usize], pids: &[Pid]) -> Result<()> {
        Self::check_lengths(axes, pids.len())?;
        let kps: Vec<f64> = pids.iter().map(|p| p.kp).collect();
        self.record("set_pids_group", axes, &kps);
        for (&axis, &pid) in axes.iter().zip(pids) {
            self.axis(axis)?.pid = pid;
        }
        Ok(())
    }
    fn reference(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.pid_reference)
    }
    fn set_reference(&mut self, axis: usize, reference: f64) -> Result<()> {
        self.record("set_reference", &[axis], &[reference]);
        self.axis(axis)?.pid_reference = reference;
        Ok(())
    }
    fn error_limit(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.error_limit)
    }
    fn set_error_limit(&mut self, axis: usize, limit: f64) -> Result<()> {
        if limit < 0.0 {
            return Err(DeviceError::InvalidValue(format!("error limit {limit}")));
        }
        self.axis(axis)?.error_limit = limit;
        Ok(())
    }
    fn error(&mut self, axis: usize) -> Result<f64> {
        let a = self.axis(axis)?;
        Ok(a.pid_reference - a.position)
    }
    fn output(&mut self, axis: usize) -> Result<f64> {
        let a = self.axis(axis)?;
        if !a.pid_enabled {
            return Ok(0.0);
        }
        let err = a.pid_reference - a.position;
        a.pid_integral += err;
        if a.pid.max_int > 0.0 {
            a.pid_integral = a.pid_integral.clamp(-a.pid.max_int, a.pid.max_int);
        }
        let raw = a.pid.kp * err + a.pid.ki * a.pid_integral + a.pid.offset;
        let bound = a.pid.max_output.abs();
        Ok(if bound > 0.0 { raw.clamp(-bound, bound) } else { raw })
    }
    fn set_offset(&mut self, axis: usize, offset: f64) -> Result<()> {
        self.axis(axis)?.pid.offset = offset;
        Ok(())
    }
    fn enable_pid(&mut self, axis: usize) -> Result<()> {
        self.record("enable_pid", &[axis], &[]);
        self.axis(axis)?.pid_enabled = true;
        Ok(())
    }
    fn disable_pid(&mut self, axis: usize) -> Result<()> {
        self.record("disable_pid", &[axis], &[]);
        self.axis(axis)?.pid_enabled = false;
        Ok(())
    }
    fn reset_pid(&mut self, axis: usize) -> Result<()> {
        self.record("reset_pid", &[axis], &[]);
        self.axis(axis)?.pid_integral = 0.0;
        Ok(())
    }
    fn is_pid_enabled(&mut self, axis: usize) -> Result<bool> {
        Ok(self.axis(axis)?.pid_enabled)
    }
}

impl MotorControl for SimBoard {
    fn temperature(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.temperature)
    }
    fn temperature_limit(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.temperature_limit)
    }
    fn set_temperature_limit(&mut self, axis: usize, limit: f64) -> Result<()> {
        self.axis(axis)?.temperature_limit = limit;
        Ok(())
    }
    fn gearbox_ratio(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.gearbox_ratio)
    }
    fn set_gearbox_ratio(&mut self, axis: usize, ratio: f64) -> Result<()> {
        if ratio <= 0.0 {
            return Err(DeviceError::InvalidValue(format!("gearbox ratio {ratio}")));
        }
        self.record("set_gearbox_ratio", &[axis], &[ratio]);
        self.axis(axis)?.gearbox_ratio = ratio;
        Ok(())
    }
    fn motor_output_limit(&mut self, axis: usize) -> Result<f64> {
        Ok(self.axis(axis)?.motor_output_limit)
    }
    fn set_motor_output_limit(&mut self, axis: usize, limit: f64) -> Result<()> {
        self.axis(axis)?.motor_output_limit = limit;
        Ok(())
    }
}

/// Calibrator stand-in that records which procedures were requested.
#[derive(Debug, Default)]
pub struct SimCalibrator {
    pub requests: Vec<String>,
}

impl SimCalibrator {
    pub fn shared() -> Arc<Mutex<SimCalibrator>> {
        Arc::new(Mutex::new(Self::default()))
    }
}

impl RemoteCalibrator for SimCalibrator {
    fn calibrate_single_joint(&mut self, joint: usize) -> Result<()> {
        self.requests.push(format!("calibrate {joint}"));
        Ok(())
    }
    fn calibrate_whole_part(&mut self) -> Result<()> {
        self.requests.push("calibrate all".to_string());
        Ok(())
    }
    fn homing_single_joint(&mut self, joint: usize) -> Result<()> {
        self.requests.push(format!("homing {joint}"));
        Ok(())
    }
    fn homing_whole_part(&mut self) -> Result<()> {
        self.requests.push("homing all".to_string());
        Ok(())
    }
    fn park_single_joint(&mut self, joint: usize, wait: bool) -> Result<()> {
        self.requests.push(format!("park {joint} wait={wait}"));
        Ok(())
    }
    fn park_whole_part(&mut self) -> Result<()> {
        self.requests.push("park all".to_string());
        Ok(())
    }
    fn quit_calibrate(&mut self) -> Result<()> {
        self.requests.push("quit calibrate".to_string());
        Ok(())
    }
    fn quit_park(&mut self) -> Result<()> {
        self.requests.push("quit park".to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_reports_hidden_interfaces_as_absent() {
        let mut board = SimBoard::new("arm", 3).without(Capabilities::TORQUE);
        let caps = Capabilities::probe(&mut board);
        assert!(!caps.contains(Capabilities::TORQUE));
        assert!(caps.contains(Capabilities::POSITION | Capabilities::ENCODERS));
    }

    #[test]
    fn group_moves_are_recorded_once() {
        let mut board = SimBoard::new("arm", 3).with_clock(1.5);
        board.position_move_group(&[0, 2], &[10.0, 20.0]).unwrap();
        assert_eq!(board.calls().len(), 1);
        assert_eq!(board.calls()[0].axes, vec![0, 2]);
        let s = board.encoder_timed(2).unwrap();
        assert_eq!(s, Sample::new(20.0, 1.5));
    }

    #[test]
    fn faulted_axis_fails_calls() {
        let mut board = SimBoard::new("arm", 2);
        board.set_faulted(1, true);
        assert!(matches!(board.torque(1), Err(DeviceError::Fault(_))));
        assert!(board.position_move(0, 1.0).is_ok());
    }

    #[test]
    fn pid_output_follows_reference_and_enable_state() {
        let mut board = SimBoard::new("arm", 2);
        board.set_reference(1, 2.0).unwrap();
        assert_eq!(board.error(1).unwrap(), 2.0);
        assert_eq!(board.output(1).unwrap(), 20.0);
        board.disable_pid(1).unwrap();
        assert_eq!(board.output(1).unwrap(), 0.0);
        assert!(!board.is_pid_enabled(1).unwrap());
        assert!(board.set_error_limit(0, -1.0).is_err());
    }

    #[test]
    fn motor_settings_are_validated() {
        let mut board = SimBoard::new("arm", 1);
        board.set_temperature(0, 55.0);
        assert_eq!(MotorControl::temperature(&mut board, 0).unwrap(), 55.0);
        assert!(board.set_gearbox_ratio(0, 0.0).is_err());
        board.set_gearbox_ratio(0, 50.0).unwrap();
        assert_eq!(board.gearbox_ratio(0).unwrap(), 50.0);
        assert!(board.set_nominal_current(0, 10.0).is_err());
        board.set_nominal_current(0, 1.5).unwrap();
        assert_eq!(board.nominal_current(0).unwrap(), 1.5);
    }

    #[test]
    fn out_of_range_axis_is_rejected() {
        let mut board = SimBoard::new("arm", 2);
        assert_eq!(
            board.ref_torque(5),
            Err(DeviceError::AxisOutOfRange { axis: 5, axes: 2 })
        );
    }
}
