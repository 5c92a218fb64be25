use crate::MotionDevice;

bitflags::bitflags! {
    /// Set of optional control interfaces a backend exposes.
    ///
    /// Computed once per attach by [`Capabilities::probe`] from the accessor
    /// methods of [`MotionDevice`]; routing code consults it with a single
    /// `contains` check before locking the backend.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const POSITION = 1 << 0;
        /// Position control accepting explicit joint lists in one call.
        const POSITION_GROUP = 1 << 1;
        const VELOCITY = 1 << 2;
        /// Velocity control accepting explicit joint lists in one call.
        const VELOCITY_GROUP = 1 << 3;
        const POSITION_DIRECT = 1 << 4;
        const TORQUE = 1 << 5;
        const IMPEDANCE = 1 << 6;
        const PWM = 1 << 7;
        const CURRENT = 1 << 8;
        /// Timed joint encoders.
        const ENCODERS = 1 << 9;
        const MOTOR_ENCODERS = 1 << 10;
        const AMPLIFIER = 1 << 11;
        const LIMITS = 1 << 12;
        const CALIBRATION = 1 << 13;
        const CONTROL_MODE = 1 << 14;
        const INTERACTION_MODE = 1 << 15;
        const AXIS_INFO = 1 << 16;
        const REMOTE_VARIABLES = 1 << 17;
        const PID = 1 << 18;
        /// Temperatures, gearbox ratios and motor output limits.
        const MOTOR = 1 << 19;
    }
}

impl Capabilities {
    /// Interfaces without which a backend cannot be attached.
    pub const MANDATORY_ANY_POSITION: Self = Self::POSITION.union(Self::POSITION_GROUP);
    pub const MANDATORY_ANY_VELOCITY: Self = Self::VELOCITY.union(Self::VELOCITY_GROUP);

    /// Ask the backend which interfaces it implements.
    pub fn probe(dev: &mut dyn MotionDevice) -> Self {
        let mut caps = Self::empty();
        caps.set(Self::POSITION, dev.as_position().is_some());
        caps.set(Self::POSITION_GROUP, dev.as_position_group().is_some());
        caps.set(Self::VELOCITY, dev.as_velocity().is_some());
        caps.set(Self::VELOCITY_GROUP, dev.as_velocity_group().is_some());
        caps.set(Self::POSITION_DIRECT, dev.as_position_direct().is_some());
        caps.set(Self::TORQUE, dev.as_torque().is_some());
        caps.set(Self::IMPEDANCE, dev.as_impedance().is_some());
        caps.set(Self::PWM, dev.as_pwm().is_some());
        caps.set(Self::CURRENT, dev.as_current().is_some());
        caps.set(Self::ENCODERS, dev.as_encoders().is_some());
        caps.set(Self::MOTOR_ENCODERS, dev.as_motor_encoders().is_some());
        caps.set(Self::AMPLIFIER, dev.as_amplifier().is_some());
        caps.set(Self::LIMITS, dev.as_limits().is_some());
        caps.set(Self::CALIBRATION, dev.as_calibration().is_some());
        caps.set(Self::CONTROL_MODE, dev.as_control_mode().is_some());
        caps.set(Self::INTERACTION_MODE, dev.as_interaction_mode().is_some());
        caps.set(Self::AXIS_INFO, dev.as_axis_info().is_some());
        caps.set(Self::REMOTE_VARIABLES, dev.as_remote_variables().is_some());
        caps.set(Self::PID, dev.as_pid().is_some());
        caps.set(Self::MOTOR, dev.as_motor().is_some());
        caps
    }

    /// Human readable name of the (first) flag in this set.
    pub fn label(&self) -> &'static str {
        self.iter_names().next().map(|(name, _)| name).unwrap_or("NONE")
    }
}
