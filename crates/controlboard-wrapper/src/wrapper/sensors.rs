//! Encoders, motor encoders, motors, amplifier and limits routing.

use super::{each, fill, ControlBoardWrapper};
use crate::Result;
use motion_device::{Capabilities, Range, Sample};

impl ControlBoardWrapper {
    // ---- joint encoders ----

    pub fn encoder(&self, joint: usize) -> Result<f64> {
        self.encoder_timed(joint).map(|s| s.value)
    }

    pub fn encoder_timed(&self, joint: usize) -> Result<Sample> {
        self.on_joint(joint, Capabilities::ENCODERS, |dev, axis| {
            dev.as_encoders().map(|e| e.encoder_timed(axis))
        })
    }

    pub fn encoders(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::ENCODERS, |dev, axis| {
            dev.as_encoders().map(|e| e.encoder_timed(axis).map(|s| s.value))
        })
    }

    pub fn encoders_timed(&self) -> Result<Vec<Sample>> {
        self.read_all(Capabilities::ENCODERS, |dev, axis| {
            dev.as_encoders().map(|e| e.encoder_timed(axis))
        })
    }

    pub fn encoders_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, Capabilities::ENCODERS, |_, dev, axes, out| {
            dev.as_encoders()
                .map(|e| fill(axes, out, |a| e.encoder_timed(a).map(|s| s.value)))
        })
    }

    pub fn encoder_speed(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::ENCODERS, |dev, axis| {
            dev.as_encoders().map(|e| e.encoder_speed(axis))
        })
    }

    pub fn encoder_speeds(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::ENCODERS, |dev, axis| {
            dev.as_encoders().map(|e| e.encoder_speed(axis))
        })
    }

    pub fn encoder_acceleration(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::ENCODERS, |dev, axis| {
            dev.as_encoders().map(|e| e.encoder_acceleration(axis))
        })
    }

    pub fn encoder_accelerations(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::ENCODERS, |dev, axis| {
            dev.as_encoders().map(|e| e.encoder_acceleration(axis))
        })
    }

    pub fn set_encoder(&self, joint: usize, value: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::ENCODERS, |dev, axis| {
            dev.as_encoders().map(|e| e.set_encoder(axis, value))
        })
    }

    pub fn set_encoders_all(&self, values: &[f64]) -> Result<()> {
        self.write_all(values, Capabilities::ENCODERS, |dev, axis, v| {
            dev.as_encoders().map(|e| e.set_encoder(axis, v))
        })
    }

    pub fn reset_encoder(&self, joint: usize) -> Result<()> {
        self.on_joint(joint, Capabilities::ENCODERS, |dev, axis| {
            dev.as_encoders().map(|e| e.reset_encoder(axis))
        })
    }

    pub fn reset_encoders(&self) -> Result<()> {
        self.read_all(Capabilities::ENCODERS, |dev, axis| {
            dev.as_encoders().map(|e| e.reset_encoder(axis))
        })
        .map(drop)
    }

    // ---- motor encoders ----

    pub fn motor_encoder(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::MOTOR_ENCODERS, |dev, axis| {
            dev.as_motor_encoders()
                .map(|m| m.motor_encoder_timed(axis).map(|s| s.value))
        })
    }

    pub fn motor_encoders(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::MOTOR_ENCODERS, |dev, axis| {
            dev.as_motor_encoders()
                .map(|m| m.motor_encoder_timed(axis).map(|s| s.value))
        })
    }

    pub fn motor_encoder_speed(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::MOTOR_ENCODERS, |dev, axis| {
            dev.as_motor_encoders().map(|m| m.motor_encoder_speed(axis))
        })
    }

    pub fn motor_encoder_speeds(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::MOTOR_ENCODERS, |dev, axis| {
            dev.as_motor_encoders().map(|m| m.motor_encoder_speed(axis))
        })
    }

    pub fn motor_encoder_acceleration(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::MOTOR_ENCODERS, |dev, axis| {
            dev.as_motor_encoders()
                .map(|m| m.motor_encoder_acceleration(axis))
        })
    }

    pub fn motor_encoder_accelerations(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::MOTOR_ENCODERS, |dev, axis| {
            dev.as_motor_encoders()
                .map(|m| m.motor_encoder_acceleration(axis))
        })
    }

    pub fn set_motor_encoder(&self, joint: usize, value: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::MOTOR_ENCODERS, |dev, axis| {
            dev.as_motor_encoders()
                .map(|m| m.set_motor_encoder(axis, value))
        })
    }

    pub fn set_motor_encoders_all(&self, values: &[f64]) -> Result<()> {
        self.write_all(values, Capabilities::MOTOR_ENCODERS, |dev, axis, v| {
            dev.as_motor_encoders().map(|m| m.set_motor_encoder(axis, v))
        })
    }

    pub fn reset_motor_encoder(&self, joint: usize) -> Result<()> {
        self.on_joint(joint, Capabilities::MOTOR_ENCODERS, |dev, axis| {
            dev.as_motor_encoders().map(|m| m.reset_motor_encoder(axis))
        })
    }

    pub fn reset_motor_encoders(&self) -> Result<()> {
        self.read_all(Capabilities::MOTOR_ENCODERS, |dev, axis| {
            dev.as_motor_encoders().map(|m| m.reset_motor_encoder(axis))
        })
        .map(drop)
    }

    pub fn counts_per_revolution(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::MOTOR_ENCODERS, |dev, axis| {
            dev.as_motor_encoders()
                .map(|m| m.counts_per_revolution(axis))
        })
    }

    pub fn set_counts_per_revolution(&self, joint: usize, cpr: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::MOTOR_ENCODERS, |dev, axis| {
            dev.as_motor_encoders()
                .map(|m| m.set_counts_per_revolution(axis, cpr))
        })
    }

    /// Every joint has one motor encoder.
    pub fn number_of_motor_encoders(&self) -> usize {
        self.controlled_joints()
    }

    // ---- motors ----

    /// Every joint is driven by one motor.
    pub fn number_of_motors(&self) -> usize {
        self.controlled_joints()
    }

    pub fn temperature(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::MOTOR, |dev, axis| {
            dev.as_motor().map(|m| m.temperature(axis))
        })
    }

    pub fn temperatures(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::MOTOR, |dev, axis| {
            dev.as_motor().map(|m| m.temperature(axis))
        })
    }

    pub fn temperatures_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, Capabilities::MOTOR, |_, dev, axes, out| {
            dev.as_motor().map(|m| fill(axes, out, |a| m.temperature(a)))
        })
    }

    pub fn temperature_limit(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::MOTOR, |dev, axis| {
            dev.as_motor().map(|m| m.temperature_limit(axis))
        })
    }

    pub fn set_temperature_limit(&self, joint: usize, limit: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::MOTOR, |dev, axis| {
            dev.as_motor().map(|m| m.set_temperature_limit(axis, limit))
        })
    }

    pub fn gearbox_ratio(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::MOTOR, |dev, axis| {
            dev.as_motor().map(|m| m.gearbox_ratio(axis))
        })
    }

    pub fn gearbox_ratios(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::MOTOR, |dev, axis| {
            dev.as_motor().map(|m| m.gearbox_ratio(axis))
        })
    }

    pub fn set_gearbox_ratio(&self, joint: usize, ratio: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::MOTOR, |dev, axis| {
            dev.as_motor().map(|m| m.set_gearbox_ratio(axis, ratio))
        })
    }

    pub fn motor_output_limit(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::MOTOR, |dev, axis| {
            dev.as_motor().map(|m| m.motor_output_limit(axis))
        })
    }

    pub fn set_motor_output_limit(&self, joint: usize, limit: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::MOTOR, |dev, axis| {
            dev.as_motor().map(|m| m.set_motor_output_limit(axis, limit))
        })
    }

    // ---- amplifier ----

    pub fn enable_amp(&self, joint: usize) -> Result<()> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.enable_amp(axis))
        })
    }

    pub fn disable_amp(&self, joint: usize) -> Result<()> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.disable_amp(axis))
        })
    }

    /// Enable the amplifiers of a subset; no board is touched unless every
    /// owner has an amplifier interface.
    pub fn enable_amps_group(&self, joints: &[usize]) -> Result<()> {
        let zeros = vec![0.0; joints.len()];
        self.write_subset(joints, &zeros, Capabilities::AMPLIFIER, |_, dev, axes, _| {
            dev.as_amplifier()
                .map(|a| axes.iter().try_for_each(|&ax| a.enable_amp(ax)))
        })
    }

    pub fn disable_amps_group(&self, joints: &[usize]) -> Result<()> {
        let zeros = vec![0.0; joints.len()];
        self.write_subset(joints, &zeros, Capabilities::AMPLIFIER, |_, dev, axes, _| {
            dev.as_amplifier()
                .map(|a| axes.iter().try_for_each(|&ax| a.disable_amp(ax)))
        })
    }

    pub fn enable_amps_all(&self) -> Result<()> {
        self.enable_amps_group(&self.all_joints())
    }

    pub fn disable_amps_all(&self) -> Result<()> {
        self.disable_amps_group(&self.all_joints())
    }

    pub fn amp_current(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.amp_current(axis))
        })
    }

    pub fn amp_currents(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.amp_current(axis))
        })
    }

    pub fn amp_status(&self, joint: usize) -> Result<i32> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.amp_status(axis))
        })
    }

    pub fn amp_statuses(&self) -> Result<Vec<i32>> {
        self.read_all(Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.amp_status(axis))
        })
    }

    pub fn amp_currents_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, Capabilities::AMPLIFIER, |_, dev, axes, out| {
            dev.as_amplifier().map(|a| fill(axes, out, |ax| a.amp_current(ax)))
        })
    }

    pub fn max_current(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.max_current(axis))
        })
    }

    pub fn max_currents(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.max_current(axis))
        })
    }

    pub fn max_currents_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, Capabilities::AMPLIFIER, |_, dev, axes, out| {
            dev.as_amplifier().map(|a| fill(axes, out, |ax| a.max_current(ax)))
        })
    }

    pub fn set_max_current(&self, joint: usize, value: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.set_max_current(axis, value))
        })
    }

    pub fn set_max_currents_all(&self, values: &[f64]) -> Result<()> {
        self.write_all(values, Capabilities::AMPLIFIER, |dev, axis, v| {
            dev.as_amplifier().map(|a| a.set_max_current(axis, v))
        })
    }

    pub fn set_max_currents_group(&self, joints: &[usize], values: &[f64]) -> Result<()> {
        self.write_subset(joints, values, Capabilities::AMPLIFIER, |_, dev, axes, vals| {
            dev.as_amplifier()
                .map(|a| each(axes, vals, |ax, v| a.set_max_current(ax, v)))
        })
    }

    pub fn nominal_current(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.nominal_current(axis))
        })
    }

    pub fn nominal_currents(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.nominal_current(axis))
        })
    }

    pub fn set_nominal_current(&self, joint: usize, value: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.set_nominal_current(axis, value))
        })
    }

    pub fn peak_current(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.peak_current(axis))
        })
    }

    pub fn peak_currents(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.peak_current(axis))
        })
    }

    pub fn set_peak_current(&self, joint: usize, value: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.set_peak_current(axis, value))
        })
    }

    pub fn amp_pwm(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.pwm(axis))
        })
    }

    pub fn pwm_limit(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.pwm_limit(axis))
        })
    }

    pub fn pwm_limits(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.pwm_limit(axis))
        })
    }

    pub fn set_pwm_limit(&self, joint: usize, value: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.set_pwm_limit(axis, value))
        })
    }

    pub fn set_pwm_limits_all(&self, values: &[f64]) -> Result<()> {
        self.write_all(values, Capabilities::AMPLIFIER, |dev, axis, v| {
            dev.as_amplifier().map(|a| a.set_pwm_limit(axis, v))
        })
    }

    pub fn power_supply_voltage(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.power_supply_voltage(axis))
        })
    }

    pub fn power_supply_voltages(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::AMPLIFIER, |dev, axis| {
            dev.as_amplifier().map(|a| a.power_supply_voltage(axis))
        })
    }

    // ---- limits ----

    pub fn limits(&self, joint: usize) -> Result<Range> {
        self.on_joint(joint, Capabilities::LIMITS, |dev, axis| {
            dev.as_limits().map(|l| l.limits(axis))
        })
    }

    pub fn limits_all(&self) -> Result<Vec<Range>> {
        self.read_all(Capabilities::LIMITS, |dev, axis| {
            dev.as_limits().map(|l| l.limits(axis))
        })
    }

    pub fn limits_group(&self, joints: &[usize]) -> Result<Vec<Range>> {
        self.read_subset(joints, Capabilities::LIMITS, |_, dev, axes, out| {
            dev.as_limits().map(|l| fill(axes, out, |a| l.limits(a)))
        })
    }

    pub fn set_limits(&self, joint: usize, limits: Range) -> Result<()> {
        self.on_joint(joint, Capabilities::LIMITS, |dev, axis| {
            dev.as_limits().map(|l| l.set_limits(axis, limits))
        })
    }

    pub fn set_limits_all(&self, limits: &[Range]) -> Result<()> {
        self.write_all(limits, Capabilities::LIMITS, |dev, axis, r| {
            dev.as_limits().map(|l| l.set_limits(axis, r))
        })
    }

    pub fn set_limits_group(&self, joints: &[usize], limits: &[Range]) -> Result<()> {
        self.write_subset(joints, limits, Capabilities::LIMITS, |_, dev, axes, vals| {
            dev.as_limits()
                .map(|l| each(axes, vals, |a, r| l.set_limits(a, r)))
        })
    }

    pub fn velocity_limits(&self, joint: usize) -> Result<Range> {
        self.on_joint(joint, Capabilities::LIMITS, |dev, axis| {
            dev.as_limits().map(|l| l.velocity_limits(axis))
        })
    }

    pub fn velocity_limits_all(&self) -> Result<Vec<Range>> {
        self.read_all(Capabilities::LIMITS, |dev, axis| {
            dev.as_limits().map(|l| l.velocity_limits(axis))
        })
    }

    pub fn velocity_limits_group(&self, joints: &[usize]) -> Result<Vec<Range>> {
        self.read_subset(joints, Capabilities::LIMITS, |_, dev, axes, out| {
            dev.as_limits().map(|l| fill(axes, out, |a| l.velocity_limits(a)))
        })
    }

    pub fn set_velocity_limits(&self, joint: usize, limits: Range) -> Result<()> {
        self.on_joint(joint, Capabilities::LIMITS, |dev, axis| {
            dev.as_limits().map(|l| l.set_velocity_limits(axis, limits))
        })
    }

    pub fn set_velocity_limits_all(&self, limits: &[Range]) -> Result<()> {
        self.write_all(limits, Capabilities::LIMITS, |dev, axis, r| {
            dev.as_limits().map(|l| l.set_velocity_limits(axis, r))
        })
    }

    pub fn set_velocity_limits_group(&self, joints: &[usize], limits: &[Range]) -> Result<()> {
        self.write_subset(joints, limits, Capabilities::LIMITS, |_, dev, axes, vals| {
            dev.as_limits()
                .map(|l| each(axes, vals, |a, r| l.set_velocity_limits(a, r)))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::publish::LatestSnapshots;
    use crate::types::WrapperConfig;
    use crate::{ControlBoardWrapper, DriverHandle, WrapperError};
    use motion_device::{Capabilities, Range, SharedDevice, SimBoard};
    use std::sync::{Arc, Mutex};

    fn two_boards(b: SimBoard) -> (Arc<ControlBoardWrapper>, Arc<Mutex<SimBoard>>) {
        let cfg: WrapperConfig = serde_yaml::from_str(
            "name: /leg\nperiod: 1000\njoints: 4\nnetworks: [a, b]\nranges:\n  a: [0, 1, 0, 1]\n  b: [2, 3, 0, 1]\n",
        )
        .unwrap();
        let w = ControlBoardWrapper::open(&cfg, Arc::new(LatestSnapshots::new()), None).unwrap();
        let a: SharedDevice = SimBoard::new("a", 2).shared();
        let b = b.shared();
        let db: SharedDevice = b.clone();
        w.attach_all(vec![
            ("a".to_string(), DriverHandle::Motion(a)),
            ("b".to_string(), DriverHandle::Motion(db)),
        ])
        .unwrap();
        b.lock().unwrap().take_calls();
        (w, b)
    }

    #[test]
    fn motor_readings_route_per_joint() {
        let mut b = SimBoard::new("b", 2);
        b.set_temperature(1, 61.5);
        let (w, _) = two_boards(b);
        assert_eq!(w.number_of_motors(), 4);
        assert_eq!(w.number_of_motor_encoders(), 4);
        assert_eq!(w.temperature(3).unwrap(), 61.5);
        assert_eq!(w.temperatures().unwrap(), vec![30.0, 30.0, 30.0, 61.5]);
        assert_eq!(w.temperatures_group(&[3, 0]).unwrap(), vec![61.5, 30.0]);
        w.set_temperature_limit(2, 70.0).unwrap();
        assert_eq!(w.temperature_limit(2).unwrap(), 70.0);
        w.set_gearbox_ratio(1, 160.0).unwrap();
        assert_eq!(w.gearbox_ratios().unwrap(), vec![100.0, 160.0, 100.0, 100.0]);
        assert!(w.set_gearbox_ratio(1, -1.0).is_err());
        w.set_motor_output_limit(0, 40.0).unwrap();
        assert_eq!(w.motor_output_limit(0).unwrap(), 40.0);
    }

    #[test]
    fn motor_interface_absent_on_one_board() {
        let (w, _) = two_boards(SimBoard::new("b", 2).without(Capabilities::MOTOR));
        assert!(w.temperature(0).is_ok());
        assert!(matches!(
            w.temperatures(),
            Err(WrapperError::CapabilityAbsent { .. })
        ));
        // the count does not depend on the motor interface
        assert_eq!(w.number_of_motors(), 4);
    }

    #[test]
    fn nominal_current_setter_is_forwarded() {
        let (w, _) = two_boards(SimBoard::new("b", 2));
        w.set_nominal_current(2, 1.75).unwrap();
        assert_eq!(w.nominal_current(2).unwrap(), 1.75);
        assert_eq!(w.nominal_currents().unwrap(), vec![1.0, 1.0, 1.75, 1.0]);
        assert!(w.set_nominal_current(2, 100.0).is_err());
    }

    #[test]
    fn amplifier_shapes_cover_all_and_subsets() {
        let (w, _) = two_boards(SimBoard::new("b", 2));
        w.enable_amps_group(&[3, 1]).unwrap();
        assert_eq!(w.amp_statuses().unwrap(), vec![0, 1, 0, 1]);
        w.enable_amps_all().unwrap();
        w.disable_amps_group(&[0]).unwrap();
        assert_eq!(w.amp_statuses().unwrap(), vec![0, 1, 1, 1]);
        w.set_max_currents_all(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        w.set_max_currents_group(&[2, 0], &[5.0, 6.0]).unwrap();
        assert_eq!(w.max_currents().unwrap(), vec![6.0, 2.0, 5.0, 4.0]);
        assert_eq!(w.max_currents_group(&[3, 1]).unwrap(), vec![4.0, 2.0]);
        w.set_pwm_limits_all(&[50.0; 4]).unwrap();
        assert_eq!(w.pwm_limits().unwrap(), vec![50.0; 4]);
        assert_eq!(w.peak_currents().unwrap(), vec![4.0; 4]);
        assert_eq!(w.power_supply_voltages().unwrap(), vec![48.0; 4]);
        assert_eq!(w.amp_currents_group(&[0, 3]).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn limit_shapes_cover_all_and_subsets() {
        let (w, _) = two_boards(SimBoard::new("b", 2));
        let wide = Range::new(-90.0, 90.0);
        w.set_limits_all(&[wide; 4]).unwrap();
        w.set_limits_group(&[3], &[Range::new(-10.0, 10.0)]).unwrap();
        let all = w.limits_all().unwrap();
        assert_eq!(all[0], wide);
        assert_eq!(all[3], Range::new(-10.0, 10.0));
        assert_eq!(w.limits_group(&[3, 1]).unwrap(), vec![Range::new(-10.0, 10.0), wide]);
        assert!(w.set_limits_group(&[0, 2], &[wide, Range::new(5.0, 1.0)]).is_err());

        w.set_velocity_limits_all(&[Range::new(0.0, 50.0); 4]).unwrap();
        w.set_velocity_limits_group(&[2], &[Range::new(0.0, 20.0)]).unwrap();
        assert_eq!(
            w.velocity_limits_group(&[2, 0]).unwrap(),
            vec![Range::new(0.0, 20.0), Range::new(0.0, 50.0)]
        );
        assert_eq!(w.velocity_limits_all().unwrap().len(), 4);
    }

    #[test]
    fn limit_subset_skips_every_board_when_one_lacks_limits() {
        let (w, b) = two_boards(SimBoard::new("b", 2).without(Capabilities::LIMITS));
        let before = w.limits(0).unwrap();
        let err = w.set_limits_group(&[0, 2], &[Range::new(-1.0, 1.0); 2]);
        assert!(matches!(err, Err(WrapperError::CapabilityAbsent { .. })));
        assert_eq!(w.limits(0).unwrap(), before);
        assert!(b.lock().unwrap().calls().is_empty());
    }
}
