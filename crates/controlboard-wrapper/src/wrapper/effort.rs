//! Torque, impedance, open-loop PWM and current routing.

use super::{each, fill, ControlBoardWrapper};
use crate::Result;
use motion_device::{Capabilities, Impedance, ImpedanceLimits, MotorTorqueParams, Range};

impl ControlBoardWrapper {
    // ---- torque ----

    pub fn torque(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::TORQUE, |dev, axis| {
            dev.as_torque().map(|t| t.torque(axis))
        })
    }

    pub fn torques(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::TORQUE, |dev, axis| {
            dev.as_torque().map(|t| t.torque(axis))
        })
    }

    pub fn ref_torque(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::TORQUE, |dev, axis| {
            dev.as_torque().map(|t| t.ref_torque(axis))
        })
    }

    pub fn ref_torques(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::TORQUE, |dev, axis| {
            dev.as_torque().map(|t| t.ref_torque(axis))
        })
    }

    pub fn set_ref_torque(&self, joint: usize, reference: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::TORQUE, |dev, axis| {
            dev.as_torque().map(|t| t.set_ref_torque(axis, reference))
        })
    }

    pub fn set_ref_torques_all(&self, refs: &[f64]) -> Result<()> {
        self.write_all(refs, Capabilities::TORQUE, |dev, axis, r| {
            dev.as_torque().map(|t| t.set_ref_torque(axis, r))
        })
    }

    pub fn set_ref_torques_group(&self, joints: &[usize], refs: &[f64]) -> Result<()> {
        self.write_subset(joints, refs, Capabilities::TORQUE, |_, dev, axes, vals| {
            dev.as_torque()
                .map(|t| each(axes, vals, |a, r| t.set_ref_torque(a, r)))
        })
    }

    pub fn torque_range(&self, joint: usize) -> Result<Range> {
        self.on_joint(joint, Capabilities::TORQUE, |dev, axis| {
            dev.as_torque().map(|t| t.torque_range(axis))
        })
    }

    pub fn torque_ranges(&self) -> Result<Vec<Range>> {
        self.read_all(Capabilities::TORQUE, |dev, axis| {
            dev.as_torque().map(|t| t.torque_range(axis))
        })
    }

    pub fn bemf_param(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::TORQUE, |dev, axis| {
            dev.as_torque().map(|t| t.bemf_param(axis))
        })
    }

    pub fn set_bemf_param(&self, joint: usize, bemf: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::TORQUE, |dev, axis| {
            dev.as_torque().map(|t| t.set_bemf_param(axis, bemf))
        })
    }

    pub fn motor_torque_params(&self, joint: usize) -> Result<MotorTorqueParams> {
        self.on_joint(joint, Capabilities::TORQUE, |dev, axis| {
            dev.as_torque().map(|t| t.motor_torque_params(axis))
        })
    }

    pub fn set_motor_torque_params(&self, joint: usize, params: MotorTorqueParams) -> Result<()> {
        self.on_joint(joint, Capabilities::TORQUE, |dev, axis| {
            dev.as_torque()
                .map(|t| t.set_motor_torque_params(axis, params))
        })
    }

    // ---- impedance ----

    pub fn impedance(&self, joint: usize) -> Result<Impedance> {
        self.on_joint(joint, Capabilities::IMPEDANCE, |dev, axis| {
            dev.as_impedance().map(|i| i.impedance(axis))
        })
    }

    pub fn impedances(&self) -> Result<Vec<Impedance>> {
        self.read_all(Capabilities::IMPEDANCE, |dev, axis| {
            dev.as_impedance().map(|i| i.impedance(axis))
        })
    }

    pub fn impedances_group(&self, joints: &[usize]) -> Result<Vec<Impedance>> {
        self.read_subset(joints, Capabilities::IMPEDANCE, |_, dev, axes, out| {
            dev.as_impedance().map(|i| fill(axes, out, |a| i.impedance(a)))
        })
    }

    pub fn set_impedance(&self, joint: usize, value: Impedance) -> Result<()> {
        self.on_joint(joint, Capabilities::IMPEDANCE, |dev, axis| {
            dev.as_impedance().map(|i| i.set_impedance(axis, value))
        })
    }

    pub fn set_impedances_all(&self, values: &[Impedance]) -> Result<()> {
        self.write_all(values, Capabilities::IMPEDANCE, |dev, axis, v| {
            dev.as_impedance().map(|i| i.set_impedance(axis, v))
        })
    }

    pub fn set_impedances_group(&self, joints: &[usize], values: &[Impedance]) -> Result<()> {
        self.write_subset(joints, values, Capabilities::IMPEDANCE, |_, dev, axes, vals| {
            dev.as_impedance()
                .map(|i| each(axes, vals, |a, v| i.set_impedance(a, v)))
        })
    }

    pub fn impedance_offset(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::IMPEDANCE, |dev, axis| {
            dev.as_impedance().map(|i| i.impedance_offset(axis))
        })
    }

    pub fn set_impedance_offset(&self, joint: usize, offset: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::IMPEDANCE, |dev, axis| {
            dev.as_impedance()
                .map(|i| i.set_impedance_offset(axis, offset))
        })
    }

    pub fn impedance_limits(&self, joint: usize) -> Result<ImpedanceLimits> {
        self.on_joint(joint, Capabilities::IMPEDANCE, |dev, axis| {
            dev.as_impedance().map(|i| i.impedance_limits(axis))
        })
    }

    // ---- open-loop PWM ----

    pub fn set_ref_duty_cycle(&self, joint: usize, duty: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::PWM, |dev, axis| {
            dev.as_pwm().map(|p| p.set_ref_duty_cycle(axis, duty))
        })
    }

    pub fn set_ref_duty_cycles_all(&self, duties: &[f64]) -> Result<()> {
        self.write_all(duties, Capabilities::PWM, |dev, axis, d| {
            dev.as_pwm().map(|p| p.set_ref_duty_cycle(axis, d))
        })
    }

    pub fn set_ref_duty_cycles_group(&self, joints: &[usize], duties: &[f64]) -> Result<()> {
        self.write_subset(joints, duties, Capabilities::PWM, |_, dev, axes, vals| {
            dev.as_pwm()
                .map(|p| each(axes, vals, |a, d| p.set_ref_duty_cycle(a, d)))
        })
    }

    pub fn ref_duty_cycle(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::PWM, |dev, axis| {
            dev.as_pwm().map(|p| p.ref_duty_cycle(axis))
        })
    }

    pub fn ref_duty_cycles(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::PWM, |dev, axis| {
            dev.as_pwm().map(|p| p.ref_duty_cycle(axis))
        })
    }

    pub fn duty_cycle(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::PWM, |dev, axis| {
            dev.as_pwm().map(|p| p.duty_cycle(axis))
        })
    }

    pub fn duty_cycles(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::PWM, |dev, axis| {
            dev.as_pwm().map(|p| p.duty_cycle(axis))
        })
    }

    // ---- current ----

    pub fn current(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::CURRENT, |dev, axis| {
            dev.as_current().map(|c| c.current(axis))
        })
    }

    pub fn currents(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::CURRENT, |dev, axis| {
            dev.as_current().map(|c| c.current(axis))
        })
    }

    pub fn ref_current(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::CURRENT, |dev, axis| {
            dev.as_current().map(|c| c.ref_current(axis))
        })
    }

    pub fn ref_currents(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::CURRENT, |dev, axis| {
            dev.as_current().map(|c| c.ref_current(axis))
        })
    }

    pub fn set_ref_current(&self, joint: usize, current: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::CURRENT, |dev, axis| {
            dev.as_current().map(|c| c.set_ref_current(axis, current))
        })
    }

    /// One batch call per subdevice.
    pub fn set_ref_currents_all(&self, currents: &[f64]) -> Result<()> {
        self.set_ref_currents_group(&self.all_joints(), currents)
    }

    pub fn set_ref_currents_group(&self, joints: &[usize], currents: &[f64]) -> Result<()> {
        self.write_subset(joints, currents, Capabilities::CURRENT, |_, dev, axes, vals| {
            dev.as_current()
                .map(|c| c.set_ref_currents_group(axes, vals))
        })
    }

    pub fn current_range(&self, joint: usize) -> Result<Range> {
        self.on_joint(joint, Capabilities::CURRENT, |dev, axis| {
            dev.as_current().map(|c| c.current_range(axis))
        })
    }

    pub fn current_ranges(&self) -> Result<Vec<Range>> {
        self.read_all(Capabilities::CURRENT, |dev, axis| {
            dev.as_current().map(|c| c.current_range(axis))
        })
    }

    /// Reference torques of a subset, read joint by joint.
    pub fn ref_torques_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, Capabilities::TORQUE, |_, dev, axes, out| {
            dev.as_torque().map(|t| fill(axes, out, |a| t.ref_torque(a)))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::publish::LatestSnapshots;
    use crate::types::WrapperConfig;
    use crate::{ControlBoardWrapper, DriverHandle, WrapperError};
    use motion_device::{Capabilities, Impedance, SharedDevice, SimBoard};
    use std::sync::{Arc, Mutex};

    fn wrapper_over(a: SimBoard, b: SimBoard) -> (Arc<ControlBoardWrapper>, Arc<Mutex<SimBoard>>) {
        let cfg: WrapperConfig = serde_yaml::from_str(
            "name: /leg\nperiod: 1000\njoints: 4\nnetworks: [a, b]\nranges:\n  a: [0, 1, 0, 1]\n  b: [2, 3, 0, 1]\n",
        )
        .unwrap();
        let w = ControlBoardWrapper::open(&cfg, Arc::new(LatestSnapshots::new()), None).unwrap();
        let a = a.shared();
        let (da, db): (SharedDevice, SharedDevice) = (a.clone(), b.shared());
        w.attach_all(vec![
            ("a".to_string(), DriverHandle::Motion(da)),
            ("b".to_string(), DriverHandle::Motion(db)),
        ])
        .unwrap();
        a.lock().unwrap().take_calls();
        (w, a)
    }

    fn spring(stiffness: f64) -> Impedance {
        Impedance {
            stiffness,
            damping: 0.1,
        }
    }

    #[test]
    fn impedance_forms_agree() {
        let (w, _) = wrapper_over(SimBoard::new("a", 2), SimBoard::new("b", 2));
        w.set_impedances_all(&[spring(1.0), spring(2.0), spring(3.0), spring(4.0)])
            .unwrap();
        w.set_impedances_group(&[3, 0], &[spring(0.5), spring(4.5)])
            .unwrap();
        let all: Vec<f64> = w.impedances().unwrap().iter().map(|i| i.stiffness).collect();
        assert_eq!(all, vec![4.5, 2.0, 3.0, 0.5]);
        assert_eq!(w.impedances_group(&[2, 1]).unwrap(), vec![spring(3.0), spring(2.0)]);
        assert_eq!(w.impedance(3).unwrap(), spring(0.5));
    }

    #[test]
    fn impedance_outside_board_limits_is_refused() {
        let (w, _) = wrapper_over(SimBoard::new("a", 2), SimBoard::new("b", 2));
        assert!(matches!(
            w.set_impedances_group(&[1], &[spring(50.0)]),
            Err(WrapperError::Backend(_))
        ));
        assert!(w.set_impedances_all(&[spring(1.0); 3]).is_err());
    }

    #[test]
    fn impedance_subset_needs_the_interface_on_every_board() {
        let (w, a) = wrapper_over(
            SimBoard::new("a", 2),
            SimBoard::new("b", 2).without(Capabilities::IMPEDANCE),
        );
        let err = w.set_impedances_group(&[0, 3], &[spring(1.0), spring(1.0)]);
        assert!(matches!(err, Err(WrapperError::CapabilityAbsent { .. })));
        assert!(a.lock().unwrap().calls().is_empty());
        assert_eq!(w.impedances_group(&[0, 1]).unwrap().len(), 2);
    }
}
