//! Calibration, control and interaction modes, axis info, remote variables
//! and the remote calibrator side channel.

use super::{fill, ControlBoardWrapper};
use crate::{Result, WrapperError};
use motion_device::{
    CalibrationParams, Capabilities, ControlMode, InteractionMode, JointType, RemoteCalibrator,
};
use std::sync::PoisonError;
use tracing::info;

impl ControlBoardWrapper {
    // ---- calibration ----

    pub fn calibrate_axis(&self, joint: usize, kind: u32, p1: f64, p2: f64, p3: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::CALIBRATION, |dev, axis| {
            dev.as_calibration()
                .map(|c| c.calibrate_axis(axis, kind, p1, p2, p3))
        })
    }

    pub fn set_calibration_params(&self, joint: usize, params: CalibrationParams) -> Result<()> {
        self.on_joint(joint, Capabilities::CALIBRATION, |dev, axis| {
            dev.as_calibration()
                .map(|c| c.set_calibration_params(axis, params))
        })
    }

    pub fn calibration_done(&self, joint: usize) -> Result<bool> {
        self.on_joint(joint, Capabilities::CALIBRATION, |dev, axis| {
            dev.as_calibration().map(|c| c.calibration_done(axis))
        })
    }

    pub fn calibration_done_all(&self) -> Result<bool> {
        let done = self.read_all(Capabilities::CALIBRATION, |dev, axis| {
            dev.as_calibration().map(|c| c.calibration_done(axis))
        })?;
        Ok(done.into_iter().all(|d| d))
    }

    /// True only if every joint in `joints` finished calibrating.
    pub fn calibration_done_group(&self, joints: &[usize]) -> Result<bool> {
        let done = self.read_subset(joints, Capabilities::CALIBRATION, |_, dev, axes, out| {
            dev.as_calibration()
                .map(|c| fill(axes, out, |a| c.calibration_done(a)))
        })?;
        Ok(done.into_iter().all(|d| d))
    }

    // ---- remote calibrator ----

    fn with_calibrator<T>(
        &self,
        op: impl FnOnce(&mut dyn RemoteCalibrator) -> motion_device::Result<T>,
    ) -> Result<T> {
        let cal = self.calibrator().ok_or(WrapperError::NoCalibrator)?;
        let mut guard = cal.lock().unwrap_or_else(PoisonError::into_inner);
        let out = op(&mut *guard)?;
        Ok(out)
    }

    fn check_joint(&self, joint: usize) -> Result<()> {
        self.wrapped().entry(joint).map(drop)
    }

    pub fn is_calibrator_present(&self) -> bool {
        self.with_calibrator(|c| Ok(c.is_calibrator_present()))
            .unwrap_or(false)
    }

    /// Run the whole-part calibration procedure.
    pub fn calibrate(&self) -> Result<()> {
        info!(part = %self.part, "calibrating whole part");
        self.with_calibrator(|c| c.calibrate_whole_part())
    }

    pub fn calibrate_single_joint(&self, joint: usize) -> Result<()> {
        self.check_joint(joint)?;
        self.with_calibrator(|c| c.calibrate_single_joint(joint))
    }

    pub fn homing_single_joint(&self, joint: usize) -> Result<()> {
        self.check_joint(joint)?;
        self.with_calibrator(|c| c.homing_single_joint(joint))
    }

    pub fn homing_whole_part(&self) -> Result<()> {
        self.with_calibrator(|c| c.homing_whole_part())
    }

    /// Park the whole part. `wait` is only logged; parking completes in the calibrator.
    pub fn park(&self, wait: bool) -> Result<()> {
        info!(part = %self.part, wait, "parking whole part");
        self.with_calibrator(|c| c.park_whole_part())
    }

    pub fn park_single_joint(&self, joint: usize, wait: bool) -> Result<()> {
        self.check_joint(joint)?;
        self.with_calibrator(|c| c.park_single_joint(joint, wait))
    }

    pub fn quit_calibrate(&self) -> Result<()> {
        self.with_calibrator(|c| c.quit_calibrate())
    }

    pub fn quit_park(&self) -> Result<()> {
        self.with_calibrator(|c| c.quit_park())
    }

    // ---- control mode ----

    pub fn control_mode(&self, joint: usize) -> Result<ControlMode> {
        self.on_joint(joint, Capabilities::CONTROL_MODE, |dev, axis| {
            dev.as_control_mode().map(|c| c.control_mode(axis))
        })
    }

    pub fn control_modes(&self) -> Result<Vec<ControlMode>> {
        self.control_modes_group(&self.all_joints())
    }

    pub fn control_modes_group(&self, joints: &[usize]) -> Result<Vec<ControlMode>> {
        self.read_subset(joints, Capabilities::CONTROL_MODE, |_, dev, axes, out| {
            dev.as_control_mode()
                .map(|c| c.control_modes_group(axes, out))
        })
    }

    pub fn set_control_mode(&self, joint: usize, mode: ControlMode) -> Result<()> {
        self.on_joint(joint, Capabilities::CONTROL_MODE, |dev, axis| {
            dev.as_control_mode().map(|c| c.set_control_mode(axis, mode))
        })
    }

    pub fn set_control_modes_all(&self, modes: &[ControlMode]) -> Result<()> {
        self.set_control_modes_group(&self.all_joints(), modes)
    }

    pub fn set_control_modes_group(&self, joints: &[usize], modes: &[ControlMode]) -> Result<()> {
        self.write_subset(joints, modes, Capabilities::CONTROL_MODE, |_, dev, axes, vals| {
            dev.as_control_mode()
                .map(|c| c.set_control_modes_group(axes, vals))
        })
    }

    // ---- interaction mode ----

    pub fn interaction_mode(&self, joint: usize) -> Result<InteractionMode> {
        self.on_joint(joint, Capabilities::INTERACTION_MODE, |dev, axis| {
            dev.as_interaction_mode()
                .map(|i| i.interaction_mode(axis))
        })
    }

    pub fn interaction_modes(&self) -> Result<Vec<InteractionMode>> {
        self.interaction_modes_group(&self.all_joints())
    }

    pub fn interaction_modes_group(&self, joints: &[usize]) -> Result<Vec<InteractionMode>> {
        self.read_subset(joints, Capabilities::INTERACTION_MODE, |_, dev, axes, out| {
            dev.as_interaction_mode()
                .map(|i| i.interaction_modes_group(axes, out))
        })
    }

    pub fn set_interaction_mode(&self, joint: usize, mode: InteractionMode) -> Result<()> {
        self.on_joint(joint, Capabilities::INTERACTION_MODE, |dev, axis| {
            dev.as_interaction_mode()
                .map(|i| i.set_interaction_mode(axis, mode))
        })
    }

    pub fn set_interaction_modes_all(&self, modes: &[InteractionMode]) -> Result<()> {
        self.set_interaction_modes_group(&self.all_joints(), modes)
    }

    pub fn set_interaction_modes_group(
        &self,
        joints: &[usize],
        modes: &[InteractionMode],
    ) -> Result<()> {
        self.write_subset(
            joints,
            modes,
            Capabilities::INTERACTION_MODE,
            |_, dev, axes, vals| {
                dev.as_interaction_mode()
                    .map(|i| i.set_interaction_modes_group(axes, vals))
            },
        )
    }

    // ---- axis info ----

    pub fn axis_name(&self, joint: usize) -> Result<String> {
        self.on_joint(joint, Capabilities::AXIS_INFO, |dev, axis| {
            dev.as_axis_info().map(|i| i.axis_name(axis))
        })
    }

    pub fn axis_names(&self) -> Result<Vec<String>> {
        self.read_all(Capabilities::AXIS_INFO, |dev, axis| {
            dev.as_axis_info().map(|i| i.axis_name(axis))
        })
    }

    pub fn joint_type(&self, joint: usize) -> Result<JointType> {
        self.on_joint(joint, Capabilities::AXIS_INFO, |dev, axis| {
            dev.as_axis_info().map(|i| i.joint_type(axis))
        })
    }

    pub fn joint_types(&self) -> Result<Vec<JointType>> {
        self.read_all(Capabilities::AXIS_INFO, |dev, axis| {
            dev.as_axis_info().map(|i| i.joint_type(axis))
        })
    }

    // ---- remote variables ----

    /// The value of `key` on every subdevice, in subdevice order.
    pub fn variable(&self, key: &str) -> Result<Vec<Vec<f64>>> {
        let wrapped = self.wrapped();
        let mut out = Vec::with_capacity(wrapped.subdevices().len());
        for sub in wrapped.subdevices() {
            let mut dev = sub.lock_for(Capabilities::REMOTE_VARIABLES)?;
            let rv = dev
                .as_remote_variables()
                .ok_or_else(|| sub.absent(Capabilities::REMOTE_VARIABLES))?;
            out.push(rv.variable(key)?);
        }
        Ok(out)
    }

    /// Set `key` on every subdevice; `values` holds one entry per subdevice.
    pub fn set_variable(&self, key: &str, values: &[Vec<f64>]) -> Result<()> {
        let wrapped = self.wrapped();
        let subs = wrapped.subdevices();
        if values.len() != subs.len() {
            return Err(WrapperError::LengthMismatch {
                expected: subs.len(),
                got: values.len(),
            });
        }
        for (sub, v) in subs.iter().zip(values) {
            let mut dev = sub.lock_for(Capabilities::REMOTE_VARIABLES)?;
            let rv = dev
                .as_remote_variables()
                .ok_or_else(|| sub.absent(Capabilities::REMOTE_VARIABLES))?;
            rv.set_variable(key, v)?;
        }
        Ok(())
    }

    /// Variable names as reported by the subdevice serving joint 0.
    pub fn variable_names(&self) -> Result<Vec<String>> {
        self.on_joint(0, Capabilities::REMOTE_VARIABLES, |dev, _| {
            dev.as_remote_variables().map(|r| r.variable_names())
        })
    }

    /// Torque shortcut: every joint to torque control.
    pub fn set_torque_mode_all(&self) -> Result<()> {
        let modes = vec![ControlMode::Torque; self.controlled_joints()];
        self.set_control_modes_all(&modes)
    }
}

#[cfg(test)]
mod tests {
    use crate::publish::LatestSnapshots;
    use crate::types::WrapperConfig;
    use crate::{ControlBoardWrapper, DriverHandle};
    use motion_device::{SharedDevice, SimBoard};
    use std::sync::Arc;

    fn three_joints() -> Arc<ControlBoardWrapper> {
        let cfg: WrapperConfig = serde_yaml::from_str(
            "name: /neck\nperiod: 1000\njoints: 3\nnetworks: [a, b]\nranges:\n  a: [0, 1, 0, 1]\n  b: [2, 2, 0, 0]\n",
        )
        .unwrap();
        let w = ControlBoardWrapper::open(&cfg, Arc::new(LatestSnapshots::new()), None).unwrap();
        let (a, b): (SharedDevice, SharedDevice) =
            (SimBoard::new("a", 2).shared(), SimBoard::new("b", 1).shared());
        w.attach_all(vec![
            ("a".to_string(), DriverHandle::Motion(a)),
            ("b".to_string(), DriverHandle::Motion(b)),
        ])
        .unwrap();
        w
    }

    #[test]
    fn calibration_done_is_reported_per_shape() {
        let w = three_joints();
        assert!(!w.calibration_done_all().unwrap());
        w.calibrate_axis(2, 0, 0.0, 0.0, 0.0).unwrap();
        w.calibrate_axis(0, 0, 0.0, 0.0, 0.0).unwrap();
        assert!(w.calibration_done_group(&[2, 0]).unwrap());
        assert!(!w.calibration_done_group(&[0, 1]).unwrap());
        assert!(!w.calibration_done_all().unwrap());
        w.calibrate_axis(1, 0, 0.0, 0.0, 0.0).unwrap();
        assert!(w.calibration_done_all().unwrap());
        assert!(w.calibration_done_group(&[3]).is_err());
    }
}
