//! Low-level position loop routing: gains, references, error limits and
//! loop diagnostics.

use super::{each, fill, ControlBoardWrapper};
use crate::Result;
use motion_device::{Capabilities, Pid};

impl ControlBoardWrapper {
    // ---- gains ----

    pub fn pid(&self, joint: usize) -> Result<Pid> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.pid(axis))
        })
    }

    pub fn pids(&self) -> Result<Vec<Pid>> {
        self.read_all(Capabilities::PID, |dev, axis| dev.as_pid().map(|p| p.pid(axis)))
    }

    pub fn pids_group(&self, joints: &[usize]) -> Result<Vec<Pid>> {
        self.read_subset(joints, Capabilities::PID, |_, dev, axes, out| {
            dev.as_pid().map(|p| fill(axes, out, |a| p.pid(a)))
        })
    }

    pub fn set_pid(&self, joint: usize, pid: Pid) -> Result<()> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.set_pid(axis, pid))
        })
    }

    /// One batch call per subdevice.
    pub fn set_pids_all(&self, pids: &[Pid]) -> Result<()> {
        self.set_pids_group(&self.all_joints(), pids)
    }

    pub fn set_pids_group(&self, joints: &[usize], pids: &[Pid]) -> Result<()> {
        self.write_subset(joints, pids, Capabilities::PID, |_, dev, axes, vals| {
            dev.as_pid().map(|p| p.set_pids_group(axes, vals))
        })
    }

    pub fn set_pid_offset(&self, joint: usize, offset: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.set_offset(axis, offset))
        })
    }

    // ---- references ----

    pub fn pid_reference(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.reference(axis))
        })
    }

    pub fn pid_references(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.reference(axis))
        })
    }

    pub fn pid_references_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, Capabilities::PID, |_, dev, axes, out| {
            dev.as_pid().map(|p| fill(axes, out, |a| p.reference(a)))
        })
    }

    pub fn set_pid_reference(&self, joint: usize, reference: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.set_reference(axis, reference))
        })
    }

    pub fn set_pid_references_all(&self, refs: &[f64]) -> Result<()> {
        self.write_all(refs, Capabilities::PID, |dev, axis, r| {
            dev.as_pid().map(|p| p.set_reference(axis, r))
        })
    }

    pub fn set_pid_references_group(&self, joints: &[usize], refs: &[f64]) -> Result<()> {
        self.write_subset(joints, refs, Capabilities::PID, |_, dev, axes, vals| {
            dev.as_pid()
                .map(|p| each(axes, vals, |a, r| p.set_reference(a, r)))
        })
    }

    // ---- error limits ----

    pub fn pid_error_limit(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.error_limit(axis))
        })
    }

    pub fn pid_error_limits(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.error_limit(axis))
        })
    }

    pub fn set_pid_error_limit(&self, joint: usize, limit: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.set_error_limit(axis, limit))
        })
    }

    pub fn set_pid_error_limits_all(&self, limits: &[f64]) -> Result<()> {
        self.write_all(limits, Capabilities::PID, |dev, axis, l| {
            dev.as_pid().map(|p| p.set_error_limit(axis, l))
        })
    }

    pub fn set_pid_error_limits_group(&self, joints: &[usize], limits: &[f64]) -> Result<()> {
        self.write_subset(joints, limits, Capabilities::PID, |_, dev, axes, vals| {
            dev.as_pid()
                .map(|p| each(axes, vals, |a, l| p.set_error_limit(a, l)))
        })
    }

    // ---- diagnostics ----

    pub fn pid_error(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.error(axis))
        })
    }

    pub fn pid_errors(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::PID, |dev, axis| dev.as_pid().map(|p| p.error(axis)))
    }

    pub fn pid_errors_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, Capabilities::PID, |_, dev, axes, out| {
            dev.as_pid().map(|p| fill(axes, out, |a| p.error(a)))
        })
    }

    pub fn pid_output(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.output(axis))
        })
    }

    pub fn pid_outputs(&self) -> Result<Vec<f64>> {
        self.read_all(Capabilities::PID, |dev, axis| dev.as_pid().map(|p| p.output(axis)))
    }

    pub fn pid_outputs_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, Capabilities::PID, |_, dev, axes, out| {
            dev.as_pid().map(|p| fill(axes, out, |a| p.output(a)))
        })
    }

    // ---- loop state ----

    pub fn enable_pid(&self, joint: usize) -> Result<()> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.enable_pid(axis))
        })
    }

    pub fn disable_pid(&self, joint: usize) -> Result<()> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.disable_pid(axis))
        })
    }

    pub fn reset_pid(&self, joint: usize) -> Result<()> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.reset_pid(axis))
        })
    }

    pub fn is_pid_enabled(&self, joint: usize) -> Result<bool> {
        self.on_joint(joint, Capabilities::PID, |dev, axis| {
            dev.as_pid().map(|p| p.is_pid_enabled(axis))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::publish::LatestSnapshots;
    use crate::types::WrapperConfig;
    use crate::{ControlBoardWrapper, DriverHandle, WrapperError};
    use motion_device::{Capabilities, Pid, SharedDevice, SimBoard};
    use std::sync::{Arc, Mutex};

    type Boards = (Arc<ControlBoardWrapper>, Arc<Mutex<SimBoard>>, Arc<Mutex<SimBoard>>);

    fn split_pair(b: SimBoard) -> Boards {
        let cfg: WrapperConfig = serde_yaml::from_str(
            "name: /leg\nperiod: 1000\njoints: 4\nnetworks: [a, b]\nranges:\n  a: [0, 1, 0, 1]\n  b: [2, 3, 0, 1]\n",
        )
        .unwrap();
        let w = ControlBoardWrapper::open(&cfg, Arc::new(LatestSnapshots::new()), None).unwrap();
        let a = SimBoard::new("a", 2).shared();
        let b = b.shared();
        let (da, db): (SharedDevice, SharedDevice) = (a.clone(), b.clone());
        w.attach_all(vec![
            ("a".to_string(), DriverHandle::Motion(da)),
            ("b".to_string(), DriverHandle::Motion(db)),
        ])
        .unwrap();
        a.lock().unwrap().take_calls();
        b.lock().unwrap().take_calls();
        (w, a, b)
    }

    fn gains(kp: f64) -> Pid {
        Pid {
            kp,
            scale: 1.0,
            ..Pid::default()
        }
    }

    #[test]
    fn pid_subset_lands_once_per_board() {
        let (w, a, b) = split_pair(SimBoard::new("b", 2));
        w.set_pids_group(&[3, 0, 2], &[gains(3.0), gains(0.5), gains(2.0)])
            .unwrap();
        let on_b = b.lock().unwrap().take_calls();
        assert_eq!(on_b.len(), 1);
        assert_eq!((on_b[0].op, on_b[0].axes.clone()), ("set_pids_group", vec![1, 0]));
        assert_eq!(on_b[0].values, vec![3.0, 2.0]);
        assert_eq!(a.lock().unwrap().take_calls().len(), 1);
        let kps: Vec<f64> = w.pids().unwrap().iter().map(|p| p.kp).collect();
        assert_eq!(kps[0], 0.5);
        assert_eq!(kps[2..], [2.0, 3.0]);
        let picked = w.pids_group(&[2, 0]).unwrap();
        assert_eq!((picked[0].kp, picked[1].kp), (2.0, 0.5));
    }

    #[test]
    fn references_drive_errors_and_outputs() {
        let (w, _, _) = split_pair(SimBoard::new("b", 2));
        w.set_pid_references_all(&[1.0, 0.0, 0.0, -2.0]).unwrap();
        assert_eq!(w.pid_errors().unwrap(), vec![1.0, 0.0, 0.0, -2.0]);
        assert_eq!(w.pid_outputs_group(&[3, 0]).unwrap(), vec![-20.0, 10.0]);
        w.disable_pid(3).unwrap();
        assert!(!w.is_pid_enabled(3).unwrap());
        assert_eq!(w.pid_output(3).unwrap(), 0.0);
        w.set_pid_references_group(&[2], &[4.0]).unwrap();
        assert_eq!(w.pid_references_group(&[2, 3]).unwrap(), vec![4.0, -2.0]);
    }

    #[test]
    fn error_limit_forms_agree() {
        let (w, _, _) = split_pair(SimBoard::new("b", 2));
        w.set_pid_error_limits_all(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        w.set_pid_error_limits_group(&[3], &[9.0]).unwrap();
        w.set_pid_error_limit(0, 0.5).unwrap();
        assert_eq!(w.pid_error_limits().unwrap(), vec![0.5, 2.0, 3.0, 9.0]);
        assert_eq!(w.pid_error_limit(1).unwrap(), 2.0);
    }

    #[test]
    fn pid_writes_skip_every_board_when_one_lacks_the_loop() {
        let (w, a, b) = split_pair(SimBoard::new("b", 2).without(Capabilities::PID));
        let err = w.set_pids_group(&[0, 2], &[gains(1.0), gains(1.0)]);
        assert!(matches!(err, Err(WrapperError::CapabilityAbsent { .. })));
        let err = w.set_pid_references_all(&[1.0; 4]);
        assert!(matches!(err, Err(WrapperError::CapabilityAbsent { .. })));
        assert!(a.lock().unwrap().calls().is_empty());
        assert!(b.lock().unwrap().calls().is_empty());
        assert!(w.pid(1).is_ok());
        assert!(w.pid(2).is_err());
    }
}
