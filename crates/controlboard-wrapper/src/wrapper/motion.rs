//! Position, velocity and position-direct routing.

use super::{each, fill, ControlBoardWrapper};
use crate::Result;
use motion_device::Capabilities;

const POSITION_ANY: Capabilities = Capabilities::MANDATORY_ANY_POSITION;
const VELOCITY_ANY: Capabilities = Capabilities::MANDATORY_ANY_VELOCITY;

/// Batched position command: the group interface when present, otherwise
/// one single-axis call per entry.
macro_rules! position_batch {
    ($sub:expr, $dev:expr, $axes:expr, $vals:expr, $group:ident, $single:ident) => {
        if $sub.has(Capabilities::POSITION_GROUP) {
            $dev.as_position_group().map(|p| p.$group($axes, $vals))
        } else {
            $dev.as_position()
                .map(|p| each($axes, $vals, |a, v| p.$single(a, v)))
        }
    };
}

/// Same for position reads.
macro_rules! position_read_batch {
    ($sub:expr, $dev:expr, $axes:expr, $out:expr, $group:ident, $single:ident) => {
        if $sub.has(Capabilities::POSITION_GROUP) {
            $dev.as_position_group().map(|p| p.$group($axes, $out))
        } else {
            $dev.as_position().map(|p| fill($axes, $out, |a| p.$single(a)))
        }
    };
}

impl ControlBoardWrapper {
    // ---- position control ----

    pub fn position_move(&self, joint: usize, target: f64) -> Result<()> {
        self.on_joint(joint, POSITION_ANY, |dev, axis| match dev.as_position() {
            Some(p) => Some(p.position_move(axis, target)),
            None => dev
                .as_position_group()
                .map(|p| p.position_move_group(&[axis], &[target])),
        })
    }

    pub fn position_move_all(&self, targets: &[f64]) -> Result<()> {
        self.position_move_group(&self.all_joints(), targets)
    }

    pub fn position_move_group(&self, joints: &[usize], targets: &[f64]) -> Result<()> {
        self.write_subset(joints, targets, POSITION_ANY, |sub, dev, axes, vals| {
            position_batch!(sub, dev, axes, vals, position_move_group, position_move)
        })
    }

    pub fn relative_move(&self, joint: usize, delta: f64) -> Result<()> {
        self.on_joint(joint, POSITION_ANY, |dev, axis| match dev.as_position() {
            Some(p) => Some(p.relative_move(axis, delta)),
            None => dev
                .as_position_group()
                .map(|p| p.relative_move_group(&[axis], &[delta])),
        })
    }

    pub fn relative_move_all(&self, deltas: &[f64]) -> Result<()> {
        self.relative_move_group(&self.all_joints(), deltas)
    }

    pub fn relative_move_group(&self, joints: &[usize], deltas: &[f64]) -> Result<()> {
        self.write_subset(joints, deltas, POSITION_ANY, |sub, dev, axes, vals| {
            position_batch!(sub, dev, axes, vals, relative_move_group, relative_move)
        })
    }

    pub fn motion_done(&self, joint: usize) -> Result<bool> {
        self.on_joint(joint, POSITION_ANY, |dev, axis| match dev.as_position() {
            Some(p) => Some(p.motion_done(axis)),
            None => dev.as_position_group().map(|p| p.motion_done_group(&[axis])),
        })
    }

    /// True when every joint finished its move.
    pub fn motion_done_all(&self) -> Result<bool> {
        self.motion_done_group(&self.all_joints())
    }

    pub fn motion_done_group(&self, joints: &[usize]) -> Result<bool> {
        let done = self.read_subset(joints, POSITION_ANY, |sub, dev, axes, out: &mut [f64]| {
            let all = if sub.has(Capabilities::POSITION_GROUP) {
                dev.as_position_group().map(|p| p.motion_done_group(axes))
            } else {
                dev.as_position().map(|p| {
                    let mut all = true;
                    for &a in axes {
                        all &= p.motion_done(a)?;
                    }
                    Ok(all)
                })
            }?;
            Some(all.map(|d| out.fill(if d { 1.0 } else { 0.0 })))
        })?;
        Ok(done.iter().all(|&d| d != 0.0))
    }

    pub fn set_ref_speed(&self, joint: usize, speed: f64) -> Result<()> {
        self.on_joint(joint, POSITION_ANY, |dev, axis| match dev.as_position() {
            Some(p) => Some(p.set_ref_speed(axis, speed)),
            None => dev
                .as_position_group()
                .map(|p| p.set_ref_speeds_group(&[axis], &[speed])),
        })
    }

    pub fn set_ref_speeds_all(&self, speeds: &[f64]) -> Result<()> {
        self.set_ref_speeds_group(&self.all_joints(), speeds)
    }

    pub fn set_ref_speeds_group(&self, joints: &[usize], speeds: &[f64]) -> Result<()> {
        self.write_subset(joints, speeds, POSITION_ANY, |sub, dev, axes, vals| {
            position_batch!(sub, dev, axes, vals, set_ref_speeds_group, set_ref_speed)
        })
    }

    pub fn ref_speed(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, POSITION_ANY, |dev, axis| match dev.as_position() {
            Some(p) => Some(p.ref_speed(axis)),
            None => dev.as_position_group().map(|p| {
                let mut out = [0.0];
                p.ref_speeds_group(&[axis], &mut out).map(|()| out[0])
            }),
        })
    }

    pub fn ref_speeds(&self) -> Result<Vec<f64>> {
        self.ref_speeds_group(&self.all_joints())
    }

    pub fn ref_speeds_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, POSITION_ANY, |sub, dev, axes, out| {
            position_read_batch!(sub, dev, axes, out, ref_speeds_group, ref_speed)
        })
    }

    pub fn set_ref_acceleration(&self, joint: usize, acc: f64) -> Result<()> {
        self.on_joint(joint, POSITION_ANY, |dev, axis| match dev.as_position() {
            Some(p) => Some(p.set_ref_acceleration(axis, acc)),
            None => dev
                .as_position_group()
                .map(|p| p.set_ref_accelerations_group(&[axis], &[acc])),
        })
    }

    pub fn set_ref_accelerations_all(&self, accs: &[f64]) -> Result<()> {
        self.set_ref_accelerations_group(&self.all_joints(), accs)
    }

    pub fn set_ref_accelerations_group(&self, joints: &[usize], accs: &[f64]) -> Result<()> {
        self.write_subset(joints, accs, POSITION_ANY, |sub, dev, axes, vals| {
            position_batch!(
                sub,
                dev,
                axes,
                vals,
                set_ref_accelerations_group,
                set_ref_acceleration
            )
        })
    }

    pub fn ref_acceleration(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, POSITION_ANY, |dev, axis| match dev.as_position() {
            Some(p) => Some(p.ref_acceleration(axis)),
            None => dev.as_position_group().map(|p| {
                let mut out = [0.0];
                p.ref_accelerations_group(&[axis], &mut out).map(|()| out[0])
            }),
        })
    }

    pub fn ref_accelerations(&self) -> Result<Vec<f64>> {
        self.ref_accelerations_group(&self.all_joints())
    }

    pub fn ref_accelerations_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, POSITION_ANY, |sub, dev, axes, out| {
            position_read_batch!(sub, dev, axes, out, ref_accelerations_group, ref_acceleration)
        })
    }

    pub fn stop(&self, joint: usize) -> Result<()> {
        self.on_joint(joint, POSITION_ANY, |dev, axis| match dev.as_position() {
            Some(p) => Some(p.stop(axis)),
            None => dev.as_position_group().map(|p| p.stop_group(&[axis])),
        })
    }

    pub fn stop_all(&self) -> Result<()> {
        self.stop_group(&self.all_joints())
    }

    pub fn stop_group(&self, joints: &[usize]) -> Result<()> {
        let zeros = vec![0.0; joints.len()];
        self.write_subset(joints, &zeros, POSITION_ANY, |sub, dev, axes, _| {
            if sub.has(Capabilities::POSITION_GROUP) {
                dev.as_position_group().map(|p| p.stop_group(axes))
            } else {
                dev.as_position()
                    .map(|p| axes.iter().try_for_each(|&a| p.stop(a)))
            }
        })
    }

    pub fn target_position(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::POSITION_GROUP, |dev, axis| {
            dev.as_position_group().map(|p| p.target_position(axis))
        })
    }

    pub fn target_positions(&self) -> Result<Vec<f64>> {
        self.target_positions_group(&self.all_joints())
    }

    pub fn target_positions_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, Capabilities::POSITION_GROUP, |_, dev, axes, out| {
            dev.as_position_group()
                .map(|p| p.target_positions_group(axes, out))
        })
    }

    // ---- velocity control ----

    pub fn velocity_move(&self, joint: usize, speed: f64) -> Result<()> {
        self.on_joint(joint, VELOCITY_ANY, |dev, axis| match dev.as_velocity() {
            Some(v) => Some(v.velocity_move(axis, speed)),
            None => dev
                .as_velocity_group()
                .map(|v| v.velocity_move_group(&[axis], &[speed])),
        })
    }

    pub fn velocity_move_all(&self, speeds: &[f64]) -> Result<()> {
        self.velocity_move_group(&self.all_joints(), speeds)
    }

    pub fn velocity_move_group(&self, joints: &[usize], speeds: &[f64]) -> Result<()> {
        self.write_subset(joints, speeds, VELOCITY_ANY, |sub, dev, axes, vals| {
            if sub.has(Capabilities::VELOCITY_GROUP) {
                dev.as_velocity_group()
                    .map(|v| v.velocity_move_group(axes, vals))
            } else {
                dev.as_velocity()
                    .map(|v| each(axes, vals, |a, s| v.velocity_move(a, s)))
            }
        })
    }

    pub fn ref_velocity(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::VELOCITY_GROUP, |dev, axis| {
            dev.as_velocity_group().map(|v| v.ref_velocity(axis))
        })
    }

    pub fn ref_velocities(&self) -> Result<Vec<f64>> {
        self.ref_velocities_group(&self.all_joints())
    }

    pub fn ref_velocities_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, Capabilities::VELOCITY_GROUP, |_, dev, axes, out| {
            dev.as_velocity_group()
                .map(|v| v.ref_velocities_group(axes, out))
        })
    }

    // ---- position direct ----

    pub fn set_position(&self, joint: usize, reference: f64) -> Result<()> {
        self.on_joint(joint, Capabilities::POSITION_DIRECT, |dev, axis| {
            dev.as_position_direct()
                .map(|p| p.set_position(axis, reference))
        })
    }

    pub fn set_positions_all(&self, refs: &[f64]) -> Result<()> {
        self.set_positions_group(&self.all_joints(), refs)
    }

    pub fn set_positions_group(&self, joints: &[usize], refs: &[f64]) -> Result<()> {
        self.write_subset(joints, refs, Capabilities::POSITION_DIRECT, |_, dev, axes, vals| {
            dev.as_position_direct()
                .map(|p| p.set_positions_group(axes, vals))
        })
    }

    pub fn ref_position(&self, joint: usize) -> Result<f64> {
        self.on_joint(joint, Capabilities::POSITION_DIRECT, |dev, axis| {
            dev.as_position_direct().map(|p| p.ref_position(axis))
        })
    }

    pub fn ref_positions(&self) -> Result<Vec<f64>> {
        self.ref_positions_group(&self.all_joints())
    }

    pub fn ref_positions_group(&self, joints: &[usize]) -> Result<Vec<f64>> {
        self.read_subset(joints, Capabilities::POSITION_DIRECT, |_, dev, axes, out| {
            dev.as_position_direct()
                .map(|p| p.ref_positions_group(axes, out))
        })
    }
}
