//! The control-board facade.
//!
//! [`ControlBoardWrapper`] exposes one multi-axis interface over every
//! attached subdevice. Each operation comes in up to three shapes:
//! single joint (`x(j, ..)`), all joints (`x_all(..)` or a plural getter) and
//! an explicit joint subset (`x_group(joints, ..)`). Subset calls are split
//! per subdevice under the scratch lock and issued as one batch call per
//! subdevice when the backend has a group interface.
//!
//! Lock order is `wrapped` (read), then `scratch`, then the backend mutex.

mod admin;
mod effort;
mod motion;
mod pid;
mod sensors;

use crate::loader::{check_joint_names, Layout, RosSettings};
use crate::metrics::WrapperMetrics;
use crate::publish::{Field, JointState, PeriodicTask, RosJointState, Stamp, StatePublisher};
use crate::remap::{Scratch, ScratchSlot};
use crate::types::{OutputMode, WrapperConfig};
use crate::{Result, SubDevice, WrappedDevice, WrapperError};
use motion_device::{
    Capabilities, DeviceError, JointType, MotionDevice, SharedCalibrator, SharedDevice,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::time::Duration;
use tracing::{debug, info, warn};

type DeviceResult<T> = motion_device::Result<T>;

/// Opens the backend of an owning wrapper.
pub trait DriverFactory {
    fn open(&self, kind: &str, config: &WrapperConfig) -> DeviceResult<SharedDevice>;
}

impl<F> DriverFactory for F
where
    F: Fn(&str, &WrapperConfig) -> DeviceResult<SharedDevice>,
{
    fn open(&self, kind: &str, config: &WrapperConfig) -> DeviceResult<SharedDevice> {
        self(kind, config)
    }
}

/// A driver offered to [`ControlBoardWrapper::attach_all`].
#[derive(Clone)]
pub enum DriverHandle {
    Motion(SharedDevice),
    Calibrator(SharedCalibrator),
}

fn is_calibrator_key(key: &str) -> bool {
    key == "calibrator" || key == "Calibrator"
}

pub struct ControlBoardWrapper {
    part: String,
    period: Duration,
    verbose: bool,
    extended_output: bool,
    output_mode: OutputMode,
    ros: Option<RosSettings>,
    owned: Option<SharedDevice>,
    wrapped: RwLock<WrappedDevice>,
    scratch: Mutex<Scratch>,
    stamp: Mutex<Stamp>,
    ros_seq: AtomicU32,
    calibrator: RwLock<Option<SharedCalibrator>>,
    names: RwLock<Vec<String>>,
    joint_types: RwLock<Vec<JointType>>,
    publisher: Arc<dyn StatePublisher>,
    metrics: WrapperMetrics,
    task: Mutex<Option<PeriodicTask>>,
}

impl ControlBoardWrapper {
    /// Validate `config` and build the joint map. An owning wrapper opens its
    /// backend through `factory` and starts publishing immediately; a
    /// deferred one waits for [`attach_all`](Self::attach_all).
    pub fn open(
        config: &WrapperConfig,
        publisher: Arc<dyn StatePublisher>,
        factory: Option<&dyn DriverFactory>,
    ) -> Result<Arc<Self>> {
        let settings = config.validate()?;
        let metrics = WrapperMetrics::new(&settings.part_name)
            .map_err(|e| WrapperError::config(format!("metrics registry: {e}")))?;
        let (mut wrapped, owned) = match &settings.layout {
            Layout::Owned { kind } => {
                let factory = factory.ok_or_else(|| {
                    WrapperError::config(format!("no driver factory to open subdevice '{kind}'"))
                })?;
                let device = factory.open(kind, config).map_err(|e| {
                    WrapperError::config(format!("cannot open subdevice '{kind}': {e}"))
                })?;
                let axes = device
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .axes()?;
                if let Some(ros) = &settings.ros {
                    check_joint_names(ros, axes)?;
                }
                let mut wrapped = WrappedDevice::owned(kind, axes)?;
                if let Some(sub) = wrapped.subdevices_mut().first_mut() {
                    sub.attach(device.clone(), kind)?;
                }
                metrics.attached_subdevices.set(1);
                (wrapped, Some(device))
            }
            Layout::Deferred { joints, networks } => {
                (WrappedDevice::deferred(*joints, networks)?, None)
            }
        };
        wrapped.set_verbose(settings.verbose);
        let joints = wrapped.controlled_joints();
        info!(part = %settings.part_name, joints, owned = owned.is_some(), "control board opened");
        let this = Arc::new(Self {
            part: settings.part_name,
            period: settings.period,
            verbose: settings.verbose,
            extended_output: settings.extended_output,
            output_mode: settings.output_mode,
            ros: settings.ros,
            owned,
            wrapped: RwLock::new(wrapped),
            scratch: Mutex::new(Scratch::default()),
            stamp: Mutex::new(Stamp::default()),
            ros_seq: AtomicU32::new(0),
            calibrator: RwLock::new(None),
            names: RwLock::new(Vec::new()),
            joint_types: RwLock::new(Vec::new()),
            publisher,
            metrics,
            task: Mutex::new(None),
        });
        if this.owned.is_some() {
            this.resolve_axis_info()?;
            this.start()?;
        }
        Ok(this)
    }

    /// Bind drivers to subdevices by key, then start publishing. The
    /// `calibrator` key carries the remote calibrator; unknown keys are
    /// ignored. Fails unless every subdevice ends up attached.
    pub fn attach_all(self: &Arc<Self>, drivers: Vec<(String, DriverHandle)>) -> Result<()> {
        if self.owned.is_some() {
            return Err(WrapperError::Ownership(
                "attach_all is not available when the wrapper owns its backend",
            ));
        }
        self.stop_task();
        {
            let mut wrapped = self.wrapped_mut();
            for (key, handle) in drivers {
                match handle {
                    DriverHandle::Calibrator(c) if is_calibrator_key(&key) => {
                        info!(part = %self.part, "remote calibrator attached");
                        *write(&self.calibrator) = Some(c);
                    }
                    DriverHandle::Calibrator(_) => {
                        warn!(part = %self.part, key = %key, "calibrator offered under a subdevice key, ignored");
                    }
                    DriverHandle::Motion(_) if is_calibrator_key(&key) => {
                        return Err(WrapperError::config(
                            "the calibrator key must carry a calibrator",
                        ));
                    }
                    DriverHandle::Motion(device) => {
                        match wrapped.subdevices_mut().iter_mut().find(|s| s.key() == key) {
                            Some(sub) => sub.attach(device, &key)?,
                            None => warn!(part = %self.part, key = %key, "no subdevice with this key"),
                        }
                    }
                }
            }
            let attached = wrapped.subdevices().iter().filter(|s| s.is_usable()).count();
            self.metrics
                .attached_subdevices
                .set(i64::try_from(attached).unwrap_or(i64::MAX));
            if !wrapped.all_attached() {
                let missing: Vec<&str> = wrapped
                    .subdevices()
                    .iter()
                    .filter(|s| !s.is_usable())
                    .map(SubDevice::key)
                    .collect();
                return Err(WrapperError::config(format!(
                    "subdevices left unattached: {}",
                    missing.join(", ")
                )));
            }
        }
        self.resolve_axis_info()?;
        info!(part = %self.part, "all subdevices attached");
        self.start()
    }

    /// Stop publishing and unbind every driver. Not allowed on an owning wrapper.
    pub fn detach_all(&self) -> Result<()> {
        if self.owned.is_some() {
            return Err(WrapperError::Ownership(
                "detach_all is not available when the wrapper owns its backend",
            ));
        }
        self.stop_task();
        self.wrapped_mut().detach_all();
        *write(&self.calibrator) = None;
        self.metrics.attached_subdevices.set(0);
        info!(part = %self.part, "subdevices detached");
        Ok(())
    }

    /// Stop publishing, unbind drivers and close an owned backend.
    pub fn close(&self) -> Result<()> {
        self.stop_task();
        self.wrapped_mut().detach_all();
        *write(&self.calibrator) = None;
        self.metrics.attached_subdevices.set(0);
        if let Some(dev) = &self.owned {
            dev.lock().unwrap_or_else(PoisonError::into_inner).close()?;
        }
        info!(part = %self.part, "control board closed");
        Ok(())
    }

    /// Start the periodic task if it is not running.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut task = lock(&self.task);
        if task.is_some() {
            return Ok(());
        }
        let weak = Arc::downgrade(self);
        *task = Some(PeriodicTask::spawn(&self.part, self.period, move || {
            match weak.upgrade() {
                Some(w) => {
                    w.run_once();
                    true
                }
                None => false,
            }
        })?);
        Ok(())
    }

    fn stop_task(&self) {
        let task = lock(&self.task).take();
        if let Some(t) = task {
            t.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.task).is_some()
    }

    pub fn is_owned(&self) -> bool {
        self.owned.is_some()
    }

    pub fn part_name(&self) -> &str {
        &self.part
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn metrics(&self) -> &WrapperMetrics {
        &self.metrics
    }

    pub fn controlled_joints(&self) -> usize {
        self.wrapped().controlled_joints()
    }

    /// Stamp of the most recent tick.
    pub fn last_input_stamp(&self) -> Stamp {
        *lock(&self.stamp)
    }

    /// Names used in ROS-shaped snapshots, resolved at attach time.
    pub fn joint_names(&self) -> Vec<String> {
        read(&self.names).clone()
    }

    fn resolve_axis_info(&self) -> Result<()> {
        let joints = self.controlled_joints();
        let reported = self.axis_names();
        let names = match reported {
            Ok(names) => names,
            Err(e) => match self.ros.as_ref().and_then(|r| r.joint_names.clone()) {
                Some(names) => {
                    debug!(part = %self.part, error = %e, "using configured joint names");
                    names
                }
                None if self.output_mode.publishes_ros() => {
                    return Err(WrapperError::config(format!(
                        "ROS output needs joint names but none could be resolved: {e}"
                    )));
                }
                None => vec![String::new(); joints],
            },
        };
        let types = self
            .joint_types()
            .unwrap_or_else(|_| vec![JointType::Unknown; joints]);
        *write(&self.names) = names;
        *write(&self.joint_types) = types;
        Ok(())
    }

    // ---- periodic task ----

    /// One publish cycle: refresh sample caches, advance the stamp and emit
    /// the snapshots selected by the output mode.
    pub fn run_once(&self) {
        let (positions, time_sum) = {
            let wrapped = self.wrapped();
            let mut time_sum = 0.0;
            for sub in wrapped.subdevices().iter().filter(|s| s.is_usable()) {
                time_sum += sub.refresh_samples();
            }
            let positions: Vec<f64> = wrapped
                .lut()
                .iter()
                .map(|e| {
                    wrapped
                        .subdevices()
                        .get(e.subdevice)
                        .map(|s| s.joint_sample(e.offset).value)
                        .unwrap_or_default()
                })
                .collect();
            (positions, time_sum)
        };
        let joints = positions.len();
        let stamp = {
            let mut s = lock(&self.stamp);
            let mean = if joints > 0 {
                time_sum / joints as f64
            } else {
                0.0
            };
            s.update(mean);
            *s
        };
        if self.output_mode.publishes_primary() {
            self.publisher.publish_positions(&positions, stamp);
            if self.extended_output {
                let state = self.joint_state();
                self.publisher.publish_state(&state, stamp);
            }
        }
        if self.output_mode.publishes_ros() {
            let ros = self.ros_state(&positions, stamp);
            self.publisher.publish_ros(&ros);
        }
        self.metrics.publish_ticks.inc();
    }

    /// Every extended field read through all-joints routing.
    pub fn joint_state(&self) -> JointState {
        let n = self.controlled_joints();
        JointState {
            joint_position: Field::from_read(n, self.encoders()),
            joint_velocity: Field::from_read(n, self.encoder_speeds()),
            joint_acceleration: Field::from_read(n, self.encoder_accelerations()),
            motor_position: Field::from_read(n, self.motor_encoders()),
            motor_velocity: Field::from_read(n, self.motor_encoder_speeds()),
            motor_acceleration: Field::from_read(n, self.motor_encoder_accelerations()),
            torque: Field::from_read(n, self.torques()),
            pwm_duty_cycle: Field::from_read(n, self.duty_cycles()),
            current: Field::from_read(n, self.currents()),
            control_mode: Field::from_read(n, self.control_modes()),
            interaction_mode: Field::from_read(n, self.interaction_modes()),
        }
    }

    fn ros_state(&self, positions: &[f64], stamp: Stamp) -> RosJointState {
        let n = positions.len();
        let types = read(&self.joint_types).clone();
        let to_ros = |values: Vec<f64>| -> Vec<f64> {
            values
                .into_iter()
                .enumerate()
                .map(|(j, v)| match types.get(j) {
                    Some(JointType::Revolute) => v.to_radians(),
                    _ => v,
                })
                .collect()
        };
        RosJointState {
            seq: self.ros_seq.fetch_add(1, Ordering::Relaxed),
            time: stamp.time,
            name: read(&self.names).clone(),
            position: to_ros(positions.to_vec()),
            velocity: to_ros(self.encoder_speeds().unwrap_or_else(|_| vec![0.0; n])),
            effort: self.torques().unwrap_or_else(|_| vec![0.0; n]),
        }
    }

    // ---- routing ----

    pub(crate) fn wrapped(&self) -> RwLockReadGuard<'_, WrappedDevice> {
        read(&self.wrapped)
    }

    fn wrapped_mut(&self) -> RwLockWriteGuard<'_, WrappedDevice> {
        write(&self.wrapped)
    }

    pub(crate) fn calibrator(&self) -> Option<SharedCalibrator> {
        read(&self.calibrator).clone()
    }

    fn all_joints(&self) -> Vec<usize> {
        (0..self.controlled_joints()).collect()
    }

    fn backend_error(&self, sub: &SubDevice, e: DeviceError) -> WrapperError {
        if self.verbose {
            debug!(part = %self.part, subdevice = %sub.key(), error = %e, "backend call failed");
        }
        WrapperError::Backend(e)
    }

    /// Route one joint. `op` gets the backend and the backend axis and
    /// returns `None` when the backend lacks the interface.
    pub(crate) fn on_joint<T>(
        &self,
        joint: usize,
        any_of: Capabilities,
        op: impl FnOnce(&mut dyn MotionDevice, usize) -> Option<DeviceResult<T>>,
    ) -> Result<T> {
        let wrapped = self.wrapped();
        let (sub, axis) = wrapped.resolve(joint)?;
        let mut dev = sub.lock_for(any_of)?;
        let outcome = op(&mut *dev, axis);
        match outcome {
            Some(r) => r.map_err(|e| self.backend_error(sub, e)),
            None => Err(sub.absent(any_of)),
        }
    }

    /// Route every joint in index order, stopping at the first failure.
    pub(crate) fn read_all<T>(
        &self,
        any_of: Capabilities,
        mut op: impl FnMut(&mut dyn MotionDevice, usize) -> Option<DeviceResult<T>>,
    ) -> Result<Vec<T>> {
        let wrapped = self.wrapped();
        let n = wrapped.controlled_joints();
        let mut out = Vec::with_capacity(n);
        for joint in 0..n {
            let (sub, axis) = wrapped.resolve(joint)?;
            let mut dev = sub.lock_for(any_of)?;
            let outcome = op(&mut *dev, axis);
            match outcome {
                Some(r) => out.push(r.map_err(|e| self.backend_error(sub, e))?),
                None => return Err(sub.absent(any_of)),
            }
        }
        Ok(out)
    }

    /// Like [`read_all`](Self::read_all) with one input value per joint.
    pub(crate) fn write_all<T: Copy>(
        &self,
        values: &[T],
        any_of: Capabilities,
        mut op: impl FnMut(&mut dyn MotionDevice, usize, T) -> Option<DeviceResult<()>>,
    ) -> Result<()> {
        let n = self.controlled_joints();
        if values.len() != n {
            return Err(WrapperError::LengthMismatch {
                expected: n,
                got: values.len(),
            });
        }
        {
            let wrapped = self.wrapped();
            for sub in wrapped.subdevices() {
                sub.ready_for(any_of)?;
            }
        }
        let mut next = values.iter().copied();
        self.read_all(any_of, |dev, axis| {
            let v = next.next()?;
            op(dev, axis, v)
        })
        .map(drop)
    }

    /// Split `joints` per subdevice and issue one dispatch per touched
    /// subdevice. Every touched subdevice is checked before the first
    /// dispatch, so a missing interface leaves all backends untouched; a
    /// backend failure still fails the whole call.
    pub(crate) fn write_subset<T: ScratchSlot>(
        &self,
        joints: &[usize],
        values: &[T],
        any_of: Capabilities,
        mut dispatch: impl FnMut(&SubDevice, &mut dyn MotionDevice, &[usize], &[T]) -> Option<DeviceResult<()>>,
    ) -> Result<()> {
        if joints.len() != values.len() {
            return Err(WrapperError::LengthMismatch {
                expected: joints.len(),
                got: values.len(),
            });
        }
        let wrapped = self.wrapped();
        let mut scratch = lock(&self.scratch);
        let buf = T::slot(&mut scratch);
        buf.split(&wrapped, joints, Some(values))?;
        for &k in buf.touched() {
            wrapped.subdevice(k)?.ready_for(any_of)?;
        }
        buf.try_for_each(|k, batch| {
            let sub = wrapped.subdevice(k)?;
            let mut dev = sub.lock_for(any_of)?;
            let outcome = dispatch(sub, &mut *dev, batch.axes.as_slice(), batch.values.as_slice());
            match outcome {
                Some(r) => r.map_err(|e| self.backend_error(sub, e)),
                None => Err(sub.absent(any_of)),
            }
        })
    }

    /// Subset read: split, fetch per subdevice, remix into caller order.
    pub(crate) fn read_subset<T: ScratchSlot>(
        &self,
        joints: &[usize],
        any_of: Capabilities,
        mut dispatch: impl FnMut(&SubDevice, &mut dyn MotionDevice, &[usize], &mut [T]) -> Option<DeviceResult<()>>,
    ) -> Result<Vec<T>> {
        let wrapped = self.wrapped();
        let mut scratch = lock(&self.scratch);
        let buf = T::slot(&mut scratch);
        buf.split(&wrapped, joints, None)?;
        for &k in buf.touched() {
            wrapped.subdevice(k)?.ready_for(any_of)?;
        }
        buf.try_for_each(|k, batch| {
            let sub = wrapped.subdevice(k)?;
            let mut dev = sub.lock_for(any_of)?;
            let outcome = dispatch(
                sub,
                &mut *dev,
                batch.axes.as_slice(),
                batch.values.as_mut_slice(),
            );
            match outcome {
                Some(r) => r.map_err(|e| self.backend_error(sub, e)),
                None => Err(sub.absent(any_of)),
            }
        })?;
        let mut out = vec![T::default(); joints.len()];
        buf.remix(&mut out);
        Ok(out)
    }
}

/// Apply `f` to each `(axis, value)` pair.
fn each<T: Copy>(
    axes: &[usize],
    values: &[T],
    mut f: impl FnMut(usize, T) -> DeviceResult<()>,
) -> DeviceResult<()> {
    axes.iter().zip(values).try_for_each(|(&a, &v)| f(a, v))
}

/// Fill `out` with `f(axis)` for each axis.
fn fill<T>(
    axes: &[usize],
    out: &mut [T],
    mut f: impl FnMut(usize) -> DeviceResult<T>,
) -> DeviceResult<()> {
    for (slot, &a) in out.iter_mut().zip(axes) {
        *slot = f(a)?;
    }
    Ok(())
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::LatestSnapshots;
    use motion_device::SimBoard;

    fn owned_config() -> WrapperConfig {
        serde_yaml::from_str("name: /arm\nsubdevice: sim\nperiod: 1000\n").unwrap()
    }

    fn sim_factory(kind: &str, _: &WrapperConfig) -> DeviceResult<SharedDevice> {
        let board: SharedDevice = SimBoard::new(kind, 4).with_clock(3.0).shared();
        Ok(board)
    }

    #[test]
    fn owned_wrapper_starts_and_refuses_attach() {
        let sink = Arc::new(LatestSnapshots::new());
        let w = ControlBoardWrapper::open(&owned_config(), sink, Some(&sim_factory)).unwrap();
        assert!(w.is_owned());
        assert!(w.is_running());
        assert_eq!(w.controlled_joints(), 4);
        assert!(matches!(w.attach_all(Vec::new()), Err(WrapperError::Ownership(_))));
        assert!(matches!(w.detach_all(), Err(WrapperError::Ownership(_))));
        w.close().unwrap();
        assert!(!w.is_running());
    }

    #[test]
    fn owned_layout_needs_a_factory() {
        let sink = Arc::new(LatestSnapshots::new());
        let err = ControlBoardWrapper::open(&owned_config(), sink, None).err();
        assert!(matches!(err, Some(WrapperError::Configuration(_))));
    }

    #[test]
    fn run_once_stamps_with_mean_sample_time() {
        let sink = Arc::new(LatestSnapshots::new());
        let w = ControlBoardWrapper::open(&owned_config(), sink.clone(), Some(&sim_factory))
            .unwrap();
        w.stop_task();
        let before = w.last_input_stamp().seq;
        w.run_once();
        let stamp = w.last_input_stamp();
        assert_eq!(stamp.seq, before + 1);
        assert_eq!(stamp.time, 3.0);
        let (positions, published) = sink.positions().unwrap();
        assert_eq!(positions.len(), 4);
        assert_eq!(published, stamp);
        assert_eq!(w.metrics().publish_ticks.get(), u64::from(stamp.seq));
    }
}
