use crate::{Result, WrapperError};
use motion_device::{ControlMode, InteractionMode};
use serde::Serialize;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tracing::{debug, info};

/// Sequence number and time in seconds attached to every published snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Stamp {
    pub seq: u32,
    pub time: f64,
}

impl Stamp {
    /// Advance the sequence and store `time`; a non-positive time means the
    /// backends reported none, so the wall clock is used.
    pub fn update(&mut self, time: f64) {
        self.seq = self.seq.wrapping_add(1);
        self.time = if time > 0.0 { time } else { wall_clock() };
    }
}

pub(crate) fn wall_clock() -> f64 {
    let now = OffsetDateTime::now_utc();
    now.unix_timestamp() as f64 + f64::from(now.nanosecond()) * 1e-9
}

/// One per-joint array of the extended snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Field<T> {
    pub values: Vec<T>,
    pub is_valid: bool,
}

impl<T: Clone + Default> Field<T> {
    /// Values of a successful read, or `joints` defaults marked invalid.
    pub fn from_read(joints: usize, read: Result<Vec<T>>) -> Self {
        match read {
            Ok(values) => Field {
                values,
                is_valid: true,
            },
            Err(_) => Field {
                values: vec![T::default(); joints],
                is_valid: false,
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct JointState {
    pub joint_position: Field<f64>,
    pub joint_velocity: Field<f64>,
    pub joint_acceleration: Field<f64>,
    pub motor_position: Field<f64>,
    pub motor_velocity: Field<f64>,
    pub motor_acceleration: Field<f64>,
    pub torque: Field<f64>,
    pub pwm_duty_cycle: Field<f64>,
    pub current: Field<f64>,
    pub control_mode: Field<ControlMode>,
    pub interaction_mode: Field<InteractionMode>,
}

/// `sensor_msgs/JointState`-shaped snapshot; revolute positions in radians.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RosJointState {
    pub seq: u32,
    pub time: f64,
    pub name: Vec<String>,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub effort: Vec<f64>,
}

/// Sink for the snapshots produced by the periodic task. Port writing lives
/// behind this trait.
pub trait StatePublisher: Send + Sync {
    fn publish_positions(&self, positions: &[f64], stamp: Stamp);
    fn publish_state(&self, state: &JointState, stamp: Stamp);
    fn publish_ros(&self, state: &RosJointState);
}

/// Keeps the most recent snapshot of each kind.
#[derive(Debug, Default)]
pub struct LatestSnapshots {
    positions: Mutex<Option<(Vec<f64>, Stamp)>>,
    state: Mutex<Option<(JointState, Stamp)>>,
    ros: Mutex<Option<RosJointState>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LatestSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&self) -> Option<(Vec<f64>, Stamp)> {
        lock(&self.positions).clone()
    }

    pub fn state(&self) -> Option<(JointState, Stamp)> {
        lock(&self.state).clone()
    }

    pub fn ros(&self) -> Option<RosJointState> {
        lock(&self.ros).clone()
    }
}

impl StatePublisher for LatestSnapshots {
    fn publish_positions(&self, positions: &[f64], stamp: Stamp) {
        *lock(&self.positions) = Some((positions.to_vec(), stamp));
    }

    fn publish_state(&self, state: &JointState, stamp: Stamp) {
        *lock(&self.state) = Some((state.clone(), stamp));
    }

    fn publish_ros(&self, state: &RosJointState) {
        *lock(&self.ros) = Some(state.clone());
    }
}

/// A named thread calling `tick` once per period until stopped or until
/// `tick` returns false.
pub(crate) struct PeriodicTask {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn spawn(
        name: &str,
        period: Duration,
        mut tick: impl FnMut() -> bool + Send + 'static,
    ) -> Result<Self> {
        let (stop, rx) = mpsc::channel::<()>();
        let thread_name = name.to_string();
        let handle = std::thread::Builder::new()
            .name(format!("cbw{thread_name}"))
            .spawn(move || {
                loop {
                    let started = Instant::now();
                    if !tick() {
                        break;
                    }
                    match rx.recv_timeout(period.saturating_sub(started.elapsed())) {
                        Err(RecvTimeoutError::Timeout) => {}
                        _ => break,
                    }
                }
                debug!(part = %thread_name, "publish loop exited");
            })
            .map_err(|e| WrapperError::config(format!("cannot start publish thread: {e}")))?;
        info!(part = name, period_ms = period.as_millis() as u64, "publish loop started");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Signal the loop and wait for the current tick to finish.
    pub fn stop(mut self) {
        let _ = self.stop.send(());
        if let Some(h) = self.handle.take() {
            if h.thread().id() != std::thread::current().id() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        let _ = self.stop.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn stamp_falls_back_to_wall_clock() {
        let mut s = Stamp::default();
        s.update(12.5);
        assert_eq!((s.seq, s.time), (1, 12.5));
        s.update(0.0);
        assert_eq!(s.seq, 2);
        assert!(s.time > 1.0e9);
    }

    #[test]
    fn failed_read_yields_invalid_defaults() {
        let f: Field<f64> = Field::from_read(3, Err(WrapperError::NoCalibrator));
        assert_eq!(f.values, vec![0.0; 3]);
        assert!(!f.is_valid);
    }

    #[test]
    fn task_ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let seen = ticks.clone();
        let task = PeriodicTask::spawn("/t", Duration::from_millis(1), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unwrap();
        while ticks.load(Ordering::SeqCst) < 3 {
            std::thread::sleep(Duration::from_millis(1));
        }
        task.stop();
        let after = ticks.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(ticks.load(Ordering::SeqCst), after);
    }

    #[test]
    fn task_ends_when_tick_declines() {
        let task = PeriodicTask::spawn("/t", Duration::from_millis(1), || false).unwrap();
        task.stop();
    }
}
