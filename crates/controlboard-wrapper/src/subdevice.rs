use crate::{Result, WrapperError};
use motion_device::{Capabilities, MotionDevice, Sample, SharedDevice};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct SampleCache {
    joint: Vec<Sample>,
    motor: Vec<Sample>,
}

/// One backend bound to a contiguous range of its own axes.
///
/// A subdevice is *configured* once its range is validated and *attached*
/// once a live backend is bound; it can be dispatched to only when both hold.
pub struct SubDevice {
    key: String,
    base: usize,
    top: usize,
    axes: usize,
    configured: bool,
    device: Option<SharedDevice>,
    caps: Capabilities,
    samples: Mutex<SampleCache>,
    verbose: bool,
}

impl SubDevice {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            base: 0,
            top: 0,
            axes: 0,
            configured: false,
            device: None,
            caps: Capabilities::empty(),
            samples: Mutex::new(SampleCache::default()),
            verbose: false,
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Validate and store the backend range `[base, top]`.
    pub fn configure(&mut self, base: usize, top: usize, axes: usize, key: &str) -> Result<()> {
        if top < base {
            return Err(WrapperError::config(format!(
                "subdevice '{key}': top {top} is lower than base {base}"
            )));
        }
        if axes == 0 {
            return Err(WrapperError::config(format!(
                "subdevice '{key}': axis count must be positive"
            )));
        }
        if axes != top - base + 1 {
            return Err(WrapperError::config(format!(
                "subdevice '{key}': {axes} axes do not fit range [{base}, {top}]"
            )));
        }
        self.key = key.to_string();
        self.base = base;
        self.top = top;
        self.axes = axes;
        self.configured = true;
        let mut cache = self.cache();
        cache.joint = vec![Sample::default(); axes];
        cache.motor = vec![Sample::default(); axes];
        Ok(())
    }

    /// Bind a live backend and resolve its capabilities.
    pub fn attach(&mut self, device: SharedDevice, key: &str) -> Result<()> {
        if key != self.key {
            return Err(WrapperError::config(format!(
                "wrong key: expected '{}', got '{key}'",
                self.key
            )));
        }
        if !self.configured {
            return Err(WrapperError::config(format!(
                "subdevice '{key}' attached before being configured"
            )));
        }
        let caps = {
            let mut dev = device.lock().unwrap_or_else(PoisonError::into_inner);
            if !dev.is_open() {
                return Err(WrapperError::config(format!(
                    "driver for '{key}' is not open"
                )));
            }
            let caps = Capabilities::probe(&mut *dev);
            if !caps.intersects(Capabilities::MANDATORY_ANY_POSITION) {
                return Err(WrapperError::config(format!(
                    "driver for '{key}' has no position control"
                )));
            }
            if !caps.intersects(Capabilities::MANDATORY_ANY_VELOCITY) {
                return Err(WrapperError::config(format!(
                    "driver for '{key}' has no velocity control"
                )));
            }
            if !caps.contains(Capabilities::ENCODERS) {
                return Err(WrapperError::config(format!(
                    "driver for '{key}' has no timed encoders"
                )));
            }
            let device_axes = dev.axes()?;
            if device_axes <= self.top {
                return Err(WrapperError::config(format!(
                    "driver for '{key}' has {device_axes} axes, range [{}, {}] needs {}",
                    self.base,
                    self.top,
                    self.top + 1
                )));
            }
            caps
        };
        for (name, _) in caps.complement().iter_names() {
            warn!(subdevice = %key, capability = name, "optional interface not available");
        }
        debug!(subdevice = %key, ?caps, "attached");
        self.caps = caps;
        self.device = Some(device);
        Ok(())
    }

    /// Drop the backend binding. Range and key are kept.
    pub fn detach(&mut self) {
        self.device = None;
        self.caps = Capabilities::empty();
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn is_attached(&self) -> bool {
        self.device.is_some()
    }

    pub fn is_usable(&self) -> bool {
        self.configured && self.device.is_some()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn axes(&self) -> usize {
        self.axes
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// True when the backend exposes every interface in `caps`.
    pub fn has(&self, caps: Capabilities) -> bool {
        self.caps.contains(caps)
    }

    pub fn device(&self) -> Option<&SharedDevice> {
        self.device.as_ref()
    }

    pub(crate) fn absent(&self, capability: Capabilities) -> WrapperError {
        WrapperError::CapabilityAbsent {
            subdevice: self.key.clone(),
            capability,
        }
    }

    /// Check, without locking, that a call needing at least one interface of
    /// `any_of` can be dispatched here.
    pub(crate) fn ready_for(&self, any_of: Capabilities) -> Result<&SharedDevice> {
        let device = match &self.device {
            Some(d) if self.configured => d,
            _ => return Err(WrapperError::NotAttached(self.key.clone())),
        };
        if !any_of.is_empty() && !self.caps.intersects(any_of) {
            return Err(self.absent(any_of));
        }
        Ok(device)
    }

    /// Lock the backend for a call needing at least one interface of `any_of`.
    pub(crate) fn lock_for(
        &self,
        any_of: Capabilities,
    ) -> Result<MutexGuard<'_, dyn MotionDevice + 'static>> {
        let device = self.ready_for(any_of)?;
        Ok(device.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn cache(&self) -> MutexGuard<'_, SampleCache> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-read joint and motor encoders of every axis in range and return the
    /// sum of the joint sample times.
    pub fn refresh_samples(&self) -> f64 {
        let Ok(mut dev) = self.lock_for(Capabilities::ENCODERS) else {
            return 0.0;
        };
        let mut cache = self.cache();
        let mut time_sum = 0.0;
        if let Some(enc) = dev.as_encoders() {
            for (i, slot) in cache.joint.iter_mut().enumerate() {
                match enc.encoder_timed(self.base + i) {
                    Ok(s) => *slot = s,
                    Err(e) if self.verbose => {
                        debug!(subdevice = %self.key, axis = self.base + i, error = %e, "encoder read failed")
                    }
                    Err(_) => {}
                }
                time_sum += slot.time;
            }
        }
        if self.caps.contains(Capabilities::MOTOR_ENCODERS) {
            if let Some(menc) = dev.as_motor_encoders() {
                for (i, slot) in cache.motor.iter_mut().enumerate() {
                    if let Ok(s) = menc.motor_encoder_timed(self.base + i) {
                        *slot = s;
                    }
                }
            }
        }
        time_sum
    }

    /// Last cached joint sample for an offset inside this subdevice.
    pub fn joint_sample(&self, offset: usize) -> Sample {
        self.cache().joint.get(offset).copied().unwrap_or_default()
    }

    pub fn motor_sample(&self, offset: usize) -> Sample {
        self.cache().motor.get(offset).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_device::SimBoard;

    fn configured(key: &str, base: usize, top: usize) -> SubDevice {
        let mut s = SubDevice::new(key);
        s.configure(base, top, top - base + 1, key).unwrap();
        s
    }

    #[test]
    fn configure_rejects_bad_ranges() {
        let mut s = SubDevice::new("legs");
        assert!(s.configure(5, 2, 1, "legs").is_err());
        assert!(s.configure(0, 5, 5, "legs").is_err());
        assert!(s.configure(0, 0, 0, "legs").is_err());
        assert!(!s.is_configured());
        assert!(s.configure(2, 4, 3, "legs").is_ok());
        assert_eq!((s.base(), s.top(), s.axes()), (2, 4, 3));
    }

    #[test]
    fn attach_checks_key_and_configuration() {
        let board: SharedDevice = SimBoard::new("b", 6).shared();
        let mut s = configured("legs", 0, 5);
        assert!(s.attach(board.clone(), "torso").is_err());
        let mut fresh = SubDevice::new("legs");
        assert!(fresh.attach(board.clone(), "legs").is_err());
        assert!(s.attach(board, "legs").is_ok());
        assert!(s.is_usable());
    }

    #[test]
    fn attach_requires_mandatory_interfaces() {
        let mut s = configured("legs", 0, 2);
        let no_enc: SharedDevice = SimBoard::new("b", 3)
            .without(Capabilities::ENCODERS)
            .shared();
        assert!(s.attach(no_enc, "legs").is_err());

        let no_pos: SharedDevice = SimBoard::new("b", 3)
            .without(Capabilities::MANDATORY_ANY_POSITION)
            .shared();
        assert!(s.attach(no_pos, "legs").is_err());

        let only_group: SharedDevice = SimBoard::new("b", 3)
            .without(Capabilities::POSITION | Capabilities::VELOCITY)
            .shared();
        assert!(s.attach(only_group, "legs").is_ok());
    }

    #[test]
    fn attach_rejects_small_or_closed_backends() {
        let mut s = configured("legs", 0, 5);
        let small: SharedDevice = SimBoard::new("b", 4).shared();
        assert!(s.attach(small, "legs").is_err());

        let mut closed = SimBoard::new("b", 6);
        closed.set_open(false);
        let closed: SharedDevice = closed.shared();
        assert!(s.attach(closed, "legs").is_err());
    }

    #[test]
    fn attach_needs_every_axis_up_to_top() {
        let mut s = configured("torso", 10, 12);
        let three: SharedDevice = SimBoard::new("b", 3).shared();
        assert!(matches!(
            s.attach(three, "torso"),
            Err(WrapperError::Configuration(_))
        ));
        let twelve: SharedDevice = SimBoard::new("b", 12).shared();
        assert!(s.attach(twelve, "torso").is_err());
        let thirteen: SharedDevice = SimBoard::new("b", 13).shared();
        assert!(s.attach(thirteen, "torso").is_ok());
    }

    #[test]
    fn ready_for_reports_absent_interfaces_without_locking() {
        let mut s = configured("arm", 0, 2);
        assert!(matches!(
            s.ready_for(Capabilities::TORQUE),
            Err(WrapperError::NotAttached(_))
        ));
        let board: SharedDevice = SimBoard::new("b", 3).without(Capabilities::TORQUE).shared();
        s.attach(board, "arm").unwrap();
        assert!(matches!(
            s.ready_for(Capabilities::TORQUE),
            Err(WrapperError::CapabilityAbsent { .. })
        ));
        assert!(s.ready_for(Capabilities::ENCODERS).is_ok());
    }

    #[test]
    fn detach_is_idempotent() {
        let board: SharedDevice = SimBoard::new("b", 3).shared();
        let mut s = configured("arm", 0, 2);
        s.attach(board, "arm").unwrap();
        s.detach();
        let after_one = (s.is_attached(), s.capabilities(), s.key().to_string(), s.axes());
        s.detach();
        let after_two = (s.is_attached(), s.capabilities(), s.key().to_string(), s.axes());
        assert_eq!(after_one, after_two);
        assert!(!s.is_usable());
        assert!(s.is_configured());
    }

    #[test]
    fn refresh_reads_the_configured_backend_range() {
        let board = SimBoard::new("b", 5).with_clock(2.0).shared();
        {
            let mut b = board.lock().unwrap();
            motion_device::PositionControl::position_move(&mut *b, 3, 42.0).unwrap();
        }
        let mut s = configured("arm", 2, 4);
        s.attach(board, "arm").unwrap();
        let sum = s.refresh_samples();
        assert_eq!(sum, 6.0);
        assert_eq!(s.joint_sample(1).value, 42.0);
    }
}
