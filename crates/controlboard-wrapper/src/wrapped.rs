use crate::types::NetworkRange;
use crate::{Result, SubDevice, WrapperError};
use tracing::info;

/// Where an external joint lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LutEntry {
    pub subdevice: usize,
    pub offset: usize,
}

/// The ordered set of subdevices plus the external-joint lookup table.
pub struct WrappedDevice {
    subdevices: Vec<SubDevice>,
    lut: Vec<LutEntry>,
}

impl WrappedDevice {
    /// A single backend of `axes` axes mapped one to one.
    pub fn owned(key: &str, axes: usize) -> Result<Self> {
        let mut sub = SubDevice::new(key);
        let top = axes
            .checked_sub(1)
            .ok_or_else(|| WrapperError::config("owned backend reports zero axes"))?;
        sub.configure(0, top, axes, key)?;
        let lut = (0..axes)
            .map(|j| LutEntry {
                subdevice: 0,
                offset: j,
            })
            .collect();
        Ok(Self {
            subdevices: vec![sub],
            lut,
        })
    }

    /// Several backends, each covering the external range given by its network.
    pub fn deferred(joints: usize, networks: &[(String, NetworkRange)]) -> Result<Self> {
        if joints == 0 {
            return Err(WrapperError::config("'joints' must be positive"));
        }
        let mut slots: Vec<Option<LutEntry>> = vec![None; joints];
        let mut subdevices = Vec::with_capacity(networks.len());
        let mut total = 0usize;
        for (k, (name, r)) in networks.iter().enumerate() {
            let mut sub = SubDevice::new(name);
            if r.device_top < r.device_base {
                return Err(WrapperError::config(format!(
                    "network '{name}': device top {} is lower than base {}",
                    r.device_top, r.device_base
                )));
            }
            sub.configure(r.device_base, r.device_top, r.device_axes(), name)?;
            if r.wrapper_base >= joints || r.wrapper_top >= joints {
                return Err(WrapperError::config(format!(
                    "network '{name}': range [{}, {}] outside 0..{joints}",
                    r.wrapper_base, r.wrapper_top
                )));
            }
            if r.wrapper_base > r.wrapper_top {
                return Err(WrapperError::config(format!(
                    "network '{name}': first index {} above second index {}",
                    r.wrapper_base, r.wrapper_top
                )));
            }
            if r.wrapper_top - r.wrapper_base + 1 != sub.axes() {
                return Err(WrapperError::config(format!(
                    "network '{name}': wrapper range and device range differ in size"
                )));
            }
            for (j, slot) in slots
                .iter_mut()
                .enumerate()
                .take(r.wrapper_top + 1)
                .skip(r.wrapper_base)
            {
                if slot.is_some() {
                    return Err(WrapperError::config(format!(
                        "network '{name}': joint {j} is already mapped"
                    )));
                }
                *slot = Some(LutEntry {
                    subdevice: k,
                    offset: j - r.wrapper_base,
                });
            }
            total += sub.axes();
            subdevices.push(sub);
        }
        if total != joints {
            return Err(WrapperError::config(format!(
                "networks map {total} joints, {joints} configured"
            )));
        }
        let lut = slots
            .into_iter()
            .enumerate()
            .map(|(j, e)| e.ok_or_else(|| WrapperError::config(format!("joint {j} unmapped"))))
            .collect::<Result<Vec<_>>>()?;
        info!(joints, subdevices = subdevices.len(), "joint map built");
        Ok(Self { subdevices, lut })
    }

    pub fn controlled_joints(&self) -> usize {
        self.lut.len()
    }

    pub fn lut(&self) -> &[LutEntry] {
        &self.lut
    }

    pub fn entry(&self, joint: usize) -> Result<LutEntry> {
        self.lut
            .get(joint)
            .copied()
            .ok_or(WrapperError::JointOutOfRange {
                joint,
                joints: self.lut.len(),
            })
    }

    /// The subdevice serving `joint` and the backend axis index to use.
    pub fn resolve(&self, joint: usize) -> Result<(&SubDevice, usize)> {
        let e = self.entry(joint)?;
        let sub = self.subdevice(e.subdevice)?;
        Ok((sub, sub.base() + e.offset))
    }

    pub fn subdevice(&self, index: usize) -> Result<&SubDevice> {
        self.subdevices
            .get(index)
            .ok_or_else(|| WrapperError::NotAttached(format!("#{index}")))
    }

    pub fn subdevices(&self) -> &[SubDevice] {
        &self.subdevices
    }

    pub fn subdevices_mut(&mut self) -> &mut [SubDevice] {
        &mut self.subdevices
    }

    pub fn all_attached(&self) -> bool {
        self.subdevices.iter().all(SubDevice::is_usable)
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        for s in &mut self.subdevices {
            s.set_verbose(verbose);
        }
    }

    pub fn detach_all(&mut self) {
        for s in &mut self.subdevices {
            s.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(wb: usize, wt: usize, db: usize, dt: usize) -> NetworkRange {
        NetworkRange {
            wrapper_base: wb,
            wrapper_top: wt,
            device_base: db,
            device_top: dt,
        }
    }

    fn legs_and_torso() -> WrappedDevice {
        WrappedDevice::deferred(
            9,
            &[
                ("legs".to_string(), range(0, 5, 0, 5)),
                ("torso".to_string(), range(6, 8, 0, 2)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn two_networks_build_the_expected_lut() {
        let w = legs_and_torso();
        assert_eq!(w.controlled_joints(), 9);
        let expected: Vec<(usize, usize)> = (0..6).map(|o| (0, o)).chain((0..3).map(|o| (1, o))).collect();
        let got: Vec<(usize, usize)> = w.lut().iter().map(|e| (e.subdevice, e.offset)).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn every_joint_maps_exactly_once() {
        let w = WrappedDevice::deferred(
            7,
            &[
                ("a".to_string(), range(4, 6, 10, 12)),
                ("b".to_string(), range(0, 3, 0, 3)),
            ],
        )
        .unwrap();
        let mut seen = std::collections::HashSet::new();
        for j in 0..7 {
            let (sub, axis) = w.resolve(j).unwrap();
            assert!(seen.insert((sub.key().to_string(), axis)));
        }
        let axes: usize = w.subdevices().iter().map(SubDevice::axes).sum();
        assert_eq!(axes, 7);
        assert_eq!(w.resolve(5).unwrap().1, 11);
    }

    #[test]
    fn mapping_errors_are_configuration_errors() {
        let gap = WrappedDevice::deferred(10, &[("legs".to_string(), range(0, 5, 0, 5))]);
        assert!(matches!(gap, Err(WrapperError::Configuration(_))));

        let outside = WrappedDevice::deferred(6, &[("legs".to_string(), range(2, 7, 0, 5))]);
        assert!(outside.is_err());

        let overlap = WrappedDevice::deferred(
            6,
            &[
                ("a".to_string(), range(0, 3, 0, 3)),
                ("b".to_string(), range(3, 4, 0, 1)),
            ],
        );
        assert!(overlap.is_err());

        let inverted = WrappedDevice::deferred(6, &[("a".to_string(), range(5, 0, 0, 5))]);
        assert!(inverted.is_err());
    }

    #[test]
    fn out_of_range_lookup_is_an_error() {
        let w = legs_and_torso();
        assert_eq!(
            w.entry(9),
            Err(WrapperError::JointOutOfRange { joint: 9, joints: 9 })
        );
    }

    #[test]
    fn owned_layout_is_identity() {
        let w = WrappedDevice::owned("sim", 4).unwrap();
        assert!(w.lut().iter().enumerate().all(|(j, e)| e.subdevice == 0 && e.offset == j));
        assert!(WrappedDevice::owned("sim", 0).is_err());
    }
}
