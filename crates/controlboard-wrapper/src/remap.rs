//! Splitting caller joint subsets into per-subdevice batches and merging
//! the replies back into caller order.

use crate::{Result, WrappedDevice};
use motion_device::{ControlMode, Impedance, InteractionMode, Pid, Range};

/// The part of one subset call that lands on a single subdevice.
#[derive(Debug, Default)]
pub(crate) struct Batch<T> {
    /// Backend axis indices.
    pub axes: Vec<usize>,
    pub values: Vec<T>,
    /// Position of each entry in the caller's joint list.
    pub slots: Vec<usize>,
}

impl<T> Batch<T> {
    fn clear(&mut self) {
        self.axes.clear();
        self.values.clear();
        self.slots.clear();
    }
}

/// Per-subdevice batches, indexed by subdevice and reused across calls.
#[derive(Debug)]
pub(crate) struct SubsetBuffers<T> {
    batches: Vec<Batch<T>>,
    touched: Vec<usize>,
}

impl<T> Default for SubsetBuffers<T> {
    fn default() -> Self {
        Self {
            batches: Vec::new(),
            touched: Vec::new(),
        }
    }
}

impl<T: Copy + Default> SubsetBuffers<T> {
    pub fn reset(&mut self, subdevices: usize) {
        self.batches.resize_with(subdevices, Batch::default);
        for b in &mut self.batches {
            b.clear();
        }
        self.touched.clear();
    }

    /// Route every `joints[i]` to its subdevice. Subdevices are listed in
    /// first-touch order; entries keep caller order within a batch. Read
    /// calls pass no values and get defaults to be overwritten.
    pub fn split(
        &mut self,
        wrapped: &WrappedDevice,
        joints: &[usize],
        values: Option<&[T]>,
    ) -> Result<()> {
        self.reset(wrapped.subdevices().len());
        for (i, &joint) in joints.iter().enumerate() {
            let e = wrapped.entry(joint)?;
            let sub = wrapped.subdevice(e.subdevice)?;
            let Some(batch) = self.batches.get_mut(e.subdevice) else {
                continue;
            };
            if batch.slots.is_empty() {
                self.touched.push(e.subdevice);
            }
            batch.axes.push(sub.base() + e.offset);
            batch
                .values
                .push(values.and_then(|v| v.get(i)).copied().unwrap_or_default());
            batch.slots.push(i);
        }
        Ok(())
    }

    pub fn touched(&self) -> &[usize] {
        &self.touched
    }

    /// Visit every touched batch in first-touch order, stopping at the first error.
    pub fn try_for_each(
        &mut self,
        mut f: impl FnMut(usize, &mut Batch<T>) -> Result<()>,
    ) -> Result<()> {
        let Self { batches, touched } = self;
        for &k in touched.iter() {
            if let Some(batch) = batches.get_mut(k) {
                f(k, batch)?;
            }
        }
        Ok(())
    }

    /// Scatter batch values back to caller positions.
    pub fn remix(&self, out: &mut [T]) {
        for &k in &self.touched {
            let Some(batch) = self.batches.get(k) else {
                continue;
            };
            for (&slot, &v) in batch.slots.iter().zip(&batch.values) {
                if let Some(o) = out.get_mut(slot) {
                    *o = v;
                }
            }
        }
    }
}

/// All redistribution buffers of one facade; guarded by a single mutex.
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    reals: SubsetBuffers<f64>,
    control_modes: SubsetBuffers<ControlMode>,
    interaction_modes: SubsetBuffers<InteractionMode>,
    ranges: SubsetBuffers<Range>,
    impedances: SubsetBuffers<Impedance>,
    pids: SubsetBuffers<Pid>,
    flags: SubsetBuffers<bool>,
}

/// Element types that have a buffer in [`Scratch`].
pub(crate) trait ScratchSlot: Copy + Default + Sized {
    fn slot(scratch: &mut Scratch) -> &mut SubsetBuffers<Self>;
}

impl ScratchSlot for f64 {
    fn slot(scratch: &mut Scratch) -> &mut SubsetBuffers<Self> {
        &mut scratch.reals
    }
}

impl ScratchSlot for ControlMode {
    fn slot(scratch: &mut Scratch) -> &mut SubsetBuffers<Self> {
        &mut scratch.control_modes
    }
}

impl ScratchSlot for InteractionMode {
    fn slot(scratch: &mut Scratch) -> &mut SubsetBuffers<Self> {
        &mut scratch.interaction_modes
    }
}

impl ScratchSlot for Range {
    fn slot(scratch: &mut Scratch) -> &mut SubsetBuffers<Self> {
        &mut scratch.ranges
    }
}

impl ScratchSlot for Impedance {
    fn slot(scratch: &mut Scratch) -> &mut SubsetBuffers<Self> {
        &mut scratch.impedances
    }
}

impl ScratchSlot for Pid {
    fn slot(scratch: &mut Scratch) -> &mut SubsetBuffers<Self> {
        &mut scratch.pids
    }
}

impl ScratchSlot for bool {
    fn slot(scratch: &mut Scratch) -> &mut SubsetBuffers<Self> {
        &mut scratch.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NetworkRange;

    fn legs_and_torso() -> WrappedDevice {
        let r = |wb, wt, db, dt| NetworkRange {
            wrapper_base: wb,
            wrapper_top: wt,
            device_base: db,
            device_top: dt,
        };
        WrappedDevice::deferred(
            9,
            &[
                ("legs".to_string(), r(0, 5, 0, 5)),
                ("torso".to_string(), r(6, 8, 10, 12)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn split_groups_by_subdevice_in_first_touch_order() {
        let w = legs_and_torso();
        let mut buf = SubsetBuffers::<f64>::default();
        buf.split(&w, &[7, 0, 8, 3], Some(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert_eq!(buf.touched(), &[1, 0]);
        let mut seen = Vec::new();
        buf.try_for_each(|k, b| {
            seen.push((k, b.axes.clone(), b.values.clone(), b.slots.clone()));
            Ok(())
        })
        .unwrap();
        assert_eq!(seen[0], (1, vec![11, 12], vec![1.0, 3.0], vec![0, 2]));
        assert_eq!(seen[1], (0, vec![0, 3], vec![2.0, 4.0], vec![1, 3]));
    }

    #[test]
    fn remix_restores_caller_order_for_any_permutation() {
        let w = legs_and_torso();
        let mut buf = SubsetBuffers::<f64>::default();
        let joints = [8, 2, 6, 5, 0];
        buf.split(&w, &joints, None).unwrap();
        // pretend each backend answered with its axis index
        buf.try_for_each(|_, b| {
            for (v, &a) in b.values.iter_mut().zip(&b.axes) {
                *v = a as f64;
            }
            Ok(())
        })
        .unwrap();
        let mut out = vec![0.0; joints.len()];
        buf.remix(&mut out);
        assert_eq!(out, vec![12.0, 2.0, 10.0, 5.0, 0.0]);
    }

    #[test]
    fn buffers_are_cleared_between_calls() {
        let w = legs_and_torso();
        let mut buf = SubsetBuffers::<f64>::default();
        buf.split(&w, &[0, 1, 6], Some(&[1.0, 1.0, 1.0])).unwrap();
        buf.split(&w, &[7], Some(&[5.0])).unwrap();
        assert_eq!(buf.touched(), &[1]);
        let mut count = 0;
        buf.try_for_each(|_, b| {
            count += b.axes.len();
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn unknown_joint_fails_the_split() {
        let w = legs_and_torso();
        let mut buf = SubsetBuffers::<f64>::default();
        assert!(buf.split(&w, &[0, 9], None).is_err());
    }
}
