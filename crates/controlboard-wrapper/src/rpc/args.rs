use crate::wire::{Bottle, Value, Vocab};
use crate::{Result, WrapperError};
use motion_device::Pid;

/// Cursor over the arguments of a request. Every malformed or missing
/// argument is a protocol error.
pub(crate) struct Args<'a> {
    cmd: &'a Bottle,
    at: usize,
}

impl<'a> Args<'a> {
    pub(crate) fn new(cmd: &'a Bottle, at: usize) -> Self {
        Self { cmd, at }
    }

    fn value(&mut self) -> Result<&'a Value> {
        let v = self
            .cmd
            .get(self.at)
            .ok_or_else(|| WrapperError::protocol(format!("missing argument {}", self.at)))?;
        self.at += 1;
        Ok(v)
    }

    fn bad(&self, what: &str) -> WrapperError {
        WrapperError::protocol(format!("argument {} is not {what}", self.at - 1))
    }

    pub(crate) fn int(&mut self) -> Result<i64> {
        let v = self.value()?;
        v.as_int().ok_or_else(|| self.bad("an integer"))
    }

    pub(crate) fn int_or(&mut self, default: i64) -> Result<i64> {
        if self.cmd.get(self.at).is_none() {
            return Ok(default);
        }
        self.int()
    }

    pub(crate) fn joint(&mut self) -> Result<usize> {
        let i = self.int()?;
        usize::try_from(i).map_err(|_| self.bad("a joint index"))
    }

    pub(crate) fn unsigned(&mut self) -> Result<u32> {
        let i = self.int()?;
        u32::try_from(i).map_err(|_| self.bad("an unsigned integer"))
    }

    pub(crate) fn real(&mut self) -> Result<f64> {
        let v = self.value()?;
        v.as_f64().ok_or_else(|| self.bad("a number"))
    }

    pub(crate) fn real_or(&mut self, default: f64) -> Result<f64> {
        if self.cmd.get(self.at).is_none() {
            return Ok(default);
        }
        self.real()
    }

    pub(crate) fn vocab(&mut self) -> Result<Vocab> {
        let v = self.value()?;
        v.as_vocab().ok_or_else(|| self.bad("a word"))
    }

    /// Text argument; a bare word is accepted as well.
    pub(crate) fn text(&mut self) -> Result<String> {
        match self.value()? {
            Value::Text(s) => Ok(s.clone()),
            Value::Vocab(v) => Ok(v.to_string()),
            _ => Err(self.bad("text")),
        }
    }

    pub(crate) fn list(&mut self) -> Result<&'a Bottle> {
        let v = self.value()?;
        v.as_list().ok_or_else(|| self.bad("a list"))
    }

    pub(crate) fn reals(&mut self) -> Result<Vec<f64>> {
        let l = self.list()?;
        l.to_f64s().ok_or_else(|| self.bad("a list of numbers"))
    }

    /// Gains as a flat list in [`Pid`] field order.
    pub(crate) fn pid(&mut self) -> Result<Pid> {
        let gains = self.reals()?;
        Pid::from_slice(&gains).ok_or_else(|| self.bad("a list of ten gains"))
    }

    /// `((g0 ..) (g1 ..) ..)`: one gain list per joint.
    pub(crate) fn pids(&mut self) -> Result<Vec<Pid>> {
        let l = self.list()?;
        l.items()
            .iter()
            .map(|v| {
                v.as_list()
                    .and_then(Bottle::to_f64s)
                    .and_then(|g| Pid::from_slice(&g))
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| self.bad("a list of gain lists"))
    }

    pub(crate) fn vocabs(&mut self) -> Result<Vec<Vocab>> {
        let l = self.list()?;
        l.items()
            .iter()
            .map(Value::as_vocab)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| self.bad("a list of words"))
    }

    pub(crate) fn joints(&mut self) -> Result<Vec<usize>> {
        let l = self.list()?;
        l.items()
            .iter()
            .map(|v| v.as_int().and_then(|i| usize::try_from(i).ok()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| self.bad("a list of joint indices"))
    }

    /// `n (j0 j1 ..)`: a count followed by that many joints.
    pub(crate) fn subset(&mut self) -> Result<Vec<usize>> {
        let n = self.joint()?;
        let joints = self.joints()?;
        if joints.len() != n {
            return Err(WrapperError::protocol(format!(
                "subset announces {n} joints, lists {}",
                joints.len()
            )));
        }
        Ok(joints)
    }

    /// `n (j0 j1 ..) (v0 v1 ..)`.
    pub(crate) fn subset_reals(&mut self) -> Result<(Vec<usize>, Vec<f64>)> {
        let joints = self.subset()?;
        let values = self.reals()?;
        if values.len() != joints.len() {
            return Err(WrapperError::protocol(format!(
                "subset of {} joints carries {} values",
                joints.len(),
                values.len()
            )));
        }
        Ok((joints, values))
    }

    /// `n (j0 j1 ..) ([w0] [w1] ..)`.
    pub(crate) fn subset_vocabs(&mut self) -> Result<(Vec<usize>, Vec<Vocab>)> {
        let joints = self.subset()?;
        let words = self.vocabs()?;
        if words.len() != joints.len() {
            return Err(WrapperError::protocol(format!(
                "subset of {} joints carries {} words",
                joints.len(),
                words.len()
            )));
        }
        Ok((joints, words))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_arguments_in_order() {
        let b: Bottle = "[x] 2 1.5 [pos] (0 3) (1.0 2.0)".parse().unwrap();
        let mut a = Args::new(&b, 1);
        assert_eq!(a.joint().unwrap(), 2);
        assert_eq!(a.real().unwrap(), 1.5);
        assert_eq!(a.vocab().unwrap(), Vocab::new("pos"));
        assert_eq!(a.joints().unwrap(), vec![0, 3]);
        assert_eq!(a.reals().unwrap(), vec![1.0, 2.0]);
        assert!(a.real().unwrap_err().is_protocol());
        assert_eq!(a.int_or(7).unwrap(), 7);
    }

    #[test]
    fn negative_joint_is_rejected() {
        let b: Bottle = "-1".parse().unwrap();
        assert!(Args::new(&b, 0).joint().unwrap_err().is_protocol());
    }

    #[test]
    fn subset_counts_must_agree() {
        let b: Bottle = "2 (0 1 2) (1.0 2.0)".parse().unwrap();
        assert!(Args::new(&b, 0).subset_reals().is_err());
        let b: Bottle = "2 (0 1) (1.0)".parse().unwrap();
        assert!(Args::new(&b, 0).subset_reals().is_err());
        let b: Bottle = "2 (1 0) (1.0 2.0)".parse().unwrap();
        let (j, v) = Args::new(&b, 0).subset_reals().unwrap();
        assert_eq!((j, v), (vec![1, 0], vec![1.0, 2.0]));
    }
}
