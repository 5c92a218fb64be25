//! Synchronous request/response handling for the RPC port.
//!
//! Requests look like `[set] [pos] 3 10.0` (legacy commands) or
//! `[get] [torq] [trqs]` (interface groups, where the third word selects the
//! field). Successful GETs answer `[is] <field> <values..> [tsta] seq time`,
//! successful SETs answer `[ok]`. A request that names nothing known or has
//! malformed arguments answers `[nrec]`; anything else that fails answers
//! `[fail]`.

mod args;
mod interfaces;
mod legacy;

use crate::publish::Stamp;
use crate::vocab;
use crate::wire::{Bottle, Value, Vocab};
use crate::{ControlBoardWrapper, Result, WrapperError};
use args::Args;
use std::sync::Arc;
use tracing::debug;

pub const PROTOCOL_VERSION_MAJOR: i64 = 1;
pub const PROTOCOL_VERSION_MINOR: i64 = 5;
pub const PROTOCOL_VERSION_TWEAK: i64 = 0;

/// Outcome of one request.
#[derive(Clone, Debug, PartialEq)]
pub struct RpcReply {
    pub response: Bottle,
    /// False when the request named nothing this parser knows.
    pub recognized: bool,
    pub ok: bool,
}

/// What a handler produced on success.
pub(crate) enum Answer {
    Ack,
    Is(Vec<Value>),
    Usage(Bottle),
}

pub struct RpcParser {
    wrapper: Arc<ControlBoardWrapper>,
    joints: usize,
    last_stamp: Stamp,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Set,
    Get,
}

impl RpcParser {
    pub fn new(wrapper: Arc<ControlBoardWrapper>) -> Self {
        let joints = wrapper.controlled_joints();
        Self {
            wrapper,
            joints,
            last_stamp: Stamp::default(),
        }
    }

    /// Refresh the cached joint count.
    pub fn initialize(&mut self) {
        self.joints = self.wrapper.controlled_joints();
    }

    pub fn controlled_joints(&self) -> usize {
        self.joints
    }

    /// Stamp attached to the most recent GET response.
    pub fn last_stamp(&self) -> Stamp {
        self.last_stamp
    }

    pub fn respond(&mut self, cmd: &Bottle) -> RpcReply {
        let metrics = self.wrapper.metrics();
        metrics.rpc_requests.inc();
        debug!(request = %cmd, "rpc request");
        match self.dispatch(cmd) {
            Ok(Answer::Ack) => RpcReply {
                response: [Value::from(vocab::OK)].into_iter().collect(),
                recognized: true,
                ok: true,
            },
            Ok(Answer::Is(values)) => {
                let mut response = Bottle::new();
                response.push(vocab::IS);
                if let Some(field) = echoed_field(cmd) {
                    response.push(field.clone());
                }
                response.extend(values);
                self.last_stamp = self.wrapper.last_input_stamp();
                response
                    .push(vocab::TIMESTAMP)
                    .push(i64::from(self.last_stamp.seq))
                    .push(self.last_stamp.time);
                RpcReply {
                    response,
                    recognized: true,
                    ok: true,
                }
            }
            Ok(Answer::Usage(response)) => RpcReply {
                response,
                recognized: true,
                ok: true,
            },
            Err(e) if e.is_protocol() => {
                metrics.rpc_unrecognized.inc();
                debug!(request = %cmd, error = %e, "rpc request not recognized");
                RpcReply {
                    response: [Value::from(vocab::NOT_RECOGNIZED)].into_iter().collect(),
                    recognized: false,
                    ok: false,
                }
            }
            Err(e) => {
                metrics.rpc_failed.inc();
                debug!(request = %cmd, error = %e, "rpc request failed");
                RpcReply {
                    response: [Value::from(vocab::FAIL)].into_iter().collect(),
                    recognized: true,
                    ok: false,
                }
            }
        }
    }

    fn dispatch(&self, cmd: &Bottle) -> Result<Answer> {
        let head = cmd
            .vocab_at(0)
            .ok_or_else(|| WrapperError::protocol("request does not start with a word"))?;
        let action = match head {
            vocab::SET => Action::Set,
            vocab::GET => Action::Get,
            vocab::HELP => return Ok(Answer::Usage(self.usage())),
            _ => return self.bare(head, &mut Args::new(cmd, 1)),
        };
        let word = cmd
            .vocab_at(1)
            .ok_or_else(|| WrapperError::protocol("missing command word"))?;
        if is_interface(word) {
            let field = cmd.vocab_at(2);
            self.interface(action, word, field, &mut Args::new(cmd, 3))
        } else {
            match action {
                Action::Set => self.legacy_set(word, &mut Args::new(cmd, 2)),
                Action::Get => self.legacy_get(word, &mut Args::new(cmd, 2)),
            }
        }
    }

    /// Commands sent without `set`/`get`.
    fn bare(&self, head: Vocab, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        match head {
            vocab::CALIBRATE_JOINT => {
                let j = args.joint()?;
                let kind = args.unsigned()?;
                let (p1, p2, p3) = (args.real()?, args.real()?, args.real()?);
                w.calibrate_axis(j, kind, p1, p2, p3)?;
            }
            vocab::CALIBRATE_JOINT_PARAMS => {
                let j = args.joint()?;
                let params = motion_device::CalibrationParams {
                    kind: args.unsigned()?,
                    param1: args.real()?,
                    param2: args.real()?,
                    param3: args.real()?,
                    param4: args.real_or(0.0)?,
                };
                w.set_calibration_params(j, params)?;
            }
            vocab::CALIBRATE => w.calibrate()?,
            vocab::CALIBRATE_DONE => {
                if !w.calibration_done(args.joint()?)? {
                    return Err(WrapperError::Backend(motion_device::DeviceError::Fault(
                        "calibration not done".to_string(),
                    )));
                }
            }
            vocab::PARK => {
                let wait = args.int_or(0)? != 0;
                // a failing park would leave the client waiting forever
                if let Err(e) = w.park(wait) {
                    debug!(error = %e, "park failed, acknowledged anyway");
                }
            }
            other => {
                return Err(WrapperError::protocol(format!("unknown command {other:?}")));
            }
        }
        Ok(Answer::Ack)
    }

    /// Whole-vector argument; its length must match the joint count.
    fn whole<T>(&self, values: Vec<T>) -> Result<Vec<T>> {
        if values.len() != self.joints {
            return Err(WrapperError::LengthMismatch {
                expected: self.joints,
                got: values.len(),
            });
        }
        Ok(values)
    }

    fn usage(&self) -> Bottle {
        let mut b = Bottle::new();
        b.push(vocab::HELP);
        for line in [
            "[get] [axes]  number of axes",
            "[get] [name] $iAxis  axis name",
            "[set] [pos] $iAxis $fPosition  position move",
            "[set] [rel] $iAxis $fDelta  relative move",
            "[set] [vmo] $iAxis $fVelocity  velocity move",
            "[get] [enc] $iAxis  encoder value",
            "[set] [poss] ($f..)  position move of all axes",
            "[set] [rels] ($f..)  relative move of all axes",
            "[set] [vmos] ($f..)  velocity move of all axes",
            "[set] [aen] $iAxis  enable amplifier",
            "[set] [adi] $iAxis  disable amplifier",
            "[get] [acu] $iAxis  amplifier current",
            "[get] [acus]  amplifier currents",
            "[set] [pid] $iAxis ($f x10)  position loop gains",
            "[get] [pids]  gains of all axes",
            "[get] [errs]  position loop errors",
            "[get] [tmps]  motor temperatures",
            "[get] [prot]  protocol version",
        ] {
            b.push(line);
        }
        b
    }
}

fn is_interface(word: Vocab) -> bool {
    matches!(
        word,
        vocab::TORQUE_INTERFACE
            | vocab::CONTROL_MODE_INTERFACE
            | vocab::IMPEDANCE_INTERFACE
            | vocab::INTERACTION_MODE_INTERFACE
            | vocab::OPEN_LOOP_INTERFACE
            | vocab::CURRENT_INTERFACE
            | vocab::REMOTE_CALIBRATOR_INTERFACE
            | vocab::REMOTE_VARIABLES_INTERFACE
            | vocab::PROTOCOL_VERSION
    )
}

/// The word echoed after `[is]`: the field of an interface request, the
/// command of a legacy one.
fn echoed_field(cmd: &Bottle) -> Option<&Value> {
    match cmd.vocab_at(1) {
        Some(w) if is_interface(w) && cmd.get(2).is_some() => cmd.get(2),
        _ => cmd.get(1),
    }
}

/// Single value.
pub(crate) fn one(v: impl Into<Value>) -> Answer {
    Answer::Is(vec![v.into()])
}

/// Vector value as one nested list.
pub(crate) fn many<T: Into<Value>>(v: Vec<T>) -> Answer {
    Answer::Is(vec![Value::from(v)])
}

pub(crate) fn range(r: motion_device::Range) -> Answer {
    Answer::Is(vec![r.min.into(), r.max.into()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::LatestSnapshots;
    use crate::types::WrapperConfig;
    use motion_device::{SharedDevice, SimBoard};

    fn parser() -> RpcParser {
        let cfg: WrapperConfig =
            serde_yaml::from_str("name: /arm\nsubdevice: sim\nperiod: 1000\n").unwrap();
        let factory = |kind: &str, _: &WrapperConfig| -> motion_device::Result<SharedDevice> {
            let board: SharedDevice = SimBoard::new(kind, 3).shared();
            Ok(board)
        };
        let w = ControlBoardWrapper::open(&cfg, Arc::new(LatestSnapshots::new()), Some(&factory))
            .unwrap();
        RpcParser::new(w)
    }

    fn ask(p: &mut RpcParser, text: &str) -> RpcReply {
        p.respond(&text.parse().unwrap())
    }

    #[test]
    fn get_answers_carry_field_and_stamp() {
        let mut p = parser();
        assert!(ask(&mut p, "[set] [pos] 1 12.5").ok);
        let r = ask(&mut p, "[get] [enc] 1");
        assert!(r.ok && r.recognized);
        assert_eq!(r.response.vocab_at(0), Some(vocab::IS));
        assert_eq!(r.response.vocab_at(1), Some(vocab::ENCODER));
        assert_eq!(r.response.f64_at(2), Some(12.5));
        assert_eq!(r.response.vocab_at(3), Some(vocab::TIMESTAMP));
        assert_eq!(r.response.len(), 6);
    }

    #[test]
    fn unknown_interface_is_not_recognized() {
        let mut p = parser();
        let r = ask(&mut p, "[get] [zzzz] [trqs]");
        assert!(!r.recognized);
        assert!(!r.ok);
        assert_eq!(r.response.vocab_at(0), Some(vocab::NOT_RECOGNIZED));
        let r = ask(&mut p, "[get] [torq] [zzzz]");
        assert!(!r.recognized);
    }

    #[test]
    fn whole_vector_length_mismatch_fails() {
        let mut p = parser();
        let r = ask(&mut p, "[set] [poss] (1.0 2.0)");
        assert!(r.recognized);
        assert!(!r.ok);
        assert_eq!(r.response.vocab_at(0), Some(vocab::FAIL));
        let r = ask(&mut p, "[get] [encs]");
        let encs = r.response.list_at(2).and_then(Bottle::to_f64s).unwrap();
        assert_eq!(encs, vec![0.0; 3]);
    }

    #[test]
    fn subset_count_must_match_lists() {
        let mut p = parser();
        let r = ask(&mut p, "[set] [posg] 3 (0 2) (1.0 2.0)");
        assert!(!r.recognized);
        let r = ask(&mut p, "[set] [posg] 2 (0 2) (1.0 2.0)");
        assert!(r.ok);
        let r = ask(&mut p, "[get] [encs]");
        let encs = r.response.list_at(2).and_then(Bottle::to_f64s).unwrap();
        assert_eq!(encs, vec![1.0, 0.0, 2.0]);
    }

    #[test]
    fn protocol_version_is_get_only() {
        let mut p = parser();
        let r = ask(&mut p, "[get] [prot]");
        assert_eq!(r.response.vocab_at(1), Some(vocab::PROTOCOL_VERSION));
        assert_eq!(r.response.int_at(2), Some(PROTOCOL_VERSION_MAJOR));
        assert!(!ask(&mut p, "[set] [prot] 1").recognized);
    }

    #[test]
    fn park_is_always_acknowledged() {
        let mut p = parser();
        let r = ask(&mut p, "[park] 1");
        assert!(r.ok);
        assert_eq!(r.response.vocab_at(0), Some(vocab::OK));
    }

    #[test]
    fn control_modes_use_mode_words() {
        let mut p = parser();
        assert!(ask(&mut p, "[set] [icmd] [cmd] 2 [vel]").ok);
        let r = ask(&mut p, "[get] [icmd] [cmds]");
        let modes: Vec<_> = r
            .response
            .list_at(2)
            .unwrap()
            .items()
            .iter()
            .filter_map(Value::as_vocab)
            .collect();
        assert_eq!(modes, vec![Vocab::new("pos"), Vocab::new("pos"), Vocab::new("vel")]);
        assert!(!ask(&mut p, "[set] [icmd] [cmd] 2 [what]").recognized);
    }

    #[test]
    fn torque_mode_shortcut_switches_every_joint() {
        let mut p = parser();
        assert!(ask(&mut p, "[set] [torq] [trqd]").ok);
        let r = ask(&mut p, "[get] [icmd] [cmd] 1");
        assert_eq!(r.response.vocab_at(2), Some(Vocab::new("torq")));
    }
}
