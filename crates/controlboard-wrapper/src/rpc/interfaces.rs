//! Interface-group requests: `[set|get] [group] [field] args..`.

use super::args::Args;
use super::{many, one, range, Action, Answer, RpcParser};
use super::{PROTOCOL_VERSION_MAJOR, PROTOCOL_VERSION_MINOR, PROTOCOL_VERSION_TWEAK};
use crate::vocab::{self, control_mode_from_vocab, interaction_mode_from_vocab};
use crate::wire::{Value, Vocab};
use crate::{Result, WrapperError};
use motion_device::{ControlMode, Impedance, InteractionMode, MotorTorqueParams};

fn unknown(group: Vocab, field: Option<Vocab>) -> WrapperError {
    match field {
        Some(f) => WrapperError::protocol(format!("unknown field {f:?} of {group:?}")),
        None => WrapperError::protocol(format!("missing field of {group:?}")),
    }
}

fn control_mode(word: Vocab) -> Result<ControlMode> {
    control_mode_from_vocab(word)
        .ok_or_else(|| WrapperError::protocol(format!("unknown control mode {word:?}")))
}

fn interaction_mode(word: Vocab) -> Result<InteractionMode> {
    interaction_mode_from_vocab(word)
        .ok_or_else(|| WrapperError::protocol(format!("unknown interaction mode {word:?}")))
}

fn control_mode_words(modes: Vec<ControlMode>) -> Answer {
    many(modes.into_iter().map(vocab::control_mode_vocab).collect())
}

fn interaction_mode_words(modes: Vec<InteractionMode>) -> Answer {
    many(modes.into_iter().map(vocab::interaction_mode_vocab).collect())
}

impl RpcParser {
    pub(super) fn interface(
        &self,
        action: Action,
        group: Vocab,
        field: Option<Vocab>,
        args: &mut Args<'_>,
    ) -> Result<Answer> {
        match (group, action) {
            (vocab::TORQUE_INTERFACE, Action::Set) => self.torque_set(field, args),
            (vocab::TORQUE_INTERFACE, Action::Get) => self.torque_get(field, args),
            (vocab::CONTROL_MODE_INTERFACE, Action::Set) => self.control_mode_set(field, args),
            (vocab::CONTROL_MODE_INTERFACE, Action::Get) => self.control_mode_get(field, args),
            (vocab::IMPEDANCE_INTERFACE, Action::Set) => self.impedance_set(field, args),
            (vocab::IMPEDANCE_INTERFACE, Action::Get) => self.impedance_get(field, args),
            (vocab::INTERACTION_MODE_INTERFACE, Action::Set) => self.interaction_set(field, args),
            (vocab::INTERACTION_MODE_INTERFACE, Action::Get) => self.interaction_get(field, args),
            (vocab::OPEN_LOOP_INTERFACE, Action::Set) => self.open_loop_set(field, args),
            (vocab::OPEN_LOOP_INTERFACE, Action::Get) => self.open_loop_get(field, args),
            (vocab::CURRENT_INTERFACE, Action::Set) => self.current_set(field, args),
            (vocab::CURRENT_INTERFACE, Action::Get) => self.current_get(field, args),
            (vocab::REMOTE_CALIBRATOR_INTERFACE, _) => self.calibrator(action, field, args),
            (vocab::REMOTE_VARIABLES_INTERFACE, _) => self.variables(action, field, args),
            (vocab::PROTOCOL_VERSION, Action::Get) => Ok(Answer::Is(vec![
                PROTOCOL_VERSION_MAJOR.into(),
                PROTOCOL_VERSION_MINOR.into(),
                PROTOCOL_VERSION_TWEAK.into(),
            ])),
            _ => Err(unknown(group, field)),
        }
    }

    fn torque_set(&self, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        match field {
            Some(vocab::REF) => w.set_ref_torque(args.joint()?, args.real()?)?,
            Some(vocab::REFS) => w.set_ref_torques_all(&self.whole(args.reals()?)?)?,
            Some(vocab::REF_GROUP) => {
                let (joints, refs) = args.subset_reals()?;
                w.set_ref_torques_group(&joints, &refs)?;
            }
            Some(vocab::BEMF) => w.set_bemf_param(args.joint()?, args.real()?)?,
            Some(vocab::MOTOR_PARAMS) => {
                let j = args.joint()?;
                let params = MotorTorqueParams {
                    bemf: args.real()?,
                    bemf_scale: args.real()?,
                    ktau: args.real()?,
                    ktau_scale: args.real()?,
                };
                w.set_motor_torque_params(j, params)?;
            }
            Some(vocab::TORQUE_MODE) => w.set_torque_mode_all()?,
            _ => return Err(unknown(vocab::TORQUE_INTERFACE, field)),
        }
        Ok(Answer::Ack)
    }

    fn torque_get(&self, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        Ok(match field {
            Some(vocab::AXES) => one(self.joints),
            Some(vocab::REF) => one(w.ref_torque(args.joint()?)?),
            Some(vocab::REFS) => many(w.ref_torques()?),
            Some(vocab::REF_GROUP) => many(w.ref_torques_group(&args.subset()?)?),
            Some(vocab::TRQ) => one(w.torque(args.joint()?)?),
            Some(vocab::TRQS) => many(w.torques()?),
            Some(vocab::RANGE) => range(w.torque_range(args.joint()?)?),
            Some(vocab::RANGES) => {
                let ranges = w.torque_ranges()?;
                let mins: Vec<f64> = ranges.iter().map(|r| r.min).collect();
                let maxs: Vec<f64> = ranges.iter().map(|r| r.max).collect();
                Answer::Is(vec![Value::from(mins), Value::from(maxs)])
            }
            Some(vocab::BEMF) => one(w.bemf_param(args.joint()?)?),
            Some(vocab::MOTOR_PARAMS) => {
                let p = w.motor_torque_params(args.joint()?)?;
                Answer::Is(vec![
                    p.bemf.into(),
                    p.bemf_scale.into(),
                    p.ktau.into(),
                    p.ktau_scale.into(),
                ])
            }
            _ => return Err(unknown(vocab::TORQUE_INTERFACE, field)),
        })
    }

    fn control_mode_set(&self, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        match field {
            Some(vocab::CM_MODE) => {
                let j = args.joint()?;
                w.set_control_mode(j, control_mode(args.vocab()?)?)?;
            }
            Some(vocab::CM_MODES) => {
                let modes = args
                    .vocabs()?
                    .into_iter()
                    .map(control_mode)
                    .collect::<Result<Vec<_>>>()?;
                w.set_control_modes_all(&self.whole(modes)?)?;
            }
            Some(vocab::CM_GROUP) => {
                let (joints, words) = args.subset_vocabs()?;
                let modes = words
                    .into_iter()
                    .map(control_mode)
                    .collect::<Result<Vec<_>>>()?;
                w.set_control_modes_group(&joints, &modes)?;
            }
            _ => return Err(unknown(vocab::CONTROL_MODE_INTERFACE, field)),
        }
        Ok(Answer::Ack)
    }

    fn control_mode_get(&self, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        Ok(match field {
            Some(vocab::CM_MODE) => one(vocab::control_mode_vocab(w.control_mode(args.joint()?)?)),
            Some(vocab::CM_MODES) => control_mode_words(w.control_modes()?),
            Some(vocab::CM_GROUP) => control_mode_words(w.control_modes_group(&args.subset()?)?),
            _ => return Err(unknown(vocab::CONTROL_MODE_INTERFACE, field)),
        })
    }

    fn impedance_set(&self, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        match field {
            Some(vocab::IMP_PARAM) => {
                let j = args.joint()?;
                let value = Impedance {
                    stiffness: args.real()?,
                    damping: args.real()?,
                };
                w.set_impedance(j, value)?;
            }
            Some(vocab::IMP_OFFSET) => w.set_impedance_offset(args.joint()?, args.real()?)?,
            _ => return Err(unknown(vocab::IMPEDANCE_INTERFACE, field)),
        }
        Ok(Answer::Ack)
    }

    fn impedance_get(&self, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        Ok(match field {
            Some(vocab::IMP_PARAM) => {
                let imp = w.impedance(args.joint()?)?;
                Answer::Is(vec![imp.stiffness.into(), imp.damping.into()])
            }
            Some(vocab::IMP_OFFSET) => one(w.impedance_offset(args.joint()?)?),
            Some(vocab::LIMITS) => {
                let l = w.impedance_limits(args.joint()?)?;
                Answer::Is(vec![
                    l.min_stiffness.into(),
                    l.max_stiffness.into(),
                    l.min_damping.into(),
                    l.max_damping.into(),
                ])
            }
            _ => return Err(unknown(vocab::IMPEDANCE_INTERFACE, field)),
        })
    }

    fn interaction_set(&self, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        match field {
            Some(vocab::IM_MODE) => {
                let j = args.joint()?;
                w.set_interaction_mode(j, interaction_mode(args.vocab()?)?)?;
            }
            Some(vocab::IM_MODES) => {
                let modes = args
                    .vocabs()?
                    .into_iter()
                    .map(interaction_mode)
                    .collect::<Result<Vec<_>>>()?;
                w.set_interaction_modes_all(&self.whole(modes)?)?;
            }
            Some(vocab::IM_GROUP) => {
                let (joints, words) = args.subset_vocabs()?;
                let modes = words
                    .into_iter()
                    .map(interaction_mode)
                    .collect::<Result<Vec<_>>>()?;
                w.set_interaction_modes_group(&joints, &modes)?;
            }
            _ => return Err(unknown(vocab::INTERACTION_MODE_INTERFACE, field)),
        }
        Ok(Answer::Ack)
    }

    fn interaction_get(&self, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        Ok(match field {
            Some(vocab::IM_MODE) => one(vocab::interaction_mode_vocab(
                w.interaction_mode(args.joint()?)?,
            )),
            Some(vocab::IM_MODES) => interaction_mode_words(w.interaction_modes()?),
            Some(vocab::IM_GROUP) => {
                interaction_mode_words(w.interaction_modes_group(&args.subset()?)?)
            }
            _ => return Err(unknown(vocab::INTERACTION_MODE_INTERFACE, field)),
        })
    }

    fn open_loop_set(&self, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        match field {
            Some(vocab::OL_REF) => w.set_ref_duty_cycle(args.joint()?, args.real()?)?,
            Some(vocab::OL_REFS) => w.set_ref_duty_cycles_all(&self.whole(args.reals()?)?)?,
            _ => return Err(unknown(vocab::OPEN_LOOP_INTERFACE, field)),
        }
        Ok(Answer::Ack)
    }

    fn open_loop_get(&self, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        Ok(match field {
            Some(vocab::OL_REF) => one(w.ref_duty_cycle(args.joint()?)?),
            Some(vocab::OL_REFS) => many(w.ref_duty_cycles()?),
            Some(vocab::OL_OUTPUT) => one(w.duty_cycle(args.joint()?)?),
            Some(vocab::OL_OUTPUTS) => many(w.duty_cycles()?),
            _ => return Err(unknown(vocab::OPEN_LOOP_INTERFACE, field)),
        })
    }

    fn current_set(&self, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        match field {
            Some(vocab::REF) => w.set_ref_current(args.joint()?, args.real()?)?,
            Some(vocab::REFS) => w.set_ref_currents_all(&self.whole(args.reals()?)?)?,
            Some(vocab::REF_GROUP) => {
                let (joints, refs) = args.subset_reals()?;
                w.set_ref_currents_group(&joints, &refs)?;
            }
            _ => return Err(unknown(vocab::CURRENT_INTERFACE, field)),
        }
        Ok(Answer::Ack)
    }

    fn current_get(&self, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        Ok(match field {
            Some(vocab::CURRENT) => one(w.current(args.joint()?)?),
            Some(vocab::CURRENTS) => many(w.currents()?),
            Some(vocab::REF) => one(w.ref_current(args.joint()?)?),
            Some(vocab::REFS) => many(w.ref_currents()?),
            Some(vocab::RANGE) => range(w.current_range(args.joint()?)?),
            Some(vocab::RANGES) => {
                let ranges = w.current_ranges()?;
                let mins: Vec<f64> = ranges.iter().map(|r| r.min).collect();
                let maxs: Vec<f64> = ranges.iter().map(|r| r.max).collect();
                Answer::Is(vec![Value::from(mins), Value::from(maxs)])
            }
            _ => return Err(unknown(vocab::CURRENT_INTERFACE, field)),
        })
    }

    fn calibrator(&self, action: Action, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        if action == Action::Get {
            return match field {
                Some(vocab::IS_CALIBRATOR_PRESENT) => Ok(one(w.is_calibrator_present())),
                _ => Err(unknown(vocab::REMOTE_CALIBRATOR_INTERFACE, field)),
            };
        }
        match field {
            Some(vocab::CALIBRATE_SINGLE_JOINT) => w.calibrate_single_joint(args.joint()?)?,
            Some(vocab::CALIBRATE_WHOLE_PART) => w.calibrate()?,
            Some(vocab::HOMING_SINGLE_JOINT) => w.homing_single_joint(args.joint()?)?,
            Some(vocab::HOMING_WHOLE_PART) => w.homing_whole_part()?,
            Some(vocab::PARK_SINGLE_JOINT) => {
                let j = args.joint()?;
                let wait = args.int_or(1)? != 0;
                w.park_single_joint(j, wait)?;
            }
            Some(vocab::PARK_WHOLE_PART) => w.park(true)?,
            Some(vocab::QUIT_CALIBRATE) => w.quit_calibrate()?,
            Some(vocab::QUIT_PARK) => w.quit_park()?,
            _ => return Err(unknown(vocab::REMOTE_CALIBRATOR_INTERFACE, field)),
        }
        Ok(Answer::Ack)
    }

    fn variables(&self, action: Action, field: Option<Vocab>, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        match (action, field) {
            (Action::Get, Some(vocab::VARIABLE)) => {
                let key = args.text()?;
                let per_device: Vec<Value> =
                    w.variable(&key)?.into_iter().map(Value::from).collect();
                Ok(Answer::Is(vec![Value::from(per_device)]))
            }
            (Action::Get, Some(vocab::VARIABLE_LIST)) => Ok(many(w.variable_names()?)),
            (Action::Set, Some(vocab::VARIABLE)) => {
                let key = args.text()?;
                let nested = args.list()?;
                let values = nested
                    .items()
                    .iter()
                    .map(|v| v.as_list().and_then(|l| l.to_f64s()))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| WrapperError::protocol("variable values must be lists of numbers"))?;
                w.set_variable(&key, &values)?;
                Ok(Answer::Ack)
            }
            _ => Err(unknown(vocab::REMOTE_VARIABLES_INTERFACE, field)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::publish::LatestSnapshots;
    use crate::rpc::RpcParser;
    use crate::types::WrapperConfig;
    use crate::wire::{Bottle, Vocab};
    use crate::{vocab, ControlBoardWrapper, DriverHandle};
    use motion_device::{SharedCalibrator, SharedDevice, SimBoard, SimCalibrator};
    use std::sync::{Arc, Mutex};

    fn deferred() -> (RpcParser, Arc<Mutex<SimCalibrator>>) {
        let cfg: WrapperConfig = serde_yaml::from_str(
            "name: /leg\nperiod: 1000\njoints: 4\nnetworks: [a, b]\nranges:\n  a: [0, 1, 0, 1]\n  b: [2, 3, 0, 1]\n",
        )
        .unwrap();
        let w = ControlBoardWrapper::open(&cfg, Arc::new(LatestSnapshots::new()), None).unwrap();
        let a: SharedDevice = SimBoard::new("a", 2).shared();
        let b: SharedDevice = SimBoard::new("b", 2).shared();
        let cal = Arc::new(Mutex::new(SimCalibrator::default()));
        let shared: SharedCalibrator = cal.clone();
        w.attach_all(vec![
            ("a".to_string(), DriverHandle::Motion(a)),
            ("b".to_string(), DriverHandle::Motion(b)),
            ("calibrator".to_string(), DriverHandle::Calibrator(shared)),
        ])
        .unwrap();
        (RpcParser::new(w), cal)
    }

    fn ask(p: &mut RpcParser, text: &str) -> Bottle {
        p.respond(&text.parse().unwrap()).response
    }

    #[test]
    fn torque_group_reference_reaches_both_boards() {
        let (mut p, _) = deferred();
        let r = ask(&mut p, "[set] [torq] [refg] 2 (3 0) (0.5 -0.5)");
        assert_eq!(r.vocab_at(0), Some(vocab::OK));
        let r = ask(&mut p, "[get] [torq] [refs]");
        let refs = r.list_at(2).and_then(Bottle::to_f64s).unwrap();
        assert_eq!(refs, vec![-0.5, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn impedance_round_trips_through_the_port() {
        let (mut p, _) = deferred();
        assert_eq!(ask(&mut p, "[set] [imp] [ipr] 2 1.5 0.2").vocab_at(0), Some(vocab::OK));
        let r = ask(&mut p, "[get] [imp] [ipr] 2");
        assert_eq!(r.f64_at(2), Some(1.5));
        assert_eq!(r.f64_at(3), Some(0.2));
    }

    #[test]
    fn remote_calibrator_commands_are_forwarded() {
        let (mut p, cal) = deferred();
        let r = ask(&mut p, "[get] [reca] [iscp]");
        assert_eq!(r.int_at(2), Some(1));
        ask(&mut p, "[set] [reca] [cal1] 3");
        ask(&mut p, "[set] [reca] [homw]");
        ask(&mut p, "[set] [reca] [prk1] 1 0");
        let seen = cal.lock().unwrap().requests.clone();
        assert_eq!(seen, vec!["calibrate 3", "homing all", "park 1 wait=false"]);
        let r = ask(&mut p, "[set] [reca] [cal1] 9");
        assert_eq!(r.vocab_at(0), Some(vocab::FAIL));
    }

    #[test]
    fn variables_hold_one_entry_per_board() {
        let (mut p, _) = deferred();
        let r = ask(&mut p, "[get] [rvar] [vari] \"kp\"");
        let per_board = r.list_at(2).unwrap();
        assert_eq!(per_board.len(), 2);
        let r = ask(&mut p, "[set] [rvar] [vari] \"kp\" ((2.0) (3.0))");
        assert_eq!(r.vocab_at(0), Some(vocab::OK));
        let r = ask(&mut p, "[get] [rvar] [vari] \"kp\"");
        let second = r.list_at(2).and_then(|l| l.list_at(1)).and_then(Bottle::to_f64s);
        assert_eq!(second, Some(vec![3.0]));
        let r = ask(&mut p, "[set] [rvar] [vari] \"kp\" ((2.0))");
        assert_eq!(r.vocab_at(0), Some(vocab::FAIL));
    }

    #[test]
    fn interaction_subset_uses_mode_words() {
        let (mut p, _) = deferred();
        let r = ask(&mut p, "[set] [intm] [modg] 2 (1 2) ([comp] [comp])");
        assert_eq!(r.vocab_at(0), Some(vocab::OK));
        let r = ask(&mut p, "[get] [intm] [mods]");
        let words: Vec<Vocab> = r
            .list_at(2)
            .unwrap()
            .items()
            .iter()
            .filter_map(|v| v.as_vocab())
            .collect();
        assert_eq!(
            words,
            vec![vocab::IM_STIFF, vocab::IM_COMPLIANT, vocab::IM_COMPLIANT, vocab::IM_STIFF]
        );
    }
}
