//! Legacy `[set|get] <word> args..` requests: motion, encoders, position
//! loop, motors, amplifier, limits and axis info.

use super::args::Args;
use super::{many, one, range, Answer, RpcParser};
use crate::vocab;
use crate::wire::{Value, Vocab};
use crate::{Result, WrapperError};
use motion_device::Range;

fn unknown(action: &str, word: Vocab) -> WrapperError {
    WrapperError::protocol(format!("unknown {action} command {word:?}"))
}

impl RpcParser {
    pub(super) fn legacy_set(&self, word: Vocab, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        match word {
            vocab::POSITION_MOVE => w.position_move(args.joint()?, args.real()?)?,
            vocab::POSITION_MOVES => w.position_move_all(&self.whole(args.reals()?)?)?,
            vocab::POSITION_MOVE_GROUP => {
                let (joints, targets) = args.subset_reals()?;
                w.position_move_group(&joints, &targets)?;
            }
            vocab::RELATIVE_MOVE => w.relative_move(args.joint()?, args.real()?)?,
            vocab::RELATIVE_MOVES => w.relative_move_all(&self.whole(args.reals()?)?)?,
            vocab::RELATIVE_MOVE_GROUP => {
                let (joints, deltas) = args.subset_reals()?;
                w.relative_move_group(&joints, &deltas)?;
            }
            vocab::REF_SPEED => w.set_ref_speed(args.joint()?, args.real()?)?,
            vocab::REF_SPEEDS => w.set_ref_speeds_all(&self.whole(args.reals()?)?)?,
            vocab::REF_SPEED_GROUP => {
                let (joints, speeds) = args.subset_reals()?;
                w.set_ref_speeds_group(&joints, &speeds)?;
            }
            vocab::REF_ACCELERATION => w.set_ref_acceleration(args.joint()?, args.real()?)?,
            vocab::REF_ACCELERATIONS => {
                w.set_ref_accelerations_all(&self.whole(args.reals()?)?)?;
            }
            vocab::REF_ACCELERATION_GROUP => {
                let (joints, accs) = args.subset_reals()?;
                w.set_ref_accelerations_group(&joints, &accs)?;
            }
            vocab::STOP => w.stop(args.joint()?)?,
            vocab::STOPS => w.stop_all()?,
            vocab::STOP_GROUP => w.stop_group(&args.subset()?)?,
            vocab::VELOCITY_MOVE => w.velocity_move(args.joint()?, args.real()?)?,
            vocab::VELOCITY_MOVES => w.velocity_move_all(&self.whole(args.reals()?)?)?,
            vocab::VELOCITY_MOVE_GROUP => {
                let (joints, speeds) = args.subset_reals()?;
                w.velocity_move_group(&joints, &speeds)?;
            }
            vocab::POSITION_DIRECT => w.set_position(args.joint()?, args.real()?)?,
            vocab::POSITION_DIRECTS => w.set_positions_all(&self.whole(args.reals()?)?)?,
            vocab::POSITION_DIRECT_GROUP => {
                let (joints, refs) = args.subset_reals()?;
                w.set_positions_group(&joints, &refs)?;
            }
            vocab::ENCODER => w.set_encoder(args.joint()?, args.real()?)?,
            vocab::ENCODERS => w.set_encoders_all(&self.whole(args.reals()?)?)?,
            vocab::ENCODER_RESET => w.reset_encoder(args.joint()?)?,
            vocab::ENCODER_RESETS => w.reset_encoders()?,
            vocab::MOTOR_ENCODER => w.set_motor_encoder(args.joint()?, args.real()?)?,
            vocab::MOTOR_ENCODERS => w.set_motor_encoders_all(&self.whole(args.reals()?)?)?,
            vocab::MOTOR_ENCODER_RESET => w.reset_motor_encoder(args.joint()?)?,
            vocab::MOTOR_ENCODER_RESETS => w.reset_motor_encoders()?,
            vocab::MOTOR_CPR => w.set_counts_per_revolution(args.joint()?, args.real()?)?,
            vocab::PID => {
                let j = args.joint()?;
                w.set_pid(j, args.pid()?)?;
            }
            vocab::PIDS => w.set_pids_all(&self.whole(args.pids()?)?)?,
            vocab::REF => w.set_pid_reference(args.joint()?, args.real()?)?,
            vocab::REFS => w.set_pid_references_all(&self.whole(args.reals()?)?)?,
            vocab::PID_LIMIT => w.set_pid_error_limit(args.joint()?, args.real()?)?,
            vocab::PID_LIMITS => w.set_pid_error_limits_all(&self.whole(args.reals()?)?)?,
            vocab::PID_OFFSET => w.set_pid_offset(args.joint()?, args.real()?)?,
            vocab::PID_RESET => w.reset_pid(args.joint()?)?,
            vocab::PID_DISABLE => w.disable_pid(args.joint()?)?,
            vocab::PID_ENABLE => w.enable_pid(args.joint()?)?,
            vocab::TEMPERATURE_LIMIT => w.set_temperature_limit(args.joint()?, args.real()?)?,
            vocab::GEARBOX_RATIO => w.set_gearbox_ratio(args.joint()?, args.real()?)?,
            vocab::MOTOR_OUTPUT_LIMIT => w.set_motor_output_limit(args.joint()?, args.real()?)?,
            vocab::AMP_NOMINAL_CURRENT => w.set_nominal_current(args.joint()?, args.real()?)?,
            vocab::AMP_ENABLE => w.enable_amp(args.joint()?)?,
            vocab::AMP_DISABLE => w.disable_amp(args.joint()?)?,
            vocab::AMP_MAXCURRENT => w.set_max_current(args.joint()?, args.real()?)?,
            vocab::AMP_PEAK_CURRENT => w.set_peak_current(args.joint()?, args.real()?)?,
            vocab::AMP_PWM_LIMIT => w.set_pwm_limit(args.joint()?, args.real()?)?,
            vocab::LIMITS => {
                let j = args.joint()?;
                w.set_limits(j, Range::new(args.real()?, args.real()?))?;
            }
            vocab::VEL_LIMITS => {
                let j = args.joint()?;
                w.set_velocity_limits(j, Range::new(args.real()?, args.real()?))?;
            }
            other => return Err(unknown("set", other)),
        }
        Ok(Answer::Ack)
    }

    pub(super) fn legacy_get(&self, word: Vocab, args: &mut Args<'_>) -> Result<Answer> {
        let w = &self.wrapper;
        Ok(match word {
            vocab::AXES => one(self.joints),
            vocab::MOTION_DONE => one(w.motion_done(args.joint()?)?),
            vocab::MOTION_DONES => one(w.motion_done_all()?),
            vocab::MOTION_DONE_GROUP => one(w.motion_done_group(&args.subset()?)?),
            vocab::REF_SPEED => one(w.ref_speed(args.joint()?)?),
            vocab::REF_SPEEDS => many(w.ref_speeds()?),
            vocab::REF_SPEED_GROUP => many(w.ref_speeds_group(&args.subset()?)?),
            vocab::REF_ACCELERATION => one(w.ref_acceleration(args.joint()?)?),
            vocab::REF_ACCELERATIONS => many(w.ref_accelerations()?),
            vocab::REF_ACCELERATION_GROUP => many(w.ref_accelerations_group(&args.subset()?)?),
            vocab::POSITION_MOVE => one(w.target_position(args.joint()?)?),
            vocab::POSITION_MOVES => many(w.target_positions()?),
            vocab::POSITION_MOVE_GROUP => many(w.target_positions_group(&args.subset()?)?),
            vocab::VELOCITY_MOVE => one(w.ref_velocity(args.joint()?)?),
            vocab::VELOCITY_MOVES => many(w.ref_velocities()?),
            vocab::VELOCITY_MOVE_GROUP => many(w.ref_velocities_group(&args.subset()?)?),
            vocab::POSITION_DIRECT => one(w.ref_position(args.joint()?)?),
            vocab::POSITION_DIRECTS => many(w.ref_positions()?),
            vocab::POSITION_DIRECT_GROUP => many(w.ref_positions_group(&args.subset()?)?),
            vocab::ENCODER => one(w.encoder(args.joint()?)?),
            vocab::ENCODERS => many(w.encoders()?),
            vocab::ENCODER_SPEED => one(w.encoder_speed(args.joint()?)?),
            vocab::ENCODER_SPEEDS => many(w.encoder_speeds()?),
            vocab::ENCODER_ACCELERATION => one(w.encoder_acceleration(args.joint()?)?),
            vocab::ENCODER_ACCELERATIONS => many(w.encoder_accelerations()?),
            vocab::MOTOR_ENCODER => one(w.motor_encoder(args.joint()?)?),
            vocab::MOTOR_ENCODERS => many(w.motor_encoders()?),
            vocab::MOTOR_ENCODER_SPEED => one(w.motor_encoder_speed(args.joint()?)?),
            vocab::MOTOR_ENCODER_SPEEDS => many(w.motor_encoder_speeds()?),
            vocab::MOTOR_ENCODER_ACCELERATION => one(w.motor_encoder_acceleration(args.joint()?)?),
            vocab::MOTOR_ENCODER_ACCELERATIONS => many(w.motor_encoder_accelerations()?),
            vocab::MOTOR_CPR => one(w.counts_per_revolution(args.joint()?)?),
            vocab::PID => one(Value::from(w.pid(args.joint()?)?.to_array().to_vec())),
            vocab::PIDS => {
                let gains: Vec<Vec<f64>> =
                    w.pids()?.iter().map(|p| p.to_array().to_vec()).collect();
                many(gains)
            }
            vocab::REF => one(w.pid_reference(args.joint()?)?),
            vocab::REFS => many(w.pid_references()?),
            vocab::PID_LIMIT => one(w.pid_error_limit(args.joint()?)?),
            vocab::PID_LIMITS => many(w.pid_error_limits()?),
            vocab::PID_ERROR => one(w.pid_error(args.joint()?)?),
            vocab::PID_ERRORS => many(w.pid_errors()?),
            vocab::PID_OUTPUT => one(w.pid_output(args.joint()?)?),
            vocab::PID_OUTPUTS => many(w.pid_outputs()?),
            vocab::PID_ENABLE => one(w.is_pid_enabled(args.joint()?)?),
            vocab::MOTORS_NUMBER => one(w.number_of_motors()),
            vocab::MOTOR_ENCODERS_NUMBER => one(w.number_of_motor_encoders()),
            vocab::TEMPERATURE => one(w.temperature(args.joint()?)?),
            vocab::TEMPERATURES => many(w.temperatures()?),
            vocab::TEMPERATURE_LIMIT => one(w.temperature_limit(args.joint()?)?),
            vocab::GEARBOX_RATIO => one(w.gearbox_ratio(args.joint()?)?),
            vocab::MOTOR_OUTPUT_LIMIT => one(w.motor_output_limit(args.joint()?)?),
            vocab::AMP_CURRENT => one(w.amp_current(args.joint()?)?),
            vocab::AMP_CURRENTS => many(w.amp_currents()?),
            vocab::AMP_STATUS => one(w.amp_status(args.joint()?)?),
            vocab::AMP_STATUS_ALL => many(w.amp_statuses()?),
            vocab::AMP_MAXCURRENT => one(w.max_current(args.joint()?)?),
            vocab::AMP_NOMINAL_CURRENT => one(w.nominal_current(args.joint()?)?),
            vocab::AMP_PEAK_CURRENT => one(w.peak_current(args.joint()?)?),
            vocab::AMP_PWM => one(w.amp_pwm(args.joint()?)?),
            vocab::AMP_PWM_LIMIT => one(w.pwm_limit(args.joint()?)?),
            vocab::AMP_VOLTAGE_SUPPLY => one(w.power_supply_voltage(args.joint()?)?),
            vocab::LIMITS => range(w.limits(args.joint()?)?),
            vocab::VEL_LIMITS => range(w.velocity_limits(args.joint()?)?),
            vocab::INFO_NAME => one(w.axis_name(args.joint()?)?),
            vocab::INFO_TYPE => one(vocab::joint_type_vocab(w.joint_type(args.joint()?)?)),
            vocab::CALIBRATE_DONE => one(w.calibration_done(args.joint()?)?),
            other => return Err(unknown("get", other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::publish::LatestSnapshots;
    use crate::rpc::RpcParser;
    use crate::types::WrapperConfig;
    use crate::wire::Bottle;
    use crate::{vocab, ControlBoardWrapper};
    use motion_device::{SharedDevice, SimBoard};
    use std::sync::Arc;

    fn parser() -> RpcParser {
        let cfg: WrapperConfig =
            serde_yaml::from_str("name: /head\nsubdevice: sim\nperiod: 1000\n").unwrap();
        let factory = |kind: &str, _: &WrapperConfig| -> motion_device::Result<SharedDevice> {
            let board: SharedDevice = SimBoard::new(kind, 2).shared();
            Ok(board)
        };
        let w = ControlBoardWrapper::open(&cfg, Arc::new(LatestSnapshots::new()), Some(&factory))
            .unwrap();
        RpcParser::new(w)
    }

    fn ask(p: &mut RpcParser, text: &str) -> Bottle {
        p.respond(&text.parse().unwrap()).response
    }

    #[test]
    fn relative_moves_accumulate() {
        let mut p = parser();
        ask(&mut p, "[set] [pos] 0 10.0");
        ask(&mut p, "[set] [rels] (1.0 -2.0)");
        let r = ask(&mut p, "[get] [poss]");
        assert_eq!(r.list_at(2).and_then(Bottle::to_f64s), Some(vec![11.0, -2.0]));
        let r = ask(&mut p, "[get] [dons]");
        assert_eq!(r.int_at(2), Some(1));
    }

    #[test]
    fn limits_answer_min_and_max() {
        let mut p = parser();
        assert_eq!(ask(&mut p, "[set] [llim] 1 -10.0 20.0").vocab_at(0), Some(vocab::OK));
        let r = ask(&mut p, "[get] [llim] 1");
        assert_eq!((r.f64_at(2), r.f64_at(3)), (Some(-10.0), Some(20.0)));
        assert_eq!(ask(&mut p, "[set] [llim] 1 20.0 -10.0").vocab_at(0), Some(vocab::FAIL));
    }

    #[test]
    fn axis_info_uses_words_and_text() {
        let mut p = parser();
        let r = ask(&mut p, "[get] [name] 1");
        assert_eq!(r.text_at(2), Some("sim_j1"));
        let r = ask(&mut p, "[get] [type] 0");
        assert_eq!(r.vocab_at(2), Some(vocab::JOINT_REVOLUTE));
        let r = ask(&mut p, "[get] [axes]");
        assert_eq!(r.int_at(2), Some(2));
    }

    #[test]
    fn out_of_range_joint_fails() {
        let mut p = parser();
        let reply = p.respond(&"[set] [pos] 5 1.0".parse().unwrap());
        assert!(reply.recognized);
        assert!(!reply.ok);
    }

    #[test]
    fn pid_gains_travel_as_flat_lists() {
        let mut p = parser();
        let set = "[set] [pid] 1 (2.0 0.1 0.5 10.0 50.0 0.0 1.0 0.0 0.0 0.0)";
        assert_eq!(ask(&mut p, set).vocab_at(0), Some(vocab::OK));
        let r = ask(&mut p, "[get] [pid] 1");
        let gains = r.list_at(2).and_then(Bottle::to_f64s).unwrap();
        assert_eq!(gains.len(), 10);
        assert_eq!(&gains[..3], &[2.0, 0.1, 0.5]);
        let r = ask(&mut p, "[get] [pids]");
        let all = r.list_at(2).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.list_at(0).and_then(Bottle::to_f64s).map(|g| g[0]), Some(10.0));
        // nine gains are not a gain set
        let short = p.respond(&"[set] [pid] 0 (1 2 3 4 5 6 7 8 9)".parse().unwrap());
        assert!(!short.recognized);
        let flat = "(1 0 0 0 100 0 1 0 0 0)";
        let both = format!("[set] [pids] ({flat} {flat})");
        assert_eq!(ask(&mut p, &both).vocab_at(0), Some(vocab::OK));
        let r = ask(&mut p, "[get] [pid] 1");
        assert_eq!(r.list_at(2).and_then(|l| l.f64_at(0)), Some(1.0));
    }

    #[test]
    fn pid_references_errors_and_enable_state() {
        let mut p = parser();
        ask(&mut p, "[set] [refs] (2.0 -1.0)");
        let r = ask(&mut p, "[get] [errs]");
        assert_eq!(r.list_at(2).and_then(Bottle::to_f64s), Some(vec![2.0, -1.0]));
        let r = ask(&mut p, "[get] [out] 0");
        assert_eq!(r.f64_at(2), Some(20.0));
        ask(&mut p, "[set] [dis] 0");
        assert_eq!(ask(&mut p, "[get] [ena] 0").int_at(2), Some(0));
        assert_eq!(ask(&mut p, "[get] [outs]").list_at(2).and_then(|l| l.f64_at(0)), Some(0.0));
        ask(&mut p, "[set] [ena] 0");
        assert_eq!(ask(&mut p, "[get] [ena] 0").int_at(2), Some(1));
        assert_eq!(ask(&mut p, "[set] [lim] 1 -1.0").vocab_at(0), Some(vocab::FAIL));
        ask(&mut p, "[set] [lims] (1.5 2.5)");
        assert_eq!(ask(&mut p, "[get] [lim] 1").f64_at(2), Some(2.5));
    }

    #[test]
    fn motor_words_route_to_the_motor_interface() {
        let mut p = parser();
        assert_eq!(ask(&mut p, "[get] [mtnm]").int_at(2), Some(2));
        assert_eq!(ask(&mut p, "[get] [mnum]").int_at(2), Some(2));
        let r = ask(&mut p, "[get] [tmps]");
        assert_eq!(r.list_at(2).and_then(Bottle::to_f64s), Some(vec![30.0, 30.0]));
        ask(&mut p, "[set] [tmpl] 0 65.0");
        assert_eq!(ask(&mut p, "[get] [tmpl] 0").f64_at(2), Some(65.0));
        ask(&mut p, "[set] [gbxr] 1 50.0");
        assert_eq!(ask(&mut p, "[get] [gbxr] 1").f64_at(2), Some(50.0));
        assert_eq!(ask(&mut p, "[set] [gbxr] 1 0.0").vocab_at(0), Some(vocab::FAIL));
        ask(&mut p, "[set] [molm] 0 30.0");
        assert_eq!(ask(&mut p, "[get] [molm] 0").f64_at(2), Some(30.0));
        ask(&mut p, "[set] [acno] 0 1.5");
        assert_eq!(ask(&mut p, "[get] [acno] 0").f64_at(2), Some(1.5));
    }

    #[test]
    fn calibration_by_bare_command() {
        let mut p = parser();
        assert_eq!(ask(&mut p, "[cald] 0").vocab_at(0), Some(vocab::FAIL));
        assert_eq!(ask(&mut p, "[calj] 0 1 0.0 0.0 0.0").vocab_at(0), Some(vocab::OK));
        assert_eq!(ask(&mut p, "[cald] 0").vocab_at(0), Some(vocab::OK));
    }
}
