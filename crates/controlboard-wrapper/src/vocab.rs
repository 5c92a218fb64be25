//! Command words of the control-board protocol.

use crate::wire::Vocab;
use motion_device::{ControlMode, InteractionMode, JointType};

const fn v(tag: &str) -> Vocab {
    Vocab::new(tag)
}

// envelope
pub const IS: Vocab = v("is");
pub const OK: Vocab = v("ok");
pub const FAIL: Vocab = v("fail");
pub const NOT_RECOGNIZED: Vocab = v("nrec");
pub const GET: Vocab = v("get");
pub const SET: Vocab = v("set");
pub const TIMESTAMP: Vocab = v("tsta");
pub const HELP: Vocab = v("help");
pub const AXES: Vocab = v("axes");

// interface groups
pub const TORQUE_INTERFACE: Vocab = v("torq");
pub const CONTROL_MODE_INTERFACE: Vocab = v("icmd");
pub const IMPEDANCE_INTERFACE: Vocab = v("imp");
pub const INTERACTION_MODE_INTERFACE: Vocab = v("intm");
pub const OPEN_LOOP_INTERFACE: Vocab = v("iol");
pub const CURRENT_INTERFACE: Vocab = v("icur");
pub const REMOTE_CALIBRATOR_INTERFACE: Vocab = v("reca");
pub const REMOTE_VARIABLES_INTERFACE: Vocab = v("rvar");
pub const PROTOCOL_VERSION: Vocab = v("prot");

// torque / current fields
pub const REF: Vocab = v("ref");
pub const REFS: Vocab = v("refs");
pub const REF_GROUP: Vocab = v("refg");
pub const TRQ: Vocab = v("trq");
pub const TRQS: Vocab = v("trqs");
pub const RANGE: Vocab = v("rng");
pub const RANGES: Vocab = v("rngs");
pub const BEMF: Vocab = v("bmf");
pub const MOTOR_PARAMS: Vocab = v("mtps");
pub const TORQUE_MODE: Vocab = v("trqd");
pub const CURRENT: Vocab = v("cur");
pub const CURRENTS: Vocab = v("curs");
pub const TORQUES_DIRECT: Vocab = v("dtqs");
pub const TORQUES_DIRECT_GROUP: Vocab = v("dtqg");
pub const TORQUE_DIRECT: Vocab = v("dtq");

// control / interaction mode fields
pub const CM_MODE: Vocab = v("cmd");
pub const CM_MODES: Vocab = v("cmds");
pub const CM_GROUP: Vocab = v("cmdg");
pub const IM_MODE: Vocab = v("mod");
pub const IM_MODES: Vocab = v("mods");
pub const IM_GROUP: Vocab = v("modg");

// impedance fields
pub const IMP_PARAM: Vocab = v("ipr");
pub const IMP_OFFSET: Vocab = v("iof");
pub const LIMITS: Vocab = v("llim");

// open loop fields
pub const OL_REF: Vocab = v("rref");
pub const OL_REFS: Vocab = v("rrfs");
pub const OL_OUTPUT: Vocab = v("pwm");
pub const OL_OUTPUTS: Vocab = v("pwms");

// position loop words
pub const PID: Vocab = v("pid");
pub const PIDS: Vocab = v("pids");
pub const PID_LIMIT: Vocab = v("lim");
pub const PID_LIMITS: Vocab = v("lims");
pub const PID_ERROR: Vocab = v("err");
pub const PID_ERRORS: Vocab = v("errs");
pub const PID_OUTPUT: Vocab = v("out");
pub const PID_OUTPUTS: Vocab = v("outs");
pub const PID_OFFSET: Vocab = v("off");
pub const PID_RESET: Vocab = v("res");
pub const PID_DISABLE: Vocab = v("dis");
pub const PID_ENABLE: Vocab = v("ena");

// motor words
pub const TEMPERATURE: Vocab = v("tmp");
pub const TEMPERATURES: Vocab = v("tmps");
pub const TEMPERATURE_LIMIT: Vocab = v("tmpl");
pub const GEARBOX_RATIO: Vocab = v("gbxr");
pub const MOTOR_OUTPUT_LIMIT: Vocab = v("molm");
pub const MOTORS_NUMBER: Vocab = v("mtnm");
pub const MOTOR_ENCODERS_NUMBER: Vocab = v("mnum");

// remote calibrator fields
pub const IS_CALIBRATOR_PRESENT: Vocab = v("iscp");
pub const CALIBRATE_SINGLE_JOINT: Vocab = v("cal1");
pub const CALIBRATE_WHOLE_PART: Vocab = v("calw");
pub const HOMING_SINGLE_JOINT: Vocab = v("hom1");
pub const HOMING_WHOLE_PART: Vocab = v("homw");
pub const PARK_SINGLE_JOINT: Vocab = v("prk1");
pub const PARK_WHOLE_PART: Vocab = v("prkw");
pub const QUIT_CALIBRATE: Vocab = v("quca");
pub const QUIT_PARK: Vocab = v("qupa");

// remote variables fields
pub const VARIABLE: Vocab = v("vari");
pub const VARIABLE_LIST: Vocab = v("lvar");

// bare commands
pub const CALIBRATE_JOINT: Vocab = v("calj");
pub const CALIBRATE_JOINT_PARAMS: Vocab = v("cljp");
pub const CALIBRATE: Vocab = v("cal");
pub const CALIBRATE_DONE: Vocab = v("cald");
pub const PARK: Vocab = v("park");

pub const POSITION_MOVE: Vocab = v("pos");
pub const POSITION_MOVES: Vocab = v("poss");
pub const POSITION_MOVE_GROUP: Vocab = v("posg");
pub const RELATIVE_MOVE: Vocab = v("rel");
pub const RELATIVE_MOVES: Vocab = v("rels");
pub const RELATIVE_MOVE_GROUP: Vocab = v("relg");
pub const REF_SPEED: Vocab = v("vel");
pub const REF_SPEEDS: Vocab = v("vels");
pub const REF_SPEED_GROUP: Vocab = v("velg");
pub const REF_ACCELERATION: Vocab = v("acc");
pub const REF_ACCELERATIONS: Vocab = v("accs");
pub const REF_ACCELERATION_GROUP: Vocab = v("accg");
pub const STOP: Vocab = v("sto");
pub const STOPS: Vocab = v("stos");
pub const STOP_GROUP: Vocab = v("stog");
pub const MOTION_DONE: Vocab = v("don");
pub const MOTION_DONES: Vocab = v("dons");
pub const MOTION_DONE_GROUP: Vocab = v("dong");
pub const VELOCITY_MOVE: Vocab = v("vmo");
pub const VELOCITY_MOVES: Vocab = v("vmos");
pub const VELOCITY_MOVE_GROUP: Vocab = v("vmog");
pub const POSITION_DIRECT: Vocab = v("dpos");
pub const POSITION_DIRECTS: Vocab = v("dpss");
pub const POSITION_DIRECT_GROUP: Vocab = v("dpsg");

pub const ENCODER: Vocab = v("enc");
pub const ENCODERS: Vocab = v("encs");
pub const ENCODER_RESET: Vocab = v("ere");
pub const ENCODER_RESETS: Vocab = v("eres");
pub const ENCODER_SPEED: Vocab = v("esp");
pub const ENCODER_SPEEDS: Vocab = v("esps");
pub const ENCODER_ACCELERATION: Vocab = v("eac");
pub const ENCODER_ACCELERATIONS: Vocab = v("eacs");
pub const MOTOR_ENCODER: Vocab = v("menc");
pub const MOTOR_ENCODERS: Vocab = v("mncs");
pub const MOTOR_ENCODER_RESET: Vocab = v("mre");
pub const MOTOR_ENCODER_RESETS: Vocab = v("mres");
pub const MOTOR_ENCODER_SPEED: Vocab = v("msp");
pub const MOTOR_ENCODER_SPEEDS: Vocab = v("msps");
pub const MOTOR_ENCODER_ACCELERATION: Vocab = v("mac");
pub const MOTOR_ENCODER_ACCELERATIONS: Vocab = v("macs");
pub const MOTOR_CPR: Vocab = v("mcpr");

pub const AMP_ENABLE: Vocab = v("aen");
pub const AMP_DISABLE: Vocab = v("adi");
pub const AMP_CURRENT: Vocab = v("acu");
pub const AMP_CURRENTS: Vocab = v("acus");
pub const AMP_STATUS: Vocab = v("asts");
pub const AMP_STATUS_ALL: Vocab = v("asta");
pub const AMP_MAXCURRENT: Vocab = v("maxc");
pub const AMP_NOMINAL_CURRENT: Vocab = v("acno");
pub const AMP_PEAK_CURRENT: Vocab = v("acpk");
pub const AMP_PWM: Vocab = v("pwm");
pub const AMP_PWM_LIMIT: Vocab = v("pwml");
pub const AMP_VOLTAGE_SUPPLY: Vocab = v("avsu");
pub const VEL_LIMITS: Vocab = v("vlim");
pub const INFO_NAME: Vocab = v("name");
pub const INFO_TYPE: Vocab = v("type");

// streaming-only legacy words
pub const POSITION_MODE: Vocab = v("posd");
pub const VELOCITY_MODE: Vocab = v("veld");

// joint types
pub const JOINT_REVOLUTE: Vocab = v("atrv");
pub const JOINT_PRISMATIC: Vocab = v("atpr");
pub const JOINT_UNKNOWN: Vocab = v("unkn");

// interaction modes
pub const IM_STIFF: Vocab = v("stif");
pub const IM_COMPLIANT: Vocab = v("comp");
pub const IM_UNKNOWN: Vocab = v("unkn");

const CONTROL_MODES: [(ControlMode, Vocab); 17] = [
    (ControlMode::Idle, v("idl")),
    (ControlMode::Position, v("pos")),
    (ControlMode::PositionDirect, v("posd")),
    (ControlMode::Velocity, v("vel")),
    (ControlMode::Torque, v("torq")),
    (ControlMode::ImpedancePosition, v("impp")),
    (ControlMode::ImpedanceVelocity, v("impv")),
    (ControlMode::Pwm, v("ipwm")),
    (ControlMode::Current, v("icur")),
    (ControlMode::Mixed, v("mixd")),
    (ControlMode::ForceIdle, v("f_id")),
    (ControlMode::HardwareFault, v("hwf")),
    (ControlMode::Calibrating, v("calb")),
    (ControlMode::CalibrationDone, v("cald")),
    (ControlMode::NotConfigured, v("cfgn")),
    (ControlMode::Configured, v("cfgy")),
    (ControlMode::Unknown, v("unkw")),
];

pub fn control_mode_vocab(mode: ControlMode) -> Vocab {
    CONTROL_MODES
        .iter()
        .find(|(m, _)| *m == mode)
        .map(|(_, v)| *v)
        .unwrap_or(v("unkw"))
}

pub fn control_mode_from_vocab(word: Vocab) -> Option<ControlMode> {
    CONTROL_MODES
        .iter()
        .find(|(_, v)| *v == word)
        .map(|(m, _)| *m)
}

pub fn interaction_mode_vocab(mode: InteractionMode) -> Vocab {
    match mode {
        InteractionMode::Stiff => IM_STIFF,
        InteractionMode::Compliant => IM_COMPLIANT,
        InteractionMode::Unknown => IM_UNKNOWN,
    }
}

pub fn interaction_mode_from_vocab(word: Vocab) -> Option<InteractionMode> {
    match word {
        w if w == IM_STIFF => Some(InteractionMode::Stiff),
        w if w == IM_COMPLIANT => Some(InteractionMode::Compliant),
        w if w == IM_UNKNOWN => Some(InteractionMode::Unknown),
        _ => None,
    }
}

pub fn joint_type_vocab(kind: JointType) -> Vocab {
    match kind {
        JointType::Revolute => JOINT_REVOLUTE,
        JointType::Prismatic => JOINT_PRISMATIC,
        JointType::Unknown => JOINT_UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_modes_map_both_ways() {
        for (mode, word) in CONTROL_MODES {
            assert_eq!(control_mode_vocab(mode), word);
            assert_eq!(control_mode_from_vocab(word), Some(mode));
        }
        assert_eq!(control_mode_from_vocab(v("zzz")), None);
    }

    #[test]
    fn interaction_words_are_distinct() {
        assert_ne!(IM_STIFF, IM_COMPLIANT);
        assert_eq!(
            interaction_mode_from_vocab(IM_COMPLIANT),
            Some(InteractionMode::Compliant)
        );
    }
}
