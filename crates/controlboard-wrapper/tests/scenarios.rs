use controlboard_wrapper::{
    vocab, ControlBoardWrapper, DriverHandle, LatestSnapshots, LutEntry, NetworkRange, RpcParser,
    WrappedDevice, WrapperConfig, WrapperError,
};
use motion_device::{Capabilities, JointType, SharedDevice, SimBoard};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const LEGS_AND_TORSO: &str = "
name: /robot/lower
period: 1000
joints: 9
networks: [legs, torso]
ranges:
  legs: [0, 5, 0, 5]
  torso: \"6 8 0 2\"
";

struct Rig {
    wrapper: Arc<ControlBoardWrapper>,
    sink: Arc<LatestSnapshots>,
    legs: Arc<Mutex<SimBoard>>,
    torso: Arc<Mutex<SimBoard>>,
}

fn rig(legs: SimBoard, torso: SimBoard) -> Rig {
    let cfg: WrapperConfig = serde_yaml::from_str(LEGS_AND_TORSO).unwrap();
    let sink = Arc::new(LatestSnapshots::new());
    let wrapper = ControlBoardWrapper::open(&cfg, sink.clone(), None).unwrap();
    let legs = legs.shared();
    let torso = torso.shared();
    let (l, t): (SharedDevice, SharedDevice) = (legs.clone(), torso.clone());
    wrapper
        .attach_all(vec![
            ("legs".to_string(), DriverHandle::Motion(l)),
            ("torso".to_string(), DriverHandle::Motion(t)),
        ])
        .unwrap();
    for board in [&legs, &torso] {
        board.lock().unwrap().take_calls();
    }
    Rig {
        wrapper,
        sink,
        legs,
        torso,
    }
}

fn default_rig() -> Rig {
    rig(SimBoard::new("legs", 6), SimBoard::new("torso", 3))
}

#[test]
fn scenario_a_lookup_table() {
    let networks = vec![
        (
            "legs".to_string(),
            NetworkRange {
                wrapper_base: 0,
                wrapper_top: 5,
                device_base: 0,
                device_top: 5,
            },
        ),
        (
            "torso".to_string(),
            NetworkRange {
                wrapper_base: 6,
                wrapper_top: 8,
                device_base: 0,
                device_top: 2,
            },
        ),
    ];
    let wrapped = WrappedDevice::deferred(9, &networks).unwrap();
    assert_eq!(wrapped.controlled_joints(), 9);
    let expected: Vec<LutEntry> = (0..6)
        .map(|offset| LutEntry {
            subdevice: 0,
            offset,
        })
        .chain((0..3).map(|offset| LutEntry {
            subdevice: 1,
            offset,
        }))
        .collect();
    assert_eq!(wrapped.lut(), expected.as_slice());

    let r = default_rig();
    assert_eq!(r.wrapper.controlled_joints(), 9);
}

#[test]
fn scenario_b_batched_dispatch() {
    let r = default_rig();
    r.wrapper.position_move_group(&[0, 6], &[10.0, 20.0]).unwrap();
    let legs = r.legs.lock().unwrap().take_calls();
    let torso = r.torso.lock().unwrap().take_calls();
    assert_eq!(legs.len(), 1);
    assert_eq!(legs[0].op, "position_move_group");
    assert_eq!((legs[0].axes.clone(), legs[0].values.clone()), (vec![0], vec![10.0]));
    assert_eq!(torso.len(), 1);
    assert_eq!(torso[0].op, "position_move_group");
    assert_eq!((torso[0].axes.clone(), torso[0].values.clone()), (vec![0], vec![20.0]));
}

#[test]
fn scenario_b_single_calls_without_group_interface() {
    let r = rig(
        SimBoard::new("legs", 6).without(Capabilities::POSITION_GROUP),
        SimBoard::new("torso", 3).without(Capabilities::POSITION_GROUP),
    );
    r.wrapper.position_move_group(&[0, 6, 7], &[10.0, 20.0, 30.0]).unwrap();
    let legs = r.legs.lock().unwrap().take_calls();
    let torso = r.torso.lock().unwrap().take_calls();
    assert_eq!(legs.len(), 1);
    assert_eq!(legs[0].op, "position_move");
    assert_eq!(legs[0].values, vec![10.0]);
    let ops: Vec<_> = torso.iter().map(|c| (c.op, c.axes[0], c.values[0])).collect();
    assert_eq!(
        ops,
        vec![("position_move", 0, 20.0), ("position_move", 1, 30.0)]
    );
}

#[test]
fn scenario_c_missing_torque_marks_field_invalid() {
    let r = rig(
        SimBoard::new("legs", 6),
        SimBoard::new("torso", 3).without(Capabilities::TORQUE),
    );
    r.wrapper.run_once();
    let (state, _) = r.sink.state().unwrap();
    assert!(!state.torque.is_valid);
    assert_eq!(state.torque.values, vec![0.0; 9]);
    assert!(state.joint_position.is_valid);
    assert_eq!(state.joint_position.values.len(), 9);
}

#[test]
fn scenario_d_period_validation() {
    let zero: WrapperConfig = serde_yaml::from_str(
        "name: /p\nperiod: 0\njoints: 1\nnetworks: [a]\nranges:\n  a: [0, 0, 0, 0]\n",
    )
    .unwrap();
    let err = ControlBoardWrapper::open(&zero, Arc::new(LatestSnapshots::new()), None).err();
    assert!(matches!(err, Some(WrapperError::Configuration(_))));

    let omitted: WrapperConfig = serde_yaml::from_str(
        "name: /p\njoints: 1\nnetworks: [a]\nranges:\n  a: [0, 0, 0, 0]\n",
    )
    .unwrap();
    let w = ControlBoardWrapper::open(&omitted, Arc::new(LatestSnapshots::new()), None).unwrap();
    assert_eq!(w.period(), Duration::from_millis(20));
}

#[test]
fn scenario_e_unknown_interface_is_not_recognized() {
    let r = default_rig();
    let mut rpc = RpcParser::new(r.wrapper.clone());
    let reply = rpc.respond(&"[get] [xyzw] [refs]".parse().unwrap());
    assert!(!reply.recognized);
    assert_eq!(reply.response.vocab_at(0), Some(vocab::NOT_RECOGNIZED));

    let reply = rpc.respond(&"[set] [pos] 42 1.0".parse().unwrap());
    assert!(reply.recognized);
    assert_eq!(reply.response.vocab_at(0), Some(vocab::FAIL));
}

#[test]
fn every_joint_routes_to_its_owner() {
    let r = default_rig();
    for joint in 0..9 {
        r.wrapper.position_move(joint, joint as f64 * 1.5).unwrap();
    }
    let legs = r.legs.lock().unwrap();
    let torso = r.torso.lock().unwrap();
    for axis in 0..6 {
        assert_eq!(legs.position_of(axis), Some(axis as f64 * 1.5));
    }
    for axis in 0..3 {
        assert_eq!(torso.position_of(axis), Some((axis + 6) as f64 * 1.5));
    }
}

#[test]
fn subset_permutations_read_back_in_caller_order() {
    let r = default_rig();
    let subsets: [&[usize]; 4] = [&[8, 0, 5], &[6, 7, 8], &[3, 7, 1, 6], &[2]];
    for subset in subsets {
        let values: Vec<f64> = subset.iter().map(|&j| 100.0 + j as f64).collect();
        r.wrapper.set_positions_group(subset, &values).unwrap();
        assert_eq!(r.wrapper.ref_positions_group(subset).unwrap(), values);
        let mut reversed = subset.to_vec();
        reversed.reverse();
        let expected: Vec<f64> = reversed.iter().map(|&j| 100.0 + j as f64).collect();
        assert_eq!(r.wrapper.ref_positions_group(&reversed).unwrap(), expected);
    }
}

#[test]
fn subset_with_unroutable_joint_touches_nothing() {
    let r = default_rig();
    let err = r.wrapper.position_move_group(&[0, 6, 42], &[1.0, 2.0, 3.0]);
    assert!(matches!(err, Err(WrapperError::JointOutOfRange { joint: 42, .. })));
    assert!(r.legs.lock().unwrap().calls().is_empty());
    assert!(r.torso.lock().unwrap().calls().is_empty());
}

#[test]
fn subset_write_with_missing_interface_touches_nothing() {
    let r = rig(
        SimBoard::new("legs", 6),
        SimBoard::new("torso", 3).without(Capabilities::TORQUE),
    );
    let err = r.wrapper.set_ref_torques_group(&[1, 7], &[5.0, 6.0]);
    assert!(matches!(err, Err(WrapperError::CapabilityAbsent { .. })));
    assert!(r.legs.lock().unwrap().calls().is_empty());
    assert_eq!(r.wrapper.ref_torque(1).unwrap(), 0.0);

    let err = r.wrapper.set_ref_torques_all(&[1.0; 9]);
    assert!(matches!(err, Err(WrapperError::CapabilityAbsent { .. })));
    assert!(r.legs.lock().unwrap().calls().is_empty());
    assert_eq!(r.wrapper.ref_torque(0).unwrap(), 0.0);
}

#[test]
fn ros_snapshot_converts_revolute_joints_and_counts_up() {
    let cfg: WrapperConfig = serde_yaml::from_str(&format!(
        "{LEGS_AND_TORSO}ros:\n  use_ros: \"true\"\n  node_name: lower\n  topic_name: /lower/joint_states\n"
    ))
    .unwrap();
    let sink = Arc::new(LatestSnapshots::new());
    let wrapper = ControlBoardWrapper::open(&cfg, sink.clone(), None).unwrap();
    let legs: SharedDevice = SimBoard::new("legs", 6).shared();
    let torso: SharedDevice = SimBoard::new("torso", 3)
        .with_joint_type(2, JointType::Prismatic)
        .shared();
    wrapper
        .attach_all(vec![
            ("legs".to_string(), DriverHandle::Motion(legs)),
            ("torso".to_string(), DriverHandle::Motion(torso)),
        ])
        .unwrap();
    wrapper.set_encoder(0, 180.0).unwrap();
    wrapper.set_encoder(8, 0.25).unwrap();

    wrapper.run_once();
    let first = sink.ros().unwrap();
    assert_eq!(first.name.len(), 9);
    assert!((first.position[0] - std::f64::consts::PI).abs() < 1e-12);
    assert_eq!(first.position[8], 0.25);
    assert_eq!(first.effort.len(), 9);

    wrapper.run_once();
    let second = sink.ros().unwrap();
    assert!(second.seq > first.seq);
    assert_eq!(second.position, first.position);
    wrapper.close().unwrap();
}

#[test]
fn subset_read_fails_when_one_board_lacks_the_interface() {
    let r = rig(
        SimBoard::new("legs", 6),
        SimBoard::new("torso", 3).without(Capabilities::TORQUE),
    );
    let err = r.wrapper.ref_torques_group(&[1, 7]);
    assert!(matches!(err, Err(WrapperError::CapabilityAbsent { .. })));
    assert!(r.wrapper.ref_torques_group(&[1, 2]).is_ok());
}

#[test]
fn all_joints_call_fails_on_a_faulted_axis() {
    let r = default_rig();
    r.torso.lock().unwrap().set_faulted(2, true);
    assert!(matches!(r.wrapper.encoders(), Err(WrapperError::Backend(_))));
    r.torso.lock().unwrap().set_faulted(2, false);
    assert_eq!(r.wrapper.encoders().unwrap().len(), 9);
}

#[test]
fn detach_twice_is_harmless_and_reattach_works() {
    let r = default_rig();
    r.wrapper.detach_all().unwrap();
    r.wrapper.detach_all().unwrap();
    assert!(!r.wrapper.is_running());
    assert!(matches!(r.wrapper.encoder(0), Err(WrapperError::NotAttached(_))));

    let (l, t): (SharedDevice, SharedDevice) = (r.legs.clone(), r.torso.clone());
    r.wrapper
        .attach_all(vec![
            ("legs".to_string(), DriverHandle::Motion(l)),
            ("torso".to_string(), DriverHandle::Motion(t)),
        ])
        .unwrap();
    assert!(r.wrapper.is_running());
    assert!(r.wrapper.encoder(8).is_ok());
}

#[test]
fn attach_with_a_missing_board_fails() {
    let cfg: WrapperConfig = serde_yaml::from_str(LEGS_AND_TORSO).unwrap();
    let w = ControlBoardWrapper::open(&cfg, Arc::new(LatestSnapshots::new()), None).unwrap();
    let legs: SharedDevice = SimBoard::new("legs", 6).shared();
    let err = w.attach_all(vec![("legs".to_string(), DriverHandle::Motion(legs))]);
    assert!(err.is_err());
    assert!(!w.is_running());
}
