//! Fire-and-forget command stream.
//!
//! Each [`CommandMessage`] carries a header naming the command and a flat
//! numeric body. Nothing is ever answered: malformed messages and backend
//! failures are logged and dropped.

use crate::vocab;
use crate::wire::Bottle;
use crate::{ControlBoardWrapper, Result, WrapperError};
use std::sync::Arc;
use tracing::{trace, warn};

/// One message from the streaming port.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandMessage {
    pub head: Bottle,
    pub body: Vec<f64>,
}

impl CommandMessage {
    pub fn new(head: Bottle, body: Vec<f64>) -> Self {
        Self { head, body }
    }
}

pub struct StreamingParser {
    wrapper: Arc<ControlBoardWrapper>,
    joints: usize,
}

impl StreamingParser {
    pub fn new(wrapper: Arc<ControlBoardWrapper>) -> Self {
        let joints = wrapper.controlled_joints();
        Self { wrapper, joints }
    }

    /// Refresh the cached joint count.
    pub fn initialize(&mut self) {
        self.joints = self.wrapper.controlled_joints();
    }

    pub fn on_read(&self, msg: &CommandMessage) {
        let metrics = self.wrapper.metrics();
        metrics.stream_messages.inc();
        trace!(head = %msg.head, body = ?msg.body, "stream command");
        if msg.body.is_empty() || msg.body.len() > self.joints {
            metrics.stream_discarded.inc();
            warn!(
                head = %msg.head,
                received = msg.body.len(),
                joints = self.joints,
                "discarding stream command with bad payload length"
            );
            return;
        }
        if let Err(e) = self.dispatch(&msg.head, &msg.body) {
            if e.is_protocol() {
                metrics.stream_discarded.inc();
            }
            warn!(head = %msg.head, error = %e, "stream command failed");
        }
    }

    fn dispatch(&self, head: &Bottle, body: &[f64]) -> Result<()> {
        let w = &self.wrapper;
        let word = head
            .vocab_at(0)
            .ok_or_else(|| WrapperError::protocol("header does not start with a word"))?;
        match word {
            vocab::OPEN_LOOP_INTERFACE => match head.vocab_at(1) {
                Some(vocab::OL_REF) => w.set_ref_duty_cycle(joint_at(head, 2)?, body[0]),
                Some(vocab::OL_REFS) => w.set_ref_duty_cycles_all(body),
                _ => Err(unknown(head)),
            },
            vocab::CURRENT_INTERFACE => match head.vocab_at(1) {
                Some(vocab::REF) => w.set_ref_current(joint_at(head, 2)?, body[0]),
                Some(vocab::REFS) => w.set_ref_currents_all(body),
                Some(vocab::REF_GROUP) => {
                    let joints = subset_at(head, 2, body.len())?;
                    w.set_ref_currents_group(&joints, body)
                }
                _ => Err(unknown(head)),
            },
            vocab::TORQUE_INTERFACE => match head.vocab_at(1) {
                Some(vocab::TORQUE_DIRECT) => w.set_ref_torque(joint_at(head, 2)?, body[0]),
                Some(vocab::TORQUES_DIRECT) => w.set_ref_torques_all(body),
                Some(vocab::TORQUES_DIRECT_GROUP) => {
                    let joints = subset_at(head, 2, body.len())?;
                    w.set_ref_torques_group(&joints, body)
                }
                _ => Err(unknown(head)),
            },
            vocab::POSITION_MOVES => w.position_move_all(body),
            vocab::VELOCITY_MOVES => w.velocity_move_all(body),
            vocab::VELOCITY_MOVE => w.velocity_move(joint_at(head, 1)?, body[0]),
            vocab::VELOCITY_MOVE_GROUP => {
                let joints = subset_at(head, 1, body.len())?;
                w.velocity_move_group(&joints, body)
            }
            vocab::POSITION_DIRECT => w.set_position(joint_at(head, 1)?, body[0]),
            vocab::POSITION_DIRECT_GROUP => {
                let joints = subset_at(head, 1, body.len())?;
                w.set_positions_group(&joints, body)
            }
            vocab::POSITION_DIRECTS => w.set_positions_all(body),
            vocab::POSITION_MODE | vocab::VELOCITY_MODE => Err(WrapperError::protocol(format!(
                "{word:?} is no longer accepted on the stream; set the control mode instead"
            ))),
            _ => Err(unknown(head)),
        }
    }
}

fn unknown(head: &Bottle) -> WrapperError {
    WrapperError::protocol(format!("unrecognized stream command {head}"))
}

fn joint_at(head: &Bottle, i: usize) -> Result<usize> {
    head.int_at(i)
        .and_then(|j| usize::try_from(j).ok())
        .ok_or_else(|| WrapperError::protocol(format!("header item {i} is not a joint index")))
}

/// `n (j0 j1 ..)` starting at header item `i`; `n` must match both the list
/// and the payload length.
fn subset_at(head: &Bottle, i: usize, values: usize) -> Result<Vec<usize>> {
    let n = joint_at(head, i)?;
    let joints = head
        .list_at(i + 1)
        .and_then(|l| {
            l.items()
                .iter()
                .map(|v| v.as_int().and_then(|j| usize::try_from(j).ok()))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| WrapperError::protocol(format!("header item {} is not a joint list", i + 1)))?;
    if joints.len() != n || values != n {
        return Err(WrapperError::protocol(format!(
            "subset announces {n} joints, lists {} with {values} values",
            joints.len()
        )));
    }
    Ok(joints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::LatestSnapshots;
    use crate::types::WrapperConfig;
    use motion_device::{SharedDevice, SimBoard};
    use std::sync::Mutex;

    fn parser() -> (StreamingParser, Arc<Mutex<SimBoard>>) {
        let cfg: WrapperConfig = serde_yaml::from_str(
            "name: /arm\nperiod: 1000\njoints: 3\nnetworks: [only]\nranges:\n  only: [0, 2, 0, 2]\n",
        )
        .unwrap();
        let w = ControlBoardWrapper::open(&cfg, Arc::new(LatestSnapshots::new()), None).unwrap();
        let board = SimBoard::new("only", 3).shared();
        let shared: SharedDevice = board.clone();
        w.attach_all(vec![("only".to_string(), crate::DriverHandle::Motion(shared))])
            .unwrap();
        (StreamingParser::new(w), board)
    }

    fn msg(head: &str, body: &[f64]) -> CommandMessage {
        CommandMessage::new(head.parse().unwrap(), body.to_vec())
    }

    #[test]
    fn oversized_and_empty_payloads_are_discarded() {
        let (p, board) = parser();
        p.on_read(&msg("[poss]", &[1.0, 2.0, 3.0, 4.0]));
        p.on_read(&msg("[poss]", &[]));
        assert!(board.lock().unwrap().calls().is_empty());
        let m = p.wrapper.metrics();
        assert_eq!(m.stream_messages.get(), 2);
        assert_eq!(m.stream_discarded.get(), 2);
    }

    #[test]
    fn position_direct_subset_reaches_the_board() {
        let (p, board) = parser();
        p.on_read(&msg("[dpsg] 2 (2 0)", &[5.0, 6.0]));
        let calls = board.lock().unwrap().take_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].axes, vec![2, 0]);
        assert_eq!(calls[0].values, vec![5.0, 6.0]);
    }

    #[test]
    fn full_position_vector_moves_every_joint() {
        let (p, board) = parser();
        p.on_read(&msg("[poss]", &[1.0, 2.0, 3.0]));
        let b = board.lock().unwrap();
        assert_eq!(b.position_of(2), Some(3.0));
    }

    #[test]
    fn short_full_vector_is_logged_not_applied() {
        let (p, board) = parser();
        p.on_read(&msg("[vmos]", &[1.0, 2.0]));
        assert!(board.lock().unwrap().calls().is_empty());
    }

    #[test]
    fn retired_mode_words_are_rejected() {
        let (p, board) = parser();
        p.on_read(&msg("[posd]", &[1.0]));
        p.on_read(&msg("[veld]", &[1.0]));
        assert!(board.lock().unwrap().calls().is_empty());
        assert_eq!(p.wrapper.metrics().stream_discarded.get(), 2);
    }

    #[test]
    fn torque_direct_single_joint() {
        let (p, _) = parser();
        p.on_read(&msg("[torq] [dtq] 1", &[0.75]));
        assert_eq!(p.wrapper.ref_torque(1).unwrap(), 0.75);
    }
}
