//! Property tests: arbitrary join/leave/call sequences against a simple model

mod fixtures;

use court_queue::{CourtQueueError, ParticipantId};
use proptest::prelude::*;
use std::collections::HashSet;

use fixtures::{memory_service, organizer, player, waiting_positions};

#[derive(Debug, Clone)]
enum Op {
    Join(ParticipantId),
    Leave(ParticipantId),
    Call(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1..10i64).prop_map(Op::Join),
        2 => (1..10i64).prop_map(Op::Leave),
        1 => (0..4usize).prop_map(Op::Call),
    ]
}

/// Reference model: the waiting order plus everyone already called
#[derive(Default)]
struct Model {
    waiting: Vec<ParticipantId>,
    called: HashSet<ParticipantId>,
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_positions_match_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let (service, store) = memory_service();
            let mut model = Model::default();

            for op in ops {
                match op {
                    Op::Join(id) => {
                        let outcome = service.join(&player(id)).await;
                        if model.waiting.contains(&id) || model.called.contains(&id) {
                            prop_assert_eq!(
                                outcome.unwrap_err(),
                                CourtQueueError::AlreadyQueued { participant_id: id }
                            );
                        } else {
                            let entry = outcome.unwrap();
                            model.waiting.push(id);
                            prop_assert_eq!(entry.position as usize, model.waiting.len());
                        }
                    }
                    Op::Leave(id) => {
                        let outcome = service.leave(&player(id)).await;
                        match model.waiting.iter().position(|&w| w == id) {
                            Some(index) => {
                                prop_assert!(outcome.is_ok());
                                model.waiting.remove(index);
                            }
                            None => prop_assert_eq!(
                                outcome.unwrap_err(),
                                CourtQueueError::NotQueued { participant_id: id }
                            ),
                        }
                    }
                    Op::Call(count) => {
                        let outcome = service.call_next(&organizer(), Some(count)).await;
                        if model.waiting.is_empty() {
                            prop_assert_eq!(outcome.unwrap_err(), CourtQueueError::QueueEmpty);
                        } else {
                            let requested = if count == 0 { 4 } else { count };
                            let take = requested.min(model.waiting.len());
                            let expected: Vec<_> = model.waiting.drain(..take).collect();
                            let called: Vec<_> = outcome
                                .unwrap()
                                .iter()
                                .map(|entry| entry.participant_id)
                                .collect();
                            prop_assert_eq!(&called, &expected);
                            model.called.extend(expected);
                        }
                    }
                }

                let expected: Vec<_> = model
                    .waiting
                    .iter()
                    .enumerate()
                    .map(|(index, &id)| (id, index as u32 + 1))
                    .collect();
                prop_assert_eq!(waiting_positions(&store).await, expected);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
