//! End-to-end tests for the sorting demo
//!
//! Runs the three demo agents with the default configuration.

use minisdk::cli::Config;
use minisdk::demo::{self, PROVIDER, REQUESTER, SORTER};
use minisdk::{Message, SortTask, StateName};

fn seeded(seed: u64, rounds: usize) -> Config {
    let mut config = Config::default();
    config.demo.seed = Some(seed);
    config.orchestrator.rounds = rounds;
    config
}

#[test]
fn test_sorter_is_ready_after_first_round() {
    let mut orchestrator = demo::build_orchestrator(&seeded(1, 1)).unwrap();
    let report = orchestrator.run().unwrap();

    let sorter = orchestrator.agent(SORTER).unwrap();
    assert_eq!(sorter.current_state(), Some(StateName::new("Ready")));
    assert!(report.rounds[0].sent[0].is_none());
    assert_eq!(report.rounds[0].messages_sent(), 2);
}

#[test]
fn test_responses_reach_both_peers() {
    let mut orchestrator = demo::build_orchestrator(&seeded(3, 3)).unwrap();
    let report = orchestrator.run().unwrap();

    // sorter answers in rounds 2 and 3
    assert!(report.rounds[1].sent[0].is_some());
    assert!(report.rounds[2].sent[0].is_some());

    for id in [REQUESTER, PROVIDER] {
        let memory = orchestrator.agent(id).unwrap().memory();
        assert_eq!(memory.len(), 2, "{} heard {} responses", id, memory.len());
        assert!(memory.log().iter().all(|m| matches!(m, Message::Response { .. })));
    }
}

#[test]
fn test_response_follows_previous_request() {
    let mut orchestrator = demo::build_orchestrator(&seeded(11, 2)).unwrap();
    let report = orchestrator.run().unwrap();

    let task = match &report.rounds[0].sent[1] {
        Some(Message::Function { task }) => *task,
        other => panic!("requester sent {:?}", other),
    };
    let data = Config::default().demo.data;
    assert_eq!(
        report.rounds[1].sent[0],
        Some(Message::response(task.apply(&data)))
    );
}

#[test]
fn test_same_seed_same_run() {
    let sent = |seed| {
        let mut orchestrator = demo::build_orchestrator(&seeded(seed, 4)).unwrap();
        let report = orchestrator.run().unwrap();
        report
            .rounds
            .into_iter()
            .map(|r| r.sent)
            .collect::<Vec<_>>()
    };
    assert_eq!(sent(5), sent(5));
}

#[test]
fn test_both_sort_tasks_produce_sorted_fruit() {
    let data = Config::default().demo.data;
    assert_eq!(SortTask::SortAlpha.apply(&data), vec!["apple", "banana", "cherry"]);
    assert_eq!(SortTask::SortLength.apply(&data), vec!["apple", "banana", "cherry"]);
}

#[test]
fn test_telemetry_counts_the_run() {
    let mut orchestrator = demo::build_orchestrator(&seeded(2, 3)).unwrap();
    orchestrator.run().unwrap();

    let stats = orchestrator.telemetry().get_stats();
    assert_eq!(stats.rounds, 3);
    // 2 messages in round 1, 3 in rounds 2 and 3
    assert_eq!(stats.messages_sent, 8);
    assert_eq!(stats.deliveries, 16);
    assert_eq!(stats.state_transitions, 3);
    assert_eq!(stats.state_changes, 1);
}
