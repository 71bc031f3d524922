//! End-to-end protocol runs on the in-memory kernel: presence barrier,
//! late joiners, dependency feedback and solved teardown.

mod common;

use std::sync::{Arc, Mutex};

use common::{count, kernel, passive_agent, record_snapshots, Probe, Settler};
use ecoresolution::agent::{ChannelSnapshot, EcoAgent, EcoMonitorAgent, EcoProblem, SolutionCheck};
use ecoresolution::engine::EcoEvent;
use ecoresolution::kernel::{Kernel, RunOutcome};
use ecoresolution::lifecycle::EcoState;
use ecoresolution::problems::cube::on_top_of;
use ecoresolution::problems::OnTopOf;
use ecoresolution::types::{AgentId, EcoMessage, Envelope};

#[tokio::test]
async fn test_goal_slave_feeds_back_held_relation() {
    let table = AgentId::new_v4();
    let agent_1 = passive_agent("agent-1");
    let agent_2 = passive_agent("agent-2");
    let (id_1, id_2) = (agent_1.entity().identity(), agent_2.entity().identity());
    let goal = on_top_of(id_1, id_2, table);
    let log_1 = record_snapshots(&agent_1.channel());
    let log_2 = record_snapshots(&agent_2.channel());

    let mut problem = EcoProblem::new();
    problem.init(agent_1, Some(goal.clone()), Vec::new()).unwrap();
    problem.init(agent_2, None, vec![goal.clone()]).unwrap();

    let mut kernel = kernel();
    let monitor = problem.solve(&mut kernel);
    let summary = kernel.run_coordination_loop().await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Quiescent);
    assert!(!kernel.is_alive(monitor));

    let first = kernel.channel(id_1).unwrap().snapshot().unwrap();
    let second = kernel.channel(id_2).unwrap().snapshot().unwrap();
    assert!(second.dependencies.contains(&id_1));
    assert!(first.acquaintances.contains(&goal));
    assert_eq!(first.state, EcoState::Satisfacted);
    assert_eq!(second.state, EcoState::Satisfacted);

    // agent-1 only learnt the relation once solving had started
    let log_1 = log_1.lock().unwrap();
    assert!(log_1
        .iter()
        .filter(|snapshot| snapshot.acquaintances.contains(&goal))
        .all(|snapshot| snapshot.solving_started));
    assert!(log_2.lock().unwrap().iter().any(|snapshot| snapshot.state == EcoState::Initialized));
}

#[tokio::test]
async fn test_cleared_goal_leaves_slave_dependencies() {
    let table = AgentId::new_v4();
    let agent_1 = EcoAgent::new("agent-1", Box::new(Settler));
    let agent_2 = passive_agent("agent-2");
    let (id_1, id_2) = (agent_1.entity().identity(), agent_2.entity().identity());
    let goal = on_top_of(id_1, id_2, table);
    let log_1 = record_snapshots(&agent_1.channel());
    let log_2 = record_snapshots(&agent_2.channel());

    let mut problem = EcoProblem::new();
    problem.init(agent_1, Some(goal.clone()), Vec::new()).unwrap();
    problem.init(agent_2, None, vec![goal.clone()]).unwrap();

    let mut kernel = kernel();
    problem.solve(&mut kernel);
    let summary = kernel.run_coordination_loop().await.unwrap();
    assert_eq!(summary.outcome, RunOutcome::Quiescent);

    assert!(log_1
        .lock()
        .unwrap()
        .iter()
        .any(|snapshot| snapshot.goal.as_ref() == Some(&goal) && snapshot.acquaintances.contains(&goal)));
    assert!(log_2
        .lock()
        .unwrap()
        .iter()
        .any(|snapshot| snapshot.dependencies.contains(&id_1)));

    let first = kernel.channel(id_1).unwrap().snapshot().unwrap();
    let second = kernel.channel(id_2).unwrap().snapshot().unwrap();
    assert_eq!(first.goal, None);
    assert!(!second.dependencies.contains(&id_1));
}

#[tokio::test]
async fn test_barrier_starts_exactly_the_acknowledged_set() {
    let mut kernel = kernel();
    let probes: Vec<Probe> = (0..3).map(|_| Probe::new()).collect();
    let inboxes: Vec<_> = probes.iter().map(Probe::inbox).collect();
    let bystander = Probe::silent();
    let bystander_inbox = bystander.inbox();

    for probe in probes {
        kernel.launch(Box::new(probe));
    }
    kernel.launch(Box::new(bystander));
    let monitor = kernel.launch(Box::new(EcoMonitorAgent::new(3)));

    let summary = kernel.run_coordination_loop().await.unwrap();
    assert_eq!(summary.outcome, RunOutcome::Quiescent);
    assert!(!kernel.is_alive(monitor));

    for inbox in &inboxes {
        assert_eq!(count(inbox, &EcoMessage::StartSolving), 1);
        assert!(inbox
            .lock()
            .unwrap()
            .iter()
            .filter(|envelope| envelope.message == EcoMessage::StartSolving)
            .all(|envelope| envelope.sender == monitor));
    }
    assert_eq!(count(&bystander_inbox, &EcoMessage::PresenceAnnouncement), 1);
    assert_eq!(count(&bystander_inbox, &EcoMessage::StartSolving), 0);
}

#[test]
fn test_barrier_waits_for_contracted_count() {
    let mut kernel = kernel();
    let probe = Probe::new();
    let inbox = probe.inbox();
    kernel.launch(Box::new(probe));
    let monitor = kernel.launch(Box::new(EcoMonitorAgent::new(2)));

    for _ in 0..20 {
        kernel.run_single_iteration().unwrap();
    }

    assert!(kernel.is_alive(monitor));
    assert_eq!(count(&inbox, &EcoMessage::StartSolving), 0);
}

#[test]
fn test_late_joiner_is_announced_and_started() {
    let mut kernel = kernel();
    let early = Probe::new();
    let early_inbox = early.inbox();
    kernel.launch(Box::new(early));
    let monitor = kernel.launch(Box::new(EcoMonitorAgent::new(2)));

    for _ in 0..5 {
        kernel.run_single_iteration().unwrap();
    }
    assert_eq!(count(&early_inbox, &EcoMessage::PresenceAnnouncement), 1);
    assert_eq!(count(&early_inbox, &EcoMessage::StartSolving), 0);

    let late = Probe::new();
    let late_inbox = late.inbox();
    kernel.launch(Box::new(late));

    for _ in 0..10 {
        kernel.run_single_iteration().unwrap();
    }

    assert!(!kernel.is_alive(monitor));
    assert_eq!(count(&late_inbox, &EcoMessage::PresenceAnnouncement), 1);
    assert_eq!(count(&early_inbox, &EcoMessage::PresenceAnnouncement), 2);
    assert_eq!(count(&early_inbox, &EcoMessage::StartSolving), 1);
    assert_eq!(count(&late_inbox, &EcoMessage::StartSolving), 1);
}

#[tokio::test]
async fn test_barrier_starts_every_acknowledgement_of_one_tick() {
    let mut kernel = kernel();
    let probes: Vec<Probe> = (0..3).map(|_| Probe::new()).collect();
    let inboxes: Vec<_> = probes.iter().map(Probe::inbox).collect();
    for probe in probes {
        kernel.launch(Box::new(probe));
    }
    let monitor = kernel.launch(Box::new(EcoMonitorAgent::new(2)));

    let summary = kernel.run_coordination_loop().await.unwrap();
    assert_eq!(summary.outcome, RunOutcome::Quiescent);
    assert!(!kernel.is_alive(monitor));

    for inbox in &inboxes {
        assert_eq!(count(inbox, &EcoMessage::StartSolving), 1);
    }
}

#[test]
fn test_late_joiner_beyond_silent_participant() {
    let mut kernel = kernel();
    let early = Probe::new();
    let early_inbox = early.inbox();
    let silent = Probe::silent();
    let silent_inbox = silent.inbox();
    kernel.launch(Box::new(early));
    kernel.launch(Box::new(silent));
    let monitor = kernel.launch(Box::new(EcoMonitorAgent::new(2)));

    for _ in 0..5 {
        kernel.run_single_iteration().unwrap();
    }
    assert!(kernel.is_alive(monitor));
    assert_eq!(count(&early_inbox, &EcoMessage::StartSolving), 0);

    let late = Probe::new();
    let late_inbox = late.inbox();
    kernel.launch(Box::new(late));

    for _ in 0..10 {
        kernel.run_single_iteration().unwrap();
    }

    assert!(!kernel.is_alive(monitor));
    assert_eq!(count(&early_inbox, &EcoMessage::StartSolving), 1);
    assert_eq!(count(&late_inbox, &EcoMessage::StartSolving), 1);
    assert_eq!(count(&silent_inbox, &EcoMessage::PresenceAnnouncement), 2);
    assert_eq!(count(&silent_inbox, &EcoMessage::StartSolving), 0);
}

#[test]
fn test_repeated_presence_does_not_reacknowledge() {
    let mut kernel = kernel();
    let agent = passive_agent("solo");
    let id = agent.entity().identity();
    let observer = Probe::silent();
    let observer_id = observer.address();
    let observer_inbox = observer.inbox();
    kernel.launch(Box::new(agent));
    kernel.launch(Box::new(observer));

    for _ in 0..3 {
        kernel.post(id, Envelope::new(observer_id, EcoMessage::PresenceAnnouncement));
        kernel.run_single_iteration().unwrap();
    }
    for _ in 0..3 {
        kernel.run_single_iteration().unwrap();
    }

    let snapshot = kernel.channel(id).unwrap().snapshot().unwrap();
    assert_eq!(snapshot.state, EcoState::Initialized);
    assert_eq!(count(&observer_inbox, &EcoMessage::AcknowledgeReady), 1);
}

#[tokio::test]
async fn test_solution_watch_tears_everyone_down() {
    let mut first = passive_agent("first");
    let second = passive_agent("second");
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    first.add_entity_listener(Box::new(move |_: AgentId, event: &EcoEvent<OnTopOf>| {
        sink.lock().unwrap().push(event.clone());
    }));

    let mut problem = EcoProblem::new().with_solution_watch(SolutionCheck::AllSatisfied);
    let first_id = problem.init(first, None, Vec::new()).unwrap();
    let second_id = problem.init(second, None, Vec::new()).unwrap();

    let mut kernel = kernel();
    let monitor = problem.solve(&mut kernel);
    let summary = kernel.run_coordination_loop().await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::AllTerminated);
    for id in [first_id, second_id, monitor] {
        assert!(!kernel.is_alive(id));
    }
    let events = events.lock().unwrap();
    assert_eq!(events.first(), Some(&EcoEvent::ProblemSolvingStarted));
    assert_eq!(events.last(), Some(&EcoEvent::ProblemSolved));
}

#[tokio::test]
async fn test_custom_problem_monitor_decides() {
    let consulted = Arc::new(Mutex::new(0usize));
    let counter = consulted.clone();
    let check = SolutionCheck::Custom(Box::new(move |participants: &[ChannelSnapshot<OnTopOf>]| {
        *counter.lock().unwrap() += 1;
        participants.len() == 2 && participants.iter().all(|snapshot| snapshot.solving_started)
    }));

    let mut problem = EcoProblem::new().with_solution_watch(check);
    problem.init(passive_agent("left"), None, Vec::new()).unwrap();
    problem.init(passive_agent("right"), None, Vec::new()).unwrap();

    let mut kernel = kernel();
    problem.solve(&mut kernel);
    let summary = kernel.run_coordination_loop().await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::AllTerminated);
    assert!(*consulted.lock().unwrap() >= 1);
}

#[test]
fn test_init_relation_requires_registered_participants() {
    let table = AgentId::new_v4();
    let mut problem = EcoProblem::new();
    let known = problem.init(passive_agent("known"), None, Vec::new()).unwrap();
    let stranger = AgentId::new_v4();

    let result = problem.init_relation(on_top_of(known, stranger, table));
    assert!(matches!(
        result,
        Err(ecoresolution::EcoError::UnknownParticipant(id)) if id == stranger
    ));

    let other = problem.init(passive_agent("other"), None, Vec::new()).unwrap();
    problem.init_relation(on_top_of(known, other, table)).unwrap();
    for id in [known, other] {
        assert!(problem
            .agent(id)
            .unwrap()
            .entity()
            .acquaintances()
            .contains(&on_top_of(known, other, table)));
    }
}
