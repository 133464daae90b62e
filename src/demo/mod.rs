//! Sorting demo
//!
//! Three agents:
//! - `requester` asks for a random sort function every round
//! - `provider` sends the data to sort every round
//! - `sorter` is routed: it stores requests and data while collecting, and
//!   in `Ready` sorts what it holds and broadcasts a response
//!
//! Requester and provider are unrouted and keep every response they hear.

use crate::agent::{
    Agent, AgentMemory, EventLabel, OrchestratorConfig, Route, RoundOrchestrator, StateMachine,
    StateName,
};
use crate::cli::Config;
use crate::errors::Result;
use crate::types::{Message, SortTask};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub const SORTER: &str = "sorter";
pub const REQUESTER: &str = "requester";
pub const PROVIDER: &str = "provider";

/// State in which the sorter emits its response
pub const READY: &str = "Ready";

/// Everything needed to build the demo agents
#[derive(Debug, Clone)]
pub struct DemoSettings {
    pub machine: StateMachine,
    pub initial_state: StateName,
    pub seed: Option<u64>,
    pub data: Vec<String>,
}

impl DemoSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            machine: config.state_machine.machine(),
            initial_state: config.state_machine.initial_state.clone(),
            seed: config.demo.seed,
            data: config.demo.data.clone(),
        }
    }
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Keep requests and data, report their purpose as the event
fn store_work(memory: &mut AgentMemory, msg: &Message) -> anyhow::Result<Option<EventLabel>> {
    match msg {
        Message::Function { .. } | Message::Elements { .. } => {
            memory.remember_once(msg.purpose(), msg.clone());
            Ok(Some(EventLabel::new(msg.purpose())))
        }
        Message::Response { .. } => Ok(None),
    }
}

/// Sort stored data with the stored function, then forget both
fn sort_stored(memory: &mut AgentMemory) -> anyhow::Result<Option<Message>> {
    let data = match memory.recall("elements").and_then(Message::items) {
        Some(data) => data.to_vec(),
        None => return Ok(None),
    };
    let task = match memory.recall("function") {
        Some(Message::Function { task }) => *task,
        _ => SortTask::default(),
    };

    memory.clear_slots();
    let response = Message::response(task.apply(&data));
    memory.record(response.clone());
    Ok(Some(response))
}

/// Keep every response heard
fn keep_responses(memory: &mut AgentMemory, msg: &Message) -> anyhow::Result<Option<EventLabel>> {
    if let Message::Response { .. } = msg {
        memory.record(msg.clone());
    }
    Ok(None)
}

/// Routed sorter with a storing receive handler on every state
pub fn sorter(settings: &DemoSettings) -> Agent {
    let mut agent = Agent::routed(SORTER, settings.initial_state.clone());
    for state in settings.machine.graph.states() {
        agent.register_receive(Route::Named(state.clone()), store_work);
    }
    agent.register_send(Route::named(READY), sort_stored);
    agent
}

/// Unrouted requester choosing a random sort function each round
pub fn requester(settings: &DemoSettings) -> Agent {
    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    Agent::new(REQUESTER)
        .on_send(Route::Wildcard, move |memory| {
            let task = SortTask::ALL
                .choose(&mut rng)
                .copied()
                .unwrap_or_default();
            memory.remember("request", Message::function(task));
            Ok(Some(Message::function(task)))
        })
        .on_receive(Route::Wildcard, keep_responses)
}

/// Unrouted provider sending the same data every round
pub fn provider(settings: &DemoSettings) -> Agent {
    let data = settings.data.clone();

    Agent::new(PROVIDER)
        .on_send(Route::Wildcard, move |_| Ok(Some(Message::elements(data.clone()))))
        .on_receive(Route::Wildcard, keep_responses)
}

/// The three demo agents in broadcast order
pub fn sorting_agents(settings: &DemoSettings) -> Vec<Agent> {
    vec![sorter(settings), requester(settings), provider(settings)]
}

/// Orchestrator wired with the demo agents and the configured state machine
pub fn build_orchestrator(config: &Config) -> Result<RoundOrchestrator> {
    let settings = DemoSettings::from_config(config);
    let orchestrator: OrchestratorConfig = config.orchestrator.clone();

    Ok(RoundOrchestrator::new(sorting_agents(&settings), orchestrator)?
        .with_state_machine(settings.machine))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(seed: u64) -> DemoSettings {
        DemoSettings {
            seed: Some(seed),
            ..DemoSettings::default()
        }
    }

    #[test]
    fn test_sorter_waits_in_start() {
        let mut sorter = sorter(&settings(1));
        assert_eq!(sorter.produce_outbound().unwrap(), None);
    }

    #[test]
    fn test_sorter_ignores_responses() {
        let mut sorter = sorter(&settings(1));
        let events = sorter.consume_inbound(&Message::response(vec!["a".into()])).unwrap();
        assert!(events.is_empty());
        assert!(sorter.memory().is_empty());
    }

    #[test]
    fn test_sort_stored_uses_requested_task() {
        let mut memory = AgentMemory::new();
        memory.remember("function", Message::function(SortTask::SortLength));
        memory.remember("elements", Message::elements(["ccc", "a", "bb"]));

        let response = sort_stored(&mut memory).unwrap();
        assert_eq!(response, Some(Message::response(vec!["a".into(), "bb".into(), "ccc".into()])));
        assert!(memory.recall("elements").is_none());
    }

    #[test]
    fn test_sort_stored_defaults_to_alpha() {
        let mut memory = AgentMemory::new();
        memory.remember("elements", Message::elements(["b", "a"]));
        assert_eq!(
            sort_stored(&mut memory).unwrap(),
            Some(Message::response(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn test_sort_stored_needs_data() {
        let mut memory = AgentMemory::new();
        memory.remember("function", Message::function(SortTask::SortAlpha));
        assert_eq!(sort_stored(&mut memory).unwrap(), None);
    }

    #[test]
    fn test_seeded_requester_is_reproducible() {
        let picks = |seed| {
            let mut agent = requester(&settings(seed));
            (0..5)
                .map(|_| agent.produce_outbound().unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(9), picks(9));
    }

    #[test]
    fn test_provider_sends_configured_data() {
        let mut provider = provider(&settings(1));
        assert_eq!(
            provider.produce_outbound().unwrap(),
            Some(Message::elements(["banana", "apple", "cherry"]))
        );
    }
}
