//! Routed agent
//!
//! An agent owns its current state, its memory and two route-keyed handler
//! tables. The orchestrator drives it through three calls per round:
//! `produce_outbound`, `consume_inbound` (once per delivered message) and
//! `commit_state`.
//!
//! `begin_round` pins the routing state for the whole round, so memory
//! written by a handler cannot change which routes fire until the commit.

use crate::agent::handler::{
    HandlerTable, ReceiveHandler, SendHandler, StateDownloader, StateUploader,
};
use crate::agent::memory::AgentMemory;
use crate::agent::route::{EventLabel, Route, StateName};
use crate::agent::state::{StateMachine, Transition};
use crate::errors::{AgentError, Phase, Result};
use crate::types::Message;

/// One participant in the round protocol
pub struct Agent {
    id: String,

    /// `None` disables routing: only wildcard handlers fire
    state: Option<StateName>,

    send_handlers: HandlerTable<SendHandler>,
    receive_handlers: HandlerTable<ReceiveHandler>,
    uploader: Option<StateUploader>,
    downloader: Option<StateDownloader>,
    memory: AgentMemory,

    /// Routing state pinned by `begin_round`
    round_state: Option<Option<StateName>>,
}

impl Agent {
    /// Agent outside the state machine
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: None,
            send_handlers: HandlerTable::new(),
            receive_handlers: HandlerTable::new(),
            uploader: None,
            downloader: None,
            memory: AgentMemory::new(),
            round_state: None,
        }
    }

    /// Agent taking part in the state machine from `initial`
    pub fn routed(id: impl Into<String>, initial: impl Into<StateName>) -> Self {
        let mut agent = Self::new(id);
        agent.state = Some(initial.into());
        agent
    }

    /// Builder form of [`Agent::register_send`]
    pub fn on_send<F>(mut self, route: Route, handler: F) -> Self
    where
        F: FnMut(&mut AgentMemory) -> anyhow::Result<Option<Message>> + 'static,
    {
        self.register_send(route, handler);
        self
    }

    /// Builder form of [`Agent::register_receive`]
    pub fn on_receive<F>(mut self, route: Route, handler: F) -> Self
    where
        F: FnMut(&mut AgentMemory, &Message) -> anyhow::Result<Option<EventLabel>> + 'static,
    {
        self.register_receive(route, handler);
        self
    }

    pub fn with_state_uploader<F>(mut self, uploader: F) -> Self
    where
        F: Fn(Option<&StateName>, &AgentMemory) -> Option<StateName> + 'static,
    {
        self.set_state_uploader(uploader);
        self
    }

    pub fn with_state_downloader<F>(mut self, downloader: F) -> Self
    where
        F: FnMut(&StateName, &mut AgentMemory) + 'static,
    {
        self.set_state_downloader(downloader);
        self
    }

    /// Store `handler` as the send handler for `route`
    pub fn register_send<F>(&mut self, route: Route, handler: F)
    where
        F: FnMut(&mut AgentMemory) -> anyhow::Result<Option<Message>> + 'static,
    {
        self.send_handlers.insert(route, Box::new(handler));
    }

    /// Store `handler` as the receive handler for `route`
    pub fn register_receive<F>(&mut self, route: Route, handler: F)
    where
        F: FnMut(&mut AgentMemory, &Message) -> anyhow::Result<Option<EventLabel>> + 'static,
    {
        self.receive_handlers.insert(route, Box::new(handler));
    }

    pub fn set_state_uploader<F>(&mut self, uploader: F)
    where
        F: Fn(Option<&StateName>, &AgentMemory) -> Option<StateName> + 'static,
    {
        self.uploader = Some(Box::new(uploader));
    }

    pub fn set_state_downloader<F>(&mut self, downloader: F)
    where
        F: FnMut(&StateName, &mut AgentMemory) + 'static,
    {
        self.downloader = Some(Box::new(downloader));
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// State used for routing this round
    pub fn current_state(&self) -> Option<StateName> {
        match &self.uploader {
            Some(upload) => upload(self.state.as_ref(), &self.memory),
            None => self.state.clone(),
        }
    }

    /// Pin the routing state until the next commit or `end_round`
    pub fn begin_round(&mut self) {
        self.round_state = Some(self.current_state());
    }

    pub fn end_round(&mut self) {
        self.round_state = None;
    }

    fn routing_state(&self) -> Option<StateName> {
        match &self.round_state {
            Some(pinned) => pinned.clone(),
            None => self.current_state(),
        }
    }

    /// Whether commits need a state machine
    pub fn is_routed(&self) -> bool {
        self.state.is_some() || self.uploader.is_some()
    }

    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut AgentMemory {
        &mut self.memory
    }

    pub fn send_routes(&self) -> impl Iterator<Item = &Route> {
        self.send_handlers.routes()
    }

    pub fn receive_routes(&self) -> impl Iterator<Item = &Route> {
        self.receive_handlers.routes()
    }

    /// Run the first active send handler
    ///
    /// Returns `None` when no handler is active or the handler sends nothing
    /// (including an empty payload).
    pub fn produce_outbound(&mut self) -> Result<Option<Message>> {
        let current = self.routing_state();
        let Some(handler) = self.send_handlers.first_active(current.as_ref()) else {
            return Ok(None);
        };

        let msg = handler(&mut self.memory)
            .map_err(|e| AgentError::handler_failure(&self.id, Phase::Produce, &e))?;
        Ok(msg.filter(|m| !m.is_empty()))
    }

    /// Run every active receive handler on `msg`, collecting reported events
    pub fn consume_inbound(&mut self, msg: &Message) -> Result<Vec<EventLabel>> {
        let current = self.routing_state();
        let mut events = Vec::new();

        for handler in self.receive_handlers.active(current.as_ref()) {
            let event = handler(&mut self.memory, msg)
                .map_err(|e| AgentError::handler_failure(&self.id, Phase::Consume, &e))?;
            events.extend(event);
        }

        Ok(events)
    }

    /// Resolve and store the next state from this round's events
    ///
    /// Agents without a state return `None` and are left untouched.
    /// Translation starts from the pinned state, which the commit releases.
    pub fn commit_state(
        &mut self,
        events: &[EventLabel],
        machine: &StateMachine,
    ) -> Option<Transition> {
        let current = match self.round_state.take() {
            Some(pinned) => pinned,
            None => self.current_state(),
        }?;
        let next = machine.resolve(&current, events);

        self.state = Some(next.clone());
        if let Some(download) = self.downloader.as_mut() {
            download(&next, &mut self.memory);
        }

        Some(Transition {
            from: current,
            to: next,
            events: events.to_vec(),
        })
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("round_state", &self.round_state)
            .field("send_handlers", &self.send_handlers)
            .field("receive_handlers", &self.receive_handlers)
            .field("memory", &self.memory)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::{PriorityOrder, StateGraph};
    use crate::types::SortTask;

    fn machine() -> StateMachine {
        let graph = StateGraph::new()
            .with_edge("Start", "elements", "Ready")
            .with_edge("Start", "function", "Waiting")
            .with_edge("Waiting", "elements", "Ready")
            .with_edge("Ready", "elements", "Ready")
            .with_edge("Ready", "function", "Waiting");
        StateMachine::new(graph, PriorityOrder::new(["Ready", "Waiting", "Start"]))
    }

    fn storing(memory: &mut AgentMemory, msg: &Message) -> anyhow::Result<Option<EventLabel>> {
        memory.remember(msg.purpose(), msg.clone());
        Ok(Some(EventLabel::new(msg.purpose())))
    }

    #[test]
    fn test_unregistered_route_sends_nothing() {
        let mut agent = Agent::routed("a", "Start")
            .on_send(Route::named("Ready"), |_| Ok(Some(Message::elements(["x"]))));
        assert_eq!(agent.produce_outbound().unwrap(), None);
    }

    #[test]
    fn test_first_registered_send_wins() {
        let mut agent = Agent::routed("a", "Start")
            .on_send(Route::Wildcard, |_| Ok(Some(Message::elements(["first"]))))
            .on_send(Route::named("Start"), |_| Ok(Some(Message::elements(["second"]))));
        assert_eq!(
            agent.produce_outbound().unwrap(),
            Some(Message::elements(["first"]))
        );
    }

    #[test]
    fn test_empty_payload_counts_as_nothing() {
        let mut agent = Agent::new("a").on_send(Route::Wildcard, |_| Ok(Some(Message::response(vec![]))));
        assert_eq!(agent.produce_outbound().unwrap(), None);
    }

    #[test]
    fn test_consume_collects_from_every_matching_handler() {
        let mut agent = Agent::routed("a", "Start")
            .on_receive(Route::named("Start"), storing)
            .on_receive(Route::Wildcard, |_, _| Ok(Some(EventLabel::new("seen"))))
            .on_receive(Route::named("Ready"), |_, _| Ok(Some(EventLabel::new("never"))));

        let events = agent.consume_inbound(&Message::elements(["a"])).unwrap();
        assert_eq!(events, vec![EventLabel::new("elements"), EventLabel::new("seen")]);
        assert!(agent.memory().recall("elements").is_some());
    }

    #[test]
    fn test_commit_applies_priority() {
        let mut agent = Agent::routed("a", "Start").on_receive(Route::named("Start"), storing);
        let mut events = agent.consume_inbound(&Message::function(SortTask::SortLength)).unwrap();
        events.extend(agent.consume_inbound(&Message::elements(["b", "a"])).unwrap());

        let transition = agent.commit_state(&events, &machine()).unwrap();
        assert_eq!(transition.from, StateName::new("Start"));
        assert_eq!(transition.to, StateName::new("Ready"));
        assert_eq!(agent.current_state(), Some(StateName::new("Ready")));
    }

    #[test]
    fn test_commit_without_events_is_identity() {
        let mut agent = Agent::routed("a", "Waiting");
        let transition = agent.commit_state(&[], &machine()).unwrap();
        assert!(!transition.changed());
        assert_eq!(agent.current_state(), Some(StateName::new("Waiting")));
    }

    #[test]
    fn test_unrouted_commit_is_noop() {
        let mut agent = Agent::new("a");
        assert!(agent.commit_state(&[EventLabel::new("elements")], &machine()).is_none());
        assert_eq!(agent.current_state(), None);
    }

    #[test]
    fn test_handler_error_is_tagged() {
        let mut agent = Agent::new("broken").on_send(Route::Wildcard, |_| anyhow::bail!("no data"));
        let err = agent.produce_outbound().unwrap_err();
        assert!(matches!(
            err,
            AgentError::HandlerFailure { ref agent, phase: Phase::Produce, .. } if agent == "broken"
        ));
    }

    #[test]
    fn test_uploader_overrides_routing_state() {
        let mut agent = Agent::routed("a", "Start")
            .with_state_uploader(|_, _| Some(StateName::new("Ready")))
            .on_send(Route::named("Ready"), |_| Ok(Some(Message::elements(["r"]))));
        assert_eq!(agent.current_state(), Some(StateName::new("Ready")));
        assert!(agent.produce_outbound().unwrap().is_some());
    }

    fn seen_uploader(state: Option<&StateName>, memory: &AgentMemory) -> Option<StateName> {
        if memory.recall("seen").is_some() {
            Some(StateName::new("Waiting"))
        } else {
            state.cloned()
        }
    }

    #[test]
    fn test_pinned_state_survives_memory_writes() {
        let mut agent = Agent::routed("a", "Start")
            .with_state_uploader(seen_uploader)
            .on_receive(Route::named("Start"), |memory, msg| {
                memory.remember("seen", msg.clone());
                Ok(Some(EventLabel::new("function")))
            })
            .on_receive(Route::named("Waiting"), |_, _| Ok(Some(EventLabel::new("elements"))));

        agent.begin_round();
        let mut events = agent.consume_inbound(&Message::elements(["x"])).unwrap();
        events.extend(agent.consume_inbound(&Message::elements(["y"])).unwrap());
        assert_eq!(events, vec![EventLabel::new("function"), EventLabel::new("function")]);

        let transition = agent.commit_state(&events, &machine()).unwrap();
        assert_eq!(transition.from, StateName::new("Start"));
        assert_eq!(transition.to, StateName::new("Waiting"));
        assert_eq!(agent.routing_state(), Some(StateName::new("Waiting")));
    }

    #[test]
    fn test_end_round_releases_pin() {
        let mut agent = Agent::routed("a", "Start").with_state_uploader(seen_uploader);
        agent.begin_round();
        agent.memory_mut().remember("seen", Message::elements(["x"]));
        assert_eq!(agent.routing_state(), Some(StateName::new("Start")));

        agent.end_round();
        assert_eq!(agent.routing_state(), Some(StateName::new("Waiting")));
    }

    #[test]
    fn test_downloader_sees_committed_state() {
        let mut agent = Agent::routed("a", "Start")
            .with_state_downloader(|state, memory| {
                memory.record(Message::response(vec![state.to_string()]));
            });
        agent.commit_state(&[EventLabel::new("function")], &machine());
        assert_eq!(
            agent.memory().last(),
            Some(&Message::response(vec!["Waiting".to_string()]))
        );
    }
}
