//! State graph and priority-based transition resolution
//!
//! Resolution is a pure function of (current state, events, graph, priority):
//! - Translation: each event maps through `graph[current]`, unmapped events
//!   map to `current` itself
//! - Priority: the first state in the priority order that appears among the
//!   translated candidates wins
//! - Identity: when no candidate is in the priority order the state is kept

use crate::agent::route::{EventLabel, StateName};
use crate::errors::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

type RawGraph = BTreeMap<String, BTreeMap<String, String>>;

/// Static mapping state -> event -> successor state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawGraph", into = "RawGraph")]
pub struct StateGraph {
    edges: BTreeMap<StateName, BTreeMap<EventLabel, StateName>>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a state with no outgoing edges
    pub fn add_state(&mut self, state: impl Into<StateName>) -> &mut Self {
        self.edges.entry(state.into()).or_default();
        self
    }

    /// Add `from --event--> to`; replaces an existing edge for the same event
    pub fn add_edge(
        &mut self,
        from: impl Into<StateName>,
        event: impl Into<EventLabel>,
        to: impl Into<StateName>,
    ) -> &mut Self {
        self.edges
            .entry(from.into())
            .or_default()
            .insert(event.into(), to.into());
        self
    }

    /// Builder form of [`StateGraph::add_edge`]
    pub fn with_edge(
        mut self,
        from: impl Into<StateName>,
        event: impl Into<EventLabel>,
        to: impl Into<StateName>,
    ) -> Self {
        self.add_edge(from, event, to);
        self
    }

    /// Successor of `current` on `event`, falling back to `current`
    pub fn next(&self, current: &StateName, event: &EventLabel) -> StateName {
        self.edges
            .get(current)
            .and_then(|events| events.get(event))
            .unwrap_or(current)
            .clone()
    }

    pub fn contains(&self, state: &StateName) -> bool {
        self.edges.contains_key(state)
    }

    pub fn states(&self) -> impl Iterator<Item = &StateName> {
        self.edges.keys()
    }

    /// Outgoing edges of `state`
    pub fn events_from(&self, state: &StateName) -> Option<&BTreeMap<EventLabel, StateName>> {
        self.edges.get(state)
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Check that every edge targets a declared state
    pub fn validate(&self) -> Result<()> {
        for (from, events) in &self.edges {
            for (event, to) in events {
                if !self.edges.contains_key(to) {
                    return Err(AgentError::InvalidGraph {
                        from: from.to_string(),
                        event: event.to_string(),
                        to: to.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl From<RawGraph> for StateGraph {
    fn from(raw: RawGraph) -> Self {
        let edges = raw
            .into_iter()
            .map(|(from, events)| {
                let events = events
                    .into_iter()
                    .map(|(event, to)| (EventLabel::from(event), StateName::from(to)))
                    .collect();
                (StateName::from(from), events)
            })
            .collect();
        Self { edges }
    }
}

impl From<StateGraph> for RawGraph {
    fn from(graph: StateGraph) -> Self {
        graph
            .edges
            .into_iter()
            .map(|(from, events)| {
                let events = events
                    .into_iter()
                    .map(|(event, to)| (event.as_str().to_string(), to.as_str().to_string()))
                    .collect();
                (from.as_str().to_string(), events)
            })
            .collect()
    }
}

/// Explicit tie-break order over state names, highest priority first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityOrder(Vec<StateName>);

impl PriorityOrder {
    pub fn new<I, S>(states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StateName>,
    {
        Self(states.into_iter().map(Into::into).collect())
    }

    /// First state in priority order present among `candidates`
    pub fn resolve<'a>(&'a self, candidates: &[StateName]) -> Option<&'a StateName> {
        self.0.iter().find(|state| candidates.contains(*state))
    }

    pub fn as_slice(&self) -> &[StateName] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject duplicate names
    ///
    /// Names that are not graph states are allowed; they are never chosen.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for state in &self.0 {
            if !seen.insert(state) {
                return Err(AgentError::InvalidPriority(format!(
                    "{:?} listed more than once",
                    state.as_str()
                )));
            }
        }
        Ok(())
    }
}

/// A committed state change for one round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: StateName,
    pub to: StateName,

    /// Events that were resolved to reach `to`
    pub events: Vec<EventLabel>,
}

impl Transition {
    /// Whether the state differs from the previous one
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Shared graph plus priority order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachine {
    pub graph: StateGraph,
    pub priority: PriorityOrder,
}

impl StateMachine {
    pub fn new(graph: StateGraph, priority: PriorityOrder) -> Self {
        Self { graph, priority }
    }

    /// Validate the graph and the priority order; the run never requires it
    pub fn validate(&self) -> Result<()> {
        self.graph.validate()?;
        self.priority.validate()
    }

    /// Candidate next states, one per event, in event order
    pub fn candidates(&self, current: &StateName, events: &[EventLabel]) -> Vec<StateName> {
        events
            .iter()
            .map(|event| self.graph.next(current, event))
            .collect()
    }

    /// Next state after a round that produced `events`
    pub fn resolve(&self, current: &StateName, events: &[EventLabel]) -> StateName {
        let candidates = self.candidates(current, events);
        self.priority
            .resolve(&candidates)
            .unwrap_or(current)
            .clone()
    }
}
