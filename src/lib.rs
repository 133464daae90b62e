//! minisdk - routed agents in synchronous rounds
//!
//! Agents register send and receive handlers keyed by route. A shared state
//! graph plus an explicit priority order decides which routes are active
//! for each agent in the next round.
//!
//! # Architecture
//!
//! - **types**: tagged message schema
//! - **agent**: routes, handlers, memory, state machine, round orchestrator
//! - **telemetry**: event collection and terminal summary
//! - **cli**: arguments and TOML configuration
//! - **demo**: the three-agent sorting scenario

pub mod errors;
pub mod types;
pub mod agent;
pub mod telemetry;
pub mod cli;
pub mod demo;

// Re-export commonly used types
pub use errors::{AgentError, Phase, Result};
pub use agent::{
    Agent, AgentMemory, EventLabel, PriorityOrder, Route, RoundOrchestrator, StateGraph,
    StateMachine, StateName,
};
pub use types::{Message, SortTask};
