//! Agent orchestration module
//!
//! Core agent components: routes, handlers, memory, state machine, the
//! agent itself and the round orchestrator.

pub mod route;
pub mod handler;
pub mod memory;
pub mod state;
pub mod participant;
pub mod orchestrator;

// Re-export commonly used types
pub use route::{EventLabel, Route, StateName};
pub use memory::{AgentMemory, MAX_MEMORY_ENTRIES};
pub use state::{PriorityOrder, StateGraph, StateMachine, Transition};
pub use participant::Agent;
pub use orchestrator::{
    FailurePolicy, OrchestratorConfig, RoundOrchestrator, RoundReport, RunReport,
    TerminationPolicy,
};
