//! Error types for minisdk
//!
//! Every fallible core operation returns [`Result`]. Handler bodies are free
//! to use `anyhow`; the orchestrator wraps whatever they return into
//! [`AgentError::HandlerFailure`].

use thiserror::Error;

/// Round phase in which a handler ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Outbound message production
    Produce,
    /// Inbound message consumption
    Consume,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Produce => "produce",
            Phase::Consume => "consume",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the agent system
#[derive(Error, Debug)]
pub enum AgentError {
    /// A send or receive handler returned an error
    #[error("Handler of agent {agent:?} failed during {phase}: {cause}")]
    HandlerFailure {
        agent: String,
        phase: Phase,
        cause: String,
    },

    /// State graph references a state it does not define
    #[error("Invalid state graph: edge {from:?} --{event}--> {to:?} targets an unknown state")]
    InvalidGraph {
        from: String,
        event: String,
        to: String,
    },

    /// Priority order is inconsistent with the state graph
    #[error("Invalid priority order: {0}")]
    InvalidPriority(String),

    /// Agent lookup failed
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// Two agents share an id
    #[error("Duplicate agent id: {0}")]
    DuplicateAgent(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// TOML parsing errors
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

impl AgentError {
    /// Wrap a handler error with the agent and phase it came from
    pub fn handler_failure(agent: &str, phase: Phase, cause: &anyhow::Error) -> Self {
        AgentError::HandlerFailure {
            agent: agent.to_string(),
            phase,
            cause: format!("{:#}", cause),
        }
    }
}
