//! Configuration management for minisdk
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.minisdk/config.toml

use crate::agent::{OrchestratorConfig, PriorityOrder, StateGraph, StateMachine, StateName};
use crate::errors::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete configuration for minisdk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub orchestrator: OrchestratorConfig,
    pub state_machine: StateMachineConfig,
    pub demo: DemoConfig,
    pub telemetry: TelemetryConfig,
}

/// State graph, priority order and the routed agent's starting state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachineConfig {
    pub initial_state: StateName,
    pub priority: PriorityOrder,
    pub graph: StateGraph,
}

/// Sorting demo settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Seed for the requester's random task choice; entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Items the provider sends every round
    pub data: Vec<String>,
}

/// Terminal display configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub default_verbosity: String,
    pub color_output: bool,
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        let graph = StateGraph::new()
            .with_edge("Start", "elements", "Ready")
            .with_edge("Start", "function", "Waiting")
            .with_edge("Waiting", "elements", "Ready")
            .with_edge("Ready", "elements", "Ready")
            .with_edge("Ready", "function", "Waiting");

        Self {
            initial_state: StateName::new("Start"),
            priority: PriorityOrder::new(["Ready", "Waiting", "Start"]),
            graph,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: None,
            data: vec![
                "banana".to_string(),
                "apple".to_string(),
                "cherry".to_string(),
            ],
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_verbosity: "normal".to_string(),
            color_output: true,
        }
    }
}

impl StateMachineConfig {
    pub fn machine(&self) -> StateMachine {
        StateMachine::new(self.graph.clone(), self.priority.clone())
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(config_path) => Self::load_from_file(config_path),
            None => Self::load_default(),
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AgentError::ConfigError(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config = Self::from_toml(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration path
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".minisdk").join("config.toml"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AgentError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let machine = &self.state_machine;
        machine.graph.validate()?;
        machine.priority.validate()?;

        if !machine.graph.contains(&machine.initial_state) {
            return Err(AgentError::ConfigError(format!(
                "initial_state {:?} is not a state of the graph",
                machine.initial_state.as_str()
            )));
        }

        match self.telemetry.default_verbosity.as_str() {
            "quiet" | "normal" | "verbose" | "very_verbose" => {}
            other => {
                return Err(AgentError::ConfigError(format!(
                    "Invalid verbosity level: {}",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TerminationPolicy;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.orchestrator.rounds, 3);
        assert_eq!(config.state_machine.initial_state, StateName::new("Start"));
        assert_eq!(config.demo.data.len(), 3);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [orchestrator]
            rounds = 5
            termination = "until_quiet"

            [demo]
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.orchestrator.rounds, 5);
        assert_eq!(config.orchestrator.termination, TerminationPolicy::UntilQuiet);
        assert_eq!(config.demo.seed, Some(7));
        assert_eq!(config.demo.data, DemoConfig::default().data);
        assert_eq!(config.state_machine, StateMachineConfig::default());
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[state_machine.graph.Start]"));
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_validation_initial_state() {
        let mut config = Config::default();
        config.state_machine.initial_state = StateName::new("Elsewhere");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_verbosity() {
        let mut config = Config::default();
        config.telemetry.default_verbosity = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_dangling_edge() {
        let mut config = Config::default();
        config.state_machine.graph.add_edge("Ready", "response", "Done");
        assert!(matches!(config.validate(), Err(AgentError::InvalidGraph { .. })));
    }
}
