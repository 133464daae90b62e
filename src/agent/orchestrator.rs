//! Round orchestrator - main coordinator
//!
//! Drives a fixed agent set through discrete rounds. Each round runs four
//! strictly ordered phases:
//! 1. Produce: every agent, in order, offers at most one message
//! 2. Deliver: each message fans out to every agent except its producer
//! 3. Consume: each agent handles its inbound messages in producer order
//! 4. Commit: each agent resolves its next state from the round's events
//!
//! No agent observes another agent's commit before the next round starts.
//! Every agent's routing state is pinned before phase 1 and holds until its
//! commit.

use crate::agent::participant::Agent;
use crate::agent::route::EventLabel;
use crate::agent::state::{StateMachine, Transition};
use crate::errors::{AgentError, Phase, Result};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::types::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

/// When a run stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationPolicy {
    /// Exactly `rounds` rounds
    #[default]
    FixedRounds,
    /// Stop after the first round in which nobody sends, at most `rounds` rounds
    UntilQuiet,
}

/// What a failing handler does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the run with [`AgentError::HandlerFailure`]
    Propagate,
    /// Record the failure and skip the agent for the rest of the round
    #[default]
    SkipAgent,
}

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Round budget
    pub rounds: usize,

    pub termination: TerminationPolicy,

    pub on_handler_failure: FailurePolicy,

    /// Print phase progress to stderr
    pub verbose: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            rounds: 3,
            termination: TerminationPolicy::FixedRounds,
            on_handler_failure: FailurePolicy::SkipAgent,
            verbose: false,
        }
    }
}

/// A handler failure absorbed under [`FailurePolicy::SkipAgent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    pub agent: String,
    pub phase: Phase,
    pub cause: String,
}

/// One message handed to one recipient, by agent index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub from: usize,
    pub to: usize,
}

/// What happened in one round
#[derive(Debug, Clone)]
pub struct RoundReport {
    /// 1-based round number
    pub round: usize,

    /// Outbound message per agent index
    pub sent: Vec<Option<Message>>,

    pub deliveries: Vec<Delivery>,

    /// Events reported to each agent index
    pub events: Vec<Vec<EventLabel>>,

    /// Commits by agent index, routed agents only
    pub transitions: Vec<(usize, Transition)>,

    pub failures: Vec<HandlerFailure>,
}

impl RoundReport {
    /// Nobody sent anything this round
    pub fn is_quiet(&self) -> bool {
        self.sent.iter().all(Option::is_none)
    }

    pub fn messages_sent(&self) -> usize {
        self.sent.iter().filter(|m| m.is_some()).count()
    }
}

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub rounds: Vec<RoundReport>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            rounds: Vec::new(),
        }
    }

    pub fn rounds_run(&self) -> usize {
        self.rounds.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &HandlerFailure> {
        self.rounds.iter().flat_map(|r| r.failures.iter())
    }
}

/// Main round orchestrator
pub struct RoundOrchestrator {
    /// Fixed order; defines the broadcast topology
    agents: Vec<Agent>,

    /// Shared by every routed agent
    machine: Option<StateMachine>,

    config: OrchestratorConfig,

    telemetry: TelemetryCollector,
}

impl RoundOrchestrator {
    /// Create an orchestrator over `agents`
    pub fn new(agents: Vec<Agent>, config: OrchestratorConfig) -> Result<Self> {
        let mut orchestrator = Self {
            agents: Vec::with_capacity(agents.len()),
            machine: None,
            config,
            telemetry: TelemetryCollector::new(),
        };
        for agent in agents {
            orchestrator.add_agent(agent)?;
        }
        Ok(orchestrator)
    }

    /// Attach the state machine shared by routed agents
    pub fn with_state_machine(mut self, machine: StateMachine) -> Self {
        self.machine = Some(machine);
        self
    }

    /// Report into an existing collector
    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Append an agent at the end of the broadcast order
    pub fn add_agent(&mut self, agent: Agent) -> Result<()> {
        if self.agents.iter().any(|a| a.id() == agent.id()) {
            return Err(AgentError::DuplicateAgent(agent.id().to_string()));
        }
        self.agents.push(agent);
        Ok(())
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: &str) -> Result<&Agent> {
        self.agents
            .iter()
            .find(|a| a.id() == id)
            .ok_or_else(|| AgentError::UnknownAgent(id.to_string()))
    }

    pub fn agent_mut(&mut self, id: &str) -> Result<&mut Agent> {
        self.agents
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or_else(|| AgentError::UnknownAgent(id.to_string()))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn state_machine(&self) -> Option<&StateMachine> {
        self.machine.as_ref()
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Check that the run can start
    ///
    /// Only a routed agent without a state machine is fatal. Dangling edges
    /// and unknown priority names resolve by fallback, see [`Self::validate`].
    pub fn check(&self) -> Result<()> {
        if self.machine.is_some() {
            return Ok(());
        }
        match self.agents.iter().find(|a| a.is_routed()) {
            Some(agent) => Err(AgentError::ConfigError(format!(
                "agent {:?} is routed but no state machine is configured",
                agent.id()
            ))),
            None => Ok(()),
        }
    }

    /// Stricter [`Self::check`] that also validates the state machine
    pub fn validate(&self) -> Result<()> {
        self.check()?;
        match &self.machine {
            Some(machine) => machine.validate(),
            None => Ok(()),
        }
    }

    /// Run until the round budget is spent (or the first quiet round)
    pub fn run(&mut self) -> Result<RunReport> {
        self.check()?;

        let mut report = RunReport::new();
        for round in 1..=self.config.rounds {
            let round_report = self.run_round(round)?;
            let quiet = round_report.is_quiet();
            report.rounds.push(round_report);

            if quiet && self.config.termination == TerminationPolicy::UntilQuiet {
                if self.config.verbose {
                    eprintln!("[ROUND {}] no traffic, stopping", round);
                }
                break;
            }
        }

        self.telemetry.record(TelemetryEvent::RunFinished {
            rounds: report.rounds_run(),
            timestamp: Instant::now(),
        });
        Ok(report)
    }

    /// Run a single round through all four phases
    pub fn run_round(&mut self, round: usize) -> Result<RoundReport> {
        let verbose = self.config.verbose;
        let policy = self.config.on_handler_failure;
        let telemetry = &self.telemetry;
        let agents = &mut self.agents;
        let n = agents.len();

        telemetry.record(TelemetryEvent::RoundStarted {
            round,
            timestamp: Instant::now(),
        });
        if verbose {
            eprintln!("[ROUND {}]", round);
        }

        for agent in agents.iter_mut() {
            agent.begin_round();
        }

        let mut skipped = vec![false; n];
        let mut failures = Vec::new();

        // Phase 1: produce
        let mut sent: Vec<Option<Message>> = Vec::with_capacity(n);
        for (i, agent) in agents.iter_mut().enumerate() {
            match agent.produce_outbound() {
                Ok(msg) => {
                    if let Some(msg) = &msg {
                        if verbose {
                            eprintln!("[SEND] {}: {}", agent.id(), msg);
                        }
                        telemetry.record(TelemetryEvent::MessageSent {
                            agent: agent.id().to_string(),
                            purpose: msg.purpose().to_string(),
                            timestamp: Instant::now(),
                        });
                    }
                    sent.push(msg);
                }
                Err(err) => {
                    absorb(err, policy, telemetry, verbose, &mut failures)?;
                    skipped[i] = true;
                    sent.push(None);
                }
            }
        }

        // Phase 2: deliver
        let fan_out: Vec<Delivery> = (0..n)
            .flat_map(|to| {
                sent.iter()
                    .enumerate()
                    .filter(move |(from, msg)| *from != to && msg.is_some())
                    .map(move |(from, _)| Delivery { from, to })
            })
            .collect();

        // Phase 3: consume; only handed-over messages count as delivered
        let mut deliveries = Vec::with_capacity(fan_out.len());
        let mut events: Vec<Vec<EventLabel>> = vec![Vec::new(); n];
        for delivery in fan_out {
            if skipped[delivery.to] {
                continue;
            }
            let Some(msg) = &sent[delivery.from] else {
                continue;
            };
            deliveries.push(delivery);
            telemetry.record(TelemetryEvent::MessageDelivered {
                from: agents[delivery.from].id().to_string(),
                to: agents[delivery.to].id().to_string(),
                timestamp: Instant::now(),
            });
            match agents[delivery.to].consume_inbound(msg) {
                Ok(reported) => events[delivery.to].extend(reported),
                Err(err) => {
                    absorb(err, policy, telemetry, verbose, &mut failures)?;
                    skipped[delivery.to] = true;
                }
            }
        }

        // Phase 4: commit
        let mut transitions = Vec::new();
        if let Some(machine) = &self.machine {
            for (i, agent) in agents.iter_mut().enumerate() {
                if skipped[i] {
                    continue;
                }
                if let Some(transition) = agent.commit_state(&events[i], machine) {
                    if verbose {
                        eprintln!("[STATE] {}: {} -> {}", agent.id(), transition.from, transition.to);
                    }
                    telemetry.record(TelemetryEvent::StateTransition {
                        agent: agent.id().to_string(),
                        from: transition.from.to_string(),
                        to: transition.to.to_string(),
                        timestamp: Instant::now(),
                    });
                    transitions.push((i, transition));
                }
            }
        }
        for agent in agents.iter_mut() {
            agent.end_round();
        }

        Ok(RoundReport {
            round,
            sent,
            deliveries,
            events,
            transitions,
            failures,
        })
    }
}

/// Apply the failure policy to a handler error
fn absorb(
    err: AgentError,
    policy: FailurePolicy,
    telemetry: &TelemetryCollector,
    verbose: bool,
    failures: &mut Vec<HandlerFailure>,
) -> Result<()> {
    let (agent, phase, cause) = match err {
        AgentError::HandlerFailure { agent, phase, cause } => (agent, phase, cause),
        other => return Err(other),
    };

    if policy == FailurePolicy::Propagate {
        return Err(AgentError::HandlerFailure { agent, phase, cause });
    }

    if verbose {
        eprintln!("[FAIL] {} during {}: {}", agent, phase, cause);
    }
    telemetry.record(TelemetryEvent::HandlerFailed {
        agent: agent.clone(),
        phase: phase.to_string(),
        cause: cause.clone(),
        timestamp: Instant::now(),
    });
    failures.push(HandlerFailure { agent, phase, cause });
    Ok(())
}
