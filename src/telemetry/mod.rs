//! Telemetry system for minisdk
//!
//! Collects round-protocol events and renders a terminal summary. Telemetry
//! is a side channel: nothing in the protocol reads it back.

use crate::cli::Verbosity;
use colored::Colorize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    RoundStarted {
        round: usize,
        timestamp: Instant,
    },
    MessageSent {
        agent: String,
        purpose: String,
        timestamp: Instant,
    },
    MessageDelivered {
        from: String,
        to: String,
        timestamp: Instant,
    },
    StateTransition {
        agent: String,
        from: String,
        to: String,
        timestamp: Instant,
    },
    HandlerFailed {
        agent: String,
        phase: String,
        cause: String,
        timestamp: Instant,
    },
    RunFinished {
        rounds: usize,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub rounds: usize,
    pub messages_sent: usize,
    pub deliveries: usize,
    pub state_transitions: usize,
    pub state_changes: usize,
    pub handler_failures: usize,
}

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::RoundStarted { .. } => stats.rounds += 1,
                TelemetryEvent::MessageSent { .. } => stats.messages_sent += 1,
                TelemetryEvent::MessageDelivered { .. } => stats.deliveries += 1,
                TelemetryEvent::StateTransition { from, to, .. } => {
                    stats.state_transitions += 1;
                    if from != to {
                        stats.state_changes += 1;
                    }
                }
                TelemetryEvent::HandlerFailed { .. } => stats.handler_failures += 1,
                TelemetryEvent::RunFinished { .. } => {}
            }
        }

        lock(&self.events).push(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Average deliveries per message sent
    pub fn fan_out(&self) -> f64 {
        let stats = lock(&self.stats);
        if stats.messages_sent == 0 {
            0.0
        } else {
            stats.deliveries as f64 / stats.messages_sent as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: Verbosity,
}

impl TelemetryDisplay {
    pub fn new(collector: TelemetryCollector, verbosity: Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Display summary statistics
    pub fn display_summary(&self) {
        if !self.verbosity.show_progress() {
            return;
        }

        let stats = self.collector.get_stats();
        let elapsed = self.collector.elapsed();

        println!("\n{}", "📊 Run Summary".bold());
        println!("─────────────────────────────────────");
        println!("Duration:          {:?}", elapsed);
        println!("Rounds:            {}", stats.rounds);
        println!("Messages sent:     {}", stats.messages_sent);
        println!("Deliveries:        {} ({:.1} per message)", stats.deliveries, self.collector.fan_out());
        println!("State changes:     {} of {} commits", stats.state_changes, stats.state_transitions);
        if stats.handler_failures > 0 {
            println!(
                "Handler failures:  {}",
                stats.handler_failures.to_string().red()
            );
        } else {
            println!("Handler failures:  0");
        }
        println!();
    }

    /// Print the per-event trace
    pub fn display_events(&self) {
        if !self.verbosity.show_events() {
            return;
        }

        for event in self.collector.recent_events(self.collector.event_count()) {
            match event {
                TelemetryEvent::RoundStarted { round, .. } => {
                    println!("{}", format!("-> Round {}", round).cyan());
                }
                TelemetryEvent::MessageSent { agent, purpose, .. } => {
                    println!("   {} sent {}", agent, purpose);
                }
                TelemetryEvent::MessageDelivered { from, to, .. } if self.verbosity.show_deliveries() => {
                    println!("   {} -> {}", from, to);
                }
                TelemetryEvent::MessageDelivered { .. } => {}
                TelemetryEvent::StateTransition { agent, from, to, .. } => {
                    println!("   {} state {} -> {}", agent, from, to.green());
                }
                TelemetryEvent::HandlerFailed { agent, phase, cause, .. } => {
                    println!("   {} {} failed: {}", agent, phase, cause.red());
                }
                TelemetryEvent::RunFinished { rounds, .. } => {
                    println!("{}", format!("Finished after {} rounds", rounds).cyan());
                }
            }
        }
    }
}
