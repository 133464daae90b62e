//! minisdk - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use minisdk::{
    cli::{Args, Commands, Config, Verbosity},
    demo,
    telemetry::{TelemetryCollector, TelemetryDisplay},
};

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    let verbosity = if args.quiet || args.verbose > 0 {
        args.verbosity()
    } else {
        Verbosity::parse(&config.telemetry.default_verbosity).unwrap_or(Verbosity::Normal)
    };
    if !config.telemetry.color_output {
        colored::control::set_override(false);
    }

    match args.command() {
        Commands::Run => run_demo(&config, verbosity),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Graph => {
            show_graph(&config);
            Ok(())
        }
    }
}

/// Run the sorting demo and print what every agent ended up with
fn run_demo(config: &Config, verbosity: Verbosity) -> Result<()> {
    let telemetry = TelemetryCollector::new();
    let mut orchestrator = demo::build_orchestrator(config)?.with_telemetry(telemetry.clone());

    let report = orchestrator.run()?;
    let display = TelemetryDisplay::new(telemetry, verbosity);
    display.display_events();

    if verbosity.show_progress() {
        println!(
            "{} run {} ({} rounds)",
            "✓".green(),
            report.run_id,
            report.rounds_run()
        );
        for round in &report.rounds {
            println!("{}", format!("-> Round {}", round.round).bold());
            for (i, msg) in round.sent.iter().enumerate() {
                if let Some(msg) = msg {
                    println!("   {} sent {}", orchestrator.agents()[i].id(), msg);
                }
            }
            for (i, transition) in &round.transitions {
                println!(
                    "   {} is now {}",
                    orchestrator.agents()[*i].id(),
                    transition.to.to_string().green()
                );
            }
        }
    }

    for agent in orchestrator.agents() {
        let state = agent
            .current_state()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let last = agent
            .memory()
            .last()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "nothing".to_string());
        println!("{:<10} state={:<8} last={}", agent.id(), state, last);
    }

    display.display_summary();
    Ok(())
}

fn show_graph(config: &Config) {
    let machine = &config.state_machine;
    println!("{}", "State graph".bold());
    for state in machine.graph.states() {
        let marker = if *state == machine.initial_state { "*" } else { " " };
        println!("{} {}", marker, state);
        if let Some(events) = machine.graph.events_from(state) {
            for (event, to) in events {
                println!("    --{}--> {}", event, to);
            }
        }
    }

    let priority: Vec<&str> = machine.priority.as_slice().iter().map(|s| s.as_str()).collect();
    println!("{} {}", "Priority:".bold(), priority.join(" > "));
}
