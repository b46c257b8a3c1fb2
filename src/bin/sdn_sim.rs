/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Runs a control plane of controllers and switches in the deterministic simulation, optionally cutting
//! the highest controller off from its peers to provoke split-brain.

use std::{error::Error, io, time::Duration};

use clap::Parser;
use log::LevelFilter;

use sdn_control_plane::{
    config::*,
    simulation::{ControlPlaneLayout, EndReason, Simulation, SimulationConfiguration},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of controllers.
    #[arg(short, long, default_value_t = 4)]
    controllers: u32,
    /// Number of switches.
    #[arg(short, long, default_value_t = 8)]
    switches: u32,
    /// Last epoch in which controllers ping their peers.
    #[arg(short, long, default_value_t = DEFAULT_MAX_EPOCH)]
    max_epoch: u32,
    /// Consecutive suspicious windows before a switch reports a violation.
    #[arg(long, default_value_t = DEFAULT_MAX_VIOLATION_COUNT)]
    max_violation_count: u8,
    /// Link delay in milliseconds.
    #[arg(long, default_value_t = 2)]
    link_delay_ms: u64,
    /// Upper bound of the random delay added to every datagram, in microseconds.
    #[arg(long, default_value_t = 0)]
    jitter_us: u64,
    /// Probability that a datagram is lost.
    #[arg(long, default_value_t = 0.0)]
    drop_probability: f64,
    /// Seed of the random number generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Cut the highest controller off from its peer controllers at this time, in milliseconds.
    #[arg(short, long)]
    isolate_at_ms: Option<u64>,
    /// End the run at the first violation.
    #[arg(short, long)]
    abort_on_violation: bool,
    /// Log every protocol event as a CSV line.
    #[arg(short = 'e', long)]
    log_events: bool,
    /// Maximum level of log messages printed: off, error, warn, info, debug or trace.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let log_level: LevelFilter = args
        .log_level
        .parse()
        .map_err(|_| format!("invalid log level: {}", args.log_level))?;
    setup_logger(log_level)?;

    let config = SimulationConfiguration::builder()
        .link_delay(Duration::from_millis(args.link_delay_ms))
        .max_jitter(Duration::from_micros(args.jitter_us))
        .drop_probability(args.drop_probability)
        .seed(args.seed)
        .abort_on_violation(args.abort_on_violation)
        .log_events(args.log_events)
        .build();
    let layout = ControlPlaneLayout::builder()
        .controllers(args.controllers)
        .switches(args.switches)
        .max_epoch(args.max_epoch)
        .max_violation_count(args.max_violation_count)
        .build();

    let mut simulation = Simulation::new(config)?;
    let installed = simulation.install(&layout)?;

    if let Some(isolate_at_ms) = args.isolate_at_ms {
        let controllers = installed.controller_addresses();
        if let Some((highest, rest)) = controllers.split_last() {
            log::info!(
                "isolating controller at {} at {} ms",
                highest,
                isolate_at_ms
            );
            simulation.partition_at(Duration::from_millis(isolate_at_ms), &[*highest], rest);
        }
    }

    log::info!("-- Simulation starting --");
    let outcome = simulation.run();
    log::info!("-- Simulation complete --");

    println!(
        "ended at {:.6} s: {}",
        outcome.end_time.as_secs_f64(),
        match &outcome.end_reason {
            EndReason::Stopped => "max epoch reached".to_string(),
            EndReason::Idle => "no events left".to_string(),
            EndReason::TimeLimit => "time limit reached".to_string(),
            EndReason::ControlPlaneViolation(report) =>
                format!("control plane violation at switch {}", report.switch),
        }
    );
    for report in &outcome.violations {
        println!(
            "violation at {} s: switch {} saw controllers {:?} for {} windows",
            report.time, report.switch, report.controllers, report.violation_count
        );
    }
    println!("### DATA ### switches +++ {}", outcome.switches_in_violation);

    Ok(())
}

fn setup_logger(level: LevelFilter) -> Result<(), String> {
    fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(level)
        .chain(io::stderr())
        .apply()
        .map_err(|err| format!("failed to set up logger: {}", err))
}
