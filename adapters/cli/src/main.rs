#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs headless Scrapline matches.

mod engine;

use anyhow::ensure;
use clap::Parser;

use crate::engine::{MatchConfig, MatchReport};

/// Options controlling a headless survival match.
#[derive(Debug, Parser)]
#[command(name = "scrapline", about = "Headless survival-agent match runner")]
struct Args {
    /// Seed shared by the world and every agent controller.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Grid width in cells.
    #[arg(long, default_value_t = 24)]
    width: u32,

    /// Grid height in cells.
    #[arg(long, default_value_t = 24)]
    height: u32,

    /// Number of competing agents (2 to 4).
    #[arg(long, default_value_t = 2)]
    agents: u32,

    /// Hard tick limit in case nobody wins.
    #[arg(long, default_value_t = 2000)]
    max_ticks: u64,

    /// Ticks simulated per wall-clock second; 0 runs uncapped.
    #[arg(long, default_value_t = 0)]
    tick_hz: u32,

    /// Log every packet that would cross the network boundary.
    #[arg(long)]
    trace_wire: bool,
}

/// Entry point for the Scrapline command-line interface.
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    ensure!(
        (2..=4).contains(&args.agents),
        "a match needs between 2 and 4 agents, got {}",
        args.agents
    );
    ensure!(
        args.width >= 8 && args.height >= 8,
        "the grid must be at least 8x8 cells, got {}x{}",
        args.width,
        args.height
    );

    let config = MatchConfig {
        seed: args.seed,
        width: args.width,
        height: args.height,
        agents: args.agents,
        max_ticks: args.max_ticks,
        tick_hz: args.tick_hz,
        trace_wire: args.trace_wire,
    };
    print_report(&engine::run_match(&config));
    Ok(())
}

fn print_report(report: &MatchReport) {
    println!("match finished after {} ticks", report.ticks);
    match report.winner {
        Some(winner) => println!("winner: agent {}", winner.get()),
        None => println!("no winner"),
    }
    for agent in &report.agents {
        println!(
            "agent {}: survived {} ticks, final health {:.1}",
            agent.id.get(),
            agent.survived_ticks,
            agent.final_health
        );
        for (state, count) in &agent.behavior_counts {
            println!("  {state}: {count} ticks");
        }
    }
}
