use clap::{Parser, Subcommand};
use log::{error, info};
use ringfinger::{
    chord::DEFAULT_RING_SIZE, RingError, RingPlan, RingSimulation, SimulationConfig,
};
use std::process::ExitCode;

/// Exit status for a bad process count or ring size, before anything runs.
const EXIT_CONFIG: u8 = 2;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "ringfinger")]
#[command(about = "Leader election and finger table construction on a simulated Chord ring")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the election and finger table construction once
    #[command(name = "simulate")]
    Simulate {
        /// Number of peers in the ring (also the finger table length)
        #[arg(short = 'm', long = "ring-size", default_value_t = DEFAULT_RING_SIZE)]
        ring_size: usize,
        /// Total number of processes: the peers plus the coordinator
        #[arg(short = 'n', long = "processes")]
        processes: Option<usize>,
        /// Seed for the ring layout (random if not specified)
        #[arg(short = 's', long = "seed")]
        seed: Option<u64>,
        /// Print the full report as JSON instead of the finger table dump
        #[arg(long = "json")]
        json: bool,
    },
    /// Show the layout the coordinator would use and the expected finger tables
    #[command(name = "plan")]
    Plan {
        #[arg(short = 'm', long = "ring-size", default_value_t = DEFAULT_RING_SIZE)]
        ring_size: usize,
        #[arg(short = 's', long = "seed")]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            ring_size,
            processes,
            seed,
            json,
        } => {
            let config = SimulationConfig {
                processes: processes.unwrap_or(ring_size + 1),
                seed,
                ..SimulationConfig::new(ring_size)
            };
            simulate(config, json).await
        }
        Commands::Plan { ring_size, seed } => plan(ring_size, seed),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(RingError::Config(e)) => {
            error!("{}", e);
            ExitCode::from(EXIT_CONFIG)
        }
        Err(e) => {
            error!("Simulation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn simulate(config: SimulationConfig, json: bool) -> Result<(), RingError> {
    info!(
        "Starting simulation with {} peers and {} processes",
        config.ring_size, config.processes
    );
    let report = RingSimulation::run(&config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

fn plan(ring_size: usize, seed: Option<u64>) -> Result<(), RingError> {
    SimulationConfig::new(ring_size).validate()?;
    let plan = RingPlan::seeded(ring_size, seed);

    println!("initiator: P{}", plan.initiator().process);
    if let Some(leader) = plan.expected_leader() {
        println!("expected leader: P{} (id {})", leader.process, leader.logical);
    }
    for (index, row) in plan.expected_fingers().into_iter().enumerate() {
        let peer = plan.peers()[index];
        let fingers = row
            .iter()
            .map(|finger| finger.logical.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "P{}> id {}, next {}, finger table: {}",
            peer.process,
            peer.logical,
            plan.successor(index),
            fingers
        );
    }
    Ok(())
}
