use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ecoresolution::agent::ChannelSnapshot;
use ecoresolution::kernel::InMemoryKernel;
use ecoresolution::lifecycle::EcoState;
use ecoresolution::problems::{CubeWorld, OnTopOf};
use ecoresolution::{Config, EcoIdentity};

#[derive(Parser)]
#[command(name = "ecoresolution")]
#[command(about = "Eco-resolution problem solving with negotiating agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the inverted-tower cube world
    Cube {
        #[arg(long, default_value_t = 3, help = "Number of cubes")]
        cubes: usize,

        #[arg(long, help = "TOML configuration file")]
        config: Option<PathBuf>,

        #[arg(long, help = "Override the kernel iteration limit")]
        max_iterations: Option<u64>,

        #[arg(long, help = "Print final snapshots as JSON")]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Cube {
            cubes,
            config,
            max_iterations,
            json,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => Config::from_env()?,
            };
            if let Some(max_iterations) = max_iterations {
                config.kernel.max_iterations = max_iterations;
            }
            config.validate()?;
            init_logging(&config);
            run_cube(cubes, &config, json).await?
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run_cube(cubes: usize, config: &Config, json: bool) -> Result<()> {
    let world = CubeWorld::inverted_tower(cubes)?;
    let table = world.table();
    let mut problem = world.into_problem();

    let mut kernel: InMemoryKernel<OnTopOf> = InMemoryKernel::new(config.kernel.clone());
    problem.solve(&mut kernel);
    let summary = kernel.run_coordination_loop().await?;

    let mut snapshots: Vec<ChannelSnapshot<OnTopOf>> =
        kernel.channels().filter_map(|channel| channel.snapshot()).collect();
    snapshots.sort_by(|a, b| a.label.cmp(&b.label));

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
        return Ok(());
    }

    let solved = snapshots.iter().all(|snapshot| {
        snapshot
            .goal
            .as_ref()
            .map(|goal| snapshot.acquaintances.contains(goal))
            .unwrap_or(true)
    });
    println!(
        "Run ended after {} iterations ({:?}), solved: {}",
        summary.iterations, summary.outcome, solved
    );

    let label_of = |id| {
        snapshots
            .iter()
            .find(|snapshot| EcoIdentity::Agent(snapshot.owner) == id)
            .map(|snapshot| snapshot.label.clone())
            .unwrap_or_else(|| id.to_string())
    };
    for snapshot in &snapshots {
        if snapshot.owner == table {
            continue;
        }
        let resting_on = snapshot
            .acquaintances
            .iter()
            .find(|relation| relation.master == EcoIdentity::Agent(snapshot.owner))
            .map(|relation| label_of(relation.slave))
            .unwrap_or_else(|| "nothing".to_string());
        let marker = if snapshot.state == EcoState::Satisfacted { "ok" } else { ".." };
        println!(
            "  [{}] {} on {} ({})",
            marker, snapshot.label, resting_on, snapshot.state
        );
    }

    Ok(())
}
