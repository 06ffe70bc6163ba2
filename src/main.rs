use anyhow::Result;
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use graph_traffic::simulation::{presets, SimConfig, SimWorld};

#[derive(Parser)]
#[command(name = "graph_traffic")]
#[command(about = "Cellular-automaton traffic simulation on a road graph")]
struct Cli {
    /// Road network preset: "line" or "grid"
    #[arg(long, default_value = "line")]
    preset: String,

    /// Number of intersections for the line preset
    #[arg(long, default_value = "4")]
    intersections: usize,

    /// Add the opposite direction to the line preset
    #[arg(long)]
    two_way: bool,

    /// Grid preset columns
    #[arg(long, default_value = "4")]
    cols: usize,

    /// Grid preset rows
    #[arg(long, default_value = "2")]
    rows: usize,

    /// Segment length in cells
    #[arg(long, default_value = "100")]
    segment_len: usize,

    /// Initial car density per cell
    #[arg(long, default_value = "0.125")]
    density: f64,

    /// Use turn-capable intersections
    #[arg(long)]
    turns: bool,

    /// Number of episodes to run
    #[arg(long, default_value = "1")]
    episodes: u32,

    /// Number of external steps per episode
    #[arg(long, default_value = "200")]
    steps: u32,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match cli.preset.as_str() {
        "grid" => presets::grid(cli.cols, cli.rows, cli.segment_len),
        _ => presets::line(cli.intersections, cli.two_way, cli.segment_len),
    };
    config.car_density = cli.density;
    config.turn_capable = cli.turns;
    config.max_steps_per_episode = cli.steps;

    run_episodes(config, cli.episodes, cli.seed)
}

/// Drive the world with uniformly random light actions and report the
/// per-episode throughput.
fn run_episodes(config: SimConfig, episodes: u32, seed: Option<u64>) -> Result<()> {
    let num_intersections = config.num_intersections;
    let num_actions = config.red_durations_raw.len();

    let seed = seed.unwrap_or_else(|| rand::rng().random());
    let mut world = SimWorld::new_with_seed(config, seed)?;
    let mut action_rng = StdRng::seed_from_u64(seed ^ 0x9e3779b97f4a7c15);

    println!("Running {episodes} episode(s), seed {seed}");
    for episode in 0..episodes {
        world.reset(None);
        let mut total_reward = 0.0;
        let mut steps = 0u32;
        loop {
            let action: Vec<usize> = (0..num_intersections)
                .map(|_| action_rng.random_range(0..num_actions))
                .collect();
            let outcome = world.step(&action)?;
            total_reward += outcome.reward;
            steps += 1;
            if outcome.done {
                break;
            }
        }
        info!(
            "episode {episode}: {steps} steps, total reward {total_reward:.0}, \
             mean reward per step {:.1}",
            total_reward / f64::from(steps.max(1))
        );
        println!("Episode {episode}: total reward {total_reward:.0} over {steps} steps");
    }
    Ok(())
}
