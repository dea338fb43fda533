use clap::Parser;
use ctw_agent::agent::Agent;
use ctw_agent::bits;
use ctw_agent::config::{Cli, Config};
use ctw_agent::ctw::ContextTree;
use ctw_agent::driver::Driver;
use ctw_agent::env;
use ctw_agent::planner::Planner;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}

/// A bad `--load-ct` file is a non-fatal condition: the caller falls back to
/// a fresh tree rather than aborting the run.
fn load_context_tree(path: &str, ct_depth: usize) -> Result<ContextTree, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let ct = ContextTree::deserialize(&text, ct_depth)?;
    Ok(ct)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli)?;

    if let Some(seed) = config.seed {
        bits::reseed(seed);
    }

    let environment = env::construct(&config.environment)?;

    let mut agent = Agent::new(
        config.num_actions,
        config.observation_bits,
        config.reward_bits,
        config.ct_depth,
        config.horizon,
    );
    if let Some(path) = &config.load_ct {
        match load_context_tree(path, config.ct_depth) {
            Ok(ct) => {
                *agent.ct_mut() = ct;
                log::info!("loaded context tree from {path}");
            }
            Err(err) => {
                log::warn!("could not load context tree from {path}: {err}; starting from a fresh tree");
            }
        }
    }

    let planner = Planner::new(config.simulations);
    let mut driver = Driver::new(agent, environment, planner, config)?;
    driver.run()?;

    log::info!(
        "finished after {} cycles, average reward {:.4}",
        driver.agent().age(),
        driver.agent().average_reward()
    );
    Ok(())
}
