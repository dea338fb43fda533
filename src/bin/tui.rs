use clap::Parser;
use ctw_agent::agent::Agent;
use ctw_agent::bits;
use ctw_agent::config::{Cli, Config};
use ctw_agent::driver::Driver;
use ctw_agent::env;
use ctw_agent::planner::Planner;
use ctw_agent::tui::Tui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let config = Config::load(cli)?;

    if let Some(seed) = config.seed {
        bits::reseed(seed);
    }

    let environment = env::construct(&config.environment)?;
    let agent = Agent::new(
        config.num_actions,
        config.observation_bits,
        config.reward_bits,
        config.ct_depth,
        config.horizon,
    );
    let planner = Planner::new(config.simulations);
    let terminate_age = config.terminate_age;
    let mut driver = Driver::new(agent, environment, planner, config)?;

    let mut tui = Tui::new()?;
    tui.run(&mut driver, terminate_age)?;
    Ok(())
}
