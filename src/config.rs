//! Configuration: a plain `key=value` file layered with `clap` CLI
//! overrides, following the precedence of the original agent's
//! `processOptions`/`parseCmdOptions` (`examples/original_source/src/main.cpp`)
//! — file values first, then explicit CLI flags on top, and an
//! environment's own defaults (`env::defaults`) pre-populating the agent
//! knobs it cares about before either layer is applied.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use clap::Parser;

use crate::env;
use crate::error::ConfigError;

#[derive(Debug, Parser)]
#[command(name = "agent", about = "A context-tree-weighting reinforcement-learning agent")]
pub struct Cli {
    /// Path to a `key=value` configuration file.
    pub config_file: PathBuf,

    #[arg(long = "environment")]
    pub environment: Option<String>,
    #[arg(long = "agent-actions")]
    pub agent_actions: Option<u32>,
    #[arg(long = "observation-bits")]
    pub observation_bits: Option<usize>,
    #[arg(long = "reward-bits")]
    pub reward_bits: Option<usize>,
    #[arg(long = "ct-depth")]
    pub ct_depth: Option<usize>,
    #[arg(long = "agent-horizon")]
    pub agent_horizon: Option<usize>,
    #[arg(long = "mc-simulations")]
    pub mc_simulations: Option<usize>,
    #[arg(long = "exploration")]
    pub exploration: Option<f64>,
    #[arg(long = "explore-decay")]
    pub explore_decay: Option<f64>,
    #[arg(long = "terminate-age")]
    pub terminate_age: Option<u64>,
    #[arg(long = "seed")]
    pub seed: Option<u64>,
    #[arg(long = "load-ct")]
    pub load_ct: Option<String>,
    #[arg(long = "write-ct")]
    pub write_ct: Option<String>,
    #[arg(long = "intermediate-ct")]
    pub intermediate_ct: Option<bool>,
    #[arg(long = "verbose-log")]
    pub verbose_log: Option<String>,
    #[arg(long = "compact-log")]
    pub compact_log: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub num_actions: u32,
    pub observation_bits: usize,
    pub reward_bits: usize,
    pub ct_depth: usize,
    pub horizon: usize,
    pub simulations: usize,
    pub exploration_rate: f64,
    pub explore_decay: f64,
    pub terminate_age: u64,
    pub seed: Option<u64>,
    pub load_ct: Option<String>,
    pub write_ct: Option<String>,
    pub intermediate_ct: bool,
    pub verbose_log: Option<String>,
    pub compact_log: Option<String>,
}

/// Parse a `key=value` configuration file, stripping `#` comments and
/// surrounding whitespace, and warning (but not failing) on malformed
/// lines — matching `processOptions`'s tolerance in the original source.
fn parse_file(path: &PathBuf) -> Result<HashMap<String, String>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut options = HashMap::new();
    for raw_line in text.lines() {
        let line = match raw_line.split('#').next() {
            Some(s) => s.trim(),
            None => continue,
        };
        if line.is_empty() {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => {
                let (key, value) = (key.trim(), value.trim());
                if key.is_empty() || value.is_empty() {
                    log::warn!("ignoring malformed config line: '{raw_line}'");
                    continue;
                }
                options.insert(key.to_string(), value.to_string());
            }
            None => log::warn!("ignoring config line with no '=': '{raw_line}'"),
        }
    }
    Ok(options)
}

impl Config {
    pub fn load(cli: Cli) -> Result<Config, ConfigError> {
        let file_options = parse_file(&cli.config_file)?;

        let environment = cli
            .environment
            .clone()
            .or_else(|| file_options.get("environment").cloned())
            .ok_or_else(|| ConfigError::MissingOption("environment".to_string()))?;
        let env_defaults = env::defaults(&environment)?;

        let get_u64 = |key: &str| -> Result<Option<u64>, ConfigError> {
            file_options
                .get(key)
                .map(|v| {
                    v.parse().map_err(|_| ConfigError::MalformedValue {
                        key: key.to_string(),
                        value: v.clone(),
                    })
                })
                .transpose()
        };
        let get_usize = |key: &str| -> Result<Option<usize>, ConfigError> {
            file_options
                .get(key)
                .map(|v| {
                    v.parse().map_err(|_| ConfigError::MalformedValue {
                        key: key.to_string(),
                        value: v.clone(),
                    })
                })
                .transpose()
        };
        let get_f64 = |key: &str| -> Result<Option<f64>, ConfigError> {
            file_options
                .get(key)
                .map(|v| {
                    v.parse().map_err(|_| ConfigError::MalformedValue {
                        key: key.to_string(),
                        value: v.clone(),
                    })
                })
                .transpose()
        };
        let get_bool = |key: &str| -> Result<Option<bool>, ConfigError> {
            file_options
                .get(key)
                .map(|v| {
                    v.parse().map_err(|_| ConfigError::MalformedValue {
                        key: key.to_string(),
                        value: v.clone(),
                    })
                })
                .transpose()
        };
        let get_string = |key: &str| -> Option<String> { file_options.get(key).cloned() };

        Ok(Config {
            num_actions: cli
                .agent_actions
                .or(get_u64("agent-actions")?.map(|v| v as u32))
                .unwrap_or(env_defaults.num_actions),
            observation_bits: cli
                .observation_bits
                .or(get_usize("observation-bits")?)
                .unwrap_or(env_defaults.observation_bits),
            reward_bits: cli
                .reward_bits
                .or(get_usize("reward-bits")?)
                .unwrap_or(env_defaults.reward_bits),
            ct_depth: cli.ct_depth.or(get_usize("ct-depth")?).unwrap_or(16),
            horizon: cli.agent_horizon.or(get_usize("agent-horizon")?).unwrap_or(3),
            simulations: cli
                .mc_simulations
                .or(get_usize("mc-simulations")?)
                .unwrap_or(500),
            exploration_rate: cli.exploration.or(get_f64("exploration")?).unwrap_or(0.0),
            explore_decay: cli.explore_decay.or(get_f64("explore-decay")?).unwrap_or(1.0),
            terminate_age: cli.terminate_age.or(get_u64("terminate-age")?).unwrap_or(10_000),
            seed: cli.seed.or(get_u64("seed")?),
            load_ct: cli.load_ct.or_else(|| get_string("load-ct")),
            write_ct: cli.write_ct.or_else(|| get_string("write-ct")),
            intermediate_ct: cli
                .intermediate_ct
                .or(get_bool("intermediate-ct")?)
                .unwrap_or(true),
            verbose_log: cli.verbose_log.or_else(|| get_string("verbose-log")),
            compact_log: cli.compact_log.or_else(|| get_string("compact-log")),
            environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_config(contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("ctw-agent-test-{}.cfg", bits_test_suffix()));
        let mut file = fs::File::create(&path).expect("create temp config");
        file.write_all(contents.as_bytes()).expect("write temp config");
        path
    }

    // Date/time and RNG helpers are unavailable in this module; a
    // process-unique-enough suffix is all a throwaway test file needs.
    fn bits_test_suffix() -> u32 {
        std::process::id()
    }

    #[test]
    fn file_values_are_overridden_by_cli_flags() {
        let path = write_temp_config(
            "environment = coin-flip\n# a comment\nct-depth=8\nagent-horizon = 4\n",
        );
        let cli = Cli {
            config_file: path.clone(),
            environment: None,
            agent_actions: None,
            observation_bits: None,
            reward_bits: None,
            ct_depth: Some(12),
            agent_horizon: None,
            mc_simulations: None,
            exploration: None,
            explore_decay: None,
            terminate_age: None,
            seed: Some(42),
            load_ct: None,
            write_ct: None,
            intermediate_ct: None,
            verbose_log: None,
            compact_log: None,
        };
        let config = Config::load(cli).expect("config loads");
        assert_eq!(config.environment, "coin-flip");
        assert_eq!(config.ct_depth, 12); // CLI overrides file
        assert_eq!(config.horizon, 4); // file value, no CLI override
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.num_actions, 2); // environment default, unset anywhere else
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_environment_is_an_error() {
        let path = write_temp_config("ct-depth=8\n");
        let cli = Cli {
            config_file: path.clone(),
            environment: None,
            agent_actions: None,
            observation_bits: None,
            reward_bits: None,
            ct_depth: None,
            agent_horizon: None,
            mc_simulations: None,
            exploration: None,
            explore_decay: None,
            terminate_age: None,
            seed: None,
            load_ct: None,
            write_ct: None,
            intermediate_ct: None,
            verbose_log: None,
            compact_log: None,
        };
        let err = Config::load(cli).unwrap_err();
        assert!(matches!(err, ConfigError::MissingOption(key) if key == "environment"));
        let _ = fs::remove_file(path);
    }
}
