//! The environment interface and the toy environments that implement it.
//!
//! Grounded in `examples/original_source/src/environment.hpp` /
//! `environment.cpp`: a small trait standing in for the original's abstract
//! `Environment` base class, plus one module per concrete environment it
//! declares (`CoinFlip`, `Tiger`, `BiasedRockPaperScissor`, `KuhnPoker`, and
//! a bounded `Pacman`).

pub mod coin_flip;
pub mod kuhn_poker;
pub mod pacman;
pub mod rps;
pub mod tiger;

use crate::error::ConfigError;

/// An environment the agent interacts with one action/percept cycle at a
/// time. Implementations own whatever hidden state they need (a coin's
/// bias, a tiger's side, a hand of cards); `observation`/`reward` report
/// the percept produced by the most recent `perform_action` (or the
/// environment's initial state, before any action has been taken).
pub trait Environment {
    fn observation(&self) -> u64;
    fn reward(&self) -> u64;
    fn perform_action(&mut self, action: u32);

    /// Most toy environments run forever; Pacman can report a finished
    /// episode so the driver can stop early.
    fn is_finished(&self) -> bool {
        false
    }
}

/// The agent knobs an environment wants to pin, so the configuration layer
/// can pre-populate them before explicit CLI/file overrides are applied.
#[derive(Debug, Clone, Copy)]
pub struct EnvDefaults {
    pub num_actions: u32,
    pub observation_bits: usize,
    pub reward_bits: usize,
}

/// The agent-knob defaults an environment wants to pin, without
/// constructing it (and so without touching the RNG) — used by the
/// configuration layer before it has necessarily seeded the RNG.
pub fn defaults(name: &str) -> Result<EnvDefaults, ConfigError> {
    match name {
        "coin-flip" => Ok(EnvDefaults {
            num_actions: 2,
            observation_bits: 1,
            reward_bits: 1,
        }),
        "tiger" => Ok(EnvDefaults {
            num_actions: tiger::NUM_ACTIONS,
            observation_bits: 2,
            reward_bits: 7,
        }),
        "biased-rock-paper-scissor" => Ok(EnvDefaults {
            num_actions: 3,
            observation_bits: 2,
            reward_bits: 2,
        }),
        "kuhn-poker" => Ok(EnvDefaults {
            num_actions: 2,
            observation_bits: 4,
            reward_bits: 3,
        }),
        "pacman" => Ok(EnvDefaults {
            num_actions: 4,
            observation_bits: 12,
            reward_bits: 8,
        }),
        other => Err(ConfigError::UnknownEnvironment(other.to_string())),
    }
}

/// Construct the named environment. Call only after the RNG has been
/// seeded, since every environment draws its initial hidden state from it.
pub fn construct(name: &str) -> Result<Box<dyn Environment>, ConfigError> {
    defaults(name)?;
    Ok(match name {
        "coin-flip" => Box::new(coin_flip::CoinFlip::new(1.0)),
        "tiger" => Box::new(tiger::Tiger::new()),
        "biased-rock-paper-scissor" => Box::new(rps::BiasedRockPaperScissor::new()),
        "kuhn-poker" => Box::new(kuhn_poker::KuhnPoker::new(1.0)),
        "pacman" => Box::new(pacman::Pacman::new()),
        _ => unreachable!("defaults() already validated the name"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_rejects_unknown_environment() {
        let err = defaults("roulette").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironment(name) if name == "roulette"));
    }

    #[test]
    fn every_known_environment_constructs() {
        for name in [
            "coin-flip",
            "tiger",
            "biased-rock-paper-scissor",
            "kuhn-poker",
            "pacman",
        ] {
            assert!(defaults(name).is_ok(), "{name} has no defaults");
            assert!(construct(name).is_ok(), "{name} failed to construct");
        }
    }
}
