//! The interaction loop: percept, decide (explore or plan), act, log,
//! checkpoint. Grounded in `examples/original_source/src/main.cpp`'s
//! `mainLoop`.

use std::fs::File;
use std::io::{self, Write};

use crate::agent::Agent;
use crate::bits;
use crate::config::Config;
use crate::env::Environment;
use crate::planner::Planner;

/// A single cycle's outcome, handed to the compact CSV log and the
/// terminal UI alike.
#[derive(Debug, Clone, Copy)]
pub struct CycleReport {
    pub cycle: u64,
    pub action: u32,
    pub observation: u64,
    pub reward: u64,
    pub average_reward: f64,
    pub explored: bool,
}

pub struct Driver {
    agent: Agent,
    environment: Box<dyn Environment>,
    planner: Planner,
    config: Config,
    explore_rate: f64,
    verbose_log: Option<File>,
    compact_log: Option<File>,
}

impl Driver {
    pub fn new(agent: Agent, environment: Box<dyn Environment>, planner: Planner, config: Config) -> io::Result<Self> {
        let verbose_log = config
            .verbose_log
            .as_ref()
            .map(File::create)
            .transpose()?;
        let mut compact_log = config
            .compact_log
            .as_ref()
            .map(File::create)
            .transpose()?;
        if let Some(log) = compact_log.as_mut() {
            writeln!(log, "cycle,action,observation,reward,average_reward,explored")?;
        }
        let explore_rate = config.exploration_rate;
        Ok(Driver {
            agent,
            environment,
            planner,
            config,
            explore_rate,
            verbose_log,
            compact_log,
        })
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Run until `terminate_age` cycles have elapsed or the environment
    /// reports itself finished. `is_finished` is checked before each cycle,
    /// so the cycle whose action ended the episode is still logged and
    /// checkpointed; the next cycle (which a fresh driver run would start)
    /// is what's skipped.
    pub fn run(&mut self) -> io::Result<()> {
        while self.agent.age() < self.config.terminate_age && !self.environment.is_finished() {
            self.run_cycle()?;
        }
        self.final_checkpoint();
        Ok(())
    }

    pub fn run_cycle(&mut self) -> io::Result<CycleReport> {
        let observation = self.environment.observation();
        let reward = self.environment.reward();
        self.agent.model_update_percept(observation, reward);

        let explored = bits::rand01() < self.explore_rate;
        let action = if explored {
            self.agent.gen_random_action()
        } else {
            self.planner.plan(&mut self.agent)
        };

        self.environment.perform_action(action);
        self.agent.model_update_action(action);

        let report = CycleReport {
            cycle: self.agent.age(),
            action,
            observation,
            reward,
            average_reward: self.agent.average_reward(),
            explored,
        };
        self.log_cycle(&report)?;

        self.explore_rate *= self.config.explore_decay;

        if self.config.intermediate_ct {
            self.maybe_checkpoint();
        }

        Ok(report)
    }

    fn log_cycle(&mut self, report: &CycleReport) -> io::Result<()> {
        log::info!(
            "cycle {} action={} observation={} reward={} avg_reward={:.4}{}",
            report.cycle,
            report.action,
            report.observation,
            report.reward,
            report.average_reward,
            if report.explored { " (explored)" } else { "" }
        );
        if let Some(log) = self.verbose_log.as_mut() {
            writeln!(
                log,
                "cycle {} action={} observation={} reward={} avg_reward={:.4} explored={}",
                report.cycle, report.action, report.observation, report.reward, report.average_reward, report.explored
            )?;
        }
        if let Some(log) = self.compact_log.as_mut() {
            writeln!(
                log,
                "{},{},{},{},{},{}",
                report.cycle, report.action, report.observation, report.reward, report.average_reward, report.explored
            )?;
        }
        Ok(())
    }

    /// Power-of-two cycle checkpointing, matching the original's
    /// `cycle & (cycle - 1) == 0` cadence.
    fn maybe_checkpoint(&mut self) {
        let cycle = self.agent.age();
        if cycle != 0 && (cycle & (cycle - 1)) == 0 {
            self.write_ct();
        }
    }

    fn final_checkpoint(&mut self) {
        self.write_ct();
    }

    /// An unwritable `write-ct` path is non-fatal: the run continues without
    /// persistence rather than aborting.
    fn write_ct(&self) {
        if let Some(path) = &self.config.write_ct {
            if let Err(err) = std::fs::write(path, self.agent.ct().serialize()) {
                log::warn!("could not write context tree to {path}: {err}; continuing without persistence");
            }
        }
    }
}
