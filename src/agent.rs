//! The agent: a bit-width bookkeeping layer over a [`ContextTree`] plus the
//! percept/action state machine that keeps planning rollouts (which mutate
//! and then revert the tree) and the real interaction history in sync.
//!
//! Grounded in `examples/original_source/src/agent.cpp`'s `Agent` class: the
//! same action-bits/observation-bits/reward-bits bookkeeping, the same
//! alternating update-percept/update-action discipline, and the same
//! snapshot-based revert used by the planner between rollouts.

use crate::bits::{self, Bit};
use crate::ctw::ContextTree;

/// Which half of a percept/action cycle the agent is expecting next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// The agent must next be told an observation and reward.
    AwaitingPercept,
    /// The agent must next choose and commit an action.
    AwaitingAction,
}

fn bits_for_count(n: u32) -> usize {
    let mut bits = 0usize;
    let mut capacity = 1u64;
    while capacity < n as u64 {
        capacity *= 2;
        bits += 1;
    }
    bits
}

/// A snapshot of everything [`Agent::model_revert`] needs to roll back to:
/// the context-tree history length, the cycle count, the accumulated
/// reward, and which half of the cycle the agent was in. Taken before a
/// planning rollout and consumed once after it.
#[derive(Debug, Clone, Copy)]
pub struct ModelUndo {
    history_size: usize,
    age: u64,
    total_reward: f64,
    state: AgentState,
}

pub struct Agent {
    ct: ContextTree,
    num_actions: u32,
    action_bits: usize,
    obs_bits: usize,
    rew_bits: usize,
    horizon: usize,
    time_cycle: u64,
    total_reward: f64,
    state: AgentState,
}

impl Agent {
    pub fn new(num_actions: u32, obs_bits: usize, rew_bits: usize, ct_depth: usize, horizon: usize) -> Self {
        assert!(num_actions > 0, "an agent needs at least one action");
        Agent {
            ct: ContextTree::new(ct_depth),
            num_actions,
            action_bits: bits_for_count(num_actions),
            obs_bits,
            rew_bits,
            horizon,
            time_cycle: 0,
            total_reward: 0.0,
            state: AgentState::AwaitingPercept,
        }
    }

    pub fn num_actions(&self) -> u32 {
        self.num_actions
    }

    pub fn num_percepts(&self) -> u64 {
        1u64 << (self.obs_bits + self.rew_bits)
    }

    pub fn num_obs_bits(&self) -> usize {
        self.obs_bits
    }

    pub fn num_rew_bits(&self) -> usize {
        self.rew_bits
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn age(&self) -> u64 {
        self.time_cycle
    }

    pub fn history_size(&self) -> usize {
        self.ct.history_size()
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    pub fn average_reward(&self) -> f64 {
        if self.time_cycle == 0 {
            0.0
        } else {
            self.total_reward / self.time_cycle as f64
        }
    }

    pub fn max_reward(&self) -> f64 {
        ((1u64 << self.rew_bits) - 1) as f64
    }

    pub fn min_reward(&self) -> f64 {
        0.0
    }

    fn encode_percept(&self, observation: u64, reward: u64) -> Vec<Bit> {
        let mut v = bits::encode(observation, self.obs_bits);
        v.extend(bits::encode(reward, self.rew_bits));
        v
    }

    fn decode_percept(&self, bits: &[Bit]) -> (u64, u64) {
        let (obs_bits, rew_bits) = bits.split_at(self.obs_bits);
        (bits::decode(obs_bits), bits::decode(rew_bits))
    }

    /// Commit a real or hypothetical (observation, reward) pair to the
    /// model. This is the only way percept bits enter the tree, so it is
    /// shared by the real interaction loop and by planning rollouts.
    pub fn model_update_percept(&mut self, observation: u64, reward: u64) {
        assert_eq!(
            self.state,
            AgentState::AwaitingPercept,
            "model_update_percept called out of turn"
        );
        let encoded = self.encode_percept(observation, reward);
        self.ct.update(&encoded);
        self.total_reward += reward as f64;
        self.state = AgentState::AwaitingAction;
    }

    /// Commit an action. Action bits condition future predictions but are
    /// never themselves predicted, so this goes through
    /// [`ContextTree::update_history`], not `update`.
    pub fn model_update_action(&mut self, action: u32) {
        assert_eq!(
            self.state,
            AgentState::AwaitingAction,
            "model_update_action called out of turn"
        );
        assert!(action < self.num_actions, "action {action} out of range");
        let encoded = bits::encode(action as u64, self.action_bits);
        self.ct.update_history(&encoded);
        self.time_cycle += 1;
        self.state = AgentState::AwaitingPercept;
    }

    /// Uniform-random action, independent of the model. Used for untried
    /// actions in planning rollouts and as the driver's exploration
    /// fallback; does not itself call `model_update_action`.
    pub fn gen_random_action(&self) -> u32 {
        bits::rand_range(self.num_actions as usize) as u32
    }

    /// Sample an action from the model's predictive distribution without
    /// mutating it.
    pub fn gen_action_from_model(&mut self) -> u32 {
        assert_eq!(
            self.state,
            AgentState::AwaitingAction,
            "gen_action_from_model called out of turn"
        );
        let bits = self.ct.gen_random_symbols(self.action_bits);
        bits::decode(&bits) as u32
    }

    /// Sample a (observation, reward) pair from the model and commit it,
    /// returning the reward. Used by planning rollouts in place of a real
    /// environment.
    pub fn gen_percept_and_update(&mut self) -> (u64, u64) {
        assert_eq!(
            self.state,
            AgentState::AwaitingPercept,
            "gen_percept_and_update called out of turn"
        );
        let width = self.obs_bits + self.rew_bits;
        let bits = self.ct.gen_random_symbols_and_update(width);
        let (obs, rew) = self.decode_percept(&bits);
        self.total_reward += rew as f64;
        self.state = AgentState::AwaitingAction;
        (obs, rew)
    }

    /// Snapshot enough state to undo every `model_update_*`/
    /// `gen_percept_and_update` call made since.
    pub fn snapshot(&self) -> ModelUndo {
        ModelUndo {
            history_size: self.ct.history_size(),
            age: self.time_cycle,
            total_reward: self.total_reward,
            state: self.state,
        }
    }

    /// Undo every update made since `undo` was taken, restoring exactly the
    /// history, cycle count, accumulated reward, and turn state it recorded.
    /// Percept chunks (tree-mutating) and action chunks (history-only)
    /// alternate strictly, so which kind of chunk to undo next follows
    /// directly from the current turn state.
    pub fn model_revert(&mut self, undo: &ModelUndo) {
        assert!(
            self.ct.history_size() >= undo.history_size,
            "model_revert: snapshot is from the future"
        );
        while self.ct.history_size() > undo.history_size {
            match self.state {
                AgentState::AwaitingPercept => {
                    self.ct.revert_history(self.action_bits);
                    self.state = AgentState::AwaitingAction;
                }
                AgentState::AwaitingAction => {
                    self.ct.revert(self.obs_bits + self.rew_bits);
                    self.state = AgentState::AwaitingPercept;
                }
            }
        }
        self.time_cycle = undo.age;
        self.total_reward = undo.total_reward;
        self.state = undo.state;
    }

    pub fn ct(&self) -> &ContextTree {
        &self.ct
    }

    pub fn ct_mut(&mut self) -> &mut ContextTree {
        &mut self.ct
    }

    pub fn reset(&mut self) {
        self.ct.clear();
        self.time_cycle = 0;
        self.total_reward = 0.0;
        self.state = AgentState::AwaitingPercept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_bits_covers_action_count() {
        assert_eq!(bits_for_count(1), 0);
        assert_eq!(bits_for_count(2), 1);
        assert_eq!(bits_for_count(3), 2);
        assert_eq!(bits_for_count(4), 2);
        assert_eq!(bits_for_count(5), 3);
    }

    #[test]
    #[should_panic(expected = "out of turn")]
    fn action_before_percept_panics() {
        let mut agent = Agent::new(3, 1, 1, 4, 3);
        agent.model_update_action(0);
    }

    #[test]
    fn full_cycle_advances_age_and_reward() {
        let mut agent = Agent::new(2, 1, 1, 4, 3);
        agent.model_update_percept(1, 1);
        assert_eq!(agent.state(), AgentState::AwaitingAction);
        agent.model_update_action(0);
        assert_eq!(agent.state(), AgentState::AwaitingPercept);
        assert_eq!(agent.age(), 1);
        assert_eq!(agent.total_reward(), 1.0);
    }

    #[test]
    fn snapshot_and_revert_restores_everything() {
        bits::reseed(3);
        let mut agent = Agent::new(4, 2, 2, 6, 5);
        agent.model_update_percept(2, 1);
        agent.model_update_action(1);
        agent.model_update_percept(0, 3);

        let undo = agent.snapshot();
        let history_before = agent.ct().serialize();

        agent.model_update_action(2);
        agent.model_update_percept(1, 0);
        agent.model_update_action(0);
        let _ = agent.gen_percept_and_update();

        agent.model_revert(&undo);

        assert_eq!(agent.age(), undo.age);
        assert_eq!(agent.total_reward(), undo.total_reward);
        assert_eq!(agent.state(), undo.state);
        assert_eq!(agent.ct().serialize(), history_before);
    }

    #[test]
    fn gen_action_from_model_does_not_mutate_tree() {
        let mut agent = Agent::new(4, 1, 1, 4, 3);
        agent.model_update_percept(0, 0);
        let before = agent.ct().serialize();
        let action = agent.gen_action_from_model();
        assert!(action < agent.num_actions());
        assert_eq!(agent.ct().serialize(), before);
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut agent = Agent::new(2, 1, 1, 4, 3);
        agent.model_update_percept(1, 1);
        agent.model_update_action(0);
        agent.reset();
        assert_eq!(agent.age(), 0);
        assert_eq!(agent.total_reward(), 0.0);
        assert_eq!(agent.state(), AgentState::AwaitingPercept);
    }
}
