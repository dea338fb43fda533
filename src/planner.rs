//! rho-UCT: UCB1-style Monte Carlo tree search adapted to a world model that
//! is itself a probability distribution (the agent's context tree) rather
//! than a true simulator.
//!
//! Grounded in `examples/original_source/src/search.cpp`'s `SearchNode`,
//! `playout`, `selectAction`, `sample`, and `search`; running `mean`/`visits`
//! per child, incrementally updated after each rollout, rather than a
//! full return history per arm.

use std::collections::HashMap;

use crate::agent::Agent;
use crate::bits;

/// UCB1 exploration constant, per the original agent's `search.cpp`.
pub const UCB_EXPLORATION_CONSTANT: f64 = 1.0;

enum SearchNode {
    Decision {
        visits: u64,
        mean: f64,
        children: Vec<Option<Box<SearchNode>>>,
    },
    Chance {
        visits: u64,
        mean: f64,
        children: HashMap<u64, Box<SearchNode>>,
    },
}

impl SearchNode {
    fn new_decision(num_actions: u32) -> Self {
        SearchNode::Decision {
            visits: 0,
            mean: 0.0,
            children: (0..num_actions).map(|_| None).collect(),
        }
    }

    fn new_chance() -> Self {
        SearchNode::Chance {
            visits: 0,
            mean: 0.0,
            children: HashMap::new(),
        }
    }

    fn visits(&self) -> u64 {
        match self {
            SearchNode::Decision { visits, .. } | SearchNode::Chance { visits, .. } => *visits,
        }
    }

    fn mean(&self) -> f64 {
        match self {
            SearchNode::Decision { mean, .. } | SearchNode::Chance { mean, .. } => *mean,
        }
    }
}

/// Plans by Monte Carlo tree search directly against `agent`'s predictive
/// model: every simulated step samples from the context tree rather than
/// a real environment, and every rollout's updates are reverted before the
/// next one starts.
pub struct Planner {
    simulations: usize,
}

impl Planner {
    pub fn new(simulations: usize) -> Self {
        Planner { simulations }
    }

    /// Choose an action for the agent's current (awaiting-action) percept by
    /// running `simulations` rollouts of depth `agent.horizon()` and
    /// returning the root child with the highest mean return.
    pub fn plan(&self, agent: &mut Agent) -> u32 {
        let horizon = agent.horizon();
        let mut root = SearchNode::new_decision(agent.num_actions());
        for _ in 0..self.simulations {
            let undo = agent.snapshot();
            sample(agent, &mut root, horizon);
            agent.model_revert(&undo);
        }
        best_root_action(&root, agent.num_actions())
    }

    pub fn simulations(&self) -> usize {
        self.simulations
    }
}

/// The action with the highest root-child mean, ties broken by lowest index
/// (so a zero-simulation budget deterministically returns action 0).
fn best_root_action(root: &SearchNode, num_actions: u32) -> u32 {
    let children = match root {
        SearchNode::Decision { children, .. } => children,
        SearchNode::Chance { .. } => unreachable!("planner root is always a decision node"),
    };
    let mut best_action = 0u32;
    let mut best_mean = f64::NEG_INFINITY;
    for a in 0..num_actions {
        let mean = children[a as usize].as_ref().map_or(f64::NEG_INFINITY, |c| c.mean());
        if mean > best_mean {
            best_mean = mean;
            best_action = a;
        }
    }
    best_action
}

/// Recurse one ply of the search tree, sampling from `agent`'s model as
/// needed and returning the total reward accumulated over the next `dfr`
/// decision/percept pairs. `agent` is left with exactly `dfr` more
/// percept/action cycles' worth of model updates applied than when this
/// call started; the caller reverts them via a snapshot taken before the
/// whole simulation.
fn sample(agent: &mut Agent, node: &mut SearchNode, dfr: usize) -> f64 {
    if dfr == 0 {
        return 0.0;
    }
    match node {
        SearchNode::Decision { children, visits, mean } => {
            let reward = if *visits == 0 {
                playout(agent, dfr)
            } else {
                let action = select_action(agent, children, *visits, dfr);
                agent.model_update_action(action);
                let child = children[action as usize].get_or_insert_with(|| Box::new(SearchNode::new_chance()));
                sample(agent, child, dfr)
            };
            *mean = (reward + *visits as f64 * *mean) / (*visits as f64 + 1.0);
            *visits += 1;
            reward
        }
        SearchNode::Chance { children, visits, mean } => {
            let (obs, rew) = agent.gen_percept_and_update();
            let key = (obs << agent.num_rew_bits()) | rew;
            let child = children
                .entry(key)
                .or_insert_with(|| Box::new(SearchNode::new_decision(agent.num_actions())));
            let downstream = sample(agent, child, dfr - 1);
            let total = rew as f64 + downstream;
            *mean = (total + *visits as f64 * *mean) / (*visits as f64 + 1.0);
            *visits += 1;
            total
        }
    }
}

/// Untried actions are taken first (uniformly among the untried), then UCB1
/// with reward normalized by the remaining horizon's reward range.
fn select_action(agent: &Agent, children: &[Option<Box<SearchNode>>], parent_visits: u64, dfr: usize) -> u32 {
    let untried: Vec<u32> = children
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_none())
        .map(|(a, _)| a as u32)
        .collect();
    if !untried.is_empty() {
        return untried[bits::rand_range(untried.len())];
    }
    let range = (agent.max_reward() - agent.min_reward()).max(f64::EPSILON);
    let scale = 1.0 / (dfr as f64 * range);
    let mut best_action = 0u32;
    let mut best_score = f64::NEG_INFINITY;
    for (a, child) in children.iter().enumerate() {
        let child = child.as_ref().expect("untried actions handled above");
        let exploitation = scale * child.mean();
        let exploration = UCB_EXPLORATION_CONSTANT
            * ((parent_visits as f64).ln() / child.visits() as f64).sqrt();
        let score = exploitation + exploration;
        if score > best_score {
            best_score = score;
            best_action = a as u32;
        }
    }
    best_action
}

/// A rollout with no tree-node bookkeeping: every action and percept is
/// drawn directly from the model. Used the first time a decision node is
/// reached.
fn playout(agent: &mut Agent, dfr: usize) -> f64 {
    if dfr == 0 {
        return 0.0;
    }
    let action = agent.gen_random_action();
    agent.model_update_action(action);
    let (_, reward) = agent.gen_percept_and_update();
    reward as f64 + playout(agent, dfr - 1)
}
