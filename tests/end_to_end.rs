//! Cross-module scenarios: an agent driven against a real toy environment
//! end to end, exercising the context tree, the agent state machine, and
//! the planner together rather than in isolation.

use ctw_agent::agent::Agent;
use ctw_agent::bits;
use ctw_agent::ctw::ContextTree;
use ctw_agent::env::coin_flip::CoinFlip;
use ctw_agent::env::tiger::{self, Tiger};
use ctw_agent::env::Environment;
use ctw_agent::planner::Planner;

fn run_cycles(agent: &mut Agent, env: &mut dyn Environment, planner: &Planner, cycles: u64) {
    for _ in 0..cycles {
        let observation = env.observation();
        let reward = env.reward();
        agent.model_update_percept(observation, reward);
        let action = planner.plan(agent);
        env.perform_action(action);
        agent.model_update_action(action);
    }
}

#[test]
fn agent_learns_to_call_a_biased_coin() {
    bits::reseed(1001);
    let mut env = CoinFlip::new(0.9);
    let mut agent = Agent::new(2, 1, 1, 8, 2);
    let planner = Planner::new(128);

    run_cycles(&mut agent, &mut env, &planner, 150);

    // A policy with no model of the bias would score 0.5 on average
    // (calling an independent coin correctly half the time); learning the
    // 0.9 bias should pull the average up from there.
    assert!(
        agent.average_reward() > 0.55,
        "average reward too low: {}",
        agent.average_reward()
    );
}

#[test]
fn agent_on_tiger_avoids_the_worst_outcome_over_time() {
    bits::reseed(2002);
    let mut env = Tiger::new();
    let mut agent = Agent::new(tiger::NUM_ACTIONS, 2, 7, 6, 3);
    let planner = Planner::new(96);

    run_cycles(&mut agent, &mut env, &planner, 120);

    // A reasonable policy should do noticeably better, on average, than
    // always walking into the tiger (reward 0 every cycle).
    assert!(
        agent.average_reward() > 40.0,
        "average reward too low: {}",
        agent.average_reward()
    );
}

#[test]
fn context_tree_serialization_round_trips_through_an_interaction() {
    bits::reseed(3003);
    let mut env = CoinFlip::new(0.6);
    let mut agent = Agent::new(2, 1, 1, 6, 2);
    let planner = Planner::new(32);

    run_cycles(&mut agent, &mut env, &planner, 40);

    let serialized = agent.ct().serialize();
    let restored = ContextTree::deserialize(&serialized, 6).expect("valid serialization");
    assert_eq!(restored.serialize(), serialized);
    assert!((restored.log_block_probability() - agent.ct().log_block_probability()).abs() < 1e-12);
}

#[test]
fn planning_never_leaves_stray_model_state_behind() {
    bits::reseed(4004);
    let mut env = CoinFlip::new(0.5);
    let mut agent = Agent::new(2, 1, 1, 5, 3);
    let planner = Planner::new(64);

    for _ in 0..20 {
        let observation = env.observation();
        let reward = env.reward();
        agent.model_update_percept(observation, reward);
        let history_before_plan = agent.ct().serialize();
        let age_before_plan = agent.age();

        let action = planner.plan(&mut agent);

        assert_eq!(agent.ct().serialize(), history_before_plan);
        assert_eq!(agent.age(), age_before_plan);

        env.perform_action(action);
        agent.model_update_action(action);
    }
}
