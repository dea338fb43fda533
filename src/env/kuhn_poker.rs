//! A two-decision-point simplification of Kuhn poker: three cards
//! (jack/queen/king), one ante each, a single bet size. The agent acts
//! first; if it checks and the opponent bets, the agent gets a second
//! decision (fold or call).
//!
//! Grounded in `examples/original_source/src/environment.cpp`'s
//! `KuhnPoker`. The original's opponent strategy is a hand-tuned mixture
//! keyed on a `nash-parameter` option; here the opponent's bet/call
//! probability scales with its own card strength and the same parameter,
//! which keeps the exploitable structure (a fixed point, a king that
//! always raises, a jack that usually folds) without reproducing the
//! original's exact piecewise formulas.
//!
//! Net profits of {-2, -1, +1, +2} are shifted by +2 to the nonnegative
//! rewards {0, 1, 3, 4} the bit codec can represent.

use super::Environment;
use crate::bits;

pub const PASS: u32 = 0;
pub const BET: u32 = 1;

const JACK: u8 = 0;
const QUEEN: u8 = 1;
const KING: u8 = 2;

/// Observation stage: whether the agent is making its first decision of the
/// hand, or responding to an opponent bet after having passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    FirstDecision,
    RespondToBet,
}

pub struct KuhnPoker {
    nash_parameter: f64,
    agent_card: u8,
    opp_card: u8,
    stage: Stage,
    observation: u64,
    reward: u64,
}

impl KuhnPoker {
    pub fn new(nash_parameter: f64) -> Self {
        let mut game = KuhnPoker {
            nash_parameter,
            agent_card: 0,
            opp_card: 0,
            stage: Stage::FirstDecision,
            observation: 0,
            reward: 0,
        };
        game.deal();
        game
    }

    fn deal(&mut self) {
        self.agent_card = bits::rand_range(3) as u8;
        self.opp_card = (self.agent_card + 1 + bits::rand_range(2) as u8) % 3;
        self.stage = Stage::FirstDecision;
        self.observation = Self::encode_observation(self.agent_card, Stage::FirstDecision);
    }

    fn encode_observation(card: u8, stage: Stage) -> u64 {
        let stage_bit = match stage {
            Stage::FirstDecision => 0,
            Stage::RespondToBet => 1,
        };
        ((card as u64) << 2) | stage_bit
    }

    /// Probability the opponent bets (after an agent pass) or calls (after
    /// an agent bet), as a function of its own card strength.
    fn opponent_aggression(&self) -> f64 {
        let strength = self.opp_card as f64 / (KING as f64);
        (self.nash_parameter * strength).clamp(0.0, 1.0)
    }

    fn showdown_winner_is_agent(&self) -> bool {
        self.agent_card > self.opp_card
    }

    fn settle(&mut self, net_profit: i32) {
        self.reward = (net_profit + 2) as u64;
        self.deal();
    }
}

impl Environment for KuhnPoker {
    fn observation(&self) -> u64 {
        self.observation
    }

    fn reward(&self) -> u64 {
        self.reward
    }

    fn perform_action(&mut self, action: u32) {
        match self.stage {
            Stage::FirstDecision => match action {
                BET => {
                    let opponent_calls = bits::rand01() < self.opponent_aggression();
                    if opponent_calls {
                        let net = if self.showdown_winner_is_agent() { 2 } else { -2 };
                        self.settle(net);
                    } else {
                        self.settle(1);
                    }
                }
                PASS => {
                    let opponent_bets = bits::rand01() < self.opponent_aggression();
                    if opponent_bets {
                        self.stage = Stage::RespondToBet;
                        self.observation = Self::encode_observation(self.agent_card, Stage::RespondToBet);
                        self.reward = 2; // shifted 0: hand not yet settled
                    } else {
                        let net = if self.showdown_winner_is_agent() { 1 } else { -1 };
                        self.settle(net);
                    }
                }
                other => panic!("kuhn-poker: unknown action {other}"),
            },
            Stage::RespondToBet => match action {
                PASS => self.settle(-1), // fold
                BET => {
                    let net = if self.showdown_winner_is_agent() { 2 } else { -2 };
                    self.settle(net);
                }
                other => panic!("kuhn-poker: unknown action {other}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn king_beats_jack_on_showdown() {
        bits::reseed(11);
        let mut game = KuhnPoker::new(1.0);
        game.agent_card = KING;
        game.opp_card = JACK;
        game.stage = Stage::FirstDecision;
        game.perform_action(PASS);
        // Jack rarely bets at full aggression-by-strength 0, so this settles
        // immediately most of the time; either way the reward is one of the
        // four representable shifted outcomes.
        assert!(matches!(game.reward(), 0 | 1 | 3 | 4));
    }

    #[test]
    fn folding_after_a_bet_costs_exactly_one() {
        bits::reseed(12);
        let mut game = KuhnPoker::new(1.0);
        game.agent_card = JACK;
        game.opp_card = KING;
        game.stage = Stage::RespondToBet;
        game.perform_action(PASS);
        assert_eq!(game.reward(), 1);
    }

    #[test]
    fn calling_and_winning_pays_four() {
        bits::reseed(13);
        let mut game = KuhnPoker::new(1.0);
        game.agent_card = KING;
        game.opp_card = JACK;
        game.stage = Stage::RespondToBet;
        game.perform_action(BET);
        assert_eq!(game.reward(), 4);
    }

    #[test]
    fn a_new_hand_is_dealt_after_every_settlement() {
        bits::reseed(14);
        let mut game = KuhnPoker::new(1.0);
        game.agent_card = QUEEN;
        game.opp_card = KING;
        game.stage = Stage::RespondToBet;
        game.perform_action(BET);
        assert_eq!(game.stage, Stage::FirstDecision);
    }
}
