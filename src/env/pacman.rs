//! A bounded, single-ghost simplification of Pacman.
//!
//! The original environment (`examples/original_source/src/environment.hpp`)
//! describes a 19x19 maze with four ghosts and a much larger observation
//! space; this scales both down to keep the state space tractable while
//! keeping the same observation bit layout: 4 wall bits, 4 ghost-line-of-sight
//! bits, 3 food-smell bits (thermometer-coded at Manhattan distances 2/3/4),
//! and 1 power-pill bit.
//!
//! Rewards (move -1, wall bump -10, caught by ghost -50, eat food +10, clear
//! the board +100) are shifted by +50 so every value fits the unsigned
//! reward field, the same convention the original uses for Tiger.

use std::collections::HashSet;

use super::Environment;
use crate::bits;

pub const MOVE_LEFT: u32 = 0;
pub const MOVE_RIGHT: u32 = 1;
pub const MOVE_UP: u32 = 2;
pub const MOVE_DOWN: u32 = 3;

const WIDTH: usize = 7;
const HEIGHT: usize = 7;

const MAZE: [&str; HEIGHT] = [
    "#######",
    "#..#..#",
    "#.#.#.#",
    "#.o.#.#",
    "#.#...#",
    "#.....#",
    "#######",
];

const PACMAN_START: (usize, usize) = (1, 1);
const GHOST_START: (usize, usize) = (5, 5);

const REWARD_SHIFT: i64 = 50;
const REWARD_MOVE: i64 = -1;
const REWARD_WALL: i64 = -10;
const REWARD_GHOST: i64 = -50;
const REWARD_FOOD: i64 = 10;
const REWARD_WIN: i64 = 100;

type Pos = (usize, usize);

fn is_wall(pos: Pos) -> bool {
    MAZE[pos.0].as_bytes()[pos.1] == b'#'
}

pub struct Pacman {
    pacman: Pos,
    ghost: Pos,
    food: HashSet<Pos>,
    power_pills: HashSet<Pos>,
    observation: u64,
    reward: u64,
    finished: bool,
}

impl Pacman {
    pub fn new() -> Self {
        let mut game = Pacman {
            pacman: PACMAN_START,
            ghost: GHOST_START,
            food: HashSet::new(),
            power_pills: HashSet::new(),
            observation: 0,
            reward: 0,
            finished: false,
        };
        game.respawn();
        game
    }

    fn respawn(&mut self) {
        self.pacman = PACMAN_START;
        self.ghost = GHOST_START;
        self.food.clear();
        self.power_pills.clear();
        for (r, row) in MAZE.iter().enumerate() {
            for (c, cell) in row.as_bytes().iter().enumerate() {
                match cell {
                    b'.' => {
                        self.food.insert((r, c));
                    }
                    b'o' => {
                        self.power_pills.insert((r, c));
                    }
                    _ => {}
                }
            }
        }
        self.finished = false;
        self.observation = self.encode_observation();
    }

    fn step_towards(from: Pos, to: Pos) -> Pos {
        let (fr, fc) = (from.0 as i32, from.1 as i32);
        let (tr, tc) = (to.0 as i32, to.1 as i32);
        let (dr, dc) = (tr - fr, tc - fc);
        let candidates = if dr.abs() > dc.abs() {
            [(dr.signum(), 0), (0, dc.signum())]
        } else {
            [(0, dc.signum()), (dr.signum(), 0)]
        };
        for (cr, cc) in candidates {
            if cr == 0 && cc == 0 {
                continue;
            }
            let next = ((fr + cr) as usize, (fc + cc) as usize);
            if !is_wall(next) {
                return next;
            }
        }
        from
    }

    fn move_ghost(&mut self) {
        if bits::rand01() < 0.7 {
            self.ghost = Self::step_towards(self.ghost, self.pacman);
        } else {
            let dirs: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
            let (dr, dc) = dirs[bits::rand_range(4)];
            let next = ((self.ghost.0 as i32 + dr) as usize, (self.ghost.1 as i32 + dc) as usize);
            if !is_wall(next) {
                self.ghost = next;
            }
        }
    }

    fn manhattan_to_nearest_food(&self) -> Option<usize> {
        self.food
            .iter()
            .map(|&(r, c)| (self.pacman.0 as i32 - r as i32).unsigned_abs() as usize
                + (self.pacman.1 as i32 - c as i32).unsigned_abs() as usize)
            .min()
    }

    fn has_line_of_sight(&self, dir: (i32, i32)) -> bool {
        let mut pos = (self.pacman.0 as i32, self.pacman.1 as i32);
        loop {
            pos = (pos.0 + dir.0, pos.1 + dir.1);
            if pos.0 < 0 || pos.1 < 0 || pos.0 as usize >= HEIGHT || pos.1 as usize >= WIDTH {
                return false;
            }
            let upos = (pos.0 as usize, pos.1 as usize);
            if is_wall(upos) {
                return false;
            }
            if upos == self.ghost {
                return true;
            }
        }
    }

    fn encode_observation(&self) -> u64 {
        let dirs: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];
        let mut bits_val: u64 = 0;
        for &(dr, dc) in &dirs {
            let next = (self.pacman.0 as i32 + dr, self.pacman.1 as i32 + dc);
            let wall = next.0 < 0
                || next.1 < 0
                || next.0 as usize >= HEIGHT
                || next.1 as usize >= WIDTH
                || is_wall((next.0 as usize, next.1 as usize));
            bits_val = (bits_val << 1) | wall as u64;
        }
        for &dir in &dirs {
            bits_val = (bits_val << 1) | self.has_line_of_sight(dir) as u64;
        }
        let dist = self.manhattan_to_nearest_food();
        for threshold in [2usize, 3, 4] {
            let near = dist.map_or(false, |d| d <= threshold);
            bits_val = (bits_val << 1) | near as u64;
        }
        bits_val = (bits_val << 1) | (!self.power_pills.is_empty()) as u64;
        bits_val
    }
}

impl Default for Pacman {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for Pacman {
    fn observation(&self) -> u64 {
        self.observation
    }

    fn reward(&self) -> u64 {
        self.reward
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn perform_action(&mut self, action: u32) {
        if self.finished {
            // The previous call ended an episode; `is_finished` must stay
            // observable until the caller acts again, so the respawn that
            // starts the next episode happens here rather than inline with
            // the step that set `finished`.
            self.respawn();
        }
        let delta = match action {
            MOVE_LEFT => (0, -1),
            MOVE_RIGHT => (0, 1),
            MOVE_UP => (-1, 0),
            MOVE_DOWN => (1, 0),
            other => panic!("pacman: unknown action {other}"),
        };
        let target = (
            (self.pacman.0 as i32 + delta.0) as usize,
            (self.pacman.1 as i32 + delta.1) as usize,
        );
        let mut net: i64 = REWARD_MOVE;
        if is_wall(target) {
            net = REWARD_WALL;
        } else {
            self.pacman = target;
            if self.food.remove(&self.pacman) {
                net = REWARD_FOOD;
            }
            self.power_pills.remove(&self.pacman);
        }

        // Pacman walking onto the ghost's current cell is caught here,
        // before the ghost gets a chance to step away.
        let mut caught = self.ghost == self.pacman;
        if !caught {
            self.move_ghost();
            caught = self.ghost == self.pacman;
        }

        if caught {
            net = REWARD_GHOST;
            self.finished = true;
        } else if self.food.is_empty() {
            net += REWARD_WIN;
            self.finished = true;
        }

        self.reward = (net + REWARD_SHIFT) as u64;
        self.observation = self.encode_observation();
    }
}
