//! Context Tree Weighting: a weighted mixture, over variable-order Markov
//! predictors of bounded depth, maintained incrementally in log-space.
//!
//! Each [`CtNode`] owns its two children outright (no sharing, no
//! reference-counting) so the tree's lifetime is exactly the lifetime of the
//! [`ContextTree`] that roots it; children are materialized lazily on
//! `update` and pruned back to nothing on `revert` once their counts return
//! to zero, matching the original agent's C++ `ContextTree` (see
//! `examples/original_source/src/predict.cpp`).

use crate::bits::{self, Bit};
use crate::error::CtwError;

const LN_HALF: f64 = -std::f64::consts::LN_2;

/// log(exp(x) + exp(y)), in a form that never overflows `exp` and degrades
/// gracefully when `|x - y|` is large (the dominated term's contribution
/// underflows to exactly 0 rather than panicking or producing NaN).
fn logsumexp(x: f64, y: f64) -> f64 {
    if x == f64::NEG_INFINITY && y == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let m = x.max(y);
    m + (-(x - y).abs()).exp().ln_1p()
}

#[derive(Debug, Clone)]
struct CtNode {
    counts: [u64; 2],
    log_prob_estimated: f64,
    log_prob_weighted: f64,
    children: [Option<Box<CtNode>>; 2],
}

impl CtNode {
    fn new() -> Self {
        CtNode {
            counts: [0, 0],
            log_prob_estimated: 0.0,
            log_prob_weighted: 0.0,
            children: [None, None],
        }
    }

    /// log( (a_sym + 1/2) / (a0 + a1 + 1) ), from this node's *current*
    /// (pre-update, or post-decrement on revert) counts.
    fn log_kt_multiplier(&self, sym: Bit) -> f64 {
        let a_sym = self.counts[sym as usize] as f64;
        let total = (self.counts[0] + self.counts[1]) as f64;
        ((a_sym + 0.5) / (total + 1.0)).ln()
    }

    /// Recompute Lw from Le and the children's Lw, treating a missing child
    /// as contributing probability 1 (log 0).
    fn recompute_weighted(&mut self) {
        let lw0 = self.children[0].as_ref().map_or(0.0, |c| c.log_prob_weighted);
        let lw1 = self.children[1].as_ref().map_or(0.0, |c| c.log_prob_weighted);
        self.log_prob_weighted = LN_HALF + logsumexp(self.log_prob_estimated, lw0 + lw1);
    }

    fn is_redundant(&self) -> bool {
        self.counts == [0, 0] && self.children[0].is_none() && self.children[1].is_none()
    }
}

/// A context tree of fixed maximum depth `D`, owning a single binary-alphabet
/// CTW mixture plus the append-only history that drives it.
#[derive(Debug, Clone)]
pub struct ContextTree {
    root: Box<CtNode>,
    depth: usize,
    history: Vec<Bit>,
}

impl ContextTree {
    /// Create an empty tree with a fictitious prefix of `depth` zero-bits.
    pub fn new(depth: usize) -> Self {
        ContextTree {
            root: Box::new(CtNode::new()),
            depth,
            history: vec![false; depth],
        }
    }

    /// Restore the tree to its just-constructed state.
    pub fn clear(&mut self) {
        self.root = Box::new(CtNode::new());
        self.history.clear();
        self.history.resize(self.depth, false);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn history_size(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &[Bit] {
        &self.history
    }

    /// The most recent `depth` history bits, most-recent-first: element `k`
    /// (0-indexed) is the context symbol used to select a child at tree
    /// depth `k+1`.
    fn context(&self) -> Vec<Bit> {
        let n = self.history.len();
        (1..=self.depth).map(|k| self.history[n - k]).collect()
    }

    /// Update the tree with a single symbol and append it to the history.
    pub fn update_bit(&mut self, sym: Bit) {
        let context = self.context();
        Self::update_rec(&mut self.root, &context, 0, self.depth, sym);
        self.history.push(sym);
    }

    fn update_rec(node: &mut CtNode, context: &[Bit], depth: usize, max_depth: usize, sym: Bit) {
        let delta = node.log_kt_multiplier(sym);
        node.log_prob_estimated += delta;
        node.counts[sym as usize] += 1;
        if depth == max_depth {
            node.log_prob_weighted = node.log_prob_estimated;
        } else {
            let child_symbol = context[depth] as usize;
            let child = node.children[child_symbol].get_or_insert_with(|| Box::new(CtNode::new()));
            Self::update_rec(child, context, depth + 1, max_depth, sym);
            node.recompute_weighted();
        }
    }

    /// Sequential application of [`ContextTree::update_bit`] to each bit.
    pub fn update(&mut self, syms: &[Bit]) {
        for &s in syms {
            self.update_bit(s);
        }
    }

    /// Append bits to the history without touching any node. This is the
    /// action-conditional discipline: action bits condition future
    /// predictions but are never themselves predicted.
    pub fn update_history(&mut self, syms: &[Bit]) {
        self.history.extend_from_slice(syms);
    }

    /// Undo the single most-recent `update_bit` call.
    ///
    /// # Panics
    /// Panics if the most recent history bit was appended via
    /// `update_history` rather than `update_bit` (there would be no node on
    /// the context path to undo) or if the history is shorter than `depth`.
    pub fn revert_one(&mut self) {
        assert!(
            self.history.len() > self.depth,
            "revert_one: history too short to revert"
        );
        let sym = *self.history.last().expect("history non-empty");
        self.history.pop();
        let context = self.context();
        Self::revert_rec(&mut self.root, &context, 0, self.depth, sym);
    }

    /// Returns true if the node (and therefore its subtree slot in the
    /// parent) should be deleted.
    fn revert_rec(node: &mut CtNode, context: &[Bit], depth: usize, max_depth: usize, sym: Bit) -> bool {
        if depth < max_depth {
            let child_symbol = context[depth] as usize;
            let delete_child = {
                let child = node.children[child_symbol]
                    .as_mut()
                    .expect("revert: missing node on context path");
                Self::revert_rec(child, context, depth + 1, max_depth, sym)
            };
            if delete_child {
                node.children[child_symbol] = None;
            }
        }
        node.counts[sym as usize] -= 1;
        let should_delete = node.is_redundant();
        if !should_delete {
            node.log_prob_estimated -= node.log_kt_multiplier(sym);
            if depth == max_depth {
                node.log_prob_weighted = node.log_prob_estimated;
            } else {
                node.recompute_weighted();
            }
        }
        should_delete
    }

    /// Apply [`ContextTree::revert_one`] `k` times.
    pub fn revert(&mut self, k: usize) {
        for _ in 0..k {
            self.revert_one();
        }
    }

    /// Truncate the last `k` history bits without touching the tree (the
    /// inverse of `update_history`).
    pub fn revert_history(&mut self, k: usize) {
        assert!(k <= self.history.len(), "revert_history: k exceeds history");
        self.history.truncate(self.history.len() - k);
    }

    /// Draw `k` bits from the conditional predictive distribution given the
    /// current history, leaving the tree updated with the drawn bits.
    pub fn gen_random_symbols_and_update(&mut self, k: usize) -> Vec<Bit> {
        let mut out = Vec::with_capacity(k);
        for _ in 0..k {
            let log_before = self.root.log_prob_weighted;
            self.update_bit(false);
            let log_with_zero = self.root.log_prob_weighted;
            let p_zero = (log_with_zero - log_before).exp();
            let u = bits::rand01();
            let sym = u >= p_zero;
            if sym {
                self.revert_one();
                self.update_bit(true);
            }
            out.push(sym);
        }
        out
    }

    /// Same as [`ContextTree::gen_random_symbols_and_update`], but the tree
    /// is left unchanged on exit.
    pub fn gen_random_symbols(&mut self, k: usize) -> Vec<Bit> {
        let out = self.gen_random_symbols_and_update(k);
        self.revert(k);
        out
    }

    /// log of the CTW mixture probability of all history bits introduced
    /// via `update`/`update_bit` (bits added via `update_history` condition
    /// but do not contribute to this product).
    pub fn log_block_probability(&self) -> f64 {
        self.root.log_prob_weighted
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.depth.to_string());
        out.push('\n');
        let hist: String = self.history.iter().map(|&b| if b { '1' } else { '0' }).collect();
        out.push_str(&hist);
        out.push('\n');
        write_node(&self.root, &mut out);
        out
    }

    pub fn deserialize(text: &str, expected_depth: usize) -> Result<Self, CtwError> {
        let mut tokens = text.split_whitespace();
        let depth: usize = next_token(&mut tokens)?
            .parse()
            .map_err(|_| CtwError::Malformed("depth is not an integer".into()))?;
        if depth != expected_depth {
            return Err(CtwError::DepthMismatch {
                found: depth,
                expected: expected_depth,
            });
        }
        let hist_tok = next_token(&mut tokens)?;
        let history: Vec<Bit> = hist_tok.chars().map(|c| c == '1').collect();
        let root = Box::new(read_node(&mut tokens)?);
        Ok(ContextTree { root, depth, history })
    }
}

fn write_node(node: &CtNode, out: &mut String) {
    out.push_str(&format!(
        "{:e} {:e} {} {} ",
        node.log_prob_estimated, node.log_prob_weighted, node.counts[0], node.counts[1]
    ));
    match &node.children[0] {
        Some(c) => {
            out.push_str("1 ");
            write_node(c, out);
        }
        None => out.push_str("0 "),
    }
    match &node.children[1] {
        Some(c) => {
            out.push_str("1 ");
            write_node(c, out);
        }
        None => out.push_str("0 "),
    }
}

fn next_token<'a, I: Iterator<Item = &'a str>>(tokens: &mut I) -> Result<&'a str, CtwError> {
    tokens
        .next()
        .ok_or_else(|| CtwError::Malformed("unexpected end of input".into()))
}

fn read_node<'a, I: Iterator<Item = &'a str>>(tokens: &mut I) -> Result<CtNode, CtwError> {
    let le: f64 = next_token(tokens)?
        .parse()
        .map_err(|_| CtwError::Malformed("bad Le".into()))?;
    let lw: f64 = next_token(tokens)?
        .parse()
        .map_err(|_| CtwError::Malformed("bad Lw".into()))?;
    let a0: u64 = next_token(tokens)?
        .parse()
        .map_err(|_| CtwError::Malformed("bad a0".into()))?;
    let a1: u64 = next_token(tokens)?
        .parse()
        .map_err(|_| CtwError::Malformed("bad a1".into()))?;
    let has0: u8 = next_token(tokens)?
        .parse()
        .map_err(|_| CtwError::Malformed("bad has0 flag".into()))?;
    let child0 = if has0 != 0 {
        Some(Box::new(read_node(tokens)?))
    } else {
        None
    };
    let has1: u8 = next_token(tokens)?
        .parse()
        .map_err(|_| CtwError::Malformed("bad has1 flag".into()))?;
    let child1 = if has1 != 0 {
        Some(Box::new(read_node(tokens)?))
    } else {
        None
    };
    Ok(CtNode {
        counts: [a0, a1],
        log_prob_estimated: le,
        log_prob_weighted: lw,
        children: [child0, child1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_has_probability_one() {
        let ct = ContextTree::new(4);
        assert_eq!(ct.log_block_probability(), 0.0);
    }

    /// D = 0 degenerates every node to a single-node KT estimator. For the
    /// sequence 1,1,0 the closed-form KT block probability for counts
    /// (a0=1, a1=2) is 0.5 * 0.75 * (0.5/3) = 0.0625, matching the
    /// sequential per-bit multiplier product; this is the same value the
    /// original C++ `ContextTree` (predict.cpp) would compute bit by bit.
    #[test]
    fn kt_leaf_sanity_depth_zero() {
        let mut ct = ContextTree::new(0);
        ct.update(&[true, true, false]);
        let expected = (0.0625f64).ln();
        assert!(
            (ct.log_block_probability() - expected).abs() < 1e-9,
            "got {}, expected {}",
            ct.log_block_probability(),
            expected
        );
    }

    #[test]
    fn depth_one_mixture_matches_node_invariant() {
        let mut ct = ContextTree::new(1);
        ct.update(&[false, true, false, true]);
        // Recompute the root's Lw directly from Le(root) and the two
        // children's Lw, per the node invariant, and check it matches what
        // incremental updates produced.
        let le_root = ct.root.log_prob_estimated;
        let lw0 = ct.root.children[0].as_ref().map_or(0.0, |c| c.log_prob_weighted);
        let lw1 = ct.root.children[1].as_ref().map_or(0.0, |c| c.log_prob_weighted);
        let expected = LN_HALF + logsumexp(le_root, lw0 + lw1);
        assert!((ct.log_block_probability() - expected).abs() < 1e-12);
    }

    #[test]
    fn split_update_matches_single_update() {
        let seq = [true, false, true, true, false, false, true, false];
        let mut whole = ContextTree::new(3);
        whole.update(&seq);

        let mut split = ContextTree::new(3);
        split.update(&seq[..3]);
        split.update(&seq[3..]);

        assert_eq!(whole.serialize(), split.serialize());
    }

    #[test]
    fn revert_restores_exact_state() {
        bits::reseed(7);
        let mut ct = ContextTree::new(4);
        let before = ct.serialize();
        let random_bits: Vec<Bit> = (0..100).map(|i| i % 3 == 0).collect();
        ct.update(&random_bits);
        ct.revert(random_bits.len());
        assert_eq!(ct.serialize(), before);
    }

    #[test]
    fn revert_after_extra_updates_restores_snapshot() {
        let mut ct = ContextTree::new(4);
        let prefix: Vec<Bit> = (0..100).map(|i| (i * 7) % 5 == 0).collect();
        ct.update(&prefix);
        let snapshot = ct.serialize();

        let suffix: Vec<Bit> = (0..50).map(|i| (i * 3) % 4 == 0).collect();
        ct.update(&suffix);
        ct.revert(suffix.len());
        assert_eq!(ct.serialize(), snapshot);
    }

    #[test]
    fn gen_random_symbols_leaves_tree_unchanged() {
        bits::reseed(99);
        let mut ct = ContextTree::new(4);
        ct.update(&[true, false, true, true, false]);
        let before = ct.serialize();
        let _ = ct.gen_random_symbols(6);
        assert_eq!(ct.serialize(), before);
    }

    #[test]
    fn serialize_round_trip_is_byte_identical() {
        let mut ct = ContextTree::new(8);
        let bits_seq: Vec<Bit> = (0..500).map(|i| (i * 13) % 7 < 3).collect();
        ct.update(&bits_seq);
        let s1 = ct.serialize();
        let loaded = ContextTree::deserialize(&s1, 8).expect("valid serialization");
        let s2 = loaded.serialize();
        assert_eq!(s1, s2);
        assert!((loaded.log_block_probability() - ct.log_block_probability()).abs() < 1e-12);
    }

    #[test]
    fn deserialize_rejects_depth_mismatch() {
        let ct = ContextTree::new(4);
        let s = ct.serialize();
        let err = ContextTree::deserialize(&s, 5).unwrap_err();
        assert!(matches!(err, CtwError::DepthMismatch { found: 4, expected: 5 }));
    }

    #[test]
    fn action_conditional_bits_never_enter_block_probability() {
        let mut ct = ContextTree::new(4);
        let before = ct.log_block_probability();
        ct.update_history(&[true, false, true]);
        assert_eq!(ct.log_block_probability(), before);
        assert_eq!(ct.history_size(), 4 + 3);
    }

    #[test]
    fn revert_history_is_inverse_of_update_history() {
        let mut ct = ContextTree::new(4);
        let before = ct.history().to_vec();
        ct.update_history(&[true, false, true]);
        ct.revert_history(3);
        assert_eq!(ct.history(), before.as_slice());
    }
}
