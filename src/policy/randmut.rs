//! Random mutation policy - weights nudged by accumulated odds
//!
//! Each link keeps four mutation odds, one per (input bit, direction):
//!
//! | odds | effect when drawn |
//! |------|-------------------|
//! | `neg_0` / `pos_0` | `weight_0` -1 / +1 |
//! | `neg_1` / `pos_1` | `weight_1` -1 / +1 |
//!
//! On penalty the odds that would flip the gate grow by `rate · F²`: a gate
//! that was on pushes the selected weight down, a gate that was off pushes
//! it up. On reward both odds of the selected weight shrink by the same
//! amount. Odds stay within `[0, 1]`.
//!
//! The mutate pass draws each of the four odds independently; after any
//! step the link's odds are halved.

use rand::rngs::StdRng;
use rand::Rng;

use super::counters::GateCounters;
use super::signal::{FeedbackMailbox, FeedbackSignal};
use super::stats::StatsGateParam;
use super::{dispatch_feedback, GatePolicy, WeightPair};
use crate::memory::GateCursor;

/// Gate statistics: counters plus the feedback mailbox
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RandMutationGateStats {
    pub counters: GateCounters,
    pub feedback: f32,
}

impl FeedbackMailbox for RandMutationGateStats {
    type Signal = f32;

    #[inline]
    fn post(&mut self, signal: f32) {
        self.feedback = self.feedback.accumulate(signal);
    }

    #[inline]
    fn drain(&mut self) -> f32 {
        std::mem::take(&mut self.feedback)
    }

    #[inline]
    fn pending(&self) -> f32 {
        self.feedback
    }
}

/// Per-link mutation odds
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MutationOdds {
    pub neg_0: f32,
    pub pos_0: f32,
    pub neg_1: f32,
    pub pos_1: f32,
}

impl MutationOdds {
    /// Raise the odds of the step that would have flipped the gate
    ///
    /// The direction depends only on the gate state, for either input bit:
    /// a gate that was on gets a downward step, one that was off an upward
    /// step.
    pub fn penalize(&mut self, input: bool, gate_state: bool, step: f32) {
        let slot = match (input, gate_state) {
            (false, true) => &mut self.neg_0,
            (false, false) => &mut self.pos_0,
            (true, true) => &mut self.neg_1,
            (true, false) => &mut self.pos_1,
        };
        *slot = (*slot + step).clamp(0.0, 1.0);
    }

    /// Lower both odds of the weight selected by `input`
    pub fn reward(&mut self, input: bool, step: f32) {
        let (neg, pos) = if input {
            (&mut self.neg_1, &mut self.pos_1)
        } else {
            (&mut self.neg_0, &mut self.pos_0)
        };
        *neg = (*neg - step).clamp(0.0, 1.0);
        *pos = (*pos - step).clamp(0.0, 1.0);
    }

    pub fn halve(&mut self) {
        self.neg_0 *= 0.5;
        self.pos_0 *= 0.5;
        self.neg_1 *= 0.5;
        self.pos_1 *= 0.5;
    }
}

/// Probabilistic ±1 mutation policy
#[derive(Clone, Debug)]
pub struct RandMutationPolicy {
    pub threshold: i16,
    /// Initial weights are `a - b` with `a, b` uniform in `0..=weight_range`
    pub weight_range: i16,
    /// Odds change per unit of squared feedback
    pub odds_rate: f32,
}

impl Default for RandMutationPolicy {
    fn default() -> Self {
        Self {
            threshold: 1024,
            weight_range: i16::MAX,
            odds_rate: 0.001,
        }
    }
}

impl RandMutationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: i16) -> Self {
        self.threshold = threshold;
        self
    }

    fn draw_weight(&self, rng: &mut StdRng) -> i16 {
        let range = self.weight_range.max(0);
        rng.gen_range(0..=range) - rng.gen_range(0..=range)
    }
}

/// Step `weight` by one when a draw falls under `odds`
fn try_step(rng: &mut StdRng, odds: f32, weight: &mut i16, up: bool) -> bool {
    if rng.gen::<f32>() >= odds {
        return false;
    }
    *weight = if up {
        weight.saturating_add(1)
    } else {
        weight.saturating_sub(1)
    };
    true
}

impl GatePolicy for RandMutationPolicy {
    type GateParam = StatsGateParam;
    type GateStats = RandMutationGateStats;
    type LinkParam = WeightPair<i16>;
    type LinkStats = MutationOdds;
    type Signal = f32;

    const NAME: &'static str = "randmut";

    fn initialize(&self, gate: &mut GateCursor<'_, Self>, rng: &mut StdRng) {
        gate.param_mut().threshold = self.threshold;
        let mut links = gate.links();
        while let Some(mut link) = links.next_link() {
            *link.param_mut() = WeightPair::new(self.draw_weight(rng), self.draw_weight(rng));
        }
    }

    fn compute_forward(&self, gate: &mut GateCursor<'_, Self>) {
        let mut acc: i32 = 0;
        let mut links = gate.links();
        while let Some(link) = links.next_link() {
            acc += link.param().select(link.get()) as i32;
        }
        let threshold = gate.param().threshold as i32;
        gate.set(acc > threshold);
    }

    fn compute_backward(&self, gate: &mut GateCursor<'_, Self>) {
        let feedback = gate.drain_feedback();
        if feedback == 0.0 {
            return;
        }

        let state = gate.get();
        gate.stats_mut()
            .counters
            .add(state, feedback.is_reward(), feedback.counter_units());

        let step = self.odds_rate * feedback * feedback;
        let rewarded = feedback.is_reward();
        let mut links = gate.links();
        while let Some(mut link) = links.next_link() {
            let input = link.get();
            let odds = link.stats_mut();
            if rewarded {
                odds.reward(input, step);
            } else {
                odds.penalize(input, state, step);
            }
        }

        dispatch_feedback(
            gate,
            feedback,
            |link| link.param().select(link.get()) as f32,
            |_, _| {},
        );
    }

    fn mutate_backward(&self, gate: &mut GateCursor<'_, Self>, rng: &mut StdRng) {
        let address = gate.address();
        let mut links = gate.links();
        while let Some(mut link) = links.next_link() {
            let odds = *link.stats();
            let pair = link.param_mut();
            // Non-short-circuit: every odds gets its own draw
            let mutated = try_step(rng, odds.neg_0, &mut pair.weight_0, false)
                | try_step(rng, odds.pos_0, &mut pair.weight_0, true)
                | try_step(rng, odds.neg_1, &mut pair.weight_1, false)
                | try_step(rng, odds.pos_1, &mut pair.weight_1, true);
            if mutated {
                log::trace!(
                    "Mutated link {} of gate {} to {:?}",
                    link.position(),
                    address,
                    link.param()
                );
                link.stats_mut().halve();
            }
        }
    }
}
