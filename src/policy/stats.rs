//! Statistics policy - integer weights with reward/penalty bookkeeping
//!
//! Forward: `acc = Σ weight(input)`, state = `acc > threshold`.
//!
//! Backward: the drained feedback is booked into the gate counters (keyed
//! by the gate state), split across the links in proportion to their signed
//! weights, booked
//! into each link's counters (keyed by gate state and link input) and
//! posted upstream.
//!
//! Mutate: once the gate's penalty total exceeds the budget, every gate and
//! link counter is halved so recent history keeps dominating and the
//! counters never saturate silently.

use rand::rngs::StdRng;
use rand::Rng;

use super::counters::{GateCounters, LinkCounters};
use super::signal::{FeedbackMailbox, FeedbackSignal};
use super::{dispatch_feedback, GatePolicy, WeightPair};
use crate::memory::GateCursor;

/// Penalty total above which counters decay
pub const PENALTY_BUDGET: u64 = 100_000;

/// Gate parameter: activation threshold
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsGateParam {
    pub threshold: i16,
}

/// Gate statistics: counters plus the feedback mailbox
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsGateStats {
    pub counters: GateCounters,
    pub feedback: i32,
}

impl FeedbackMailbox for StatsGateStats {
    type Signal = i32;

    #[inline]
    fn post(&mut self, signal: i32) {
        self.feedback = self.feedback.accumulate(signal);
    }

    #[inline]
    fn drain(&mut self) -> i32 {
        std::mem::take(&mut self.feedback)
    }

    #[inline]
    fn pending(&self) -> i32 {
        self.feedback
    }
}

/// Statistics-driven policy
#[derive(Clone, Debug)]
pub struct StatsPolicy {
    /// Threshold written into every gate on initialize
    pub threshold: i16,
    /// Initial weights are drawn from `-weight_range..weight_range`
    pub weight_range: i16,
    /// Penalty total that triggers counter decay
    pub penalty_budget: u64,
}

impl Default for StatsPolicy {
    fn default() -> Self {
        Self {
            threshold: 1024,
            weight_range: 128,
            penalty_budget: PENALTY_BUDGET,
        }
    }
}

impl StatsPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: i16) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_weight_range(mut self, weight_range: i16) -> Self {
        self.weight_range = weight_range;
        self
    }

    fn draw_weight(&self, rng: &mut StdRng) -> i16 {
        if self.weight_range <= 0 {
            0
        } else {
            rng.gen_range(-self.weight_range..self.weight_range)
        }
    }
}

impl GatePolicy for StatsPolicy {
    type GateParam = StatsGateParam;
    type GateStats = StatsGateStats;
    type LinkParam = WeightPair<i16>;
    type LinkStats = LinkCounters;
    type Signal = i32;

    const NAME: &'static str = "stats";

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
        if feedback == 0 {
            return;
        }

        let state = gate.get();
        gate.stats_mut()
            .counters
            .add(state, feedback.is_reward(), feedback.counter_units());

        dispatch_feedback(
            gate,
            feedback,
            |link| link.param().select(link.get()) as i32,
            |link, share| {
                let input = link.get();
                link.stats_mut()
                    .add(state, input, share.is_reward(), share.counter_units());
            },
        );
    }

    fn mutate_backward(&self, gate: &mut GateCursor<'_, Self>, _rng: &mut StdRng) {
        let penalties = gate.stats().counters.penalties();
        if penalties <= self.penalty_budget {
            return;
        }

        log::trace!(
            "Decaying counters of gate {} (penalties {} > {})",
            gate.address(),
            penalties,
            self.penalty_budget
        );
        gate.stats_mut().counters.halve();
        let mut links = gate.links();
        while let Some(mut link) = links.next_link() {
            link.stats_mut().halve();
        }
    }
}
