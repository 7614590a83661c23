//! Basic policy - float weights corrected toward the threshold on penalty
//!
//! A penalized gate whose accumulator still sits on the wrong side of the
//! threshold moves every selected weight by an equal slice of the gap:
//!
//! ```text
//! delta = (threshold - acc) / width * rate(corrections)
//! ```
//!
//! The rate decays with the number of corrections the gate has received.
//! Feedback is still dispatched upstream so earlier layers learn too.

use rand::rngs::StdRng;
use rand::Rng;

use super::signal::{FeedbackMailbox, FeedbackSignal};
use super::{dispatch_feedback, GatePolicy, WeightPair};
use crate::memory::GateCursor;

/// Gate parameter: activation threshold
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BasicGateParam {
    pub threshold: f32,
}

/// Gate statistics: feedback mailbox and correction count
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BasicGateStats {
    pub feedback: f32,
    pub corrections: u32,
}

impl FeedbackMailbox for BasicGateStats {
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

/// Threshold-gap correction policy
#[derive(Clone, Debug)]
pub struct BasicPolicy {
    pub threshold: f32,
    /// Initial weights are `a - b` with `a, b` uniform in `0..=weight_range`
    pub weight_range: i32,
}

impl Default for BasicPolicy {
    fn default() -> Self {
        Self {
            threshold: 10_000.0,
            weight_range: i16::MAX as i32,
        }
    }
}

impl BasicPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Correction rate after `corrections` corrections
    pub fn correction_rate(corrections: u32) -> f32 {
        match corrections {
            0..=399 => 0.1,
            400..=799 => 0.01,
            _ => 0.001,
        }
    }

    fn draw_weight(&self, rng: &mut StdRng) -> f32 {
        let range = self.weight_range.max(0);
        (rng.gen_range(0..=range) - rng.gen_range(0..=range)) as f32
    }

    fn accumulate(gate: &mut GateCursor<'_, Self>) -> f32 {
        let mut acc = 0.0;
        let mut links = gate.links();
        while let Some(link) = links.next_link() {
            acc += link.param().select(link.get());
        }
        acc
    }
}

impl GatePolicy for BasicPolicy {
    type GateParam = BasicGateParam;
    type GateStats = BasicGateStats;
    type LinkParam = WeightPair<f32>;
    type LinkStats = ();
    type Signal = f32;

    const NAME: &'static str = "basic";

    fn initialize(&self, gate: &mut GateCursor<'_, Self>, rng: &mut StdRng) {
        gate.param_mut().threshold = self.threshold;
        let mut links = gate.links();
        while let Some(mut link) = links.next_link() {
            *link.param_mut() = WeightPair::new(self.draw_weight(rng), self.draw_weight(rng));
        }
    }

    fn compute_forward(&self, gate: &mut GateCursor<'_, Self>) {
        let acc = Self::accumulate(gate);
        let threshold = gate.param().threshold;
        gate.set(acc > threshold);
    }

    fn compute_backward(&self, gate: &mut GateCursor<'_, Self>) {
        let feedback = gate.drain_feedback();
        if feedback == 0.0 {
            return;
        }

        dispatch_feedback(
            gate,
            feedback,
            |link| link.param().select(link.get()),
            |_, _| {},
        );

        if !feedback.is_penalty() {
            return;
        }

        let acc = Self::accumulate(gate);
        let threshold = gate.param().threshold;
        let settled = if gate.get() {
            acc < threshold
        } else {
            acc > threshold
        };
        if settled {
            return;
        }

        let stats = gate.stats_mut();
        let rate = Self::correction_rate(stats.corrections);
        stats.corrections = stats.corrections.saturating_add(1);
        let delta = (threshold - acc) / gate.width() as f32 * rate;

        let mut links = gate.links();
        while let Some(mut link) = links.next_link() {
            let input = link.get();
            *link.param_mut().select_mut(input) += delta;
        }
    }
}
