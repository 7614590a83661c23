//! # Gate Policies - pluggable learning strategies
//!
//! A policy is a pure strategy over one gate at a time. The arena invokes
//! its entry points uniformly on every gate of every page that has links:
//!
//! | Pass | Page order | Entry point |
//! |------|------------|-------------|
//! | initialize | ascending | [`GatePolicy::initialize`] |
//! | forward | ascending | [`GatePolicy::compute_forward`] |
//! | backward | descending | [`GatePolicy::compute_backward`] |
//! | mutate | descending | [`GatePolicy::mutate_forward`], [`GatePolicy::mutate_backward`] |
//!
//! Each policy picks its own slot payloads: the gate parameter (threshold),
//! the per-link parameter (a [`WeightPair`], one weight per input bit), and
//! gate/link statistics. Gate statistics always embed the feedback mailbox
//! that upstream gates post into.
//!
//! ## Policies
//!
//! - [`BasicPolicy`]: float weights, threshold-gap correction on penalty
//! - [`StatsPolicy`]: integer weights, reward/penalty counters with decay
//! - [`RandMutationPolicy`]: integer weights, probabilistic ±1 mutation

use std::fmt::Debug;

use rand::rngs::StdRng;

use crate::memory::{GateCursor, LinkCursor};

mod signal;
pub use signal::{FeedbackMailbox, FeedbackSignal};

pub mod conservation;
pub use conservation::{split_feedback, FeedbackSplit, WeightScan};

mod counters;
pub use counters::{GateCounters, LinkCounters};

mod basic;
pub use basic::{BasicGateParam, BasicGateStats, BasicPolicy};

mod stats;
pub use stats::{StatsGateParam, StatsGateStats, StatsPolicy, PENALTY_BUDGET};

mod randmut;
pub use randmut::{MutationOdds, RandMutationPolicy, RandMutationGateStats};

/// Learning strategy contract
///
/// Selected once when the arena is built and held for its lifetime.
/// `initialize` and the mutate passes receive the arena's seeded random
/// source; forward/backward passes are deterministic.
pub trait GatePolicy: Sized {
    /// Gate's own parameter (slot position 0)
    type GateParam: Default + Clone + Debug;
    /// Gate's own statistics, including the feedback mailbox
    type GateStats: Default + Clone + Debug + FeedbackMailbox<Signal = Self::Signal>;
    /// Per-link parameter (slot positions 1..width)
    type LinkParam: Default + Clone + Debug;
    /// Per-link statistics
    type LinkStats: Default + Clone + Debug;
    /// Feedback scalar
    type Signal: FeedbackSignal;

    /// Policy name for logs
    const NAME: &'static str;

    /// Set initial parameters for one gate
    fn initialize(&self, gate: &mut GateCursor<'_, Self>, rng: &mut StdRng);

    /// Evaluate links and write the gate's new state
    fn compute_forward(&self, gate: &mut GateCursor<'_, Self>);

    /// Drain feedback, update statistics, dispatch feedback upstream
    fn compute_backward(&self, gate: &mut GateCursor<'_, Self>);

    /// Post-backward weight adjustment, first half
    fn mutate_forward(&self, _gate: &mut GateCursor<'_, Self>, _rng: &mut StdRng) {}

    /// Post-backward weight adjustment, second half
    fn mutate_backward(&self, _gate: &mut GateCursor<'_, Self>, _rng: &mut StdRng) {}
}

/// Split a gate's drained feedback across its links and post each share
/// upstream
///
/// `weight` returns the weight bound to a link's present input bit.
/// `deliver` sees every link together with the share it was sent, so a
/// policy can fold the share into its link statistics. The heaviest link is
/// delivered last, once its share absorbed the rounding residual, and the
/// shares always sum to `feedback`.
pub fn dispatch_feedback<P, W, D>(
    gate: &mut GateCursor<'_, P>,
    feedback: P::Signal,
    mut weight: W,
    mut deliver: D,
) where
    P: GatePolicy,
    W: FnMut(&LinkCursor<'_, P>) -> P::Signal,
    D: FnMut(&mut LinkCursor<'_, P>, P::Signal),
{
    let mut scan = WeightScan::new();
    let mut links = gate.links();
    while let Some(link) = links.next_link() {
        scan.observe(link.position(), weight(&link));
    }

    let mut split = scan.split(feedback);
    let mut links = gate.links();
    while let Some(mut link) = links.next_link() {
        let relevant = weight(&link);
        if let Some(share) = split.share(link.position(), relevant) {
            link.emit_feedback(share);
            deliver(&mut link, share);
        }
    }

    if let Some(position) = split.heaviest() {
        if let Some(mut link) = gate.link_at(position) {
            let share = split.remainder();
            link.emit_feedback(share);
            deliver(&mut link, share);
        }
    }
}

/// Two independent link weights, one per possible input bit
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WeightPair<T> {
    /// Weight added when the input bit is 0
    pub weight_0: T,
    /// Weight added when the input bit is 1
    pub weight_1: T,
}

impl<T: Copy> WeightPair<T> {
    pub const fn new(weight_0: T, weight_1: T) -> Self {
        Self { weight_0, weight_1 }
    }

    /// Weight bound to the given input bit
    #[inline]
    pub fn select(&self, input: bool) -> T {
        if input {
            self.weight_1
        } else {
            self.weight_0
        }
    }

    #[inline]
    pub fn select_mut(&mut self, input: bool) -> &mut T {
        if input {
            &mut self.weight_1
        } else {
            &mut self.weight_0
        }
    }
}
