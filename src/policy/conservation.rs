//! Feedback conservation - split a gate's feedback across its links exactly
//!
//! Given feedback `F` and the weights `w_k` bound to each link's present
//! input bit, with `S = Σ|w_k|`:
//!
//! 1. every link gets the provisional share `round(F · w_k / S)`, so a link
//!    with a negative weight receives feedback of the opposite sign
//! 2. the link with the largest `|w_k|` (first on ties) absorbs the residual
//!    `F - Σ shares`
//!
//! so that `Σ shares == F` on every pass. When `S == 0` every provisional
//! share is zero and the heaviest link (the first one) receives all of `F`;
//! nothing divides by zero. Integer totals saturate instead of overflowing.
//!
//! The heaviest link's final share equals `F` minus the other links' shares,
//! so the split is driven in two sweeps over the links and never needs a
//! scratch buffer:
//!
//! ```ignore
//! let mut scan = WeightScan::new();
//! for (position, weight) in relevant_weights { scan.observe(position, weight); }
//! let mut split = scan.split(feedback);
//! for (position, weight) in relevant_weights {
//!     if let Some(share) = split.share(position, weight) { emit(position, share); }
//! }
//! if let Some(heaviest) = split.heaviest() { emit(heaviest, split.remainder()); }
//! ```

use super::signal::FeedbackSignal;

/// First sweep: weight magnitude total and heaviest link
#[derive(Clone, Copy, Debug, Default)]
pub struct WeightScan<S> {
    sum: S,
    heaviest: Option<(usize, S)>,
}

impl<S: FeedbackSignal> WeightScan<S> {
    pub fn new() -> Self {
        Self {
            sum: S::ZERO,
            heaviest: None,
        }
    }

    /// Record the weight bound to the link at `position`
    #[inline]
    pub fn observe(&mut self, position: usize, weight: S) {
        let magnitude = weight.magnitude();
        self.sum = self.sum.accumulate(magnitude);
        match self.heaviest {
            Some((_, heaviest)) if heaviest >= magnitude => {}
            _ => self.heaviest = Some((position, magnitude)),
        }
    }

    /// `Σ|w_k|`
    pub fn weight_sum(&self) -> S {
        self.sum
    }

    /// Position of the largest-magnitude weight
    pub fn heaviest(&self) -> Option<usize> {
        self.heaviest.map(|(position, _)| position)
    }

    /// Start the dispatch sweep for `total` feedback
    pub fn split(self, total: S) -> FeedbackSplit<S> {
        FeedbackSplit {
            total,
            sum: self.sum,
            heaviest: self.heaviest(),
            dispatched: S::ZERO,
        }
    }
}

/// Second sweep: per-link shares, heaviest link deferred
#[derive(Clone, Copy, Debug)]
pub struct FeedbackSplit<S> {
    total: S,
    sum: S,
    heaviest: Option<usize>,
    dispatched: S,
}

impl<S: FeedbackSignal> FeedbackSplit<S> {
    /// Share for the link at `position`, or `None` for the heaviest link
    /// whose share is settled by [`remainder`](Self::remainder)
    #[inline]
    pub fn share(&mut self, position: usize, weight: S) -> Option<S> {
        if self.heaviest == Some(position) {
            return None;
        }
        let share = if self.sum == S::ZERO {
            S::ZERO
        } else {
            S::share(self.total, weight, self.sum)
        };
        self.dispatched = self.dispatched.accumulate(share);
        Some(share)
    }

    /// Position of the link that absorbs the residual
    pub fn heaviest(&self) -> Option<usize> {
        self.heaviest
    }

    /// Heaviest link's share: its provisional share plus the rounding residual
    pub fn remainder(&self) -> S {
        self.total.deduct(self.dispatched)
    }

    /// Feedback being split
    pub fn total(&self) -> S {
        self.total
    }
}

/// Split `total` across `weights` (indexed by position), conserving the sum
pub fn split_feedback<S: FeedbackSignal>(total: S, weights: &[S]) -> Vec<S> {
    let mut scan = WeightScan::new();
    for (position, &weight) in weights.iter().enumerate() {
        scan.observe(position, weight);
    }
    let mut split = scan.split(total);
    let mut shares: Vec<S> = weights
        .iter()
        .enumerate()
        .map(|(position, &weight)| split.share(position, weight).unwrap_or(S::ZERO))
        .collect();
    if let Some(heaviest) = split.heaviest() {
        shares[heaviest] = split.remainder();
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_i32(v: &[i32]) -> i32 {
        v.iter().sum()
    }

    #[test]
    fn test_exact_split() {
        let shares = split_feedback(100, &[10, -30, 60]);
        assert_eq!(shares, vec![10, -30, 120]);
        assert_eq!(sum_i32(&shares), 100);
    }

    #[test]
    fn test_residual_goes_to_heaviest() {
        // 10/3 each rounds to 3, residual 1 lands on the first (tie) heaviest
        let shares = split_feedback(10, &[5, 5, 5]);
        assert_eq!(shares, vec![4, 3, 3]);
        assert_eq!(sum_i32(&shares), 10);

        let shares = split_feedback(10, &[1, 7, -1]);
        assert_eq!(sum_i32(&shares), 10);
        assert_eq!(shares[0], 1);
        assert_eq!(shares[2], -1);
        assert_eq!(shares[1], 10);
    }

    #[test]
    fn test_conservation_positive_and_negative() {
        let weight_sets: [&[i32]; 5] = [
            &[3, 7, 11, -13, 2],
            &[1, 1, 1, 1, 1, 1, 1],
            &[-100, 1, 1],
            &[32767, -32767, 5],
            &[0, 9, 0, 4],
        ];
        for weights in weight_sets {
            for total in [1, -1, 7, -7, 10_000, -10_000, 99_991, -123_457] {
                let shares = split_feedback(total, weights);
                assert_eq!(sum_i32(&shares), total, "F={} w={:?}", total, weights);
            }
        }
    }

    #[test]
    fn test_shares_follow_weight_sign() {
        let shares = split_feedback(-90, &[10, -20, 60]);
        assert_eq!(shares, vec![-10, 20, -100]);

        let shares = split_feedback(100, &[10, -30, 60]);
        assert!(shares[1] < 0, "negative weight got share {}", shares[1]);
    }

    #[test]
    fn test_extreme_weights_saturate() {
        let shares = split_feedback(1, &[i32::MAX, 1]);
        assert_eq!(shares, vec![1, 0]);

        let shares = split_feedback(i32::MIN, &[i32::MIN, i32::MAX, 3]);
        assert_eq!(shares, vec![0, i32::MIN, -3]);

        let mut scan = WeightScan::new();
        scan.observe(1, i32::MAX);
        scan.observe(2, i32::MIN);
        assert_eq!(scan.weight_sum(), i32::MAX);
    }

    #[test]
    fn test_zero_weights_no_division() {
        let shares = split_feedback(50, &[0, 0, 0]);
        assert_eq!(shares, vec![50, 0, 0]);

        let shares = split_feedback(-50, &[0, 0]);
        assert_eq!(sum_i32(&shares), -50);
    }

    #[test]
    fn test_zero_feedback() {
        assert_eq!(split_feedback(0, &[4, -2, 9]), vec![0, 0, 0]);
    }

    #[test]
    fn test_empty_links() {
        assert!(split_feedback(10, &[] as &[i32]).is_empty());
    }

    #[test]
    fn test_float_conservation() {
        let weights = [0.3f32, -1.7, 2.9, 0.0, 4.1];
        for total in [1.0f32, -3.5, 10_000.0, -0.001] {
            let shares = split_feedback(total, &weights);
            let sum: f32 = shares.iter().sum();
            assert!(
                (sum - total).abs() <= total.abs() * 1e-5,
                "F={} sum={}",
                total,
                sum
            );
        }
    }

    #[test]
    fn test_float_exact_on_representable_values() {
        let shares = split_feedback(8.0f32, &[1.0, 3.0, 4.0]);
        assert_eq!(shares, vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn test_scan_heaviest_first_on_ties() {
        let mut scan = WeightScan::new();
        scan.observe(3, -9);
        scan.observe(4, 9);
        scan.observe(5, 2);
        assert_eq!(scan.heaviest(), Some(3));
        assert_eq!(scan.weight_sum(), 20);
    }
}
