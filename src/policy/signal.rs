//! Feedback signals - the scalar credit/blame carried by backward passes
//!
//! Integer policies carry `i32`, floating policies carry `f32`. Both go
//! through the same conservation arithmetic, so the few operations it needs
//! are collected in [`FeedbackSignal`].

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Sub};

/// Scalar feedback value
pub trait FeedbackSignal:
    Copy + Default + Debug + PartialEq + PartialOrd + Add<Output = Self> + Sub<Output = Self> + AddAssign
{
    /// No feedback
    const ZERO: Self;

    /// Convert an integer reward/penalty into this signal type
    fn from_i32(value: i32) -> Self;

    /// Absolute value
    fn magnitude(self) -> Self;

    /// Proportional share `total * weight / weight_sum`, rounded to the
    /// signal's precision. `weight` keeps its sign; `weight_sum` is positive.
    fn share(total: Self, weight: Self, weight_sum: Self) -> Self;

    /// Mailbox accumulation (saturating for integers)
    fn accumulate(self, other: Self) -> Self;

    /// Subtraction (saturating for integers)
    fn deduct(self, other: Self) -> Self;

    /// Magnitude as counter units (saturating, rounded)
    fn counter_units(self) -> u32;

    #[inline]
    fn is_reward(self) -> bool {
        self > Self::ZERO
    }

    #[inline]
    fn is_penalty(self) -> bool {
        self < Self::ZERO
    }
}

impl FeedbackSignal for i32 {
    const ZERO: Self = 0;

    #[inline]
    fn from_i32(value: i32) -> Self {
        value
    }

    #[inline]
    fn magnitude(self) -> Self {
        self.saturating_abs()
    }

    #[inline]
    fn share(total: Self, weight: Self, weight_sum: Self) -> Self {
        let numerator = total as i64 * weight as i64;
        let denominator = weight_sum as i64;
        // Round half away from zero
        let half = denominator / 2;
        let rounded = if numerator >= 0 {
            (numerator + half) / denominator
        } else {
            (numerator - half) / denominator
        };
        rounded.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    #[inline]
    fn accumulate(self, other: Self) -> Self {
        self.saturating_add(other)
    }

    #[inline]
    fn deduct(self, other: Self) -> Self {
        self.saturating_sub(other)
    }

    #[inline]
    fn counter_units(self) -> u32 {
        self.unsigned_abs()
    }
}

impl FeedbackSignal for f32 {
    const ZERO: Self = 0.0;

    #[inline]
    fn from_i32(value: i32) -> Self {
        value as f32
    }

    #[inline]
    fn magnitude(self) -> Self {
        self.abs()
    }

    #[inline]
    fn share(total: Self, weight: Self, weight_sum: Self) -> Self {
        total * (weight / weight_sum)
    }

    #[inline]
    fn accumulate(self, other: Self) -> Self {
        self + other
    }

    #[inline]
    fn deduct(self, other: Self) -> Self {
        self - other
    }

    #[inline]
    fn counter_units(self) -> u32 {
        // `as` saturates on overflow and maps NaN to 0
        self.abs().round() as u32
    }
}

/// Single-slot feedback accumulator held in a gate's statistics
///
/// Writers `post` into it during backward passes of later pages; the owning
/// gate `drain`s it when its own backward pass runs.
pub trait FeedbackMailbox {
    type Signal: FeedbackSignal;

    /// Add a signal to the pending total
    fn post(&mut self, signal: Self::Signal);

    /// Read the pending total and reset it to zero
    fn drain(&mut self) -> Self::Signal;

    /// Pending total without draining
    fn pending(&self) -> Self::Signal;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_share_rounds_half_away_from_zero() {
        assert_eq!(i32::share(10, 1, 3), 3); // 3.33
        assert_eq!(i32::share(10, 2, 3), 7); // 6.67
        assert_eq!(i32::share(3, 1, 2), 2); // 1.5
        assert_eq!(i32::share(-3, 1, 2), -2); // -1.5
        assert_eq!(i32::share(-10, 1, 3), -3);
    }

    #[test]
    fn test_integer_share_no_overflow() {
        assert_eq!(i32::share(i32::MAX, 1000, 1000), i32::MAX);
        assert_eq!(i32::share(i32::MIN, 1, 2), i32::MIN / 2);
    }

    #[test]
    fn test_accumulate_saturates() {
        assert_eq!(i32::MAX.accumulate(5), i32::MAX);
        assert_eq!(1.5f32.accumulate(2.0), 3.5);
        assert_eq!(i32::MIN.deduct(1), i32::MIN);
        assert_eq!(i32::share(-10, -1, 3), 3);
    }

    #[test]
    fn test_counter_units() {
        assert_eq!((-7i32).counter_units(), 7);
        assert_eq!(i32::MIN.counter_units(), 2_147_483_648);
        assert_eq!((-2.6f32).counter_units(), 3);
        assert_eq!(f32::NAN.counter_units(), 0);
    }

    #[test]
    fn test_reward_penalty() {
        assert!(5i32.is_reward());
        assert!((-1.0f32).is_penalty());
        assert!(!0i32.is_reward() && !0i32.is_penalty());
    }
}
