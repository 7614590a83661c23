//! Reward/penalty counters
//!
//! Gate counters are keyed by the gate's own state, link counters by the
//! (gate state, link input) pair:
//!
//! - `r{x}` / `p{x}`: reward / penalty received while the gate sat at `x`
//! - `r{x}_i{y}` / `p{x}_i{y}`: same, with the link's input at `y`
//!
//! Counters only grow (saturating) until [`halve`](GateCounters::halve)
//! decays them.

/// Per-gate reward/penalty counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GateCounters {
    pub r0: u32,
    pub r1: u32,
    pub p0: u32,
    pub p1: u32,
}

impl GateCounters {
    /// Record `units` of reward (`rewarded`) or penalty at gate state `state`
    #[inline]
    pub fn add(&mut self, state: bool, rewarded: bool, units: u32) {
        let slot = match (state, rewarded) {
            (false, true) => &mut self.r0,
            (true, true) => &mut self.r1,
            (false, false) => &mut self.p0,
            (true, false) => &mut self.p1,
        };
        *slot = slot.saturating_add(units);
    }

    /// Total reward at either state
    #[inline]
    pub fn rewards(&self) -> u64 {
        self.r0 as u64 + self.r1 as u64
    }

    /// Total penalty at either state
    #[inline]
    pub fn penalties(&self) -> u64 {
        self.p0 as u64 + self.p1 as u64
    }

    /// Halve every counter (floor)
    pub fn halve(&mut self) {
        self.r0 >>= 1;
        self.r1 >>= 1;
        self.p0 >>= 1;
        self.p1 >>= 1;
    }
}

/// Per-link reward/penalty counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkCounters {
    pub r0_i0: u32,
    pub r0_i1: u32,
    pub r1_i0: u32,
    pub r1_i1: u32,
    pub p0_i0: u32,
    pub p0_i1: u32,
    pub p1_i0: u32,
    pub p1_i1: u32,
}

impl LinkCounters {
    /// Record `units` at (gate state, link input)
    #[inline]
    pub fn add(&mut self, state: bool, input: bool, rewarded: bool, units: u32) {
        let slot = match (rewarded, state, input) {
            (true, false, false) => &mut self.r0_i0,
            (true, false, true) => &mut self.r0_i1,
            (true, true, false) => &mut self.r1_i0,
            (true, true, true) => &mut self.r1_i1,
            (false, false, false) => &mut self.p0_i0,
            (false, false, true) => &mut self.p0_i1,
            (false, true, false) => &mut self.p1_i0,
            (false, true, true) => &mut self.p1_i1,
        };
        *slot = slot.saturating_add(units);
    }

    pub fn rewards(&self) -> u64 {
        [self.r0_i0, self.r0_i1, self.r1_i0, self.r1_i1]
            .iter()
            .map(|&c| c as u64)
            .sum()
    }

    pub fn penalties(&self) -> u64 {
        [self.p0_i0, self.p0_i1, self.p1_i0, self.p1_i1]
            .iter()
            .map(|&c| c as u64)
            .sum()
    }

    /// Halve every counter (floor)
    pub fn halve(&mut self) {
        self.r0_i0 >>= 1;
        self.r0_i1 >>= 1;
        self.r1_i0 >>= 1;
        self.r1_i1 >>= 1;
        self.p0_i0 >>= 1;
        self.p0_i1 >>= 1;
        self.p1_i0 >>= 1;
        self.p1_i1 >>= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_counters_keyed_by_state() {
        let mut c = GateCounters::default();
        c.add(false, true, 5);
        c.add(true, true, 7);
        c.add(false, false, 11);
        c.add(true, false, 13);
        assert_eq!((c.r0, c.r1, c.p0, c.p1), (5, 7, 11, 13));
        assert_eq!(c.rewards(), 12);
        assert_eq!(c.penalties(), 24);
    }

    #[test]
    fn test_link_counters_keyed_by_pair() {
        let mut c = LinkCounters::default();
        c.add(true, false, true, 3);
        c.add(false, true, false, 4);
        assert_eq!(c.r1_i0, 3);
        assert_eq!(c.p0_i1, 4);
        assert_eq!(c.rewards(), 3);
        assert_eq!(c.penalties(), 4);
    }

    #[test]
    fn test_halve_floors() {
        let mut c = GateCounters { r0: 9, r1: 1, p0: 100_001, p1: 0 };
        c.halve();
        assert_eq!(c, GateCounters { r0: 4, r1: 0, p0: 50_000, p1: 0 });

        let mut l = LinkCounters { p1_i1: 7, r0_i0: 2, ..Default::default() };
        l.halve();
        assert_eq!(l.p1_i1, 3);
        assert_eq!(l.r0_i0, 1);
    }

    #[test]
    fn test_saturation() {
        let mut c = GateCounters { p1: u32::MAX - 1, ..Default::default() };
        c.add(true, false, 10);
        assert_eq!(c.p1, u32::MAX);
        assert_eq!(c.penalties(), u32::MAX as u64);
    }
}
