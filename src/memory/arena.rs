//! BitGateMemory - the paged arena and its pass orchestration
//!
//! Built once per topology:
//!
//! 1. `create_descriptor` / `create_page` for every page, ascending
//! 2. `set_link` for every input link (binders)
//! 3. `verify_wiring`, then `initialize`
//!
//! after which the passes run over the whole arena:
//!
//! - `compute_forward`: pages ascending, so every source is already fresh
//! - `compute_backward`, `mutate_forward`, `mutate_backward`: pages
//!   descending, so every mailbox has received all its posts before its
//!   owner drains it
//!
//! Pages without links are skipped by every pass. Wiring is validated once
//! at build time; the passes themselves never check addresses.

use std::ops::Range;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::address::GateAddress;
use super::bits::StateBits;
use super::cursor::GateCursor;
use super::page::{DescriptorPage, Page};
use crate::error::{BitGateError, Result};
use crate::policy::GatePolicy;

/// Allocation bookkeeping
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Bytes allocated for slots, links and states
    pub used_memory: usize,
    /// Parameter slots across all descriptors
    pub params_count: usize,
    /// Incoming links across all pages
    pub links_count: usize,
    /// Gates across all pages
    pub gates_count: usize,
}

/// Paged gate arena driven by one policy
pub struct BitGateMemory<P: GatePolicy> {
    pages: Vec<Page<P>>,
    descriptors: Vec<DescriptorPage<P>>,
    policy: P,
    rng: StdRng,
    stats: MemoryStats,
}

impl<P: GatePolicy> BitGateMemory<P> {
    /// Empty arena with a seeded random source
    pub fn new(policy: P, seed: u64) -> Self {
        Self::with_rng(policy, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(policy: P, rng: StdRng) -> Self {
        Self {
            pages: Vec::new(),
            descriptors: Vec::new(),
            policy,
            rng,
            stats: MemoryStats::default(),
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn stats(&self) -> MemoryStats {
        self.stats
    }

    pub fn pages_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, page_index: usize) -> Option<&Page<P>> {
        self.pages.get(page_index)
    }

    pub fn pages(&self) -> &[Page<P>] {
        &self.pages
    }

    pub fn descriptor(&self, index: usize) -> Option<&DescriptorPage<P>> {
        self.descriptors.get(index)
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Allocate the slot arrays for one page
    ///
    /// Descriptors are created in ascending index order.
    pub fn create_descriptor(&mut self, index: usize, gates_count: usize, gates_width: usize) -> Result<()> {
        if index != self.descriptors.len() {
            return Err(BitGateError::Build(format!(
                "descriptor {} created out of order (expected {})",
                index,
                self.descriptors.len()
            )));
        }
        if gates_count == 0 || gates_width == 0 {
            return Err(BitGateError::Build(format!(
                "descriptor {} needs at least one gate and one slot per gate (got {}x{})",
                index, gates_count, gates_width
            )));
        }
        if gates_count > u32::MAX as usize {
            return Err(BitGateError::Build(format!(
                "descriptor {} holds {} gates, more than a page can address",
                index, gates_count
            )));
        }

        let descriptor = DescriptorPage::new(index, gates_count, gates_width);
        self.stats.params_count += descriptor.params_count;
        self.stats.used_memory += descriptor.byte_size();
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Create a page that adopts a descriptor's slot arrays
    ///
    /// Pages are created in ascending index order; a descriptor can be
    /// adopted once.
    pub fn create_page(&mut self, page_index: usize, descriptor_index: usize) -> Result<()> {
        if page_index != self.pages.len() {
            return Err(BitGateError::Build(format!(
                "page {} created out of order (expected {})",
                page_index,
                self.pages.len()
            )));
        }
        let descriptor = self.descriptors.get_mut(descriptor_index).ok_or_else(|| {
            BitGateError::Addressing(format!("descriptor {} does not exist", descriptor_index))
        })?;
        let page = Page::from_descriptor(page_index, descriptor).ok_or_else(|| {
            BitGateError::Build(format!("descriptor {} already adopted", descriptor_index))
        })?;

        self.stats.used_memory += page.own_byte_size();
        self.stats.gates_count += page.gates_count;
        self.stats.links_count += page.gates_count * (page.gates_width - 1);
        self.pages.push(page);
        Ok(())
    }

    fn check_address(&self, address: GateAddress) -> Result<&Page<P>> {
        let page = self.pages.get(address.page()).ok_or_else(|| {
            BitGateError::Addressing(format!("page {} does not exist", address.page_index))
        })?;
        if address.gate() >= page.gates_count {
            return Err(BitGateError::Addressing(format!(
                "gate {} out of range (page {} holds {} gates)",
                address, address.page_index, page.gates_count
            )));
        }
        Ok(page)
    }

    fn check_link(&self, gate: GateAddress, position: usize, source: GateAddress) -> Result<()> {
        let page = self.check_address(gate)?;
        if !page.has_links() || position == 0 || position >= page.gates_width {
            return Err(BitGateError::Addressing(format!(
                "link position {} out of range for gate {} (width {})",
                position, gate, page.gates_width
            )));
        }
        self.check_address(source)?;
        if !gate.may_read_from(&source) {
            return Err(BitGateError::ForwardOrder {
                consumer: gate,
                upstream: source,
            });
        }
        Ok(())
    }

    /// Wire `source` into link `position` (1..width) of `gate`
    ///
    /// Rejects out-of-range addresses and sources in later pages.
    pub fn set_link(&mut self, gate: GateAddress, position: usize, source: GateAddress) -> Result<()> {
        self.check_link(gate, position, source)?;
        let page = &mut self.pages[gate.page()];
        let index = page.gate_param_index(gate.gate()) + position;
        page.links[index] = source;
        Ok(())
    }

    /// Source wired into link `position` of `gate`
    pub fn link(&self, gate: GateAddress, position: usize) -> Option<GateAddress> {
        let page = self.pages.get(gate.page())?;
        if gate.gate() >= page.gates_count || position == 0 {
            return None;
        }
        page.gate_links(gate.gate()).get(position).copied()
    }

    /// Check every link before the first pass
    ///
    /// Every source must exist and live in the same or an earlier page, and
    /// each gate's last link (the bias) must point back at the gate itself.
    pub fn verify_wiring(&self) -> Result<()> {
        for page in self.pages.iter().filter(|p| p.has_links()) {
            for gate_index in 0..page.gates_count {
                let gate = GateAddress::new(page.page_index as u32, gate_index as u32);
                let links = page.gate_links(gate_index);
                for (position, &source) in links.iter().enumerate().skip(1) {
                    self.check_link(gate, position, source)?;
                }
                let bias = links[page.gates_width - 1];
                if bias != gate {
                    return Err(BitGateError::Build(format!(
                        "bias link of gate {} points to {}",
                        gate, bias
                    )));
                }
            }
        }
        log::debug!(
            "Verified wiring: {} pages, {} gates, {} links",
            self.pages.len(),
            self.stats.gates_count,
            self.stats.links_count
        );
        Ok(())
    }

    // =========================================================================
    // Passes
    // =========================================================================

    fn run_pass<F>(&mut self, descending: bool, mut pass: F)
    where
        F: FnMut(&P, &mut GateCursor<'_, P>, &mut StdRng),
    {
        let Self {
            pages, policy, rng, ..
        } = self;
        let count = pages.len();
        for step in 0..count {
            let page_index = if descending { count - 1 - step } else { step };
            if !pages[page_index].has_links() {
                continue;
            }
            for gate_index in 0..pages[page_index].gates_count {
                let mut cursor = GateCursor::new(pages.as_mut_slice(), page_index, gate_index);
                pass(&*policy, &mut cursor, &mut *rng);
            }
        }
    }

    /// Set every gate's initial parameters
    pub fn initialize(&mut self) {
        self.run_pass(false, |policy, gate, rng| policy.initialize(gate, rng));
    }

    pub fn compute_forward(&mut self) {
        self.run_pass(false, |policy, gate, _| policy.compute_forward(gate));
    }

    pub fn compute_backward(&mut self) {
        self.run_pass(true, |policy, gate, _| policy.compute_backward(gate));
    }

    pub fn mutate_forward(&mut self) {
        self.run_pass(true, |policy, gate, rng| policy.mutate_forward(gate, rng));
    }

    pub fn mutate_backward(&mut self) {
        self.run_pass(true, |policy, gate, rng| policy.mutate_backward(gate, rng));
    }

    // =========================================================================
    // Gate access
    // =========================================================================

    /// Cursor over any gate, for inspection and direct edits
    pub fn cursor(&mut self, address: GateAddress) -> Result<GateCursor<'_, P>> {
        self.check_address(address)?;
        Ok(GateCursor::new(
            self.pages.as_mut_slice(),
            address.page(),
            address.gate(),
        ))
    }

    /// Gate state; panics on an address outside the arena
    #[inline]
    pub fn get_state(&self, address: GateAddress) -> bool {
        self.pages[address.page()].get_state(address.gate())
    }

    #[inline]
    pub fn set_state(&mut self, address: GateAddress, value: bool) {
        self.pages[address.page()].set_state(address.gate(), value);
    }

    /// Post feedback into a gate's mailbox
    #[inline]
    pub fn emit_feedback(&mut self, address: GateAddress, signal: P::Signal) {
        self.pages[address.page()].emit_feedback(address.gate(), signal);
    }

    // =========================================================================
    // Bulk I/O over page ranges
    // =========================================================================

    fn range_gates(&self, pages: &Range<usize>) -> Result<usize> {
        if pages.start > pages.end || pages.end > self.pages.len() {
            return Err(BitGateError::Addressing(format!(
                "page range {:?} outside arena of {} pages",
                pages,
                self.pages.len()
            )));
        }
        Ok(self.pages[pages.clone()].iter().map(|p| p.gates_count).sum())
    }

    /// Load packed state bits into a page range, gate order, LSB first
    pub fn write_packed_states(&mut self, pages: Range<usize>, bytes: &[u8]) -> Result<()> {
        let gates = self.range_gates(&pages)?;
        let expected = super::bits::state_bytes(gates);
        if bytes.len() != expected {
            return Err(BitGateError::ShapeMismatch {
                expected: vec![expected],
                actual: vec![bytes.len()],
            });
        }
        let mut offset = 0;
        for page in &mut self.pages[pages] {
            page.states.load_packed(bytes, offset);
            offset += page.gates_count;
        }
        Ok(())
    }

    /// Pack a page range's state bits, gate order, LSB first
    pub fn read_packed_states(&self, pages: Range<usize>) -> Result<Vec<u8>> {
        let gates = self.range_gates(&pages)?;
        let mut bytes = vec![0u8; super::bits::state_bytes(gates)];
        let mut offset = 0;
        for page in &self.pages[pages] {
            page.states.store_packed(&mut bytes, offset);
            offset += page.gates_count;
        }
        Ok(bytes)
    }

    /// Write one state per gate across a page range
    pub fn write_states(&mut self, pages: Range<usize>, states: &[bool]) -> Result<()> {
        let gates = self.range_gates(&pages)?;
        if states.len() != gates {
            return Err(BitGateError::ShapeMismatch {
                expected: vec![gates],
                actual: vec![states.len()],
            });
        }
        let mut values = states.iter().copied();
        for page in &mut self.pages[pages] {
            for (gate_index, value) in (0..page.gates_count).zip(&mut values) {
                page.set_state(gate_index, value);
            }
        }
        Ok(())
    }

    /// Read one state per gate across a page range
    pub fn read_states(&self, pages: Range<usize>) -> Result<Vec<bool>> {
        self.range_gates(&pages)?;
        Ok(self.pages[pages]
            .iter()
            .flat_map(|page| page.states().iter())
            .collect())
    }

    /// Post one feedback value per gate across a page range
    pub fn emit_feedback_range(&mut self, pages: Range<usize>, signals: &[P::Signal]) -> Result<()> {
        let gates = self.range_gates(&pages)?;
        if signals.len() != gates {
            return Err(BitGateError::ShapeMismatch {
                expected: vec![gates],
                actual: vec![signals.len()],
            });
        }
        let mut values = signals.iter().copied();
        for page in &mut self.pages[pages] {
            for (gate_index, signal) in (0..page.gates_count).zip(&mut values) {
                page.emit_feedback(gate_index, signal);
            }
        }
        Ok(())
    }

    /// State bits of one page
    pub fn page_states(&self, page_index: usize) -> Option<&StateBits> {
        self.pages.get(page_index).map(|p| p.states())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{FeedbackMailbox, StatsPolicy, WeightPair};

    fn memory() -> BitGateMemory<StatsPolicy> {
        BitGateMemory::new(StatsPolicy::new().with_threshold(0), 1)
    }

    fn chain(inputs: usize, layers: usize) -> BitGateMemory<StatsPolicy> {
        seeded_chain(1, inputs, layers)
    }

    /// Input page of `inputs` gates, then `layers` single-gate pages each
    /// reading the whole previous page
    fn seeded_chain(seed: u64, inputs: usize, layers: usize) -> BitGateMemory<StatsPolicy> {
        let mut memory = BitGateMemory::new(StatsPolicy::new().with_threshold(0), seed);
        memory.create_descriptor(0, inputs, 1).unwrap();
        memory.create_page(0, 0).unwrap();
        let mut previous = inputs;
        for page in 1..=layers {
            memory.create_descriptor(page, 1, previous + 2).unwrap();
            memory.create_page(page, page).unwrap();
            let gate = GateAddress::new(page as u32, 0);
            for position in 1..=previous {
                let source = GateAddress::new(page as u32 - 1, position as u32 - 1);
                memory.set_link(gate, position, source).unwrap();
            }
            previous = 1;
        }
        memory.verify_wiring().unwrap();
        memory.initialize();
        memory
    }

    fn set_all_weights(
        memory: &mut BitGateMemory<StatsPolicy>,
        pair: WeightPair<i16>,
        bias: WeightPair<i16>,
    ) {
        for page in 1..memory.pages_count() {
            let mut gate = memory.cursor(GateAddress::new(page as u32, 0)).unwrap();
            let mut links = gate.links();
            while let Some(mut link) = links.next_link() {
                *link.param_mut() = if link.is_bias() { bias } else { pair };
            }
        }
    }

    #[test]
    fn test_descriptor_sizing() {
        let mut memory = memory();
        memory.create_descriptor(0, 13, 5).unwrap();
        let descriptor = memory.descriptor(0).unwrap();
        assert_eq!(descriptor.params_count, 65);
        assert_eq!(descriptor.gates_bytes, 2);
        assert_eq!(memory.stats().params_count, 65);
    }

    #[test]
    fn test_page_adopts_descriptor() {
        let mut memory = memory();
        memory.create_descriptor(0, 13, 5).unwrap();
        memory.create_page(0, 0).unwrap();

        assert!(memory.descriptor(0).unwrap().is_adopted());
        let page = memory.page(0).unwrap();
        assert_eq!(page.values().len(), 65);
        assert_eq!(page.stats().len(), 65);
        assert_eq!(page.links.len(), 65);
        assert_eq!(page.states().as_bytes().len(), 2);

        let stats = memory.stats();
        assert_eq!(stats.gates_count, 13);
        assert_eq!(stats.links_count, 52);
        assert!(stats.used_memory > 0);

        let err = memory.create_page(1, 0).unwrap_err();
        assert!(matches!(err, BitGateError::Build(_)));
    }

    #[test]
    fn test_input_page_has_no_links() {
        let mut memory = memory();
        memory.create_descriptor(0, 9, 1).unwrap();
        memory.create_page(0, 0).unwrap();
        let page = memory.page(0).unwrap();
        assert!(!page.has_links());
        assert_eq!(memory.stats().links_count, 0);
    }

    #[test]
    fn test_out_of_order_build_rejected() {
        let mut memory = memory();
        assert!(matches!(
            memory.create_descriptor(1, 4, 2),
            Err(BitGateError::Build(_))
        ));
        memory.create_descriptor(0, 4, 2).unwrap();
        assert!(matches!(memory.create_page(1, 0), Err(BitGateError::Build(_))));
        assert!(matches!(
            memory.create_page(0, 3),
            Err(BitGateError::Addressing(_))
        ));
    }

    #[test]
    fn test_link_to_later_page_rejected() {
        let mut memory = memory();
        memory.create_descriptor(0, 2, 3).unwrap();
        memory.create_page(0, 0).unwrap();
        memory.create_descriptor(1, 2, 1).unwrap();
        memory.create_page(1, 1).unwrap();

        let consumer = GateAddress::new(0, 0);
        let later = GateAddress::new(1, 1);
        let err = memory.set_link(consumer, 1, later).unwrap_err();
        match err {
            BitGateError::ForwardOrder { consumer: c, upstream } => {
                assert_eq!(c, consumer);
                assert_eq!(upstream, later);
            }
            other => panic!("unexpected error: {}", other),
        }

        // Same page is allowed
        memory.set_link(consumer, 1, GateAddress::new(0, 1)).unwrap();
    }

    #[test]
    fn test_link_addressing_rejected() {
        let mut memory = chain(2, 1);
        let gate = GateAddress::new(1, 0);
        assert!(matches!(
            memory.set_link(gate, 0, GateAddress::new(0, 0)),
            Err(BitGateError::Addressing(_))
        ));
        assert!(matches!(
            memory.set_link(gate, 4, GateAddress::new(0, 0)),
            Err(BitGateError::Addressing(_))
        ));
        assert!(matches!(
            memory.set_link(gate, 1, GateAddress::new(0, 2)),
            Err(BitGateError::Addressing(_))
        ));
        assert!(matches!(
            memory.set_link(GateAddress::new(0, 0), 1, GateAddress::new(0, 1)),
            Err(BitGateError::Addressing(_))
        ));
        assert!(memory.cursor(GateAddress::new(5, 0)).is_err());
    }

    #[test]
    fn test_verify_wiring_checks_bias() {
        let mut memory = chain(2, 1);
        let gate = GateAddress::new(1, 0);
        assert_eq!(memory.link(gate, 3), Some(gate));
        memory.set_link(gate, 3, GateAddress::new(0, 0)).unwrap();
        assert!(matches!(memory.verify_wiring(), Err(BitGateError::Build(_))));
    }

    #[test]
    fn test_forward_runs_pages_in_order() {
        let mut memory = chain(1, 4);
        // weight_1 = 1, weight_0 = 0, silent bias: each gate copies its input
        set_all_weights(&mut memory, WeightPair::new(0, 1), WeightPair::new(0, 0));

        memory.set_state(GateAddress::new(0, 0), true);
        memory.compute_forward();
        for page in 1..=4u32 {
            assert!(memory.get_state(GateAddress::new(page, 0)), "page {}", page);
        }

        memory.set_state(GateAddress::new(0, 0), false);
        memory.compute_forward();
        for page in 1..=4u32 {
            assert!(!memory.get_state(GateAddress::new(page, 0)), "page {}", page);
        }
    }

    #[test]
    fn test_bias_input_is_constant() {
        let mut memory = chain(1, 1);
        let gate = GateAddress::new(1, 0);
        // Only the bias weight_1 can lift the accumulator above zero
        set_all_weights(&mut memory, WeightPair::new(0, 0), WeightPair::new(-7, 3));

        for own_state in [false, true] {
            memory.set_state(gate, own_state);
            let mut cursor = memory.cursor(gate).unwrap();
            let bias = cursor.bias().unwrap();
            assert!(bias.is_bias());
            assert!(bias.get());
            assert_eq!(bias.source(), gate);
            memory.compute_forward();
            assert!(memory.get_state(gate));
        }
    }

    #[test]
    fn test_forward_idempotent() {
        for seed in 0..10 {
            let mut memory = seeded_chain(seed, 5, 3);
            memory.write_states(0..1, &[true, false, true, true, false]).unwrap();
            memory.compute_forward();
            let first = memory.read_states(0..memory.pages_count()).unwrap();
            for _ in 0..5 {
                memory.compute_forward();
                assert_eq!(
                    memory.read_states(0..memory.pages_count()).unwrap(),
                    first,
                    "seed {}",
                    seed
                );
            }
        }
    }

    #[test]
    fn test_backward_chains_across_pages() {
        let mut memory = chain(1, 3);
        set_all_weights(&mut memory, WeightPair::new(4, 4), WeightPair::new(4, 4));
        memory.compute_forward();

        let last = GateAddress::new(3, 0);
        memory.emit_feedback(last, 800);
        memory.compute_backward();

        // Each gate splits evenly between its input and its bias
        let pending = |memory: &BitGateMemory<StatsPolicy>, page: usize| {
            memory.page(page).unwrap().gate_stats(0).pending()
        };
        assert_eq!(pending(&memory, 3), 400);
        assert_eq!(pending(&memory, 2), 200);
        assert_eq!(pending(&memory, 1), 100);
        assert_eq!(pending(&memory, 0), 100);
        // Everything injected is still accounted for
        let total: i32 = (0..4).map(|p| pending(&memory, p)).sum();
        assert_eq!(total, 800);
    }

    #[test]
    fn test_bulk_packed_io() {
        let mut memory = memory();
        for (index, gates) in [5usize, 6].into_iter().enumerate() {
            memory.create_descriptor(index, gates, 1).unwrap();
            memory.create_page(index, index).unwrap();
        }
        memory.write_packed_states(0..2, &[0b1010_1101, 0b0000_0110]).unwrap();
        assert_eq!(
            memory.read_states(0..1).unwrap(),
            vec![true, false, true, true, false]
        );
        assert_eq!(
            memory.read_states(1..2).unwrap(),
            vec![true, false, true, false, true, true]
        );
        assert_eq!(
            memory.read_packed_states(0..2).unwrap(),
            vec![0b1010_1101, 0b0000_0110]
        );

        assert!(matches!(
            memory.write_packed_states(0..2, &[0]),
            Err(BitGateError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            memory.read_states(1..3),
            Err(BitGateError::Addressing(_))
        ));
    }

    #[test]
    fn test_emit_feedback_range() {
        let mut memory = chain(3, 1);
        memory.emit_feedback_range(0..1, &[1, -2, 3]).unwrap();
        let page = memory.page(0).unwrap();
        assert_eq!(page.gate_stats(1).pending(), -2);
        assert!(matches!(
            memory.emit_feedback_range(0..1, &[1]),
            Err(BitGateError::ShapeMismatch { .. })
        ));
    }
}
