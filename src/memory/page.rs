//! Pages - fixed-capacity allocation units of the arena
//!
//! A [`DescriptorPage`] is the allocation blueprint: sizing plus freshly
//! allocated value/statistics slots. [`Page`] adopts those slots, allocates
//! its own link table and state bits, and owns them for the arena's lifetime.

use super::address::GateAddress;
use super::bits::{state_bytes, StateBits};
use super::slots::SlotArray;
use crate::policy::{FeedbackMailbox, GatePolicy};

/// Value slots for a policy
pub type ValueSlots<P> = SlotArray<<P as GatePolicy>::GateParam, <P as GatePolicy>::LinkParam>;
/// Statistics slots for a policy
pub type StatsSlots<P> = SlotArray<<P as GatePolicy>::GateStats, <P as GatePolicy>::LinkStats>;

/// Allocation blueprint for one page
#[derive(Debug)]
pub struct DescriptorPage<P: GatePolicy> {
    pub index: usize,
    pub gates_count: usize,
    /// 1 (gate slot) + links per gate
    pub gates_width: usize,
    /// `gates_count * gates_width`
    pub params_count: usize,
    /// `ceil(gates_count / 8)`
    pub gates_bytes: usize,
    values: Option<ValueSlots<P>>,
    stats: Option<StatsSlots<P>>,
}

impl<P: GatePolicy> DescriptorPage<P> {
    pub fn new(index: usize, gates_count: usize, gates_width: usize) -> Self {
        Self {
            index,
            gates_count,
            gates_width,
            params_count: gates_count * gates_width,
            gates_bytes: state_bytes(gates_count),
            values: Some(SlotArray::new(gates_count, gates_width)),
            stats: Some(SlotArray::new(gates_count, gates_width)),
        }
    }

    /// Whether a page already took ownership of the slot arrays
    pub fn is_adopted(&self) -> bool {
        self.values.is_none()
    }

    /// Bytes allocated for the value and statistics slots
    pub fn byte_size(&self) -> usize {
        self.values.as_ref().map_or(0, |v| v.byte_size())
            + self.stats.as_ref().map_or(0, |s| s.byte_size())
    }

    fn adopt(&mut self) -> Option<(ValueSlots<P>, StatsSlots<P>)> {
        Some((self.values.take()?, self.stats.take()?))
    }
}

/// One page of gates
#[derive(Debug)]
pub struct Page<P: GatePolicy> {
    pub(crate) page_index: usize,
    pub(crate) gates_count: usize,
    pub(crate) gates_width: usize,
    /// Source of each slot; empty when the page has no links
    pub(crate) links: Vec<GateAddress>,
    pub(crate) states: StateBits,
    pub(crate) values: ValueSlots<P>,
    pub(crate) stats: StatsSlots<P>,
}

impl<P: GatePolicy> Page<P> {
    /// Build a page from its descriptor, taking over its slot arrays
    ///
    /// Returns `None` when the descriptor's arrays were already adopted.
    pub(crate) fn from_descriptor(page_index: usize, descriptor: &mut DescriptorPage<P>) -> Option<Self> {
        let (values, stats) = descriptor.adopt()?;
        let gates_count = descriptor.gates_count;
        let gates_width = descriptor.gates_width;

        // Every slot starts out pointing at its own gate; binders overwrite
        // the input positions and the last position stays the bias link.
        let links = if gates_width > 1 {
            (0..gates_count)
                .flat_map(|gate| {
                    std::iter::repeat(GateAddress::new(page_index as u32, gate as u32))
                        .take(gates_width)
                })
                .collect()
        } else {
            Vec::new()
        };

        Some(Self {
            page_index,
            gates_count,
            gates_width,
            links,
            states: StateBits::new(gates_count),
            values,
            stats,
        })
    }

    #[inline]
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    #[inline]
    pub fn gates_count(&self) -> usize {
        self.gates_count
    }

    #[inline]
    pub fn gates_width(&self) -> usize {
        self.gates_width
    }

    /// Pages without links (raw inputs) are skipped by every pass
    #[inline]
    pub fn has_links(&self) -> bool {
        !self.links.is_empty()
    }

    /// Flat parameter index of a gate's block
    #[inline]
    pub fn gate_param_index(&self, gate_index: usize) -> usize {
        self.gates_width * gate_index
    }

    #[inline]
    pub fn get_state(&self, gate_index: usize) -> bool {
        self.states.get(gate_index)
    }

    #[inline]
    pub fn set_state(&mut self, gate_index: usize, value: bool) {
        self.states.set(gate_index, value);
    }

    pub fn states(&self) -> &StateBits {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut StateBits {
        &mut self.states
    }

    /// Post feedback into a gate's mailbox
    #[inline]
    pub fn emit_feedback(&mut self, gate_index: usize, signal: P::Signal) {
        let index = self.gate_param_index(gate_index);
        self.stats.gate_mut(index).post(signal);
    }

    /// Link table of one gate (positions 0..width; position 0 is unused)
    pub fn gate_links(&self, gate_index: usize) -> &[GateAddress] {
        if self.links.is_empty() {
            return &[];
        }
        let start = self.gate_param_index(gate_index);
        &self.links[start..start + self.gates_width]
    }

    pub fn gate_param(&self, gate_index: usize) -> &P::GateParam {
        self.values.gate(self.gate_param_index(gate_index))
    }

    pub fn gate_stats(&self, gate_index: usize) -> &P::GateStats {
        self.stats.gate(self.gate_param_index(gate_index))
    }

    pub fn values(&self) -> &ValueSlots<P> {
        &self.values
    }

    pub fn stats(&self) -> &StatsSlots<P> {
        &self.stats
    }

    /// Bytes held by this page's own allocations (links and states)
    pub(crate) fn own_byte_size(&self) -> usize {
        self.links.len() * std::mem::size_of::<GateAddress>() + self.states.as_bytes().len()
    }
}
