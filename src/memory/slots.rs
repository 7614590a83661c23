//! Parameter slot arrays - gate and link payloads under one flat index
//!
//! A page addresses its parameters by a flat index `gate * width + position`.
//! Position 0 of each block is the gate's own slot, positions 1..width are
//! its links. The role is implied by `index % width`, never stored:
//!
//! ```text
//! flat index:  0   1   2   3 | 4   5   6   7 | ...
//! role:        G   L   L   L | G   L   L   L
//! backing:    gates[0]  links[0..3] | gates[1]  links[3..6]
//! ```
//!
//! Gate and link payloads are different types per policy, so each role gets
//! its own backing vector and the flat index is translated on access.

/// Flat gate/link slot array for one page
#[derive(Clone, Debug)]
pub struct SlotArray<G, L> {
    width: usize,
    gates: Vec<G>,
    links: Vec<L>,
}

impl<G: Default, L: Default> SlotArray<G, L> {
    /// Default-initialized slots for `gates_count` blocks of `gates_width`
    pub fn new(gates_count: usize, gates_width: usize) -> Self {
        assert!(gates_width >= 1, "gate width must include the gate slot");
        let link_count = gates_count * (gates_width - 1);
        Self {
            width: gates_width,
            gates: (0..gates_count).map(|_| G::default()).collect(),
            links: (0..link_count).map(|_| L::default()).collect(),
        }
    }
}

impl<G, L> SlotArray<G, L> {
    /// Total flat slots (`gates_count * gates_width`)
    #[inline]
    pub fn len(&self) -> usize {
        self.gates.len() * self.width
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Whether a flat index addresses a gate slot
    #[inline]
    pub fn is_gate_slot(&self, param_index: usize) -> bool {
        param_index % self.width == 0
    }

    #[inline]
    fn link_offset(&self, param_index: usize) -> usize {
        let position = param_index % self.width;
        debug_assert!(position != 0, "flat index {} is a gate slot", param_index);
        (param_index / self.width) * (self.width - 1) + position - 1
    }

    /// Gate slot at a flat index (position 0 of a block)
    #[inline]
    pub fn gate(&self, param_index: usize) -> &G {
        debug_assert!(self.is_gate_slot(param_index), "flat index {} is a link slot", param_index);
        &self.gates[param_index / self.width]
    }

    #[inline]
    pub fn gate_mut(&mut self, param_index: usize) -> &mut G {
        debug_assert!(self.is_gate_slot(param_index), "flat index {} is a link slot", param_index);
        &mut self.gates[param_index / self.width]
    }

    /// Link slot at a flat index (positions 1..width of a block)
    #[inline]
    pub fn link(&self, param_index: usize) -> &L {
        &self.links[self.link_offset(param_index)]
    }

    #[inline]
    pub fn link_mut(&mut self, param_index: usize) -> &mut L {
        let offset = self.link_offset(param_index);
        &mut self.links[offset]
    }

    /// All gate slots in gate order
    pub fn gate_slots(&self) -> &[G] {
        &self.gates
    }

    /// All link slots in flat order
    pub fn link_slots(&self) -> &[L] {
        &self.links
    }

    /// Bytes held by both backing vectors
    pub fn byte_size(&self) -> usize {
        self.gates.len() * std::mem::size_of::<G>() + self.links.len() * std::mem::size_of::<L>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_matches_flat_layout() {
        let slots: SlotArray<u8, u16> = SlotArray::new(5, 4);
        assert_eq!(slots.len(), 20);
        assert_eq!(slots.gate_slots().len(), 5);
        assert_eq!(slots.link_slots().len(), 15);
    }

    #[test]
    fn test_role_selected_by_position() {
        let mut slots: SlotArray<i32, i32> = SlotArray::new(3, 3);
        for index in 0..slots.len() {
            if slots.is_gate_slot(index) {
                *slots.gate_mut(index) = -(index as i32);
            } else {
                *slots.link_mut(index) = index as i32;
            }
        }
        assert_eq!(slots.gate_slots(), &[0, -3, -6]);
        assert_eq!(slots.link_slots(), &[1, 2, 4, 5, 7, 8]);
        assert_eq!(*slots.link(5), 5);
        assert_eq!(*slots.gate(6), -6);
    }

    #[test]
    fn test_width_one_has_no_links() {
        let slots: SlotArray<u8, u8> = SlotArray::new(16, 1);
        assert_eq!(slots.len(), 16);
        assert!(slots.link_slots().is_empty());
        assert!((0..16).all(|i| slots.is_gate_slot(i)));
    }
}
