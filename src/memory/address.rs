//! GateAddress - weak (page, gate) reference into the arena

use std::fmt;

/// Page index + in-page gate index
///
/// Never owns memory. Resolved as `pages[page_index].op(gate_index)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GateAddress {
    pub page_index: u32,
    pub gate_index: u32,
}

impl GateAddress {
    #[inline]
    pub const fn new(page_index: u32, gate_index: u32) -> Self {
        Self {
            page_index,
            gate_index,
        }
    }

    #[inline]
    pub const fn page(&self) -> usize {
        self.page_index as usize
    }

    #[inline]
    pub const fn gate(&self) -> usize {
        self.gate_index as usize
    }

    /// True when a gate at `self` may read from `source` without breaking
    /// the feed-forward page order
    #[inline]
    pub const fn may_read_from(&self, source: &GateAddress) -> bool {
        source.page_index <= self.page_index
    }
}

impl fmt::Display for GateAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page_index, self.gate_index)
    }
}
