//! Gate cursor - per-pass view of one gate and its incoming links
//!
//! A [`GateCursor`] is built fresh for every gate on every pass. It borrows
//! the whole page table mutably, so a policy can read its links' sources in
//! earlier pages, edit its own slots, and post feedback into upstream
//! mailboxes through one handle.
//!
//! Link iteration is a lending iterator: each [`LinkCursor`] borrows the
//! gate cursor until it is dropped.
//!
//! ```ignore
//! let mut links = gate.links();
//! while let Some(mut link) = links.next_link() {
//!     let weight = link.param().select(link.get());
//!     link.emit_feedback(share);
//! }
//! ```

use super::address::GateAddress;
use super::page::Page;
use crate::policy::{FeedbackMailbox, GatePolicy};

/// View over one gate during a pass
pub struct GateCursor<'a, P: GatePolicy> {
    pages: &'a mut [Page<P>],
    page: usize,
    gate: usize,
    param_start: usize,
    param_end: usize,
}

impl<'a, P: GatePolicy> GateCursor<'a, P> {
    pub(crate) fn new(pages: &'a mut [Page<P>], page: usize, gate: usize) -> Self {
        let width = pages[page].gates_width;
        let param_start = width * gate;
        Self {
            pages,
            page,
            gate,
            param_start,
            param_end: param_start + width,
        }
    }

    /// This gate's address
    pub fn address(&self) -> GateAddress {
        GateAddress::new(self.page as u32, self.gate as u32)
    }

    /// Gate width (1 + links per gate)
    #[inline]
    pub fn width(&self) -> usize {
        self.param_end - self.param_start
    }

    /// Number of incoming links, bias included
    #[inline]
    pub fn links_count(&self) -> usize {
        if self.pages[self.page].has_links() {
            self.width() - 1
        } else {
            0
        }
    }

    /// Own state bit
    #[inline]
    pub fn get(&self) -> bool {
        self.pages[self.page].get_state(self.gate)
    }

    #[inline]
    pub fn set(&mut self, value: bool) {
        self.pages[self.page].set_state(self.gate, value);
    }

    /// Own parameter (slot position 0)
    #[inline]
    pub fn param(&self) -> &P::GateParam {
        self.pages[self.page].values.gate(self.param_start)
    }

    #[inline]
    pub fn param_mut(&mut self) -> &mut P::GateParam {
        self.pages[self.page].values.gate_mut(self.param_start)
    }

    /// Own statistics, mailbox included
    #[inline]
    pub fn stats(&self) -> &P::GateStats {
        self.pages[self.page].stats.gate(self.param_start)
    }

    #[inline]
    pub fn stats_mut(&mut self) -> &mut P::GateStats {
        self.pages[self.page].stats.gate_mut(self.param_start)
    }

    /// Read and reset the pending feedback
    #[inline]
    pub fn drain_feedback(&mut self) -> P::Signal {
        self.stats_mut().drain()
    }

    /// Iterate incoming links in position order (1..width)
    pub fn links(&mut self) -> Links<'_, P> {
        let end = if self.pages[self.page].has_links() {
            self.param_end
        } else {
            self.param_start + 1
        };
        Links {
            pages: &mut *self.pages,
            page: self.page,
            param_start: self.param_start,
            next: self.param_start + 1,
            end,
        }
    }

    /// Link at `position` (1..width), `None` when out of range
    pub fn link_at(&mut self, position: usize) -> Option<LinkCursor<'_, P>> {
        if position == 0 || position > self.links_count() {
            return None;
        }
        Some(LinkCursor::new(
            &mut *self.pages,
            self.page,
            self.param_start,
            self.param_start + position,
        ))
    }

    /// Bias link (last position, wired to the gate itself, input always on)
    pub fn bias(&mut self) -> Option<LinkCursor<'_, P>> {
        let position = self.links_count();
        self.link_at(position)
    }
}

/// Lending iterator over a gate's links
pub struct Links<'c, P: GatePolicy> {
    pages: &'c mut [Page<P>],
    page: usize,
    param_start: usize,
    next: usize,
    end: usize,
}

impl<'c, P: GatePolicy> Links<'c, P> {
    /// Advance to the next link
    pub fn next_link(&mut self) -> Option<LinkCursor<'_, P>> {
        if self.next >= self.end {
            return None;
        }
        let param_index = self.next;
        self.next += 1;
        Some(LinkCursor::new(&mut *self.pages, self.page, self.param_start, param_index))
    }

    /// Links not yet visited
    pub fn remaining(&self) -> usize {
        self.end - self.next
    }
}

/// View over one incoming link
pub struct LinkCursor<'c, P: GatePolicy> {
    pages: &'c mut [Page<P>],
    page: usize,
    param_start: usize,
    param_index: usize,
    source: GateAddress,
}

impl<'c, P: GatePolicy> LinkCursor<'c, P> {
    fn new(pages: &'c mut [Page<P>], page: usize, param_start: usize, param_index: usize) -> Self {
        let source = pages[page].links[param_index];
        Self {
            pages,
            page,
            param_start,
            param_index,
            source,
        }
    }

    /// Position inside the gate's block (1..width)
    #[inline]
    pub fn position(&self) -> usize {
        self.param_index - self.param_start
    }

    /// Whether this is the gate's last link, the bias
    #[inline]
    pub fn is_bias(&self) -> bool {
        self.position() + 1 == self.pages[self.page].gates_width
    }

    /// Source gate feeding this link
    #[inline]
    pub fn source(&self) -> GateAddress {
        self.source
    }

    /// Input bit: the source gate's current state, or a constant `true` on
    /// the bias link so a gate's output never feeds its own accumulator
    #[inline]
    pub fn get(&self) -> bool {
        if self.is_bias() {
            return true;
        }
        self.pages[self.source.page()].get_state(self.source.gate())
    }

    #[inline]
    pub fn param(&self) -> &P::LinkParam {
        self.pages[self.page].values.link(self.param_index)
    }

    #[inline]
    pub fn param_mut(&mut self) -> &mut P::LinkParam {
        self.pages[self.page].values.link_mut(self.param_index)
    }

    #[inline]
    pub fn stats(&self) -> &P::LinkStats {
        self.pages[self.page].stats.link(self.param_index)
    }

    #[inline]
    pub fn stats_mut(&mut self) -> &mut P::LinkStats {
        self.pages[self.page].stats.link_mut(self.param_index)
    }

    /// Post feedback into the source gate's mailbox
    #[inline]
    pub fn emit_feedback(&mut self, signal: P::Signal) {
        self.pages[self.source.page()].emit_feedback(self.source.gate(), signal);
    }
}
