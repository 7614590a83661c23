//! Layer memory layout - translate a layer's width into page sizes
//!
//! A layer of `gates_count` gates with `params_per_gate` slots each is cut
//! into `base_pages_count` pages of `gates_per_base_page` gates followed by
//! one last page holding the rest:
//!
//! ```text
//! base = clamp(nominal / params_per_gate, min, max), at most gates_count
//! base_pages_count = gates_count / base
//! last = gates_count - base_pages_count * base
//! ```
//!
//! When `last` would be empty the final base page becomes the last page, so
//! the page sizes always sum to `gates_count`.

use std::ops::Range;

use crate::config::MemoryConfig;
use crate::error::{BitGateError, Result};
use crate::memory::GateAddress;

/// Page range and sizing of one layer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerLayout {
    /// Gate width: the gate slot plus every link, bias included
    pub params_per_gate: usize,
    pub gates_count: usize,
    pub gates_per_base_page: usize,
    pub gates_per_last_page: usize,
    /// Full pages before the last page
    pub base_pages_count: usize,
    pub page_index_first: usize,
    /// Inclusive
    pub page_index_last: usize,
}

impl LayerLayout {
    /// Lay out `gates_count` gates starting at page `page_index`
    pub fn setup(
        params_per_gate: usize,
        gates_count: usize,
        page_index: usize,
        config: &MemoryConfig,
    ) -> Result<Self> {
        config.validate()?;
        if params_per_gate == 0 || gates_count == 0 {
            return Err(BitGateError::Build(format!(
                "cannot lay out {} gates of width {}",
                gates_count, params_per_gate
            )));
        }

        let gates_per_base_page = (config.nominal_page_params_count / params_per_gate)
            .clamp(config.min_page_gates_count, config.max_page_gates_count)
            .min(gates_count);

        let mut base_pages_count = gates_count / gates_per_base_page;
        let remainder = gates_count - base_pages_count * gates_per_base_page;
        let gates_per_last_page = if remainder > 0 {
            remainder
        } else {
            base_pages_count -= 1;
            gates_per_base_page
        };

        Ok(Self {
            params_per_gate,
            gates_count,
            gates_per_base_page,
            gates_per_last_page,
            base_pages_count,
            page_index_first: page_index,
            page_index_last: page_index + base_pages_count,
        })
    }

    /// Pages of this layer as a half-open range
    pub fn pages(&self) -> Range<usize> {
        self.page_index_first..self.page_index_last + 1
    }

    pub fn pages_count(&self) -> usize {
        self.base_pages_count + 1
    }

    /// Gates held by each page, in page order
    pub fn page_gate_counts(&self) -> Vec<usize> {
        let mut counts = vec![self.gates_per_base_page; self.base_pages_count];
        counts.push(self.gates_per_last_page);
        counts
    }

    /// Address of the layer's `index`-th gate
    pub fn address(&self, index: usize) -> GateAddress {
        debug_assert!(index < self.gates_count);
        let page = self.page_index_first + index / self.gates_per_base_page;
        let gate = index % self.gates_per_base_page;
        GateAddress::new(page as u32, gate as u32)
    }

    /// Addresses of every gate in layer order
    pub fn addresses(&self) -> impl Iterator<Item = GateAddress> + '_ {
        (0..self.gates_count).map(move |index| self.address(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(nominal: usize, min: usize, max: usize) -> MemoryConfig {
        MemoryConfig {
            nominal_page_params_count: nominal,
            min_page_gates_count: min,
            max_page_gates_count: max,
        }
    }

    #[test]
    fn test_layout_exactness() {
        let configs = [
            config(1024, 8, 64),
            config(64, 1, 8),
            config(100, 3, 5),
            config(1, 2, 2),
            config(10_000, 1, 1000),
        ];
        for cfg in &configs {
            for params_per_gate in [1, 3, 17, 21, 200] {
                for gates_count in 1..=300 {
                    let layout = LayerLayout::setup(params_per_gate, gates_count, 5, cfg).unwrap();
                    let counts = layout.page_gate_counts();
                    assert_eq!(counts.iter().sum::<usize>(), gates_count);
                    assert_eq!(counts.len(), layout.pages().len());
                    assert!(counts.iter().all(|&c| c > 0));
                    for &count in &counts[..counts.len() - 1] {
                        assert!(
                            (cfg.min_page_gates_count..=cfg.max_page_gates_count).contains(&count),
                            "{:?} ppg={} n={} counts={:?}",
                            cfg,
                            params_per_gate,
                            gates_count,
                            counts
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_even_split_moves_last_base_page() {
        // 64 gates of width 32 at nominal 1024: base 32, divides evenly
        let layout = LayerLayout::setup(32, 64, 0, &MemoryConfig::default()).unwrap();
        assert_eq!(layout.gates_per_base_page, 32);
        assert_eq!(layout.base_pages_count, 1);
        assert_eq!(layout.gates_per_last_page, 32);
        assert_eq!(layout.pages(), 0..2);
    }

    #[test]
    fn test_remainder_page() {
        let layout = LayerLayout::setup(17, 20, 1, &MemoryConfig::compact()).unwrap();
        // 64 / 17 = 3 gates per base page
        assert_eq!(layout.page_gate_counts(), vec![3, 3, 3, 3, 3, 3, 2]);
        assert_eq!(layout.pages(), 1..8);
    }

    #[test]
    fn test_small_layer_single_page() {
        let layout = LayerLayout::setup(1, 16, 0, &MemoryConfig::default()).unwrap();
        assert_eq!(layout.page_gate_counts(), vec![16]);
        assert_eq!(layout.pages_count(), 1);
    }

    #[test]
    fn test_addresses() {
        let layout = LayerLayout::setup(17, 20, 1, &MemoryConfig::compact()).unwrap();
        assert_eq!(layout.address(0), GateAddress::new(1, 0));
        assert_eq!(layout.address(4), GateAddress::new(2, 1));
        assert_eq!(layout.address(19), GateAddress::new(7, 1));
        assert_eq!(layout.addresses().count(), 20);
    }

    #[test]
    fn test_rejects_empty_and_bad_config() {
        assert!(LayerLayout::setup(4, 0, 0, &MemoryConfig::default()).is_err());
        assert!(LayerLayout::setup(0, 4, 0, &MemoryConfig::default()).is_err());
        assert!(matches!(
            LayerLayout::setup(4, 4, 0, &config(64, 9, 2)),
            Err(BitGateError::Config(_))
        ));
    }
}
