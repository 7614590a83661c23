//! Layer binders - compute the link sources of each gate

use std::fmt::Debug;

use super::Layer;
use crate::memory::GateAddress;

/// Wiring strategy between a layer and one of its source layers
pub trait LayerBinder: Debug {
    /// Links each gate of `layer` receives from `source`
    fn links_per_gate(&self, layer: &Layer, source: &Layer) -> usize;

    /// Push the sources of `layer`'s `gate`-th gate, exactly
    /// `links_per_gate` of them, in link order
    fn gate_sources(&self, gate: usize, layer: &Layer, source: &Layer, sources: &mut Vec<GateAddress>);
}

/// Every gate reads every gate of the source layer
#[derive(Clone, Copy, Debug, Default)]
pub struct FullConnectBinder;

impl LayerBinder for FullConnectBinder {
    fn links_per_gate(&self, _layer: &Layer, source: &Layer) -> usize {
        source.shape().width()
    }

    fn gate_sources(&self, _gate: usize, _layer: &Layer, source: &Layer, sources: &mut Vec<GateAddress>) {
        if let Some(layout) = source.layout() {
            sources.extend(layout.addresses());
        }
    }
}
