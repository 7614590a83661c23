//! # Model - layer topology over the paged memory
//!
//! Layers are declared in feed-forward order, wired to earlier layers
//! through binders, then materialized into one [`BitGateMemory`]:
//!
//! ```ignore
//! let mut model = Model::new(MemoryConfig::default());
//! let input = model.lay(Shape::new(&[2, 8]));
//! let hidden = model.lay(Shape::new(&[20]));
//! let output = model.lay(Shape::new(&[1]));
//! model.on(hidden, input, FullConnectBinder)?;
//! model.on(output, hidden, FullConnectBinder)?;
//!
//! let mut memory = model.materialize(StatsPolicy::default(), 10)?;
//! model.write_vec8(&mut memory, input, &[3, 5])?;
//! memory.compute_forward();
//! let result = model.read_vec1(&memory, output)?;
//! ```
//!
//! Each gate of a wired layer gets the links of all its binders in
//! declaration order, followed by the bias link pointing back at itself.
//! The bias input always reads as on, so it adds a constant `weight_1`.

mod binder;
mod layout;

pub use binder::{FullConnectBinder, LayerBinder};
pub use layout::LayerLayout;

use crate::config::MemoryConfig;
use crate::error::{BitGateError, Result};
use crate::memory::{BitGateMemory, GateAddress};
use crate::policy::GatePolicy;

/// Layer identifier (declaration order)
pub type LayerId = usize;

/// Logical layer dimensions; gates are laid out row-major
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: dims.to_vec(),
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn ndims(&self) -> usize {
        self.dims.len()
    }

    /// Total gates
    pub fn width(&self) -> usize {
        self.dims.iter().product()
    }
}

/// One source layer feeding a layer through a binder
#[derive(Debug)]
struct Support {
    source: LayerId,
    binder: Box<dyn LayerBinder>,
    /// First link position (0-based, excluding the gate slot)
    links_first: usize,
    links_count: usize,
}

/// A layer of gates
#[derive(Debug)]
pub struct Layer {
    id: LayerId,
    shape: Shape,
    supports: Vec<Support>,
    layout: Option<LayerLayout>,
}

impl Layer {
    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Page layout, available once the model is materialized
    pub fn layout(&self) -> Option<&LayerLayout> {
        self.layout.as_ref()
    }

    /// Whether the layer reads from other layers
    pub fn is_wired(&self) -> bool {
        !self.supports.is_empty()
    }
}

/// Ordered collection of layers
#[derive(Debug, Default)]
pub struct Model {
    config: MemoryConfig,
    layers: Vec<Layer>,
}

impl Model {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            layers: Vec::new(),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Declare a new layer after every existing one
    pub fn lay(&mut self, shape: Shape) -> LayerId {
        let id = self.layers.len();
        self.layers.push(Layer {
            id,
            shape,
            supports: Vec::new(),
            layout: None,
        });
        id
    }

    /// Feed `layer` from the earlier layer `source` through `binder`
    pub fn on<B: LayerBinder + 'static>(&mut self, layer: LayerId, source: LayerId, binder: B) -> Result<()> {
        if layer >= self.layers.len() || source >= self.layers.len() {
            return Err(BitGateError::Build(format!(
                "unknown layer {} or {} (model has {})",
                layer,
                source,
                self.layers.len()
            )));
        }
        if source >= layer {
            return Err(BitGateError::Build(format!(
                "layer {} can only read from earlier layers, not {}",
                layer, source
            )));
        }
        self.layers[layer].supports.push(Support {
            source,
            binder: Box::new(binder),
            links_first: 0,
            links_count: 0,
        });
        Ok(())
    }

    /// Allocate pages for every layer, wire the links and initialize
    /// the gates with `policy`
    pub fn materialize<P: GatePolicy>(&mut self, policy: P, seed: u64) -> Result<BitGateMemory<P>> {
        self.config.validate()?;

        // Link counts and page layout, layer by layer
        let mut page_count = 0;
        for id in 0..self.layers.len() {
            let mut links_count = 0;
            for support_index in 0..self.layers[id].supports.len() {
                let layer = &self.layers[id];
                let support = &layer.supports[support_index];
                let count = support
                    .binder
                    .links_per_gate(layer, &self.layers[support.source]);
                let support = &mut self.layers[id].supports[support_index];
                support.links_first = links_count;
                support.links_count = count;
                links_count += count;
            }

            let layer = &mut self.layers[id];
            // Gate slot, binder links, bias link
            let params_per_gate = if layer.is_wired() { links_count + 2 } else { 1 };
            let layout = LayerLayout::setup(params_per_gate, layer.shape.width(), page_count, &self.config)?;
            page_count = layout.page_index_last + 1;
            layer.layout = Some(layout);
        }

        // Pages, ascending
        let mut memory = BitGateMemory::new(policy, seed);
        for layer in &self.layers {
            let layout = Self::layout_of(layer)?;
            for (page, gates) in layout.pages().zip(layout.page_gate_counts()) {
                memory.create_descriptor(page, gates, layout.params_per_gate)?;
                memory.create_page(page, page)?;
            }
        }

        // Links, then the bias
        let mut sources = Vec::new();
        for layer in self.layers.iter().filter(|l| l.is_wired()) {
            let layout = Self::layout_of(layer)?;
            for (index, gate) in layout.addresses().enumerate() {
                for support in &layer.supports {
                    sources.clear();
                    let source = &self.layers[support.source];
                    support.binder.gate_sources(index, layer, source, &mut sources);
                    if sources.len() != support.links_count {
                        return Err(BitGateError::Build(format!(
                            "binder {:?} produced {} links for gate {}, expected {}",
                            support.binder,
                            sources.len(),
                            gate,
                            support.links_count
                        )));
                    }
                    for (offset, &source) in sources.iter().enumerate() {
                        memory.set_link(gate, support.links_first + offset + 1, source)?;
                    }
                }
                memory.set_link(gate, layout.params_per_gate - 1, gate)?;
            }
        }

        memory.verify_wiring()?;
        memory.initialize();

        let stats = memory.stats();
        log::debug!(
            "Materialized {} layers into {} pages: {} gates, {} links, {} bytes ({} policy)",
            self.layers.len(),
            memory.pages_count(),
            stats.gates_count,
            stats.links_count,
            stats.used_memory,
            P::NAME
        );
        Ok(memory)
    }

    fn layout_of(layer: &Layer) -> Result<&LayerLayout> {
        layer
            .layout
            .as_ref()
            .ok_or_else(|| BitGateError::Build(format!("layer {} is not materialized", layer.id)))
    }

    fn materialized(&self, id: LayerId) -> Result<(&Layer, &LayerLayout)> {
        let layer = self
            .layers
            .get(id)
            .ok_or_else(|| BitGateError::Build(format!("unknown layer {}", id)))?;
        Ok((layer, Self::layout_of(layer)?))
    }

    /// Address of a layer's `index`-th gate
    pub fn gate_address(&self, id: LayerId, index: usize) -> Result<GateAddress> {
        let (layer, layout) = self.materialized(id)?;
        if index >= layer.shape.width() {
            return Err(BitGateError::Addressing(format!(
                "gate {} outside layer {} of width {}",
                index,
                id,
                layer.shape.width()
            )));
        }
        Ok(layout.address(index))
    }

    // =========================================================================
    // Layer I/O
    // =========================================================================

    /// Load one byte per row into a `[n, 8]` layer, LSB first
    pub fn write_vec8<P: GatePolicy>(&self, memory: &mut BitGateMemory<P>, id: LayerId, values: &[u8]) -> Result<()> {
        let (layer, layout) = self.materialized(id)?;
        Self::expect_bytes(layer, values.len())?;
        memory.write_packed_states(layout.pages(), values)
    }

    /// Read a `[n, 8]` layer back as one byte per row
    pub fn read_vec8<P: GatePolicy>(&self, memory: &BitGateMemory<P>, id: LayerId) -> Result<Vec<u8>> {
        let (layer, layout) = self.materialized(id)?;
        let rows = layer.shape.dims().first().copied().unwrap_or(0);
        Self::expect_bytes(layer, rows)?;
        memory.read_packed_states(layout.pages())
    }

    /// Write one state per gate of a one-dimensional layer
    pub fn write_vec1<P: GatePolicy>(&self, memory: &mut BitGateMemory<P>, id: LayerId, values: &[bool]) -> Result<()> {
        let (layer, layout) = self.materialized(id)?;
        Self::expect_flat(layer, values.len())?;
        memory.write_states(layout.pages(), values)
    }

    /// Read one state per gate of a one-dimensional layer
    pub fn read_vec1<P: GatePolicy>(&self, memory: &BitGateMemory<P>, id: LayerId) -> Result<Vec<bool>> {
        let (layer, layout) = self.materialized(id)?;
        Self::expect_flat(layer, layer.shape.width())?;
        memory.read_states(layout.pages())
    }

    /// Post one feedback value per gate of a one-dimensional layer
    pub fn emit_feedback_vec<P: GatePolicy>(
        &self,
        memory: &mut BitGateMemory<P>,
        id: LayerId,
        feedback: &[P::Signal],
    ) -> Result<()> {
        let (layer, layout) = self.materialized(id)?;
        Self::expect_flat(layer, feedback.len())?;
        memory.emit_feedback_range(layout.pages(), feedback)
    }

    fn expect_bytes(layer: &Layer, rows: usize) -> Result<()> {
        let dims = layer.shape.dims();
        if dims.len() != 2 || dims[1] != 8 || dims[0] != rows {
            return Err(BitGateError::ShapeMismatch {
                expected: dims.to_vec(),
                actual: vec![rows, 8],
            });
        }
        Ok(())
    }

    fn expect_flat(layer: &Layer, len: usize) -> Result<()> {
        let dims = layer.shape.dims();
        if dims.len() != 1 || dims[0] != len {
            return Err(BitGateError::ShapeMismatch {
                expected: dims.to_vec(),
                actual: vec![len],
            });
        }
        Ok(())
    }
}
