//! # Bitgate - Paged Bit-Gate Memory
//!
//! Networks of binary gates joined by weighted binary links, trained by
//! scalar feedback instead of gradients.
//!
//! ## Core Components
//!
//! - **Memory**: paged arena of bit-packed gate states with parallel
//!   parameter, statistics and link arrays addressed by page + gate
//! - **Policies**: pluggable learning strategies driven over the arena by
//!   forward, backward and mutate passes
//! - **Conservation**: a gate's feedback is split across its links so the
//!   dispatched shares always sum to what the gate received
//! - **Model**: layer topology, page layout and bulk layer I/O
//!
//! ## Passes
//!
//! 1. **Forward** (pages ascending): every gate compares its weighted link
//!    sum against its threshold
//! 2. **Backward** (pages descending): every gate drains its feedback
//!    mailbox, updates its statistics and posts shares upstream
//! 3. **Mutate** (pages descending): policy-specific weight adjustment
//!
//! ## Example
//!
//! ```ignore
//! use bitgate::{FullConnectBinder, MemoryConfig, Model, Shape, StatsPolicy};
//!
//! let mut model = Model::new(MemoryConfig::default());
//! let input = model.lay(Shape::new(&[2]));
//! let output = model.lay(Shape::new(&[1]));
//! model.on(output, input, FullConnectBinder)?;
//!
//! let mut memory = model.materialize(StatsPolicy::default(), 10)?;
//! model.write_vec1(&mut memory, input, &[true, false])?;
//! memory.compute_forward();
//! model.emit_feedback_vec(&mut memory, output, &[-10_000])?;
//! memory.compute_backward();
//! memory.mutate_forward();
//! memory.mutate_backward();
//! ```

// Error types
mod error;
pub use error::{BitGateError, Result};

// Configuration
pub mod config;
pub use config::{BitGateConfig, MemoryConfig, TrainingConfig};

// Paged arena
pub mod memory;
pub use memory::{BitGateMemory, GateAddress, GateCursor, LinkCursor, MemoryStats};

// Learning strategies
pub mod policy;
pub use policy::{
    BasicPolicy, FeedbackMailbox, FeedbackSignal, GatePolicy, RandMutationPolicy, StatsPolicy,
    WeightPair,
};

// Topology
pub mod model;
pub use model::{FullConnectBinder, LayerBinder, LayerId, LayerLayout, Model, Shape};
