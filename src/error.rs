//! Error types for bitgate

use thiserror::Error;

use crate::memory::GateAddress;

/// Bitgate error type
///
/// Only build-time and boundary operations return these. Passes over the
/// arena never fail: a malformed arena is rejected before it can run.
#[derive(Debug, Error)]
pub enum BitGateError {
    /// Caller supplied a vector that disagrees with a layer's declared shape
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Page, gate or link position outside the arena
    #[error("Addressing error: {0}")]
    Addressing(String),

    /// Link source lives in a later page than its consumer
    #[error("Forward order violated: gate {consumer} cannot read from later gate {upstream}")]
    ForwardOrder {
        consumer: GateAddress,
        upstream: GateAddress,
    },

    /// Descriptor/page creation or topology materialization error
    #[error("Build error: {0}")]
    Build(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BitGateError>;
