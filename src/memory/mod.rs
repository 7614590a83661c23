//! # Paged Gate Memory
//!
//! Storage engine for bit-gate networks. Gates live in pages; each page
//! holds parallel arrays indexed by a flat parameter index:
//!
//! | Array | Size | Content |
//! |-------|------|---------|
//! | states | `ceil(gates / 8)` bytes | one bit per gate |
//! | values | `gates * width` | gate parameter at position 0, link parameters after |
//! | stats | `gates * width` | gate statistics at position 0, link statistics after |
//! | links | `gates * width` | source [`GateAddress`] of each link slot |
//!
//! Gates may only read from gates in the same or an earlier page, which
//! makes one ascending forward sweep and one descending backward sweep
//! sufficient without cycle detection.

mod address;
mod arena;
mod bits;
mod cursor;
mod page;
mod slots;

pub use address::GateAddress;
pub use arena::{BitGateMemory, MemoryStats};
pub use bits::{state_bytes, StateBits};
pub use cursor::{GateCursor, LinkCursor, Links};
pub use page::{DescriptorPage, Page, StatsSlots, ValueSlots};
pub use slots::SlotArray;
