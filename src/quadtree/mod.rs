mod hashlife;
mod memory;
mod node;

/// Leaves hold 4x4 cells.
pub const LEAF_LEVEL: u32 = 2;
/// Smallest internal node; roots never get smaller.
pub const MIN_ROOT_LEVEL: u32 = LEAF_LEVEL + 1;

pub use hashlife::Stepper;
pub use memory::NodeStore;
pub use node::Node;
pub(crate) use node::{i64_part_center, quadrant_index, I64_LEVEL};
