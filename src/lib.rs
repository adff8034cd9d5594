#![warn(clippy::all)]

mod config;
mod error;
mod quadtree;
mod rule;
mod universe;
mod utils;

pub use config::{get_config, set_node_store_cap_log2, ConfigSnapshot};
pub use error::{Error, Result};
pub use quadtree::{Node, NodeStore, Stepper, LEAF_LEVEL, MIN_ROOT_LEVEL};
pub use rule::{Rule, RuleTable};
pub use universe::Universe;
pub use utils::NiceInt;
