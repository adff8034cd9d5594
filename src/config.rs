use std::sync::atomic::{AtomicU32, Ordering};

struct Config {
    node_store_cap_log2: AtomicU32,
}

static CONFIG: Config = Config {
    node_store_cap_log2: AtomicU32::new(16),
};

pub struct ConfigSnapshot {
    /// Initial reservation of the node table is `2^node_store_cap_log2` entries.
    pub node_store_cap_log2: u32,
}

pub fn get_config() -> ConfigSnapshot {
    ConfigSnapshot {
        node_store_cap_log2: CONFIG.node_store_cap_log2.load(Ordering::Relaxed),
    }
}

/// Affects only stores created after the call.
pub fn set_node_store_cap_log2(cap_log2: u32) {
    assert!(cap_log2 < usize::BITS, "Capacity must fit into usize");
    CONFIG
        .node_store_cap_log2
        .store(cap_log2, Ordering::Relaxed);
}
