use super::{Node, LEAF_LEVEL};
use crate::{config::get_config, NiceInt, Rule, RuleTable};
use ahash::AHashMap as HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum NodeKey {
    Leaf(u16),
    // identities of nw, ne, sw, se; the level follows from them
    Internal([usize; 4]),
}

struct Tables {
    // owns every canonical node
    nodes: HashMap<NodeKey, Node>,
    // results of advancing (node, power) for powers below level - 2
    steps: HashMap<(usize, u32), Node>,
    // blank[i] is the empty node of level LEAF_LEVEL + i
    blank: Vec<Node>,
    // how many times nodes were found in the table
    hits: u64,
    // how many times nodes were not found and therefore inserted
    misses: u64,
}

/// Hash-consing table of quadtree nodes.
///
/// Every node is built here, so two structurally equal nodes are always the
/// same object. Entries are never evicted; see [`crate::Universe::compact`].
pub struct NodeStore {
    table: RuleTable,
    inner: Mutex<Tables>,
}

impl NodeStore {
    /// Create a store for the given rule, with the configured initial capacity.
    #[must_use]
    pub fn new(rule: Rule) -> Self {
        Self::with_capacity(rule, 1 << get_config().node_store_cap_log2)
    }

    #[must_use]
    pub fn with_capacity(rule: Rule, cap: usize) -> Self {
        let mut tables = Tables {
            nodes: HashMap::with_capacity(cap),
            steps: HashMap::new(),
            blank: vec![],
            hits: 0,
            misses: 0,
        };
        let blank_leaf = tables.find(NodeKey::Leaf(0), || Node::new_leaf(0));
        tables.blank.push(blank_leaf);
        Self {
            table: RuleTable::new(rule),
            inner: Mutex::new(tables),
        }
    }

    // Insertions are idempotent, so a panic elsewhere cannot leave the table inconsistent.
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn rule(&self) -> Rule {
        self.table.rule()
    }

    pub fn rule_table(&self) -> &RuleTable {
        &self.table
    }

    /// Find a leaf with the given cells (4 rows of 4 bits).
    /// If the node is not found, it is created.
    pub fn canonical_leaf(&self, cells: u16) -> Node {
        self.lock()
            .find(NodeKey::Leaf(cells), || Node::new_leaf(cells))
    }

    /// Find a node with the given quadrants.
    /// If the node is not found, it is created.
    ///
    /// Quadrants must be canonical nodes of this store with equal levels.
    pub fn canonical_internal(&self, nw: &Node, ne: &Node, sw: &Node, se: &Node) -> Node {
        self.lock().find_internal(nw, ne, sw, se)
    }

    /// Empty node of the given level.
    pub fn empty(&self, level: u32) -> Node {
        assert!(level >= LEAF_LEVEL, "Nodes below leaf level do not exist");
        let mut t = self.lock();
        let i = (level - LEAF_LEVEL) as usize;
        while t.blank.len() <= i {
            let b = t.blank[t.blank.len() - 1].clone();
            let node = t.find_internal(&b, &b, &b, &b);
            t.blank.push(node);
        }
        t.blank[i].clone()
    }

    pub(super) fn cached_step(&self, node: &Node, power: u32) -> Option<Node> {
        self.lock().steps.get(&(node.id(), power)).cloned()
    }

    pub(super) fn cache_step(&self, node: &Node, power: u32, result: Node) -> Node {
        self.lock()
            .steps
            .entry((node.id(), power))
            .or_insert(result)
            .clone()
    }

    /// Number of distinct canonical nodes.
    pub fn size(&self) -> usize {
        self.lock().nodes.len()
    }

    /// Approximate heap memory used by the tables.
    pub fn bytes_total(&self) -> usize {
        let t = self.lock();
        t.nodes.capacity() * (size_of::<(NodeKey, Node)>() + 64)
            + t.steps.capacity() * size_of::<((usize, u32), Node)>()
    }

    /// Get statistics about the store.
    pub fn stats(&self) -> String {
        let t = self.lock();
        let mut s = String::new();
        s.push_str(&format!("nodes: {}\n", NiceInt::from_usize(t.nodes.len())));
        s.push_str(&format!(
            "memoized partial steps: {}\n",
            NiceInt::from_usize(t.steps.len())
        ));
        s.push_str(&format!(
            "hashtable misses / hits: {} / {}\n",
            NiceInt::from(t.misses),
            NiceInt::from(t.hits),
        ));
        s
    }
}

impl Tables {
    fn find(&mut self, key: NodeKey, build: impl FnOnce() -> Node) -> Node {
        if let Some(node) = self.nodes.get(&key) {
            self.hits += 1;
            return node.clone();
        }
        self.misses += 1;
        let node = build();
        self.nodes.insert(key, node.clone());
        node
    }

    fn find_internal(&mut self, nw: &Node, ne: &Node, sw: &Node, se: &Node) -> Node {
        let key = NodeKey::Internal([nw.id(), ne.id(), sw.id(), se.id()]);
        self.find(key, || {
            Node::new_internal(nw.clone(), ne.clone(), sw.clone(), se.clone())
        })
    }
}
