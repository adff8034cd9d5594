use crate::quadtree::{
    i64_part_center, quadrant_index, Node, NodeStore, Stepper, I64_LEVEL, LEAF_LEVEL,
    MIN_ROOT_LEVEL,
};
use crate::{NiceInt, Result, Rule};
use ahash::AHashMap as HashMap;
use num_bigint::BigUint;
use std::sync::Arc;
use tracing::debug;

/// Infinite plane of a Life-like automaton.
///
/// A universe is an immutable value: [`Universe::set_cell`] and [`Universe::run`]
/// return a new universe sharing the node store and most of the tree with the
/// old one, which stays valid.
///
/// Coordinates are centred on the origin; `x` grows east and `y` grows south,
/// so `y < 0` selects the `nw`/`ne` quadrants of the root. Code that draws with
/// `y` growing north has to flip the image vertically.
#[derive(Clone)]
pub struct Universe {
    store: Arc<NodeStore>,
    root: Node,
    generation: BigUint,
}

impl Universe {
    /// Empty universe with its own node store.
    pub fn new(rule: Rule) -> Self {
        Self::with_store(Arc::new(NodeStore::new(rule)))
    }

    /// Empty universe from 9-bit birth and survival masks.
    pub fn from_masks(birth_mask: u32, survival_mask: u32) -> Result<Self> {
        Ok(Self::new(Rule::new(birth_mask, survival_mask)?))
    }

    /// Empty universe sharing an existing store; equal patterns built on
    /// the same store get identical roots.
    pub fn with_store(store: Arc<NodeStore>) -> Self {
        let root = store.empty(MIN_ROOT_LEVEL);
        Self {
            store,
            root,
            generation: BigUint::ZERO,
        }
    }

    /// Universe with the given cells alive.
    pub fn from_cells(rule: Rule, cells: impl IntoIterator<Item = (i64, i64)>) -> Self {
        cells
            .into_iter()
            .fold(Self::new(rule), |u, (x, y)| u.set_cell(x, y, true))
    }

    /// Random square of side `2^size_log2` centred on the origin;
    /// the side is at least 8.
    ///
    /// `seed` - random seed (if `None`, then random seed is generated)
    pub fn random(rule: Rule, size_log2: u32, seed: Option<u64>) -> Self {
        use rand::{Rng, SeedableRng};
        let mut rng = if let Some(x) = seed {
            rand_chacha::ChaCha8Rng::seed_from_u64(x)
        } else {
            rand_chacha::ChaCha8Rng::from_entropy()
        };

        fn inner(store: &NodeStore, rng: &mut impl Rng, level: u32) -> Node {
            if level == LEAF_LEVEL {
                return store.canonical_leaf(rng.gen());
            }
            let [nw, ne, sw, se] = [(); 4].map(|_| inner(store, rng, level - 1));
            store.canonical_internal(&nw, &ne, &sw, &se)
        }

        let u = Self::new(rule);
        let root = inner(&u.store, &mut rng, size_log2.max(MIN_ROOT_LEVEL));
        Self { root, ..u }
    }

    /// Root of the quadtree.
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn store(&self) -> &Arc<NodeStore> {
        &self.store
    }

    pub fn rule(&self) -> Rule {
        self.store.rule()
    }

    /// Number of generations simulated so far.
    pub fn generation(&self) -> &BigUint {
        &self.generation
    }

    /// Log2 of the side of the root.
    pub fn level(&self) -> u32 {
        self.root.level()
    }

    pub fn population(&self) -> u64 {
        self.root.population()
    }

    /// Number of canonical nodes in the store.
    pub fn node_count(&self) -> usize {
        self.store.size()
    }

    /// Cell state at `(x, y)`; cells outside the root are dead.
    pub fn get_cell(&self, x: i64, y: i64) -> bool {
        self.root.get_cell(x, y)
    }

    /// Copy of the universe with the cell at `(x, y)` set to `alive`.
    ///
    /// Grows the root until it covers `(x, y)`; only the path from the root
    /// to the target leaf is rebuilt.
    pub fn set_cell(&self, x: i64, y: i64, alive: bool) -> Universe {
        let stepper = Stepper::new(&self.store);
        let mut root = self.root.clone();
        while !root.contains(x, y) {
            root = stepper.with_frame(&root);
        }
        let root = self.set_cell_recurs(&root, x, y, alive);
        Self {
            store: self.store.clone(),
            root,
            generation: self.generation.clone(),
        }
    }

    fn set_cell_recurs(&self, node: &Node, x: i64, y: i64, alive: bool) -> Node {
        let Some(quads) = node.quadrants() else {
            let cells = node.leaf_cells().unwrap_or(0);
            let bit = 1u16 << ((y + 2) * 4 + (x + 2));
            let cells = if alive { cells | bit } else { cells & !bit };
            return self.store.canonical_leaf(cells);
        };
        if !alive && node.is_empty() {
            return node.clone();
        }
        let i = quadrant_index(x, y);
        let updated = if node.level() > I64_LEVEL {
            self.set_cell_near_origin(&quads[i], i, x, y, alive)
        } else {
            let offset = 1i64 << (node.level() - 2);
            let (cx, cy) = (
                x + if x < 0 { offset } else { -offset },
                y + if y < 0 { offset } else { -offset },
            );
            self.set_cell_recurs(&quads[i], cx, cy, alive)
        };
        self.replace_quadrant(quads, i, updated)
    }

    /// `node` is quadrant `i` of a root wider than the `i64` plane; the cell
    /// lies in the descendants of `node` that touch the origin.
    fn set_cell_near_origin(&self, node: &Node, i: usize, x: i64, y: i64, alive: bool) -> Node {
        if !alive && node.is_empty() {
            return node.clone();
        }
        if node.level() < I64_LEVEL {
            let (cx, cy) = i64_part_center(i);
            return self.set_cell_recurs(node, x - cx, y - cy, alive);
        }
        let Some(quads) = node.quadrants() else {
            return node.clone();
        };
        let corner = 3 - i;
        let updated = self.set_cell_near_origin(&quads[corner], i, x, y, alive);
        self.replace_quadrant(quads, corner, updated)
    }

    fn replace_quadrant(&self, quads: &[Node; 4], i: usize, quadrant: Node) -> Node {
        let mut quads = quads.clone();
        quads[i] = quadrant;
        let [nw, ne, sw, se] = &quads;
        self.store.canonical_internal(nw, ne, sw, se)
    }

    /// Advances the universe by `n` generations.
    pub fn run(&self, n: u64) -> Universe {
        if n == 0 {
            return self.clone();
        }
        let root = Stepper::new(&self.store).run(&self.root, n);
        Self {
            store: self.store.clone(),
            root,
            generation: &self.generation + n,
        }
    }

    /// Coordinates of every alive cell.
    ///
    /// Cells that have travelled beyond the `i64` range are left out, the
    /// same cells [`Universe::get_cell`] cannot address.
    pub fn live_cells(&self) -> Vec<(i64, i64)> {
        let mut cells = Vec::with_capacity(self.population().min(1 << 20) as usize);
        self.root.for_each_alive(|x, y| cells.push((x, y)));
        cells
    }

    /// Copies the reachable part of the tree into a fresh store, dropping
    /// every cached result and every node unreachable from the root.
    ///
    /// The old universe keeps the old store; nodes of the two stores must
    /// not be mixed.
    pub fn compact(&self) -> Universe {
        fn inner(store: &NodeStore, node: &Node, seen: &mut HashMap<usize, Node>) -> Node {
            if let Some(copy) = seen.get(&node.id()) {
                return copy.clone();
            }
            let copy = match node.quadrants() {
                None => store.canonical_leaf(node.leaf_cells().unwrap_or(0)),
                Some(quads) => {
                    let [nw, ne, sw, se] = quads.each_ref().map(|q| inner(store, q, seen));
                    store.canonical_internal(&nw, &ne, &sw, &se)
                }
            };
            seen.insert(node.id(), copy.clone());
            copy
        }

        let store = Arc::new(NodeStore::new(self.rule()));
        let root = inner(&store, &self.root, &mut HashMap::new());
        debug!(
            before = self.store.size(),
            after = store.size(),
            "node store compacted"
        );
        Self {
            store,
            root,
            generation: self.generation.clone(),
        }
    }

    /// Releases this universe's reference to the store.
    ///
    /// The store is freed once no other universe shares it. Node handles
    /// obtained earlier keep their own subtree alive but are detached from
    /// any store.
    pub fn end(self) {
        debug!(nodes = self.store.size(), "universe released");
    }

    /// Returns multiline string reporting engine stats.
    pub fn statistics(&self) -> String {
        let mut s = format!("Rule: {}\n", self.rule());
        s += &format!("Generation: {}\n", self.generation);
        s += &format!("Side length: 2^{}\n", self.level());
        s += &format!("Population: {}\n", NiceInt::from(self.population()));
        s += &self.store.stats();
        s
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new(Rule::conway())
    }
}
