use super::node::{leaf_from_quadrants, leaf_quadrant};
use super::{Node, NodeStore, LEAF_LEVEL, MIN_ROOT_LEVEL};
use tracing::{debug, trace};

/// Implementation of [HashLife algorithm](https://conwaylife.com/wiki/HashLife)
/// on top of a [`NodeStore`].
pub struct Stepper<'a> {
    mem: &'a NodeStore,
}

impl<'a> Stepper<'a> {
    pub fn new(mem: &'a NodeStore) -> Self {
        Self { mem }
    }

    /// Canonical node for the centre of `node` advanced by `2^(level-2)` generations.
    ///
    /// `node` must be internal, i.e. `level >= LEAF_LEVEL + 1`.
    pub fn advance(&self, node: &Node) -> Node {
        assert!(node.level() > LEAF_LEVEL, "Leaves cannot be advanced");
        self.update_node(node, node.level() - 2)
    }

    /// Canonical node for the centre of `node` advanced by `2^power` generations.
    ///
    /// `node` must be internal and `power <= level - 2`.
    pub fn advance_pow2(&self, node: &Node, power: u32) -> Node {
        assert!(node.level() > LEAF_LEVEL, "Leaves cannot be advanced");
        assert!(power + 2 <= node.level(), "Node is too small for 2^{power} generations");
        self.update_node(node, power)
    }

    /// Advances the pattern under `root` by `n` generations.
    ///
    /// The result stays centred on the same origin and is cropped of empty borders.
    ///
    /// # Panics
    ///
    /// If `root` is a leaf; roots are at least [`MIN_ROOT_LEVEL`].
    pub fn run(&self, root: &Node, n: u64) -> Node {
        assert_internal(root);
        let mut root = root.clone();
        let (mut rest, mut power) = (n, 0);
        while rest != 0 {
            if rest & 1 != 0 {
                // the pattern is inside the centre 2^L square after two frames,
                // leaving 2^(L-1) cells of room on each side of the result
                while root.level() < power + 1 {
                    root = self.with_frame(&root);
                }
                root = self.with_frame(&self.with_frame(&root));
                root = self.update_node(&root, power);
                root = self.crop(root);
                debug!(
                    power,
                    level = root.level(),
                    population = root.population(),
                    nodes = self.mem.size(),
                    "big step"
                );
            }
            rest >>= 1;
            power += 1;
        }
        root
    }

    /// Recursively updates nodes in graph.
    fn update_node(&self, node: &Node, power: u32) -> Node {
        let level = node.level();
        if node.is_empty() {
            return self.mem.empty(level - 1);
        }
        let both_stages = power + 2 == level;
        let cached = if both_stages {
            node.cached_result().cloned()
        } else {
            self.mem.cached_step(node, power)
        };
        if let Some(result) = cached {
            return result;
        }

        if level == LEAF_LEVEL + 1 {
            let result = self.update_leaves(node, power);
            return self.remember(node, power, both_stages, result);
        }
        let result = if both_stages {
            self.update_nodes_double(node)
        } else {
            self.update_nodes_single(node, power)
        };
        self.remember(node, power, both_stages, result)
    }

    fn remember(&self, node: &Node, power: u32, both_stages: bool, result: Node) -> Node {
        if both_stages {
            node.cache_result(result)
        } else {
            self.mem.cache_step(node, power, result)
        }
    }

    /// Base case: `node` consists of four leaves (8x8 cells).
    ///
    /// Computes the centre 4x4 after `2^power` generations, `power` is 0 or 1.
    fn update_leaves(&self, node: &Node, power: u32) -> Node {
        let [nw, ne, sw, se] = node.quads().each_ref().map(|q| q.leaf_cells().unwrap_or(0));

        let mut board = 0u64;
        for row in 0..4 {
            board |= ((nw >> (row * 4) & 0xF) as u64) << (row * 8);
            board |= ((ne >> (row * 4) & 0xF) as u64) << (row * 8 + 4);
            board |= ((sw >> (row * 4) & 0xF) as u64) << ((row + 4) * 8);
            board |= ((se >> (row * 4) & 0xF) as u64) << ((row + 4) * 8 + 4);
        }

        let board = if power == 0 {
            self.evolve_board(board, 1)
        } else {
            self.evolve_board(self.evolve_board(board, 0), 1)
        };
        self.mem.canonical_leaf(Self::extract_block(board, 2, 2))
    }

    /// One generation of an 8x8 board, valid for cells at distance at least
    /// `margin + 1` from the border; other cells of the result are dead.
    fn evolve_board(&self, board: u64, margin: u32) -> u64 {
        let table = self.mem.rule_table();
        let mut result = 0u64;
        for oy in (margin..=4 - margin).step_by(2) {
            for ox in (margin..=4 - margin).step_by(2) {
                let inner = table.step_4x4(Self::extract_block(board, ox, oy)) as u64;
                for dy in 0..2 {
                    let bits = inner >> (dy * 2) & 0b11;
                    result |= bits << ((oy + 1 + dy) * 8 + ox + 1);
                }
            }
        }
        result
    }

    /// 4x4 block of an 8x8 board with the north-west corner at `(x, y)`.
    fn extract_block(board: u64, x: u32, y: u32) -> u16 {
        let mut block = 0;
        for row in 0..4 {
            block |= ((board >> ((y + row) * 8 + x) & 0xF) as u16) << (row * 4);
        }
        block
    }

    /// Advances the centre by `2^(level-2)`: two stages of `2^(level-3)` each.
    fn update_nodes_double(&self, node: &Node) -> Node {
        let power = node.level() - 3;
        let [nw, ne, sw, se] = node.quads();

        // First stage
        let t00 = self.update_node(nw, power);
        let t01 = self.update_node(&self.horizontal(nw, ne), power);
        let t02 = self.update_node(ne, power);
        let t10 = self.update_node(&self.vertical(nw, sw), power);
        let t11 = self.update_node(&self.center(node), power);
        let t12 = self.update_node(&self.vertical(ne, se), power);
        let t20 = self.update_node(sw, power);
        let t21 = self.update_node(&self.horizontal(sw, se), power);
        let t22 = self.update_node(se, power);

        // Second stage
        let mem = self.mem;
        let r_nw = self.update_node(&mem.canonical_internal(&t00, &t01, &t10, &t11), power);
        let r_ne = self.update_node(&mem.canonical_internal(&t01, &t02, &t11, &t12), power);
        let r_sw = self.update_node(&mem.canonical_internal(&t10, &t11, &t20, &t21), power);
        let r_se = self.update_node(&mem.canonical_internal(&t11, &t12, &t21, &t22), power);
        mem.canonical_internal(&r_nw, &r_ne, &r_sw, &r_se)
    }

    /// Advances the centre by `2^power < 2^(level-2)`: the nine overlapping
    /// subsquares are taken without stepping, only the second stage steps.
    fn update_nodes_single(&self, node: &Node, power: u32) -> Node {
        let [nw, ne, sw, se] = node.quads();

        let t00 = self.center(nw);
        let t01 = self.center(&self.horizontal(nw, ne));
        let t02 = self.center(ne);
        let t10 = self.center(&self.vertical(nw, sw));
        let t11 = self.center(&self.center(node));
        let t12 = self.center(&self.vertical(ne, se));
        let t20 = self.center(sw);
        let t21 = self.center(&self.horizontal(sw, se));
        let t22 = self.center(se);

        let mem = self.mem;
        let r_nw = self.update_node(&mem.canonical_internal(&t00, &t01, &t10, &t11), power);
        let r_ne = self.update_node(&mem.canonical_internal(&t01, &t02, &t11, &t12), power);
        let r_sw = self.update_node(&mem.canonical_internal(&t10, &t11, &t20, &t21), power);
        let r_se = self.update_node(&mem.canonical_internal(&t11, &t12, &t21, &t22), power);
        mem.canonical_internal(&r_nw, &r_ne, &r_sw, &r_se)
    }

    /// Centre half of an internal node, one level smaller.
    ///
    /// # Panics
    ///
    /// If `node` is a leaf.
    pub fn center(&self, node: &Node) -> Node {
        assert_internal(node);
        let [nw, ne, sw, se] = node.quads();
        if node.level() == LEAF_LEVEL + 1 {
            let [nw, ne, sw, se] = [nw, ne, sw, se].map(|q| q.leaf_cells().unwrap_or(0));
            return self.mem.canonical_leaf(leaf_from_quadrants(
                leaf_quadrant(nw, 1, 1),
                leaf_quadrant(ne, 0, 1),
                leaf_quadrant(sw, 1, 0),
                leaf_quadrant(se, 0, 0),
            ));
        }
        self.mem
            .canonical_internal(&nw.quads()[3], &ne.quads()[2], &sw.quads()[1], &se.quads()[0])
    }

    /// Node straddling the border between horizontally adjacent `w` and `e`.
    fn horizontal(&self, w: &Node, e: &Node) -> Node {
        let [_, w_ne, _, w_se] = w.quads();
        let [e_nw, _, e_sw, _] = e.quads();
        self.mem.canonical_internal(w_ne, e_nw, w_se, e_sw)
    }

    /// Node straddling the border between vertically adjacent `n` and `s`.
    fn vertical(&self, n: &Node, s: &Node) -> Node {
        let [_, _, n_sw, n_se] = n.quads();
        let [s_nw, s_ne, _, _] = s.quads();
        self.mem.canonical_internal(n_sw, n_se, s_nw, s_ne)
    }

    /// Add a blank frame around the node, keeping it centred.
    /// The node becomes two times bigger.
    ///
    /// # Panics
    ///
    /// If `node` is a leaf.
    pub fn with_frame(&self, node: &Node) -> Node {
        assert_internal(node);
        let [nw, ne, sw, se] = node.quads();
        let b = self.mem.empty(node.level() - 1);
        let mem = self.mem;
        let result = mem.canonical_internal(
            &mem.canonical_internal(&b, &b, &b, nw),
            &mem.canonical_internal(&b, &b, ne, &b),
            &mem.canonical_internal(&b, sw, &b, &b),
            &mem.canonical_internal(se, &b, &b, &b),
        );
        trace!(level = result.level(), "frame added");
        result
    }

    /// True if all alive cells lie in the centre half; always false for nodes
    /// of [`MIN_ROOT_LEVEL`] and below.
    pub fn has_blank_frame(&self, node: &Node) -> bool {
        node.level() > MIN_ROOT_LEVEL && self.center(node).population() == node.population()
    }

    /// Removes blank frames while the node stays at least [`MIN_ROOT_LEVEL`].
    /// Smaller nodes are returned as they are.
    pub fn crop(&self, mut node: Node) -> Node {
        while self.has_blank_frame(&node) {
            node = self.center(&node);
        }
        node
    }
}

#[inline]
fn assert_internal(node: &Node) {
    assert!(
        node.level() >= MIN_ROOT_LEVEL,
        "Expected a node of level {MIN_ROOT_LEVEL} or more, got a leaf"
    );
}
