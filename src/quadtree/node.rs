use super::LEAF_LEVEL;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Handle to a canonical quadtree node.
///
/// Nodes are created only by [`NodeStore`](super::NodeStore), which guarantees
/// that structurally equal nodes are the same object. Equality and hashing of
/// handles are therefore pointer identity.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

pub(super) struct NodeData {
    level: u32,
    population: u64,
    kind: NodeKind,
    // cached result of advancing the centre by 2^(level-2) generations
    result: OnceLock<Node>,
}

pub(super) enum NodeKind {
    /// 4x4 cells, bit `y * 4 + x`
    Leaf(u16),
    /// nw, ne, sw, se
    Internal([Node; 4]),
}

impl Node {
    pub(super) fn new_leaf(cells: u16) -> Self {
        Node(Arc::new(NodeData {
            level: LEAF_LEVEL,
            population: cells.count_ones() as u64,
            kind: NodeKind::Leaf(cells),
            result: OnceLock::new(),
        }))
    }

    pub(super) fn new_internal(nw: Node, ne: Node, sw: Node, se: Node) -> Self {
        let level = nw.level();
        assert!(
            [&ne, &sw, &se].iter().all(|n| n.level() == level),
            "Quadrants must have the same level"
        );
        let population = [&nw, &ne, &sw, &se]
            .iter()
            .fold(0u64, |acc, n| acc.saturating_add(n.population()));
        Node(Arc::new(NodeData {
            level: level + 1,
            population,
            kind: NodeKind::Internal([nw, ne, sw, se]),
            result: OnceLock::new(),
        }))
    }

    /// Log2 of the side length.
    #[inline]
    pub fn level(&self) -> u32 {
        self.0.level
    }

    /// Number of alive cells; saturates at `u64::MAX`.
    #[inline]
    pub fn population(&self) -> u64 {
        self.0.population
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.population == 0
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.0.kind, NodeKind::Leaf(_))
    }

    /// Cells of a leaf row by row, 4 bits per row.
    pub fn leaf_cells(&self) -> Option<u16> {
        match self.0.kind {
            NodeKind::Leaf(cells) => Some(cells),
            NodeKind::Internal(_) => None,
        }
    }

    /// Quadrants `[nw, ne, sw, se]` of an internal node.
    pub fn quadrants(&self) -> Option<&[Node; 4]> {
        match &self.0.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Internal(q) => Some(q),
        }
    }

    /// Like [`Node::quadrants`], for callers that already know the node is internal.
    #[inline]
    pub(super) fn quads(&self) -> &[Node; 4] {
        match &self.0.kind {
            NodeKind::Internal(q) => q,
            NodeKind::Leaf(_) => panic!("Leaf has no quadrants"),
        }
    }

    /// Identity of the node; stable while the node is alive.
    #[inline]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(super) fn cached_result(&self) -> Option<&Node> {
        self.0.result.get()
    }

    /// First writer wins, the same canonical node is returned to everyone.
    pub(super) fn cache_result(&self, result: Node) -> Node {
        self.0.result.get_or_init(|| result).clone()
    }

    /// True if the node, centred on the origin, contains cell `(x, y)`.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        if self.level() >= I64_LEVEL {
            return true;
        }
        let half = 1i64 << (self.level() - 1);
        (-half..half).contains(&x) && (-half..half).contains(&y)
    }

    /// Cell state; `x` and `y` are relative to the centre of the node.
    /// Cells outside the node are dead.
    pub fn get_cell(&self, x: i64, y: i64) -> bool {
        if !self.contains(x, y) {
            return false;
        }
        if self.level() <= I64_LEVEL {
            return self.get_cell_inner(x, y);
        }
        let i = quadrant_index(x, y);
        let (part, cx, cy) = self.i64_part(i);
        part.get_cell_inner(x - cx, y - cy)
    }

    fn get_cell_inner(&self, x: i64, y: i64) -> bool {
        let mut node = self;
        let (mut x, mut y) = (x, y);
        loop {
            match &node.0.kind {
                NodeKind::Leaf(cells) => {
                    let (lx, ly) = ((x + 2) as u32, (y + 2) as u32);
                    return cells >> (ly * 4 + lx) & 1 != 0;
                }
                NodeKind::Internal(quads) => {
                    if node.is_empty() {
                        return false;
                    }
                    let offset = 1i64 << (node.level() - 2);
                    node = &quads[quadrant_index(x, y)];
                    x += if x < 0 { offset } else { -offset };
                    y += if y < 0 { offset } else { -offset };
                }
            }
        }
    }

    /// Calls `f` for every alive cell, with coordinates relative to the node centre.
    ///
    /// Cells beyond the `i64` range are skipped.
    pub fn for_each_alive(&self, mut f: impl FnMut(i64, i64)) {
        if self.level() <= I64_LEVEL {
            self.for_each_alive_inner(0, 0, &mut f);
            return;
        }
        for i in 0..4 {
            let (part, cx, cy) = self.i64_part(i);
            part.for_each_alive_inner(cx, cy, &mut f);
        }
    }

    fn for_each_alive_inner(&self, cx: i64, cy: i64, f: &mut impl FnMut(i64, i64)) {
        if self.is_empty() {
            return;
        }
        match &self.0.kind {
            NodeKind::Leaf(cells) => {
                for i in 0..16 {
                    if cells >> i & 1 != 0 {
                        f(cx + i % 4 - 2, cy + i / 4 - 2);
                    }
                }
            }
            NodeKind::Internal([nw, ne, sw, se]) => {
                let offset = 1i64 << (self.level() - 2);
                nw.for_each_alive_inner(cx - offset, cy - offset, f);
                ne.for_each_alive_inner(cx + offset, cy - offset, f);
                sw.for_each_alive_inner(cx - offset, cy + offset, f);
                se.for_each_alive_inner(cx + offset, cy + offset, f);
            }
        }
    }

    /// The `i64`-addressable part of quadrant `i` of a node above [`I64_LEVEL`],
    /// with its centre.
    ///
    /// It is reached by repeatedly taking the child that touches the origin.
    fn i64_part(&self, i: usize) -> (&Node, i64, i64) {
        let mut node = &self.quads()[i];
        while node.level() >= I64_LEVEL {
            node = &node.quads()[3 - i];
        }
        let (cx, cy) = i64_part_center(i);
        (node, cx, cy)
    }
}

/// A centred node of this level spans exactly the `i64` plane.
pub(crate) const I64_LEVEL: u32 = 64;

/// Quadrant `[nw, ne, sw, se]` holding `(x, y)` relative to the centre.
#[inline]
pub(crate) fn quadrant_index(x: i64, y: i64) -> usize {
    (y >= 0) as usize * 2 + (x >= 0) as usize
}

/// Centre of the level `I64_LEVEL - 1` node in quadrant `i` that touches the origin.
pub(crate) fn i64_part_center(i: usize) -> (i64, i64) {
    let h = 1i64 << (I64_LEVEL - 2);
    (
        if i & 1 == 0 { -h } else { h },
        if i & 2 == 0 { -h } else { h },
    )
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("level", &self.level())
            .field("population", &self.population())
            .field("id", &format_args!("{:#x}", self.id()))
            .finish()
    }
}

/// 2x2 quadrant `(qx, qy)` of a leaf as a nibble, bit `dy * 2 + dx`.
#[inline]
pub(super) fn leaf_quadrant(cells: u16, qx: u32, qy: u32) -> u8 {
    let row0 = cells >> ((qy * 2) * 4 + qx * 2) & 0b11;
    let row1 = cells >> ((qy * 2 + 1) * 4 + qx * 2) & 0b11;
    (row0 | row1 << 2) as u8
}

/// Inverse of [`leaf_quadrant`].
#[inline]
pub(super) fn leaf_from_quadrants(nw: u8, ne: u8, sw: u8, se: u8) -> u16 {
    let [nw, ne, sw, se] = [nw, ne, sw, se].map(|q| q as u16);
    (nw & 0b11)
        | (ne & 0b11) << 2
        | (nw >> 2 & 0b11) << 4
        | (ne >> 2 & 0b11) << 6
        | (sw & 0b11) << 8
        | (se & 0b11) << 10
        | (sw >> 2 & 0b11) << 12
        | (se >> 2 & 0b11) << 14
}
