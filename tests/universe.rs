use hashlife::{Rule, Universe};
use num_bigint::BigUint;
use std::sync::Arc;

const SEED: u64 = 42;
const GLIDER: [(i64, i64); 5] = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];

/// Bounded field with dead cells outside, covering `[-side/2, side/2)` on both axes.
struct NaiveGrid {
    cells: Vec<bool>,
    side: usize,
    rule: Rule,
}

impl NaiveGrid {
    fn from_universe(universe: &Universe, side: usize) -> Self {
        let mut grid = Self {
            cells: vec![false; side * side],
            side,
            rule: universe.rule(),
        };
        for (x, y) in universe.live_cells() {
            let (gx, gy) = grid.to_grid(x, y).expect("pattern does not fit into the grid");
            grid.cells[gy * side + gx] = true;
        }
        grid
    }

    fn to_grid(&self, x: i64, y: i64) -> Option<(usize, usize)> {
        let half = (self.side / 2) as i64;
        let (gx, gy) = (x + half, y + half);
        let range = 0..self.side as i64;
        (range.contains(&gx) && range.contains(&gy)).then_some((gx as usize, gy as usize))
    }

    fn get(&self, x: i64, y: i64) -> bool {
        self.to_grid(x, y)
            .is_some_and(|(gx, gy)| self.cells[gy * self.side + gx])
    }

    fn update(&mut self, n: u64) {
        let half = (self.side / 2) as i64;
        for _ in 0..n {
            let mut next = vec![false; self.side * self.side];
            for gy in 0..self.side {
                for gx in 0..self.side {
                    let (x, y) = (gx as i64 - half, gy as i64 - half);
                    let mut neighbours = 0;
                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            if (dx, dy) != (0, 0) && self.get(x + dx, y + dy) {
                                neighbours += 1;
                            }
                        }
                    }
                    next[gy * self.side + gx] = self.rule.next_state(self.get(x, y), neighbours);
                }
            }
            self.cells = next;
        }
    }

    fn population(&self) -> u64 {
        self.cells.iter().filter(|&&c| c).count() as u64
    }
}

fn assert_matches_naive(universe: &Universe, grid: &NaiveGrid) {
    let half = (grid.side / 2) as i64;
    for y in -half..half {
        for x in -half..half {
            assert_eq!(
                universe.get_cell(x, y),
                grid.get(x, y),
                "Mismatch at ({x}, {y}) in generation {}",
                universe.generation()
            );
        }
    }
    assert_eq!(universe.population(), grid.population(), "Cells escaped the grid");
}

fn sorted_cells(universe: &Universe) -> Vec<(i64, i64)> {
    let mut cells = universe.live_cells();
    cells.sort_unstable();
    cells
}

fn glider_at(universe: Universe, dx: i64, dy: i64) -> Universe {
    GLIDER
        .iter()
        .fold(universe, |u, &(x, y)| u.set_cell(x + dx, y + dy, true))
}

#[test]
fn test_glider_translates() {
    let u = glider_at(Universe::new(Rule::conway()), -5, 3);
    let moved = u.run(4);
    let expected: Vec<_> = {
        let mut cells: Vec<_> = GLIDER.iter().map(|&(x, y)| (x - 5 + 1, y + 3 + 1)).collect();
        cells.sort_unstable();
        cells
    };
    assert_eq!(sorted_cells(&moved), expected);
    assert_eq!(*moved.generation(), BigUint::from(4u32));
}

#[test]
fn test_glider_far_future() {
    let u = glider_at(Universe::new(Rule::conway()), 0, 0);
    let n = 1u64 << 40;
    let moved = u.run(n);
    let shift = (n / 4) as i64;
    assert_eq!(moved.population(), 5);
    for &(x, y) in &GLIDER {
        assert!(moved.get_cell(x + shift, y + shift));
    }
    assert_eq!(*moved.generation(), BigUint::from(n));
}

#[test]
fn test_glider_leaves_i64_plane() {
    let n = 1u64 << 63;
    let shift = (n / 4) as i64;
    let mut u = glider_at(Universe::new(Rule::conway()), 0, 0).run(n);
    let mut expected: Vec<_> = GLIDER.iter().map(|&(x, y)| (x + shift, y + shift)).collect();
    expected.sort_unstable();
    assert_eq!(sorted_cells(&u), expected);

    for _ in 1..5 {
        u = u.run(n);
        assert_eq!(u.population(), 5);
        for (x, y) in u.live_cells() {
            assert!(u.get_cell(x, y), "cell ({x}, {y}) is reported but not stored");
        }
    }
    assert!(u.level() > 64);
    assert!(u.live_cells().is_empty());
    assert_eq!(*u.generation(), BigUint::from(n) * 5u32);

    // the origin is still addressable under a root wider than i64
    let v = u.set_cell(-3, 7, true);
    assert!(v.get_cell(-3, 7));
    assert_eq!(v.population(), 6);
    assert_eq!(v.live_cells(), vec![(-3, 7)]);
    assert_eq!(v.set_cell(-3, 7, false).root(), u.root());
}

#[test]
fn test_canonical_roots() {
    let a = glider_at(Universe::new(Rule::conway()), 10, -7);
    let b = GLIDER
        .iter()
        .rev()
        .fold(Universe::with_store(Arc::clone(a.store())), |u, &(x, y)| {
            u.set_cell(x + 10, y - 7, true)
        });
    assert!(a.root().ptr_eq(b.root()));

    let c = Universe::with_store(Arc::clone(a.store())).set_cell(10, -7, true);
    assert!(!a.root().ptr_eq(c.root()));
}

#[test]
fn test_zero_generations() {
    let u = Universe::random(Rule::conway(), 5, Some(SEED));
    let size = u.node_count();
    let same = u.run(0);
    assert!(same.root().ptr_eq(u.root()));
    assert_eq!(same.generation(), u.generation());
    assert_eq!(same.node_count(), size);
}

#[test]
fn test_time_composition() {
    let u = Universe::random(Rule::conway(), 4, Some(SEED));
    for (a, b) in [(0, 5), (3, 4), (7, 9), (16, 16), (1, 30), (64, 37)] {
        let split = u.run(a).run(b);
        let whole = u.run(a + b);
        assert_eq!(sorted_cells(&split), sorted_cells(&whole), "a = {a}, b = {b}");
        assert_eq!(split.generation(), whole.generation());
    }
}

#[test]
fn test_glider_against_naive() {
    let u = glider_at(Universe::new(Rule::conway()), -20, -20);
    let mut grid = NaiveGrid::from_universe(&u, 64);
    let mut current = u.clone();
    for n in 1..=40 {
        grid.update(1);
        current = current.run(1);
        assert_matches_naive(&current, &grid);
        assert_matches_naive(&u.run(n), &grid);
    }
}

#[test]
fn test_soup_against_naive() {
    for rule in [Rule::conway(), "B36/S23".parse().unwrap(), "B2/S".parse().unwrap()] {
        let u = Universe::random(rule, 4, Some(SEED));
        let mut grid = NaiveGrid::from_universe(&u, 64);
        let mut done = 0;
        for n in [1, 2, 3, 8, 13, 20] {
            grid.update(n - done);
            done = n;
            assert_matches_naive(&u.run(n), &grid);
        }
    }
}

#[test]
fn test_growth_keeps_cells() {
    let mut u = Universe::new(Rule::conway());
    let mut set = vec![];
    for k in 0..62 {
        let (x, y) = (1i64 << k, -(1i64 << k) + 3);
        u = u.set_cell(x, y, true);
        set.push((x, y));
        for &(x, y) in &set {
            assert!(u.get_cell(x, y), "cell ({x}, {y}) lost at k = {k}");
        }
        assert_eq!(u.population(), set.len() as u64);
    }
    assert!(!u.get_cell(i64::MIN, i64::MIN));
}

#[test]
fn test_lonely_cell_dies() {
    let u = Universe::new(Rule::conway()).set_cell(0, 0, true);
    assert_eq!(u.run(1).population(), 0);

    let big = u.set_cell(1 << 40, -(1 << 40), false);
    assert!(big.level() > 40);
    assert_eq!(big.population(), 1);
    assert_eq!(big.run(1).population(), 0);
    assert_eq!(big.run(1 << 50).population(), 0);
}

#[test]
fn test_blinker_oscillates() {
    let u = Universe::from_cells(Rule::conway(), [(-1, 0), (0, 0), (1, 0)]);
    let vertical = [(0, -1), (0, 0), (0, 1)];
    assert_eq!(sorted_cells(&u.run(1)), vertical);
    assert_eq!(sorted_cells(&u.run(1_000_001)), vertical);
    assert_eq!(sorted_cells(&u.run(1 << 30)), sorted_cells(&u));
}

#[test]
fn test_node_handles_outlive_universe() {
    let u = Universe::random(Rule::conway(), 5, Some(SEED)).run(10);
    let root = u.root().clone();
    let population = u.population();
    assert!(u.node_count() > 0);
    u.end();
    assert_eq!(root.population(), population);
    assert!(root.level() >= hashlife::MIN_ROOT_LEVEL);
}

#[test]
fn test_shared_store_across_threads() {
    let u = Universe::random(Rule::conway(), 6, Some(SEED));
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| u.run(100))).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for r in &results[1..] {
        assert!(r.root().ptr_eq(results[0].root()));
    }
    assert_eq!(sorted_cells(&results[0]), sorted_cells(&u.compact().run(100)));
}
