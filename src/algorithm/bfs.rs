use crate::common::Cell;
use crate::map::GridModel;

use std::collections::{HashMap, VecDeque};
use tracing::trace;

/// Step counts from one source cell; `usize::MAX` marks unreachable cells.
type DistanceField = Vec<Vec<usize>>;

/// Shortest walkable distances over a single grid.
///
/// One breadth-first search is run per distinct source cell and its whole
/// distance field is cached, so every `(source, *)` query after the first is
/// a table lookup. The cache lives as long as the oracle and is bound to the
/// grid it was built for.
#[derive(Debug)]
pub struct DistanceOracle<'a> {
    grid: &'a GridModel,
    fields: HashMap<Cell, DistanceField>,
    bfs_runs: usize,
}

impl<'a> DistanceOracle<'a> {
    pub fn new(grid: &'a GridModel) -> Self {
        DistanceOracle {
            grid,
            fields: HashMap::new(),
            bfs_runs: 0,
        }
    }

    /// Fewest steps from `a` to `b`, or `None` when no walkable path exists.
    pub fn distance(&mut self, a: Cell, b: Cell) -> Option<usize> {
        if !self.grid.in_bounds(a) || !self.grid.in_bounds(b) {
            return None;
        }
        if a == b {
            return Some(0);
        }

        let field = self.field(a);
        match field[b.row][b.col] {
            usize::MAX => None,
            steps => Some(steps),
        }
    }

    /// Number of walkable cells reachable from `source`, itself included.
    pub fn reachable_count(&mut self, source: Cell) -> usize {
        if !self.grid.is_passable(source) {
            return 0;
        }
        self.field(source)
            .iter()
            .flatten()
            .filter(|steps| **steps != usize::MAX)
            .count()
    }

    pub fn bfs_runs(&self) -> usize {
        self.bfs_runs
    }

    fn field(&mut self, source: Cell) -> &DistanceField {
        if !self.fields.contains_key(&source) {
            let field = bfs(self.grid, source);
            self.bfs_runs += 1;
            self.fields.insert(source, field);
        }
        &self.fields[&source]
    }
}

fn bfs(grid: &GridModel, source: Cell) -> DistanceField {
    let mut field = vec![vec![usize::MAX; grid.cols]; grid.rows];
    let mut queue = VecDeque::new();

    field[source.row][source.col] = 0;
    queue.push_back(source);

    while let Some(current) = queue.pop_front() {
        let next_steps = field[current.row][current.col] + 1;
        for neighbor in grid.get_neighbors(current) {
            if field[neighbor.row][neighbor.col] == usize::MAX {
                field[neighbor.row][neighbor.col] = next_steps;
                queue.push_back(neighbor);
            }
        }
    }

    trace!("bfs from {source} done");
    field
}
