use super::deadline::Deadline;
use super::table::{BudgetResult, ResultTable};
use crate::common::Scoring;
use crate::graph::ObjectGraph;
use crate::stat::Stats;

use std::time::Instant;
use tracing::{debug, instrument, trace, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct VisitedSet(u128);

impl VisitedSet {
    fn contains(self, vertex: usize) -> bool {
        self.0 & (1 << vertex) != 0
    }

    fn with(self, vertex: usize) -> Self {
        VisitedSet(self.0 | (1 << vertex))
    }
}

/// One branch of the search. Children receive their own copy.
#[derive(Debug, Clone, Copy)]
struct SearchState {
    vertex: usize,
    deadline: Deadline,
    visited: VisitedSet,
    coins: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    pub scoring: Scoring,
    /// Stop a single search after this many expanded nodes.
    pub max_expansions: Option<usize>,
}

struct Best {
    coins: usize,
    path: Vec<usize>,
    expansions: usize,
    truncated: bool,
}

/// Depth-limited search over the object graph, where the depth limit is the
/// shutdown deadline and buttons push the limit back.
pub struct DepthLimitedSearch<'g> {
    graph: &'g ObjectGraph,
    options: SearchOptions,
    upper_bound: usize,
    stats: Stats,
}

impl<'g> DepthLimitedSearch<'g> {
    pub fn new(graph: &'g ObjectGraph, options: SearchOptions) -> Self {
        let upper_bound = graph
            .vertices()
            .iter()
            .map(|vertex| options.scoring.score(vertex.kind))
            .sum();
        DepthLimitedSearch {
            graph,
            options,
            upper_bound,
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Best coins collectable with a fixed initial deadline of `budget` steps.
    #[instrument(skip_all, name = "dls", fields(budget = budget), level = "debug")]
    pub fn solve(&mut self, budget: usize) -> BudgetResult {
        let start_time = Instant::now();
        let root = SearchState {
            vertex: 0,
            deadline: Deadline::new(budget),
            visited: VisitedSet::default().with(0),
            coins: 0,
        };
        let mut best = Best {
            coins: 0,
            path: vec![0],
            expansions: 0,
            truncated: false,
        };
        let mut path = vec![0];

        self.explore(root, &mut path, &mut best);

        self.stats.searches += 1;
        self.stats.expanded_nodes += best.expansions;
        self.stats.time_us += start_time.elapsed().as_micros();
        if best.truncated {
            self.stats.truncated_searches += 1;
            warn!(
                "search with budget {budget} stopped after {} expansions, result is a lower bound",
                best.expansions
            );
        }
        debug!(
            "budget {budget}: {} coins after {} expansions",
            best.coins, best.expansions
        );

        BudgetResult {
            budget,
            max_coins: best.coins,
            trajectory: best.path.iter().map(|&v| self.graph.cell(v)).collect(),
            truncated: best.truncated,
        }
    }

    /// Runs one search per initial deadline in `0..=max_length`.
    #[instrument(skip_all, name = "dls_sweep", fields(max_length = max_length), level = "debug")]
    pub fn sweep(&mut self, max_length: usize) -> ResultTable {
        let mut table = ResultTable::new();
        for budget in 0..=max_length {
            let result = self.solve(budget);
            table.push(result);
        }
        table
    }

    fn explore(&mut self, state: SearchState, path: &mut Vec<usize>, best: &mut Best) {
        best.expansions += 1;
        trace!(
            "expand vertex {} remaining {} coins {}",
            state.vertex,
            state.deadline.remaining(),
            state.coins
        );

        if state.coins > best.coins {
            best.coins = state.coins;
            best.path.clone_from(path);
        }
        if best.coins == self.upper_bound {
            return;
        }

        let graph = self.graph;
        for (next, weight) in graph.neighbors(state.vertex) {
            if state.visited.contains(next) {
                continue;
            }
            let kind = graph.vertex(next).kind;
            let Some(deadline) = state.deadline.arrive(Some(weight), kind) else {
                continue;
            };
            // Only a child that would actually be skipped makes the result partial.
            if self
                .options
                .max_expansions
                .is_some_and(|cap| best.expansions >= cap)
            {
                best.truncated = true;
                return;
            }

            let child = SearchState {
                vertex: next,
                deadline,
                visited: state.visited.with(next),
                coins: state.coins + self.options.scoring.score(kind),
            };
            path.push(next);
            self.explore(child, path, best);
            path.pop();

            if best.truncated || best.coins == self.upper_bound {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::DistanceOracle;
    use crate::common::{Cell, Vertex, VertexKind};
    use crate::map::GridModel;

    // Helper function to setup tracing
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    }

    fn graph_from_rows(rows: &[&str]) -> ObjectGraph {
        let tiles: Vec<Vec<&str>> = rows.iter().map(|row| row.split_whitespace().collect()).collect();
        let grid = GridModel::from_tokens(&tiles).unwrap();
        let mut oracle = DistanceOracle::new(&grid);
        ObjectGraph::build(&grid, &mut oracle)
    }

    fn assert_monotone(table: &ResultTable) {
        for pair in table.entries().windows(2) {
            assert!(pair[0].max_coins <= pair[1].max_coins, "{pair:?}");
        }
    }

    // A . . SD5 . . . C
    #[test]
    fn test_button_extension() {
        init_tracing();
        let graph = graph_from_rows(&["A . . SD5 . . . C"]);
        let mut search = DepthLimitedSearch::new(&graph, SearchOptions::default());
        let table = search.sweep(8);

        assert_eq!(table.get(2), Some(0));
        assert_eq!(table.get(3), Some(1));
        assert_eq!(
            table.entry(3).unwrap().trajectory,
            vec![Cell::new(0, 0), Cell::new(0, 3), Cell::new(0, 7)]
        );
        assert_eq!(table.pairs()[..3], [(0, 0), (1, 0), (2, 0)]);
        assert!((3..=8).all(|b| table.get(b) == Some(1)));
    }

    // Start with coins at distance 2 and 3, 4 apart from each other.
    #[test]
    fn test_both_orderings_considered() {
        init_tracing();
        let start = Vertex {
            cell: Cell::new(0, 0),
            kind: VertexKind::Start,
        };
        let near = Vertex {
            cell: Cell::new(0, 2),
            kind: VertexKind::Coin { value: 1 },
        };
        let far = Vertex {
            cell: Cell::new(3, 0),
            kind: VertexKind::Coin { value: 1 },
        };
        let graph = ObjectGraph::from_weights(
            vec![start, near, far],
            vec![
                vec![Some(0), Some(2), Some(3)],
                vec![Some(2), Some(0), Some(4)],
                vec![Some(3), Some(4), Some(0)],
            ],
        )
        .unwrap();
        let mut search = DepthLimitedSearch::new(&graph, SearchOptions::default());
        let table = search.sweep(9);

        assert_eq!(table.get(1), Some(0));
        assert_eq!(table.get(2), Some(1));
        assert_eq!(table.get(5), Some(1));
        assert_eq!(table.get(6), Some(2));
        assert_eq!(
            table.entry(6).unwrap().trajectory,
            vec![Cell::new(0, 0), Cell::new(0, 2), Cell::new(3, 0)]
        );
        assert_eq!(table.get(9), Some(2));
    }

    #[test]
    fn test_walled_off_coin_never_collected() {
        let graph = graph_from_rows(&[
            "A C . . .", //
            ". . # # #",
            ". . # C #",
            ". . # # #",
        ]);
        let mut search = DepthLimitedSearch::new(&graph, SearchOptions::default());
        let table = search.sweep(30);

        assert_eq!(table.get(0), Some(0));
        assert_eq!(table.get(1), Some(1));
        assert_eq!(table.get(30), Some(1));
        assert_monotone(&table);
    }

    #[test]
    fn test_table_properties_on_open_grid() {
        let graph = graph_from_rows(&[
            "C . . . C", //
            ". # . # .",
            ". . A . SD2",
            ". # . # .",
            "C . . . C",
        ]);
        let mut search = DepthLimitedSearch::new(&graph, SearchOptions::default());
        let table = search.sweep(20);

        assert_eq!(table.len(), 21);
        assert_eq!(table.get(0), Some(0));
        assert_monotone(&table);
        assert!(table.entries().iter().all(|entry| entry.max_coins <= 4));
        // The button pays for its own detour to the nearest corner.
        assert_eq!(table.get(1), Some(0));
        assert_eq!(table.get(2), Some(1));
        assert_eq!(table.get(20), Some(4));
        assert!(!table.is_truncated());
    }

    #[test]
    fn test_isolated_start_collects_nothing() {
        let graph = graph_from_rows(&["A # C"]);
        let mut search = DepthLimitedSearch::new(&graph, SearchOptions::default());

        let result = search.solve(10);
        assert_eq!(result.max_coins, 0);
        assert_eq!(result.trajectory, vec![Cell::new(0, 0)]);
    }

    #[test]
    fn test_coin_value_scoring() {
        let graph = graph_from_rows(&["C1 . A . . C9"]);
        let options = SearchOptions {
            scoring: Scoring::CoinValue,
            max_expansions: None,
        };
        let mut search = DepthLimitedSearch::new(&graph, options);

        assert_eq!(search.solve(2).max_coins, 1);
        assert_eq!(search.solve(3).max_coins, 9);
        assert_eq!(search.solve(8).max_coins, 10);

        let mut counting = DepthLimitedSearch::new(&graph, SearchOptions::default());
        assert_eq!(counting.solve(3).max_coins, 1);
    }

    #[test]
    fn test_expansion_cap_truncates() {
        let graph = graph_from_rows(&["C . C . A . C . C"]);
        let options = SearchOptions {
            scoring: Scoring::CoinCount,
            max_expansions: Some(2),
        };
        let mut search = DepthLimitedSearch::new(&graph, options);
        let table = search.sweep(12);

        assert!(table.is_truncated());
        assert_monotone(&table);
        assert!(table.entries().iter().all(|entry| entry.max_coins <= 1));
        assert_eq!(search.stats().searches(), 13);
    }

    #[test]
    fn test_expansion_cap_exactly_enough() {
        let graph = graph_from_rows(&["A . C # C"]);
        let options = SearchOptions {
            scoring: Scoring::CoinCount,
            max_expansions: Some(2),
        };
        let mut search = DepthLimitedSearch::new(&graph, options);

        let result = search.solve(5);
        assert_eq!(result.max_coins, 1);
        assert!(!result.truncated);
        assert_eq!(search.stats().expanded_nodes(), 2);
    }

    #[test]
    fn test_huge_button_delay() {
        let graph = graph_from_rows(&["A SD18446744073709551615 . . C"]);
        let mut search = DepthLimitedSearch::new(&graph, SearchOptions::default());

        let result = search.solve(2);
        assert_eq!(result.max_coins, 1);
        assert_eq!(
            result.trajectory,
            vec![Cell::new(0, 0), Cell::new(0, 1), Cell::new(0, 4)]
        );
    }
}
