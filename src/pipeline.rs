use crate::algorithm::DistanceOracle;
use crate::graph::ObjectGraph;
use crate::map::{GridError, GridFile, GridModel};
use crate::solver::{BudgetResult, DepthLimitedSearch, ResultTable, SearchOptions};
use crate::stat::Stats;

use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct Analysis {
    pub table: ResultTable,
    pub stats: Stats,
}

/// Sweeps every initial deadline in `0..=max_length` over `grid`.
#[instrument(skip_all, name = "analyze", fields(max_length = max_length), level = "debug")]
pub fn analyze(grid: &GridModel, max_length: usize, options: SearchOptions) -> Analysis {
    let mut oracle = DistanceOracle::new(grid);
    let graph = ObjectGraph::build(grid, &mut oracle);

    let mut search = DepthLimitedSearch::new(&graph, options);
    let table = search.sweep(max_length);

    let mut stats = search.stats().clone();
    stats.bfs_runs = oracle.bfs_runs();
    Analysis { table, stats }
}

/// Single search at a fixed episode length.
pub fn solve_once(grid: &GridModel, episode_length: usize, options: SearchOptions) -> BudgetResult {
    let mut oracle = DistanceOracle::new(grid);
    let graph = ObjectGraph::build(grid, &mut oracle);
    DepthLimitedSearch::new(&graph, options).solve(episode_length)
}

/// Full pipeline: reads the grid at `path` and sweeps budgets up to
/// `max_length`, or up to the file's own episode length when not given.
pub fn calculate_m(
    path: &str,
    max_length: Option<usize>,
    options: SearchOptions,
) -> anyhow::Result<ResultTable> {
    let grid_file = GridFile::from_file(path)?;
    let max_length = max_length.unwrap_or(grid_file.episode_length);
    info!(
        "Analysing {path} ({} coins, {} buttons) for trajectory lengths up to {max_length}",
        grid_file.grid.total_coins(),
        grid_file.grid.buttons.len()
    );

    let analysis = analyze(&grid_file.grid, max_length, options);
    analysis.stats.print();
    Ok(analysis.table)
}

/// Direct entry: best coins for an in-memory grid of tile tokens at one
/// episode length.
pub fn direct_m<R, S>(
    tiles: &[R],
    episode_length: usize,
    options: SearchOptions,
) -> Result<usize, GridError>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let grid = GridModel::from_tokens(tiles)?;
    Ok(solve_once(&grid, episode_length, options).max_coins)
}
