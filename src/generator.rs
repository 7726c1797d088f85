use crate::algorithm::DistanceOracle;
use crate::common::{Cell, Scoring};
use crate::map::{GridFile, GridModel};
use crate::pipeline::solve_once;
use crate::solver::SearchOptions;

use anyhow::{bail, ensure, Context, Result};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const WALL_PROBABILITY: f64 = 0.5;
const NUDGING_PROBABILITY: f64 = 0.6;
const NUDGING_AMOUNT: f64 = 1.0 / 3.0;
const MIN_EPISODE_LENGTH: usize = 2;
const COIN_MIN: usize = 1;
const MAX_ATTEMPTS: usize = 1000;

fn coin_max(num_coins: usize) -> usize {
    usize::max(7, num_coins + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GridType {
    Open,
    Easy,
    Hard,
}

impl GridType {
    /// Number of Bernoulli trials deciding how many walls to place.
    fn wall_trials(self, rows: usize, cols: usize) -> usize {
        match self {
            GridType::Open => 0,
            GridType::Easy => (rows + cols) / 2 + 2,
            GridType::Hard => rows * cols / 2 + 5,
        }
    }
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GridType::Open => "OPEN",
            GridType::Easy => "EASY",
            GridType::Hard => "HARD",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub number: usize,
    pub rows: usize,
    pub cols: usize,
    /// Inclusive range for the number of coins per grid.
    pub coins: (usize, usize),
    /// Inclusive range for the number of buttons per grid.
    pub buttons: (usize, usize),
    /// Inclusive range for a button's delay.
    pub delay: (usize, usize),
    pub grid_type: GridType,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            number: 50,
            rows: 5,
            cols: 5,
            coins: (3, 4),
            buttons: (1, 1),
            delay: (2, 6),
            grid_type: GridType::Easy,
            seed: 62,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.rows > 0 && self.cols > 0, "grid size must be positive");
        for (name, (min, max)) in [
            ("coins", self.coins),
            ("buttons", self.buttons),
            ("delay", self.delay),
        ] {
            ensure!(min <= max, "{name} range {min}..={max} is empty");
        }
        ensure!(self.coins.0 > 0, "every grid needs at least one coin");
        let objects = 1 + self.coins.1 + self.buttons.1;
        ensure!(
            objects <= self.rows * self.cols,
            "{objects} objects do not fit in a {}x{} grid",
            self.rows,
            self.cols
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedGrid {
    pub seed: u64,
    pub grid_file: GridFile,
}

/// Generates `config.number` grids, each from its own seed drawn from
/// `config.seed`.
pub fn generate_grids(config: &GeneratorConfig) -> Result<Vec<GeneratedGrid>> {
    config.validate()?;
    info!(
        "Now generating {} gridworld(s) using seed {}",
        config.number, config.seed
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut grids = Vec::with_capacity(config.number);
    let mut failures = 0;
    while grids.len() < config.number {
        let grid_seed: u64 = rng.gen();
        let num_coins = rng.gen_range(config.coins.0..=config.coins.1);
        let num_buttons = rng.gen_range(config.buttons.0..=config.buttons.1);
        match create_grid(config, num_coins, num_buttons, grid_seed) {
            Ok(grid) => grids.push(grid),
            Err(err) => {
                failures += 1;
                debug!("discarding grid {grid_seed:#x}: {err:#}");
                ensure!(
                    failures < MAX_ATTEMPTS,
                    "too many failed grids, last error: {err:#}"
                );
            }
        }
    }
    Ok(grids)
}

/// Generates a single grid whose free space is one contiguous region, whose
/// buttons are all reachable before shutdown, and in which at least one coin
/// can be collected within the episode length.
pub fn create_grid(
    config: &GeneratorConfig,
    num_coins: usize,
    num_buttons: usize,
    seed: u64,
) -> Result<GeneratedGrid> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (rows, cols) = (config.rows, config.cols);
    let random_cell =
        |rng: &mut StdRng| Cell::new(rng.gen_range(0..rows), rng.gen_range(0..cols));

    let agent = random_cell(&mut rng);
    let mut layout = Layout {
        rows,
        cols,
        agent,
        walls: BTreeSet::new(),
        coins: BTreeMap::new(),
        buttons: BTreeMap::new(),
    };

    let num_walls = (0..config.grid_type.wall_trials(rows, cols))
        .filter(|_| rng.gen_bool(WALL_PROBABILITY))
        .count();
    let mut attempts = 0;
    while layout.walls.len() < num_walls && attempts < MAX_ATTEMPTS {
        attempts += 1;
        let cell = random_cell(&mut rng);
        if !layout.is_free(cell) {
            continue;
        }
        let mut candidate = layout.clone();
        candidate.walls.insert(cell);
        if candidate.is_contiguous()? {
            layout = candidate;
        }
    }
    if layout.walls.len() < num_walls {
        debug!("placed {} of {num_walls} walls", layout.walls.len());
    }

    let episode_length = episode_length(&mut rng, rows, cols, agent);

    let mut attempts = 0;
    while layout.buttons.len() < num_buttons {
        ensure!(
            attempts < MAX_ATTEMPTS,
            "could not place {num_buttons} buttons"
        );
        attempts += 1;
        let delay = rng.gen_range(config.delay.0..=config.delay.1);
        let cell = random_cell(&mut rng);
        if !layout.is_free(cell) || cell.manhattan(&agent) <= 1 {
            continue;
        }
        let grid = layout.build()?;
        let mut oracle = DistanceOracle::new(&grid);
        if oracle
            .distance(agent, cell)
            .is_some_and(|steps| steps <= episode_length)
        {
            layout.buttons.insert(cell, delay);
        }
    }

    let options = SearchOptions {
        scoring: Scoring::CoinCount,
        max_expansions: None,
    };
    for _ in 0..MAX_ATTEMPTS {
        let values = rand::seq::index::sample(&mut rng, coin_max(num_coins) - COIN_MIN, num_coins);
        let free = layout.build()?.free_cells();
        if free.len() < num_coins {
            bail!("no room for {num_coins} coins");
        }

        let mut candidate = layout.clone();
        for (cell, value) in free.choose_multiple(&mut rng, num_coins).zip(values.iter()) {
            candidate.coins.insert(*cell, value + COIN_MIN);
        }
        let grid = candidate.build()?;
        if solve_once(&grid, episode_length, options).max_coins > 0 {
            info!("Generated grid {seed:#x}: episode length {episode_length}");
            return Ok(GeneratedGrid {
                seed,
                grid_file: GridFile {
                    episode_length,
                    grid,
                },
            });
        }
    }

    bail!("no coin placement is collectable within {episode_length} steps")
}

/// Episode length shrinks the further the agent starts from the border, then
/// is sometimes nudged by up to a third of the average side.
fn episode_length(rng: &mut StdRng, rows: usize, cols: usize, agent: Cell) -> usize {
    let dist_to_edge = [agent.row, agent.col, rows - 1 - agent.row, cols - 1 - agent.col]
        .into_iter()
        .min()
        .unwrap_or(0);
    let avg_side = (rows + cols) / 2;
    let mut episode_length = avg_side.saturating_sub(dist_to_edge);

    if rng.gen_bool(NUDGING_PROBABILITY) {
        let nudge = (avg_side as f64 * rng.gen_range(0.0..=NUDGING_AMOUNT)).round() as usize;
        if rng.gen_bool(0.5) {
            episode_length += nudge;
        } else {
            episode_length = episode_length.saturating_sub(nudge);
        }
    }

    episode_length.max(MIN_EPISODE_LENGTH)
}

#[derive(Debug, Clone)]
struct Layout {
    rows: usize,
    cols: usize,
    agent: Cell,
    walls: BTreeSet<Cell>,
    coins: BTreeMap<Cell, usize>,
    buttons: BTreeMap<Cell, usize>,
}

impl Layout {
    fn build(&self) -> Result<GridModel> {
        Ok(GridModel::new(
            self.rows,
            self.cols,
            self.walls.clone(),
            self.agent,
            self.coins.clone(),
            self.buttons.clone(),
        )?)
    }

    fn is_free(&self, cell: Cell) -> bool {
        cell != self.agent
            && !self.walls.contains(&cell)
            && !self.coins.contains_key(&cell)
            && !self.buttons.contains_key(&cell)
    }

    fn is_contiguous(&self) -> Result<bool> {
        let grid = self.build()?;
        let mut oracle = DistanceOracle::new(&grid);
        Ok(oracle.reachable_count(self.agent) == self.rows * self.cols - self.walls.len())
    }
}

#[derive(Serialize)]
struct Parameters<'a> {
    config: &'a GeneratorConfig,
    wall_probability: f64,
    nudging_probability: f64,
    nudging_amount: f64,
    coin_values: (usize, usize),
}

/// Writes grids under `<out_dir>/seed_<seed>_<TYPE>_x<number>/` and returns
/// that directory.
pub fn write_grids(
    config: &GeneratorConfig,
    grids: &[GeneratedGrid],
    out_dir: &str,
) -> Result<PathBuf> {
    let dir = Path::new(out_dir).join(format!(
        "seed_{}_{}_x{}",
        config.seed, config.grid_type, config.number
    ));
    let grids_dir = dir.join("grids");
    fs::create_dir_all(&grids_dir)
        .with_context(|| format!("cannot create {}", grids_dir.display()))?;

    let parameters = Parameters {
        config,
        wall_probability: WALL_PROBABILITY,
        nudging_probability: NUDGING_PROBABILITY,
        nudging_amount: NUDGING_AMOUNT,
        coin_values: (COIN_MIN, coin_max(config.coins.1) - 1),
    };
    fs::write(
        dir.join("__parameters__.yaml"),
        serde_yaml::to_string(&parameters)?,
    )?;

    for generated in grids {
        let path = grids_dir.join(format!("grid_{:#x}.txt", generated.seed));
        fs::write(&path, generated.grid_file.to_string())
            .with_context(|| format!("cannot write {}", path.display()))?;
    }

    info!("Wrote {} grids to {}", grids.len(), dir.display());
    Ok(dir)
}
