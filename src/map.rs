use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::str::FromStr;

use anyhow::Context;
use thiserror::Error;
use tracing::debug;

use crate::common::Cell;

/// Upper bound on vertices of interest (agent start included), fixed by the
/// search's visited bitset.
pub const MAX_VERTICES: usize = 128;

const DEFAULT_COIN_VALUE: usize = 0;
const DEFAULT_BUTTON_DELAY: usize = 0;

/// A grid that violates the model invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid has no rows")]
    EmptyGrid,
    #[error("row {row} has {found} tiles, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown tile {token:?} at {cell}")]
    UnknownToken { cell: Cell, token: String },
    #[error("grid has no agent")]
    MissingAgent,
    #[error("grid has more than one agent: {first} and {second}")]
    MultipleAgents { first: Cell, second: Cell },
    #[error("{cell} lies outside the {rows}x{cols} grid")]
    OutOfBounds { cell: Cell, rows: usize, cols: usize },
    #[error("more than one object at {cell}")]
    Overlap { cell: Cell },
    #[error("object at {cell} sits on a wall")]
    OnWall { cell: Cell },
    #[error("grid has {found} objects, at most {max} are supported")]
    TooManyObjects { found: usize, max: usize },
    #[error("invalid episode length line {line:?}")]
    EpisodeLength { line: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridModel {
    pub rows: usize,
    pub cols: usize,
    pub walls: BTreeSet<Cell>,
    pub agent_start: Cell,
    /// Coin cell to coin value.
    pub coins: BTreeMap<Cell, usize>,
    /// Button cell to the number of steps it adds to the deadline.
    pub buttons: BTreeMap<Cell, usize>,
    passable: Vec<Vec<bool>>,
}

impl GridModel {
    pub fn new(
        rows: usize,
        cols: usize,
        walls: BTreeSet<Cell>,
        agent_start: Cell,
        coins: BTreeMap<Cell, usize>,
        buttons: BTreeMap<Cell, usize>,
    ) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::EmptyGrid);
        }

        let in_bounds = |cell: &Cell| cell.row < rows && cell.col < cols;
        for cell in walls
            .iter()
            .chain(coins.keys())
            .chain(buttons.keys())
            .chain(std::iter::once(&agent_start))
        {
            if !in_bounds(cell) {
                return Err(GridError::OutOfBounds {
                    cell: *cell,
                    rows,
                    cols,
                });
            }
        }

        let mut occupied = BTreeSet::new();
        for cell in std::iter::once(&agent_start)
            .chain(coins.keys())
            .chain(buttons.keys())
        {
            if walls.contains(cell) {
                return Err(GridError::OnWall { cell: *cell });
            }
            if !occupied.insert(*cell) {
                return Err(GridError::Overlap { cell: *cell });
            }
        }

        if occupied.len() > MAX_VERTICES {
            return Err(GridError::TooManyObjects {
                found: occupied.len() - 1,
                max: MAX_VERTICES - 1,
            });
        }

        let mut passable = vec![vec![true; cols]; rows];
        for wall in &walls {
            passable[wall.row][wall.col] = false;
        }

        Ok(GridModel {
            rows,
            cols,
            walls,
            agent_start,
            coins,
            buttons,
            passable,
        })
    }

    /// Builds a grid from rows of tile tokens (`.`, `#`, `A`, `C<v>`, `SD<t>`).
    pub fn from_tokens<R, S>(tiles: &[R]) -> Result<Self, GridError>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let rows = tiles.len();
        let cols = tiles.first().map(|row| row.as_ref().len()).unwrap_or(0);
        if rows == 0 || cols == 0 {
            return Err(GridError::EmptyGrid);
        }

        let mut walls = BTreeSet::new();
        let mut agent: Option<Cell> = None;
        let mut coins = BTreeMap::new();
        let mut buttons = BTreeMap::new();

        for (row, line) in tiles.iter().enumerate() {
            let line = line.as_ref();
            if line.len() != cols {
                return Err(GridError::RaggedRow {
                    row,
                    expected: cols,
                    found: line.len(),
                });
            }
            for (col, token) in line.iter().enumerate() {
                let cell = Cell::new(row, col);
                match Tile::parse(token.as_ref()) {
                    Some(Tile::Floor) => {}
                    Some(Tile::Wall) => {
                        walls.insert(cell);
                    }
                    Some(Tile::Agent) => {
                        if let Some(first) = agent {
                            return Err(GridError::MultipleAgents {
                                first,
                                second: cell,
                            });
                        }
                        agent = Some(cell);
                    }
                    Some(Tile::Coin(value)) => {
                        coins.insert(cell, value);
                    }
                    Some(Tile::Button(delay)) => {
                        buttons.insert(cell, delay);
                    }
                    None => {
                        return Err(GridError::UnknownToken {
                            cell,
                            token: token.as_ref().to_string(),
                        })
                    }
                }
            }
        }

        let agent_start = agent.ok_or(GridError::MissingAgent)?;
        GridModel::new(rows, cols, walls, agent_start, coins, buttons)
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    pub fn is_passable(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && self.passable[cell.row][cell.col]
    }

    /// Walkable 4-connected neighbours of `cell`.
    pub fn get_neighbors(&self, cell: Cell) -> Vec<Cell> {
        let directions = [(-1, 0), (1, 0), (0, -1), (0, 1)]; // Up, down, left, right
        let mut neighbors = Vec::with_capacity(4);

        for &(dr, dc) in &directions {
            let new_row = cell.row as isize + dr;
            let new_col = cell.col as isize + dc;
            if new_row < 0 || new_col < 0 {
                continue;
            }
            let next = Cell::new(new_row as usize, new_col as usize);
            if self.is_passable(next) {
                neighbors.push(next);
            }
        }

        neighbors
    }

    /// Cells that are neither walls nor occupied by an object.
    pub fn free_cells(&self) -> Vec<Cell> {
        (0..self.rows)
            .flat_map(|row| (0..self.cols).map(move |col| Cell::new(row, col)))
            .filter(|cell| self.is_free(*cell))
            .collect()
    }

    pub fn is_free(&self, cell: Cell) -> bool {
        self.is_passable(cell)
            && cell != self.agent_start
            && !self.coins.contains_key(&cell)
            && !self.buttons.contains_key(&cell)
    }

    pub fn total_coins(&self) -> usize {
        self.coins.len()
    }

    pub fn total_coin_value(&self) -> usize {
        self.coins.values().sum()
    }

    /// Tile tokens row by row, the inverse of [`GridModel::from_tokens`].
    pub fn tokens(&self) -> Vec<Vec<String>> {
        (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| self.token_at(Cell::new(row, col)))
                    .collect()
            })
            .collect()
    }

    fn token_at(&self, cell: Cell) -> String {
        if self.walls.contains(&cell) {
            "#".to_string()
        } else if cell == self.agent_start {
            "A".to_string()
        } else if let Some(value) = self.coins.get(&cell) {
            format!("C{value}")
        } else if let Some(delay) = self.buttons.get(&cell) {
            format!("SD{delay}")
        } else {
            ".".to_string()
        }
    }
}

enum Tile {
    Floor,
    Wall,
    Agent,
    Coin(usize),
    Button(usize),
}

impl Tile {
    fn parse(token: &str) -> Option<Tile> {
        match token {
            "." => Some(Tile::Floor),
            "#" => Some(Tile::Wall),
            "A" => Some(Tile::Agent),
            _ => {
                if let Some(delay) = token.strip_prefix("SD") {
                    parse_amount(delay, DEFAULT_BUTTON_DELAY).map(Tile::Button)
                } else if let Some(value) = token.strip_prefix('C') {
                    parse_amount(value, DEFAULT_COIN_VALUE).map(Tile::Coin)
                } else {
                    None
                }
            }
        }
    }
}

fn parse_amount(digits: &str, default: usize) -> Option<usize> {
    if digits.is_empty() {
        Some(default)
    } else {
        digits.parse().ok()
    }
}

/// A grid together with its default episode length, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridFile {
    pub episode_length: usize,
    pub grid: GridModel,
}

impl GridFile {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("cannot read grid {path}"))?;
        let grid_file: GridFile = text
            .parse()
            .with_context(|| format!("malformed grid file {path}"))?;
        debug!(
            "loaded {path}: {}x{} grid, {} coins, {} buttons, episode length {}",
            grid_file.grid.rows,
            grid_file.grid.cols,
            grid_file.grid.coins.len(),
            grid_file.grid.buttons.len(),
            grid_file.episode_length
        );
        Ok(grid_file)
    }
}

impl FromStr for GridFile {
    type Err = GridError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

        let first = lines.next().ok_or(GridError::EmptyGrid)?;
        let episode_length = first.parse().map_err(|_| GridError::EpisodeLength {
            line: first.to_string(),
        })?;

        let tiles: Vec<Vec<&str>> = lines.map(|line| line.split_whitespace().collect()).collect();
        let grid = GridModel::from_tokens(&tiles)?;

        Ok(GridFile {
            episode_length,
            grid,
        })
    }
}

impl fmt::Display for GridFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.episode_length)?;

        let tokens = self.grid.tokens();
        let widths: Vec<usize> = (0..self.grid.cols)
            .map(|col| tokens.iter().map(|row| row[col].len()).max().unwrap_or(1))
            .collect();

        for row in &tokens {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(token, width)| format!("{token:<width$}"))
                .collect();
            writeln!(f, "{}", line.join(" ").trim_end())?;
        }
        Ok(())
    }
}
