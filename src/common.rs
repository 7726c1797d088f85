use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Cell { row, col }
    }

    pub fn manhattan(&self, other: &Cell) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(usize, usize)> for Cell {
    fn from((row, col): (usize, usize)) -> Self {
        Cell { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexKind {
    Start,
    Coin { value: usize },
    Button { delay: usize },
}

/// A vertex of interest: the agent start, a coin or a shutdown-delay button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vertex {
    pub cell: Cell,
    pub kind: VertexKind,
}

/// How collected coins are tallied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    /// Every coin counts one.
    #[default]
    CoinCount,
    /// Every coin counts its face value.
    CoinValue,
}

impl Scoring {
    pub fn score(&self, kind: VertexKind) -> usize {
        match (self, kind) {
            (Scoring::CoinCount, VertexKind::Coin { .. }) => 1,
            (Scoring::CoinValue, VertexKind::Coin { value }) => value,
            _ => 0,
        }
    }
}

/// Ordered cells visited by a trajectory, agent start first.
pub type Trajectory = Vec<Cell>;
